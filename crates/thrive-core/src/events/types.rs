use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

string_enum! {
    pub enum RealtimeEventKind ("event") {
        TaskCreated => "task_created",
        TaskUpdated => "task_updated",
        TaskCompleted => "task_completed",
        TaskDeleted => "task_deleted",
        FocusStarted => "focus_started",
        FocusCompleted => "focus_completed",
        FocusAbandoned => "focus_abandoned",
        BadgeUnlocked => "badge_unlocked",
        Notification => "notification",
        Subscription => "subscription",
    }
}

/// Event addressed to a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeEvent {
    pub user_id: Uuid,
    pub kind: RealtimeEventKind,
    /// Id of the row the event is about, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    /// Snapshot of the row after the change (`null` for deletions).
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl RealtimeEvent {
    pub fn new(user_id: Uuid, kind: RealtimeEventKind, data: serde_json::Value) -> Self {
        Self {
            user_id,
            kind,
            entity_id: None,
            data,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Builds an event from any serializable row; serialization failures
    /// degrade to `null` data.
    pub fn for_entity<T: Serialize>(
        user_id: Uuid,
        kind: RealtimeEventKind,
        entity_id: impl ToString,
        entity: &T,
    ) -> Self {
        let data = serde_json::to_value(entity).unwrap_or(serde_json::Value::Null);
        Self::new(user_id, kind, data).with_entity_id(entity_id)
    }

    pub fn with_entity_id(mut self, entity_id: impl ToString) -> Self {
        self.entity_id = Some(entity_id.to_string());
        self
    }

    pub fn is_for(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}
