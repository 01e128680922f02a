use std::sync::Arc;

use thrive_core::model::Notification;
use thrive_core::{EventBroadcaster, RealtimeEventKind};
use thrive_storage::prelude::*;

/// Stores notifications and pushes them to the owner's realtime stream.
#[derive(Clone)]
pub struct NotificationService {
    storage: DynStorage,
    events: Arc<EventBroadcaster>,
}

impl NotificationService {
    pub fn new(storage: DynStorage, events: Arc<EventBroadcaster>) -> Self {
        Self { storage, events }
    }

    pub async fn notify(&self, notification: Notification) -> StorageResult<Notification> {
        let stored = self.storage.create_notification(&notification).await?;
        self.events.publish(
            stored.user_id,
            RealtimeEventKind::Notification,
            stored.id,
            &stored,
        );
        tracing::debug!(
            user_id = %stored.user_id,
            kind = %stored.kind,
            "notification created"
        );
        Ok(stored)
    }

    /// For notifications that accompany another change: a failure is logged
    /// and does not fail the caller.
    pub async fn notify_best_effort(&self, notification: Notification) {
        let user_id = notification.user_id;
        if let Err(e) = self.notify(notification).await {
            tracing::warn!(user_id = %user_id, error = %e, "failed to store notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use thrive_core::model::NotificationKind;
    use uuid::Uuid;

    #[tokio::test]
    async fn notify_stores_and_publishes() {
        let storage = thrive_db_memory::create_storage();
        let events = EventBroadcaster::new_shared();
        let mut rx = events.subscribe();
        let service = NotificationService::new(storage.clone(), events);

        let user = Uuid::new_v4();
        let stored = service
            .notify(Notification::new(
                user,
                NotificationKind::System,
                "Welcome",
                "Glad you are here",
                json!({}),
            ))
            .await
            .unwrap();

        assert_eq!(storage.count_unread_notifications(user).await.unwrap(), 1);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, RealtimeEventKind::Notification);
        assert_eq!(event.entity_id, Some(stored.id.to_string()));
    }
}
