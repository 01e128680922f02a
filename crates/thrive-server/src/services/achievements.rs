use std::sync::Arc;

use serde_json::json;
use thrive_core::badges::{self, ActivitySnapshot, BadgeDefinition, UserBadge};
use thrive_core::model::{Notification, NotificationKind};
use thrive_core::time::local_date;
use thrive_core::{EventBroadcaster, RealtimeEventKind};
use thrive_storage::prelude::*;
use time::OffsetDateTime;
use uuid::Uuid;

use super::notifications::NotificationService;
use crate::metrics;

/// Evaluates badge criteria and persists new unlocks.
#[derive(Clone)]
pub struct AchievementService {
    storage: DynStorage,
    notifier: NotificationService,
    events: Arc<EventBroadcaster>,
}

impl AchievementService {
    pub fn new(
        storage: DynStorage,
        notifier: NotificationService,
        events: Arc<EventBroadcaster>,
    ) -> Self {
        Self {
            storage,
            notifier,
            events,
        }
    }

    /// Current activity of a user, computed in their local time.
    pub async fn snapshot(&self, user_id: Uuid, now: OffsetDateTime) -> StorageResult<ActivitySnapshot> {
        let user = self
            .storage
            .get_user(user_id)
            .await?
            .ok_or_else(|| StorageError::not_found("user", user_id))?;
        let completions = self.storage.task_completion_times(user_id).await?;
        let focus_minutes = self.storage.total_focus_minutes(user_id).await?;
        let today = local_date(now, user.utc_offset_minutes);
        Ok(ActivitySnapshot::from_completions(
            &completions,
            focus_minutes,
            user.utc_offset_minutes,
            today,
        ))
    }

    /// Awards every badge the user has newly earned and returns them in
    /// catalog order.
    ///
    /// Only badges this call actually inserted are returned, so concurrent
    /// checks never report the same unlock twice.
    pub async fn check_and_award(
        &self,
        user_id: Uuid,
    ) -> StorageResult<Vec<&'static BadgeDefinition>> {
        let now = OffsetDateTime::now_utc();
        let snapshot = self.snapshot(user_id, now).await?;
        let unlocked = self.storage.unlocked_badge_ids(user_id).await?;

        let mut awarded = Vec::new();
        for badge in badges::evaluate(&snapshot, &unlocked) {
            let record = UserBadge::new(user_id, badge.id, now);
            if !self.storage.award_badge(&record).await? {
                continue;
            }

            tracing::info!(user_id = %user_id, badge = badge.id, "badge unlocked");
            metrics::record_badge_unlocked(badge.id);
            self.events
                .publish(user_id, RealtimeEventKind::BadgeUnlocked, badge.id, &record);
            self.notifier
                .notify_best_effort(Notification::new(
                    user_id,
                    NotificationKind::BadgeUnlocked,
                    format!("{} {} unlocked", badge.icon, badge.name),
                    badge.description,
                    json!({ "badgeId": badge.id }),
                ))
                .await;
            awarded.push(badge);
        }
        Ok(awarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thrive_core::model::{Task, TaskStatus, User};

    async fn setup() -> (AchievementService, DynStorage, Uuid) {
        let storage = thrive_db_memory::create_storage();
        let events = EventBroadcaster::new_shared();
        let notifier = NotificationService::new(storage.clone(), events.clone());
        let service = AchievementService::new(storage.clone(), notifier, events);
        let user = storage
            .create_user(&User::new("ada@example.com", "Ada"))
            .await
            .unwrap();
        (service, storage, user.id)
    }

    async fn complete_task(storage: &DynStorage, user_id: Uuid) {
        let mut task = Task::new(user_id, "Water the plants");
        task.set_status(TaskStatus::Done, OffsetDateTime::now_utc());
        storage.create_task(&task).await.unwrap();
    }

    #[tokio::test]
    async fn first_completion_unlocks_first_task() {
        let (service, storage, user_id) = setup().await;
        complete_task(&storage, user_id).await;

        let awarded = service.check_and_award(user_id).await.unwrap();
        let ids: Vec<_> = awarded.iter().map(|b| b.id).collect();
        assert!(ids.contains(&"first-task"));
        assert_eq!(
            storage.count_unread_notifications(user_id).await.unwrap(),
            awarded.len() as u64
        );
    }

    #[tokio::test]
    async fn checking_twice_awards_once() {
        let (service, storage, user_id) = setup().await;
        complete_task(&storage, user_id).await;

        let first = service.check_and_award(user_id).await.unwrap();
        let second = service.check_and_award(user_id).await.unwrap();
        assert!(!first.is_empty());
        assert!(second.is_empty());

        let held = storage.list_user_badges(user_id).await.unwrap();
        assert_eq!(held.len(), first.len());
    }

    #[tokio::test]
    async fn concurrent_checks_do_not_duplicate() {
        let (service, storage, user_id) = setup().await;
        complete_task(&storage, user_id).await;

        let (a, b) = tokio::join!(
            service.check_and_award(user_id),
            service.check_and_award(user_id)
        );
        let total = a.unwrap().len() + b.unwrap().len();
        let held = storage.list_user_badges(user_id).await.unwrap();
        assert_eq!(total, held.len());
    }

    #[tokio::test]
    async fn no_activity_no_badges() {
        let (service, _storage, user_id) = setup().await;
        assert!(service.check_and_award(user_id).await.unwrap().is_empty());
    }
}
