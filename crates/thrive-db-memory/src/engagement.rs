//! Badges, notifications and friendships.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use thrive_core::UserBadge;
use thrive_core::model::{Friendship, Notification};
use thrive_storage::{
    BadgeStorage, NotificationStorage, SocialStorage, StorageError, StorageResult,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::storage::{InMemoryStorage, collect_where, pair_key};

#[async_trait]
impl BadgeStorage for InMemoryStorage {
    async fn award_badge(&self, badge: &UserBadge) -> StorageResult<bool> {
        match self.badges.entry((badge.user_id, badge.badge_id.clone())) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(badge.clone());
                Ok(true)
            }
        }
    }

    async fn list_user_badges(&self, user_id: Uuid) -> StorageResult<Vec<UserBadge>> {
        let mut badges: Vec<UserBadge> = self
            .badges
            .iter()
            .filter(|b| b.user_id == user_id)
            .map(|b| b.value().clone())
            .collect();
        badges.sort_by(|a, b| a.unlocked_at.cmp(&b.unlocked_at).then(a.badge_id.cmp(&b.badge_id)));
        Ok(badges)
    }
}

#[async_trait]
impl NotificationStorage for InMemoryStorage {
    async fn create_notification(&self, notification: &Notification) -> StorageResult<Notification> {
        self.notifications
            .insert(notification.id, notification.clone());
        Ok(notification.clone())
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: usize,
    ) -> StorageResult<Vec<Notification>> {
        let mut items = collect_where(&self.notifications, |n| {
            n.user_id == user_id && (!unread_only || !n.is_read())
        });
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        items.truncate(limit);
        Ok(items)
    }

    async fn count_unread_notifications(&self, user_id: Uuid) -> StorageResult<u64> {
        Ok(self
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read())
            .count() as u64)
    }

    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        id: Uuid,
        at: OffsetDateTime,
    ) -> StorageResult<Option<Notification>> {
        Ok(self
            .notifications
            .get_mut(&id)
            .filter(|n| n.user_id == user_id)
            .map(|mut n| {
                if n.read_at.is_none() {
                    n.read_at = Some(at);
                }
                n.clone()
            }))
    }

    async fn mark_all_notifications_read(
        &self,
        user_id: Uuid,
        at: OffsetDateTime,
    ) -> StorageResult<u64> {
        let mut changed = 0;
        for mut n in self.notifications.iter_mut() {
            if n.user_id == user_id && n.read_at.is_none() {
                n.read_at = Some(at);
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete_notification(&self, user_id: Uuid, id: Uuid) -> StorageResult<bool> {
        Ok(self
            .notifications
            .remove_if(&id, |_, n| n.user_id == user_id)
            .is_some())
    }
}

#[async_trait]
impl SocialStorage for InMemoryStorage {
    async fn create_friendship(&self, friendship: &Friendship) -> StorageResult<Friendship> {
        let key = pair_key(friendship.requester_id, friendship.addressee_id);
        match self.friend_pairs.entry(key) {
            Entry::Occupied(slot) => {
                return Err(StorageError::already_exists("Friendship", *slot.get()));
            }
            Entry::Vacant(slot) => {
                slot.insert(friendship.id);
            }
        }
        self.friendships.insert(friendship.id, friendship.clone());
        Ok(friendship.clone())
    }

    async fn get_friendship(&self, id: Uuid) -> StorageResult<Option<Friendship>> {
        Ok(self.friendships.get(&id).map(|f| f.clone()))
    }

    async fn list_friendships(&self, user_id: Uuid) -> StorageResult<Vec<Friendship>> {
        let mut items = collect_where(&self.friendships, |f| f.involves(user_id));
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn update_friendship(&self, friendship: &Friendship) -> StorageResult<Friendship> {
        let mut existing = self
            .friendships
            .get_mut(&friendship.id)
            .ok_or_else(|| StorageError::not_found("Friendship", friendship.id))?;
        *existing = friendship.clone();
        Ok(friendship.clone())
    }

    async fn delete_friendship(&self, id: Uuid) -> StorageResult<bool> {
        let Some((_, removed)) = self.friendships.remove(&id) else {
            return Ok(false);
        };
        self.friend_pairs
            .remove(&pair_key(removed.requester_id, removed.addressee_id));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thrive_core::model::NotificationKind;
    use thrive_core::now_utc;

    #[tokio::test]
    async fn awarding_twice_inserts_once() {
        let storage = InMemoryStorage::new();
        let user = Uuid::new_v4();
        let badge = UserBadge::new(user, "first-task", now_utc());
        assert!(storage.award_badge(&badge).await.unwrap());
        assert!(!storage.award_badge(&badge).await.unwrap());
        assert_eq!(storage.list_user_badges(user).await.unwrap().len(), 1);
        assert!(
            storage
                .unlocked_badge_ids(user)
                .await
                .unwrap()
                .contains("first-task")
        );
    }

    #[tokio::test]
    async fn read_state() {
        let storage = InMemoryStorage::new();
        let user = Uuid::new_v4();
        let first = Notification::new(user, NotificationKind::System, "Hi", "Welcome", serde_json::Value::Null);
        let second = Notification::new(user, NotificationKind::System, "Tip", "Drink water", serde_json::Value::Null);
        storage.create_notification(&first).await.unwrap();
        storage.create_notification(&second).await.unwrap();
        assert_eq!(storage.count_unread_notifications(user).await.unwrap(), 2);

        let read = storage
            .mark_notification_read(user, first.id, now_utc())
            .await
            .unwrap()
            .unwrap();
        assert!(read.is_read());
        assert!(
            storage
                .mark_notification_read(Uuid::new_v4(), second.id, now_utc())
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(storage.mark_all_notifications_read(user, now_utc()).await.unwrap(), 1);
        assert_eq!(storage.count_unread_notifications(user).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn friendship_pair_is_unique_in_both_directions() {
        let storage = InMemoryStorage::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let request = storage
            .create_friendship(&Friendship::request(a, b))
            .await
            .unwrap();
        assert!(
            storage
                .create_friendship(&Friendship::request(b, a))
                .await
                .unwrap_err()
                .is_already_exists()
        );
        assert!(storage.delete_friendship(request.id).await.unwrap());
        storage
            .create_friendship(&Friendship::request(b, a))
            .await
            .unwrap();
    }
}
