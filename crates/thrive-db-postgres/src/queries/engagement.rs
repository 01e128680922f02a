//! Badges, notifications and friendships.

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use sqlx_core::types::Json;
use thrive_core::UserBadge;
use thrive_core::model::{Friendship, Notification};
use thrive_storage::{BadgeStorage, NotificationStorage, SocialStorage, StorageResult};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use super::{
    FRIENDSHIP_COLUMNS, FriendshipRow, NOTIFICATION_COLUMNS, NotificationRow, collect_rows,
    friendship_from_row, from_db_count, not_found, notification_from_row, to_db_limit,
};
use crate::error::{conflict_error, db_error};
use crate::storage::PostgresStorage;

#[async_trait]
impl BadgeStorage for PostgresStorage {
    #[instrument(skip(self, badge), fields(user_id = %badge.user_id, badge = %badge.badge_id))]
    async fn award_badge(&self, badge: &UserBadge) -> StorageResult<bool> {
        let result = query(
            "INSERT INTO user_badges (user_id, badge_id, unlocked_at) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, badge_id) DO NOTHING",
        )
        .bind(badge.user_id)
        .bind(&badge.badge_id)
        .bind(badge.unlocked_at)
        .execute(self.pool())
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn list_user_badges(&self, user_id: Uuid) -> StorageResult<Vec<UserBadge>> {
        let rows: Vec<(Uuid, String, OffsetDateTime)> = query_as(
            "SELECT user_id, badge_id, unlocked_at FROM user_badges WHERE user_id = $1 \
             ORDER BY unlocked_at, badge_id",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(db_error)?;
        Ok(rows
            .into_iter()
            .map(|(user_id, badge_id, unlocked_at)| UserBadge::new(user_id, badge_id, unlocked_at))
            .collect())
    }
}

#[async_trait]
impl NotificationStorage for PostgresStorage {
    #[instrument(skip(self, notification), fields(kind = %notification.kind))]
    async fn create_notification(&self, notification: &Notification) -> StorageResult<Notification> {
        let sql = format!(
            "INSERT INTO notifications ({NOTIFICATION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {NOTIFICATION_COLUMNS}"
        );
        let row: NotificationRow = query_as(&sql)
            .bind(notification.id)
            .bind(notification.user_id)
            .bind(notification.kind.as_str())
            .bind(&notification.title)
            .bind(&notification.body)
            .bind(Json(&notification.data))
            .bind(notification.read_at)
            .bind(notification.created_at)
            .fetch_one(self.pool())
            .await
            .map_err(|e| conflict_error(e, "Notification", notification.id))?;
        notification_from_row(row)
    }

    #[instrument(skip(self))]
    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: usize,
    ) -> StorageResult<Vec<Notification>> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = $1 \
             AND (NOT $2 OR read_at IS NULL) ORDER BY created_at DESC, id DESC LIMIT $3"
        );
        let rows: Vec<NotificationRow> = query_as(&sql)
            .bind(user_id)
            .bind(unread_only)
            .bind(to_db_limit(limit))
            .fetch_all(self.pool())
            .await
            .map_err(db_error)?;
        collect_rows(rows, notification_from_row)
    }

    #[instrument(skip(self))]
    async fn count_unread_notifications(&self, user_id: Uuid) -> StorageResult<u64> {
        let count: i64 = query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await
        .map_err(db_error)?;
        Ok(from_db_count(count))
    }

    #[instrument(skip(self))]
    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        id: Uuid,
        at: OffsetDateTime,
    ) -> StorageResult<Option<Notification>> {
        let sql = format!(
            "UPDATE notifications SET read_at = COALESCE(read_at, $3) \
             WHERE id = $1 AND user_id = $2 RETURNING {NOTIFICATION_COLUMNS}"
        );
        let row: Option<NotificationRow> = query_as(&sql)
            .bind(id)
            .bind(user_id)
            .bind(at)
            .fetch_optional(self.pool())
            .await
            .map_err(db_error)?;
        row.map(notification_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn mark_all_notifications_read(
        &self,
        user_id: Uuid,
        at: OffsetDateTime,
    ) -> StorageResult<u64> {
        let result = query(
            "UPDATE notifications SET read_at = $2 WHERE user_id = $1 AND read_at IS NULL",
        )
        .bind(user_id)
        .bind(at)
        .execute(self.pool())
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn delete_notification(&self, user_id: Uuid, id: Uuid) -> StorageResult<bool> {
        let result = query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool())
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SocialStorage for PostgresStorage {
    #[instrument(skip(self, friendship), fields(friendship_id = %friendship.id))]
    async fn create_friendship(&self, friendship: &Friendship) -> StorageResult<Friendship> {
        let sql = format!(
            "INSERT INTO friendships ({FRIENDSHIP_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {FRIENDSHIP_COLUMNS}"
        );
        let row: FriendshipRow = query_as(&sql)
            .bind(friendship.id)
            .bind(friendship.requester_id)
            .bind(friendship.addressee_id)
            .bind(friendship.status.as_str())
            .bind(friendship.created_at)
            .bind(friendship.responded_at)
            .fetch_one(self.pool())
            .await
            .map_err(|e| conflict_error(e, "Friendship", friendship.addressee_id))?;
        friendship_from_row(row)
    }

    #[instrument(skip(self))]
    async fn get_friendship(&self, id: Uuid) -> StorageResult<Option<Friendship>> {
        let sql = format!("SELECT {FRIENDSHIP_COLUMNS} FROM friendships WHERE id = $1");
        let row: Option<FriendshipRow> = query_as(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(db_error)?;
        row.map(friendship_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn list_friendships(&self, user_id: Uuid) -> StorageResult<Vec<Friendship>> {
        let sql = format!(
            "SELECT {FRIENDSHIP_COLUMNS} FROM friendships \
             WHERE requester_id = $1 OR addressee_id = $1 ORDER BY created_at DESC"
        );
        let rows: Vec<FriendshipRow> = query_as(&sql)
            .bind(user_id)
            .fetch_all(self.pool())
            .await
            .map_err(db_error)?;
        collect_rows(rows, friendship_from_row)
    }

    #[instrument(skip(self, friendship), fields(friendship_id = %friendship.id))]
    async fn update_friendship(&self, friendship: &Friendship) -> StorageResult<Friendship> {
        let sql = format!(
            "UPDATE friendships SET status = $2, responded_at = $3 WHERE id = $1 \
             RETURNING {FRIENDSHIP_COLUMNS}"
        );
        let row: Option<FriendshipRow> = query_as(&sql)
            .bind(friendship.id)
            .bind(friendship.status.as_str())
            .bind(friendship.responded_at)
            .fetch_optional(self.pool())
            .await
            .map_err(db_error)?;
        match row {
            Some(row) => friendship_from_row(row),
            None => Err(not_found("Friendship", friendship.id)),
        }
    }

    #[instrument(skip(self))]
    async fn delete_friendship(&self, id: Uuid) -> StorageResult<bool> {
        let result = query("DELETE FROM friendships WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}
