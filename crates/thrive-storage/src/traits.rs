//! Storage traits, one per aggregate.
//!
//! Every user-owned lookup takes the owner's id so a backend can never return
//! another user's row. Missing rows are `Ok(None)` / `Ok(false)`; errors are
//! reserved for infrastructure failures and constraint violations.

use std::collections::HashSet;

use async_trait::async_trait;
use thrive_core::UserBadge;
use thrive_core::model::{
    CalendarEvent, FocusSession, Friendship, HealthLog, ManagedContent, Notification,
    OtpChallenge, StudentVerification, Subscription, Task, User,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StorageError;
use crate::types::{
    HealthLogFilter, HealthMetricSummary, MigrationStatus, PlatformStats,
    StudentVerificationFilter, TaskFilter,
};

type Result<T> = std::result::Result<T, StorageError>;

#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Fails with `AlreadyExists` when the email is taken.
    async fn create_user(&self, user: &User) -> Result<User>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
    /// `email` must already be normalized.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Fails with `NotFound` when the user does not exist.
    async fn update_user(&self, user: &User) -> Result<User>;
    /// Oldest first.
    async fn list_users(&self, limit: usize, offset: usize) -> Result<Vec<User>>;
}

#[async_trait]
pub trait TaskStorage: Send + Sync {
    async fn create_task(&self, task: &Task) -> Result<Task>;
    async fn get_task(&self, user_id: Uuid, id: Uuid) -> Result<Option<Task>>;
    async fn list_tasks(&self, user_id: Uuid, filter: &TaskFilter) -> Result<Vec<Task>>;
    /// Fails with `NotFound` unless the task exists for `task.user_id`.
    async fn update_task(&self, task: &Task) -> Result<Task>;
    async fn delete_task(&self, user_id: Uuid, id: Uuid) -> Result<bool>;
    /// `completed_at` of every done task, oldest first.
    async fn task_completion_times(&self, user_id: Uuid) -> Result<Vec<OffsetDateTime>>;
    async fn count_tasks_completed_since(&self, user_id: Uuid, since: OffsetDateTime)
    -> Result<u64>;
}

#[async_trait]
pub trait HealthStorage: Send + Sync {
    async fn create_health_log(&self, log: &HealthLog) -> Result<HealthLog>;
    async fn list_health_logs(
        &self,
        user_id: Uuid,
        filter: &HealthLogFilter,
    ) -> Result<Vec<HealthLog>>;
    async fn delete_health_log(&self, user_id: Uuid, id: Uuid) -> Result<bool>;
    /// One entry per metric logged at or after `since`, ordered by metric name.
    async fn health_summary(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
    ) -> Result<Vec<HealthMetricSummary>>;
}

#[async_trait]
pub trait FocusStorage: Send + Sync {
    /// Fails with `AlreadyExists` when the user already has an active session.
    async fn create_focus_session(&self, session: &FocusSession) -> Result<FocusSession>;
    async fn get_focus_session(&self, user_id: Uuid, id: Uuid) -> Result<Option<FocusSession>>;
    async fn active_focus_session(&self, user_id: Uuid) -> Result<Option<FocusSession>>;
    async fn update_focus_session(&self, session: &FocusSession) -> Result<FocusSession>;
    /// Newest first.
    async fn list_focus_sessions(&self, user_id: Uuid, limit: usize) -> Result<Vec<FocusSession>>;
    async fn focus_sessions_since(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
    ) -> Result<Vec<FocusSession>>;
    /// Sum of `actual_minutes` over completed sessions.
    async fn total_focus_minutes(&self, user_id: Uuid) -> Result<u64>;
}

#[async_trait]
pub trait CalendarStorage: Send + Sync {
    async fn create_calendar_event(&self, event: &CalendarEvent) -> Result<CalendarEvent>;
    async fn get_calendar_event(&self, user_id: Uuid, id: Uuid) -> Result<Option<CalendarEvent>>;
    /// Events overlapping `[from, to)`, ordered by start.
    async fn list_calendar_events(
        &self,
        user_id: Uuid,
        from: Option<OffsetDateTime>,
        to: Option<OffsetDateTime>,
    ) -> Result<Vec<CalendarEvent>>;
    async fn update_calendar_event(&self, event: &CalendarEvent) -> Result<CalendarEvent>;
    async fn delete_calendar_event(&self, user_id: Uuid, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait BadgeStorage: Send + Sync {
    /// Inserts unless the user already holds the badge. Returns whether a row
    /// was inserted.
    async fn award_badge(&self, badge: &UserBadge) -> Result<bool>;
    async fn list_user_badges(&self, user_id: Uuid) -> Result<Vec<UserBadge>>;

    async fn unlocked_badge_ids(&self, user_id: Uuid) -> Result<HashSet<String>> {
        Ok(self
            .list_user_badges(user_id)
            .await?
            .into_iter()
            .map(|b| b.badge_id)
            .collect())
    }
}

#[async_trait]
pub trait NotificationStorage: Send + Sync {
    async fn create_notification(&self, notification: &Notification) -> Result<Notification>;
    /// Newest first.
    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Notification>>;
    async fn count_unread_notifications(&self, user_id: Uuid) -> Result<u64>;
    /// Returns `None` when the notification does not exist. Already read
    /// notifications keep their original `read_at`.
    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        id: Uuid,
        at: OffsetDateTime,
    ) -> Result<Option<Notification>>;
    /// Returns how many notifications changed.
    async fn mark_all_notifications_read(&self, user_id: Uuid, at: OffsetDateTime) -> Result<u64>;
    async fn delete_notification(&self, user_id: Uuid, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait SubscriptionStorage: Send + Sync {
    async fn get_subscription(&self, user_id: Uuid) -> Result<Option<Subscription>>;
    async fn upsert_subscription(&self, subscription: &Subscription) -> Result<Subscription>;
}

#[async_trait]
pub trait StudentStorage: Send + Sync {
    /// Fails with `AlreadyExists` when the user has a pending or verified request.
    async fn create_student_verification(
        &self,
        verification: &StudentVerification,
    ) -> Result<StudentVerification>;
    async fn get_student_verification(&self, id: Uuid) -> Result<Option<StudentVerification>>;
    async fn latest_student_verification(
        &self,
        user_id: Uuid,
    ) -> Result<Option<StudentVerification>>;
    /// Oldest submission first.
    async fn list_student_verifications(
        &self,
        filter: &StudentVerificationFilter,
    ) -> Result<Vec<StudentVerification>>;
    async fn update_student_verification(
        &self,
        verification: &StudentVerification,
    ) -> Result<StudentVerification>;
}

#[async_trait]
pub trait ContentStorage: Send + Sync {
    async fn create_content(&self, content: &ManagedContent) -> Result<ManagedContent>;
    /// Newest first.
    async fn list_content(&self) -> Result<Vec<ManagedContent>>;
    async fn delete_content(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait SocialStorage: Send + Sync {
    /// Fails with `AlreadyExists` when any friendship row links the two users.
    async fn create_friendship(&self, friendship: &Friendship) -> Result<Friendship>;
    async fn get_friendship(&self, id: Uuid) -> Result<Option<Friendship>>;
    /// Rows where the user is either party, newest first.
    async fn list_friendships(&self, user_id: Uuid) -> Result<Vec<Friendship>>;
    async fn update_friendship(&self, friendship: &Friendship) -> Result<Friendship>;
    async fn delete_friendship(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait OtpStorage: Send + Sync {
    /// Replaces any challenge for the same email.
    async fn put_otp(&self, challenge: &OtpChallenge) -> Result<()>;
    async fn get_otp(&self, email: &str) -> Result<Option<OtpChallenge>>;
    /// Increments the attempt counter and returns the updated challenge.
    async fn record_otp_attempt(&self, email: &str) -> Result<Option<OtpChallenge>>;
    async fn delete_otp(&self, email: &str) -> Result<()>;
}

#[async_trait]
pub trait AnalyticsStorage: Send + Sync {
    async fn platform_stats(&self) -> Result<PlatformStats>;
}

/// Schema management and liveness.
#[async_trait]
pub trait SchemaStorage: Send + Sync {
    /// Applies pending migrations; returns the versions applied by this call.
    async fn run_migrations(&self) -> Result<Vec<MigrationStatus>>;
    async fn migration_status(&self) -> Result<Vec<MigrationStatus>>;
    async fn ping(&self) -> Result<()>;
    fn backend_name(&self) -> &'static str;
}

/// Everything a backend must provide to serve the API.
pub trait Storage:
    UserStorage
    + TaskStorage
    + HealthStorage
    + FocusStorage
    + CalendarStorage
    + BadgeStorage
    + NotificationStorage
    + SubscriptionStorage
    + StudentStorage
    + ContentStorage
    + SocialStorage
    + OtpStorage
    + AnalyticsStorage
    + SchemaStorage
{
}

impl<T> Storage for T where
    T: UserStorage
        + TaskStorage
        + HealthStorage
        + FocusStorage
        + CalendarStorage
        + BadgeStorage
        + NotificationStorage
        + SubscriptionStorage
        + StudentStorage
        + ContentStorage
        + SocialStorage
        + OtpStorage
        + AnalyticsStorage
        + SchemaStorage
{
}
