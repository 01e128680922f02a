//! Persisted domain records.
//!
//! Every record is owned by a user id and carries its own timestamps. Status
//! and category columns are closed enums that round-trip through their
//! lowercase text form (`as_str` / `FromStr`), which is also how they are
//! stored in the database.

mod calendar;
mod content;
mod focus;
mod health;
mod notification;
mod social;
mod student;
mod subscription;
mod task;
mod user;

pub use calendar::{CalendarEvent, EventSource};
pub use content::{ContentKind, ManagedContent};
pub use focus::{FocusSession, FocusStatus, FocusTemplate, focus_template, focus_templates};
pub use health::{HealthLog, HealthMetric};
pub use notification::{Notification, NotificationKind};
pub use social::{Friendship, FriendshipStatus};
pub use student::{StudentVerification, VerificationStatus, is_academic_email};
pub use subscription::{Subscription, SubscriptionStatus, SubscriptionTier};
pub use task::{Task, TaskPriority, TaskStatus};
pub use user::{OtpChallenge, Theme, User, UserPreferences, UserRole, normalize_email};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_enums_round_trip_text() {
        for status in TaskStatus::ALL {
            let parsed: TaskStatus = status.as_str().parse().unwrap();
            assert_eq!(&parsed, status);
        }
        assert_eq!("PAST_DUE".parse::<SubscriptionStatus>().unwrap(), SubscriptionStatus::PastDue);
    }

    #[test]
    fn string_enum_rejects_unknown() {
        let err = "someday".parse::<TaskStatus>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for status: someday");
    }

    #[test]
    fn serde_uses_same_names() {
        let json = serde_json::to_string(&NotificationKind::BadgeUnlocked).unwrap();
        assert_eq!(json, "\"badge_unlocked\"");
    }
}
