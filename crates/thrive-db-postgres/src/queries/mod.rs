//! SQL for each storage aggregate.
//!
//! Rows are fetched as tuples and converted into model records here. Enum
//! columns hold the lowercase text form of their variant; unsigned counters
//! are stored as `INTEGER`.

mod accounts;
mod activity;
mod engagement;
mod platform;

use sqlx_core::types::Json;
use thrive_core::model::{
    CalendarEvent, FocusSession, Friendship, HealthLog, ManagedContent, Notification,
    OtpChallenge, StudentVerification, Subscription, SubscriptionTier, Task, User,
    UserPreferences,
};
use thrive_storage::{StorageError, StorageResult};
use time::OffsetDateTime;
use uuid::Uuid;

pub(crate) fn to_db_int(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

pub(crate) fn from_db_int(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

pub(crate) fn to_db_limit(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub(crate) fn from_db_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

pub(crate) const USER_COLUMNS: &str = "id, email, display_name, password_hash, role, language, \
     country, utc_offset_minutes, tier, preferences, created_at, updated_at";

pub(crate) type UserRow = (
    Uuid,
    String,
    String,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
    i32,
    String,
    Json<UserPreferences>,
    OffsetDateTime,
    OffsetDateTime,
);

pub(crate) fn user_from_row(row: UserRow) -> StorageResult<User> {
    let (
        id,
        email,
        display_name,
        password_hash,
        role,
        language,
        country,
        utc_offset_minutes,
        tier,
        Json(preferences),
        created_at,
        updated_at,
    ) = row;
    Ok(User {
        id,
        email,
        display_name,
        password_hash,
        role: role.parse()?,
        language,
        country,
        utc_offset_minutes,
        tier: tier.parse()?,
        preferences,
        created_at,
        updated_at,
    })
}

pub(crate) const TASK_COLUMNS: &str = "id, user_id, title, description, priority, status, due_at, \
     estimated_minutes, tags, completed_at, created_at, updated_at";

pub(crate) type TaskRow = (
    Uuid,
    Uuid,
    String,
    Option<String>,
    String,
    String,
    Option<OffsetDateTime>,
    Option<i32>,
    Vec<String>,
    Option<OffsetDateTime>,
    OffsetDateTime,
    OffsetDateTime,
);

pub(crate) fn task_from_row(row: TaskRow) -> StorageResult<Task> {
    let (
        id,
        user_id,
        title,
        description,
        priority,
        status,
        due_at,
        estimated_minutes,
        tags,
        completed_at,
        created_at,
        updated_at,
    ) = row;
    Ok(Task {
        id,
        user_id,
        title,
        description,
        priority: priority.parse()?,
        status: status.parse()?,
        due_at,
        estimated_minutes: estimated_minutes.map(from_db_int),
        tags,
        completed_at,
        created_at,
        updated_at,
    })
}

pub(crate) const HEALTH_COLUMNS: &str =
    "id, user_id, metric, value, unit, note, logged_at, created_at";

pub(crate) type HealthRow = (
    Uuid,
    Uuid,
    String,
    f64,
    String,
    Option<String>,
    OffsetDateTime,
    OffsetDateTime,
);

pub(crate) fn health_from_row(row: HealthRow) -> StorageResult<HealthLog> {
    let (id, user_id, metric, value, unit, note, logged_at, created_at) = row;
    Ok(HealthLog {
        id,
        user_id,
        metric: metric.parse()?,
        value,
        unit,
        note,
        logged_at,
        created_at,
    })
}

pub(crate) const FOCUS_COLUMNS: &str = "id, user_id, task_id, template_id, planned_minutes, \
     actual_minutes, status, interruptions, started_at, ended_at";

pub(crate) type FocusRow = (
    Uuid,
    Uuid,
    Option<Uuid>,
    Option<String>,
    i32,
    Option<i32>,
    String,
    i32,
    OffsetDateTime,
    Option<OffsetDateTime>,
);

pub(crate) fn focus_from_row(row: FocusRow) -> StorageResult<FocusSession> {
    let (
        id,
        user_id,
        task_id,
        template_id,
        planned_minutes,
        actual_minutes,
        status,
        interruptions,
        started_at,
        ended_at,
    ) = row;
    Ok(FocusSession {
        id,
        user_id,
        task_id,
        template_id,
        planned_minutes: from_db_int(planned_minutes),
        actual_minutes: actual_minutes.map(from_db_int),
        status: status.parse()?,
        interruptions: from_db_int(interruptions),
        started_at,
        ended_at,
    })
}

pub(crate) const CALENDAR_COLUMNS: &str = "id, user_id, title, description, location, starts_at, \
     ends_at, all_day, source, external_id, created_at, updated_at";

pub(crate) type CalendarRow = (
    Uuid,
    Uuid,
    String,
    Option<String>,
    Option<String>,
    OffsetDateTime,
    OffsetDateTime,
    bool,
    String,
    Option<String>,
    OffsetDateTime,
    OffsetDateTime,
);

pub(crate) fn calendar_from_row(row: CalendarRow) -> StorageResult<CalendarEvent> {
    let (
        id,
        user_id,
        title,
        description,
        location,
        starts_at,
        ends_at,
        all_day,
        source,
        external_id,
        created_at,
        updated_at,
    ) = row;
    Ok(CalendarEvent {
        id,
        user_id,
        title,
        description,
        location,
        starts_at,
        ends_at,
        all_day,
        source: source.parse()?,
        external_id,
        created_at,
        updated_at,
    })
}

pub(crate) const NOTIFICATION_COLUMNS: &str =
    "id, user_id, kind, title, body, data, read_at, created_at";

pub(crate) type NotificationRow = (
    Uuid,
    Uuid,
    String,
    String,
    String,
    Json<serde_json::Value>,
    Option<OffsetDateTime>,
    OffsetDateTime,
);

pub(crate) fn notification_from_row(row: NotificationRow) -> StorageResult<Notification> {
    let (id, user_id, kind, title, body, Json(data), read_at, created_at) = row;
    Ok(Notification {
        id,
        user_id,
        kind: kind.parse()?,
        title,
        body,
        data,
        read_at,
        created_at,
    })
}

pub(crate) const SUBSCRIPTION_COLUMNS: &str =
    "user_id, tier, status, current_period_end, created_at, updated_at";

pub(crate) type SubscriptionRow = (
    Uuid,
    String,
    String,
    Option<OffsetDateTime>,
    OffsetDateTime,
    OffsetDateTime,
);

pub(crate) fn subscription_from_row(row: SubscriptionRow) -> StorageResult<Subscription> {
    let (user_id, tier, status, current_period_end, created_at, updated_at) = row;
    Ok(Subscription {
        user_id,
        tier: tier.parse()?,
        status: status.parse()?,
        current_period_end,
        created_at,
        updated_at,
    })
}

pub(crate) const VERIFICATION_COLUMNS: &str = "id, user_id, school_email, institution, status, \
     rejection_reason, reviewed_by, submitted_at, reviewed_at";

pub(crate) type VerificationRow = (
    Uuid,
    Uuid,
    String,
    String,
    String,
    Option<String>,
    Option<Uuid>,
    OffsetDateTime,
    Option<OffsetDateTime>,
);

pub(crate) fn verification_from_row(row: VerificationRow) -> StorageResult<StudentVerification> {
    let (
        id,
        user_id,
        school_email,
        institution,
        status,
        rejection_reason,
        reviewed_by,
        submitted_at,
        reviewed_at,
    ) = row;
    Ok(StudentVerification {
        id,
        user_id,
        school_email,
        institution,
        status: status.parse()?,
        rejection_reason,
        reviewed_by,
        submitted_at,
        reviewed_at,
    })
}

pub(crate) const CONTENT_COLUMNS: &str = "id, kind, title, body, language, target_tiers, \
     priority, active, valid_from, valid_until, created_at";

pub(crate) type ContentRow = (
    Uuid,
    String,
    String,
    String,
    String,
    Vec<String>,
    i32,
    bool,
    OffsetDateTime,
    Option<OffsetDateTime>,
    OffsetDateTime,
);

pub(crate) fn content_from_row(row: ContentRow) -> StorageResult<ManagedContent> {
    let (
        id,
        kind,
        title,
        body,
        language,
        target_tiers,
        priority,
        active,
        valid_from,
        valid_until,
        created_at,
    ) = row;
    let target_tiers = target_tiers
        .iter()
        .map(|t| t.parse::<SubscriptionTier>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ManagedContent {
        id,
        kind: kind.parse()?,
        title,
        body,
        language,
        target_tiers,
        priority,
        active,
        valid_from,
        valid_until,
        created_at,
    })
}

pub(crate) const FRIENDSHIP_COLUMNS: &str =
    "id, requester_id, addressee_id, status, created_at, responded_at";

pub(crate) type FriendshipRow = (
    Uuid,
    Uuid,
    Uuid,
    String,
    OffsetDateTime,
    Option<OffsetDateTime>,
);

pub(crate) fn friendship_from_row(row: FriendshipRow) -> StorageResult<Friendship> {
    let (id, requester_id, addressee_id, status, created_at, responded_at) = row;
    Ok(Friendship {
        id,
        requester_id,
        addressee_id,
        status: status.parse()?,
        created_at,
        responded_at,
    })
}

pub(crate) type OtpRow = (String, String, OffsetDateTime, i32, OffsetDateTime);

pub(crate) fn otp_from_row(row: OtpRow) -> OtpChallenge {
    let (email, code_hash, expires_at, attempts, last_sent_at) = row;
    OtpChallenge {
        email,
        code_hash,
        expires_at,
        attempts: from_db_int(attempts),
        last_sent_at,
    }
}

/// Converts a list of rows, failing on the first malformed one.
pub(crate) fn collect_rows<R, T>(
    rows: Vec<R>,
    convert: fn(R) -> StorageResult<T>,
) -> StorageResult<Vec<T>> {
    rows.into_iter().map(convert).collect()
}

pub(crate) fn not_found(entity: &str, id: impl ToString) -> StorageError {
    StorageError::not_found(entity, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_conversions_saturate() {
        assert_eq!(to_db_int(u32::MAX), i32::MAX);
        assert_eq!(to_db_int(25), 25);
        assert_eq!(from_db_int(-3), 0);
        assert_eq!(from_db_count(-1), 0);
        assert_eq!(to_db_limit(10), 10);
    }

    #[test]
    fn malformed_enum_column_is_rejected() {
        let now = OffsetDateTime::now_utc();
        let row: FriendshipRow = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "blocked".to_string(),
            now,
            None,
        );
        assert!(friendship_from_row(row).is_err());
    }

    #[test]
    fn content_row_parses_tiers() {
        let now = OffsetDateTime::now_utc();
        let row: ContentRow = (
            Uuid::new_v4(),
            "tip".to_string(),
            "Drink water".to_string(),
            "Stay hydrated".to_string(),
            "en".to_string(),
            vec!["free".to_string(), "student".to_string()],
            3,
            true,
            now,
            None,
            now,
        );
        let content = content_from_row(row).unwrap();
        assert_eq!(
            content.target_tiers,
            vec![SubscriptionTier::Free, SubscriptionTier::Student]
        );
    }
}
