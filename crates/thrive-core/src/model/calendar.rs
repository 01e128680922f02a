use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

string_enum! {
    /// Where an event came from. Only `local` events are created through the API.
    pub enum EventSource ("source") {
        Local => "local",
        Google => "google",
        Outlook => "outlook",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub starts_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub ends_at: OffsetDateTime,
    #[serde(default)]
    pub all_day: bool,
    pub source: EventSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl CalendarEvent {
    /// Whether the event intersects the half-open window `[from, to)`.
    pub fn overlaps(&self, from: Option<OffsetDateTime>, to: Option<OffsetDateTime>) -> bool {
        let after_from = from.is_none_or(|f| self.ends_at > f || self.starts_at >= f);
        let before_to = to.is_none_or(|t| self.starts_at < t);
        after_from && before_to
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn event(start: OffsetDateTime, end: OffsetDateTime) -> CalendarEvent {
        CalendarEvent {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Standup".into(),
            description: None,
            location: None,
            starts_at: start,
            ends_at: end,
            all_day: false,
            source: EventSource::Local,
            external_id: None,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn overlap_window() {
        let e = event(datetime!(2025-01-15 09:00 UTC), datetime!(2025-01-15 10:00 UTC));
        assert!(e.overlaps(None, None));
        assert!(e.overlaps(Some(datetime!(2025-01-15 09:30 UTC)), None));
        assert!(!e.overlaps(Some(datetime!(2025-01-15 10:00 UTC)), None));
        assert!(!e.overlaps(None, Some(datetime!(2025-01-15 09:00 UTC))));
        assert!(e.overlaps(
            Some(datetime!(2025-01-15 00:00 UTC)),
            Some(datetime!(2025-01-16 00:00 UTC))
        ));
    }
}
