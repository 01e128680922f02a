use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::error::{CoreError, Result};

/// Current UTC timestamp.
pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Parse an RFC 3339 timestamp.
pub fn parse_rfc3339(value: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(value, &Rfc3339)
        .map_err(|e| CoreError::invalid_date_time(format!("'{value}': {e}")))
}

/// Format a timestamp as RFC 3339, falling back to the unix timestamp.
pub fn to_rfc3339(value: OffsetDateTime) -> String {
    value
        .format(&Rfc3339)
        .unwrap_or_else(|_| value.unix_timestamp().to_string())
}

/// Build a fixed UTC offset from minutes, clamped to the valid range.
pub fn offset_from_minutes(minutes: i32) -> UtcOffset {
    let clamped = minutes.clamp(-(25 * 60 - 1), 25 * 60 - 1);
    UtcOffset::from_whole_seconds(clamped * 60).unwrap_or(UtcOffset::UTC)
}

/// Convert a UTC timestamp into the user's local wall clock.
pub fn to_local(value: OffsetDateTime, utc_offset_minutes: i32) -> OffsetDateTime {
    value.to_offset(offset_from_minutes(utc_offset_minutes))
}

/// Local calendar date of a timestamp for a user.
pub fn local_date(value: OffsetDateTime, utc_offset_minutes: i32) -> Date {
    to_local(value, utc_offset_minutes).date()
}

/// Start of the local day containing `value`, expressed in UTC.
pub fn start_of_local_day(value: OffsetDateTime, utc_offset_minutes: i32) -> OffsetDateTime {
    let local = to_local(value, utc_offset_minutes);
    local
        .replace_time(time::Time::MIDNIGHT)
        .to_offset(UtcOffset::UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parse_and_format_round() {
        let ts = parse_rfc3339("2025-01-15T10:30:00Z").unwrap();
        assert_eq!(to_rfc3339(ts), "2025-01-15T10:30:00Z");
        assert!(parse_rfc3339("15/01/2025").is_err());
    }

    #[test]
    fn local_date_crosses_midnight() {
        let ts = datetime!(2025-01-15 23:30 UTC);
        assert_eq!(local_date(ts, 60).to_string(), "2025-01-16");
        assert_eq!(local_date(ts, -60).to_string(), "2025-01-15");
    }

    #[test]
    fn start_of_day_in_utc() {
        let ts = datetime!(2025-01-15 02:00 UTC);
        // 02:00 UTC is 21:00 on the 14th at UTC-5
        let start = start_of_local_day(ts, -300);
        assert_eq!(start, datetime!(2025-01-14 05:00 UTC));
    }

    #[test]
    fn offset_is_clamped() {
        assert_eq!(offset_from_minutes(10_000).whole_hours(), 24);
    }
}
