//! HTTP handlers, one module per API area.
//!
//! Each module exposes `router()` with its full paths; [`api_router`] merges
//! them. Handlers return `Result<ApiResponse<_>, ApiError>` so every body uses
//! the `{success, data | error}` envelope.

pub mod admin;
pub mod ai;
pub mod analytics;
pub mod auth;
pub mod badges;
pub mod calendar;
mod extract;
pub mod focus;
pub mod health;
pub mod localization;
pub mod mobile;
pub mod notifications;
pub mod payments;
pub mod realtime;
pub mod social;
pub mod student;
pub mod system;
pub mod tasks;
pub mod voice;

use axum::Router;
use serde::{Deserialize, Deserializer};
use thrive_api::ApiError;
use thrive_core::parse_rfc3339;
use time::OffsetDateTime;

use crate::state::AppState;

pub use extract::{IdPath, JsonBody, OptionalJson, QueryParams};

pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(system::router())
        .merge(auth::router())
        .merge(tasks::router())
        .merge(health::router())
        .merge(focus::router())
        .merge(calendar::router())
        .merge(notifications::router())
        .merge(realtime::router())
        .merge(social::router())
        .merge(payments::router())
        .merge(student::router())
        .merge(localization::router())
        .merge(badges::router())
        .merge(admin::router())
        .merge(analytics::router())
        .merge(mobile::router())
        .merge(ai::router())
        .merge(voice::router())
}

/// Trims `value` and checks its length in characters.
pub(crate) fn required_text(value: &str, field: &str, max_chars: usize) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request(format!("{field} is required")));
    }
    if trimmed.chars().count() > max_chars {
        return Err(ApiError::bad_request(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Like [`required_text`] but blank input becomes `None`.
pub(crate) fn optional_text(
    value: Option<&str>,
    field: &str,
    max_chars: usize,
) -> Result<Option<String>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => required_text(v, field, max_chars).map(Some),
        None => Ok(None),
    }
}

/// Parses an optional RFC 3339 query parameter.
pub(crate) fn parse_time_param(value: Option<&str>) -> Result<Option<OffsetDateTime>, ApiError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(parse_rfc3339)
        .transpose()
        .map_err(ApiError::from)
}

/// Parses an optional enum query parameter through its `FromStr`.
pub(crate) fn parse_param<T>(value: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: std::str::FromStr<Err = thrive_core::CoreError>,
{
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::parse)
        .transpose()
        .map_err(ApiError::from)
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in PATCH bodies.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// `?days=` window, defaulting to 7 and limited to a year.
pub(crate) fn window_days(days: Option<u32>) -> Result<u32, ApiError> {
    let days = days.unwrap_or(7);
    if !(1..=365).contains(&days) {
        return Err(ApiError::bad_request("days must be between 1 and 365"));
    }
    Ok(days)
}
