use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use serde::{Deserialize, Deserializer};
use thrive_api::{ApiError, ApiResponse, ApiResult};
use thrive_auth::CurrentUser;
use thrive_core::model::{CalendarEvent, EventSource};
use thrive_core::now_utc;
use thrive_storage::prelude::*;
use time::OffsetDateTime;
use uuid::Uuid;

use super::tasks::Deleted;
use super::{IdPath, JsonBody, QueryParams, nullable, optional_text, parse_time_param, required_text};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/calendar/events", post(create_event).get(list_events))
        .route(
            "/api/calendar/events/{id}",
            get(get_event).patch(update_event).delete(delete_event),
        )
}

const MAX_TITLE_CHARS: usize = 200;
const MAX_TEXT_CHARS: usize = 2000;

fn check_range(starts_at: OffsetDateTime, ends_at: OffsetDateTime) -> Result<(), ApiError> {
    if ends_at < starts_at {
        return Err(ApiError::bad_request("endsAt must not be before startsAt"));
    }
    Ok(())
}

fn event_not_found() -> ApiError {
    ApiError::not_found("Calendar event not found")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub starts_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub ends_at: OffsetDateTime,
    #[serde(default)]
    pub all_day: bool,
    /// Set by importers; user-created events are `local`.
    #[serde(default)]
    pub source: Option<EventSource>,
    #[serde(default)]
    pub external_id: Option<String>,
}

async fn create_event(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    JsonBody(req): JsonBody<CreateEventRequest>,
) -> ApiResult<CalendarEvent> {
    check_range(req.starts_at, req.ends_at)?;
    let now = now_utc();
    let event = CalendarEvent {
        id: Uuid::new_v4(),
        user_id: auth.user_id,
        title: required_text(&req.title, "title", MAX_TITLE_CHARS)?,
        description: optional_text(req.description.as_deref(), "description", MAX_TEXT_CHARS)?,
        location: optional_text(req.location.as_deref(), "location", MAX_TITLE_CHARS)?,
        starts_at: req.starts_at,
        ends_at: req.ends_at,
        all_day: req.all_day,
        source: req.source.unwrap_or(EventSource::Local),
        external_id: optional_text(req.external_id.as_deref(), "externalId", MAX_TITLE_CHARS)?,
        created_at: now,
        updated_at: now,
    };
    Ok(ApiResponse::created(
        state.storage.create_calendar_event(&event).await?,
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct EventQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

async fn list_events(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    QueryParams(query): QueryParams<EventQuery>,
) -> ApiResult<Vec<CalendarEvent>> {
    let from = parse_time_param(query.from.as_deref())?;
    let to = parse_time_param(query.to.as_deref())?;
    if let (Some(from), Some(to)) = (from, to) {
        check_range(from, to)?;
    }
    Ok(ApiResponse::ok(
        state
            .storage
            .list_calendar_events(auth.user_id, from, to)
            .await?,
    ))
}

async fn get_event(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    IdPath(id): IdPath,
) -> ApiResult<CalendarEvent> {
    let event = state
        .storage
        .get_calendar_event(auth.user_id, id)
        .await?
        .ok_or_else(event_not_found)?;
    Ok(ApiResponse::ok(event))
}

fn rfc3339_some<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    time::serde::rfc3339::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "rfc3339_some")]
    pub starts_at: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "rfc3339_some")]
    pub ends_at: Option<OffsetDateTime>,
    pub all_day: Option<bool>,
}

async fn update_event(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    IdPath(id): IdPath,
    JsonBody(req): JsonBody<UpdateEventRequest>,
) -> ApiResult<CalendarEvent> {
    let mut event = state
        .storage
        .get_calendar_event(auth.user_id, id)
        .await?
        .ok_or_else(event_not_found)?;

    if let Some(title) = req.title.as_deref() {
        event.title = required_text(title, "title", MAX_TITLE_CHARS)?;
    }
    if let Some(description) = req.description {
        event.description = optional_text(description.as_deref(), "description", MAX_TEXT_CHARS)?;
    }
    if let Some(location) = req.location {
        event.location = optional_text(location.as_deref(), "location", MAX_TITLE_CHARS)?;
    }
    if let Some(starts_at) = req.starts_at {
        event.starts_at = starts_at;
    }
    if let Some(ends_at) = req.ends_at {
        event.ends_at = ends_at;
    }
    if let Some(all_day) = req.all_day {
        event.all_day = all_day;
    }
    check_range(event.starts_at, event.ends_at)?;
    event.updated_at = now_utc();

    Ok(ApiResponse::ok(
        state.storage.update_calendar_event(&event).await?,
    ))
}

async fn delete_event(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    IdPath(id): IdPath,
) -> ApiResult<Deleted> {
    if !state.storage.delete_calendar_event(auth.user_id, id).await? {
        return Err(event_not_found());
    }
    Ok(ApiResponse::ok(Deleted { deleted: true, id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn range_allows_zero_length() {
        let at = datetime!(2025-01-15 09:00 UTC);
        assert!(check_range(at, at).is_ok());
        assert!(check_range(at, datetime!(2025-01-15 08:59 UTC)).is_err());
    }

    #[test]
    fn patch_parses_partial_times() {
        let req: UpdateEventRequest =
            serde_json::from_str(r#"{"endsAt":"2025-01-15T11:00:00Z","location":null}"#).unwrap();
        assert_eq!(req.ends_at, Some(datetime!(2025-01-15 11:00 UTC)));
        assert_eq!(req.starts_at, None);
        assert_eq!(req.location, Some(None));
    }
}
