//! Focus sessions: start, complete, abandon and weekly stats.

use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use thrive_api::{ApiError, ApiResponse, ApiResult};
use thrive_auth::CurrentUser;
use thrive_core::model::{FocusSession, FocusStatus, FocusTemplate, focus_template, focus_templates};
use thrive_core::{BadgeDefinition, RealtimeEventKind, now_utc};
use thrive_storage::prelude::*;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use super::{IdPath, JsonBody, OptionalJson, QueryParams, window_days};
use crate::metrics;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/focus/templates", get(templates))
        .route("/api/focus/sessions", post(start_session).get(list_sessions))
        .route("/api/focus/sessions/{id}/complete", post(complete_session))
        .route("/api/focus/sessions/{id}/abandon", post(abandon_session))
        .route("/api/focus/stats", get(stats))
}

const MAX_PLANNED_MINUTES: u32 = 240;

async fn templates() -> ApiResult<&'static [FocusTemplate]> {
    Ok(ApiResponse::ok(focus_templates()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub planned_minutes: Option<u32>,
    #[serde(default)]
    pub task_id: Option<Uuid>,
}

/// Resolves the planned length: an explicit value wins over the template.
fn planned_minutes(req: &StartSessionRequest) -> Result<u32, ApiError> {
    let template = req
        .template_id
        .as_deref()
        .map(|id| {
            focus_template(id).ok_or_else(|| ApiError::bad_request(format!("Unknown template: {id}")))
        })
        .transpose()?;
    let minutes = req
        .planned_minutes
        .or(template.map(|t| t.focus_minutes))
        .ok_or_else(|| ApiError::bad_request("templateId or plannedMinutes is required"))?;
    if !(1..=MAX_PLANNED_MINUTES).contains(&minutes) {
        return Err(ApiError::bad_request(
            "plannedMinutes must be between 1 and 240",
        ));
    }
    Ok(minutes)
}

async fn start_session(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    JsonBody(req): JsonBody<StartSessionRequest>,
) -> ApiResult<FocusSession> {
    let planned = planned_minutes(&req)?;
    if let Some(task_id) = req.task_id {
        state
            .storage
            .get_task(auth.user_id, task_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Task not found"))?;
    }

    let session = FocusSession {
        id: Uuid::new_v4(),
        user_id: auth.user_id,
        task_id: req.task_id,
        template_id: req.template_id.clone(),
        planned_minutes: planned,
        actual_minutes: None,
        status: FocusStatus::Active,
        interruptions: 0,
        started_at: now_utc(),
        ended_at: None,
    };
    let session = state.storage.create_focus_session(&session).await.map_err(|e| {
        if e.is_already_exists() {
            ApiError::conflict("A focus session is already active")
        } else {
            e.into()
        }
    })?;
    state.events.publish(
        auth.user_id,
        RealtimeEventKind::FocusStarted,
        session.id,
        &session,
    );
    Ok(ApiResponse::created(session))
}

async fn active_session(state: &AppState, user_id: Uuid, id: Uuid) -> Result<FocusSession, ApiError> {
    let session = state
        .storage
        .get_focus_session(user_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Focus session not found"))?;
    if session.status != FocusStatus::Active {
        return Err(ApiError::conflict(format!(
            "Focus session is already {}",
            session.status
        )));
    }
    Ok(session)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSessionRequest {
    #[serde(default)]
    pub actual_minutes: Option<u32>,
    #[serde(default)]
    pub interruptions: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedSession {
    pub session: FocusSession,
    pub unlocked_badges: Vec<&'static BadgeDefinition>,
}

async fn complete_session(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    IdPath(id): IdPath,
    OptionalJson(body): OptionalJson<CompleteSessionRequest>,
) -> ApiResult<CompletedSession> {
    let body = body.unwrap_or_default();
    let mut session = active_session(&state, auth.user_id, id).await?;
    let now = now_utc();

    let minutes = session.resolve_actual_minutes(body.actual_minutes, now);
    session.actual_minutes = Some(minutes);
    session.interruptions = body.interruptions.unwrap_or(session.interruptions);
    session.status = FocusStatus::Completed;
    session.ended_at = Some(now);
    let session = state.storage.update_focus_session(&session).await?;

    metrics::record_focus_minutes(minutes);
    state.events.publish(
        auth.user_id,
        RealtimeEventKind::FocusCompleted,
        session.id,
        &session,
    );
    let unlocked_badges = state
        .achievements
        .check_and_award(auth.user_id)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(user_id = %auth.user_id, error = %e, "badge check failed");
            Vec::new()
        });

    Ok(ApiResponse::ok(CompletedSession {
        session,
        unlocked_badges,
    }))
}

async fn abandon_session(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    IdPath(id): IdPath,
) -> ApiResult<FocusSession> {
    let mut session = active_session(&state, auth.user_id, id).await?;
    session.status = FocusStatus::Abandoned;
    session.ended_at = Some(now_utc());
    let session = state.storage.update_focus_session(&session).await?;
    state.events.publish(
        auth.user_id,
        RealtimeEventKind::FocusAbandoned,
        session.id,
        &session,
    );
    Ok(ApiResponse::ok(session))
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    pub limit: Option<usize>,
}

async fn list_sessions(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    QueryParams(query): QueryParams<SessionQuery>,
) -> ApiResult<Vec<FocusSession>> {
    Ok(ApiResponse::ok(
        state
            .storage
            .list_focus_sessions(auth.user_id, page_size(query.limit))
            .await?,
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusStats {
    pub days: u32,
    pub total_minutes: u64,
    pub completed: u32,
    pub abandoned: u32,
    pub active: u32,
    /// Percent of finished sessions that were completed, one decimal.
    pub completion_rate: f64,
    pub average_minutes: f64,
}

pub(crate) fn compute_stats(sessions: &[FocusSession], days: u32) -> FocusStats {
    let mut stats = FocusStats {
        days,
        total_minutes: 0,
        completed: 0,
        abandoned: 0,
        active: 0,
        completion_rate: 0.0,
        average_minutes: 0.0,
    };
    for s in sessions {
        match s.status {
            FocusStatus::Completed => {
                stats.completed += 1;
                stats.total_minutes += u64::from(s.actual_minutes.unwrap_or(0));
            }
            FocusStatus::Abandoned => stats.abandoned += 1,
            FocusStatus::Active => stats.active += 1,
        }
    }
    let finished = stats.completed + stats.abandoned;
    if finished > 0 {
        let rate = f64::from(stats.completed) * 100.0 / f64::from(finished);
        stats.completion_rate = (rate * 10.0).round() / 10.0;
    }
    if stats.completed > 0 {
        let avg = stats.total_minutes as f64 / f64::from(stats.completed);
        stats.average_minutes = (avg * 10.0).round() / 10.0;
    }
    stats
}

/// Minutes completed since `since`.
pub(crate) async fn focus_minutes_since(
    state: &AppState,
    user_id: Uuid,
    since: OffsetDateTime,
) -> Result<u64, ApiError> {
    let sessions = state.storage.focus_sessions_since(user_id, since).await?;
    Ok(compute_stats(&sessions, 1).total_minutes)
}

async fn stats(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    QueryParams(query): QueryParams<StatsQuery>,
) -> ApiResult<FocusStats> {
    let days = window_days(query.days)?;
    let since = now_utc() - Duration::days(i64::from(days));
    let sessions = state.storage.focus_sessions_since(auth.user_id, since).await?;
    Ok(ApiResponse::ok(compute_stats(&sessions, days)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(status: FocusStatus, actual: Option<u32>) -> FocusSession {
        FocusSession {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            task_id: None,
            template_id: None,
            planned_minutes: 25,
            actual_minutes: actual,
            status,
            interruptions: 0,
            started_at: now_utc(),
            ended_at: None,
        }
    }

    #[test]
    fn stats_round_completion_rate() {
        let sessions = [
            session(FocusStatus::Completed, Some(25)),
            session(FocusStatus::Completed, Some(20)),
            session(FocusStatus::Abandoned, None),
            session(FocusStatus::Active, None),
        ];
        let stats = compute_stats(&sessions, 7);
        assert_eq!(stats.total_minutes, 45);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.abandoned, 1);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.completion_rate, 66.7);
        assert_eq!(stats.average_minutes, 22.5);
    }

    #[test]
    fn empty_stats_are_zero() {
        let stats = compute_stats(&[], 7);
        assert_eq!(stats.completion_rate, 0.0);
        assert_eq!(stats.total_minutes, 0);
    }

    #[test]
    fn planned_minutes_resolution() {
        let from_template = StartSessionRequest {
            template_id: Some("deep-work".into()),
            ..Default::default()
        };
        assert_eq!(planned_minutes(&from_template).unwrap(), 90);

        let explicit = StartSessionRequest {
            template_id: Some("pomodoro".into()),
            planned_minutes: Some(40),
            ..Default::default()
        };
        assert_eq!(planned_minutes(&explicit).unwrap(), 40);

        assert!(planned_minutes(&StartSessionRequest::default()).is_err());
        let too_long = StartSessionRequest {
            planned_minutes: Some(241),
            ..Default::default()
        };
        assert!(planned_minutes(&too_long).is_err());
        let unknown = StartSessionRequest {
            template_id: Some("nap".into()),
            ..Default::default()
        };
        assert!(planned_minutes(&unknown).is_err());
    }
}
