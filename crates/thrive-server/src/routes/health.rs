//! Health metric logging and summaries.

use axum::Router;
use axum::extract::State;
use axum::routing::{delete, get, post};
use serde::{Deserialize, Serialize};
use thrive_api::{ApiError, ApiResponse, ApiResult};
use thrive_auth::CurrentUser;
use thrive_core::model::{HealthLog, HealthMetric};
use thrive_core::now_utc;
use thrive_storage::prelude::*;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use super::tasks::Deleted;
use super::{IdPath, JsonBody, QueryParams, optional_text, parse_param, parse_time_param, window_days};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/health/logs", post(create_log).get(list_logs))
        .route("/api/health/logs/{id}", delete(delete_log))
        .route("/api/health/summary", get(summary))
}

const MAX_UNIT_CHARS: usize = 20;
const MAX_NOTE_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLogRequest {
    pub metric: HealthMetric,
    pub value: f64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub logged_at: Option<OffsetDateTime>,
}

async fn create_log(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    JsonBody(req): JsonBody<CreateLogRequest>,
) -> ApiResult<HealthLog> {
    req.metric.validate(req.value)?;
    let now = now_utc();
    let logged_at = req.logged_at.unwrap_or(now);
    if logged_at > now + Duration::minutes(5) {
        return Err(ApiError::bad_request("loggedAt cannot be in the future"));
    }

    let log = HealthLog {
        id: Uuid::new_v4(),
        user_id: auth.user_id,
        metric: req.metric,
        value: req.value,
        unit: optional_text(req.unit.as_deref(), "unit", MAX_UNIT_CHARS)?
            .unwrap_or_else(|| req.metric.default_unit().to_string()),
        note: optional_text(req.note.as_deref(), "note", MAX_NOTE_CHARS)?,
        logged_at,
        created_at: now,
    };
    let log = state.storage.create_health_log(&log).await?;
    tracing::debug!(user_id = %auth.user_id, metric = %log.metric, "health log recorded");
    Ok(ApiResponse::created(log))
}

#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub metric: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<usize>,
}

async fn list_logs(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    QueryParams(query): QueryParams<LogQuery>,
) -> ApiResult<Vec<HealthLog>> {
    let filter = HealthLogFilter {
        metric: parse_param(query.metric.as_deref())?,
        from: parse_time_param(query.from.as_deref())?,
        to: parse_time_param(query.to.as_deref())?,
        limit: page_size(query.limit),
    };
    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        if to < from {
            return Err(ApiError::bad_request("to must not be before from"));
        }
    }
    Ok(ApiResponse::ok(
        state.storage.list_health_logs(auth.user_id, &filter).await?,
    ))
}

async fn delete_log(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    IdPath(id): IdPath,
) -> ApiResult<Deleted> {
    if !state.storage.delete_health_log(auth.user_id, id).await? {
        return Err(ApiError::not_found("Health log not found"));
    }
    Ok(ApiResponse::ok(Deleted { deleted: true, id }))
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSummary {
    pub days: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub since: OffsetDateTime,
    pub metrics: Vec<HealthMetricSummary>,
}

async fn summary(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    QueryParams(query): QueryParams<SummaryQuery>,
) -> ApiResult<HealthSummary> {
    let days = window_days(query.days)?;
    let since = now_utc() - Duration::days(i64::from(days));
    let metrics = state.storage.health_summary(auth.user_id, since).await?;
    Ok(ApiResponse::ok(HealthSummary {
        days,
        since,
        metrics,
    }))
}
