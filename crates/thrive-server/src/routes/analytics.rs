//! Admin analytics and schema status.

use axum::Router;
use axum::extract::State;
use axum::routing::get;
use serde::Serialize;
use thrive_api::{ApiResponse, ApiResult};
use thrive_auth::AdminUser;
use thrive_core::now_utc;
use thrive_storage::prelude::*;
use time::OffsetDateTime;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/metrics/analytics", get(analytics))
        .route("/api/migrations/status", get(migration_status))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    #[serde(flatten)]
    pub totals: PlatformStats,
    /// Share of tasks that are done, percent with one decimal.
    pub task_completion_rate: f64,
    pub realtime_subscribers: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
}

fn completion_rate(stats: &PlatformStats) -> f64 {
    if stats.tasks == 0 {
        return 0.0;
    }
    let rate = stats.completed_tasks as f64 * 100.0 / stats.tasks as f64;
    (rate * 10.0).round() / 10.0
}

async fn analytics(State(state): State<AppState>, AdminUser(_): AdminUser) -> ApiResult<Analytics> {
    let totals = state.storage.platform_stats().await?;
    Ok(ApiResponse::ok(Analytics {
        task_completion_rate: completion_rate(&totals),
        realtime_subscribers: state.events.subscriber_count(),
        generated_at: now_utc(),
        totals,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaStatus {
    pub backend: &'static str,
    pub up_to_date: bool,
    pub migrations: Vec<MigrationStatus>,
}

async fn migration_status(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> ApiResult<SchemaStatus> {
    let migrations = state.storage.migration_status().await?;
    Ok(ApiResponse::ok(SchemaStatus {
        backend: state.storage.backend_name(),
        up_to_date: migrations.iter().all(|m| m.applied),
        migrations,
    }))
}
