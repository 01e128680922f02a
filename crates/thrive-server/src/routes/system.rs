//! Liveness, schema bootstrap and the Prometheus scrape endpoint.

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Serialize;
use thrive_api::{ApiError, ApiResponse, ApiResult};
use thrive_storage::prelude::*;

use crate::metrics;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/init-db", post(init_db))
        .route("/metrics", get(prometheus_metrics))
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub backend: &'static str,
}

async fn health(State(state): State<AppState>) -> ApiResult<HealthStatus> {
    state.storage.ping().await.map_err(|e| {
        tracing::warn!(error = %e, "storage ping failed");
        ApiError::internal("Storage is unavailable")
    })?;
    Ok(ApiResponse::ok(HealthStatus {
        status: "ok",
        service: "thrive",
        version: env!("CARGO_PKG_VERSION"),
        backend: state.storage.backend_name(),
    }))
}

#[derive(Debug, Serialize)]
pub struct InitDbResult {
    pub applied: Vec<MigrationStatus>,
    pub migrations: Vec<MigrationStatus>,
}

/// Idempotent: a second call applies nothing.
async fn init_db(State(state): State<AppState>) -> ApiResult<InitDbResult> {
    let applied = state.storage.run_migrations().await?;
    let migrations = state.storage.migration_status().await?;
    tracing::info!(applied = applied.len(), "schema bootstrap finished");
    Ok(ApiResponse::ok(InitDbResult {
        applied,
        migrations,
    }))
}

async fn prometheus_metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    if !state.config.metrics.enabled {
        return Err(ApiError::not_found("Metrics are disabled"));
    }
    let body = metrics::render_metrics()
        .ok_or_else(|| ApiError::not_found("Metrics are not initialized"))?;
    let mut response = (StatusCode::OK, body).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4"),
    );
    Ok(response)
}
