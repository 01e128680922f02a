use std::collections::HashMap;

use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use serde::Serialize;
use thrive_api::{ApiResponse, ApiResult};
use thrive_auth::CurrentUser;
use thrive_core::badges::catalog;
use thrive_core::{ActivitySnapshot, BadgeDefinition, now_utc};
use thrive_storage::prelude::*;
use time::OffsetDateTime;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/badges", get(list_badges))
        .route("/api/badges/check", post(check_badges))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub current: u64,
    pub target: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeStatus {
    #[serde(flatten)]
    pub badge: &'static BadgeDefinition,
    pub unlocked: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub unlocked_at: Option<OffsetDateTime>,
    pub progress: Progress,
}

pub(crate) fn badge_statuses(
    snapshot: &ActivitySnapshot,
    unlocked: &HashMap<String, OffsetDateTime>,
) -> Vec<BadgeStatus> {
    catalog()
        .iter()
        .map(|badge| {
            let (current, target) = badge.criterion.progress(snapshot);
            let unlocked_at = unlocked.get(badge.id).copied();
            BadgeStatus {
                badge,
                unlocked: unlocked_at.is_some(),
                unlocked_at,
                progress: Progress {
                    current: current.min(target),
                    target,
                },
            }
        })
        .collect()
}

async fn list_badges(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
) -> ApiResult<Vec<BadgeStatus>> {
    let snapshot = state.achievements.snapshot(auth.user_id, now_utc()).await?;
    let unlocked = state
        .storage
        .list_user_badges(auth.user_id)
        .await?
        .into_iter()
        .map(|b| (b.badge_id, b.unlocked_at))
        .collect();
    Ok(ApiResponse::ok(badge_statuses(&snapshot, &unlocked)))
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub unlocked: Vec<&'static BadgeDefinition>,
}

async fn check_badges(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
) -> ApiResult<CheckResult> {
    let unlocked = state.achievements.check_and_award(auth.user_id).await?;
    Ok(ApiResponse::ok(CheckResult { unlocked }))
}
