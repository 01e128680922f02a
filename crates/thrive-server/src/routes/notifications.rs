use axum::Router;
use axum::extract::State;
use axum::routing::{delete, get, post};
use serde::{Deserialize, Serialize};
use thrive_api::{ApiError, ApiResponse, ApiResult};
use thrive_auth::CurrentUser;
use thrive_core::model::Notification;
use thrive_core::now_utc;
use thrive_storage::prelude::*;

use super::tasks::Deleted;
use super::{IdPath, QueryParams};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/unread-count", get(unread_count))
        .route("/api/notifications/read-all", post(read_all))
        .route("/api/notifications/{id}/read", post(mark_read))
        .route("/api/notifications/{id}", delete(delete_notification))
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread: bool,
    pub limit: Option<usize>,
}

async fn list_notifications(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    QueryParams(query): QueryParams<NotificationQuery>,
) -> ApiResult<Vec<Notification>> {
    Ok(ApiResponse::ok(
        state
            .storage
            .list_notifications(auth.user_id, query.unread, page_size(query.limit))
            .await?,
    ))
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread: u64,
}

async fn unread_count(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
) -> ApiResult<UnreadCount> {
    let unread = state.storage.count_unread_notifications(auth.user_id).await?;
    Ok(ApiResponse::ok(UnreadCount { unread }))
}

async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    IdPath(id): IdPath,
) -> ApiResult<Notification> {
    let notification = state
        .storage
        .mark_notification_read(auth.user_id, id, now_utc())
        .await?
        .ok_or_else(|| ApiError::not_found("Notification not found"))?;
    Ok(ApiResponse::ok(notification))
}

#[derive(Debug, Serialize)]
pub struct ReadAll {
    pub updated: u64,
}

async fn read_all(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
) -> ApiResult<ReadAll> {
    let updated = state
        .storage
        .mark_all_notifications_read(auth.user_id, now_utc())
        .await?;
    Ok(ApiResponse::ok(ReadAll { updated }))
}

async fn delete_notification(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    IdPath(id): IdPath,
) -> ApiResult<Deleted> {
    if !state.storage.delete_notification(auth.user_id, id).await? {
        return Err(ApiError::not_found("Notification not found"));
    }
    Ok(ApiResponse::ok(Deleted { deleted: true, id }))
}
