use std::collections::BTreeSet;

use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thrive_api::{ApiError, ApiResponse, ApiResult};
use thrive_auth::CurrentUser;
use thrive_core::model::{Task, TaskPriority, TaskStatus};
use thrive_core::{BadgeDefinition, RealtimeEvent, RealtimeEventKind, now_utc};
use thrive_storage::prelude::*;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{IdPath, JsonBody, QueryParams, nullable, optional_text, parse_param, required_text};
use crate::metrics;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tasks", post(create_task).get(list_tasks))
        .route(
            "/api/tasks/{id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/api/tasks/{id}/complete", post(complete_task))
}

const MAX_TITLE_CHARS: usize = 200;
const MAX_DESCRIPTION_CHARS: usize = 5000;
const MAX_ESTIMATE_MINUTES: u32 = 1440;
const MAX_TAGS: usize = 20;
const MAX_TAG_CHARS: usize = 40;

fn check_estimate(minutes: Option<u32>) -> Result<Option<u32>, ApiError> {
    match minutes {
        Some(m) if m > MAX_ESTIMATE_MINUTES => Err(ApiError::bad_request(
            "estimatedMinutes must be at most 1440",
        )),
        other => Ok(other),
    }
}

/// Trims, lowercases and dedupes tags, keeping first-seen order.
pub(crate) fn normalize_tags(tags: Vec<String>) -> Result<Vec<String>, ApiError> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() {
            continue;
        }
        if tag.chars().count() > MAX_TAG_CHARS {
            return Err(ApiError::bad_request(format!(
                "tags must be at most {MAX_TAG_CHARS} characters"
            )));
        }
        if seen.insert(tag.clone()) {
            out.push(tag);
        }
    }
    if out.len() > MAX_TAGS {
        return Err(ApiError::bad_request(format!("at most {MAX_TAGS} tags are allowed")));
    }
    Ok(out)
}

fn task_not_found() -> ApiError {
    ApiError::not_found("Task not found")
}

/// Stores a new task, then counts and announces it.
pub(crate) async fn insert_task(state: &AppState, task: &Task) -> Result<Task, ApiError> {
    let task = state.storage.create_task(task).await?;
    metrics::record_task_created();
    state
        .events
        .publish(task.user_id, RealtimeEventKind::TaskCreated, task.id, &task);
    Ok(task)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub due_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub estimated_minutes: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

async fn create_task(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    JsonBody(req): JsonBody<CreateTaskRequest>,
) -> ApiResult<Task> {
    let mut task = Task::new(auth.user_id, required_text(&req.title, "title", MAX_TITLE_CHARS)?);
    task.description = optional_text(req.description.as_deref(), "description", MAX_DESCRIPTION_CHARS)?;
    task.priority = req.priority.unwrap_or_default();
    task.due_at = req.due_at;
    task.estimated_minutes = check_estimate(req.estimated_minutes)?;
    task.tags = normalize_tags(req.tags)?;

    let task = insert_task(&state, &task).await?;
    Ok(ApiResponse::created(task))
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub tag: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

async fn list_tasks(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    QueryParams(query): QueryParams<TaskListQuery>,
) -> ApiResult<Vec<Task>> {
    let filter = TaskFilter {
        status: parse_param(query.status.as_deref())?,
        priority: parse_param(query.priority.as_deref())?,
        tag: query
            .tag
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty()),
        limit: page_size(query.limit),
        offset: query.offset.unwrap_or(0),
    };
    Ok(ApiResponse::ok(state.storage.list_tasks(auth.user_id, &filter).await?))
}

async fn get_task(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    IdPath(id): IdPath,
) -> ApiResult<Task> {
    let task = state
        .storage
        .get_task(auth.user_id, id)
        .await?
        .ok_or_else(task_not_found)?;
    Ok(ApiResponse::ok(task))
}

/// Absent fields are left alone; `null` clears a nullable field.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "nullable_time")]
    pub due_at: Option<Option<OffsetDateTime>>,
    #[serde(default, deserialize_with = "nullable")]
    pub estimated_minutes: Option<Option<u32>>,
    pub tags: Option<Vec<String>>,
}

fn nullable_time<'de, D>(deserializer: D) -> Result<Option<Option<OffsetDateTime>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    time::serde::rfc3339::option::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedTask {
    pub task: Task,
    pub unlocked_badges: Vec<&'static BadgeDefinition>,
}

/// Counts the completion, announces it and runs the badge check. Badge
/// failures are logged rather than failing the request that completed the task.
async fn on_completed(state: &AppState, task: &Task) -> Vec<&'static BadgeDefinition> {
    metrics::record_task_completed();
    state
        .events
        .publish(task.user_id, RealtimeEventKind::TaskCompleted, task.id, task);
    match state.achievements.check_and_award(task.user_id).await {
        Ok(unlocked) => unlocked,
        Err(e) => {
            tracing::warn!(user_id = %task.user_id, error = %e, "badge check failed");
            Vec::new()
        }
    }
}

async fn update_task(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    IdPath(id): IdPath,
    JsonBody(req): JsonBody<UpdateTaskRequest>,
) -> ApiResult<Task> {
    let mut task = state
        .storage
        .get_task(auth.user_id, id)
        .await?
        .ok_or_else(task_not_found)?;
    let was_done = task.is_done();
    let now = now_utc();

    if let Some(title) = req.title.as_deref() {
        task.title = required_text(title, "title", MAX_TITLE_CHARS)?;
    }
    if let Some(description) = req.description {
        task.description = optional_text(description.as_deref(), "description", MAX_DESCRIPTION_CHARS)?;
    }
    if let Some(priority) = req.priority {
        task.priority = priority;
    }
    if let Some(due_at) = req.due_at {
        task.due_at = due_at;
    }
    if let Some(estimate) = req.estimated_minutes {
        task.estimated_minutes = check_estimate(estimate)?;
    }
    if let Some(tags) = req.tags {
        task.tags = normalize_tags(tags)?;
    }
    if let Some(status) = req.status {
        task.set_status(status, now);
    }
    task.updated_at = now;

    let task = state.storage.update_task(&task).await?;
    if task.is_done() && !was_done {
        on_completed(&state, &task).await;
    } else {
        state
            .events
            .publish(task.user_id, RealtimeEventKind::TaskUpdated, task.id, &task);
    }
    Ok(ApiResponse::ok(task))
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: bool,
    pub id: Uuid,
}

async fn delete_task(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    IdPath(id): IdPath,
) -> ApiResult<Deleted> {
    if !state.storage.delete_task(auth.user_id, id).await? {
        return Err(task_not_found());
    }
    state.events.send(
        RealtimeEvent::new(auth.user_id, RealtimeEventKind::TaskDeleted, Value::Null)
            .with_entity_id(id),
    );
    Ok(ApiResponse::ok(Deleted { deleted: true, id }))
}

/// Completing an already completed task returns it unchanged.
async fn complete_task(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    IdPath(id): IdPath,
) -> ApiResult<CompletedTask> {
    let mut task = state
        .storage
        .get_task(auth.user_id, id)
        .await?
        .ok_or_else(task_not_found)?;
    if task.is_done() {
        return Ok(ApiResponse::ok(CompletedTask {
            task,
            unlocked_badges: Vec::new(),
        }));
    }

    task.set_status(TaskStatus::Done, now_utc());
    let task = state.storage.update_task(&task).await?;
    let unlocked_badges = on_completed(&state, &task).await;
    Ok(ApiResponse::ok(CompletedTask {
        task,
        unlocked_badges,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_normalized() {
        let tags = normalize_tags(vec![
            " Work ".into(),
            "work".into(),
            "".into(),
            "Deep-Focus".into(),
        ])
        .unwrap();
        assert_eq!(tags, vec!["work", "deep-focus"]);
    }

    #[test]
    fn too_many_tags_rejected() {
        let tags = (0..21).map(|i| format!("t{i}")).collect();
        assert!(normalize_tags(tags).is_err());
    }

    #[test]
    fn estimate_bound() {
        assert_eq!(check_estimate(Some(1440)).unwrap(), Some(1440));
        assert!(check_estimate(Some(1441)).is_err());
        assert_eq!(check_estimate(None).unwrap(), None);
    }

    #[test]
    fn patch_due_at_null_clears() {
        let req: UpdateTaskRequest = serde_json::from_str(r#"{"dueAt": null}"#).unwrap();
        assert_eq!(req.due_at, Some(None));
        let req: UpdateTaskRequest =
            serde_json::from_str(r#"{"dueAt": "2025-02-01T09:00:00Z"}"#).unwrap();
        assert!(matches!(req.due_at, Some(Some(_))));
        let req: UpdateTaskRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.due_at, None);
    }
}
