//! Task analysis and smart plans.

use axum::Router;
use axum::extract::State;
use axum::routing::post;
use serde::Serialize;
use thrive_api::{ApiError, ApiResponse, ApiResult};
use thrive_auth::CurrentUser;
use thrive_core::model::{Task, TaskStatus};
use thrive_core::now_utc;
use thrive_storage::MAX_PAGE_SIZE;
use thrive_storage::prelude::*;
use uuid::Uuid;

use super::tasks::insert_task;
use super::{IdPath, JsonBody, optional_text, required_text};
use crate::services::plans::{MAX_PLAN_MINUTES, MIN_PLAN_MINUTES, build_plan};
use crate::services::{PlanSuggestion, SmartPlanRequest, SuggestionKind, TaskAnalysis, TaskDraft};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/ai/analyze-task", post(analyze_task))
        .route("/api/ai/smart-plan", post(smart_plan))
        .route("/api/ai/smart-plan/{id}/execute", post(execute_plan))
}

async fn analyze_task(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    JsonBody(draft): JsonBody<TaskDraft>,
) -> ApiResult<TaskAnalysis> {
    let draft = TaskDraft {
        title: required_text(&draft.title, "title", 200)?,
        description: optional_text(draft.description.as_deref(), "description", 5000)?,
        due_at: draft.due_at,
    };
    let analysis = state
        .advisor
        .analyze(&draft, now_utc())
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(ApiResponse::ok(analysis))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanCreated {
    pub plan_id: Uuid,
    pub expires_in_secs: u64,
    pub suggestions: Vec<PlanSuggestion>,
    pub total_minutes: u32,
}

fn check_budget(minutes: u32) -> Result<(), ApiError> {
    if !(MIN_PLAN_MINUTES..=MAX_PLAN_MINUTES).contains(&minutes) {
        return Err(ApiError::bad_request(format!(
            "availableMinutes must be between {MIN_PLAN_MINUTES} and {MAX_PLAN_MINUTES}"
        )));
    }
    Ok(())
}

async fn smart_plan(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    JsonBody(req): JsonBody<SmartPlanRequest>,
) -> ApiResult<PlanCreated> {
    check_budget(req.available_minutes)?;
    let pending = state
        .storage
        .list_tasks(
            auth.user_id,
            &TaskFilter::default()
                .with_status(TaskStatus::Pending)
                .with_limit(MAX_PAGE_SIZE),
        )
        .await?;

    let plan = state.plans.insert(build_plan(auth.user_id, &pending, &req)).await;
    tracing::debug!(
        plan_id = %plan.plan_id,
        suggestions = plan.suggestions.len(),
        total_minutes = plan.total_minutes,
        "smart plan built"
    );
    Ok(ApiResponse::created(PlanCreated {
        plan_id: plan.plan_id,
        expires_in_secs: state.plans.ttl_secs(),
        suggestions: plan.suggestions.clone(),
        total_minutes: plan.total_minutes,
    }))
}

/// Suggestions that become tasks on execution. Breaks are advisory only.
pub(crate) fn materializable(suggestions: &[PlanSuggestion]) -> impl Iterator<Item = &PlanSuggestion> {
    suggestions
        .iter()
        .filter(|s| s.is_new() && s.kind != SuggestionKind::Break)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanExecuted {
    pub plan_id: Uuid,
    pub created: Vec<Task>,
    /// Suggestions that already exist as tasks or are breaks.
    pub skipped: usize,
}

async fn execute_plan(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    IdPath(plan_id): IdPath,
) -> ApiResult<PlanExecuted> {
    let plan = state
        .plans
        .get(plan_id)
        .await
        .ok_or_else(|| ApiError::not_found("Plan not found or expired"))?;
    if plan.user_id != auth.user_id {
        return Err(ApiError::forbidden("This plan belongs to another user"));
    }
    // removed first so a concurrent execute cannot create duplicates
    if state.plans.remove(plan_id).await.is_none() {
        return Err(ApiError::not_found("Plan not found or expired"));
    }

    let mut created = Vec::new();
    for suggestion in materializable(&plan.suggestions) {
        created.push(insert_task(&state, &suggestion.to_task(auth.user_id)).await?);
    }
    tracing::info!(plan_id = %plan_id, created = created.len(), "smart plan executed");
    Ok(ApiResponse::created(PlanExecuted {
        plan_id,
        skipped: plan.suggestions.len() - created.len(),
        created,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use thrive_core::model::TaskPriority;

    fn suggestion(kind: SuggestionKind, task_id: Option<Uuid>) -> PlanSuggestion {
        PlanSuggestion {
            kind,
            title: "x".into(),
            description: None,
            minutes: 20,
            priority: TaskPriority::Medium,
            task_id,
            tags: Vec::new(),
        }
    }

    #[test]
    fn budget_bounds() {
        assert!(check_budget(14).is_err());
        assert!(check_budget(15).is_ok());
        assert!(check_budget(720).is_ok());
        assert!(check_budget(721).is_err());
    }

    #[test]
    fn only_new_non_break_suggestions_materialize() {
        let suggestions = vec![
            suggestion(SuggestionKind::Task, Some(Uuid::new_v4())),
            suggestion(SuggestionKind::Break, None),
            suggestion(SuggestionKind::FocusBlock, None),
        ];
        let kinds: Vec<_> = materializable(&suggestions).map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SuggestionKind::FocusBlock]);
    }
}
