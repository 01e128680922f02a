//! Aggregated endpoints for the mobile client.

use axum::Router;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::get;
use serde::Serialize;
use thrive_api::{ApiResponse, ApiResult};
use thrive_auth::CurrentUser;
use thrive_core::locale::{format_date, format_time, is_business_hours, select_managed_content};
use thrive_core::model::{ContentKind, ManagedContent, SubscriptionTier, Task, TaskStatus};
use thrive_core::now_utc;
use thrive_core::time::{start_of_local_day, to_local};
use thrive_storage::prelude::*;
use thrive_storage::MAX_PAGE_SIZE;

use super::focus::focus_minutes_since;
use super::localization::user_language;
use crate::services::plans::compare_tasks;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/mobile/dashboard", get(dashboard))
        .route("/api/mobile/features", get(features))
}

const DASHBOARD_TASKS: usize = 5;

/// Advisory feature flags per tier; clients use them to show or hide UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierFeatures {
    pub ai_task_analysis: bool,
    pub smart_plans: bool,
    pub voice_tasks: bool,
    pub advanced_stats: bool,
    pub custom_themes: bool,
    pub leaderboard: bool,
}

pub fn tier_features(tier: SubscriptionTier) -> TierFeatures {
    let paid = tier.is_paid_features();
    TierFeatures {
        ai_task_analysis: true,
        smart_plans: paid,
        voice_tasks: paid,
        advanced_stats: paid,
        custom_themes: paid,
        leaderboard: true,
    }
}

#[derive(Debug, Serialize)]
pub struct FeatureSet {
    pub tier: SubscriptionTier,
    pub features: TierFeatures,
}

async fn features(State(state): State<AppState>, CurrentUser(auth): CurrentUser) -> ApiResult<FeatureSet> {
    let user = state.current_user(&auth).await?;
    Ok(ApiResponse::ok(FeatureSet {
        tier: user.tier,
        features: tier_features(user.tier),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusToday {
    pub minutes: u64,
    pub goal_minutes: u32,
    /// Percent of the goal, capped at 100.
    pub progress: u32,
}

impl FocusToday {
    fn new(minutes: u64, goal_minutes: u32) -> Self {
        let progress = if goal_minutes == 0 {
            100
        } else {
            (minutes * 100 / u64::from(goal_minutes)).min(100) as u32
        };
        Self {
            minutes,
            goal_minutes,
            progress,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub date: String,
    pub time: String,
    pub language: &'static str,
    pub business_hours: bool,
    pub top_tasks: Vec<Task>,
    pub tasks_completed_today: u64,
    pub current_streak: u32,
    pub focus: FocusToday,
    pub health: Vec<HealthMetricSummary>,
    pub unread_notifications: u64,
    pub tip: Option<ManagedContent>,
    pub features: TierFeatures,
}

pub(crate) fn top_tasks(mut pending: Vec<Task>, count: usize) -> Vec<Task> {
    pending.sort_by(compare_tasks);
    pending.truncate(count);
    pending
}

async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    headers: HeaderMap,
) -> ApiResult<Dashboard> {
    let user = state.current_user(&auth).await?;
    let country = state.country_of(&user).to_string();
    let now = now_utc();
    let local_now = to_local(now, user.utc_offset_minutes);
    let today_start = start_of_local_day(now, user.utc_offset_minutes);
    let language = user_language(&user, &headers, &country);

    let pending = state
        .storage
        .list_tasks(
            user.id,
            &TaskFilter::default()
                .with_status(TaskStatus::Pending)
                .with_limit(MAX_PAGE_SIZE),
        )
        .await?;
    let tasks_completed_today = state
        .storage
        .count_tasks_completed_since(user.id, today_start)
        .await?;
    let focus_minutes = focus_minutes_since(&state, user.id, today_start).await?;
    let health = state.storage.health_summary(user.id, today_start).await?;
    let unread_notifications = state.storage.count_unread_notifications(user.id).await?;
    let snapshot = state.achievements.snapshot(user.id, now).await?;

    let content = state.storage.list_content().await?;
    let tip = select_managed_content(&content, language, user.tier, now)
        .into_iter()
        .find(|c| c.kind == ContentKind::Tip)
        .cloned();

    Ok(ApiResponse::ok(Dashboard {
        date: format_date(local_now.date(), &country),
        time: format_time(local_now.time(), &country),
        language,
        business_hours: is_business_hours(local_now, &country),
        top_tasks: top_tasks(pending, DASHBOARD_TASKS),
        tasks_completed_today,
        current_streak: snapshot.current_streak,
        focus: FocusToday::new(focus_minutes, user.preferences.daily_focus_goal_minutes),
        health,
        unread_notifications,
        tip,
        features: tier_features(user.tier),
    }))
}
