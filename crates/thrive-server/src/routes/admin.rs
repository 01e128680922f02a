//! Administration: users, platform totals, student verification review and
//! managed content. Every handler requires the `admin` role.

use axum::Router;
use axum::extract::State;
use axum::routing::{delete, get, patch, post};
use serde::Deserialize;
use serde_json::json;
use thrive_api::{ApiError, ApiResponse, ApiResult};
use thrive_auth::AdminUser;
use thrive_core::model::{
    ContentKind, ManagedContent, Notification, NotificationKind, StudentVerification,
    Subscription, SubscriptionStatus, SubscriptionTier, User, UserRole, VerificationStatus,
};
use thrive_core::now_utc;
use thrive_storage::prelude::*;
use time::OffsetDateTime;
use uuid::Uuid;

use super::auth::checked_language;
use super::payments::apply_subscription;
use super::tasks::Deleted;
use super::{IdPath, JsonBody, QueryParams, optional_text, parse_param, required_text};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/{id}/role", patch(change_role))
        .route("/api/admin/stats", get(stats))
        .route("/api/admin/student-verifications", get(list_verifications))
        .route(
            "/api/admin/student-verifications/{id}/review",
            post(review_verification),
        )
        .route("/api/admin/content", get(list_content).post(create_content))
        .route("/api/admin/content/{id}", delete(delete_content))
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

async fn list_users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    QueryParams(query): QueryParams<PageQuery>,
) -> ApiResult<Vec<User>> {
    let users = state
        .storage
        .list_users(page_size(query.limit), query.offset.unwrap_or(0))
        .await?;
    Ok(ApiResponse::ok(users))
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: UserRole,
}

async fn change_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    IdPath(id): IdPath,
    JsonBody(req): JsonBody<ChangeRoleRequest>,
) -> ApiResult<User> {
    if id == admin.user_id {
        return Err(ApiError::bad_request("You cannot change your own role"));
    }
    let mut user = state
        .storage
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    if user.role != req.role {
        user.role = req.role;
        user.updated_at = now_utc();
        user = state.storage.update_user(&user).await?;
        tracing::info!(admin_id = %admin.user_id, user_id = %id, role = %req.role, "role changed");
    }
    Ok(ApiResponse::ok(user))
}

async fn stats(State(state): State<AppState>, AdminUser(_): AdminUser) -> ApiResult<PlatformStats> {
    Ok(ApiResponse::ok(state.storage.platform_stats().await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct VerificationQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
}

async fn list_verifications(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    QueryParams(query): QueryParams<VerificationQuery>,
) -> ApiResult<Vec<StudentVerification>> {
    let filter = StudentVerificationFilter {
        status: parse_param(query.status.as_deref())?,
        limit: page_size(query.limit),
    };
    Ok(ApiResponse::ok(
        state.storage.list_student_verifications(&filter).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub approve: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

async fn review_verification(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    IdPath(id): IdPath,
    JsonBody(req): JsonBody<ReviewRequest>,
) -> ApiResult<StudentVerification> {
    let mut verification = state
        .storage
        .get_student_verification(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Student verification not found"))?;
    if verification.status != VerificationStatus::Pending {
        return Err(ApiError::conflict(format!(
            "Verification was already {}",
            verification.status
        )));
    }

    let now = now_utc();
    verification.reviewed_by = Some(admin.user_id);
    verification.reviewed_at = Some(now);
    if req.approve {
        verification.status = VerificationStatus::Verified;
        verification.rejection_reason = None;
    } else {
        verification.status = VerificationStatus::Rejected;
        verification.rejection_reason = optional_text(req.reason.as_deref(), "reason", 500)?;
    }
    let verification = state
        .storage
        .update_student_verification(&verification)
        .await?;

    let notification = if req.approve {
        let mut user = state
            .storage
            .get_user(verification.user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        let mut subscription = state
            .storage
            .get_subscription(user.id)
            .await?
            .unwrap_or_else(|| Subscription::new(user.id, SubscriptionTier::Student));
        subscription.tier = SubscriptionTier::Student;
        subscription.status = SubscriptionStatus::Active;
        subscription.current_period_end = None;
        subscription.updated_at = now;
        apply_subscription(&state, &mut user, &subscription, SubscriptionTier::Student).await?;

        Notification::new(
            verification.user_id,
            NotificationKind::Student,
            "Student verification approved",
            format!(
                "Your {} student status is confirmed. Student features are now active.",
                verification.institution
            ),
            json!({ "verificationId": verification.id, "approved": true }),
        )
    } else {
        let reason = verification
            .rejection_reason
            .clone()
            .unwrap_or_else(|| "No reason was given".to_string());
        Notification::new(
            verification.user_id,
            NotificationKind::Student,
            "Student verification declined",
            reason,
            json!({ "verificationId": verification.id, "approved": false }),
        )
    };
    state.notifier.notify_best_effort(notification).await;

    tracing::info!(
        admin_id = %admin.user_id,
        verification_id = %verification.id,
        status = %verification.status,
        "student verification reviewed"
    );
    Ok(ApiResponse::ok(verification))
}

async fn list_content(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> ApiResult<Vec<ManagedContent>> {
    Ok(ApiResponse::ok(state.storage.list_content().await?))
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContentRequest {
    pub kind: ContentKind,
    pub title: String,
    pub body: String,
    pub language: String,
    #[serde(default)]
    pub target_tiers: Vec<SubscriptionTier>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub valid_from: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub valid_until: Option<OffsetDateTime>,
}

pub(crate) fn build_content(req: CreateContentRequest, now: OffsetDateTime) -> Result<ManagedContent, ApiError> {
    let valid_from = req.valid_from.unwrap_or(now);
    if let Some(until) = req.valid_until {
        if until <= valid_from {
            return Err(ApiError::bad_request("validUntil must be after validFrom"));
        }
    }
    let mut target_tiers = req.target_tiers;
    target_tiers.sort_by_key(|t| t.as_str());
    target_tiers.dedup();

    Ok(ManagedContent {
        id: Uuid::new_v4(),
        kind: req.kind,
        title: required_text(&req.title, "title", 200)?,
        body: required_text(&req.body, "body", 5000)?,
        language: checked_language(&req.language)?,
        target_tiers,
        priority: req.priority,
        active: req.active,
        valid_from,
        valid_until: req.valid_until,
        created_at: now,
    })
}

async fn create_content(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    JsonBody(req): JsonBody<CreateContentRequest>,
) -> ApiResult<ManagedContent> {
    let content = build_content(req, now_utc())?;
    let content = state.storage.create_content(&content).await?;
    tracing::info!(admin_id = %admin.user_id, content_id = %content.id, "managed content created");
    Ok(ApiResponse::created(content))
}

async fn delete_content(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    IdPath(id): IdPath,
) -> ApiResult<Deleted> {
    if !state.storage.delete_content(id).await? {
        return Err(ApiError::not_found("Content not found"));
    }
    Ok(ApiResponse::ok(Deleted { deleted: true, id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn request() -> CreateContentRequest {
        serde_json::from_value(json!({
            "kind": "tip",
            "title": "Hydrate",
            "body": "Drink water before coffee",
            "language": "es-MX",
            "targetTiers": ["premium", "free", "premium"]
        }))
        .unwrap()
    }

    #[test]
    fn content_defaults_and_normalization() {
        let now = datetime!(2025-01-15 10:00 UTC);
        let content = build_content(request(), now).unwrap();
        assert_eq!(content.language, "es");
        assert!(content.active);
        assert_eq!(content.valid_from, now);
        assert_eq!(
            content.target_tiers,
            vec![SubscriptionTier::Free, SubscriptionTier::Premium]
        );
    }

    #[test]
    fn content_window_must_be_forward() {
        let now = datetime!(2025-01-15 10:00 UTC);
        let mut req = request();
        req.valid_until = Some(datetime!(2025-01-14 10:00 UTC));
        assert!(build_content(req, now).is_err());
    }

    #[test]
    fn content_language_must_be_supported() {
        let mut req = request();
        req.language = "tlh".into();
        assert!(build_content(req, now_utc()).is_err());
    }
}
