use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use thrive_api::{ApiError, ApiResponse, ApiResult};
use thrive_auth::CurrentUser;
use thrive_core::model::{StudentVerification, VerificationStatus, is_academic_email, normalize_email};
use thrive_core::now_utc;
use uuid::Uuid;

use super::JsonBody;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/student/verify", post(request_verification))
        .route("/api/student/status", get(status))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub school_email: String,
    pub institution: String,
}

fn checked_institution(raw: &str) -> Result<String, ApiError> {
    let name = raw.trim();
    let len = name.chars().count();
    if !(2..=200).contains(&len) {
        return Err(ApiError::bad_request(
            "institution must be between 2 and 200 characters",
        ));
    }
    Ok(name.to_string())
}

async fn request_verification(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    JsonBody(req): JsonBody<VerifyRequest>,
) -> ApiResult<StudentVerification> {
    let school_email = normalize_email(&req.school_email);
    if !is_academic_email(&school_email) {
        return Err(ApiError::bad_request(
            "schoolEmail must be an academic address (.edu, .edu.xx or .ac.xx)",
        ));
    }
    let verification = StudentVerification {
        id: Uuid::new_v4(),
        user_id: auth.user_id,
        school_email,
        institution: checked_institution(&req.institution)?,
        status: VerificationStatus::Pending,
        rejection_reason: None,
        reviewed_by: None,
        submitted_at: now_utc(),
        reviewed_at: None,
    };

    let verification = state
        .storage
        .create_student_verification(&verification)
        .await
        .map_err(|e| {
            if e.is_already_exists() {
                ApiError::conflict("A student verification is already pending or approved")
            } else {
                e.into()
            }
        })?;
    tracing::info!(user_id = %auth.user_id, verification_id = %verification.id, "student verification submitted");
    Ok(ApiResponse::created(verification))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStatus {
    pub is_student: bool,
    pub verification: Option<StudentVerification>,
}

async fn status(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
) -> ApiResult<StudentStatus> {
    let verification = state
        .storage
        .latest_student_verification(auth.user_id)
        .await?;
    let is_student = verification
        .as_ref()
        .is_some_and(|v| v.status == VerificationStatus::Verified);
    Ok(ApiResponse::ok(StudentStatus {
        is_student,
        verification,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn institution_length() {
        assert_eq!(checked_institution("  MIT ").unwrap(), "MIT");
        assert!(checked_institution("X").is_err());
        assert!(checked_institution(&"a".repeat(201)).is_err());
    }
}
