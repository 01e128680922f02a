//! Registration, password and one-time-code login, and the caller's profile.

use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use thrive_api::{ApiError, ApiResponse, ApiResult};
use thrive_auth::{
    AuthError, CurrentUser, IssuedToken, hash_password, validate_password, verify_password,
};
use thrive_core::locale::find_language;
use thrive_core::model::{Theme, User, normalize_email};
use thrive_core::now_utc;
use thrive_storage::prelude::*;

use super::{JsonBody, optional_text, required_text};
use crate::metrics;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/otp/request", post(request_otp))
        .route("/api/auth/otp/verify", post(verify_otp))
        .route("/api/auth/me", get(me).patch(update_me))
}

const MAX_NAME_CHARS: usize = 100;
const MAX_DAILY_GOAL_MINUTES: u32 = 1440;
/// UTC-12:00 through UTC+14:00.
const UTC_OFFSET_RANGE: std::ops::RangeInclusive<i32> = -720..=840;

/// Shape check only; deliverability is not verified.
pub(crate) fn is_valid_email(email: &str) -> bool {
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && !local.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

fn checked_email(raw: &str) -> Result<String, ApiError> {
    let email = normalize_email(raw);
    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("A valid email address is required"));
    }
    Ok(email)
}

/// Two-letter ISO country code, uppercased.
pub(crate) fn checked_country(raw: &str) -> Result<String, ApiError> {
    let country = raw.trim().to_ascii_uppercase();
    if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ApiError::bad_request(
            "country must be a two-letter ISO 3166 code",
        ));
    }
    Ok(country)
}

/// Supported language code, reduced to its primary subtag.
pub(crate) fn checked_language(raw: &str) -> Result<String, ApiError> {
    find_language(raw)
        .map(|l| l.code.to_string())
        .ok_or_else(|| ApiError::bad_request(format!("Unsupported language: {}", raw.trim())))
}

#[derive(Debug, Serialize)]
pub struct AuthPayload {
    #[serde(flatten)]
    pub token: IssuedToken,
    pub user: User,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> ApiResult<AuthPayload> {
    let email = checked_email(&req.email)?;
    validate_password(&req.password)?;
    let display_name = optional_text(req.display_name.as_deref(), "displayName", MAX_NAME_CHARS)?;

    let mut user = User::new(&email, display_name.unwrap_or_default());
    user.language = req.language.as_deref().map(checked_language).transpose()?;
    user.country = req.country.as_deref().map(checked_country).transpose()?;
    user.password_hash = Some(hash_password(&req.password)?);

    let user = state.storage.create_user(&user).await.map_err(|e| {
        if e.is_already_exists() {
            ApiError::conflict("Email is already registered")
        } else {
            e.into()
        }
    })?;
    tracing::info!(user_id = %user.id, "user registered");

    let token = state.jwt.issue(&user)?;
    Ok(ApiResponse::created(AuthPayload { token, user }))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<AuthPayload> {
    let email = normalize_email(&req.email);
    let user = state
        .storage
        .find_user_by_email(&email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    // OTP-only accounts have no password to check against
    let hash = user
        .password_hash
        .as_deref()
        .ok_or(AuthError::InvalidCredentials)?;
    if !verify_password(&req.password, hash)? {
        tracing::debug!(user_id = %user.id, "password mismatch");
        return Err(AuthError::InvalidCredentials.into());
    }

    let token = state.jwt.issue(&user)?;
    Ok(ApiResponse::ok(AuthPayload { token, user }))
}

#[derive(Debug, Deserialize)]
pub struct OtpRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpSent {
    pub sent: bool,
    pub expires_in: u64,
}

async fn request_otp(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<OtpRequest>,
) -> ApiResult<OtpSent> {
    let email = checked_email(&req.email)?;
    let now = now_utc();

    let existing = state.storage.get_otp(&email).await?;
    state.otp_policy.check_resend(existing.as_ref(), now)?;

    let (code, challenge) = state.otp_policy.issue(&email, now);
    state.storage.put_otp(&challenge).await?;
    state.otp_sender.send(&email, &code).await?;
    metrics::record_otp_request();

    Ok(ApiResponse::ok(OtpSent {
        sent: true,
        expires_in: state.otp_policy.ttl_secs,
    }))
}

#[derive(Debug, Deserialize)]
pub struct OtpVerifyRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct OtpLogin {
    #[serde(flatten)]
    pub token: IssuedToken,
    pub user: User,
    /// True when this login created the account.
    pub created: bool,
}

async fn verify_otp(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<OtpVerifyRequest>,
) -> ApiResult<OtpLogin> {
    let email = checked_email(&req.email)?;
    let challenge = state
        .storage
        .record_otp_attempt(&email)
        .await?
        .ok_or_else(|| AuthError::unauthorized("No code was requested for this email"))?;
    state.otp_policy.verify(&challenge, &req.code, now_utc())?;
    state.storage.delete_otp(&email).await?;

    let (user, created) = match state.storage.find_user_by_email(&email).await? {
        Some(user) => (user, false),
        None => {
            let local = email.split('@').next().unwrap_or_default();
            match state.storage.create_user(&User::new(&email, local)).await {
                Ok(user) => {
                    tracing::info!(user_id = %user.id, "user created by code login");
                    (user, true)
                }
                // a concurrent verification created it first
                Err(e) if e.is_already_exists() => {
                    let user = state
                        .storage
                        .find_user_by_email(&email)
                        .await?
                        .ok_or_else(|| ApiError::internal("Account vanished during login"))?;
                    (user, false)
                }
                Err(e) => return Err(e.into()),
            }
        }
    };

    let token = state.jwt.issue(&user)?;
    Ok(ApiResponse::ok(OtpLogin {
        token,
        user,
        created,
    }))
}

async fn me(State(state): State<AppState>, CurrentUser(auth): CurrentUser) -> ApiResult<User> {
    Ok(ApiResponse::ok(state.current_user(&auth).await?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    pub theme: Option<Theme>,
    pub notifications_enabled: Option<bool>,
    pub daily_focus_goal_minutes: Option<u32>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub week_starts_monday: Option<Option<bool>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub preferences: Option<PreferencesPatch>,
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

async fn update_me(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    JsonBody(req): JsonBody<UpdateProfileRequest>,
) -> ApiResult<User> {
    let mut user = state.current_user(&auth).await?;

    if let Some(name) = req.display_name.as_deref() {
        user.display_name = required_text(name, "displayName", MAX_NAME_CHARS)?;
    }
    if let Some(offset) = req.utc_offset_minutes {
        if !UTC_OFFSET_RANGE.contains(&offset) {
            return Err(ApiError::bad_request(
                "utcOffsetMinutes must be between -720 and 840",
            ));
        }
        user.utc_offset_minutes = offset;
    }
    if let Some(patch) = req.preferences {
        let prefs = &mut user.preferences;
        if let Some(theme) = patch.theme {
            prefs.theme = theme;
        }
        if let Some(enabled) = patch.notifications_enabled {
            prefs.notifications_enabled = enabled;
        }
        if let Some(goal) = patch.daily_focus_goal_minutes {
            if goal > MAX_DAILY_GOAL_MINUTES {
                return Err(ApiError::bad_request(
                    "dailyFocusGoalMinutes must be at most 1440",
                ));
            }
            prefs.daily_focus_goal_minutes = goal;
        }
        if let Some(monday) = patch.week_starts_monday {
            prefs.week_starts_monday = monday;
        }
    }

    user.updated_at = now_utc();
    Ok(ApiResponse::ok(state.storage.update_user(&user).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("a.b+tag@mail.example.org"));
        assert!(!is_valid_email("ada@localhost"));
        assert!(!is_valid_email("ada example@x.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ada@.com"));
        assert!(!is_valid_email("ada@example..com"));
        assert!(!is_valid_email("not-an-email"));
    }

    #[test]
    fn country_and_language_normalize() {
        assert_eq!(checked_country(" de ").unwrap(), "DE");
        assert!(checked_country("DEU").is_err());
        assert!(checked_country("1A").is_err());
        assert_eq!(checked_language("pt-BR").unwrap(), "pt");
        assert!(checked_language("tlh").is_err());
    }
}
