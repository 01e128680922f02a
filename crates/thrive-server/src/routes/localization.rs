//! Language detection, cultural conventions, value formatting and managed
//! content.

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::routing::{get, post, put};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thrive_api::{ApiError, ApiResponse, ApiResult};
use thrive_auth::CurrentUser;
use thrive_core::locale::{
    CulturalAdaptation, DEFAULT_LANGUAGE, Language, cultural_adaptation, detect_language,
    format_currency, format_date, format_number, format_time, parse_accept_language,
    select_managed_content, supported_languages,
};
use thrive_core::model::{ManagedContent, User};
use thrive_core::time::to_local;
use thrive_core::{now_utc, parse_rfc3339};
use thrive_storage::prelude::*;
use time::macros::format_description;
use time::{Date, Time};

use super::auth::{checked_country, checked_language};
use super::{JsonBody, QueryParams, nullable};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/localization/languages", get(languages))
        .route("/api/localization/detect", get(detect))
        .route("/api/localization/cultural/{country}", get(cultural))
        .route("/api/localization/format", post(format_value))
        .route("/api/localization/content", get(content))
        .route("/api/localization/preferences", put(update_preferences))
}

const MAX_DECIMALS: u8 = 6;

fn accept_language(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
}

/// Response language for `user`: saved preference, then the request's
/// `Accept-Language`, then the country.
pub(crate) fn user_language(user: &User, headers: &HeaderMap, country: &str) -> &'static str {
    detect_language(
        user.language.as_deref(),
        accept_language(headers),
        Some(country),
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageList {
    pub default_language: &'static str,
    pub languages: &'static [Language],
}

async fn languages() -> ApiResult<LanguageList> {
    Ok(ApiResponse::ok(LanguageList {
        default_language: DEFAULT_LANGUAGE,
        languages: supported_languages(),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct DetectQuery {
    pub country: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub language: &'static str,
    pub country: String,
    pub preference: Option<String>,
    pub accept_language: Vec<String>,
}

async fn detect(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    QueryParams(query): QueryParams<DetectQuery>,
    headers: HeaderMap,
) -> ApiResult<Detection> {
    let user = state.current_user(&auth).await?;
    let country = match query.country.as_deref() {
        Some(raw) => checked_country(raw)?,
        None => state.country_of(&user).to_string(),
    };
    let language = detect_language(
        user.language.as_deref(),
        accept_language(&headers),
        Some(&country),
    );
    Ok(ApiResponse::ok(Detection {
        language,
        preference: user.language.clone(),
        accept_language: accept_language(&headers)
            .map(parse_accept_language)
            .unwrap_or_default(),
        country,
    }))
}

async fn cultural(
    CurrentUser(_): CurrentUser,
    axum::extract::Path(country): axum::extract::Path<String>,
) -> ApiResult<CulturalAdaptation> {
    let country = checked_country(&country)?;
    Ok(ApiResponse::ok(cultural_adaptation(&country)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Currency,
    Number,
    Date,
    Time,
}

#[derive(Debug, Deserialize)]
pub struct FormatRequest {
    pub kind: FormatKind,
    pub value: Value,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub decimals: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct Formatted {
    pub kind: FormatKind,
    pub country: String,
    pub formatted: String,
}

fn number_value(value: &Value) -> Result<f64, ApiError> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|v: &f64| v.is_finite())
    .ok_or_else(|| ApiError::bad_request("value must be a finite number"))
}

fn string_value(value: &Value) -> Result<&str, ApiError> {
    value
        .as_str()
        .map(str::trim)
        .ok_or_else(|| ApiError::bad_request("value must be a string"))
}

/// `YYYY-MM-DD`, or an RFC 3339 timestamp shown in the user's offset.
fn date_value(value: &Value, utc_offset_minutes: i32) -> Result<Date, ApiError> {
    let raw = string_value(value)?;
    if let Ok(date) = Date::parse(raw, format_description!("[year]-[month]-[day]")) {
        return Ok(date);
    }
    parse_rfc3339(raw)
        .map(|ts| to_local(ts, utc_offset_minutes).date())
        .map_err(|_| ApiError::bad_request("value must be YYYY-MM-DD or an RFC 3339 timestamp"))
}

/// `HH:MM`, or an RFC 3339 timestamp shown in the user's offset.
fn time_value(value: &Value, utc_offset_minutes: i32) -> Result<Time, ApiError> {
    let raw = string_value(value)?;
    if let Ok(time) = Time::parse(raw, format_description!("[hour]:[minute]")) {
        return Ok(time);
    }
    parse_rfc3339(raw)
        .map(|ts| to_local(ts, utc_offset_minutes).time())
        .map_err(|_| ApiError::bad_request("value must be HH:MM or an RFC 3339 timestamp"))
}

pub(crate) fn format_request(
    req: &FormatRequest,
    country: &str,
    utc_offset_minutes: i32,
) -> Result<String, ApiError> {
    let formatted = match req.kind {
        FormatKind::Currency => {
            let currency = match req.currency.as_deref().map(str::trim) {
                Some(code) if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) => {
                    code.to_ascii_uppercase()
                }
                Some(_) => {
                    return Err(ApiError::bad_request(
                        "currency must be a three-letter ISO 4217 code",
                    ));
                }
                None => cultural_adaptation(country).currency_code.to_string(),
            };
            format_currency(number_value(&req.value)?, country, &currency)
        }
        FormatKind::Number => {
            let decimals = req.decimals.unwrap_or(2);
            if decimals > MAX_DECIMALS {
                return Err(ApiError::bad_request("decimals must be at most 6"));
            }
            format_number(number_value(&req.value)?, decimals, country)
        }
        FormatKind::Date => format_date(date_value(&req.value, utc_offset_minutes)?, country),
        FormatKind::Time => format_time(time_value(&req.value, utc_offset_minutes)?, country),
    };
    Ok(formatted)
}

async fn format_value(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    JsonBody(req): JsonBody<FormatRequest>,
) -> ApiResult<Formatted> {
    let user = state.current_user(&auth).await?;
    let country = match req.country.as_deref() {
        Some(raw) => checked_country(raw)?,
        None => state.country_of(&user).to_string(),
    };
    let formatted = format_request(&req, &country, user.utc_offset_minutes)?;
    Ok(ApiResponse::ok(Formatted {
        kind: req.kind,
        country,
        formatted,
    }))
}

#[derive(Debug, Serialize)]
pub struct ContentFeed {
    pub language: &'static str,
    pub items: Vec<ManagedContent>,
}

async fn content(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    headers: HeaderMap,
) -> ApiResult<ContentFeed> {
    let user = state.current_user(&auth).await?;
    let language = user_language(&user, &headers, state.country_of(&user));
    let all = state.storage.list_content().await?;
    let items = select_managed_content(&all, language, user.tier, now_utc())
        .into_iter()
        .cloned()
        .collect();
    Ok(ApiResponse::ok(ContentFeed { language, items }))
}

/// `null` clears a saved value; absent fields are left alone.
#[derive(Debug, Default, Deserialize)]
pub struct PreferencesRequest {
    #[serde(default, deserialize_with = "nullable")]
    pub language: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub country: Option<Option<String>>,
}

async fn update_preferences(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    JsonBody(req): JsonBody<PreferencesRequest>,
) -> ApiResult<User> {
    let mut user = state.current_user(&auth).await?;
    if let Some(language) = req.language {
        user.language = language.as_deref().map(checked_language).transpose()?;
    }
    if let Some(country) = req.country {
        user.country = country.as_deref().map(checked_country).transpose()?;
    }
    user.updated_at = now_utc();
    Ok(ApiResponse::ok(state.storage.update_user(&user).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn req(kind: FormatKind, value: Value) -> FormatRequest {
        FormatRequest {
            kind,
            value,
            country: None,
            currency: None,
            decimals: None,
        }
    }

    #[test]
    fn formats_each_kind() {
        assert_eq!(
            format_request(&req(FormatKind::Currency, json!(1234.56)), "DE", 0).unwrap(),
            "1.234,56 €"
        );
        assert_eq!(
            format_request(&req(FormatKind::Number, json!("1234.5")), "US", 0).unwrap(),
            "1,234.50"
        );
        assert_eq!(
            format_request(&req(FormatKind::Date, json!("2025-01-15")), "US", 0).unwrap(),
            "01/15/2025"
        );
        assert_eq!(
            format_request(&req(FormatKind::Time, json!("15:05")), "US", 0).unwrap(),
            "3:05 PM"
        );
    }

    #[test]
    fn timestamps_use_user_offset() {
        let late = json!("2025-01-15T23:30:00Z");
        assert_eq!(
            format_request(&req(FormatKind::Date, late.clone()), "DE", 60).unwrap(),
            "16.01.2025"
        );
        assert_eq!(
            format_request(&req(FormatKind::Time, late), "DE", 60).unwrap(),
            "00:30"
        );
    }

    #[test]
    fn explicit_currency_overrides_country() {
        let mut r = req(FormatKind::Currency, json!(9.99));
        r.currency = Some("gbp".into());
        assert_eq!(format_request(&r, "US", 0).unwrap(), "£9.99");
        r.currency = Some("pounds".into());
        assert!(format_request(&r, "US", 0).is_err());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(format_request(&req(FormatKind::Number, json!(true)), "US", 0).is_err());
        assert!(format_request(&req(FormatKind::Date, json!("15/01/2025")), "US", 0).is_err());
        let mut r = req(FormatKind::Number, json!(1));
        r.decimals = Some(9);
        assert!(format_request(&r, "US", 0).is_err());
    }
}
