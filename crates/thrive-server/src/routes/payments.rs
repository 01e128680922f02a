//! Plans and subscription records. No payment provider is called; changes
//! only update the stored subscription and the user's tier.

use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use thrive_api::{ApiError, ApiResponse, ApiResult};
use thrive_auth::CurrentUser;
use thrive_core::locale::{cultural_adaptation, format_currency};
use thrive_core::model::{
    Subscription, SubscriptionStatus, SubscriptionTier, User, VerificationStatus,
};
use thrive_core::{RealtimeEventKind, now_utc};
use time::Duration;

use super::JsonBody;
use super::mobile::{TierFeatures, tier_features};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/payments/plans", get(plans))
        .route(
            "/api/payments/subscription",
            get(subscription).post(change_subscription),
        )
        .route("/api/payments/subscription/cancel", post(cancel_subscription))
}

const BILLING_PERIOD_DAYS: i64 = 30;

/// Monthly (premium, student) prices per currency. Currencies not listed are
/// billed in USD.
const PRICES: &[(&str, f64, f64)] = &[
    ("USD", 9.99, 4.99),
    ("EUR", 8.99, 4.49),
    ("GBP", 7.99, 3.99),
    ("CAD", 12.99, 6.49),
    ("AUD", 14.99, 7.49),
    ("JPY", 1200.0, 600.0),
    ("KRW", 12000.0, 6000.0),
    ("INR", 499.0, 249.0),
    ("BRL", 29.9, 14.9),
    ("MXN", 179.0, 89.0),
    ("CHF", 9.9, 4.9),
];

pub(crate) fn monthly_price(tier: SubscriptionTier, currency: &str) -> (&'static str, f64) {
    let (code, premium, student) = PRICES
        .iter()
        .find(|(code, _, _)| *code == currency)
        .copied()
        .unwrap_or(PRICES[0]);
    let amount = match tier {
        SubscriptionTier::Free => 0.0,
        SubscriptionTier::Premium => premium,
        SubscriptionTier::Student => student,
    };
    (code, amount)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub tier: SubscriptionTier,
    pub currency: &'static str,
    pub monthly_price: f64,
    pub monthly_price_formatted: String,
    pub requires_verification: bool,
    pub current: bool,
    pub features: TierFeatures,
}

async fn plans(State(state): State<AppState>, CurrentUser(auth): CurrentUser) -> ApiResult<Vec<Plan>> {
    let user = state.current_user(&auth).await?;
    let country = state.country_of(&user).to_string();
    let local_currency = cultural_adaptation(&country).currency_code;

    let plans = SubscriptionTier::ALL
        .iter()
        .map(|&tier| {
            let (currency, amount) = monthly_price(tier, local_currency);
            Plan {
                tier,
                currency,
                monthly_price: amount,
                monthly_price_formatted: format_currency(amount, &country, currency),
                requires_verification: tier == SubscriptionTier::Student,
                current: tier == user.tier,
                features: tier_features(tier),
            }
        })
        .collect();
    Ok(ApiResponse::ok(plans))
}

async fn subscription(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
) -> ApiResult<Subscription> {
    let user = state.current_user(&auth).await?;
    let subscription = state
        .storage
        .get_subscription(user.id)
        .await?
        .unwrap_or_else(|| Subscription::new(user.id, user.tier));
    Ok(ApiResponse::ok(subscription))
}

/// Stores the subscription, mirrors its tier onto the user and announces it.
pub(crate) async fn apply_subscription(
    state: &AppState,
    user: &mut User,
    subscription: &Subscription,
    tier: SubscriptionTier,
) -> Result<Subscription, ApiError> {
    let subscription = state.storage.upsert_subscription(subscription).await?;
    if user.tier != tier {
        user.tier = tier;
        user.updated_at = now_utc();
        *user = state.storage.update_user(user).await?;
    }
    state.events.publish(
        user.id,
        RealtimeEventKind::Subscription,
        user.id,
        &subscription,
    );
    tracing::info!(user_id = %user.id, tier = %tier, status = %subscription.status, "subscription changed");
    Ok(subscription)
}

#[derive(Debug, Deserialize)]
pub struct ChangeSubscriptionRequest {
    pub tier: SubscriptionTier,
}

async fn change_subscription(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    JsonBody(req): JsonBody<ChangeSubscriptionRequest>,
) -> ApiResult<Subscription> {
    if req.tier == SubscriptionTier::Student {
        let verified = state
            .storage
            .latest_student_verification(auth.user_id)
            .await?
            .is_some_and(|v| v.status == VerificationStatus::Verified);
        if !verified {
            return Err(ApiError::forbidden(
                "The student plan requires an approved student verification",
            ));
        }
    }
    let mut user = state.current_user(&auth).await?;
    let now = now_utc();

    let mut subscription = state
        .storage
        .get_subscription(user.id)
        .await?
        .unwrap_or_else(|| Subscription::new(user.id, req.tier));
    subscription.tier = req.tier;
    subscription.status = SubscriptionStatus::Active;
    subscription.current_period_end = req
        .tier
        .is_paid_features()
        .then(|| now + Duration::days(BILLING_PERIOD_DAYS));
    subscription.updated_at = now;

    let subscription = apply_subscription(&state, &mut user, &subscription, req.tier).await?;
    Ok(ApiResponse::ok(subscription))
}

/// Cancels immediately: the record keeps the canceled tier and the user
/// drops to free.
async fn cancel_subscription(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
) -> ApiResult<Subscription> {
    let mut user = state.current_user(&auth).await?;
    let mut subscription = state
        .storage
        .get_subscription(user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("No subscription to cancel"))?;
    if subscription.status == SubscriptionStatus::Canceled {
        return Ok(ApiResponse::ok(subscription));
    }

    let now = now_utc();
    subscription.status = SubscriptionStatus::Canceled;
    subscription.current_period_end = Some(now);
    subscription.updated_at = now;
    let subscription =
        apply_subscription(&state, &mut user, &subscription, SubscriptionTier::Free).await?;
    Ok(ApiResponse::ok(subscription))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prices_fall_back_to_usd() {
        assert_eq!(monthly_price(SubscriptionTier::Premium, "EUR"), ("EUR", 8.99));
        assert_eq!(monthly_price(SubscriptionTier::Student, "XYZ"), ("USD", 4.99));
        assert_eq!(monthly_price(SubscriptionTier::Free, "JPY"), ("JPY", 0.0));
    }

    #[test]
    fn formatted_for_country() {
        let (currency, amount) = monthly_price(SubscriptionTier::Premium, "EUR");
        assert_eq!(format_currency(amount, "DE", currency), "8,99 €");
        let (currency, amount) = monthly_price(SubscriptionTier::Premium, "USD");
        assert_eq!(format_currency(amount, "US", currency), "$9.99");
    }
}
