//! Extractors that read the [`AuthContext`] left by the authentication layer.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::types::AuthContext;
use crate::error::AuthError;

/// Any authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthContext);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AuthError::unauthorized("Authentication required"))
    }
}

/// An authenticated caller with the `admin` role; others get 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthContext);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(context) = CurrentUser::from_request_parts(parts, state).await?;
        if !context.is_admin() {
            tracing::debug!(user_id = %context.user_id, "Admin access denied");
            return Err(AuthError::forbidden("Admin access required"));
        }
        Ok(AdminUser(context))
    }
}
