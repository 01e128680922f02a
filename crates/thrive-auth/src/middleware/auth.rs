//! Bearer token authentication layer.
//!
//! Every `/api/*` request outside the public whitelist must carry
//! `Authorization: Bearer <jwt>`. A verified token becomes an [`AuthContext`]
//! in the request extensions; anything else is rejected with 401 before the
//! handler runs.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use super::types::AuthContext;
use crate::error::AuthError;
use crate::jwt::JwtService;

/// Paths reachable without a token.
pub const PUBLIC_PATHS: &[&str] = &[
    "/health",
    "/init-db",
    "/metrics",
    "/api/localization/languages",
    "/api/focus/templates",
    "/api/auth/register",
    "/api/auth/login",
    "/api/realtime/events",
];

/// Path prefixes reachable without a token.
pub const PUBLIC_PREFIXES: &[&str] = &["/api/auth/otp/"];

#[derive(Debug, Clone)]
pub struct AuthState {
    pub jwt: Arc<JwtService>,
}

impl AuthState {
    pub fn new(jwt: Arc<JwtService>) -> Self {
        Self { jwt }
    }

    /// Verifies a raw token and builds the caller's context.
    pub fn authenticate(&self, token: &str) -> Result<AuthContext, AuthError> {
        let claims = self.jwt.verify(token)?;
        AuthContext::try_from(claims)
    }
}

pub fn is_public_path(path: &str) -> bool {
    let path = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };
    PUBLIC_PATHS.contains(&path) || PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// Extracts the token from `Authorization: Bearer <token>`. The scheme is
/// matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

pub async fn authentication_middleware(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let path = request.uri().path();
    if is_public_path(path) || !path.starts_with("/api/") {
        return Ok(next.run(request).await);
    }

    let token = bearer_token(request.headers())
        .ok_or_else(|| AuthError::unauthorized("Missing Authorization header"))?;

    let context = state.authenticate(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        e
    })?;

    tracing::trace!(user_id = %context.user_id, "Request authenticated");
    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}
