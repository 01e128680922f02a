//! Authentication for the Thrive server.
//!
//! - [`jwt`]: HS256 access tokens
//! - [`password`]: argon2id password hashing
//! - [`otp`]: one-time login codes and their delivery seam
//! - [`middleware`]: the axum layer that guards `/api/*` plus the
//!   [`CurrentUser`] and [`AdminUser`] extractors
//!
//! ```ignore
//! use axum::{Router, middleware::from_fn_with_state, routing::get};
//! use thrive_auth::{AuthState, CurrentUser, JwtService, authentication_middleware};
//!
//! async fn me(CurrentUser(auth): CurrentUser) -> String {
//!     auth.email
//! }
//!
//! let state = AuthState::new(Arc::new(JwtService::new(secret, "thrive", 3600)));
//! let app = Router::new()
//!     .route("/api/auth/me", get(me))
//!     .layer(from_fn_with_state(state, authentication_middleware));
//! ```

pub mod error;
pub mod jwt;
pub mod middleware;
pub mod otp;
pub mod password;

pub use error::{AuthError, AuthResult};
pub use jwt::{AccessTokenClaims, IssuedToken, JwtService};
pub use middleware::{
    AdminUser, AuthContext, AuthState, CurrentUser, PUBLIC_PATHS, PUBLIC_PREFIXES,
    authentication_middleware, bearer_token, is_public_path,
};
pub use otp::{LogOtpSender, OtpPolicy, OtpSender};
pub use password::{MIN_PASSWORD_LENGTH, hash_password, validate_password, verify_password};
