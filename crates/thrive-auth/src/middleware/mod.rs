//! Axum integration: the authentication layer and the extractors handlers
//! use to read its result.

mod auth;
mod error;
mod extractors;
mod types;

pub use auth::{
    AuthState, PUBLIC_PATHS, PUBLIC_PREFIXES, authentication_middleware, bearer_token,
    is_public_path,
};
pub use extractors::{AdminUser, CurrentUser};
pub use types::AuthContext;
