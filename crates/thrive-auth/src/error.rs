//! Authentication errors.

use thrive_api::ApiError;
use thrive_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{message}")]
    Unauthorized { message: String },

    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{message}")]
    Forbidden { message: String },

    #[error("{message}")]
    InvalidRequest { message: String },

    #[error("{message}")]
    RateLimited { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AuthError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Errors that mean "the caller is not authenticated".
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. }
                | Self::InvalidToken { .. }
                | Self::TokenExpired
                | Self::InvalidCredentials
        )
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        Self::Storage {
            message: err.to_string(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthorized { .. }
            | AuthError::InvalidToken { .. }
            | AuthError::TokenExpired
            | AuthError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
            AuthError::Forbidden { message } => ApiError::forbidden(message),
            AuthError::InvalidRequest { message } => ApiError::bad_request(message),
            AuthError::RateLimited { message } => ApiError::too_many_requests(message),
            AuthError::Storage { .. }
            | AuthError::Configuration { .. }
            | AuthError::Internal { .. } => ApiError::internal(err.to_string()),
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn maps_to_api_status() {
        let cases = [
            (AuthError::unauthorized("Missing token"), StatusCode::UNAUTHORIZED),
            (AuthError::TokenExpired, StatusCode::UNAUTHORIZED),
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::forbidden("Admin access required"), StatusCode::FORBIDDEN),
            (AuthError::invalid_request("bad email"), StatusCode::BAD_REQUEST),
            (AuthError::rate_limited("slow down"), StatusCode::TOO_MANY_REQUESTS),
            (AuthError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn storage_errors_are_internal() {
        let err: AuthError = StorageError::connection_error("down").into();
        assert!(!err.is_authentication_failure());
        assert_eq!(
            ApiError::from(err).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
