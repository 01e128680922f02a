//! HTTP rendering of [`AuthError`] through the API envelope.

use axum::response::{IntoResponse, Response};
use thrive_api::ApiError;

use crate::error::AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
