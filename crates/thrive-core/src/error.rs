use thiserror::Error;

/// Core error types for Thrive domain operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Invalid DateTime: {0}")]
    InvalidDateTime(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Time parsing error: {0}")]
    TimeError(#[from] time::error::Parse),

    #[error("UUID error: {0}")]
    UuidError(#[from] uuid::Error),
}

impl CoreError {
    /// Create a new InvalidValue error
    pub fn invalid_value(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            value: value.into(),
        }
    }

    /// Create a new InvalidDateTime error
    pub fn invalid_date_time(datetime: impl Into<String>) -> Self {
        Self::InvalidDateTime(datetime.into())
    }

    /// Create a new Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the error was caused by caller input rather than an internal fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidValue { .. }
                | Self::InvalidDateTime(_)
                | Self::Validation(_)
                | Self::TimeError(_)
                | Self::UuidError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_value_message() {
        let err = CoreError::invalid_value("priority", "sometimes");
        assert_eq!(err.to_string(), "Invalid value for priority: sometimes");
        assert!(err.is_client_error());
    }

    #[test]
    fn json_error_is_not_client_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = CoreError::from(json_err);
        assert!(!err.is_client_error());
    }
}
