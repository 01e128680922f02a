//! Error types for the PostgreSQL storage backend.

use sqlx_core::error::Error as SqlxError;
use thrive_storage::StorageError;

/// PostgreSQL error code for unique constraint violations (23505).
pub const PG_UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL error code for foreign key violations (23503).
pub const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

/// PostgreSQL error code for check constraint violations (23514).
pub const PG_CHECK_VIOLATION: &str = "23514";

/// PostgreSQL error code for undefined table (42P01).
pub const PG_UNDEFINED_TABLE: &str = "42P01";

pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

pub fn is_unique_violation(err: &SqlxError) -> bool {
    has_pg_error_code(err, PG_UNIQUE_VIOLATION)
}

pub fn is_undefined_table(err: &SqlxError) -> bool {
    has_pg_error_code(err, PG_UNDEFINED_TABLE)
}

/// Errors specific to the PostgreSQL storage backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Pool error: {message}")]
    Pool { message: String },
}

impl PostgresError {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn pool(message: impl Into<String>) -> Self {
        Self::Pool {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Database(e) => match e {
                SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_) => {
                    StorageError::connection_error(e.to_string())
                }
                SqlxError::Tls(_) => StorageError::connection_error(e.to_string()),
                ref db if is_undefined_table(db) => StorageError::migration(
                    "database schema is not initialized; run the migrations first",
                ),
                ref db
                    if has_pg_error_code(db, PG_CHECK_VIOLATION)
                        || has_pg_error_code(db, PG_FOREIGN_KEY_VIOLATION) =>
                {
                    StorageError::invalid_input(e.to_string())
                }
                other => StorageError::internal(format!("Database error: {other}")),
            },
            PostgresError::Migration(e) => StorageError::migration(e),
            PostgresError::Config { message } => {
                StorageError::internal(format!("Configuration error: {message}"))
            }
            PostgresError::Pool { message } => {
                StorageError::connection_error(format!("Pool error: {message}"))
            }
        }
    }
}

/// Maps a query error to a `StorageError`.
pub(crate) fn db_error(err: SqlxError) -> StorageError {
    PostgresError::from(err).into()
}

/// Like [`db_error`] but reports unique violations as `AlreadyExists`.
pub(crate) fn conflict_error(err: SqlxError, entity: &str, id: impl ToString) -> StorageError {
    if is_unique_violation(&err) {
        StorageError::already_exists(entity, id)
    } else {
        db_error(err)
    }
}

pub type Result<T> = std::result::Result<T, PostgresError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let err = PostgresError::config("invalid URL");
        assert!(err.to_string().contains("Configuration error"));

        let err = PostgresError::pool("pool exhausted");
        assert!(err.to_string().contains("Pool error"));
    }

    #[test]
    fn conversion_to_storage_error() {
        let storage_err: StorageError = PostgresError::config("test error").into();
        assert!(matches!(storage_err, StorageError::Internal { .. }));

        let storage_err: StorageError = PostgresError::Database(SqlxError::PoolTimedOut).into();
        assert!(matches!(storage_err, StorageError::ConnectionError { .. }));

        let storage_err: StorageError = PostgresError::Migration("boom".into()).into();
        assert!(matches!(storage_err, StorageError::Migration { .. }));
    }

    #[test]
    fn non_database_errors_are_not_conflicts() {
        let err = conflict_error(SqlxError::RowNotFound, "Task", 1);
        assert!(!err.is_already_exists());
    }
}
