//! PostgreSQL implementation of the storage traits.
//!
//! The trait impls live in [`crate::queries`], grouped by aggregate.

use sqlx_postgres::PgPool;
use thrive_storage::StorageError;
use tracing::info;

use crate::config::PostgresConfig;
use crate::migrations;
use crate::pool;

#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Opens a pool and, when configured, applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection pool cannot be created
    /// or if migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, StorageError> {
        let pool = pool::create_pool(&config).await?;

        if config.run_migrations {
            let applied = migrations::run(&pool).await?;
            info!(applied = applied.len(), "PostgreSQL schema is up to date");
        }

        Ok(Self { pool })
    }

    /// Wraps an existing pool. Migrations are not run.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
