//! Embedded schema migrations.
//!
//! SQL files live in `migrations/` and are compiled into the binary, so the
//! server can bootstrap an empty database without filesystem access. Applied
//! versions are tracked in `_sqlx_migrations`.

use std::borrow::Cow;
use std::collections::HashSet;

use sqlx_core::migrate::{Migration, MigrationType, Migrator};
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::PgPool;
use thrive_storage::MigrationStatus;
use tracing::{info, instrument};

use crate::error::{PostgresError, Result, is_undefined_table};

/// Add new migrations here in version order: (version, description, sql).
macro_rules! embedded_migrations {
    () => {
        &[
            (
                20250301000001i64,
                "core_schema",
                include_str!("../migrations/20250301000001_core_schema.sql"),
            ),
            (
                20250301000002i64,
                "community",
                include_str!("../migrations/20250301000002_community.sql"),
            ),
        ]
    };
}

fn build_migrations() -> Vec<Migration> {
    embedded_migrations!()
        .iter()
        .map(|(version, description, sql)| Migration {
            version: *version,
            description: Cow::Borrowed(description),
            migration_type: MigrationType::Simple,
            sql: Cow::Borrowed(sql),
            checksum: Cow::Borrowed(&[]),
            no_tx: false,
        })
        .collect()
}

async fn applied_versions(pool: &PgPool) -> Result<HashSet<i64>> {
    let versions: std::result::Result<Vec<i64>, _> =
        query_scalar("SELECT version FROM _sqlx_migrations WHERE success ORDER BY version")
            .fetch_all(pool)
            .await;
    match versions {
        Ok(versions) => Ok(versions.into_iter().collect()),
        Err(e) if is_undefined_table(&e) => Ok(HashSet::new()),
        Err(e) => Err(e.into()),
    }
}

/// Every embedded migration with its applied flag.
pub async fn status(pool: &PgPool) -> Result<Vec<MigrationStatus>> {
    let applied = applied_versions(pool).await?;
    Ok(build_migrations()
        .into_iter()
        .map(|m| MigrationStatus {
            version: m.version,
            description: m.description.into_owned(),
            applied: applied.contains(&m.version),
        })
        .collect())
}

/// Runs pending migrations and returns the ones applied by this call.
#[instrument(skip(pool))]
pub async fn run(pool: &PgPool) -> Result<Vec<MigrationStatus>> {
    let before = applied_versions(pool).await?;
    let migrations = build_migrations();
    info!(
        known = migrations.len(),
        applied = before.len(),
        "Running database migrations"
    );

    let migrator = Migrator {
        migrations: Cow::Owned(migrations),
        ignore_missing: false,
        locking: true,
        no_tx: false,
    };
    migrator
        .run(pool)
        .await
        .map_err(|e| PostgresError::Migration(format!("Migration failed: {e}")))?;

    let newly_applied: Vec<MigrationStatus> = status(pool)
        .await?
        .into_iter()
        .filter(|m| m.applied && !before.contains(&m.version))
        .collect();
    info!(count = newly_applied.len(), "Database migrations completed");
    Ok(newly_applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_ordered_and_unique() {
        let migrations = build_migrations();
        assert!(!migrations.is_empty());
        let versions: Vec<i64> = migrations.iter().map(|m| m.version).collect();
        let mut sorted = versions.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(versions, sorted);
        assert!(migrations.iter().all(|m| !m.sql.trim().is_empty()));
    }
}
