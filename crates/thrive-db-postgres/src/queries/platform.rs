//! Platform analytics and schema management.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx_core::query_as::query_as;
use thrive_storage::{
    AnalyticsStorage, MigrationStatus, PlatformStats, SchemaStorage, StorageResult,
};
use tracing::instrument;

use super::from_db_count;
use crate::error::db_error;
use crate::migrations;
use crate::pool;
use crate::storage::PostgresStorage;

type CountsRow = (i64, i64, i64, i64, i64, i64, i64, i64, i64, i64);

#[async_trait]
impl AnalyticsStorage for PostgresStorage {
    #[instrument(skip(self))]
    async fn platform_stats(&self) -> StorageResult<PlatformStats> {
        let counts: CountsRow = query_as(
            "SELECT \
                (SELECT COUNT(*) FROM users), \
                (SELECT COUNT(*) FROM users WHERE role = 'admin'), \
                (SELECT COUNT(*) FROM tasks), \
                (SELECT COUNT(*) FROM tasks WHERE status = 'done'), \
                (SELECT COUNT(*) FROM focus_sessions), \
                (SELECT COALESCE(SUM(actual_minutes), 0)::bigint FROM focus_sessions \
                    WHERE status = 'completed'), \
                (SELECT COUNT(*) FROM health_logs), \
                (SELECT COUNT(*) FROM user_badges), \
                (SELECT COUNT(*) FROM notifications), \
                (SELECT COUNT(*) FROM student_verifications WHERE status = 'pending')",
        )
        .fetch_one(self.pool())
        .await
        .map_err(db_error)?;

        let tiers: Vec<(String, i64)> = query_as(
            "SELECT tier, COUNT(*) FROM subscriptions WHERE status = 'active' \
             GROUP BY tier ORDER BY tier",
        )
        .fetch_all(self.pool())
        .await
        .map_err(db_error)?;

        let (
            users,
            admins,
            tasks,
            completed_tasks,
            focus_sessions,
            focus_minutes,
            health_logs,
            badges_unlocked,
            notifications,
            pending_student_verifications,
        ) = counts;

        Ok(PlatformStats {
            users: from_db_count(users),
            admins: from_db_count(admins),
            tasks: from_db_count(tasks),
            completed_tasks: from_db_count(completed_tasks),
            focus_sessions: from_db_count(focus_sessions),
            focus_minutes: from_db_count(focus_minutes),
            health_logs: from_db_count(health_logs),
            badges_unlocked: from_db_count(badges_unlocked),
            notifications: from_db_count(notifications),
            pending_student_verifications: from_db_count(pending_student_verifications),
            active_subscriptions: tiers
                .into_iter()
                .map(|(tier, count)| (tier, from_db_count(count)))
                .collect::<BTreeMap<_, _>>(),
        })
    }
}

#[async_trait]
impl SchemaStorage for PostgresStorage {
    async fn run_migrations(&self) -> StorageResult<Vec<MigrationStatus>> {
        Ok(migrations::run(self.pool()).await?)
    }

    async fn migration_status(&self) -> StorageResult<Vec<MigrationStatus>> {
        Ok(migrations::status(self.pool()).await?)
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(pool::test_connection(self.pool()).await?)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
