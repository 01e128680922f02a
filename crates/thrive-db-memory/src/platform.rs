//! Platform analytics and schema bookkeeping.

use std::collections::BTreeMap;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use thrive_core::model::{FocusStatus, SubscriptionStatus, TaskStatus, VerificationStatus};
use thrive_storage::{
    AnalyticsStorage, MigrationStatus, PlatformStats, SchemaStorage, StorageResult,
};

use crate::storage::InMemoryStorage;

fn in_memory_schema(applied: bool) -> MigrationStatus {
    MigrationStatus {
        version: 1,
        description: "in-memory schema".to_string(),
        applied,
    }
}

#[async_trait]
impl AnalyticsStorage for InMemoryStorage {
    async fn platform_stats(&self) -> StorageResult<PlatformStats> {
        let mut active_subscriptions = BTreeMap::new();
        for sub in self.subscriptions.iter() {
            if sub.status == SubscriptionStatus::Active {
                *active_subscriptions
                    .entry(sub.tier.as_str().to_string())
                    .or_insert(0) += 1;
            }
        }

        Ok(PlatformStats {
            users: self.users.len() as u64,
            admins: self.users.iter().filter(|u| u.is_admin()).count() as u64,
            tasks: self.tasks.len() as u64,
            completed_tasks: self
                .tasks
                .iter()
                .filter(|t| t.status == TaskStatus::Done)
                .count() as u64,
            focus_sessions: self.focus_sessions.len() as u64,
            focus_minutes: self
                .focus_sessions
                .iter()
                .filter(|s| s.status == FocusStatus::Completed)
                .map(|s| u64::from(s.actual_minutes.unwrap_or(0)))
                .sum(),
            health_logs: self.health_logs.len() as u64,
            badges_unlocked: self.badges.len() as u64,
            notifications: self.notifications.len() as u64,
            pending_student_verifications: self
                .verifications
                .iter()
                .filter(|v| v.status == VerificationStatus::Pending)
                .count() as u64,
            active_subscriptions,
        })
    }
}

#[async_trait]
impl SchemaStorage for InMemoryStorage {
    async fn run_migrations(&self) -> StorageResult<Vec<MigrationStatus>> {
        let was_initialized = self.initialized.swap(true, Ordering::SeqCst);
        if was_initialized {
            Ok(Vec::new())
        } else {
            tracing::debug!("in-memory schema initialized");
            Ok(vec![in_memory_schema(true)])
        }
    }

    async fn migration_status(&self) -> StorageResult<Vec<MigrationStatus>> {
        Ok(vec![in_memory_schema(
            self.initialized.load(Ordering::SeqCst),
        )])
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thrive_core::model::{Subscription, SubscriptionTier, User};
    use thrive_storage::{SubscriptionStorage, UserStorage};

    #[tokio::test]
    async fn migrations_apply_once() {
        let storage = InMemoryStorage::new();
        assert!(!storage.migration_status().await.unwrap()[0].applied);
        assert_eq!(storage.run_migrations().await.unwrap().len(), 1);
        assert!(storage.run_migrations().await.unwrap().is_empty());
        assert!(storage.migration_status().await.unwrap()[0].applied);
    }

    #[tokio::test]
    async fn stats_count_active_subscriptions_by_tier() {
        let storage = InMemoryStorage::new();
        let user = storage
            .create_user(&User::new("ada@example.com", "Ada"))
            .await
            .unwrap();
        storage
            .upsert_subscription(&Subscription::new(user.id, SubscriptionTier::Premium))
            .await
            .unwrap();

        let stats = storage.platform_stats().await.unwrap();
        assert_eq!(stats.users, 1);
        assert_eq!(stats.active_subscriptions.get("premium"), Some(&1));
    }
}
