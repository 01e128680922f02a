//! Query and aggregate types shared by the storage traits.

use std::collections::BTreeMap;

use serde::Serialize;
use thrive_core::model::{HealthMetric, TaskPriority, TaskStatus, VerificationStatus};
use time::OffsetDateTime;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 500;

/// Clamps a requested page size into `1..=MAX_PAGE_SIZE`.
pub fn page_size(requested: Option<usize>) -> usize {
    requested.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// Filter for listing a user's tasks. Results are newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub tag: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for TaskFilter {
    fn default() -> Self {
        Self {
            status: None,
            priority: None,
            tag: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl TaskFilter {
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Filter for listing health logs. Results are newest `logged_at` first.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthLogFilter {
    pub metric: Option<HealthMetric>,
    pub from: Option<OffsetDateTime>,
    pub to: Option<OffsetDateTime>,
    pub limit: usize,
}

impl Default for HealthLogFilter {
    fn default() -> Self {
        Self {
            metric: None,
            from: None,
            to: None,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Per-metric aggregate over a time window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetricSummary {
    pub metric: HealthMetric,
    pub unit: String,
    pub count: u64,
    pub total: f64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub latest: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub latest_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentVerificationFilter {
    pub status: Option<VerificationStatus>,
    pub limit: usize,
}

/// Platform-wide totals for the analytics and admin dashboards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub users: u64,
    pub admins: u64,
    pub tasks: u64,
    pub completed_tasks: u64,
    pub focus_sessions: u64,
    pub focus_minutes: u64,
    pub health_logs: u64,
    pub badges_unlocked: u64,
    pub notifications: u64,
    pub pending_student_verifications: u64,
    /// Active subscriptions keyed by tier name.
    pub active_subscriptions: BTreeMap<String, u64>,
}

/// A schema migration known to a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationStatus {
    pub version: i64,
    pub description: String,
    pub applied: bool,
}
