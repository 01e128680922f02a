use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

string_enum! {
    /// Task urgency, ordered from least to most urgent.
    pub enum TaskPriority ("priority") {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

impl TaskPriority {
    /// Numeric rank used for ordering (higher is more urgent).
    pub fn rank(&self) -> u8 {
        match self {
            TaskPriority::Low => 0,
            TaskPriority::Medium => 1,
            TaskPriority::High => 2,
            TaskPriority::Urgent => 3,
        }
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

string_enum! {
    pub enum TaskStatus ("status") {
        Pending => "pending",
        Done => "done",
        Archived => "archived",
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub due_at: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Task {
    /// Creates a pending task owned by `user_id`.
    pub fn new(user_id: Uuid, title: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: title.into(),
            description: None,
            priority: TaskPriority::default(),
            status: TaskStatus::Pending,
            due_at: None,
            estimated_minutes: None,
            tags: Vec::new(),
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the task into `status`, keeping `completed_at` consistent with it.
    pub fn set_status(&mut self, status: TaskStatus, at: OffsetDateTime) {
        match (self.status, status) {
            (TaskStatus::Done, TaskStatus::Done) => {}
            (_, TaskStatus::Done) => self.completed_at = Some(at),
            (_, _) => self.completed_at = None,
        }
        self.status = status;
        self.updated_at = at;
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn completing_stamps_completed_at() {
        let mut task = Task::new(Uuid::new_v4(), "Stretch");
        let at = datetime!(2025-03-01 07:15 UTC);
        task.set_status(TaskStatus::Done, at);
        assert_eq!(task.completed_at, Some(at));

        // completing again keeps the original completion time
        task.set_status(TaskStatus::Done, datetime!(2025-03-02 07:15 UTC));
        assert_eq!(task.completed_at, Some(at));

        task.set_status(TaskStatus::Pending, datetime!(2025-03-03 07:15 UTC));
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn priority_rank_orders() {
        assert!(TaskPriority::Urgent.rank() > TaskPriority::High.rank());
        assert!(TaskPriority::Low.rank() < TaskPriority::Medium.rank());
    }
}
