//! Tasks, health logs, focus sessions and calendar events.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use thrive_core::model::{
    CalendarEvent, FocusSession, FocusStatus, HealthLog, HealthMetric, Task, TaskStatus,
};
use thrive_storage::{
    CalendarStorage, FocusStorage, HealthLogFilter, HealthMetricSummary, HealthStorage,
    StorageError, StorageResult, TaskFilter, TaskStorage,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::storage::{InMemoryStorage, collect_where};

fn task_matches(task: &Task, user_id: Uuid, filter: &TaskFilter) -> bool {
    task.user_id == user_id
        && filter.status.is_none_or(|s| task.status == s)
        && filter.priority.is_none_or(|p| task.priority == p)
        && filter
            .tag
            .as_deref()
            .is_none_or(|tag| task.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)))
}

#[async_trait]
impl TaskStorage for InMemoryStorage {
    async fn create_task(&self, task: &Task) -> StorageResult<Task> {
        match self.tasks.entry(task.id) {
            Entry::Occupied(_) => Err(StorageError::already_exists("Task", task.id)),
            Entry::Vacant(slot) => Ok(slot.insert(task.clone()).clone()),
        }
    }

    async fn get_task(&self, user_id: Uuid, id: Uuid) -> StorageResult<Option<Task>> {
        Ok(self
            .tasks
            .get(&id)
            .filter(|t| t.user_id == user_id)
            .map(|t| t.clone()))
    }

    async fn list_tasks(&self, user_id: Uuid, filter: &TaskFilter) -> StorageResult<Vec<Task>> {
        let mut tasks = collect_where(&self.tasks, |t| task_matches(t, user_id, filter));
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tasks
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .collect())
    }

    async fn update_task(&self, task: &Task) -> StorageResult<Task> {
        let mut existing = self
            .tasks
            .get_mut(&task.id)
            .filter(|t| t.user_id == task.user_id)
            .ok_or_else(|| StorageError::not_found("Task", task.id))?;
        *existing = task.clone();
        Ok(task.clone())
    }

    async fn delete_task(&self, user_id: Uuid, id: Uuid) -> StorageResult<bool> {
        Ok(self.tasks.remove_if(&id, |_, t| t.user_id == user_id).is_some())
    }

    async fn task_completion_times(&self, user_id: Uuid) -> StorageResult<Vec<OffsetDateTime>> {
        let mut times: Vec<OffsetDateTime> = self
            .tasks
            .iter()
            .filter(|t| t.user_id == user_id && t.status == TaskStatus::Done)
            .filter_map(|t| t.completed_at)
            .collect();
        times.sort();
        Ok(times)
    }

    async fn count_tasks_completed_since(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
    ) -> StorageResult<u64> {
        Ok(self
            .tasks
            .iter()
            .filter(|t| {
                t.user_id == user_id
                    && t.status == TaskStatus::Done
                    && t.completed_at.is_some_and(|at| at >= since)
            })
            .count() as u64)
    }
}

#[async_trait]
impl HealthStorage for InMemoryStorage {
    async fn create_health_log(&self, log: &HealthLog) -> StorageResult<HealthLog> {
        self.health_logs.insert(log.id, log.clone());
        Ok(log.clone())
    }

    async fn list_health_logs(
        &self,
        user_id: Uuid,
        filter: &HealthLogFilter,
    ) -> StorageResult<Vec<HealthLog>> {
        let mut logs = collect_where(&self.health_logs, |l| {
            l.user_id == user_id
                && filter.metric.is_none_or(|m| l.metric == m)
                && filter.from.is_none_or(|from| l.logged_at >= from)
                && filter.to.is_none_or(|to| l.logged_at < to)
        });
        logs.sort_by(|a, b| b.logged_at.cmp(&a.logged_at));
        logs.truncate(filter.limit);
        Ok(logs)
    }

    async fn delete_health_log(&self, user_id: Uuid, id: Uuid) -> StorageResult<bool> {
        Ok(self
            .health_logs
            .remove_if(&id, |_, l| l.user_id == user_id)
            .is_some())
    }

    async fn health_summary(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
    ) -> StorageResult<Vec<HealthMetricSummary>> {
        let mut logs = collect_where(&self.health_logs, |l| {
            l.user_id == user_id && l.logged_at >= since
        });
        logs.sort_by_key(|l| l.logged_at);

        let mut by_metric: BTreeMap<&'static str, (HealthMetric, Vec<&HealthLog>)> =
            BTreeMap::new();
        for log in &logs {
            by_metric
                .entry(log.metric.as_str())
                .or_insert_with(|| (log.metric, Vec::new()))
                .1
                .push(log);
        }

        Ok(by_metric
            .into_values()
            .filter_map(|(metric, entries)| {
                let latest = *entries.last()?;
                let total: f64 = entries.iter().map(|l| l.value).sum();
                let count = entries.len() as u64;
                Some(HealthMetricSummary {
                    metric,
                    unit: latest.unit.clone(),
                    count,
                    total,
                    average: total / count as f64,
                    min: entries.iter().map(|l| l.value).fold(f64::INFINITY, f64::min),
                    max: entries
                        .iter()
                        .map(|l| l.value)
                        .fold(f64::NEG_INFINITY, f64::max),
                    latest: latest.value,
                    latest_at: latest.logged_at,
                })
            })
            .collect())
    }
}

#[async_trait]
impl FocusStorage for InMemoryStorage {
    async fn create_focus_session(&self, session: &FocusSession) -> StorageResult<FocusSession> {
        if session.status == FocusStatus::Active {
            match self.active_focus.entry(session.user_id) {
                Entry::Occupied(slot) => {
                    return Err(StorageError::already_exists("FocusSession", *slot.get()));
                }
                Entry::Vacant(slot) => {
                    slot.insert(session.id);
                }
            }
        }
        self.focus_sessions.insert(session.id, session.clone());
        Ok(session.clone())
    }

    async fn get_focus_session(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> StorageResult<Option<FocusSession>> {
        Ok(self
            .focus_sessions
            .get(&id)
            .filter(|s| s.user_id == user_id)
            .map(|s| s.clone()))
    }

    async fn active_focus_session(&self, user_id: Uuid) -> StorageResult<Option<FocusSession>> {
        let Some(id) = self.active_focus.get(&user_id).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.focus_sessions.get(&id).map(|s| s.clone()))
    }

    async fn update_focus_session(&self, session: &FocusSession) -> StorageResult<FocusSession> {
        {
            let mut existing = self
                .focus_sessions
                .get_mut(&session.id)
                .filter(|s| s.user_id == session.user_id)
                .ok_or_else(|| StorageError::not_found("FocusSession", session.id))?;
            *existing = session.clone();
        }
        if session.status != FocusStatus::Active {
            self.active_focus
                .remove_if(&session.user_id, |_, id| *id == session.id);
        }
        Ok(session.clone())
    }

    async fn list_focus_sessions(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> StorageResult<Vec<FocusSession>> {
        let mut sessions = collect_where(&self.focus_sessions, |s| s.user_id == user_id);
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        sessions.truncate(limit);
        Ok(sessions)
    }

    async fn focus_sessions_since(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
    ) -> StorageResult<Vec<FocusSession>> {
        let mut sessions = collect_where(&self.focus_sessions, |s| {
            s.user_id == user_id && s.started_at >= since
        });
        sessions.sort_by_key(|s| s.started_at);
        Ok(sessions)
    }

    async fn total_focus_minutes(&self, user_id: Uuid) -> StorageResult<u64> {
        Ok(self
            .focus_sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.status == FocusStatus::Completed)
            .map(|s| u64::from(s.actual_minutes.unwrap_or(0)))
            .sum())
    }
}

#[async_trait]
impl CalendarStorage for InMemoryStorage {
    async fn create_calendar_event(&self, event: &CalendarEvent) -> StorageResult<CalendarEvent> {
        self.calendar_events.insert(event.id, event.clone());
        Ok(event.clone())
    }

    async fn get_calendar_event(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> StorageResult<Option<CalendarEvent>> {
        Ok(self
            .calendar_events
            .get(&id)
            .filter(|e| e.user_id == user_id)
            .map(|e| e.clone()))
    }

    async fn list_calendar_events(
        &self,
        user_id: Uuid,
        from: Option<OffsetDateTime>,
        to: Option<OffsetDateTime>,
    ) -> StorageResult<Vec<CalendarEvent>> {
        let mut events = collect_where(&self.calendar_events, |e| {
            e.user_id == user_id && e.overlaps(from, to)
        });
        events.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then(a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn update_calendar_event(&self, event: &CalendarEvent) -> StorageResult<CalendarEvent> {
        let mut existing = self
            .calendar_events
            .get_mut(&event.id)
            .filter(|e| e.user_id == event.user_id)
            .ok_or_else(|| StorageError::not_found("CalendarEvent", event.id))?;
        *existing = event.clone();
        Ok(event.clone())
    }

    async fn delete_calendar_event(&self, user_id: Uuid, id: Uuid) -> StorageResult<bool> {
        Ok(self
            .calendar_events
            .remove_if(&id, |_, e| e.user_id == user_id)
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thrive_core::model::TaskPriority;
    use thrive_core::now_utc;
    use time::Duration;

    #[tokio::test]
    async fn tasks_are_scoped_to_their_owner() {
        let storage = InMemoryStorage::new();
        let owner = Uuid::new_v4();
        let task = storage
            .create_task(&Task::new(owner, "Write report"))
            .await
            .unwrap();

        assert!(storage.get_task(owner, task.id).await.unwrap().is_some());
        assert!(storage.get_task(Uuid::new_v4(), task.id).await.unwrap().is_none());
        assert!(!storage.delete_task(Uuid::new_v4(), task.id).await.unwrap());
        assert!(storage.delete_task(owner, task.id).await.unwrap());
        assert!(storage.get_task(owner, task.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn task_filters() {
        let storage = InMemoryStorage::new();
        let owner = Uuid::new_v4();
        let mut urgent = Task::new(owner, "Fix prod");
        urgent.priority = TaskPriority::Urgent;
        urgent.tags = vec!["Work".into()];
        storage.create_task(&urgent).await.unwrap();
        let mut done = Task::new(owner, "Groceries");
        done.set_status(TaskStatus::Done, now_utc());
        storage.create_task(&done).await.unwrap();

        let filter = TaskFilter {
            tag: Some("work".into()),
            ..Default::default()
        };
        let found = storage.list_tasks(owner, &filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Fix prod");

        let done_only = TaskFilter::default().with_status(TaskStatus::Done);
        assert_eq!(storage.list_tasks(owner, &done_only).await.unwrap().len(), 1);
        assert_eq!(storage.task_completion_times(owner).await.unwrap().len(), 1);
        assert_eq!(
            storage
                .count_tasks_completed_since(owner, now_utc() - Duration::days(7))
                .await
                .unwrap(),
            1
        );
    }

    fn session(user_id: Uuid) -> FocusSession {
        FocusSession {
            id: Uuid::new_v4(),
            user_id,
            task_id: None,
            template_id: None,
            planned_minutes: 25,
            actual_minutes: None,
            status: FocusStatus::Active,
            interruptions: 0,
            started_at: now_utc(),
            ended_at: None,
        }
    }

    #[tokio::test]
    async fn single_active_focus_session() {
        let storage = InMemoryStorage::new();
        let user = Uuid::new_v4();
        let first = storage.create_focus_session(&session(user)).await.unwrap();
        assert!(
            storage
                .create_focus_session(&session(user))
                .await
                .unwrap_err()
                .is_already_exists()
        );

        let mut done = first.clone();
        done.status = FocusStatus::Completed;
        done.actual_minutes = Some(30);
        storage.update_focus_session(&done).await.unwrap();
        assert!(storage.active_focus_session(user).await.unwrap().is_none());
        assert_eq!(storage.total_focus_minutes(user).await.unwrap(), 30);

        storage.create_focus_session(&session(user)).await.unwrap();
    }

    #[tokio::test]
    async fn health_summary_aggregates_per_metric() {
        let storage = InMemoryStorage::new();
        let user = Uuid::new_v4();
        let now = now_utc();
        for (minutes_ago, value) in [(30, 250.0), (20, 500.0), (10, 250.0)] {
            storage
                .create_health_log(&HealthLog {
                    id: Uuid::new_v4(),
                    user_id: user,
                    metric: HealthMetric::Water,
                    value,
                    unit: "ml".into(),
                    note: None,
                    logged_at: now - Duration::minutes(minutes_ago),
                    created_at: now,
                })
                .await
                .unwrap();
        }

        let summary = storage
            .health_summary(user, now - Duration::days(1))
            .await
            .unwrap();
        assert_eq!(summary.len(), 1);
        let water = &summary[0];
        assert_eq!(water.count, 3);
        assert_eq!(water.total, 1000.0);
        assert_eq!(water.min, 250.0);
        assert_eq!(water.max, 500.0);
        assert_eq!(water.latest, 250.0);
    }
}
