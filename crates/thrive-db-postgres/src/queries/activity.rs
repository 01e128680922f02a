//! Tasks, health logs, focus sessions and calendar events.

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use thrive_core::model::{CalendarEvent, FocusSession, HealthLog, Task};
use thrive_storage::{
    CalendarStorage, FocusStorage, HealthLogFilter, HealthMetricSummary, HealthStorage,
    StorageResult, TaskFilter, TaskStorage,
};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use super::{
    CALENDAR_COLUMNS, CalendarRow, FOCUS_COLUMNS, FocusRow, HEALTH_COLUMNS, HealthRow,
    TASK_COLUMNS, TaskRow, calendar_from_row, collect_rows, focus_from_row, from_db_count,
    health_from_row, not_found, task_from_row, to_db_int, to_db_limit,
};
use crate::error::{conflict_error, db_error};
use crate::storage::PostgresStorage;

#[async_trait]
impl TaskStorage for PostgresStorage {
    #[instrument(skip(self, task), fields(task_id = %task.id))]
    async fn create_task(&self, task: &Task) -> StorageResult<Task> {
        let sql = format!(
            "INSERT INTO tasks ({TASK_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING {TASK_COLUMNS}"
        );
        let row: TaskRow = query_as(&sql)
            .bind(task.id)
            .bind(task.user_id)
            .bind(&task.title)
            .bind(task.description.as_deref())
            .bind(task.priority.as_str())
            .bind(task.status.as_str())
            .bind(task.due_at)
            .bind(task.estimated_minutes.map(to_db_int))
            .bind(task.tags.as_slice())
            .bind(task.completed_at)
            .bind(task.created_at)
            .bind(task.updated_at)
            .fetch_one(self.pool())
            .await
            .map_err(|e| conflict_error(e, "Task", task.id))?;
        task_from_row(row)
    }

    #[instrument(skip(self))]
    async fn get_task(&self, user_id: Uuid, id: Uuid) -> StorageResult<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND user_id = $2");
        let row: Option<TaskRow> = query_as(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(self.pool())
            .await
            .map_err(db_error)?;
        row.map(task_from_row).transpose()
    }

    #[instrument(skip(self, filter))]
    async fn list_tasks(&self, user_id: Uuid, filter: &TaskFilter) -> StorageResult<Vec<Task>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = $1 \
             AND ($2::text IS NULL OR status = $2) \
             AND ($3::text IS NULL OR priority = $3) \
             AND ($4::text IS NULL OR EXISTS \
                 (SELECT 1 FROM unnest(tags) AS t WHERE lower(t) = lower($4))) \
             ORDER BY created_at DESC, id DESC LIMIT $5 OFFSET $6"
        );
        let rows: Vec<TaskRow> = query_as(&sql)
            .bind(user_id)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.priority.map(|p| p.as_str()))
            .bind(filter.tag.as_deref())
            .bind(to_db_limit(filter.limit))
            .bind(to_db_limit(filter.offset))
            .fetch_all(self.pool())
            .await
            .map_err(db_error)?;
        collect_rows(rows, task_from_row)
    }

    #[instrument(skip(self, task), fields(task_id = %task.id))]
    async fn update_task(&self, task: &Task) -> StorageResult<Task> {
        let sql = format!(
            "UPDATE tasks SET title = $3, description = $4, priority = $5, status = $6, \
             due_at = $7, estimated_minutes = $8, tags = $9, completed_at = $10, updated_at = $11 \
             WHERE id = $1 AND user_id = $2 RETURNING {TASK_COLUMNS}"
        );
        let row: Option<TaskRow> = query_as(&sql)
            .bind(task.id)
            .bind(task.user_id)
            .bind(&task.title)
            .bind(task.description.as_deref())
            .bind(task.priority.as_str())
            .bind(task.status.as_str())
            .bind(task.due_at)
            .bind(task.estimated_minutes.map(to_db_int))
            .bind(task.tags.as_slice())
            .bind(task.completed_at)
            .bind(task.updated_at)
            .fetch_optional(self.pool())
            .await
            .map_err(db_error)?;
        match row {
            Some(row) => task_from_row(row),
            None => Err(not_found("Task", task.id)),
        }
    }

    #[instrument(skip(self))]
    async fn delete_task(&self, user_id: Uuid, id: Uuid) -> StorageResult<bool> {
        let result = query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool())
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn task_completion_times(&self, user_id: Uuid) -> StorageResult<Vec<OffsetDateTime>> {
        query_scalar(
            "SELECT completed_at FROM tasks \
             WHERE user_id = $1 AND status = 'done' AND completed_at IS NOT NULL \
             ORDER BY completed_at",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(db_error)
    }

    #[instrument(skip(self))]
    async fn count_tasks_completed_since(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
    ) -> StorageResult<u64> {
        let count: i64 = query_scalar(
            "SELECT COUNT(*) FROM tasks \
             WHERE user_id = $1 AND status = 'done' AND completed_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(self.pool())
        .await
        .map_err(db_error)?;
        Ok(from_db_count(count))
    }
}

type SummaryRow = (
    String,
    String,
    i64,
    f64,
    f64,
    f64,
    f64,
    f64,
    OffsetDateTime,
);

#[async_trait]
impl HealthStorage for PostgresStorage {
    #[instrument(skip(self, log), fields(metric = %log.metric))]
    async fn create_health_log(&self, log: &HealthLog) -> StorageResult<HealthLog> {
        let sql = format!(
            "INSERT INTO health_logs ({HEALTH_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {HEALTH_COLUMNS}"
        );
        let row: HealthRow = query_as(&sql)
            .bind(log.id)
            .bind(log.user_id)
            .bind(log.metric.as_str())
            .bind(log.value)
            .bind(&log.unit)
            .bind(log.note.as_deref())
            .bind(log.logged_at)
            .bind(log.created_at)
            .fetch_one(self.pool())
            .await
            .map_err(|e| conflict_error(e, "HealthLog", log.id))?;
        health_from_row(row)
    }

    #[instrument(skip(self, filter))]
    async fn list_health_logs(
        &self,
        user_id: Uuid,
        filter: &HealthLogFilter,
    ) -> StorageResult<Vec<HealthLog>> {
        let sql = format!(
            "SELECT {HEALTH_COLUMNS} FROM health_logs WHERE user_id = $1 \
             AND ($2::text IS NULL OR metric = $2) \
             AND ($3::timestamptz IS NULL OR logged_at >= $3) \
             AND ($4::timestamptz IS NULL OR logged_at < $4) \
             ORDER BY logged_at DESC LIMIT $5"
        );
        let rows: Vec<HealthRow> = query_as(&sql)
            .bind(user_id)
            .bind(filter.metric.map(|m| m.as_str()))
            .bind(filter.from)
            .bind(filter.to)
            .bind(to_db_limit(filter.limit))
            .fetch_all(self.pool())
            .await
            .map_err(db_error)?;
        collect_rows(rows, health_from_row)
    }

    #[instrument(skip(self))]
    async fn delete_health_log(&self, user_id: Uuid, id: Uuid) -> StorageResult<bool> {
        let result = query("DELETE FROM health_logs WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool())
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn health_summary(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
    ) -> StorageResult<Vec<HealthMetricSummary>> {
        let rows: Vec<SummaryRow> = query_as(
            "SELECT metric, \
                    (array_agg(unit ORDER BY logged_at DESC))[1], \
                    COUNT(*), SUM(value), AVG(value), MIN(value), MAX(value), \
                    (array_agg(value ORDER BY logged_at DESC))[1], \
                    MAX(logged_at) \
             FROM health_logs WHERE user_id = $1 AND logged_at >= $2 \
             GROUP BY metric ORDER BY metric",
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(self.pool())
        .await
        .map_err(db_error)?;

        rows.into_iter()
            .map(
                |(metric, unit, count, total, average, min, max, latest, latest_at)|
                 -> StorageResult<HealthMetricSummary> {
                    Ok(HealthMetricSummary {
                        metric: metric.parse()?,
                        unit,
                        count: from_db_count(count),
                        total,
                        average,
                        min,
                        max,
                        latest,
                        latest_at,
                    })
                },
            )
            .collect()
    }
}

#[async_trait]
impl FocusStorage for PostgresStorage {
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    async fn create_focus_session(&self, session: &FocusSession) -> StorageResult<FocusSession> {
        let sql = format!(
            "INSERT INTO focus_sessions ({FOCUS_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {FOCUS_COLUMNS}"
        );
        let row: FocusRow = query_as(&sql)
            .bind(session.id)
            .bind(session.user_id)
            .bind(session.task_id)
            .bind(session.template_id.as_deref())
            .bind(to_db_int(session.planned_minutes))
            .bind(session.actual_minutes.map(to_db_int))
            .bind(session.status.as_str())
            .bind(to_db_int(session.interruptions))
            .bind(session.started_at)
            .bind(session.ended_at)
            .fetch_one(self.pool())
            .await
            .map_err(|e| conflict_error(e, "FocusSession", session.user_id))?;
        focus_from_row(row)
    }

    #[instrument(skip(self))]
    async fn get_focus_session(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> StorageResult<Option<FocusSession>> {
        let sql =
            format!("SELECT {FOCUS_COLUMNS} FROM focus_sessions WHERE id = $1 AND user_id = $2");
        let row: Option<FocusRow> = query_as(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(self.pool())
            .await
            .map_err(db_error)?;
        row.map(focus_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn active_focus_session(&self, user_id: Uuid) -> StorageResult<Option<FocusSession>> {
        let sql = format!(
            "SELECT {FOCUS_COLUMNS} FROM focus_sessions WHERE user_id = $1 AND status = 'active'"
        );
        let row: Option<FocusRow> = query_as(&sql)
            .bind(user_id)
            .fetch_optional(self.pool())
            .await
            .map_err(db_error)?;
        row.map(focus_from_row).transpose()
    }

    #[instrument(skip(self, session), fields(session_id = %session.id))]
    async fn update_focus_session(&self, session: &FocusSession) -> StorageResult<FocusSession> {
        let sql = format!(
            "UPDATE focus_sessions SET task_id = $3, template_id = $4, planned_minutes = $5, \
             actual_minutes = $6, status = $7, interruptions = $8, ended_at = $9 \
             WHERE id = $1 AND user_id = $2 RETURNING {FOCUS_COLUMNS}"
        );
        let row: Option<FocusRow> = query_as(&sql)
            .bind(session.id)
            .bind(session.user_id)
            .bind(session.task_id)
            .bind(session.template_id.as_deref())
            .bind(to_db_int(session.planned_minutes))
            .bind(session.actual_minutes.map(to_db_int))
            .bind(session.status.as_str())
            .bind(to_db_int(session.interruptions))
            .bind(session.ended_at)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| conflict_error(e, "FocusSession", session.user_id))?;
        match row {
            Some(row) => focus_from_row(row),
            None => Err(not_found("FocusSession", session.id)),
        }
    }

    #[instrument(skip(self))]
    async fn list_focus_sessions(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> StorageResult<Vec<FocusSession>> {
        let sql = format!(
            "SELECT {FOCUS_COLUMNS} FROM focus_sessions WHERE user_id = $1 \
             ORDER BY started_at DESC LIMIT $2"
        );
        let rows: Vec<FocusRow> = query_as(&sql)
            .bind(user_id)
            .bind(to_db_limit(limit))
            .fetch_all(self.pool())
            .await
            .map_err(db_error)?;
        collect_rows(rows, focus_from_row)
    }

    #[instrument(skip(self))]
    async fn focus_sessions_since(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
    ) -> StorageResult<Vec<FocusSession>> {
        let sql = format!(
            "SELECT {FOCUS_COLUMNS} FROM focus_sessions WHERE user_id = $1 AND started_at >= $2 \
             ORDER BY started_at"
        );
        let rows: Vec<FocusRow> = query_as(&sql)
            .bind(user_id)
            .bind(since)
            .fetch_all(self.pool())
            .await
            .map_err(db_error)?;
        collect_rows(rows, focus_from_row)
    }

    #[instrument(skip(self))]
    async fn total_focus_minutes(&self, user_id: Uuid) -> StorageResult<u64> {
        let total: i64 = query_scalar(
            "SELECT COALESCE(SUM(actual_minutes), 0)::bigint FROM focus_sessions \
             WHERE user_id = $1 AND status = 'completed'",
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await
        .map_err(db_error)?;
        Ok(from_db_count(total))
    }
}

#[async_trait]
impl CalendarStorage for PostgresStorage {
    #[instrument(skip(self, event), fields(event_id = %event.id))]
    async fn create_calendar_event(&self, event: &CalendarEvent) -> StorageResult<CalendarEvent> {
        let sql = format!(
            "INSERT INTO calendar_events ({CALENDAR_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {CALENDAR_COLUMNS}"
        );
        let row: CalendarRow = query_as(&sql)
            .bind(event.id)
            .bind(event.user_id)
            .bind(&event.title)
            .bind(event.description.as_deref())
            .bind(event.location.as_deref())
            .bind(event.starts_at)
            .bind(event.ends_at)
            .bind(event.all_day)
            .bind(event.source.as_str())
            .bind(event.external_id.as_deref())
            .bind(event.created_at)
            .bind(event.updated_at)
            .fetch_one(self.pool())
            .await
            .map_err(|e| conflict_error(e, "CalendarEvent", event.id))?;
        calendar_from_row(row)
    }

    #[instrument(skip(self))]
    async fn get_calendar_event(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> StorageResult<Option<CalendarEvent>> {
        let sql = format!(
            "SELECT {CALENDAR_COLUMNS} FROM calendar_events WHERE id = $1 AND user_id = $2"
        );
        let row: Option<CalendarRow> = query_as(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(self.pool())
            .await
            .map_err(db_error)?;
        row.map(calendar_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn list_calendar_events(
        &self,
        user_id: Uuid,
        from: Option<OffsetDateTime>,
        to: Option<OffsetDateTime>,
    ) -> StorageResult<Vec<CalendarEvent>> {
        let sql = format!(
            "SELECT {CALENDAR_COLUMNS} FROM calendar_events WHERE user_id = $1 \
             AND ($2::timestamptz IS NULL OR ends_at > $2 OR starts_at >= $2) \
             AND ($3::timestamptz IS NULL OR starts_at < $3) \
             ORDER BY starts_at, id"
        );
        let rows: Vec<CalendarRow> = query_as(&sql)
            .bind(user_id)
            .bind(from)
            .bind(to)
            .fetch_all(self.pool())
            .await
            .map_err(db_error)?;
        collect_rows(rows, calendar_from_row)
    }

    #[instrument(skip(self, event), fields(event_id = %event.id))]
    async fn update_calendar_event(&self, event: &CalendarEvent) -> StorageResult<CalendarEvent> {
        let sql = format!(
            "UPDATE calendar_events SET title = $3, description = $4, location = $5, \
             starts_at = $6, ends_at = $7, all_day = $8, source = $9, external_id = $10, \
             updated_at = $11 WHERE id = $1 AND user_id = $2 RETURNING {CALENDAR_COLUMNS}"
        );
        let row: Option<CalendarRow> = query_as(&sql)
            .bind(event.id)
            .bind(event.user_id)
            .bind(&event.title)
            .bind(event.description.as_deref())
            .bind(event.location.as_deref())
            .bind(event.starts_at)
            .bind(event.ends_at)
            .bind(event.all_day)
            .bind(event.source.as_str())
            .bind(event.external_id.as_deref())
            .bind(event.updated_at)
            .fetch_optional(self.pool())
            .await
            .map_err(db_error)?;
        match row {
            Some(row) => calendar_from_row(row),
            None => Err(not_found("CalendarEvent", event.id)),
        }
    }

    #[instrument(skip(self))]
    async fn delete_calendar_event(&self, user_id: Uuid, id: Uuid) -> StorageResult<bool> {
        let result = query("DELETE FROM calendar_events WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool())
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}
