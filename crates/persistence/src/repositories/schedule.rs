//! Report schedule repository for tenant database operations.

use chrono::NaiveDateTime;
use sqlx::PgPool;

use domain::models::{
    ExecutionLogEntry, NewExecutionLogEntry, NewSchedule, Schedule, ScheduleChanges,
};
use domain::services::{ScheduleStore, StoreError};

use crate::entities::{ReportScheduleEntity, ScheduleLogEntity};
use crate::error::store_error;
use crate::metrics::QueryTimer;

const SCHEDULE_COLUMNS: &str = r#"
    id, report_type, schedule_name, created_by, created_at, is_active,
    recurrence_type, recurrence_day, schedule_time, recurrence_json, parameters_json,
    export_format, recipients, email_subject, next_run_at, last_run_at, run_count
"#;

/// Repository for one tenant's schedules and execution log.
#[derive(Clone)]
pub struct ScheduleRepository {
    pool: PgPool,
}

impl ScheduleRepository {
    /// Creates a new ScheduleRepository with the given tenant pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ScheduleStore for ScheduleRepository {
    async fn create(&self, schedule: &NewSchedule) -> Result<Schedule, StoreError> {
        let timer = QueryTimer::new("create_schedule");
        let sql = format!(
            r#"
            INSERT INTO report_schedules (
                report_type, schedule_name, created_by, created_at, is_active,
                recurrence_type, recurrence_day, schedule_time, recurrence_json, parameters_json,
                export_format, recipients, email_subject, next_run_at
            )
            VALUES ($1, $2, $3, $4, TRUE, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {SCHEDULE_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, ReportScheduleEntity>(&sql)
            .bind(&schedule.report_type)
            .bind(&schedule.schedule_name)
            .bind(&schedule.created_by)
            .bind(schedule.created_at)
            .bind(&schedule.legacy.recurrence_type)
            .bind(schedule.legacy.recurrence_day)
            .bind(schedule.legacy.schedule_time)
            .bind(&schedule.recurrence_json)
            .bind(&schedule.parameters_json)
            .bind(schedule.export_format.as_str())
            .bind(&schedule.recipients)
            .bind(&schedule.email_subject)
            .bind(schedule.next_run_at)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result.map(Schedule::from).map_err(store_error)
    }

    async fn get(&self, id: i64) -> Result<Option<Schedule>, StoreError> {
        let timer = QueryTimer::new("get_schedule");
        let sql = format!("SELECT {SCHEDULE_COLUMNS} FROM report_schedules WHERE id = $1");
        let result = sqlx::query_as::<_, ReportScheduleEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
            .map(|row| row.map(Schedule::from))
            .map_err(store_error)
    }

    async fn list_active(&self, report_type: Option<&str>) -> Result<Vec<Schedule>, StoreError> {
        let timer = QueryTimer::new("list_active_schedules");
        let sql = format!(
            r#"
            SELECT {SCHEDULE_COLUMNS} FROM report_schedules
            WHERE is_active AND ($1::text IS NULL OR report_type = $1)
            ORDER BY created_at DESC, id DESC
            "#
        );
        let result = sqlx::query_as::<_, ReportScheduleEntity>(&sql)
            .bind(report_type)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
            .map(|rows| rows.into_iter().map(Schedule::from).collect())
            .map_err(store_error)
    }

    async fn update(&self, id: i64, changes: &ScheduleChanges) -> Result<Schedule, StoreError> {
        let timer = QueryTimer::new("update_schedule");
        let sql = format!(
            r#"
            UPDATE report_schedules SET
                schedule_name = $2,
                is_active = $3,
                recurrence_type = $4,
                recurrence_day = $5,
                schedule_time = $6,
                recurrence_json = $7,
                parameters_json = $8,
                export_format = $9,
                recipients = $10,
                email_subject = $11,
                next_run_at = $12,
                run_count = CASE WHEN $13 THEN 0 ELSE run_count END
            WHERE id = $1
            RETURNING {SCHEDULE_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, ReportScheduleEntity>(&sql)
            .bind(id)
            .bind(&changes.schedule_name)
            .bind(changes.is_active)
            .bind(&changes.legacy.recurrence_type)
            .bind(changes.legacy.recurrence_day)
            .bind(changes.legacy.schedule_time)
            .bind(&changes.recurrence_json)
            .bind(&changes.parameters_json)
            .bind(changes.export_format.as_str())
            .bind(&changes.recipients)
            .bind(&changes.email_subject)
            .bind(changes.next_run_at)
            .bind(changes.restart_occurrences)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        match result.map_err(store_error)? {
            Some(row) => Ok(row.into()),
            None => Err(StoreError::NotFound(format!("Schedule {}", id))),
        }
    }

    async fn deactivate(&self, id: i64) -> Result<(), StoreError> {
        let timer = QueryTimer::new("deactivate_schedule");
        let result = sqlx::query("UPDATE report_schedules SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        if result.map_err(store_error)?.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Schedule {}", id)));
        }
        Ok(())
    }

    async fn count_active_for_report(&self, report_type: &str) -> Result<i64, StoreError> {
        let timer = QueryTimer::new("count_active_schedules");
        let result: Result<(i64,), sqlx::Error> = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM report_schedules WHERE is_active AND report_type = $1
            "#,
        )
        .bind(report_type)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map(|count| count.0).map_err(store_error)
    }

    async fn list_due(&self, as_of: NaiveDateTime) -> Result<Vec<Schedule>, StoreError> {
        let timer = QueryTimer::new("list_due_schedules");
        let sql = format!(
            r#"
            SELECT {SCHEDULE_COLUMNS} FROM report_schedules
            WHERE is_active AND next_run_at IS NOT NULL AND next_run_at <= $1
            ORDER BY next_run_at, id
            "#
        );
        let result = sqlx::query_as::<_, ReportScheduleEntity>(&sql)
            .bind(as_of)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
            .map(|rows| rows.into_iter().map(Schedule::from).collect())
            .map_err(store_error)
    }

    async fn record_execution(
        &self,
        id: i64,
        ran_at: NaiveDateTime,
        next_run_at: Option<NaiveDateTime>,
        deactivate: bool,
    ) -> Result<(), StoreError> {
        let timer = QueryTimer::new("record_schedule_execution");
        let result = sqlx::query(
            r#"
            UPDATE report_schedules SET
                last_run_at = $2,
                next_run_at = $3,
                is_active = is_active AND NOT $4,
                run_count = run_count + 1
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(ran_at)
        .bind(next_run_at)
        .bind(deactivate)
        .execute(&self.pool)
        .await;
        timer.record();
        if result.map_err(store_error)?.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Schedule {}", id)));
        }
        Ok(())
    }

    async fn append_log(&self, entry: &NewExecutionLogEntry) -> Result<i64, StoreError> {
        let timer = QueryTimer::new("append_schedule_log");
        let result: Result<(i64,), sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO report_schedule_logs (
                schedule_id, run_at, status, rows_produced, output_bytes, error_message, duration_ms
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(entry.schedule_id)
        .bind(entry.run_at)
        .bind(entry.status.as_str())
        .bind(entry.rows_produced)
        .bind(entry.output_bytes)
        .bind(&entry.error_message)
        .bind(entry.duration_ms)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map(|row| row.0).map_err(store_error)
    }

    async fn list_logs(&self, schedule_id: i64, limit: i64) -> Result<Vec<ExecutionLogEntry>, StoreError> {
        let timer = QueryTimer::new("list_schedule_logs");
        let result = sqlx::query_as::<_, ScheduleLogEntity>(
            r#"
            SELECT id, schedule_id, run_at, status, rows_produced, output_bytes, error_message, duration_ms
            FROM report_schedule_logs
            WHERE schedule_id = $1
            ORDER BY run_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(schedule_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
            .map(|rows| rows.into_iter().map(ExecutionLogEntry::from).collect())
            .map_err(store_error)
    }
}
