//! Schedule execution log entity (database row mapping).

use chrono::NaiveDateTime;
use sqlx::FromRow;

use domain::models::{ExecutionLogEntry, ExecutionStatus};

/// Database row mapping for the report_schedule_logs table.
#[derive(Debug, Clone, FromRow)]
pub struct ScheduleLogEntity {
    pub id: i64,
    pub schedule_id: i64,
    pub run_at: NaiveDateTime,
    pub status: String,
    pub rows_produced: Option<i32>,
    pub output_bytes: Option<i64>,
    pub error_message: Option<String>,
    pub duration_ms: Option<i64>,
}

impl From<ScheduleLogEntity> for ExecutionLogEntry {
    fn from(entity: ScheduleLogEntity) -> Self {
        Self {
            id: entity.id,
            schedule_id: entity.schedule_id,
            run_at: entity.run_at,
            // The column is constrained to the three known values.
            status: ExecutionStatus::parse(&entity.status).unwrap_or(ExecutionStatus::Failed),
            rows_produced: entity.rows_produced,
            output_bytes: entity.output_bytes,
            error_message: entity.error_message,
            duration_ms: entity.duration_ms,
        }
    }
}
