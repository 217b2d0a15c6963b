//! Report schedule entity (database row mapping).

use chrono::{NaiveDateTime, NaiveTime};
use sqlx::FromRow;

use domain::models::{ExportFormat, LegacyRecurrence, Schedule};

/// Database row mapping for the report_schedules table.
#[derive(Debug, Clone, FromRow)]
pub struct ReportScheduleEntity {
    pub id: i64,
    pub report_type: String,
    pub schedule_name: String,
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub is_active: bool,
    pub recurrence_type: String,
    pub recurrence_day: Option<i32>,
    pub schedule_time: NaiveTime,
    /// Structured recurrence document.
    pub recurrence_json: Option<String>,
    pub parameters_json: Option<String>,
    pub export_format: String,
    pub recipients: String,
    pub email_subject: Option<String>,
    pub next_run_at: Option<NaiveDateTime>,
    pub last_run_at: Option<NaiveDateTime>,
    pub run_count: i32,
}

impl From<ReportScheduleEntity> for Schedule {
    fn from(entity: ReportScheduleEntity) -> Self {
        Self {
            id: entity.id,
            report_type: entity.report_type,
            schedule_name: entity.schedule_name,
            created_by: entity.created_by,
            created_at: entity.created_at,
            is_active: entity.is_active,
            legacy: LegacyRecurrence {
                recurrence_type: entity.recurrence_type,
                recurrence_day: entity.recurrence_day,
                schedule_time: entity.schedule_time,
            },
            recurrence_json: entity.recurrence_json,
            parameters_json: entity.parameters_json,
            export_format: ExportFormat::parse(&entity.export_format).unwrap_or_default(),
            recipients: entity.recipients,
            email_subject: entity.email_subject,
            next_run_at: entity.next_run_at,
            last_run_at: entity.last_run_at,
            run_count: entity.run_count,
        }
    }
}
