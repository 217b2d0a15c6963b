//! Per-tenant storage contracts for schedules, execution logs and settings.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::models::{
    DatabaseSettings, ExecutionLogEntry, NewExecutionLogEntry, NewSchedule, Schedule,
    ScheduleChanges,
};

/// Storage-layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store cannot be reached or is not provisioned for this tenant.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Durable storage of schedule definitions and their execution log.
#[async_trait::async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn create(&self, schedule: &NewSchedule) -> Result<Schedule, StoreError>;

    async fn get(&self, id: i64) -> Result<Option<Schedule>, StoreError>;

    /// Active schedules, newest first, optionally restricted to one report type.
    async fn list_active(&self, report_type: Option<&str>) -> Result<Vec<Schedule>, StoreError>;

    /// Replaces the editable fields; fails with `NotFound` for an unknown id.
    async fn update(&self, id: i64, changes: &ScheduleChanges) -> Result<Schedule, StoreError>;

    /// Soft-deletes a schedule.
    async fn deactivate(&self, id: i64) -> Result<(), StoreError>;

    async fn count_active_for_report(&self, report_type: &str) -> Result<i64, StoreError>;

    /// Active schedules whose `next_run_at` is at or before `as_of`, oldest due first.
    async fn list_due(&self, as_of: NaiveDateTime) -> Result<Vec<Schedule>, StoreError>;

    /// Sets `last_run_at`/`next_run_at`, increments `run_count` and optionally
    /// deactivates, in one statement.
    async fn record_execution(
        &self,
        id: i64,
        ran_at: NaiveDateTime,
        next_run_at: Option<NaiveDateTime>,
        deactivate: bool,
    ) -> Result<(), StoreError>;

    async fn append_log(&self, entry: &NewExecutionLogEntry) -> Result<i64, StoreError>;

    /// Most recent entries first.
    async fn list_logs(&self, schedule_id: i64, limit: i64) -> Result<Vec<ExecutionLogEntry>, StoreError>;
}

/// Tenant-scoped key/value settings.
#[async_trait::async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> Result<DatabaseSettings, StoreError>;

    async fn save(&self, settings: &DatabaseSettings) -> Result<(), StoreError>;
}
