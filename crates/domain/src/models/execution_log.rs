//! Schedule execution log domain model.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Outcome of one execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Success,
    Failed,
    Skipped,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Failed => "Failed",
            Self::Skipped => "Skipped",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable audit record of one attempted run of one schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExecutionLogEntry {
    pub id: i64,
    pub schedule_id: i64,
    pub run_at: NaiveDateTime,
    pub status: ExecutionStatus,
    pub rows_produced: Option<i32>,
    pub output_bytes: Option<i64>,
    pub error_message: Option<String>,
    pub duration_ms: Option<i64>,
}

/// A log entry before it is appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExecutionLogEntry {
    pub schedule_id: i64,
    pub run_at: NaiveDateTime,
    pub status: ExecutionStatus,
    pub rows_produced: Option<i32>,
    pub output_bytes: Option<i64>,
    pub error_message: Option<String>,
    pub duration_ms: Option<i64>,
}

impl NewExecutionLogEntry {
    pub fn success(
        schedule_id: i64,
        run_at: NaiveDateTime,
        rows_produced: usize,
        output_bytes: usize,
        duration_ms: i64,
    ) -> Self {
        Self {
            schedule_id,
            run_at,
            status: ExecutionStatus::Success,
            rows_produced: Some(i32::try_from(rows_produced).unwrap_or(i32::MAX)),
            output_bytes: Some(i64::try_from(output_bytes).unwrap_or(i64::MAX)),
            error_message: None,
            duration_ms: Some(duration_ms),
        }
    }

    pub fn failed(
        schedule_id: i64,
        run_at: NaiveDateTime,
        error_message: impl Into<String>,
        duration_ms: i64,
    ) -> Self {
        Self {
            schedule_id,
            run_at,
            status: ExecutionStatus::Failed,
            rows_produced: None,
            output_bytes: None,
            error_message: Some(error_message.into()),
            duration_ms: Some(duration_ms),
        }
    }
}
