//! Report schedule domain model.

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::validation::{split_recipient_list, validate_recipient_list, validate_time_of_day};
use validator::Validate;

use super::recurrence::{RecurrenceDescription, RecurrenceKind};

/// Report type tag of the Average Basket report.
pub const AVERAGE_BASKET: &str = "AverageBasket";

/// Report types the scheduler can generate.
pub const SCHEDULABLE_REPORT_TYPES: &[&str] = &[AVERAGE_BASKET];

/// Returns the canonical spelling of a schedulable report type.
pub fn schedulable_report_type(raw: &str) -> Option<&'static str> {
    let raw = raw.trim();
    SCHEDULABLE_REPORT_TYPES
        .iter()
        .copied()
        .find(|t| t.eq_ignore_ascii_case(raw))
}

/// Output document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExportFormat {
    #[default]
    Excel,
    #[serde(rename = "PDF")]
    Pdf,
}

impl ExportFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "excel" | "xlsx" => Some(Self::Excel),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excel => "Excel",
            Self::Pdf => "PDF",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Excel => "xlsx",
            Self::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Pdf => "application/pdf",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Simple recurrence kept for schedules written before structured descriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyRecurrence {
    /// "Once", "Daily", "Weekly" or "Monthly"; anything else behaves as daily.
    pub recurrence_type: String,
    /// Weekday (0 = Sunday) for weekly, day of month for monthly.
    pub recurrence_day: Option<i32>,
    pub schedule_time: NaiveTime,
}

impl LegacyRecurrence {
    pub fn kind(&self) -> Option<RecurrenceKind> {
        RecurrenceKind::parse(&self.recurrence_type)
    }
}

/// A persisted recurring-report definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Schedule {
    pub id: i64,
    pub report_type: String,
    pub schedule_name: String,
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub is_active: bool,
    pub legacy: LegacyRecurrence,
    /// Structured recurrence document; authoritative when it parses.
    pub recurrence_json: Option<String>,
    pub parameters_json: Option<String>,
    pub export_format: ExportFormat,
    /// Addresses separated by `;` or `,`.
    pub recipients: String,
    pub email_subject: Option<String>,
    /// Single source of truth for due-ness.
    pub next_run_at: Option<NaiveDateTime>,
    pub last_run_at: Option<NaiveDateTime>,
    /// Completed executions, successful or not.
    pub run_count: i32,
}

impl Schedule {
    /// Parsed structured recurrence, if one is stored and well formed.
    pub fn structured_recurrence(&self) -> Option<RecurrenceDescription> {
        self.recurrence_json
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .and_then(|raw| RecurrenceDescription::parse(raw).ok())
    }

    pub fn is_once(&self) -> bool {
        match self.structured_recurrence() {
            Some(desc) => desc.kind() == RecurrenceKind::Once,
            None => self.legacy.kind() == Some(RecurrenceKind::Once),
        }
    }

    pub fn recipient_list(&self) -> Vec<String> {
        split_recipient_list(&self.recipients)
    }

    pub fn is_due(&self, as_of: NaiveDateTime) -> bool {
        self.is_active && self.next_run_at.is_some_and(|next| next <= as_of)
    }
}

/// Data required to insert a schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSchedule {
    pub report_type: String,
    pub schedule_name: String,
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub legacy: LegacyRecurrence,
    pub recurrence_json: Option<String>,
    pub parameters_json: Option<String>,
    pub export_format: ExportFormat,
    pub recipients: String,
    pub email_subject: Option<String>,
    pub next_run_at: Option<NaiveDateTime>,
}

/// Full replacement of a schedule's editable fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleChanges {
    pub schedule_name: String,
    pub is_active: bool,
    pub legacy: LegacyRecurrence,
    pub recurrence_json: Option<String>,
    pub parameters_json: Option<String>,
    pub export_format: ExportFormat,
    pub recipients: String,
    pub email_subject: Option<String>,
    pub next_run_at: Option<NaiveDateTime>,
    /// Set when the recurrence changed; `max_occurrences` then counts from zero again.
    pub restart_occurrences: bool,
}

/// Request payload for creating a schedule.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateScheduleRequest {
    #[validate(length(min = 1, max = 100, message = "Report type is required"))]
    pub report_type: String,

    #[validate(length(min = 1, max = 200, message = "Schedule name is required"))]
    pub schedule_name: String,

    pub created_by: Option<String>,

    /// Legacy recurrence type; defaults to "Daily".
    pub recurrence_type: Option<String>,

    pub recurrence_day: Option<i32>,

    #[validate(custom(function = "validate_time_of_day"))]
    pub schedule_time: Option<String>,

    /// Structured recurrence document (object, or its JSON text).
    pub recurrence: Option<Value>,

    /// Report parameters document (object, or its JSON text).
    pub parameters: Option<Value>,

    pub export_format: Option<String>,

    #[validate(custom(function = "validate_recipient_list"))]
    pub recipients: String,

    #[validate(length(max = 500, message = "Subject must be at most 500 characters"))]
    pub email_subject: Option<String>,
}

/// Request payload for updating a schedule.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateScheduleRequest {
    #[validate(length(min = 1, max = 200, message = "Schedule name is required"))]
    pub schedule_name: String,

    pub recurrence_type: Option<String>,

    pub recurrence_day: Option<i32>,

    #[validate(custom(function = "validate_time_of_day"))]
    pub schedule_time: Option<String>,

    pub recurrence: Option<Value>,

    pub parameters: Option<Value>,

    pub export_format: Option<String>,

    #[validate(custom(function = "validate_recipient_list"))]
    pub recipients: String,

    #[validate(length(max = 500, message = "Subject must be at most 500 characters"))]
    pub email_subject: Option<String>,

    /// Defaults to active.
    pub is_active: Option<bool>,
}

/// The authoring fields shared by create and update requests.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleDraft {
    pub schedule_name: String,
    pub recurrence_type: Option<String>,
    pub recurrence_day: Option<i32>,
    pub schedule_time: Option<String>,
    pub recurrence: Option<Value>,
    pub parameters: Option<Value>,
    pub export_format: Option<String>,
    pub recipients: String,
    pub email_subject: Option<String>,
}

impl From<&CreateScheduleRequest> for ScheduleDraft {
    fn from(req: &CreateScheduleRequest) -> Self {
        Self {
            schedule_name: req.schedule_name.clone(),
            recurrence_type: req.recurrence_type.clone(),
            recurrence_day: req.recurrence_day,
            schedule_time: req.schedule_time.clone(),
            recurrence: req.recurrence.clone(),
            parameters: req.parameters.clone(),
            export_format: req.export_format.clone(),
            recipients: req.recipients.clone(),
            email_subject: req.email_subject.clone(),
        }
    }
}

impl From<&UpdateScheduleRequest> for ScheduleDraft {
    fn from(req: &UpdateScheduleRequest) -> Self {
        Self {
            schedule_name: req.schedule_name.clone(),
            recurrence_type: req.recurrence_type.clone(),
            recurrence_day: req.recurrence_day,
            schedule_time: req.schedule_time.clone(),
            recurrence: req.recurrence.clone(),
            parameters: req.parameters.clone(),
            export_format: req.export_format.clone(),
            recipients: req.recipients.clone(),
            email_subject: req.email_subject.clone(),
        }
    }
}

/// Normalizes a submitted JSON document to its stored text form.
///
/// A JSON string is taken as already-serialized text. Null and blank values
/// store nothing.
pub fn document_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}
