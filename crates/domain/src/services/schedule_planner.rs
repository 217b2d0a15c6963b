//! Authoring rules for creating and updating schedules.

use chrono::NaiveDateTime;
use shared::validation::{default_time_of_day, parse_time_of_day, split_recipient_list};
use thiserror::Error;

use super::recurrence_engine::{legacy_initial_run, next_run, once_instant};
use crate::models::schedule::{document_text, schedulable_report_type};
use crate::models::{
    CreateScheduleRequest, DatabaseSettings, ExportFormat, LegacyRecurrence, NewSchedule,
    RecurrenceDescription, RecurrenceKind, Schedule, ScheduleChanges, ScheduleDraft,
    UpdateScheduleRequest,
};

/// Owner recorded when a request does not name one.
pub const DEFAULT_OWNER: &str = "admin";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleValidationError {
    #[error("Schedule name is required.")]
    NameRequired,

    #[error("At least one recipient is required.")]
    RecipientsRequired,

    #[error("Report type '{0}' cannot be scheduled.")]
    UnsupportedReportType(String),

    #[error("Unsupported export format '{0}'.")]
    InvalidExportFormat(String),

    #[error("Invalid recurrence: {0}")]
    InvalidRecurrence(String),

    #[error("For 'Run once', start date and time must be in the future.")]
    OnceInThePast,

    #[error("For 'Run once', please set a valid start date and time in the future.")]
    OnceWithoutInstant,

    #[error("The recurrence end date has already passed; the schedule would never run.")]
    EndDateInThePast,

    #[error("Schedule limit reached. Maximum {0} active schedules per report.")]
    QuotaReached(i32),
}

/// Validated authoring fields with the computed first run.
#[derive(Debug, Clone, PartialEq)]
struct PlannedDefinition {
    schedule_name: String,
    legacy: LegacyRecurrence,
    recurrence_json: Option<String>,
    parameters_json: Option<String>,
    export_format: ExportFormat,
    recipients: String,
    email_subject: Option<String>,
    next_run_at: Option<NaiveDateTime>,
}

fn plan_definition(
    draft: &ScheduleDraft,
    settings: &DatabaseSettings,
    now: NaiveDateTime,
) -> Result<PlannedDefinition, ScheduleValidationError> {
    let schedule_name = draft.schedule_name.trim().to_string();
    if schedule_name.is_empty() {
        return Err(ScheduleValidationError::NameRequired);
    }
    if split_recipient_list(&draft.recipients).is_empty() {
        return Err(ScheduleValidationError::RecipientsRequired);
    }

    let export_format = match draft.export_format.as_deref().map(str::trim) {
        None | Some("") => settings.default_export_format,
        Some(raw) => ExportFormat::parse(raw)
            .ok_or_else(|| ScheduleValidationError::InvalidExportFormat(raw.to_string()))?,
    };

    let recurrence_json = document_text(draft.recurrence.as_ref());
    let structured = recurrence_json
        .as_deref()
        .map(RecurrenceDescription::parse)
        .transpose()
        .map_err(|e| ScheduleValidationError::InvalidRecurrence(e.to_string()))?;

    let schedule_time = draft
        .schedule_time
        .as_deref()
        .and_then(parse_time_of_day)
        .or_else(|| structured.as_ref().map(|d| d.time_of_day))
        .unwrap_or_else(default_time_of_day);

    let recurrence_type = match draft.recurrence_type.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => RecurrenceKind::parse(raw)
            .map(|k| k.as_str().to_string())
            .unwrap_or_else(|| raw.to_string()),
        _ => structured
            .as_ref()
            .map(|d| d.kind())
            .unwrap_or(RecurrenceKind::Daily)
            .as_str()
            .to_string(),
    };

    let legacy = LegacyRecurrence {
        recurrence_type,
        recurrence_day: draft.recurrence_day,
        schedule_time,
    };

    let next_run_at = match &structured {
        Some(desc) => match next_run(desc, now) {
            Some(next) => Some(next),
            None if desc.kind() == RecurrenceKind::Once => {
                return Err(match once_instant(desc) {
                    Some(_) => ScheduleValidationError::OnceInThePast,
                    None => ScheduleValidationError::OnceWithoutInstant,
                });
            }
            None if desc.range.end_date.is_some() => {
                return Err(ScheduleValidationError::EndDateInThePast);
            }
            None => legacy_initial_run(&legacy, now),
        },
        None => legacy_initial_run(&legacy, now),
    };

    Ok(PlannedDefinition {
        schedule_name,
        legacy,
        recurrence_json,
        parameters_json: document_text(draft.parameters.as_ref()),
        export_format,
        recipients: draft.recipients.trim().to_string(),
        email_subject: draft
            .email_subject
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        next_run_at,
    })
}

/// Validates a create request and computes its first run.
///
/// `active_count` is the number of active schedules already defined for the
/// request's report type.
pub fn plan_new_schedule(
    request: &CreateScheduleRequest,
    settings: &DatabaseSettings,
    active_count: i64,
    now: NaiveDateTime,
) -> Result<NewSchedule, ScheduleValidationError> {
    let report_type = schedulable_report_type(&request.report_type).ok_or_else(|| {
        ScheduleValidationError::UnsupportedReportType(request.report_type.clone())
    })?;

    let planned = plan_definition(&ScheduleDraft::from(request), settings, now)?;

    if active_count >= i64::from(settings.max_schedules_per_report) {
        return Err(ScheduleValidationError::QuotaReached(settings.max_schedules_per_report));
    }

    Ok(NewSchedule {
        report_type: report_type.to_string(),
        schedule_name: planned.schedule_name,
        created_by: request
            .created_by
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_OWNER)
            .to_string(),
        created_at: now,
        legacy: planned.legacy,
        recurrence_json: planned.recurrence_json,
        parameters_json: planned.parameters_json,
        export_format: planned.export_format,
        recipients: planned.recipients,
        email_subject: planned.email_subject,
        next_run_at: planned.next_run_at,
    })
}

/// Validates an update request against the stored schedule and recomputes the next run.
///
/// A changed recurrence restarts the occurrence count.
pub fn plan_schedule_update(
    request: &UpdateScheduleRequest,
    existing: &Schedule,
    settings: &DatabaseSettings,
    now: NaiveDateTime,
) -> Result<ScheduleChanges, ScheduleValidationError> {
    let planned = plan_definition(&ScheduleDraft::from(request), settings, now)?;
    let restart_occurrences =
        planned.recurrence_json != existing.recurrence_json || planned.legacy != existing.legacy;

    Ok(ScheduleChanges {
        schedule_name: planned.schedule_name,
        is_active: request.is_active.unwrap_or(true),
        legacy: planned.legacy,
        recurrence_json: planned.recurrence_json,
        parameters_json: planned.parameters_json,
        export_format: planned.export_format,
        recipients: planned.recipients,
        email_subject: planned.email_subject,
        next_run_at: planned.next_run_at,
        restart_occurrences,
    })
}
