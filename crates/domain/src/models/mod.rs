//! Domain models for the report scheduler.

mod json_doc;

pub mod database_settings;
pub mod date_range;
pub mod execution_log;
pub mod recurrence;
pub mod report;
pub mod report_parameters;
pub mod run_summary;
pub mod schedule;
pub mod tenant;

pub use database_settings::DatabaseSettings;
pub use date_range::RelativeDateRange;
pub use execution_log::{ExecutionLogEntry, ExecutionStatus, NewExecutionLogEntry};
pub use json_doc::parse_calendar_date;
pub use recurrence::{
    MonthlyPattern, RecurrenceDescription, RecurrenceKind, RecurrenceRange, RecurrenceRule,
    WeekOrdinal,
};
pub use report::{AverageBasketRow, RenderedReport, ReportOutput, ReportTotals};
pub use report_parameters::{
    Breakdown, GroupBy, ReportFilter, ScheduleParameters, SortColumn, SortDirection,
};
pub use run_summary::RunSummary;
pub use schedule::{
    CreateScheduleRequest, ExportFormat, LegacyRecurrence, NewSchedule, Schedule,
    ScheduleChanges, ScheduleDraft, UpdateScheduleRequest,
};
pub use tenant::Tenant;
