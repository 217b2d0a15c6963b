//! Application services.

pub mod email;
pub mod report_export;
pub mod schedule_execution;

pub use email::EmailService;
pub use report_export::ExportRenderer;
pub use schedule_execution::{scheduler_now, ScheduleExecutionService};
