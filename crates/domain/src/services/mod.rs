//! Domain services for the report scheduler.
//!
//! The recurrence engine and date range resolver are pure functions. The other
//! modules define the contracts of the collaborators the orchestrator drives.

pub mod date_range_resolver;
pub mod notification;
pub mod recurrence_engine;
pub mod report_engine;
pub mod schedule_planner;
pub mod schedule_store;
pub mod tenant_catalog;

pub use date_range_resolver::{resolve, DateSpan};
pub use notification::{EmailAttachment, MockReportNotifier, NotifyError, ReportEmail, ReportNotifier};
pub use recurrence_engine::{next_run, once_instant, plan_after_run, RunAdvance};
pub use report_engine::{report_file_name, RenderError, ReportEngine, ReportError, ReportRenderer};
pub use schedule_planner::{plan_new_schedule, plan_schedule_update, ScheduleValidationError};
pub use schedule_store::{ScheduleStore, SettingsStore, StoreError};
pub use tenant_catalog::{TenantCatalog, TenantStores};
