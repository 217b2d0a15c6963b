//! Database entity definitions.

pub mod average_basket;
pub mod report_schedule;
pub mod schedule_log;
pub mod tenant_database;

pub use average_basket::AverageBasketAggregateEntity;
pub use report_schedule::ReportScheduleEntity;
pub use schedule_log::ScheduleLogEntity;
pub use tenant_database::TenantDatabaseEntity;
