//! Background job scheduler and job implementations.

mod pool_metrics;
mod scheduled_reports;
mod scheduler;

pub use pool_metrics::PoolMetricsJob;
pub use scheduled_reports::ScheduledReportsJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
