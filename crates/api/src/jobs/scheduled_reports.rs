//! Timer-driven execution of due report schedules.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::services::{scheduler_now, ScheduleExecutionService};

use super::scheduler::{Job, JobFrequency};

/// Runs the schedule executor on every tick.
///
/// The tick reads the clock once and hands the instant to the executor.
pub struct ScheduledReportsJob {
    executor: Arc<ScheduleExecutionService>,
    frequency: JobFrequency,
    use_utc: bool,
    cancel: CancellationToken,
}

impl ScheduledReportsJob {
    pub fn new(
        executor: Arc<ScheduleExecutionService>,
        interval_secs: u64,
        use_utc: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            executor,
            frequency: JobFrequency::every_secs(interval_secs),
            use_utc,
            cancel,
        }
    }
}

#[async_trait::async_trait]
impl Job for ScheduledReportsJob {
    fn name(&self) -> &'static str {
        "scheduled_reports"
    }

    fn frequency(&self) -> JobFrequency {
        self.frequency
    }

    async fn execute(&self) -> Result<(), String> {
        let now = scheduler_now(self.use_utc);
        let summary = self.executor.run_due_schedules(now, &self.cancel).await;

        if summary.errors.is_empty() {
            Ok(())
        } else {
            Err(format!(
                "{} of {} schedules failed; {}",
                summary.failed,
                summary.processed,
                summary.errors.join("; ")
            ))
        }
    }
}
