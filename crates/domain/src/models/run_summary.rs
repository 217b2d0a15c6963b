//! Outcome of one scheduler invocation.

use serde::Serialize;

/// Counts of executed schedules and the tenant-level errors of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RunSummary {
    pub processed: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub errors: Vec<String>,
}

impl RunSummary {
    /// A summary that carries a single top-level error.
    pub fn aborted(error: impl Into<String>) -> Self {
        Self {
            errors: vec![error.into()],
            ..Default::default()
        }
    }

    /// Folds another partial summary into this one.
    pub fn merge(&mut self, other: RunSummary) {
        self.processed += other.processed;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.errors.extend(other.errors);
    }

    pub fn record_success(&mut self) {
        self.processed += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self) {
        self.processed += 1;
        self.failed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_and_record() {
        let mut total = RunSummary::default();
        let mut tenant = RunSummary::default();
        tenant.record_success();
        tenant.record_failure();
        total.merge(tenant);
        total.merge(RunSummary::aborted("tenant A: unavailable"));

        assert_eq!(total.processed, 2);
        assert_eq!(total.succeeded, 1);
        assert_eq!(total.failed, 1);
        assert_eq!(total.errors, vec!["tenant A: unavailable"]);
    }
}
