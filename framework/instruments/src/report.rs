mod summary_report;

use parking_lot::Mutex;

use crate::stats::{RunStats, StatsAggregate};
use crate::threshold::{Threshold, ThresholdResult};
use crate::OperationRecord;

#[derive(Debug, Default)]
pub struct ReportConfig {
    enable_summary: bool,
}

impl ReportConfig {
    /// Print summary tables of operations, checks and thresholds when the run is finalized.
    pub fn enable_summary(mut self) -> Self {
        self.enable_summary = true;
        self
    }

    pub fn init(self) -> Reporter {
        Reporter {
            aggregate: Mutex::new(StatsAggregate::default()),
            print_summary: self.enable_summary,
        }
    }
}

/// Collects operations, checks and iterations from every virtual user.
///
/// The reporter is shared between VUs behind an `Arc`. Every method takes `&self`.
#[derive(Debug)]
pub struct Reporter {
    aggregate: Mutex<StatsAggregate>,
    print_summary: bool,
}

impl Reporter {
    pub fn add_operation(&self, operation_record: &OperationRecord) {
        self.aggregate.lock().record_operation(operation_record);
    }

    /// Record the outcome of a named check.
    pub fn add_check(&self, name: &str, passed: bool) {
        self.aggregate.lock().record_check(name, passed);
    }

    pub fn add_iteration(&self) {
        self.aggregate.lock().record_iteration();
    }

    pub fn stats(&self) -> RunStats {
        // Sort outside the lock.
        let aggregate = self.aggregate.lock().clone();
        aggregate.into_stats()
    }

    /// Evaluate the thresholds against everything recorded so far and print the summary, if
    /// enabled.
    pub fn finalize(&self, thresholds: &[Threshold]) -> RunReport {
        let stats = self.stats();
        let thresholds = thresholds
            .iter()
            .map(|threshold| threshold.evaluate(&stats))
            .collect();

        let report = RunReport { stats, thresholds };
        if self.print_summary {
            summary_report::print_summary(&report);
        }

        report
    }
}

/// The final statistics of a run along with the threshold outcomes.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub stats: RunStats,
    pub thresholds: Vec<ThresholdResult>,
}

impl RunReport {
    pub fn thresholds_passed(&self) -> bool {
        self.thresholds.iter().all(|result| result.passed)
    }

    pub fn breached_thresholds(&self) -> impl Iterator<Item = &ThresholdResult> {
        self.thresholds.iter().filter(|result| !result.passed)
    }
}
