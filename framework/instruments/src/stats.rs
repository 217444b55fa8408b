use std::collections::BTreeMap;

use crate::OperationRecord;

/// Mutable accumulator behind the [crate::prelude::Reporter].
///
/// Every operation duration is kept so that percentiles are exact. Memory grows with the number of
/// requests, roughly 8 bytes each, which matters for long `--soak` runs.
#[derive(Debug, Default, Clone)]
pub(crate) struct StatsAggregate {
    iterations: u64,
    operations: BTreeMap<String, OperationSamples>,
    checks: BTreeMap<String, CheckStats>,
}

#[derive(Debug, Default, Clone)]
struct OperationSamples {
    durations_ms: Vec<f64>,
    failed: u64,
}

impl StatsAggregate {
    pub(crate) fn record_operation(&mut self, record: &OperationRecord) {
        let samples = self
            .operations
            .entry(record.operation_id.clone())
            .or_default();

        let elapsed = record.duration().unwrap_or_default();
        samples.durations_ms.push(elapsed.as_micros() as f64 / 1000.0);
        if record.is_error {
            samples.failed += 1;
        }
    }

    pub(crate) fn record_check(&mut self, name: &str, passed: bool) {
        let check = self.checks.entry(name.to_string()).or_default();

        if passed {
            check.passes += 1;
        } else {
            check.fails += 1;
        }
    }

    pub(crate) fn record_iteration(&mut self) {
        self.iterations += 1;
    }

    /// Sort the samples into [RunStats]. Callers clone the aggregate while holding the reporter
    /// lock and call this after releasing it.
    pub(crate) fn into_stats(self) -> RunStats {
        let operations = self
            .operations
            .into_iter()
            .map(|(operation_id, samples)| {
                let mut sorted_ms = samples.durations_ms;
                sorted_ms.sort_by(f64::total_cmp);
                (
                    operation_id,
                    OperationStats {
                        sorted_ms,
                        failed: samples.failed,
                    },
                )
            })
            .collect();

        RunStats {
            iterations: self.iterations,
            operations,
            checks: self.checks,
        }
    }
}

/// Point in time view of everything recorded during a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub iterations: u64,
    pub operations: BTreeMap<String, OperationStats>,
    pub checks: BTreeMap<String, CheckStats>,
}

impl RunStats {
    pub fn operation(&self, operation_id: &str) -> Option<&OperationStats> {
        self.operations.get(operation_id)
    }

    pub fn check(&self, name: &str) -> Option<&CheckStats> {
        self.checks.get(name)
    }

    /// All checks combined, which is what the `checks` threshold metric looks at.
    pub fn checks_total(&self) -> CheckStats {
        self.checks
            .values()
            .fold(CheckStats::default(), |acc, check| CheckStats {
                passes: acc.passes + check.passes,
                fails: acc.fails + check.fails,
            })
    }
}

/// Duration distribution and failure count for one operation id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationStats {
    sorted_ms: Vec<f64>,
    failed: u64,
}

impl OperationStats {
    pub fn count(&self) -> u64 {
        self.sorted_ms.len() as u64
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    pub fn failure_rate(&self) -> Option<f64> {
        match self.count() {
            0 => None,
            count => Some(self.failed as f64 / count as f64),
        }
    }

    pub fn total_ms(&self) -> f64 {
        self.sorted_ms.iter().sum()
    }

    pub fn avg_ms(&self) -> Option<f64> {
        match self.count() {
            0 => None,
            count => Some(self.total_ms() / count as f64),
        }
    }

    pub fn min_ms(&self) -> Option<f64> {
        self.sorted_ms.first().copied()
    }

    pub fn max_ms(&self) -> Option<f64> {
        self.sorted_ms.last().copied()
    }

    pub fn med_ms(&self) -> Option<f64> {
        self.percentile_ms(50.0)
    }

    /// Percentile with linear interpolation between the closest ranks. `p` is in `0..=100`.
    pub fn percentile_ms(&self, p: f64) -> Option<f64> {
        if self.sorted_ms.is_empty() {
            return None;
        }

        let rank = (p.clamp(0.0, 100.0) / 100.0) * (self.sorted_ms.len() - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = rank.ceil() as usize;
        let lower_value = self.sorted_ms[lower];
        let upper_value = self.sorted_ms[upper];

        Some(lower_value + (upper_value - lower_value) * (rank - lower as f64))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckStats {
    pub passes: u64,
    pub fails: u64,
}

impl CheckStats {
    pub fn total(&self) -> u64 {
        self.passes + self.fails
    }

    pub fn pass_rate(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.passes as f64 / total as f64),
        }
    }
}
