mod report;
mod stats;
mod threshold;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

pub mod prelude {
    pub use crate::report::{ReportConfig, Reporter, RunReport};
    pub use crate::stats::{CheckStats, OperationStats, RunStats};
    pub use crate::threshold::{
        Aggregation, Comparison, Threshold, ThresholdMetric, ThresholdParseError, ThresholdResult,
    };
    pub use crate::{report_operation, OperationRecord, HTTP_REQ_OPERATION};
}

/// Operation id used for every HTTP request. The `http_req_*` threshold metrics read from it.
pub const HTTP_REQ_OPERATION: &str = "http_req";

/// A single timed operation, such as one HTTP request.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    pub operation_id: String,
    started: Instant,
    pub elapsed: Option<Duration>,
    pub is_error: bool,
    pub attr: BTreeMap<String, String>,
}

impl OperationRecord {
    /// Start timing a new operation.
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            started: Instant::now(),
            elapsed: None,
            is_error: false,
            attr: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.add_attr(key, value);
        self
    }

    pub fn add_attr(&mut self, key: impl Into<String>, value: impl ToString) {
        self.attr.insert(key.into(), value.to_string());
    }

    pub fn duration(&self) -> Option<Duration> {
        self.elapsed
    }

    /// Stop the clock. Calling this more than once keeps the first elapsed time.
    pub fn finish(&mut self, is_error: bool) {
        if self.elapsed.is_none() {
            self.elapsed = Some(self.started.elapsed());
        }
        self.is_error = is_error;
    }
}

/// Finish the operation and hand it to the reporter.
pub fn report_operation(reporter: &report::Reporter, mut record: OperationRecord, is_error: bool) {
    record.finish(is_error);
    log::trace!(
        "Operation {} took {:?}, failed? {}",
        record.operation_id,
        record.elapsed,
        record.is_error
    );
    reporter.add_operation(&record);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::ReportConfig;

    #[test]
    fn finish_keeps_first_elapsed_time() {
        let mut record = OperationRecord::new("op");
        record.finish(false);
        let first = record.elapsed;
        std::thread::sleep(Duration::from_millis(5));
        record.finish(true);

        assert_eq!(first, record.elapsed);
        assert!(record.is_error);
    }

    #[test]
    fn reported_operation_reaches_stats() {
        let reporter = ReportConfig::default().init();
        let record = OperationRecord::new(HTTP_REQ_OPERATION).with_attr("status", 500);

        report_operation(&reporter, record, true);

        let stats = reporter.stats();
        let op = stats.operation(HTTP_REQ_OPERATION).unwrap();
        assert_eq!(1, op.count());
        assert_eq!(1, op.failed());
    }
}
