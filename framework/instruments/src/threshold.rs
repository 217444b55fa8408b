use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::stats::RunStats;
use crate::HTTP_REQ_OPERATION;

/// Metrics that a threshold can be declared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThresholdMetric {
    /// Share of HTTP requests that failed, either at the transport level or with a status outside
    /// `200..=399`.
    HttpReqFailed,
    /// HTTP request durations in milliseconds.
    HttpReqDuration,
    /// Share of all checks that passed.
    Checks,
    /// Number of completed iterations.
    Iterations,
}

impl ThresholdMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdMetric::HttpReqFailed => "http_req_failed",
            ThresholdMetric::HttpReqDuration => "http_req_duration",
            ThresholdMetric::Checks => "checks",
            ThresholdMetric::Iterations => "iterations",
        }
    }

    fn supports(&self, aggregation: &Aggregation) -> bool {
        match self {
            ThresholdMetric::HttpReqFailed => {
                matches!(aggregation, Aggregation::Rate | Aggregation::Count)
            }
            ThresholdMetric::HttpReqDuration => matches!(
                aggregation,
                Aggregation::Avg
                    | Aggregation::Min
                    | Aggregation::Max
                    | Aggregation::Med
                    | Aggregation::Percentile(_)
            ),
            ThresholdMetric::Checks => matches!(aggregation, Aggregation::Rate),
            ThresholdMetric::Iterations => matches!(aggregation, Aggregation::Count),
        }
    }
}

impl Display for ThresholdMetric {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThresholdMetric {
    type Err = ThresholdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "http_req_failed" => Ok(ThresholdMetric::HttpReqFailed),
            "http_req_duration" => Ok(ThresholdMetric::HttpReqDuration),
            "checks" => Ok(ThresholdMetric::Checks),
            "iterations" => Ok(ThresholdMetric::Iterations),
            other => Err(ThresholdParseError::new(format!(
                "Unknown threshold metric `{other}`, expected one of http_req_failed, http_req_duration, checks, iterations"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregation {
    Rate,
    Count,
    Avg,
    Min,
    Max,
    Med,
    /// `p(N)`, with `N` in `0..=100`.
    Percentile(f64),
}

impl FromStr for Aggregation {
    type Err = ThresholdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "rate" => return Ok(Aggregation::Rate),
            "count" => return Ok(Aggregation::Count),
            "avg" => return Ok(Aggregation::Avg),
            "min" => return Ok(Aggregation::Min),
            "max" => return Ok(Aggregation::Max),
            "med" => return Ok(Aggregation::Med),
            _ => {}
        }

        let percentile = s
            .strip_prefix("p(")
            .and_then(|rest| rest.strip_suffix(')'))
            .and_then(|n| n.trim().parse::<f64>().ok())
            .filter(|n| (0.0..=100.0).contains(n))
            .ok_or_else(|| ThresholdParseError::new(format!("Unknown aggregation `{s}`")))?;

        Ok(Aggregation::Percentile(percentile))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparison {
    fn holds(&self, actual: f64, expected: f64) -> bool {
        match self {
            Comparison::Lt => actual < expected,
            Comparison::Le => actual <= expected,
            Comparison::Gt => actual > expected,
            Comparison::Ge => actual >= expected,
            Comparison::Eq => actual == expected,
            Comparison::Ne => actual != expected,
        }
    }
}

/// A run level pass/fail criterion, such as `http_req_failed: rate<0.01`.
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    metric: ThresholdMetric,
    expression: String,
    aggregation: Aggregation,
    comparison: Comparison,
    value: f64,
}

impl Threshold {
    /// Parse a threshold from a metric name and an expression of the form
    /// `<aggregation><operator><value>`.
    pub fn parse(metric: &str, expression: &str) -> Result<Self, ThresholdParseError> {
        let metric = metric.parse::<ThresholdMetric>()?;
        let expression = expression.trim();

        let operator_start = expression
            .find(['<', '>', '=', '!'])
            .ok_or_else(|| {
                ThresholdParseError::new(format!("No comparison operator in `{expression}`"))
            })?;
        let (aggregation, rest) = expression.split_at(operator_start);

        let (comparison, value) = [
            ("<=", Comparison::Le),
            (">=", Comparison::Ge),
            ("==", Comparison::Eq),
            ("!=", Comparison::Ne),
            ("<", Comparison::Lt),
            (">", Comparison::Gt),
        ]
        .into_iter()
        .find_map(|(token, comparison)| rest.strip_prefix(token).map(|value| (comparison, value)))
        .ok_or_else(|| {
            ThresholdParseError::new(format!("Invalid comparison operator in `{expression}`"))
        })?;

        let aggregation = aggregation.parse::<Aggregation>()?;
        if !metric.supports(&aggregation) {
            return Err(ThresholdParseError::new(format!(
                "Aggregation `{aggregation:?}` is not supported for metric `{metric}`"
            )));
        }

        let value = value.trim().parse::<f64>().map_err(|e| {
            ThresholdParseError::new(format!("Invalid threshold value in `{expression}`: {e}"))
        })?;

        Ok(Self {
            metric,
            expression: expression.to_string(),
            aggregation,
            comparison,
            value,
        })
    }

    pub fn metric(&self) -> ThresholdMetric {
        self.metric
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The value this threshold compares against, if the run produced any data for it.
    pub fn actual(&self, stats: &RunStats) -> Option<f64> {
        match self.metric {
            ThresholdMetric::HttpReqFailed => {
                let op = stats.operation(HTTP_REQ_OPERATION)?;
                match self.aggregation {
                    Aggregation::Count => Some(op.failed() as f64),
                    _ => op.failure_rate(),
                }
            }
            ThresholdMetric::HttpReqDuration => {
                let op = stats.operation(HTTP_REQ_OPERATION)?;
                match self.aggregation {
                    Aggregation::Avg => op.avg_ms(),
                    Aggregation::Min => op.min_ms(),
                    Aggregation::Max => op.max_ms(),
                    Aggregation::Med => op.med_ms(),
                    Aggregation::Percentile(p) => op.percentile_ms(p),
                    Aggregation::Rate | Aggregation::Count => None,
                }
            }
            ThresholdMetric::Checks => stats.checks_total().pass_rate(),
            ThresholdMetric::Iterations => Some(stats.iterations as f64),
        }
    }

    pub fn evaluate(&self, stats: &RunStats) -> ThresholdResult {
        let actual = self.actual(stats);
        let passed = match actual {
            Some(actual) => self.comparison.holds(actual, self.value),
            None => {
                log::warn!(
                    "No data recorded for threshold {}: {}, it will not fail the run",
                    self.metric,
                    self.expression
                );
                true
            }
        };

        ThresholdResult {
            metric: self.metric,
            expression: self.expression.clone(),
            actual,
            passed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdResult {
    pub metric: ThresholdMetric,
    pub expression: String,
    /// `None` when nothing was recorded for the metric.
    pub actual: Option<f64>,
    pub passed: bool,
}

impl Display for ThresholdResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.actual {
            Some(actual) => write!(f, "{}: {} (actual {:.4})", self.metric, self.expression, actual),
            None => write!(f, "{}: {} (no data)", self.metric, self.expression),
        }
    }
}

#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq)]
pub struct ThresholdParseError {
    msg: String,
}

impl ThresholdParseError {
    fn new(msg: String) -> Self {
        Self { msg }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::ReportConfig;
    use crate::OperationRecord;
    use std::time::Duration;

    fn stats_with_requests(total: usize, failed: usize) -> RunStats {
        let reporter = ReportConfig::default().init();
        for i in 0..total {
            let mut record = OperationRecord::new(HTTP_REQ_OPERATION);
            record.elapsed = Some(Duration::from_millis(10 * (i as u64 + 1)));
            record.is_error = i < failed;
            reporter.add_operation(&record);
        }
        reporter.stats()
    }

    #[test]
    fn parse_failure_rate_guardrail() {
        let threshold = Threshold::parse("http_req_failed", "rate<0.01").unwrap();

        assert_eq!(ThresholdMetric::HttpReqFailed, threshold.metric());
        assert_eq!("rate<0.01", threshold.expression());
    }

    #[test]
    fn reject_malformed_metric_name() {
        let err = Threshold::parse("http_reqfailed", "rate<0.01").unwrap_err();
        assert!(err.to_string().contains("http_reqfailed"));
    }

    #[test]
    fn reject_aggregation_not_valid_for_metric() {
        assert!(Threshold::parse("http_req_failed", "p(95)<0.01").is_err());
        assert!(Threshold::parse("http_req_duration", "rate<0.01").is_err());
        assert!(Threshold::parse("iterations", "avg>1").is_err());
    }

    #[test]
    fn reject_bad_expressions() {
        assert!(Threshold::parse("http_req_failed", "rate 0.01").is_err());
        assert!(Threshold::parse("http_req_failed", "rate<abc").is_err());
        assert!(Threshold::parse("http_req_duration", "p(101)<500").is_err());
        assert!(Threshold::parse("http_req_failed", "rate=>0.01").is_err());
    }

    #[test]
    fn parse_all_operators() {
        for expression in ["avg<1", "avg<=1", "avg>1", "avg>=1", "avg==1", "avg!=1", "p(99.9) < 250"] {
            assert!(
                Threshold::parse("http_req_duration", expression).is_ok(),
                "Failed to parse {expression}"
            );
        }
    }

    #[test]
    fn failure_rate_at_one_percent_breaches() {
        let threshold = Threshold::parse("http_req_failed", "rate<0.01").unwrap();

        let at_limit = threshold.evaluate(&stats_with_requests(100, 1));
        assert!(!at_limit.passed);
        assert_eq!(Some(0.01), at_limit.actual);

        let under_limit = threshold.evaluate(&stats_with_requests(200, 1));
        assert!(under_limit.passed);
    }

    #[test]
    fn duration_percentile() {
        // Durations are 10, 20, ..., 100ms
        let stats = stats_with_requests(10, 0);

        assert!(Threshold::parse("http_req_duration", "max<=100")
            .unwrap()
            .evaluate(&stats)
            .passed);
        assert!(!Threshold::parse("http_req_duration", "p(95)<90")
            .unwrap()
            .evaluate(&stats)
            .passed);
    }

    #[test]
    fn checks_rate() {
        let reporter = ReportConfig::default().init();
        reporter.add_check("status is 202", true);
        reporter.add_check("has requestId", false);

        let result = Threshold::parse("checks", "rate>0.9")
            .unwrap()
            .evaluate(&reporter.stats());

        assert_eq!(Some(0.5), result.actual);
        assert!(!result.passed);
    }

    #[test]
    fn no_data_does_not_fail() {
        let result = Threshold::parse("http_req_failed", "rate<0.01")
            .unwrap()
            .evaluate(&RunStats::default());

        assert_eq!(None, result.actual);
        assert!(result.passed);
        assert_eq!("http_req_failed: rate<0.01 (no data)", result.to_string());
    }
}
