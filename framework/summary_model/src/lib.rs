use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};

/// Summary of a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// The unique run id
    ///
    /// Chosen by the runner unless one was supplied on the command line.
    pub run_id: String,
    /// The name of the scenario that was run
    pub scenario_name: String,
    /// The time the run started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    /// The duration that the run was configured with, in milliseconds
    ///
    /// If the run was configured for soak testing, then this will not be set.
    pub run_duration_ms: Option<u64>,
    /// The number of virtual users configured
    pub vus: usize,
    /// The number of virtual users still running at the end of the run
    ///
    /// Less than [RunSummary::vus] when some VUs bailed or failed their setup.
    pub vus_end_count: usize,
    /// The number of VUs that were assigned to each behaviour.
    pub assigned_behaviours: BTreeMap<String, usize>,
    /// Environment variables set for the run
    ///
    /// Only the variables the scenario asked to capture. Secrets are never captured.
    pub env: BTreeMap<String, String>,
    /// Completed iterations across all VUs
    pub iterations: u64,
    /// Share of HTTP requests that failed, if any were made
    pub http_req_failed_rate: Option<f64>,
    /// Pass and fail tallies per check
    pub checks: BTreeMap<String, CheckSummary>,
    /// Outcome of every configured threshold
    pub thresholds: Vec<ThresholdSummary>,
    /// The version of Surge that was used for this run
    pub surge_version: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckSummary {
    pub passes: u64,
    pub fails: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThresholdSummary {
    pub metric: String,
    pub expression: String,
    pub actual: Option<f64>,
    pub passed: bool,
}

impl RunSummary {
    /// Create a new run summary
    pub fn new(
        run_id: String,
        scenario_name: String,
        started_at: i64,
        run_duration_ms: Option<u64>,
        vus: usize,
        assigned_behaviours: BTreeMap<String, usize>,
        surge_version: String,
    ) -> Self {
        Self {
            run_id,
            scenario_name,
            started_at,
            run_duration_ms,
            vus,
            vus_end_count: 0,
            assigned_behaviours,
            env: BTreeMap::new(),
            iterations: 0,
            http_req_failed_rate: None,
            checks: BTreeMap::new(),
            thresholds: Vec::new(),
            surge_version,
        }
    }

    /// Set the number of VUs still running at the end
    pub fn set_vus_end_count(&mut self, vus_end_count: usize) {
        self.vus_end_count = vus_end_count;
    }

    /// Add an environment variable
    pub fn add_env(&mut self, key: String, value: String) {
        self.env.insert(key, value);
    }

    /// Whether every threshold passed
    pub fn thresholds_passed(&self) -> bool {
        self.thresholds.iter().all(|threshold| threshold.passed)
    }
}

/// Serialize the run summary to a writer as a single line of JSON followed by a newline.
pub fn store_run_summary<W: Write>(run_summary: &RunSummary, writer: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer(&mut *writer, run_summary)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Load a run summary from a reader
pub fn load_run_summary<R: Read>(reader: R) -> anyhow::Result<RunSummary> {
    let reader = std::io::BufReader::new(reader);
    let run_summary: RunSummary = serde_json::from_reader(reader)?;
    Ok(run_summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_summary() -> RunSummary {
        let mut summary = RunSummary::new(
            "run-1".to_string(),
            "participation_spike".to_string(),
            1_700_000_000,
            Some(60_000),
            300,
            BTreeMap::from([("default".to_string(), 300)]),
            "0.1.0".to_string(),
        );
        summary.set_vus_end_count(300);
        summary.add_env("EVENT_ID".to_string(), "EVT-004".to_string());
        summary.iterations = 1200;
        summary.http_req_failed_rate = Some(0.0);
        summary.checks.insert(
            "status is 202".to_string(),
            CheckSummary {
                passes: 1200,
                fails: 0,
            },
        );
        summary.thresholds.push(ThresholdSummary {
            metric: "http_req_failed".to_string(),
            expression: "rate<0.01".to_string(),
            actual: Some(0.0),
            passed: true,
        });
        summary
    }

    #[test]
    fn stored_summary_is_one_json_line() {
        let mut out = Vec::new();
        store_run_summary(&sample_summary(), &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(1, text.lines().count());
        assert!(text.ends_with('\n'));

        let value: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!("EVT-004", value["env"]["EVENT_ID"]);
        assert_eq!(1200, value["checks"]["status is 202"]["passes"]);

        let loaded = load_run_summary(text.as_bytes()).unwrap();
        assert_eq!(sample_summary(), loaded);
    }

    #[test]
    fn thresholds_passed_requires_all() {
        let mut summary = sample_summary();
        assert!(summary.thresholds_passed());

        summary.thresholds.push(ThresholdSummary {
            metric: "checks".to_string(),
            expression: "rate>0.99".to_string(),
            actual: Some(0.5),
            passed: false,
        });
        assert!(!summary.thresholds_passed());
    }
}
