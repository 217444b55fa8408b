use std::time::Duration;

use clap::Parser;
use surge_runner::prelude::{ReporterOpt, SurgeScenarioCli};
use surge_runner::{parse_duration, parse_vu_behaviour};

#[derive(Clone, Parser)]
#[command(about, long_about = None)]
pub struct SurgeHttpScenarioCli {
    /// Base URL of the service to test. Any path is kept and request paths are added after it.
    #[clap(long, env = "BASE_URL", default_value = "http://localhost:8080")]
    pub base_url: String,

    /// Bearer token to send with every request. No `Authorization` header is sent if this is not
    /// set or is empty.
    #[clap(long, env = "ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// The number of virtual users to run concurrently for the whole run.
    #[clap(long, env = "VUS")]
    pub vus: Option<usize>,

    /// How long to run the scenario for, such as `60s`, `5m` or `1h30m`. A bare number is read as
    /// seconds.
    #[clap(long, env = "DURATION", value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Assign a behaviour to a number of virtual users, in the format `behaviour:count`.
    ///
    /// See the same option on the standard runner for details.
    #[clap(long, short, value_parser = parse_vu_behaviour)]
    pub behaviour: Vec<(String, usize)>,

    /// Run this test as a soak test, ignoring any configured duration and continuing to run until stopped
    #[clap(long, default_value = "false")]
    pub soak: bool,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by anyone and is just adding noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    /// The reporter to use.
    #[arg(long, value_enum, default_value_t = ReporterOpt::InMemory)]
    pub reporter: ReporterOpt,

    /// Set the ID of this run
    ///
    /// If not set, a random ID is used.
    #[arg(long, short)]
    pub run_id: Option<String>,

    /// Print the run summary as a single line of JSON on stdout when the run finishes.
    #[clap(long, default_value = "false")]
    pub json_summary: bool,
}

impl SurgeHttpScenarioCli {
    /// The configured token, treating an empty value as not set.
    pub fn access_token(&self) -> Option<String> {
        self.access_token
            .as_ref()
            .map(|token| token.trim())
            .filter(|token| !token.is_empty())
            .map(ToString::to_string)
    }
}

impl From<SurgeHttpScenarioCli> for SurgeScenarioCli {
    fn from(cli: SurgeHttpScenarioCli) -> Self {
        SurgeScenarioCli {
            // The base URL is the connection string for HTTP scenarios.
            connection_string: Some(cli.base_url),
            vus: cli.vus,
            duration: cli.duration,
            behaviour: cli.behaviour,
            soak: cli.soak,
            no_progress: cli.no_progress,
            reporter: cli.reporter,
            run_id: cli.run_id,
            json_summary: cli.json_summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    // Tests in this module read the process environment, so they must not run concurrently.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ENV_KEYS: [&str; 4] = ["BASE_URL", "ACCESS_TOKEN", "VUS", "DURATION"];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn defaults() {
        let _guard = ENV_LOCK.lock();
        clear_env();

        let cli = SurgeHttpScenarioCli::try_parse_from(["participation_spike"]).unwrap();

        assert_eq!("http://localhost:8080", cli.base_url);
        assert_eq!(None, cli.access_token());
        assert_eq!(None, cli.vus);
        assert_eq!(None, cli.duration);
    }

    #[test]
    fn reads_environment() {
        let _guard = ENV_LOCK.lock();
        clear_env();
        std::env::set_var("BASE_URL", "https://api.example.com/v1");
        std::env::set_var("ACCESS_TOKEN", "secret");
        std::env::set_var("VUS", "25");
        std::env::set_var("DURATION", "2m");

        let cli = SurgeHttpScenarioCli::try_parse_from(["participation_spike"]).unwrap();
        clear_env();

        assert_eq!("https://api.example.com/v1", cli.base_url);
        assert_eq!(Some("secret".to_string()), cli.access_token());
        assert_eq!(Some(25), cli.vus);
        assert_eq!(Some(Duration::from_secs(120)), cli.duration);
    }

    #[test]
    fn flags_win_over_environment() {
        let _guard = ENV_LOCK.lock();
        clear_env();
        std::env::set_var("VUS", "25");

        let cli = SurgeHttpScenarioCli::try_parse_from(["participation_spike", "--vus", "3"])
            .unwrap();
        clear_env();

        assert_eq!(Some(3), cli.vus);
    }

    #[test]
    fn empty_token_is_not_set() {
        let _guard = ENV_LOCK.lock();
        clear_env();

        let cli = SurgeHttpScenarioCli::try_parse_from([
            "participation_spike",
            "--access-token",
            "",
        ])
        .unwrap();

        assert_eq!(None, cli.access_token());
    }

    #[test]
    fn converts_to_standard_cli() {
        let _guard = ENV_LOCK.lock();
        clear_env();

        let cli = SurgeHttpScenarioCli::try_parse_from([
            "participation_spike",
            "--base-url",
            "http://127.0.0.1:9000",
            "--duration",
            "500ms",
            "--no-progress",
            "--json-summary",
        ])
        .unwrap();
        let std_cli: SurgeScenarioCli = cli.into();

        assert_eq!(
            Some("http://127.0.0.1:9000".to_string()),
            std_cli.connection_string
        );
        assert_eq!(Some(Duration::from_millis(500)), std_cli.duration);
        assert!(std_cli.no_progress);
        assert!(std_cli.json_summary);
    }
}
