use std::time::Duration;

use clap::Parser;

use crate::duration::parse_duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReporterOpt {
    /// Keep everything in memory and print summary tables at the end of the run.
    InMemory,
    /// Keep everything in memory but print nothing. Thresholds are still evaluated.
    Noop,
}

#[derive(Debug, Clone, Parser)]
#[command(about, long_about = None)]
pub struct SurgeScenarioCli {
    /// A connection string for the service to test
    #[clap(short, long)]
    pub connection_string: Option<String>,

    /// The number of virtual users to run concurrently for the whole run
    #[clap(long)]
    pub vus: Option<usize>,

    /// How long to run the scenario for, such as `60s`, `5m` or `1h30m`. A bare number is read as
    /// seconds.
    #[clap(long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Assign a behaviour to a number of virtual users. Specify the behaviour and number of VUs to
    /// assign it to in the format `behaviour:count`. For example `--behaviour=participate:5`.
    ///
    /// Specifying the count is optional and will default to 1.
    ///
    /// You can specify multiple behaviours by using the flag multiple times. For example `--behaviour=participate:5 --behaviour=browse:5`.
    ///
    /// For however many VUs you assign to behaviours in total, it must be less than or equal to the total number of VUs for this scenario.
    /// If it is less than the total number of VUs then the remaining VUs will be assigned the default behaviour.
    ///
    /// If the configuration is invalid then the scenario will fail to start.
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

pub fn parse_vu_behaviour(s: &str) -> anyhow::Result<(String, usize)> {
    let mut parts = s.split(':');
    let name = parts
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(anyhow::anyhow!("No name specified for behaviour"))?;

    let count = match parts.next() {
        Some(count) => count
            .trim()
            .parse::<usize>()
            .map_err(|e| anyhow::anyhow!("Invalid VU count for behaviour {name}: {e}"))?,
        None => 1,
    };

    Ok((name, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn behaviour_with_count() {
        assert_eq!(
            ("participate".to_string(), 5),
            parse_vu_behaviour("participate:5").unwrap()
        );
    }

    #[test]
    fn behaviour_count_defaults_to_one() {
        assert_eq!(
            ("participate".to_string(), 1),
            parse_vu_behaviour("participate").unwrap()
        );
    }

    #[test]
    fn behaviour_rejects_bad_count() {
        assert!(parse_vu_behaviour("participate:many").is_err());
        assert!(parse_vu_behaviour(":3").is_err());
    }

    #[test]
    fn parse_full_command_line() {
        let cli = SurgeScenarioCli::try_parse_from([
            "participation_spike",
            "--connection-string",
            "http://localhost:8080",
            "--vus",
            "10",
            "--duration",
            "1m30s",
            "--behaviour",
            "participate:4",
            "--no-progress",
            "--reporter",
            "noop",
        ])
        .unwrap();

        assert_eq!(Some("http://localhost:8080".to_string()), cli.connection_string);
        assert_eq!(Some(10), cli.vus);
        assert_eq!(Some(Duration::from_secs(90)), cli.duration);
        assert_eq!(vec![("participate".to_string(), 4)], cli.behaviour);
        assert!(cli.no_progress);
        assert_eq!(ReporterOpt::Noop, cli.reporter);
        assert!(!cli.json_summary);
    }
}
