use clap::Parser;
use http_surge_runner::prelude::*;
use participation_spike::{participation_scenario, ParticipationCli};

fn main() -> SurgeResult<()> {
    env_logger::init();

    let scenario = participation_scenario(env!("CARGO_PKG_NAME"), ParticipationCli::parse())?;

    let outcome = run(scenario)?;
    outcome.ensure_thresholds_passed()?;

    Ok(())
}
