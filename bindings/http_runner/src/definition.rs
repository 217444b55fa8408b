use clap::Parser;
use surge_runner::prelude::{ScenarioDefinitionBuilder, UserValuesConstraint};

use crate::cli::SurgeHttpScenarioCli;
use crate::common::parse_base_url;
use crate::context::HttpVuContext;
use crate::runner_context::HttpRunnerContext;

pub struct HttpScenarioDefinitionBuilder<RSV: UserValuesConstraint, VSV: UserValuesConstraint> {
    inner: ScenarioDefinitionBuilder<HttpRunnerContext<RSV>, HttpVuContext<VSV>>,
    runner_value: HttpRunnerContext<RSV>,
}

impl<RSV: UserValuesConstraint, VSV: UserValuesConstraint> HttpScenarioDefinitionBuilder<RSV, VSV> {
    /// See [ScenarioDefinitionBuilder::new].
    ///
    /// The base URL is validated here and, along with the access token, becomes the initial
    /// [HttpRunnerContext].
    pub fn new(name: &str, cli: SurgeHttpScenarioCli) -> anyhow::Result<Self> {
        let base_url = parse_base_url(&cli.base_url)?;
        let access_token = cli.access_token();
        log::info!(
            "Targeting {} ({})",
            base_url,
            if access_token.is_some() {
                "authenticated"
            } else {
                "anonymous"
            }
        );

        Ok(Self {
            inner: ScenarioDefinitionBuilder::new(name, cli.into()),
            runner_value: HttpRunnerContext::new(base_url, access_token),
        })
    }

    /// Seed the scenario's own values, such as settings from a scenario specific command line,
    /// before the setup hook runs.
    pub fn with_scenario_values(mut self, scenario_values: RSV) -> Self {
        self.runner_value.scenario_values = scenario_values;
        self
    }

    /// See [ScenarioDefinitionBuilder::new_with_init].
    ///
    /// This function uses [SurgeHttpScenarioCli] instead of [surge_runner::prelude::SurgeScenarioCli].
    pub fn new_with_init(name: &str) -> anyhow::Result<Self> {
        env_logger::init();
        Self::new(name, SurgeHttpScenarioCli::parse())
    }

    /// Once the HTTP customisations have been made, use this function to switch back to
    /// configuring default properties for the scenario.
    pub fn into_std(self) -> ScenarioDefinitionBuilder<HttpRunnerContext<RSV>, HttpVuContext<VSV>> {
        // These environment variables are common to HTTP tests. Always capture them and just let
        // scenarios add any that are custom. The access token is never captured.
        self.inner
            .with_runner_value(self.runner_value)
            .add_capture_env("BASE_URL")
            .add_capture_env("VUS")
            .add_capture_env("DURATION")
    }
}
