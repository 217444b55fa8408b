use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use http_surge_runner::prelude::*;

pub const STATUS_CHECK: &str = "status is 202";
pub const REQUEST_ID_CHECK: &str = "has requestId";

/// Event used when no access token is configured.
pub const ANONYMOUS_EVENT_ID: &str = "EVT-004";
/// Event used when an access token is configured.
pub const AUTHENTICATED_EVENT_ID: &str = "EVT-009";

pub const DEFAULT_VUS: usize = 300;
pub const DEFAULT_DURATION: Duration = Duration::from_secs(60);

const THINK_TIME: Duration = Duration::from_millis(50);

/// Command line for the participation spike: the HTTP runner options plus the event to target.
#[derive(Clone, Parser)]
#[command(about, long_about = None)]
pub struct ParticipationCli {
    #[command(flatten)]
    pub http: SurgeHttpScenarioCli,

    /// The event to register participations for. Defaults to `EVT-004`, or `EVT-009` when an
    /// access token is set.
    #[arg(long, env = "EVENT_ID")]
    pub event_id: Option<String>,
}

#[derive(Debug, Default)]
pub struct ScenarioValues {
    event_id: Option<String>,
    participation_url: Option<Url>,
}

impl ScenarioValues {
    pub fn with_event_id(event_id: Option<String>) -> Self {
        Self {
            event_id,
            participation_url: None,
        }
    }

    /// The configured event, treating an empty value as not set.
    pub fn event_id(&self) -> Option<&str> {
        self.event_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

impl UserValuesConstraint for ScenarioValues {}

pub type ParticipationRunnerContext = HttpRunnerContext<ScenarioValues>;

pub fn default_event_id(authenticated: bool) -> &'static str {
    if authenticated {
        AUTHENTICATED_EVENT_ID
    } else {
        ANONYMOUS_EVENT_ID
    }
}

/// `{base_url}/events/{event_id}/participations`
pub fn participation_url(base_url: &Url, event_id: &str) -> anyhow::Result<Url> {
    endpoint_url(base_url, &["events", event_id, "participations"])
}

/// Outcome of the two checks made against every participation response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipationChecks {
    pub status_is_202: bool,
    pub has_request_id: bool,
}

impl ParticipationChecks {
    pub fn evaluate(response: &HttpResponse) -> Self {
        Self {
            status_is_202: response.status == 202,
            has_request_id: response
                .parsed_body()
                .string_field("requestId")
                .is_some_and(|id| !id.is_empty()),
        }
    }

    /// There is no status or body to check when the request never completed.
    pub fn transport_failure() -> Self {
        Self {
            status_is_202: false,
            has_request_id: false,
        }
    }

    pub fn record(&self, reporter: &Reporter) {
        reporter.add_check(STATUS_CHECK, self.status_is_202);
        reporter.add_check(REQUEST_ID_CHECK, self.has_request_id);
    }
}

fn setup(ctx: &mut RunnerContext<ParticipationRunnerContext>) -> HookResult {
    let authenticated = ctx.get().access_token().is_some();
    let event_id = ctx
        .get()
        .scenario_values
        .event_id()
        .unwrap_or_else(|| default_event_id(authenticated))
        .to_string();

    let url = participation_url(ctx.get().base_url()?, &event_id)?;
    log::info!("Registering participations at {}", url);
    ctx.get_mut().scenario_values.participation_url = Some(url);

    Ok(())
}

fn participate(ctx: &mut VuContext<ParticipationRunnerContext, HttpVuContext>) -> HookResult {
    let client = ctx.get().client()?;
    let url = ctx
        .runner_context()
        .get()
        .scenario_values
        .participation_url
        .clone()
        .context("participation_url is not set, did the setup hook run?")?;
    let reporter = ctx.runner_context().reporter();
    let vu_id = ctx.vu_id().to_string();

    ctx.runner_context()
        .executor()
        .execute_in_place(async move {
            let checks = match client.post_empty_json(&url, "participate").await {
                Ok(response) => ParticipationChecks::evaluate(&response),
                Err(e) => {
                    log::debug!("{} participation request failed: {:#}", vu_id, e);
                    ParticipationChecks::transport_failure()
                }
            };
            checks.record(&reporter);

            tokio::time::sleep(THINK_TIME).await;
            Ok(())
        })
}

/// Create the participation spike from its command line.
pub fn participation_scenario(
    name: &str,
    cli: ParticipationCli,
) -> anyhow::Result<ScenarioDefinitionBuilder<ParticipationRunnerContext, HttpVuContext>> {
    let builder = HttpScenarioDefinitionBuilder::<ScenarioValues, DefaultScenarioValues>::new(
        name, cli.http,
    )?
    .with_scenario_values(ScenarioValues::with_event_id(cli.event_id));

    Ok(build_scenario(builder))
}

/// Configure the participation spike on top of the HTTP scenario builder.
pub fn build_scenario(
    builder: HttpScenarioDefinitionBuilder<ScenarioValues, DefaultScenarioValues>,
) -> ScenarioDefinitionBuilder<ParticipationRunnerContext, HttpVuContext> {
    builder
        .into_std()
        .with_default_vus(DEFAULT_VUS)
        .with_default_duration(DEFAULT_DURATION)
        .with_threshold("http_req_failed", "rate<0.01")
        .add_capture_env("EVENT_ID")
        .use_setup(setup)
        .use_vu_setup(connect_http_client)
        .use_vu_behaviour(participate)
}
