use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _};
use clap::Parser;
use surge_instruments::prelude::Threshold;

use crate::cli::{ReporterOpt, SurgeScenarioCli};
use crate::context::{RunnerContext, UserValuesConstraint, VuContext};

pub type HookResult = anyhow::Result<()>;

pub type GlobalHookMut<RV> = fn(&mut RunnerContext<RV>) -> HookResult;
pub type GlobalHook<RV> = fn(Arc<RunnerContext<RV>>) -> HookResult;
pub type VuHookMut<RV, V> = fn(&mut VuContext<RV, V>) -> HookResult;

/// Name of the behaviour registered by [ScenarioDefinitionBuilder::use_vu_behaviour].
pub const DEFAULT_BEHAVIOUR: &str = "default";

/// How long iterations in flight at the end of a run are given to finish before they are
/// cancelled.
pub const DEFAULT_GRACEFUL_STOP: Duration = Duration::from_secs(30);

/// The builder for a scenario definition.
///
/// This must be used at the start of a test to define the scenario that you want to run.
pub struct ScenarioDefinitionBuilder<RV: UserValuesConstraint, V: UserValuesConstraint> {
    /// The name of the scenario, which should be unique within the test suite.
    ///
    /// Recommended value is `env!("CARGO_PKG_NAME")`.
    name: String,
    cli: SurgeScenarioCli,
    /// The VU count to use when none is given on the command line.
    default_vus: Option<usize>,
    /// The run duration to use when none is given on the command line.
    default_duration: Option<Duration>,
    /// Time that iterations still running when the run stops are given to complete.
    graceful_stop: Duration,
    /// Initial value for the runner context, before the global setup hook runs.
    runner_value: Option<RV>,
    /// Raw `(metric, expression)` pairs, validated when the definition is built.
    thresholds: Vec<(String, String)>,
    /// Environment variables to record in the run summary.
    capture_env: BTreeSet<String>,
    /// Global setup hook for this scenario. It will be run once, before any VUs are started.
    setup_fn: Option<GlobalHookMut<RV>>,
    /// Setup hook for a VU, which will be run once for each VU as it starts.
    setup_vu_fn: Option<VuHookMut<RV, V>>,
    /// The VU behaviour for this scenario, run once per iteration. There are two ways that this can be used:
    /// - Specify a single behaviour for all VUs using [ScenarioDefinitionBuilder::use_vu_behaviour].
    /// - Specify multiple behaviours using [ScenarioDefinitionBuilder::use_named_vu_behaviour]. You then need to tell the runner how many VUs you want to run each behaviour.
    vu_behaviour: HashMap<String, VuHookMut<RV, V>>,
    /// Teardown hook for a VU, run once when the VU stops.
    teardown_vu_fn: Option<VuHookMut<RV, V>>,
    /// Global teardown hook, run once after every VU has stopped. Failures are logged only.
    teardown_fn: Option<GlobalHook<RV>>,
}

pub struct ScenarioDefinition<RV: UserValuesConstraint, V: UserValuesConstraint> {
    pub name: String,
    pub vus: usize,
    pub duration: Option<Duration>,
    pub graceful_stop: Duration,
    pub connection_string: Option<String>,
    pub assigned_behaviours: Vec<AssignedBehaviour>,
    pub thresholds: Vec<Threshold>,
    pub capture_env: BTreeSet<String>,
    pub no_progress: bool,
    pub reporter: ReporterOpt,
    pub run_id: Option<String>,
    pub json_summary: bool,
    pub runner_value: RV,
    pub setup_fn: Option<GlobalHookMut<RV>>,
    pub setup_vu_fn: Option<VuHookMut<RV, V>>,
    pub vu_behaviour: HashMap<String, VuHookMut<RV, V>>,
    pub teardown_vu_fn: Option<VuHookMut<RV, V>>,
    pub teardown_fn: Option<GlobalHook<RV>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedBehaviour {
    pub behaviour_name: String,
    pub vu_count: usize,
}

impl<RV: UserValuesConstraint, V: UserValuesConstraint> ScenarioDefinition<RV, V> {
    /// One behaviour name per VU, in VU index order.
    pub(crate) fn assigned_behaviours_flat(&self) -> Vec<String> {
        self.assigned_behaviours
            .iter()
            .flat_map(|assigned| {
                std::iter::repeat(assigned.behaviour_name.clone()).take(assigned.vu_count)
            })
            .collect()
    }

    pub(crate) fn assigned_behaviours_summary(&self) -> BTreeMap<String, usize> {
        self.assigned_behaviours
            .iter()
            .fold(BTreeMap::new(), |mut acc, assigned| {
                *acc.entry(assigned.behaviour_name.clone()).or_default() += assigned.vu_count;
                acc
            })
    }
}

impl<RV: UserValuesConstraint, V: UserValuesConstraint> ScenarioDefinitionBuilder<RV, V> {
    /// Initialise a new scenario definition from the scenario name and command line arguments.
    /// See the [ScenarioDefinitionBuilder::name] for more information about the name.
    pub fn new(name: &str, cli: SurgeScenarioCli) -> Self {
        Self {
            name: name.to_string(),
            cli,
            default_vus: None,
            default_duration: None,
            graceful_stop: DEFAULT_GRACEFUL_STOP,
            runner_value: None,
            thresholds: Vec::new(),
            capture_env: BTreeSet::new(),
            setup_fn: None,
            setup_vu_fn: None,
            vu_behaviour: HashMap::new(),
            teardown_vu_fn: None,
            teardown_fn: None,
        }
    }

    /// Initialise logging and parse the command line, then call [ScenarioDefinitionBuilder::new].
    pub fn new_with_init(name: &str) -> Self {
        env_logger::init();

        Self::new(name, SurgeScenarioCli::parse())
    }

    /// Number of VUs to run if `--vus` is not given. Falls back to 1 if neither is set.
    pub fn with_default_vus(mut self, vus: usize) -> Self {
        self.default_vus = Some(vus);
        self
    }

    /// Run duration to use if `--duration` is not given. Without either, the run continues until
    /// it is stopped.
    pub fn with_default_duration(mut self, duration: Duration) -> Self {
        self.default_duration = Some(duration);
        self
    }

    pub fn with_default_duration_s(self, duration_s: u64) -> Self {
        self.with_default_duration(Duration::from_secs(duration_s))
    }

    /// How long iterations still running when the run stops may take to finish. Once this has
    /// passed, any work still waiting in [crate::prelude::Executor::execute_in_place] is
    /// cancelled and that iteration is not counted.
    ///
    /// Defaults to [DEFAULT_GRACEFUL_STOP].
    pub fn with_graceful_stop(mut self, graceful_stop: Duration) -> Self {
        self.graceful_stop = graceful_stop;
        self
    }

    /// The VU count this scenario will run with, from `--vus`, then the scenario default, then 1.
    pub fn vus(&self) -> usize {
        self.cli.vus.or(self.default_vus).unwrap_or(1)
    }

    /// The run duration, from `--duration` then the scenario default. `None` when the run
    /// continues until it is stopped, which is always the case for `--soak`.
    pub fn duration(&self) -> Option<Duration> {
        if self.cli.soak {
            None
        } else {
            self.cli.duration.or(self.default_duration)
        }
    }

    pub fn graceful_stop(&self) -> Duration {
        self.graceful_stop
    }

    /// Seed the runner context value instead of starting from [Default].
    pub fn with_runner_value(mut self, value: RV) -> Self {
        self.runner_value = Some(value);
        self
    }

    /// Add a run level pass/fail criterion, such as `("http_req_failed", "rate<0.01")`.
    ///
    /// The threshold is validated when the scenario starts. An unknown metric name stops the
    /// scenario from starting.
    pub fn with_threshold(mut self, metric: &str, expression: &str) -> Self {
        self.thresholds
            .push((metric.to_string(), expression.to_string()));
        self
    }

    /// Record the value of this environment variable in the run summary, if it is set.
    pub fn add_capture_env(mut self, key: &str) -> Self {
        self.capture_env.insert(key.to_string());
        self
    }

    /// Set the global setup hook [ScenarioDefinitionBuilder::setup_fn] for this scenario.
    pub fn use_setup(mut self, setup_fn: GlobalHookMut<RV>) -> Self {
        self.setup_fn = Some(setup_fn);
        self
    }

    /// Set the VU setup hook [ScenarioDefinitionBuilder::setup_vu_fn] for this scenario.
    pub fn use_vu_setup(mut self, setup_vu_fn: VuHookMut<RV, V>) -> Self {
        self.setup_vu_fn = Some(setup_vu_fn);
        self
    }

    /// Set the default VU behaviour hook [ScenarioDefinitionBuilder::vu_behaviour] for this scenario.
    pub fn use_vu_behaviour(self, behaviour: VuHookMut<RV, V>) -> Self {
        self.use_named_vu_behaviour(DEFAULT_BEHAVIOUR, behaviour)
    }

    /// Set a named VU behaviour hook [ScenarioDefinitionBuilder::vu_behaviour] for this scenario.
    pub fn use_named_vu_behaviour(mut self, name: &str, behaviour: VuHookMut<RV, V>) -> Self {
        let previous = self.vu_behaviour.insert(name.to_string(), behaviour);

        if previous.is_some() {
            panic!("Behaviour [{}] is already defined", name);
        }

        self
    }

    /// Set the VU teardown hook [ScenarioDefinitionBuilder::teardown_vu_fn] for this scenario.
    pub fn use_vu_teardown(mut self, teardown_vu_fn: VuHookMut<RV, V>) -> Self {
        self.teardown_vu_fn = Some(teardown_vu_fn);
        self
    }

    /// Set the global teardown hook [ScenarioDefinitionBuilder::teardown_fn] for this scenario.
    pub fn use_teardown(mut self, teardown_fn: GlobalHook<RV>) -> Self {
        self.teardown_fn = Some(teardown_fn);
        self
    }

    pub(crate) fn build(self) -> anyhow::Result<ScenarioDefinition<RV, V>> {
        let vus = self.vus();
        if vus == 0 {
            bail!("The VU count must be at least 1");
        }

        let duration = self.duration();
        if duration.is_some_and(|d| d.is_zero()) {
            bail!("The run duration must be greater than zero");
        }

        let thresholds = self
            .thresholds
            .iter()
            .map(|(metric, expression)| {
                Threshold::parse(metric, expression)
                    .with_context(|| format!("Invalid threshold {metric}: {expression}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let assigned_behaviours = assign_behaviours(vus, &self.cli.behaviour, &self.vu_behaviour)?;

        Ok(ScenarioDefinition {
            name: self.name,
            vus,
            duration,
            graceful_stop: self.graceful_stop,
            connection_string: self.cli.connection_string,
            assigned_behaviours,
            thresholds,
            capture_env: self.capture_env,
            no_progress: self.cli.no_progress,
            reporter: self.cli.reporter,
            run_id: self.cli.run_id,
            json_summary: self.cli.json_summary,
            runner_value: self.runner_value.unwrap_or_default(),
            setup_fn: self.setup_fn,
            setup_vu_fn: self.setup_vu_fn,
            vu_behaviour: self.vu_behaviour,
            teardown_vu_fn: self.teardown_vu_fn,
            teardown_fn: self.teardown_fn,
        })
    }
}

fn assign_behaviours<T>(
    vus: usize,
    requested: &[(String, usize)],
    registered: &HashMap<String, T>,
) -> anyhow::Result<Vec<AssignedBehaviour>> {
    let mut assigned = Vec::with_capacity(requested.len() + 1);
    let mut total = 0;

    for (behaviour_name, vu_count) in requested {
        if !registered.contains_key(behaviour_name) {
            bail!("Behaviour [{behaviour_name}] is not defined by this scenario");
        }
        total += vu_count;
        assigned.push(AssignedBehaviour {
            behaviour_name: behaviour_name.clone(),
            vu_count: *vu_count,
        });
    }

    if total > vus {
        bail!("Assigned {total} VUs to behaviours but the scenario only runs {vus} VUs");
    }

    let remaining = vus - total;
    if remaining > 0 {
        if !registered.contains_key(DEFAULT_BEHAVIOUR) {
            bail!("{remaining} VUs have no behaviour assigned and the scenario has no default behaviour");
        }
        assigned.push(AssignedBehaviour {
            behaviour_name: DEFAULT_BEHAVIOUR.to_string(),
            vu_count: remaining,
        });
    }

    Ok(assigned)
}
