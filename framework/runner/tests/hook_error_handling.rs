use std::sync::Arc;
use std::time::Duration;
use surge_runner::prelude::{
    run, HookResult, ReporterOpt, RunnerContext, ScenarioDefinitionBuilder, SurgeScenarioCli,
    UserValuesConstraint, VuBailError, VuContext,
};

#[derive(Default, Debug)]
struct RunnerContextValue {}

impl UserValuesConstraint for RunnerContextValue {}

#[derive(Default, Debug)]
struct VuContextValue {
    value: i32,
}

impl UserValuesConstraint for VuContextValue {}

fn sample_cli_cfg() -> SurgeScenarioCli {
    SurgeScenarioCli {
        connection_string: Some("test_connection_string".to_string()),
        vus: None,
        duration: None,
        behaviour: vec![],
        soak: false,
        no_progress: true,
        reporter: ReporterOpt::Noop,
        run_id: None,
        json_summary: false,
    }
}

fn idle_behaviour(ctx: &mut VuContext<RunnerContextValue, VuContextValue>) -> HookResult {
    ctx.runner_context().executor().execute_in_place(async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(())
    })
}

#[test]
fn propagate_error_in_setup_hook() {
    fn setup(_ctx: &mut RunnerContext<RunnerContextValue>) -> HookResult {
        Err(anyhow::anyhow!("Error in setup hook"))
    }

    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, VuContextValue>::new(
        "propagate_error_in_setup_hook",
        sample_cli_cfg(),
    )
    .with_default_duration(Duration::from_secs(5))
    .use_setup(setup)
    .use_vu_behaviour(idle_behaviour);

    let result = run(scenario);

    assert!(result.is_err());
    assert_eq!(result.unwrap_err().to_string(), "Error in setup hook");
}

#[test]
fn capture_error_in_vu_setup() {
    fn vu_setup(_ctx: &mut VuContext<RunnerContextValue, VuContextValue>) -> HookResult {
        Err(anyhow::anyhow!("Error in VU setup hook"))
    }

    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, VuContextValue>::new(
        "capture_error_in_vu_setup",
        sample_cli_cfg(),
    )
    .with_default_duration(Duration::from_secs(5))
    .use_vu_setup(vu_setup)
    .use_vu_behaviour(idle_behaviour);

    let outcome = run(scenario).unwrap();

    // The only VU failed its setup, so the run ends without waiting for the duration.
    assert_eq!(0, outcome.vus_end_count());
    assert_eq!(0, outcome.report.stats.iterations);
}

#[test]
fn capture_error_in_vu_behaviour_and_continue() {
    fn vu_behaviour(ctx: &mut VuContext<RunnerContextValue, VuContextValue>) -> HookResult {
        if ctx.get().value < 5 {
            ctx.get_mut().value += 1;
        } else {
            // Save time running this test by shutting down once this has run a few times.
            ctx.runner_context().force_stop_scenario();
        }

        Err(anyhow::anyhow!("Error in VU behaviour hook"))
    }

    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, VuContextValue>::new(
        "capture_error_in_vu_behaviour_and_continue",
        sample_cli_cfg(),
    )
    .with_default_duration(Duration::from_secs(5))
    .use_vu_behaviour(vu_behaviour);

    let outcome = run(scenario).unwrap();

    assert_eq!(1, outcome.vus_end_count());
    // Failed iterations are not counted as completed.
    assert_eq!(0, outcome.report.stats.iterations);
}

#[test]
fn bail_error_stops_vu_behaviour() {
    fn vu_behaviour_1(_ctx: &mut VuContext<RunnerContextValue, VuContextValue>) -> HookResult {
        Err(VuBailError::default().into())
    }

    let mut cfg = sample_cli_cfg();
    cfg.vus = Some(2);
    cfg.behaviour = vec![("bail".to_string(), 1), ("continue".to_string(), 1)];
    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, VuContextValue>::new(
        "bail_error_stops_vu_behaviour",
        cfg,
    )
    .with_default_duration(Duration::from_secs(1))
    .use_named_vu_behaviour("bail", vu_behaviour_1)
    .use_named_vu_behaviour("continue", idle_behaviour);

    let outcome = run(scenario).unwrap();

    assert_eq!(1, outcome.vus_end_count());
    assert!(outcome.report.stats.iterations > 0);
}

#[test]
fn capture_error_in_vu_teardown() {
    fn vu_teardown(_ctx: &mut VuContext<RunnerContextValue, VuContextValue>) -> HookResult {
        Err(anyhow::anyhow!("Error in VU teardown hook"))
    }

    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, VuContextValue>::new(
        "capture_error_in_vu_teardown",
        sample_cli_cfg(),
    )
    .with_default_duration(Duration::from_millis(300))
    .use_vu_behaviour(idle_behaviour)
    .use_vu_teardown(vu_teardown);

    let result = run(scenario);

    assert!(result.is_ok());
}

#[test]
fn capture_error_in_teardown() {
    fn teardown(_ctx: Arc<RunnerContext<RunnerContextValue>>) -> HookResult {
        Err(anyhow::anyhow!("Error in teardown hook"))
    }

    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, VuContextValue>::new(
        "capture_error_in_teardown",
        sample_cli_cfg(),
    )
    .with_default_duration(Duration::from_millis(300))
    .use_vu_behaviour(idle_behaviour)
    .use_teardown(teardown);

    let result = run(scenario);

    assert!(result.is_ok());
}

#[test]
fn reject_unknown_threshold_metric() {
    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, VuContextValue>::new(
        "reject_unknown_threshold_metric",
        sample_cli_cfg(),
    )
    .with_default_duration(Duration::from_millis(300))
    .with_threshold("http_reqfailed", "rate<0.01")
    .use_vu_behaviour(idle_behaviour);

    let err = run(scenario).unwrap_err();

    assert!(format!("{err:#}").contains("http_reqfailed"));
}

#[test]
fn reject_zero_vus() {
    let mut cfg = sample_cli_cfg();
    cfg.vus = Some(0);
    let scenario =
        ScenarioDefinitionBuilder::<RunnerContextValue, VuContextValue>::new("reject_zero_vus", cfg)
            .with_default_duration(Duration::from_millis(300))
            .use_vu_behaviour(idle_behaviour);

    assert!(run(scenario).is_err());
}
