use std::sync::Arc;

use anyhow::Context;
use surge_core::prelude::{ShutdownHandle, ShutdownSignalError, VuBailError};
use surge_instruments::prelude::{ReportConfig, RunReport, HTTP_REQ_OPERATION};
use surge_summary_model::{store_run_summary, CheckSummary, RunSummary, ThresholdSummary};

use crate::cli::ReporterOpt;
use crate::monitor::start_monitor;
use crate::progress::start_progress;
use crate::shutdown::{start_graceful_stop_timer, start_shutdown_listener};
use crate::{
    context::{RunnerContext, UserValuesConstraint, VuContext},
    definition::ScenarioDefinitionBuilder,
    executor::Executor,
};

/// What a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub summary: RunSummary,
}

impl RunOutcome {
    /// The number of VUs that were still running when the run ended.
    pub fn vus_end_count(&self) -> usize {
        self.summary.vus_end_count
    }

    /// The run level failure signal. Returns an error naming every breached threshold.
    pub fn ensure_thresholds_passed(&self) -> Result<(), ThresholdsBreachedError> {
        if self.report.thresholds_passed() {
            return Ok(());
        }

        let breached = self
            .report
            .breached_thresholds()
            .map(|result| result.to_string())
            .collect::<Vec<_>>();

        Err(ThresholdsBreachedError {
            msg: format!("Thresholds breached: {}", breached.join(", ")),
        })
    }
}

#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct ThresholdsBreachedError {
    msg: String,
}

pub fn run<RV: UserValuesConstraint, V: UserValuesConstraint>(
    definition: ScenarioDefinitionBuilder<RV, V>,
) -> anyhow::Result<RunOutcome> {
    let definition = definition.build()?;

    log::info!(
        "Running scenario: {} with {} VUs",
        definition.name,
        definition.vus
    );

    let started_at = chrono::Utc::now().timestamp();
    let run_id = definition
        .run_id
        .clone()
        .unwrap_or_else(|| nanoid::nanoid!());

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    // Stopping ends the run once each VU finishes its current iteration. Aborting cancels
    // iterations that are still running, which happens `graceful_stop` after stopping.
    let abort_handle = ShutdownHandle::default();
    let shutdown_handle = start_shutdown_listener(&runtime, abort_handle.clone());
    start_graceful_stop_timer(
        &runtime,
        &shutdown_handle,
        abort_handle.clone(),
        definition.graceful_stop,
    );
    let executor = Arc::new(Executor::new(runtime, abort_handle.clone()));

    let mut report_config = ReportConfig::default();
    if definition.reporter == ReporterOpt::InMemory {
        report_config = report_config.enable_summary();
    }
    let reporter = Arc::new(report_config.init());

    let assigned_behaviours = definition.assigned_behaviours_flat();
    let mut summary = RunSummary::new(
        run_id.clone(),
        definition.name.clone(),
        started_at,
        definition.duration.map(|d| d.as_millis() as u64),
        definition.vus,
        definition.assigned_behaviours_summary(),
        env!("CARGO_PKG_VERSION").to_string(),
    );
    for key in &definition.capture_env {
        if let Ok(value) = std::env::var(key) {
            summary.add_env(key.clone(), value);
        }
    }

    let mut runner_context = RunnerContext::new(
        executor,
        reporter.clone(),
        shutdown_handle.clone(),
        definition.connection_string.clone(),
        run_id,
        definition.runner_value,
    );

    if let Some(setup_fn) = definition.setup_fn {
        setup_fn(&mut runner_context)?;
    }

    // After the setup has run, and if this is a time bounded scenario, then we need to take additional actions
    if let Some(duration) = definition.duration {
        if !definition.no_progress {
            // If the scenario is time bounded then start the progress monitor to show the user how long is left
            start_progress(duration, shutdown_handle.new_listener())?;
        }

        // Set a timer to shut down the test after the duration has elapsed
        let shutdown_handle = shutdown_handle.clone();
        runner_context.executor().spawn(async move {
            tokio::time::sleep(duration).await;
            log::info!("Run duration elapsed, stopping VUs");
            shutdown_handle.shutdown();
        });
    }

    let runner_context = Arc::new(runner_context);

    // Ready to start spawning VUs so start the resource monitor to report high usage by the load
    // generator, which might lead to a misleading outcome.
    start_monitor(shutdown_handle.new_listener())?;

    let mut handles = Vec::with_capacity(assigned_behaviours.len());
    for (vu_index, assigned_behaviour) in assigned_behaviours.iter().enumerate() {
        // Read access to the runner context for each VU
        let runner_context = runner_context.clone();
        let reporter = reporter.clone();

        let setup_vu_fn = definition.setup_vu_fn;
        let vu_behaviour_fn = definition.vu_behaviour.get(assigned_behaviour).cloned();
        let teardown_vu_fn = definition.teardown_vu_fn;

        // For us to check if the VU should shut down between iterations
        let cycle_shutdown_listener = shutdown_handle.new_listener();
        // For the behaviour implementation to listen for shutdown and respond appropriately
        let delegated_shutdown_listener = shutdown_handle.new_listener();

        let spawned = std::thread::Builder::new()
            .name(format!("vu-{vu_index}"))
            .spawn(move || {
                let mut context: VuContext<RV, V> =
                    VuContext::new(vu_index, runner_context, delegated_shutdown_listener);
                let vu_id = context.vu_id().to_string();

                if let Some(setup_vu_fn) = setup_vu_fn {
                    if let Err(e) = setup_vu_fn(&mut context) {
                        log::error!("VU setup failed for {}: {:?}", vu_id, e);
                        return false;
                    }
                }

                let mut still_running = true;
                if let Some(behaviour) = vu_behaviour_fn {
                    loop {
                        if cycle_shutdown_listener.should_shutdown() {
                            log::debug!("Stopping {}", vu_id);
                            break;
                        }

                        match behaviour(&mut context) {
                            Ok(()) => reporter.add_iteration(),
                            Err(e) if e.is::<ShutdownSignalError>() => {
                                // The iteration outlived the graceful stop and was cancelled. The
                                // check at the top of the loop will catch this and break out.
                                log::debug!("Iteration for {} cancelled", vu_id);
                            }
                            Err(e) if e.is::<VuBailError>() => {
                                log::warn!("{} is bailing: {:?}", vu_id, e);
                                still_running = false;
                                break;
                            }
                            Err(e) => {
                                log::error!("VU behaviour failed for {}: {:?}", vu_id, e);
                            }
                        }
                    }
                }

                if let Some(teardown_vu_fn) = teardown_vu_fn {
                    if let Err(e) = teardown_vu_fn(&mut context) {
                        log::error!("VU teardown failed for {}: {:?}", vu_id, e);
                    }
                }

                still_running
            });

        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                // Stop the VUs that did start before giving up on the run.
                shutdown_handle.shutdown();
                for handle in handles {
                    let _ = handle.join();
                }
                return Err(e).context("Failed to spawn thread for a virtual user");
            }
        }
    }

    let mut vus_end_count = 0;
    for handle in handles {
        let still_running = handle
            .join()
            .map_err(|e| anyhow::anyhow!("Error joining thread for a virtual user: {:?}", e))?;
        if still_running {
            vus_end_count += 1;
        }
    }

    // Every VU has stopped, possibly early. Release the progress bar, monitor and timers.
    shutdown_handle.shutdown();
    abort_handle.shutdown();

    if let Some(teardown_fn) = definition.teardown_fn {
        // Don't crash the runner if the teardown fails. We still want the reporting and runner
        // shutdown to happen cleanly. The hook is documented as 'best effort'
        if let Err(e) = teardown_fn(runner_context.clone()) {
            log::error!("Teardown failed: {:?}", e);
        }
    }

    let report = reporter.finalize(&definition.thresholds);
    for result in report.breached_thresholds() {
        log::error!("Threshold breached: {}", result);
    }

    summary.set_vus_end_count(vus_end_count);
    summary.iterations = report.stats.iterations;
    summary.http_req_failed_rate = report
        .stats
        .operation(HTTP_REQ_OPERATION)
        .and_then(|op| op.failure_rate());
    summary.checks = report
        .stats
        .checks
        .iter()
        .map(|(name, check)| {
            (
                name.clone(),
                CheckSummary {
                    passes: check.passes,
                    fails: check.fails,
                },
            )
        })
        .collect();
    summary.thresholds = report
        .thresholds
        .iter()
        .map(|result| ThresholdSummary {
            metric: result.metric.to_string(),
            expression: result.expression.clone(),
            actual: result.actual,
            passed: result.passed,
        })
        .collect();

    if definition.json_summary {
        store_run_summary(&summary, &mut std::io::stdout().lock())
            .context("Failed to write run summary")?;
    }

    Ok(RunOutcome { report, summary })
}
