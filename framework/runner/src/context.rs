use std::{fmt::Debug, sync::Arc};

use surge_core::prelude::{DelegatedShutdownListener, ShutdownHandle};
use surge_instruments::prelude::Reporter;

use crate::executor::Executor;

pub trait UserValuesConstraint: Default + Debug + Send + Sync + 'static {}

/// Shared, read-mostly state for the whole run.
///
/// The global setup hook gets mutable access. After that the context is wrapped in an [Arc] and
/// shared with every virtual user.
#[derive(Debug)]
pub struct RunnerContext<RV: UserValuesConstraint> {
    executor: Arc<Executor>,
    reporter: Arc<Reporter>,
    shutdown_handle: ShutdownHandle,
    connection_string: Option<String>,
    run_id: String,
    value: RV,
}

impl<RV: UserValuesConstraint> RunnerContext<RV> {
    pub(crate) fn new(
        executor: Arc<Executor>,
        reporter: Arc<Reporter>,
        shutdown_handle: ShutdownHandle,
        connection_string: Option<String>,
        run_id: String,
        value: RV,
    ) -> Self {
        Self {
            executor,
            reporter,
            shutdown_handle,
            connection_string,
            run_id,
            value,
        }
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    pub fn reporter(&self) -> Arc<Reporter> {
        self.reporter.clone()
    }

    pub fn get_connection_string(&self) -> Option<&str> {
        self.connection_string.as_deref()
    }

    pub fn get_run_id(&self) -> &str {
        &self.run_id
    }

    /// Stop the run early. Every VU finishes its current iteration, within the graceful stop, and
    /// tears down.
    pub fn force_stop_scenario(&self) {
        self.shutdown_handle.shutdown();
    }

    pub fn get_mut(&mut self) -> &mut RV {
        &mut self.value
    }

    pub fn get(&self) -> &RV {
        &self.value
    }
}

/// State owned by a single virtual user.
pub struct VuContext<RV: UserValuesConstraint, V: UserValuesConstraint> {
    vu_index: usize,
    vu_id: String,
    runner_context: Arc<RunnerContext<RV>>,
    shutdown_listener: DelegatedShutdownListener,
    value: V,
}

impl<RV: UserValuesConstraint, V: UserValuesConstraint> VuContext<RV, V> {
    pub(crate) fn new(
        vu_index: usize,
        runner_context: Arc<RunnerContext<RV>>,
        shutdown_listener: DelegatedShutdownListener,
    ) -> Self {
        Self {
            vu_index,
            vu_id: format!("vu-{vu_index}"),
            runner_context,
            shutdown_listener,
            value: Default::default(),
        }
    }

    /// A value that uniquely identifies this VU within the run, such as `vu-0`.
    pub fn vu_id(&self) -> &str {
        &self.vu_id
    }

    pub fn vu_index(&self) -> usize {
        self.vu_index
    }

    pub fn runner_context(&self) -> &Arc<RunnerContext<RV>> {
        &self.runner_context
    }

    pub fn shutdown_listener(&mut self) -> &mut DelegatedShutdownListener {
        &mut self.shutdown_listener
    }

    pub fn get_mut(&mut self) -> &mut V {
        &mut self.value
    }

    pub fn get(&self) -> &V {
        &self.value
    }
}
