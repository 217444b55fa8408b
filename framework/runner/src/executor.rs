use std::future::Future;

use surge_core::prelude::{ShutdownHandle, ShutdownSignalError};

/// Runs async work for hooks on the shared Tokio runtime.
///
/// Every VU is its own OS thread, so blocking a VU on [Executor::execute_in_place] only holds up
/// that VU. The futures themselves are driven by the shared runtime.
#[derive(Debug)]
pub struct Executor {
    runtime: tokio::runtime::Runtime,
    shutdown_handle: ShutdownHandle,
}

impl Executor {
    pub(crate) fn new(runtime: tokio::runtime::Runtime, shutdown_handle: ShutdownHandle) -> Self {
        Self {
            runtime,
            shutdown_handle,
        }
    }

    /// Run async code in place, blocking until it completes.
    ///
    /// When the run stops, the future is allowed to complete for up to the scenario's graceful
    /// stop. After that it is cancelled and a [ShutdownSignalError] is returned. You do not need to
    /// do anything special to handle this, but you should be aware that submitting a future which
    /// does not support cancelling may prevent the runner from shutting down.
    pub fn execute_in_place<T>(
        &self,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        let mut shutdown_listener = self.shutdown_handle.new_listener();
        if shutdown_listener.should_shutdown() {
            return Err(ShutdownSignalError::default().into());
        }

        self.runtime.block_on(async move {
            tokio::select! {
                biased;
                _ = shutdown_listener.wait_for_shutdown() => {
                    Err(ShutdownSignalError::default().into())
                },
                result = fut => result,
            }
        })
    }

    /// Submit async code to be run in the background.
    ///
    /// Note that the future will not be cancelled if the runner is shutdown. It is also not
    /// guaranteed that the runner will wait for the future to complete before shutting down.
    ///
    /// In VU behaviour hooks, you should use [Executor::execute_in_place] instead so that your
    /// future completes before the behaviour completes and is scheduled again.
    pub fn spawn(&self, fut: impl Future<Output = ()> + Send + 'static) {
        self.runtime.spawn(fut);
    }
}
