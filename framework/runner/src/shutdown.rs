use tokio::signal;
use surge_core::prelude::ShutdownHandle;

/// Create the run's stop [ShutdownHandle] and trigger it when the process receives Ctrl-C.
///
/// A second Ctrl-C triggers `abort_handle`, cancelling iterations that are still finishing.
pub(crate) fn start_shutdown_listener(
    runtime: &tokio::runtime::Runtime,
    abort_handle: ShutdownHandle,
) -> ShutdownHandle {
    let handle = ShutdownHandle::default();

    let listener_handle = handle.clone();
    runtime.spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C, the run can only end on its own: {e:?}");
            return;
        }
        log::warn!("Received shutdown signal, finishing iterations in flight. Press Ctrl-C again to cancel them.");
        listener_handle.shutdown();

        if signal::ctrl_c().await.is_ok() {
            log::warn!("Received second shutdown signal, cancelling iterations in flight");
            abort_handle.shutdown();
        }
    });

    handle
}

/// Trigger `abort_handle` once `graceful_stop` has passed after the run was asked to stop.
pub(crate) fn start_graceful_stop_timer(
    runtime: &tokio::runtime::Runtime,
    stop_handle: &ShutdownHandle,
    abort_handle: ShutdownHandle,
    graceful_stop: std::time::Duration,
) {
    let mut stop_listener = stop_handle.new_listener();
    runtime.spawn(async move {
        stop_listener.wait_for_shutdown().await;
        tokio::time::sleep(graceful_stop).await;

        if !abort_handle.is_shutdown() {
            log::warn!(
                "Iterations still running {:?} after the run stopped, cancelling them",
                graceful_stop
            );
            abort_handle.shutdown();
        }
    });
}
