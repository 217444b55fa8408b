use std::sync::Arc;

use tokio::sync::watch;

/// Sends the shutdown signal for a run.
///
/// The signal is sticky. Once [ShutdownHandle::shutdown] has been called, every listener sees it,
/// including listeners created afterwards.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            sender: Arc::new(watch::channel(false).0),
        }
    }

    pub fn shutdown(&self) {
        let was_shutdown = self.sender.send_replace(true);
        if !was_shutdown {
            log::debug!("Shutdown signal sent");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.sender.borrow()
    }

    pub fn new_listener(&self) -> DelegatedShutdownListener {
        DelegatedShutdownListener::new(self.sender.subscribe())
    }
}

#[derive(Clone, Debug)]
pub struct DelegatedShutdownListener {
    receiver: watch::Receiver<bool>,
}

impl DelegatedShutdownListener {
    pub(crate) fn new(receiver: watch::Receiver<bool>) -> Self {
        Self { receiver }
    }

    /// Point in time check if the shutdown signal has been sent. If this returns true then work
    /// should be stopped so that the run can shut down.
    pub fn should_shutdown(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Wait for the shutdown signal. It is safe to race this with another future so that the
    /// shutdown signal can be used to cancel other work in progress.
    ///
    /// Returns immediately if the signal was sent before this was called. A dropped
    /// [ShutdownHandle] also counts as a shutdown.
    pub async fn wait_for_shutdown(&mut self) {
        if self.receiver.wait_for(|shutdown| *shutdown).await.is_err() {
            log::trace!("Shutdown handle dropped, treating as shutdown");
        }
    }
}

#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct ShutdownSignalError {
    msg: String,
}

impl Default for ShutdownSignalError {
    fn default() -> Self {
        Self {
            msg: "Execution cancelled by shutdown signal".to_string(),
        }
    }
}
