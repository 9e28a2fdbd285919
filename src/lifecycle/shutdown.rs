//! Shutdown coordination.

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Long-running tasks (the config reload loop, the CLI's wait for pending
/// responses) subscribe to a broadcast channel and stop when it fires.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Get the number of tasks still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Wait for Ctrl+C, then trigger.
    pub async fn trigger_on_ctrl_c(&self) {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
        }
        self.trigger();
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
