//! Shutdown coordination.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::adapter::LogAdapter;

/// Coordinator for graceful shutdown.
///
/// Background tasks subscribe to the broadcast channel; logging is closed
/// after they have been told to stop, so their last messages still land.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    adapter: Arc<dyn LogAdapter>,
}

impl Shutdown {
    pub fn new(adapter: Arc<dyn LogAdapter>) -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx, adapter }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Tell subscribers to stop, then close logging.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
        tracing::info!(tasks = self.tx.receiver_count(), "Shutting down");
        self.adapter.close();
    }
}
