//! The relay's cancellation source.

use tokio::sync::broadcast;

/// Stops a running [`RelayServer`](crate::RelayServer).
///
/// Created by whoever calls `RelayServer::run`, which receives one
/// subscription. The signal listener holds a clone and triggers it on
/// SIGINT/SIGTERM. Dropping every clone has the same effect as a trigger,
/// so a server never outlives its owner.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver handed to `RelayServer::run`.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Ask the server to stop accepting and drain. A no-op if nothing is subscribed.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
