//! Server lifecycle state.

use tokio::sync::watch;

/// Phase of the relay server. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServerState {
    Created,
    Listening,
    ShuttingDown,
    Stopped,
}

impl std::fmt::Display for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ServerState::Created => "created",
            ServerState::Listening => "listening",
            ServerState::ShuttingDown => "shutting_down",
            ServerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Publishes `ServerState` changes to any number of observers.
#[derive(Debug)]
pub struct StateTracker {
    tx: watch::Sender<ServerState>,
}

impl StateTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ServerState::Created);
        Self { tx }
    }

    /// Move to `next`. Returns false (and changes nothing) if `next` is not
    /// strictly after the current state.
    pub fn advance(&self, next: ServerState) -> bool {
        let advanced = self.tx.send_if_modified(|state| {
            if next > *state {
                *state = next;
                true
            } else {
                false
            }
        });
        if advanced {
            tracing::debug!(state = %next, "Server state changed");
        }
        advanced
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.tx.subscribe()
    }
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}
