//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! State (state.rs):
//!     Created → Listening → ShuttingDown → Stopped
//!
//! Shutdown (shutdown.rs):
//!     Trigger → server stops accepting → drain in-flight → force close → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//! ```
//!
//! # Design Decisions
//! - The cancellation source is owned by whoever calls `run`
//! - A failing listener wakes the same shutdown path as a signal
//! - Shutdown has timeout: forced close after the grace period

pub mod shutdown;
pub mod signals;
pub mod state;

pub use shutdown::Shutdown;
pub use state::{ServerState, StateTracker};
