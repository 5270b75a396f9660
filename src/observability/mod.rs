//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle events, access logs, relay failures
//!     → logging.rs (tracing → stderr + append-only log file)
//! Relay call outcomes
//!     → metrics.rs (counters, histograms → optional Prometheus endpoint)
//! ```
//!
//! # Design Decisions
//! - One log sink per process, opened before the server starts and closed
//!   after it stops
//! - Request ID (`x-request-id`) is attached to every access-log span

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogGuard, LoggingError};
