//! Request translation subsystem.
//!
//! # Data Flow
//! ```text
//! POST / body (JSON envelope)
//!     → envelope.rs (decode, method inference)
//!     → translator.rs (header policy, build, execute, buffer)
//!     → bytes back to the HTTP layer
//!
//! Any stage failing:
//!     → error.rs (RelayError → 400 text/plain)
//! ```

pub mod envelope;
pub mod error;
pub mod translator;

pub use envelope::RelayEnvelope;
pub use error::RelayError;
pub use translator::{outbound_headers, Translator};
