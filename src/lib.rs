//! HTTPS relay library.
//!
//! Accepts a JSON envelope on `POST /` over TLS, performs the described HTTP
//! request on the caller's behalf, and answers with the upstream body.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod relay;

pub use config::RelayConfig;
pub use http::{RelayServer, RelayServerError};
pub use lifecycle::Shutdown;
pub use relay::{RelayEnvelope, RelayError, Translator};
