//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TLS connection (h2 or http/1.1)
//!     → server.rs (Axum setup, request ID, access log)
//!     → route gate: POST / only, anything else 404 before the body is read
//!     → relay handler (read body, Translator)
//!     → response.rs (200 + upstream bytes, or 400 + cause)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::{build_router, AppState, RelayServer, RelayServerError};
