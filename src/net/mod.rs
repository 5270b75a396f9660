//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → connection.rs (idle / stalled-write deadlines, connection id)
//!     → tls.rs (TLS 1.2+ handshake, ALPN h2 / http/1.1)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - TLS is mandatory; there is no plaintext listener
//! - Deadlines wrap the raw TCP stream so slow handshakes are bounded too

pub mod connection;
pub mod tls;

pub use connection::{ConnectionId, DeadlineAcceptor, DeadlineStream};
pub use tls::{load_tls_config, server_config_from_pem, TlsError};
