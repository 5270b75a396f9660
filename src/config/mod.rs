//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON, or TOML by extension)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → moved into RelayServer at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload path
//! - Only the bind address is mandatory, everything else has defaults
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::RelayConfig;
pub use schema::{ObservabilityConfig, TimeoutConfig, TlsConfig};
