//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};

use crate::config::schema::RelayConfig;

/// A single semantic problem with a configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check a parsed configuration for values serde cannot reject on its own.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listen_ip.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::new(
            "listen_ip",
            format!("'{}' is not an IP address", config.listen_ip),
        ));
    }

    if config.tls.cert_path.trim().is_empty() {
        errors.push(ValidationError::new("tls.cert_path", "must not be empty"));
    }
    if config.tls.key_path.trim().is_empty() {
        errors.push(ValidationError::new("tls.key_path", "must not be empty"));
    }

    let timeouts = &config.timeouts;
    for (field, value) in [
        ("timeouts.read_secs", timeouts.read_secs),
        ("timeouts.write_secs", timeouts.write_secs),
        ("timeouts.idle_secs", timeouts.idle_secs),
        ("timeouts.upstream_secs", timeouts.upstream_secs),
        ("timeouts.shutdown_grace_secs", timeouts.shutdown_grace_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if config.max_body_bytes == 0 {
        errors.push(ValidationError::new("max_body_bytes", "must be greater than zero"));
    }

    let observability = &config.observability;
    if observability.log_file.trim().is_empty() {
        errors.push(ValidationError::new("observability.log_file", "must not be empty"));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
