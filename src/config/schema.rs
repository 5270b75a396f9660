//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.
//! Only `listen_ip` and `port` are required; every other section falls back
//! to the defaults below.

use serde::{Deserialize, Serialize};
use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::time::Duration;

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    /// IP address the TLS listener binds to (e.g., "0.0.0.0").
    pub listen_ip: String,

    /// TCP port the TLS listener binds to.
    pub port: u16,

    /// Certificate and key locations.
    #[serde(default)]
    pub tls: TlsConfig,

    /// Connection, upstream and shutdown deadlines.
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Largest inbound envelope accepted, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Log sink and metrics settings.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

impl RelayConfig {
    /// Build a configuration with defaults for everything but the bind address.
    pub fn new(listen_ip: impl Into<String>, port: u16) -> Self {
        Self {
            listen_ip: listen_ip.into(),
            port,
            tls: TlsConfig::default(),
            timeouts: TimeoutConfig::default(),
            max_body_bytes: default_max_body_bytes(),
            observability: ObservabilityConfig::default(),
        }
    }

    /// Socket address the listener binds to.
    pub fn listen_addr(&self) -> Result<SocketAddr, AddrParseError> {
        let ip: IpAddr = self.listen_ip.parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// TLS material for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Path to certificate chain (PEM).
    pub cert_path: String,

    /// Path to private key (PEM).
    pub key_path: String,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: "cert.pem".to_string(),
            key_path: "key.pem".to_string(),
        }
    }
}

/// Timeout configuration for the listener, the upstream client and shutdown.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// TLS handshake, request header and request body deadline in seconds.
    pub read_secs: u64,

    /// Maximum time a response write may stall, in seconds.
    pub write_secs: u64,

    /// Idle connection timeout in seconds.
    pub idle_secs: u64,

    /// End-to-end deadline for the outbound call in seconds.
    pub upstream_secs: u64,

    /// Time in-flight connections get to finish on shutdown, in seconds.
    pub shutdown_grace_secs: u64,
}

impl TimeoutConfig {
    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read_secs)
    }

    pub fn write(&self) -> Duration {
        Duration::from_secs(self.write_secs)
    }

    pub fn idle(&self) -> Duration {
        Duration::from_secs(self.idle_secs)
    }

    pub fn upstream(&self) -> Duration {
        Duration::from_secs(self.upstream_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_secs: 10,
            write_secs: 10,
            idle_secs: 120,
            upstream_secs: 60,
            shutdown_grace_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Append-only log file receiving lifecycle and access logs.
    pub log_file: String,

    /// Filter directives used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_file: "relay.log".to_string(),
            log_level: "http_relay=info,tower_http=info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
