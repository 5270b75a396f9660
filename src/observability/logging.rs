//! Structured logging.
//!
//! # Responsibilities
//! - Open the append-only log sink once at startup
//! - Install the tracing subscriber (stderr + log file)
//! - Keep the sink alive until the returned guard is dropped
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - The file layer writes through a non-blocking worker, which serializes
//!   writes from every request task at a single point
//! - Log level comes from `RUST_LOG`, falling back to the configured directives

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Errors raised while installing the log sink.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to open log file {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInstalled(#[from] tracing_subscriber::util::TryInitError),
}

/// Keeps the log sink open. Dropping it flushes pending lines and closes the file.
#[must_use = "dropping the guard closes the log sink"]
pub struct LogGuard {
    _worker: WorkerGuard,
}

/// Build the level filter: `RUST_LOG` if set, the configured directives otherwise.
pub fn env_filter(config: &ObservabilityConfig) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(&config.log_level)?),
    }
}

/// Install the global subscriber writing to stderr and to `config.log_file`.
pub fn init_logging(config: &ObservabilityConfig) -> Result<LogGuard, LoggingError> {
    let path = Path::new(&config.log_file);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    let (writer, worker) = tracing_appender::non_blocking(file);

    tracing_subscriber::registry()
        .with(env_filter(config)?)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .try_init()?;

    Ok(LogGuard { _worker: worker })
}
