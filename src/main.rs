//! HTTPS relay.
//!
//! A trusted intermediary for clients that cannot open outbound connections
//! themselves: they post an envelope describing a request, the relay performs
//! it and returns the raw response body.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                   RELAY                      │
//!     POST / (JSON)      │  ┌─────────┐   ┌─────────┐   ┌────────────┐  │
//!     ───────────────────┼─▶│   net   │──▶│  http   │──▶│   relay    │──┼──▶ Upstream
//!                        │  │ TLS +   │   │ POST /  │   │ translator │  │    target
//!     upstream bytes     │  │deadlines│   │  gate   │   │ (reqwest)  │  │
//!     ◀──────────────────┼──│         │◀──│         │◀──│            │◀─┼───
//!                        │  └─────────┘   └─────────┘   └────────────┘  │
//!                        │                                              │
//!                        │   config · observability · lifecycle         │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use http_relay::config::load_config;
use http_relay::lifecycle::{signals, Shutdown};
use http_relay::observability::{init_logging, metrics};
use http_relay::RelayServer;

#[derive(Parser)]
#[command(name = "http-relay")]
#[command(about = "Performs HTTP requests on behalf of callers over a single TLS endpoint", long_about = None)]
struct Cli {
    /// Configuration file (JSON, or TOML when the extension is .toml)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("http-relay: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli.config)
        .map_err(|e| format!("failed to load {}: {}", cli.config.display(), e))?;

    // Held until the server has stopped so shutdown messages reach the sink.
    let _log_guard = init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_ip = %config.listen_ip,
        port = config.port,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown.clone());

    RelayServer::configure(config).run(server_shutdown).await?;
    Ok(())
}
