//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): relay calls by outcome
//! - `relay_request_duration_seconds` (histogram): relay call latency by outcome
//!
//! Outcomes: `success`, `read_body`, `decode`, `invalid_target`, `upstream`.
//! Recording is a no-op until an exporter is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Outcome label for a relay call that returned upstream bytes.
pub const OUTCOME_SUCCESS: &str = "success";

/// Install the Prometheus exporter serving `/metrics` on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one finished relay call.
pub fn record_relay(outcome: &'static str, start_time: Instant) {
    metrics::counter!("relay_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("relay_request_duration_seconds", "outcome" => outcome)
        .record(start_time.elapsed().as_secs_f64());
}
