//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_submissions_total` (counter): submissions by outcome
//! - `relay_duration_seconds` (histogram): time from receipt to outcome
//! - `relay_spooled_bytes_total` (counter): upload bytes written to spool files
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - Prometheus exporter serves its own HTTP listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Count a finished submission and how long it took.
pub fn record_relay(outcome: &'static str, start: Instant) {
    ::metrics::counter!("relay_submissions_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("relay_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_spooled_bytes(bytes: u64) {
    ::metrics::counter!("relay_spooled_bytes_total").increment(bytes);
}
