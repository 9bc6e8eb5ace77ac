//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bridge_exchanges_total` (counter): finished exchanges by outcome
//! - `bridge_exchange_duration_seconds` (histogram): arrival to resolution, by outcome
//! - `bridge_pending_exchanges` (gauge): slots currently waiting
//! - `bridge_responses_total` (counter): completion sink calls by result
//! - `bridge_server_running` (gauge): 1 while the listener is up
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - Outcome labels keep timeouts, drains and rejections apart

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished exchange.
pub fn record_exchange(outcome: &'static str, start: Instant) {
    counter!("bridge_exchanges_total", "outcome" => outcome).increment(1);
    histogram!("bridge_exchange_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_pending(count: usize) {
    gauge!("bridge_pending_exchanges").set(count as f64);
}

/// Record a completion sink call (`delivered` or `unknown`).
pub fn record_response(result: &'static str) {
    counter!("bridge_responses_total", "result" => result).increment(1);
}

pub fn record_running(running: bool) {
    gauge!("bridge_server_running").set(if running { 1.0 } else { 0.0 });
}
