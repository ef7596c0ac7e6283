//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): relayed calls by method, status
//! - `relay_request_duration_seconds` (histogram): upstream latency
//! - `relay_upstream_errors_total` (counter): network failures by method
//! - `relay_batch_entries_total` (counter): batch entries by mode

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one completed relay call.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "relay_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("relay_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record an upstream network failure.
pub fn record_upstream_error(method: &str) {
    counter!("relay_upstream_errors_total", "method" => method.to_string()).increment(1);
}

/// Record the entries of one dispatched batch.
pub fn record_batch(mode: &str, entries: usize) {
    counter!("relay_batch_entries_total", "mode" => mode.to_string()).increment(entries as u64);
}
