//! Metrics collection and exposition.
//!
//! # Metrics
//! - `cgd_requests_total` (counter): requests by transport and status
//! - `cgd_request_duration_seconds` (histogram): time until the response head
//! - `cgd_spawn_failures_total` (counter): programs that failed to start
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed request.
pub fn record_request(transport: &'static str, status: u16, start: Instant) {
    ::metrics::counter!(
        "cgd_requests_total",
        "transport" => transport,
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("cgd_request_duration_seconds", "transport" => transport)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_spawn_failure() {
    ::metrics::counter!("cgd_spawn_failures_total").increment(1);
}
