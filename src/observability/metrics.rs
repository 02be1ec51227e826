//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_client_requests_total` (counter): dispatches by scheme, status
//! - `relay_client_request_duration_seconds` (histogram): dispatch latency by scheme
//! - `relay_pipeline_runs_total` (counter): pipelines started
//! - `relay_pipeline_faults_total` (counter): steps that failed synchronously

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter with its own HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_client_request(scheme: &str, status: u16, started: Instant) {
    ::metrics::counter!(
        "relay_client_requests_total",
        "scheme" => scheme.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!(
        "relay_client_request_duration_seconds",
        "scheme" => scheme.to_string()
    )
    .record(started.elapsed().as_secs_f64());
}

pub fn record_pipeline_run() {
    ::metrics::counter!("relay_pipeline_runs_total").increment(1);
}

pub fn record_pipeline_fault() {
    ::metrics::counter!("relay_pipeline_faults_total").increment(1);
}
