//! Metrics collection and exposition.
//!
//! # Metrics
//! - `blog_requests_total` (counter): requests by method, route, status
//! - `blog_request_duration_seconds` (histogram): latency by method and route
//! - `blog_routes_unmatched_total` (counter): requests no route matched
//! - `blog_step_failures_total` (counter): failing steps by route and step
//! - `blog_pipeline_short_circuits_total` (counter): halts by route and step
//! - `blog_sessions_purged_total` (counter): expired sessions removed
//!
//! # Design Decisions
//! - Labels use the route template, never the concrete path, to bound
//!   cardinality
//! - Recording without an installed exporter is a no-op

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    metrics::counter!(
        "blog_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "blog_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_unmatched(method: &str) {
    metrics::counter!("blog_routes_unmatched_total", "method" => method.to_string()).increment(1);
}

pub fn record_step_failure(route: &str, step: &str) {
    metrics::counter!(
        "blog_step_failures_total",
        "route" => route.to_string(),
        "step" => step.to_string()
    )
    .increment(1);
}

pub fn record_short_circuit(route: &str, step: &str) {
    metrics::counter!(
        "blog_pipeline_short_circuits_total",
        "route" => route.to_string(),
        "step" => step.to_string()
    )
    .increment(1);
}

pub fn record_sessions_purged(count: usize) {
    metrics::counter!("blog_sessions_purged_total").increment(count as u64);
}
