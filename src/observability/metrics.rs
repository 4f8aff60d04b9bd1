//! Metrics collection and exposition.
//!
//! # Metrics
//! - `node_heartbeats_total` (counter): heartbeat POSTs by outcome
//! - `node_close_notifications_total` (counter): close POSTs by outcome
//! - `node_health_requests_total` (counter): `/health` calls by status
//! - `node_reloads_total` (counter): registry passes by outcome
//! - `node_registry_size` / `node_broker_live` (gauges)
//! - `node_probe_duration_seconds` (histogram): resource probes by component and result
//! - `node_resource_init_duration_seconds` (histogram): startup attempts by resource and outcome

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter. Must run inside the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

fn outcome(ok: bool) -> &'static str {
    if ok {
        "success"
    } else {
        "failure"
    }
}

pub fn record_resource_init(resource: &'static str, ok: bool, elapsed: Duration) {
    metrics::histogram!(
        "node_resource_init_duration_seconds",
        "resource" => resource,
        "outcome" => outcome(ok)
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_probe(component: &'static str, up: bool, elapsed: Duration) {
    metrics::histogram!(
        "node_probe_duration_seconds",
        "component" => component,
        "result" => if up { "up" } else { "down" }
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_heartbeat(ok: bool) {
    metrics::counter!("node_heartbeats_total", "outcome" => outcome(ok)).increment(1);
}

pub fn record_close_notification(ok: bool) {
    metrics::counter!("node_close_notifications_total", "outcome" => outcome(ok)).increment(1);
}

pub fn record_health_request(status: u16) {
    metrics::counter!("node_health_requests_total", "status" => status.to_string()).increment(1);
}

pub fn record_reload(ok: bool) {
    metrics::counter!("node_reloads_total", "outcome" => outcome(ok)).increment(1);
}

pub fn record_registry(size: usize, live: usize) {
    metrics::gauge!("node_registry_size").set(size as f64);
    metrics::gauge!("node_broker_live").set(live as f64);
}
