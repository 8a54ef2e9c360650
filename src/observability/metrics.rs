//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_connections_total` (counter): accepted connections
//! - `http_active_connections` (gauge): connections currently being served
//! - `http_requests_total` (counter): parsed requests by method
//! - `http_read_errors_total` (counter): failed request reads by kind
//! - `http_handler_failures_total` (counter): handler errors and panics
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The Prometheus exporter is opt-in via configuration

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection_accepted() {
    counter!("http_connections_total").increment(1);
}

pub fn record_active_connections(active: u64) {
    gauge!("http_active_connections").set(active as f64);
}

pub fn record_request(method: &'static str) {
    counter!("http_requests_total", "method" => method).increment(1);
}

pub fn record_read_error(kind: &'static str) {
    counter!("http_read_errors_total", "kind" => kind).increment(1);
}

pub fn record_handler_failure(kind: &'static str) {
    counter!("http_handler_failures_total", "kind" => kind).increment(1);
}
