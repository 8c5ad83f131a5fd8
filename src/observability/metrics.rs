//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define registry metrics (repositories, publish races, reloads, watchers)
//! - Expose a Prometheus-compatible endpoint for the host
//!
//! # Metrics
//! - `tenant_logging_repositories_total` (counter): published repositories by scope
//! - `tenant_logging_publish_races_total` (counter): candidates discarded after losing publish
//! - `tenant_logging_reloads_total` (counter): watcher reapplies by outcome
//! - `tenant_logging_watchers_active` (gauge): running config watchers
//!
//! # Design Decisions
//! - Without an installed recorder every call is a no-op
//! - Labels stay low-cardinality: no tenant IDs

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// A repository was published; `scope` is `host` or `tenant`.
pub fn record_repository_published(scope: &'static str) {
    counter!("tenant_logging_repositories_total", "scope" => scope).increment(1);
}

pub fn record_publish_race_lost() {
    counter!("tenant_logging_publish_races_total").increment(1);
}

/// Watcher reapply outcome: `ok` or `error`.
pub fn record_reload(outcome: &'static str) {
    counter!("tenant_logging_reloads_total", "outcome" => outcome).increment(1);
}

pub fn record_watcher_started() {
    gauge!("tenant_logging_watchers_active").increment(1.0);
}

pub fn record_watcher_stopped() {
    gauge!("tenant_logging_watchers_active").decrement(1.0);
}
