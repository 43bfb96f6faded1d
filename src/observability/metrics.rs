//! Metrics collection and exposition for the pool's Observable Accessors.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Initialize metrics exporter and server.
pub fn init_metrics(addr: SocketAddr) {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus recorder");

    tracing::info!("Metrics server listening on http://{}", addr);
}

/// Record the current state of one pool, tagged by `role` (`"client"` or
/// `"server"`) and `name` (the pool's configured label).
pub fn record_pool_state(
    role: &'static str,
    name: &str,
    active: usize,
    capacity: usize,
    interval_ms: u64,
    error_count: u64,
) {
    let labels = [("role", role.to_string()), ("name", name.to_string())];
    gauge!("pool_active", &labels).set(active as f64);
    gauge!("pool_capacity", &labels).set(capacity as f64);
    gauge!("pool_interval_ms", &labels).set(interval_ms as f64);
    counter!("pool_errors_total", &labels).absolute(error_count);
}
