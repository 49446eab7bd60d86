//! Prometheus metrics for monitoring tracker activity.
//!
//! Counters are exported on a separate scrape listener, enabled by setting
//! `METRICS_BIND`. Without it the counters are recorded but never exported,
//! which costs nothing.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter on `addr`.
///
/// Metrics become available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))
}

/// A table session was finalized.
pub fn session_ended(game: &str, persisted: bool) {
    metrics::counter!(
        "tracker_sessions_ended_total",
        "game" => game.to_string(),
        "persisted" => persisted.to_string()
    )
    .increment(1);
}

/// A charge was posted to a customer.
pub fn charge_posted(game: &str) {
    metrics::counter!("tracker_charges_posted_total", "game" => game.to_string()).increment(1);
}

/// A customer was registered.
pub fn customer_registered() {
    metrics::counter!("tracker_customers_registered_total").increment(1);
}
