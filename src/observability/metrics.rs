//! Metrics collection and exposition.
//!
//! # Metrics
//! - `broker_polls_total` (counter): poll ticks by outcome
//! - `broker_broadcasts_total` (counter): completed broadcast passes
//! - `broker_deliveries_total` (counter): views pushed to subscribers
//! - `broker_evictions_total` (counter): subscribers removed on failed delivery
//! - `broker_subscribers` (gauge): currently attached subscribers

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_poll(changed: bool) {
    let outcome = if changed { "changed" } else { "unchanged" };
    metrics::counter!("broker_polls_total", "outcome" => outcome).increment(1);
}

pub fn record_poll_failure() {
    metrics::counter!("broker_polls_total", "outcome" => "failed").increment(1);
}

pub fn record_broadcast(delivered: usize, evicted: usize) {
    metrics::counter!("broker_broadcasts_total").increment(1);
    metrics::counter!("broker_deliveries_total").increment(delivered as u64);
    metrics::counter!("broker_evictions_total").increment(evicted as u64);
}

pub fn set_subscribers(count: usize) {
    metrics::gauge!("broker_subscribers").set(count as f64);
}
