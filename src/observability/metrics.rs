//! Connector metrics.
//!
//! # Metrics
//! - `rest_connector_transfers_total` (counter): transfers by service, outcome
//! - `rest_connector_transfer_duration_seconds` (histogram): transfer latency
//! - `rest_connector_queue_depth` (gauge): pending requests per connector
//! - `rest_connector_credentials_missing_total` (counter): failed lookups

use std::sync::atomic::{AtomicBool, Ordering};

static ENABLED: AtomicBool = AtomicBool::new(true);

/// Turn metric recording on or off process-wide.
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

fn enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Record a finished transfer.
pub fn record_transfer(service: &str, outcome: &'static str, elapsed_secs: f64) {
    if !enabled() {
        return;
    }
    metrics::counter!(
        "rest_connector_transfers_total",
        "service" => service.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!(
        "rest_connector_transfer_duration_seconds",
        "service" => service.to_string()
    )
    .record(elapsed_secs);
}

/// Record the queue depth of a connector.
pub fn record_queue_depth(connector: &str, depth: usize) {
    if !enabled() {
        return;
    }
    metrics::gauge!("rest_connector_queue_depth", "connector" => connector.to_string())
        .set(depth as f64);
}

/// Record a credential lookup miss.
pub fn record_credentials_missing(service: &str) {
    if !enabled() {
        return;
    }
    metrics::counter!(
        "rest_connector_credentials_missing_total",
        "service" => service.to_string()
    )
    .increment(1);
}
