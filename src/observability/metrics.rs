//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define tunnel metrics (connections, rejections, relayed bytes)
//! - Expose a Prometheus-compatible endpoint when enabled
//!
//! # Metrics
//! - `tunnel_connections_total` (counter): accepted and registered connections
//! - `tunnel_connections_active` (gauge): currently registered connections
//! - `tunnel_rejections_total` (counter): handshakes refused, by reason
//! - `tunnel_bytes_total` (counter): bytes forwarded, by direction
//!
//! # Design Decisions
//! - Facade calls are no-ops until a recorder is installed
//! - Labels are static strings only

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

pub const CONNECTIONS_TOTAL: &str = "tunnel_connections_total";
pub const CONNECTIONS_ACTIVE: &str = "tunnel_connections_active";
pub const REJECTIONS_TOTAL: &str = "tunnel_rejections_total";
pub const BYTES_TOTAL: &str = "tunnel_bytes_total";

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn connection_opened() {
    counter!(CONNECTIONS_TOTAL).increment(1);
    gauge!(CONNECTIONS_ACTIVE).increment(1.0);
}

pub fn connection_closed() {
    gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
}

pub fn record_rejection(reason: &'static str) {
    counter!(REJECTIONS_TOTAL, "reason" => reason).increment(1);
}

pub fn record_bytes(direction: &'static str, bytes: usize) {
    counter!(BYTES_TOTAL, "direction" => direction).increment(bytes as u64);
}
