//! Metrics collection and exposition.
//!
//! # Metrics
//! - `memevote_queries_total` (counter): contract queries by message, outcome
//! - `memevote_transactions_total` (counter): terminal transactions by kind, outcome
//! - `memevote_connection_ready` (gauge): 1 = ready, 0 = connecting or failed
//! - `memevote_signer_requests_total` (counter): signing capability requests by outcome

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::chain::types::ConnectionState;

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| e.to_string())?;

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_query(message: &str, outcome: &'static str) {
    metrics::counter!(
        "memevote_queries_total",
        "message" => message.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_tx_outcome(kind: &'static str, outcome: &'static str) {
    metrics::counter!(
        "memevote_transactions_total",
        "kind" => kind,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_connection_state(state: &ConnectionState) {
    let ready = if state.is_ready() { 1.0 } else { 0.0 };
    metrics::gauge!("memevote_connection_ready").set(ready);
}

pub fn record_signer_request(outcome: &'static str) {
    metrics::counter!("memevote_signer_requests_total", "outcome" => outcome).increment(1);
}
