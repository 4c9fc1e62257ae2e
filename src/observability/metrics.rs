//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (attempts, retries, circuit state, search, shards)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_operation_attempts_total` (counter): attempts by operation, outcome
//! - `gateway_retries_total` (counter): scheduled retries by operation
//! - `gateway_retry_delay_seconds` (histogram): backoff delays
//! - `gateway_circuit_open` (gauge): 1=open, 0=closed
//! - `gateway_circuit_rejections_total` (counter): calls failed fast
//! - `gateway_searches_total` (counter): searches by mode, cache, outcome
//! - `gateway_search_duration_seconds` (histogram): search latency
//! - `gateway_search_fallbacks_total` (counter): advanced → basic degradations
//! - `gateway_cache_entries` (gauge): entries per cache
//! - `gateway_shard_queries_total` (counter): reads by partition scope
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so the library never requires one

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the outcome of one attempt of a wrapped operation.
pub fn record_attempt(operation: &str, outcome: &'static str) {
    counter!(
        "gateway_operation_attempts_total",
        "operation" => operation.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a scheduled retry and its delay.
pub fn record_retry(operation: &str, delay: Duration) {
    counter!("gateway_retries_total", "operation" => operation.to_string()).increment(1);
    histogram!("gateway_retry_delay_seconds").record(delay.as_secs_f64());
}

pub fn record_circuit_state(open: bool) {
    gauge!("gateway_circuit_open").set(if open { 1.0 } else { 0.0 });
}

pub fn record_circuit_rejection(operation: &str) {
    counter!("gateway_circuit_rejections_total", "operation" => operation.to_string())
        .increment(1);
}

/// Record a completed search call.
pub fn record_search(mode: &'static str, cache_hit: bool, failed: bool, latency: Duration) {
    counter!(
        "gateway_searches_total",
        "mode" => mode,
        "cache" => if cache_hit { "hit" } else { "miss" },
        "outcome" => if failed { "error" } else { "ok" }
    )
    .increment(1);
    histogram!("gateway_search_duration_seconds", "mode" => mode).record(latency.as_secs_f64());
}

pub fn record_search_fallback() {
    counter!("gateway_search_fallbacks_total").increment(1);
}

pub fn record_cache_size(cache: &'static str, size: usize) {
    gauge!("gateway_cache_entries", "cache" => cache).set(size as f64);
}

/// Record a read routed by the sharding layer. `scope` is `regional`,
/// `global` or `cross_region`.
pub fn record_shard_query(scope: &'static str, region: &'static str) {
    counter!("gateway_shard_queries_total", "scope" => scope, "region" => region).increment(1);
}
