//! Metrics collection and exposition.
//!
//! # Metrics
//! - `catalog_requests_total` (counter): requests by method, status
//! - `catalog_request_duration_seconds` (histogram): latency distribution
//! - `catalog_breaker_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `catalog_breaker_rejections_total` (counter): short-circuited calls
//! - `catalog_cache_lookups_total` (counter): hit, miss, error
//! - `catalog_rate_limited_total` (counter)
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests and
//!   deployments without the exporter pay nothing

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::{CircuitState, StateListener};

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!("catalog_requests_total", "method" => method.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!("catalog_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_breaker_state(operation: &str, state: CircuitState) {
    gauge!("catalog_breaker_state", "operation" => operation.to_string()).set(state.as_gauge());
}

pub fn record_breaker_rejection(operation: &str) {
    counter!("catalog_breaker_rejections_total", "operation" => operation.to_string()).increment(1);
}

pub fn record_cache_lookup(result: &'static str) {
    counter!("catalog_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_rate_limited() {
    counter!("catalog_rate_limited_total").increment(1);
}

/// Registry listener that mirrors every transition into the state gauge.
pub fn breaker_state_listener() -> StateListener {
    Arc::new(|operation, _from, to| record_breaker_state(operation, to))
}
