//! Metrics instrumentation for the customer registry.
//!
//! Uses the `metrics` crate for backend-agnostic collection; the embedding
//! process chooses the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `customer_registry_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `store`: record, cache, index, publisher
//! - `operation`: create, get, get_all, update, delete, search
//! - `status`: success, error, hit, miss, degraded, swallowed

use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Record a store-level operation outcome.
pub fn record_operation(store: &str, operation: &str, status: &str) {
    counter!(
        "customer_registry_operations_total",
        "store" => store.to_string(),
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record end-to-end operation latency.
pub fn record_latency(operation: &str, duration: Duration) {
    histogram!(
        "customer_registry_operation_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record a cache lookup outcome on the read path.
pub fn record_cache_lookup(status: &str) {
    counter!(
        "customer_registry_cache_lookups_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a best-effort cache repopulation failure (read path).
pub fn record_repopulation_failure() {
    counter!("customer_registry_cache_repopulation_failures_total").increment(1);
}

/// Record a swallowed event publish failure.
pub fn record_publish_swallowed() {
    counter!("customer_registry_publish_failures_swallowed_total").increment(1);
}

/// Set the current in-process event log length.
pub fn set_event_log_len(len: usize) {
    gauge!("customer_registry_event_log_entries").set(len as f64);
}
