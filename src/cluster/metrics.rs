//! Prometheus metrics for an offsetlog node.
//!
//! Metrics cover:
//! - Request processing (count and latency per request kind)
//! - Coordination store operations (count per operation and outcome)
//! - Offset allocation (offsets handed out, compare-and-swap conflicts)
//! - Poll gaps (records that could not be read and were skipped)
//! - Retries of store operations
//!
//! # Safety
//!
//! All metrics are registered to a custom registry with the "offsetlog" prefix to avoid
//! name collisions with other libraries using the default Prometheus registry.
//! Registration errors are handled gracefully - if a metric fails to register
//! with the registry, it is kept as an unregistered metric and a warning is
//! logged. Building a metric from its static name and help text is expected
//! to succeed and panics otherwise.

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Registry, TextEncoder, opts,
};
use tracing::warn;

/// Custom Prometheus registry for offsetlog metrics.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    Registry::new_custom(Some("offsetlog".to_string()), None).unwrap_or_else(|_| Registry::new())
});

// =============================================================================
// Metric Declaration Macros
// =============================================================================
//
//   define_counter!(MY_COUNTER, "my_metric", "Description");
//   define_counter_vec!(MY_COUNTER, "my_metric", "Description", ["label1"]);
//   define_histogram_vec!(MY_HISTOGRAM, "my_metric", "Description", ["label"],
//       [0.001, 0.01, 0.1, 1.0]);

/// Declare an IntCounterVec metric with labels.
macro_rules! define_counter_vec {
    ($name:ident, $metric_name:expr, $help:expr, [$($label:expr),+ $(,)?]) => {
        #[doc = $help]
        pub static $name: Lazy<IntCounterVec> = Lazy::new(|| {
            register_int_counter_vec_safe(&REGISTRY, $metric_name, $help, &[$($label),+])
        });
    };
}

/// Declare an IntCounter metric (no labels).
macro_rules! define_counter {
    ($name:ident, $metric_name:expr, $help:expr) => {
        #[doc = $help]
        pub static $name: Lazy<IntCounter> =
            Lazy::new(|| register_int_counter_safe(&REGISTRY, $metric_name, $help));
    };
}

/// Declare a HistogramVec metric with labels and buckets.
macro_rules! define_histogram_vec {
    ($name:ident, $metric_name:expr, $help:expr, [$($label:expr),+ $(,)?], [$($bucket:expr),+ $(,)?]) => {
        #[doc = $help]
        pub static $name: Lazy<HistogramVec> = Lazy::new(|| {
            register_histogram_vec_safe(&REGISTRY, $metric_name, $help, &[$($label),+], vec![$($bucket),+])
        });
    };
}

// =============================================================================
// Request metrics
// =============================================================================

define_counter_vec!(
    REQUEST_COUNT,
    "requests_total",
    "Total number of client requests handled",
    ["kind", "status"]
);
define_histogram_vec!(
    REQUEST_DURATION,
    "request_duration_seconds",
    "Request processing duration in seconds",
    ["kind"],
    [
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0
    ]
);
define_counter_vec!(
    DECODE_FAILURES,
    "decode_failures_total",
    "Input lines that could not be decoded",
    ["code"]
);

// =============================================================================
// Store metrics
// =============================================================================

define_counter_vec!(
    STORE_OPERATIONS,
    "store_operations_total",
    "Coordination store operations by operation and outcome",
    ["operation", "outcome"]
);

// =============================================================================
// Log metrics
// =============================================================================

define_counter!(
    OFFSETS_ALLOCATED,
    "offsets_allocated_total",
    "Total number of offsets allocated by this node"
);
define_counter!(
    CAS_CONFLICTS,
    "cas_conflicts_total",
    "Compare-and-swap attempts on a latest marker that lost a race"
);
define_counter!(
    RECORDS_APPENDED,
    "records_appended_total",
    "Total number of records written by this node"
);
define_counter!(
    RECORDS_POLLED,
    "records_polled_total",
    "Total number of records returned to poll requests"
);
define_counter_vec!(
    POLL_GAPS_SKIPPED,
    "poll_gaps_skipped_total",
    "Records skipped by poll because they could not be read",
    ["reason"]
);
define_counter!(
    COMMITS_WRITTEN,
    "commits_written_total",
    "Total number of commit markers written"
);

// =============================================================================
// Retry metrics
// =============================================================================

define_counter_vec!(
    RETRY_ATTEMPTS,
    "retry_attempts_total",
    "Retry attempts by operation",
    ["operation"]
);

// =============================================================================
// Safe registration
// =============================================================================

/// Register an IntCounterVec safely, returning a fallback on error.
fn register_int_counter_vec_safe(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> IntCounterVec {
    let counter =
        IntCounterVec::new(opts!(name, help), labels).expect("metric opts should be valid");
    match registry.register(Box::new(counter.clone())) {
        Ok(()) => counter,
        Err(e) => {
            warn!(name, error = %e, "Failed to register IntCounterVec metric, using unregistered fallback");
            counter
        }
    }
}

/// Register an IntCounter safely, returning a fallback on error.
fn register_int_counter_safe(registry: &Registry, name: &str, help: &str) -> IntCounter {
    let counter = IntCounter::new(name, help).expect("metric name/help should be valid");
    match registry.register(Box::new(counter.clone())) {
        Ok(()) => counter,
        Err(e) => {
            warn!(name, error = %e, "Failed to register IntCounter metric, using unregistered fallback");
            counter
        }
    }
}

/// Register a HistogramVec safely, returning a fallback on error.
fn register_histogram_vec_safe(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
    buckets: Vec<f64>,
) -> HistogramVec {
    let histogram = HistogramVec::new(HistogramOpts::new(name, help).buckets(buckets), labels)
        .expect("metric opts should be valid");
    match registry.register(Box::new(histogram.clone())) {
        Ok(()) => histogram,
        Err(e) => {
            warn!(name, error = %e, "Failed to register HistogramVec metric, using unregistered fallback");
            histogram
        }
    }
}

/// Force registration of every metric so a dump lists them even at zero.
///
/// Idempotent.
pub fn init_metrics() {
    let _ = &*REQUEST_COUNT;
    let _ = &*REQUEST_DURATION;
    let _ = &*DECODE_FAILURES;
    let _ = &*STORE_OPERATIONS;
    let _ = &*OFFSETS_ALLOCATED;
    let _ = &*CAS_CONFLICTS;
    let _ = &*RECORDS_APPENDED;
    let _ = &*RECORDS_POLLED;
    let _ = &*POLL_GAPS_SKIPPED;
    let _ = &*COMMITS_WRITTEN;
    let _ = &*RETRY_ATTEMPTS;
}

/// Encode all metrics in the Prometheus text format.
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

// =============================================================================
// Recording helpers
// =============================================================================

/// Record a handled client request.
pub fn record_request(kind: &str, status: &str, duration_secs: f64) {
    REQUEST_COUNT.with_label_values(&[kind, status]).inc();
    REQUEST_DURATION
        .with_label_values(&[kind])
        .observe(duration_secs);
}

/// Record an input line that failed to decode.
pub fn record_decode_failure(code: crate::error::ErrorCode) {
    DECODE_FAILURES.with_label_values(&[code.name()]).inc();
}

/// Record a store operation outcome (`ok`, `missing`, `rejected`, `timeout`, `error`).
pub fn record_store_operation(operation: &str, outcome: &str) {
    STORE_OPERATIONS
        .with_label_values(&[operation, outcome])
        .inc();
}

/// Record a record skipped by poll.
pub fn record_gap_skipped(reason: &str) {
    POLL_GAPS_SKIPPED.with_label_values(&[reason]).inc();
}
