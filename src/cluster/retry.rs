//! Named retry policies built on the `backon` crate.
//!
//! # Available Policies
//!
//! | Policy | Min Delay | Max Delay | Retries | Use Case |
//! |--------|-----------|-----------|---------|----------|
//! | `allocation_policy` | configured | configured | unbounded | latest-marker compare-and-swap |
//! | `store_read_policy` | 5ms | 100ms | 2 | idempotent store reads |
//!
//! The allocation policy never gives up on its own. The caller's request
//! deadline is what ends an allocation that keeps losing races.
//!
//! # Example
//!
//! ```rust,no_run
//! use offsetlog::cluster::retry;
//! use backon::Retryable;
//! use std::time::Duration;
//!
//! async fn example() -> Result<(), std::io::Error> {
//!     (|| async { Ok::<_, std::io::Error>(()) })
//!         .retry(retry::allocation_policy(
//!             Duration::from_millis(1),
//!             Duration::from_millis(50),
//!         ))
//!         .when(|e| e.kind() == std::io::ErrorKind::TimedOut)
//!         .await
//! }
//! ```

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

/// Policy for the offset allocator's read/compare-and-swap loop.
///
/// - Backoff grows from `min_delay` to `max_delay`
/// - No attempt limit
/// - Includes jitter so racing nodes spread out
pub fn allocation_policy(min_delay: Duration, max_delay: Duration) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(min_delay)
        .with_max_delay(max_delay)
        .with_max_times(usize::MAX)
        .with_jitter()
}

/// Policy for idempotent store reads on the poll and list paths.
///
/// Short and bounded: a read that keeps failing is reported as a gap or
/// surfaced to the caller rather than stalling the whole poll.
pub fn store_read_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(5))
        .with_max_delay(Duration::from_millis(100))
        .with_max_times(2)
        .with_jitter()
}

/// Execute an idempotent store read with [`store_read_policy`].
pub async fn with_store_read_policy<F, Fut, T, E, C>(operation: F, condition: C) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::error::Error,
    C: FnMut(&E) -> bool,
{
    operation
        .retry(store_read_policy())
        .when(condition)
        .notify(|err: &E, dur: Duration| {
            record_retry_attempt("store_read");
            tracing::debug!(error = %err, delay_ms = dur.as_millis() as u64, "Retrying store read");
        })
        .await
}

/// Record a retry attempt for metrics.
pub fn record_retry_attempt(operation: &str) {
    super::metrics::RETRY_ATTEMPTS
        .with_label_values(&[operation])
        .inc();
}
