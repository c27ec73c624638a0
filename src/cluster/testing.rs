//! Fault injection for store-level tests.
//!
//! This module is available when the `test-utilities` feature is enabled,
//! or during unit tests:
//!
//! ```toml
//! [dev-dependencies]
//! offsetlog = { path = ".", features = ["test-utilities"] }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashSet;

use super::error::{StoreError, StoreResult};
use super::keys::StoreKey;
use super::store::{CasOutcome, KeyValueStore};
use crate::error::ErrorCode;
use crate::types::Value;

/// Wraps a store and fails chosen operations.
///
/// - writes to registered keys fail with a definite `crash` error
/// - reads of registered keys time out
/// - the next N reads of any key time out
/// - the next N compare-and-swaps are rejected without reaching the store
/// - the next N compare-and-swaps are applied, then reported as timed out
pub struct FaultyStore<S: KeyValueStore + ?Sized> {
    inner: Arc<S>,
    failing_writes: DashSet<StoreKey>,
    failing_reads: DashSet<StoreKey>,
    reads_to_fail: AtomicUsize,
    conflicts_to_force: AtomicUsize,
    cas_timeouts_after_apply: AtomicUsize,
    injected: AtomicUsize,
}

impl<S: KeyValueStore> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self::from_arc(Arc::new(inner))
    }
}

impl<S: KeyValueStore + ?Sized> FaultyStore<S> {
    pub fn from_arc(inner: Arc<S>) -> Self {
        Self {
            inner,
            failing_writes: DashSet::new(),
            failing_reads: DashSet::new(),
            reads_to_fail: AtomicUsize::new(0),
            conflicts_to_force: AtomicUsize::new(0),
            cas_timeouts_after_apply: AtomicUsize::new(0),
            injected: AtomicUsize::new(0),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    /// Make every write to `key` fail.
    pub fn fail_writes_to(&self, key: StoreKey) {
        self.failing_writes.insert(key);
    }

    /// Make every read of `key` time out.
    pub fn fail_reads_of(&self, key: StoreKey) {
        self.failing_reads.insert(key);
    }

    /// Make the next `count` reads time out, whatever their key.
    pub fn fail_next_reads(&self, count: usize) {
        self.reads_to_fail.store(count, Ordering::SeqCst);
    }

    /// Reject the next `count` compare-and-swaps.
    pub fn force_cas_conflicts(&self, count: usize) {
        self.conflicts_to_force.store(count, Ordering::SeqCst);
    }

    /// Apply the next `count` compare-and-swaps, then report each as timed
    /// out, whatever the store answered.
    pub fn fail_next_cas_after_apply(&self, count: usize) {
        self.cas_timeouts_after_apply.store(count, Ordering::SeqCst);
    }

    pub fn forced_conflicts_remaining(&self) -> usize {
        self.conflicts_to_force.load(Ordering::SeqCst)
    }

    /// How many faults have been injected so far.
    pub fn injected_faults(&self) -> usize {
        self.injected.load(Ordering::SeqCst)
    }

    fn injected_timeout(&self, operation: &'static str, key: &StoreKey) -> StoreError {
        self.injected.fetch_add(1, Ordering::SeqCst);
        StoreError::Timeout {
            operation,
            key: key.to_string(),
            timeout_ms: 0,
        }
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for FaultyStore<S> {
    async fn read(&self, key: &StoreKey) -> StoreResult<Option<Value>> {
        if self.failing_reads.contains(key) || take_one(&self.reads_to_fail) {
            return Err(self.injected_timeout("read", key));
        }
        self.inner.read(key).await
    }

    async fn write(&self, key: &StoreKey, value: Value) -> StoreResult<()> {
        if self.failing_writes.contains(key) {
            self.injected.fetch_add(1, Ordering::SeqCst);
            return Err(StoreError::Remote {
                operation: "write",
                key: key.to_string(),
                code: ErrorCode::Crash.code(),
                text: "injected write failure".to_string(),
            });
        }
        self.inner.write(key, value).await
    }

    async fn compare_and_swap(
        &self,
        key: &StoreKey,
        expected: Value,
        new: Value,
        create_if_absent: bool,
    ) -> StoreResult<CasOutcome> {
        if take_one(&self.conflicts_to_force) {
            self.injected.fetch_add(1, Ordering::SeqCst);
            return Ok(CasOutcome::Rejected);
        }
        let outcome = self
            .inner
            .compare_and_swap(key, expected, new, create_if_absent)
            .await?;
        if take_one(&self.cas_timeouts_after_apply) {
            return Err(self.injected_timeout("cas", key));
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::memory_store::MemoryStore;
    use crate::types::Offset;

    #[tokio::test]
    async fn test_passthrough_without_faults() {
        let store = FaultyStore::new(MemoryStore::new());
        let key = StoreKey::commit("p");
        store.write(&key, 1).await.unwrap();
        assert_eq!(store.read(&key).await.unwrap(), Some(1));
        assert_eq!(store.injected_faults(), 0);
    }

    #[tokio::test]
    async fn test_counted_faults_run_out() {
        let store = FaultyStore::new(MemoryStore::new());
        let key = StoreKey::latest("p");
        store.fail_next_reads(1);
        store.force_cas_conflicts(1);

        assert!(store.read(&key).await.is_err());
        assert!(store.read(&key).await.is_ok());
        assert_eq!(
            store.compare_and_swap(&key, 0, 1, true).await.unwrap(),
            CasOutcome::Rejected
        );
        assert_eq!(
            store.compare_and_swap(&key, 0, 1, true).await.unwrap(),
            CasOutcome::Swapped
        );
        assert_eq!(store.injected_faults(), 2);
    }

    #[tokio::test]
    async fn test_cas_timeout_after_apply_still_swaps() {
        let store = FaultyStore::new(MemoryStore::new());
        let key = StoreKey::latest("p");
        store.fail_next_cas_after_apply(1);

        let err = store.compare_and_swap(&key, 0, 1, true).await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout { .. }));
        assert_eq!(store.inner().get(&key), Some(1));
        assert_eq!(
            store.compare_and_swap(&key, 1, 2, false).await.unwrap(),
            CasOutcome::Swapped
        );
        assert_eq!(store.injected_faults(), 1);
    }

    #[tokio::test]
    async fn test_keyed_faults_only_hit_their_key() {
        let store = FaultyStore::new(MemoryStore::new());
        let bad = StoreKey::record("p", Offset(2));
        let good = StoreKey::record("p", Offset(3));
        store.fail_writes_to(bad.clone());

        assert!(store.write(&bad, 1).await.is_err());
        assert!(store.write(&good, 1).await.is_ok());
        assert_eq!(store.inner().get(&bad), None);
    }
}
