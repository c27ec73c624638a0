//! The coordination store abstraction.
//!
//! A linearizable, single-key store offering read, write and
//! compare-and-swap. It is the only state shared between nodes; every
//! other component is stateless on top of it.

use async_trait::async_trait;

use super::error::StoreResult;
use super::keys::StoreKey;
use crate::types::Value;

/// Result of a compare-and-swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The key held the expected value (or was created) and now holds the new one.
    Swapped,
    /// The key held another value, or was absent and creation was not allowed.
    Rejected,
}

/// Linearizable single-key store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a key. An absent key is `Ok(None)`.
    async fn read(&self, key: &StoreKey) -> StoreResult<Option<Value>>;

    /// Unconditionally set a key.
    async fn write(&self, key: &StoreKey, value: Value) -> StoreResult<()>;

    /// Set `key` to `new` if it currently holds `expected`.
    ///
    /// With `create_if_absent` and the key absent, the key is created with
    /// `new` whatever `expected` is.
    async fn compare_and_swap(
        &self,
        key: &StoreKey,
        expected: Value,
        new: Value,
        create_if_absent: bool,
    ) -> StoreResult<CasOutcome>;
}
