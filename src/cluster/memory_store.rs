//! In-process [`KeyValueStore`].
//!
//! Each key is updated under its shard lock, which makes every operation
//! linearizable for a single process. Used as the single-node backend and
//! as the shared store in multi-handler tests.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::error::StoreResult;
use super::keys::StoreKey;
use super::metrics;
use super::store::{CasOutcome, KeyValueStore};
use crate::types::Value;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current value of a key, without going through the async interface.
    pub fn get(&self, key: &StoreKey) -> Option<Value> {
        self.entries.get(&key.to_string()).map(|v| *v)
    }

    /// Every key currently held, parsed.
    pub fn keys(&self) -> Vec<StoreKey> {
        let mut keys: Vec<StoreKey> = self
            .entries
            .iter()
            .filter_map(|entry| StoreKey::parse(entry.key()))
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn read(&self, key: &StoreKey) -> StoreResult<Option<Value>> {
        let value = self.get(key);
        metrics::record_store_operation("read", if value.is_some() { "ok" } else { "missing" });
        Ok(value)
    }

    async fn write(&self, key: &StoreKey, value: Value) -> StoreResult<()> {
        self.entries.insert(key.to_string(), value);
        metrics::record_store_operation("write", "ok");
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        key: &StoreKey,
        expected: Value,
        new: Value,
        create_if_absent: bool,
    ) -> StoreResult<CasOutcome> {
        let outcome = match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut current) if *current.get() == expected => {
                current.insert(new);
                CasOutcome::Swapped
            }
            Entry::Occupied(_) => CasOutcome::Rejected,
            Entry::Vacant(slot) if create_if_absent => {
                slot.insert(new);
                CasOutcome::Swapped
            }
            Entry::Vacant(_) => CasOutcome::Rejected,
        };
        metrics::record_store_operation(
            "cas",
            match outcome {
                CasOutcome::Swapped => "ok",
                CasOutcome::Rejected => "rejected",
            },
        );
        Ok(outcome)
    }
}
