//! Consumer commit markers.
//!
//! One marker per partition, shared by every consumer. Commits overwrite
//! the marker unconditionally, so a lower offset committed later replaces
//! a higher one.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use super::error::{LogError, LogResult};
use super::keys::{StoreKey, validate_partition_key};
use super::metrics;
use super::retry::with_store_read_policy;
use super::store::KeyValueStore;
use crate::types::Offset;

pub struct CommitTracker<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
    max_concurrent: usize,
}

impl<S: KeyValueStore + ?Sized> CommitTracker<S> {
    pub fn new(store: Arc<S>, max_concurrent: usize) -> Self {
        Self {
            store,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Overwrite the commit marker of every partition in `offsets`.
    ///
    /// Every key is validated before anything is written.
    pub async fn commit(&self, offsets: &BTreeMap<String, Offset>) -> LogResult<()> {
        for partition in offsets.keys() {
            validate_partition_key(partition).map_err(LogError::InvalidRequest)?;
        }

        let entries: Vec<(String, Offset)> = offsets
            .iter()
            .map(|(partition, offset)| (partition.clone(), *offset))
            .collect();

        stream::iter(entries)
            .map(|(partition, offset)| async move {
                self.store
                    .write(&StoreKey::commit(partition.as_str()), offset.value())
                    .await?;
                metrics::COMMITS_WRITTEN.inc();
                debug!(partition = %partition, %offset, "Committed offset");
                Ok::<_, LogError>(())
            })
            .buffer_unordered(self.max_concurrent)
            .try_collect::<Vec<()>>()
            .await?;
        Ok(())
    }

    /// Current commit markers of `partitions`. Never-committed partitions are absent.
    pub async fn list_committed(&self, partitions: &[String]) -> LogResult<BTreeMap<String, Offset>> {
        let found: Vec<Option<(String, Offset)>> = stream::iter(partitions.to_vec())
            .map(|partition| async move {
                let key = StoreKey::commit(partition.as_str());
                let value =
                    with_store_read_policy(|| self.store.read(&key), |e| e.is_retriable()).await?;
                Ok::<_, LogError>(value.map(|v| (partition, Offset(v))))
            })
            .buffer_unordered(self.max_concurrent)
            .try_collect()
            .await?;

        Ok(found.into_iter().flatten().collect())
    }
}
