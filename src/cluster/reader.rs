//! Poll read path.
//!
//! For each requested partition: one read of the latest-offset marker, then
//! one read per record in `[start, latest)`. Record reads run with bounded
//! concurrency and are collected in offset order. A record that cannot be
//! read (never written, or the store failed) is skipped so one missing
//! record never fails the whole poll.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use super::error::LogResult;
use super::keys::StoreKey;
use super::metrics;
use super::retry::with_store_read_policy;
use super::store::KeyValueStore;
use crate::types::{Offset, Value};

/// Records of one partition, in offset order.
pub type PartitionRecords = Vec<(Offset, Value)>;

pub struct LogReader<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
    max_concurrent_reads: usize,
}

impl<S: KeyValueStore + ?Sized> LogReader<S> {
    pub fn new(store: Arc<S>, max_concurrent_reads: usize) -> Self {
        Self {
            store,
            max_concurrent_reads: max_concurrent_reads.max(1),
        }
    }

    /// Read every requested partition from its start offset.
    ///
    /// Partitions never appended to are absent from the result.
    pub async fn poll(
        &self,
        requests: &BTreeMap<String, Offset>,
    ) -> LogResult<BTreeMap<String, PartitionRecords>> {
        let mut msgs = BTreeMap::new();
        for (partition, start) in requests {
            if let Some(records) = self.read_partition(partition, *start).await? {
                msgs.insert(partition.clone(), records);
            }
        }
        Ok(msgs)
    }

    /// Read one partition from `start` up to its latest offset.
    ///
    /// `None` when the partition does not exist. A negative `start` reads
    /// from 0; a `start` at or past the end yields an empty list.
    pub async fn read_partition(
        &self,
        partition: &str,
        start: Offset,
    ) -> LogResult<Option<PartitionRecords>> {
        let Some(latest) = self.latest_offset(partition).await? else {
            return Ok(None);
        };

        let start = start.clamp_to_zero();
        if start >= latest {
            return Ok(Some(Vec::new()));
        }

        let records: PartitionRecords = stream::iter(start.value()..latest.value())
            .map(|offset| self.read_record(partition, Offset(offset)))
            .buffered(self.max_concurrent_reads)
            .filter_map(|record| async move { record })
            .collect()
            .await;

        metrics::RECORDS_POLLED.inc_by(records.len() as u64);
        debug!(
            partition,
            %start,
            %latest,
            returned = records.len(),
            "Read partition"
        );
        Ok(Some(records))
    }

    /// The partition's next unallocated offset, `None` if it was never appended to.
    pub async fn latest_offset(&self, partition: &str) -> LogResult<Option<Offset>> {
        let key = StoreKey::latest(partition);
        let latest = with_store_read_policy(|| self.store.read(&key), |e| e.is_retriable()).await?;
        Ok(latest.map(Offset))
    }

    async fn read_record(&self, partition: &str, offset: Offset) -> Option<(Offset, Value)> {
        let key = StoreKey::record(partition, offset);
        match with_store_read_policy(|| self.store.read(&key), |e| e.is_retriable()).await {
            Ok(Some(value)) => Some((offset, value)),
            Ok(None) => {
                debug!(partition, %offset, "Skipping record that was never written");
                metrics::record_gap_skipped("missing");
                None
            }
            Err(e) => {
                warn!(partition, %offset, error = %e, "Skipping unreadable record");
                metrics::record_gap_skipped("error");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::memory_store::MemoryStore;
    use crate::cluster::testing::FaultyStore;

    async fn seeded(partition: &str, values: &[Value]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (i, value) in values.iter().enumerate() {
            store
                .write(&StoreKey::record(partition, Offset(i as i64)), *value)
                .await
                .unwrap();
        }
        store
            .write(&StoreKey::latest(partition), values.len() as Value)
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_reads_in_offset_order() {
        let store = seeded("p", &[10, 20, 30]).await;
        let reader = LogReader::new(store, 2);

        let records = reader.read_partition("p", Offset(0)).await.unwrap();
        assert_eq!(
            records,
            Some(vec![(Offset(0), 10), (Offset(1), 20), (Offset(2), 30)])
        );
    }

    #[tokio::test]
    async fn test_start_offset_bounds() {
        let store = seeded("p", &[10, 20, 30]).await;
        let reader = LogReader::new(store, 4);

        assert_eq!(
            reader.read_partition("p", Offset(2)).await.unwrap(),
            Some(vec![(Offset(2), 30)])
        );
        assert_eq!(reader.read_partition("p", Offset(3)).await.unwrap(), Some(vec![]));
        assert_eq!(reader.read_partition("p", Offset(99)).await.unwrap(), Some(vec![]));
        assert_eq!(
            reader.read_partition("p", Offset(-5)).await.unwrap().map(|r| r.len()),
            Some(3)
        );
    }

    #[tokio::test]
    async fn test_unknown_partition_is_omitted() {
        let store = seeded("p", &[1]).await;
        let reader = LogReader::new(store, 4);

        let mut requests = BTreeMap::new();
        requests.insert("p".to_string(), Offset(0));
        requests.insert("nope".to_string(), Offset(0));

        let msgs = reader.poll(&requests).await.unwrap();
        assert_eq!(msgs.len(), 1);
        assert!(msgs.contains_key("p"));
        assert!(!msgs.contains_key("nope"));
    }

    #[tokio::test]
    async fn test_missing_record_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        store.write(&StoreKey::record("p", Offset(0)), 1).await.unwrap();
        store.write(&StoreKey::record("p", Offset(2)), 3).await.unwrap();
        store.write(&StoreKey::latest("p"), 3).await.unwrap();
        let reader = LogReader::new(store, 4);

        let records = reader.read_partition("p", Offset(0)).await.unwrap().unwrap();
        assert_eq!(records, vec![(Offset(0), 1), (Offset(2), 3)]);
    }

    #[tokio::test]
    async fn test_failing_record_read_is_skipped() {
        let inner = seeded("p", &[10, 20, 30]).await;
        let store = Arc::new(FaultyStore::from_arc(inner));
        store.fail_reads_of(StoreKey::record("p", Offset(1)));
        let reader = LogReader::new(store, 4);

        let records = reader.read_partition("p", Offset(0)).await.unwrap().unwrap();
        assert_eq!(records, vec![(Offset(0), 10), (Offset(2), 30)]);
    }

    #[tokio::test]
    async fn test_failing_marker_read_fails_the_poll() {
        let inner = seeded("p", &[10]).await;
        let store = Arc::new(FaultyStore::from_arc(inner));
        store.fail_reads_of(StoreKey::latest("p"));
        let reader = LogReader::new(store, 4);

        assert!(reader.read_partition("p", Offset(0)).await.is_err());
    }
}
