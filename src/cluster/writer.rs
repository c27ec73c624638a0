//! Record writes.

use std::sync::Arc;

use tracing::warn;

use super::error::LogResult;
use super::keys::StoreKey;
use super::metrics;
use super::store::KeyValueStore;
use crate::types::{Offset, Value};

/// Stores appended values at offsets the allocator has already claimed.
///
/// The write is a plain write: owning the offset already excludes every
/// other writer of that record key.
pub struct RecordWriter<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
}

impl<S: KeyValueStore + ?Sized> RecordWriter<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Write `value` as record `offset` of `partition`.
    ///
    /// On failure the offset stays allocated and readers will skip it.
    pub async fn write(&self, partition: &str, offset: Offset, value: Value) -> LogResult<()> {
        let key = StoreKey::record(partition, offset);
        if let Err(e) = self.store.write(&key, value).await {
            warn!(partition, %offset, error = %e, "Record write failed, offset left as a gap");
            return Err(e.into());
        }
        metrics::RECORDS_APPENDED.inc();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::memory_store::MemoryStore;
    use crate::cluster::testing::FaultyStore;

    #[tokio::test]
    async fn test_write_lands_at_record_key() {
        let store = Arc::new(MemoryStore::new());
        let writer = RecordWriter::new(store.clone());

        writer.write("p", Offset(4), 40).await.unwrap();
        assert_eq!(store.get(&StoreKey::record("p", Offset(4))), Some(40));
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let store = Arc::new(FaultyStore::new(MemoryStore::new()));
        store.fail_writes_to(StoreKey::record("p", Offset(0)));
        let writer = RecordWriter::new(store);

        assert!(writer.write("p", Offset(0), 1).await.is_err());
        assert!(writer.write("p", Offset(1), 1).await.is_ok());
    }
}
