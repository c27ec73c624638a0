//! Partitioned, offset-addressed log on top of a linearizable key/value store.
//!
//! Every node can serve every partition. Nodes share nothing but the store,
//! and the store's single-key compare-and-swap is the only serialization
//! point in the cluster.
//!
//! # Architecture
//!
//! ```text
//!        ┌────────┐   ┌────────┐   ┌────────┐
//!        │ Node 1 │   │ Node 2 │   │ Node 3 │   ← LogHandler on each
//!        └───┬────┘   └───┬────┘   └───┬────┘
//!            │            │            │
//!            └────────────┼────────────┘
//!                         ▼
//!                  ┌─────────────┐
//!                  │   lin-kv    │  latest_<p>        (CAS)
//!                  │             │  log_<p>_<offset>  (write/read)
//!                  │             │  commit_<p>        (write/read)
//!                  └─────────────┘
//! ```
//!
//! # Components
//!
//! - [`OffsetAllocator`]: claims offsets with read + compare-and-swap, retrying on conflict
//! - [`RecordWriter`]: stores a value at a claimed offset
//! - [`LogReader`]: reads `[start, latest)` per partition, skipping unreadable records
//! - [`CommitTracker`]: last-write-wins commit marker per partition
//! - [`LogHandler`]: maps requests onto the above
//!
//! # Usage
//!
//! ```rust,no_run
//! use offsetlog::cluster::{LinKvStore, LogHandler, NodeConfig};
//! use offsetlog::server::Node;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NodeConfig::from_env()?;
//!     let node = Node::new(config.request_timeout);
//!     let store = Arc::new(LinKvStore::new(
//!         node.clone(),
//!         config.store_service.clone(),
//!         config.store_rpc_timeout,
//!     ));
//!     let handler = Arc::new(LogHandler::new(store, &config));
//!     node.run(handler).await?;
//!     Ok(())
//! }
//! ```

mod allocator;
mod commits;
mod config;
mod error;
mod handler;
mod keys;
mod linkv;
mod memory_store;
pub mod metrics;
mod reader;
pub mod retry;
mod store;
mod writer;

#[cfg(any(test, feature = "test-utilities"))]
pub mod testing;

pub use allocator::OffsetAllocator;
pub use commits::CommitTracker;
pub use config::{NodeConfig, StoreBackend};
pub use error::{LogError, LogResult, StoreError, StoreResult};
pub use handler::LogHandler;
pub use keys::{StoreKey, validate_partition_key};
pub use linkv::LinKvStore;
pub use memory_store::MemoryStore;
pub use reader::{LogReader, PartitionRecords};
pub use store::{CasOutcome, KeyValueStore};
pub use writer::RecordWriter;

#[cfg(any(test, feature = "test-utilities"))]
pub use testing::FaultyStore;
