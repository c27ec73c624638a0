//! # offsetlog
//! A Kafka-style partitioned log node for a simulated distributed cluster.
//!
//! Producers append integers to named partitions and get back an offset;
//! consumers poll partitions from an offset forward and record their
//! progress as commits. Any node can serve any partition: nodes coordinate
//! only through a shared linearizable key/value store, using single-key
//! compare-and-swap to agree on every partition's next offset.
//!
//! Nodes talk newline-delimited JSON messages on stdin/stdout:
//!
//! ```text
//! → {"src":"c1","dest":"n1","body":{"type":"send","msg_id":1,"key":"k1","msg":42}}
//! ← {"src":"n1","dest":"c1","body":{"msg_id":3,"in_reply_to":1,"type":"send_ok","offset":0}}
//! ```
//!
//! ## Layout
//! - [`protocol`]: message envelope and line codec
//! - [`server`]: node runtime, `init` handshake, request dispatch, RPCs
//! - [`cluster`]: the log itself (allocator, writer, reader, commits) and store clients
//!
//! ## Running a node
//!
//! ```rust,no_run
//! use offsetlog::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let config = cluster::NodeConfig::default();
//!     let node = server::Node::new(config.request_timeout);
//!     let store = Arc::new(cluster::MemoryStore::new());
//!     node.run(Arc::new(cluster::LogHandler::new(store, &config))).await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod protocol;
pub mod server;
pub mod types;

pub mod cluster;
pub mod constants;
pub mod telemetry;

pub mod prelude {
    //! Main exports.
    pub use crate::error::{Error, ErrorCode, Result};
    pub use crate::protocol::{Body, Message, Payload};
    pub use crate::types::{MsgId, NodeId, Offset, Value};

    pub mod server {
        //! Node runtime.
        pub use crate::server::*;
    }

    pub mod cluster {
        //! Log subsystem.
        pub use crate::cluster::*;
    }
}
