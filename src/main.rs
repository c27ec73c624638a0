//! offsetlog node binary.
//!
//! Reads protocol messages on stdin and writes them on stdout; logs go to
//! stderr.
//!
//! ```bash
//! # default: coordinate through the cluster's lin-kv service
//! offsetlog
//!
//! # single node, in-process store
//! STORE_BACKEND=memory offsetlog
//!
//! # JSON logs, verbose
//! LOG_FORMAT=json RUST_LOG=offsetlog=debug offsetlog
//! ```
//!
//! See [`offsetlog::cluster::NodeConfig`] for every environment variable.

use std::sync::Arc;

use offsetlog::cluster::{
    KeyValueStore, LinKvStore, LogHandler, MemoryStore, NodeConfig, StoreBackend, metrics,
};
use offsetlog::server::Node;
use offsetlog::telemetry::{LogFormat, init_logging};
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LogFormat::from_env()).map_err(|e| -> Box<dyn std::error::Error> { e })?;

    let config = NodeConfig::from_env()?;
    if let Err(errors) = config.validate() {
        for problem in &errors {
            error!(problem = %problem, "Invalid configuration");
        }
        return Err(format!("invalid configuration: {} error(s)", errors.len()).into());
    }
    metrics::init_metrics();

    info!(
        backend = ?config.store_backend,
        store_service = %config.store_service,
        store_rpc_timeout_ms = config.store_rpc_timeout.as_millis() as u64,
        request_timeout_ms = config.request_timeout.as_millis() as u64,
        max_concurrent_reads = config.max_concurrent_reads,
        "Starting offsetlog node"
    );

    let node = Node::new(config.request_timeout);
    let store: Arc<dyn KeyValueStore> = match config.store_backend {
        StoreBackend::LinKv => Arc::new(LinKvStore::new(
            node.clone(),
            config.store_service.clone(),
            config.store_rpc_timeout,
        )),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    let handler = Arc::new(LogHandler::new(store, &config));

    let result = node.run(handler).await;

    match metrics::encode_metrics() {
        Ok(text) => debug!(metrics = %text, "Final metrics"),
        Err(e) => debug!(error = %e, "Failed to encode metrics"),
    }

    match result {
        Ok(()) => {
            info!("Input closed, node stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Node stopped with error");
            Err(e.into())
        }
    }
}
