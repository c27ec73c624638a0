//! Node configuration.
//!
//! Loaded from environment variables by [`NodeConfig::from_env`]:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `STORE_BACKEND` | `lin-kv` | `lin-kv` (cluster store service) or `memory` (single node) |
//! | `STORE_SERVICE` | `lin-kv` | node id of the store service |
//! | `STORE_RPC_TIMEOUT_MS` | 1000 | timeout of one store operation |
//! | `REQUEST_TIMEOUT_MS` | 5000 | deadline of one client request |
//! | `MAX_CONCURRENT_READS` | 16 | record reads in flight per poll |
//! | `CAS_BACKOFF_MIN_MS` | 1 | first allocator retry delay |
//! | `CAS_BACKOFF_MAX_MS` | 50 | largest allocator retry delay |

use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CAS_BACKOFF_MAX_MS, DEFAULT_CAS_BACKOFF_MIN_MS, DEFAULT_MAX_CONCURRENT_READS,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_STORE_RPC_TIMEOUT_MS, DEFAULT_STORE_SERVICE,
};
use crate::error::Error;

/// Which [`super::KeyValueStore`] the node runs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreBackend {
    /// The cluster's linearizable key/value service, reached over RPC.
    #[default]
    LinKv,
    /// A store inside this process. Only coherent for a single node.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lin-kv" | "linkv" => Ok(StoreBackend::LinKv),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(format!(
                "unknown store backend '{}', expected 'lin-kv' or 'memory'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub store_backend: StoreBackend,
    pub store_service: String,
    pub store_rpc_timeout: Duration,
    pub request_timeout: Duration,
    pub max_concurrent_reads: usize,
    pub cas_backoff_min: Duration,
    pub cas_backoff_max: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            store_backend: StoreBackend::default(),
            store_service: DEFAULT_STORE_SERVICE.to_string(),
            store_rpc_timeout: Duration::from_millis(DEFAULT_STORE_RPC_TIMEOUT_MS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            max_concurrent_reads: DEFAULT_MAX_CONCURRENT_READS,
            cas_backoff_min: Duration::from_millis(DEFAULT_CAS_BACKOFF_MIN_MS),
            cas_backoff_max: Duration::from_millis(DEFAULT_CAS_BACKOFF_MAX_MS),
        }
    }
}

impl NodeConfig {
    /// Validate the configuration for consistency.
    ///
    /// Returns every problem found, not just the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.store_service.is_empty() {
            errors.push("store_service must not be empty".to_string());
        }

        if self.store_rpc_timeout.is_zero() {
            errors.push("store_rpc_timeout must be greater than zero".to_string());
        }

        // A request must outlive at least one lost store reply.
        if self.request_timeout <= self.store_rpc_timeout {
            errors.push(format!(
                "request_timeout ({:?}) must be greater than store_rpc_timeout ({:?})",
                self.request_timeout, self.store_rpc_timeout
            ));
        }

        if self.max_concurrent_reads == 0 {
            errors.push("max_concurrent_reads must be greater than zero".to_string());
        }

        if self.cas_backoff_min > self.cas_backoff_max {
            errors.push(format!(
                "cas_backoff_min ({:?}) must not exceed cas_backoff_max ({:?})",
                self.cas_backoff_min, self.cas_backoff_max
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Unparseable values are reported as [`Error::Config`].
    pub fn from_env() -> Result<Self, Error> {
        let defaults = Self::default();

        let store_backend = match std::env::var("STORE_BACKEND") {
            Ok(value) => value.parse::<StoreBackend>().map_err(Error::Config)?,
            Err(_) => defaults.store_backend,
        };

        let store_service =
            std::env::var("STORE_SERVICE").unwrap_or_else(|_| defaults.store_service.clone());

        let store_rpc_timeout = env_millis("STORE_RPC_TIMEOUT_MS", defaults.store_rpc_timeout)?;
        let request_timeout = env_millis("REQUEST_TIMEOUT_MS", defaults.request_timeout)?;

        let max_concurrent_reads: usize = match std::env::var("MAX_CONCURRENT_READS") {
            Ok(value) => value
                .parse()
                .map_err(|e| Error::Config(format!("Invalid MAX_CONCURRENT_READS: {}", e)))?,
            Err(_) => defaults.max_concurrent_reads,
        };

        let cas_backoff_min = env_millis("CAS_BACKOFF_MIN_MS", defaults.cas_backoff_min)?;
        let cas_backoff_max = env_millis("CAS_BACKOFF_MAX_MS", defaults.cas_backoff_max)?;

        Ok(Self {
            store_backend,
            store_service,
            store_rpc_timeout,
            request_timeout,
            max_concurrent_reads,
            cas_backoff_min,
            cas_backoff_max,
        })
    }
}

fn env_millis(name: &str, default: Duration) -> Result<Duration, Error> {
    match std::env::var(name) {
        Ok(value) => value
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| Error::Config(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}
