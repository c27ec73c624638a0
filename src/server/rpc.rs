//! Request/reply calls from this node to other cluster members.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::protocol::Payload;

/// Failures of a node-to-node call before any reply arrived.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// No reply arrived in time. The remote side may still have acted.
    #[error("RPC to {dest} timed out after {timeout_ms}ms")]
    Timeout { dest: String, timeout_ms: u64 },

    /// The node has not received `init` yet, so it has no id to send from.
    #[error("node is not initialized")]
    NotInitialized,

    /// The node's input or output stream is gone.
    #[error("node transport is closed")]
    Closed,
}

impl RpcError {
    /// Whether a reply could still be in flight, i.e. the remote side may
    /// have applied the request.
    pub fn is_indefinite(&self) -> bool {
        matches!(self, RpcError::Timeout { .. })
    }
}

/// Issues a request to another node and waits for its reply.
///
/// Implemented by [`super::Node`]; store clients depend on this trait only
/// so they can be driven by a scripted peer in tests.
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Send `payload` to `dest` and return the reply payload.
    ///
    /// Error replies are returned as `Ok(Payload::Error(..))`; only
    /// transport-level failures are `Err`.
    async fn call(
        &self,
        dest: &str,
        payload: Payload,
        timeout: Duration,
    ) -> Result<Payload, RpcError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_display() {
        let err = RpcError::Timeout {
            dest: "lin-kv".to_string(),
            timeout_ms: 1000,
        };
        assert_eq!(err.to_string(), "RPC to lin-kv timed out after 1000ms");
        assert!(err.is_indefinite());
        assert!(!RpcError::NotInitialized.is_indefinite());
        assert!(!RpcError::Closed.is_indefinite());
    }
}
