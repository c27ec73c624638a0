//! [`KeyValueStore`] backed by the cluster's linearizable key/value service.
//!
//! Every operation is one RPC to the service node (`lin-kv` by default)
//! with a per-operation timeout. Error replies are translated:
//!
//! | Reply | read | write | cas |
//! |-------|------|-------|-----|
//! | `key-does-not-exist` (20) | `Ok(None)` | error | `Rejected` |
//! | `precondition-failed` (22) | error | error | `Rejected` |
//! | `timeout` (0) or no reply | `Timeout` | `Timeout` | `Timeout` |
//! | anything else | `Remote` | `Remote` | `Remote` |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::error::{StoreError, StoreResult};
use super::keys::StoreKey;
use super::metrics;
use super::store::{CasOutcome, KeyValueStore};
use crate::error::ErrorCode;
use crate::protocol::Payload;
use crate::server::request::{CasRequestData, ReadRequestData, WriteRequestData};
use crate::server::response::ErrorResponseData;
use crate::server::RpcClient;
use crate::types::Value;

pub struct LinKvStore<R: RpcClient + ?Sized> {
    rpc: Arc<R>,
    service: String,
    timeout: Duration,
}

impl<R: RpcClient + ?Sized> LinKvStore<R> {
    pub fn new(rpc: Arc<R>, service: impl Into<String>, timeout: Duration) -> Self {
        Self {
            rpc,
            service: service.into(),
            timeout,
        }
    }

    async fn call(
        &self,
        operation: &'static str,
        key: &StoreKey,
        payload: Payload,
    ) -> StoreResult<Payload> {
        match self.rpc.call(&self.service, payload, self.timeout).await {
            Ok(reply) => Ok(reply),
            Err(e) if e.is_indefinite() => {
                metrics::record_store_operation(operation, "timeout");
                Err(self.timeout_error(operation, key))
            }
            Err(e) => {
                metrics::record_store_operation(operation, "error");
                Err(StoreError::Unavailable(e.to_string()))
            }
        }
    }

    fn timeout_error(&self, operation: &'static str, key: &StoreKey) -> StoreError {
        StoreError::Timeout {
            operation,
            key: key.to_string(),
            timeout_ms: self.timeout.as_millis() as u64,
        }
    }

    fn remote_error(
        &self,
        operation: &'static str,
        key: &StoreKey,
        err: ErrorResponseData,
    ) -> StoreError {
        if err.error_code() == Some(ErrorCode::Timeout) {
            metrics::record_store_operation(operation, "timeout");
            return self.timeout_error(operation, key);
        }
        metrics::record_store_operation(operation, "error");
        StoreError::Remote {
            operation,
            key: key.to_string(),
            code: err.code,
            text: err.text,
        }
    }
}

fn unexpected(operation: &'static str, reply: &Payload) -> StoreError {
    metrics::record_store_operation(operation, "error");
    StoreError::UnexpectedReply {
        operation,
        reply: reply.kind(),
    }
}

#[async_trait]
impl<R: RpcClient + ?Sized + 'static> KeyValueStore for LinKvStore<R> {
    async fn read(&self, key: &StoreKey) -> StoreResult<Option<Value>> {
        let request = Payload::Read(ReadRequestData {
            key: key.to_string(),
        });
        match self.call("read", key, request).await? {
            Payload::ReadOk(reply) => {
                metrics::record_store_operation("read", "ok");
                Ok(Some(reply.value))
            }
            Payload::Error(err) if err.error_code() == Some(ErrorCode::KeyDoesNotExist) => {
                metrics::record_store_operation("read", "missing");
                Ok(None)
            }
            Payload::Error(err) => Err(self.remote_error("read", key, err)),
            other => Err(unexpected("read", &other)),
        }
    }

    async fn write(&self, key: &StoreKey, value: Value) -> StoreResult<()> {
        let request = Payload::Write(WriteRequestData {
            key: key.to_string(),
            value,
        });
        match self.call("write", key, request).await? {
            Payload::WriteOk => {
                metrics::record_store_operation("write", "ok");
                Ok(())
            }
            Payload::Error(err) => Err(self.remote_error("write", key, err)),
            other => Err(unexpected("write", &other)),
        }
    }

    async fn compare_and_swap(
        &self,
        key: &StoreKey,
        expected: Value,
        new: Value,
        create_if_absent: bool,
    ) -> StoreResult<CasOutcome> {
        let request = Payload::Cas(CasRequestData {
            key: key.to_string(),
            from: expected,
            to: new,
            create_if_not_exists: create_if_absent,
        });
        match self.call("cas", key, request).await? {
            Payload::CasOk => {
                metrics::record_store_operation("cas", "ok");
                Ok(CasOutcome::Swapped)
            }
            Payload::Error(err)
                if matches!(
                    err.error_code(),
                    Some(ErrorCode::PreconditionFailed | ErrorCode::KeyDoesNotExist)
                ) =>
            {
                metrics::record_store_operation("cas", "rejected");
                Ok(CasOutcome::Rejected)
            }
            Payload::Error(err) => Err(self.remote_error("cas", key, err)),
            other => Err(unexpected("cas", &other)),
        }
    }
}
