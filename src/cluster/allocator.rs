//! Offset allocation.
//!
//! The latest-offset marker of a partition holds the number of offsets
//! handed out so far. A claim reads the marker as `n` (absent reads as 0)
//! and compare-and-swaps it from `n` to `n + 1`; the winner owns offset `n`.
//! A first claim creates the marker, so two nodes racing on a brand new
//! partition still contend on the same compare-and-swap and exactly one
//! of them gets offset 0.
//!
//! Losing the race is not an error. The claim is simply retried with a
//! fresh read, with jittered backoff, until it wins or the deadline passes.

use std::sync::Arc;
use std::time::Duration;

use backon::Retryable;
use thiserror::Error;
use tracing::{debug, trace};

use super::error::{LogError, LogResult, StoreError};
use super::keys::StoreKey;
use super::metrics;
use super::retry::{allocation_policy, record_retry_attempt};
use super::store::{CasOutcome, KeyValueStore};
use crate::types::{Offset, Value};

/// Why one claim attempt did not produce an offset.
#[derive(Debug, Error)]
enum ClaimError {
    #[error("latest marker moved past {observed}")]
    Conflict { observed: Value },
    #[error(transparent)]
    Store(StoreError),
}

impl ClaimError {
    fn is_retriable(&self) -> bool {
        match self {
            ClaimError::Conflict { .. } => true,
            ClaimError::Store(e) => e.is_retriable(),
        }
    }
}

pub struct OffsetAllocator<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
    backoff_min: Duration,
    backoff_max: Duration,
    deadline: Duration,
}

impl<S: KeyValueStore + ?Sized> OffsetAllocator<S> {
    /// `deadline` bounds one whole [`allocate`](Self::allocate) call,
    /// retries included.
    pub fn new(
        store: Arc<S>,
        backoff_min: Duration,
        backoff_max: Duration,
        deadline: Duration,
    ) -> Self {
        Self {
            store,
            backoff_min,
            backoff_max,
            deadline,
        }
    }

    /// Claim the next offset of `partition`.
    pub async fn allocate(&self, partition: &str) -> LogResult<Offset> {
        let key = StoreKey::latest(partition);

        let claim = (|| self.try_claim(&key))
            .retry(allocation_policy(self.backoff_min, self.backoff_max))
            .when(ClaimError::is_retriable)
            .notify(|err: &ClaimError, delay: Duration| {
                record_retry_attempt("allocate");
                trace!(partition, error = %err, delay_us = delay.as_micros() as u64, "Retrying offset claim");
            });

        match tokio::time::timeout(self.deadline, claim).await {
            Ok(Ok(offset)) => {
                metrics::OFFSETS_ALLOCATED.inc();
                Ok(offset)
            }
            Ok(Err(ClaimError::Store(e))) => Err(e.into()),
            Ok(Err(ClaimError::Conflict { observed })) => Err(LogError::Store(
                StoreError::Remote {
                    operation: "cas",
                    key: key.to_string(),
                    code: crate::error::ErrorCode::PreconditionFailed.code(),
                    text: format!("latest marker moved past {observed}"),
                },
            )),
            Err(_) => {
                debug!(partition, deadline_ms = self.deadline.as_millis() as u64, "Offset claim deadline exceeded");
                Err(LogError::DeadlineExceeded {
                    operation: "allocate",
                    partition: partition.to_string(),
                    timeout_ms: self.deadline.as_millis() as u64,
                })
            }
        }
    }

    /// One read plus one compare-and-swap.
    async fn try_claim(&self, key: &StoreKey) -> Result<Offset, ClaimError> {
        let current = self.store.read(key).await.map_err(ClaimError::Store)?;
        let next = current.unwrap_or(0);

        match self
            .store
            .compare_and_swap(key, next, next + 1, current.is_none())
            .await
            .map_err(ClaimError::Store)?
        {
            CasOutcome::Swapped => Ok(Offset(next)),
            CasOutcome::Rejected => {
                metrics::CAS_CONFLICTS.inc();
                Err(ClaimError::Conflict { observed: next })
            }
        }
    }
}
