//! Log handler implementing the node's Handler trait.
//!
//! This module is split into submodules by request kind:
//! - `send` - append handling
//! - `poll` - read handling
//! - `offsets` - commit and list-committed handling
//!
//! The handler holds no log state of its own. Every decision that must be
//! agreed across nodes goes through the shared [`KeyValueStore`], so any
//! number of handlers (on any number of nodes) can serve the same log.

mod offsets;
mod poll;
mod send;

use std::sync::Arc;

use async_trait::async_trait;

use crate::server::request::*;
use crate::server::response::*;
use crate::server::{Handler, HandlerResult, RequestContext};
use crate::types::{Offset, Value};

use super::allocator::OffsetAllocator;
use super::commits::CommitTracker;
use super::config::NodeConfig;
use super::error::{LogError, LogResult};
use super::keys::validate_partition_key;
use super::reader::LogReader;
use super::store::KeyValueStore;
use super::writer::RecordWriter;

/// Serves `send`, `poll`, `commit_offsets` and `list_committed_offsets`
/// on top of a [`KeyValueStore`].
pub struct LogHandler<S: KeyValueStore + ?Sized> {
    pub(crate) allocator: OffsetAllocator<S>,
    pub(crate) writer: RecordWriter<S>,
    pub(crate) reader: LogReader<S>,
    pub(crate) commits: CommitTracker<S>,
}

impl<S: KeyValueStore + ?Sized> LogHandler<S> {
    pub fn new(store: Arc<S>, config: &NodeConfig) -> Self {
        // Leave one store round trip of the request deadline for the record write.
        let allocation_deadline = config
            .request_timeout
            .saturating_sub(config.store_rpc_timeout);
        Self {
            allocator: OffsetAllocator::new(
                Arc::clone(&store),
                config.cas_backoff_min,
                config.cas_backoff_max,
                allocation_deadline,
            ),
            writer: RecordWriter::new(Arc::clone(&store)),
            reader: LogReader::new(Arc::clone(&store), config.max_concurrent_reads),
            commits: CommitTracker::new(store, config.max_concurrent_reads),
        }
    }

    /// Append `value` to `partition` and return its offset.
    ///
    /// The offset is claimed first; the record is written only once the
    /// claim has succeeded.
    pub async fn append(&self, partition: &str, value: Value) -> LogResult<Offset> {
        validate_partition_key(partition).map_err(LogError::InvalidRequest)?;
        let offset = self.allocator.allocate(partition).await?;
        self.writer.write(partition, offset, value).await?;
        Ok(offset)
    }
}

#[async_trait]
impl<S: KeyValueStore + ?Sized + 'static> Handler for LogHandler<S> {
    #[tracing::instrument(skip(self, ctx, request), fields(request_id = %ctx.request_id, partition = %request.key))]
    async fn handle_send(
        &self,
        ctx: &RequestContext,
        request: SendRequestData,
    ) -> HandlerResult<SendResponseData> {
        send::handle_send(self, ctx, request).await
    }

    #[tracing::instrument(skip(self, ctx, request), fields(request_id = %ctx.request_id, partition_count = request.offsets.len()))]
    async fn handle_poll(
        &self,
        ctx: &RequestContext,
        request: PollRequestData,
    ) -> HandlerResult<PollResponseData> {
        poll::handle_poll(self, ctx, request).await
    }

    #[tracing::instrument(skip(self, _ctx, request), fields(request_id = %_ctx.request_id, partition_count = request.offsets.len()))]
    async fn handle_commit_offsets(
        &self,
        _ctx: &RequestContext,
        request: CommitOffsetsRequestData,
    ) -> HandlerResult<CommitOffsetsResponseData> {
        offsets::handle_commit_offsets(self, request).await
    }

    #[tracing::instrument(skip(self, _ctx, request), fields(request_id = %_ctx.request_id, key_count = request.keys.len()))]
    async fn handle_list_committed_offsets(
        &self,
        _ctx: &RequestContext,
        request: ListCommittedOffsetsRequestData,
    ) -> HandlerResult<ListCommittedOffsetsResponseData> {
        offsets::handle_list_committed_offsets(self, request).await
    }
}
