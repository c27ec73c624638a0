//! Handler trait for processing client requests.
//!
//! Implement the `Handler` trait to provide the logic behind each request
//! kind. Every method has a default that answers `not-supported`, so a
//! handler only overrides what it serves.

use async_trait::async_trait;

use crate::types::{MsgId, NodeId};

use super::request::*;
use super::response::*;

/// Context for a request, containing addressing information.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The node or client that sent the request.
    pub src: NodeId,
    /// The node id the request was addressed to.
    pub dest: NodeId,
    /// The request's `msg_id`; replies set `in_reply_to` to it.
    pub msg_id: Option<MsgId>,
    /// Unique request ID for correlation across logs.
    pub request_id: uuid::Uuid,
}

impl RequestContext {
    pub fn new(src: impl Into<NodeId>, dest: impl Into<NodeId>, msg_id: Option<MsgId>) -> Self {
        Self {
            src: src.into(),
            dest: dest.into(),
            msg_id,
            request_id: uuid::Uuid::new_v4(),
        }
    }

    /// Get the request ID for logging.
    pub fn request_id(&self) -> &uuid::Uuid {
        &self.request_id
    }
}

/// Result of a handler method: the `_ok` body, or an `error` body.
pub type HandlerResult<T> = Result<T, ErrorResponseData>;

/// Trait for handling client requests.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handle a `send` (append) request.
    async fn handle_send(
        &self,
        _ctx: &RequestContext,
        _request: SendRequestData,
    ) -> HandlerResult<SendResponseData> {
        Err(ErrorResponseData::not_supported("send"))
    }

    /// Handle a `poll` request.
    async fn handle_poll(
        &self,
        _ctx: &RequestContext,
        _request: PollRequestData,
    ) -> HandlerResult<PollResponseData> {
        Err(ErrorResponseData::not_supported("poll"))
    }

    /// Handle a `commit_offsets` request.
    async fn handle_commit_offsets(
        &self,
        _ctx: &RequestContext,
        _request: CommitOffsetsRequestData,
    ) -> HandlerResult<CommitOffsetsResponseData> {
        Err(ErrorResponseData::not_supported("commit_offsets"))
    }

    /// Handle a `list_committed_offsets` request.
    async fn handle_list_committed_offsets(
        &self,
        _ctx: &RequestContext,
        _request: ListCommittedOffsetsRequestData,
    ) -> HandlerResult<ListCommittedOffsetsResponseData> {
        Err(ErrorResponseData::not_supported("list_committed_offsets"))
    }
}
