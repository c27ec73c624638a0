//! Cluster node runtime.
//!
//! A [`Node`] speaks the line-oriented JSON protocol of [`crate::protocol`]
//! over a pair of byte streams (stdin/stdout in production). It:
//! - answers the `init` handshake
//! - dispatches every other request to a [`Handler`] on its own task
//! - correlates replies to the RPCs it issued itself (see [`RpcClient`])
//! - serializes all output through one writer task, one line per message
//!
//! # Example
//! ```rust,no_run
//! use offsetlog::server::{Handler, Node, RequestContext};
//! use offsetlog::server::request::*;
//! use offsetlog::server::response::*;
//! use offsetlog::types::Offset;
//! use async_trait::async_trait;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct FixedOffset;
//!
//! #[async_trait]
//! impl Handler for FixedOffset {
//!     async fn handle_send(
//!         &self,
//!         _ctx: &RequestContext,
//!         _request: SendRequestData,
//!     ) -> Result<SendResponseData, ErrorResponseData> {
//!         Ok(SendResponseData { offset: Offset::ZERO })
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let node = Node::new(Duration::from_secs(5));
//!     node.run(Arc::new(FixedOffset)).await.unwrap();
//! }
//! ```

mod handler;
pub mod request;
pub mod response;
mod rpc;

pub use handler::{Handler, HandlerResult, RequestContext};
pub use rpc::{RpcClient, RpcError};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio::time::timeout;

use crate::cluster::metrics;
use crate::error::{Error, ErrorCode, Result};
use crate::protocol::{Body, DecodeError, Message, Payload, decode_message, encode_message};
use crate::types::{MsgId, NodeId};

use self::request::InitRequestData;
use self::response::ErrorResponseData;

/// Identity learnt from `init`.
#[derive(Debug, Clone)]
struct Identity {
    node_id: NodeId,
    node_ids: Vec<NodeId>,
}

enum Outbound {
    Message(Message),
    Shutdown,
}

/// A cluster node: transport, handshake and request dispatch.
pub struct Node {
    identity: OnceLock<Identity>,
    outbound: mpsc::UnboundedSender<Outbound>,
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Outbound>>>,
    /// RPCs awaiting a reply, by the `msg_id` they were sent with.
    pending: DashMap<MsgId, oneshot::Sender<Body>>,
    next_msg_id: AtomicU64,
    input_closed: AtomicBool,
    request_timeout: Duration,
}

impl Node {
    /// Create a node whose requests must each finish within `request_timeout`.
    pub fn new(request_timeout: Duration) -> Arc<Self> {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            identity: OnceLock::new(),
            outbound,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            pending: DashMap::new(),
            next_msg_id: AtomicU64::new(1),
            input_closed: AtomicBool::new(false),
            request_timeout,
        })
    }

    /// This node's id, once `init` has been received.
    pub fn node_id(&self) -> Option<&str> {
        self.identity.get().map(|id| id.node_id.as_str())
    }

    /// Number of RPCs still waiting for a reply.
    pub fn pending_rpcs(&self) -> usize {
        self.pending.len()
    }

    /// Run on stdin/stdout until stdin closes.
    pub async fn run<H: Handler + 'static>(self: &Arc<Self>, handler: Arc<H>) -> Result<()> {
        self.run_with_io(tokio::io::stdin(), tokio::io::stdout(), handler)
            .await
    }

    /// Run on arbitrary streams until `reader` reaches EOF.
    ///
    /// In-flight requests are drained before the writer is shut down, so
    /// every reply they produce is written.
    pub async fn run_with_io<R, W, H>(
        self: &Arc<Self>,
        reader: R,
        writer: W,
        handler: Arc<H>,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
        H: Handler + 'static,
    {
        let outbound_rx = self
            .outbound_rx
            .lock()
            .ok()
            .and_then(|mut rx| rx.take())
            .ok_or_else(|| Error::MissingData("node is already running".to_owned()))?;
        let writer_task = tokio::spawn(write_loop(writer, outbound_rx));

        let mut lines = BufReader::new(reader).lines();
        let mut in_flight = JoinSet::new();

        let read_result = loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break Ok(()),
                Err(e) => break Err(Error::from(e)),
            };
            if line.trim().is_empty() {
                continue;
            }

            match decode_message(&line) {
                Ok(message) => self.accept(message, &handler, &mut in_flight),
                Err(e) => self.reject(e),
            }

            while let Some(finished) = in_flight.try_join_next() {
                log_task_outcome(finished);
            }
        };

        tracing::debug!(
            in_flight = in_flight.len(),
            pending_rpcs = self.pending_rpcs(),
            "Input closed, draining requests"
        );
        self.input_closed.store(true, Ordering::SeqCst);
        // No more replies can arrive: fail waiting RPCs now instead of at their timeout.
        self.pending.clear();

        while let Some(finished) = in_flight.join_next().await {
            log_task_outcome(finished);
        }

        let _ = self.outbound.send(Outbound::Shutdown);
        match writer_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Output stream failed");
                return Err(e);
            }
            Err(e) => {
                tracing::error!(error = %e, "Writer task panicked");
                return Err(Error::MissingData("writer task panicked".to_owned()));
            }
        }

        read_result
    }

    /// Route one decoded inbound message.
    fn accept<H: Handler + 'static>(
        self: &Arc<Self>,
        message: Message,
        handler: &Arc<H>,
        in_flight: &mut JoinSet<()>,
    ) {
        if let Some(in_reply_to) = message.body.in_reply_to {
            match self.pending.remove(&in_reply_to) {
                Some((_, waiter)) => {
                    let _ = waiter.send(message.body);
                }
                None => tracing::debug!(
                    src = %message.src,
                    in_reply_to,
                    kind = message.body.payload.kind(),
                    "Dropping reply with no pending RPC"
                ),
            }
            return;
        }

        let ctx = RequestContext::new(message.src, message.dest, message.body.msg_id);
        match message.body.payload {
            Payload::Init(init) => self.handle_init(&ctx, init),
            payload => {
                let node = Arc::clone(self);
                let handler = Arc::clone(handler);
                in_flight.spawn(async move { node.dispatch(handler.as_ref(), ctx, payload).await });
            }
        }
    }

    fn handle_init(&self, ctx: &RequestContext, init: InitRequestData) {
        let identity = Identity {
            node_id: init.node_id,
            node_ids: init.node_ids,
        };
        match self.identity.set(identity.clone()) {
            Ok(()) => tracing::info!(
                node_id = %identity.node_id,
                cluster_size = identity.node_ids.len(),
                "Node initialized"
            ),
            Err(_) => tracing::warn!(
                node_id = %identity.node_id,
                "Ignoring repeated init, node is already initialized"
            ),
        }
        self.reply(ctx, Payload::InitOk);
    }

    /// Run one request under the request deadline and send its reply.
    async fn dispatch<H: Handler + ?Sized>(
        &self,
        handler: &H,
        ctx: RequestContext,
        payload: Payload,
    ) {
        let start = Instant::now();
        let kind = payload.kind();

        tracing::debug!(
            request_id = %ctx.request_id,
            src = %ctx.src,
            msg_id = ?ctx.msg_id,
            kind,
            "Handling request"
        );

        let result = match timeout(self.request_timeout, route(handler, &ctx, payload)).await {
            Ok(result) => result,
            Err(_) => Err(ErrorResponseData::new(
                ErrorCode::Timeout,
                format!(
                    "{kind} did not complete within {}ms",
                    self.request_timeout.as_millis()
                ),
            )),
        };

        let status = if result.is_ok() { "success" } else { "error" };
        metrics::record_request(kind, status, start.elapsed().as_secs_f64());

        let reply = match result {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    kind,
                    code = err.code,
                    text = %err.text,
                    "Request failed"
                );
                Payload::Error(err)
            }
        };
        self.reply(&ctx, reply);
    }

    /// Answer an undecodable line, when it is addressable.
    fn reject(&self, err: DecodeError) {
        metrics::record_decode_failure(err.code);
        tracing::warn!(code = %err.code, reason = %err.reason, "Rejecting input line");

        if let Some(to) = err.reply_to {
            let ctx = RequestContext::new(to.src, to.dest, Some(to.msg_id));
            self.reply(&ctx, Payload::Error(ErrorResponseData::new(err.code, err.reason)));
        }
    }

    /// Reply to the request described by `ctx`.
    ///
    /// Requests sent without a `msg_id` expect no reply and get none.
    pub fn reply(&self, ctx: &RequestContext, payload: Payload) {
        let Some(in_reply_to) = ctx.msg_id else {
            tracing::debug!(
                src = %ctx.src,
                kind = payload.kind(),
                "Request carried no msg_id, not replying"
            );
            return;
        };
        self.send(Message {
            src: ctx.dest.clone(),
            dest: ctx.src.clone(),
            body: Body {
                msg_id: Some(self.next_msg_id()),
                in_reply_to: Some(in_reply_to),
                payload,
            },
        });
    }

    /// Queue a message for the writer task.
    pub fn send(&self, message: Message) {
        if self.outbound.send(Outbound::Message(message)).is_err() {
            tracing::warn!("Output closed, dropping message");
        }
    }

    fn next_msg_id(&self) -> MsgId {
        self.next_msg_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl RpcClient for Node {
    async fn call(
        &self,
        dest: &str,
        payload: Payload,
        rpc_timeout: Duration,
    ) -> std::result::Result<Payload, RpcError> {
        let src = self.node_id().ok_or(RpcError::NotInitialized)?.to_owned();
        if self.input_closed.load(Ordering::SeqCst) {
            return Err(RpcError::Closed);
        }

        let msg_id = self.next_msg_id();
        let (waiter, reply) = oneshot::channel();
        self.pending.insert(msg_id, waiter);

        let kind = payload.kind();
        tracing::trace!(dest, msg_id, kind, "Sending RPC");
        let message = Message {
            src,
            dest: dest.to_owned(),
            body: Body {
                msg_id: Some(msg_id),
                in_reply_to: None,
                payload,
            },
        };
        if self.outbound.send(Outbound::Message(message)).is_err() {
            self.pending.remove(&msg_id);
            return Err(RpcError::Closed);
        }

        match timeout(rpc_timeout, reply).await {
            Ok(Ok(body)) => Ok(body.payload),
            Ok(Err(_)) => Err(RpcError::Closed),
            Err(_) => {
                self.pending.remove(&msg_id);
                tracing::debug!(dest, msg_id, kind, "RPC timed out");
                Err(RpcError::Timeout {
                    dest: dest.to_owned(),
                    timeout_ms: rpc_timeout.as_millis() as u64,
                })
            }
        }
    }
}

/// Map a request payload to its handler method.
async fn route<H: Handler + ?Sized>(
    handler: &H,
    ctx: &RequestContext,
    payload: Payload,
) -> std::result::Result<Payload, ErrorResponseData> {
    match payload {
        Payload::Send(request) => handler.handle_send(ctx, request).await.map(Payload::SendOk),
        Payload::Poll(request) => handler.handle_poll(ctx, request).await.map(Payload::PollOk),
        Payload::CommitOffsets(request) => handler
            .handle_commit_offsets(ctx, request)
            .await
            .map(Payload::CommitOffsetsOk),
        Payload::ListCommittedOffsets(request) => handler
            .handle_list_committed_offsets(ctx, request)
            .await
            .map(Payload::ListCommittedOffsetsOk),
        other => Err(ErrorResponseData::not_supported(other.kind())),
    }
}

async fn write_loop<W: AsyncWrite + Unpin>(
    writer: W,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) -> Result<()> {
    let mut writer = tokio::io::BufWriter::new(writer);
    while let Some(next) = outbound.recv().await {
        let message = match next {
            Outbound::Message(message) => message,
            Outbound::Shutdown => break,
        };
        let mut line = match encode_message(&message) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, dest = %message.dest, "Failed to encode message");
                continue;
            }
        };
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    writer.flush().await?;
    Ok(())
}

fn log_task_outcome(outcome: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = outcome {
        tracing::error!(error = %e, "Request task failed");
    }
}
