//! Message envelope and line codec.
//!
//! Every message is one JSON document on its own line:
//!
//! ```text
//! {"src":"c1","dest":"n1","body":{"type":"send","msg_id":7,"key":"k1","msg":42}}
//! ```
//!
//! The body always carries a `type`, optionally a `msg_id`, and for replies
//! an `in_reply_to` naming the request's `msg_id`. The remaining fields are
//! the payload for that type, see [`Payload`].
//!
//! # Decode failures
//!
//! [`decode_message`] classifies failures so the node can answer them:
//! - an unknown `type` is [`ErrorCode::NotSupported`]
//! - a known `type` with missing or mistyped fields is
//!   [`ErrorCode::MalformedRequest`]
//! - a line that is not a JSON envelope at all cannot be answered and is
//!   only logged

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, Result};
use crate::server::request::*;
use crate::server::response::*;
use crate::types::{MsgId, NodeId};

/// Every body `type` this node can decode.
pub const KNOWN_BODY_TYPES: &[&str] = &[
    "init",
    "init_ok",
    "send",
    "send_ok",
    "poll",
    "poll_ok",
    "commit_offsets",
    "commit_offsets_ok",
    "list_committed_offsets",
    "list_committed_offsets_ok",
    "read",
    "read_ok",
    "write",
    "write_ok",
    "cas",
    "cas_ok",
    "error",
];

/// A message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub src: NodeId,
    pub dest: NodeId,
    pub body: Body,
}

/// A message body: correlation ids plus the typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<MsgId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<MsgId>,
    #[serde(flatten)]
    pub payload: Payload,
}

/// Typed message payloads, discriminated by the body's `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    Init(InitRequestData),
    InitOk,
    Send(SendRequestData),
    SendOk(SendResponseData),
    Poll(PollRequestData),
    PollOk(PollResponseData),
    CommitOffsets(CommitOffsetsRequestData),
    CommitOffsetsOk(CommitOffsetsResponseData),
    ListCommittedOffsets(ListCommittedOffsetsRequestData),
    ListCommittedOffsetsOk(ListCommittedOffsetsResponseData),
    Read(ReadRequestData),
    ReadOk(ReadResponseData),
    Write(WriteRequestData),
    WriteOk,
    Cas(CasRequestData),
    CasOk,
    Error(ErrorResponseData),
}

impl Payload {
    /// The wire `type` of this payload.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Init(_) => "init",
            Payload::InitOk => "init_ok",
            Payload::Send(_) => "send",
            Payload::SendOk(_) => "send_ok",
            Payload::Poll(_) => "poll",
            Payload::PollOk(_) => "poll_ok",
            Payload::CommitOffsets(_) => "commit_offsets",
            Payload::CommitOffsetsOk(_) => "commit_offsets_ok",
            Payload::ListCommittedOffsets(_) => "list_committed_offsets",
            Payload::ListCommittedOffsetsOk(_) => "list_committed_offsets_ok",
            Payload::Read(_) => "read",
            Payload::ReadOk(_) => "read_ok",
            Payload::Write(_) => "write",
            Payload::WriteOk => "write_ok",
            Payload::Cas(_) => "cas",
            Payload::CasOk => "cas_ok",
            Payload::Error(_) => "error",
        }
    }
}

/// A line that could not be decoded into a [`Message`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeError {
    /// How the failure should be reported.
    pub code: ErrorCode,
    /// Human-readable reason.
    pub reason: String,
    /// Where an error reply should go: the sender, the node it addressed,
    /// and the request's `msg_id`. `None` when the envelope itself was
    /// unreadable or the message carried no `msg_id`.
    pub reply_to: Option<ReplyAddress>,
}

/// Addressing recovered from an undecodable request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyAddress {
    pub src: NodeId,
    pub dest: NodeId,
    pub msg_id: MsgId,
}

/// Decode one input line into a [`Message`].
pub fn decode_message(line: &str) -> std::result::Result<Message, DecodeError> {
    let raw: serde_json::Value = serde_json::from_str(line).map_err(|e| DecodeError {
        code: ErrorCode::MalformedRequest,
        reason: format!("invalid JSON: {e}"),
        reply_to: None,
    })?;

    let body_type = raw
        .pointer("/body/type")
        .and_then(|v| v.as_str())
        .map(str::to_owned);

    match serde_json::from_value::<Message>(raw.clone()) {
        Ok(message) => Ok(message),
        Err(e) => {
            let code = match body_type.as_deref() {
                Some(kind) if !KNOWN_BODY_TYPES.contains(&kind) => ErrorCode::NotSupported,
                _ => ErrorCode::MalformedRequest,
            };
            let reason = match (code, body_type) {
                (ErrorCode::NotSupported, Some(kind)) => {
                    format!("request type {kind} is not supported")
                }
                _ => format!("malformed message: {e}"),
            };
            Err(DecodeError {
                code,
                reason,
                reply_to: reply_address(&raw),
            })
        }
    }
}

/// Recover enough of an envelope to address an error reply.
fn reply_address(raw: &serde_json::Value) -> Option<ReplyAddress> {
    Some(ReplyAddress {
        src: raw.get("src")?.as_str()?.to_owned(),
        dest: raw.get("dest")?.as_str()?.to_owned(),
        msg_id: raw.pointer("/body/msg_id")?.as_u64()?,
    })
}

/// Encode a message as a single line (without the trailing newline).
pub fn encode_message(message: &Message) -> Result<String> {
    Ok(serde_json::to_string(message)?)
}
