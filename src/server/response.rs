//! Reply bodies produced by a node or received from the store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::types::{Offset, Value};

/// `send_ok`: the offset the appended value was stored at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResponseData {
    pub offset: Offset,
}

/// `poll_ok`: `[offset, value]` pairs per partition, in offset order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResponseData {
    pub msgs: BTreeMap<String, Vec<(Offset, Value)>>,
}

/// `commit_offsets_ok` carries no fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOffsetsResponseData {}

/// `list_committed_offsets_ok`: commit markers of the requested partitions
/// that have ever been committed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListCommittedOffsetsResponseData {
    pub offsets: BTreeMap<String, Offset>,
}

/// Store `read_ok`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadResponseData {
    pub value: Value,
}

/// `error` reply body.
///
/// `code` stays a raw integer on the wire so replies from peers using
/// application-defined codes (>= 1000) still decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponseData {
    pub code: i32,
    #[serde(default)]
    pub text: String,
}

impl ErrorResponseData {
    pub fn new(code: ErrorCode, text: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            text: text.into(),
        }
    }

    /// Reply for request kinds this node does not serve.
    pub fn not_supported(kind: &str) -> Self {
        Self::new(
            ErrorCode::NotSupported,
            format!("request type {kind} is not supported"),
        )
    }

    /// The decoded error code, if it is one of the reserved codes.
    pub fn error_code(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_constructors() {
        let err = ErrorResponseData::not_supported("echo");
        assert_eq!(err.error_code(), Some(ErrorCode::NotSupported));
        assert!(err.text.contains("echo"));

        let err = ErrorResponseData::new(ErrorCode::MalformedRequest, "missing key");
        assert_eq!(err.code, 12);
    }

    #[test]
    fn test_error_response_custom_code() {
        let err = ErrorResponseData {
            code: 1001,
            text: "custom".to_string(),
        };
        assert_eq!(err.error_code(), None);
    }

    #[test]
    fn test_poll_response_pairs_serialize_as_arrays() {
        let mut msgs = BTreeMap::new();
        msgs.insert("p".to_string(), vec![(Offset(0), 10), (Offset(1), 20)]);
        let json = serde_json::to_string(&PollResponseData { msgs }).unwrap();
        assert_eq!(json, r#"{"msgs":{"p":[[0,10],[1,20]]}}"#);
    }
}
