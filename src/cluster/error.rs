//! Error types for the log subsystem.
//!
//! # Error Handling Patterns
//!
//! ## Fail-Fast (Propagate Errors)
//!
//! - Offset allocation that cannot reach the store before the deadline
//! - Record writes (a failed write spends its offset and must be reported)
//! - Commit marker writes
//! - Latest-marker reads during poll
//!
//! ## Best-Effort (Log and Continue)
//!
//! - Individual record reads during poll: a record that cannot be read is
//!   skipped as a gap, the rest of the poll proceeds
//!
//! ## Retries
//!
//! Compare-and-swap conflicts never leave the allocator. Store timeouts are
//! retried by the allocator and by idempotent reads; everything else is
//! surfaced as an `error` reply with the code from [`LogError::to_error_code`].

use thiserror::Error;

use crate::error::ErrorCode;
use crate::server::response::ErrorResponseData;

/// Failures talking to the coordination store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store did not answer in time. The operation may have been applied.
    #[error("store {operation} of {key} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        key: String,
        timeout_ms: u64,
    },

    /// The store answered with an error code this client does not absorb.
    #[error("store {operation} of {key} failed with code {code}: {text}")]
    Remote {
        operation: &'static str,
        key: String,
        code: i32,
        text: String,
    },

    /// The store answered with a message of the wrong type.
    #[error("store {operation} got unexpected reply {reply}")]
    UnexpectedReply {
        operation: &'static str,
        reply: &'static str,
    },

    /// The store cannot be reached at all.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Map to the wire error code reported to clients.
    pub fn to_error_code(&self) -> ErrorCode {
        match self {
            StoreError::Timeout { .. } => ErrorCode::Timeout,
            StoreError::Remote { code, .. } => {
                ErrorCode::from_code(*code).unwrap_or(ErrorCode::Crash)
            }
            StoreError::UnexpectedReply { .. } => ErrorCode::Crash,
            StoreError::Unavailable(_) => ErrorCode::TemporarilyUnavailable,
        }
    }

    /// Whether retrying the same operation may succeed.
    pub fn is_retriable(&self) -> bool {
        match self {
            StoreError::Timeout { .. } => true,
            StoreError::Remote { code, .. } => match ErrorCode::from_code(*code) {
                Some(ErrorCode::TemporarilyUnavailable) => true,
                Some(known) => !known.is_definite(),
                None => false,
            },
            StoreError::UnexpectedReply { .. } => false,
            StoreError::Unavailable(_) => false,
        }
    }
}

/// Failures of a log operation (append, poll, commit, list).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The operation kept retrying until its deadline passed.
    #[error("{operation} on partition {partition} exceeded its {timeout_ms}ms deadline")]
    DeadlineExceeded {
        operation: &'static str,
        partition: String,
        timeout_ms: u64,
    },

    /// The request itself is unacceptable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl LogError {
    /// Map to the wire error code reported to clients.
    pub fn to_error_code(&self) -> ErrorCode {
        match self {
            LogError::Store(e) => e.to_error_code(),
            LogError::DeadlineExceeded { .. } => ErrorCode::Timeout,
            LogError::InvalidRequest(_) => ErrorCode::MalformedRequest,
        }
    }

    /// Whether the client may retry the whole request.
    pub fn is_retriable(&self) -> bool {
        match self {
            LogError::Store(e) => e.is_retriable(),
            LogError::DeadlineExceeded { .. } => true,
            LogError::InvalidRequest(_) => false,
        }
    }
}

impl From<LogError> for ErrorResponseData {
    fn from(err: LogError) -> Self {
        ErrorResponseData::new(err.to_error_code(), err.to_string())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type LogResult<T> = std::result::Result<T, LogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_timeout_is_retriable() {
        let err = StoreError::Timeout {
            operation: "cas",
            key: "latest_p".to_string(),
            timeout_ms: 1000,
        };
        assert!(err.is_retriable());
        assert_eq!(err.to_error_code(), ErrorCode::Timeout);
    }

    #[test]
    fn test_remote_codes_pass_through() {
        let err = StoreError::Remote {
            operation: "write",
            key: "log_p_0".to_string(),
            code: 11,
            text: "busy".to_string(),
        };
        assert_eq!(err.to_error_code(), ErrorCode::TemporarilyUnavailable);
        assert!(err.is_retriable());

        let err = StoreError::Remote {
            operation: "write",
            key: "log_p_0".to_string(),
            code: 14,
            text: "abort".to_string(),
        };
        assert_eq!(err.to_error_code(), ErrorCode::Abort);
        assert!(!err.is_retriable());
    }

    #[test]
    fn test_unknown_remote_code_is_crash() {
        let err = StoreError::Remote {
            operation: "read",
            key: "commit_p".to_string(),
            code: 1234,
            text: "custom".to_string(),
        };
        assert_eq!(err.to_error_code(), ErrorCode::Crash);
    }

    #[test]
    fn test_log_error_to_response() {
        let response: ErrorResponseData = LogError::InvalidRequest("empty key".to_string()).into();
        assert_eq!(response.code, 12);
        assert!(response.text.contains("empty key"));

        let response: ErrorResponseData = LogError::DeadlineExceeded {
            operation: "allocate",
            partition: "p".to_string(),
            timeout_ms: 5000,
        }
        .into();
        assert_eq!(response.error_code(), Some(ErrorCode::Timeout));
    }

    #[test]
    fn test_store_error_converts_into_log_error() {
        let log_err: LogError = StoreError::Unavailable("closed".to_string()).into();
        assert_eq!(log_err.to_error_code(), ErrorCode::TemporarilyUnavailable);
        assert!(!log_err.is_retriable());
        assert_eq!(log_err.to_string(), "store unavailable: closed");
    }
}
