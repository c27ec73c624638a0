//! Crate & protocol level errors.
//!
//! This module provides the top-level error types for an offsetlog node.
//!
//! # Error Hierarchy
//!
//! The crate uses a two-layer error hierarchy:
//!
//! ## Protocol Layer (`crate::error`)
//!
//! - [`Error`]: I/O, message decoding and configuration errors
//! - [`ErrorCode`]: Numeric error codes carried by `error` replies on the wire
//!
//! ## Log Layer (`crate::cluster::error`)
//!
//! - [`StoreError`]: failures talking to the coordination store
//! - [`LogError`]: failures of a log operation (append, poll, commit)
//! - Both have `to_error_code()` for mapping to [`ErrorCode`]
//!
//! [`StoreError`]: crate::cluster::StoreError
//! [`LogError`]: crate::cluster::LogError

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::{fmt, io, result};
use thiserror::Error as ThisError;

pub type Result<T> = result::Result<T, Error>;

/// Protocol and process level errors.
///
/// These are low-level errors that occur during:
/// - Reading or writing the message streams
/// - Decoding message envelopes
/// - Loading configuration
///
/// For store and log operation errors, see [`crate::cluster::LogError`].
#[derive(Clone, Debug, ThisError)]
pub enum Error {
    /// An error on the input or output stream.
    #[error("IO error: {0:?}")]
    IoError(io::ErrorKind),

    /// Could not parse the data.
    #[error("Parsing error: {0}")]
    ParsingError(String),

    /// Missing data or stream closed.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Error::IoError(a), Error::IoError(b)) => a == b,
            (Error::ParsingError(a), Error::ParsingError(b)) => a == b,
            (Error::MissingData(a), Error::MissingData(b)) => a == b,
            (Error::Config(a), Error::Config(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::IoError(e.kind())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::ParsingError(e.to_string())
    }
}

/// Error codes carried in `error` reply bodies.
///
/// Codes below 1000 are reserved by the cluster protocol. A *definite* error
/// means the requested operation certainly did not take place; an indefinite
/// one (timeout, crash) means it may or may not have.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, FromPrimitive)]
pub enum ErrorCode {
    /// The requested operation did not complete in time.
    Timeout = 0,
    /// The addressed node does not exist.
    NodeNotFound = 1,
    /// The request type is not supported by this node.
    NotSupported = 10,
    /// The operation cannot be performed right now; retrying may help.
    TemporarilyUnavailable = 11,
    /// The request body could not be understood.
    MalformedRequest = 12,
    /// A general, indefinite failure.
    Crash = 13,
    /// A general, definite failure.
    Abort = 14,
    /// The key does not exist in the store.
    KeyDoesNotExist = 20,
    /// The key already exists in the store.
    KeyAlreadyExists = 21,
    /// A compare-and-swap precondition did not hold.
    PreconditionFailed = 22,
    /// A transaction was aborted due to a conflict.
    TxnConflict = 30,
}

impl ErrorCode {
    /// The numeric wire representation.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Decode a numeric wire code. Unknown codes yield `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        FromPrimitive::from_i32(code)
    }

    /// Whether the failed operation is known not to have happened.
    pub fn is_definite(self) -> bool {
        !matches!(self, ErrorCode::Timeout | ErrorCode::Crash)
    }

    /// Short kebab-case name, as used in logs and metrics.
    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::Timeout => "timeout",
            ErrorCode::NodeNotFound => "node-not-found",
            ErrorCode::NotSupported => "not-supported",
            ErrorCode::TemporarilyUnavailable => "temporarily-unavailable",
            ErrorCode::MalformedRequest => "malformed-request",
            ErrorCode::Crash => "crash",
            ErrorCode::Abort => "abort",
            ErrorCode::KeyDoesNotExist => "key-does-not-exist",
            ErrorCode::KeyAlreadyExists => "key-already-exists",
            ErrorCode::PreconditionFailed => "precondition-failed",
            ErrorCode::TxnConflict => "txn-conflict",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}
