//! Type-safe wrappers for log protocol primitives.
//!
//! These newtypes provide type safety to prevent mixing up different
//! integers that have the same underlying representation but different
//! semantic meanings (an offset is not a record value).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node or service in the cluster (e.g. `n1`, `c4`, `lin-kv`).
pub type NodeId = String;

/// Per-sender message identifier used to correlate requests and replies.
pub type MsgId = u64;

/// A record value. The log stores integers.
pub type Value = i64;

/// A message offset within a partition.
///
/// Offsets are zero-based, contiguous positions in a partition's log.
/// Negative offsets never name a record; incoming negative start offsets
/// are clamped to [`Offset::ZERO`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Offset(pub i64);

impl Offset {
    /// The first offset of every partition.
    pub const ZERO: Self = Offset(0);

    /// Create a new offset from a raw value.
    #[inline]
    pub const fn new(value: i64) -> Self {
        Offset(value)
    }

    /// Get the raw i64 value.
    #[inline]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Clamp negative offsets to zero.
    #[inline]
    pub const fn clamp_to_zero(self) -> Self {
        if self.0 < 0 { Offset::ZERO } else { self }
    }
}

impl From<i64> for Offset {
    fn from(value: i64) -> Self {
        Offset(value)
    }
}

impl From<Offset> for i64 {
    fn from(offset: Offset) -> Self {
        offset.0
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
