//! Store key layout.
//!
//! The coordination store has a single flat string key space. The log keeps
//! three logical tables in it, distinguished by prefix:
//!
//! ## Latest-offset markers
//!
//! Format: `latest_<partition>`
//! - Value: the number of offsets allocated so far, i.e. the next offset
//! - Absent until the first append to the partition
//!
//! ## Records
//!
//! Format: `log_<partition>_<offset>`
//! - Value: the appended integer
//! - The offset is the decimal text after the last `_`, so partitions may
//!   themselves contain underscores
//!
//! ## Commit markers
//!
//! Format: `commit_<partition>`
//! - Value: the last committed offset (last write wins)
//!
//! Everything above the store client works with [`StoreKey`]; the flat
//! string form exists only on the wire.

use std::fmt;

use crate::constants::{
    COMMIT_KEY_PREFIX, LATEST_KEY_PREFIX, RECORD_KEY_PREFIX, RECORD_OFFSET_SEPARATOR,
};
use crate::types::Offset;

/// A structured store key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreKey {
    /// The partition's latest-offset marker.
    Latest(String),
    /// One record of a partition.
    Record(String, Offset),
    /// The partition's commit marker.
    Commit(String),
}

impl StoreKey {
    pub fn latest(partition: impl Into<String>) -> Self {
        StoreKey::Latest(partition.into())
    }

    pub fn record(partition: impl Into<String>, offset: Offset) -> Self {
        StoreKey::Record(partition.into(), offset)
    }

    pub fn commit(partition: impl Into<String>) -> Self {
        StoreKey::Commit(partition.into())
    }

    /// Parse a flat store key back into its structured form.
    ///
    /// Returns `None` for keys outside the three tables, for empty
    /// partitions and for record keys without a valid offset.
    pub fn parse(key: &str) -> Option<Self> {
        if let Some(partition) = key.strip_prefix(LATEST_KEY_PREFIX) {
            return non_empty(partition).map(StoreKey::latest);
        }
        if let Some(partition) = key.strip_prefix(COMMIT_KEY_PREFIX) {
            return non_empty(partition).map(StoreKey::commit);
        }
        let rest = key.strip_prefix(RECORD_KEY_PREFIX)?;
        let (partition, offset) = rest.rsplit_once(RECORD_OFFSET_SEPARATOR)?;
        let offset: i64 = offset.parse().ok()?;
        if offset < 0 || offset.to_string().len() != rest.len() - partition.len() - 1 {
            return None;
        }
        non_empty(partition).map(|p| StoreKey::record(p, Offset(offset)))
    }
}

fn non_empty(partition: &str) -> Option<&str> {
    (!partition.is_empty()).then_some(partition)
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKey::Latest(p) => write!(f, "{LATEST_KEY_PREFIX}{p}"),
            StoreKey::Record(p, offset) => {
                write!(f, "{RECORD_KEY_PREFIX}{p}{RECORD_OFFSET_SEPARATOR}{offset}")
            }
            StoreKey::Commit(p) => write!(f, "{COMMIT_KEY_PREFIX}{p}"),
        }
    }
}

/// Check that a client-supplied partition key can be stored.
pub fn validate_partition_key(partition: &str) -> Result<(), String> {
    if partition.is_empty() {
        return Err("partition key must not be empty".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_key_format() {
        assert_eq!(StoreKey::latest("k1").to_string(), "latest_k1");
        assert_eq!(StoreKey::record("k1", Offset(42)).to_string(), "log_k1_42");
        assert_eq!(StoreKey::commit("k1").to_string(), "commit_k1");
    }

    #[test]
    fn test_parse_known_tables() {
        assert_eq!(StoreKey::parse("latest_k1"), Some(StoreKey::latest("k1")));
        assert_eq!(StoreKey::parse("commit_k1"), Some(StoreKey::commit("k1")));
        assert_eq!(
            StoreKey::parse("log_k1_7"),
            Some(StoreKey::record("k1", Offset(7)))
        );
    }

    #[test]
    fn test_parse_partition_with_separator() {
        let key = StoreKey::record("orders_eu_1", Offset(3));
        assert_eq!(key.to_string(), "log_orders_eu_1_3");
        assert_eq!(StoreKey::parse(&key.to_string()), Some(key));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(StoreKey::parse("latest_"), None);
        assert_eq!(StoreKey::parse("log_k1"), None);
        assert_eq!(StoreKey::parse("log_k1_x"), None);
        assert_eq!(StoreKey::parse("log_k1_-1"), None);
        assert_eq!(StoreKey::parse("log_k1_+1"), None);
        assert_eq!(StoreKey::parse("log__3"), None);
        assert_eq!(StoreKey::parse("other_k1"), None);
    }

    #[test]
    fn test_validate_partition_key() {
        assert!(validate_partition_key("p").is_ok());
        assert!(validate_partition_key("").is_err());
    }
}
