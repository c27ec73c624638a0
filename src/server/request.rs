//! Request bodies understood by a node.
//!
//! Client requests (`send`, `poll`, `commit_offsets`,
//! `list_committed_offsets`), the `init` handshake, and the requests a node
//! itself issues to the coordination store (`read`, `write`, `cas`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{NodeId, Offset, Value};

/// `init`: tells a node its own id and the ids of every node in the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitRequestData {
    pub node_id: NodeId,
    #[serde(default)]
    pub node_ids: Vec<NodeId>,
}

/// `send`: append `msg` to partition `key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequestData {
    pub key: String,
    pub msg: Value,
}

/// `poll`: read every partition in `offsets` from the given start offset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollRequestData {
    pub offsets: BTreeMap<String, Offset>,
}

/// `commit_offsets`: record consumption progress per partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOffsetsRequestData {
    pub offsets: BTreeMap<String, Offset>,
}

/// `list_committed_offsets`: report commit markers for `keys`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListCommittedOffsetsRequestData {
    pub keys: Vec<String>,
}

/// Store `read` of a single key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadRequestData {
    pub key: String,
}

/// Store `write` of a single key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRequestData {
    pub key: String,
    pub value: Value,
}

/// Store compare-and-swap of a single key.
///
/// With `create_if_not_exists` set and the key absent, the store creates the
/// key with value `to` regardless of `from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasRequestData {
    pub key: String,
    pub from: Value,
    pub to: Value,
    #[serde(default)]
    pub create_if_not_exists: bool,
}
