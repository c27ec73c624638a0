//! Commit request handling (commit and list committed).

use crate::server::HandlerResult;
use crate::server::request::{CommitOffsetsRequestData, ListCommittedOffsetsRequestData};
use crate::server::response::{CommitOffsetsResponseData, ListCommittedOffsetsResponseData};

use super::LogHandler;
use crate::cluster::store::KeyValueStore;

/// Handle a commit offsets request.
pub(super) async fn handle_commit_offsets<S: KeyValueStore + ?Sized>(
    handler: &LogHandler<S>,
    request: CommitOffsetsRequestData,
) -> HandlerResult<CommitOffsetsResponseData> {
    handler.commits.commit(&request.offsets).await?;
    Ok(CommitOffsetsResponseData {})
}

/// Handle a list committed offsets request.
pub(super) async fn handle_list_committed_offsets<S: KeyValueStore + ?Sized>(
    handler: &LogHandler<S>,
    request: ListCommittedOffsetsRequestData,
) -> HandlerResult<ListCommittedOffsetsResponseData> {
    let offsets = handler.commits.list_committed(&request.keys).await?;
    Ok(ListCommittedOffsetsResponseData { offsets })
}
