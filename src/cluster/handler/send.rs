//! Append request handling.

use tracing::debug;

use crate::server::request::SendRequestData;
use crate::server::response::SendResponseData;
use crate::server::{HandlerResult, RequestContext};

use super::LogHandler;
use crate::cluster::store::KeyValueStore;

/// Handle a send request.
///
/// Replies only after the record is stored, so the returned offset is
/// always readable by a later poll on any node.
pub(super) async fn handle_send<S: KeyValueStore + ?Sized>(
    handler: &LogHandler<S>,
    ctx: &RequestContext,
    request: SendRequestData,
) -> HandlerResult<SendResponseData> {
    let offset = handler.append(&request.key, request.msg).await?;
    debug!(
        request_id = %ctx.request_id,
        partition = %request.key,
        %offset,
        "Appended record"
    );
    Ok(SendResponseData { offset })
}
