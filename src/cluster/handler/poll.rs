//! Poll request handling.

use crate::server::request::PollRequestData;
use crate::server::response::PollResponseData;
use crate::server::{HandlerResult, RequestContext};

use super::LogHandler;
use crate::cluster::store::KeyValueStore;

/// Handle a poll request.
pub(super) async fn handle_poll<S: KeyValueStore + ?Sized>(
    handler: &LogHandler<S>,
    _ctx: &RequestContext,
    request: PollRequestData,
) -> HandlerResult<PollResponseData> {
    let msgs = handler.reader.poll(&request.offsets).await?;
    Ok(PollResponseData { msgs })
}
