//! Request dispatch from wire envelopes to the broker

use crate::broker::Broker;
use crate::queue::{QueueError, QueueResult};
use crate::wire::{Request, WireResponse};

/// Validate `body`, run it against `broker` and build the response envelope
///
/// Never fails: rejected requests and engine errors both become the generic
/// failure response.
pub async fn dispatch(broker: &Broker, body: &[u8]) -> WireResponse {
    let request = match Request::parse(body) {
        Ok(request) => request,
        Err(e) => {
            log::warn!("Rejected request: {}", e);
            return WireResponse::failure();
        }
    };

    let api = request.api();
    let queue_id = request.queue_id().to_string();
    match execute(broker, request).await {
        Ok(response) => response,
        Err(e) if e.is_not_found() => {
            log::debug!("{} on {}: {}", api, queue_id, e);
            WireResponse::failure()
        }
        Err(e) => {
            log::warn!("{} on {} failed: {}", api, queue_id, e);
            WireResponse::failure()
        }
    }
}

async fn execute(broker: &Broker, request: Request) -> QueueResult<WireResponse> {
    match request {
        Request::SetOptions { queue_id, options } => {
            broker.set_options(&queue_id, &options)?;
        }
        Request::Claim {
            queue_id,
            owner,
            group_id,
        } => {
            broker.claim(&queue_id, &owner, &group_id)?;
        }
        Request::Send { queue_id, message } => {
            broker.send(&queue_id, message)?;
        }
        Request::Receive { queue_id, owner } => {
            let messages = broker.receive(&queue_id, &owner).await?;
            let result = serde_json::to_value(messages).map_err(|e| QueueError::OperationFailed {
                message: format!("encoding receive result: {}", e),
            })?;
            return Ok(WireResponse::with_result(result));
        }
        Request::Remove { queue_id, message } => {
            broker.remove(&queue_id, &message)?;
        }
    }
    Ok(WireResponse::ok())
}
