use http::{HeaderValue, Response, StatusCode, header};

use super::body::PermitBody;
use crate::{Gate, Rejection};

/// Builds the reply for a request that did not get a slot.
///
/// `QueueFull` and `WaitTimeout` get `503`, `Retry-After` and a JSON message.
/// `Aborted` gets a bare `503`: the peer is gone and nothing more is worth sending.
pub(super) fn busy_response<B>(gate: &Gate, rejection: &Rejection) -> Response<PermitBody<B>>
where
    B: From<String>,
{
    let Some(retry_after) = rejection.retry_after() else {
        return aborted_response();
    };

    let body = serde_json::json!({ "message": gate.config().busy_message }).to_string();
    let mut res = Response::new(PermitBody::unguarded(B::from(body)));
    *res.status_mut() = StatusCode::SERVICE_UNAVAILABLE;

    let headers = res.headers_mut();
    headers.insert(
        header::RETRY_AFTER,
        HeaderValue::from(retry_after.as_secs().max(1)),
    );
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    res
}

pub(super) fn aborted_response<B>() -> Response<PermitBody<B>>
where
    B: From<String>,
{
    let mut res = Response::new(PermitBody::unguarded(B::from(String::new())));
    *res.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
    res
}
