//! Request identification.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every inbound request
//! - Keep a caller-supplied `x-request-id` untouched
//! - Keep generated IDs out of the headers forwarded upstream
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The ID is echoed on the response; only a caller-supplied one is
//!   forwarded upstream with the other inbound headers

use axum::http::{Extensions, HeaderMap, HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request ID.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates v4 UUID request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Whether the caller sent its own `x-request-id`.
///
/// Recorded before `SetRequestIdLayer` writes a generated ID into the
/// request headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerRequestId(pub bool);

/// Record whether `request` arrived with an `x-request-id` header.
pub fn mark_caller_request_id<B>(mut request: Request<B>) -> Request<B> {
    let supplied = request.headers().contains_key(&X_REQUEST_ID);
    request.extensions_mut().insert(CallerRequestId(supplied));
    request
}

/// Drop the `x-request-id` header if the relay generated it.
///
/// Without a [`CallerRequestId`] marker the headers are left as they are.
pub fn strip_generated_request_id(headers: &mut HeaderMap, extensions: &Extensions) {
    if let Some(CallerRequestId(false)) = extensions.get::<CallerRequestId>() {
        headers.remove(&X_REQUEST_ID);
    }
}

/// Request ID of `request`, or `"unknown"` if none was assigned.
pub fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}
