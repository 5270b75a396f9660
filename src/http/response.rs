//! Caller-facing responses.
//!
//! The relay's own status is decoupled from the upstream's: a relayed call
//! always answers `200` with the upstream bytes verbatim, failures answer
//! `400` (see `RelayError`), and anything off the single route answers `404`
//! with an empty body.

use axum::body::{Body, Bytes};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Successful relay: upstream bytes with the relay's own success status.
pub fn relayed(body: Bytes) -> Response {
    (StatusCode::OK, body).into_response()
}

/// Any path other than `/`, or any method other than POST on `/`.
pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Body::empty()).into_response()
}
