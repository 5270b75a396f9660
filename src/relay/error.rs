//! Failures of a single relay call.
//!
//! Every variant is local to one call: it is never retried and never
//! escalates to the server. The caller sees `400 Bad Request` with a
//! plain-text body naming the stage that failed, followed by the underlying
//! error text.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors produced while translating one relay call.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The inbound body could not be read (transport error, deadline, size limit).
    #[error("Error encountered while reading request to proxy: {0}")]
    ReadBody(String),

    /// The inbound body is not a valid envelope.
    #[error("Error encountered while deserializing request to JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// The outbound request could not be constructed.
    #[error("Error from server: {0}")]
    InvalidTarget(String),

    /// The outbound request failed or its response could not be read.
    #[error("Error retrieving response from server: {0}")]
    Upstream(#[from] reqwest::Error),
}

impl RelayError {
    /// Metric label for the stage that failed.
    pub fn outcome(&self) -> &'static str {
        match self {
            RelayError::ReadBody(_) => "read_body",
            RelayError::Decode(_) => "decode",
            RelayError::InvalidTarget(_) => "invalid_target",
            RelayError::Upstream(_) => "upstream",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}
