//! The JSON envelope a caller posts to the relay.

use axum::http::Method;
use serde::{Deserialize, Serialize};

use crate::relay::error::RelayError;

/// Description of the outbound call the caller wants performed.
///
/// Wire form: `{"url": "...", "body": "...", "content_type": "..."}`.
/// An empty `body` means "no payload" and turns the call into a GET.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RelayEnvelope {
    /// Absolute URL of the upstream target.
    pub url: String,

    #[serde(default)]
    pub body: String,

    /// Value forced onto the outbound `Content-Type` header.
    #[serde(default)]
    pub content_type: String,
}

impl RelayEnvelope {
    /// Decode an envelope from the raw inbound body.
    pub fn decode(raw: &[u8]) -> Result<Self, RelayError> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// GET when there is no payload, POST otherwise.
    pub fn method(&self) -> Method {
        if self.body.is_empty() {
            Method::GET
        } else {
            Method::POST
        }
    }
}
