//! Envelope → outbound request → relayed bytes.
//!
//! # Responsibilities
//! - Decode the inbound envelope
//! - Build the outbound request (method inference, header policy)
//! - Execute it under the end-to-end upstream deadline
//! - Buffer the upstream body for the caller
//!
//! # Design Decisions
//! - One `reqwest::Client` (and connection pool) per translator; each call
//!   builds and owns its own request and buffers
//! - The upstream status code is logged, not propagated
//! - No retries: the first failure ends the call

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue};
use url::Url;

use crate::relay::envelope::RelayEnvelope;
use crate::relay::error::RelayError;

/// Inbound headers that describe the inbound connection or message framing.
/// The outbound client computes its own values for these.
const HOP_BY_HOP: &[&str] = &[
    "host",
    "content-length",
    "transfer-encoding",
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "upgrade",
];

/// Derive the outbound header set from the inbound one.
///
/// Only the first value of a multi-valued inbound header is kept.
/// `Content-Type` is always taken from the envelope, even when empty.
pub fn outbound_headers(inbound: &HeaderMap, content_type: &str) -> Result<HeaderMap, RelayError> {
    let mut headers = HeaderMap::with_capacity(inbound.keys_len() + 1);

    for name in inbound.keys() {
        if name == header::CONTENT_TYPE || HOP_BY_HOP.contains(&name.as_str()) {
            continue;
        }
        if let Some(value) = inbound.get(name) {
            headers.insert(name.clone(), value.clone());
        }
    }

    let value = HeaderValue::from_str(content_type).map_err(|e| {
        RelayError::InvalidTarget(format!("invalid content type {:?}: {}", content_type, e))
    })?;
    headers.insert(header::CONTENT_TYPE, value);

    Ok(headers)
}

/// Performs relay calls on behalf of callers.
#[derive(Debug, Clone)]
pub struct Translator {
    client: reqwest::Client,
}

impl Translator {
    /// Create a translator whose outbound calls are bounded by `upstream_timeout`.
    pub fn new(upstream_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(upstream_timeout)
            .build()?;

        Ok(Self { client })
    }

    /// Run one relay call: decode, build, execute, buffer.
    pub async fn translate(&self, inbound: &HeaderMap, body: Bytes) -> Result<Bytes, RelayError> {
        let envelope = RelayEnvelope::decode(&body)?;
        let request = self.build_request(&envelope, inbound)?;
        self.execute(request).await
    }

    /// Build the outbound request for `envelope`.
    pub fn build_request(
        &self,
        envelope: &RelayEnvelope,
        inbound: &HeaderMap,
    ) -> Result<reqwest::Request, RelayError> {
        let url = Url::parse(&envelope.url).map_err(|e| {
            RelayError::InvalidTarget(format!("parse {:?}: {}", envelope.url, e))
        })?;
        let headers = outbound_headers(inbound, &envelope.content_type)?;

        let mut builder = self.client.request(envelope.method(), url).headers(headers);
        if !envelope.body.is_empty() {
            builder = builder.body(envelope.body.clone());
        }

        builder
            .build()
            .map_err(|e| RelayError::InvalidTarget(e.to_string()))
    }

    /// Send `request` and buffer the full response body.
    pub async fn execute(&self, request: reqwest::Request) -> Result<Bytes, RelayError> {
        let method = request.method().clone();
        let target = request.url().clone();

        let response = self.client.execute(request).await?;
        let status = response.status();
        let body = response.bytes().await?;

        tracing::debug!(
            method = %method,
            target = %target,
            upstream_status = status.as_u16(),
            bytes = body.len(),
            "Upstream response received"
        );

        Ok(body)
    }
}
