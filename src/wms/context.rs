//! Per-request state shared between the request and response hooks.
//!
//! ```text
//!   host creates RequestContext
//!            │
//!            ▼
//!   on_request_ready(&mut ctx)        may mark ctx.pending
//!            │
//!      upstream render
//!            │
//!            ▼
//!   on_response_complete(&mut ctx, &mut response)   takes ctx.pending
//! ```
//!
//! The pending-conversion flag lives here rather than on the filter, so a
//! filter shared between concurrent requests never sees another request's
//! flag.

use std::collections::BTreeMap;

use bytes::Bytes;
use http::StatusCode;

use super::params::Parameters;

// =============================================================================
// PendingConversion
// =============================================================================

/// Marks that the response for this request must be transcoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingConversion(bool);

impl PendingConversion {
    pub fn mark(&mut self) {
        self.0 = true;
    }

    pub fn is_pending(&self) -> bool {
        self.0
    }

    /// Consume the flag, leaving it cleared.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.0)
    }
}

// =============================================================================
// RequestContext
// =============================================================================

/// One request's parameters and conversion state.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub params: Parameters,
    pub pending: PendingConversion,
}

impl RequestContext {
    pub fn new(params: Parameters) -> Self {
        Self {
            params,
            pending: PendingConversion::default(),
        }
    }

    /// A parameter value, or `""` when absent.
    pub fn param(&self, name: &str) -> &str {
        self.params.get_or_empty(name)
    }

    /// `SERVICE`, upper-cased.
    pub fn service(&self) -> String {
        self.param("SERVICE").to_ascii_uppercase()
    }

    /// `REQUEST`, upper-cased.
    pub fn operation(&self) -> String {
        self.param("REQUEST").to_ascii_uppercase()
    }
}

// =============================================================================
// ResponseBuffer
// =============================================================================

/// A complete response, open for rewriting before it is sent.
#[derive(Debug, Clone)]
pub struct ResponseBuffer {
    status: StatusCode,
    headers: BTreeMap<String, (String, String)>,
    body: Bytes,
}

impl ResponseBuffer {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Build a buffer with a content type.
    pub fn with_content_type(
        status: StatusCode,
        content_type: &str,
        body: impl Into<Bytes>,
    ) -> Self {
        let mut buffer = Self::new(status, body);
        buffer.set_header(http::header::CONTENT_TYPE.as_str(), content_type);
        buffer
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Set a header, replacing any value under the same (case-insensitive) name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(
            name.to_ascii_lowercase(),
            (name.to_string(), value.into()),
        );
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|(_, v)| v.as_str())
    }

    /// Headers with their original name spelling.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.values().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(http::header::CONTENT_TYPE.as_str())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Replace the whole body.
    pub fn replace_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Split into status, headers and body.
    pub fn into_parts(self) -> (StatusCode, Vec<(String, String)>, Bytes) {
        let headers = self.headers.into_values().collect();
        (self.status, headers, self.body)
    }
}
