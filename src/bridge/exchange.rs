//! Data carried across the bridge: the captured request, the event published
//! for it, and the response an external handler supplies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::bridge::id::RequestId;

/// Media type used when a body is supplied without an explicit type.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Inbound request, captured once on arrival and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestData {
    pub method: String,
    /// Full request target, query string included.
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub params: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl RequestData {
    /// Build the outbound event for this request.
    pub fn into_event(self, request_id: RequestId) -> RequestEvent {
        RequestEvent {
            request_id,
            method: self.method,
            path: self.path,
            body: self.body,
            headers: encode_map(&self.headers),
            params: encode_map(&self.params),
        }
    }
}

fn encode_map(map: &BTreeMap<String, String>) -> String {
    serde_json::to_string(map).unwrap_or_else(|_| String::from("{}"))
}

/// The "request arrived" event handed to the external handler.
///
/// `headers` and `params` are JSON-encoded string-to-string maps so the event
/// stays flat for consumers on the far side of a process boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEvent {
    pub request_id: RequestId,
    pub method: String,
    pub path: String,
    pub body: Option<String>,
    pub headers: String,
    pub params: String,
}

impl RequestEvent {
    pub fn headers_map(&self) -> Result<BTreeMap<String, String>, serde_json::Error> {
        serde_json::from_str(&self.headers)
    }

    pub fn params_map(&self) -> Result<BTreeMap<String, String>, serde_json::Error> {
        serde_json::from_str(&self.params)
    }
}

/// Response supplied by the external handler for one exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponseData {
    pub status_code: u16,
    /// Advisory reason phrase.
    pub status_description: String,
    /// Falls back to [`DEFAULT_CONTENT_TYPE`] for text bodies.
    pub content_type: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    /// Local path (optionally `file://`-prefixed). Takes precedence over `body`
    /// when the file exists.
    pub file: Option<String>,
}

impl Default for ResponseData {
    fn default() -> Self {
        Self {
            status_code: 200,
            status_description: "OK".to_string(),
            content_type: None,
            headers: BTreeMap::new(),
            body: None,
            file: None,
        }
    }
}

impl ResponseData {
    pub fn new(status_code: u16, status_description: impl Into<String>) -> Self {
        Self {
            status_code,
            status_description: status_description.into(),
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Content type for a text body.
    pub fn effective_content_type(&self) -> &str {
        self.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    /// Synthesized when no response arrives within the window.
    pub fn timeout() -> Self {
        Self::new(408, "Request Timeout")
            .with_content_type(DEFAULT_CONTENT_TYPE)
            .with_body(r#"{"error":"Request timeout"}"#)
    }

    /// Synthesized for exchanges still pending when the server stops.
    pub fn server_stopped() -> Self {
        Self::new(503, "Service Unavailable")
            .with_content_type(DEFAULT_CONTENT_TYPE)
            .with_body(r#"{"error":"Server stopped"}"#)
    }

    /// Synthesized when the event could not be published to any consumer.
    pub fn no_handler() -> Self {
        Self::new(503, "Service Unavailable")
            .with_content_type(DEFAULT_CONTENT_TYPE)
            .with_body(r#"{"error":"No request handler"}"#)
    }

    pub fn internal_error() -> Self {
        Self::new(500, "Internal Server Error")
            .with_content_type(DEFAULT_CONTENT_TYPE)
            .with_body(r#"{"error":"Internal server error"}"#)
    }
}

/// What a completion slot is resolved with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The external handler delivered a response.
    Delivered(ResponseData),
    /// The store was drained on shutdown.
    Cancelled,
}

/// How an exchange ended. Several outcomes share an HTTP status, this keeps
/// them apart in logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A response was delivered through the completion sink.
    Delivered,
    /// Nothing was delivered within the response window.
    TimedOut,
    /// The server stopped while the exchange was pending.
    Cancelled,
    /// The slot vanished without being resolved.
    Abandoned,
    /// The exchange could not be registered or published.
    Rejected,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Delivered => "delivered",
            Outcome::TimedOut => "timed_out",
            Outcome::Cancelled => "cancelled",
            Outcome::Abandoned => "abandoned",
            Outcome::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
