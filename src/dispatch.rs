//! In-process request handler.
//!
//! Turns the raw event stream into plain async callbacks: each published
//! request is decoded, handed to the callback on its own task, and whatever
//! the callback returns is delivered through the completion sink.
//!
//! # Failure Mapping
//! - callback returns `Err` → 500 `{"error":"Internal server error"}`
//! - callback panics → same 500
//! - event headers/params are not valid JSON → same 500

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use crate::bridge::{CompletionSink, RequestEvent, RequestEvents, RequestId, ResponseData};

/// A published request with its header and parameter maps decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub request_id: RequestId,
    pub method: String,
    pub path: String,
    pub body: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub params: BTreeMap<String, String>,
}

impl TryFrom<RequestEvent> for Request {
    type Error = serde_json::Error;

    fn try_from(event: RequestEvent) -> Result<Self, Self::Error> {
        let headers = event.headers_map()?;
        let params = event.params_map()?;
        Ok(Self {
            request_id: event.request_id,
            method: event.method,
            path: event.path,
            body: event.body,
            headers,
            params,
        })
    }
}

/// Callback response. Unset fields take the defaults of a plain `200 OK`
/// JSON response; a `Content-Type` in `headers` replaces the JSON default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebResponse {
    pub status_code: Option<u16>,
    pub status_description: Option<String>,
    pub content_type: Option<String>,
    pub headers: Option<BTreeMap<String, String>>,
    pub body: Option<String>,
    pub file: Option<String>,
}

impl WebResponse {
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Self::default()
        }
    }
}

impl From<WebResponse> for ResponseData {
    fn from(response: WebResponse) -> Self {
        Self {
            status_code: response.status_code.unwrap_or(200),
            status_description: response.status_description.unwrap_or_else(|| "OK".to_string()),
            content_type: response.content_type,
            headers: response.headers.unwrap_or_default(),
            body: response.body,
            file: response.file,
        }
    }
}

/// Answer every event on `events` with `handler` until the stream closes.
pub async fn serve_requests<F, Fut, E>(mut events: RequestEvents, sink: CompletionSink, handler: F)
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<WebResponse, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let handler = Arc::new(handler);

    while let Some(event) = events.recv().await {
        let handler = Arc::clone(&handler);
        let sink = sink.clone();

        tokio::spawn(async move {
            let request_id = event.request_id.clone();
            let response = match Request::try_from(event) {
                Ok(request) => match tokio::spawn(handler(request)).await {
                    Ok(Ok(response)) => ResponseData::from(response),
                    Ok(Err(e)) => {
                        tracing::error!(request_id = %request_id, error = %e, "Request handler failed");
                        ResponseData::internal_error()
                    }
                    Err(e) => {
                        tracing::error!(request_id = %request_id, error = %e, "Request handler panicked");
                        ResponseData::internal_error()
                    }
                },
                Err(e) => {
                    tracing::error!(request_id = %request_id, error = %e, "Malformed request event");
                    ResponseData::internal_error()
                }
            };
            sink.respond(&request_id, response);
        });
    }

    tracing::debug!("Request event stream closed");
}
