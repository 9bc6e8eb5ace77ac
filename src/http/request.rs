//! Inbound request capture.
//!
//! # Responsibilities
//! - Snapshot method, full path, headers and query parameters
//! - Read the raw text body for write-style methods only
//!
//! # Design Decisions
//! - Multi-valued headers are joined with ", ", repeated query keys with ","
//! - A body that cannot be read is treated as absent, never as a failure

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request};
use std::collections::BTreeMap;

use crate::bridge::RequestData;

/// Capture everything the external handler needs from `request`.
pub async fn capture(request: Request<Body>, max_body_bytes: usize) -> RequestData {
    let (parts, body) = request.into_parts();

    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let body = if carries_body(&parts.method) {
        read_body(body, max_body_bytes).await
    } else {
        None
    };

    RequestData {
        method: parts.method.to_string(),
        path,
        headers: flatten_headers(&parts.headers),
        params: parse_query(parts.uri.query()),
        body,
    }
}

fn carries_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

async fn read_body(body: Body, limit: usize) -> Option<String> {
    match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body, continuing without it");
            None
        }
    }
}

/// Flatten a header multimap into name → value.
pub fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .keys()
        .map(|name| {
            let value = headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            (name.as_str().to_string(), value)
        })
        .collect()
}

/// Decode a query string into name → value.
pub fn parse_query(query: Option<&str>) -> BTreeMap<String, String> {
    let mut params: BTreeMap<String, String> = BTreeMap::new();
    let Some(query) = query else {
        return params;
    };

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        params
            .entry(key.into_owned())
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&value);
            })
            .or_insert_with(|| value.clone().into_owned());
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn query_is_decoded() {
        let params = parse_query(Some("x=1&name=hello%20world&flag"));
        assert_eq!(params.get("x").map(String::as_str), Some("1"));
        assert_eq!(params.get("name").map(String::as_str), Some("hello world"));
        assert_eq!(params.get("flag").map(String::as_str), Some(""));
    }

    #[test]
    fn repeated_query_keys_are_joined() {
        let params = parse_query(Some("tag=a&tag=b"));
        assert_eq!(params.get("tag").map(String::as_str), Some("a,b"));
    }

    #[test]
    fn missing_query_is_empty() {
        assert!(parse_query(None).is_empty());
    }

    #[test]
    fn multi_valued_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append("accept", HeaderValue::from_static("text/html"));
        headers.append("accept", HeaderValue::from_static("application/json"));
        headers.insert("x-one", HeaderValue::from_static("1"));

        let flat = flatten_headers(&headers);
        assert_eq!(flat.get("accept").map(String::as_str), Some("text/html, application/json"));
        assert_eq!(flat.get("x-one").map(String::as_str), Some("1"));
    }

    #[tokio::test]
    async fn get_request_has_no_body() {
        let request = Request::builder()
            .method("GET")
            .uri("/foo?x=1")
            .body(Body::from("ignored"))
            .unwrap();

        let data = capture(request, 1024).await;
        assert_eq!(data.method, "GET");
        assert_eq!(data.path, "/foo?x=1");
        assert_eq!(data.params.get("x").map(String::as_str), Some("1"));
        assert!(data.body.is_none());
    }

    #[tokio::test]
    async fn post_request_body_is_captured() {
        let request = Request::builder()
            .method("POST")
            .uri("/submit")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"a":1}"#))
            .unwrap();

        let data = capture(request, 1024).await;
        assert_eq!(data.body.as_deref(), Some(r#"{"a":1}"#));
        assert_eq!(data.headers.get("content-type").map(String::as_str), Some("application/json"));
    }

    #[tokio::test]
    async fn oversized_body_is_treated_as_absent() {
        let request = Request::builder()
            .method("PUT")
            .uri("/big")
            .body(Body::from(vec![b'a'; 64]))
            .unwrap();

        let data = capture(request, 16).await;
        assert!(data.body.is_none());
    }
}
