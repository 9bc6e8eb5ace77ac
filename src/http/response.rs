//! Response materialization.
//!
//! # Precedence
//! 1. Status code and every caller header
//! 2. `file` that exists → streamed file body, `body` ignored
//! 3. `file` that does not exist → 404, whatever else was supplied
//! 4. `body` → text with the content type
//! 5. otherwise an empty body with the content type
//!
//! The content type is `content_type` when set, else a caller `Content-Type`
//! header, else JSON. Files use their extension's type unless the caller
//! sent a `Content-Type` header.
//!
//! # Design Decisions
//! - `status_description` becomes the HTTP/1.1 reason phrase when it is a
//!   valid one, and is otherwise ignored
//! - File bodies are streamed in chunks, never loaded whole

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use hyper::ext::ReasonPhrase;
use std::path::Path;
use thiserror::Error;
use tokio::io::AsyncReadExt;

use crate::bridge::ResponseData;

const FILE_CHUNK_BYTES: usize = 64 * 1024;

/// Failure while turning a [`ResponseData`] into an HTTP response.
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("invalid status code {0}")]
    InvalidStatus(u16),

    #[error("invalid header {name:?}")]
    InvalidHeader { name: String },

    #[error("invalid content type {0:?}")]
    InvalidContentType(String),

    #[error("failed to open response file: {0}")]
    File(#[from] std::io::Error),
}

/// Build the outgoing response for `data`.
pub async fn materialize(data: ResponseData) -> Result<Response, MaterializeError> {
    let status = || {
        StatusCode::from_u16(data.status_code).map_err(|_| MaterializeError::InvalidStatus(data.status_code))
    };
    let headers = caller_headers(&data)?;

    if let Some(file) = data.file.as_deref() {
        let path = Path::new(file.strip_prefix("file://").unwrap_or(file));
        return match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {
                let content_type = if headers.contains_key(header::CONTENT_TYPE) {
                    None
                } else {
                    Some(file_content_type(path, data.content_type.as_deref())?)
                };
                let body = stream_file(path).await?;
                let mut response = build(status()?, headers, content_type, body);
                response
                    .headers_mut()
                    .insert(header::CONTENT_LENGTH, HeaderValue::from(meta.len()));
                attach_reason(&mut response, &data.status_description);
                Ok(response)
            }
            _ => {
                tracing::debug!(file = %path.display(), "Response file not found");
                let mut response = Response::new(Body::empty());
                *response.status_mut() = StatusCode::NOT_FOUND;
                response.headers_mut().extend(headers);
                Ok(response)
            }
        };
    }

    let status = status()?;
    // An explicit content type beats a Content-Type header, which beats the default.
    let content_type = match (&data.content_type, headers.contains_key(header::CONTENT_TYPE)) {
        (None, true) => None,
        _ => Some(parse_content_type(data.effective_content_type())?),
    };
    let body = data.body.map(Body::from).unwrap_or_else(Body::empty);
    let mut response = build(status, headers, content_type, body);
    attach_reason(&mut response, &data.status_description);
    Ok(response)
}

fn caller_headers(data: &ResponseData) -> Result<HeaderMap, MaterializeError> {
    let mut headers = HeaderMap::with_capacity(data.headers.len());
    for (name, value) in &data.headers {
        let invalid = || MaterializeError::InvalidHeader { name: name.clone() };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        headers.append(header_name, header_value);
    }
    Ok(headers)
}

fn build(status: StatusCode, headers: HeaderMap, content_type: Option<HeaderValue>, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().extend(headers);
    if let Some(content_type) = content_type {
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    response
}

fn parse_content_type(value: &str) -> Result<HeaderValue, MaterializeError> {
    HeaderValue::from_str(value).map_err(|_| MaterializeError::InvalidContentType(value.to_string()))
}

/// Infer from the extension; keep the caller's type when the extension is unknown.
fn file_content_type(path: &Path, supplied: Option<&str>) -> Result<HeaderValue, MaterializeError> {
    match (mime_guess::from_path(path).first(), supplied) {
        (Some(mime), _) => parse_content_type(mime.as_ref()),
        (None, Some(supplied)) => parse_content_type(supplied),
        (None, None) => Ok(HeaderValue::from_static("application/octet-stream")),
    }
}

async fn stream_file(path: &Path) -> Result<Body, MaterializeError> {
    let file = tokio::fs::File::open(path).await?;
    let chunks = futures_util::stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; FILE_CHUNK_BYTES];
        let read = file.read(&mut buf).await?;
        if read == 0 {
            return Ok::<_, std::io::Error>(None);
        }
        buf.truncate(read);
        Ok(Some((Bytes::from(buf), file)))
    });
    Ok(Body::from_stream(chunks))
}

fn attach_reason(response: &mut Response, description: &str) {
    if description.is_empty() {
        return;
    }
    match ReasonPhrase::try_from(description.as_bytes()) {
        Ok(reason) => {
            response.extensions_mut().insert(reason);
        }
        Err(_) => tracing::debug!(description, "Ignoring invalid status description"),
    }
}
