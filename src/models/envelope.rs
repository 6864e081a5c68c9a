//! Uniform `{status, message, data?}` wrapper returned for every request.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Body sent when the envelope itself cannot be serialized.
pub const FALLBACK_BODY: &str =
    r#"{"status": "Internal Server Error", "message": "Please try again later"}"#;

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(code: StatusCode, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status: code.canonical_reason().unwrap_or_default().to_string(),
            message: message.into(),
            data,
        }
    }
}

/// Serialize an envelope for `code` into a JSON response. A serialization
/// failure is logged and replaced with a fixed 500 body; the caller's logical
/// outcome is not affected.
pub fn respond<T: Serialize>(code: StatusCode, message: impl Into<String>, data: Option<T>) -> Response {
    let envelope = Envelope::new(code, message, data);
    match serde_json::to_vec(&envelope) {
        Ok(body) => json_response(code, body),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response envelope");
            json_response(StatusCode::INTERNAL_SERVER_ERROR, FALLBACK_BODY.as_bytes().to_vec())
        }
    }
}

/// Envelope with no `data` field.
pub fn respond_message(code: StatusCode, message: impl Into<String>) -> Response {
    respond::<()>(code, message, None)
}

fn json_response(code: StatusCode, body: Vec<u8>) -> Response {
    let mut resp = (code, body).into_response();
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    resp
}
