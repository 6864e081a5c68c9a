use std::time::Instant;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;

/// Middleware: one access-log line per request with method, path, status and
/// elapsed time. Client and server errors are logged at `warn`.
pub async fn access_log(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let resp = next.run(req).await;

    let status = resp.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if status >= 400 {
        tracing::warn!(%method, %path, status, elapsed_ms, "request completed");
    } else {
        tracing::info!(%method, %path, status, elapsed_ms, "request completed");
    }
    resp
}

/// Middleware: injects a unique X-Request-Id into every response.
pub async fn request_id(req: Request, next: Next) -> Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!("request", request_id = %req_id);

    let mut resp = next.run(req).instrument(span).await;
    if let Ok(val) = HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}
