//! Request ID middleware for request tracing and correlation.
//!
//! Reuses an upstream `x-request-id` when present, otherwise generates a UUID
//! v4. The id is recorded in the tracing span and the Sentry scope, and echoed
//! in the response.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream id accepted; longer values are replaced.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Pick the request id: a sane upstream value, or a fresh UUID.
fn resolve_request_id(upstream: Option<&str>) -> String {
    upstream
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
        .map_or_else(|| Uuid::new_v4().to_string(), String::from)
}

/// Middleware that ensures every request has a request ID.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = resolve_request_id(
        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|h| h.to_str().ok()),
    );

    Span::current().record("request_id", &request_id);

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}
