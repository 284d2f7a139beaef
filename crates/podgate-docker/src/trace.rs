//! Per-request trace IDs.
//!
//! Each request runs inside a `docker_request` span carrying its trace ID and
//! the API version the client asked for. The ID is also scoped in
//! [`CURRENT_TRACE_ID`], so the varlink client tags its `varlink_call` spans
//! with the same value, and echoed back in the `X-Trace-Id` header.

use crate::version::requested;
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use podgate_core::trace::CURRENT_TRACE_ID;
use tracing::Instrument;

/// Header name for trace ID propagation.
pub const TRACE_ID_HEADER: &str = "X-Trace-Id";

/// Trace ID stored in request extensions.
#[derive(Debug, Clone)]
pub struct TraceId(pub String);

fn inbound_trace_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Tags the request with a trace ID, reusing an inbound `X-Trace-Id`.
pub async fn trace_id_middleware(mut request: Request, next: Next) -> Response {
    let trace_id =
        inbound_trace_id(request.headers()).unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let span = tracing::info_span!(
        "docker_request",
        trace_id = %trace_id,
        method = %request.method(),
        path = %request.uri().path(),
        api_version = requested(request.uri().path()).unwrap_or(crate::API_VERSION),
    );
    request.extensions_mut().insert(TraceId(trace_id.clone()));

    let mut response = CURRENT_TRACE_ID
        .scope(trace_id.clone(), next.run(request))
        .instrument(span.clone())
        .await;
    span.in_scope(|| tracing::debug!(status = response.status().as_u16(), "request finished"));

    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    response
}
