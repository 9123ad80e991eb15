//! Request ID middleware with OpenTelemetry trace context injection

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use opentelemetry::trace::TraceContextExt;
use std::time::Instant;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use uuid::Uuid;

/// Opens the root span of a request and tags the response with ids.
///
/// - `x-request-id`: server-generated id
/// - `x-correlation-id`: the client's `x-request-id`, when one was sent
/// - `x-trace-id`: OpenTelemetry trace id of the request span
#[tracing::instrument(
    name = "http_request",
    skip_all,
    fields(
        http.method = %req.method(),
        http.route = %req.uri().path(),
        otel.kind = "server",
        http.response.status_code = tracing::field::Empty,
        search.entity = tracing::field::Empty,
        request_id = tracing::field::Empty,
    )
)]
pub async fn request_id_middleware(req: Request, next: Next) -> Response {
    let span = Span::current();
    let start = Instant::now();

    let correlation_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from);

    let request_id = Uuid::new_v4().to_string();
    span.record("request_id", request_id.as_str());

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    if let Some(entity) = search_entity(&path) {
        span.record("search.entity", entity);
    }

    let mut response = next.run(req).await;

    let status = response.status();
    span.record("http.response.status_code", status.as_u16());
    tracing::info!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert("x-request-id", value);
    }
    let trace_id = span.context().span().span_context().trace_id().to_string();
    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        headers.insert("x-trace-id", value);
    }
    if let Some(client_id) = correlation_id {
        if let Ok(value) = HeaderValue::from_str(&client_id) {
            headers.insert("x-correlation-id", value);
        }
    }

    response
}

fn search_entity(path: &str) -> Option<&'static str> {
    let rest = path.strip_prefix("/api/search/")?;
    crate::metrics::entity_label(rest.trim_end_matches('/'))
}
