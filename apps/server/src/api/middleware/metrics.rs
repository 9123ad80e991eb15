//! Metrics middleware - tracks HTTP request metrics

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::metrics::{
    entity_label, sanitize_path, status_class, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL,
    HTTP_REQUEST_DURATION_SECONDS, SEARCH_REQUESTS_TOTAL,
};

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = sanitize_path(req.uri().path());

    let in_flight = HTTP_REQUESTS_IN_FLIGHT.with_label_values(&[&method, &path]);
    in_flight.inc();

    let response = next.run(req).await;

    in_flight.dec();
    let status = response.status();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, status.as_str()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &path])
        .observe(start.elapsed().as_secs_f64());

    if let Some(entity) = path
        .strip_prefix("/api/search/")
        .and_then(entity_label)
    {
        SEARCH_REQUESTS_TOTAL
            .with_label_values(&[entity, status_class(status)])
            .inc();
    }

    response
}
