//! Prometheus metrics for the search service

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, HistogramVec,
    IntCounterVec, IntGaugeVec,
};

lazy_static! {
    // HTTP Request Metrics

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "dataspace_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .expect("Failed to register HTTP_REQUESTS_TOTAL");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "dataspace_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");

    pub static ref HTTP_REQUESTS_IN_FLIGHT: IntGaugeVec = register_int_gauge_vec!(
        "dataspace_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
        &["method", "path"]
    )
    .expect("Failed to register HTTP_REQUESTS_IN_FLIGHT");

    // Search Metrics

    /// Searches by entity and outcome (`success`, `client_error`, `server_error`)
    pub static ref SEARCH_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "dataspace_search_requests_total",
        "Total number of catalog searches",
        &["entity", "status"]
    )
    .expect("Failed to register SEARCH_REQUESTS_TOTAL");

    pub static ref SEARCH_RESULTS: HistogramVec = register_histogram_vec!(
        "dataspace_search_results",
        "Total hits reported per search",
        &["entity"],
        vec![0.0, 1.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 10000.0]
    )
    .expect("Failed to register SEARCH_RESULTS");

    /// Result cache events (`hit`, `miss`, `store`, `expired`, `invalidate`)
    pub static ref SEARCH_CACHE_EVENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "dataspace_search_cache_events_total",
        "Search result cache events",
        &["event"]
    )
    .expect("Failed to register SEARCH_CACHE_EVENTS_TOTAL");

    // Backend Metrics

    pub static ref BACKEND_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "dataspace_backend_request_duration_seconds",
        "Search backend request duration in seconds",
        &["operation", "status"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register BACKEND_REQUEST_DURATION_SECONDS");

    pub static ref SCHEMA_REFRESH_TOTAL: IntCounterVec = register_int_counter_vec!(
        "dataspace_metadata_schema_refresh_total",
        "Metadata schema loads by model and outcome",
        &["model", "status"]
    )
    .expect("Failed to register SCHEMA_REFRESH_TOTAL");
}

/// Collapse a request path into a low-cardinality label.
pub fn sanitize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        ["api", "search", entity] if entity_label(entity).is_some() => {
            format!("/api/search/{entity}")
        }
        ["api", "search", ..] => "/api/search/{other}".to_string(),
        ["health"] | ["metrics"] => trimmed.to_string(),
        ["admin", ..] => trimmed.to_string(),
        _ => "/{other}".to_string(),
    }
}

/// Entity label for a search path segment, if it names one.
pub fn entity_label(segment: &str) -> Option<&'static str> {
    segment
        .parse::<dataspace_search_dsl::EntityKind>()
        .ok()
        .map(|kind| kind.as_str())
}

/// Outcome label for a response status.
pub fn status_class(status: axum::http::StatusCode) -> &'static str {
    if status.is_success() {
        "success"
    } else if status.is_client_error() {
        "client_error"
    } else {
        "server_error"
    }
}
