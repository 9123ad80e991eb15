//! API layer - routes, handlers, and middleware

pub mod handlers;
pub mod headers;
pub mod middleware;
pub mod routes;

use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let max_body_size = state.config.server.max_request_body_size;
    let cors_origins = state.config.server.cors_origins.clone();

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/", get(root))
        .merge(routes::metrics::metrics_routes())
        .nest("/api/search", routes::search::search_routes())
        .nest("/admin", routes::admin::admin_routes())
        .fallback(not_found)
        .with_state(state)
        // Applied in reverse order
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(axum::middleware::from_fn(middleware::metrics_middleware))
        .layer(middleware::compression())
        .layer(middleware::cors(&cors_origins))
        .layer(DefaultBodyLimit::max(max_body_size))
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "server": "Dataspace Search",
        "version": env!("CARGO_PKG_VERSION"),
        "entities": ["dataset", "usecase", "aimodel", "publisher", "unified"],
    }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not found" })),
    )
}
