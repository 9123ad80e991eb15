//! Search API routes, mounted under `/api/search`

use crate::api::handlers::search;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn search_routes() -> Router<AppState> {
    Router::new()
        .route("/unified", get(search::search_unified))
        .route("/unified/", get(search::search_unified))
        .route("/:entity", get(search::search_entity))
        .route("/:entity/", get(search::search_entity))
}
