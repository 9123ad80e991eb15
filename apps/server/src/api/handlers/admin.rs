//! Internal admin handlers

use crate::state::AppState;
use axum::{extract::State, response::Json};
use serde_json::{json, Value as JsonValue};

/// Drop every cached search response and the metadata schema cache.
///
/// The response cache key version moves on, so a request racing the
/// clear cannot repopulate an old key.
pub async fn invalidate_cache(State(state): State<AppState>) -> Json<JsonValue> {
    let service = &state.search_service;
    let version = service.cache().invalidate_all();
    service.schemas().invalidate().await;

    Json(json!({
        "status": "ok",
        "cacheVersion": version,
    }))
}
