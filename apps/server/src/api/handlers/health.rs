use crate::state::AppState;
use axum::{extract::State, response::Json};
use serde_json::{json, Value as JsonValue};

/// Liveness plus a ping of the index cluster.
///
/// Always 200 so orchestrators keep the process; a failed ping reports
/// `degraded`.
pub async fn health_check(State(state): State<AppState>) -> Json<JsonValue> {
    let backend = match state.search_service.backend().ping().await {
        Ok(()) => "up",
        Err(e) => {
            tracing::warn!(error = %e, "Search backend ping failed");
            "down"
        }
    };

    Json(json!({
        "status": if backend == "up" { "ok" } else { "degraded" },
        "service": "dataspace-search",
        "version": env!("CARGO_PKG_VERSION"),
        "backend": backend,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
