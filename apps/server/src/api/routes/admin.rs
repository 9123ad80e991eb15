//! Internal admin routes, mounted under `/admin`

use crate::api::handlers::admin;
use crate::state::AppState;
use axum::{routing::post, Router};

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/cache/invalidate", post(admin::invalidate_cache))
}
