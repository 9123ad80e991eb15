//! Search handlers
//!
//! - `GET /api/search/{entity}` for dataset, usecase, aimodel and publisher
//! - `GET /api/search/unified`

use crate::{
    api::headers::extract_prefer_handling,
    state::AppState,
    Error, Result,
};
use axum::{
    extract::{Path, RawQuery, State},
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
};
use dataspace_search_dsl::EntityKind;

/// Entity search; `unified` is accepted here as well.
pub async fn search_entity(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<Response> {
    let kind: EntityKind = entity
        .parse()
        .map_err(|_| Error::NotFound(format!("Unknown search entity: {entity}")))?;
    run_search(&state, kind, &headers, query.as_deref()).await
}

pub async fn search_unified(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<Response> {
    run_search(&state, EntityKind::Unified, &headers, query.as_deref()).await
}

async fn run_search(
    state: &AppState,
    kind: EntityKind,
    headers: &HeaderMap,
    query: Option<&str>,
) -> Result<Response> {
    let items = parse_query_items(query);
    let strict = extract_prefer_handling(headers).is_strict();

    let response = state.search_service.search(kind, &items, strict).await?;
    Ok(Json(response.as_ref()).into_response())
}

/// Decode a raw query string into ordered `(key, value)` pairs, keeping repeats.
pub fn parse_query_items(query: Option<&str>) -> Vec<(String, String)> {
    query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default()
}
