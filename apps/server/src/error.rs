//! Error types for the search service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown search parameters for {entity}: {}", .params.join(", "))]
    UnknownParameters { entity: String, params: Vec<String> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Search backend error: {0}")]
    Backend(String),

    #[error("Search backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<dataspace_search_dsl::Error> for Error {
    fn from(err: dataspace_search_dsl::Error) -> Self {
        match err {
            dataspace_search_dsl::Error::MalformedResponse(msg) => Error::Backend(msg),
            other => Error::Validation(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Error::BackendUnavailable(err.to_string())
        } else {
            Error::Backend(err.to_string())
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::Validation(_) | Error::UnknownParameters { .. } => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Error::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            Error::Backend(_) => {
                tracing::error!(error = %self, "Search backend request failed");
                (StatusCode::BAD_GATEWAY, "Search backend error".to_string())
            }
            Error::BackendUnavailable(_) => {
                tracing::error!(error = %self, "Search backend unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Search backend unavailable".to_string(),
                )
            }
            Error::Database(_) | Error::Internal(_) => {
                tracing::error!("Internal error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
