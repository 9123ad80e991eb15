//! Dataspace Search - catalog search API
//!
//! Serves faceted full-text search over datasets, use cases, AI models and
//! publishers held in an Elasticsearch-compatible index:
//! - Per-entity and unified search endpoints
//! - Dynamic metadata facets driven by the catalog database
//! - Versioned in-process result cache

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod schema;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
