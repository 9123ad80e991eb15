//! Catalog search query DSL
//!
//! Builds Elasticsearch-compatible `_search` bodies for the catalog entities
//! (datasets, use cases, AI models, publishers and a unified view across them)
//! and reshapes the responses into flat facet counts.
//!
//! ## Example
//!
//! ```
//! use dataspace_search_dsl::{build_search_body, AggregationOptions, EntityKind, PageLimits, SearchRequest};
//!
//! let items = vec![
//!     ("query".to_string(), "rainfall".to_string()),
//!     ("tags".to_string(), "climate,water".to_string()),
//! ];
//! let request = SearchRequest::from_items(&items, PageLimits::default()).unwrap();
//! let built = build_search_body(
//!     EntityKind::Dataset.profile(),
//!     &request,
//!     None,
//!     &AggregationOptions::default(),
//! );
//! assert_eq!(built.body["size"], 10);
//! ```

pub mod aggregation;
pub mod error;
pub mod params;
pub mod profile;
pub mod query;
pub mod reshape;
pub mod schema;

pub use aggregation::AggregationOptions;
pub use error::{Error, Result};
pub use params::{FilterParam, PageLimits, SearchRequest, SortOrder};
pub use profile::{EntityKind, SearchProfile};
pub use query::{build_search_body, composite_page_body, BuiltSearch};
pub use reshape::{CompositePage, Facets};
pub use schema::{MetadataDataType, MetadataField, MetadataModel, MetadataSchema};
