//! Service layer

pub mod search;

pub use search::{SearchCache, SearchResponse, SearchService};
