//! Facet aggregation construction

use crate::profile::SearchProfile;
use crate::query::{METADATA_LABEL_FIELD, METADATA_PATH, METADATA_VALUE_FIELD};
use serde_json::{json, Map, Value};

/// Name of the nested aggregation carrying metadata facets.
pub const METADATA_AGG: &str = "metadata";
pub const FILTERED_METADATA_AGG: &str = "filtered_metadata";
pub const COMPOSITE_AGG: &str = "composite_agg";
/// Sub-aggregation name used under `nested` wrappers of static facets.
pub const NESTED_AGG: &str = "nested_agg";

#[derive(Debug, Clone, Copy)]
pub struct AggregationOptions {
    /// Bucket count for facets that do not set their own.
    pub facet_size: usize,
    /// Buckets per composite page.
    pub composite_page_size: usize,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            facet_size: 10,
            composite_page_size: 10_000,
        }
    }
}

/// `terms` aggregations for every static facet of the profile.
pub fn static_facets(profile: &SearchProfile, options: &AggregationOptions) -> Map<String, Value> {
    let mut aggs = Map::new();
    for facet in profile.facets {
        let terms = json!({
            "terms": {
                "field": facet.field,
                "size": facet.size.unwrap_or(options.facet_size)
            }
        });
        let agg = match facet.nested_path {
            Some(path) => json!({
                "nested": {"path": path},
                "aggs": {NESTED_AGG: terms}
            }),
            None => terms,
        };
        aggs.insert(facet.name.to_string(), agg);
    }
    aggs
}

/// Nested → filter → composite chain over metadata label/value pairs.
pub fn metadata_composite(labels: &[String], page_size: usize, after: Option<&Value>) -> Value {
    let mut composite = Map::new();
    composite.insert(
        "sources".to_string(),
        json!([
            {"label": {"terms": {"field": METADATA_LABEL_FIELD}}},
            {"value": {"terms": {"field": METADATA_VALUE_FIELD}}}
        ]),
    );
    composite.insert("size".to_string(), json!(page_size));
    if let Some(after) = after {
        composite.insert("after".to_string(), after.clone());
    }

    json!({
        "nested": {"path": METADATA_PATH},
        "aggs": {
            FILTERED_METADATA_AGG: {
                "filter": {"terms": {METADATA_LABEL_FIELD: labels}},
                "aggs": {
                    COMPOSITE_AGG: {"composite": composite}
                }
            }
        }
    })
}
