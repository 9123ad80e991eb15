//! Search response reshaping
//!
//! Turns raw `_search` responses into the flat structures the API returns:
//! facet counts keyed by label then value, flattened hit documents and a
//! total count.

use crate::aggregation::{COMPOSITE_AGG, FILTERED_METADATA_AGG, METADATA_AGG, NESTED_AGG};
use crate::profile::{EntityKind, SearchProfile};
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// `facet label → value → document count`.
pub type Facets = BTreeMap<String, BTreeMap<String, u64>>;

/// What one page of metadata composite buckets contained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositePage {
    pub after_key: Option<Value>,
    pub bucket_count: usize,
}

impl CompositePage {
    /// A further page exists when this one came back full.
    pub fn has_more(&self, page_size: usize) -> bool {
        self.after_key.is_some() && self.bucket_count >= page_size
    }
}

/// Render a bucket key as a facet value.
///
/// Prefers `key_as_string` (dates, booleans) and falls back to the raw key.
pub fn bucket_key(bucket: &Value) -> Option<String> {
    if let Some(s) = bucket.get("key_as_string").and_then(Value::as_str) {
        return Some(s.to_string());
    }
    match bucket.get("key")? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn term_buckets(agg: &Value) -> BTreeMap<String, u64> {
    let buckets = agg
        .get("buckets")
        .or_else(|| agg.get(NESTED_AGG).and_then(|n| n.get("buckets")))
        .and_then(Value::as_array);

    let mut out = BTreeMap::new();
    for bucket in buckets.into_iter().flatten() {
        let (Some(key), Some(count)) = (
            bucket_key(bucket),
            bucket.get("doc_count").and_then(Value::as_u64),
        ) else {
            continue;
        };
        *out.entry(key).or_insert(0) += count;
    }
    out
}

/// Reshape the static facets of `profile`. Missing aggregations yield empty maps.
pub fn static_facets(profile: &SearchProfile, aggs: Option<&Value>) -> Facets {
    let mut facets = Facets::new();
    for facet in profile.facets {
        let counts = aggs
            .and_then(|a| a.get(facet.name))
            .map(term_buckets)
            .unwrap_or_default();
        facets.insert(facet.name.to_string(), counts);
    }
    facets
}

/// Fold metadata composite buckets into `facets`, returning the paging state.
pub fn fold_metadata(facets: &mut Facets, aggs: Option<&Value>) -> CompositePage {
    let Some(composite) = aggs
        .and_then(|a| a.get(METADATA_AGG))
        .and_then(|m| m.get(FILTERED_METADATA_AGG))
        .and_then(|f| f.get(COMPOSITE_AGG))
    else {
        return CompositePage::default();
    };

    let buckets = composite
        .get("buckets")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for bucket in buckets {
        let key = bucket.get("key");
        let label = key.and_then(|k| k.get("label")).and_then(scalar_string);
        let value = key.and_then(|k| k.get("value")).and_then(scalar_string);
        let count = bucket.get("doc_count").and_then(Value::as_u64);
        if let (Some(label), Some(value), Some(count)) = (label, value, count) {
            *facets.entry(label).or_default().entry(value).or_insert(0) += count;
        }
    }

    CompositePage {
        after_key: composite.get("after_key").filter(|v| !v.is_null()).cloned(),
        bucket_count: buckets.len(),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
        other => Some(other.to_string()),
    }
}

/// Total hit count, tolerating both the object and the legacy numeric form.
pub fn total(response: &Value) -> u64 {
    let hits = response.get("hits");
    match hits.and_then(|h| h.get("total")) {
        Some(Value::Object(t)) => t.get("value").and_then(Value::as_u64).unwrap_or(0),
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        _ => hits
            .and_then(|h| h.get("hits"))
            .and_then(Value::as_array)
            .map(|a| a.len() as u64)
            .unwrap_or(0),
    }
}

/// Flatten hits into `_source` documents annotated with score, index and id.
pub fn hits(response: &Value) -> Result<Vec<Value>> {
    let raw = response
        .get("hits")
        .and_then(|h| h.get("hits"))
        .and_then(Value::as_array)
        .ok_or_else(|| Error::MalformedResponse("missing hits.hits".to_string()))?;

    Ok(raw.iter().map(flatten_hit).collect())
}

fn flatten_hit(hit: &Value) -> Value {
    let mut doc = match hit.get("_source") {
        Some(Value::Object(source)) => source.clone(),
        _ => Map::new(),
    };
    doc.insert(
        "_score".to_string(),
        hit.get("_score").cloned().unwrap_or(Value::Null),
    );
    doc.insert(
        "_index".to_string(),
        hit.get("_index").cloned().unwrap_or(Value::Null),
    );
    if !doc.contains_key("id") {
        if let Some(id) = hit.get("_id") {
            doc.insert("id".to_string(), id.clone());
        }
    }
    Value::Object(doc)
}

/// Entity type name for an index, matched by substring.
pub fn entity_type_for_index(index: &str) -> &'static str {
    let index = index.to_ascii_lowercase();
    if index.contains("dataset") {
        EntityKind::Dataset.as_str()
    } else if index.contains("usecase") {
        EntityKind::Usecase.as_str()
    } else if index.contains("aimodel") {
        EntityKind::Aimodel.as_str()
    } else if index.contains("publisher") {
        EntityKind::Publisher.as_str()
    } else {
        "unknown"
    }
}

/// Give a unified hit a `type` and the common title/description/date fields.
pub fn normalize_unified_hit(hit: Value) -> Value {
    let Value::Object(mut doc) = hit else {
        return hit;
    };
    let kind = doc
        .get("_index")
        .and_then(Value::as_str)
        .map(entity_type_for_index)
        .unwrap_or("unknown");
    doc.insert("type".to_string(), Value::String(kind.to_string()));

    let empty = || Value::String(String::new());
    match kind {
        "usecase" => {
            if let Some(summary) = doc.get("summary").cloned() {
                doc.insert("description".to_string(), summary);
            }
            doc.entry("title").or_insert_with(empty);
        }
        "aimodel" => {
            let title = doc
                .get("display_name")
                .or_else(|| doc.get("name"))
                .cloned()
                .unwrap_or_else(empty);
            doc.insert("title".to_string(), title);
            doc.entry("description").or_insert_with(empty);
            if let Some(created) = doc.get("created_at").cloned() {
                doc.insert("created".to_string(), created);
            }
            if let Some(updated) = doc.get("updated_at").cloned() {
                doc.insert("modified".to_string(), updated);
            }
        }
        _ => {
            doc.entry("title").or_insert_with(empty);
            doc.entry("description").or_insert_with(empty);
        }
    }
    Value::Object(doc)
}

/// Re-key the `types` facet from index names to entity type names.
pub fn map_types_facet(facets: &mut Facets) {
    let Some(by_index) = facets.remove("types") else {
        return;
    };
    let mut by_type = BTreeMap::new();
    for (index, count) in by_index {
        *by_type
            .entry(entity_type_for_index(&index).to_string())
            .or_insert(0) += count;
    }
    facets.insert("types".to_string(), by_type);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{DATASET, UNIFIED, USECASE};
    use serde_json::json;

    #[test]
    fn static_facets_read_plain_and_nested_buckets() {
        let aggs = json!({
            "tags": {"buckets": [{"key": "health", "doc_count": 4}, {"key": "water", "doc_count": 1}]},
            "is_individual_usecase": {"buckets": [{"key": 1, "key_as_string": "true", "doc_count": 2}]},
            "user.name": {"doc_count": 9, "nested_agg": {"buckets": [{"key": "asha", "doc_count": 3}]}}
        });
        let facets = static_facets(&USECASE, Some(&aggs));
        assert_eq!(facets["tags"]["health"], 4);
        assert_eq!(facets["is_individual_usecase"]["true"], 2);
        assert_eq!(facets["user.name"]["asha"], 3);
        assert!(facets["sectors"].is_empty());
    }

    #[test]
    fn composite_buckets_fold_by_label() {
        let aggs = json!({
            "metadata": {"filtered_metadata": {"composite_agg": {
                "after_key": {"label": "Geography", "value": "Bihar"},
                "buckets": [
                    {"key": {"label": "Geography", "value": "Assam"}, "doc_count": 3},
                    {"key": {"label": "Geography", "value": "Bihar"}, "doc_count": 1},
                    {"key": {"label": "Frequency", "value": "Monthly"}, "doc_count": 5}
                ]
            }}}
        });
        let mut facets = static_facets(&DATASET, None);
        let page = fold_metadata(&mut facets, Some(&aggs));
        assert_eq!(facets["Geography"].len(), 2);
        assert_eq!(facets["Geography"]["Assam"], 3);
        assert_eq!(facets["Frequency"]["Monthly"], 5);
        assert_eq!(page.bucket_count, 3);
        assert!(page.has_more(3));
        assert!(!page.has_more(10));

        // a second page for the same pair accumulates
        fold_metadata(&mut facets, Some(&aggs));
        assert_eq!(facets["Geography"]["Assam"], 6);
    }

    #[test]
    fn missing_metadata_agg_is_not_an_error() {
        let mut facets = Facets::new();
        let page = fold_metadata(&mut facets, Some(&json!({})));
        assert_eq!(page, CompositePage::default());
        assert!(facets.is_empty());
    }

    #[test]
    fn total_accepts_both_shapes() {
        assert_eq!(total(&json!({"hits": {"total": {"value": 42, "relation": "eq"}, "hits": []}})), 42);
        assert_eq!(total(&json!({"hits": {"total": 7, "hits": []}})), 7);
        assert_eq!(total(&json!({"hits": {"hits": [{}, {}]}})), 2);
    }

    #[test]
    fn hits_are_flattened() {
        let response = json!({"hits": {"hits": [
            {"_index": "dataset", "_id": "abc", "_score": 1.5, "_source": {"title": "Rainfall"}},
            {"_index": "dataset", "_id": "def", "_score": 1.0, "_source": {"id": "real-id"}}
        ]}});
        let docs = hits(&response).unwrap();
        assert_eq!(docs[0], json!({"title": "Rainfall", "_score": 1.5, "_index": "dataset", "id": "abc"}));
        assert_eq!(docs[1]["id"], "real-id");
        assert!(matches!(hits(&json!({"error": "boom"})), Err(Error::MalformedResponse(_))));
    }

    #[test]
    fn unified_hits_are_normalized_per_type() {
        let usecase = normalize_unified_hit(json!({"_index": "prod_usecase", "summary": "S"}));
        assert_eq!(usecase["type"], "usecase");
        assert_eq!(usecase["description"], "S");
        assert_eq!(usecase["title"], "");

        let model = normalize_unified_hit(json!({
            "_index": "aimodel", "name": "m1", "display_name": "Model One",
            "created_at": "2024-01-01", "updated_at": "2024-02-01"
        }));
        assert_eq!(model["title"], "Model One");
        assert_eq!(model["modified"], "2024-02-01");

        let other = normalize_unified_hit(json!({"_index": "misc"}));
        assert_eq!(other["type"], "unknown");
    }

    #[test]
    fn types_facet_uses_entity_names() {
        let aggs = json!({"types": {"buckets": [
            {"key": "dataset_v2", "doc_count": 5},
            {"key": "usecase", "doc_count": 2}
        ]}});
        let mut facets = static_facets(&UNIFIED, Some(&aggs));
        map_types_facet(&mut facets);
        assert_eq!(facets["types"]["dataset"], 5);
        assert_eq!(facets["types"]["usecase"], 2);
    }
}
