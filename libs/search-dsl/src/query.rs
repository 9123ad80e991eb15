//! Query, filter and sort clause construction
//!
//! Everything here produces plain `serde_json::Value` fragments in the
//! Elasticsearch query DSL. The functions are pure so the request body for a
//! given (profile, request, schema) is deterministic.

use crate::aggregation::{self, AggregationOptions};
use crate::params::{FilterParam, SearchRequest, SortOrder};
use crate::profile::{FilterRule, SearchProfile, SortClause, TextClause};
use crate::schema::MetadataSchema;
use serde_json::{json, Map, Value};

/// Path of the nested metadata documents.
pub const METADATA_PATH: &str = "metadata";
/// Keyword field holding the metadata label inside the nested documents.
pub const METADATA_LABEL_FIELD: &str = "metadata.metadata_item.label";
/// Keyword field holding the metadata value inside the nested documents.
pub const METADATA_VALUE_FIELD: &str = "metadata.value";

/// Free-text part of the query.
pub fn text_query(profile: &SearchProfile, query: &str) -> Value {
    let query = query.trim();
    if query.is_empty() {
        return json!({
            "bool": {
                "should": [{"match_all": {}}],
                "minimum_should_match": 1
            }
        });
    }

    let should: Vec<Value> = profile
        .text
        .iter()
        .map(|clause| text_clause(clause, query, profile.multi_index))
        .collect();

    json!({
        "bool": {
            "should": should,
            "minimum_should_match": 1
        }
    })
}

fn text_clause(clause: &TextClause, query: &str, ignore_unmapped: bool) -> Value {
    match *clause {
        TextClause::Fuzzy { field } => fuzzy(field, query),
        TextClause::NestedFuzzy { path, field } => nested(
            path,
            json!({
                "bool": {
                    "should": [wildcard(field, query), fuzzy(field, query)],
                    "minimum_should_match": 1
                }
            }),
            ignore_unmapped,
        ),
        TextClause::MultiMatch { fields } => multi_match(fields, query),
        TextClause::NestedMultiMatch { path, fields } => {
            nested(path, multi_match(fields, query), ignore_unmapped)
        }
        TextClause::NestedWildcard { path, fields } => {
            let should: Vec<Value> = fields.iter().map(|f| wildcard(f, query)).collect();
            nested(
                path,
                json!({"bool": {"should": should, "minimum_should_match": 1}}),
                ignore_unmapped,
            )
        }
    }
}

fn fuzzy(field: &str, query: &str) -> Value {
    json!({"fuzzy": {field: {"value": query, "fuzziness": "AUTO"}}})
}

fn wildcard(field: &str, query: &str) -> Value {
    json!({
        "wildcard": {
            field: {
                "value": format!("*{}*", escape_wildcard(query)),
                "case_insensitive": true
            }
        }
    })
}

fn multi_match(fields: &[&str], query: &str) -> Value {
    json!({
        "multi_match": {
            "query": query,
            "fields": fields,
            "fuzziness": "AUTO"
        }
    })
}

fn nested(path: &str, query: Value, ignore_unmapped: bool) -> Value {
    let mut body = Map::new();
    body.insert("path".to_string(), Value::String(path.to_string()));
    body.insert("query".to_string(), query);
    if ignore_unmapped {
        body.insert("ignore_unmapped".to_string(), Value::Bool(true));
    }
    json!({ "nested": body })
}

/// Escape the characters `wildcard` treats specially.
pub fn escape_wildcard(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '*' | '?' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Filter clauses plus the keys that could not be applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    pub clauses: Vec<Value>,
    /// Keys neither the profile nor the metadata schema know about.
    pub unknown: Vec<String>,
    /// Metadata labels that exist but are not filterable.
    pub ignored: Vec<String>,
}

/// Resolve request filters against the profile, then the metadata schema.
pub fn filter_clauses(
    profile: &SearchProfile,
    filters: &[FilterParam],
    schema: Option<&MetadataSchema>,
) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();

    for filter in filters {
        if let Some(rule) = profile.filter_rule(&filter.key) {
            if let Some(clause) = rule_clause(rule, filter) {
                outcome.clauses.push(clause);
            }
            continue;
        }

        match schema {
            Some(schema) if schema.is_facetable(&filter.key) => {
                outcome.clauses.push(metadata_filter(&filter.key, &filter.values));
            }
            Some(schema) if schema.knows(&filter.key) => {
                tracing::debug!(label = %filter.key, "Ignoring filter on non-filterable metadata field");
                outcome.ignored.push(filter.key.clone());
            }
            _ => outcome.unknown.push(filter.key.clone()),
        }
    }

    outcome
}

fn rule_clause(rule: FilterRule, filter: &FilterParam) -> Option<Value> {
    let values = &filter.values;
    let first = values.first()?;

    let clause = match rule {
        FilterRule::Terms { field } => json!({"terms": {field: values}}),
        FilterRule::Term { field } => term_or_terms(field, values),
        FilterRule::Boolean { field } => json!({"term": {field: is_truthy(first)}}),
        FilterRule::Nested { path, field } => json!({
            "nested": {
                "path": path,
                "query": {"bool": {"must": [term_or_terms(field, values)]}}
            }
        }),
        FilterRule::Match { field } if values.len() == 1 => json!({"match": {field: first}}),
        FilterRule::Match { field } => {
            let should: Vec<Value> = values.iter().map(|v| json!({"match": {field: v}})).collect();
            json!({"bool": {"should": should, "minimum_should_match": 1}})
        }
    };
    Some(clause)
}

fn term_or_terms(field: &str, values: &[String]) -> Value {
    match values {
        [single] => json!({"term": {field: single}}),
        _ => json!({"terms": {field: values}}),
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

/// Nested filter matching one metadata label against any of `values`.
pub fn metadata_filter(label: &str, values: &[String]) -> Value {
    json!({
        "nested": {
            "path": METADATA_PATH,
            "query": {
                "bool": {
                    "must": [
                        {"term": {METADATA_LABEL_FIELD: label}},
                        {"terms": {METADATA_VALUE_FIELD: values}}
                    ]
                }
            }
        }
    })
}

/// Sort clauses for a named option; empty means relevance order.
pub fn sort_clauses(profile: &SearchProfile, sort: Option<&str>, order: SortOrder) -> Vec<Value> {
    let Some(name) = sort else {
        return Vec::new();
    };
    let Some(option) = profile.sort_option(name) else {
        tracing::debug!(
            entity = profile.kind.as_str(),
            sort = name,
            "Unknown sort option, using relevance order"
        );
        return Vec::new();
    };

    option
        .clauses
        .iter()
        .map(|clause| match *clause {
            SortClause::Field { field, fixed } => {
                let order = fixed.unwrap_or(order).as_str();
                if profile.multi_index {
                    json!({field: {"order": order, "unmapped_type": "keyword"}})
                } else {
                    json!({field: {"order": order}})
                }
            }
            SortClause::Script { source, fixed } => json!({
                "_script": {
                    "type": "number",
                    "script": {"source": source},
                    "order": fixed.unwrap_or(order).as_str()
                }
            }),
        })
        .collect()
}

/// A complete `_search` body with what was left out of it.
#[derive(Debug, Clone)]
pub struct BuiltSearch {
    pub body: Value,
    pub unknown_filters: Vec<String>,
    pub ignored_filters: Vec<String>,
    /// Metadata labels aggregated through the composite chain.
    pub metadata_labels: Vec<String>,
}

/// Combined query: text in `must`, filters in `filter`.
pub fn bool_query(text: Value, filters: Vec<Value>) -> Value {
    let mut bool_body = Map::new();
    bool_body.insert("must".to_string(), Value::Array(vec![text]));
    if !filters.is_empty() {
        bool_body.insert("filter".to_string(), Value::Array(filters));
    }
    json!({ "bool": bool_body })
}

/// Build the full first-page search body.
pub fn build_search_body(
    profile: &SearchProfile,
    request: &SearchRequest,
    schema: Option<&MetadataSchema>,
    options: &AggregationOptions,
) -> BuiltSearch {
    let filters = filter_clauses(profile, &request.filters, schema);
    let metadata_labels = schema.map(|s| s.facet_labels()).unwrap_or_default();

    let mut body = Map::new();
    body.insert(
        "query".to_string(),
        bool_query(text_query(profile, &request.query), filters.clauses),
    );
    body.insert("from".to_string(), json!(request.from()));
    body.insert("size".to_string(), json!(request.size));
    body.insert("track_total_hits".to_string(), Value::Bool(true));

    let sort = sort_clauses(profile, request.sort.as_deref(), request.order);
    if !sort.is_empty() {
        body.insert("sort".to_string(), Value::Array(sort));
    }

    let mut aggs = aggregation::static_facets(profile, options);
    if !metadata_labels.is_empty() {
        aggs.insert(
            aggregation::METADATA_AGG.to_string(),
            aggregation::metadata_composite(&metadata_labels, options.composite_page_size, None),
        );
    }
    if !aggs.is_empty() {
        body.insert("aggs".to_string(), Value::Object(aggs));
    }

    BuiltSearch {
        body: Value::Object(body),
        unknown_filters: filters.unknown,
        ignored_filters: filters.ignored,
        metadata_labels,
    }
}

/// Size-0 body fetching the next page of metadata composite buckets.
pub fn composite_page_body(
    first_page: &Value,
    labels: &[String],
    page_size: usize,
    after_key: &Value,
) -> Value {
    let query = first_page
        .get("query")
        .cloned()
        .unwrap_or_else(|| json!({"match_all": {}}));
    json!({
        "query": query,
        "size": 0,
        "aggs": {
            (aggregation::METADATA_AGG): aggregation::metadata_composite(labels, page_size, Some(after_key))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::PageLimits;
    use crate::profile::{AIMODEL, DATASET, PUBLISHER, UNIFIED, USECASE};
    use crate::schema::{MetadataDataType, MetadataField, MetadataModel};

    fn request(pairs: &[(&str, &str)]) -> SearchRequest {
        let items: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SearchRequest::from_items(&items, PageLimits::default()).unwrap()
    }

    fn schema() -> MetadataSchema {
        let field = |id, label: &str, filterable| MetadataField {
            id,
            label: label.to_string(),
            data_type: MetadataDataType::Select,
            model: MetadataModel::Dataset,
            enabled: true,
            filterable,
        };
        MetadataSchema::new(vec![field(1, "Geography", true), field(2, "Source", false)])
    }

    #[test]
    fn empty_query_matches_everything() {
        let q = text_query(&DATASET, "   ");
        assert_eq!(q["bool"]["should"][0], json!({"match_all": {}}));
        assert_eq!(q["bool"]["minimum_should_match"], 1);
    }

    #[test]
    fn text_query_has_one_clause_per_field() {
        let q = text_query(&DATASET, " rainfall ");
        let should = q["bool"]["should"].as_array().unwrap();
        assert_eq!(should.len(), DATASET.text.len());
        assert_eq!(
            should[0],
            json!({"fuzzy": {"title": {"value": "rainfall", "fuzziness": "AUTO"}}})
        );
        let nested = &should[3]["nested"];
        assert_eq!(nested["path"], "metadata");
        assert_eq!(
            nested["query"]["bool"]["should"][0]["wildcard"]["metadata.value"]["value"],
            "*rainfall*"
        );
        assert!(nested.get("ignore_unmapped").is_none());
    }

    #[test]
    fn unified_nested_clauses_ignore_unmapped_paths() {
        let q = text_query(&UNIFIED, "water");
        let should = q["bool"]["should"].as_array().unwrap();
        assert_eq!(should[0]["multi_match"]["fields"], json!(["title^3", "name^3", "display_name^3"]));
        let nested: Vec<&Value> = should.iter().filter_map(|c| c.get("nested")).collect();
        assert_eq!(nested.len(), 5);
        assert!(nested.iter().all(|n| n["ignore_unmapped"] == true));
    }

    #[test]
    fn wildcard_metacharacters_are_escaped() {
        assert_eq!(escape_wildcard(r"a*b?c\d"), r"a\*b\?c\\d");
    }

    #[test]
    fn profile_filters_map_to_their_rules() {
        let req = request(&[
            ("tags", "health,water"),
            ("status", "PUBLISHED"),
            ("is_individual_usecase", "Yes"),
            ("organization.name", "Civic Org"),
        ]);
        let out = filter_clauses(&USECASE, &req.filters, None);
        assert!(out.unknown.is_empty());
        assert_eq!(out.clauses.len(), 4);
        assert!(out.clauses.contains(&json!({"terms": {"tags.raw": ["health", "water"]}})));
        assert!(out.clauses.contains(&json!({"term": {"status": "PUBLISHED"}})));
        assert!(out.clauses.contains(&json!({"term": {"is_individual_usecase": true}})));
        assert!(out.clauses.contains(&json!({
            "nested": {
                "path": "organization",
                "query": {"bool": {"must": [{"term": {"organization.name": "Civic Org"}}]}}
            }
        })));
    }

    #[test]
    fn repeated_term_keys_become_terms() {
        let out = filter_clauses(
            &DATASET,
            &request(&[("status", "DRAFT"), ("status", "PUBLISHED")]).filters,
            None,
        );
        assert_eq!(out.clauses, vec![json!({"terms": {"status": ["DRAFT", "PUBLISHED"]}})]);
    }

    #[test]
    fn repeated_nested_keys_become_nested_terms() {
        let out = filter_clauses(
            &USECASE,
            &request(&[("user.name", "asha"), ("user.name", "ravi")]).filters,
            None,
        );
        assert_eq!(
            out.clauses,
            vec![json!({
                "nested": {
                    "path": "user",
                    "query": {"bool": {"must": [{"terms": {"user.name": ["asha", "ravi"]}}]}}
                }
            })]
        );
    }

    #[test]
    fn match_filters_use_analyzed_queries() {
        let one = filter_clauses(&PUBLISHER, &request(&[("location", "New Delhi")]).filters, None);
        assert_eq!(one.clauses, vec![json!({"match": {"location": "New Delhi"}})]);

        let many = filter_clauses(
            &PUBLISHER,
            &request(&[("location", "Pune"), ("location", "Assam")]).filters,
            None,
        );
        assert_eq!(
            many.clauses,
            vec![json!({
                "bool": {
                    "should": [
                        {"match": {"location": "Assam"}},
                        {"match": {"location": "Pune"}}
                    ],
                    "minimum_should_match": 1
                }
            })]
        );
    }

    #[test]
    fn term_or_terms_depends_on_value_count() {
        let one = filter_clauses(&AIMODEL, &request(&[("provider", "openai")]).filters, None);
        assert_eq!(one.clauses[0], json!({"term": {"provider": "openai"}}));
        let many = filter_clauses(&AIMODEL, &request(&[("provider", "openai,local")]).filters, None);
        assert_eq!(many.clauses[0], json!({"terms": {"provider": ["local", "openai"]}}));
    }

    #[test]
    fn metadata_filters_match_label_and_value() {
        let schema = schema();
        let req = request(&[("Geography", "Assam,Bihar"), ("Source", "x"), ("colour", "red")]);
        let out = filter_clauses(&DATASET, &req.filters, Some(&schema));
        assert_eq!(out.clauses, vec![metadata_filter("Geography", &["Assam".to_string(), "Bihar".to_string()])]);
        assert_eq!(out.ignored, vec!["Source"]);
        assert_eq!(out.unknown, vec!["colour"]);
    }

    #[test]
    fn sort_options_resolve_to_clauses() {
        assert!(sort_clauses(&DATASET, None, SortOrder::Desc).is_empty());
        assert!(sort_clauses(&DATASET, Some("nonsense"), SortOrder::Desc).is_empty());
        assert_eq!(
            sort_clauses(&DATASET, Some("alphabetical"), SortOrder::Asc),
            vec![json!({"title.raw": {"order": "asc"}})]
        );
        let perf = sort_clauses(&AIMODEL, Some("performance"), SortOrder::Asc);
        assert_eq!(perf[0], json!({"success_rate": {"order": "desc"}}));
        assert_eq!(perf[1], json!({"average_latency_ms": {"order": "asc"}}));
        let script = sort_clauses(&PUBLISHER, Some("total_contributions"), SortOrder::Asc);
        assert_eq!(script[0]["_script"]["order"], "desc");
        assert_eq!(
            sort_clauses(&PUBLISHER, Some("alphabetical"), SortOrder::Desc)[0]["name.raw"]["order"],
            "asc"
        );
    }

    #[test]
    fn search_body_combines_every_part() {
        let schema = schema();
        let req = request(&[
            ("query", "rain"),
            ("page", "2"),
            ("size", "5"),
            ("sort", "recent"),
            ("tags", "health"),
        ]);
        let built = build_search_body(&DATASET, &req, Some(&schema), &AggregationOptions::default());
        let body = &built.body;
        assert_eq!(body["from"], 5);
        assert_eq!(body["size"], 5);
        assert_eq!(body["track_total_hits"], true);
        assert_eq!(body["sort"][0], json!({"modified": {"order": "desc"}}));
        assert_eq!(body["query"]["bool"]["filter"][0], json!({"terms": {"tags.raw": ["health"]}}));
        assert!(body["aggs"].get("tags").is_some());
        assert!(body["aggs"].get("metadata").is_some());
        assert_eq!(built.metadata_labels, vec!["Geography"]);
    }

    #[test]
    fn composite_page_body_reuses_query_and_carries_after_key() {
        let req = request(&[("query", "rain")]);
        let built = build_search_body(&DATASET, &req, Some(&schema()), &AggregationOptions::default());
        let after = json!({"label": "Geography", "value": "Assam"});
        let next = composite_page_body(&built.body, &built.metadata_labels, 100, &after);
        assert_eq!(next["size"], 0);
        assert_eq!(next["query"], built.body["query"]);
        assert_eq!(
            next["aggs"]["metadata"]["aggs"]["filtered_metadata"]["aggs"]["composite_agg"]["composite"]["after"],
            after
        );
    }
}
