//! Search service - catalog search orchestration
//!
//! Runs one search end to end:
//! - Parse and validate the request
//! - Serve from the result cache when possible
//! - Resolve dynamic metadata facets for the entity
//! - Execute the query and follow metadata composite pages
//! - Reshape hits and facets into the API response

use crate::{
    backend::SearchBackend,
    cache::ResponseCache,
    config::{IndexConfig, SearchConfig},
    schema::MetadataSchemaCache,
    Error, Result,
};
use dataspace_search_dsl::{
    build_search_body, composite_page_body, reshape, EntityKind, Facets, MetadataSchema,
    SearchProfile, SearchRequest,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Response body of every search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<JsonValue>,
    pub total: u64,
    pub page: usize,
    pub size: usize,
    /// `facet label → value → count`
    pub aggregations: Facets,
    /// Filter keys that matched neither a known field nor a metadata label.
    pub unknown_filters: Vec<String>,
    /// Entity types a unified search actually covered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types_searched: Option<Vec<String>>,
}

impl SearchResponse {
    fn empty(request: &SearchRequest) -> Self {
        Self {
            results: Vec::new(),
            total: 0,
            page: request.page,
            size: request.size,
            aggregations: Facets::new(),
            unknown_filters: Vec::new(),
            types_searched: None,
        }
    }
}

pub type SearchCache = ResponseCache<Arc<SearchResponse>>;

pub struct SearchService {
    backend: Arc<dyn SearchBackend>,
    schemas: Arc<MetadataSchemaCache>,
    cache: Arc<SearchCache>,
    index: IndexConfig,
    search: SearchConfig,
}

impl SearchService {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        schemas: Arc<MetadataSchemaCache>,
        cache: Arc<SearchCache>,
        index: IndexConfig,
        search: SearchConfig,
    ) -> Self {
        Self {
            backend,
            schemas,
            cache,
            index,
            search,
        }
    }

    /// Search one entity type. `strict` turns unknown filters into an error.
    #[tracing::instrument(name = "search", skip(self, items), fields(entity = kind.as_str()))]
    pub async fn search(
        &self,
        kind: EntityKind,
        items: &[(String, String)],
        strict: bool,
    ) -> Result<Arc<SearchResponse>> {
        let request = SearchRequest::from_items(items, self.search.page_limits())?;

        let indices = match kind {
            EntityKind::Unified => {
                let (indices, types) = self.unified_targets(&request);
                if indices.is_empty() {
                    tracing::debug!(types = ?request.types, "No searchable types requested");
                    let mut response = SearchResponse::empty(&request);
                    response.types_searched = Some(types);
                    return Ok(Arc::new(response));
                }
                indices
            }
            other => self.index.indices_for(other),
        };

        if !self.cache.is_enabled() {
            let response = self.execute(kind.profile(), &request, &indices, strict).await?;
            return Ok(Arc::new(response));
        }

        let key = self.cache.key(kind.as_str(), &request);
        if let Some(cached) = self.cache.get(&key) {
            check_unknown(kind, &cached.unknown_filters, strict)?;
            return Ok(cached);
        }

        let response = Arc::new(self.execute(kind.profile(), &request, &indices, strict).await?);
        self.cache.insert(key, response.clone());
        Ok(response)
    }

    /// Unified search across datasets, use cases and AI models.
    pub async fn unified(
        &self,
        items: &[(String, String)],
        strict: bool,
    ) -> Result<Arc<SearchResponse>> {
        self.search(EntityKind::Unified, items, strict).await
    }

    pub fn cache(&self) -> &SearchCache {
        &self.cache
    }

    pub fn schemas(&self) -> &MetadataSchemaCache {
        &self.schemas
    }

    pub fn backend(&self) -> &dyn SearchBackend {
        self.backend.as_ref()
    }

    /// Indices and type names for a unified request; unknown type names are dropped.
    fn unified_targets(&self, request: &SearchRequest) -> (Vec<String>, Vec<String>) {
        for requested in &request.types {
            let supported = requested
                .parse::<EntityKind>()
                .is_ok_and(|kind| EntityKind::UNIFIED_MEMBERS.contains(&kind));
            if !supported {
                tracing::debug!(requested = %requested, "Ignoring unsupported unified search type");
            }
        }

        let kinds: Vec<EntityKind> = EntityKind::UNIFIED_MEMBERS
            .into_iter()
            .filter(|kind| {
                request.types.is_empty() || request.types.iter().any(|t| t == kind.as_str())
            })
            .collect();

        let indices = kinds
            .iter()
            .flat_map(|k| self.index.indices_for(*k))
            .collect();
        let types = kinds.iter().map(|k| k.as_str().to_string()).collect();
        (indices, types)
    }

    async fn execute(
        &self,
        profile: &SearchProfile,
        request: &SearchRequest,
        indices: &[String],
        strict: bool,
    ) -> Result<SearchResponse> {
        let schema: Option<Arc<MetadataSchema>> = match profile.metadata_model {
            Some(model) => Some(self.schemas.schema(model).await?),
            None => None,
        };

        let options = self.search.aggregation_options();
        let built = build_search_body(profile, request, schema.as_deref(), &options);
        check_unknown(profile.kind, &built.unknown_filters, strict)?;
        if !built.ignored_filters.is_empty() {
            tracing::debug!(ignored = ?built.ignored_filters, "Filters on non-filterable metadata ignored");
        }

        let raw = self.backend.search(indices, &built.body).await?;

        let aggs = raw.get("aggregations");
        let mut facets = reshape::static_facets(profile, aggs);
        let mut page = reshape::fold_metadata(&mut facets, aggs);
        let mut pages = 1;
        while page.has_more(options.composite_page_size) {
            if pages >= self.search.max_composite_pages {
                tracing::warn!(
                    pages,
                    "Metadata facet buckets truncated at the composite page limit"
                );
                break;
            }
            let Some(after_key) = page.after_key.as_ref() else {
                break;
            };
            let body = composite_page_body(
                &built.body,
                &built.metadata_labels,
                options.composite_page_size,
                after_key,
            );
            let next = self.backend.search(indices, &body).await?;
            page = reshape::fold_metadata(&mut facets, next.get("aggregations"));
            pages += 1;
        }

        let mut results = reshape::hits(&raw)?;
        let total = reshape::total(&raw);
        let mut types_searched = None;

        if profile.kind == EntityKind::Unified {
            results = results
                .into_iter()
                .map(reshape::normalize_unified_hit)
                .collect();
            reshape::map_types_facet(&mut facets);
            let (_, types) = self.unified_targets(request);
            types_searched = Some(types);
        }

        crate::metrics::SEARCH_RESULTS
            .with_label_values(&[profile.kind.as_str()])
            .observe(total as f64);
        tracing::debug!(total, returned = results.len(), composite_pages = pages, "Search completed");

        Ok(SearchResponse {
            results,
            total,
            page: request.page,
            size: request.size,
            aggregations: facets,
            unknown_filters: built.unknown_filters,
            types_searched,
        })
    }
}

fn check_unknown(kind: EntityKind, unknown: &[String], strict: bool) -> Result<()> {
    if strict && !unknown.is_empty() {
        return Err(Error::UnknownParameters {
            entity: kind.as_str().to_string(),
            params: unknown.to_vec(),
        });
    }
    Ok(())
}
