//! Shared application state

use crate::{
    backend::{ElasticsearchClient, SearchBackend},
    config::Config,
    schema::{MetadataSchemaCache, MetadataSchemaSource, PostgresMetadataSource, StaticMetadataSource},
    services::{SearchCache, SearchService},
    Result,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub search_service: Arc<SearchService>,
}

impl AppState {
    /// Build production state: HTTP index client plus the catalog database.
    pub async fn new(config: Config) -> Result<Self> {
        let backend: Arc<dyn SearchBackend> = Arc::new(ElasticsearchClient::new(&config.index)?);

        let schema_source: Arc<dyn MetadataSchemaSource> = match &config.database.url {
            Some(url) => Arc::new(PostgresMetadataSource::connect_lazy(
                url,
                &config.database.metadata_table,
                config.database.pool_max_size,
                Duration::from_secs(config.database.pool_timeout_seconds),
            )?),
            None => {
                tracing::warn!("database.url not set, metadata facets are disabled");
                Arc::new(StaticMetadataSource::default())
            }
        };

        Ok(Self::from_parts(config, backend, schema_source))
    }

    /// Assemble state from explicit collaborators.
    pub fn from_parts(
        config: Config,
        backend: Arc<dyn SearchBackend>,
        schema_source: Arc<dyn MetadataSchemaSource>,
    ) -> Self {
        let schemas = Arc::new(MetadataSchemaCache::new(
            schema_source,
            Duration::from_secs(config.cache.schema_ttl_seconds),
        ));
        let cache = Arc::new(SearchCache::new(&config.cache));
        let search_service = Arc::new(SearchService::new(
            backend,
            schemas,
            cache,
            config.index.clone(),
            config.search.clone(),
        ));

        Self {
            config: Arc::new(config),
            search_service,
        }
    }
}
