//! Metadata schema introspection
//!
//! Metadata fields are rows edited by catalog administrators, so the set of
//! facetable labels changes at runtime. Loads go through [`MetadataSchemaSource`]
//! and are memoized per model for a bounded time by [`MetadataSchemaCache`].

use crate::{Error, Result};
use async_trait::async_trait;
use dataspace_search_dsl::{MetadataDataType, MetadataField, MetadataModel, MetadataSchema};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[async_trait]
pub trait MetadataSchemaSource: Send + Sync {
    async fn load(&self, model: MetadataModel) -> Result<MetadataSchema>;
}

/// Reads metadata field rows from the catalog database.
pub struct PostgresMetadataSource {
    pool: PgPool,
    query: String,
}

impl PostgresMetadataSource {
    /// Build a source with a lazily connecting pool.
    pub fn connect_lazy(
        url: &str,
        table: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        if table.is_empty()
            || !table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            return Err(Error::Validation(format!(
                "Invalid metadata table name '{table}'"
            )));
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_lazy(url)?;

        Ok(Self {
            pool,
            query: format!(
                "SELECT id::bigint, label, data_type, model, enabled, filterable \
                 FROM {table} WHERE model = $1 ORDER BY id"
            ),
        })
    }
}

#[async_trait]
impl MetadataSchemaSource for PostgresMetadataSource {
    async fn load(&self, model: MetadataModel) -> Result<MetadataSchema> {
        let rows: Vec<(i64, String, String, String, bool, bool)> = sqlx::query_as(&self.query)
            .bind(model.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        let mut fields = Vec::with_capacity(rows.len());
        for (id, label, data_type, row_model, enabled, filterable) in rows {
            let (Ok(data_type), Ok(row_model)) = (
                data_type.parse::<MetadataDataType>(),
                row_model.parse::<MetadataModel>(),
            ) else {
                tracing::warn!(id, label = %label, "Skipping metadata field with unrecognized type or model");
                continue;
            };
            fields.push(MetadataField {
                id,
                label,
                data_type,
                model: row_model,
                enabled,
                filterable,
            });
        }

        Ok(MetadataSchema::new(fields))
    }
}

/// Fixed in-memory fields, used when no catalog database is configured.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadataSource {
    fields: Vec<MetadataField>,
}

impl StaticMetadataSource {
    pub fn new(fields: Vec<MetadataField>) -> Self {
        Self { fields }
    }
}

#[async_trait]
impl MetadataSchemaSource for StaticMetadataSource {
    async fn load(&self, model: MetadataModel) -> Result<MetadataSchema> {
        Ok(MetadataSchema::new(
            self.fields
                .iter()
                .filter(|f| f.model == model)
                .cloned()
                .collect(),
        ))
    }
}

struct CachedSchema {
    schema: Arc<MetadataSchema>,
    loaded_at: Instant,
}

/// Per-model schema memo with a bounded lifetime.
pub struct MetadataSchemaCache {
    source: Arc<dyn MetadataSchemaSource>,
    ttl: Duration,
    entries: RwLock<HashMap<MetadataModel, CachedSchema>>,
}

impl MetadataSchemaCache {
    pub fn new(source: Arc<dyn MetadataSchemaSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Current schema for `model`, reloading when the cached copy is too old.
    ///
    /// A failed reload falls back to the stale copy if one exists.
    pub async fn schema(&self, model: MetadataModel) -> Result<Arc<MetadataSchema>> {
        let stale = {
            let entries = self.entries.read().await;
            match entries.get(&model) {
                Some(entry) if entry.loaded_at.elapsed() < self.ttl => {
                    tracing::debug!(model = model.as_str(), "Metadata schema cache hit");
                    return Ok(entry.schema.clone());
                }
                Some(entry) => Some(entry.schema.clone()),
                None => None,
            }
        };

        tracing::debug!(model = model.as_str(), "Metadata schema cache miss");
        match self.source.load(model).await {
            Ok(schema) => {
                record_refresh(model, "success");
                let schema = Arc::new(schema);
                self.entries.write().await.insert(
                    model,
                    CachedSchema {
                        schema: schema.clone(),
                        loaded_at: Instant::now(),
                    },
                );
                Ok(schema)
            }
            Err(e) => {
                record_refresh(model, "error");
                match stale {
                    Some(schema) => {
                        tracing::warn!(
                            model = model.as_str(),
                            error = %e,
                            "Metadata schema refresh failed, serving stale copy"
                        );
                        Ok(schema)
                    }
                    None => Err(e),
                }
            }
        }
    }

    /// Drop every cached schema.
    pub async fn invalidate(&self) {
        self.entries.write().await.clear();
        tracing::debug!("Metadata schema cache invalidated");
    }
}

fn record_refresh(model: MetadataModel, status: &str) {
    crate::metrics::SCHEMA_REFRESH_TOTAL
        .with_label_values(&[model.as_str(), status])
        .inc();
}
