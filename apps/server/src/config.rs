//! Service configuration
//!
//! Values are layered, later sources winning:
//! 1. Built-in defaults
//! 2. `config/default.toml` (optional)
//! 3. The file named by `DATASPACE_CONFIG` (optional)
//! 4. Environment variables `DATASPACE__SECTION__KEY` (a `.env` file is loaded first)

use dataspace_search_dsl::{AggregationOptions, EntityKind, PageLimits};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub index: IndexConfig,
    pub search: SearchConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_request_body_size: usize,
    /// Allowed CORS origins; empty disables CORS headers.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_request_body_size: 64 * 1024,
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres URL of the catalog database holding metadata field definitions.
    pub url: Option<String>,
    pub pool_max_size: u32,
    pub pool_timeout_seconds: u64,
    pub metadata_table: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_max_size: 5,
            pool_timeout_seconds: 10,
            metadata_table: "api_metadata".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Base URL of the Elasticsearch-compatible cluster.
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_seconds: u64,
    pub dataset: String,
    pub usecase: String,
    pub aimodel: String,
    pub publishers: Vec<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            username: None,
            password: None,
            timeout_seconds: 10,
            dataset: "dataset".to_string(),
            usecase: "usecase".to_string(),
            aimodel: "aimodel".to_string(),
            publishers: vec![
                "organization_publisher".to_string(),
                "user_publisher".to_string(),
            ],
        }
    }
}

impl IndexConfig {
    /// Concrete index names searched for an entity.
    ///
    /// Unified search resolves its indices per request from `types`.
    pub fn indices_for(&self, kind: EntityKind) -> Vec<String> {
        match kind {
            EntityKind::Dataset => vec![self.dataset.clone()],
            EntityKind::Usecase => vec![self.usecase.clone()],
            EntityKind::Aimodel => vec![self.aimodel.clone()],
            EntityKind::Publisher => self.publishers.clone(),
            EntityKind::Unified => EntityKind::UNIFIED_MEMBERS
                .iter()
                .flat_map(|k| self.indices_for(*k))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_size: usize,
    pub max_size: usize,
    /// Must not exceed the index `max_result_window` setting.
    pub max_result_window: usize,
    pub facet_size: usize,
    pub composite_page_size: usize,
    pub max_composite_pages: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_size: 10,
            max_size: 100,
            max_result_window: 10_000,
            facet_size: 10,
            composite_page_size: 10_000,
            max_composite_pages: 10,
        }
    }
}

impl SearchConfig {
    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_size: self.default_size,
            max_size: self.max_size,
            max_result_window: self.max_result_window,
        }
    }

    pub fn aggregation_options(&self) -> AggregationOptions {
        AggregationOptions {
            facet_size: self.facet_size,
            composite_page_size: self.composite_page_size,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_seconds: u64,
    pub max_ttl_seconds: u64,
    /// Maximum number of cached responses.
    pub capacity: usize,
    pub key_prefix: String,
    pub schema_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 900,
            max_ttl_seconds: 86_400,
            capacity: 1_000,
            key_prefix: "dataex".to_string(),
            schema_ttl_seconds: 300,
        }
    }
}

impl CacheConfig {
    /// Effective result TTL.
    pub fn effective_ttl_seconds(&self) -> u64 {
        self.ttl_seconds.min(self.max_ttl_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub file_enabled: bool,
    pub file_directory: String,
    pub file_prefix: String,
    /// `daily`, `hourly`, `minutely` or `never`.
    pub file_rotation: String,
    pub opentelemetry_enabled: bool,
    pub otlp_endpoint: String,
    pub otlp_timeout_seconds: u64,
    pub trace_sample_ratio: f64,
    pub service_name: String,
    pub service_version: Option<String>,
    pub deployment_environment: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file_enabled: false,
            file_directory: "logs".to_string(),
            file_prefix: "search-server".to_string(),
            file_rotation: "daily".to_string(),
            opentelemetry_enabled: false,
            otlp_endpoint: "http://localhost:4317".to_string(),
            otlp_timeout_seconds: 10,
            trace_sample_ratio: 1.0,
            service_name: "dataspace-search".to_string(),
            service_version: None,
            deployment_environment: "development".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        if let Ok(path) = std::env::var("DATASPACE_CONFIG") {
            builder = builder.add_source(config::File::with_name(&path).required(true));
        }

        builder
            .add_source(
                config::Environment::with_prefix("DATASPACE")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .with_list_parse_key("index.publishers")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.search.default_size == 0 {
            return Err("search.default_size must be at least 1".to_string());
        }
        if self.search.default_size > self.search.max_size {
            return Err(format!(
                "search.default_size ({}) exceeds search.max_size ({})",
                self.search.default_size, self.search.max_size
            ));
        }
        if self.search.max_size > self.search.max_result_window {
            return Err(format!(
                "search.max_size ({}) exceeds search.max_result_window ({})",
                self.search.max_size, self.search.max_result_window
            ));
        }
        if self.search.composite_page_size == 0 {
            return Err("search.composite_page_size must be at least 1".to_string());
        }
        if self.cache.enabled && self.cache.capacity == 0 {
            return Err("cache.capacity must be at least 1 when the cache is enabled".to_string());
        }
        if self.index.url.trim().is_empty() {
            return Err("index.url must be set".to_string());
        }
        if self.index.publishers.is_empty() {
            return Err("index.publishers must name at least one index".to_string());
        }
        if !(0.0..=1.0).contains(&self.logging.trace_sample_ratio) {
            return Err("logging.trace_sample_ratio must be within 0.0..=1.0".to_string());
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid server.host '{}': {e}", self.server.host))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.effective_ttl_seconds(), 900);
        assert_eq!(config.socket_addr().unwrap().port(), 8080);
    }

    #[test]
    fn ttl_is_clamped() {
        let cache = CacheConfig {
            ttl_seconds: 10_000,
            max_ttl_seconds: 60,
            ..CacheConfig::default()
        };
        assert_eq!(cache.effective_ttl_seconds(), 60);
    }

    #[test]
    fn invalid_sizes_are_rejected() {
        let mut config = Config::default();
        config.search.default_size = 500;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.search.max_result_window = 50;
        assert!(config.validate().is_err());
    }

    #[test]
    fn page_limits_carry_the_result_window() {
        let mut search = SearchConfig::default();
        search.max_result_window = 500;
        assert_eq!(search.page_limits().max_result_window, 500);
    }

    #[test]
    fn unified_indices_span_member_entities() {
        let index = IndexConfig::default();
        assert_eq!(
            index.indices_for(EntityKind::Unified),
            vec!["dataset", "usecase", "aimodel"]
        );
        assert_eq!(index.indices_for(EntityKind::Publisher).len(), 2);
    }
}
