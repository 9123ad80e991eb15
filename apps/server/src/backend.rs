//! Search index backend
//!
//! The service only needs two calls from the index cluster: run a `_search`
//! body against a set of indices, and a liveness ping. Both sit behind
//! [`SearchBackend`] so tests can substitute a recording fake.

use crate::config::IndexConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::time::{Duration, Instant};

#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Execute a `_search` body against `indices` and return the raw response.
    async fn search(&self, indices: &[String], body: &JsonValue) -> Result<JsonValue>;

    /// Check that the cluster answers.
    async fn ping(&self) -> Result<()>;
}

/// Elasticsearch/OpenSearch client over plain HTTP.
pub struct ElasticsearchClient {
    http: reqwest::Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl ElasticsearchClient {
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.username {
            Some(user) => request.basic_auth(user, self.password.as_deref()),
            None => request,
        }
    }

    fn search_url(&self, indices: &[String]) -> String {
        format!("{}/{}/_search", self.base_url, indices.join(","))
    }
}

#[async_trait]
impl SearchBackend for ElasticsearchClient {
    #[tracing::instrument(name = "backend.search", skip_all, fields(indices = %indices.join(",")))]
    async fn search(&self, indices: &[String], body: &JsonValue) -> Result<JsonValue> {
        if indices.is_empty() {
            return Err(Error::Internal("search called without indices".to_string()));
        }

        let start = Instant::now();
        let response = self
            .authorize(self.http.post(self.search_url(indices)).json(body))
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                observe("search", "error", start);
                return Err(e.into());
            }
        };

        let status = response.status();
        if !status.is_success() {
            observe("search", "error", start);
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %text, "Search backend rejected request");
            return Err(Error::Backend(format!("{status}: {text}")));
        }

        let json: JsonValue = response.json().await?;
        observe("search", "success", start);
        Ok(json)
    }

    async fn ping(&self) -> Result<()> {
        let start = Instant::now();
        let response = self
            .authorize(self.http.get(format!("{}/", self.base_url)))
            .send()
            .await?;
        let status = response.status();
        observe(
            "ping",
            if status.is_success() { "success" } else { "error" },
            start,
        );
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::BackendUnavailable(format!("ping returned {status}")))
        }
    }
}

fn observe(operation: &str, status: &str, start: Instant) {
    crate::metrics::BACKEND_REQUEST_DURATION_SECONDS
        .with_label_values(&[operation, status])
        .observe(start.elapsed().as_secs_f64());
}
