#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode},
    Router,
};
use dataspace_search::{
    api::create_router, backend::SearchBackend, schema::StaticMetadataSource, AppState, Config,
    Error, Result,
};
use dataspace_search_dsl::{MetadataDataType, MetadataField, MetadataModel};
use serde_json::{json, Value as JsonValue};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt as _;

/// In-memory index cluster: answers every search with the same body and
/// records what it was asked.
pub struct FakeBackend {
    response: Mutex<JsonValue>,
    calls: Mutex<Vec<(Vec<String>, JsonValue)>>,
    healthy: AtomicBool,
}

impl FakeBackend {
    pub fn new(response: JsonValue) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(response),
            calls: Mutex::new(Vec::new()),
            healthy: AtomicBool::new(true),
        })
    }

    pub fn set_response(&self, response: JsonValue) {
        *self.response.lock().unwrap() = response;
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(Vec<String>, JsonValue)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_body(&self) -> JsonValue {
        self.calls
            .lock()
            .unwrap()
            .last()
            .map(|(_, body)| body.clone())
            .unwrap_or(JsonValue::Null)
    }
}

#[async_trait]
impl SearchBackend for FakeBackend {
    async fn search(&self, indices: &[String], body: &JsonValue) -> Result<JsonValue> {
        self.calls
            .lock()
            .unwrap()
            .push((indices.to_vec(), body.clone()));
        Ok(self.response.lock().unwrap().clone())
    }

    async fn ping(&self) -> Result<()> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::BackendUnavailable("connection refused".to_string()))
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub backend: Arc<FakeBackend>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::new_with_config(|_| {})
    }

    pub fn new_with_config(configure: impl FnOnce(&mut Config)) -> Self {
        let mut config = Config::default();
        configure(&mut config);

        let backend = FakeBackend::new(search_response(
            vec![hit("dataset", "d1", json!({"title": "Rainfall"}))],
            1,
            json!({}),
        ));
        let source = StaticMetadataSource::new(metadata_fields());
        let state = AppState::from_parts(config, backend.clone(), Arc::new(source));
        let router = create_router(state.clone());

        Self {
            router,
            state,
            backend,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        path_and_query: &str,
    ) -> anyhow::Result<(StatusCode, HeaderMap, Bytes)> {
        self.request_with_headers(method, path_and_query, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        path_and_query: &str,
        extra_headers: &[(&str, &str)],
    ) -> anyhow::Result<(StatusCode, HeaderMap, Bytes)> {
        let mut req = Request::builder()
            .method(method)
            .uri(path_and_query)
            .body(Body::empty())?;
        for (name, value) in extra_headers {
            req.headers_mut().insert(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }

        let response = self.router.clone().oneshot(req).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, headers, body))
    }

    pub async fn get_json(&self, path_and_query: &str) -> anyhow::Result<(StatusCode, JsonValue)> {
        let (status, _, body) = self.request(Method::GET, path_and_query).await?;
        Ok((status, serde_json::from_slice(&body)?))
    }
}

pub fn metadata_fields() -> Vec<MetadataField> {
    vec![
        MetadataField {
            id: 1,
            label: "Geography".to_string(),
            data_type: MetadataDataType::Select,
            model: MetadataModel::Dataset,
            enabled: true,
            filterable: true,
        },
        MetadataField {
            id: 2,
            label: "Source".to_string(),
            data_type: MetadataDataType::String,
            model: MetadataModel::Dataset,
            enabled: true,
            filterable: false,
        },
        MetadataField {
            id: 3,
            label: "Domain".to_string(),
            data_type: MetadataDataType::Select,
            model: MetadataModel::Usecase,
            enabled: true,
            filterable: true,
        },
    ]
}

pub fn hit(index: &str, id: &str, source: JsonValue) -> JsonValue {
    json!({ "_index": index, "_id": id, "_score": 1.0, "_source": source })
}

pub fn search_response(hits: Vec<JsonValue>, total: u64, aggregations: JsonValue) -> JsonValue {
    json!({
        "hits": { "total": { "value": total, "relation": "eq" }, "hits": hits },
        "aggregations": aggregations,
    })
}
