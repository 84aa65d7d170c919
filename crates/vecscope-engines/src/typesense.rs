//! Typesense adapter.
//!
//! Stores documents in a schema'd collection with a `float[]` vector field
//! and queries it through `multi_search`, which accepts the vector in a POST
//! body instead of the query string. Typesense reports `vector_distance`
//! (cosine distance), so scores are inverted by the normalizer.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use vecscope_core::config::TypesenseConfig;
use vecscope_core::{EmbeddedDocument, VecscopeError, VecscopeResult};

use crate::adapter::{check_records, check_search_args, op, BackendAdapter, NativeHit, ScoreTransform};

/// Registry name.
pub const TYPESENSE: &str = "typesense";

const VECTOR_FIELD: &str = "embedding";
const API_KEY_HEADER: &str = "X-TYPESENSE-API-KEY";

/// Typesense adapter bound to one collection.
#[derive(Clone)]
pub struct TypesenseAdapter {
    base_url: String,
    api_key: String,
    collection: String,
    dimension: usize,
    client: reqwest::Client,
}

impl TypesenseAdapter {
    pub fn new(config: &TypesenseConfig, collection: &str, dimension: usize) -> VecscopeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VecscopeError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            collection: collection.to_string(),
            dimension,
            client,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.base_url, path))
            .header(API_KEY_HEADER, &self.api_key)
    }

    fn err(&self, operation: &str, e: impl std::fmt::Display) -> VecscopeError {
        VecscopeError::backend(TYPESENSE, operation, e.to_string())
    }

    async fn status_err(&self, operation: &str, response: reqwest::Response) -> VecscopeError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        self.err(operation, format!("HTTP {}: {}", status, body))
    }

    /// `GET /collections/{name}`, `None` when it does not exist.
    async fn describe(&self, name: &str, operation: &str) -> VecscopeResult<Option<Value>> {
        let response = self
            .request(reqwest::Method::GET, &format!("collections/{}", name))
            .send()
            .await
            .map_err(|e| self.err(operation, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let body: Value = response.json().await.map_err(|e| self.err(operation, e))?;
                Ok(Some(body))
            }
            _ => Err(self.status_err(operation, response).await),
        }
    }
}

#[async_trait]
impl BackendAdapter for TypesenseAdapter {
    fn name(&self) -> &str {
        TYPESENSE
    }

    fn score_transform(&self) -> ScoreTransform {
        ScoreTransform::CosineDistance
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    async fn ensure_collection(&self, name: &str, dimension: usize) -> VecscopeResult<()> {
        if let Some(existing) = self.describe(name, op::ENSURE_COLLECTION).await? {
            return match schema_dimension(&existing) {
                Some(dims) if dims as usize == dimension => {
                    debug!(collection = name, "Collection already exists");
                    Ok(())
                }
                Some(dims) => Err(VecscopeError::schema(
                    TYPESENSE,
                    op::ENSURE_COLLECTION,
                    format!("collection '{}' has dimension {}, expected {}", name, dims, dimension),
                )),
                None => Err(VecscopeError::schema(
                    TYPESENSE,
                    op::ENSURE_COLLECTION,
                    format!("collection '{}' has no '{}' vector field", name, VECTOR_FIELD),
                )),
            };
        }

        let response = self
            .request(reqwest::Method::POST, "collections")
            .json(&collection_schema(name, dimension))
            .send()
            .await
            .map_err(|e| self.err(op::ENSURE_COLLECTION, e))?;

        if !response.status().is_success() {
            return Err(self.status_err(op::ENSURE_COLLECTION, response).await);
        }

        info!(collection = name, dimension, "Created Typesense collection");
        Ok(())
    }

    async fn drop_collection(&self) -> VecscopeResult<()> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("collections/{}", self.collection))
            .send()
            .await
            .map_err(|e| self.err(op::DROP_COLLECTION, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            s if s.is_success() => {
                info!(collection = %self.collection, "Dropped Typesense collection");
                Ok(())
            }
            _ => Err(self.status_err(op::DROP_COLLECTION, response).await),
        }
    }

    async fn ingest(&self, records: &[EmbeddedDocument]) -> VecscopeResult<()> {
        check_records(TYPESENSE, self.dimension, records)?;
        if records.is_empty() {
            return Ok(());
        }

        let response = self
            .request(
                reqwest::Method::POST,
                &format!("collections/{}/documents/import?action=upsert", self.collection),
            )
            .header("Content-Type", "text/plain")
            .body(import_body(records))
            .send()
            .await
            .map_err(|e| VecscopeError::ingestion(TYPESENSE, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VecscopeError::ingestion(TYPESENSE, e.to_string()))?;

        if !status.is_success() {
            return Err(VecscopeError::ingestion(
                TYPESENSE,
                format!("import failed (HTTP {}): {}", status, body),
            ));
        }

        let failed = import_failures(&body);
        if !failed.is_empty() {
            warn!(collection = %self.collection, failed = failed.len(), "Import had failures");
            return Err(VecscopeError::ingestion(
                TYPESENSE,
                format!(
                    "{} of {} documents failed: {}",
                    failed.len(),
                    records.len(),
                    failed.join("; ")
                ),
            ));
        }

        debug!(collection = %self.collection, count = records.len(), "Imported documents");
        Ok(())
    }

    async fn search(&self, query: &[f32], limit: usize) -> VecscopeResult<Vec<NativeHit>> {
        check_search_args(TYPESENSE, self.dimension, query, limit)?;

        let response = self
            .request(reqwest::Method::POST, "multi_search")
            .json(&multi_search_body(&self.collection, query, limit))
            .send()
            .await
            .map_err(|e| self.err(op::SEARCH, e))?;

        if !response.status().is_success() {
            return Err(self.status_err(op::SEARCH, response).await);
        }

        let body: Value = response.json().await.map_err(|e| self.err(op::SEARCH, e))?;
        parse_multi_search_response(&self.collection, &body)
    }

    async fn count(&self) -> VecscopeResult<u64> {
        let described = self.describe(&self.collection, op::COUNT).await?.ok_or_else(|| {
            VecscopeError::schema(
                TYPESENSE,
                op::COUNT,
                format!("collection '{}' does not exist", self.collection),
            )
        })?;

        described
            .get("num_documents")
            .and_then(Value::as_u64)
            .ok_or_else(|| self.err(op::COUNT, "response has no num_documents"))
    }

    async fn health(&self) -> VecscopeResult<()> {
        let response = self
            .request(reqwest::Method::GET, "health")
            .send()
            .await
            .map_err(|e| self.err(op::HEALTH, e))?;

        if !response.status().is_success() {
            return Err(self.status_err(op::HEALTH, response).await);
        }
        Ok(())
    }
}

fn collection_schema(name: &str, dimension: usize) -> Value {
    json!({
        "name": name,
        "fields": [
            {"name": "title", "type": "string"},
            {"name": "shortDescription", "type": "string"},
            {"name": "description", "type": "string"},
            {"name": "image", "type": "string", "index": false, "optional": true},
            {"name": "url", "type": "string", "index": false, "optional": true},
            {"name": VECTOR_FIELD, "type": "float[]", "num_dim": dimension}
        ]
    })
}

/// `num_dim` of the vector field in a collection description.
fn schema_dimension(collection: &Value) -> Option<u64> {
    collection
        .get("fields")?
        .as_array()?
        .iter()
        .find(|f| f.get("name").and_then(Value::as_str) == Some(VECTOR_FIELD))?
        .get("num_dim")?
        .as_u64()
}

/// JSONL import body. Typesense ids are strings, so the document id is
/// stored in its string form.
fn import_body(records: &[EmbeddedDocument]) -> String {
    let mut body = String::new();
    for record in records {
        let mut doc = record.document.to_fields();
        doc.insert("id".to_string(), json!(record.document.id.to_string()));
        doc.insert(VECTOR_FIELD.to_string(), json!(record.embedding));
        body.push_str(&Value::Object(doc).to_string());
        body.push('\n');
    }
    body
}

/// One JSON object per imported line; collect the ones that failed.
fn import_failures(body: &str) -> Vec<String> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<Value>(line) {
            Ok(result) if result.get("success").and_then(Value::as_bool) == Some(true) => None,
            Ok(result) => {
                let error = result
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                let id = result
                    .get("document")
                    .and_then(Value::as_str)
                    .and_then(|doc| serde_json::from_str::<Value>(doc).ok())
                    .and_then(|doc| doc.get("id").and_then(Value::as_str).map(String::from))
                    .unwrap_or_else(|| "?".to_string());
                Some(format!("id {}: {}", id, error))
            }
            Err(e) => Some(format!("unparseable import result: {}", e)),
        })
        .collect()
}

/// `embedding:([v1,v2,...], k:limit)`
fn vector_query(query: &[f32], limit: usize) -> String {
    let values: Vec<String> = query.iter().map(|v| v.to_string()).collect();
    format!("{}:([{}], k:{})", VECTOR_FIELD, values.join(","), limit)
}

fn multi_search_body(collection: &str, query: &[f32], limit: usize) -> Value {
    json!({
        "searches": [{
            "collection": collection,
            "q": "*",
            "vector_query": vector_query(query, limit),
            "per_page": limit,
            "exclude_fields": VECTOR_FIELD
        }]
    })
}

fn parse_multi_search_response(collection: &str, body: &Value) -> VecscopeResult<Vec<NativeHit>> {
    let result = body
        .get("results")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .ok_or_else(|| VecscopeError::backend(TYPESENSE, op::SEARCH, "response has no results"))?;

    if let Some(error) = result.get("error").and_then(Value::as_str) {
        let code = result.get("code").and_then(Value::as_u64);
        return Err(if code == Some(404) {
            VecscopeError::schema(
                TYPESENSE,
                op::SEARCH,
                format!("collection '{}' does not exist: {}", collection, error),
            )
        } else {
            VecscopeError::backend(TYPESENSE, op::SEARCH, error)
        });
    }

    let hits = match result.get("hits").and_then(Value::as_array) {
        Some(hits) => hits,
        None => return Ok(Vec::new()),
    };

    Ok(hits
        .iter()
        .map(|hit| {
            let fields = hit
                .get("document")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            NativeHit {
                id: fields
                    .get("id")
                    .and_then(Value::as_str)
                    .and_then(|id| id.parse().ok()),
                metric: hit
                    .get("vector_distance")
                    .and_then(Value::as_f64)
                    .map(|d| d as f32),
                fields,
            }
        })
        .collect())
}
