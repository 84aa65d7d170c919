//! Elasticsearch adapter.
//!
//! Stores documents in an index with a `dense_vector` field (cosine
//! similarity) and queries it with approximate kNN over the REST API.
//! Documents are indexed under `_id = document id` through `_bulk`, so
//! re-ingestion replaces in place.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use vecscope_core::config::ElasticsearchConfig;
use vecscope_core::{EmbeddedDocument, VecscopeError, VecscopeResult};

use crate::adapter::{check_records, check_search_args, op, BackendAdapter, NativeHit, ScoreTransform};

/// Registry name.
pub const ELASTICSEARCH: &str = "elasticsearch";

const VECTOR_FIELD: &str = "embedding";
const SOURCE_FIELDS: [&str; 6] = ["id", "title", "shortDescription", "description", "image", "url"];

/// Elasticsearch adapter bound to one index.
#[derive(Clone)]
pub struct ElasticsearchAdapter {
    base_url: String,
    index: String,
    dimension: usize,
    num_candidates: u32,
    client: reqwest::Client,
}

impl ElasticsearchAdapter {
    pub fn new(config: &ElasticsearchConfig, index: &str, dimension: usize) -> VecscopeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VecscopeError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            index: index.to_string(),
            dimension,
            num_candidates: config.num_candidates,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn err(&self, operation: &str, e: impl std::fmt::Display) -> VecscopeError {
        VecscopeError::backend(ELASTICSEARCH, operation, e.to_string())
    }

    /// Turn a non-2xx response into a backend error carrying the body.
    async fn status_err(&self, operation: &str, response: reqwest::Response) -> VecscopeError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        self.err(operation, format!("HTTP {}: {}", status, body))
    }

    async fn refresh(&self) -> VecscopeResult<()> {
        let response = self
            .client
            .post(self.url(&format!("{}/_refresh", self.index)))
            .send()
            .await
            .map_err(|e| VecscopeError::ingestion(ELASTICSEARCH, e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VecscopeError::ingestion(
                ELASTICSEARCH,
                format!("refresh failed (HTTP {}): {}", status, body),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BackendAdapter for ElasticsearchAdapter {
    fn name(&self) -> &str {
        ELASTICSEARCH
    }

    /// kNN `_score` for cosine is `(1 + cos) / 2`, already higher-is-better.
    fn score_transform(&self) -> ScoreTransform {
        ScoreTransform::Similarity
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn collection(&self) -> &str {
        &self.index
    }

    async fn ensure_collection(&self, name: &str, dimension: usize) -> VecscopeResult<()> {
        let response = self
            .client
            .head(self.url(name))
            .send()
            .await
            .map_err(|e| self.err(op::ENSURE_COLLECTION, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => {}
            s if s.is_success() => {
                let response = self
                    .client
                    .get(self.url(&format!("{}/_mapping", name)))
                    .send()
                    .await
                    .map_err(|e| self.err(op::ENSURE_COLLECTION, e))?;
                if !response.status().is_success() {
                    return Err(self.status_err(op::ENSURE_COLLECTION, response).await);
                }
                let mapping: Value = response
                    .json()
                    .await
                    .map_err(|e| self.err(op::ENSURE_COLLECTION, e))?;

                return match mapping_dimension(&mapping, name) {
                    Some(dims) if dims as usize == dimension => {
                        debug!(index = name, "Index already exists");
                        Ok(())
                    }
                    Some(dims) => Err(VecscopeError::schema(
                        ELASTICSEARCH,
                        op::ENSURE_COLLECTION,
                        format!("index '{}' has dimension {}, expected {}", name, dims, dimension),
                    )),
                    None => Err(VecscopeError::schema(
                        ELASTICSEARCH,
                        op::ENSURE_COLLECTION,
                        format!("index '{}' has no '{}' dense_vector field", name, VECTOR_FIELD),
                    )),
                };
            }
            _ => return Err(self.status_err(op::ENSURE_COLLECTION, response).await),
        }

        let response = self
            .client
            .put(self.url(name))
            .json(&index_mapping(dimension))
            .send()
            .await
            .map_err(|e| self.err(op::ENSURE_COLLECTION, e))?;

        if !response.status().is_success() {
            return Err(self.status_err(op::ENSURE_COLLECTION, response).await);
        }

        info!(index = name, dimension, "Created Elasticsearch index");
        Ok(())
    }

    async fn drop_collection(&self) -> VecscopeResult<()> {
        let response = self
            .client
            .delete(self.url(&self.index))
            .send()
            .await
            .map_err(|e| self.err(op::DROP_COLLECTION, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            s if s.is_success() => {
                info!(index = %self.index, "Dropped Elasticsearch index");
                Ok(())
            }
            _ => Err(self.status_err(op::DROP_COLLECTION, response).await),
        }
    }

    async fn ingest(&self, records: &[EmbeddedDocument]) -> VecscopeResult<()> {
        check_records(ELASTICSEARCH, self.dimension, records)?;
        if records.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .post(self.url("_bulk"))
            .header("Content-Type", "application/x-ndjson")
            .body(bulk_body(&self.index, records))
            .send()
            .await
            .map_err(|e| VecscopeError::ingestion(ELASTICSEARCH, e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VecscopeError::ingestion(
                ELASTICSEARCH,
                format!("bulk request failed (HTTP {}): {}", status, body),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| VecscopeError::ingestion(ELASTICSEARCH, e.to_string()))?;

        let failed = bulk_failures(&body);
        if !failed.is_empty() {
            warn!(index = %self.index, failed = failed.len(), "Bulk indexing had failures");
            return Err(VecscopeError::ingestion(
                ELASTICSEARCH,
                format!(
                    "{} of {} documents failed: {}",
                    failed.len(),
                    records.len(),
                    failed.join("; ")
                ),
            ));
        }

        self.refresh().await?;

        debug!(index = %self.index, count = records.len(), "Indexed documents");
        Ok(())
    }

    async fn search(&self, query: &[f32], limit: usize) -> VecscopeResult<Vec<NativeHit>> {
        check_search_args(ELASTICSEARCH, self.dimension, query, limit)?;

        let response = self
            .client
            .post(self.url(&format!("{}/_search", self.index)))
            .json(&search_body(query, limit, self.num_candidates))
            .send()
            .await
            .map_err(|e| self.err(op::SEARCH, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(VecscopeError::schema(
                ELASTICSEARCH,
                op::SEARCH,
                format!("index '{}' does not exist", self.index),
            ));
        }
        if !response.status().is_success() {
            return Err(self.status_err(op::SEARCH, response).await);
        }

        let body: Value = response.json().await.map_err(|e| self.err(op::SEARCH, e))?;
        parse_search_response(&body)
    }

    async fn count(&self) -> VecscopeResult<u64> {
        let response = self
            .client
            .get(self.url(&format!("{}/_count", self.index)))
            .send()
            .await
            .map_err(|e| self.err(op::COUNT, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(VecscopeError::schema(
                ELASTICSEARCH,
                op::COUNT,
                format!("index '{}' does not exist", self.index),
            ));
        }
        if !response.status().is_success() {
            return Err(self.status_err(op::COUNT, response).await);
        }

        let body: Value = response.json().await.map_err(|e| self.err(op::COUNT, e))?;
        body.get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| self.err(op::COUNT, "response has no count"))
    }

    async fn health(&self) -> VecscopeResult<()> {
        let response = self
            .client
            .get(self.url("_cluster/health"))
            .send()
            .await
            .map_err(|e| self.err(op::HEALTH, e))?;

        if !response.status().is_success() {
            return Err(self.status_err(op::HEALTH, response).await);
        }
        Ok(())
    }
}

/// Index creation body: stored fields plus the cosine `dense_vector`.
fn index_mapping(dimension: usize) -> Value {
    json!({
        "mappings": {
            "properties": {
                "id": {"type": "long"},
                "title": {"type": "text"},
                "shortDescription": {"type": "text"},
                "description": {"type": "text"},
                "image": {"type": "keyword"},
                "url": {"type": "keyword"},
                VECTOR_FIELD: {
                    "type": "dense_vector",
                    "dims": dimension,
                    "index": true,
                    "similarity": "cosine"
                }
            }
        }
    })
}

/// `dims` of the vector field in a `GET {index}/_mapping` response.
fn mapping_dimension(mapping: &Value, index: &str) -> Option<u64> {
    mapping
        .get(index)?
        .pointer(&format!("/mappings/properties/{}/dims", VECTOR_FIELD))?
        .as_u64()
}

/// NDJSON body for `_bulk`: one `index` action per record, keyed by id.
fn bulk_body(index: &str, records: &[EmbeddedDocument]) -> String {
    let mut body = String::new();
    for record in records {
        let action = json!({"index": {"_index": index, "_id": record.document.id.to_string()}});
        let mut source = record.document.to_fields();
        source.insert(VECTOR_FIELD.to_string(), json!(record.embedding));

        body.push_str(&action.to_string());
        body.push('\n');
        body.push_str(&Value::Object(source).to_string());
        body.push('\n');
    }
    body
}

/// Ids and reasons of failed items in a `_bulk` response.
fn bulk_failures(body: &Value) -> Vec<String> {
    if !body.get("errors").and_then(Value::as_bool).unwrap_or(false) {
        return Vec::new();
    }

    body.get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("index"))
                .filter(|result| result.get("error").is_some())
                .map(|result| {
                    let id = result.get("_id").and_then(Value::as_str).unwrap_or("?");
                    let reason = result
                        .pointer("/error/reason")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error");
                    format!("id {}: {}", id, reason)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// kNN search body. `num_candidates` must be at least `k`.
fn search_body(query: &[f32], limit: usize, num_candidates: u32) -> Value {
    json!({
        "knn": {
            "field": VECTOR_FIELD,
            "query_vector": query,
            "k": limit,
            "num_candidates": (num_candidates as usize).max(limit)
        },
        "size": limit,
        "_source": SOURCE_FIELDS
    })
}

fn parse_search_response(body: &Value) -> VecscopeResult<Vec<NativeHit>> {
    let hits = body
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            VecscopeError::backend(ELASTICSEARCH, op::SEARCH, "response has no hits array")
        })?;

    Ok(hits
        .iter()
        .map(|hit| NativeHit {
            id: hit
                .get("_id")
                .and_then(Value::as_str)
                .and_then(|id| id.parse().ok()),
            metric: hit.get("_score").and_then(Value::as_f64).map(|s| s as f32),
            fields: hit
                .get("_source")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vecscope_core::sample_documents;

    fn records() -> Vec<EmbeddedDocument> {
        sample_documents()
            .into_iter()
            .take(2)
            .map(|document| EmbeddedDocument {
                document,
                embedding: vec![0.5, 0.25],
            })
            .collect()
    }

    #[test]
    fn test_mapping_declares_cosine_vector() {
        let mapping = index_mapping(1536);
        let vector = &mapping["mappings"]["properties"]["embedding"];
        assert_eq!(vector["type"], "dense_vector");
        assert_eq!(vector["dims"], 1536);
        assert_eq!(vector["similarity"], "cosine");
    }

    #[test]
    fn test_mapping_dimension_lookup() {
        let body = json!({
            "degree_programs": {
                "mappings": {"properties": {"embedding": {"type": "dense_vector", "dims": 768}}}
            }
        });
        assert_eq!(mapping_dimension(&body, "degree_programs"), Some(768));
        assert_eq!(mapping_dimension(&body, "other"), None);
    }

    #[test]
    fn test_bulk_body_keys_by_document_id() {
        let body = bulk_body("topics", &records());
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 4);

        let action: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(action["index"]["_id"], "1");
        assert_eq!(action["index"]["_index"], "topics");

        let source: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(source["title"], "Vector Search");
        assert_eq!(source["embedding"], json!([0.5, 0.25]));
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn test_bulk_failures_reported() {
        let ok = json!({"errors": false, "items": [{"index": {"_id": "1", "status": 200}}]});
        assert!(bulk_failures(&ok).is_empty());

        let partial = json!({
            "errors": true,
            "items": [
                {"index": {"_id": "1", "status": 201}},
                {"index": {"_id": "2", "status": 400,
                    "error": {"type": "mapper_parsing_exception", "reason": "bad vector"}}}
            ]
        });
        assert_eq!(bulk_failures(&partial), vec!["id 2: bad vector".to_string()]);
    }

    #[test]
    fn test_search_body_shape() {
        let body = search_body(&[0.1, 0.2], 3, 100);
        assert_eq!(body["knn"]["k"], 3);
        assert_eq!(body["knn"]["num_candidates"], 100);
        assert_eq!(body["size"], 3);
        assert_eq!(body["_source"].as_array().unwrap().len(), 6);

        let wide = search_body(&[0.1, 0.2], 500, 100);
        assert_eq!(wide["knn"]["num_candidates"], 500);
    }

    #[test]
    fn test_parse_search_response_keeps_order() {
        let body = json!({
            "hits": {
                "total": {"value": 2},
                "hits": [
                    {"_id": "1", "_score": 0.95, "_source": {"id": 1, "title": "Vector Search"}},
                    {"_id": "4", "_score": 0.71, "_source": {"id": 4, "title": "NLP"}}
                ]
            }
        });
        let hits = parse_search_response(&body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, Some(1));
        assert_eq!(hits[1].id, Some(4));
        assert!((hits[0].metric.unwrap() - 0.95).abs() < 1e-6);
        assert_eq!(hits[1].fields["title"], "NLP");
    }

    #[test]
    fn test_parse_search_response_missing_score() {
        let body = json!({
            "hits": {"hits": [{"_id": "2", "_score": null, "_source": {"id": 2}}]}
        });
        let hits = parse_search_response(&body).unwrap();
        assert_eq!(hits[0].id, Some(2));
        assert_eq!(hits[0].metric, None);
    }

    #[test]
    fn test_parse_search_response_without_hits() {
        assert!(parse_search_response(&json!({"error": "boom"})).is_err());
    }

    /// Serve one canned HTTP response on a loopback port.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_count_missing_index_is_schema_error() {
        let url = serve_once(
            "404 Not Found",
            r#"{"error":{"type":"index_not_found_exception"},"status":404}"#,
        )
        .await;
        let config = ElasticsearchConfig {
            url,
            ..ElasticsearchConfig::default()
        };
        let adapter = ElasticsearchAdapter::new(&config, "topics", 4).unwrap();

        match adapter.count().await.unwrap_err() {
            VecscopeError::Schema {
                backend,
                operation,
                message,
            } => {
                assert_eq!(backend, ELASTICSEARCH);
                assert_eq!(operation, op::COUNT);
                assert!(message.contains("'topics'"), "{}", message);
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_count_reads_total() {
        let url = serve_once("200 OK", r#"{"count":5,"_shards":{"total":1}}"#).await;
        let config = ElasticsearchConfig {
            url,
            ..ElasticsearchConfig::default()
        };
        let adapter = ElasticsearchAdapter::new(&config, "topics", 4).unwrap();
        assert_eq!(adapter.count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_before_network() {
        let config = ElasticsearchConfig {
            url: "http://127.0.0.1:9".to_string(),
            ..ElasticsearchConfig::default()
        };
        let adapter = ElasticsearchAdapter::new(&config, "topics", 4).unwrap();
        let err = adapter.search(&[0.1, 0.2], 3).await.unwrap_err();
        assert!(matches!(err, VecscopeError::Schema { .. }));
    }
}
