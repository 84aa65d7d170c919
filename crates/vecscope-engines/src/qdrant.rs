//! Qdrant adapter.
//!
//! Manages the collection, upserts points and runs similarity search against
//! the Qdrant service via the qdrant-client gRPC library. Point ids are the
//! numeric document ids, so re-ingestion overwrites in place.

use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, value::Kind, vectors_config::Config as VectorsConfigKind,
    CountPointsBuilder, CreateCollectionBuilder, DeleteCollectionBuilder, Distance, PointStruct,
    ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::{Qdrant, QdrantError};
use serde_json::Map;
use std::collections::HashMap;
use tracing::{debug, info};

use vecscope_core::{EmbeddedDocument, VecscopeError, VecscopeResult};

use crate::adapter::{check_records, check_search_args, op, BackendAdapter, NativeHit, ScoreTransform};

/// Registry name.
pub const QDRANT: &str = "qdrant";

/// Qdrant adapter bound to one collection.
#[derive(Clone)]
pub struct QdrantAdapter {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantAdapter {
    /// Create a new adapter. The connection is established lazily.
    pub fn new(url: &str, collection: &str, dimension: usize) -> VecscopeResult<Self> {
        let client = Qdrant::from_url(url).build().map_err(|e| {
            VecscopeError::config(format!("failed to create Qdrant client: {}", e))
        })?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            dimension,
        })
    }

    /// Vector size of an existing collection, `None` for named-vector setups.
    async fn existing_dimension(&self, name: &str) -> VecscopeResult<Option<u64>> {
        let info = self
            .client
            .collection_info(name)
            .await
            .map_err(|e| map_err(op::ENSURE_COLLECTION, e))?;

        Ok(info
            .result
            .and_then(|r| r.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config)
            .and_then(|c| match c {
                VectorsConfigKind::Params(params) => Some(params.size),
                VectorsConfigKind::ParamsMap(_) => None,
            }))
    }
}

#[async_trait]
impl BackendAdapter for QdrantAdapter {
    fn name(&self) -> &str {
        QDRANT
    }

    fn score_transform(&self) -> ScoreTransform {
        ScoreTransform::Similarity
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    async fn ensure_collection(&self, name: &str, dimension: usize) -> VecscopeResult<()> {
        let exists = self
            .client
            .collection_exists(name)
            .await
            .map_err(|e| map_err(op::ENSURE_COLLECTION, e))?;

        if exists {
            match self.existing_dimension(name).await? {
                Some(size) if size as usize != dimension => {
                    return Err(VecscopeError::schema(
                        QDRANT,
                        op::ENSURE_COLLECTION,
                        format!(
                            "collection '{}' has dimension {}, expected {}",
                            name, size, dimension
                        ),
                    ));
                }
                Some(_) => {}
                None => {
                    return Err(VecscopeError::schema(
                        QDRANT,
                        op::ENSURE_COLLECTION,
                        format!("collection '{}' does not use a single unnamed vector", name),
                    ));
                }
            }
            debug!(collection = name, "Collection already exists");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dimension as u64, Distance::Cosine)),
            )
            .await
            .map_err(|e| map_err(op::ENSURE_COLLECTION, e))?;

        info!(collection = name, dimension, "Created Qdrant collection");
        Ok(())
    }

    async fn drop_collection(&self) -> VecscopeResult<()> {
        let exists = self
            .client
            .collection_exists(self.collection.as_str())
            .await
            .map_err(|e| map_err(op::DROP_COLLECTION, e))?;

        if exists {
            self.client
                .delete_collection(DeleteCollectionBuilder::new(self.collection.as_str()))
                .await
                .map_err(|e| map_err(op::DROP_COLLECTION, e))?;
            info!(collection = %self.collection, "Dropped Qdrant collection");
        }
        Ok(())
    }

    async fn ingest(&self, records: &[EmbeddedDocument]) -> VecscopeResult<()> {
        check_records(QDRANT, self.dimension, records)?;
        if records.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = records.iter().map(record_to_point).collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| map_err(op::INGEST, e))?;

        debug!(collection = %self.collection, count = records.len(), "Upserted points");
        Ok(())
    }

    async fn search(&self, query: &[f32], limit: usize) -> VecscopeResult<Vec<NativeHit>> {
        check_search_args(QDRANT, self.dimension, query, limit)?;

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query.to_vec(), limit as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| map_err(op::SEARCH, e))?;

        Ok(response.result.into_iter().map(scored_point_to_hit).collect())
    }

    async fn count(&self) -> VecscopeResult<u64> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(|e| map_err(op::COUNT, e))?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    async fn health(&self) -> VecscopeResult<()> {
        self.client
            .health_check()
            .await
            .map_err(|e| map_err(op::HEALTH, e))?;
        Ok(())
    }
}

/// Classify a client error. A missing collection is a schema problem,
/// whatever the operation; other write failures are ingestion errors.
fn map_err(operation: &str, e: QdrantError) -> VecscopeError {
    match &e {
        QdrantError::ResponseError { status } if status.code() == tonic::Code::NotFound => {
            VecscopeError::schema(
                QDRANT,
                operation,
                format!("collection does not exist: {}", status.message()),
            )
        }
        _ if operation == op::INGEST => VecscopeError::ingestion(QDRANT, e.to_string()),
        _ => VecscopeError::backend(QDRANT, operation, e.to_string()),
    }
}

fn record_to_point(record: &EmbeddedDocument) -> PointStruct {
    let payload = json_to_payload(&record.document.to_fields());
    PointStruct::new(record.document.id, record.embedding.clone(), payload)
}

fn scored_point_to_hit(point: ScoredPoint) -> NativeHit {
    let id = point.id.and_then(|id| match id.point_id_options {
        Some(PointIdOptions::Num(n)) => Some(n),
        _ => None,
    });

    NativeHit {
        id,
        metric: Some(point.score),
        fields: payload_to_json(&point.payload),
    }
}

/// Convert a JSON object to a Qdrant payload map.
fn json_to_payload(json: &Map<String, serde_json::Value>) -> HashMap<String, Value> {
    json.iter()
        .filter_map(|(key, val)| json_value_to_qdrant(val).map(|v| (key.clone(), v)))
        .collect()
}

/// Convert a serde_json value to a Qdrant Value. Integers stay integers.
fn json_value_to_qdrant(val: &serde_json::Value) -> Option<Value> {
    let kind = match val {
        serde_json::Value::String(s) => Kind::StringValue(s.clone()),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Kind::IntegerValue(i)
            } else {
                Kind::DoubleValue(n.as_f64()?)
            }
        }
        serde_json::Value::Bool(b) => Kind::BoolValue(*b),
        _ => return None,
    };
    Some(Value { kind: Some(kind) })
}

/// Convert a Qdrant payload back to a JSON object.
fn payload_to_json(payload: &HashMap<String, Value>) -> Map<String, serde_json::Value> {
    let mut map = Map::new();

    for (key, val) in payload {
        if let Some(kind) = &val.kind {
            let json_val = match kind {
                Kind::StringValue(s) => serde_json::Value::String(s.clone()),
                Kind::DoubleValue(f) => serde_json::json!(*f),
                Kind::IntegerValue(i) => serde_json::json!(*i),
                Kind::BoolValue(b) => serde_json::Value::Bool(*b),
                _ => continue,
            };
            map.insert(key.clone(), json_val);
        }
    }

    map
}
