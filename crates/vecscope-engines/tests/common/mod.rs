//! In-process stand-ins for the embedding provider and the search engines.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use vecscope_core::{Document, EmbeddedDocument, Embedding, VecscopeError, VecscopeResult};
use vecscope_embedding::Embedder;
use vecscope_engines::adapter::{check_records, check_search_args, op};
use vecscope_engines::{BackendAdapter, NativeHit, Registry, ScoreTransform};

/// Terms the keyword embedder counts; one vector slot per term.
pub const VOCABULARY: [&str; 20] = [
    "vector", "database", "similarity", "search", "embeddings", "machine", "learning", "models",
    "deep", "neural", "network", "language", "text", "computer", "vision", "pixels", "query",
    "nearest", "neighbor", "images",
];

/// Deterministic embedder: term counts over [`VOCABULARY`].
#[derive(Default)]
pub struct KeywordEmbedder {
    calls: AtomicUsize,
    fail: bool,
}

impl KeywordEmbedder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// An embedder whose provider is down.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> VecscopeResult<Embedding> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.trim().is_empty() {
            return Err(VecscopeError::validation("cannot embed empty text"));
        }
        if self.fail {
            return Err(VecscopeError::provider("API error (429 Too Many Requests)"));
        }

        let mut vector = vec![0.0f32; VOCABULARY.len()];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            if let Some(slot) = VOCABULARY.iter().position(|term| *term == word) {
                vector[slot] += 1.0;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        VOCABULARY.len()
    }

    fn model_name(&self) -> &str {
        "keyword-counts"
    }
}

struct Collection {
    dimension: usize,
    records: BTreeMap<u64, (Document, Embedding)>,
}

/// In-memory engine with exact cosine ranking.
///
/// With [`ScoreTransform::CosineDistance`] it reports `1 - cos` the way a
/// distance-native engine does.
pub struct MemoryAdapter {
    name: String,
    transform: ScoreTransform,
    collection: String,
    dimension: usize,
    fail_ingest: bool,
    searches: AtomicUsize,
    state: Mutex<Option<Collection>>,
}

impl MemoryAdapter {
    pub fn new(name: &str, transform: ScoreTransform, dimension: usize) -> Self {
        Self {
            name: name.to_string(),
            transform,
            collection: "degree_programs".to_string(),
            dimension,
            fail_ingest: false,
            searches: AtomicUsize::new(0),
            state: Mutex::new(None),
        }
    }

    /// An engine that rejects every write.
    pub fn failing_ingest(name: &str, transform: ScoreTransform, dimension: usize) -> Self {
        Self {
            fail_ingest: true,
            ..Self::new(name, transform, dimension)
        }
    }

    /// Searches that got past argument checks.
    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[async_trait]
impl BackendAdapter for MemoryAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn score_transform(&self) -> ScoreTransform {
        self.transform
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    async fn ensure_collection(&self, name: &str, dimension: usize) -> VecscopeResult<()> {
        let mut state = self.state.lock().unwrap();
        match state.as_ref() {
            Some(existing) if existing.dimension != dimension => Err(VecscopeError::schema(
                &self.name,
                op::ENSURE_COLLECTION,
                format!(
                    "collection '{}' has dimension {}, expected {}",
                    name, existing.dimension, dimension
                ),
            )),
            Some(_) => Ok(()),
            None => {
                *state = Some(Collection {
                    dimension,
                    records: BTreeMap::new(),
                });
                Ok(())
            }
        }
    }

    async fn drop_collection(&self) -> VecscopeResult<()> {
        *self.state.lock().unwrap() = None;
        Ok(())
    }

    async fn ingest(&self, records: &[EmbeddedDocument]) -> VecscopeResult<()> {
        check_records(&self.name, self.dimension, records)?;
        if self.fail_ingest {
            return Err(VecscopeError::ingestion(&self.name, "connection refused"));
        }

        let mut state = self.state.lock().unwrap();
        let collection = state.as_mut().ok_or_else(|| {
            VecscopeError::schema(&self.name, op::INGEST, "collection does not exist")
        })?;
        for record in records {
            collection.records.insert(
                record.document.id,
                (record.document.clone(), record.embedding.clone()),
            );
        }
        Ok(())
    }

    async fn search(&self, query: &[f32], limit: usize) -> VecscopeResult<Vec<NativeHit>> {
        check_search_args(&self.name, self.dimension, query, limit)?;
        self.searches.fetch_add(1, Ordering::SeqCst);

        let state = self.state.lock().unwrap();
        let collection = state.as_ref().ok_or_else(|| {
            VecscopeError::schema(&self.name, op::SEARCH, "collection does not exist")
        })?;

        let mut scored: Vec<(f32, &Document)> = collection
            .records
            .values()
            .map(|(doc, embedding)| (cosine(query, embedding), doc))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(similarity, doc)| NativeHit {
                id: Some(doc.id),
                metric: Some(match self.transform {
                    ScoreTransform::Similarity => similarity,
                    ScoreTransform::CosineDistance => 1.0 - similarity,
                }),
                fields: doc.to_fields(),
            })
            .collect())
    }

    async fn count(&self) -> VecscopeResult<u64> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .as_ref()
            .map(|c| c.records.len() as u64)
            .unwrap_or(0))
    }

    async fn health(&self) -> VecscopeResult<()> {
        Ok(())
    }
}

/// The three engine names, with the typesense stand-in reporting distances.
pub fn memory_registry(dimension: usize) -> Registry {
    let mut registry = Registry::new();
    registry
        .register(Box::new(MemoryAdapter::new(
            "qdrant",
            ScoreTransform::Similarity,
            dimension,
        )))
        .unwrap();
    registry
        .register(Box::new(MemoryAdapter::new(
            "elasticsearch",
            ScoreTransform::Similarity,
            dimension,
        )))
        .unwrap();
    registry
        .register(Box::new(MemoryAdapter::new(
            "typesense",
            ScoreTransform::CosineDistance,
            dimension,
        )))
        .unwrap();
    registry
}
