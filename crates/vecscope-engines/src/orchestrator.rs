//! Query orchestration and ingestion across all registered engines.
//!
//! Query path: validate → resolve adapter → embed → adapter search →
//! normalize. Ingestion path: validate documents → embed each once → for
//! every engine concurrently, (drop) → ensure collection → upsert.

use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use vecscope_core::{
    validate_documents, Document, EmbeddedDocument, SearchResult, VecscopeError, VecscopeResult,
};
use vecscope_embedding::Embedder;

use crate::adapter::BackendAdapter;
use crate::normalize::normalize;
use crate::registry::{RegisteredEngine, Registry};

/// Observer for ingestion progress. All methods default to no-ops.
pub trait IngestProgress: Send + Sync {
    /// `done` of `total` documents have been embedded.
    fn embedded(&self, _done: usize, _total: usize, _document: &Document) {}

    fn backend_started(&self, _backend: &str) {}

    fn backend_finished(&self, _backend: &str, _outcome: &VecscopeResult<usize>) {}
}

/// Progress observer that ignores everything.
pub struct NoProgress;

impl IngestProgress for NoProgress {}

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Drop each collection before recreating it.
    pub recreate: bool,
}

/// Outcome of one ingestion pass into one engine.
#[derive(Debug)]
pub struct BackendIngest {
    pub backend: String,
    /// Number of records written.
    pub outcome: VecscopeResult<usize>,
    pub elapsed: Duration,
}

/// Per-engine outcomes of [`Orchestrator::ingest_all`].
#[derive(Debug)]
pub struct IngestReport {
    pub documents: usize,
    pub backends: Vec<BackendIngest>,
}

impl IngestReport {
    pub fn is_success(&self) -> bool {
        self.backends.iter().all(|b| b.outcome.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &BackendIngest> {
        self.backends.iter().filter(|b| b.outcome.is_err())
    }

    /// Turn the report into an error if any engine failed.
    ///
    /// A single failure is returned as-is, keeping its kind. Several
    /// failures are folded into one ingestion error whose message carries
    /// every cause.
    pub fn into_result(self) -> VecscopeResult<Self> {
        if self.is_success() {
            return Ok(self);
        }

        let documents = self.documents;
        let mut failed: Vec<(String, VecscopeError)> = self
            .backends
            .into_iter()
            .filter_map(|b| b.outcome.err().map(|e| (b.backend, e)))
            .collect();

        if failed.len() == 1 {
            let (_, error) = failed.remove(0);
            return Err(error);
        }

        let names: Vec<&str> = failed.iter().map(|(name, _)| name.as_str()).collect();
        let causes: Vec<String> = failed.iter().map(|(_, e)| e.to_string()).collect();
        Err(VecscopeError::ingestion(
            names.join(", "),
            format!("{} documents not loaded: {}", documents, causes.join("; ")),
        ))
    }
}

/// One engine's answer in a side-by-side comparison.
#[derive(Debug)]
pub struct EngineOutcome {
    pub engine: String,
    pub results: VecscopeResult<Vec<SearchResult>>,
    pub elapsed: Duration,
}

/// End-to-end search and ingestion over a fixed set of engines.
pub struct Orchestrator {
    embedder: Arc<dyn Embedder>,
    registry: Registry,
}

impl Orchestrator {
    /// Every registered adapter must use the embedder's dimension.
    pub fn new(embedder: Arc<dyn Embedder>, registry: Registry) -> VecscopeResult<Self> {
        for engine in registry.engines() {
            let adapter = engine.adapter();
            if adapter.dimension() != embedder.dimension() {
                return Err(VecscopeError::schema(
                    adapter.name(),
                    "configure",
                    format!(
                        "adapter dimension {} does not match embedding dimension {}",
                        adapter.dimension(),
                        embedder.dimension()
                    ),
                ));
            }
        }
        Ok(Self { embedder, registry })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Search one engine by name.
    pub async fn search(
        &self,
        engine: &str,
        query: &str,
        limit: usize,
    ) -> VecscopeResult<Vec<SearchResult>> {
        validate_query(query, limit)?;
        let adapter = self.registry.get_adapter(engine)?;

        let embedding = self.embedder.embed(query).await?;
        debug!(engine = adapter.name(), dim = embedding.len(), "Embedded query");

        run_search(adapter, &embedding, limit).await
    }

    /// Embed once and search every engine concurrently.
    ///
    /// Fails only if the query is invalid or cannot be embedded; a failing
    /// engine is reported in its own outcome.
    pub async fn compare(&self, query: &str, limit: usize) -> VecscopeResult<Vec<EngineOutcome>> {
        validate_query(query, limit)?;
        let embedding = self.embedder.embed(query).await?;

        let searches = self.registry.engines().iter().map(|engine| {
            let adapter = engine.adapter();
            let embedding = &embedding;
            async move {
                let started = Instant::now();
                let results = run_search(adapter, embedding, limit).await;
                EngineOutcome {
                    engine: adapter.name().to_string(),
                    results,
                    elapsed: started.elapsed(),
                }
            }
        });

        Ok(join_all(searches).await)
    }

    /// Embed every document once and push the set through every engine.
    ///
    /// Validation and embedding failures abort before any engine is
    /// written. After that, engines are ingested independently and each
    /// outcome is reported; see [`IngestReport::into_result`].
    pub async fn ingest_all(
        &self,
        documents: &[Document],
        options: IngestOptions,
        progress: &dyn IngestProgress,
    ) -> VecscopeResult<IngestReport> {
        validate_documents(documents)?;

        let total = documents.len();
        let mut records = Vec::with_capacity(total);
        for (i, document) in documents.iter().enumerate() {
            let embedding = self.embedder.embed(&document.description).await?;
            records.push(EmbeddedDocument {
                document: document.clone(),
                embedding,
            });
            progress.embedded(i + 1, total, document);
        }

        info!(
            count = total,
            model = self.embedder.model_name(),
            "Generated embeddings"
        );

        let passes = self
            .registry
            .engines()
            .iter()
            .map(|engine| ingest_into(engine, &records, options, progress));
        let backends = join_all(passes).await;

        Ok(IngestReport {
            documents: total,
            backends,
        })
    }
}

fn validate_query(query: &str, limit: usize) -> VecscopeResult<()> {
    if query.trim().is_empty() {
        return Err(VecscopeError::validation("query must not be empty"));
    }
    if limit == 0 {
        return Err(VecscopeError::validation("limit must be a positive integer"));
    }
    Ok(())
}

async fn run_search(
    adapter: &dyn BackendAdapter,
    embedding: &[f32],
    limit: usize,
) -> VecscopeResult<Vec<SearchResult>> {
    let hits = adapter.search(embedding, limit).await?;
    let native = hits.len();

    let mut results = normalize(adapter, hits);
    results.truncate(limit);

    debug!(
        engine = adapter.name(),
        hits = native,
        results = results.len(),
        "Search complete"
    );
    Ok(results)
}

async fn ingest_into(
    engine: &RegisteredEngine,
    records: &[EmbeddedDocument],
    options: IngestOptions,
    progress: &dyn IngestProgress,
) -> BackendIngest {
    let adapter = engine.adapter();
    let _guard = engine.lock_ingest().await;

    progress.backend_started(adapter.name());
    let started = Instant::now();
    let outcome = write_records(adapter, records, options).await;
    let elapsed = started.elapsed();

    match &outcome {
        Ok(count) => info!(
            engine = adapter.name(),
            count,
            elapsed_ms = elapsed.as_millis() as u64,
            "Ingestion complete"
        ),
        Err(e) => warn!(engine = adapter.name(), error = %e, "Ingestion failed"),
    }
    progress.backend_finished(adapter.name(), &outcome);

    BackendIngest {
        backend: adapter.name().to_string(),
        outcome,
        elapsed,
    }
}

async fn write_records(
    adapter: &dyn BackendAdapter,
    records: &[EmbeddedDocument],
    options: IngestOptions,
) -> VecscopeResult<usize> {
    if options.recreate {
        adapter.drop_collection().await?;
    }
    adapter
        .ensure_collection(adapter.collection(), adapter.dimension())
        .await?;
    adapter.ingest(records).await?;
    Ok(records.len())
}
