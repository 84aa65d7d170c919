//! End-to-end ingestion and search through in-memory engines.

mod common;

use common::{memory_registry, KeywordEmbedder, MemoryAdapter, VOCABULARY};
use vecscope_core::{sample_documents, Document, VecscopeError};
use vecscope_engines::{
    BackendAdapter, IngestOptions, IngestProgress, NoProgress, Orchestrator, Registry,
    ScoreTransform,
};

const DIM: usize = VOCABULARY.len();

async fn ingested() -> Orchestrator {
    let orchestrator = Orchestrator::new(KeywordEmbedder::new(), memory_registry(DIM)).unwrap();
    let report = orchestrator
        .ingest_all(&sample_documents(), IngestOptions::default(), &NoProgress)
        .await
        .unwrap();
    assert!(report.is_success());
    orchestrator
}

fn stored(id: u64) -> Document {
    sample_documents()
        .into_iter()
        .find(|d| d.id == id)
        .unwrap()
}

#[tokio::test]
async fn test_vector_query_ranks_vector_search_first_everywhere() {
    let orchestrator = ingested().await;
    let expected = stored(1);

    for engine in ["qdrant", "elasticsearch", "typesense"] {
        let results = orchestrator
            .search(engine, "vector database similarity", 3)
            .await
            .unwrap();

        assert!(!results.is_empty(), "{} returned nothing", engine);
        assert!(results.len() <= 3);
        let top = &results[0];
        assert_eq!(top.id, 1, "{} ranked {} first", engine, top.title);
        assert_eq!(top.title, expected.title);
        assert_eq!(top.image, expected.image);
        assert_eq!(top.url, expected.url);
        assert_eq!(top.short_description, expected.short_description);
    }
}

#[tokio::test]
async fn test_scores_non_increasing_and_bounded_by_limit() {
    let orchestrator = ingested().await;

    for limit in 1..=7 {
        for engine in orchestrator.registry().names() {
            let results = orchestrator
                .search(&engine, "deep neural network models", limit)
                .await
                .unwrap();
            assert!(results.len() <= limit);
            assert!(results.len() <= 5);
            assert!(
                results.windows(2).all(|w| w[0].score >= w[1].score),
                "{} scores out of order at limit {}",
                engine,
                limit
            );
        }
    }
}

#[tokio::test]
async fn test_distance_engine_scores_are_inverted() {
    let orchestrator = ingested().await;

    let similarity = orchestrator
        .search("qdrant", "vector database similarity", 5)
        .await
        .unwrap();
    let distance = orchestrator
        .search("typesense", "vector database similarity", 5)
        .await
        .unwrap();

    assert_eq!(similarity.len(), distance.len());
    for (a, b) in similarity.iter().zip(&distance) {
        assert_eq!(a.id, b.id);
        assert!((a.score - b.score).abs() < 1e-5);
    }
    assert!(distance[0].score > 0.5);
}

#[tokio::test]
async fn test_reingest_is_idempotent() {
    let orchestrator = ingested().await;
    orchestrator
        .ingest_all(&sample_documents(), IngestOptions::default(), &NoProgress)
        .await
        .unwrap()
        .into_result()
        .unwrap();

    for engine in orchestrator.registry().engines() {
        assert_eq!(engine.adapter().count().await.unwrap(), 5);
    }
}

#[tokio::test]
async fn test_recreate_drops_previous_records() {
    let orchestrator = ingested().await;
    let subset: Vec<Document> = sample_documents().into_iter().take(2).collect();

    orchestrator
        .ingest_all(&subset, IngestOptions { recreate: true }, &NoProgress)
        .await
        .unwrap();

    for engine in orchestrator.registry().engines() {
        assert_eq!(engine.adapter().count().await.unwrap(), 2);
    }
}

#[tokio::test]
async fn test_each_document_embedded_once() {
    let embedder = KeywordEmbedder::new();
    let orchestrator = Orchestrator::new(embedder.clone(), memory_registry(DIM)).unwrap();
    orchestrator
        .ingest_all(&sample_documents(), IngestOptions::default(), &NoProgress)
        .await
        .unwrap();
    assert_eq!(embedder.calls(), 5);

    orchestrator.compare("vector", 2).await.unwrap();
    assert_eq!(embedder.calls(), 6);
}

#[tokio::test]
async fn test_unknown_engine_fails_before_embedding() {
    let embedder = KeywordEmbedder::new();
    let orchestrator = Orchestrator::new(embedder.clone(), memory_registry(DIM)).unwrap();

    match orchestrator.search("engine-D", "vector", 3).await {
        Err(VecscopeError::UnknownBackend { name, known }) => {
            assert_eq!(name, "engine-D");
            assert_eq!(known, "qdrant, elasticsearch, typesense");
        }
        other => panic!("expected unknown backend, got {:?}", other),
    }
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn test_invalid_query_arguments() {
    let embedder = KeywordEmbedder::new();
    let orchestrator = Orchestrator::new(embedder.clone(), memory_registry(DIM)).unwrap();

    assert!(matches!(
        orchestrator.search("qdrant", "", 3).await,
        Err(VecscopeError::Validation(_))
    ));
    assert!(matches!(
        orchestrator.search("qdrant", "vector", 0).await,
        Err(VecscopeError::Validation(_))
    ));
    assert!(matches!(
        orchestrator.compare("   ", 3).await,
        Err(VecscopeError::Validation(_))
    ));
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn test_dimension_mismatch_rejected_at_construction() {
    let result = Orchestrator::new(KeywordEmbedder::new(), memory_registry(1536));
    assert!(matches!(result, Err(VecscopeError::Schema { .. })));
}

#[tokio::test]
async fn test_wrong_length_query_never_reaches_engine() {
    let adapter = MemoryAdapter::new("qdrant", ScoreTransform::Similarity, DIM);
    adapter
        .ensure_collection("degree_programs", DIM)
        .await
        .unwrap();

    let err = adapter.search(&[0.1; 8], 3).await.unwrap_err();
    assert!(matches!(err, VecscopeError::Schema { .. }), "{}", err);
    assert_eq!(adapter.searches(), 0);
}

#[tokio::test]
async fn test_existing_collection_with_other_dimension_rejected() {
    let adapter = MemoryAdapter::new("elasticsearch", ScoreTransform::Similarity, DIM);
    adapter.ensure_collection("degree_programs", 4).await.unwrap();

    let err = adapter
        .ensure_collection("degree_programs", DIM)
        .await
        .unwrap_err();
    assert!(matches!(err, VecscopeError::Schema { .. }));
}

#[tokio::test]
async fn test_search_before_ingest_is_schema_error() {
    let orchestrator = Orchestrator::new(KeywordEmbedder::new(), memory_registry(DIM)).unwrap();
    let err = orchestrator
        .search("qdrant", "vector", 3)
        .await
        .unwrap_err();
    assert!(matches!(err, VecscopeError::Schema { .. }));
}

#[tokio::test]
async fn test_partial_ingest_failure_reported_per_engine() {
    let mut registry = Registry::new();
    registry
        .register(Box::new(MemoryAdapter::new(
            "qdrant",
            ScoreTransform::Similarity,
            DIM,
        )))
        .unwrap();
    registry
        .register(Box::new(MemoryAdapter::failing_ingest(
            "elasticsearch",
            ScoreTransform::Similarity,
            DIM,
        )))
        .unwrap();
    registry
        .register(Box::new(MemoryAdapter::new(
            "typesense",
            ScoreTransform::CosineDistance,
            DIM,
        )))
        .unwrap();
    let orchestrator = Orchestrator::new(KeywordEmbedder::new(), registry).unwrap();

    let report = orchestrator
        .ingest_all(&sample_documents(), IngestOptions::default(), &NoProgress)
        .await
        .unwrap();

    assert_eq!(report.documents, 5);
    assert_eq!(report.backends.len(), 3);
    let failed: Vec<&str> = report.failures().map(|b| b.backend.as_str()).collect();
    assert_eq!(failed, vec!["elasticsearch"]);

    for name in ["qdrant", "typesense"] {
        let adapter = orchestrator.registry().get_adapter(name).unwrap();
        assert_eq!(adapter.count().await.unwrap(), 5);
    }

    match report.into_result() {
        Err(VecscopeError::Ingestion { backend, .. }) => assert_eq!(backend, "elasticsearch"),
        other => panic!("expected ingestion error, got {:?}", other.map(|r| r.documents)),
    }
}

#[tokio::test]
async fn test_stale_collection_surfaces_schema_error() {
    // qdrant already holds a collection built for another embedding model.
    let stale = MemoryAdapter::new("qdrant", ScoreTransform::Similarity, DIM);
    stale.ensure_collection("degree_programs", 4).await.unwrap();

    let mut registry = Registry::new();
    registry.register(Box::new(stale)).unwrap();
    registry
        .register(Box::new(MemoryAdapter::new(
            "elasticsearch",
            ScoreTransform::Similarity,
            DIM,
        )))
        .unwrap();
    let orchestrator = Orchestrator::new(KeywordEmbedder::new(), registry).unwrap();

    let report = orchestrator
        .ingest_all(&sample_documents(), IngestOptions::default(), &NoProgress)
        .await
        .unwrap();
    assert_eq!(report.failures().count(), 1);

    match report.into_result() {
        Err(VecscopeError::Schema {
            backend, operation, ..
        }) => {
            assert_eq!(backend, "qdrant");
            assert_eq!(operation, "ensure_collection");
        }
        other => panic!("expected schema error, got {:?}", other.map(|r| r.documents)),
    }
}

#[tokio::test]
async fn test_provider_failure_aborts_before_writes() {
    let orchestrator = Orchestrator::new(KeywordEmbedder::failing(), memory_registry(DIM)).unwrap();

    let err = orchestrator
        .ingest_all(&sample_documents(), IngestOptions::default(), &NoProgress)
        .await
        .unwrap_err();
    assert!(matches!(err, VecscopeError::Provider(_)));

    for engine in orchestrator.registry().engines() {
        assert_eq!(engine.adapter().count().await.unwrap(), 0);
    }
}

#[tokio::test]
async fn test_invalid_documents_rejected() {
    let orchestrator = Orchestrator::new(KeywordEmbedder::new(), memory_registry(DIM)).unwrap();
    let mut documents = sample_documents();
    documents[2].description = String::new();

    let err = orchestrator
        .ingest_all(&documents, IngestOptions::default(), &NoProgress)
        .await
        .unwrap_err();
    assert!(matches!(err, VecscopeError::Validation(_)));
}

#[tokio::test]
async fn test_compare_reports_every_engine() {
    let orchestrator = ingested().await;
    let outcomes = orchestrator
        .compare("computer vision pixels", 2)
        .await
        .unwrap();

    let engines: Vec<&str> = outcomes.iter().map(|o| o.engine.as_str()).collect();
    assert_eq!(engines, vec!["qdrant", "elasticsearch", "typesense"]);
    for outcome in &outcomes {
        let results = outcome.results.as_ref().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 5);
    }
}

#[tokio::test]
async fn test_compare_isolates_failing_engine() {
    let orchestrator = ingested().await;
    // Wipe one engine so its search fails while the others still answer.
    orchestrator
        .registry()
        .get_adapter("elasticsearch")
        .unwrap()
        .drop_collection()
        .await
        .unwrap();

    let outcomes = orchestrator.compare("vector", 3).await.unwrap();
    for outcome in outcomes {
        match outcome.engine.as_str() {
            "elasticsearch" => assert!(outcome.results.is_err()),
            _ => assert_eq!(outcome.results.unwrap()[0].id, 1),
        }
    }
}

#[derive(Default)]
struct Recorder {
    events: std::sync::Mutex<Vec<String>>,
}

impl IngestProgress for Recorder {
    fn embedded(&self, done: usize, total: usize, document: &Document) {
        self.events
            .lock()
            .unwrap()
            .push(format!("embedded {}/{} {}", done, total, document.id));
    }

    fn backend_finished(&self, backend: &str, outcome: &vecscope_core::VecscopeResult<usize>) {
        let status = match outcome {
            Ok(n) => format!("{} ok {}", backend, n),
            Err(_) => format!("{} failed", backend),
        };
        self.events.lock().unwrap().push(status);
    }
}

#[tokio::test]
async fn test_progress_observer_sees_every_step() {
    let orchestrator = Orchestrator::new(KeywordEmbedder::new(), memory_registry(DIM)).unwrap();
    let recorder = Recorder::default();

    orchestrator
        .ingest_all(&sample_documents(), IngestOptions::default(), &recorder)
        .await
        .unwrap();

    let events = recorder.events.into_inner().unwrap();
    assert_eq!(events[0], "embedded 1/5 1");
    assert_eq!(events[4], "embedded 5/5 5");
    for backend in ["qdrant", "elasticsearch", "typesense"] {
        assert!(events.contains(&format!("{} ok 5", backend)));
    }
}
