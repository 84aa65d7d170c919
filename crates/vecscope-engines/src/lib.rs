//! # vecscope engines
//!
//! One document set and one query, sent unmodified to Qdrant, Elasticsearch
//! and Typesense, with every engine's answer normalized into the same
//! [`SearchResult`](vecscope_core::SearchResult) shape.
//!
//! ```text
//!  query ─▶ Embedder ─▶ Registry ─▶ BackendAdapter::search ─▶ normalize ─▶ results
//!                                    ├─ qdrant        (similarity)
//!                                    ├─ elasticsearch (similarity)
//!                                    └─ typesense     (distance → 1 - d)
//! ```

pub mod adapter;
pub mod elasticsearch;
pub mod normalize;
pub mod orchestrator;
pub mod qdrant;
pub mod registry;
pub mod typesense;

pub use adapter::{BackendAdapter, NativeHit, ScoreTransform};
pub use elasticsearch::ElasticsearchAdapter;
pub use normalize::{normalize, normalize_hits, DataIntegrityError};
pub use orchestrator::{
    BackendIngest, EngineOutcome, IngestOptions, IngestProgress, IngestReport, NoProgress,
    Orchestrator,
};
pub use qdrant::QdrantAdapter;
pub use registry::{EngineStatus, RegisteredEngine, Registry};
pub use typesense::TypesenseAdapter;
