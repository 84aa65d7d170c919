//! The capability set every search engine adapter implements.

use async_trait::async_trait;
use serde_json::{Map, Value};

use vecscope_core::{EmbeddedDocument, VecscopeError, VecscopeResult};

/// Operation names used in backend-scoped errors.
pub mod op {
    pub const ENSURE_COLLECTION: &str = "ensure_collection";
    pub const DROP_COLLECTION: &str = "drop_collection";
    pub const INGEST: &str = "ingest";
    pub const SEARCH: &str = "search";
    pub const COUNT: &str = "count";
    pub const HEALTH: &str = "health";
}

/// How an engine's native score maps to a higher-is-better score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreTransform {
    /// The engine already reports a similarity.
    Similarity,
    /// The engine reports cosine distance; `score = 1 - distance`.
    CosineDistance,
}

impl ScoreTransform {
    pub fn apply(self, native: f32) -> f32 {
        match self {
            Self::Similarity => native,
            Self::CosineDistance => 1.0 - native,
        }
    }
}

/// One match as an engine returned it: the stored fields and the raw metric.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeHit {
    /// Document id when the engine reports it outside the stored fields.
    pub id: Option<u64>,
    /// Native similarity or distance; `None` when the engine sent none.
    pub metric: Option<f32>,
    pub fields: Map<String, Value>,
}

/// Adapter translating canonical operations into one engine's protocol.
///
/// An adapter is bound to one collection name and dimension at
/// construction. `search` checks the query length against that dimension
/// before touching the network.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Registry name (e.g. `"qdrant"`).
    fn name(&self) -> &str;

    fn score_transform(&self) -> ScoreTransform;

    /// Configured vector dimension.
    fn dimension(&self) -> usize;

    /// Collection (or index) this adapter reads and writes.
    fn collection(&self) -> &str;

    /// Create the collection sized for `dimension` if it does not exist.
    ///
    /// Fails with a schema error when it exists with another dimension.
    async fn ensure_collection(&self, name: &str, dimension: usize) -> VecscopeResult<()>;

    /// Delete the collection if it exists.
    async fn drop_collection(&self) -> VecscopeResult<()>;

    /// Upsert records keyed by document id.
    async fn ingest(&self, records: &[EmbeddedDocument]) -> VecscopeResult<()>;

    /// Up to `limit` nearest records, most similar first.
    async fn search(&self, query: &[f32], limit: usize) -> VecscopeResult<Vec<NativeHit>>;

    /// Number of stored records.
    async fn count(&self) -> VecscopeResult<u64>;

    /// Liveness check.
    async fn health(&self) -> VecscopeResult<()>;
}

/// Shared precondition for `search`: positive limit, matching dimension.
pub fn check_search_args(
    backend: &str,
    dimension: usize,
    query: &[f32],
    limit: usize,
) -> VecscopeResult<()> {
    if limit == 0 {
        return Err(VecscopeError::validation("limit must be a positive integer"));
    }
    if query.len() != dimension {
        return Err(VecscopeError::dimension_mismatch(
            backend,
            op::SEARCH,
            dimension,
            query.len(),
        ));
    }
    Ok(())
}

/// Shared precondition for `ingest`: every vector matches the dimension.
pub fn check_records(
    backend: &str,
    dimension: usize,
    records: &[EmbeddedDocument],
) -> VecscopeResult<()> {
    for record in records {
        if record.embedding.len() != dimension {
            return Err(VecscopeError::dimension_mismatch(
                backend,
                op::INGEST,
                dimension,
                record.embedding.len(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_distance_inverts() {
        let t = ScoreTransform::CosineDistance;
        assert_eq!(t.apply(0.0), 1.0);
        assert!((t.apply(0.9) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_is_identity() {
        let t = ScoreTransform::Similarity;
        assert_eq!(t.apply(0.42), 0.42);
    }

    #[test]
    fn test_search_args() {
        assert!(check_search_args("qdrant", 3, &[0.0, 0.0, 1.0], 5).is_ok());
        assert!(matches!(
            check_search_args("qdrant", 3, &[0.0, 1.0], 5),
            Err(VecscopeError::Schema { .. })
        ));
        assert!(matches!(
            check_search_args("qdrant", 3, &[0.0, 0.0, 1.0], 0),
            Err(VecscopeError::Validation(_))
        ));
    }
}
