//! Result normalizer: engine-native hits → [`SearchResult`].
//!
//! Order is preserved exactly as the engine ranked it. Scores go through the
//! engine's declared [`ScoreTransform`], so within one engine's list a
//! higher score always means more relevant.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use vecscope_core::SearchResult;

use crate::adapter::{BackendAdapter, NativeHit, ScoreTransform};

/// A hit that cannot be mapped back to a document. Logged and dropped,
/// never returned to the caller.
#[derive(Error, Debug, PartialEq)]
pub enum DataIntegrityError {
    #[error("hit at rank {rank} carries no document id")]
    MissingId { rank: usize },

    #[error("document {id} (rank {rank}) is missing stored field '{field}'")]
    MissingField {
        id: u64,
        rank: usize,
        field: &'static str,
    },

    #[error("document {id} (rank {rank}) came back without a score")]
    MissingScore { id: u64, rank: usize },
}

/// Normalize a ranked hit list from the given adapter.
pub fn normalize(adapter: &dyn BackendAdapter, hits: Vec<NativeHit>) -> Vec<SearchResult> {
    normalize_hits(adapter.name(), adapter.score_transform(), hits)
}

/// Normalize hits with an explicit transform.
pub fn normalize_hits(
    backend: &str,
    transform: ScoreTransform,
    hits: Vec<NativeHit>,
) -> Vec<SearchResult> {
    hits.into_iter()
        .enumerate()
        .filter_map(|(rank, hit)| match to_result(rank, transform, hit) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(backend, error = %e, "Dropping search hit");
                None
            }
        })
        .collect()
}

fn to_result(
    rank: usize,
    transform: ScoreTransform,
    hit: NativeHit,
) -> Result<SearchResult, DataIntegrityError> {
    let id = hit
        .id
        .or_else(|| field_id(&hit.fields))
        .ok_or(DataIntegrityError::MissingId { rank })?;

    let metric = hit
        .metric
        .ok_or(DataIntegrityError::MissingScore { id, rank })?;

    let required = |field: &'static str| -> Result<String, DataIntegrityError> {
        hit.fields
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(DataIntegrityError::MissingField { id, rank, field })
    };

    Ok(SearchResult {
        id,
        title: required("title")?,
        short_description: hit
            .fields
            .get("shortDescription")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        image: required("image")?,
        url: required("url")?,
        score: transform.apply(metric),
    })
}

/// Document id stored in the fields, as a number or numeric string.
fn field_id(fields: &Map<String, Value>) -> Option<u64> {
    match fields.get("id")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
