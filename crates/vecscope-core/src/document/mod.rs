//! Canonical document set: the built-in sample, dataset loading and
//! pre-ingestion checks.

pub mod model;

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use crate::error::{VecscopeError, VecscopeResult};
use model::{Document, RawDocument};

/// The fixed five-document sample set (ids 1-5).
pub fn sample_documents() -> Vec<Document> {
    let doc = |id: u64, title: &str, short: &str, description: &str, slug: &str| Document {
        id,
        title: title.to_string(),
        short_description: short.to_string(),
        description: description.to_string(),
        image: format!("https://images.vecscope.dev/topics/{}.png", slug),
        url: format!("/topics/{}", slug),
    };

    vec![
        doc(
            1,
            "Vector Search",
            "Find items by meaning instead of keywords.",
            "Vector search stores embeddings in a vector database and ranks stored items \
             by similarity to a query vector using nearest neighbor indexes.",
            "vector-search",
        ),
        doc(
            2,
            "Machine Learning",
            "Systems that improve from data.",
            "Machine learning trains statistical models on labelled examples so they can \
             predict outcomes for inputs they have never seen.",
            "machine-learning",
        ),
        doc(
            3,
            "Deep Learning",
            "Layered neural networks.",
            "Deep learning stacks many neural network layers and trains them with \
             backpropagation on large amounts of examples.",
            "deep-learning",
        ),
        doc(
            4,
            "Natural Language Processing",
            "Computers that read and write text.",
            "Natural language processing teaches computers to parse, translate and \
             generate human language such as sentences and documents.",
            "nlp",
        ),
        doc(
            5,
            "Computer Vision",
            "Understanding images and video.",
            "Computer vision extracts objects, faces and scenes from pixels in photos \
             and camera streams.",
            "computer-vision",
        ),
    ]
}

/// Parse a JSON array of documents.
///
/// Rows without an `id` get their 1-based position as id.
pub fn parse_documents(json: &str) -> VecscopeResult<Vec<Document>> {
    let rows: Vec<RawDocument> = serde_json::from_str(json)
        .map_err(|e| VecscopeError::validation(format!("invalid document dataset: {}", e)))?;

    let documents: Vec<Document> = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| row.into_document(i as u64 + 1))
        .collect();

    debug!(count = documents.len(), "Parsed document dataset");
    Ok(documents)
}

/// Load a document dataset from a JSON file.
pub fn load_documents(path: &Path) -> VecscopeResult<Vec<Document>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        VecscopeError::validation(format!("failed to read {}: {}", path.display(), e))
    })?;
    parse_documents(&content)
}

/// Check every document invariant and that ids are unique across the set.
pub fn validate_documents(documents: &[Document]) -> VecscopeResult<()> {
    let mut seen = HashSet::with_capacity(documents.len());
    for doc in documents {
        doc.validate()?;
        if !seen.insert(doc.id) {
            return Err(VecscopeError::validation(format!(
                "duplicate document id {}",
                doc.id
            )));
        }
    }
    Ok(())
}
