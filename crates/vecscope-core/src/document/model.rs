//! Document domain models.

use serde::{Deserialize, Serialize};

use crate::error::{VecscopeError, VecscopeResult};

/// Fixed-length vector produced by the embedding provider.
pub type Embedding = Vec<f32>;

/// A searchable item, stored identically in every backend.
///
/// `description` is the text that gets embedded; the remaining fields are
/// carried through to search results untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: u64,
    pub title: String,
    pub short_description: String,
    pub description: String,
    pub image: String,
    pub url: String,
}

impl Document {
    /// Check the invariants a document must hold before it is embedded.
    pub fn validate(&self) -> VecscopeResult<()> {
        if self.description.trim().is_empty() {
            return Err(VecscopeError::validation(format!(
                "document {} has an empty description",
                self.id
            )));
        }
        Ok(())
    }

    /// Stored field set as a JSON object, shared by every backend's
    /// payload/document shape.
    pub fn to_fields(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        map.insert("id".into(), self.id.into());
        map.insert("title".into(), self.title.clone().into());
        map.insert("shortDescription".into(), self.short_description.clone().into());
        map.insert("description".into(), self.description.clone().into());
        map.insert("image".into(), self.image.clone().into());
        map.insert("url".into(), self.url.clone().into());
        map
    }
}

/// A document paired with its embedding, ready for ingestion.
#[derive(Debug, Clone)]
pub struct EmbeddedDocument {
    pub document: Document,
    pub embedding: Embedding,
}

/// Unified search result returned by every engine.
///
/// `score` is higher-is-better within one engine's result list, but is not
/// comparable across engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: u64,
    pub title: String,
    pub short_description: String,
    pub image: String,
    pub url: String,
    pub score: f32,
}

/// Dataset row as found on disk. Accepts the program catalogue field names
/// alongside the canonical ones.
#[derive(Debug, Deserialize)]
pub(crate) struct RawDocument {
    #[serde(default)]
    pub id: Option<u64>,
    pub title: String,
    #[serde(rename = "shortDescription", default)]
    pub short_description: String,
    #[serde(alias = "longDescription")]
    pub description: String,
    #[serde(alias = "degreeImage")]
    pub image: String,
    #[serde(alias = "detailPage")]
    pub url: String,
}

impl RawDocument {
    pub(crate) fn into_document(self, fallback_id: u64) -> Document {
        Document {
            id: self.id.unwrap_or(fallback_id),
            title: self.title,
            short_description: self.short_description,
            description: self.description,
            image: self.image,
            url: self.url,
        }
    }
}
