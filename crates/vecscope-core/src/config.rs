//! TOML configuration: backend endpoints, embedding provider and display.

use serde::Deserialize;
use std::path::Path;

use crate::error::{VecscopeError, VecscopeResult};

/// Default collection/index name shared by all engines.
pub const DEFAULT_COLLECTION: &str = "degree_programs";

/// Default embedding dimension (text-embedding-ada-002).
pub const DEFAULT_DIMENSION: usize = 1536;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub qdrant: QdrantConfig,
    #[serde(default)]
    pub elasticsearch: ElasticsearchConfig,
    #[serde(default)]
    pub typesense: TypesenseConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            embedding: EmbeddingConfig::default(),
            qdrant: QdrantConfig::default(),
            elasticsearch: ElasticsearchConfig::default(),
            typesense: TypesenseConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    #[serde(default = "default_openai_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Inline key; takes precedence over `api_key_env`.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            dimension: default_dimension(),
            base_url: default_openai_url(),
            api_key_env: default_api_key_env(),
            api_key: None,
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl EmbeddingConfig {
    /// Resolve the provider credential: inline key first, then environment.
    pub fn resolve_api_key(&self) -> VecscopeResult<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.clone());
        }
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(VecscopeError::config(format!(
                "embedding API key missing: set {} or embedding.api_key",
                self.api_key_env
            ))),
        }
    }
}

fn default_model() -> String {
    "text-embedding-ada-002".to_string()
}
fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}
fn default_openai_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_embedding_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct QdrantConfig {
    /// gRPC endpoint.
    #[serde(default = "default_qdrant_url")]
    pub url: String,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
        }
    }
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ElasticsearchConfig {
    #[serde(default = "default_elasticsearch_url")]
    pub url: String,
    #[serde(default = "default_num_candidates")]
    pub num_candidates: u32,
    #[serde(default = "default_elasticsearch_timeout")]
    pub timeout_secs: u64,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            url: default_elasticsearch_url(),
            num_candidates: default_num_candidates(),
            timeout_secs: default_elasticsearch_timeout(),
        }
    }
}

fn default_elasticsearch_url() -> String {
    "http://localhost:9200".to_string()
}
fn default_num_candidates() -> u32 {
    100
}
fn default_elasticsearch_timeout() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct TypesenseConfig {
    #[serde(default = "default_typesense_url")]
    pub url: String,
    #[serde(default = "default_typesense_key")]
    pub api_key: String,
    #[serde(default = "default_typesense_timeout")]
    pub timeout_secs: u64,
}

impl Default for TypesenseConfig {
    fn default() -> Self {
        Self {
            url: default_typesense_url(),
            api_key: default_typesense_key(),
            timeout_secs: default_typesense_timeout(),
        }
    }
}

fn default_typesense_url() -> String {
    "http://localhost:8108".to_string()
}
fn default_typesense_key() -> String {
    "xyz".to_string()
}
fn default_typesense_timeout() -> u64 {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    /// Prefix joined to relative document URLs when results are printed.
    #[serde(default = "default_link_base")]
    pub link_base: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            link_base: default_link_base(),
        }
    }
}

impl DisplayConfig {
    /// Turn a stored document URL into a clickable link.
    pub fn link_for(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!(
                "{}/{}",
                self.link_base.trim_end_matches('/'),
                url.trim_start_matches('/')
            )
        }
    }
}

fn default_link_base() -> String {
    "https://asuonline.asu.edu".to_string()
}

impl Config {
    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> VecscopeResult<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| VecscopeError::config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file.
    ///
    /// When `required` is false a missing file yields the defaults.
    pub fn load(path: &Path, required: bool) -> VecscopeResult<Self> {
        if !path.exists() && !required {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            VecscopeError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> VecscopeResult<()> {
        if self.collection.trim().is_empty() {
            return Err(VecscopeError::config("collection must not be empty"));
        }
        if self.embedding.dimension == 0 {
            return Err(VecscopeError::config("embedding.dimension must be > 0"));
        }
        if self.embedding.model.trim().is_empty() {
            return Err(VecscopeError::config("embedding.model must not be empty"));
        }
        for (name, url) in [
            ("embedding.base_url", &self.embedding.base_url),
            ("qdrant.url", &self.qdrant.url),
            ("elasticsearch.url", &self.elasticsearch.url),
            ("typesense.url", &self.typesense.url),
        ] {
            if url.trim().is_empty() {
                return Err(VecscopeError::config(format!("{} must not be empty", name)));
            }
        }
        if self.elasticsearch.num_candidates == 0 {
            return Err(VecscopeError::config(
                "elasticsearch.num_candidates must be >= 1",
            ));
        }
        Ok(())
    }
}
