//! OpenAI-compatible HTTP client for embedding generation.
//!
//! Calls `POST {base_url}/embeddings` with one input per request. Failures
//! are returned as-is; retry policy belongs to the caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use vecscope_core::config::EmbeddingConfig;
use vecscope_core::{Embedding, VecscopeError, VecscopeResult};

use crate::Embedder;

/// OpenAI embedding client.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    base_url: String,
    model: String,
    api_key: String,
    dimension: usize,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Create a client with an explicit key.
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        dimension: usize,
        timeout: Duration,
    ) -> VecscopeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VecscopeError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            dimension,
            client,
        })
    }

    /// Create a client from configuration.
    ///
    /// Fails with a configuration error when no API key can be resolved.
    pub fn from_config(config: &EmbeddingConfig) -> VecscopeResult<Self> {
        let api_key = config.resolve_api_key()?;
        Self::new(
            &config.base_url,
            &config.model,
            &api_key,
            config.dimension,
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> VecscopeResult<Embedding> {
        if text.trim().is_empty() {
            return Err(VecscopeError::validation("cannot embed empty text"));
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| VecscopeError::provider(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VecscopeError::provider(format!(
                "API error ({}): {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| VecscopeError::provider(format!("failed to read response: {}", e)))?;
        let embedding = parse_embedding_response(&body)?;
        check_dimension(self.dimension, &embedding)?;

        debug!(dim = embedding.len(), model = %self.model, "Generated embedding");

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Extract the first embedding from an `/embeddings` response body.
fn parse_embedding_response(body: &str) -> VecscopeResult<Embedding> {
    let parsed: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| VecscopeError::provider(format!("malformed response: {}", e)))?;

    parsed
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| VecscopeError::provider("malformed response: empty data array"))
}

/// A provider returning vectors of the wrong length is misconfigured.
pub fn check_dimension(expected: usize, embedding: &[f32]) -> VecscopeResult<()> {
    if embedding.len() != expected {
        return Err(VecscopeError::dimension_mismatch(
            "embedding provider",
            "embed",
            expected,
            embedding.len(),
        ));
    }
    Ok(())
}
