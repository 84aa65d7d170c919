//! # vecscope embedding
//!
//! Gateway to the external embedding provider. The rest of the workspace
//! depends only on the [`Embedder`] capability, never on the transport.

pub mod openai;

use async_trait::async_trait;
use vecscope_core::{Embedding, VecscopeResult};

pub use openai::{check_dimension, OpenAiEmbedder};

/// Text to fixed-length vector.
///
/// Every vector an implementation returns has length [`Embedder::dimension`].
/// Empty text is rejected with a validation error; upstream failures are
/// provider errors and are never retried here.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> VecscopeResult<Embedding>;

    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}
