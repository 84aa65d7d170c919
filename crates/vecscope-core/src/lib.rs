//! # vecscope core
//!
//! Canonical document schema, unified search result, error taxonomy and
//! configuration shared by the embedding gateway, the engine adapters and
//! the CLI.

pub mod config;
pub mod document;
pub mod error;

pub use config::Config;
pub use document::model::{Document, EmbeddedDocument, Embedding, SearchResult};
pub use document::{load_documents, parse_documents, sample_documents, validate_documents};
pub use error::{VecscopeError, VecscopeResult};
