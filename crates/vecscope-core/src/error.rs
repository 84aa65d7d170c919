//! Centralized error types for vecscope.

use thiserror::Error;

/// Main error type for vecscope operations.
///
/// Backend-scoped variants carry the engine name and the operation that
/// failed so the caller can log and display them without extra context.
#[derive(Error, Debug)]
pub enum VecscopeError {
    #[error("Embedding provider error: {0}")]
    Provider(String),

    #[error("Schema error on {backend} ({operation}): {message}")]
    Schema {
        backend: String,
        operation: String,
        message: String,
    },

    #[error("Ingestion into {backend} failed: {message}")]
    Ingestion { backend: String, message: String },

    #[error("Unknown backend: '{name}'. Use one of: {known}")]
    UnknownBackend { name: String, known: String },

    #[error("{backend} {operation} failed: {message}")]
    Backend {
        backend: String,
        operation: String,
        message: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for vecscope operations.
pub type VecscopeResult<T> = Result<T, VecscopeError>;

impl VecscopeError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an embedding provider error.
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    pub fn schema(
        backend: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Schema {
            backend: backend.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn ingestion(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Ingestion {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn backend(
        backend: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Backend {
            backend: backend.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Schema error for a vector whose length does not match the collection.
    pub fn dimension_mismatch(
        backend: impl Into<String>,
        operation: impl Into<String>,
        expected: usize,
        actual: usize,
    ) -> Self {
        Self::schema(
            backend,
            operation,
            format!("expected {}-dimensional vector, got {}", expected, actual),
        )
    }

    /// Name of the backend this error is scoped to, if any.
    pub fn backend_name(&self) -> Option<&str> {
        match self {
            Self::Schema { backend, .. }
            | Self::Ingestion { backend, .. }
            | Self::Backend { backend, .. } => Some(backend),
            _ => None,
        }
    }
}
