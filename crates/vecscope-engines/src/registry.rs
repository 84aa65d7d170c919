//! Engine registry: name → adapter lookup.
//!
//! The adapter set is built once at startup and handed to the
//! [`Orchestrator`](crate::orchestrator::Orchestrator); nothing is looked up
//! through globals.

use futures::future::join_all;
use tokio::sync::{Mutex, MutexGuard};

use vecscope_core::{Config, VecscopeError, VecscopeResult};

use crate::adapter::BackendAdapter;
use crate::elasticsearch::ElasticsearchAdapter;
use crate::qdrant::QdrantAdapter;
use crate::typesense::TypesenseAdapter;

/// A registered adapter and the lock serialising ingestion into it.
pub struct RegisteredEngine {
    adapter: Box<dyn BackendAdapter>,
    ingest_lock: Mutex<()>,
}

impl RegisteredEngine {
    pub fn adapter(&self) -> &dyn BackendAdapter {
        self.adapter.as_ref()
    }

    /// Held for the duration of one ingestion pass into this adapter.
    pub(crate) async fn lock_ingest(&self) -> MutexGuard<'_, ()> {
        self.ingest_lock.lock().await
    }
}

/// Liveness and record count of one engine.
#[derive(Debug)]
pub struct EngineStatus {
    pub engine: String,
    pub health: VecscopeResult<()>,
    /// Only counted when the engine is healthy.
    pub count: Option<VecscopeResult<u64>>,
}

/// Registry of search engine adapters, in registration order.
#[derive(Default)]
pub struct Registry {
    engines: Vec<RegisteredEngine>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the Qdrant, Elasticsearch and Typesense
    /// adapters described by the config.
    pub fn from_config(config: &Config) -> VecscopeResult<Self> {
        let dimension = config.embedding.dimension;
        let collection = config.collection.as_str();

        let mut registry = Self::new();
        registry.register(Box::new(QdrantAdapter::new(
            &config.qdrant.url,
            collection,
            dimension,
        )?))?;
        registry.register(Box::new(ElasticsearchAdapter::new(
            &config.elasticsearch,
            collection,
            dimension,
        )?))?;
        registry.register(Box::new(TypesenseAdapter::new(
            &config.typesense,
            collection,
            dimension,
        )?))?;
        Ok(registry)
    }

    /// Register an adapter. Names are unique, compared case-insensitively.
    pub fn register(&mut self, adapter: Box<dyn BackendAdapter>) -> VecscopeResult<()> {
        if self.find(adapter.name()).is_some() {
            return Err(VecscopeError::validation(format!(
                "engine '{}' is already registered",
                adapter.name()
            )));
        }
        self.engines.push(RegisteredEngine {
            adapter,
            ingest_lock: Mutex::new(()),
        });
        Ok(())
    }

    fn find(&self, name: &str) -> Option<&RegisteredEngine> {
        self.engines
            .iter()
            .find(|e| e.adapter.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Resolve a registered engine by name.
    pub fn engine(&self, name: &str) -> VecscopeResult<&RegisteredEngine> {
        self.find(name).ok_or_else(|| VecscopeError::UnknownBackend {
            name: name.to_string(),
            known: self.names().join(", "),
        })
    }

    /// Resolve an adapter by name.
    pub fn get_adapter(&self, name: &str) -> VecscopeResult<&dyn BackendAdapter> {
        self.engine(name).map(RegisteredEngine::adapter)
    }

    pub fn engines(&self) -> &[RegisteredEngine] {
        &self.engines
    }

    /// Registered engine names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.engines
            .iter()
            .map(|e| e.adapter.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Probe every engine concurrently.
    pub async fn status(&self) -> Vec<EngineStatus> {
        let checks = self.engines.iter().map(|engine| async move {
            let adapter = engine.adapter();
            let health = adapter.health().await;
            let count = match health {
                Ok(()) => Some(adapter.count().await),
                Err(_) => None,
            };
            EngineStatus {
                engine: adapter.name().to_string(),
                health,
                count,
            }
        });
        join_all(checks).await
    }
}
