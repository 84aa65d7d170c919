//! CLI command definitions and handlers.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use vecscope_core::Config;
use vecscope_embedding::OpenAiEmbedder;
use vecscope_engines::{Orchestrator, Registry};

pub mod ingest;
pub mod search;
pub mod status;

const DEFAULT_CONFIG: &str = "vecscope.toml";

/// Compare vector search across Qdrant, Elasticsearch and Typesense
#[derive(Parser)]
#[command(name = "vecscope")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the config file (defaults to ./vecscope.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Embed the document set and load it into every engine
    Ingest(ingest::IngestArgs),

    /// Search a single engine
    Search(search::SearchArgs),

    /// Run one query against every engine side by side
    Compare(search::CompareArgs),

    /// Show health and record counts of every engine
    Status,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = match &self.config {
            Some(path) => Config::load(path, true)?,
            None => Config::load(Path::new(DEFAULT_CONFIG), false)?,
        };
        debug!(collection = %config.collection, "Loaded configuration");

        match self.command {
            Commands::Ingest(args) => ingest::execute(args, &config).await,
            Commands::Search(args) => search::execute(args, &config).await,
            Commands::Compare(args) => search::execute_compare(args, &config).await,
            Commands::Status => status::execute(&config).await,
        }
    }
}

/// Build the embedder and all engine adapters from config.
pub(crate) fn orchestrator(config: &Config) -> Result<Orchestrator> {
    let embedder = OpenAiEmbedder::from_config(&config.embedding)?;
    let registry = Registry::from_config(config)?;
    Ok(Orchestrator::new(Arc::new(embedder), registry)?)
}
