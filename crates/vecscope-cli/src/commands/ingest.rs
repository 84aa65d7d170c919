//! Document ingestion into every engine.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use vecscope_core::{load_documents, sample_documents, Config, Document, VecscopeResult};
use vecscope_engines::{IngestOptions, IngestProgress};

use crate::output;

#[derive(Args)]
pub struct IngestArgs {
    /// JSON array of documents (defaults to the built-in sample set)
    #[arg(long, short)]
    pub data: Option<PathBuf>,

    /// Drop and recreate each collection before loading
    #[arg(long)]
    pub recreate: bool,
}

/// Progress bar over the embedding phase. Engine outcomes are printed as
/// they finish, after the bar is gone.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template("{spinner} embedding [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        Self { bar }
    }
}

impl IngestProgress for BarProgress {
    fn embedded(&self, done: usize, _total: usize, document: &Document) {
        self.bar.set_position(done as u64);
        self.bar.set_message(document.title.clone());
        if self.bar.position() >= self.bar.length().unwrap_or(0) {
            self.bar.finish_and_clear();
        }
    }

    fn backend_started(&self, backend: &str) {
        println!("{} {}", "→".dimmed(), format!("loading {}", backend).dimmed());
    }

    fn backend_finished(&self, backend: &str, outcome: &VecscopeResult<usize>) {
        let line = match outcome {
            Ok(count) => format!("{} {} ({} documents)", "✓".green().bold(), backend, count),
            Err(e) => format!("{} {}: {}", "✗".red().bold(), backend, e),
        };
        println!("{}", line);
    }
}

pub async fn execute(args: IngestArgs, config: &Config) -> Result<()> {
    let documents = match &args.data {
        Some(path) => load_documents(path)?,
        None => sample_documents(),
    };

    let orchestrator = super::orchestrator(config)?;
    println!(
        "{} {} documents into collection '{}'",
        "Ingesting".bold(),
        documents.len(),
        config.collection
    );

    let progress = BarProgress::new(documents.len());
    let options = IngestOptions {
        recreate: args.recreate,
    };
    let report = orchestrator
        .ingest_all(&documents, options, &progress)
        .await;
    progress.bar.finish_and_clear();

    let report = report?;
    output::print_ingest_report(&report);
    report.into_result()?;
    Ok(())
}
