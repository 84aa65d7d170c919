//! Engine health and record counts.

use anyhow::Result;
use colored::Colorize;

use vecscope_core::Config;
use vecscope_engines::Registry;

use crate::output;

/// Needs no embedding credentials.
pub async fn execute(config: &Config) -> Result<()> {
    let registry = Registry::from_config(config)?;

    println!(
        "{} collection '{}' ({} dims)",
        "Status".bold(),
        config.collection,
        config.embedding.dimension
    );
    let statuses = registry.status().await;
    output::print_status(&statuses);
    Ok(())
}
