//! Single-engine search and side-by-side comparison.

use anyhow::Result;
use clap::Args;
use serde_json::{json, Value};

use vecscope_core::Config;
use vecscope_engines::EngineOutcome;

use crate::output;

#[derive(Args)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Engine to query (qdrant, elasticsearch, typesense)
    #[arg(long, short, default_value = "qdrant")]
    pub engine: String,

    /// Number of results to return
    #[arg(long, short, default_value = "5")]
    pub limit: usize,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CompareArgs {
    /// Search query
    pub query: String,

    /// Number of results per engine
    #[arg(long, short, default_value = "5")]
    pub limit: usize,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: SearchArgs, config: &Config) -> Result<()> {
    let orchestrator = super::orchestrator(config)?;
    let results = orchestrator
        .search(&args.engine, &args.query, args.limit)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        output::print_results(&args.engine, &results, &config.display);
    }
    Ok(())
}

pub async fn execute_compare(args: CompareArgs, config: &Config) -> Result<()> {
    let orchestrator = super::orchestrator(config)?;
    let outcomes = orchestrator.compare(&args.query, args.limit).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcomes_json(&outcomes))?);
    } else {
        output::print_comparison(&outcomes, &config.display);
    }
    Ok(())
}

/// One entry per engine, in registration order.
fn outcomes_json(outcomes: &[EngineOutcome]) -> Value {
    let entries: Vec<Value> = outcomes
        .iter()
        .map(|o| {
            let mut entry = json!({
                "engine": o.engine,
                "elapsedMs": o.elapsed.as_millis() as u64,
            });
            match &o.results {
                Ok(results) => entry["results"] = json!(results),
                Err(e) => entry["error"] = json!(e.to_string()),
            }
            entry
        })
        .collect();
    Value::Array(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vecscope_core::{SearchResult, VecscopeError};

    #[test]
    fn test_outcomes_json() {
        let outcomes = vec![
            EngineOutcome {
                engine: "qdrant".into(),
                results: Ok(vec![SearchResult {
                    id: 1,
                    title: "Vector Search".into(),
                    short_description: "Find items by meaning.".into(),
                    image: "https://img.test/1.png".into(),
                    url: "/topics/vector-search".into(),
                    score: 0.5,
                }]),
                elapsed: Duration::from_millis(12),
            },
            EngineOutcome {
                engine: "typesense".into(),
                results: Err(VecscopeError::backend("typesense", "search", "timed out")),
                elapsed: Duration::from_millis(2000),
            },
        ];

        let value = outcomes_json(&outcomes);
        assert_eq!(value[0]["engine"], "qdrant");
        assert_eq!(value[0]["elapsedMs"], 12);
        assert_eq!(value[0]["results"][0]["shortDescription"], "Find items by meaning.");
        assert_eq!(value[0]["results"][0]["score"], 0.5);
        assert_eq!(value[1]["engine"], "typesense");
        assert!(value[1]["error"].as_str().unwrap().contains("timed out"));
        assert!(value[1].get("results").is_none());
    }
}
