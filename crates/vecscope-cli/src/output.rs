//! Terminal output formatting.

use colored::{ColoredString, Colorize};
use unicode_width::UnicodeWidthStr;

use vecscope_core::config::DisplayConfig;
use vecscope_core::{SearchResult, VecscopeError};
use vecscope_engines::{EngineOutcome, EngineStatus, IngestReport};

/// Print an error in red on stderr.
pub fn print_error(error: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);
    for cause in error.chain().skip(1) {
        eprintln!("  {} {}", "caused by:".dimmed(), cause);
    }
    if let Some(hint) = error_hint(error) {
        eprintln!("  {} {}", "hint:".yellow(), hint);
    }
}

/// Next step for errors scoped to one engine.
fn error_hint(error: &anyhow::Error) -> Option<String> {
    let error = error.downcast_ref::<VecscopeError>()?;
    let engine = error.backend_name()?;
    Some(match error {
        VecscopeError::Schema { .. } => format!(
            "the {} collection does not match; run `vecscope ingest --recreate`",
            engine
        ),
        _ => format!(
            "check that {} is running and the [{}] url in the config",
            engine, engine
        ),
    })
}

/// Print one engine's ranked results.
pub fn print_results(engine: &str, results: &[SearchResult], display: &DisplayConfig) {
    if results.is_empty() {
        println!("{}", "No results found.".dimmed());
        return;
    }

    println!(
        "{} {} result(s) from {}:\n",
        "✓".green().bold(),
        results.len(),
        engine.cyan().bold()
    );

    let width = term_width();
    for (i, result) in results.iter().enumerate() {
        print_result(i + 1, result, display, width);
    }
}

fn print_result(rank: usize, result: &SearchResult, display: &DisplayConfig, width: usize) {
    // "  1. " prefix plus the score suffix
    let title_width = width.saturating_sub(18).max(10);
    println!(
        "  {}. {} ({})",
        rank.to_string().bold(),
        truncate_visual(&result.title, title_width).bold(),
        score_colored(result.score),
    );

    let body_width = width.saturating_sub(5).max(10);
    if !result.short_description.is_empty() {
        println!("     {}", truncate_visual(&result.short_description, body_width));
    }
    println!("     {}", display.link_for(&result.url).blue().underline());
    println!(
        "     {}",
        truncate_visual(&format!("image: {}", result.image), body_width).dimmed()
    );
}

/// Print every engine's answer to the same query, one block per engine.
pub fn print_comparison(outcomes: &[EngineOutcome], display: &DisplayConfig) {
    let width = term_width();

    for outcome in outcomes {
        println!(
            "{} {}",
            outcome.engine.to_uppercase().cyan().bold(),
            format!("({} ms)", outcome.elapsed.as_millis()).dimmed()
        );
        println!("{}", "─".repeat(width.min(60)));

        match &outcome.results {
            Ok(results) if results.is_empty() => {
                println!("  {}", "No results found.".dimmed());
            }
            Ok(results) => {
                for (i, result) in results.iter().enumerate() {
                    print_result(i + 1, result, display, width);
                }
            }
            Err(e) => println!("  {} {}", "✗".red().bold(), e.to_string().red()),
        }
        println!();
    }
}

/// Print per-engine ingestion outcomes.
pub fn print_ingest_report(report: &IngestReport) {
    println!();
    println!("{:<16} {:<8} {:>10}", "Engine", "Status", "Time");
    println!("{}", "─".repeat(36));

    for backend in &report.backends {
        let status = match &backend.outcome {
            Ok(_) => "ok".green(),
            Err(_) => "failed".red().bold(),
        };
        println!(
            "{:<16} {:<8} {:>10}",
            backend.backend,
            status,
            format!("{} ms", backend.elapsed.as_millis())
        );
    }

    println!();
    let ok = report.backends.len() - report.failures().count();
    println!(
        "{} document(s) loaded into {}/{} engine(s)",
        report.documents,
        ok,
        report.backends.len()
    );
}

/// Print engine health and counts as a table.
pub fn print_status(statuses: &[EngineStatus]) {
    println!("{:<16} {:<10} {:>10}", "Engine", "Health", "Documents");
    println!("{}", "─".repeat(38));

    for status in statuses {
        let health = match &status.health {
            Ok(()) => "up".green(),
            Err(_) => "down".red().bold(),
        };
        let count = match &status.count {
            Some(Ok(n)) => n.to_string(),
            Some(Err(_)) => "error".to_string(),
            None => "-".to_string(),
        };
        println!("{:<16} {:<10} {:>10}", status.engine, health, count);
    }

    for status in statuses {
        let error = match (&status.health, &status.count) {
            (Err(e), _) | (Ok(()), Some(Err(e))) => e,
            _ => continue,
        };
        println!(
            "  {} {}",
            "!".yellow(),
            truncate_visual(&error.to_string(), term_width().saturating_sub(4))
        );
    }
}

/// Color a normalized score: green above 0.8, yellow above 0.5.
fn score_colored(score: f32) -> ColoredString {
    let text = format!("{:.4}", score);
    if score > 0.8 {
        text.green()
    } else if score > 0.5 {
        text.yellow()
    } else {
        text.red()
    }
}

/// Get terminal width, defaulting to 80.
fn term_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80)
}

/// Truncate a string respecting visual width.
fn truncate_visual(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    if max_width <= 3 {
        return ".".repeat(max_width);
    }
    let mut result = String::new();
    let mut current_width = 0;
    for ch in s.chars() {
        let ch_width = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if current_width + ch_width > max_width - 2 {
            break;
        }
        result.push(ch);
        current_width += ch_width;
    }
    result.push_str("..");
    result
}
