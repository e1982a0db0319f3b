//! CLI binary for metasearch.

use anyhow::Context;
use clap::Parser;
use metasearch::{Metasearch, MetasearchConfig, SearchResponse};
use metasearch_core::{Locale, SafeSearch, SearchQuery, SearchResult, TimeRange};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Metasearch: query several search engines at once.
#[derive(Parser)]
#[command(name = "metasearch", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Category to search (defaults to the configured default category).
    #[arg(short = 'C', long)]
    category: Option<String>,

    /// Query locale, e.g. `en-US` or `de`.
    #[arg(short, long)]
    language: Option<Locale>,

    /// Result page.
    #[arg(short, long, default_value_t = 1)]
    page: u32,

    /// Restrict to a time range: day, week, month or year.
    #[arg(short, long)]
    time_range: Option<TimeRange>,

    /// Safe search level: off, moderate or strict.
    #[arg(short, long, default_value = "moderate")]
    safesearch: SafeSearch,

    /// Print the response as JSON.
    #[arg(long)]
    json: bool,

    /// Write the effective configuration to the default config path and exit.
    #[arg(long)]
    init_config: bool,

    /// Search terms.
    #[arg(required_unless_present = "init_config")]
    query: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so JSON output on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("metasearch=warn,metasearch_core=warn")
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = if let Some(ref path) = cli.config {
        MetasearchConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?
    } else {
        let path = MetasearchConfig::default_config_path();
        if path.exists() {
            MetasearchConfig::from_file(&path)
                .with_context(|| format!("loading {}", path.display()))?
        } else {
            MetasearchConfig::default()
        }
    };

    if cli.init_config {
        let path = MetasearchConfig::default_config_path();
        config.save_to_file(&path)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let metasearch = Metasearch::from_config(config)?;

    let mut query = SearchQuery::new(cli.query.join(" "))
        .with_pageno(cli.page.max(1))
        .with_safesearch(cli.safesearch);
    if let Some(locale) = cli.language {
        query = query.with_locale(locale);
    }
    if let Some(time_range) = cli.time_range {
        query = query.with_time_range(time_range);
    }

    let response = metasearch.search(&query, cli.category.as_deref()).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response);
    }
    Ok(())
}

fn print_response(response: &SearchResponse) {
    if response.results.is_empty() {
        println!("No results for \"{}\".", response.query);
    }
    for (i, result) in response.results.iter().enumerate() {
        print_result(&format!("{:>2}.", i + 1), result);
        for sitelink in &result.sitelinks {
            print_result("    -", sitelink);
        }
    }

    if !response.suggestions.is_empty() {
        println!("\nDid you mean: {}", response.suggestions.join(", "));
    }
    for engine in &response.unresponsive_engines {
        let suspended = if engine.suspended { " (suspended)" } else { "" };
        eprintln!("{}: {}{suspended}", engine.engine, engine.error_type);
    }
    for engine in &response.suspended_engines {
        eprintln!("{engine}: skipped, engine suspended");
    }
}

fn print_result(marker: &str, result: &SearchResult) {
    let indent = " ".repeat(marker.len() + 1);
    println!("{marker} {} [{}]", result.title, result.engine);
    println!("{indent}{}", result.url_str());
    if !result.content.is_empty() {
        println!("{indent}{}", truncate(&result.content, 160));
    }
}

/// Cut `s` to at most `max` characters, marking the cut.
fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_owned(),
    }
}
