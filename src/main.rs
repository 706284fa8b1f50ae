//! # AI News Digest
//!
//! Collects recent AI news from heterogeneous public sources and merges it
//! into one report ordered by recency.
//!
//! ## Features
//!
//! - RSS / Atom feeds, several named feeds per source, deduplicated by URL
//! - XML sitemaps, with titles derived from article slugs
//! - YouTube channels given as ids, channel URLs or handles, with optional
//!   transcripts
//! - Permissive date resolution; dateless entries are admitted up to a cap
//!   in feed order
//! - Optional JSON report files, one per edition
//!
//! ## Usage
//!
//! ```sh
//! ai_news_digest --hours 24 -j ./json
//! ```
//!
//! ## Architecture
//!
//! 1. **Configuration**: built-in sources or a YAML file, plus CLI overrides
//! 2. **Collection**: every source runs independently (see [`scrapers`])
//! 3. **Windowing**: per-source lookback, dedupe and newest-first ordering
//! 4. **Output**: per-source summary in the log, optional JSON report

use clap::Parser;
use std::error::Error;
use std::time::Duration as StdDuration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregator;
mod chain;
mod channel;
mod cli;
mod config;
mod dates;
mod feeds;
mod http;
mod models;
mod outputs;
mod scrapers;
mod transcripts;
mod utils;
mod window;

use aggregator::Aggregator;
use cli::Cli;
use config::AppConfig;
use http::{HttpFetcher, RetryFetch};
use models::Report;
use outputs::json;
use utils::{ensure_writable_dir, truncate_for_log};

/// Initial delay of the HTTP retry backoff.
const RETRY_BASE_DELAY: StdDuration = StdDuration::from_millis(500);

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("ai_news_digest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = AppConfig::load(args.config.as_deref())?.with_overrides(
        args.hours,
        args.transcripts,
        args.languages.clone(),
        args.timeout,
    );
    info!(
        sources = config.sources.len(),
        timeout_secs = config.request_timeout_secs,
        max_retries = config.max_retries,
        "Configuration ready"
    );

    // Early check: ensure JSON output dir is writable
    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir,
                error = %e,
                "JSON output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    let fetcher = RetryFetch::new(
        HttpFetcher::new(
            StdDuration::from_secs(config.request_timeout_secs),
            &config.user_agent,
        )?,
        config.max_retries,
        RETRY_BASE_DELAY,
    );

    // Lookback overrides were already folded into the config.
    let report = Aggregator::new(config, fetcher).run(None).await;
    print_summary(&report);

    if let Some(dir) = &args.json_output_dir {
        match json::write_report(&report, dir).await {
            Ok(path) => info!(path = %path.display(), "Report written"),
            Err(e) => error!(error = %e, "Failed to write JSON report"),
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        total = report.total(),
        "Execution complete"
    );

    Ok(())
}

/// Short per-source listing on stdout.
fn print_summary(report: &Report) {
    println!("AI news digest, {}", report.generated_at.to_rfc3339());
    for source in &report.sources {
        println!("\n{} ({})", source.name, source.items.len());
        for title in source.items.titles() {
            println!("  - {}", truncate_for_log(title, 100));
        }
    }
    println!("\nTotal: {}", report.total());
}
