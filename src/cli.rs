//! Command-line interface definitions for AI News Digest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! The config path and lookback can also come from environment variables.

use crate::config::MAX_LOOKBACK_HOURS;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the AI News Digest application.
///
/// Every flag is optional: with none given the built-in sources are
/// collected with their own lookback windows and the report is only logged.
///
/// # Examples
///
/// ```sh
/// # Built-in sources, summary only
/// ai_news_digest
///
/// # Last 12 hours, with transcripts, written to ./json
/// ai_news_digest --hours 12 --transcripts -j ./json
///
/// # Custom sources
/// NEWS_DIGEST_CONFIG=sources.yaml ai_news_digest --languages en,de
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a sources YAML file
    #[arg(short, long, env = "NEWS_DIGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Lookback window in hours, overriding every source
    #[arg(long, env = "NEWS_DIGEST_HOURS", value_parser = clap::value_parser!(i64).range(1..=MAX_LOOKBACK_HOURS))]
    pub hours: Option<i64>,

    /// Fetch transcripts for YouTube videos
    #[arg(short, long)]
    pub transcripts: bool,

    /// Preferred transcript languages, comma separated
    #[arg(long, value_delimiter = ',')]
    pub languages: Option<Vec<String>>,

    /// Output directory for the JSON report
    #[arg(short, long)]
    pub json_output_dir: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}
