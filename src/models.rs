//! Data models for collected articles, videos and the aggregated report.
//!
//! This module defines the records every source adapter produces:
//! - [`Article`]: an item from an RSS feed or a sitemap
//! - [`Video`]: an item from a YouTube channel feed, optionally with a [`Transcript`]
//! - [`Report`]: the per-source result sets of one aggregation run
//!
//! Records are built once from a raw entry and never mutated in place.
//! Post-hoc enrichment (transcripts, article bodies) produces a new value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Common accessors the window filter, deduplicator and sorter rely on.
pub trait Record {
    /// Identity key. Two records with equal URLs are the same item.
    fn url(&self) -> &str;
    /// Publication instant, already normalized to UTC.
    fn published_at(&self) -> Option<DateTime<Utc>>;
}

/// An article collected from an RSS feed or a sitemap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Display title.
    pub title: String,
    /// Canonical URL of the article.
    pub url: String,
    /// Publication date, when one could be resolved.
    pub published_at: Option<DateTime<Utc>>,
    /// Plain-text excerpt. May be empty.
    pub description: String,
    /// First category attached to the entry, if any.
    pub category: String,
    /// Name of the feed (or sitemap) that produced this article.
    pub source_feed: String,
    /// Readable page text, attached after collection when enabled.
    pub content: Option<String>,
}

impl Article {
    /// Return a copy of this article with its page text attached.
    pub fn with_content(self, content: Option<String>) -> Self {
        Self { content, ..self }
    }
}

impl Record for Article {
    fn url(&self) -> &str {
        &self.url
    }

    fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }
}

/// Flattened transcript text of a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Language code of the selected track (e.g. `en`, `fr`).
    pub language: String,
    /// Whether the track was generated by speech recognition.
    pub generated: bool,
    /// Segments joined with single spaces.
    pub text: String,
}

/// A video collected from a YouTube channel feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub title: String,
    /// Watch URL; the identity key.
    pub link: String,
    pub video_id: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub description: String,
    pub channel_id: String,
    pub transcript: Option<Transcript>,
}

impl Video {
    /// Return a copy of this video with the transcript attached.
    pub fn with_transcript(self, transcript: Option<Transcript>) -> Self {
        Self { transcript, ..self }
    }
}

impl Record for Video {
    fn url(&self) -> &str {
        &self.link
    }

    fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }
}

/// Items collected from one configured source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "lowercase")]
pub enum SourceItems {
    Articles(Vec<Article>),
    Videos(Vec<Video>),
}

impl SourceItems {
    pub fn len(&self) -> usize {
        match self {
            SourceItems::Articles(a) => a.len(),
            SourceItems::Videos(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Titles in result order, for console listings.
    pub fn titles(&self) -> Vec<&str> {
        match self {
            SourceItems::Articles(a) => a.iter().map(|x| x.title.as_str()).collect(),
            SourceItems::Videos(v) => v.iter().map(|x| x.title.as_str()).collect(),
        }
    }
}

/// Result of one configured source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    /// Configured source name (e.g. `anthropic`).
    pub name: String,
    #[serde(flatten)]
    pub items: SourceItems,
}

/// Everything collected by one aggregation run.
///
/// Sources appear in configuration order, never reordered by size or recency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Instant the run started; also the "now" used for time windows.
    pub generated_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
}

impl Report {
    /// Item count per source, in report order.
    pub fn counts(&self) -> Vec<(&str, usize)> {
        self.sources
            .iter()
            .map(|s| (s.name.as_str(), s.items.len()))
            .collect()
    }

    /// Grand total across every source.
    pub fn total(&self) -> usize {
        self.sources.iter().map(|s| s.items.len()).sum()
    }
}
