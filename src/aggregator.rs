//! Fan-out over every configured source into one [`Report`].

use crate::channel::HandlePageResolver;
use crate::config::{AppConfig, SourceConfig, SourceKind};
use crate::http::Fetch;
use crate::models::{Report, SourceItems, SourceReport};
use crate::scrapers::SourceAdapter;
use crate::scrapers::rss::RssAdapter;
use crate::scrapers::sitemap::SitemapAdapter;
use crate::scrapers::youtube::YoutubeAdapter;
use crate::transcripts::WatchPageBackend;
use crate::window::TimeWindow;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

/// Runs every configured source and assembles the report.
///
/// Sources are collected concurrently but never share state; a source that
/// fails contributes an empty item list and does not affect the others.
#[derive(Debug)]
pub struct Aggregator<F> {
    config: AppConfig,
    fetcher: F,
}

impl<F: Fetch> Aggregator<F> {
    pub fn new(config: AppConfig, fetcher: F) -> Self {
        Self { config, fetcher }
    }

    /// Collect every source with "now" taken at call time.
    ///
    /// `lookback_hours` overrides every source's configured lookback.
    pub async fn run(&self, lookback_hours: Option<i64>) -> Report {
        self.run_at(lookback_hours, Utc::now()).await
    }

    /// Collect every source against a fixed reference instant.
    #[instrument(level = "info", skip(self), fields(sources = self.config.sources.len()))]
    pub async fn run_at(&self, lookback_hours: Option<i64>, now: DateTime<Utc>) -> Report {
        let sources = join_all(self.config.sources.iter().map(|source| {
            let window = TimeWindow {
                lookback_hours: lookback_hours.unwrap_or(source.lookback_hours),
                dateless_cap: source.dateless_cap,
                now,
            };
            self.collect_source(source, window)
        }))
        .await;

        let report = Report {
            generated_at: now,
            sources,
        };
        for (name, count) in report.counts() {
            info!(source = name, count, "Source summary");
        }
        info!(total = report.total(), "Aggregation complete");
        report
    }

    async fn collect_source(&self, source: &SourceConfig, window: TimeWindow) -> SourceReport {
        let items = match &source.kind {
            SourceKind::Rss {
                feeds,
                fetch_content,
            } => {
                let adapter = RssAdapter::new(&source.name, feeds.clone(), &self.fetcher)
                    .with_content(*fetch_content, self.config.concurrency);
                SourceItems::Articles(collect_with(adapter, window).await)
            }
            SourceKind::Sitemap {
                url,
                article_marker,
            } => {
                let adapter = SitemapAdapter::new(&source.name, url, article_marker, &self.fetcher);
                SourceItems::Articles(collect_with(adapter, window).await)
            }
            SourceKind::Youtube {
                channels,
                transcripts,
                languages,
            } => {
                let adapter = YoutubeAdapter::new(
                    &source.name,
                    channels.clone(),
                    &self.fetcher,
                    HandlePageResolver::new(&self.fetcher),
                    WatchPageBackend::new(&self.fetcher),
                )
                .with_transcripts(*transcripts, languages.clone())
                .with_concurrency(self.config.concurrency);
                SourceItems::Videos(collect_with(adapter, window).await)
            }
        };

        if items.is_empty() {
            warn!(source = %source.name, "Source returned no items");
        }
        SourceReport {
            name: source.name.clone(),
            items,
        }
    }
}

async fn collect_with<A: SourceAdapter>(adapter: A, window: TimeWindow) -> Vec<A::Record> {
    let t0 = std::time::Instant::now();
    let records = adapter.collect(window).await;
    debug!(
        source = adapter.name(),
        count = records.len(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Collected source"
    );
    records
}
