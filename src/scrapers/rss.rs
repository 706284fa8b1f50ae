//! RSS / Atom article source.
//!
//! A source groups one or more named feeds (e.g. `news`, `engineering`,
//! `research`). Each feed is fetched independently; a broken feed is logged
//! and skipped without affecting its siblings. Entries from all feeds pass the
//! time window together; an article listed in two feeds is then kept once,
//! attributed to the first feed whose copy survived the window.

use super::SourceAdapter;
use super::content::fetch_page_text;
use crate::config::FeedConfig;
use crate::dates;
use crate::feeds::{RawEntry, parse_feed};
use crate::http::Fetch;
use crate::models::Article;
use crate::utils::html_to_text;
use crate::window::{TimeWindow, dedupe_by_url, sort_newest_first};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::error::Error;
use tracing::{debug, info, instrument, warn};

/// Adapter for a group of RSS/Atom feeds.
#[derive(Debug)]
pub struct RssAdapter<'a, F> {
    name: String,
    feeds: Vec<FeedConfig>,
    fetch_content: bool,
    concurrency: usize,
    fetcher: &'a F,
}

impl<'a, F: Fetch> RssAdapter<'a, F> {
    pub fn new(name: &str, feeds: Vec<FeedConfig>, fetcher: &'a F) -> Self {
        Self {
            name: name.to_string(),
            feeds,
            fetch_content: false,
            concurrency: 4,
            fetcher,
        }
    }

    /// Attach each surviving article's page text, `concurrency` pages at a time.
    pub fn with_content(mut self, enabled: bool, concurrency: usize) -> Self {
        self.fetch_content = enabled;
        self.concurrency = concurrency.max(1);
        self
    }

    /// Fetch one feed and map its entries to articles, in feed order.
    #[instrument(level = "info", skip_all, fields(source = %self.name, feed = %feed.name))]
    async fn fetch_feed(&self, feed: &FeedConfig) -> Result<Vec<Article>, Box<dyn Error>> {
        let body = self.fetcher.get(&feed.url).await?;
        let entries = parse_feed(&body)?;
        debug!(entries = entries.len(), "Parsed feed");
        Ok(entries
            .into_iter()
            .map(|entry| to_article(entry, &feed.name))
            .collect())
    }

    async fn attach_content(&self, articles: Vec<Article>) -> Vec<Article> {
        stream::iter(articles)
            .map(|article| async move {
                match fetch_page_text(self.fetcher, &article.url).await {
                    Ok(text) => article.with_content(text),
                    Err(e) => {
                        warn!(source = %self.name, url = %article.url, error = %e, "Article page fetch failed");
                        article
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

/// Map one raw feed entry to an article.
pub fn to_article(entry: RawEntry, feed_name: &str) -> Article {
    let published_at = dates::resolve(&entry.date_candidates());
    let RawEntry {
        title,
        link,
        description,
        categories,
        ..
    } = entry;
    let url = link.unwrap_or_default();
    Article {
        title: title
            .map(|t| html_to_text(&t))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| url.clone()),
        published_at,
        description: description.map(|d| html_to_text(&d)).unwrap_or_default(),
        category: categories.into_iter().next().unwrap_or_default(),
        source_feed: feed_name.to_string(),
        content: None,
        url,
    }
}

impl<F: Fetch> SourceAdapter for RssAdapter<'_, F> {
    type Record = Article;

    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(level = "info", skip_all, fields(source = %self.name))]
    async fn collect(&self, window: TimeWindow) -> Vec<Article> {
        let results = join_all(self.feeds.iter().map(|feed| self.fetch_feed(feed))).await;

        let mut all = Vec::new();
        for (feed, result) in self.feeds.iter().zip(results) {
            match result {
                Ok(articles) => {
                    info!(feed = %feed.name, count = articles.len(), "Fetched feed");
                    all.extend(articles);
                }
                Err(e) => {
                    warn!(feed = %feed.name, url = %feed.url, error = %e, "Error fetching feed");
                }
            }
        }

        // Window first so an in-window dated copy of a URL wins over a
        // dateless copy listed earlier.
        let mut articles = dedupe_by_url(window.admit(all));
        sort_newest_first(&mut articles);
        info!(count = articles.len(), "Articles inside time window");

        if self.fetch_content {
            self.attach_content(articles).await
        } else {
            articles
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::StaticFetcher;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 6, 12, 0, 0).unwrap()
    }

    fn window(lookback_hours: i64, dateless_cap: usize) -> TimeWindow {
        TimeWindow {
            lookback_hours,
            dateless_cap,
            now: now(),
        }
    }

    fn item(title: &str, link: &str, date: Option<DateTime<Utc>>) -> String {
        let date = date
            .map(|d| format!("<pubDate>{}</pubDate>", d.to_rfc2822()))
            .unwrap_or_default();
        format!("<item><title>{title}</title><link>{link}</link><description>about {title}</description>{date}</item>")
    }

    fn rss(items: &[String]) -> String {
        format!(
            r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Feed</title>{}</channel></rss>"#,
            items.concat()
        )
    }

    fn feed(name: &str, url: &str) -> FeedConfig {
        FeedConfig {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    fn urls(articles: &[Article]) -> Vec<&str> {
        articles.iter().map(|a| a.url.as_str()).collect()
    }

    #[tokio::test]
    async fn test_window_keeps_recent_entries_newest_first() {
        let now = now();
        let body = rss(&[
            item("Now", "https://x.test/now", Some(now)),
            item("Older", "https://x.test/30h", Some(now - Duration::hours(30))),
            item("Oldest", "https://x.test/100h", Some(now - Duration::hours(100))),
        ]);
        let fetcher = StaticFetcher::new().page("https://x.test/feed.xml", &body);
        let adapter = RssAdapter::new("x", vec![feed("news", "https://x.test/feed.xml")], &fetcher);

        let got = adapter.collect(window(48, 10)).await;
        assert_eq!(urls(&got), vec!["https://x.test/now", "https://x.test/30h"]);
        assert_eq!(got[0].description, "about Now");
        assert_eq!(got[0].source_feed, "news");
    }

    #[tokio::test]
    async fn test_dateless_entries_capped_in_feed_order() {
        let items = (1..=5)
            .map(|i| item(&format!("D{i}"), &format!("https://x.test/d{i}"), None))
            .collect::<Vec<_>>();
        let fetcher = StaticFetcher::new().page("https://x.test/feed.xml", &rss(&items));
        let adapter = RssAdapter::new("x", vec![feed("news", "https://x.test/feed.xml")], &fetcher);

        let got = adapter.collect(window(24, 2)).await;
        assert_eq!(urls(&got), vec!["https://x.test/d1", "https://x.test/d2"]);
        assert!(got.iter().all(|a| a.published_at.is_none()));
    }

    #[tokio::test]
    async fn test_same_url_in_two_feeds_is_kept_once() {
        let now = now();
        let news = rss(&[
            item("Shared", "https://x.test/shared", Some(now - Duration::hours(1))),
            item("News only", "https://x.test/news", Some(now - Duration::hours(2))),
        ]);
        let research = rss(&[
            item("Shared", "https://x.test/shared", Some(now - Duration::hours(1))),
            item("Research only", "https://x.test/research", Some(now - Duration::hours(3))),
        ]);
        let fetcher = StaticFetcher::new()
            .page("https://x.test/news.xml", &news)
            .page("https://x.test/research.xml", &research);
        let adapter = RssAdapter::new(
            "x",
            vec![
                feed("news", "https://x.test/news.xml"),
                feed("research", "https://x.test/research.xml"),
            ],
            &fetcher,
        );

        let got = adapter.collect(window(24, 10)).await;
        assert_eq!(
            urls(&got),
            vec!["https://x.test/shared", "https://x.test/news", "https://x.test/research"]
        );
        assert_eq!(got[0].source_feed, "news");
    }

    fn two_feeds(fetcher: &StaticFetcher) -> RssAdapter<'_, StaticFetcher> {
        RssAdapter::new(
            "x",
            vec![
                feed("news", "https://x.test/news.xml"),
                feed("research", "https://x.test/research.xml"),
            ],
            fetcher,
        )
    }

    #[tokio::test]
    async fn test_dated_copy_wins_over_earlier_dateless_copy() {
        let now = now();
        let fetcher = StaticFetcher::new()
            .page("https://x.test/news.xml", &rss(&[item("Shared", "https://x.test/s", None)]))
            .page(
                "https://x.test/research.xml",
                &rss(&[item("Shared", "https://x.test/s", Some(now))]),
            );
        let adapter = two_feeds(&fetcher);

        let got = adapter.collect(window(24, 0)).await;
        assert_eq!(urls(&got), vec!["https://x.test/s"]);
        assert_eq!(got[0].published_at, Some(now));
        assert_eq!(got[0].source_feed, "research");

        let got = adapter.collect(window(24, 5)).await;
        assert_eq!(urls(&got), vec!["https://x.test/s"]);
        assert_eq!(got[0].published_at, Some(now));
        assert_eq!(got[0].source_feed, "research");
    }

    #[tokio::test]
    async fn test_stale_copy_does_not_hide_later_dateless_copy() {
        let now = now();
        let fetcher = StaticFetcher::new()
            .page(
                "https://x.test/news.xml",
                &rss(&[item("Shared", "https://x.test/s", Some(now - Duration::hours(100)))]),
            )
            .page("https://x.test/research.xml", &rss(&[item("Shared", "https://x.test/s", None)]));
        let adapter = two_feeds(&fetcher);

        let got = adapter.collect(window(24, 10)).await;
        assert_eq!(urls(&got), vec!["https://x.test/s"]);
        assert_eq!(got[0].published_at, None);
        assert_eq!(got[0].source_feed, "research");

        assert!(adapter.collect(window(24, 0)).await.is_empty());
    }

    #[tokio::test]
    async fn test_broken_feed_does_not_affect_siblings() {
        let now = now();
        let good = rss(&[item("Good", "https://x.test/good", Some(now))]);
        let fetcher = StaticFetcher::new()
            .page("https://x.test/good.xml", &good)
            .page("https://x.test/garbage.xml", "<rss><channel><item></rss>");
        let adapter = RssAdapter::new(
            "x",
            vec![
                feed("missing", "https://x.test/missing.xml"),
                feed("garbage", "https://x.test/garbage.xml"),
                feed("good", "https://x.test/good.xml"),
            ],
            &fetcher,
        );

        let got = adapter.collect(window(24, 10)).await;
        assert_eq!(urls(&got), vec!["https://x.test/good"]);
    }

    #[tokio::test]
    async fn test_content_enrichment() {
        let now = now();
        let body = rss(&[
            item("A", "https://x.test/a", Some(now)),
            item("B", "https://x.test/b", Some(now - Duration::hours(1))),
        ]);
        let fetcher = StaticFetcher::new()
            .page("https://x.test/feed.xml", &body)
            .page("https://x.test/a", "<html><article><p>Body of A</p></article></html>");
        let adapter = RssAdapter::new("x", vec![feed("news", "https://x.test/feed.xml")], &fetcher)
            .with_content(true, 2);

        let got = adapter.collect(window(24, 10)).await;
        assert_eq!(got[0].content.as_deref(), Some("Body of A"));
        assert_eq!(got[1].content, None);
    }

    #[test]
    fn test_to_article_fields() {
        let entry = RawEntry {
            title: None,
            link: Some("https://x.test/a".to_string()),
            description: Some("<p>Hello <i>there</i></p>".to_string()),
            categories: vec!["Announcements".to_string(), "Other".to_string()],
            published: Some("2025-05-06T10:00:00Z".to_string()),
            ..RawEntry::default()
        };

        let article = to_article(entry, "news");
        assert_eq!(article.title, "https://x.test/a");
        assert_eq!(article.description, "Hello there");
        assert_eq!(article.category, "Announcements");
        assert_eq!(
            article.published_at,
            Some(Utc.with_ymd_and_hms(2025, 5, 6, 10, 0, 0).unwrap())
        );
    }
}
