//! Sitemap article source.
//!
//! Sites without a feed still publish a `sitemap.xml`. Article pages are
//! recognised by a path marker (`/p/` on Substack-style sites), titles come
//! from the URL slug and dates from `<lastmod>`.

use super::SourceAdapter;
use crate::dates::{self, DateCandidate};
use crate::feeds::{SitemapEntry, parse_sitemap};
use crate::http::Fetch;
use crate::models::Article;
use crate::utils::title_from_slug;
use crate::window::{TimeWindow, dedupe_by_url, sort_newest_first};
use std::error::Error;
use tracing::{debug, info, instrument, warn};

/// Adapter for one sitemap document.
#[derive(Debug)]
pub struct SitemapAdapter<'a, F> {
    name: String,
    url: String,
    article_marker: String,
    fetcher: &'a F,
}

impl<'a, F: Fetch> SitemapAdapter<'a, F> {
    pub fn new(name: &str, url: &str, article_marker: &str, fetcher: &'a F) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            article_marker: article_marker.to_string(),
            fetcher,
        }
    }

    async fn fetch_entries(&self) -> Result<Vec<SitemapEntry>, Box<dyn Error>> {
        let body = self.fetcher.get(&self.url).await?;
        let entries = parse_sitemap(&body)?;
        debug!(entries = entries.len(), "Parsed sitemap");
        Ok(entries)
    }

    fn to_article(&self, entry: SitemapEntry) -> Article {
        let lastmod = entry.lastmod.as_deref().unwrap_or_default();
        let published_at = dates::resolve(&[DateCandidate::Text(lastmod), DateCandidate::Day(lastmod)]);
        Article {
            title: title_from_slug(&entry.loc),
            published_at,
            description: String::new(),
            category: String::new(),
            source_feed: self.name.clone(),
            content: None,
            url: entry.loc,
        }
    }
}

impl<F: Fetch> SourceAdapter for SitemapAdapter<'_, F> {
    type Record = Article;

    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(level = "info", skip_all, fields(source = %self.name, url = %self.url))]
    async fn collect(&self, window: TimeWindow) -> Vec<Article> {
        let entries = match self.fetch_entries().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Error fetching sitemap");
                return Vec::new();
            }
        };

        let total = entries.len();
        let articles = entries
            .into_iter()
            .filter(|e| e.loc.contains(&self.article_marker))
            .map(|e| self.to_article(e))
            .collect::<Vec<_>>();
        debug!(total, articles = articles.len(), marker = %self.article_marker, "Selected article pages");

        // Window first so an in-window dated copy of a URL wins over a
        // dateless copy listed earlier.
        let mut articles = dedupe_by_url(window.admit(articles));
        sort_newest_first(&mut articles);
        info!(count = articles.len(), "Articles inside time window");
        articles
    }
}
