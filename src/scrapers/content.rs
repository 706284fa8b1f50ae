//! Readable text of article pages.
//!
//! Used to enrich RSS articles after collection. Pages are reduced to the
//! paragraphs of their `<article>` (or `<main>`) element, falling back to
//! every paragraph on the page.

use crate::http::Fetch;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::error::Error;
use tracing::{debug, instrument};

static CONTAINERS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["article p, article h1, article h2, article h3, article li", "main p, main h2, main li", "p"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

/// Text of the first container selector that matches any element.
pub fn page_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    for selector in CONTAINERS.iter() {
        let mut content = String::new();
        for element in document.select(selector) {
            let text = element.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !text.is_empty() {
                content.push_str(&text);
                content.push('\n');
            }
        }
        if !content.is_empty() {
            return Some(content.trim_end().to_string());
        }
    }
    None
}

/// Fetch `url` and extract its readable text.
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn fetch_page_text<F: Fetch>(
    fetcher: &F,
    url: &str,
) -> Result<Option<String>, Box<dyn Error>> {
    let body = fetcher.get(url).await?;
    let text = page_text(&body);
    debug!(bytes = text.as_ref().map_or(0, |t| t.len()), "Parsed article page");
    Ok(text)
}
