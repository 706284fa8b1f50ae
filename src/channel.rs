//! Mapping user-supplied YouTube channel references to channel ids.
//!
//! Accepted forms:
//! - channel id: `UCxxxxxxxxxxxxxxxxxxxxxx`
//! - channel URL: `https://www.youtube.com/channel/UCxxxxxxxxxxxxxxxxxxxxxx`
//! - handle URL: `https://www.youtube.com/@SomeChannel`
//! - handle: `@SomeChannel`
//!
//! Handles need a network lookup. [`HandlePageResolver`] scrapes the handle's
//! public page for the embedded id; page layouts change without notice, so
//! `None` is an ordinary outcome, not an error.

use crate::chain::Chain;
use crate::http::Fetch;
use crate::utils::truncate_for_log;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument, warn};

static CHANNEL_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^UC[A-Za-z0-9_-]{22}$").unwrap());
static CHANNEL_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"youtube\.com/channel/([A-Za-z0-9_-]+)").unwrap());
static HANDLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@([A-Za-z0-9_.-]+)").unwrap());

/// Patterns that embed the canonical id in a channel page, tried in order.
static PAGE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#""channelId":"(UC[A-Za-z0-9_-]{22})""#,
        r#"<link rel="canonical" href="https://www\.youtube\.com/channel/(UC[A-Za-z0-9_-]{22})""#,
        r#""externalId":"(UC[A-Za-z0-9_-]{22})""#,
        r#"<meta itemprop="(?:channelId|identifier)" content="(UC[A-Za-z0-9_-]{22})""#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Capability to turn a channel reference into a canonical channel id.
pub trait ChannelIdentityResolver {
    /// Canonical channel id, or `None` when the reference cannot be mapped.
    async fn resolve(&self, identifier: &str) -> Option<String>;
}

/// Whether `s` already has the canonical channel-id shape.
pub fn is_channel_id(s: &str) -> bool {
    CHANNEL_ID.is_match(s)
}

/// Id segment of a `/channel/<id>` URL.
pub fn channel_id_from_url(s: &str) -> Option<String> {
    if !s.contains("youtube.com/channel/") {
        return None;
    }
    CHANNEL_URL.captures(s).map(|c| c[1].to_string())
}

/// Handle name (without `@`) of `@name` or a handle URL.
pub fn handle_of(s: &str) -> Option<String> {
    if !s.contains('@') {
        return None;
    }
    HANDLE.captures(s).map(|c| c[1].to_string())
}

/// Resolution that needs no network access.
pub fn resolve_offline(identifier: &str) -> Option<String> {
    Chain::<str, String>::new("channel_identity")
        .then("channel_id", |s| is_channel_id(s).then(|| s.to_string()))
        .then("channel_url", channel_id_from_url)
        .run(identifier.trim())
}

/// First channel id embedded in a channel page.
pub fn channel_id_from_page(html: &str) -> Option<String> {
    PAGE_PATTERNS
        .iter()
        .find_map(|re| re.captures(html).map(|c| c[1].to_string()))
}

/// Resolver that falls back to scraping `https://www.youtube.com/@handle`.
#[derive(Debug)]
pub struct HandlePageResolver<'a, F> {
    fetcher: &'a F,
    base_url: String,
}

impl<'a, F: Fetch> HandlePageResolver<'a, F> {
    pub fn new(fetcher: &'a F) -> Self {
        Self::with_base_url(fetcher, "https://www.youtube.com")
    }

    pub fn with_base_url(fetcher: &'a F, base_url: &str) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn lookup_handle(&self, handle: &str) -> Option<String> {
        let url = format!("{}/@{}", self.base_url, urlencoding::encode(handle));
        match self.fetcher.get(&url).await {
            Ok(html) => {
                let found = channel_id_from_page(&html);
                if found.is_none() {
                    warn!(
                        handle,
                        page_preview = %truncate_for_log(&html, 120),
                        "No channel id found on handle page"
                    );
                }
                found
            }
            Err(e) => {
                warn!(handle, error = %e, "Failed to fetch handle page");
                None
            }
        }
    }
}

impl<F: Fetch> ChannelIdentityResolver for HandlePageResolver<'_, F> {
    #[instrument(level = "debug", skip(self))]
    async fn resolve(&self, identifier: &str) -> Option<String> {
        if let Some(id) = resolve_offline(identifier) {
            return Some(id);
        }
        let handle = handle_of(identifier)?;
        let id = self.lookup_handle(&handle).await;
        debug!(handle = %handle, ?id, "Resolved handle");
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::StaticFetcher;
    use reqwest::StatusCode;

    const ID: &str = "UCabcdefghijklmnopqrstuv";

    #[test]
    fn test_channel_id_shape() {
        assert!(is_channel_id(ID));
        assert!(is_channel_id("UC_x5XG1OV2P6uZZ5FSM9Ttw"));
        assert!(!is_channel_id("UCshort"));
        assert!(!is_channel_id("XXabcdefghijklmnopqrstuv"));
        assert!(!is_channel_id("UCabcdefghijklmnopqrstuvw"));
    }

    #[test]
    fn test_resolve_offline() {
        assert_eq!(resolve_offline(ID).as_deref(), Some(ID));
        assert_eq!(
            resolve_offline(&format!("https://www.youtube.com/channel/{ID}")).as_deref(),
            Some(ID)
        );
        assert_eq!(
            resolve_offline(&format!("https://www.youtube.com/channel/{ID}/videos")).as_deref(),
            Some(ID)
        );
        assert_eq!(resolve_offline("@SomeChannel"), None);
        assert_eq!(resolve_offline("just words"), None);
    }

    #[test]
    fn test_handle_of() {
        assert_eq!(handle_of("@matthew_berman").as_deref(), Some("matthew_berman"));
        assert_eq!(
            handle_of("https://www.youtube.com/@aiDotEngineer").as_deref(),
            Some("aiDotEngineer")
        );
        assert_eq!(
            handle_of("https://www.youtube.com/@Firstpost/videos").as_deref(),
            Some("Firstpost")
        );
        assert_eq!(handle_of("Firstpost"), None);
    }

    #[test]
    fn test_channel_id_from_page_patterns() {
        let json = format!(r#"{{"header":{{"channelId":"{ID}"}}}}"#);
        assert_eq!(channel_id_from_page(&json).as_deref(), Some(ID));

        let canonical = format!(r#"<link rel="canonical" href="https://www.youtube.com/channel/{ID}">"#);
        assert_eq!(channel_id_from_page(&canonical).as_deref(), Some(ID));

        assert_eq!(channel_id_from_page("<html>nothing</html>"), None);
    }

    #[tokio::test]
    async fn test_literal_id_needs_no_network() {
        let fetcher = StaticFetcher::new();
        let resolver = HandlePageResolver::new(&fetcher);

        assert_eq!(resolver.resolve(ID).await.as_deref(), Some(ID));
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_handle_is_scraped() {
        let page = format!(r#"<html><script>var x = {{"channelId":"{ID}"}};</script></html>"#);
        let fetcher = StaticFetcher::new().page("https://www.youtube.com/@SomeChannel", &page);
        let resolver = HandlePageResolver::new(&fetcher);

        let got = resolver.resolve("https://www.youtube.com/@SomeChannel").await;
        assert_eq!(got.as_deref(), Some(ID));
    }

    #[tokio::test]
    async fn test_unresolvable_handle_is_none() {
        let fetcher = StaticFetcher::new()
            .page("https://www.youtube.com/@Empty", "<html></html>")
            .status("https://www.youtube.com/@Gone", StatusCode::NOT_FOUND);
        let resolver = HandlePageResolver::new(&fetcher);

        assert_eq!(resolver.resolve("@Empty").await, None);
        assert_eq!(resolver.resolve("@Gone").await, None);
        assert_eq!(resolver.resolve("not a channel").await, None);
    }
}
