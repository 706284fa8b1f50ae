//! Source configuration.
//!
//! The configuration is a YAML document listing the sources to collect from,
//! in the order they should appear in the report. When no file is given the
//! built-in [`AppConfig::default`] is used.
//!
//! ```yaml
//! request_timeout_secs: 10
//! sources:
//!   - name: openai
//!     kind: rss
//!     lookback_hours: 48
//!     feeds:
//!       - name: news
//!         url: https://openai.com/news/rss.xml
//!   - name: forwardfuture
//!     kind: sitemap
//!     url: https://www.forwardfuture.ai/sitemap.xml
//!     article_marker: /p/
//!   - name: youtube
//!     kind: youtube
//!     channels:
//!       - "@SomeChannel"
//!       - UCxxxxxxxxxxxxxxxxxxxxxx
//! ```

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;
use tracing::{info, instrument};

/// Longest accepted lookback, ten years.
pub const MAX_LOOKBACK_HOURS: i64 = 87_600;

fn default_lookback_hours() -> i64 {
    48
}

fn default_dateless_cap() -> usize {
    10
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> usize {
    2
}

fn default_concurrency() -> usize {
    4
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

fn default_languages() -> Vec<String> {
    vec!["en".to_string()]
}

fn default_article_marker() -> String {
    "/p/".to_string()
}

/// One named feed URL of an RSS source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
}

/// Settings specific to each kind of source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceKind {
    /// One or more RSS/Atom feeds whose items are articles.
    Rss {
        feeds: Vec<FeedConfig>,
        /// Fetch each surviving article's page and attach its text.
        #[serde(default)]
        fetch_content: bool,
    },
    /// An XML sitemap whose article pages share a path marker.
    Sitemap {
        url: String,
        #[serde(default = "default_article_marker")]
        article_marker: String,
    },
    /// YouTube channels, given as ids, channel URLs or handles.
    Youtube {
        channels: Vec<String>,
        #[serde(default)]
        transcripts: bool,
        #[serde(default = "default_languages")]
        languages: Vec<String>,
    },
}

/// One configured source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: i64,
    /// How many dateless entries to admit, taken in feed order.
    #[serde(default = "default_dateless_cap")]
    pub dateless_cap: usize,
    #[serde(flatten)]
    pub kind: SourceKind,
}

/// Whole application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Retries for transient HTTP failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Concurrent channel and transcript requests within one source.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    pub sources: Vec<SourceConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let rss = |name: &str, lookback_hours, feeds: &[(&str, &str)]| SourceConfig {
            name: name.to_string(),
            lookback_hours,
            dateless_cap: default_dateless_cap(),
            kind: SourceKind::Rss {
                feeds: feeds
                    .iter()
                    .map(|(n, u)| FeedConfig {
                        name: n.to_string(),
                        url: u.to_string(),
                    })
                    .collect(),
                fetch_content: false,
            },
        };

        AppConfig {
            request_timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
            concurrency: default_concurrency(),
            sources: vec![
                SourceConfig {
                    name: "youtube".to_string(),
                    lookback_hours: 48,
                    dateless_cap: default_dateless_cap(),
                    kind: SourceKind::Youtube {
                        channels: vec![
                            "https://www.youtube.com/@matthew_berman".to_string(),
                            "https://www.youtube.com/@Firstpost".to_string(),
                            "https://www.youtube.com/@aiDotEngineer".to_string(),
                        ],
                        transcripts: false,
                        languages: default_languages(),
                    },
                },
                rss(
                    "anthropic",
                    24,
                    &[
                        (
                            "news",
                            "https://raw.githubusercontent.com/Olshansk/rss-feeds/main/feeds/feed_anthropic_news.xml",
                        ),
                        (
                            "engineering",
                            "https://raw.githubusercontent.com/Olshansk/rss-feeds/main/feeds/feed_anthropic_engineering.xml",
                        ),
                        (
                            "research",
                            "https://raw.githubusercontent.com/Olshansk/rss-feeds/main/feeds/feed_anthropic_research.xml",
                        ),
                    ],
                ),
                rss("openai", 48, &[("news", "https://openai.com/news/rss.xml")]),
                SourceConfig {
                    name: "forwardfuture".to_string(),
                    lookback_hours: 48,
                    dateless_cap: default_dateless_cap(),
                    kind: SourceKind::Sitemap {
                        url: "https://www.forwardfuture.ai/sitemap.xml".to_string(),
                        article_marker: default_article_marker(),
                    },
                },
            ],
        }
    }
}

impl AppConfig {
    /// Parse a YAML configuration document.
    pub fn from_yaml(yaml: &str) -> Result<Self, Box<dyn Error>> {
        let config: AppConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, or the built-in default when `None`.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        match path {
            Some(path) => {
                let yaml = std::fs::read_to_string(path)
                    .map_err(|e| format!("cannot read config {}: {e}", path.display()))?;
                let config = Self::from_yaml(&yaml)?;
                info!(sources = config.sources.len(), "Loaded configuration file");
                Ok(config)
            }
            None => {
                info!("No config file given; using built-in sources");
                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> Result<(), Box<dyn Error>> {
        for source in &self.sources {
            if source.lookback_hours <= 0 {
                return Err(format!(
                    "source '{}': lookback_hours must be positive",
                    source.name
                )
                .into());
            }
            if source.lookback_hours > MAX_LOOKBACK_HOURS {
                return Err(format!(
                    "source '{}': lookback_hours must be at most {MAX_LOOKBACK_HOURS}",
                    source.name
                )
                .into());
            }
        }
        if self.concurrency == 0 {
            return Err("concurrency must be at least 1".into());
        }
        Ok(())
    }

    /// Apply command-line overrides on top of the loaded configuration.
    pub fn with_overrides(
        mut self,
        hours: Option<i64>,
        transcripts: bool,
        languages: Option<Vec<String>>,
        timeout_secs: Option<u64>,
    ) -> Self {
        for source in &mut self.sources {
            if let Some(h) = hours {
                source.lookback_hours = h;
            }
            if let SourceKind::Youtube {
                transcripts: t,
                languages: l,
                ..
            } = &mut source.kind
            {
                *t |= transcripts;
                if let Some(langs) = &languages {
                    *l = langs.clone();
                }
            }
        }
        if let Some(secs) = timeout_secs {
            self.request_timeout_secs = secs;
        }
        self
    }
}
