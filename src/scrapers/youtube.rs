//! YouTube channel video source.
//!
//! Each configured channel reference is resolved to a channel id, the
//! channel's Atom feed is fetched and its entries become [`Video`] records.
//! The window is applied per channel, then the channels are merged newest
//! first. Transcripts are attached afterwards when enabled.

use super::SourceAdapter;
use crate::channel::ChannelIdentityResolver;
use crate::dates;
use crate::feeds::{RawEntry, parse_feed};
use crate::http::Fetch;
use crate::models::Video;
use crate::transcripts::{TranscriptBackend, TranscriptSelector};
use crate::utils::html_to_text;
use crate::window::{TimeWindow, dedupe_by_url, sort_newest_first};
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use tracing::{debug, info, instrument, warn};

const FEED_BASE_URL: &str = "https://www.youtube.com/feeds/videos.xml?channel_id=";

static WATCH_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"[?&]v=([A-Za-z0-9_-]+)").unwrap());

/// Feed URL of a channel.
pub fn feed_url(channel_id: &str) -> String {
    format!("{FEED_BASE_URL}{}", urlencoding::encode(channel_id))
}

/// Video id of an entry: the dedicated feed field, else the `v` query parameter.
pub fn video_id_of(entry: &RawEntry) -> Option<String> {
    entry.video_id.clone().or_else(|| {
        let link = entry.link.as_deref()?;
        WATCH_ID.captures(link).map(|c| c[1].to_string())
    })
}

fn to_video(entry: RawEntry, channel_id: &str) -> Video {
    let published_at = dates::resolve(&entry.date_candidates());
    let video_id = video_id_of(&entry);
    let link = entry.link.unwrap_or_default();
    Video {
        title: entry
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| link.clone()),
        video_id,
        published_at,
        description: entry
            .description
            .map(|d| html_to_text(&d))
            .unwrap_or_default(),
        channel_id: entry.channel_id.unwrap_or_else(|| channel_id.to_string()),
        transcript: None,
        link,
    }
}

/// Adapter for a list of YouTube channels.
#[derive(Debug)]
pub struct YoutubeAdapter<'a, F, R, B> {
    name: String,
    channels: Vec<String>,
    concurrency: usize,
    transcripts: bool,
    languages: Vec<String>,
    fetcher: &'a F,
    resolver: R,
    selector: TranscriptSelector<B>,
}

impl<'a, F, R, B> YoutubeAdapter<'a, F, R, B>
where
    F: Fetch,
    R: ChannelIdentityResolver,
    B: TranscriptBackend,
{
    pub fn new(
        name: &str,
        channels: Vec<String>,
        fetcher: &'a F,
        resolver: R,
        backend: B,
    ) -> Self {
        Self {
            name: name.to_string(),
            channels,
            concurrency: 4,
            transcripts: false,
            languages: vec!["en".to_string()],
            fetcher,
            resolver,
            selector: TranscriptSelector::new(backend),
        }
    }

    /// Enable transcript enrichment with the given preferred languages.
    pub fn with_transcripts(mut self, enabled: bool, languages: Vec<String>) -> Self {
        self.transcripts = enabled;
        self.languages = languages;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    async fn fetch_channel_feed(&self, channel_id: &str) -> Result<Vec<Video>, Box<dyn Error>> {
        let body = self.fetcher.get(&feed_url(channel_id)).await?;
        let entries = parse_feed(&body)?;
        if entries.is_empty() {
            info!(channel_id, "No videos found in channel feed");
        }
        Ok(entries
            .into_iter()
            .map(|entry| to_video(entry, channel_id))
            .collect())
    }

    /// Recent videos of one channel reference; failures give an empty list.
    #[instrument(level = "info", skip(self, window), fields(source = %self.name))]
    async fn collect_channel(&self, channel: &str, window: TimeWindow) -> Vec<Video> {
        let Some(channel_id) = self.resolver.resolve(channel).await else {
            warn!(channel, "Could not resolve channel id");
            return Vec::new();
        };

        match self.fetch_channel_feed(&channel_id).await {
            Ok(videos) => {
                let total = videos.len();
                let videos = window.apply(videos);
                debug!(%channel_id, total, recent = videos.len(), "Fetched channel feed");
                videos
            }
            Err(e) => {
                warn!(%channel_id, error = %e, "Error fetching channel feed");
                Vec::new()
            }
        }
    }

    async fn attach_transcripts(&self, videos: Vec<Video>) -> Vec<Video> {
        stream::iter(videos)
            .map(|video| async move {
                match video.video_id.clone() {
                    Some(id) => {
                        let transcript = self.selector.select(&id, &self.languages).await;
                        video.with_transcript(transcript)
                    }
                    None => video,
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

impl<F, R, B> SourceAdapter for YoutubeAdapter<'_, F, R, B>
where
    F: Fetch,
    R: ChannelIdentityResolver,
    B: TranscriptBackend,
{
    type Record = Video;

    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(level = "info", skip_all, fields(source = %self.name))]
    async fn collect(&self, window: TimeWindow) -> Vec<Video> {
        let per_channel: Vec<Vec<Video>> = stream::iter(&self.channels)
            .map(|channel| self.collect_channel(channel, window))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut videos = dedupe_by_url(per_channel.into_iter().flatten().collect());
        sort_newest_first(&mut videos);
        info!(count = videos.len(), "Videos inside time window");

        if self.transcripts {
            self.attach_transcripts(videos).await
        } else {
            videos
        }
    }
}
