//! Video transcript selection.
//!
//! Listing the tracks of a video is separate from fetching one: listing is
//! cheap, fetching materializes the timed segments. [`TranscriptSelector`]
//! picks one track per video and flattens it to plain text.
//!
//! # Selection Order
//!
//! 1. A track in a preferred language, trying languages in preference order
//!    (manually created before generated for the same language)
//! 2. Any manually created track in a preferred language
//! 3. Any generated track in a preferred language
//! 4. The first track of any kind or language
//!
//! Every failure (no tracks, transcripts disabled, fetch errors) ends in
//! `None`; nothing is raised past the selector.

use crate::chain::Chain;
use crate::feeds::resolve_entity;
use crate::http::{Fetch, FetchError};
use crate::models::Transcript;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Why no transcript could be produced for a video.
#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("transcripts are disabled for video {video_id}")]
    Disabled { video_id: String },
    #[error("no transcript found for video {video_id}")]
    NotFound { video_id: String },
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("malformed transcript data for video {video_id}: {reason}")]
    Malformed { video_id: String, reason: String },
}

/// One caption track a video offers.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptTrack {
    pub language_code: String,
    pub language: String,
    pub generated: bool,
    /// Where the track's timed text can be fetched from.
    pub url: String,
}

/// Every track listed for one video, in the order the backend reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptList {
    pub tracks: Vec<TranscriptTrack>,
}

impl TranscriptList {
    fn find(&self, language: &str, generated: bool) -> Option<&TranscriptTrack> {
        self.tracks
            .iter()
            .find(|t| t.generated == generated && t.language_code == language)
    }

    /// Track for one language, manually created first.
    pub fn find_language(&self, language: &str) -> Option<&TranscriptTrack> {
        self.find(language, false).or_else(|| self.find(language, true))
    }

    pub fn find_manually_created(&self, languages: &[String]) -> Option<&TranscriptTrack> {
        languages.iter().find_map(|l| self.find(l, false))
    }

    pub fn find_generated(&self, languages: &[String]) -> Option<&TranscriptTrack> {
        languages.iter().find_map(|l| self.find(l, true))
    }
}

/// Backend able to list and fetch caption tracks.
pub trait TranscriptBackend {
    async fn list(&self, video_id: &str) -> Result<TranscriptList, TranscriptError>;

    /// Ordered text segments of `track`.
    async fn fetch(
        &self,
        video_id: &str,
        track: &TranscriptTrack,
    ) -> Result<Vec<String>, TranscriptError>;
}

fn selection_chain(preferred: &[String]) -> Chain<'_, TranscriptList, TranscriptTrack> {
    Chain::new("transcript")
        .then("preferred_language", move |list: &TranscriptList| {
            preferred.iter().find_map(|l| list.find_language(l)).cloned()
        })
        .then("manually_created", move |list: &TranscriptList| {
            list.find_manually_created(preferred).cloned()
        })
        .then("generated", move |list: &TranscriptList| {
            list.find_generated(preferred).cloned()
        })
        .then("any", |list: &TranscriptList| list.tracks.first().cloned())
}

/// Choose the track to use from a listing.
pub fn choose_track(list: &TranscriptList, preferred: &[String]) -> Option<TranscriptTrack> {
    selection_chain(preferred).run(list)
}

/// Join segments with single spaces, skipping blank ones.
///
/// Line breaks and runs of whitespace inside a segment also collapse to one
/// space, so a track whose segments are all blank flattens to `""`, which
/// [`TranscriptSelector::select`] reports as no transcript.
pub fn flatten_segments(segments: &[String]) -> String {
    segments
        .iter()
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Picks and flattens the best available transcript of a video.
#[derive(Debug)]
pub struct TranscriptSelector<B> {
    backend: B,
}

impl<B: TranscriptBackend> TranscriptSelector<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Flattened transcript of `video_id`, or `None` when unavailable.
    #[instrument(level = "info", skip(self, preferred))]
    pub async fn select(&self, video_id: &str, preferred: &[String]) -> Option<Transcript> {
        let list = match self.backend.list(video_id).await {
            Ok(list) => list,
            Err(e) => {
                warn!(video_id, error = %e, "Transcript not available");
                return None;
            }
        };

        let Some(track) = choose_track(&list, preferred) else {
            warn!(video_id, "No transcript available");
            return None;
        };
        debug!(
            video_id,
            language = %track.language_code,
            generated = track.generated,
            "Selected transcript track"
        );

        match self.backend.fetch(video_id, &track).await {
            Ok(segments) => {
                let text = flatten_segments(&segments);
                if text.is_empty() {
                    warn!(video_id, "Transcript track was empty");
                    return None;
                }
                info!(video_id, chars = text.len(), "Fetched transcript");
                Some(Transcript {
                    language: track.language_code,
                    generated: track.generated,
                    text,
                })
            }
            Err(e) => {
                warn!(video_id, error = %e, "Error fetching transcript");
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    name: Option<CaptionName>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionName {
    #[serde(default)]
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<CaptionRun>,
}

#[derive(Debug, Deserialize)]
struct CaptionRun {
    text: String,
}

impl From<CaptionTrack> for TranscriptTrack {
    fn from(c: CaptionTrack) -> Self {
        let language = c
            .name
            .and_then(|n| {
                n.simple_text
                    .or_else(|| n.runs.into_iter().next().map(|r| r.text))
            })
            .unwrap_or_else(|| c.language_code.clone());
        TranscriptTrack {
            generated: c.kind.as_deref() == Some("asr"),
            language,
            language_code: c.language_code,
            url: c.base_url,
        }
    }
}

/// The JSON array starting at `open` (which must index a `[`), honoring strings.
fn json_array_at(s: &str, open: usize) -> Option<&str> {
    let bytes = s.as_bytes();
    if bytes.get(open) != Some(&b'[') {
        return None;
    }
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' | b'{' => depth += 1,
            b']' | b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[open..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Caption tracks embedded in a watch page.
pub fn tracks_from_watch_page(video_id: &str, html: &str) -> Result<TranscriptList, TranscriptError> {
    const MARKER: &str = "\"captionTracks\":";
    let Some(at) = html.find(MARKER) else {
        return Err(TranscriptError::Disabled {
            video_id: video_id.to_string(),
        });
    };
    let raw = json_array_at(html, at + MARKER.len()).ok_or_else(|| TranscriptError::Malformed {
        video_id: video_id.to_string(),
        reason: "unterminated captionTracks array".to_string(),
    })?;
    let tracks: Vec<CaptionTrack> =
        serde_json::from_str(raw).map_err(|e| TranscriptError::Malformed {
            video_id: video_id.to_string(),
            reason: e.to_string(),
        })?;
    if tracks.is_empty() {
        return Err(TranscriptError::NotFound {
            video_id: video_id.to_string(),
        });
    }
    Ok(TranscriptList {
        tracks: tracks.into_iter().map(TranscriptTrack::from).collect(),
    })
}

/// Text of each `<text>` element of a timed-text document.
pub fn segments_from_timedtext(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"text" => current = Some(String::new()),
            Event::Text(t) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::GeneralRef(r) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&resolve_entity(&String::from_utf8_lossy(&r)));
                }
            }
            Event::End(e) if e.name().as_ref() == b"text" => {
                if let Some(buf) = current.take() {
                    // Caption text is HTML-escaped a second time inside the XML.
                    let text = quick_xml::escape::unescape(&buf)
                        .map(|s| s.into_owned())
                        .unwrap_or(buf);
                    segments.push(text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(segments)
}

/// [`TranscriptBackend`] reading caption tracks from the public watch page.
#[derive(Debug)]
pub struct WatchPageBackend<'a, F> {
    fetcher: &'a F,
    base_url: String,
}

impl<'a, F: Fetch> WatchPageBackend<'a, F> {
    pub fn new(fetcher: &'a F) -> Self {
        Self {
            fetcher,
            base_url: "https://www.youtube.com".to_string(),
        }
    }
}

impl<F: Fetch> TranscriptBackend for WatchPageBackend<'_, F> {
    async fn list(&self, video_id: &str) -> Result<TranscriptList, TranscriptError> {
        let url = format!(
            "{}/watch?v={}",
            self.base_url,
            urlencoding::encode(video_id)
        );
        let html = self.fetcher.get(&url).await?;
        tracks_from_watch_page(video_id, &html)
    }

    async fn fetch(
        &self,
        video_id: &str,
        track: &TranscriptTrack,
    ) -> Result<Vec<String>, TranscriptError> {
        let xml = self.fetcher.get(&track.url).await?;
        segments_from_timedtext(&xml).map_err(|e| TranscriptError::Malformed {
            video_id: video_id.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
pub mod testing {
    //! In-memory [`TranscriptBackend`].

    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, Default)]
    pub struct StaticTranscripts {
        listings: HashMap<String, Vec<TranscriptTrack>>,
        segments: HashMap<String, Vec<String>>,
    }

    pub fn track(language_code: &str, generated: bool) -> TranscriptTrack {
        TranscriptTrack {
            language_code: language_code.to_string(),
            language: language_code.to_string(),
            generated,
            url: format!("mem://{language_code}/{generated}"),
        }
    }

    impl StaticTranscripts {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a track for `video_id` with its segments.
        pub fn track(mut self, video_id: &str, track: TranscriptTrack, segments: &[&str]) -> Self {
            self.segments.insert(
                format!("{video_id}|{}", track.url),
                segments.iter().map(|s| s.to_string()).collect(),
            );
            self.listings
                .entry(video_id.to_string())
                .or_default()
                .push(track);
            self
        }
    }

    impl TranscriptBackend for StaticTranscripts {
        async fn list(&self, video_id: &str) -> Result<TranscriptList, TranscriptError> {
            match self.listings.get(video_id) {
                Some(tracks) => Ok(TranscriptList {
                    tracks: tracks.clone(),
                }),
                None => Err(TranscriptError::Disabled {
                    video_id: video_id.to_string(),
                }),
            }
        }

        async fn fetch(
            &self,
            video_id: &str,
            track: &TranscriptTrack,
        ) -> Result<Vec<String>, TranscriptError> {
            self.segments
                .get(&format!("{video_id}|{}", track.url))
                .cloned()
                .ok_or_else(|| TranscriptError::NotFound {
                    video_id: video_id.to_string(),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{StaticTranscripts, track};
    use super::*;
    use crate::http::testing::StaticFetcher;

    fn langs(l: &[&str]) -> Vec<String> {
        l.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_choose_track_prefers_language_order() {
        let list = TranscriptList {
            tracks: vec![track("de", false), track("en", true), track("fr", false)],
        };

        let got = choose_track(&list, &langs(&["fr", "en"])).unwrap();
        assert_eq!(got.language_code, "fr");

        let got = choose_track(&list, &langs(&["en", "fr"])).unwrap();
        assert_eq!(got.language_code, "en");
        assert!(got.generated);
    }

    #[test]
    fn test_manual_beats_generated_within_language() {
        let list = TranscriptList {
            tracks: vec![track("en", true), track("en", false)],
        };
        let got = choose_track(&list, &langs(&["en"])).unwrap();
        assert!(!got.generated);
    }

    #[test]
    fn test_falls_back_to_first_track() {
        let list = TranscriptList {
            tracks: vec![track("fr", true), track("es", false)],
        };
        let got = choose_track(&list, &langs(&["en"])).unwrap();
        assert_eq!(got.language_code, "fr");

        assert!(choose_track(&TranscriptList::default(), &langs(&["en"])).is_none());
    }

    #[test]
    fn test_flatten_segments() {
        let segments = langs(&["Hello", "  world\nagain ", "", "bye"]);
        assert_eq!(flatten_segments(&segments), "Hello world again bye");
    }

    #[tokio::test]
    async fn test_only_generated_french_is_still_used() {
        let backend =
            StaticTranscripts::new().track("vid1", track("fr", true), &["Bonjour", "tout le monde"]);
        let selector = TranscriptSelector::new(backend);

        let got = selector.select("vid1", &langs(&["en"])).await.unwrap();
        assert_eq!(got.text, "Bonjour tout le monde");
        assert_eq!(got.language, "fr");
        assert!(got.generated);
    }

    #[tokio::test]
    async fn test_unavailable_cases_are_none() {
        let backend = StaticTranscripts::new().track("empty", track("en", false), &[]);
        let selector = TranscriptSelector::new(backend);

        assert!(selector.select("disabled", &langs(&["en"])).await.is_none());
        assert!(selector.select("empty", &langs(&["en"])).await.is_none());
    }

    #[test]
    fn test_tracks_from_watch_page() {
        let html = r#"<script>var ytInitialPlayerResponse = {"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://www.youtube.com/api/timedtext?v=vid1&lang=en","name":{"runs":[{"text":"English [auto]"}]},"languageCode":"en","kind":"asr"},{"baseUrl":"https://www.youtube.com/api/timedtext?v=vid1&lang=de","name":{"simpleText":"German"},"languageCode":"de"}],"audioTracks":[]}}};</script>"#;

        let list = tracks_from_watch_page("vid1", html).unwrap();
        assert_eq!(list.tracks.len(), 2);
        assert_eq!(list.tracks[0].language_code, "en");
        assert!(list.tracks[0].generated);
        assert_eq!(list.tracks[0].language, "English [auto]");
        assert_eq!(
            list.tracks[0].url,
            "https://www.youtube.com/api/timedtext?v=vid1&lang=en"
        );
        assert_eq!(list.tracks[1].language, "German");
        assert!(!list.tracks[1].generated);
    }

    #[test]
    fn test_watch_page_without_captions_is_disabled() {
        let err = tracks_from_watch_page("vid1", "<html>no captions</html>").unwrap_err();
        assert!(matches!(err, TranscriptError::Disabled { .. }));

        let err = tracks_from_watch_page("vid1", r#""captionTracks":[]"#).unwrap_err();
        assert!(matches!(err, TranscriptError::NotFound { .. }));
    }

    #[test]
    fn test_segments_from_timedtext() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="0.0" dur="1.5">it&amp;#39;s here</text><text start="1.5" dur="2.0">A &amp;amp; B</text></transcript>"#;
        let segments = segments_from_timedtext(xml).unwrap();
        assert_eq!(segments, vec!["it's here", "A & B"]);
    }

    #[tokio::test]
    async fn test_watch_page_backend_end_to_end() {
        let page = r#"{"captionTracks":[{"baseUrl":"https://www.youtube.com/api/timedtext?v=vid1","languageCode":"en"}]}"#;
        let xml = r#"<transcript><text start="0" dur="1">one</text><text start="1" dur="1">two</text></transcript>"#;
        let fetcher = StaticFetcher::new()
            .page("https://www.youtube.com/watch?v=vid1", page)
            .page("https://www.youtube.com/api/timedtext?v=vid1", xml);
        let selector = TranscriptSelector::new(WatchPageBackend::new(&fetcher));

        let got = selector.select("vid1", &langs(&["en"])).await.unwrap();
        assert_eq!(got.text, "one two");
    }
}
