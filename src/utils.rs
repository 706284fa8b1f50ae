//! Utility functions for text cleanup, edition naming and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Time classification for report edition naming
//! - String truncation for logging and HTML-to-text for feed descriptions
//! - Title derivation from URL slugs (sitemaps carry no titles)
//! - File system validation for output directories

use chrono::NaiveTime;
use scraper::Html;
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

/// Classify a local time into morning, afternoon, or evening.
///
/// - **Morning**: 00:00 - 08:00
/// - **Afternoon**: 08:00 - 16:00
/// - **Evening**: 16:00 - 24:00
pub fn edition_for(tod: NaiveTime) -> &'static str {
    let afternoon_low = NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default();
    let evening_low = NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default();

    if tod < afternoon_low {
        "morning"
    } else if tod < evening_low {
        "afternoon"
    } else {
        "evening"
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a character boundary)
/// with `"…(+N bytes)"` appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

/// Plain text of an HTML fragment, whitespace collapsed.
///
/// Feed descriptions are frequently HTML; text without markup passes through
/// unchanged apart from whitespace.
pub fn html_to_text(fragment: &str) -> String {
    if !fragment.contains('<') {
        return fragment.split_whitespace().collect::<Vec<_>>().join(" ");
    }
    let doc = Html::parse_fragment(fragment);
    doc.root_element()
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Capitalize the first character of a string.
pub fn upcase(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
    }
}

/// Derive a display title from the last path segment of a URL.
///
/// `https://example.com/p/the-big-launch` becomes `The Big Launch`.
/// Falls back to the URL itself when there is no usable slug.
pub fn title_from_slug(url: &str) -> String {
    let slug = Url::parse(url).ok().and_then(|u| {
        u.path_segments()?
            .filter(|s| !s.is_empty())
            .last()
            .map(str::to_string)
    });
    let Some(slug) = slug else {
        return url.to_string();
    };
    let slug = urlencoding::decode(&slug)
        .map(|s| s.into_owned())
        .unwrap_or(slug);

    let title = slug
        .split('-')
        .filter(|w| !w.is_empty())
        .map(|w| upcase(&w.to_lowercase()))
        .collect::<Vec<_>>()
        .join(" ");
    if title.is_empty() { url.to_string() } else { title }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then creates and removes a
/// probe file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
