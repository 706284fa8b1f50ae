//! Feed and sitemap parsing.
//!
//! Turns RSS 2.0, Atom (including YouTube channel feeds) and XML sitemap
//! documents into ordered sequences of raw entries. No filtering happens here
//! beyond dropping entries that have no link, since the link is the identity
//! key of every record built from them.

use crate::dates::{self, DateCandidate};
use chrono::{DateTime, FixedOffset};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::{NsReader, Reader};
use std::error::Error;

/// XML namespace of the sitemap protocol.
pub const SITEMAP_NS: &[u8] = b"http://www.sitemaps.org/schemas/sitemap/0.9";

/// One `<item>` or `<entry>` of a feed, as written by the publisher.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub categories: Vec<String>,
    /// Raw `pubDate` / `published` / `dc:date` text.
    pub published: Option<String>,
    /// Raw `updated` text.
    pub updated: Option<String>,
    /// `published` decoded strictly at parse time.
    pub published_parsed: Option<DateTime<FixedOffset>>,
    /// `updated` decoded strictly at parse time.
    pub updated_parsed: Option<DateTime<FixedOffset>>,
    /// `yt:videoId` of YouTube feeds.
    pub video_id: Option<String>,
    /// `yt:channelId` of YouTube feeds.
    pub channel_id: Option<String>,
}

impl RawEntry {
    /// Date candidates for [`dates::resolve`], covering every date field present.
    pub fn date_candidates(&self) -> Vec<DateCandidate<'_>> {
        let mut out = Vec::with_capacity(4);
        if let Some(dt) = self.published_parsed {
            out.push(DateCandidate::Published(dt));
        }
        if let Some(dt) = self.updated_parsed {
            out.push(DateCandidate::Updated(dt));
        }
        if let Some(s) = self.published.as_deref() {
            out.push(DateCandidate::Text(s));
        }
        if let Some(s) = self.updated.as_deref() {
            out.push(DateCandidate::Text(s));
        }
        out
    }
}

/// One `<url>` of a sitemap.
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub loc: String,
    pub lastmod: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Title,
    Link,
    Description,
    Content,
    MediaDescription,
    Category,
    Published,
    Updated,
    VideoId,
    ChannelId,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        Some(match name {
            b"title" => Field::Title,
            b"link" => Field::Link,
            b"description" | b"summary" => Field::Description,
            b"content" | b"content:encoded" => Field::Content,
            b"media:description" => Field::MediaDescription,
            b"category" | b"dc:subject" => Field::Category,
            b"pubDate" | b"published" | b"dc:date" | b"issued" => Field::Published,
            b"updated" | b"modified" => Field::Updated,
            b"yt:videoId" => Field::VideoId,
            b"yt:channelId" => Field::ChannelId,
            _ => return None,
        })
    }
}

/// Value of attribute `key`, unescaped.
fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| {
            let raw = String::from_utf8_lossy(&a.value).into_owned();
            quick_xml::escape::unescape(&raw)
                .map(|s| s.into_owned())
                .unwrap_or(raw)
        })
}

/// Text for an entity reference such as `amp` or `#8217`.
pub(crate) fn resolve_entity(name: &str) -> String {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => num.parse::<u32>().ok(),
        };
        if let Some(ch) = code.and_then(char::from_u32) {
            return ch.to_string();
        }
    }
    match quick_xml::escape::resolve_predefined_entity(name) {
        Some(s) => s.to_string(),
        None if name == "nbsp" => "\u{a0}".to_string(),
        None => format!("&{name};"),
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn strip_preamble(xml: &str) -> &str {
    xml.trim_start_matches('\u{feff}').trim_start()
}

/// Parse an RSS 2.0 or Atom document into its entries, in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<RawEntry>, Box<dyn Error>> {
    let mut reader = Reader::from_str(strip_preamble(xml));
    let mut entries = Vec::new();
    let mut current: Option<RawEntry> = None;
    let mut field: Option<(Field, Vec<u8>)> = None;
    let mut text = String::new();
    let mut saw_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                saw_root = true;
                let name = e.name().as_ref().to_vec();
                if name == b"item" || name == b"entry" {
                    current = Some(RawEntry::default());
                    field = None;
                } else if field.is_none() {
                    if let (Some(entry), Some(f)) = (current.as_mut(), Field::from_name(&name)) {
                        text.clear();
                        on_field_start(entry, f, &e);
                        field = Some((f, name));
                    }
                }
            }
            Event::Empty(e) => {
                saw_root = true;
                if field.is_none() {
                    if let (Some(entry), Some(f)) = (current.as_mut(), Field::from_name(e.name().as_ref())) {
                        on_field_start(entry, f, &e);
                    }
                }
            }
            Event::Text(t) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::CData(c) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::GeneralRef(r) => {
                if field.is_some() {
                    text.push_str(&resolve_entity(&String::from_utf8_lossy(&r)));
                }
            }
            Event::End(e) => {
                let name = e.name();
                if name.as_ref() == b"item" || name.as_ref() == b"entry" {
                    if let Some(entry) = current.take() {
                        if entry.link.is_some() {
                            entries.push(entry);
                        }
                    }
                    field = None;
                } else if matches!(&field, Some((_, open)) if open.as_slice() == name.as_ref()) {
                    if let (Some(entry), Some((f, _))) = (current.as_mut(), field.take()) {
                        on_field_text(entry, f, std::mem::take(&mut text));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err("document contains no XML elements".into());
    }
    Ok(entries)
}

fn on_field_start(entry: &mut RawEntry, field: Field, e: &BytesStart<'_>) {
    match field {
        Field::Link => {
            // Atom links carry the URL in `href`; prefer rel="alternate".
            if let Some(href) = attr(e, b"href") {
                let rel = attr(e, b"rel").unwrap_or_else(|| "alternate".to_string());
                if rel == "alternate" || entry.link.is_none() {
                    entry.link = non_empty(href);
                }
            }
        }
        Field::Category => {
            if let Some(term) = attr(e, b"term").and_then(non_empty) {
                entry.categories.push(term);
            }
        }
        _ => {}
    }
}

fn on_field_text(entry: &mut RawEntry, field: Field, text: String) {
    let Some(value) = non_empty(text) else {
        return;
    };
    match field {
        Field::Title => entry.title = Some(value),
        Field::Link => {
            if entry.link.is_none() {
                entry.link = Some(value);
            }
        }
        Field::Description => entry.description = Some(value),
        Field::Content | Field::MediaDescription => {
            if entry.description.is_none() {
                entry.description = Some(value);
            }
        }
        Field::Category => entry.categories.push(value),
        Field::Published => {
            if entry.published.is_none() {
                entry.published_parsed = dates::decode_structured(&value);
                entry.published = Some(value);
            }
        }
        Field::Updated => {
            entry.updated_parsed = dates::decode_structured(&value);
            entry.updated = Some(value);
        }
        Field::VideoId => entry.video_id = Some(value),
        Field::ChannelId => entry.channel_id = Some(value),
    }
}

/// Parse a sitemap `<urlset>`, keeping only elements in the sitemap namespace.
pub fn parse_sitemap(xml: &str) -> Result<Vec<SitemapEntry>, Box<dyn Error>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Slot {
        Loc,
        Lastmod,
    }

    let mut reader = NsReader::from_str(strip_preamble(xml));
    let mut entries = Vec::new();
    let mut in_url = false;
    let mut loc: Option<String> = None;
    let mut lastmod: Option<String> = None;
    let mut slot: Option<Slot> = None;
    let mut text = String::new();
    let mut saw_urlset = false;

    loop {
        let (ns, event) = reader.read_resolved_event()?;
        let in_sitemap_ns = matches!(ns, ResolveResult::Bound(Namespace(n)) if n == SITEMAP_NS);
        match event {
            Event::Start(e) if in_sitemap_ns => match e.local_name().as_ref() {
                b"urlset" => saw_urlset = true,
                b"url" => {
                    in_url = true;
                    loc = None;
                    lastmod = None;
                }
                b"loc" if in_url => {
                    slot = Some(Slot::Loc);
                    text.clear();
                }
                b"lastmod" if in_url => {
                    slot = Some(Slot::Lastmod);
                    text.clear();
                }
                _ => {}
            },
            Event::Text(t) if slot.is_some() => text.push_str(&String::from_utf8_lossy(&t)),
            Event::CData(c) if slot.is_some() => text.push_str(&String::from_utf8_lossy(&c)),
            Event::GeneralRef(r) if slot.is_some() => {
                text.push_str(&resolve_entity(&String::from_utf8_lossy(&r)))
            }
            Event::End(e) if in_sitemap_ns => match e.local_name().as_ref() {
                b"url" => {
                    in_url = false;
                    if let Some(loc) = loc.take() {
                        entries.push(SitemapEntry {
                            loc,
                            lastmod: lastmod.take(),
                        });
                    }
                }
                b"loc" | b"lastmod" => {
                    let value = non_empty(std::mem::take(&mut text));
                    match slot.take() {
                        Some(Slot::Loc) => loc = value,
                        Some(Slot::Lastmod) => lastmod = value,
                        None => {}
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_urlset {
        return Err("document is not a sitemap urlset".into());
    }
    Ok(entries)
}
