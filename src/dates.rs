//! Resolution of heterogeneous feed dates into UTC instants.
//!
//! Feeds describe publication time in several ways: a value the feed parser
//! already decoded, an `updated` value, a free-form date string, or a bare
//! `YYYY-MM-DD` day (sitemaps). [`resolve`] tries them in a fixed priority
//! order and returns the first one that parses.
//!
//! | Priority | Candidate | Notes |
//! |----------|-----------|-------|
//! | 1 | [`DateCandidate::Published`] | decoded by the feed parser |
//! | 2 | [`DateCandidate::Updated`] | decoded by the feed parser |
//! | 3 | [`DateCandidate::Text`] | RFC 2822, ISO 8601, naive timestamps (assumed UTC) |
//! | 4 | [`DateCandidate::Day`] | `YYYY-MM-DD`, midnight UTC |
//!
//! Nothing here fails: an unparseable candidate falls through, and an
//! exhausted list is `None`.

use crate::chain::Chain;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// One way of expressing a publication date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DateCandidate<'a> {
    /// Structured "published" value decoded by the feed parser.
    Published(DateTime<FixedOffset>),
    /// Structured "updated" value decoded by the feed parser.
    Updated(DateTime<FixedOffset>),
    /// Raw date text for the permissive parser.
    Text(&'a str),
    /// Raw `YYYY-MM-DD` day.
    Day(&'a str),
}

fn date_chain<'a>() -> Chain<'a, [DateCandidate<'a>], DateTime<Utc>> {
    Chain::new("date")
        .then("published", |cands: &[DateCandidate]| {
            cands.iter().find_map(|c| match c {
                DateCandidate::Published(dt) => Some(dt.with_timezone(&Utc)),
                _ => None,
            })
        })
        .then("updated", |cands: &[DateCandidate]| {
            cands.iter().find_map(|c| match c {
                DateCandidate::Updated(dt) => Some(dt.with_timezone(&Utc)),
                _ => None,
            })
        })
        .then("text", |cands: &[DateCandidate]| {
            cands.iter().find_map(|c| match c {
                DateCandidate::Text(s) => parse_text(s),
                _ => None,
            })
        })
        .then("day", |cands: &[DateCandidate]| {
            cands.iter().find_map(|c| match c {
                DateCandidate::Day(s) => parse_day(s),
                _ => None,
            })
        })
}

/// Resolve the candidates to a UTC instant, or `None` when none parse.
///
/// Priority is fixed by candidate kind, not by position in the slice.
pub fn resolve(candidates: &[DateCandidate<'_>]) -> Option<DateTime<Utc>> {
    date_chain().run(candidates)
}

/// Strict decoding the feed parser applies to its date fields, like a feed
/// library would: RFC 2822 first, then RFC 3339.
pub fn decode_structured(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    DateTime::parse_from_rfc2822(s)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .ok()
}

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%a, %d %b %Y %H:%M:%S %z",
    "%a, %d %b %Y %H:%M %z",
    "%d %b %Y %H:%M:%S %z",
];

// Parsed as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%a, %d %b %Y %H:%M:%S",
    "%a, %d %b %Y %H:%M",
    "%d %b %Y %H:%M:%S",
    "%a %b %d %H:%M:%S %Y",
];

const UTC_SUFFIXES: &[&str] = &[" UTC", " GMT", " UT", " Z"];

/// Permissive date-text parser.
///
/// Accepts RFC 2822 feed dates, ISO 8601 with offsets or a trailing `Z`, and
/// common timezone-less layouts, which are taken to be UTC.
pub fn parse_text(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(dt) = decode_structured(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let zulu = match s.strip_suffix('Z').or_else(|| s.strip_suffix('z')) {
        Some(rest) if rest.contains('T') || rest.contains(' ') => format!("{rest}+00:00"),
        _ => s.to_string(),
    };
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&zulu, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let naive = UTC_SUFFIXES
        .iter()
        .find_map(|suffix| s.strip_suffix(suffix))
        .unwrap_or(s)
        .trim();
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

/// Parse a sitemap-style `YYYY-MM-DD` day as midnight UTC.
pub fn parse_day(s: &str) -> Option<DateTime<Utc>> {
    let day = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()?;
    day.and_hms_opt(0, 0, 0).map(|ndt| Utc.from_utc_datetime(&ndt))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_rfc2822_with_offset_is_converted_to_utc() {
        assert_eq!(
            parse_text("Tue, 06 May 2025 14:30:00 +0200"),
            Some(utc(2025, 5, 6, 12, 30, 0))
        );
        assert_eq!(
            parse_text("Tue, 06 May 2025 14:30:00 GMT"),
            Some(utc(2025, 5, 6, 14, 30, 0))
        );
    }

    #[test]
    fn test_iso8601_variants() {
        let expected = Some(utc(2025, 5, 6, 14, 30, 0));
        assert_eq!(parse_text("2025-05-06T14:30:00Z"), expected);
        assert_eq!(parse_text("2025-05-06T14:30:00+00:00"), expected);
        assert_eq!(parse_text("2025-05-06T16:30:00+02:00"), expected);
        assert_eq!(parse_text("2025-05-06T14:30:00.000Z"), expected);
    }

    #[test]
    fn test_naive_timestamps_are_assumed_utc() {
        let expected = Some(utc(2025, 5, 6, 14, 30, 0));
        assert_eq!(parse_text("2025-05-06T14:30:00"), expected);
        assert_eq!(parse_text("2025-05-06 14:30:00"), expected);
        assert_eq!(parse_text("Tue, 06 May 2025 14:30:00 UTC"), expected);
    }

    #[test]
    fn test_malformed_text_is_none() {
        assert_eq!(parse_text(""), None);
        assert_eq!(parse_text("yesterday-ish"), None);
        assert_eq!(parse_text("2025-13-45T99:00:00Z"), None);
    }

    #[test]
    fn test_parse_day_is_midnight_utc() {
        assert_eq!(parse_day("2025-05-06"), Some(utc(2025, 5, 6, 0, 0, 0)));
        assert_eq!(parse_day(" 2025-05-06 "), Some(utc(2025, 5, 6, 0, 0, 0)));
        assert_eq!(parse_day("2025-05-06T10:00:00Z"), None);
        assert_eq!(parse_day("May 6"), None);
    }

    #[test]
    fn test_resolve_priority_ignores_slice_order() {
        let published = DateTime::parse_from_rfc3339("2025-05-06T10:00:00+00:00").unwrap();
        let updated = DateTime::parse_from_rfc3339("2025-05-07T10:00:00+00:00").unwrap();

        let got = resolve(&[
            DateCandidate::Day("2024-01-01"),
            DateCandidate::Text("2023-01-01T00:00:00Z"),
            DateCandidate::Updated(updated),
            DateCandidate::Published(published),
        ]);
        assert_eq!(got, Some(utc(2025, 5, 6, 10, 0, 0)));

        let got = resolve(&[DateCandidate::Text("junk"), DateCandidate::Updated(updated)]);
        assert_eq!(got, Some(utc(2025, 5, 7, 10, 0, 0)));
    }

    #[test]
    fn test_resolve_falls_through_bad_candidates() {
        let got = resolve(&[DateCandidate::Text("not a date"), DateCandidate::Day("2025-05-06")]);
        assert_eq!(got, Some(utc(2025, 5, 6, 0, 0, 0)));

        let got = resolve(&[DateCandidate::Text("nope"), DateCandidate::Day("also nope")]);
        assert_eq!(got, None);
        assert_eq!(resolve(&[]), None);
    }

    #[test]
    fn test_structured_offsets_are_normalized() {
        let published = DateTime::parse_from_rfc3339("2025-05-06T10:00:00-05:00").unwrap();
        let got = resolve(&[DateCandidate::Published(published)]).unwrap();
        assert_eq!(got, utc(2025, 5, 6, 15, 0, 0));
        assert_eq!(got.timezone(), Utc);
    }

    #[test]
    fn test_round_trip_to_same_instant() {
        let instant = utc(2025, 2, 3, 4, 5, 6);
        assert_eq!(parse_text(&instant.to_rfc2822()), Some(instant));
        assert_eq!(parse_text(&instant.to_rfc3339()), Some(instant));
    }
}
