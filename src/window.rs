//! Time-window filtering, deduplication and recency ordering of records.

use crate::models::Record;
use chrono::{DateTime, TimeDelta, Utc};
use itertools::Itertools;
use tracing::debug;

/// Dates further than this into the future are assumed misparsed.
const FUTURE_TOLERANCE_DAYS: i64 = 1;

/// Window parameters for one source in one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub lookback_hours: i64,
    pub dateless_cap: usize,
    /// Reference instant, shared by every source of a run.
    pub now: DateTime<Utc>,
}

impl TimeWindow {
    /// Window and sort `records`, newest first.
    pub fn apply<R: Record>(&self, records: Vec<R>) -> Vec<R> {
        filter_window(records, self.lookback_hours, self.dateless_cap, self.now)
    }

    /// Window `records` without sorting: in-window dated records in input
    /// order, followed by the admitted dateless ones.
    pub fn admit<R: Record>(&self, records: Vec<R>) -> Vec<R> {
        admit_window(records, self.lookback_hours, self.dateless_cap, self.now)
    }
}

/// Keep the records published within `lookback_hours` of `now`, newest first.
///
/// See [`admit_window`] for the admission rules.
pub fn filter_window<R: Record>(
    records: Vec<R>,
    lookback_hours: i64,
    dateless_cap: usize,
    now: DateTime<Utc>,
) -> Vec<R> {
    let mut kept = admit_window(records, lookback_hours, dateless_cap, now);
    sort_newest_first(&mut kept);
    kept
}

/// Partition `records` against the window, keeping input order.
///
/// - Records older than the cutoff are dropped.
/// - Records dated more than a day into the future are kept, on the theory
///   that the feed rendered a recent date with the wrong timezone.
/// - Dateless records are held back; the first `dateless_cap` of them, in
///   feed order, are appended after the dated ones.
///
/// A lookback too large to represent has no lower bound.
pub fn admit_window<R: Record>(
    records: Vec<R>,
    lookback_hours: i64,
    dateless_cap: usize,
    now: DateTime<Utc>,
) -> Vec<R> {
    let cutoff = TimeDelta::try_hours(lookback_hours).and_then(|d| now.checked_sub_signed(d));
    let future_limit =
        TimeDelta::try_days(FUTURE_TOLERANCE_DAYS).and_then(|d| now.checked_add_signed(d));

    let total = records.len();
    let mut kept = Vec::with_capacity(total);
    let mut dateless = Vec::new();
    let mut too_old = 0usize;
    let mut suspect = 0usize;

    for record in records {
        match record.published_at() {
            None => dateless.push(record),
            Some(ts) if future_limit.is_some_and(|limit| ts > limit) => {
                suspect += 1;
                kept.push(record);
            }
            Some(ts) if cutoff.is_some_and(|c| ts < c) => too_old += 1,
            Some(_) => kept.push(record),
        }
    }

    let dateless_total = dateless.len();
    kept.extend(dateless.into_iter().take(dateless_cap));
    debug!(
        total,
        kept = kept.len(),
        too_old,
        suspect,
        dateless = dateless_total,
        dateless_cap,
        "Applied time window"
    );
    kept
}

/// Sort by publication date descending; dateless records go last and keep
/// their relative order.
pub fn sort_newest_first<R: Record>(records: &mut [R]) {
    // Option orders None before Some, so reversing puts None last.
    records.sort_by(|a, b| b.published_at().cmp(&a.published_at()));
}

/// Collapse records sharing a URL, keeping the first occurrence.
pub fn dedupe_by_url<R: Record>(records: Vec<R>) -> Vec<R> {
    records
        .into_iter()
        .unique_by(|r| r.url().to_string())
        .collect()
}
