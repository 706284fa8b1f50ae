//! Source adapters for collecting records from each kind of source.
//!
//! Every adapter follows the same pattern:
//!
//! 1. **Fetch**: download the source document(s) through [`Fetch`](crate::http::Fetch)
//! 2. **Normalize**: map raw entries to records, resolving dates
//! 3. **Window**: deduplicate by URL and keep the recent records, newest first
//! 4. **Enrich** (optional): attach page text or transcripts as new record values
//!
//! # Supported Sources
//!
//! | Kind | Module | Record | Notes |
//! |------|--------|--------|-------|
//! | RSS / Atom | [`rss`] | [`Article`](crate::models::Article) | several named feeds per source |
//! | Sitemap | [`sitemap`] | [`Article`](crate::models::Article) | titles derived from URL slugs |
//! | YouTube | [`youtube`] | [`Video`](crate::models::Video) | channel feeds plus transcripts |
//!
//! Adapters never fail: transport and parse errors are logged with the
//! source name and turn into an empty (or partial) result.

use crate::window::TimeWindow;

pub mod content;
pub mod rss;
pub mod sitemap;
pub mod youtube;

/// One configured source able to produce normalized records.
pub trait SourceAdapter {
    type Record;

    /// Configured source name, used in logs and in the report.
    fn name(&self) -> &str;

    /// Collect the records that fall inside `window`, newest first.
    async fn collect(&self, window: TimeWindow) -> Vec<Self::Record>;
}
