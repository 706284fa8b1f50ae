//! JSON output of an aggregation report.
//!
//! Files are organized by local date with edition names:
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── morning.json
//!     ├── afternoon.json
//!     └── evening.json
//! ```
//!
//! Date and edition both come from the report's `generated_at` in local time,
//! so a rerun of the same edition overwrites the earlier file.

use crate::models::Report;
use crate::utils::edition_for;
use chrono::{DateTime, Local, TimeZone};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Path of the report file for a run started at `at`.
pub fn report_path<Tz: TimeZone>(json_output_dir: &str, at: &DateTime<Tz>) -> PathBuf {
    let date = at.date_naive().format("%Y-%m-%d").to_string();
    let edition = edition_for(at.time());
    Path::new(json_output_dir)
        .join(date)
        .join(format!("{edition}.json"))
}

/// Write `report` as pretty JSON under `json_output_dir`.
///
/// Returns the path written.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_report(report: &Report, json_output_dir: &str) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;
    let path = report_path(json_output_dir, &report.generated_at.with_timezone(&Local));

    if let Some(dir) = path.parent() {
        info!(dir = %dir.display(), "Ensuring JSON directory exists");
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(&path, json).await?;
    info!(path = %path.display(), items = report.total(), "Wrote JSON report");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Article, SourceItems, SourceReport};
    use chrono::{FixedOffset, Utc};

    #[test]
    fn test_report_path_uses_local_date_and_edition() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let at = tz.with_ymd_and_hms(2025, 5, 6, 17, 30, 0).unwrap();
        assert_eq!(
            report_path("out", &at),
            PathBuf::from("out/2025-05-06/evening.json")
        );

        let at = tz.with_ymd_and_hms(2025, 5, 7, 7, 0, 0).unwrap();
        assert_eq!(
            report_path("out", &at),
            PathBuf::from("out/2025-05-07/morning.json")
        );
    }

    #[tokio::test]
    async fn test_write_report_creates_dated_file() {
        let report = Report {
            generated_at: Utc::now(),
            sources: vec![SourceReport {
                name: "openai".to_string(),
                items: SourceItems::Articles(vec![Article {
                    title: "Hello".to_string(),
                    url: "https://x.test/hello".to_string(),
                    published_at: None,
                    description: String::new(),
                    category: String::new(),
                    source_feed: "news".to_string(),
                    content: None,
                }]),
            }],
        };
        let dir = std::env::temp_dir().join(format!("news_digest_json_{}", std::process::id()));
        let dir = dir.to_string_lossy().to_string();

        let path = write_report(&report, &dir).await.unwrap();
        assert!(path.starts_with(&dir));
        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed["sources"][0]["name"], "openai");
        assert_eq!(parsed["sources"][0]["kind"], "articles");
        assert_eq!(parsed["sources"][0]["items"][0]["url"], "https://x.test/hello");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
