//! Markdown digest of newly seen articles.
//!
//! Entries are grouped by feed category (alphabetically), filtered through
//! the configured category list, and laid out one section per category:
//!
//! ```text
//! # RSS Digest
//!
//! **Time**: 2025-05-06 08:00 (+08:00)
//! **New articles**: 2
//!
//! ---
//!
//! ## Tech
//!
//! ### Rust 2024 edition
//!
//! The new edition is here.
//!
//! Published: Thu, 20 Feb 2025 09:00:00 GMT
//! Link: https://blog.example.com/rust-2024
//! ```

use crate::config::Settings;
use crate::models::{ArticleRecord, NewEntry};
use crate::utils::ensure_parent_dir;
use chrono::{DateTime, Local};
use itertools::Itertools;
use std::error::Error;
use std::fmt::Write;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Render the digest, or `None` if no entry survives the category filter.
pub fn render(
    entries: &[NewEntry],
    settings: &Settings,
    generated_at: DateTime<Local>,
) -> Option<String> {
    let included: Vec<&NewEntry> = entries
        .iter()
        .filter(|e| settings.includes_category(&e.category))
        .collect();
    if included.is_empty() {
        return None;
    }

    let mut md = String::new();
    writeln!(md, "# RSS Digest\n").unwrap();
    writeln!(md, "**Time**: {}", generated_at.format("%Y-%m-%d %H:%M (%:z)")).unwrap();
    writeln!(md, "**New articles**: {}", included.len()).unwrap();

    let by_category = included
        .into_iter()
        .into_group_map_by(|e| e.category.clone());

    for (category, group) in by_category.into_iter().sorted_by(|a, b| a.0.cmp(&b.0)) {
        writeln!(md, "\n---\n\n## {category}").unwrap();
        for entry in group {
            md.push('\n');
            md.push_str(&render_entry(&entry.record));
        }
    }

    Some(md)
}

fn render_entry(record: &ArticleRecord) -> String {
    let mut out = format!("### {}\n\n", record.title);
    if !record.summary.is_empty() {
        out.push_str(&record.summary);
        out.push_str("\n\n");
    }
    if !record.published.is_empty() {
        out.push_str(&format!("Published: {}\n", record.published));
    }
    out.push_str(&format!("Link: {}\n", record.link));
    out
}

/// Write a rendered digest to `path`, creating parent directories.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_report(path: &Path, markdown: &str) -> Result<(), Box<dyn Error>> {
    ensure_parent_dir(path).await?;
    fs::write(path, markdown).await?;
    info!(bytes = markdown.len(), "Wrote digest");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(feed: &str, category: &str, title: &str, summary: &str, published: &str) -> NewEntry {
        NewEntry {
            feed: feed.to_string(),
            category: category.to_string(),
            record: ArticleRecord::new(
                title.to_string(),
                format!("https://example.com/{}", title.to_lowercase()),
                summary.to_string(),
                published.to_string(),
            ),
        }
    }

    fn when() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 5, 6, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_entries_render_nothing() {
        assert!(render(&[], &Settings::default(), when()).is_none());
    }

    #[test]
    fn test_groups_by_sorted_category() {
        let entries = vec![
            entry("B", "Tech", "Zeta", "", ""),
            entry("A", "News", "Alpha", "Short summary", "Tue, 06 May 2025"),
            entry("B", "Tech", "Eta", "", ""),
        ];
        let md = render(&entries, &Settings::default(), when()).unwrap();

        assert!(md.starts_with("# RSS Digest\n"));
        assert!(md.contains("**Time**: 2025-05-06 08:00"));
        assert!(md.contains("**New articles**: 3"));

        let news = md.find("## News").unwrap();
        let tech = md.find("## Tech").unwrap();
        assert!(news < tech);

        let zeta = md.find("### Zeta").unwrap();
        let eta = md.find("### Eta").unwrap();
        assert!(tech < zeta && zeta < eta);

        assert!(md.contains("### Alpha\n\nShort summary\n\nPublished: Tue, 06 May 2025\nLink: https://example.com/alpha\n"));
        assert!(md.contains("### Zeta\n\nLink: https://example.com/zeta\n"));
    }

    #[test]
    fn test_category_filter() {
        let entries = vec![
            entry("A", "News", "Alpha", "", ""),
            entry("B", "Tech", "Beta", "", ""),
        ];
        let settings = Settings {
            include_categories: vec!["Tech".to_string()],
            ..Settings::default()
        };
        let md = render(&entries, &settings, when()).unwrap();
        assert!(md.contains("## Tech"));
        assert!(!md.contains("## News"));
        assert!(md.contains("**New articles**: 1"));

        let nothing = Settings {
            include_categories: vec!["Sports".to_string()],
            ..Settings::default()
        };
        assert!(render(&entries, &nothing, when()).is_none());
    }

    #[tokio::test]
    async fn test_write_report() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out/rss-report.md");
        write_report(&path, "# RSS Digest\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# RSS Digest\n");
    }
}
