//! Data models shared across extraction, deduplication, and reporting.
//!
//! - [`ArticleRecord`]: One article pulled out of a feed, already sanitized
//! - [`NewEntry`]: An article seen for the first time, tagged with its source feed

use serde::{Deserialize, Serialize};

/// Separator between link and title in an [`ArticleRecord`] identity.
pub const IDENTITY_SEPARATOR: &str = "|";

/// Title used when a block has no usable `<title>`.
pub const UNTITLED: &str = "Untitled";

/// A single article extracted from a feed.
///
/// Records are built once per extraction pass and never mutated afterwards.
/// Every text field has already been through [`crate::sanitize::sanitize`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArticleRecord {
    /// Article headline; never empty, falls back to [`UNTITLED`].
    pub title: String,
    /// Article URL, possibly empty.
    pub link: String,
    /// Plain-text summary, at most 200 characters plus a `...` marker.
    pub summary: String,
    /// Publication date exactly as the feed wrote it, possibly empty.
    pub published: String,
    /// Deduplication key, `link|title`.
    pub identity: String,
}

impl ArticleRecord {
    /// Build a record and derive its identity from `link` and `title`.
    pub fn new(title: String, link: String, summary: String, published: String) -> Self {
        let identity = identity_of(&link, &title);
        Self {
            title,
            link,
            summary,
            published,
            identity,
        }
    }
}

/// Compose the identity of an article from its sanitized link and title.
pub fn identity_of(link: &str, title: &str) -> String {
    format!("{link}{IDENTITY_SEPARATOR}{title}")
}

/// An article reported for the first time, with the feed it came from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NewEntry {
    /// Name of the feed descriptor that produced the article.
    pub feed: String,
    /// Category of that feed descriptor.
    pub category: String,
    /// The article itself.
    pub record: ArticleRecord,
}
