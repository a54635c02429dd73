//! Pattern-based article extraction from raw RSS and Atom text.
//!
//! Feeds in the wild are often not well-formed XML: unescaped ampersands,
//! mismatched tags, and duplicated namespace declarations are common. Rather
//! than parse a tree, this module locates article blocks (`<item>` for RSS,
//! `<entry>` for Atom) and then searches each block for every field on its
//! own. A missing or mangled field only costs that field its value.
//!
//! # Field Sources
//!
//! | Field       | Tags tried, in order                                   | Default    |
//! |-------------|--------------------------------------------------------|------------|
//! | `title`     | `title`                                                | `Untitled` |
//! | `link`      | `link` text, `link href=`, `link url=`                 | empty      |
//! | `summary`   | `description`, `summary`, `content`, `content:encoded` | empty      |
//! | `published` | `pubDate`, `published`, `updated`, `dc:date`           | empty      |
//!
//! At most [`MAX_RECORDS`] blocks are turned into records per feed.

use crate::models::{ArticleRecord, UNTITLED};
use crate::sanitize::sanitize;
use crate::utils::truncate_chars;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Hard cap on records extracted from a single feed.
pub const MAX_RECORDS: usize = 15;

/// Summaries longer than this many characters are truncated.
pub const SUMMARY_MAX_CHARS: usize = 200;

/// Largest feed body scanned at all.
pub const MAX_FEED_BYTES: usize = 16 * 1024 * 1024;

/// Largest single article block scanned.
pub const MAX_BLOCK_BYTES: usize = 1024 * 1024;

static ITEM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<item[^>]*>(.*?)</item>").unwrap());
static ENTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<entry[^>]*>(.*?)</entry>").unwrap());
static LINK_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<link\b[^>]*>").unwrap());
static HREF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)\bhref\s*=\s*["']([^"']+)["']"#).unwrap());
static REL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)\brel\s*=\s*["']([^"']+)["']"#).unwrap());
static URL_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<link[^>]*url\s*=\s*["']([^"']+)["']"#).unwrap());

static TITLE: Lazy<Vec<Regex>> = Lazy::new(|| paired_patterns(&["title"]));
static LINK: Lazy<Vec<Regex>> = Lazy::new(|| paired_patterns(&["link"]));
static SUMMARY: Lazy<Vec<Regex>> =
    Lazy::new(|| paired_patterns(&["description", "summary", "content", "content:encoded"]));
static PUBLISHED: Lazy<Vec<Regex>> =
    Lazy::new(|| paired_patterns(&["pubDate", "published", "updated", "dc:date"]));

/// Build `<tag ...>inner</tag>` patterns that skip self-closing elements.
fn paired_patterns(tags: &[&str]) -> Vec<Regex> {
    tags.iter()
        .map(|tag| {
            let tag = regex::escape(tag);
            Regex::new(&format!(r"(?is)<{tag}(?:\s(?:[^>]*[^/>])?)?>(.*?)</{tag}\s*>")).unwrap()
        })
        .collect()
}

/// Reasons a feed is abandoned part-way through extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("feed body is {bytes} bytes, limit is {limit}")]
    FeedTooLarge { bytes: usize, limit: usize },

    #[error("article block {index} is {bytes} bytes, limit is {limit}")]
    BlockTooLarge {
        index: usize,
        bytes: usize,
        limit: usize,
    },
}

/// Which syndication dialect the article blocks were found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// RSS `<item>` blocks.
    Item,
    /// Atom `<entry>` blocks.
    Entry,
}

/// Extract up to [`MAX_RECORDS`] articles from raw feed text.
///
/// Never fails. If extraction is abandoned part-way, the records built so far
/// are returned and the reason is logged as a warning.
#[instrument(level = "debug", skip_all, fields(bytes = text.len()))]
pub fn extract(text: &str) -> Vec<ArticleRecord> {
    let mut records = Vec::new();
    if let Err(e) = extract_into(text, &mut records) {
        warn!(error = %e, extracted = records.len(), "Abandoned feed extraction");
    }
    records
}

/// Extract articles into `records`, stopping at the first [`ExtractError`].
///
/// Records pushed before the error stay in `records`.
pub fn extract_into(text: &str, records: &mut Vec<ArticleRecord>) -> Result<(), ExtractError> {
    if text.len() > MAX_FEED_BYTES {
        return Err(ExtractError::FeedTooLarge {
            bytes: text.len(),
            limit: MAX_FEED_BYTES,
        });
    }

    let (dialect, blocks) = block_spans(text);
    debug!(?dialect, blocks = blocks.len(), "Located article blocks");

    for (index, block) in blocks.into_iter().enumerate() {
        if block.len() > MAX_BLOCK_BYTES {
            return Err(ExtractError::BlockTooLarge {
                index,
                bytes: block.len(),
                limit: MAX_BLOCK_BYTES,
            });
        }
        records.push(extract_record(block));
    }
    Ok(())
}

/// Find the inner text of the first [`MAX_RECORDS`] article blocks.
///
/// RSS items are looked for first; Atom entries only when no item exists.
pub fn block_spans(text: &str) -> (Dialect, Vec<&str>) {
    let items = inner_spans(&ITEM_RE, text);
    if !items.is_empty() {
        return (Dialect::Item, items);
    }
    (Dialect::Entry, inner_spans(&ENTRY_RE, text))
}

fn inner_spans<'t>(re: &Regex, text: &'t str) -> Vec<&'t str> {
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .take(MAX_RECORDS)
        .collect()
}

/// Build one record from an article block. Each field is searched on its own.
pub fn extract_record(block: &str) -> ArticleRecord {
    let title = first_text(&TITLE, block).unwrap_or_else(|| UNTITLED.to_string());
    let link = first_text(&LINK, block)
        .or_else(|| link_from_attributes(block))
        .unwrap_or_default();
    let summary = first_text(&SUMMARY, block)
        .map(|s| truncate_chars(&s, SUMMARY_MAX_CHARS))
        .unwrap_or_default();
    let published = first_text(&PUBLISHED, block).unwrap_or_default();

    ArticleRecord::new(title, link, summary, published)
}

/// Sanitized inner text of the first pattern that yields non-empty text.
fn first_text(patterns: &[Regex], block: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures(block)
            .and_then(|caps| caps.get(1))
            .map(|m| sanitize(m.as_str()))
            .filter(|text| !text.is_empty())
    })
}

/// Link from `<link href="..."/>` (preferring `rel="alternate"`) or `url="..."`.
fn link_from_attributes(block: &str) -> Option<String> {
    let mut fallback = None;
    for tag in LINK_TAG_RE.find_iter(block) {
        let tag = tag.as_str();
        let Some(href) = HREF_RE.captures(tag).and_then(|c| c.get(1)) else {
            continue;
        };
        let href = sanitize(href.as_str());
        if href.is_empty() {
            continue;
        }
        let rel = REL_RE
            .captures(tag)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_ascii_lowercase());
        match rel.as_deref() {
            None | Some("alternate") => return Some(href),
            Some(_) => {
                fallback.get_or_insert(href);
            }
        }
    }

    fallback.or_else(|| {
        URL_ATTR_RE
            .captures(block)
            .and_then(|c| c.get(1))
            .map(|m| sanitize(m.as_str()))
            .filter(|url| !url.is_empty())
    })
}
