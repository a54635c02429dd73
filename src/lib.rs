//! # Awful RSS Reader
//!
//! Checks a list of subscribed RSS and Atom feeds, remembers which articles
//! have already been reported, and writes a Markdown digest of only the new
//! ones.
//!
//! ## Features
//!
//! - Tolerates malformed feeds: articles are extracted field by field with
//!   patterns instead of an XML parser
//! - Decodes feeds in UTF-8, GBK, GB18030, or Latin-1 without trusting the
//!   declared charset
//! - Persists the seen set between runs so every article is reported once
//! - Outputs a category-grouped Markdown digest and an optional JSON dump
//!
//! ## Usage
//!
//! ```sh
//! awful_rss_reader -c rss-feeds.json -s rss-state.json -r rss-report.md
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Fetching**: Download each enabled feed, one at a time
//! 2. **Decoding**: Turn the bytes into text via an encoding ladder
//! 3. **Extraction**: Pull up to 15 article records out of the text
//! 4. **Deduplication**: Keep articles whose identity was never seen before
//! 5. **Output**: Save state, then write the digest

pub mod checker;
pub mod config;
pub mod encoding;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod outputs;
pub mod sanitize;
pub mod state;
pub mod utils;
