//! Utility functions for string truncation and file system preparation.

use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Marker appended to text cut short by [`truncate_chars`].
pub const TRUNCATION_MARKER: &str = "...";

/// Truncate `s` to at most `max` characters, appending [`TRUNCATION_MARKER`]
/// when anything was cut.
///
/// Counts Unicode scalar values, so multi-byte text is never split mid-character.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_chars("short", 10), "short");
/// assert_eq!(truncate_chars("abcdef", 3), "abc...");
/// ```
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}{}", &s[..cut], TRUNCATION_MARKER),
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Ensure the directory that will hold `path` exists.
///
/// Paths without a parent component (bare file names) need nothing.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn ensure_parent_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).await?;
            info!(dir = %dir.display(), "Output directory ready");
            Ok(())
        }
        _ => Ok(()),
    }
}
