//! Feed configuration: which feeds to check and run-wide settings.
//!
//! The file is JSON by default, or YAML when its extension is `.yaml`/`.yml`:
//!
//! ```text
//! {
//!   "feeds": [
//!     { "name": "Rust Blog", "url": "https://blog.rust-lang.org/feed.xml", "category": "Tech", "enabled": true }
//!   ],
//!   "settings": { "maxItemsPerFeed": 5, "includeCategories": ["all"] }
//! }
//! ```

use crate::error::{ReaderError, Result};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Category filter values that select every category.
pub const ALL_CATEGORIES: [&str; 2] = ["all", "全部"];

/// One subscribed feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeedDescriptor {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Run-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// How many extracted articles per feed are considered for reporting.
    #[serde(default = "default_max_items")]
    pub max_items_per_feed: usize,
    /// Categories shown in the report; [`ALL_CATEGORIES`] selects everything.
    #[serde(default = "default_include_categories")]
    pub include_categories: Vec<String>,
    /// Extra fetch attempts per feed after the first failure.
    #[serde(default)]
    pub fetch_retries: usize,
    /// Forget seen articles older than this many days. `None` keeps them forever.
    #[serde(default)]
    pub seen_retention_days: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_items_per_feed: default_max_items(),
            include_categories: default_include_categories(),
            fetch_retries: 0,
            seen_retention_days: None,
        }
    }
}

impl Settings {
    /// Whether entries in `category` belong in the report.
    pub fn includes_category(&self, category: &str) -> bool {
        self.include_categories
            .iter()
            .any(|c| c == category || ALL_CATEGORIES.contains(&c.as_str()))
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReaderConfig {
    #[serde(default)]
    pub feeds: Vec<FeedDescriptor>,
    #[serde(default)]
    pub settings: Settings,
}

impl ReaderConfig {
    /// Feeds that are switched on, in configured order.
    pub fn enabled_feeds(&self) -> impl Iterator<Item = &FeedDescriptor> {
        self.feeds.iter().filter(|f| f.enabled)
    }
}

fn default_name() -> String {
    "Unknown source".to_string()
}

fn default_category() -> String {
    "Uncategorized".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_max_items() -> usize {
    5
}

fn default_include_categories() -> Vec<String> {
    vec!["all".to_string()]
}

/// Load the configuration file at `path`.
///
/// # Errors
///
/// - [`ReaderError::ConfigMissing`] if the file does not exist or is blank
/// - [`ReaderError::ConfigIo`] if it cannot be read
/// - [`ReaderError::ConfigParse`] if it is not valid JSON/YAML of the expected shape
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_config(path: &Path) -> Result<ReaderConfig> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ReaderError::ConfigMissing(path.to_path_buf()));
        }
        Err(source) => {
            return Err(ReaderError::ConfigIo {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if raw.trim().is_empty() {
        return Err(ReaderError::ConfigMissing(path.to_path_buf()));
    }

    let config = parse_config(path, &raw)?;
    info!(
        feeds = config.feeds.len(),
        enabled = config.enabled_feeds().count(),
        max_items_per_feed = config.settings.max_items_per_feed,
        "Loaded configuration"
    );
    Ok(config)
}

fn parse_config(path: &Path, raw: &str) -> Result<ReaderConfig> {
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    let parsed: std::result::Result<ReaderConfig, String> = if is_yaml {
        serde_yaml::from_str(raw).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(raw).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| ReaderError::ConfigParse {
        path: path.to_path_buf(),
        message,
    })
}
