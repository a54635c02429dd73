//! Persistent record of which articles have already been reported.
//!
//! The state file is read once when a run starts and written once when it
//! ends. Its JSON shape is:
//!
//! ```text
//! {
//!   "seen_entries": {
//!     "https://example.com/a|Title": { "title": "Title", "seen_at": "2025-05-06T08:00:00Z" }
//!   },
//!   "last_check": "2025-05-06T08:00:01Z"
//! }
//! ```
//!
//! Entries are keyed by [`ArticleRecord::identity`]. They are inserted the
//! first time an identity is observed and never updated afterwards. Nothing is
//! removed unless a retention window is configured (see
//! [`ReaderState::evict_older_than`]).

use crate::error::{ReaderError, Result};
use crate::models::ArticleRecord;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

/// What is remembered about an article once it has been reported.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SeenEntry {
    /// Title at the time the article was first seen.
    pub title: String,
    /// When the article was first seen.
    pub seen_at: DateTime<Utc>,
}

/// The seen set plus the time of the last completed check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReaderState {
    #[serde(default)]
    pub seen_entries: BTreeMap<String, SeenEntry>,
    #[serde(default)]
    pub last_check: Option<DateTime<Utc>>,
}

impl ReaderState {
    /// Whether `identity` has been reported before.
    pub fn is_seen(&self, identity: &str) -> bool {
        self.seen_entries.contains_key(identity)
    }

    /// Keep only records not seen before, remembering them as seen now.
    pub fn filter_new(&mut self, records: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
        self.filter_new_at(records, Utc::now())
    }

    /// Like [`filter_new`](Self::filter_new) with an explicit timestamp.
    ///
    /// Extraction order is preserved. Records with an empty identity are
    /// dropped, and a repeated identity within `records` is only kept once.
    pub fn filter_new_at(
        &mut self,
        records: Vec<ArticleRecord>,
        now: DateTime<Utc>,
    ) -> Vec<ArticleRecord> {
        let mut fresh = Vec::new();
        for record in records {
            if record.identity.is_empty() || self.is_seen(&record.identity) {
                debug!(identity = %record.identity, "Skipping seen article");
                continue;
            }
            self.seen_entries.insert(
                record.identity.clone(),
                SeenEntry {
                    title: record.title.clone(),
                    seen_at: now,
                },
            );
            fresh.push(record);
        }
        fresh
    }

    /// Record that a check finished now.
    pub fn mark_checked(&mut self) -> DateTime<Utc> {
        self.mark_checked_at(Utc::now())
    }

    /// Set `last_check` to `now`, or one millisecond past the previous value
    /// if the clock has not moved beyond it.
    pub fn mark_checked_at(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let checked = match self.last_check {
            Some(previous) if now <= previous => previous + Duration::milliseconds(1),
            _ => now,
        };
        self.last_check = Some(checked);
        checked
    }

    /// Forget entries first seen more than `max_age` before `now`.
    ///
    /// Returns how many entries were dropped. A window reaching past the
    /// earliest representable time drops nothing.
    pub fn evict_older_than(&mut self, max_age: Duration, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = now.checked_sub_signed(max_age) else {
            debug!(?max_age, "Retention window exceeds the calendar; keeping every entry");
            return 0;
        };
        let before = self.seen_entries.len();
        self.seen_entries.retain(|_, entry| entry.seen_at >= cutoff);
        before - self.seen_entries.len()
    }
}

/// Loads and saves [`ReaderState`] at a fixed path.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state file, or start empty if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::StateIo`] if the file exists but cannot be read,
    /// and [`ReaderError::StateParse`] if it is not valid state JSON.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<ReaderState> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No state file yet; starting with an empty seen set");
                return Ok(ReaderState::default());
            }
            Err(source) => {
                return Err(ReaderError::StateIo {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let state: ReaderState =
            serde_json::from_str(&raw).map_err(|source| ReaderError::StateParse {
                path: self.path.clone(),
                source,
            })?;
        info!(
            seen = state.seen_entries.len(),
            last_check = ?state.last_check,
            "Loaded state"
        );
        Ok(state)
    }

    /// Write the state file atomically.
    ///
    /// The JSON goes to a sibling `.tmp` file first and is renamed over the
    /// target, so readers only ever see a complete file.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn save(&self, state: &ReaderState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.tmp_path();
        let io_err = |source| ReaderError::StateIo {
            path: self.path.clone(),
            source,
        };

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await.map_err(io_err)?;
        }
        fs::write(&tmp, json).await.map_err(io_err)?;
        fs::rename(&tmp, &self.path).await.map_err(io_err)?;

        info!(seen = state.seen_entries.len(), "Saved state");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "rss-state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
