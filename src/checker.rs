//! Feed checking: fetch, decode, extract, and deduplicate every enabled feed.
//!
//! Feeds are processed one at a time in configured order. A feed that cannot
//! be fetched (or has an unusable URL) is logged and skipped; it never stops
//! the feeds after it. The state file is loaded once before the first feed and
//! saved once after the last, whatever happened in between.

use crate::config::{FeedDescriptor, Settings};
use crate::encoding;
use crate::error::Result;
use crate::extract;
use crate::fetch::FeedFetcher;
use crate::models::NewEntry;
use crate::state::{ReaderState, StateStore};
use crate::utils::truncate_for_log;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Outcome of one complete run over the configured feeds.
#[derive(Debug)]
pub struct RunSummary {
    /// Newly seen articles, grouped by feed in configured order.
    pub new_entries: Vec<NewEntry>,
    /// `last_check` as it was before this run.
    pub previous_check: Option<DateTime<Utc>>,
    /// `last_check` as written by this run.
    pub checked_at: DateTime<Utc>,
    /// Enabled feeds that were fetched successfully.
    pub feeds_checked: usize,
    /// Enabled feeds skipped because of a bad URL or failed fetch.
    pub feeds_failed: usize,
    /// Seen entries dropped by the retention window.
    pub evicted: usize,
}

/// Drives a run over a list of feeds with a given [`FeedFetcher`].
#[derive(Debug)]
pub struct FeedChecker<F> {
    fetcher: F,
    settings: Settings,
}

impl<F> FeedChecker<F>
where
    F: FeedFetcher,
{
    pub fn new(fetcher: F, settings: Settings) -> Self {
        Self { fetcher, settings }
    }

    /// Load state, check every enabled feed, and save state exactly once.
    ///
    /// # Errors
    ///
    /// Only state loading and saving can fail. Feed problems are logged and
    /// counted in [`RunSummary::feeds_failed`].
    #[instrument(level = "info", skip_all, fields(state = %store.path().display()))]
    pub async fn run(&self, feeds: &[FeedDescriptor], store: &StateStore) -> Result<RunSummary> {
        let mut state = store.load().await?;
        let previous_check = state.last_check;

        let evicted = match self.settings.seen_retention_days {
            Some(days) => match TimeDelta::try_days(i64::from(days)) {
                Some(window) => {
                    let evicted = state.evict_older_than(window, Utc::now());
                    info!(evicted, days, "Applied seen-entry retention window");
                    evicted
                }
                None => {
                    warn!(days, "Retention window too large; keeping every seen entry");
                    0
                }
            },
            None => 0,
        };

        let (new_entries, feeds_checked, feeds_failed) = self.check_all(feeds, &mut state).await;
        let checked_at = state.mark_checked();
        store.save(&state).await?;

        info!(
            new = new_entries.len(),
            feeds_checked,
            feeds_failed,
            %checked_at,
            "Run complete"
        );
        Ok(RunSummary {
            new_entries,
            previous_check,
            checked_at,
            feeds_checked,
            feeds_failed,
            evicted,
        })
    }

    /// Check every enabled feed against `state` and stamp `last_check`.
    ///
    /// Returns the new articles with their feed name and category, in feed
    /// order and then extraction order. `state` is updated in place but not
    /// persisted.
    pub async fn check_feeds(
        &self,
        feeds: &[FeedDescriptor],
        state: &mut ReaderState,
    ) -> Vec<NewEntry> {
        let (new_entries, _, _) = self.check_all(feeds, state).await;
        state.mark_checked();
        new_entries
    }

    async fn check_all(
        &self,
        feeds: &[FeedDescriptor],
        state: &mut ReaderState,
    ) -> (Vec<NewEntry>, usize, usize) {
        let mut new_entries = Vec::new();
        let mut checked = 0;
        let mut failed = 0;

        for feed in feeds.iter().filter(|f| f.enabled) {
            match self.check_feed(feed, state).await {
                Some(entries) => {
                    checked += 1;
                    new_entries.extend(entries);
                }
                None => failed += 1,
            }
        }
        (new_entries, checked, failed)
    }

    /// Check one feed. `None` means the feed was skipped.
    #[instrument(level = "info", skip_all, fields(feed = %feed.name, url = %feed.url))]
    async fn check_feed(
        &self,
        feed: &FeedDescriptor,
        state: &mut ReaderState,
    ) -> Option<Vec<NewEntry>> {
        if let Err(e) = Url::parse(&feed.url) {
            warn!(error = %e, "Feed URL is not valid; skipping");
            return None;
        }

        let body = match self.fetcher.fetch(&feed.url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Feed fetch failed; skipping");
                return None;
            }
        };

        let decoded = encoding::decode(&body);
        if decoded.lossy {
            debug!(encoding = decoded.encoding.name(), "Feed body decoded with replacements");
        }

        let mut records = extract::extract(&decoded.text);
        if records.is_empty() {
            info!(
                preview = %truncate_for_log(decoded.text.trim_start(), 120),
                "No articles found in feed"
            );
            return Some(Vec::new());
        }
        let extracted = records.len();
        records.truncate(self.settings.max_items_per_feed);

        let fresh = state.filter_new(records);
        info!(extracted, new = fresh.len(), "Checked feed");

        Some(
            fresh
                .into_iter()
                .map(|record| NewEntry {
                    feed: feed.name.clone(),
                    category: feed.category.clone(),
                    record,
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Serves canned bodies; unknown URLs fail with HTTP 404.
    #[derive(Default)]
    struct MemoryFetcher {
        bodies: HashMap<String, Vec<u8>>,
        requested: RefCell<Vec<String>>,
    }

    impl MemoryFetcher {
        fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
            self.bodies.insert(url.to_string(), body.into());
            self
        }
    }

    impl FeedFetcher for MemoryFetcher {
        async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
            self.requested.borrow_mut().push(url.to_string());
            self.bodies.get(url).cloned().ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    fn feed(name: &str, url: &str, category: &str) -> FeedDescriptor {
        FeedDescriptor {
            name: name.to_string(),
            url: url.to_string(),
            category: category.to_string(),
            enabled: true,
        }
    }

    fn rss(prefix: &str, count: usize) -> String {
        let items: String = (0..count)
            .map(|i| {
                format!(
                    "<item><title>{prefix} {i}</title><link>https://{prefix}.example/{i}</link>\
                     <description>About {prefix} {i}</description></item>"
                )
            })
            .collect();
        format!("<rss><channel><title>{prefix}</title>{items}</channel></rss>")
    }

    #[tokio::test]
    async fn test_aggregates_in_feed_then_record_order() {
        let fetcher = MemoryFetcher::default()
            .with("https://a.example/rss", rss("a", 2))
            .with("https://b.example/rss", rss("b", 2));
        let checker = FeedChecker::new(fetcher, Settings::default());
        let feeds = [
            feed("A", "https://a.example/rss", "News"),
            feed("B", "https://b.example/rss", "Tech"),
        ];

        let mut state = ReaderState::default();
        let entries = checker.check_feeds(&feeds, &mut state).await;

        let titles: Vec<_> = entries.iter().map(|e| e.record.title.as_str()).collect();
        assert_eq!(titles, ["a 0", "a 1", "b 0", "b 1"]);
        assert_eq!(entries[0].feed, "A");
        assert_eq!(entries[0].category, "News");
        assert_eq!(entries[3].feed, "B");
        assert_eq!(entries[3].category, "Tech");
        assert_eq!(state.seen_entries.len(), 4);
        assert!(state.last_check.is_some());
    }

    #[tokio::test]
    async fn test_caps_items_per_feed() {
        let fetcher = MemoryFetcher::default().with("https://a.example/rss", rss("a", 12));
        let settings = Settings {
            max_items_per_feed: 3,
            ..Settings::default()
        };
        let checker = FeedChecker::new(fetcher, settings);

        let mut state = ReaderState::default();
        let entries = checker
            .check_feeds(&[feed("A", "https://a.example/rss", "News")], &mut state)
            .await;
        assert_eq!(entries.len(), 3);
        assert_eq!(state.seen_entries.len(), 3);
    }

    #[tokio::test]
    async fn test_default_cap_is_five() {
        let fetcher = MemoryFetcher::default().with("https://a.example/rss", rss("a", 20));
        let checker = FeedChecker::new(fetcher, Settings::default());
        let mut state = ReaderState::default();
        let entries = checker
            .check_feeds(&[feed("A", "https://a.example/rss", "News")], &mut state)
            .await;
        assert_eq!(entries.len(), 5);
    }

    #[tokio::test]
    async fn test_failed_and_disabled_feeds_are_skipped() {
        let fetcher = MemoryFetcher::default()
            .with("https://ok.example/rss", rss("ok", 1))
            .with("https://off.example/rss", rss("off", 1));
        let checker = FeedChecker::new(fetcher, Settings::default());
        let mut disabled = feed("Off", "https://off.example/rss", "News");
        disabled.enabled = false;
        let feeds = [
            feed("Down", "https://down.example/rss", "News"),
            feed("Broken", "not a url", "News"),
            disabled,
            feed("Ok", "https://ok.example/rss", "News"),
        ];

        let mut state = ReaderState::default();
        let entries = checker.check_feeds(&feeds, &mut state).await;

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].feed, "Ok");
        assert_eq!(
            *checker.fetcher.requested.borrow(),
            ["https://down.example/rss", "https://ok.example/rss"]
        );
    }

    #[tokio::test]
    async fn test_non_feed_body_yields_nothing() {
        let fetcher = MemoryFetcher::default().with("https://a.example/", "<html>nope</html>");
        let checker = FeedChecker::new(fetcher, Settings::default());
        let mut state = ReaderState::default();
        let entries = checker
            .check_feeds(&[feed("A", "https://a.example/", "News")], &mut state)
            .await;
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_gbk_feed_is_decoded() {
        // <item><title>新闻</title></item> with the title in GBK
        let mut body = b"<rss><item><title>".to_vec();
        body.extend_from_slice(&[0xD0, 0xC2, 0xCE, 0xC5]);
        body.extend_from_slice(b"</title><link>https://cn.example/1</link></item></rss>");

        let fetcher = MemoryFetcher::default().with("https://cn.example/rss", body);
        let checker = FeedChecker::new(fetcher, Settings::default());
        let mut state = ReaderState::default();
        let entries = checker
            .check_feeds(&[feed("CN", "https://cn.example/rss", "新闻")], &mut state)
            .await;
        assert_eq!(entries[0].record.title, "新闻");
        assert_eq!(entries[0].record.identity, "https://cn.example/1|新闻");
    }

    #[tokio::test]
    async fn test_run_persists_and_dedups_across_runs() {
        let tmp = tempfile::tempdir().unwrap();
        let store = StateStore::new(tmp.path().join("rss-state.json"));
        let feeds = [feed("A", "https://a.example/rss", "News")];

        let checker = FeedChecker::new(
            MemoryFetcher::default().with("https://a.example/rss", rss("a", 2)),
            Settings::default(),
        );

        let first = checker.run(&feeds, &store).await.unwrap();
        assert_eq!(first.new_entries.len(), 2);
        assert!(first.previous_check.is_none());
        assert_eq!(first.feeds_checked, 1);

        let second = checker.run(&feeds, &store).await.unwrap();
        assert!(second.new_entries.is_empty());
        assert_eq!(second.previous_check, Some(first.checked_at));
        assert!(second.checked_at > first.checked_at);

        let saved = store.load().await.unwrap();
        assert_eq!(saved.seen_entries.len(), 2);
        assert_eq!(saved.last_check, Some(second.checked_at));
    }

    #[tokio::test]
    async fn test_run_saves_state_when_every_feed_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let store = StateStore::new(tmp.path().join("rss-state.json"));
        let checker = FeedChecker::new(MemoryFetcher::default(), Settings::default());

        let summary = checker
            .run(&[feed("Down", "https://down.example/rss", "News")], &store)
            .await
            .unwrap();
        assert!(summary.new_entries.is_empty());
        assert_eq!(summary.feeds_failed, 1);

        let saved = store.load().await.unwrap();
        assert_eq!(saved.last_check, Some(summary.checked_at));
    }

    #[tokio::test]
    async fn test_run_applies_retention_window() {
        let tmp = tempfile::tempdir().unwrap();
        let store = StateStore::new(tmp.path().join("rss-state.json"));

        let mut state = ReaderState::default();
        state.seen_entries.insert(
            "https://a.example/0|a 0".to_string(),
            crate::state::SeenEntry {
                title: "a 0".to_string(),
                seen_at: Utc::now() - TimeDelta::days(90),
            },
        );
        store.save(&state).await.unwrap();

        let settings = Settings {
            seen_retention_days: Some(30),
            ..Settings::default()
        };
        let checker = FeedChecker::new(
            MemoryFetcher::default().with("https://a.example/rss", rss("a", 1)),
            settings,
        );
        let summary = checker
            .run(&[feed("A", "https://a.example/rss", "News")], &store)
            .await
            .unwrap();

        assert_eq!(summary.evicted, 1);
        assert_eq!(summary.new_entries.len(), 1);
    }

    #[tokio::test]
    async fn test_run_with_maximal_retention_keeps_state() {
        let tmp = tempfile::tempdir().unwrap();
        let store = StateStore::new(tmp.path().join("rss-state.json"));
        let settings = Settings {
            seen_retention_days: Some(u32::MAX),
            ..Settings::default()
        };
        let feeds = [feed("A", "https://a.example/rss", "News")];
        let checker = FeedChecker::new(
            MemoryFetcher::default().with("https://a.example/rss", rss("a", 2)),
            settings,
        );

        let first = checker.run(&feeds, &store).await.unwrap();
        assert_eq!(first.new_entries.len(), 2);

        let second = checker.run(&feeds, &store).await.unwrap();
        assert_eq!(second.evicted, 0);
        assert!(second.new_entries.is_empty());
        assert_eq!(store.load().await.unwrap().seen_entries.len(), 2);
    }
}
