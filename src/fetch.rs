//! Feed retrieval over HTTP with optional exponential backoff.
//!
//! # Architecture
//!
//! - [`FeedFetcher`]: Core trait, "give me the raw bytes behind this URL"
//! - [`HttpFetcher`]: `reqwest` implementation with a per-request timeout
//! - [`RetryFetch`]: Decorator that adds retries to any [`FeedFetcher`]
//!
//! The checker only ever sees a [`FeedFetcher`], so tests substitute an
//! in-memory implementation and never touch the network.
//!
//! # Retry Strategy
//!
//! - Number of retries comes from configuration (default 0, a single attempt)
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to each delay

use rand::{Rng, rng};
use reqwest::Client;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

/// Timeout applied to each feed request unless configured otherwise.
pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(15);

/// User-Agent sent with every feed request.
pub const USER_AGENT: &str = "Mozilla/5.0 (Compatible; RSSReader/1.0)";

/// Why a feed could not be retrieved.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = source.status() {
            FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Trait for retrieving raw feed bytes.
pub trait FeedFetcher {
    /// Fetch the body behind `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetches feeds over HTTP(S) with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: StdDuration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

impl FeedFetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched feed"
        );
        Ok(body.to_vec())
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`FeedFetcher`].
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..max_jitter)
/// ```
pub struct RetryFetch<T> {
    /// The underlying fetcher.
    inner: T,
    /// Maximum number of retries after the first attempt.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Cap on the computed backoff.
    max_delay: StdDuration,
    /// Upper bound of the random jitter added to each delay.
    max_jitter: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: FeedFetcher,
{
    /// Wrap `inner`, retrying up to `max_retries` times.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let http = HttpFetcher::new(DEFAULT_TIMEOUT)?;
    /// let fetcher = RetryFetch::new(http, 2, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
            max_jitter: StdDuration::from_millis(250),
        }
    }

    pub fn with_max_jitter(mut self, max_jitter: StdDuration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = (attempt.saturating_sub(1)).min(31) as u32;
        let delay = self
            .base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay);
        let jitter_ms = self.max_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            delay
        } else {
            delay + StdDuration::from_millis(rng().random_range(0..=jitter_ms))
        }
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> FeedFetcher for RetryFetch<T>
where
    T: FeedFetcher,
{
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                        ?delay,
                        error = %e,
                        "Feed fetch failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
