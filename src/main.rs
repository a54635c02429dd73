//! Command-line entry point: load configuration, check feeds, write the digest.
//!
//! Exits non-zero when the feed configuration is missing or unreadable, or
//! when the state file cannot be loaded or saved. Individual feed failures
//! are logged and never change the exit status.

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use awful_rss_reader::checker::FeedChecker;
use awful_rss_reader::config;
use awful_rss_reader::fetch::{HttpFetcher, RetryFetch};
use awful_rss_reader::outputs::{json, report};
use awful_rss_reader::state::StateStore;
use cli::Cli;

#[tokio::main(flavor = "current_thread")]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("rss_reader starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.state, ?args.report, "Parsed CLI arguments");

    // ---- Configuration (fatal if absent) ----
    let config = match config::load_config(&args.config).await {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Cannot run without a feed configuration");
            return Err(e.into());
        }
    };

    // ---- Check feeds ----
    let http = HttpFetcher::new(Duration::from_secs(args.timeout_secs))?;
    let fetcher = RetryFetch::new(http, config.settings.fetch_retries, Duration::from_secs(1));
    let checker = FeedChecker::new(fetcher, config.settings.clone());
    let store = StateStore::new(&args.state);

    let summary = checker.run(&config.feeds, &store).await?;
    if let Some(previous) = summary.previous_check {
        info!(%previous, "Previous check");
    }
    info!(
        new = summary.new_entries.len(),
        feeds_checked = summary.feeds_checked,
        feeds_failed = summary.feeds_failed,
        evicted = summary.evicted,
        "Feed check finished"
    );

    // ---- Outputs ----
    if let Some(ref json_path) = args.json_output {
        if let Err(e) = json::write_entries(&summary.new_entries, json_path).await {
            error!(path = %json_path.display(), error = %e, "Failed to write JSON entries");
        }
    }

    match report::render(&summary.new_entries, &config.settings, Local::now()) {
        Some(md) => {
            if let Err(e) = report::write_report(&args.report, &md).await {
                error!(path = %args.report.display(), error = %e, "Failed writing digest");
            }
        }
        None => info!("No new articles to report"),
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
