//! Command-line interface definitions for Awful RSS Reader.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! File locations can also be provided via environment variables.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the Awful RSS Reader application.
///
/// # Examples
///
/// ```sh
/// # Use rss-feeds.json / rss-state.json / rss-report.md in the current directory
/// awful_rss_reader
///
/// # Explicit locations plus a JSON dump of new entries
/// awful_rss_reader -c ~/.config/rss/feeds.yaml -s ~/.local/state/rss.json \
///     -r ./digest.md --json-output ./new.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Feed configuration file (JSON, or YAML with a .yaml/.yml extension)
    #[arg(short, long, env = "RSS_READER_CONFIG", default_value = "rss-feeds.json")]
    pub config: PathBuf,

    /// State file recording already reported articles
    #[arg(short, long, env = "RSS_READER_STATE", default_value = "rss-state.json")]
    pub state: PathBuf,

    /// Output path for the Markdown digest
    #[arg(short, long, default_value = "rss-report.md")]
    pub report: PathBuf,

    /// Optional output path for a JSON dump of the new entries
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Per-feed fetch timeout in seconds
    #[arg(long, default_value_t = awful_rss_reader::fetch::DEFAULT_TIMEOUT.as_secs())]
    pub timeout_secs: u64,
}
