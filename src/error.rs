//! Errors that can stop a reader run.
//!
//! Only configuration and state problems live here. Encoding failures, field
//! misses, malformed feeds, and fetch failures are all recovered where they
//! happen and never reach this type.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReaderError {
    /// No configuration file at the given path.
    #[error("configuration file not found: {}", .0.display())]
    ConfigMissing(PathBuf),

    #[error("failed to read configuration {}: {source}", .path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration {}: {message}", .path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error("failed to access state file {}: {source}", .path.display())]
    StateIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {} is corrupt: {source}", .path.display())]
    StateParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize state: {0}")]
    StateEncode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReaderError>;
