//! Output generation for a run's newly seen articles.
//!
//! # Submodules
//!
//! - [`report`]: Renders the Markdown digest grouped by category
//! - [`json`]: Dumps the raw entries as JSON for other tools
//!
//! Delivery of the digest (chat, mail, ...) is left to whoever reads the file.

pub mod json;
pub mod report;
