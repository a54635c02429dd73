//! JSON dump of newly seen articles.
//!
//! Lets other tools pick up a run's results without parsing the Markdown
//! digest. The file holds an array of [`NewEntry`] objects in report order.

use crate::models::NewEntry;
use crate::utils::ensure_parent_dir;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `entries` as pretty-printed JSON to `path`.
///
/// An empty run still writes `[]` so consumers can tell "nothing new" from
/// "did not run".
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = entries.len()))]
pub async fn write_entries(entries: &[NewEntry], path: &Path) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(entries)?;

    if let Err(e) = ensure_parent_dir(path).await {
        error!(error = %e, "Failed to create JSON output dir");
        return Err(e);
    }

    fs::write(path, json).await?;
    info!("Wrote JSON entries");
    Ok(())
}
