//! Run report persistence and aggregate dumps.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::sync::SyncSummary;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// Logs any serializable value as pretty-printed JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Appends a [`SyncSummary`] as a row to a CSV report.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &Path, summary: &SyncSummary) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending run report");

    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("Failed to open report '{}'", path.display()))?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // headers only on the first run
        .from_writer(file);

    writer.serialize(summary)?;
    writer.flush()?;

    Ok(())
}
