//! Output formatting and persistence for pipeline artifacts.
//!
//! Supports CSV append/write, JSON chart-data documents, and plain-text
//! reports.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use csv::WriterBuilder;
use std::fs::{self, OpenOptions};
use std::path::Path;

/// One row of a pipeline's run-history log, appended per completed stage.
#[derive(Debug, Serialize)]
pub struct RunRecord {
    pub finished_at: DateTime<Utc>,
    pub stage: &'static str,
    pub rows: usize,
}

impl RunRecord {
    pub fn new(stage: &'static str, rows: usize) -> Self {
        Self {
            finished_at: Utc::now(),
            stage,
            rows,
        }
    }
}

/// Appends a serializable record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending CSV record");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

/// Writes a full table of serializable records to a CSV file, replacing any
/// existing content.
pub fn write_csv<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = records.len(), "CSV written");
    Ok(())
}

/// Writes a chart-data or summary document as pretty-printed JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;

    info!(path = %path.display(), "JSON artifact written");
    Ok(())
}

/// Writes a plain-text report.
pub fn write_report(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "report written");
    Ok(())
}
