//! The tabular run report.
//!
//! One [`ResultRow`] per attempted image — successes, timeouts, and
//! failures alike. A failing image becomes an error row, never a dropped
//! one, so the operator can audit exactly which files need manual
//! attention. Rows are accumulated per worker, merged, sorted by relative
//! path for reproducible reports, and flushed once as `report.csv` in the
//! output root.

use crate::compress::{CompressionResult, Outcome};
use crate::metadata::SourceImage;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const REPORT_FILE_NAME: &str = "report.csv";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error writing report: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Flattened record for one attempted image. Field order is column order.
#[derive(Debug, Clone, Serialize)]
pub struct ResultRow {
    pub relative_path: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub has_gps: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub original_bytes: Option<u64>,
    /// Size of the primary library copy (original bytes for compliant and
    /// timed-out images, encoded bytes otherwise).
    pub final_bytes: Option<u64>,
    /// Quality of the last completed encode, where one ran.
    pub final_quality: Option<u8>,
    pub elapsed_secs: f64,
    pub outcome: &'static str,
    pub exceeded_timeout: bool,
    /// Primary destination relative to the output root.
    pub destination: Option<String>,
    pub error: Option<String>,
}

impl ResultRow {
    pub fn success(
        source: &SourceImage,
        result: &CompressionResult,
        destination: PathBuf,
    ) -> Self {
        let final_bytes = match result.outcome {
            Outcome::AlreadyCompliant | Outcome::TimedOut => Some(source.byte_size),
            Outcome::Compressed => result.encoded_len(),
        };
        Self {
            relative_path: source.rel_path.display().to_string(),
            width: Some(source.width),
            height: Some(source.height),
            has_gps: source.has_gps(),
            latitude: source.gps.map(|g| g.latitude),
            longitude: source.gps.map(|g| g.longitude),
            original_bytes: Some(source.byte_size),
            final_bytes,
            final_quality: result.quality,
            elapsed_secs: result.elapsed.as_secs_f64(),
            outcome: result.outcome.as_str(),
            exceeded_timeout: result.outcome == Outcome::TimedOut,
            destination: Some(destination.display().to_string()),
            error: None,
        }
    }

    pub fn failure(rel_path: &Path, original_bytes: Option<u64>, error: String) -> Self {
        Self {
            relative_path: rel_path.display().to_string(),
            width: None,
            height: None,
            has_gps: false,
            latitude: None,
            longitude: None,
            original_bytes,
            final_bytes: None,
            final_quality: None,
            elapsed_secs: 0.0,
            outcome: "failed",
            exceeded_timeout: false,
            destination: None,
            error: Some(error),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Append-only accumulator, merged from per-worker row lists.
#[derive(Default)]
pub struct ResultsRecorder {
    rows: Vec<ResultRow>,
}

impl ResultsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, row: ResultRow) {
        self.rows.push(row);
    }

    pub fn merge(&mut self, rows: Vec<ResultRow>) {
        self.rows.extend(rows);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sorted rows, consuming the recorder. Sort keeps reports stable across
    /// parallel and sequential runs.
    pub fn into_rows(mut self) -> Vec<ResultRow> {
        self.rows
            .sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        self.rows
    }
}

/// Flush all rows as one CSV file.
pub fn write_report(rows: &[ResultRow], path: &Path) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
