//! Batch orchestration.
//!
//! Drives the whole pipeline for one run: scan the library, push every
//! image through metadata → compression → routing, collect one row per
//! image, flush the report, and summarize.
//!
//! ## Parallelism
//!
//! One image is one unit of work, fully independent of every other: no
//! shared mutable state, no locks between workers. Parallel mode fans the
//! sorted input list over a rayon pool (sized by config, capped at core
//! count) and `collect`s per-worker rows — a reduce, not a shared append.
//! Sequential mode walks the same sorted list, so both modes make identical
//! routing and compression decisions; only throughput differs.
//!
//! A slow or failing image never blocks or aborts the others: the per-image
//! timeout is local to its own compression loop, and every failure becomes
//! an error row instead of a crash.

use crate::compress;
use crate::config::{ConfigError, Settings, effective_workers};
use crate::imaging::{ImageBackend, RustBackend};
use crate::metadata::{self, SourceImage};
use crate::report::{self, REPORT_FILE_NAME, ReportError, ResultRow, ResultsRecorder};
use crate::route;
use crate::scan::{self, ScanError};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("scan failed: {0}")]
    Scan(#[from] ScanError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("report error: {0}")]
    Report(#[from] ReportError),
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Progress events streamed to the CLI printer thread.
#[derive(Debug)]
pub enum ProcessEvent {
    Started { total: usize },
    Row(ResultRow),
}

/// Aggregate numbers for one finished run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub total: usize,
    pub compressed: usize,
    pub already_compliant: usize,
    pub timed_out: usize,
    pub failed: usize,
    /// Summed over successfully routed images only.
    pub original_bytes: u64,
    pub final_bytes: u64,
    pub elapsed: Duration,
}

impl RunSummary {
    fn from_rows(rows: &[ResultRow], elapsed: Duration) -> Self {
        let mut summary = Self {
            total: rows.len(),
            compressed: 0,
            already_compliant: 0,
            timed_out: 0,
            failed: 0,
            original_bytes: 0,
            final_bytes: 0,
            elapsed,
        };
        for row in rows {
            if row.is_failure() {
                summary.failed += 1;
                continue;
            }
            match row.outcome {
                "compressed" => summary.compressed += 1,
                "already-compliant" => summary.already_compliant += 1,
                "timed-out" => summary.timed_out += 1,
                _ => {}
            }
            if let (Some(original), Some(fin)) = (row.original_bytes, row.final_bytes) {
                summary.original_bytes += original;
                summary.final_bytes += fin;
            }
        }
        summary
    }

    pub fn saved_bytes(&self) -> u64 {
        self.original_bytes.saturating_sub(self.final_bytes)
    }
}

/// Library inventory for the `check` command: a read-only census.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LibraryInventory {
    pub images: usize,
    pub with_gps: usize,
    pub without_gps: usize,
    pub unreadable: usize,
    /// Summed over readable images.
    pub total_bytes: u64,
}

/// Run the full batch with the production backend.
pub fn run(
    settings: &Settings,
    input_root: &Path,
    output_root: &Path,
    events: Option<Sender<ProcessEvent>>,
) -> Result<RunSummary, ProcessError> {
    run_with_backend(&RustBackend::new(), settings, input_root, output_root, events)
}

/// Run the full batch against a specific backend (allows testing with a mock).
pub fn run_with_backend<B: ImageBackend>(
    backend: &B,
    settings: &Settings,
    input_root: &Path,
    output_root: &Path,
    events: Option<Sender<ProcessEvent>>,
) -> Result<RunSummary, ProcessError> {
    settings.validate()?;
    let started = Instant::now();

    let entries = scan::scan(input_root, settings.sample)?;
    std::fs::create_dir_all(output_root).map_err(|source| ProcessError::Io {
        path: output_root.to_path_buf(),
        source,
    })?;

    // mpsc senders are not Sync; a mutex makes one shareable across workers.
    let events = events.map(Mutex::new);
    let emit = |event: ProcessEvent| {
        if let Some(tx) = &events {
            let _ = tx.lock().unwrap().send(event);
        }
    };
    emit(ProcessEvent::Started {
        total: entries.len(),
    });

    let compression = settings.compression();
    let process_one = |rel: &PathBuf| {
        let row = process_image(backend, &compression, input_root, output_root, rel);
        emit(ProcessEvent::Row(row.clone()));
        row
    };

    let worker_rows = dispatch(settings, &entries, process_one);

    let mut recorder = ResultsRecorder::new();
    recorder.merge(worker_rows);
    let rows = recorder.into_rows();
    report::write_report(&rows, &output_root.join(REPORT_FILE_NAME))?;

    Ok(RunSummary::from_rows(&rows, started.elapsed()))
}

/// Fan `work` over the input list: rayon pool in parallel mode, plain
/// iteration otherwise. Falls back to sequential if the pool cannot start.
fn dispatch<T: Send>(
    settings: &Settings,
    entries: &[PathBuf],
    work: impl Fn(&PathBuf) -> T + Sync,
) -> Vec<T> {
    if settings.parallel && entries.len() > 1 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(effective_workers(settings))
            .build()
        {
            Ok(pool) => return pool.install(|| entries.par_iter().map(&work).collect()),
            Err(e) => warn!("worker pool failed to start ({e}), running sequentially"),
        }
    }
    entries.iter().map(&work).collect()
}

/// The per-image pipeline. Every failure is scoped to this one image and
/// comes back as an error row.
fn process_image<B: ImageBackend>(
    backend: &B,
    compression: &compress::CompressionSettings,
    input_root: &Path,
    output_root: &Path,
    rel: &Path,
) -> ResultRow {
    let source = match metadata::read_source(backend, input_root, rel) {
        Ok(source) => source,
        Err(e) => {
            warn!("skipping {}: {e}", rel.display());
            return ResultRow::failure(rel, file_size(&input_root.join(rel)), e.to_string());
        }
    };

    let result = match compress::run(backend, &source, compression) {
        Ok(result) => result,
        Err(e) => {
            warn!("compression failed for {}: {e}", rel.display());
            let mut row = ResultRow::failure(rel, Some(source.byte_size), e.to_string());
            // Keep the output library complete where we can: the failed
            // image's original still gets its primary copy.
            match route::preserve_original(output_root, &source) {
                Ok(dest) => row.destination = Some(dest.display().to_string()),
                Err(we) => warn!("could not preserve original for {}: {we}", rel.display()),
            }
            return row;
        }
    };

    let decision = route::decide(source.has_gps(), &result, rel);
    match route::write(output_root, &source, &result, &decision) {
        Ok(destination) => ResultRow::success(&source, &result, destination),
        Err(e) => {
            warn!("write failed for {}: {e}", rel.display());
            ResultRow::failure(rel, Some(source.byte_size), e.to_string())
        }
    }
}

fn file_size(path: &Path) -> Option<u64> {
    std::fs::metadata(path).map(|m| m.len()).ok()
}

/// Census of a library for the `check` command: metadata reads only, no
/// writes anywhere.
pub fn inspect<B: ImageBackend>(
    backend: &B,
    settings: &Settings,
    input_root: &Path,
) -> Result<LibraryInventory, ProcessError> {
    settings.validate()?;
    let entries = scan::scan(input_root, settings.sample)?;

    let sources: Vec<Result<SourceImage, ()>> = dispatch(settings, &entries, |rel| {
        metadata::read_source(backend, input_root, rel).map_err(|e| {
            warn!("unreadable {}: {e}", rel.display());
        })
    });

    let mut inventory = LibraryInventory {
        images: entries.len(),
        ..Default::default()
    };
    for source in sources.into_iter().flatten() {
        if source.has_gps() {
            inventory.with_gps += 1;
        } else {
            inventory.without_gps += 1;
        }
        inventory.total_bytes += source.byte_size;
    }
    inventory.unreadable = inventory.images - inventory.with_gps - inventory.without_gps;
    Ok(inventory)
}
