//! The per-image compression engine.
//!
//! A small explicit state machine over quality attempts:
//!
//! ```text
//!            size ≤ target            ┌──────────────────┐
//! Start ────────────────────────────▶ │ AlreadyCompliant │  (no decode, no encode)
//!   │                                 └──────────────────┘
//!   │ decode once
//!   ▼
//! Searching ── encoded ≤ target, or quality at floor ──▶ Compressed
//!   │  ▲
//!   │  └── step quality down (clamped at the floor), encode again
//!   │
//!   └── deadline passed at an iteration boundary ──▶ TimedOut
//! ```
//!
//! Rules the rest of the pipeline depends on:
//!
//! - The compliant short-circuit runs before any decode, so images already
//!   under budget are never re-encoded (no generation loss).
//! - The deadline is checked once per iteration, **before** each encode. An
//!   encode in flight when the deadline passes completes and becomes the
//!   last completed attempt; if that attempt meets the target it still
//!   counts as `Compressed` — finished work is not discarded.
//! - Size comparisons are inclusive (`≤`), so a file landing exactly on the
//!   budget terminates the loop.
//! - Quality steps down by a fixed amount and clamps at the floor; it never
//!   goes below it and never rises within one image's loop.
//! - An encode error aborts the whole image. The engine never skips one
//!   quality level and continues — that would change which attempt is "last
//!   completed" and silently alter timed-out output.
//! - The original EXIF block is re-embedded verbatim on every attempt; it
//!   is never re-parsed here.

use crate::imaging::{BackendError, ImageBackend};
use crate::metadata::SourceImage;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CompressError {
    #[error("failed to decode source: {0}")]
    Decode(#[source] BackendError),
    #[error("encode failed at quality {quality}: {source}")]
    Encode {
        quality: u8,
        #[source]
        source: BackendError,
    },
}

/// Knobs for one compression run; derived from [`Settings`](crate::config::Settings).
#[derive(Debug, Clone, Copy)]
pub struct CompressionSettings {
    pub target_bytes: u64,
    pub min_quality: u8,
    pub quality_step: u8,
    pub start_quality: u8,
    pub timeout: Duration,
}

/// Terminal state of the quality-search loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Original already satisfied the budget; nothing was encoded.
    AlreadyCompliant,
    /// Loop finished: under budget, or best effort at the quality floor.
    Compressed,
    /// Deadline passed before the loop finished.
    TimedOut,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::AlreadyCompliant => "already-compliant",
            Outcome::Compressed => "compressed",
            Outcome::TimedOut => "timed-out",
        }
    }
}

/// What one image's loop produced.
#[derive(Debug)]
pub struct CompressionResult {
    pub outcome: Outcome,
    /// Bytes of the last completed attempt. None when no encode ran
    /// (AlreadyCompliant, or TimedOut before the first attempt finished).
    pub encoded: Option<Vec<u8>>,
    /// Quality of `encoded`, when present.
    pub quality: Option<u8>,
    pub attempts: u32,
    pub elapsed: Duration,
}

impl CompressionResult {
    pub fn encoded_len(&self) -> Option<u64> {
        self.encoded.as_ref().map(|b| b.len() as u64)
    }
}

enum State {
    Searching { quality: u8 },
    Terminal(Outcome),
}

/// Run the quality-search loop for one image.
pub fn run<B: ImageBackend>(
    backend: &B,
    source: &SourceImage,
    settings: &CompressionSettings,
) -> Result<CompressionResult, CompressError> {
    let started = Instant::now();

    if source.byte_size <= settings.target_bytes {
        debug!(
            path = %source.rel_path.display(),
            size = source.byte_size,
            "already under budget"
        );
        return Ok(CompressionResult {
            outcome: Outcome::AlreadyCompliant,
            encoded: None,
            quality: None,
            attempts: 0,
            elapsed: started.elapsed(),
        });
    }

    let pixels = backend.load(&source.path).map_err(CompressError::Decode)?;

    let mut last: Option<(Vec<u8>, u8)> = None;
    let mut attempts = 0u32;
    let mut state = State::Searching {
        quality: settings.start_quality,
    };

    let outcome = loop {
        match state {
            State::Terminal(outcome) => break outcome,
            State::Searching { quality } => {
                if started.elapsed() > settings.timeout {
                    state = State::Terminal(Outcome::TimedOut);
                    continue;
                }

                let encoded = backend
                    .encode_jpeg(&pixels, quality, source.exif.as_deref())
                    .map_err(|source| CompressError::Encode { quality, source })?;
                attempts += 1;
                let size = encoded.len() as u64;
                debug!(
                    path = %source.rel_path.display(),
                    quality,
                    size,
                    target = settings.target_bytes,
                    "attempt"
                );
                last = Some((encoded, quality));

                state = if size <= settings.target_bytes || quality <= settings.min_quality {
                    State::Terminal(Outcome::Compressed)
                } else {
                    State::Searching {
                        quality: next_quality(quality, settings),
                    }
                };
            }
        }
    };

    let (encoded, quality) = match last {
        Some((bytes, q)) => (Some(bytes), Some(q)),
        None => (None, None),
    };

    Ok(CompressionResult {
        outcome,
        encoded,
        quality,
        attempts,
        elapsed: started.elapsed(),
    })
}

/// Step down by the configured amount, clamped at the floor.
fn next_quality(quality: u8, settings: &CompressionSettings) -> u8 {
    quality
        .saturating_sub(settings.quality_step)
        .max(settings.min_quality)
}
