//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations the pipeline
//! needs: probe (header-only dimensions), load (decode once), and
//! encode_jpeg (re-encode the decoded pixels at a quality level).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend) — pure Rust via the
//! `image` crate, with HEIC decoding available behind the `heif` feature.
//!
//! The decoded image is an associated type so the compression loop can be
//! exercised against a mock that never touches real pixels.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("JPEG encode failed at quality {quality}: {reason}")]
    Encode { quality: u8, reason: String },
}

/// Result of a probe operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `load` runs at most once per source image; `encode_jpeg` runs once per
/// quality attempt against the same decoded pixels. The EXIF block, when
/// present, is passed through verbatim — backends embed it, they never
/// parse it.
pub trait ImageBackend: Sync {
    /// Decoded pixel data, produced by `load` and consumed by `encode_jpeg`.
    type Image;

    /// Get image dimensions without a full decode.
    fn probe(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode the full image.
    fn load(&self, path: &Path) -> Result<Self::Image, BackendError>;

    /// Encode the decoded image as JPEG at `quality` (1–100), embedding the
    /// raw EXIF block when one is given.
    fn encode_jpeg(
        &self,
        image: &Self::Image,
        quality: u8,
        exif: Option<&[u8]>,
    ) -> Result<Vec<u8>, BackendError>;
}
