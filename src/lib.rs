//! # photo-shrink
//!
//! Batch photo-library compressor. Walks a library of photos, re-encodes
//! every image that exceeds a size budget at step-wise decreasing JPEG
//! quality, and sorts the results by GPS presence — so the output splits
//! into a geotagged library and a `missing-locations/` pile, with anything
//! that blew its per-image time budget parked in `problem-photos/` for
//! manual attention.
//!
//! # Architecture: One Pass, Independent Images
//!
//! ```text
//! scan       library/          →  sorted input list
//! per image  metadata → compress → route   (independent, parallelizable)
//! report     merged rows       →  report.csv
//! ```
//!
//! Each image is a self-contained unit of work: read its metadata once, run
//! the bounded quality-search loop, write its routed copy. Workers share
//! nothing mutable; per-worker row lists merge at the end. This keeps
//! sequential and parallel runs byte-identical — only throughput differs —
//! and means one corrupt or slow file can never take the batch down.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | discovers input images (recursive walk, extension filter, sampling) |
//! | [`metadata`] | one-shot EXIF/GPS + dimension read per image |
//! | [`compress`] | the quality-search state machine with its wall-clock budget |
//! | [`route`] | maps (GPS, outcome) to destinations and performs the writes |
//! | [`report`] | per-image result rows, merged and flushed as CSV |
//! | [`process`] | orchestration: dispatch, worker pool, summary |
//! | [`config`] | the `Settings` struct, TOML loading, validation |
//! | [`imaging`] | decode/encode seam behind the `ImageBackend` trait |
//! | [`output`] | CLI display formatting for progress, summary, and census |
//!
//! # Design Decisions
//!
//! ## Originals Are Sacred
//!
//! The tool never modifies the input library, and the output library is
//! always complete: every readable input has exactly one copy across the
//! output root and `missing-locations/`, chosen only by GPS presence. A
//! timed-out image contributes its *original* bytes there — a half-finished
//! compression never replaces a photo. `problem-photos/` is strictly
//! additional. Nothing is ever silently overwritten.
//!
//! ## EXIF Is Read Once, Carried Verbatim
//!
//! Camera metadata is parsed a single time per image. The raw block rides
//! through every re-encode as an opaque APP1 payload, so GPS tags survive
//! compression and the hot loop never touches a parser.
//!
//! ## Pure Rust By Default
//!
//! Decoding and encoding go through the `image` crate — no ImageMagick, no
//! system libraries, a single static binary. The one exception is HEIC,
//! whose only practical decoder is libheif; it sits behind the opt-in
//! `heif` cargo feature so the default build stays dependency-free.

pub mod compress;
pub mod config;
pub mod imaging;
pub mod metadata;
pub mod output;
pub mod process;
pub mod report;
pub mod route;
pub mod scan;

#[cfg(test)]
pub(crate) mod test_helpers;
