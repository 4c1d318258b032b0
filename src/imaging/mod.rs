//! Image decode/encode seam — pure Rust by default.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Probe** | `image::image_dimensions` |
//! | **Decode** | `image` crate (JPEG, PNG, GIF, BMP, TIFF, WebP) |
//! | **Decode HEIC** | `libheif-rs` behind the `heif` feature |
//! | **Encode** | JPEG at integer quality via `JpegEncoder` |
//! | **EXIF carry-over** | APP1 splice ([`exif_embed`]) |
//!
//! The [`ImageBackend`] trait keeps the compression loop testable against a
//! recording mock; [`RustBackend`] is the only production implementation.

pub mod backend;
pub mod exif_embed;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use rust_backend::RustBackend;
