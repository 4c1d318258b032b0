//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Probe dimensions | `image::image_dimensions` (header only) |
//! | Decode (JPEG, PNG, GIF, BMP, TIFF, WebP) | `image` crate decoders |
//! | Decode (HEIC/HEIF) | `libheif-rs`, behind the `heif` feature |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at quality 1–100 |
//! | EXIF carry-over | [`exif_embed`](super::exif_embed) APP1 splice |
//!
//! Alpha and palette images are flattened onto a white background before
//! JPEG encoding, since JPEG has no alpha channel.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::exif_embed;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageReader, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn is_heif(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("heic") || e.eq_ignore_ascii_case("heif"))
}

fn decode_err(path: &Path, reason: impl ToString) -> BackendError {
    BackendError::Decode {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Flatten any decoded image to RGB8, compositing alpha onto white.
fn flatten_to_rgb(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.into_rgb8();
    }
    let rgba = img.into_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgb = RgbImage::new(width, height);
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = pixel[3] as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        rgb.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }
    rgb
}

#[cfg(feature = "heif")]
mod heif {
    use super::*;
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    fn context(path: &Path) -> Result<HeifContext<'static>, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| super::decode_err(path, "non-UTF-8 path"))?;
        HeifContext::read_from_file(path_str).map_err(|e| super::decode_err(path, e))
    }

    pub fn probe(path: &Path) -> Result<Dimensions, BackendError> {
        let ctx = context(path)?;
        let handle = ctx
            .primary_image_handle()
            .map_err(|e| super::decode_err(path, e))?;
        Ok(Dimensions {
            width: handle.width(),
            height: handle.height(),
        })
    }

    pub fn decode(path: &Path) -> Result<RgbImage, BackendError> {
        let lib_heif = LibHeif::new();
        let ctx = context(path)?;
        let handle = ctx
            .primary_image_handle()
            .map_err(|e| super::decode_err(path, e))?;
        let decoded = lib_heif
            .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
            .map_err(|e| super::decode_err(path, e))?;
        let planes = decoded.planes();
        let plane = planes
            .interleaved
            .ok_or_else(|| super::decode_err(path, "no interleaved RGB plane"))?;

        let (width, height) = (plane.width, plane.height);
        let stride = plane.stride;
        let row_bytes = width as usize * 3;
        let mut buf = Vec::with_capacity(row_bytes * height as usize);
        for y in 0..height as usize {
            let start = y * stride;
            buf.extend_from_slice(&plane.data[start..start + row_bytes]);
        }
        RgbImage::from_raw(width, height, buf)
            .ok_or_else(|| super::decode_err(path, "decoded plane size mismatch"))
    }
}

#[cfg(not(feature = "heif"))]
mod heif {
    use super::*;

    const NOT_COMPILED: &str = "HEIC support not compiled in - enable the `heif` feature";

    pub fn probe(path: &Path) -> Result<Dimensions, BackendError> {
        Err(super::decode_err(path, NOT_COMPILED))
    }

    pub fn decode(path: &Path) -> Result<RgbImage, BackendError> {
        Err(super::decode_err(path, NOT_COMPILED))
    }
}

impl ImageBackend for RustBackend {
    type Image = RgbImage;

    fn probe(&self, path: &Path) -> Result<Dimensions, BackendError> {
        if is_heif(path) {
            return heif::probe(path);
        }
        let (width, height) = image::image_dimensions(path).map_err(|e| decode_err(path, e))?;
        Ok(Dimensions { width, height })
    }

    fn load(&self, path: &Path) -> Result<Self::Image, BackendError> {
        if is_heif(path) {
            return heif::decode(path);
        }
        let img = ImageReader::open(path)
            .map_err(BackendError::Io)?
            .decode()
            .map_err(|e| decode_err(path, e))?;
        Ok(flatten_to_rgb(img))
    }

    fn encode_jpeg(
        &self,
        image: &Self::Image,
        quality: u8,
        exif: Option<&[u8]>,
    ) -> Result<Vec<u8>, BackendError> {
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(Cursor::new(&mut buf), quality)
            .encode(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| BackendError::Encode {
                quality,
                reason: e.to_string(),
            })?;

        Ok(match exif {
            Some(block) => exif_embed::embed_exif(&buf, block),
            None => buf,
        })
    }
}
