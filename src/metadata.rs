//! Source-image metadata extraction.
//!
//! Builds the immutable [`SourceImage`] view of one input file: byte size,
//! pixel dimensions, the raw EXIF block, and a normalized GPS coordinate.
//! This is the only place EXIF is parsed — the compression loop re-embeds
//! the captured block verbatim and never looks inside it again.
//!
//! ## GPS resolution
//!
//! `kamadak-exif` reads EXIF out of every container this tool accepts
//! (JPEG APP1, TIFF, PNG, WebP, and the HEIF metadata item used by HEIC).
//! Latitude/longitude arrive as degree/minute/second rationals plus
//! hemisphere reference tags and are normalized to signed decimal degrees
//! (south and west negative). A missing reference tag is treated as
//! north/east, matching what phone cameras that omit the tag intend.
//!
//! Absence of GPS tags — or of the whole EXIF block — is a normal state,
//! not an error. Only a file whose pixels cannot be identified at all is
//! unreadable.

use crate::imaging::{BackendError, ImageBackend};
use exif::{In, Tag, Value};
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unreadable image {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
}

/// Normalized GPS coordinate in signed decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsCoord {
    pub latitude: f64,
    pub longitude: f64,
}

/// Immutable view of one input file, created once and read-only afterward.
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// Path relative to the library root; doubles as the output key.
    pub rel_path: PathBuf,
    /// Absolute (or root-joined) path for reads.
    pub path: PathBuf,
    pub byte_size: u64,
    pub width: u32,
    pub height: u32,
    /// Raw EXIF block (TIFF payload), captured exactly once.
    pub exif: Option<Vec<u8>>,
    pub gps: Option<GpsCoord>,
}

impl SourceImage {
    pub fn has_gps(&self) -> bool {
        self.gps.is_some()
    }
}

/// Read everything the pipeline needs to know about `rel_path` in one pass.
pub fn read_source<B: ImageBackend>(
    backend: &B,
    root: &Path,
    rel_path: &Path,
) -> Result<SourceImage, MetadataError> {
    let path = root.join(rel_path);

    let byte_size = fs::metadata(&path)
        .map_err(|source| MetadataError::Io {
            path: path.clone(),
            source,
        })?
        .len();

    let dims = backend.probe(&path).map_err(|e| match e {
        BackendError::Io(source) => MetadataError::Io {
            path: path.clone(),
            source,
        },
        other => MetadataError::Unreadable {
            path: path.clone(),
            reason: other.to_string(),
        },
    })?;

    let (exif, gps) = read_exif(&path);

    Ok(SourceImage {
        rel_path: rel_path.to_path_buf(),
        path,
        byte_size,
        width: dims.width,
        height: dims.height,
        exif,
        gps,
    })
}

/// Extract the raw EXIF block and GPS coordinate. Both default to absent on
/// any failure — metadata problems never make a file unreadable.
fn read_exif(path: &Path) -> (Option<Vec<u8>>, Option<GpsCoord>) {
    let file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) => {
            debug!("cannot open {} for EXIF: {}", path.display(), e);
            return (None, None);
        }
    };
    let exif = match exif::Reader::new().read_from_container(&mut BufReader::new(file)) {
        Ok(e) => e,
        Err(e) => {
            debug!("no EXIF in {}: {}", path.display(), e);
            return (None, None);
        }
    };
    let gps = gps_coordinate(&exif);
    (Some(exif.buf().to_vec()), gps)
}

/// Normalize the GPS tags to a signed decimal-degree pair.
/// Returns None unless both latitude and longitude parse.
fn gps_coordinate(exif: &exif::Exif) -> Option<GpsCoord> {
    let latitude = dms_to_degrees(exif, Tag::GPSLatitude)?
        * hemisphere_sign(exif, Tag::GPSLatitudeRef, b'S');
    let longitude = dms_to_degrees(exif, Tag::GPSLongitude)?
        * hemisphere_sign(exif, Tag::GPSLongitudeRef, b'W');
    Some(GpsCoord {
        latitude,
        longitude,
    })
}

/// Sum the degree/minute/second rationals of a GPS tag into decimal degrees.
/// Writers may store fewer than three components; zero denominators mean the
/// tag is junk and the coordinate is treated as absent.
fn dms_to_degrees(exif: &exif::Exif, tag: Tag) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let Value::Rational(ref parts) = field.value else {
        return None;
    };
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    let mut degrees = 0.0;
    let mut divisor = 1.0;
    for part in parts {
        if part.denom == 0 {
            return None;
        }
        degrees += part.to_f64() / divisor;
        divisor *= 60.0;
    }
    Some(degrees)
}

/// -1.0 when the reference tag names the given negative hemisphere,
/// +1.0 otherwise (including when the tag is missing).
fn hemisphere_sign(exif: &exif::Exif, tag: Tag, negative: u8) -> f64 {
    let is_negative = exif
        .get_field(tag, In::PRIMARY)
        .and_then(|field| match field.value {
            Value::Ascii(ref vecs) => vecs.first().and_then(|v| v.first()).copied(),
            _ => None,
        })
        .is_some_and(|c| c.eq_ignore_ascii_case(&negative));
    if is_negative { -1.0 } else { 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::RustBackend;
    use crate::test_helpers::{gps_exif_tiff, write_noise_jpeg, write_noise_jpeg_with_gps};
    use tempfile::TempDir;

    fn read(root: &Path, rel: &str) -> Result<SourceImage, MetadataError> {
        read_source(&RustBackend::new(), root, Path::new(rel))
    }

    #[test]
    fn reads_dimensions_size_and_gps() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photo.jpg");
        write_noise_jpeg_with_gps(&path, 120, 80, 90, 48.8584, 2.2945);

        let source = read(tmp.path(), "photo.jpg").unwrap();
        assert_eq!((source.width, source.height), (120, 80));
        assert_eq!(source.byte_size, path.metadata().unwrap().len());
        let gps = source.gps.unwrap();
        assert!((gps.latitude - 48.8584).abs() < 1e-4);
        assert!((gps.longitude - 2.2945).abs() < 1e-4);
    }

    #[test]
    fn southern_western_hemispheres_are_negative() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("rio.jpg");
        write_noise_jpeg_with_gps(&path, 32, 32, 90, -22.9519, -43.2105);

        let gps = read(tmp.path(), "rio.jpg").unwrap().gps.unwrap();
        assert!((gps.latitude + 22.9519).abs() < 1e-4);
        assert!((gps.longitude + 43.2105).abs() < 1e-4);
    }

    #[test]
    fn missing_gps_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        write_noise_jpeg(&tmp.path().join("plain.jpg"), 32, 32, 90);

        let source = read(tmp.path(), "plain.jpg").unwrap();
        assert!(source.gps.is_none());
        assert!(source.exif.is_none());
    }

    #[test]
    fn exif_block_is_captured_verbatim() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tagged.jpg");
        write_noise_jpeg_with_gps(&path, 32, 32, 90, 10.5, 20.25);

        let source = read(tmp.path(), "tagged.jpg").unwrap();
        assert_eq!(source.exif.as_deref(), Some(&gps_exif_tiff(10.5, 20.25)[..]));
    }

    #[test]
    fn corrupt_file_is_unreadable() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("bad.jpg"), b"garbage bytes").unwrap();

        let err = read(tmp.path(), "bad.jpg").unwrap_err();
        assert!(matches!(err, MetadataError::Unreadable { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let err = read(tmp.path(), "nope.jpg").unwrap_err();
        assert!(matches!(err, MetadataError::Io { .. }));
    }
}
