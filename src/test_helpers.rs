//! Shared helpers for unit tests: synthetic JPEGs and hand-built EXIF/GPS
//! blocks, so no binary fixtures live in the repository.

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;

/// Deterministic high-frequency noise image — resists JPEG compression, so
/// encoded size responds measurably to the quality setting.
pub fn noise_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let i = (y * width + x).wrapping_mul(2654435761);
        Rgb([i as u8, (i >> 8) as u8, (i >> 16) as u8])
    })
}

pub fn noise_jpeg_bytes(width: u32, height: u32, quality: u8) -> Vec<u8> {
    let img = noise_rgb(width, height);
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(Cursor::new(&mut buf), quality)
        .encode(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

pub fn write_noise_jpeg(path: &Path, width: u32, height: u32, quality: u8) {
    std::fs::write(path, noise_jpeg_bytes(width, height, quality)).unwrap();
}

/// Write a noise JPEG carrying a GPS EXIF block for the given coordinate.
pub fn write_noise_jpeg_with_gps(path: &Path, width: u32, height: u32, quality: u8, lat: f64, lon: f64) {
    let jpeg = crate::imaging::exif_embed::embed_exif(
        &noise_jpeg_bytes(width, height, quality),
        &gps_exif_tiff(lat, lon),
    );
    std::fs::write(path, jpeg).unwrap();
}

/// Build a minimal little-endian TIFF block whose IFD0 carries only a GPS
/// sub-IFD with latitude/longitude rationals and their hemisphere refs.
///
/// Layout (offsets from the TIFF header):
///   0   header "II" 42, IFD0 offset = 8
///   8   IFD0: 1 entry (GPSInfo pointer), next = 0
///   26  GPS IFD: 4 entries (refs + rationals), next = 0
///   80  latitude rationals (3 × num/den)
///   104 longitude rationals
pub fn gps_exif_tiff(lat: f64, lon: f64) -> Vec<u8> {
    const GPS_IFD_OFFSET: u32 = 26;
    const LAT_OFFSET: u32 = 80;
    const LON_OFFSET: u32 = 104;

    let lat_ref = if lat < 0.0 { b'S' } else { b'N' };
    let lon_ref = if lon < 0.0 { b'W' } else { b'E' };

    let mut buf = Vec::with_capacity(128);
    buf.extend_from_slice(b"II");
    buf.extend_from_slice(&42u16.to_le_bytes());
    buf.extend_from_slice(&8u32.to_le_bytes());

    // IFD0
    buf.extend_from_slice(&1u16.to_le_bytes());
    push_entry(&mut buf, 0x8825, 4, 1, GPS_IFD_OFFSET.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());

    // GPS IFD
    buf.extend_from_slice(&4u16.to_le_bytes());
    push_entry(&mut buf, 0x0001, 2, 2, [lat_ref, 0, 0, 0]);
    push_entry(&mut buf, 0x0002, 5, 3, LAT_OFFSET.to_le_bytes());
    push_entry(&mut buf, 0x0003, 2, 2, [lon_ref, 0, 0, 0]);
    push_entry(&mut buf, 0x0004, 5, 3, LON_OFFSET.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());

    debug_assert_eq!(buf.len(), LAT_OFFSET as usize);
    for (num, den) in to_dms(lat.abs()) {
        buf.extend_from_slice(&num.to_le_bytes());
        buf.extend_from_slice(&den.to_le_bytes());
    }
    debug_assert_eq!(buf.len(), LON_OFFSET as usize);
    for (num, den) in to_dms(lon.abs()) {
        buf.extend_from_slice(&num.to_le_bytes());
        buf.extend_from_slice(&den.to_le_bytes());
    }
    buf
}

fn push_entry(buf: &mut Vec<u8>, tag: u16, typ: u16, count: u32, value: [u8; 4]) {
    buf.extend_from_slice(&tag.to_le_bytes());
    buf.extend_from_slice(&typ.to_le_bytes());
    buf.extend_from_slice(&count.to_le_bytes());
    buf.extend_from_slice(&value);
}

/// Decimal degrees → (degrees, minutes, seconds×1000) rationals.
fn to_dms(value: f64) -> [(u32, u32); 3] {
    let degrees = value.floor();
    let minutes = ((value - degrees) * 60.0).floor();
    let seconds = ((value - degrees) * 60.0 - minutes) * 60.0;
    [
        (degrees as u32, 1),
        (minutes as u32, 1),
        ((seconds * 1000.0).round() as u32, 1000),
    ]
}
