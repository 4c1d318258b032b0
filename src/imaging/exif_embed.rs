//! APP1/EXIF segment splicing for JPEG byte streams.
//!
//! The `image` crate's JPEG encoder emits pixel data only; camera metadata
//! must be carried across re-encodes separately. This module inserts a raw
//! EXIF block (the TIFF-structured payload captured at metadata-read time)
//! into an encoded JPEG as an APP1 segment, and can locate an existing APP1
//! for verification.
//!
//! JPEG segment layout reminder:
//!   `FF D8` (SOI), then marker segments `FF xx | len(u16, incl. itself) |
//!   payload`, then entropy-coded data after SOS (`FF DA`).
//! The EXIF APP1 payload is `b"Exif\0\0"` followed by the TIFF block, and
//! convention places it directly after SOI.

use tracing::warn;

const SOI: [u8; 2] = [0xFF, 0xD8];
const APP1: u8 = 0xE1;
const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// A JPEG segment length field is a u16 that counts itself, capping the
/// payload at 65533 bytes.
const MAX_SEGMENT_PAYLOAD: usize = u16::MAX as usize - 2;

/// Insert `exif_tiff` (raw TIFF block, no "Exif\0\0" prefix) as an APP1
/// segment directly after SOI.
///
/// Returns the input unchanged when it is not a JPEG stream or when the
/// block is too large for a single segment — metadata loss is preferable
/// to emitting a malformed file.
pub fn embed_exif(jpeg: &[u8], exif_tiff: &[u8]) -> Vec<u8> {
    if jpeg.len() < 2 || jpeg[..2] != SOI {
        warn!("not a JPEG stream, skipping EXIF embed");
        return jpeg.to_vec();
    }

    let payload_len = EXIF_HEADER.len() + exif_tiff.len();
    if payload_len > MAX_SEGMENT_PAYLOAD {
        warn!(
            bytes = payload_len,
            "EXIF block exceeds a single APP1 segment, dropping metadata"
        );
        return jpeg.to_vec();
    }

    let mut out = Vec::with_capacity(jpeg.len() + payload_len + 4);
    out.extend_from_slice(&SOI);
    out.push(0xFF);
    out.push(APP1);
    out.extend_from_slice(&((payload_len as u16 + 2).to_be_bytes()));
    out.extend_from_slice(EXIF_HEADER);
    out.extend_from_slice(exif_tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// Find the TIFF block of the first EXIF APP1 segment, if any.
///
/// Walks marker segments up to SOS, the same scan the decoder performs.
pub fn find_exif(jpeg: &[u8]) -> Option<&[u8]> {
    if jpeg.len() < 2 || jpeg[..2] != SOI {
        return None;
    }

    let mut pos = 2;
    while pos + 4 <= jpeg.len() {
        if jpeg[pos] != 0xFF {
            return None;
        }
        let marker = jpeg[pos + 1];
        // SOS means entropy-coded data starts; no more metadata segments.
        if marker == 0xDA {
            return None;
        }
        // Standalone markers carry no length field.
        if marker == 0xD8 || marker == 0xD9 || (0xD0..=0xD7).contains(&marker) {
            pos += 2;
            continue;
        }
        let seg_len = u16::from_be_bytes([jpeg[pos + 2], jpeg[pos + 3]]) as usize;
        let payload = jpeg.get(pos + 4..pos + 2 + seg_len)?;
        if marker == APP1 && payload.starts_with(EXIF_HEADER) {
            return Some(&payload[EXIF_HEADER.len()..]);
        }
        pos += 2 + seg_len;
    }
    None
}
