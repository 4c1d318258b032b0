//! Outcome routing: which bytes land where.
//!
//! A pure decision step ([`decide`]) followed by the only write step in the
//! pipeline ([`write`]). The decision is a function of GPS presence and the
//! compression outcome:
//!
//! | GPS | outcome | primary | secondary |
//! |---|---|---|---|
//! | yes | compliant / compressed | output root | — |
//! | no  | compliant / compressed | `missing-locations/` | — |
//! | any | timed out | same primary, **original** bytes | `problem-photos/`, partial bytes |
//!
//! Every input ends up with exactly one primary copy across
//! {root, `missing-locations/`} — the complete-library guarantee. Timed-out
//! images keep their original bytes in the primary spot; the partial encode
//! goes to `problem-photos/` only when at least one attempt completed.
//!
//! Destinations are namespaced by the input's library-relative path, never
//! flattened to basenames. Re-encodes of non-JPEG sources take a `.jpg`
//! extension. An already-existing destination is a write failure for that
//! image; nothing is ever silently overwritten. Directories are created
//! lazily per write and tolerate concurrent creation.

use crate::compress::{CompressionResult, Outcome};
use crate::metadata::SourceImage;
use std::fs::{self, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MISSING_LOCATIONS_DIR: &str = "missing-locations";
pub const PROBLEM_PHOTOS_DIR: &str = "problem-photos";

#[derive(Error, Debug)]
pub enum RouteError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        source: io::Error,
    },
    #[error("destination already exists: {0}")]
    DestinationExists(PathBuf),
    #[error("no encoded bytes to write for {0}")]
    MissingEncoded(PathBuf),
}

/// Which of the two compliant-library folders holds the primary copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryDir {
    Root,
    MissingLocations,
}

/// Which bytes the primary copy carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryBytes {
    Original,
    Encoded,
}

/// Routing for one image: computed once, consumed immediately by [`write`].
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingDecision {
    pub primary_dir: PrimaryDir,
    pub primary_rel: PathBuf,
    pub primary_bytes: PrimaryBytes,
    /// Relative path under `problem-photos/`; Some only for TimedOut with a
    /// completed partial attempt.
    pub problem_rel: Option<PathBuf>,
}

impl RoutingDecision {
    /// Primary destination relative to the output root (report column).
    pub fn primary_display(&self) -> PathBuf {
        match self.primary_dir {
            PrimaryDir::Root => self.primary_rel.clone(),
            PrimaryDir::MissingLocations => Path::new(MISSING_LOCATIONS_DIR).join(&self.primary_rel),
        }
    }
}

/// Pure routing decision for one image.
pub fn decide(has_gps: bool, result: &CompressionResult, rel_path: &Path) -> RoutingDecision {
    let primary_dir = if has_gps {
        PrimaryDir::Root
    } else {
        PrimaryDir::MissingLocations
    };

    match result.outcome {
        Outcome::AlreadyCompliant => RoutingDecision {
            primary_dir,
            primary_rel: rel_path.to_path_buf(),
            primary_bytes: PrimaryBytes::Original,
            problem_rel: None,
        },
        Outcome::Compressed => RoutingDecision {
            primary_dir,
            primary_rel: jpeg_name(rel_path),
            primary_bytes: PrimaryBytes::Encoded,
            problem_rel: None,
        },
        Outcome::TimedOut => RoutingDecision {
            primary_dir,
            primary_rel: rel_path.to_path_buf(),
            primary_bytes: PrimaryBytes::Original,
            problem_rel: result.encoded.is_some().then(|| jpeg_name(rel_path)),
        },
    }
}

/// Perform the writes for a decision. Returns the primary destination
/// relative to the output root.
pub fn write(
    output_root: &Path,
    source: &SourceImage,
    result: &CompressionResult,
    decision: &RoutingDecision,
) -> Result<PathBuf, RouteError> {
    write_decision(output_root, source, result.encoded.as_deref(), decision)
}

/// Best-effort fallback when compression fails outright: copy the original
/// into its primary spot so the output library stays complete, and record
/// where it went.
pub fn preserve_original(output_root: &Path, source: &SourceImage) -> Result<PathBuf, RouteError> {
    let decision = RoutingDecision {
        primary_dir: if source.has_gps() {
            PrimaryDir::Root
        } else {
            PrimaryDir::MissingLocations
        },
        primary_rel: source.rel_path.clone(),
        primary_bytes: PrimaryBytes::Original,
        problem_rel: None,
    };
    write_decision(output_root, source, None, &decision)
}

fn write_decision(
    output_root: &Path,
    source: &SourceImage,
    encoded: Option<&[u8]>,
    decision: &RoutingDecision,
) -> Result<PathBuf, RouteError> {
    let primary_abs = match decision.primary_dir {
        PrimaryDir::Root => output_root.join(&decision.primary_rel),
        PrimaryDir::MissingLocations => output_root
            .join(MISSING_LOCATIONS_DIR)
            .join(&decision.primary_rel),
    };

    match decision.primary_bytes {
        PrimaryBytes::Original => {
            let reader = fs::File::open(&source.path).map_err(|e| RouteError::Io {
                path: source.path.clone(),
                source: e,
            })?;
            write_new(&primary_abs, reader)?;
        }
        PrimaryBytes::Encoded => {
            let bytes =
                encoded.ok_or_else(|| RouteError::MissingEncoded(source.rel_path.clone()))?;
            write_new(&primary_abs, bytes)?;
        }
    }

    if let Some(ref problem_rel) = decision.problem_rel {
        let bytes = encoded.ok_or_else(|| RouteError::MissingEncoded(source.rel_path.clone()))?;
        write_new(&output_root.join(PROBLEM_PHOTOS_DIR).join(problem_rel), bytes)?;
    }

    Ok(decision.primary_display())
}

/// Re-encoded outputs are JPEG; swap the extension unless it already says so.
fn jpeg_name(rel: &Path) -> PathBuf {
    match rel.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg") => {
            rel.to_path_buf()
        }
        _ => rel.with_extension("jpg"),
    }
}

/// Create parent directories, then write `contents` to a file that must not
/// already exist. `create_new` makes the existence check and the create one
/// atomic step, so concurrent workers cannot clobber each other.
fn write_new(dest: &Path, mut contents: impl Read) -> Result<(), RouteError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| RouteError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                RouteError::DestinationExists(dest.to_path_buf())
            } else {
                RouteError::Io {
                    path: dest.to_path_buf(),
                    source: e,
                }
            }
        })?;
    io::copy(&mut contents, &mut file).map_err(|e| RouteError::Io {
        path: dest.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn result(outcome: Outcome, encoded: Option<Vec<u8>>) -> CompressionResult {
        let quality = encoded.as_ref().map(|_| 80);
        CompressionResult {
            outcome,
            encoded,
            quality,
            attempts: 0,
            elapsed: Duration::ZERO,
        }
    }

    fn source(dir: &Path, rel: &str, bytes: &[u8]) -> SourceImage {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, bytes).unwrap();
        SourceImage {
            rel_path: PathBuf::from(rel),
            path,
            byte_size: bytes.len() as u64,
            width: 100,
            height: 100,
            exif: None,
            gps: None,
        }
    }

    // =========================================================================
    // decide(): the full (gps x outcome) matrix
    // =========================================================================

    #[test]
    fn gps_selects_root_no_gps_selects_missing_locations() {
        let r = result(Outcome::Compressed, Some(vec![1]));
        let rel = Path::new("a/photo.jpg");
        assert_eq!(decide(true, &r, rel).primary_dir, PrimaryDir::Root);
        assert_eq!(
            decide(false, &r, rel).primary_dir,
            PrimaryDir::MissingLocations
        );
    }

    #[test]
    fn compliant_routes_original_bytes_under_original_name() {
        let r = result(Outcome::AlreadyCompliant, None);
        let d = decide(false, &r, Path::new("a/small.png"));
        assert_eq!(d.primary_bytes, PrimaryBytes::Original);
        assert_eq!(d.primary_rel, PathBuf::from("a/small.png"));
        assert_eq!(d.problem_rel, None);
    }

    #[test]
    fn compressed_routes_encoded_bytes_as_jpeg() {
        let r = result(Outcome::Compressed, Some(vec![1]));
        let d = decide(true, &r, Path::new("a/scan.tiff"));
        assert_eq!(d.primary_bytes, PrimaryBytes::Encoded);
        assert_eq!(d.primary_rel, PathBuf::from("a/scan.jpg"));
        assert_eq!(d.problem_rel, None);
    }

    #[test]
    fn jpeg_sources_keep_their_exact_name() {
        let r = result(Outcome::Compressed, Some(vec![1]));
        let d = decide(true, &r, Path::new("a/IMG.JPEG"));
        assert_eq!(d.primary_rel, PathBuf::from("a/IMG.JPEG"));
    }

    #[test]
    fn timed_out_keeps_original_primary_and_adds_problem_copy() {
        let r = result(Outcome::TimedOut, Some(vec![1]));
        for has_gps in [true, false] {
            let d = decide(has_gps, &r, Path::new("slow.heic"));
            assert_eq!(d.primary_bytes, PrimaryBytes::Original);
            assert_eq!(d.primary_rel, PathBuf::from("slow.heic"));
            assert_eq!(d.problem_rel, Some(PathBuf::from("slow.jpg")));
        }
    }

    #[test]
    fn timed_out_without_partial_has_no_problem_copy() {
        let r = result(Outcome::TimedOut, None);
        let d = decide(true, &r, Path::new("slow.jpg"));
        assert_eq!(d.primary_bytes, PrimaryBytes::Original);
        assert_eq!(d.problem_rel, None);
    }

    // =========================================================================
    // write()
    // =========================================================================

    #[test]
    fn compliant_copy_is_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let (lib, out) = (tmp.path().join("lib"), tmp.path().join("out"));
        let src = source(&lib, "nested/dir/small.jpg", b"original-bytes");
        let r = result(Outcome::AlreadyCompliant, None);
        let d = decide(false, &r, &src.rel_path);

        let dest = write(&out, &src, &r, &d).unwrap();
        assert_eq!(dest, PathBuf::from("missing-locations/nested/dir/small.jpg"));
        assert_eq!(
            fs::read(out.join(&dest)).unwrap(),
            b"original-bytes".to_vec()
        );
    }

    #[test]
    fn compressed_write_lands_encoded_bytes_in_root() {
        let tmp = TempDir::new().unwrap();
        let (lib, out) = (tmp.path().join("lib"), tmp.path().join("out"));
        let src = source(&lib, "big.png", b"source");
        let r = result(Outcome::Compressed, Some(b"encoded".to_vec()));
        let d = decide(true, &r, &src.rel_path);

        let dest = write(&out, &src, &r, &d).unwrap();
        assert_eq!(dest, PathBuf::from("big.jpg"));
        assert_eq!(fs::read(out.join("big.jpg")).unwrap(), b"encoded".to_vec());
        assert!(!out.join(MISSING_LOCATIONS_DIR).exists());
    }

    #[test]
    fn timed_out_writes_original_primary_and_partial_problem_copy() {
        let tmp = TempDir::new().unwrap();
        let (lib, out) = (tmp.path().join("lib"), tmp.path().join("out"));
        let src = source(&lib, "trip/slow.jpg", b"full-original");
        let r = result(Outcome::TimedOut, Some(b"partial".to_vec()));
        let d = decide(false, &r, &src.rel_path);

        write(&out, &src, &r, &d).unwrap();
        assert_eq!(
            fs::read(out.join("missing-locations/trip/slow.jpg")).unwrap(),
            b"full-original".to_vec()
        );
        assert_eq!(
            fs::read(out.join("problem-photos/trip/slow.jpg")).unwrap(),
            b"partial".to_vec()
        );
    }

    #[test]
    fn timed_out_without_partial_creates_no_problem_dir() {
        let tmp = TempDir::new().unwrap();
        let (lib, out) = (tmp.path().join("lib"), tmp.path().join("out"));
        let src = source(&lib, "slow.jpg", b"full-original");
        let r = result(Outcome::TimedOut, None);
        let d = decide(true, &r, &src.rel_path);

        write(&out, &src, &r, &d).unwrap();
        assert!(out.join("slow.jpg").exists());
        assert!(!out.join(PROBLEM_PHOTOS_DIR).exists());
    }

    #[test]
    fn existing_destination_is_refused_not_overwritten() {
        let tmp = TempDir::new().unwrap();
        let (lib, out) = (tmp.path().join("lib"), tmp.path().join("out"));
        let src = source(&lib, "dup.jpg", b"new");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("dup.jpg"), b"pre-existing").unwrap();

        let r = result(Outcome::Compressed, Some(b"new".to_vec()));
        let d = decide(true, &r, &src.rel_path);
        let err = write(&out, &src, &r, &d).unwrap_err();

        assert!(matches!(err, RouteError::DestinationExists(_)));
        assert_eq!(fs::read(out.join("dup.jpg")).unwrap(), b"pre-existing");
    }

    #[test]
    fn preserve_original_keeps_the_library_complete() {
        let tmp = TempDir::new().unwrap();
        let (lib, out) = (tmp.path().join("lib"), tmp.path().join("out"));
        let src = source(&lib, "albums/fragile.jpg", b"the-original");

        let dest = preserve_original(&out, &src).unwrap();
        assert_eq!(dest, PathBuf::from("missing-locations/albums/fragile.jpg"));
        assert_eq!(
            fs::read(out.join(&dest)).unwrap(),
            b"the-original".to_vec()
        );
    }

    #[test]
    fn compressed_without_bytes_is_an_internal_error() {
        let tmp = TempDir::new().unwrap();
        let (lib, out) = (tmp.path().join("lib"), tmp.path().join("out"));
        let src = source(&lib, "x.jpg", b"src");
        let r = result(Outcome::Compressed, None);
        let d = RoutingDecision {
            primary_dir: PrimaryDir::Root,
            primary_rel: PathBuf::from("x.jpg"),
            primary_bytes: PrimaryBytes::Encoded,
            problem_rel: None,
        };
        assert!(matches!(
            write(&out, &src, &r, &d).unwrap_err(),
            RouteError::MissingEncoded(_)
        ));
    }
}
