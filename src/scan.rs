//! Input discovery: recursive walk of the photo library.
//!
//! Finds every image file under the library root, filtered by extension
//! (case-insensitive), skipping hidden files and directories. Results are
//! returned as library-relative paths in sorted order, so runs are
//! reproducible and the optional sampling cap (`--sample N`, a test-mode
//! convenience) selects a stable subset: the first N of the sorted walk.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("input directory not found: {0}")]
    MissingRoot(PathBuf),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Extensions accepted as library images. HEIC/HEIF files are always
/// discovered — they belong to the library even when decoding them needs
/// the `heif` feature.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "bmp", "gif", "heic", "heif", "jpeg", "jpg", "png", "tif", "tiff", "webp",
];

/// Walk `root` and return sorted library-relative paths of all images,
/// optionally capped at the first `sample` entries.
pub fn scan(root: &Path, sample: Option<usize>) -> Result<Vec<PathBuf>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::MissingRoot(root.to_path_buf()));
    }

    let mut images = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_image(entry.path()) {
            continue;
        }
        // strip_prefix cannot fail: every entry is under root
        let rel = entry
            .path()
            .strip_prefix(root)
            .expect("walked entry outside root")
            .to_path_buf();
        images.push(rel);
    }

    images.sort();
    if let Some(cap) = sample {
        images.truncate(cap);
    }
    Ok(images)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
