//! File Discovery Module
//!
//! Walks the input tree and collects TIFF files. Unlike a best-effort scan, any
//! traversal error aborts discovery: a run must not start on a partial listing.

use crate::errors::ConfigError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const TIFF_EXTENSIONS: &[&str] = &["tif", "tiff"];

pub fn get_extension_lowercase(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    let ext = get_extension_lowercase(path);
    extensions.contains(&ext.as_str())
}

pub fn is_tiff(path: &Path) -> bool {
    has_extension(path, TIFF_EXTENSIONS)
}

/// Every regular `.tif`/`.tiff` file under `root`, in traversal order.
///
/// Symlinks are not followed, so each file is listed exactly once even when
/// the tree contains link cycles.
pub fn collect_tiff_files(root: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && is_tiff(entry.path()) {
            files.push(entry.into_path());
        }
    }

    tracing::debug!(root = %root.display(), count = files.len(), "TIFF discovery finished");
    Ok(files)
}
