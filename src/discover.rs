//! File discovery: recursive enumeration of `.json` files under a data root.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::warn;
use walkdir::WalkDir;

/// Collect every `.json` file under `root`, at any depth, as absolute paths
/// in traversal order. Zero matches is a normal outcome, and so is a root
/// that does not exist yet (the loader just has nothing to do).
pub fn json_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        warn!("data root {} does not exist; nothing to do", root.display());
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        files.push(fs::canonicalize(entry.path())?);
    }
    Ok(files)
}
