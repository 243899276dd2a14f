//! Candidate-file selection.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Model-definition files all share this name prefix.
pub const MODELING_PREFIX: &str = "modeling_";

/// Source-language extension of the candidate files.
pub const SOURCE_EXTENSION: &str = "py";

/// Sorted list of `modeling_*.py` files at the top level of `dir`.
///
/// Only direct children are considered; nested directories are loader
/// internals, never model definitions. Sorting keeps per-file report order
/// reproducible across runs.
pub fn modeling_sources(dir: &Path) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let named_like_model = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(MODELING_PREFIX))
            .unwrap_or(false);
        let has_source_extension =
            path.extension().and_then(|e| e.to_str()) == Some(SOURCE_EXTENSION);
        if named_like_model && has_source_extension {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}
