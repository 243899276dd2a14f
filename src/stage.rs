//! Directory staging: produce the `<src>_fixed` sibling copy that receives
//! the in-place rewrites.
//!
//! The destination is fully removed and recreated on every run. There are
//! no incremental or merge semantics; a failed run is retried from a clean
//! slate, never repaired in place.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

/// Suffix appended to the source directory name to form the destination.
pub const FIXED_SUFFIX: &str = "_fixed";

#[derive(Error, Debug)]
pub enum StageError {
    #[error("model directory not found: {0}")]
    NotFound(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Destination path for a source directory: the source name with
/// [`FIXED_SUFFIX`] appended, as a sibling under the same parent.
pub fn fixed_destination(src_dir: &Path) -> PathBuf {
    let mut name = src_dir
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(FIXED_SUFFIX);
    src_dir.with_file_name(name)
}

/// Verify the source directory, clear any previous destination, and copy
/// the whole tree. Returns the destination path.
///
/// Fails with [`StageError::NotFound`] before anything is written if the
/// source is missing or not a directory.
pub fn stage_fixed_copy(src_dir: &Path) -> Result<PathBuf, StageError> {
    if !src_dir.is_dir() {
        return Err(StageError::NotFound(src_dir.to_path_buf()));
    }

    let fixed_dir = fixed_destination(src_dir);
    if fixed_dir.exists() {
        fs::remove_dir_all(&fixed_dir).map_err(|source| StageError::Io {
            path: fixed_dir.clone(),
            source,
        })?;
    }

    copy_tree(src_dir, &fixed_dir)?;
    Ok(fixed_dir)
}

fn copy_tree(src: &Path, dest: &Path) -> Result<(), StageError> {
    for entry in WalkDir::new(src) {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .expect("walkdir entries are rooted at src");
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|source| StageError::Io {
                path: target.clone(),
                source,
            })?;
        } else {
            fs::copy(entry.path(), &target).map_err(|source| StageError::Io {
                path: target.clone(),
                source,
            })?;
        }
    }
    Ok(())
}
