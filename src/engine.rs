//! Orchestration: stage the destination copy, select candidate files, fold
//! the rule table over each, and report per-file dispositions.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::rules::{self, RewriteRule, RuleError};
use crate::select;
use crate::stage::{self, StageError};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Disposition of a single candidate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOutcome {
    /// The composed rule table produced a net change.
    Patched,
    /// No rule found anything to rewrite.
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub name: String,
    pub outcome: FileOutcome,
}

/// Result of one engine invocation: where the fixed copy lives and what
/// happened to each candidate file, in selection order.
#[derive(Debug, Clone, Serialize)]
pub struct PatchReport {
    pub fixed_dir: PathBuf,
    pub files: Vec<FileReport>,
}

impl PatchReport {
    pub fn patched_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.outcome == FileOutcome::Patched)
            .count()
    }
}

/// Single-threaded, synchronous patch run over one model directory.
pub struct PatchEngine {
    rules: Vec<RewriteRule>,
}

impl PatchEngine {
    /// Engine loaded with the standard transformers-5.x compatibility rules.
    pub fn new() -> Self {
        Self {
            rules: rules::compatibility_rules(),
        }
    }

    /// Engine with a custom rule table; used by tests and callers that
    /// run a subset of the standard table.
    pub fn with_rules(rules: Vec<RewriteRule>) -> Self {
        Self { rules }
    }

    /// Stage `<src_dir>_fixed` and patch every `modeling_*.py` in it.
    ///
    /// The source directory is never mutated. A missing or non-directory
    /// source fails before anything is written. An unreadable or unwritable
    /// candidate file aborts the whole run; partial state is not repaired,
    /// the destination is rebuilt from scratch on the next invocation.
    pub fn run(&self, src_dir: &Path) -> Result<PatchReport, EngineError> {
        let fixed_dir = stage::stage_fixed_copy(src_dir)?;

        let mut files = Vec::new();
        for path in select::modeling_sources(&fixed_dir)? {
            let original = fs::read_to_string(&path).map_err(|source| EngineError::Io {
                path: path.clone(),
                source,
            })?;

            let outcome = match rules::apply_all(&self.rules, &original)? {
                Some(patched) => {
                    write_atomic(&path, patched.as_bytes())?;
                    FileOutcome::Patched
                }
                None => FileOutcome::Skipped,
            };

            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            files.push(FileReport { name, outcome });
        }

        Ok(PatchReport { fixed_dir, files })
    }
}

impl Default for PatchEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Atomic write-back: tempfile in the same directory, fsync, rename.
fn write_atomic(path: &Path, content: &[u8]) -> Result<(), EngineError> {
    let io_err = |source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    };

    let parent = path.parent().ok_or_else(|| {
        io_err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no parent directory",
        ))
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
    temp.write_all(content).map_err(io_err)?;
    temp.as_file().sync_all().map_err(io_err)?;
    temp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}
