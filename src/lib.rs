//! Opensci Hotfix: source patcher for transformers 5.x compatibility
//!
//! Given a model snapshot directory, produces a `<dir>_fixed` sibling copy
//! in which every `modeling_*.py` has been rewritten by a fixed, ordered
//! table of idempotent text rules, so the model loads cleanly and generates
//! identically under transformers 5.x.
//!
//! # Architecture
//!
//! Every rewrite is a plain text-to-text rule over whole-file contents.
//! Intelligence lives in the rule matchers, not in orchestration: the
//! engine stages a clean destination copy, folds the rule table over each
//! candidate file, and reports per-file dispositions.
//!
//! # Safety
//!
//! - The source directory is never mutated
//! - The destination is fully replaced on every run (clean-slate retries)
//! - Atomic file write-back (tempfile + fsync + rename)
//! - Every rule is idempotent; re-running the tool is always safe
//!
//! # Example
//!
//! ```no_run
//! use opensci_hotfix::PatchEngine;
//! use std::path::Path;
//!
//! let report = PatchEngine::new().run(Path::new("open-sci-ref-1.7b"))?;
//! println!("{} file(s) patched", report.patched_count());
//! # Ok::<(), opensci_hotfix::EngineError>(())
//! ```

pub mod engine;
pub mod rules;
pub mod select;
pub mod shim;
pub mod stage;

// Re-exports
pub use engine::{EngineError, FileOutcome, FileReport, PatchEngine, PatchReport};
pub use rules::{apply_all, compatibility_rules, RewriteRule, RuleError};
pub use stage::{fixed_destination, stage_fixed_copy, StageError, FIXED_SUFFIX};
