//! Runtime fallback for the *unpatched* model directory.
//!
//! The engine bakes every fix into the `_fixed` copy, so patched models
//! load on transformers 5.x without runtime help. The original directory
//! still targets 4.x, where `TransformersKwargs` does not exist yet; the
//! inference driver embeds this snippet before loading remote code so the
//! renamed symbol resolves under either version.

/// Python back-fill executed by the inference driver at import time.
///
/// Under transformers < 5.0 it aliases `TransformersKwargs` to the old
/// `LossKwargs`; under 5.x it is a no-op.
pub const TRANSFORMERS_KWARGS_BACKFILL: &str = r#"import transformers
from packaging.version import Version

if Version(transformers.__version__) < Version("5.0.0"):
    import transformers.utils as _tu
    if not hasattr(_tu, "TransformersKwargs"):
        _tu.TransformersKwargs = _tu.LossKwargs
"#;
