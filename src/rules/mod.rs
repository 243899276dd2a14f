//! The ordered rewrite-rule table applied to every modeling source file.
//!
//! Each rule is a pure text-to-text function over whole-file contents: it
//! either rewrites its target construct or reports no change. Absence of a
//! match is never an error, since not every file contains every construct.
//! Rules are independent and individually idempotent, so the whole table
//! can be
//! re-applied to an already-patched file without producing further changes;
//! rules whose replacement re-contains their own match target carry an
//! explicit already-applied marker check.

mod attention;
mod kwargs;
mod rope;
mod tied_weights;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("rule '{rule}' has an invalid pattern: {message}")]
    InvalidPattern { rule: &'static str, message: String },
}

/// One deterministic text-to-text transformation targeting a specific
/// construct in a modeling source file.
pub struct RewriteRule {
    /// Stable identifier, used in error messages.
    pub id: &'static str,
    /// One-line description of the incompatibility the rule repairs.
    pub summary: &'static str,
    apply: fn(&str) -> Result<Option<String>, RuleError>,
}

impl RewriteRule {
    /// Apply the rule to `src`. `Ok(None)` means the matcher found nothing
    /// to rewrite, or the rewrite is already present.
    pub fn apply(&self, src: &str) -> Result<Option<String>, RuleError> {
        (self.apply)(src)
    }
}

/// The transformers-5.x compatibility rules, in application order. Later
/// rules operate on text already transformed by earlier ones.
pub fn compatibility_rules() -> Vec<RewriteRule> {
    vec![
        RewriteRule {
            id: "rename-loss-kwargs",
            summary: "LossKwargs was renamed to TransformersKwargs in 5.0",
            apply: kwargs::rename_loss_kwargs,
        },
        RewriteRule {
            id: "inline-default-rope-init",
            summary: "'default' was dropped from ROPE_INIT_FUNCTIONS in 5.0",
            apply: rope::inline_default_rope_init,
        },
        RewriteRule {
            id: "tied-weights-keys-to-dict",
            summary: "_tied_weights_keys must be a {target: source} dict in 5.0",
            apply: tied_weights::list_to_dict,
        },
        RewriteRule {
            id: "sdpa-without-enable-gqa",
            summary: "5.0 passes enable_gqa to sdpa, changing non-GQA numerics",
            apply: attention::wrap_sdpa_dispatch,
        },
        RewriteRule {
            id: "reinit-zeroed-inv-freq",
            summary: "meta-device loading leaves inv_freq zeroed in 5.0",
            apply: rope::guard_zeroed_inv_freq,
        },
    ]
}

/// Fold the whole rule table over `src`. Returns the rewritten text when
/// the composition produced any net change, `None` otherwise.
pub fn apply_all(rules: &[RewriteRule], src: &str) -> Result<Option<String>, RuleError> {
    let mut text: Option<String> = None;
    for rule in rules {
        let current = text.as_deref().unwrap_or(src);
        if let Some(rewritten) = rule.apply(current)? {
            text = Some(rewritten);
        }
    }
    Ok(text.filter(|t| t != src))
}
