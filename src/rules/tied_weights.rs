//! Weight-tying declaration rewrite.
//!
//! transformers 5.0 requires `_tied_weights_keys` to be a
//! `{target: source}` mapping; the 4.x list form leaves `lm_head`
//! uninitialized at load time.

use regex::Regex;

use super::RuleError;

/// The list-literal form of the declaration, array captured whole.
const TIED_KEYS_PATTERN: &str = r"_tied_weights_keys\s*=\s*(\[[^\]]*\])";

/// Quoted entries inside the captured array.
const QUOTED_ENTRY_PATTERN: &str = r#""([^"]+)""#;

/// Every tied weight in this model family resolves to the embedding matrix.
const TIE_SOURCE: &str = "model.embed_tokens.weight";

/// Convert `_tied_weights_keys = ["a.w", "b.w"]` into
/// `_tied_weights_keys = {"a.w": "model.embed_tokens.weight", ...}`.
///
/// Handles any number of quoted entries including zero (an empty list
/// becomes an empty mapping). Idempotent by construction: the rewritten
/// declaration is a dict literal, which the array matcher cannot re-match.
pub(super) fn list_to_dict(src: &str) -> Result<Option<String>, RuleError> {
    let re = compile(TIED_KEYS_PATTERN)?;
    if !re.is_match(src) {
        return Ok(None);
    }
    let entry_re = compile(QUOTED_ENTRY_PATTERN)?;
    let rewritten = re.replace_all(src, |caps: &regex::Captures| {
        let pairs = entry_re
            .captures_iter(&caps[1])
            .map(|entry| format!("\"{}\": \"{}\"", &entry[1], TIE_SOURCE))
            .collect::<Vec<_>>()
            .join(", ");
        format!("_tied_weights_keys = {{{pairs}}}")
    });
    Ok(Some(rewritten.into_owned()))
}

fn compile(pattern: &str) -> Result<Regex, RuleError> {
    Regex::new(pattern).map_err(|e| RuleError::InvalidPattern {
        rule: "tied-weights-keys-to-dict",
        message: e.to_string(),
    })
}
