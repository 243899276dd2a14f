//! Attention-dispatch rewrite.
//!
//! transformers 5.0 started passing `enable_gqa` into the registered sdpa
//! kernel, which selects a different numeric code path for models without
//! grouped-query attention and perturbs the logits. Route the sdpa branch
//! through a local wrapper that drops the kwarg, keeping output
//! bit-for-bit consistent with the 4.x path.

use regex::Regex;

use super::RuleError;

/// The two-line dispatch emitted by the 4.x-era modeling files: anything
/// non-eager is looked up in the attention-function registry. Indentation
/// of both lines is captured so the replacement can reuse it.
const DISPATCH_PATTERN: &str = r#"(?m)^(?P<indent>[ \t]*)if self\.config\._attn_implementation != "eager":\n(?P<inner>[ \t]*)attention_interface = ALL_ATTENTION_FUNCTIONS\[self\.config\._attn_implementation\]"#;

/// Introduced only by the replacement below.
const SDPA_WRAPPER_NAME: &str = "_sdpa_attention_no_gqa";

/// Split the dispatch into three branches: eager falls through to the
/// reference implementation exactly as before, sdpa goes through the
/// kwarg-dropping wrapper, and any other named implementation is looked up
/// unchanged.
pub(super) fn wrap_sdpa_dispatch(src: &str) -> Result<Option<String>, RuleError> {
    if src.contains(SDPA_WRAPPER_NAME) {
        return Ok(None);
    }
    let re = Regex::new(DISPATCH_PATTERN).map_err(|e| RuleError::InvalidPattern {
        rule: "sdpa-without-enable-gqa",
        message: e.to_string(),
    })?;
    if !re.is_match(src) {
        return Ok(None);
    }
    let rewritten = re.replace_all(src, |caps: &regex::Captures| {
        let indent = &caps["indent"];
        let inner = &caps["inner"];
        format!(
            "{indent}if self.config._attn_implementation == \"sdpa\":\n\
             {inner}def {SDPA_WRAPPER_NAME}(*args, **kwargs):\n\
             {inner}    # enable_gqa selects a different sdpa code path for\n\
             {inner}    # non-GQA models; drop it to keep 4.x numerics.\n\
             {inner}    kwargs.pop(\"enable_gqa\", None)\n\
             {inner}    return ALL_ATTENTION_FUNCTIONS[\"sdpa\"](*args, **kwargs)\n\
             {inner}attention_interface = {SDPA_WRAPPER_NAME}\n\
             {indent}elif self.config._attn_implementation != \"eager\":\n\
             {inner}attention_interface = ALL_ATTENTION_FUNCTIONS[self.config._attn_implementation]"
        )
    });
    Ok(Some(rewritten.into_owned()))
}
