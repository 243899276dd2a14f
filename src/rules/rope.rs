//! Rotary-position-embedding fixes.
//!
//! transformers 5.0 removed the `'default'` entry from
//! `ROPE_INIT_FUNCTIONS`, and its meta-device loading path can leave
//! non-persistent buffers zeroed instead of restored. Two rules repair the
//! rotary embedding module for both: inline the removed init function as a
//! local fallback, and guard the forward pass against a zeroed `inv_freq`.

use regex::{NoExpand, Regex};

use super::RuleError;

/// The unconditional table lookup emitted by the 4.x-era modeling files.
const ROPE_ASSIGN_PATTERN: &str =
    r"self\.rope_init_fn\s*=\s*ROPE_INIT_FUNCTIONS\[self\.rope_type\]";

/// Introduced only by the fallback block below; its presence means the
/// rewrite is already in place (the block re-contains the original lookup
/// inside its `if` branch, so the matcher alone cannot tell).
const ROPE_FALLBACK_MARKER: &str = "def _default_rope_init";

/// Replacement for the table lookup. Written for the standard 8-space body
/// indentation of the upstream modeling files. The nested function
/// reproduces the removed `'default'` entry exactly: same inverse-frequency
/// formula, same attention scaling factor of 1.0.
const ROPE_FALLBACK: &str = r#"if self.rope_type in ROPE_INIT_FUNCTIONS:
            self.rope_init_fn = ROPE_INIT_FUNCTIONS[self.rope_type]
        else:
            # transformers 5.0 dropped the 'default' entry from ROPE_INIT_FUNCTIONS;
            # recompute the standard inverse frequencies inline instead.
            def _default_rope_init(config, device=None, **kwargs):
                base = config.rope_theta
                head_dim = getattr(config, "head_dim", config.hidden_size // config.num_attention_heads)
                dim = int(head_dim * getattr(config, "partial_rotary_factor", 1.0))
                return (
                    1.0 / (base ** (torch.arange(0, dim, 2, dtype=torch.int64).float().to(device) / dim)),
                    1.0,
                )
            self.rope_init_fn = _default_rope_init"#;

/// Replace the unconditional `ROPE_INIT_FUNCTIONS` lookup with an
/// `if key-in-table / else` block whose else branch recomputes the removed
/// `'default'` initialization from first principles.
pub(super) fn inline_default_rope_init(src: &str) -> Result<Option<String>, RuleError> {
    if src.contains(ROPE_FALLBACK_MARKER) {
        return Ok(None);
    }
    let re = compile("inline-default-rope-init", ROPE_ASSIGN_PATTERN)?;
    if !re.is_match(src) {
        return Ok(None);
    }
    Ok(Some(re.replace_all(src, NoExpand(ROPE_FALLBACK)).into_owned()))
}

/// Start of the inverse-frequency expansion inside the rotary forward pass.
/// Anchored to the line start so the captured indentation can be reused for
/// the inserted guard.
const INV_FREQ_LINE_PATTERN: &str =
    r"(?m)^(?P<indent>[ \t]*)inv_freq_expanded = self\.inv_freq\[None, :, None\]";

/// Introduced only by the guard below.
const INV_FREQ_GUARD_MARKER: &str = "torch.count_nonzero(self.inv_freq) == 0";

/// Prepend a lazy re-initialization guard to the inverse-frequency
/// expansion: if the stored buffer is entirely zero (meta-device
/// materialization does not restore non-persistent buffers), recompute it
/// via the stored init function and re-register it before proceeding. The
/// original expansion line is preserved byte-for-byte after the guard.
pub(super) fn guard_zeroed_inv_freq(src: &str) -> Result<Option<String>, RuleError> {
    if src.contains(INV_FREQ_GUARD_MARKER) {
        return Ok(None);
    }
    let re = compile("reinit-zeroed-inv-freq", INV_FREQ_LINE_PATTERN)?;
    if !re.is_match(src) {
        return Ok(None);
    }
    let rewritten = re.replace_all(src, |caps: &regex::Captures| {
        let indent = &caps["indent"];
        let expansion = &caps[0];
        format!(
            "{indent}if torch.count_nonzero(self.inv_freq) == 0:\n\
             {indent}    # Meta-device loading leaves non-persistent buffers zeroed;\n\
             {indent}    # rebuild inv_freq from the stored init function before use.\n\
             {indent}    inv_freq, self.attention_scaling = self.rope_init_fn(self.config, x.device)\n\
             {indent}    self.register_buffer(\"inv_freq\", inv_freq, persistent=False)\n\
             {expansion}"
        )
    });
    Ok(Some(rewritten.into_owned()))
}

fn compile(rule: &'static str, pattern: &str) -> Result<Regex, RuleError> {
    Regex::new(pattern).map_err(|e| RuleError::InvalidPattern {
        rule,
        message: e.to_string(),
    })
}
