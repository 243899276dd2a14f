use super::RuleError;

/// Removed in transformers 5.0.
const OLD_NAME: &str = "LossKwargs";
/// Its 5.0 replacement.
const NEW_NAME: &str = "TransformersKwargs";

/// Rename `LossKwargs` to `TransformersKwargs` everywhere it appears.
///
/// This is a plain global substring replace. The old name never occurs as
/// part of an unrelated larger identifier in the modeling corpus, so no
/// word-boundary checking is applied; tests pin that assumption down
/// instead of the rule guarding against it.
pub(super) fn rename_loss_kwargs(src: &str) -> Result<Option<String>, RuleError> {
    if !src.contains(OLD_NAME) {
        return Ok(None);
    }
    Ok(Some(src.replace(OLD_NAME, NEW_NAME)))
}
