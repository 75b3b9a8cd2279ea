//! Internal helpers for input normalisation.
//!
//! These utilities are **not** part of the public API. They centralise the
//! validation rules so stores and reports agree on what a name is.

use unicode_normalization::UnicodeNormalization;

use crate::{EngineError, ResultEngine};

/// Trim a required name, rejecting blank input.
pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim optional text, mapping blank input to `None`.
pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Comparison key for a category label: NFKC, lowercase, single spaces.
///
/// Returns `None` for blank labels.
pub(crate) fn normalize_category_key(value: &str) -> Option<String> {
    let folded: String = value.nfkc().collect::<String>().to_lowercase();
    let key = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    (!key.is_empty()).then_some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_key_folds_case_width_and_spaces() {
        assert_eq!(normalize_category_key("  Food "), Some("food".to_string()));
        assert_eq!(
            normalize_category_key("Eating   Out"),
            Some("eating out".to_string())
        );
        // Full-width letters fold to ASCII under NFKC.
        assert_eq!(normalize_category_key("ＦＯＯＤ"), Some("food".to_string()));
        assert_eq!(normalize_category_key("   "), None);
    }

    #[test]
    fn required_name_rejects_blank() {
        assert_eq!(
            normalize_required_name("  ", "participant"),
            Err(EngineError::InvalidName(
                "participant name must not be empty".to_string()
            ))
        );
        assert_eq!(normalize_required_name(" Ann ", "participant").unwrap(), "Ann");
    }

    #[test]
    fn optional_text_drops_blank() {
        assert_eq!(normalize_optional_text(Some("  ")), None);
        assert_eq!(normalize_optional_text(None), None);
        assert_eq!(normalize_optional_text(Some(" x ")), Some("x".to_string()));
    }
}
