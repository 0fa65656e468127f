//! Text normalization.
//!
//! Every comparison in the curator goes through [`normalize`], so matching
//! is insensitive to casing, punctuation, and whitespace in authored text:
//!
//! ```text
//! "  Balanced Score-Card!! " → "balanced-score-card"
//! "R&D / Ops"                → "r-d-ops"
//! ```

/// Separator written in place of every run of non-alphanumeric characters.
pub const SEPARATOR: char = '-';

/// Fold `text` into a comparable token.
///
/// Lower-cases, replaces each run of non-alphanumeric characters with a
/// single [`SEPARATOR`], and trims separators at both ends. Total and
/// idempotent: `normalize(&normalize(x)) == normalize(x)` for every input,
/// including the empty string and pure punctuation (both yield `""`).
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_separator = false;

    for c in lowered.chars() {
        if is_token_char(c) {
            if pending_separator && !out.is_empty() {
                out.push(SEPARATOR);
            }
            pending_separator = false;
            out.push(c);
        } else {
            pending_separator = true;
        }
    }

    out
}

/// Normalize an optional field; `None` and blank text both yield `None`.
pub fn normalize_opt(text: Option<&str>) -> Option<String> {
    text.map(normalize).filter(|t| !t.is_empty())
}

/// A character survives normalization only if it is alphanumeric and
/// already its own lower-case form. Characters whose lower-case mapping
/// expands or changes again are treated as separators, which keeps the
/// function idempotent for all of Unicode.
fn is_token_char(c: char) -> bool {
    if !c.is_alphanumeric() {
        return false;
    }
    let mut lower = c.to_lowercase();
    lower.next() == Some(c) && lower.next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_lowercases_and_joins_words() {
        assert_eq!(normalize("Balanced Scorecard"), "balanced-scorecard");
    }

    #[test]
    fn test_collapses_punctuation_runs() {
        assert_eq!(normalize("R&D  /  Ops"), "r-d-ops");
        assert_eq!(normalize("--Finance--"), "finance");
    }

    #[test]
    fn test_empty_and_punctuation_only() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  ?!,;  "), "");
    }

    #[test]
    fn test_keeps_digits_and_non_ascii_letters() {
        assert_eq!(normalize("ISO 27001"), "iso-27001");
        assert_eq!(normalize("Zürich Office"), "zürich-office");
    }

    #[test]
    fn test_normalize_opt_filters_blank() {
        assert_eq!(normalize_opt(None), None);
        assert_eq!(normalize_opt(Some(" - ")), None);
        assert_eq!(normalize_opt(Some("Deals")), Some("deals".to_string()));
    }

    proptest! {
        #[test]
        fn proptest_normalize_is_idempotent(text in "\\PC{0,64}") {
            let once = normalize(&text);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn proptest_normalize_has_no_edge_or_double_separators(text in "\\PC{0,64}") {
            let token = normalize(&text);
            prop_assert!(!token.starts_with(SEPARATOR));
            prop_assert!(!token.ends_with(SEPARATOR));
            prop_assert!(!token.contains("--"));
        }
    }
}
