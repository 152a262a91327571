//! Filename sanitization.

use unicode_normalization::UnicodeNormalization;

/// Reduce an arbitrary name to the `[A-Za-z0-9_-]` token set.
///
/// The name is NFKD-decomposed and non-ASCII code points are dropped, so
/// accented Latin letters survive as their base letter (`é` -> `e`) while
/// scripts with no ASCII decomposition disappear entirely. Every remaining
/// character outside the token set becomes `_`.
///
/// Empty input, or input made only of dropped characters, yields an empty
/// string; callers pick their own fallback.
pub fn sanitize(name: &str) -> String {
    name.nfkd()
        .filter(char::is_ascii)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Returns true if `name` only contains characters `sanitize` can emit.
pub fn is_sanitized(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_plain_ascii() {
        assert_eq!(sanitize("holiday-photo_01"), "holiday-photo_01");
    }

    #[test]
    fn test_sanitize_strips_accents() {
        assert_eq!(sanitize("café"), "cafe");
        assert_eq!(sanitize("Ångström"), "Angstrom");
        assert_eq!(sanitize("naïve résumé"), "naive_resume");
    }

    #[test]
    fn test_sanitize_drops_untransliterable() {
        // No ASCII decomposition: dropped, not replaced
        assert_eq!(sanitize("日本語"), "");
        assert_eq!(sanitize("фото1"), "1");
        assert_eq!(sanitize("📷shot"), "shot");
    }

    #[test]
    fn test_sanitize_replaces_punctuation() {
        assert_eq!(sanitize("my photo (1).v2"), "my_photo__1__v2");
        assert_eq!(sanitize("../../etc/passwd"), "______etc_passwd");
        assert_eq!(sanitize("a\\b:c*d"), "a_b_c_d");
    }

    #[test]
    fn test_sanitize_compatibility_forms() {
        // Fullwidth letters and ligatures decompose to ASCII
        assert_eq!(sanitize("ＡＢＣ"), "ABC");
        assert_eq!(sanitize("ﬁle"), "file");
    }

    #[test]
    fn test_sanitize_empty() {
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_sanitize_output_alphabet() {
        let inputs = [
            "café.PNG",
            "  spaces  ",
            "tab\there",
            "new\nline",
            "quote\"s",
            "日本語ファイル",
            "ß",
            "Ωmega",
            "x\u{0301}y",
        ];

        for input in inputs {
            let output = sanitize(input);
            assert!(is_sanitized(&output), "{input:?} -> {output:?}");
        }
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let inputs = [
            "café",
            "Résumé 2024 (final).jpg",
            "日本語",
            "already_clean-name",
            "ＡＢＣ",
            "",
            "...",
        ];

        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn test_is_sanitized() {
        assert!(is_sanitized("abc_DEF-123"));
        assert!(is_sanitized(""));
        assert!(!is_sanitized("a b"));
        assert!(!is_sanitized("é"));
    }
}
