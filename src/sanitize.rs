//! Filesystem-safe name tokens.

use std::fmt::Display;

use once_cell::sync::Lazy;
use regex::Regex;

static NON_ALNUM_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9]+").expect("static pattern"));

/// Turn arbitrary text into a token safe for file and directory names.
///
/// The value is stringified, trimmed, and every run of characters other than
/// ASCII letters and digits collapses to a single `_`.
pub fn sanitize<T: Display + ?Sized>(value: &T) -> String {
    let text = value.to_string();
    NON_ALNUM_RUN.replace_all(text.trim(), "_").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn collapses_runs() {
        assert_eq!(sanitize("Intro to X"), "Intro_to_X");
        assert_eq!(sanitize("2024-01-05"), "2024_01_05");
        assert_eq!(sanitize("  O'Brien -- Jr.  "), "O_Brien_Jr_");
    }

    #[test]
    fn non_ascii_letters_are_replaced() {
        assert_eq!(sanitize("José Núñez"), "Jos_N_ez");
    }

    #[test]
    fn stringifies_non_text() {
        assert_eq!(sanitize(&2024), "2024");
        assert_eq!(sanitize(&-3.5), "_3_5");
    }

    #[test]
    fn empty_and_blank() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("   "), "");
    }

    proptest! {
        #[test]
        fn idempotent(s in ".*") {
            let once = sanitize(&s);
            prop_assert_eq!(sanitize(&once), once.clone());
        }

        #[test]
        fn only_safe_chars(s in ".*") {
            let out = sanitize(&s);
            prop_assert!(out.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        }

        #[test]
        fn keeps_alphanumerics(s in "[a-zA-Z0-9]{1,20}") {
            prop_assert_eq!(sanitize(&s), s);
        }
    }
}
