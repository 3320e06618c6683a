//! Décomposition des labels Proxmox (`"web;prod"` -> `{"prod", "web"}`).

use std::collections::BTreeSet;

pub const DELIMITER: char = ';';

/// Découpe un champ `tags` brut en ensemble de labels.
/// Tokens trimés, vides ignorés, doublons fusionnés ; absent ou vide -> ensemble vide.
pub fn decompose(raw: Option<&str>) -> BTreeSet<String> {
    raw.unwrap_or_default()
        .split(DELIMITER)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Forme inverse, dans l'ordre stable de l'ensemble.
pub fn join(labels: &BTreeSet<String>) -> String {
    labels.iter().map(String::as_str).collect::<Vec<_>>().join(";")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_decompose_trims_and_dedups() {
        assert_eq!(decompose(Some("web;  prod ;web")), set(&["web", "prod"]));
    }

    #[test]
    fn test_decompose_absent_or_empty() {
        assert!(decompose(None).is_empty());
        assert!(decompose(Some("")).is_empty());
        assert!(decompose(Some(" ; ;; ")).is_empty());
    }

    #[test]
    fn test_inner_whitespace_is_kept() {
        assert_eq!(decompose(Some("team a; b")), set(&["team a", "b"]));
    }

    #[test]
    fn test_join_is_sorted() {
        assert_eq!(join(&decompose(Some("web;db;app"))), "app;db;web");
    }

    proptest! {
        #[test]
        fn prop_tokens_are_clean(raw in ".*") {
            for token in decompose(Some(&raw)) {
                prop_assert!(!token.is_empty());
                prop_assert_eq!(token.trim(), token.as_str());
                prop_assert!(!token.contains(DELIMITER));
            }
        }

        #[test]
        fn prop_idempotent(raw in "[a-z ;]{0,40}") {
            let once = decompose(Some(&raw));
            let twice = decompose(Some(&join(&once)));
            prop_assert_eq!(once, twice);
        }
    }
}
