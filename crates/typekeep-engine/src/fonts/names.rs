// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font-name normalisation: subset prefixes, family roots, variant tags.

use typekeep_core::VariantTag;

/// Suffixes removed when deriving a family root, longest first so that
/// `semibold` is not read as `semi` + `bold`.
const ROOT_SUFFIXES: &[&str] = &[
    "extrabold",
    "semibold",
    "demibold",
    "condensed",
    "regular",
    "oblique",
    "italic",
    "medium",
    "narrow",
    "black",
    "light",
    "bold",
    "book",
    "psmt",
    "mt",
    "ps",
];

/// Strip a `ABCDEF+` subset prefix, if present.
pub fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.bytes().all(|b| b.is_ascii_uppercase()) => rest,
        _ => name,
    }
}

/// Lower-case, subset prefix removed, spaces/hyphens/underscores dropped.
pub fn normalize(name: &str) -> String {
    strip_subset_prefix(name)
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_' | ','))
        .flat_map(char::to_lowercase)
        .collect()
}

/// The family a name belongs to, e.g. `ArialNarrow-BoldMT` -> `arial`.
///
/// Never returns an empty string: a name made only of suffixes is kept
/// as normalised.
pub fn family_root(name: &str) -> String {
    let mut root = normalize(name);
    loop {
        let stripped = ROOT_SUFFIXES
            .iter()
            .find_map(|suffix| root.strip_suffix(suffix).filter(|rest| !rest.is_empty()));
        match stripped {
            Some(rest) => root = rest.to_string(),
            None => return root,
        }
    }
}

/// Variant tags whose spelling appears anywhere in the name.
pub fn detect_variants(name: &str) -> Vec<VariantTag> {
    let lowered = normalize(name);
    VariantTag::ALL
        .into_iter()
        .filter(|tag| tag.spellings().iter().any(|s| lowered.contains(s)))
        .collect()
}

/// Whether two names refer to the same face once normalised.
pub fn same_face(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subset_prefix_is_stripped() {
        assert_eq!(strip_subset_prefix("ABCDEF+ArialMT"), "ArialMT");
        assert_eq!(strip_subset_prefix("ArialMT"), "ArialMT");
        // Not a subset tag: lower case / wrong length.
        assert_eq!(strip_subset_prefix("abcdef+Arial"), "abcdef+Arial");
        assert_eq!(strip_subset_prefix("ABC+Arial"), "ABC+Arial");
    }

    #[test]
    fn normalize_ignores_case_and_separators() {
        assert_eq!(normalize("Arial Narrow-Bold"), "arialnarrowbold");
        assert_eq!(normalize("QWERTY+Times_New_Roman"), "timesnewroman");
        assert!(same_face("Arial-BoldMT", "arial bold mt"));
    }

    #[test]
    fn family_root_strips_vendor_and_style_suffixes() {
        assert_eq!(family_root("ArialMT"), "arial");
        assert_eq!(family_root("ArialNarrow-Bold"), "arial");
        assert_eq!(family_root("TimesNewRomanPS-BoldItalicMT"), "timesnewroman");
        assert_eq!(family_root("Helvetica"), "helvetica");
        assert_eq!(family_root("Bold"), "bold");
    }

    #[test]
    fn variants_detected_from_name() {
        assert_eq!(
            detect_variants("ArialNarrow-Bold"),
            vec![VariantTag::Bold, VariantTag::Narrow]
        );
        assert_eq!(detect_variants("Helvetica-Oblique"), vec![VariantTag::Italic]);
        assert!(detect_variants("ArialMT").is_empty());
    }
}
