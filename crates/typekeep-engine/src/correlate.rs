// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Object correlation and fidelity checking.
//
// Matches each edited pre-edit run to its most likely post-edit counterpart
// by page, position, size, and expected content, then compares fonts. A run
// without a convincing counterpart is reported as a fallback: an ambiguous
// match never passes silently.

use std::collections::HashSet;

use tracing::debug;
use typekeep_core::{CorrelationTolerances, FontComparison, TextRun};

use crate::fonts::names::strip_subset_prefix;

/// Names the generic fallback face is known by.
const GENERIC_FALLBACK_NAMES: &[&str] = &["Helvetica", "helv"];

/// The search/replace that produced the post-edit runs, when known.
#[derive(Debug, Clone, Copy, Default)]
pub struct EditHint<'a> {
    pub search_text: Option<&'a str>,
    pub replacement_text: Option<&'a str>,
}

impl<'a> EditHint<'a> {
    pub fn new(search_text: &'a str, replacement_text: &'a str) -> Self {
        Self {
            search_text: Some(search_text),
            replacement_text: Some(replacement_text),
        }
    }

    /// Content `original` should have after the edit: the first occurrence
    /// of the search text replaced, or the whole run when they are equal.
    pub fn expected_content(&self, original: &str) -> Option<String> {
        let (search, replacement) = (self.search_text?, self.replacement_text?);
        if search.is_empty() || !original.contains(search) {
            return None;
        }
        if search == original {
            Some(replacement.to_string())
        } else {
            Some(original.replacen(search, replacement, 1))
        }
    }
}

/// One comparison per pre-edit run listed in `target_ids`, in pre-edit
/// order.
pub fn correlate(
    pre: &[TextRun],
    post: &[TextRun],
    target_ids: &[String],
    hint: EditHint<'_>,
    tolerances: &CorrelationTolerances,
) -> Vec<FontComparison> {
    let targets: HashSet<&str> = target_ids.iter().map(String::as_str).collect();
    let comparisons: Vec<FontComparison> = pre
        .iter()
        .filter(|run| targets.contains(run.id.as_str()))
        .map(|original| compare_one(original, post, hint, tolerances))
        .collect();
    debug!(
        targets = comparisons.len(),
        fallbacks = comparisons.iter().filter(|c| c.fallback_detected).count(),
        "runs correlated"
    );
    comparisons
}

/// Score of `candidate` as the post-edit form of `original`, or `None` when
/// it cannot be the same object (other page, or too far along x).
pub fn score(
    original: &TextRun,
    candidate: &TextRun,
    expected: Option<&str>,
    hint: EditHint<'_>,
    tolerances: &CorrelationTolerances,
) -> Option<u32> {
    if candidate.page != original.page {
        return None;
    }

    let dx = (candidate.bbox.x - original.bbox.x).abs();
    let mut total = if dx <= tolerances.x_exact {
        20
    } else if dx <= tolerances.x_near {
        10
    } else {
        return None;
    };

    // Redaction can move the baseline, so y only weighs, never excludes.
    let dy = (candidate.bbox.y - original.bbox.y).abs();
    total += if dy <= tolerances.y_exact {
        15
    } else if dy <= tolerances.y_near {
        8
    } else {
        3
    };

    let dw = (candidate.bbox.width - original.bbox.width).abs();
    let dh = (candidate.bbox.height - original.bbox.height).abs();
    if dw <= tolerances.size_exact && dh <= tolerances.size_exact {
        total += 10;
    } else if dw <= tolerances.size_near && dh <= tolerances.size_near {
        total += 5;
    }

    let content = candidate.content.as_str();
    match expected {
        Some(expected) => {
            if content == expected {
                total += 30;
            } else if content.contains(expected) || expected.contains(content) {
                total += 15;
            } else if hint.replacement_text.is_some_and(|r| !r.is_empty() && content.contains(r)) {
                total += 10;
            }
        }
        None => {
            let search_gone = hint.search_text.is_none_or(|s| !content.contains(s));
            if content != original.content && search_gone {
                total += 5;
            }
        }
    }

    Some(total)
}

fn compare_one(
    original: &TextRun,
    post: &[TextRun],
    hint: EditHint<'_>,
    tolerances: &CorrelationTolerances,
) -> FontComparison {
    let expected = hint.expected_content(&original.content);

    let mut best: Option<(&TextRun, u32)> = None;
    for candidate in post {
        let Some(s) = score(original, candidate, expected.as_deref(), hint, tolerances) else {
            continue;
        };
        if best.is_none_or(|(_, b)| s > b) {
            best = Some((candidate, s));
        }
    }

    let original_font = display_font(&original.font_name);
    match best {
        Some((matched, s)) if s >= tolerances.min_score => {
            // A fresh subset tag means a freshly embedded program, not the
            // original one.
            let same_font = original.font_name == matched.font_name;
            let same_size = original.font_size == matched.font_size;
            let preserved = same_font && same_size;
            FontComparison {
                object_id: matched.id.clone(),
                page: matched.page,
                original_font,
                original_font_size: original.font_size,
                final_font: display_font(&matched.font_name),
                final_font_size: matched.font_size,
                preserved,
                fallback_detected: !preserved,
                reason: (!preserved).then(|| fallback_reason(original, matched, same_font)),
            }
        }
        _ => FontComparison {
            object_id: original.id.clone(),
            page: original.page,
            original_font,
            original_font_size: original.font_size,
            final_font: "N/A".to_string(),
            final_font_size: 0.0,
            preserved: false,
            fallback_detected: true,
            reason: Some(format!(
                "no correspondence found after edit (best score: {})",
                best.map(|(_, s)| s).unwrap_or(0)
            )),
        },
    }
}

fn display_font(name: &str) -> String {
    if name.is_empty() {
        "N/A".to_string()
    } else {
        name.to_string()
    }
}

fn fallback_reason(original: &TextRun, matched: &TextRun, same_font: bool) -> String {
    let before = strip_subset_prefix(&original.font_name);
    let after = strip_subset_prefix(&matched.font_name);
    if GENERIC_FALLBACK_NAMES.contains(&after) && !GENERIC_FALLBACK_NAMES.contains(&before) {
        format!("font '{}' replaced by the generic Helvetica fallback", original.font_name)
    } else if !same_font {
        format!("font '{}' -> '{}'", original.font_name, matched.font_name)
    } else {
        format!(
            "size changed: {}pt -> {}pt",
            original.font_size, matched.font_size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typekeep_core::BBox;

    fn run(id: &str, content: &str, x: f32, y: f32, font: &str, size: f32) -> TextRun {
        TextRun {
            id: id.to_string(),
            page: 0,
            content: content.to_string(),
            bbox: BBox::new(x, y, content.chars().count() as f32 * size * 0.5, size),
            font_name: font.to_string(),
            font_resource: "F1".to_string(),
            font_size: size,
            color: "#000000".to_string(),
            rotation: 0.0,
        }
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    const NAME: &str = "LUIZ EDUARDO ALVES DE ALCANTARA";
    const EDITED: &str = "LUIZ EDUARDO ALVES DE ALCÂNTARA";

    #[test]
    fn expected_content_replaces_first_occurrence_only() {
        let hint = EditHint::new("AB", "X");
        assert_eq!(hint.expected_content("AB AB").as_deref(), Some("X AB"));
        assert_eq!(hint.expected_content("AB").as_deref(), Some("X"));
        assert_eq!(hint.expected_content("CD"), None);
        assert_eq!(EditHint::default().expected_content("AB"), None);
    }

    #[test]
    fn content_change_at_same_position_is_matched() {
        let pre = vec![run("a", NAME, 50.0, 100.0, "ArialMT", 10.0)];
        let post = vec![run("b", EDITED, 50.0, 100.0, "ArialMT", 10.0)];
        let hint = EditHint::new("ALCANTARA", "ALCÂNTARA");
        let t = CorrelationTolerances::default();

        let s = score(&pre[0], &post[0], hint.expected_content(NAME).as_deref(), hint, &t).unwrap();
        assert!(s >= 30);

        let result = correlate(&pre, &post, &ids(&["a"]), hint, &t);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].object_id, "b");
        assert!(result[0].preserved);
        assert!(!result[0].fallback_detected);
        assert_eq!(result[0].reason, None);
    }

    #[test]
    fn far_x_candidate_is_never_selected() {
        let pre = vec![run("a", NAME, 50.0, 100.0, "ArialMT", 10.0)];
        let post = vec![run("b", EDITED, 52.5, 100.0, "ArialMT", 10.0)];
        let hint = EditHint::new("ALCANTARA", "ALCÂNTARA");
        let t = CorrelationTolerances::default();

        assert_eq!(score(&pre[0], &post[0], Some(EDITED), hint, &t), None);
        let result = correlate(&pre, &post, &ids(&["a"]), hint, &t);
        assert_eq!(result[0].object_id, "a");
        assert_eq!(result[0].final_font, "N/A");
        assert_eq!(result[0].final_font_size, 0.0);
        assert!(result[0].fallback_detected);
        assert!(result[0].reason.as_deref().unwrap().contains("no correspondence"));
    }

    #[test]
    fn y_shift_lowers_score_but_does_not_exclude() {
        let original = run("a", NAME, 50.0, 100.0, "ArialMT", 10.0);
        let t = CorrelationTolerances::default();
        let hint = EditHint::new("ALCANTARA", "ALCÂNTARA");
        let near_run = run("b", EDITED, 50.0, 104.0, "ArialMT", 10.0);
        let far_run = run("c", EDITED, 50.0, 180.0, "ArialMT", 10.0);
        let near = score(&original, &near_run, Some(EDITED), hint, &t);
        let far = score(&original, &far_run, Some(EDITED), hint, &t);
        assert_eq!(near, Some(20 + 8 + 10 + 30));
        assert_eq!(far, Some(20 + 3 + 10 + 30));
    }

    #[test]
    fn other_page_is_excluded() {
        let original = run("a", NAME, 50.0, 100.0, "ArialMT", 10.0);
        let mut other = run("b", EDITED, 50.0, 100.0, "ArialMT", 10.0);
        other.page = 1;
        let t = CorrelationTolerances::default();
        assert_eq!(score(&original, &other, Some(EDITED), EditHint::default(), &t), None);
    }

    #[test]
    fn ties_keep_first_candidate() {
        let pre = vec![run("a", NAME, 50.0, 100.0, "ArialMT", 10.0)];
        let post = vec![
            run("first", EDITED, 50.0, 100.0, "ArialMT", 10.0),
            run("second", EDITED, 50.0, 100.0, "ArialMT", 10.0),
        ];
        let result = correlate(
            &pre,
            &post,
            &ids(&["a"]),
            EditHint::new("ALCANTARA", "ALCÂNTARA"),
            &CorrelationTolerances::default(),
        );
        assert_eq!(result[0].object_id, "first");
    }

    #[test]
    fn best_candidate_wins_over_neighbour() {
        let pre = vec![run("a", NAME, 50.0, 100.0, "ArialMT", 10.0)];
        let post = vec![
            run("line-below", "ACCOUNT 0001", 50.0, 88.0, "ArialMT", 10.0),
            run("edited", EDITED, 50.0, 100.0, "Helvetica", 10.0),
        ];
        let result = correlate(
            &pre,
            &post,
            &ids(&["a"]),
            EditHint::new("ALCANTARA", "ALCÂNTARA"),
            &CorrelationTolerances::default(),
        );
        assert_eq!(result[0].object_id, "edited");
    }

    #[test]
    fn generic_fallback_reason() {
        let pre = vec![run("a", NAME, 50.0, 100.0, "ArialMT", 10.0)];
        let post = vec![run("b", EDITED, 50.0, 100.0, "Helvetica", 10.0)];
        let result = correlate(
            &pre,
            &post,
            &ids(&["a"]),
            EditHint::new("ALCANTARA", "ALCÂNTARA"),
            &CorrelationTolerances::default(),
        );
        assert!(result[0].fallback_detected);
        assert_eq!(
            result[0].reason.as_deref(),
            Some("font 'ArialMT' replaced by the generic Helvetica fallback")
        );
    }

    #[test]
    fn font_swap_and_size_change_reasons() {
        let t = CorrelationTolerances::default();
        let hint = EditHint::new("ALCANTARA", "ALCÂNTARA");
        let pre = vec![run("a", NAME, 50.0, 100.0, "ArialMT", 10.0)];

        let post = [run("b", EDITED, 50.0, 100.0, "Times-Roman", 10.0)];
        let swapped = correlate(&pre, &post, &ids(&["a"]), hint, &t);
        assert_eq!(swapped[0].reason.as_deref(), Some("font 'ArialMT' -> 'Times-Roman'"));

        let post = [run("b", EDITED, 50.0, 100.0, "ArialMT", 9.0)];
        let resized = correlate(&pre, &post, &ids(&["a"]), hint, &t);
        assert_eq!(resized[0].reason.as_deref(), Some("size changed: 10pt -> 9pt"));
    }

    #[test]
    fn subset_tag_change_is_a_fallback() {
        let pre = vec![run("a", NAME, 50.0, 100.0, "ABCDEF+ArialMT", 10.0)];
        let post = vec![run("b", EDITED, 50.0, 100.0, "GHIJKL+ArialMT", 10.0)];
        let result = correlate(
            &pre,
            &post,
            &ids(&["a"]),
            EditHint::new("ALCANTARA", "ALCÂNTARA"),
            &CorrelationTolerances::default(),
        );
        assert!(!result[0].preserved);
        assert!(result[0].fallback_detected);
        assert_eq!(
            result[0].reason.as_deref(),
            Some("font 'ABCDEF+ArialMT' -> 'GHIJKL+ArialMT'")
        );
    }

    #[test]
    fn same_subset_tag_is_preserved() {
        let pre = vec![run("a", NAME, 50.0, 100.0, "ABCDEF+ArialMT", 10.0)];
        let post = vec![run("b", EDITED, 50.0, 100.0, "ABCDEF+ArialMT", 10.0)];
        let result = correlate(
            &pre,
            &post,
            &ids(&["a"]),
            EditHint::new("ALCANTARA", "ALCÂNTARA"),
            &CorrelationTolerances::default(),
        );
        assert!(result[0].preserved);
        assert_eq!(result[0].reason, None);
    }

    #[test]
    fn untargeted_runs_are_ignored() {
        let pre = vec![
            run("a", NAME, 50.0, 100.0, "ArialMT", 10.0),
            run("b", "OTHER", 50.0, 80.0, "ArialMT", 10.0),
        ];
        let t = CorrelationTolerances::default();
        let result = correlate(&pre, &pre, &ids(&["b"]), EditHint::default(), &t);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].object_id, "b");
    }

    #[test]
    fn tolerances_are_tunable() {
        let original = run("a", NAME, 50.0, 100.0, "ArialMT", 10.0);
        let candidate = run("b", EDITED, 53.0, 100.0, "ArialMT", 10.0);
        let wide = CorrelationTolerances {
            x_near: 4.0,
            ..CorrelationTolerances::default()
        };
        assert_eq!(
            score(&original, &candidate, Some(EDITED), EditHint::default(), &wide),
            Some(10 + 15 + 10 + 30)
        );
    }
}
