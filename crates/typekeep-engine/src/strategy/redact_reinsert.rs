// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Strategy A: redact each target run, then draw its replacement at the same
// origin with a resolved font.

use std::collections::BTreeMap;

use tracing::{debug, info, instrument};
use typekeep_core::{BBox, EngineId, Result, TextRun, TypekeepError};
use typekeep_document::{InsertText, PdfDocument, parse_hex_color};

use super::{ApplyOutcome, Confidence, EditRequest, EditStrategy, FontSession};

const BLACK: [f32; 3] = [0.0, 0.0, 0.0];

/// Redact-and-reinsert through the PDF access library.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedactReinsert;

impl EditStrategy for RedactReinsert {
    fn id(&self) -> EngineId {
        EngineId::RedactReinsert
    }

    fn confidence(&self) -> Confidence {
        Confidence::Primary
    }

    #[instrument(skip_all, fields(engine = %self.id(), targets = request.targets.len()))]
    fn apply(&self, request: &EditRequest<'_>, fonts: &mut FontSession) -> Result<ApplyOutcome> {
        let mut document = PdfDocument::open(request.input_path)?;
        let inventory = document.extract_font_inventory();

        let mut by_page: BTreeMap<usize, Vec<&TextRun>> = BTreeMap::new();
        for run in request.targets {
            by_page.entry(run.page).or_default().push(run);
        }

        let mut edited = 0;
        for (page, runs) in by_page {
            // Redact everything first so a removal cannot hit inserted text.
            let mut removed = 0;
            for run in &runs {
                removed += document.redact(page, origin_box(run))?;
            }
            if removed == 0 {
                return Err(TypekeepError::Strategy {
                    engine: self.id(),
                    reason: format!(
                        "no text operators found at the target positions on page {page}"
                    ),
                });
            }

            for run in &runs {
                let Some(text) = request.replaced_content(run) else {
                    continue;
                };
                let resolved =
                    fonts.resolve_for(&document, &inventory, request.font_name_for(run), &text);
                let insert = InsertText {
                    origin: (run.bbox.x, run.bbox.y),
                    size: request.style.font_size.unwrap_or(run.font_size),
                    color: request
                        .style
                        .color
                        .as_deref()
                        .and_then(parse_hex_color)
                        .or_else(|| parse_hex_color(&run.color))
                        .unwrap_or(BLACK),
                    rotation: run.rotation,
                    font: resolved.handle,
                    text,
                };
                document.insert_text(page, &insert)?;
                edited += 1;
            }
            debug!(page, removed, "page rewritten");
        }

        document.save(request.output_path)?;
        info!(edited, output = %request.output_path.display(), "redact-reinsert applied");
        Ok(ApplyOutcome {
            output_path: request.output_path.to_path_buf(),
            edited_runs: edited,
        })
    }
}

/// A zero-size box at the run origin: only operators starting there are
/// removed, not neighbours that begin inside the run's extent.
fn origin_box(run: &TextRun) -> BBox {
    BBox::new(run.bbox.x, run.bbox.y, 0.0, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::{FontRequirementTracker, FontResolver, Platform};
    use typekeep_core::StyleOverrides;
    use typekeep_document::pdf::fixture::{FixtureFont, FixturePage, write_document};

    fn session() -> FontSession {
        FontSession::new(
            FontResolver::without_system_fonts(),
            FontRequirementTracker::for_platform(Platform::Linux),
        )
    }

    #[test]
    fn replaces_run_in_place_with_fallback_font() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        let output = dir.path().join("out.pdf");
        write_document(
            vec![
                FixturePage::new(
                    "BT /F1 10 Tf 50 100 Td (LUIZ EDUARDO ALVES DE ALCANTARA) Tj \
                     0 -20 Td (CPF 000) Tj ET",
                )
                .with_font("F1", FixtureFont::standard("ArialMT")),
            ],
            &input,
        )
        .unwrap();

        let targets: Vec<TextRun> = PdfDocument::open(&input)
            .unwrap()
            .extract_text_runs()
            .unwrap()
            .into_iter()
            .filter(|r| r.content.contains("ALCANTARA"))
            .collect();
        let style = StyleOverrides::default();
        let request = EditRequest {
            input_path: &input,
            output_path: &output,
            search_text: "ALCANTARA",
            replacement_text: "ALCÂNTARA",
            targets: &targets,
            style: &style,
        };

        let outcome = RedactReinsert.apply(&request, &mut session()).unwrap();
        assert_eq!(outcome.edited_runs, 1);

        let runs = PdfDocument::open(&output).unwrap().extract_text_runs().unwrap();
        let edited = runs.iter().find(|r| r.content.contains("ALC")).unwrap();
        assert_eq!(edited.content, "LUIZ EDUARDO ALVES DE ALCÂNTARA");
        assert!((edited.bbox.x - 50.0).abs() < 0.01);
        assert!((edited.bbox.y - 100.0).abs() < 0.01);
        assert_eq!(edited.font_name, "Helvetica");
        assert!(runs.iter().any(|r| r.content == "CPF 000" && (r.bbox.y - 80.0).abs() < 0.01));
    }

    #[test]
    fn style_overrides_apply_to_reinserted_text() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        let output = dir.path().join("out.pdf");
        write_document(
            vec![
                FixturePage::new("BT /F1 12 Tf 72 700 Td (Total: 10) Tj ET")
                    .with_font("F1", FixtureFont::standard("Helvetica")),
            ],
            &input,
        )
        .unwrap();
        let targets = PdfDocument::open(&input).unwrap().extract_text_runs().unwrap();
        let style = StyleOverrides {
            font_name: Some("Courier".into()),
            font_size: Some(14.0),
            color: Some("#ff0000".into()),
        };
        let request = EditRequest {
            input_path: &input,
            output_path: &output,
            search_text: "10",
            replacement_text: "12",
            targets: &targets,
            style: &style,
        };
        RedactReinsert.apply(&request, &mut session()).unwrap();

        let runs = PdfDocument::open(&output).unwrap().extract_text_runs().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].content, "Total: 12");
        assert_eq!(runs[0].font_name, "Courier");
        assert!((runs[0].font_size - 14.0).abs() < 0.01);
        assert_eq!(runs[0].color, "#ff0000");
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let style = StyleOverrides::default();
        let request = EditRequest {
            input_path: &dir.path().join("absent.pdf"),
            output_path: &dir.path().join("out.pdf"),
            search_text: "a",
            replacement_text: "b",
            targets: &[],
            style: &style,
        };
        assert!(matches!(
            RedactReinsert.apply(&request, &mut session()),
            Err(TypekeepError::DocumentNotFound(_))
        ));
    }
}
