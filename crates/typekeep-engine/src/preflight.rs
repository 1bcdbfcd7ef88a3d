// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pre-flight font check: resolve the fonts an edit would need without
// touching the document.

use std::path::Path;

use serde::Serialize;
use tracing::{info, instrument};
use typekeep_core::{FontSummary, Result, TypekeepError};
use typekeep_document::PdfDocument;

use crate::manager::EngineManager;

/// What an edit of `search_text` would run into.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreflightReport {
    pub matching_runs: usize,
    pub summary: FontSummary,
    pub rendered: String,
    pub would_block_strict: bool,
    pub has_missing_fonts: bool,
}

impl EngineManager {
    /// Resolve the font of every run containing `search_text`.
    ///
    /// The runs' own text is used as the encodability sample, so an
    /// embedded font only counts as exact when it can redraw what is
    /// already there.
    #[instrument(skip_all, fields(input = %document_path.display(), search = %search_text))]
    pub fn preflight(
        &mut self,
        document_path: &Path,
        search_text: &str,
    ) -> Result<PreflightReport> {
        let document = PdfDocument::open(document_path)?;
        let runs = document.extract_text_runs()?;
        let targets: Vec<_> = runs
            .iter()
            .filter(|r| !search_text.is_empty() && r.content.contains(search_text))
            .collect();
        if targets.is_empty() {
            return Err(TypekeepError::TextNotFound {
                search: search_text.to_string(),
            });
        }

        let inventory = document.extract_font_inventory();
        let mut session = self.open_session();
        for run in &targets {
            session.resolve_and_record(
                &document,
                &inventory,
                &run.font_name,
                &run.content,
                run.page,
            );
        }

        let report = PreflightReport {
            matching_runs: targets.len(),
            summary: session.tracker.summary(),
            rendered: session.tracker.render_summary(),
            would_block_strict: session.tracker.should_block(true),
            has_missing_fonts: session.tracker.has_missing_fonts(),
        };
        self.close_session(session);

        info!(
            runs = report.matching_runs,
            fonts = report.summary.total_fonts,
            problematic = report.summary.problematic_fonts,
            "preflight finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typekeep_audit::MemoryAuditSink;
    use typekeep_core::{EditConfig, MatchQuality};
    use typekeep_document::pdf::fixture::{FixtureFont, FixturePage, write_document};

    use crate::fonts::{FontResolver, Platform};

    fn manager(sink: MemoryAuditSink) -> EngineManager {
        EngineManager::new(EditConfig::default(), Box::new(sink))
            .with_resolver(FontResolver::without_system_fonts())
            .with_platform(Platform::Linux)
    }

    fn hello_document(path: &Path, font: &str) {
        write_document(
            vec![
                FixturePage::new("BT /F1 10 Tf 50 700 Td (Hello) Tj ET")
                    .with_font("F1", FixtureFont::standard(font)),
            ],
            path,
        )
        .unwrap();
    }

    #[test]
    fn reports_fonts_without_editing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("invoice.pdf");
        write_document(
            vec![
                FixturePage::new(
                    "BT /F1 10 Tf 50 700 Td (Invoice 2024) Tj /F2 9 Tf 0 -20 Td (Due 2024) Tj ET",
                )
                .with_font("F1", FixtureFont::standard("Helvetica"))
                .with_font("F2", FixtureFont::standard("Wingdings")),
                FixturePage::new("BT /F1 10 Tf 50 700 Td (Paid 2024) Tj ET")
                    .with_font("F1", FixtureFont::standard("Helvetica")),
            ],
            &input,
        )
        .unwrap();
        let before = std::fs::read(&input).unwrap();
        let sink = MemoryAuditSink::new();
        let mut mgr = manager(sink.clone());

        let report = mgr.preflight(&input, "2024").unwrap();
        assert_eq!(report.matching_runs, 3);
        assert_eq!(report.summary.total_fonts, 2);
        assert_eq!(report.summary.problematic_fonts, 1);
        assert!(report.would_block_strict);
        assert!(report.has_missing_fonts);
        assert!(report.rendered.contains("WARNING: MISSING FONTS DETECTED"));

        let helvetica = &report.summary.fonts[0];
        assert_eq!(helvetica.requested_name, "Helvetica");
        assert_eq!(helvetica.match_quality, MatchQuality::Exact);
        assert_eq!(helvetica.occurrences, 2);
        assert_eq!(helvetica.pages.iter().copied().collect::<Vec<_>>(), vec![0, 1]);

        assert_eq!(std::fs::read(&input).unwrap(), before);
        assert!(sink.is_empty());
    }

    #[test]
    fn all_standard_fonts_pass_strict() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("plain.pdf");
        hello_document(&input, "Times-Roman");

        let report = manager(MemoryAuditSink::new()).preflight(&input, "Hello").unwrap();
        assert!(!report.would_block_strict);
        assert!(!report.has_missing_fonts);
        assert_eq!(report.rendered, "All required fonts are available.");
    }

    #[test]
    fn no_match_is_text_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("plain.pdf");
        hello_document(&input, "Helvetica");

        let mut mgr = manager(MemoryAuditSink::new());
        assert!(matches!(
            mgr.preflight(&input, "Goodbye"),
            Err(TypekeepError::TextNotFound { .. })
        ));
        assert!(matches!(mgr.preflight(&input, ""), Err(TypekeepError::TextNotFound { .. })));
    }

    #[test]
    fn report_serializes_for_front_ends() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("plain.pdf");
        hello_document(&input, "ArialMT");

        let report = manager(MemoryAuditSink::new()).preflight(&input, "Hello").unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["matching_runs"], 1);
        assert_eq!(json["summary"]["fonts"][0]["requested_name"], "ArialMT");
    }
}
