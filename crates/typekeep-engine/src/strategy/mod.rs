// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Edit strategies — interchangeable backends that apply one search/replace
// to a document file and write the result to another.

pub mod redact_reinsert;
pub mod stream_rewrite;
pub mod tokenizer;

use std::path::{Path, PathBuf};

use typekeep_core::{EngineId, MatchQuality, Result, StyleOverrides, TextRun};
use typekeep_document::{FontInventory, PdfDocument};

use crate::correlate::EditHint;
use crate::fonts::{FontRequest, FontRequirementTracker, FontResolver, ResolvedFont};

pub use redact_reinsert::RedactReinsert;
pub use stream_rewrite::StreamRewrite;

/// How much a strategy's output can be trusted before verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// Safe to run unprompted.
    Primary,
    /// Only run as a retry, or when explicitly pinned.
    LowConfidence,
}

/// One search/replace against a prepared input file.
#[derive(Debug, Clone, Copy)]
pub struct EditRequest<'a> {
    pub input_path: &'a Path,
    pub output_path: &'a Path,
    pub search_text: &'a str,
    pub replacement_text: &'a str,
    /// Pre-edit runs containing the search text.
    pub targets: &'a [TextRun],
    pub style: &'a StyleOverrides,
}

impl EditRequest<'_> {
    /// Font name the replacement for `run` should be drawn in.
    pub fn font_name_for<'r>(&'r self, run: &'r TextRun) -> &'r str {
        self.style.font_name.as_deref().unwrap_or(&run.font_name)
    }

    pub fn hint(&self) -> EditHint<'_> {
        EditHint::new(self.search_text, self.replacement_text)
    }

    /// Content of `run` after the edit; `None` when it does not contain the
    /// search text.
    pub fn replaced_content(&self, run: &TextRun) -> Option<String> {
        self.hint().expected_content(&run.content)
    }
}

/// What a strategy produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    pub output_path: PathBuf,
    /// Number of runs rewritten.
    pub edited_runs: usize,
}

/// Font state shared by every attempt of one operation.
pub struct FontSession {
    pub resolver: FontResolver,
    pub tracker: FontRequirementTracker,
}

impl FontSession {
    pub fn new(resolver: FontResolver, tracker: FontRequirementTracker) -> Self {
        Self { resolver, tracker }
    }

    /// Resolve `font_name` for drawing `text`, without recording it.
    pub fn resolve_for(
        &mut self,
        document: &PdfDocument,
        inventory: &FontInventory,
        font_name: &str,
        text: &str,
    ) -> ResolvedFont {
        self.resolver.resolve(FontRequest {
            name: font_name,
            inventory,
            document,
            text,
        })
    }

    /// Resolve and record the outcome against `page`. A generic fallback
    /// is recorded with no resolved name.
    pub fn resolve_and_record(
        &mut self,
        document: &PdfDocument,
        inventory: &FontInventory,
        font_name: &str,
        text: &str,
        page: usize,
    ) -> ResolvedFont {
        let resolved = self.resolve_for(document, inventory, font_name, text);
        self.tracker.record(
            font_name,
            Some(resolved.resolved_name.as_str())
                .filter(|_| resolved.quality != MatchQuality::Missing),
            resolved.quality,
            resolved.source_path.as_deref(),
            page,
        );
        resolved
    }
}

/// A backend the engine manager can run.
pub trait EditStrategy {
    fn id(&self) -> EngineId;

    fn confidence(&self) -> Confidence;

    /// Read `request.input_path`, apply the edit, write
    /// `request.output_path`.
    fn apply(&self, request: &EditRequest<'_>, fonts: &mut FontSession) -> Result<ApplyOutcome>;
}
