// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Typekeep text-edit engine.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::StyleOverrides;

/// Namespace for content-independent text run identifiers.
const TEXT_RUN_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2b7e_9a44_4d0b_8e55_3c1f_72a9_d041);

// -- Engines ------------------------------------------------------------------

/// The interchangeable edit backends orchestrated by the engine manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineId {
    /// Strategy A: redact the original run, then draw new text in its place.
    RedactReinsert,
    /// Strategy B: rewrite the encoded string inside the text-showing
    /// operator, leaving the font selection untouched.
    StreamRewrite,
}

impl EngineId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RedactReinsert => "redact-reinsert",
            Self::StreamRewrite => "stream-rewrite",
        }
    }

    /// Parse the kebab-case name (also accepts `primary` and `secondary`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "redact-reinsert" | "primary" => Some(Self::RedactReinsert),
            "stream-rewrite" | "secondary" => Some(Self::StreamRewrite),
            _ => None,
        }
    }
}

impl std::fmt::Display for EngineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// -- Text runs ----------------------------------------------------------------

/// Axis-aligned box in PDF user-space points. `(x, y)` is the text origin
/// on the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the point lies inside the box, with `slack` points of margin.
    pub fn contains(&self, px: f32, py: f32, slack: f32) -> bool {
        let (x0, x1) = ordered(self.x, self.x + self.width);
        let (y0, y1) = ordered(self.y, self.y + self.height);
        px >= x0 - slack && px <= x1 + slack && py >= y0 - slack && py <= y1 + slack
    }
}

fn ordered(a: f32, b: f32) -> (f32, f32) {
    if a <= b { (a, b) } else { (b, a) }
}

/// One span of text on a page, as produced by a single text-showing operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    /// Content-independent identifier, see [`TextRun::derive_id`].
    pub id: String,
    /// 0-based page index.
    pub page: usize,
    pub content: String,
    pub bbox: BBox,
    /// `BaseFont` exactly as referenced, subset prefix included.
    pub font_name: String,
    /// Page resource key the run was shown with (e.g. `F1`).
    pub font_resource: String,
    pub font_size: f32,
    /// Fill colour as `#rrggbb`.
    pub color: String,
    /// Baseline rotation in degrees.
    pub rotation: f32,
}

impl TextRun {
    /// Derive the stable id from page, rounded position, rounded size and the
    /// occurrence index of that key within one extraction pass.
    pub fn derive_id(page: usize, x: f32, y: f32, size: f32, occurrence: usize) -> String {
        let key = Self::position_key(page, x, y, size);
        let name = format!("{key}:{occurrence}");
        Uuid::new_v5(&TEXT_RUN_NAMESPACE, name.as_bytes()).to_string()
    }

    /// The rounded `(page, x, y, size)` key used for occurrence counting.
    pub fn position_key(page: usize, x: f32, y: f32, size: f32) -> String {
        format!(
            "{page}:{}:{}:{}",
            x.round() as i64,
            y.round() as i64,
            size.round() as i64
        )
    }
}

// -- Fonts --------------------------------------------------------------------

/// Style variants detected in a font name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VariantTag {
    Bold,
    Italic,
    Narrow,
    Condensed,
    Light,
    Black,
}

impl VariantTag {
    pub const ALL: [VariantTag; 6] = [
        Self::Bold,
        Self::Italic,
        Self::Narrow,
        Self::Condensed,
        Self::Light,
        Self::Black,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bold => "Bold",
            Self::Italic => "Italic",
            Self::Narrow => "Narrow",
            Self::Condensed => "Condensed",
            Self::Light => "Light",
            Self::Black => "Black",
        }
    }

    /// Spellings of this tag that may appear inside a font name.
    pub fn spellings(&self) -> &'static [&'static str] {
        match self {
            Self::Bold => &["bold"],
            Self::Italic => &["italic", "oblique"],
            Self::Narrow => &["narrow"],
            Self::Condensed => &["condensed"],
            Self::Light => &["light"],
            Self::Black => &["black"],
        }
    }
}

/// How well a resolved font matches the one the document asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchQuality {
    Exact,
    Variant,
    Similar,
    Fallback,
    Missing,
}

impl MatchQuality {
    pub fn is_acceptable(&self) -> bool {
        matches!(self, Self::Exact)
    }

    /// Missing, fallback, and variant matches are surfaced as warnings.
    pub fn needs_attention(&self) -> bool {
        matches!(self, Self::Missing | Self::Fallback | Self::Variant)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Variant => "variant",
            Self::Similar => "similar",
            Self::Fallback => "fallback",
            Self::Missing => "missing",
        }
    }
}

/// Which resolution tier produced a font handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// The program embedded in the document itself.
    Embedded,
    /// A font file found in a platform font directory.
    System,
    /// A standard font chosen through the curated family table.
    Fallback,
    /// The base sans-serif font; nothing matched.
    GenericFallback,
}

/// One distinct requested font name, accumulated over a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontRequirement {
    pub requested_name: String,
    pub variants: Vec<VariantTag>,
    pub match_quality: MatchQuality,
    pub resolved_name: Option<String>,
    pub source_path: Option<PathBuf>,
    pub download_url: Option<String>,
    pub installation_instructions: Option<String>,
    pub occurrences: usize,
    pub pages: BTreeSet<usize>,
}

impl FontRequirement {
    /// Variant tags joined with spaces, e.g. `"Bold Narrow"`.
    pub fn variant_label(&self) -> Option<String> {
        if self.variants.is_empty() {
            None
        } else {
            Some(
                self.variants
                    .iter()
                    .map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
            )
        }
    }
}

/// Serialisable overview of every font requirement in a session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FontSummary {
    pub total_fonts: usize,
    pub problematic_fonts: usize,
    pub has_issues: bool,
    pub fonts: Vec<FontRequirement>,
}

// -- Fidelity -----------------------------------------------------------------

/// Correlates one pre-edit run with its best post-edit match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontComparison {
    /// Id of the matched post-edit run (the pre-edit id when unmatched).
    pub object_id: String,
    pub page: usize,
    pub original_font: String,
    pub original_font_size: f32,
    pub final_font: String,
    pub final_font_size: f32,
    pub preserved: bool,
    pub fallback_detected: bool,
    pub reason: Option<String>,
}

/// Outcome of one edit strategy run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineAttempt {
    engine: EngineId,
    success: bool,
    output_path: Option<PathBuf>,
    comparisons: Vec<FontComparison>,
    any_fallback: bool,
    error: Option<String>,
    execution_time_ms: f64,
}

impl EngineAttempt {
    /// An attempt that produced output; `any_fallback` is derived from the
    /// comparisons.
    pub fn succeeded(
        engine: EngineId,
        output_path: PathBuf,
        comparisons: Vec<FontComparison>,
        execution_time_ms: f64,
    ) -> Self {
        let any_fallback = comparisons.iter().any(|c| c.fallback_detected);
        Self {
            engine,
            success: true,
            output_path: Some(output_path),
            comparisons,
            any_fallback,
            error: None,
            execution_time_ms,
        }
    }

    pub fn failed(engine: EngineId, error: impl Into<String>, execution_time_ms: f64) -> Self {
        Self {
            engine,
            success: false,
            output_path: None,
            comparisons: Vec::new(),
            any_fallback: false,
            error: Some(error.into()),
            execution_time_ms,
        }
    }

    pub fn engine(&self) -> EngineId {
        self.engine
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn output_path(&self) -> Option<&std::path::Path> {
        self.output_path.as_deref()
    }

    pub fn comparisons(&self) -> &[FontComparison] {
        &self.comparisons
    }

    pub fn any_fallback(&self) -> bool {
        self.any_fallback
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn execution_time_ms(&self) -> f64 {
        self.execution_time_ms
    }

    /// Succeeded and every comparison preserved the font.
    pub fn is_clean(&self) -> bool {
        self.success && !self.any_fallback
    }
}

// -- Audit --------------------------------------------------------------------

/// The caller's request, recorded verbatim in the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditParameters {
    pub search_text: String,
    pub replacement_text: String,
    pub style_overrides: StyleOverrides,
    pub preferred_engine: Option<EngineId>,
    pub strict_fonts: bool,
}

/// Persisted once per operation; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub operation_id: Uuid,
    pub operation_type: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub input_path: PathBuf,
    pub output_path: Option<PathBuf>,
    /// SHA-256 hex digest of the input document.
    pub input_hash: String,
    /// SHA-256 hex digest of the committed output, if any.
    pub output_hash: Option<String>,
    pub parameters: EditParameters,
    pub attempts: Vec<EngineAttempt>,
    pub adopted_engine: Option<EngineId>,
    pub final_success: bool,
    pub any_font_fallback: bool,
    pub font_preservation_success: bool,
    pub font_summary: FontSummary,
}
