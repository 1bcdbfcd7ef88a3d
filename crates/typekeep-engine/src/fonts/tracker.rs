// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font requirement tracking for one edit session.
//
// Accumulates every resolution outcome keyed by the requested name and turns
// the problematic ones into user guidance: where to get the font and how to
// install it on this platform. No I/O; callers decide whether to print the
// summary or abort.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;
use std::path::Path;

use typekeep_core::{FontRequirement, FontSummary, MatchQuality};

use super::names::{detect_variants, strip_subset_prefix};

/// Vendor pages for families users most often need to install.
const DOWNLOAD_URLS: &[(&str, &str)] = &[
    ("Arial", "https://docs.microsoft.com/typography/font-list/arial"),
    ("ArialMT", "https://docs.microsoft.com/typography/font-list/arial"),
    ("ArialNarrow", "https://docs.microsoft.com/typography/font-list/arial-narrow"),
    ("ArialNarrow-Bold", "https://docs.microsoft.com/typography/font-list/arial-narrow"),
    ("Times", "https://docs.microsoft.com/typography/font-list/times-new-roman"),
    ("TimesNewRoman", "https://docs.microsoft.com/typography/font-list/times-new-roman"),
    ("Courier", "https://docs.microsoft.com/typography/font-list/courier-new"),
    ("CourierNew", "https://docs.microsoft.com/typography/font-list/courier-new"),
];

const RULE_WIDTH: usize = 80;

/// Operating system the installation guidance is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
}

impl Platform {
    /// The platform this binary was built for. Anything that is neither
    /// Linux nor macOS gets the Windows text.
    pub fn current() -> Self {
        match std::env::consts::OS {
            "linux" => Self::Linux,
            "macos" => Self::MacOs,
            _ => Self::Windows,
        }
    }

    pub fn installation_instructions(&self) -> &'static str {
        match self {
            Self::Windows => {
                "1. Download the font file (.ttf or .otf)\n\
                 2. Right-click the file\n\
                 3. Choose 'Install' or 'Install for all users'\n\
                 4. Restart Typekeep after installing"
            }
            Self::Linux => {
                "1. Download the font file (.ttf or .otf)\n\
                 2. Copy it to ~/.fonts/ or /usr/share/fonts/\n\
                 3. Run: fc-cache -f -v\n\
                 4. Restart Typekeep after installing"
            }
            Self::MacOs => {
                "1. Download the font file (.ttf or .otf)\n\
                 2. Open Font Book\n\
                 3. Drag the file into Font Book or use 'File > Add Fonts'\n\
                 4. Restart Typekeep after installing"
            }
        }
    }
}

/// Where to get `font_name`: a curated vendor page (exact name, then either
/// name containing the other), else a web search.
pub fn download_url(font_name: &str) -> String {
    let name = strip_subset_prefix(font_name);
    if let Some((_, url)) = DOWNLOAD_URLS.iter().find(|(key, _)| *key == name) {
        return url.to_string();
    }
    let lowered = name.to_lowercase();
    if let Some((_, url)) = DOWNLOAD_URLS.iter().find(|(key, _)| {
        let key = key.to_lowercase();
        lowered.contains(&key) || key.contains(&lowered)
    }) {
        return url.to_string();
    }
    format!("https://www.google.com/search?q=download+{}+font", name.replace(' ', "+"))
}

/// Single-writer accumulator of [`FontRequirement`]s, one per distinct
/// requested name.
#[derive(Debug, Clone)]
pub struct FontRequirementTracker {
    requirements: Vec<FontRequirement>,
    by_name: HashMap<String, usize>,
    platform: Platform,
}

impl Default for FontRequirementTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRequirementTracker {
    pub fn new() -> Self {
        Self::for_platform(Platform::current())
    }

    pub fn for_platform(platform: Platform) -> Self {
        Self {
            requirements: Vec::new(),
            by_name: HashMap::new(),
            platform,
        }
    }

    /// Record one resolution. A repeated name only adds an occurrence and
    /// its page; the first recorded quality stands.
    pub fn record(
        &mut self,
        requested_name: &str,
        resolved_name: Option<&str>,
        quality: MatchQuality,
        source_path: Option<&Path>,
        page: usize,
    ) -> &FontRequirement {
        let index = match self.by_name.get(requested_name) {
            Some(&index) => {
                let existing = &mut self.requirements[index];
                existing.occurrences += 1;
                existing.pages.insert(page);
                index
            }
            None => {
                self.requirements.push(FontRequirement {
                    requested_name: requested_name.to_string(),
                    variants: detect_variants(requested_name),
                    match_quality: quality,
                    resolved_name: resolved_name.map(str::to_string),
                    source_path: source_path.map(Path::to_path_buf),
                    download_url: Some(download_url(requested_name)),
                    installation_instructions: Some(
                        self.platform.installation_instructions().to_string(),
                    ),
                    occurrences: 1,
                    pages: BTreeSet::from([page]),
                });
                let index = self.requirements.len() - 1;
                self.by_name.insert(requested_name.to_string(), index);
                index
            }
        };
        &self.requirements[index]
    }

    /// Every requirement in first-seen order.
    pub fn requirements(&self) -> &[FontRequirement] {
        &self.requirements
    }

    /// Requirements the user should act on (missing, fallback, variant).
    pub fn problematic(&self) -> Vec<&FontRequirement> {
        self.requirements
            .iter()
            .filter(|r| r.match_quality.needs_attention())
            .collect()
    }

    pub fn has_missing_fonts(&self) -> bool {
        self.requirements.iter().any(|r| r.match_quality.needs_attention())
    }

    /// Strict mode blocks on anything short of an exact match; otherwise
    /// nothing blocks.
    pub fn should_block(&self, strict: bool) -> bool {
        strict && self.requirements.iter().any(|r| !r.match_quality.is_acceptable())
    }

    /// Requested names that are not exact matches.
    pub fn inexact_fonts(&self) -> Vec<String> {
        self.requirements
            .iter()
            .filter(|r| !r.match_quality.is_acceptable())
            .map(|r| r.requested_name.clone())
            .collect()
    }

    pub fn summary(&self) -> FontSummary {
        let problematic = self.problematic().len();
        FontSummary {
            total_fonts: self.requirements.len(),
            problematic_fonts: problematic,
            has_issues: problematic > 0,
            fonts: self.requirements.clone(),
        }
    }

    /// Human-readable guidance block for the problematic fonts.
    pub fn render_summary(&self) -> String {
        let problematic = self.problematic();
        if problematic.is_empty() {
            return "All required fonts are available.".to_string();
        }

        let rule = "=".repeat(RULE_WIDTH);
        let mut out = String::new();
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "WARNING: MISSING FONTS DETECTED");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} font(s) could not be preserved exactly because they are not available on this \
             system.",
            problematic.len()
        );
        let _ = writeln!(out);

        for (i, req) in problematic.iter().enumerate() {
            let _ = writeln!(out, "{}. Font: {}", i + 1, req.requested_name);
            if let Some(variant) = req.variant_label() {
                let _ = writeln!(out, "   Variant: {variant}");
            }
            let _ = writeln!(out, "   Used in: {} occurrence(s)", req.occurrences);
            let pages: Vec<String> = req.pages.iter().map(|p| p.to_string()).collect();
            let _ = writeln!(out, "   Pages: {}", pages.join(", "));
            match &req.resolved_name {
                Some(resolved) => {
                    let _ = writeln!(out, "   Using fallback: {resolved}");
                }
                None => {
                    let _ = writeln!(out, "   No similar font found");
                }
            }
            let _ = writeln!(out);
            let _ = writeln!(out, "   To install this font:");
            if let Some(url) = &req.download_url {
                let _ = writeln!(out, "      Download: {url}");
            }
            if let Some(instructions) = &req.installation_instructions {
                for line in instructions.lines() {
                    let _ = writeln!(out, "      {line}");
                }
            }
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
        }

        let _ = writeln!(
            out,
            "Recommendation: install the fonts listed above and run the edit again"
        );
        let _ = writeln!(out, "to preserve the original fonts exactly.");
        let _ = write!(out, "{rule}");
        out
    }
}
