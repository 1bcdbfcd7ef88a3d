// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font resolution pipeline.
//
// An ordered list of tiers, each a plain function from a request to an
// optional candidate, tried in sequence:
//
//   1. embedded  the document's own font object, when it carries a program
//   2. system    a font file from the indexed platform directories
//   3. curated   a standard-14 face chosen by family class
//
// and, when all of them miss, the generic sans-serif face. Resolution never
// fails; a degraded result is reported through its quality instead.

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use tracing::{debug, instrument};
use typekeep_core::{EditConfig, MatchQuality, Provenance, VariantTag};
use typekeep_document::{
    FontHandle, FontInventory, FontInventoryEntry, FontProgram, PdfDocument, StandardFont,
};

use super::mapping::curated_font;
use super::names::{detect_variants, normalize, same_face};
use super::system::{MatchLevel, SystemFontIndex};

/// A usable font plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFont {
    pub handle: FontHandle,
    /// Font file on disk, for system matches.
    pub source_path: Option<PathBuf>,
    pub provenance: Provenance,
    pub quality: MatchQuality,
    /// Name the handle will be drawn under.
    pub resolved_name: String,
}

/// What to resolve, and the document context the embedded tier needs.
#[derive(Clone, Copy)]
pub struct FontRequest<'a> {
    pub name: &'a str,
    pub inventory: &'a FontInventory,
    pub document: &'a PdfDocument,
    /// Text that will be drawn; a document font must be able to encode it.
    pub text: &'a str,
}

struct TierInput<'a> {
    request: FontRequest<'a>,
    index: &'a SystemFontIndex,
}

type Tier = fn(&TierInput<'_>) -> Option<ResolvedFont>;

/// Tiers after the embedded one; their outcome depends only on the name and
/// the index, so it is cached.
const LOOKUP_TIERS: [Tier; 2] = [system_tier, curated_tier];

/// Resolves requested font names for one session.
pub struct FontResolver {
    index: SystemFontIndex,
    cache: HashMap<String, ResolvedFont>,
}

impl FontResolver {
    /// Index `extra_font_dirs`, plus the platform directories when
    /// `use_system_fonts` is set.
    pub fn from_config(config: &EditConfig) -> Self {
        let mut roots = config.extra_font_dirs.clone();
        if config.use_system_fonts {
            roots.extend(SystemFontIndex::platform_dirs());
        }
        Self::with_index(SystemFontIndex::scan(&roots))
    }

    pub fn with_index(index: SystemFontIndex) -> Self {
        Self {
            index,
            cache: HashMap::new(),
        }
    }

    /// A resolver that never finds system fonts; results depend only on the
    /// document.
    pub fn without_system_fonts() -> Self {
        Self::with_index(SystemFontIndex::empty())
    }

    pub fn index(&self) -> &SystemFontIndex {
        &self.index
    }

    #[instrument(skip_all, fields(font = request.name))]
    pub fn resolve(&mut self, request: FontRequest<'_>) -> ResolvedFont {
        let input = TierInput {
            request,
            index: &self.index,
        };
        if let Some(found) = embedded_tier(&input) {
            debug!(provenance = ?found.provenance, "font resolved");
            return found;
        }

        let key = request.name.to_string();
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        let resolved = LOOKUP_TIERS
            .iter()
            .find_map(|tier| tier(&input))
            .unwrap_or_else(generic_fallback);
        let resolved = embolden(resolved, &input);

        debug!(
            provenance = ?resolved.provenance,
            quality = resolved.quality.as_str(),
            resolved = %resolved.resolved_name,
            "font resolved"
        );
        self.cache.insert(key, resolved.clone());
        resolved
    }
}

// -- Tiers --------------------------------------------------------------------

fn inventory_entry<'a>(inventory: &'a FontInventory, name: &str) -> Option<&'a FontInventoryEntry> {
    inventory.get(name).or_else(|| {
        let wanted = normalize(name);
        inventory.values().find(|entry| normalize(&entry.base_font) == wanted)
    })
}

fn embedded_tier(input: &TierInput<'_>) -> Option<ResolvedFont> {
    let request = input.request;
    let entry = inventory_entry(request.inventory, request.name)?;
    entry.embedded?;
    let codec = request.document.codec_for_font(entry.object_id).ok()?;
    if !codec.can_encode(request.text) {
        debug!(font = %entry.base_font, "embedded font cannot encode replacement text");
        return None;
    }
    Some(ResolvedFont {
        handle: FontHandle::Document {
            object_id: entry.object_id,
            base_font: entry.base_font.clone(),
        },
        source_path: None,
        provenance: Provenance::Embedded,
        quality: MatchQuality::Exact,
        resolved_name: entry.base_font.clone(),
    })
}

fn load_program(path: PathBuf) -> Option<Rc<FontProgram>> {
    match FontProgram::from_file(&path) {
        Ok(program) => Some(Rc::new(program)),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "skipping unreadable font file");
            None
        }
    }
}

fn system_tier(input: &TierInput<'_>) -> Option<ResolvedFont> {
    let found = input.index.find(input.request.name)?;
    let program = load_program(found.path.clone())?;
    let exact = found.level == MatchLevel::FullName
        || same_face(program.postscript_name(), input.request.name);
    Some(ResolvedFont {
        resolved_name: program.postscript_name().to_string(),
        handle: FontHandle::Program(program),
        source_path: Some(found.path),
        provenance: Provenance::System,
        quality: if exact {
            MatchQuality::Exact
        } else {
            MatchQuality::Variant
        },
    })
}

fn curated_tier(input: &TierInput<'_>) -> Option<ResolvedFont> {
    let curated = curated_font(input.request.name)?;
    Some(standard(curated.font, Provenance::Fallback, curated.quality))
}

fn generic_fallback() -> ResolvedFont {
    standard(StandardFont::Helvetica, Provenance::GenericFallback, MatchQuality::Missing)
}

fn standard(font: StandardFont, provenance: Provenance, quality: MatchQuality) -> ResolvedFont {
    ResolvedFont {
        handle: FontHandle::Standard(font),
        source_path: None,
        provenance,
        quality,
        resolved_name: font.base_font().to_string(),
    }
}

/// Swap in a bold face when the request is bold and the resolved face is
/// not.
fn embolden(resolved: ResolvedFont, input: &TierInput<'_>) -> ResolvedFont {
    if !detect_variants(input.request.name).contains(&VariantTag::Bold) {
        return resolved;
    }
    match &resolved.handle {
        FontHandle::Standard(font) if !font.is_bold() => {
            let bold = font.bold();
            ResolvedFont {
                handle: FontHandle::Standard(bold),
                resolved_name: bold.base_font().to_string(),
                ..resolved
            }
        }
        FontHandle::Program(program)
            if !program.is_bold() && !normalize(program.postscript_name()).contains("bold") =>
        {
            let family = program
                .family_name()
                .map(str::to_string)
                .unwrap_or_else(|| program.postscript_name().to_string());
            let Some(program) = input
                .index
                .find_variant(&family, &["bold"])
                .and_then(|found| load_program(found.path))
            else {
                return resolved;
            };
            ResolvedFont {
                resolved_name: program.postscript_name().to_string(),
                source_path: program.source_path().map(|p| p.to_path_buf()),
                handle: FontHandle::Program(program),
                ..resolved
            }
        }
        _ => resolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typekeep_document::pdf::fixture::{FixtureFont, FixturePage, build_document};

    fn document(fonts: Vec<(&str, FixtureFont)>) -> (PdfDocument, FontInventory) {
        let mut page = FixturePage::new("BT ET");
        for (key, font) in fonts {
            page = page.with_font(key, font);
        }
        let doc = PdfDocument::from_document(build_document(vec![page]));
        let inventory = doc.extract_font_inventory();
        (doc, inventory)
    }

    fn request<'a>(
        name: &'a str,
        doc: &'a PdfDocument,
        inventory: &'a FontInventory,
        text: &'a str,
    ) -> FontRequest<'a> {
        FontRequest {
            name,
            inventory,
            document: doc,
            text,
        }
    }

    #[test]
    fn embedded_program_wins() {
        let (doc, inventory) = document(vec![(
            "F1",
            FixtureFont::embedded_truetype("ABCDEF+ArialMT", b"glyf data".to_vec()),
        )]);
        let mut resolver = FontResolver::without_system_fonts();
        let resolved = resolver.resolve(request("ABCDEF+ArialMT", &doc, &inventory, "ALCÂNTARA"));
        assert_eq!(resolved.provenance, Provenance::Embedded);
        assert_eq!(resolved.quality, MatchQuality::Exact);
        assert!(matches!(resolved.handle, FontHandle::Document { .. }));
        assert_eq!(resolved.resolved_name, "ABCDEF+ArialMT");
    }

    #[test]
    fn embedded_font_that_cannot_encode_falls_through() {
        let (doc, inventory) = document(vec![(
            "F1",
            FixtureFont::embedded_truetype("ArialMT", b"glyf data".to_vec()),
        )]);
        let mut resolver = FontResolver::without_system_fonts();
        let resolved = resolver.resolve(request("ArialMT", &doc, &inventory, "日本"));
        assert_eq!(resolved.provenance, Provenance::Fallback);
        assert_eq!(resolved.handle, FontHandle::Standard(StandardFont::Helvetica));
    }

    #[test]
    fn non_embedded_font_uses_curated_mapping() {
        let (doc, inventory) = document(vec![("F1", FixtureFont::standard("ArialMT"))]);
        let mut resolver = FontResolver::without_system_fonts();
        let resolved = resolver.resolve(request("ArialMT", &doc, &inventory, "ALCÂNTARA"));
        assert_eq!(resolved.provenance, Provenance::Fallback);
        assert_eq!(resolved.quality, MatchQuality::Similar);
        assert_eq!(resolved.resolved_name, "Helvetica");
    }

    #[test]
    fn unknown_font_gets_generic_fallback() {
        let (doc, inventory) = document(vec![]);
        let mut resolver = FontResolver::without_system_fonts();
        let resolved = resolver.resolve(request("Wingdings", &doc, &inventory, "x"));
        assert_eq!(resolved.provenance, Provenance::GenericFallback);
        assert_eq!(resolved.quality, MatchQuality::Missing);

        let bold = resolver.resolve(request("Wingdings-Bold", &doc, &inventory, "x"));
        assert_eq!(bold.handle, FontHandle::Standard(StandardFont::HelveticaBold));
    }

    #[test]
    fn resolution_is_deterministic() {
        let (doc, inventory) =
            document(vec![("F1", FixtureFont::standard("TimesNewRomanPS-BoldMT"))]);
        let mut resolver = FontResolver::without_system_fonts();
        let first = resolver.resolve(request("TimesNewRomanPS-BoldMT", &doc, &inventory, "abc"));
        let second = resolver.resolve(request("TimesNewRomanPS-BoldMT", &doc, &inventory, "abc"));
        assert_eq!(first, second);

        let mut fresh = FontResolver::without_system_fonts();
        let again = fresh.resolve(request("TimesNewRomanPS-BoldMT", &doc, &inventory, "abc"));
        assert_eq!(again, first);
        assert_eq!(first.handle, FontHandle::Standard(StandardFont::TimesBold));
    }

    #[test]
    fn unparseable_system_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ArialMT.ttf"), b"not a font").unwrap();
        let index = SystemFontIndex::scan(&[dir.path().to_path_buf()]);
        let (doc, inventory) = document(vec![]);
        let mut resolver = FontResolver::with_index(index);
        let resolved = resolver.resolve(request("ArialMT", &doc, &inventory, "x"));
        assert_eq!(resolved.provenance, Provenance::Fallback);
    }
}
