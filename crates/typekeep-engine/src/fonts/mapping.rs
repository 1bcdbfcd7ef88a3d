// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Curated mapping from common font families to the standard 14 faces.

use typekeep_core::{MatchQuality, VariantTag};
use typekeep_document::StandardFont;

use super::names::{detect_variants, family_root, normalize};

/// Design class of a family, which decides the standard face used for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyClass {
    Sans,
    Serif,
    Mono,
}

/// Family roots (as produced by `family_root`) with a known class.
const FAMILIES: &[(&str, FamilyClass)] = &[
    ("arial", FamilyClass::Sans),
    ("helvetica", FamilyClass::Sans),
    ("helveticaneue", FamilyClass::Sans),
    ("verdana", FamilyClass::Sans),
    ("tahoma", FamilyClass::Sans),
    ("calibri", FamilyClass::Sans),
    ("segoeui", FamilyClass::Sans),
    ("trebuchetms", FamilyClass::Sans),
    ("liberationsans", FamilyClass::Sans),
    ("dejavusans", FamilyClass::Sans),
    ("opensans", FamilyClass::Sans),
    ("roboto", FamilyClass::Sans),
    ("times", FamilyClass::Serif),
    ("timesnewroman", FamilyClass::Serif),
    ("timesroman", FamilyClass::Serif),
    ("georgia", FamilyClass::Serif),
    ("garamond", FamilyClass::Serif),
    ("cambria", FamilyClass::Serif),
    ("bookantiqua", FamilyClass::Serif),
    ("palatino", FamilyClass::Serif),
    ("liberationserif", FamilyClass::Serif),
    ("dejavuserif", FamilyClass::Serif),
    ("courier", FamilyClass::Mono),
    ("couriernew", FamilyClass::Mono),
    ("consolas", FamilyClass::Mono),
    ("lucidaconsole", FamilyClass::Mono),
    ("liberationmono", FamilyClass::Mono),
    ("dejavusansmono", FamilyClass::Mono),
];

/// Keywords that hint at a class when the family itself is unknown.
const CLASS_HINTS: &[(&str, FamilyClass)] = &[
    ("mono", FamilyClass::Mono),
    ("code", FamilyClass::Mono),
    ("serif", FamilyClass::Serif),
    ("roman", FamilyClass::Serif),
    ("sans", FamilyClass::Sans),
    ("gothic", FamilyClass::Sans),
];

/// A standard face chosen for a requested name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CuratedMatch {
    pub font: StandardFont,
    pub quality: MatchQuality,
}

/// The face of `class` with the requested weight and slant.
pub fn standard_face(class: FamilyClass, bold: bool, italic: bool) -> StandardFont {
    use StandardFont::*;
    match (class, bold, italic) {
        (FamilyClass::Sans, false, false) => Helvetica,
        (FamilyClass::Sans, true, false) => HelveticaBold,
        (FamilyClass::Sans, false, true) => HelveticaOblique,
        (FamilyClass::Sans, true, true) => HelveticaBoldOblique,
        (FamilyClass::Serif, false, false) => TimesRoman,
        (FamilyClass::Serif, true, false) => TimesBold,
        (FamilyClass::Serif, false, true) => TimesItalic,
        (FamilyClass::Serif, true, true) => TimesBoldItalic,
        (FamilyClass::Mono, false, false) => Courier,
        (FamilyClass::Mono, true, false) => CourierBold,
        (FamilyClass::Mono, false, true) => CourierOblique,
        (FamilyClass::Mono, true, true) => CourierBoldOblique,
    }
}

/// Class of a requested name and whether it came from the curated table
/// (`true`) or only a keyword hint (`false`).
pub fn family_class(requested: &str) -> Option<(FamilyClass, bool)> {
    let root = family_root(requested);
    if let Some((_, class)) = FAMILIES.iter().find(|(family, _)| *family == root) {
        return Some((*class, true));
    }
    CLASS_HINTS
        .iter()
        .find(|(hint, _)| root.contains(hint))
        .map(|(_, class)| (*class, false))
}

/// Map `requested` to a standard face.
///
/// A standard-14 name maps to itself as an exact match. A curated family
/// is `Similar`; a keyword guess is `Fallback`. Unknown names yield `None`.
pub fn curated_font(requested: &str) -> Option<CuratedMatch> {
    let normalized = normalize(requested);
    if let Some(font) = STANDARD_FACES
        .iter()
        .copied()
        .find(|f| normalize(f.base_font()) == normalized)
    {
        return Some(CuratedMatch {
            font,
            quality: MatchQuality::Exact,
        });
    }

    let (class, curated) = family_class(requested)?;
    let variants = detect_variants(requested);
    let font = standard_face(
        class,
        variants.contains(&VariantTag::Bold) || variants.contains(&VariantTag::Black),
        variants.contains(&VariantTag::Italic),
    );
    Some(CuratedMatch {
        font,
        quality: if curated {
            MatchQuality::Similar
        } else {
            MatchQuality::Fallback
        },
    })
}

const STANDARD_FACES: [StandardFont; 12] = [
    StandardFont::Helvetica,
    StandardFont::HelveticaBold,
    StandardFont::HelveticaOblique,
    StandardFont::HelveticaBoldOblique,
    StandardFont::TimesRoman,
    StandardFont::TimesBold,
    StandardFont::TimesItalic,
    StandardFont::TimesBoldItalic,
    StandardFont::Courier,
    StandardFont::CourierBold,
    StandardFont::CourierOblique,
    StandardFont::CourierBoldOblique,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_families_map_to_their_class() {
        let arial = curated_font("ArialMT").unwrap();
        assert_eq!(arial.font, StandardFont::Helvetica);
        assert_eq!(arial.quality, MatchQuality::Similar);

        assert_eq!(curated_font("TimesNewRomanPS-BoldMT").unwrap().font, StandardFont::TimesBold);
        assert_eq!(
            curated_font("CourierNew,BoldItalic").unwrap().font,
            StandardFont::CourierBoldOblique
        );
        assert_eq!(
            curated_font("ArialNarrow-Bold").unwrap().font,
            StandardFont::HelveticaBold
        );
    }

    #[test]
    fn standard_names_are_exact() {
        let m = curated_font("ABCDEF+Helvetica-Bold").unwrap();
        assert_eq!(m.font, StandardFont::HelveticaBold);
        assert_eq!(m.quality, MatchQuality::Exact);
        assert_eq!(curated_font("Times-Roman").unwrap().quality, MatchQuality::Exact);
    }

    #[test]
    fn keyword_hint_is_fallback_quality() {
        let m = curated_font("NotoSerifDisplay").unwrap();
        assert_eq!(m.font, StandardFont::TimesRoman);
        assert_eq!(m.quality, MatchQuality::Fallback);
    }

    #[test]
    fn unknown_family_is_unmapped() {
        assert!(curated_font("Wingdings").is_none());
    }
}
