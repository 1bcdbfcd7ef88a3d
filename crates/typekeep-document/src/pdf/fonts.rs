// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fonts — the document's font inventory, per-resource metrics and codecs,
// and the font handles reinserted text is drawn with.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::{Deserialize, Serialize};
use tracing::debug;
use typekeep_core::error::TypekeepError;

use super::encoding::{FontCodec, glyph_name_char, parse_to_unicode, win_ansi_char};
use super::objects::{get_resolved, name_string, number, resolve, resolve_dict, stream_bytes};

/// Advance used when a font gives no width for a code (1/1000 em).
pub const DEFAULT_GLYPH_WIDTH: f32 = 500.0;

// -- Inventory ----------------------------------------------------------------

/// Which `FontDescriptor` key carried the embedded program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgramKind {
    /// `/FontFile`
    Type1,
    /// `/FontFile2`
    TrueType,
    /// `/FontFile3`
    OpenType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedProgram {
    pub kind: ProgramKind,
    pub stream_id: ObjectId,
}

/// One font object in the document.
#[derive(Debug, Clone, PartialEq)]
pub struct FontInventoryEntry {
    /// `BaseFont` exactly as written, subset prefix included.
    pub base_font: String,
    pub object_id: ObjectId,
    pub subtype: String,
    pub embedded: Option<EmbeddedProgram>,
}

/// Fonts keyed by `BaseFont`. The first object seen for a name wins.
pub type FontInventory = BTreeMap<String, FontInventoryEntry>;

/// Collect every top-level font object (`Type0` descendants are folded into
/// their parent).
pub(crate) fn collect_inventory(doc: &Document) -> FontInventory {
    let mut inventory = FontInventory::new();
    for (id, object) in &doc.objects {
        let Ok(dict) = object.as_dict() else { continue };
        if get_resolved(doc, dict, b"Type").and_then(name_string).as_deref() != Some("Font") {
            continue;
        }
        let subtype = get_resolved(doc, dict, b"Subtype")
            .and_then(name_string)
            .unwrap_or_default();
        if subtype.starts_with("CIDFontType") {
            continue;
        }
        let Some(base_font) = get_resolved(doc, dict, b"BaseFont").and_then(name_string) else {
            continue;
        };
        let embedded = embedded_program(doc, dict);
        inventory
            .entry(base_font.clone())
            .or_insert(FontInventoryEntry {
                base_font,
                object_id: *id,
                subtype,
                embedded,
            });
    }
    debug!(fonts = inventory.len(), "font inventory collected");
    inventory
}

fn embedded_program(doc: &Document, font: &Dictionary) -> Option<EmbeddedProgram> {
    let descriptor = font_descriptor(doc, font)?;
    [
        (b"FontFile".as_slice(), ProgramKind::Type1),
        (b"FontFile2".as_slice(), ProgramKind::TrueType),
        (b"FontFile3".as_slice(), ProgramKind::OpenType),
    ]
    .into_iter()
    .find_map(|(key, kind)| {
        descriptor
            .get(key)
            .ok()
            .and_then(|o| o.as_reference().ok())
            .map(|stream_id| EmbeddedProgram { kind, stream_id })
    })
}

/// The `FontDescriptor` of a simple font, or of the first descendant of a
/// composite font.
fn font_descriptor<'a>(doc: &'a Document, font: &'a Dictionary) -> Option<&'a Dictionary> {
    if let Some(Object::Dictionary(descriptor)) = get_resolved(doc, font, b"FontDescriptor") {
        return Some(descriptor);
    }
    descendant(doc, font).and_then(|d| match get_resolved(doc, d, b"FontDescriptor") {
        Some(Object::Dictionary(descriptor)) => Some(descriptor),
        _ => None,
    })
}

fn descendant<'a>(doc: &'a Document, font: &'a Dictionary) -> Option<&'a Dictionary> {
    match get_resolved(doc, font, b"DescendantFonts") {
        Some(Object::Array(items)) => items.first().and_then(|d| resolve_dict(doc, d).ok()),
        _ => None,
    }
}

/// Raw bytes of an embedded program stream.
pub(crate) fn program_bytes(
    doc: &Document,
    program: &EmbeddedProgram,
) -> Result<Vec<u8>, TypekeepError> {
    let object = doc
        .get_object(program.stream_id)
        .map_err(|e| TypekeepError::Pdf(format!("cannot read font program: {e}")))?;
    let stream = object
        .as_stream()
        .map_err(|e| TypekeepError::Pdf(format!("font program is not a stream: {e}")))?;
    stream_bytes(stream)
}

// -- Per-resource font state ---------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum GlyphWidths {
    Simple {
        first_char: u32,
        widths: Vec<f32>,
        missing: f32,
    },
    Composite {
        ranges: Vec<(u32, u32, f32)>,
        default: f32,
    },
}

/// What the extractor needs to know about one font resource.
#[derive(Debug, Clone, PartialEq)]
pub struct FontInfo {
    pub base_font: String,
    pub subtype: String,
    pub codec: FontCodec,
    widths: GlyphWidths,
}

impl FontInfo {
    /// Read a font dictionary. Unknown or damaged parts degrade to defaults.
    pub(crate) fn load(doc: &Document, font: &Dictionary) -> Self {
        let base_font = get_resolved(doc, font, b"BaseFont")
            .and_then(name_string)
            .unwrap_or_else(|| "Unknown".to_string());
        let subtype = get_resolved(doc, font, b"Subtype")
            .and_then(name_string)
            .unwrap_or_default();
        let composite = subtype == "Type0";

        let to_unicode = match get_resolved(doc, font, b"ToUnicode") {
            Some(Object::Stream(stream)) => stream_bytes(stream).ok().map(|b| parse_to_unicode(&b)),
            _ => None,
        };

        let codec = if composite {
            FontCodec::with_to_unicode(true, to_unicode.unwrap_or_default(), None)
        } else {
            let base = simple_codec(doc, font);
            match to_unicode {
                Some(cmap) => FontCodec::with_to_unicode(false, cmap, Some(base)),
                None => base,
            }
        };

        let widths = if composite {
            composite_widths(doc, font)
        } else {
            simple_widths(doc, font)
        };

        Self {
            base_font,
            subtype,
            codec,
            widths,
        }
    }

    /// Stand-in for a resource the page does not define: WinAnsi codes and
    /// default advances.
    pub(crate) fn unknown() -> Self {
        Self {
            base_font: "Unknown".to_string(),
            subtype: String::new(),
            codec: FontCodec::win_ansi(&[]),
            widths: GlyphWidths::Simple {
                first_char: 0,
                widths: Vec::new(),
                missing: DEFAULT_GLYPH_WIDTH,
            },
        }
    }

    /// Glyph advance for `code` in 1/1000 em.
    pub fn width(&self, code: u32) -> f32 {
        match &self.widths {
            GlyphWidths::Simple {
                first_char,
                widths,
                missing,
            } => code
                .checked_sub(*first_char)
                .and_then(|i| widths.get(i as usize))
                .copied()
                .unwrap_or(*missing),
            GlyphWidths::Composite { ranges, default } => ranges
                .iter()
                .find(|(lo, hi, _)| code >= *lo && code <= *hi)
                .map(|(_, _, w)| *w)
                .unwrap_or(*default),
        }
    }

    /// Total advance of an encoded string in 1/1000 em, ignoring spacing.
    pub fn string_width(&self, bytes: &[u8]) -> f32 {
        self.codec.codes(bytes).into_iter().map(|c| self.width(c)).sum()
    }

    pub fn is_composite(&self) -> bool {
        self.codec.is_two_byte()
    }
}

fn simple_codec(doc: &Document, font: &Dictionary) -> FontCodec {
    let mut differences = Vec::new();
    if let Some(Object::Dictionary(encoding)) = get_resolved(doc, font, b"Encoding")
        && let Some(Object::Array(items)) = get_resolved(doc, encoding, b"Differences")
    {
        let mut code: Option<u32> = None;
        for item in items {
            match resolve(doc, item) {
                Ok(Object::Integer(start)) => code = u32::try_from(*start).ok(),
                Ok(Object::Name(name)) => {
                    if let Some(current) = code {
                        if current < 256
                            && let Some(ch) = glyph_name_char(&String::from_utf8_lossy(name))
                        {
                            differences.push((current as u8, ch));
                        }
                        code = Some(current + 1);
                    }
                }
                _ => {}
            }
        }
    }
    // StandardEncoding and MacRomanEncoding agree with WinAnsi on ASCII; the
    // accented range is read as WinAnsi.
    FontCodec::win_ansi(&differences)
}

fn simple_widths(doc: &Document, font: &Dictionary) -> GlyphWidths {
    let missing = font_descriptor(doc, font)
        .and_then(|d| get_resolved(doc, d, b"MissingWidth"))
        .and_then(number)
        .filter(|w| *w > 0.0)
        .unwrap_or(DEFAULT_GLYPH_WIDTH);
    let first_char = get_resolved(doc, font, b"FirstChar")
        .and_then(number)
        .map(|n| n.max(0.0) as u32)
        .unwrap_or(0);
    let widths = match get_resolved(doc, font, b"Widths") {
        Some(Object::Array(items)) => items
            .iter()
            .map(|w| resolve(doc, w).ok().and_then(number).unwrap_or(missing))
            .collect(),
        _ => Vec::new(),
    };
    GlyphWidths::Simple {
        first_char,
        widths,
        missing,
    }
}

fn composite_widths(doc: &Document, font: &Dictionary) -> GlyphWidths {
    let Some(cid_font) = descendant(doc, font) else {
        return GlyphWidths::Composite {
            ranges: Vec::new(),
            default: 1000.0,
        };
    };
    let default = get_resolved(doc, cid_font, b"DW")
        .and_then(number)
        .unwrap_or(1000.0);

    let mut ranges = Vec::new();
    if let Some(Object::Array(items)) = get_resolved(doc, cid_font, b"W") {
        let items: Vec<&Object> = items.iter().filter_map(|o| resolve(doc, o).ok()).collect();
        let mut i = 0;
        while i < items.len() {
            let Some(start) = number(items[i]) else { break };
            let start = start.max(0.0) as u32;
            match items.get(i + 1) {
                // c [w1 w2 ...]
                Some(Object::Array(ws)) => {
                    for (offset, w) in ws.iter().enumerate() {
                        if let Some(w) = resolve(doc, w).ok().and_then(number) {
                            let code = start + offset as u32;
                            ranges.push((code, code, w));
                        }
                    }
                    i += 2;
                }
                // c_first c_last w
                Some(end) => {
                    let width = items.get(i + 2).and_then(|o| number(o));
                    let (Some(end), Some(w)) = (number(end), width) else {
                        break;
                    };
                    ranges.push((start, end.max(0.0) as u32, w));
                    i += 3;
                }
                None => break,
            }
        }
    }
    GlyphWidths::Composite { ranges, default }
}

// -- Font handles -------------------------------------------------------------

/// The standard 14 text faces every conforming reader provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    /// `BaseFont` name.
    pub fn base_font(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::TimesItalic => "Times-Italic",
            Self::TimesBoldItalic => "Times-BoldItalic",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    pub fn is_bold(&self) -> bool {
        matches!(
            self,
            Self::HelveticaBold
                | Self::HelveticaBoldOblique
                | Self::TimesBold
                | Self::TimesBoldItalic
                | Self::CourierBold
                | Self::CourierBoldOblique
        )
    }

    /// The bold face of the same family and slant.
    pub fn bold(&self) -> Self {
        match self {
            Self::Helvetica | Self::HelveticaBold => Self::HelveticaBold,
            Self::HelveticaOblique | Self::HelveticaBoldOblique => Self::HelveticaBoldOblique,
            Self::TimesRoman | Self::TimesBold => Self::TimesBold,
            Self::TimesItalic | Self::TimesBoldItalic => Self::TimesBoldItalic,
            Self::Courier | Self::CourierBold => Self::CourierBold,
            Self::CourierOblique | Self::CourierBoldOblique => Self::CourierBoldOblique,
        }
    }
}

/// A parsed TrueType/OpenType program ready to embed.
#[derive(Debug, Clone, PartialEq)]
pub struct FontProgram {
    postscript_name: String,
    family_name: Option<String>,
    source_path: Option<PathBuf>,
    data: Vec<u8>,
    is_bold: bool,
    /// Advances for WinAnsi codes 0..=255, 1/1000 em.
    widths: Vec<f32>,
    ascent: f32,
    descent: f32,
    cap_height: f32,
    bbox: [f32; 4],
}

impl FontProgram {
    /// Parse a font file. `fallback_name` names the program when the file
    /// carries no PostScript name.
    pub fn parse(
        data: Vec<u8>,
        fallback_name: &str,
        source_path: Option<PathBuf>,
    ) -> Result<Self, TypekeepError> {
        if data.is_empty() {
            return Err(TypekeepError::FontProgram("empty font program".to_string()));
        }
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|e| TypekeepError::FontProgram(format!("cannot parse font: {e}")))?;

        let units = face.units_per_em().max(1) as f32;
        let scale = |v: f32| v * 1000.0 / units;

        let postscript_name = face
            .names()
            .into_iter()
            .find(|name| name.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
            .and_then(|name| name.to_string())
            .unwrap_or_else(|| fallback_name.to_string());
        let family_name = face
            .names()
            .into_iter()
            .find(|name| name.name_id == ttf_parser::name_id::FAMILY)
            .and_then(|name| name.to_string());

        let widths = (0..=255u8)
            .map(|code| {
                win_ansi_char(code)
                    .and_then(|ch| face.glyph_index(ch))
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .map(|adv| scale(adv as f32))
                    .unwrap_or(DEFAULT_GLYPH_WIDTH)
            })
            .collect();

        let bbox = face.global_bounding_box();
        let program = Self {
            postscript_name,
            family_name,
            source_path,
            is_bold: face.is_bold(),
            widths,
            ascent: scale(face.ascender() as f32),
            descent: scale(face.descender() as f32),
            cap_height: scale(face.capital_height().unwrap_or(face.ascender()) as f32),
            bbox: [
                scale(bbox.x_min as f32),
                scale(bbox.y_min as f32),
                scale(bbox.x_max as f32),
                scale(bbox.y_max as f32),
            ],
            data,
        };
        Ok(program)
    }

    /// Read and parse a font file from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TypekeepError> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse(data, &stem, Some(path.to_path_buf()))
    }

    pub fn postscript_name(&self) -> &str {
        &self.postscript_name
    }

    pub fn family_name(&self) -> Option<&str> {
        self.family_name.as_deref()
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_bold(&self) -> bool {
        self.is_bold
    }

    pub fn widths(&self) -> &[f32] {
        &self.widths
    }

    pub fn ascent(&self) -> f32 {
        self.ascent
    }

    pub fn descent(&self) -> f32 {
        self.descent
    }

    pub fn cap_height(&self) -> f32 {
        self.cap_height
    }

    pub fn bbox(&self) -> [f32; 4] {
        self.bbox
    }
}

/// Something `insert_text` can draw with.
#[derive(Debug, Clone, PartialEq)]
pub enum FontHandle {
    /// Reuse a font object already in the document.
    Document { object_id: ObjectId, base_font: String },
    /// Embed a TrueType/OpenType program.
    Program(Rc<FontProgram>),
    /// One of the standard 14 fonts; nothing is embedded.
    Standard(StandardFont),
}

impl FontHandle {
    /// Name the handle is known by before embedding.
    pub fn name(&self) -> &str {
        match self {
            Self::Document { base_font, .. } => base_font,
            Self::Program(program) => program.postscript_name(),
            Self::Standard(font) => font.base_font(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Stream;

    fn font_dict(entries: Vec<(&str, Object)>) -> Dictionary {
        let mut dict = Dictionary::new();
        for (k, v) in entries {
            dict.set(k, v);
        }
        dict
    }

    fn name(n: &str) -> Object {
        Object::Name(n.as_bytes().to_vec())
    }

    #[test]
    fn simple_widths_use_first_char_offset() {
        let doc = Document::with_version("1.5");
        let font = font_dict(vec![
            ("Type", name("Font")),
            ("Subtype", name("TrueType")),
            ("BaseFont", name("ArialMT")),
            ("FirstChar", Object::Integer(65)),
            (
                "Widths",
                Object::Array(vec![Object::Integer(667), Object::Integer(611)]),
            ),
        ]);
        let info = FontInfo::load(&doc, &font);
        assert_eq!(info.width(65), 667.0);
        assert_eq!(info.width(66), 611.0);
        assert_eq!(info.width(67), DEFAULT_GLYPH_WIDTH);
        assert_eq!(info.string_width(b"AB"), 1278.0);
    }

    #[test]
    fn differences_feed_the_codec() {
        let doc = Document::with_version("1.5");
        let encoding = font_dict(vec![(
            "Differences",
            Object::Array(vec![Object::Integer(1), name("Acircumflex"), name("space")]),
        )]);
        let font = font_dict(vec![
            ("Subtype", name("Type1")),
            ("BaseFont", name("ABCDEF+Custom")),
            ("Encoding", Object::Dictionary(encoding)),
        ]);
        let info = FontInfo::load(&doc, &font);
        assert_eq!(info.codec.decode(&[1, 2, b'A']), "Â A");
    }

    #[test]
    fn composite_widths_both_forms() {
        let mut doc = Document::with_version("1.5");
        let cid = font_dict(vec![
            ("Type", name("Font")),
            ("Subtype", name("CIDFontType2")),
            ("DW", Object::Integer(900)),
            (
                "W",
                Object::Array(vec![
                    Object::Integer(3),
                    Object::Array(vec![Object::Integer(250), Object::Integer(300)]),
                    Object::Integer(10),
                    Object::Integer(12),
                    Object::Integer(700),
                ]),
            ),
        ]);
        let cid_id = doc.add_object(Object::Dictionary(cid));
        let font = font_dict(vec![
            ("Type", name("Font")),
            ("Subtype", name("Type0")),
            ("BaseFont", name("Segoe")),
            ("DescendantFonts", Object::Array(vec![Object::Reference(cid_id)])),
        ]);
        let info = FontInfo::load(&doc, &font);
        assert!(info.is_composite());
        assert_eq!(info.width(3), 250.0);
        assert_eq!(info.width(4), 300.0);
        assert_eq!(info.width(11), 700.0);
        assert_eq!(info.width(99), 900.0);
    }

    #[test]
    fn inventory_detects_embedded_programs() {
        let mut doc = Document::with_version("1.5");
        let program_id = doc.add_object(Stream::new(Dictionary::new(), vec![0u8; 8]));
        let descriptor = font_dict(vec![
            ("Type", name("FontDescriptor")),
            ("FontFile2", Object::Reference(program_id)),
        ]);
        let descriptor_id = doc.add_object(Object::Dictionary(descriptor));
        doc.add_object(Object::Dictionary(font_dict(vec![
            ("Type", name("Font")),
            ("Subtype", name("TrueType")),
            ("BaseFont", name("ABCDEF+ArialMT")),
            ("FontDescriptor", Object::Reference(descriptor_id)),
        ])));
        doc.add_object(Object::Dictionary(font_dict(vec![
            ("Type", name("Font")),
            ("Subtype", name("Type1")),
            ("BaseFont", name("Helvetica")),
        ])));

        let inventory = collect_inventory(&doc);
        assert_eq!(inventory.len(), 2);
        let arial = &inventory["ABCDEF+ArialMT"];
        assert_eq!(
            arial.embedded,
            Some(EmbeddedProgram {
                kind: ProgramKind::TrueType,
                stream_id: program_id
            })
        );
        assert!(inventory["Helvetica"].embedded.is_none());
        assert_eq!(program_bytes(&doc, arial.embedded.as_ref().unwrap()).unwrap().len(), 8);
    }

    #[test]
    fn garbage_is_not_a_font_program() {
        let err = FontProgram::parse(vec![1, 2, 3, 4], "X", None).unwrap_err();
        assert!(matches!(err, TypekeepError::FontProgram(_)));
        assert!(FontProgram::parse(Vec::new(), "X", None).is_err());
    }

    #[test]
    fn standard_bold_variants() {
        assert_eq!(StandardFont::TimesItalic.bold(), StandardFont::TimesBoldItalic);
        assert!(StandardFont::HelveticaBold.is_bold());
        assert_eq!(FontHandle::Standard(StandardFont::Courier).name(), "Courier");
    }
}
