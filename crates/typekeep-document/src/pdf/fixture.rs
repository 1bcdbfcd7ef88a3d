// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Minimal in-memory documents for tests and benchmarks.

use lopdf::{Dictionary, Document, Object, Stream};

/// A font resource to place on a fixture page.
#[derive(Debug, Clone)]
pub struct FixtureFont {
    base_font: String,
    subtype: String,
    widths: Option<(i64, Vec<i64>)>,
    program: Option<Vec<u8>>,
}

impl FixtureFont {
    /// A non-embedded simple font with WinAnsiEncoding.
    pub fn standard(base_font: &str) -> Self {
        Self {
            base_font: base_font.to_string(),
            subtype: "Type1".to_string(),
            widths: None,
            program: None,
        }
    }

    /// A TrueType font whose descriptor carries `program` as `/FontFile2`.
    pub fn embedded_truetype(base_font: &str, program: Vec<u8>) -> Self {
        Self {
            base_font: base_font.to_string(),
            subtype: "TrueType".to_string(),
            widths: None,
            program: Some(program),
        }
    }

    pub fn with_widths(mut self, first_char: i64, widths: Vec<i64>) -> Self {
        self.widths = Some((first_char, widths));
        self
    }

    fn build(&self, doc: &mut Document) -> Object {
        let mut font = Dictionary::new();
        font.set("Type", Object::Name(b"Font".to_vec()));
        font.set("Subtype", Object::Name(self.subtype.as_bytes().to_vec()));
        font.set("BaseFont", Object::Name(self.base_font.as_bytes().to_vec()));
        font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));

        if let Some((first_char, widths)) = &self.widths {
            font.set("FirstChar", Object::Integer(*first_char));
            font.set("LastChar", Object::Integer(first_char + widths.len() as i64 - 1));
            font.set(
                "Widths",
                Object::Array(widths.iter().map(|w| Object::Integer(*w)).collect()),
            );
        }

        if let Some(program) = &self.program {
            let mut program_dict = Dictionary::new();
            program_dict.set("Length1", Object::Integer(program.len() as i64));
            let program_id = doc.add_object(Stream::new(program_dict, program.clone()));

            let mut descriptor = Dictionary::new();
            descriptor.set("Type", Object::Name(b"FontDescriptor".to_vec()));
            descriptor.set("FontName", Object::Name(self.base_font.as_bytes().to_vec()));
            descriptor.set("Flags", Object::Integer(32));
            descriptor.set("FontFile2", Object::Reference(program_id));
            let descriptor_id = doc.add_object(Object::Dictionary(descriptor));
            font.set("FontDescriptor", Object::Reference(descriptor_id));
        }

        Object::Reference(doc.add_object(Object::Dictionary(font)))
    }
}

/// One page: a content stream plus its font resources.
#[derive(Debug, Clone)]
pub struct FixturePage {
    content: String,
    fonts: Vec<(String, FixtureFont)>,
}

impl FixturePage {
    pub fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
            fonts: Vec::new(),
        }
    }

    pub fn with_font(mut self, resource: &str, font: FixtureFont) -> Self {
        self.fonts.push((resource.to_string(), font));
        self
    }
}

/// Build a US-Letter document with one page per fixture page.
pub fn build_document(pages: Vec<FixturePage>) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();

    for page in &pages {
        let mut font_dict = Dictionary::new();
        for (resource, font) in &page.fonts {
            let font_ref = font.build(&mut doc);
            font_dict.set(resource.as_str(), font_ref);
        }
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(font_dict));

        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            page.content.as_bytes().to_vec(),
        ));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(pages_id));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ]),
        );
        page_dict.set("Resources", Object::Dictionary(resources));
        page_dict.set("Contents", Object::Reference(content_id));
        kids.push(Object::Reference(doc.add_object(Object::Dictionary(page_dict))));
    }

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Count", Object::Integer(kids.len() as i64));
    pages_dict.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc
}

/// Build the document and serialise it to `path`.
pub fn write_document(
    pages: Vec<FixturePage>,
    path: impl AsRef<std::path::Path>,
) -> Result<(), typekeep_core::TypekeepError> {
    let mut doc = build_document(pages);
    doc.save(path.as_ref()).map_err(|err| {
        typekeep_core::TypekeepError::Pdf(format!("failed to write fixture: {}", err))
    })?;
    Ok(())
}

// -- Font programs ------------------------------------------------------------

/// Smallest TrueType file a font parser accepts: `head`, `hhea`, `maxp`
/// and a Windows `name` table carrying `family` and `postscript_name`.
/// One glyph, no outlines, 1000 units per em.
pub fn minimal_truetype(postscript_name: &str, family: &str) -> Vec<u8> {
    let mut head = Vec::with_capacity(54);
    head.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // version
    head.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // fontRevision
    head.extend_from_slice(&0u32.to_be_bytes()); // checkSumAdjustment
    head.extend_from_slice(&0x5F0F_3CF5u32.to_be_bytes()); // magicNumber
    head.extend_from_slice(&0u16.to_be_bytes()); // flags
    head.extend_from_slice(&1000u16.to_be_bytes()); // unitsPerEm
    head.extend_from_slice(&0i64.to_be_bytes()); // created
    head.extend_from_slice(&0i64.to_be_bytes()); // modified
    for v in [0i16, -200, 1000, 800] {
        head.extend_from_slice(&v.to_be_bytes()); // xMin yMin xMax yMax
    }
    head.extend_from_slice(&0u16.to_be_bytes()); // macStyle
    head.extend_from_slice(&8u16.to_be_bytes()); // lowestRecPPEM
    head.extend_from_slice(&2i16.to_be_bytes()); // fontDirectionHint
    head.extend_from_slice(&0i16.to_be_bytes()); // indexToLocFormat
    head.extend_from_slice(&0i16.to_be_bytes()); // glyphDataFormat

    let mut hhea = Vec::with_capacity(36);
    hhea.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    // ascender descender lineGap advanceWidthMax minLSB minRSB xMaxExtent
    // caretSlopeRise caretSlopeRun caretOffset reserved x4 metricDataFormat
    for v in [800i16, -200, 0, 500, 0, 0, 500, 1, 0, 0, 0, 0, 0, 0, 0] {
        hhea.extend_from_slice(&v.to_be_bytes());
    }
    hhea.extend_from_slice(&1u16.to_be_bytes()); // numberOfHMetrics

    let mut maxp = Vec::with_capacity(6);
    maxp.extend_from_slice(&0x0000_5000u32.to_be_bytes());
    maxp.extend_from_slice(&1u16.to_be_bytes()); // numGlyphs

    let utf16 = |s: &str| -> Vec<u8> {
        s.encode_utf16().flat_map(u16::to_be_bytes).collect()
    };
    let strings = [(1u16, utf16(family)), (6u16, utf16(postscript_name))];
    let mut name = Vec::new();
    name.extend_from_slice(&0u16.to_be_bytes()); // format
    name.extend_from_slice(&(strings.len() as u16).to_be_bytes());
    name.extend_from_slice(&(6 + 12 * strings.len() as u16).to_be_bytes());
    let mut offset = 0u16;
    for (name_id, bytes) in &strings {
        for v in [3u16, 1, 0x0409, *name_id, bytes.len() as u16, offset] {
            name.extend_from_slice(&v.to_be_bytes());
        }
        offset += bytes.len() as u16;
    }
    for (_, bytes) in &strings {
        name.extend_from_slice(bytes);
    }

    // Table records must be sorted by tag.
    let tables: [(&[u8; 4], Vec<u8>); 4] =
        [(b"head", head), (b"hhea", hhea), (b"maxp", maxp), (b"name", name)];
    let mut out = Vec::new();
    out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    out.extend_from_slice(&(tables.len() as u16).to_be_bytes());
    for v in [64u16, 2, 0] {
        out.extend_from_slice(&v.to_be_bytes()); // searchRange entrySelector rangeShift
    }
    let mut data_offset = 12 + 16 * tables.len();
    let mut body = Vec::new();
    for (tag, table) in &tables {
        out.extend_from_slice(*tag);
        out.extend_from_slice(&0u32.to_be_bytes()); // checksum
        out.extend_from_slice(&(data_offset as u32).to_be_bytes());
        out.extend_from_slice(&(table.len() as u32).to_be_bytes());
        let padded = table.len().div_ceil(4) * 4;
        body.extend_from_slice(table);
        body.resize(body.len() + padded - table.len(), 0);
        data_offset += padded;
    }
    out.extend_from_slice(&body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_truetype_parses() {
        let program = crate::FontProgram::parse(
            minimal_truetype("TypekeepSans-Bold", "Typekeep Sans"),
            "fallback",
            None,
        )
        .unwrap();
        assert_eq!(program.postscript_name(), "TypekeepSans-Bold");
        assert_eq!(program.family_name(), Some("Typekeep Sans"));
    }

    #[test]
    fn builds_requested_pages() {
        let doc = build_document(vec![
            FixturePage::new("BT ET"),
            FixturePage::new("BT ET").with_font("F1", FixtureFont::standard("Helvetica")),
        ]);
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn written_fixture_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.pdf");
        write_document(vec![FixturePage::new("BT ET")], &path).unwrap();
        assert_eq!(Document::load(&path).unwrap().get_pages().len(), 1);
    }
}
