// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF mutation — redaction of text-showing operators and insertion of new
// text segments, including font registration and TrueType embedding.
//
// Redaction keeps layout: a removed operator is replaced by a zero-ink
// `[n] TJ` that moves the text position by the same amount, so everything
// shown after it stays where it was.
//
// Insertion wraps the page's existing content in `q ... Q` once, then appends
// self-contained `q BT ... ET Q` segments positioned in default user space.

use std::collections::{BTreeMap, HashSet};

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, instrument};
use typekeep_core::BBox;
use typekeep_core::error::TypekeepError;

use super::content::ShownText;
use super::encoding::FontCodec;
use super::fonts::{FontHandle, FontProgram, StandardFont};
use super::objects::{
    page_content_bytes, page_font_dict, replace_page_content, resolve_dict, resolve_inherited,
};
use super::reader::PdfDocument;

/// Points of slack when deciding whether a run origin lies inside a box.
const REDACT_SLACK: f32 = 0.5;

/// A text segment to draw on a page.
#[derive(Debug, Clone)]
pub struct InsertText {
    /// Baseline origin in user space.
    pub origin: (f32, f32),
    pub text: String,
    pub font: FontHandle,
    pub size: f32,
    /// Fill colour, each channel 0..=1.
    pub color: [f32; 3],
    /// Baseline angle in degrees.
    pub rotation: f32,
}

/// Parse `#rrggbb` into fill channels.
pub fn parse_hex_color(value: &str) -> Option<[f32; 3]> {
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok().map(|v| v as f32 / 255.0);
    Some([channel(0)?, channel(2)?, channel(4)?])
}

impl PdfDocument {
    // -- Redaction ------------------------------------------------------------

    /// Remove every text-showing operator on `page` whose origin lies in
    /// `bbox`. Returns the number removed.
    #[instrument(skip(self), fields(page))]
    pub fn redact(&mut self, page: usize, bbox: BBox) -> Result<usize, TypekeepError> {
        let (operations, shown) = self.shown_text(page)?;
        let targets: BTreeMap<usize, &ShownText> = shown
            .iter()
            .filter(|s| !s.text.is_empty() && bbox.contains(s.origin.0, s.origin.1, REDACT_SLACK))
            .map(|s| (s.op_index, s))
            .collect();
        if targets.is_empty() {
            return Ok(0);
        }

        let mut rewritten = Vec::with_capacity(operations.len() + targets.len() * 3);
        for (index, op) in operations.into_iter().enumerate() {
            match targets.get(&index) {
                Some(target) => rewritten.extend(blank_show(&op, target)),
                None => rewritten.push(op),
            }
        }

        let bytes = Content {
            operations: rewritten,
        }
        .encode()
        .map_err(|err| TypekeepError::Pdf(format!("failed to encode redacted content: {}", err)))?;

        let page_id = self.page_id(page)?;
        replace_page_content(&mut self.document, page_id, bytes)?;
        debug!(removed = targets.len(), "operators redacted");
        Ok(targets.len())
    }

    // -- Insertion ------------------------------------------------------------

    /// Draw `insert.text` on `page`, registering its font on the page.
    #[instrument(skip_all, fields(page = page, font = insert.font.name(), size = insert.size))]
    pub fn insert_text(&mut self, page: usize, insert: &InsertText) -> Result<(), TypekeepError> {
        let page_id = self.page_id(page)?;

        let (font_id, encoded) = match &insert.font {
            FontHandle::Document { object_id, .. } => {
                let codec = self.font_info(*object_id)?.codec;
                (*object_id, codec.encode(&insert.text)?)
            }
            FontHandle::Program(program) => {
                let encoded = FontCodec::win_ansi(&[]).encode(&insert.text)?;
                (self.embed_program(program), encoded)
            }
            FontHandle::Standard(font) => {
                let encoded = FontCodec::win_ansi(&[]).encode(&insert.text)?;
                (self.standard_font(*font), encoded)
            }
        };
        let resource = self.ensure_page_font(page_id, font_id)?;

        let radians = insert.rotation.to_radians();
        let (sin, cos) = radians.sin_cos();
        let [r, g, b] = insert.color;
        let segment = vec![
            Operation::new("q", vec![]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(resource.into_bytes()), real(insert.size)],
            ),
            Operation::new("rg", vec![real(r), real(g), real(b)]),
            Operation::new(
                "Tm",
                vec![
                    real(cos),
                    real(sin),
                    real(-sin),
                    real(cos),
                    real(insert.origin.0),
                    real(insert.origin.1),
                ],
            ),
            Operation::new("Tj", vec![Object::String(encoded, StringFormat::Hexadecimal)]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ];
        let segment_bytes = Content {
            operations: segment,
        }
        .encode()
        .map_err(|err| TypekeepError::Pdf(format!("failed to encode inserted text: {}", err)))?;

        let existing = page_content_bytes(&self.document, page_id)?;
        let mut content = Vec::with_capacity(existing.len() + segment_bytes.len() + 8);
        if self.wrapped_pages.insert(page_id) {
            content.extend_from_slice(b"q\n");
            content.extend_from_slice(&existing);
            content.extend_from_slice(b"\nQ\n");
        } else {
            content.extend_from_slice(&existing);
            content.push(b'\n');
        }
        content.extend_from_slice(&segment_bytes);
        replace_page_content(&mut self.document, page_id, content)?;

        debug!(chars = insert.text.chars().count(), "text inserted");
        Ok(())
    }

    // -- Font registration ----------------------------------------------------

    /// Embed a TrueType program once per document under a fresh subset tag.
    fn embed_program(&mut self, program: &FontProgram) -> ObjectId {
        if let Some(id) = self.embedded_fonts.get(program.postscript_name()) {
            return *id;
        }
        let tag = self.next_subset_tag(program.postscript_name());
        let base_font = format!("{tag}+{}", program.postscript_name());

        let mut file_dict = Dictionary::new();
        file_dict.set("Length1", Object::Integer(program.data().len() as i64));
        let file_id = self
            .document
            .add_object(Stream::new(file_dict, program.data().to_vec()));

        let [x0, y0, x1, y1] = program.bbox();
        let mut descriptor = Dictionary::new();
        descriptor.set("Type", Object::Name(b"FontDescriptor".to_vec()));
        descriptor.set("FontName", Object::Name(base_font.as_bytes().to_vec()));
        descriptor.set("Flags", Object::Integer(32));
        descriptor.set(
            "FontBBox",
            Object::Array(vec![real(x0), real(y0), real(x1), real(y1)]),
        );
        descriptor.set("ItalicAngle", Object::Integer(0));
        descriptor.set("Ascent", real(program.ascent()));
        descriptor.set("Descent", real(program.descent()));
        descriptor.set("CapHeight", real(program.cap_height()));
        descriptor.set("StemV", Object::Integer(if program.is_bold() { 120 } else { 80 }));
        descriptor.set("FontFile2", Object::Reference(file_id));
        let descriptor_id = self.document.add_object(Object::Dictionary(descriptor));

        let widths = program.widths()[32..=255].iter().map(|w| real(*w)).collect();
        let mut font = Dictionary::new();
        font.set("Type", Object::Name(b"Font".to_vec()));
        font.set("Subtype", Object::Name(b"TrueType".to_vec()));
        font.set("BaseFont", Object::Name(base_font.as_bytes().to_vec()));
        font.set("FirstChar", Object::Integer(32));
        font.set("LastChar", Object::Integer(255));
        font.set("Widths", Object::Array(widths));
        font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        font.set("FontDescriptor", Object::Reference(descriptor_id));
        let font_id = self.document.add_object(Object::Dictionary(font));

        debug!(base_font = %base_font, "font program embedded");
        self.embedded_fonts
            .insert(program.postscript_name().to_string(), font_id);
        font_id
    }

    fn standard_font(&mut self, font: StandardFont) -> ObjectId {
        if let Some(id) = self.standard_fonts.get(&font) {
            return *id;
        }
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"Font".to_vec()));
        dict.set("Subtype", Object::Name(b"Type1".to_vec()));
        dict.set("BaseFont", Object::Name(font.base_font().as_bytes().to_vec()));
        dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        let id = self.document.add_object(Object::Dictionary(dict));
        self.standard_fonts.insert(font, id);
        id
    }

    /// Six upper-case letters, different for every embedding in a document.
    fn next_subset_tag(&mut self, name: &str) -> String {
        self.tag_sequence += 1;
        let mut state = name
            .bytes()
            .fold(0x9E37_79B9_7F4A_7C15u64 ^ self.tag_sequence as u64, |acc, b| {
                acc.rotate_left(5) ^ b as u64
            })
            .wrapping_mul(0x2545_F491_4F6C_DD1D);
        (0..6)
            .map(|_| {
                let letter = (b'A' + (state % 26) as u8) as char;
                state /= 26;
                letter
            })
            .collect()
    }

    /// Resource key under which `font_id` is available on the page, adding
    /// the font to the page's resources when needed.
    fn ensure_page_font(
        &mut self,
        page_id: ObjectId,
        font_id: ObjectId,
    ) -> Result<String, TypekeepError> {
        let mut taken: HashSet<Vec<u8>> = HashSet::new();
        if let Some(fonts) = page_font_dict(&self.document, page_id)? {
            for (key, value) in fonts.iter() {
                if let Object::Reference(id) = value
                    && *id == font_id
                {
                    return Ok(String::from_utf8_lossy(key).into_owned());
                }
                taken.insert(key.clone());
            }
        }
        let mut n = 1;
        let key = loop {
            let candidate = format!("TK{n}");
            if !taken.contains(candidate.as_bytes()) {
                break candidate;
            }
            n += 1;
        };

        let resources_id = self.materialize_resources(page_id)?;
        let fonts_id = self.materialize_fonts(resources_id)?;
        let fonts = self
            .document
            .get_object_mut(fonts_id)
            .and_then(|o| o.as_dict_mut())
            .map_err(|e| TypekeepError::Pdf(format!("font resources are not a dictionary: {e}")))?;
        fonts.set(key.as_str(), Object::Reference(font_id));
        Ok(key)
    }

    /// Make the page's `/Resources` an indirect object owned by (or shared
    /// with) the page, copying inherited resources down.
    fn materialize_resources(&mut self, page_id: ObjectId) -> Result<ObjectId, TypekeepError> {
        let current = self
            .document
            .get_object(page_id)
            .and_then(|o| o.as_dict())
            .map_err(|e| TypekeepError::Pdf(format!("failed to get page dictionary: {e}")))?
            .get(b"Resources")
            .ok()
            .cloned();

        let resources = match current {
            Some(Object::Reference(id)) => return Ok(id),
            Some(Object::Dictionary(dict)) => dict,
            _ => match resolve_inherited(&self.document, page_id, b"Resources")? {
                Some(inherited) => resolve_dict(&self.document, inherited)?.clone(),
                None => Dictionary::new(),
            },
        };
        let id = self.document.add_object(Object::Dictionary(resources));
        self.page_dict_mut(page_id)?
            .set("Resources", Object::Reference(id));
        Ok(id)
    }

    fn materialize_fonts(&mut self, resources_id: ObjectId) -> Result<ObjectId, TypekeepError> {
        let current = self
            .document
            .get_object(resources_id)
            .and_then(|o| o.as_dict())
            .map_err(|e| TypekeepError::Pdf(format!("resources are not a dictionary: {e}")))?
            .get(b"Font")
            .ok()
            .cloned();

        let fonts = match current {
            Some(Object::Reference(id)) => return Ok(id),
            Some(Object::Dictionary(dict)) => dict,
            _ => Dictionary::new(),
        };
        let id = self.document.add_object(Object::Dictionary(fonts));
        self.document
            .get_object_mut(resources_id)
            .and_then(|o| o.as_dict_mut())
            .map_err(|e| TypekeepError::Pdf(format!("resources are not a dictionary: {e}")))?
            .set("Font", Object::Reference(id));
        Ok(id)
    }

    fn page_dict_mut(&mut self, page_id: ObjectId) -> Result<&mut Dictionary, TypekeepError> {
        self.document
            .get_object_mut(page_id)
            .and_then(|o| o.as_dict_mut())
            .map_err(|e| TypekeepError::Pdf(format!("failed to get page dictionary: {e}")))
    }
}

fn real(value: f32) -> Object {
    Object::Real(value.into())
}

/// The operators that replace a redacted show: any line/spacing effect is
/// kept, the glyphs become a pure displacement.
fn blank_show(op: &Operation, shown: &ShownText) -> Vec<Operation> {
    let mut ops = Vec::new();
    match op.operator.as_str() {
        "\"" => {
            if let (Some(aw), Some(ac)) = (op.operands.first(), op.operands.get(1)) {
                ops.push(Operation::new("Tw", vec![aw.clone()]));
                ops.push(Operation::new("Tc", vec![ac.clone()]));
            }
            ops.push(Operation::new("T*", vec![]));
        }
        "'" => ops.push(Operation::new("T*", vec![])),
        _ => {}
    }
    let scale = shown.font_size * shown.h_scale;
    if scale != 0.0 && shown.displacement != 0.0 {
        let n = -shown.displacement * 1000.0 / scale;
        ops.push(Operation::new("TJ", vec![Object::Array(vec![real(n)])]));
    }
    ops
}
