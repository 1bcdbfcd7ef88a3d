// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content stream interpretation — a small graphics/text state machine that
// turns a page's operators into positioned text spans.
//
// Handled operators:
//   graphics   q Q cm
//   text       BT ET Tf Tc Tw Tz TL Ts Td TD Tm T*
//   showing    Tj TJ ' "
//   colour     g rg k sc scn (fill only)

use std::collections::BTreeMap;

use lopdf::content::Operation;
use lopdf::{Document, Object, ObjectId};

use super::fonts::FontInfo;
use super::objects::{number, page_font_dict, resolve_dict};
use typekeep_core::error::TypekeepError;

/// Affine transform `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix(pub [f32; 6]);

impl Matrix {
    pub const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    pub fn translate(tx: f32, ty: f32) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a * a2 + b * c2,
            a * b2 + b * d2,
            c * a2 + d * c2,
            c * b2 + d * d2,
            e * a2 + f * c2 + e2,
            e * b2 + f * d2 + f2,
        ])
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }

    /// Length of the transformed vector `(x, y)`, translation ignored.
    pub fn scale_vector(&self, x: f32, y: f32) -> f32 {
        let [a, b, c, d, _, _] = self.0;
        let (vx, vy) = (a * x + c * y, b * x + d * y);
        (vx * vx + vy * vy).sqrt()
    }

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        if operands.len() < 6 {
            return None;
        }
        let mut m = [0.0f32; 6];
        for (slot, obj) in m.iter_mut().zip(operands) {
            *slot = number(obj)?;
        }
        Some(Matrix(m))
    }
}

/// One text-showing operator with everything needed to locate, remove, or
/// report it.
#[derive(Debug, Clone)]
pub struct ShownText {
    /// Index of the operator in the decoded operation list.
    pub op_index: usize,
    pub operator: String,
    /// Font resource key in effect (`F1`).
    pub resource: String,
    pub base_font: String,
    pub text: String,
    /// Concatenated encoded string bytes of the operator.
    pub encoded: Vec<u8>,
    /// Origin in user space.
    pub origin: (f32, f32),
    /// Advance along the baseline in user space.
    pub width: f32,
    /// Rendered size: `Tf` size scaled by the text and graphics matrices.
    pub effective_size: f32,
    /// Baseline angle in degrees.
    pub rotation: f32,
    pub color: [f32; 3],
    /// Horizontal displacement in unscaled text space.
    pub displacement: f32,
    /// `Tf` size and horizontal scale (`Tz`/100) at the time of showing.
    pub font_size: f32,
    pub h_scale: f32,
}

impl ShownText {
    /// Fill colour as `#rrggbb`.
    pub fn hex_color(&self) -> String {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02x}{:02x}{:02x}",
            channel(self.color[0]),
            channel(self.color[1]),
            channel(self.color[2])
        )
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    fill: [f32; 3],
    char_spacing: f32,
    word_spacing: f32,
    h_scale: f32,
    leading: f32,
    rise: f32,
    font: Option<String>,
    font_size: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            fill: [0.0, 0.0, 0.0],
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
            font: None,
            font_size: 0.0,
        }
    }
}

/// Load every font resource of a page, keyed by resource name.
pub(crate) fn page_fonts(
    doc: &Document,
    page_id: ObjectId,
) -> Result<BTreeMap<String, FontInfo>, TypekeepError> {
    let mut fonts = BTreeMap::new();
    if let Some(dict) = page_font_dict(doc, page_id)? {
        for (key, value) in dict.iter() {
            if let Ok(font) = resolve_dict(doc, value) {
                fonts.insert(String::from_utf8_lossy(key).into_owned(), FontInfo::load(doc, font));
            }
        }
    }
    Ok(fonts)
}

/// Walk `operations`, returning every show operator in order.
pub(crate) fn interpret(
    operations: &[Operation],
    fonts: &BTreeMap<String, FontInfo>,
) -> Vec<ShownText> {
    let fallback_font = FontInfo::unknown();
    let mut state = GraphicsState::default();
    let mut stack: Vec<GraphicsState> = Vec::new();
    let mut tm = Matrix::IDENTITY;
    let mut tlm = Matrix::IDENTITY;
    let mut shown = Vec::new();

    for (index, op) in operations.iter().enumerate() {
        let operands = &op.operands;
        let num = |i: usize| operands.get(i).and_then(number);

        match op.operator.as_str() {
            "q" => stack.push(state.clone()),
            "Q" => {
                if let Some(saved) = stack.pop() {
                    state = saved;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    state.ctm = m.then(&state.ctm);
                }
            }
            "BT" => {
                tm = Matrix::IDENTITY;
                tlm = Matrix::IDENTITY;
            }
            "ET" => {}
            "Tf" => {
                if let Some(Object::Name(name)) = operands.first() {
                    state.font = Some(String::from_utf8_lossy(name).into_owned());
                }
                if let Some(size) = num(1) {
                    state.font_size = size;
                }
            }
            "Tc" => state.char_spacing = num(0).unwrap_or(state.char_spacing),
            "Tw" => state.word_spacing = num(0).unwrap_or(state.word_spacing),
            "Tz" => state.h_scale = num(0).map(|v| v / 100.0).unwrap_or(state.h_scale),
            "TL" => state.leading = num(0).unwrap_or(state.leading),
            "Ts" => state.rise = num(0).unwrap_or(state.rise),
            "Td" | "TD" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    tlm = Matrix::translate(tx, ty).then(&tlm);
                    tm = tlm;
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    tlm = m;
                    tm = m;
                }
            }
            "T*" => {
                tlm = Matrix::translate(0.0, -state.leading).then(&tlm);
                tm = tlm;
            }
            "Tj" | "'" | "\"" | "TJ" => {
                if op.operator == "\"" {
                    state.word_spacing = num(0).unwrap_or(state.word_spacing);
                    state.char_spacing = num(1).unwrap_or(state.char_spacing);
                }
                if op.operator == "'" || op.operator == "\"" {
                    tlm = Matrix::translate(0.0, -state.leading).then(&tlm);
                    tm = tlm;
                }

                let resource = state.font.clone().unwrap_or_default();
                let font = fonts.get(&resource).unwrap_or(&fallback_font);
                let start = tm.then(&state.ctm);

                let mut text = String::new();
                let mut encoded = Vec::new();
                let mut displacement = 0.0f32;

                let mut show = |bytes: &[u8], displacement: &mut f32| {
                    for code in font.codec.codes(bytes) {
                        let glyph = font.width(code) / 1000.0;
                        let word = if !font.is_composite() && code == 32 {
                            state.word_spacing
                        } else {
                            0.0
                        };
                        *displacement +=
                            (glyph * state.font_size + state.char_spacing + word) * state.h_scale;
                        text.push_str(&font.codec.code_text(code));
                    }
                    encoded.extend_from_slice(bytes);
                };

                match op.operator.as_str() {
                    "TJ" => {
                        if let Some(Object::Array(items)) = operands.first() {
                            for item in items {
                                match item {
                                    Object::String(bytes, _) => show(bytes, &mut displacement),
                                    other => {
                                        if let Some(n) = number(other) {
                                            displacement -=
                                                n / 1000.0 * state.font_size * state.h_scale;
                                        }
                                    }
                                }
                            }
                        }
                    }
                    _ => {
                        if let Some(Object::String(bytes, _)) = operands.last() {
                            show(bytes, &mut displacement);
                        }
                    }
                }

                let origin = start.apply(0.0, state.rise);
                let [a, b, ..] = start.0;
                shown.push(ShownText {
                    op_index: index,
                    operator: op.operator.clone(),
                    resource,
                    base_font: font.base_font.clone(),
                    text,
                    encoded,
                    origin,
                    width: start.scale_vector(displacement, 0.0),
                    effective_size: state.font_size * start.scale_vector(0.0, 1.0),
                    rotation: b.atan2(a).to_degrees(),
                    color: state.fill,
                    displacement,
                    font_size: state.font_size,
                    h_scale: state.h_scale,
                });

                tm = Matrix::translate(displacement, 0.0).then(&tm);
            }
            "g" => {
                if let Some(gray) = num(0) {
                    state.fill = [gray, gray, gray];
                }
            }
            "rg" => {
                if let (Some(r), Some(g), Some(b)) = (num(0), num(1), num(2)) {
                    state.fill = [r, g, b];
                }
            }
            "k" => {
                if let (Some(c), Some(m), Some(y), Some(k)) = (num(0), num(1), num(2), num(3)) {
                    state.fill = cmyk_to_rgb(c, m, y, k);
                }
            }
            "sc" | "scn" => {
                let values: Vec<f32> = operands.iter().filter_map(number).collect();
                match values.as_slice() {
                    [gray] => state.fill = [*gray, *gray, *gray],
                    [r, g, b] => state.fill = [*r, *g, *b],
                    [c, m, y, k] => state.fill = cmyk_to_rgb(*c, *m, *y, *k),
                    _ => {}
                }
            }
            _ => {}
        }
    }

    shown
}

fn cmyk_to_rgb(c: f32, m: f32, y: f32, k: f32) -> [f32; 3] {
    [
        (1.0 - c) * (1.0 - k),
        (1.0 - m) * (1.0 - k),
        (1.0 - y) * (1.0 - k),
    ]
}
