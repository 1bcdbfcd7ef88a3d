// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — reading, text-run extraction, fonts, redaction, and insertion.

pub mod content;
pub mod encoding;
pub mod fixture;
pub mod fonts;
mod objects;
pub mod reader;
pub mod writer;

pub use encoding::FontCodec;
pub use fonts::{
    EmbeddedProgram, FontHandle, FontInventory, FontInventoryEntry, FontProgram, ProgramKind,
    StandardFont,
};
pub use reader::PdfDocument;
pub use writer::{InsertText, parse_hex_color};
