// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// typekeep-document — PDF access for the Typekeep text-edit engine.
//
// Provides document loading and saving, text-run extraction through a small
// content-stream interpreter, the font inventory, redaction of text-showing
// operators, and text insertion with font registration (document fonts,
// embedded TrueType programs, or the standard 14).

pub mod pdf;

// Re-export the primary types so callers can use `typekeep_document::PdfDocument` etc.
pub use pdf::{
    EmbeddedProgram, FontCodec, FontHandle, FontInventory, FontInventoryEntry, FontProgram,
    InsertText, PdfDocument, ProgramKind, StandardFont, parse_hex_color,
};
