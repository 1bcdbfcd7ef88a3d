// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF document access — open, inspect, extract text runs and fonts, and
// save, using the `lopdf` crate.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{Document, ObjectId};
use tracing::{debug, info, instrument};
use typekeep_core::error::TypekeepError;
use typekeep_core::{BBox, TextRun};

use super::content::{ShownText, interpret, page_fonts};
use super::encoding::FontCodec;
use super::fonts::{
    EmbeddedProgram, FontInfo, FontInventory, StandardFont, collect_inventory, program_bytes,
};
use super::objects::{page_content_bytes, replace_page_content, resolve_dict};

/// An open PDF document.
///
/// Wraps `lopdf::Document` with 0-based page addressing and the text-run
/// and font views the edit engine works from. Mutating operations live in
/// the writer module.
pub struct PdfDocument {
    /// The underlying lopdf document.
    pub(crate) document: Document,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<PathBuf>,
    /// Page object ids in page order.
    page_ids: Vec<ObjectId>,
    /// Font objects added by `insert_text`, keyed by program name.
    pub(crate) embedded_fonts: HashMap<String, ObjectId>,
    pub(crate) standard_fonts: HashMap<StandardFont, ObjectId>,
    /// Counter feeding fresh subset tags for embedded programs.
    pub(crate) tag_sequence: u32,
    /// Pages whose original content has been wrapped in `q ... Q`.
    pub(crate) wrapped_pages: HashSet<ObjectId>,
}

impl PdfDocument {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TypekeepError> {
        let path_ref = path.as_ref();
        if !path_ref.is_file() {
            return Err(TypekeepError::DocumentNotFound(path_ref.to_path_buf()));
        }
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| TypekeepError::MalformedDocument {
            path: path_ref.to_path_buf(),
            reason: err.to_string(),
        })?;

        let mut doc = Self::from_document(document);
        doc.source_path = Some(path_ref.to_path_buf());
        debug!(pages = doc.page_count(), "PDF loaded");
        Ok(doc)
    }

    /// Create a document from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, TypekeepError> {
        let document = Document::load_mem(data).map_err(|err| TypekeepError::MalformedDocument {
            path: PathBuf::from("<memory>"),
            reason: err.to_string(),
        })?;

        let doc = Self::from_document(document);
        debug!(pages = doc.page_count(), "PDF loaded from bytes");
        Ok(doc)
    }

    /// Wrap an already-built lopdf document.
    pub fn from_document(document: Document) -> Self {
        let page_ids = document.get_pages().values().copied().collect();
        Self {
            document,
            source_path: None,
            page_ids,
            embedded_fonts: HashMap::new(),
            standard_fonts: HashMap::new(),
            tag_sequence: 0,
            wrapped_pages: HashSet::new(),
        }
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Object id of the page at 0-based `page`.
    pub fn page_id(&self, page: usize) -> Result<ObjectId, TypekeepError> {
        self.page_ids
            .get(page)
            .copied()
            .ok_or(TypekeepError::InvalidPage {
                page,
                page_count: self.page_ids.len(),
            })
    }

    /// Return the source path if the document was created via [`PdfDocument::open`].
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn inner(&self) -> &Document {
        &self.document
    }

    // -- Text runs ------------------------------------------------------------

    /// Every text run in the document, page by page.
    #[instrument(skip_all)]
    pub fn extract_text_runs(&self) -> Result<Vec<TextRun>, TypekeepError> {
        let mut runs = Vec::new();
        for page in 0..self.page_count() {
            runs.extend(self.extract_page_runs(page)?);
        }
        debug!(runs = runs.len(), "text runs extracted");
        Ok(runs)
    }

    /// Text runs of one page, one per show operator with non-empty text.
    pub fn extract_page_runs(&self, page: usize) -> Result<Vec<TextRun>, TypekeepError> {
        let (_, shown) = self.shown_text(page)?;
        let mut occurrences: HashMap<String, usize> = HashMap::new();

        let runs = shown
            .into_iter()
            .filter(|s| !s.text.is_empty())
            .map(|s| {
                let (x, y) = s.origin;
                let key = TextRun::position_key(page, x, y, s.effective_size);
                let occurrence = occurrences.entry(key).or_insert(0);
                let id = TextRun::derive_id(page, x, y, s.effective_size, *occurrence);
                *occurrence += 1;
                TextRun {
                    id,
                    page,
                    color: s.hex_color(),
                    content: s.text,
                    bbox: BBox::new(x, y, s.width, s.effective_size),
                    font_name: s.base_font,
                    font_resource: s.resource,
                    font_size: s.effective_size,
                    rotation: s.rotation,
                }
            })
            .collect();
        Ok(runs)
    }

    /// Decoded operations of a page and the show operators found in them.
    pub(crate) fn shown_text(
        &self,
        page: usize,
    ) -> Result<(Vec<Operation>, Vec<ShownText>), TypekeepError> {
        let page_id = self.page_id(page)?;
        let bytes = page_content_bytes(&self.document, page_id)?;
        let operations = Content::decode(&bytes)
            .map_err(|err| {
                TypekeepError::Pdf(format!("cannot decode content of page {page}: {err}"))
            })?
            .operations;
        let fonts = page_fonts(&self.document, page_id)?;
        let shown = interpret(&operations, &fonts);
        Ok((operations, shown))
    }

    // -- Fonts ----------------------------------------------------------------

    /// Every font object in the document, keyed by `BaseFont`.
    pub fn extract_font_inventory(&self) -> FontInventory {
        collect_inventory(&self.document)
    }

    /// Raw bytes of an embedded font program.
    pub fn embedded_program_bytes(
        &self,
        program: &EmbeddedProgram,
    ) -> Result<Vec<u8>, TypekeepError> {
        program_bytes(&self.document, program)
    }

    /// The text codec of the font behind a page resource key.
    pub fn encoder_for(&self, page: usize, resource: &str) -> Result<FontCodec, TypekeepError> {
        let page_id = self.page_id(page)?;
        let fonts: BTreeMap<String, FontInfo> = page_fonts(&self.document, page_id)?;
        fonts
            .get(resource)
            .map(|f| f.codec.clone())
            .ok_or_else(|| {
                TypekeepError::Pdf(format!("page {page} has no font resource /{resource}"))
            })
    }

    /// The text codec of a font object.
    pub fn codec_for_font(&self, object_id: ObjectId) -> Result<FontCodec, TypekeepError> {
        Ok(self.font_info(object_id)?.codec)
    }

    pub(crate) fn font_info(&self, object_id: ObjectId) -> Result<FontInfo, TypekeepError> {
        let object = self
            .document
            .get_object(object_id)
            .map_err(|err| {
                TypekeepError::Pdf(format!("cannot read font {:?}: {}", object_id, err))
            })?;
        let dict = resolve_dict(&self.document, object)?;
        Ok(FontInfo::load(&self.document, dict))
    }

    // -- Raw content ----------------------------------------------------------

    /// Decoded content of a page, multiple streams concatenated.
    pub fn raw_content_stream(&self, page: usize) -> Result<Vec<u8>, TypekeepError> {
        page_content_bytes(&self.document, self.page_id(page)?)
    }

    /// Replace a page's content with `bytes` (stored uncompressed).
    pub fn set_raw_content_stream(
        &mut self,
        page: usize,
        bytes: Vec<u8>,
    ) -> Result<(), TypekeepError> {
        let page_id = self.page_id(page)?;
        replace_page_content(&mut self.document, page_id, bytes)
    }

    // -- Output ---------------------------------------------------------------

    /// Write the document to `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), TypekeepError> {
        let path_ref = path.as_ref();
        self.document.save(path_ref).map_err(|err| {
            TypekeepError::Pdf(format!("failed to save {}: {}", path_ref.display(), err))
        })?;
        debug!("PDF saved");
        Ok(())
    }

    /// Serialise the document to bytes.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, TypekeepError> {
        let mut output = Vec::new();
        self.document.save_to(&mut output).map_err(|err| {
            TypekeepError::Pdf(format!("failed to serialise PDF: {}", err))
        })?;
        Ok(output)
    }
}
