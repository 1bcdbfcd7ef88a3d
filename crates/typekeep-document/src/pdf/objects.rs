// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Small helpers over the lopdf object model: reference resolution, numeric
// coercion, page-tree inheritance, and content stream access.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use typekeep_core::error::TypekeepError;

/// Follow a reference (possibly a chain of them) to the underlying object.
pub(crate) fn resolve<'a>(
    doc: &'a Document,
    object: &'a Object,
) -> Result<&'a Object, TypekeepError> {
    let mut current = object;
    // Reference chains deeper than this are treated as cycles.
    for _ in 0..32 {
        match current {
            Object::Reference(id) => {
                current = doc.get_object(*id).map_err(|err| {
                    TypekeepError::Pdf(format!("cannot resolve object {:?}: {}", id, err))
                })?;
            }
            other => return Ok(other),
        }
    }
    Err(TypekeepError::Pdf("reference chain too deep".to_string()))
}

/// Resolve `object` and view it as a dictionary (a stream's dictionary counts).
pub(crate) fn resolve_dict<'a>(
    doc: &'a Document,
    object: &'a Object,
) -> Result<&'a Dictionary, TypekeepError> {
    match resolve(doc, object)? {
        Object::Dictionary(dict) => Ok(dict),
        Object::Stream(stream) => Ok(&stream.dict),
        _ => Err(TypekeepError::Pdf("expected a dictionary".to_string())),
    }
}

/// Look up `key` in `dict` and resolve the value, `None` when absent.
pub(crate) fn get_resolved<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    dict.get(key).ok().and_then(|obj| resolve(doc, obj).ok())
}

pub(crate) fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

pub(crate) fn name_string(object: &Object) -> Option<String> {
    match object {
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

/// Look up a key in the page dictionary, walking up the page tree via
/// `/Parent` when the page itself does not carry it.
pub(crate) fn resolve_inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>, TypekeepError> {
    let mut current_id = page_id;
    for _ in 0..64 {
        let dict = doc
            .get_object(current_id)
            .and_then(|o| o.as_dict())
            .map_err(|e| TypekeepError::Pdf(format!("failed to get page dictionary: {e}")))?;

        if let Ok(value) = dict.get(key) {
            return Ok(Some(value));
        }

        match dict.get(b"Parent") {
            Ok(parent_obj) => {
                current_id = parent_obj
                    .as_reference()
                    .map_err(|e| TypekeepError::Pdf(format!("invalid /Parent reference: {e}")))?;
            }
            Err(_) => return Ok(None),
        }
    }
    Err(TypekeepError::Pdf("page tree too deep".to_string()))
}

/// The `/Font` sub-dictionary of a page's (possibly inherited) resources.
pub(crate) fn page_font_dict(
    doc: &Document,
    page_id: ObjectId,
) -> Result<Option<&Dictionary>, TypekeepError> {
    let Some(resources) = resolve_inherited(doc, page_id, b"Resources")? else {
        return Ok(None);
    };
    let resources = resolve_dict(doc, resources)?;
    match resources.get(b"Font") {
        Ok(fonts) => Ok(Some(resolve_dict(doc, fonts)?)),
        Err(_) => Ok(None),
    }
}

/// Decode a stream, decompressing if a filter is present.
pub(crate) fn stream_bytes(stream: &Stream) -> Result<Vec<u8>, TypekeepError> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|e| TypekeepError::Pdf(format!("failed to decompress stream: {e}")))
    } else {
        Ok(stream.content.clone())
    }
}

/// Concatenated, decoded content of a page (single stream or array).
pub(crate) fn page_content_bytes(
    doc: &Document,
    page_id: ObjectId,
) -> Result<Vec<u8>, TypekeepError> {
    let page_dict = doc
        .get_object(page_id)
        .and_then(|o| o.as_dict())
        .map_err(|e| TypekeepError::Pdf(format!("failed to get page dictionary: {e}")))?;

    let Ok(contents) = page_dict.get(b"Contents") else {
        return Ok(Vec::new());
    };

    match resolve(doc, contents)? {
        Object::Stream(stream) => stream_bytes(stream),
        Object::Array(items) => {
            let mut content = Vec::new();
            for item in items {
                let stream = resolve(doc, item)?.as_stream().map_err(|e| {
                    TypekeepError::Pdf(format!("/Contents array item is not a stream: {e}"))
                })?;
                let bytes = stream_bytes(stream)?;
                if !content.is_empty() {
                    content.push(b'\n');
                }
                content.extend_from_slice(&bytes);
            }
            Ok(content)
        }
        _ => Err(TypekeepError::Pdf(
            "/Contents is not a stream or array".to_string(),
        )),
    }
}

/// Replace a page's content with a single uncompressed stream.
pub(crate) fn replace_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    bytes: Vec<u8>,
) -> Result<(), TypekeepError> {
    let stream_id = doc.add_object(Stream::new(Dictionary::new(), bytes));
    let page = doc
        .get_object_mut(page_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|e| TypekeepError::Pdf(format!("failed to get page dictionary: {e}")))?;
    page.set("Contents", Object::Reference(stream_id));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_level_tree() -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        fonts.set("F1", Object::Name(b"dummy".to_vec()));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        let page_id = doc.add_object(Object::Dictionary(page));

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
        pages.set("Count", Object::Integer(1));
        pages.set("Resources", Object::Dictionary(resources));
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        (doc, page_id)
    }

    #[test]
    fn resources_are_inherited_from_parent() {
        let (doc, page_id) = two_level_tree();
        let fonts = page_font_dict(&doc, page_id).unwrap().unwrap();
        assert!(fonts.has(b"F1"));
    }

    #[test]
    fn missing_contents_is_empty() {
        let (doc, page_id) = two_level_tree();
        assert!(page_content_bytes(&doc, page_id).unwrap().is_empty());
    }

    #[test]
    fn replaced_content_reads_back() {
        let (mut doc, page_id) = two_level_tree();
        replace_page_content(&mut doc, page_id, b"BT ET".to_vec()).unwrap();
        assert_eq!(page_content_bytes(&doc, page_id).unwrap(), b"BT ET");
    }

    #[test]
    fn numbers_coerce_from_integers_and_reals() {
        assert_eq!(number(&Object::Integer(3)), Some(3.0));
        assert_eq!(number(&Object::Real(1.5)), Some(1.5));
        assert_eq!(number(&Object::Null), None);
    }
}
