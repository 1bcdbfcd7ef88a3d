// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Strategy B: rewrite the encoded string of each target's text-showing
// operator in place.
//
// The font selection (`Tf`) and positioning are left untouched, so the run
// keeps its original font whenever that font's encoding can express the
// replacement. `TJ` arrays collapse to a single string, dropping their
// kerning. Lower confidence than redact-and-reinsert: the match is by
// decoded text, so it is only run as a retry or when pinned.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

use tracing::{debug, info, instrument, warn};
use typekeep_core::{EngineId, Result, TextRun, TypekeepError};
use typekeep_document::{FontCodec, PdfDocument};

use super::tokenizer::{Token, TokenKind, tokenize};
use super::{ApplyOutcome, Confidence, EditRequest, EditStrategy, FontSession};

/// Content-stream text substitution.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamRewrite;

/// A text-showing operator located in a content stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowSite {
    /// Bytes to replace: the string operand, or the whole `TJ` array.
    pub span: Range<usize>,
    pub operator: String,
    /// Font resource selected by the last `Tf`.
    pub resource: String,
    /// Encoded string operands in order.
    pub strings: Vec<Vec<u8>>,
}

impl ShowSite {
    fn decode(&self, codec: &FontCodec) -> String {
        self.strings.iter().map(|s| codec.decode(s)).collect()
    }

    /// Replacement bytes for `span`.
    fn replacement(&self, encoded: &[u8]) -> Vec<u8> {
        let hex = hex_string(encoded);
        if self.operator == "TJ" {
            format!("[{hex}]").into_bytes()
        } else {
            hex.into_bytes()
        }
    }
}

fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2 + 2);
    out.push('<');
    for b in bytes {
        out.push_str(&format!("{b:02X}"));
    }
    out.push('>');
    out
}

enum Operand {
    Name(String),
    String { bytes: Vec<u8>, span: Range<usize> },
    Array { strings: Vec<Vec<u8>>, span: Range<usize> },
    Other,
}

/// Every show operator in `tokens`, with the font resource in effect.
pub fn locate_shows(tokens: &[Token]) -> Vec<ShowSite> {
    let mut sites = Vec::new();
    let mut operands: Vec<Operand> = Vec::new();
    let mut array: Option<(usize, Vec<Vec<u8>>)> = None;
    let mut font: Option<String> = None;
    let mut saved: Vec<Option<String>> = Vec::new();

    for token in tokens {
        if let Some((start, strings)) = array.as_mut() {
            match &token.kind {
                TokenKind::ArrayClose => {
                    operands.push(Operand::Array {
                        strings: std::mem::take(strings),
                        span: *start..token.span.end,
                    });
                    array = None;
                }
                TokenKind::Literal(bytes) | TokenKind::Hex(bytes) => strings.push(bytes.clone()),
                _ => {}
            }
            continue;
        }

        match &token.kind {
            TokenKind::ArrayOpen => array = Some((token.span.start, Vec::new())),
            TokenKind::Name(name) => operands.push(Operand::Name(name.clone())),
            TokenKind::Literal(bytes) | TokenKind::Hex(bytes) => operands.push(Operand::String {
                bytes: bytes.clone(),
                span: token.span.clone(),
            }),
            TokenKind::Operator(op) => {
                match op.as_str() {
                    "q" => saved.push(font.clone()),
                    "Q" => {
                        if let Some(previous) = saved.pop() {
                            font = previous;
                        }
                    }
                    "Tf" => {
                        if operands.len() >= 2
                            && let Operand::Name(name) = &operands[operands.len() - 2]
                        {
                            font = Some(name.clone());
                        }
                    }
                    "Tj" | "'" | "\"" => {
                        if let Some(Operand::String { bytes, span }) = operands.last() {
                            sites.push(ShowSite {
                                span: span.clone(),
                                operator: op.clone(),
                                resource: font.clone().unwrap_or_default(),
                                strings: vec![bytes.clone()],
                            });
                        }
                    }
                    "TJ" => {
                        if let Some(Operand::Array { strings, span }) = operands.last() {
                            sites.push(ShowSite {
                                span: span.clone(),
                                operator: op.clone(),
                                resource: font.clone().unwrap_or_default(),
                                strings: strings.clone(),
                            });
                        }
                    }
                    _ => {}
                }
                operands.clear();
            }
            _ => operands.push(Operand::Other),
        }
    }
    sites
}

/// Replace `edits` (span, bytes) in `data`. Spans must not overlap.
fn splice(data: &[u8], mut edits: Vec<(Range<usize>, Vec<u8>)>) -> Vec<u8> {
    edits.sort_by_key(|(span, _)| span.start);
    let mut out = Vec::with_capacity(data.len());
    let mut cursor = 0;
    for (span, bytes) in edits {
        out.extend_from_slice(&data[cursor..span.start]);
        out.extend_from_slice(&bytes);
        cursor = span.end;
    }
    out.extend_from_slice(&data[cursor..]);
    out
}

impl StreamRewrite {
    /// Rewrite the targets of one page; returns the new content and the
    /// number of runs rewritten.
    fn rewrite_page(
        &self,
        document: &PdfDocument,
        page: usize,
        runs: &[&TextRun],
        request: &EditRequest<'_>,
    ) -> Result<(Vec<u8>, usize)> {
        let content = document.raw_content_stream(page)?;
        let tokens = tokenize(&content)?;
        let sites = locate_shows(&tokens);

        let mut codecs: HashMap<String, FontCodec> = HashMap::new();
        let mut claimed = vec![false; sites.len()];
        let mut edits = Vec::new();

        for run in runs {
            let Some(text) = request.replaced_content(run) else {
                continue;
            };
            if !codecs.contains_key(&run.font_resource) {
                let codec = document.encoder_for(page, &run.font_resource)?;
                codecs.insert(run.font_resource.clone(), codec);
            }
            let Some(codec) = codecs.get(&run.font_resource) else {
                continue;
            };

            let found = sites.iter().enumerate().position(|(i, site)| {
                !claimed[i]
                    && site.resource == run.font_resource
                    && site.decode(codec) == run.content
            });
            let Some(index) = found else {
                return Err(self.failure(format!(
                    "text operator for {:?} not found in the content of page {page}",
                    run.content
                )));
            };
            claimed[index] = true;

            let encoded = codec.encode(&text).map_err(|err| {
                self.failure(format!(
                    "font /{} cannot encode the replacement: {err}",
                    run.font_resource
                ))
            })?;
            let site = &sites[index];
            edits.push((site.span.clone(), site.replacement(&encoded)));
        }

        let count = edits.len();
        Ok((splice(&content, edits), count))
    }

    fn failure(&self, reason: String) -> TypekeepError {
        TypekeepError::Strategy {
            engine: self.id(),
            reason,
        }
    }
}

impl EditStrategy for StreamRewrite {
    fn id(&self) -> EngineId {
        EngineId::StreamRewrite
    }

    fn confidence(&self) -> Confidence {
        Confidence::LowConfidence
    }

    #[instrument(skip_all, fields(engine = %self.id(), targets = request.targets.len()))]
    fn apply(&self, request: &EditRequest<'_>, _fonts: &mut FontSession) -> Result<ApplyOutcome> {
        if !request.style.is_empty() {
            warn!("style overrides are ignored when rewriting the content stream");
        }
        let mut document = PdfDocument::open(request.input_path)?;

        let mut by_page: BTreeMap<usize, Vec<&TextRun>> = BTreeMap::new();
        for run in request.targets {
            by_page.entry(run.page).or_default().push(run);
        }

        let mut edited = 0;
        for (page, runs) in by_page {
            let (content, count) = self.rewrite_page(&document, page, &runs, request)?;
            if count > 0 {
                document.set_raw_content_stream(page, content)?;
            }
            debug!(page, count, "content stream rewritten");
            edited += count;
        }

        if edited == 0 {
            return Err(self.failure("no text operator was rewritten".to_string()));
        }

        document.save(request.output_path)?;
        info!(edited, output = %request.output_path.display(), "stream rewrite applied");
        Ok(ApplyOutcome {
            output_path: request.output_path.to_path_buf(),
            edited_runs: edited,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::{FontRequirementTracker, FontResolver, Platform};
    use typekeep_core::StyleOverrides;
    use typekeep_document::pdf::fixture::{FixtureFont, FixturePage, write_document};

    fn session() -> FontSession {
        FontSession::new(
            FontResolver::without_system_fonts(),
            FontRequirementTracker::for_platform(Platform::Linux),
        )
    }

    fn sites(content: &[u8]) -> Vec<ShowSite> {
        locate_shows(&tokenize(content).unwrap())
    }

    #[test]
    fn locates_show_operators_with_font() {
        let found = sites(b"BT /F1 10 Tf (A) Tj /F2 9 Tf [(B) -50 (C)] TJ 0 0 (D) \" ET");
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].resource, "F1");
        assert_eq!(found[0].strings, vec![b"A".to_vec()]);
        assert_eq!(found[1].resource, "F2");
        assert_eq!(found[1].operator, "TJ");
        assert_eq!(found[1].strings, vec![b"B".to_vec(), b"C".to_vec()]);
        assert_eq!(found[2].operator, "\"");
    }

    #[test]
    fn font_is_restored_by_grestore() {
        let found = sites(b"BT /F1 10 Tf ET q BT /F2 10 Tf ET Q BT (x) Tj ET");
        assert_eq!(found[0].resource, "F1");
    }

    #[test]
    fn tj_array_collapses_to_single_string() {
        let content = b"[(A) -50 (B)] TJ";
        let found = sites(content);
        let rewritten = splice(content, vec![(found[0].span.clone(), found[0].replacement(b"XY"))]);
        assert_eq!(rewritten, b"[<5859>] TJ".to_vec());
    }

    #[test]
    fn splice_keeps_surrounding_bytes() {
        let edits = vec![(7..10, b"<64>".to_vec()), (2..5, b"<62>".to_vec())];
        let out = splice(b"aa(b)cc(d)ee", edits);
        assert_eq!(out, b"aa<62>cc<64>ee".to_vec());
    }

    fn write(dir: &std::path::Path, content: &str) -> std::path::PathBuf {
        let path = dir.join("in.pdf");
        write_document(
            vec![FixturePage::new(content).with_font("F1", FixtureFont::standard("ArialMT"))],
            &path,
        )
        .unwrap();
        path
    }

    fn apply(
        input: &std::path::Path,
        output: &std::path::Path,
        search: &str,
        replacement: &str,
    ) -> Result<ApplyOutcome> {
        let targets: Vec<TextRun> = PdfDocument::open(input)
            .unwrap()
            .extract_text_runs()
            .unwrap()
            .into_iter()
            .filter(|r| r.content.contains(search))
            .collect();
        let style = StyleOverrides::default();
        let request = EditRequest {
            input_path: input,
            output_path: output,
            search_text: search,
            replacement_text: replacement,
            targets: &targets,
            style: &style,
        };
        StreamRewrite.apply(&request, &mut session())
    }

    #[test]
    fn rewrite_keeps_original_font_and_position() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(
            dir.path(),
            "BT /F1 10 Tf 50 100 Td (LUIZ EDUARDO ALVES DE ALCANTARA) Tj ET",
        );
        let output = dir.path().join("out.pdf");

        let outcome = apply(&input, &output, "ALCANTARA", "ALCÂNTARA").unwrap();
        assert_eq!(outcome.edited_runs, 1);

        let runs = PdfDocument::open(&output).unwrap().extract_text_runs().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].content, "LUIZ EDUARDO ALVES DE ALCÂNTARA");
        assert_eq!(runs[0].font_name, "ArialMT");
        assert_eq!(runs[0].font_resource, "F1");
        assert!((runs[0].bbox.x - 50.0).abs() < 0.01);
        assert!((runs[0].bbox.y - 100.0).abs() < 0.01);

        let raw = PdfDocument::open(&output).unwrap().raw_content_stream(0).unwrap();
        let text = String::from_utf8_lossy(&raw);
        assert!(text.contains("C2"), "Â is WinAnsi 0xC2: {text}");
    }

    #[test]
    fn rewrites_every_matching_operator_once() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(
            dir.path(),
            "BT /F1 10 Tf 50 100 Td (Paid) Tj 0 -12 Td [(Pa) 20 (id)] TJ 0 -12 Td (Due) ' ET",
        );
        let output = dir.path().join("out.pdf");
        let outcome = apply(&input, &output, "Paid", "Void").unwrap();
        assert_eq!(outcome.edited_runs, 2);

        let contents: Vec<String> = PdfDocument::open(&output)
            .unwrap()
            .extract_text_runs()
            .unwrap()
            .into_iter()
            .map(|r| r.content)
            .collect();
        assert_eq!(contents, vec!["Void", "Void", "Due"]);
    }

    #[test]
    fn unencodable_replacement_fails_the_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "BT /F1 10 Tf 50 100 Td (Tokyo) Tj ET");
        let output = dir.path().join("out.pdf");
        let err = apply(&input, &output, "Tokyo", "東京").unwrap_err();
        assert!(matches!(err, TypekeepError::Strategy { engine: EngineId::StreamRewrite, .. }));
        assert!(!output.exists());
    }
}
