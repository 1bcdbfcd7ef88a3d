// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content-stream tokenizer with byte spans.
//
// Only as much of the PDF lexical grammar as content streams use: numbers,
// names, literal and hex strings, arrays, dictionaries, keywords, and
// operators. Comments are dropped. Inline image data (`ID ... EI`) is skipped
// without interpretation. Every token keeps the byte range it came from so a
// caller can splice replacements into the original stream.

use std::ops::Range;

use typekeep_core::error::TypekeepError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f32),
    Name(String),
    /// Literal string, escapes resolved.
    Literal(Vec<u8>),
    Hex(Vec<u8>),
    ArrayOpen,
    ArrayClose,
    DictOpen,
    DictClose,
    /// `true`, `false`, `null`.
    Keyword(String),
    Operator(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\x0c' | b'\0')
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// Split `data` into tokens. Fails on an unterminated string.
pub fn tokenize(data: &[u8]) -> Result<Vec<Token>, TypekeepError> {
    let mut lexer = Lexer { data, pos: 0 };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        let inline_image = matches!(&token.kind, TokenKind::Operator(op) if op == "ID");
        tokens.push(token);
        if inline_image {
            lexer.skip_inline_image();
        }
    }
    Ok(tokens)
}

struct Lexer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Lexer<'_> {
    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn next_token(&mut self) -> Result<Option<Token>, TypekeepError> {
        loop {
            match self.peek() {
                None => return Ok(None),
                Some(b) if is_whitespace(b) => self.pos += 1,
                Some(b'%') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' || b == b'\r' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                Some(_) => break,
            }
        }

        let start = self.pos;
        let kind = match self.data[start] {
            b'(' => TokenKind::Literal(self.literal()?),
            b'<' if self.data.get(start + 1) == Some(&b'<') => {
                self.pos += 2;
                TokenKind::DictOpen
            }
            b'<' => TokenKind::Hex(self.hex()?),
            b'>' if self.data.get(start + 1) == Some(&b'>') => {
                self.pos += 2;
                TokenKind::DictClose
            }
            b'[' => {
                self.pos += 1;
                TokenKind::ArrayOpen
            }
            b']' => {
                self.pos += 1;
                TokenKind::ArrayClose
            }
            b'/' => {
                self.pos += 1;
                TokenKind::Name(self.name())
            }
            _ if is_regular(self.data[start]) => {
                let word = self.regular();
                classify(&word)
            }
            _ => {
                // Stray delimiter (`)`, `>`, `{`, `}`): pass over it.
                self.pos += 1;
                return self.next_token();
            }
        };
        Ok(Some(Token {
            kind,
            span: start..self.pos,
        }))
    }

    fn regular(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_regular) {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.data[start..self.pos]).into_owned()
    }

    fn name(&mut self) -> String {
        let raw = self.regular();
        let bytes = raw.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'#'
                && let Some(hex) = raw.get(i + 1..i + 3)
                && let Ok(value) = u8::from_str_radix(hex, 16)
            {
                out.push(value);
                i += 3;
                continue;
            }
            out.push(bytes[i]);
            i += 1;
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    fn literal(&mut self) -> Result<Vec<u8>, TypekeepError> {
        let start = self.pos;
        self.pos += 1;
        let mut depth = 1usize;
        let mut out = Vec::new();
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'\\' => {
                    let Some(next) = self.peek() else { break };
                    self.pos += 1;
                    match next {
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0c),
                        b'0'..=b'7' => {
                            let mut value = (next - b'0') as u32;
                            for _ in 0..2 {
                                match self.peek() {
                                    Some(d @ b'0'..=b'7') => {
                                        value = value * 8 + (d - b'0') as u32;
                                        self.pos += 1;
                                    }
                                    _ => break,
                                }
                            }
                            out.push((value & 0xFF) as u8);
                        }
                        // Line continuation.
                        b'\r' => {
                            if self.peek() == Some(b'\n') {
                                self.pos += 1;
                            }
                        }
                        b'\n' => {}
                        other => out.push(other),
                    }
                }
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                    out.push(b);
                }
                _ => out.push(b),
            }
        }
        Err(TypekeepError::Pdf(format!("unterminated string at byte {start}")))
    }

    fn hex(&mut self) -> Result<Vec<u8>, TypekeepError> {
        let start = self.pos;
        self.pos += 1;
        let mut digits = Vec::new();
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'>' => {
                    if digits.len() % 2 == 1 {
                        digits.push(0);
                    }
                    return Ok(digits.chunks(2).map(|pair| (pair[0] << 4) | pair[1]).collect());
                }
                _ if is_whitespace(b) => {}
                _ => {
                    let value = (b as char).to_digit(16).ok_or_else(|| {
                        TypekeepError::Pdf(format!("invalid hex digit in string at byte {start}"))
                    })?;
                    digits.push(value as u8);
                }
            }
        }
        Err(TypekeepError::Pdf(format!("unterminated hex string at byte {start}")))
    }

    /// Skip from after `ID` to just past the matching `EI`.
    fn skip_inline_image(&mut self) {
        // One whitespace byte separates ID from the data.
        self.pos += 1;
        while self.pos + 1 < self.data.len() {
            let at_ei = &self.data[self.pos..self.pos + 2] == b"EI";
            let before_ok = self.pos == 0 || is_whitespace(self.data[self.pos - 1]);
            let after_ok = self.data.get(self.pos + 2).is_none_or(|b| is_whitespace(*b));
            if at_ei && before_ok && after_ok {
                return;
            }
            self.pos += 1;
        }
        self.pos = self.data.len();
    }
}

fn classify(word: &str) -> TokenKind {
    match word {
        "true" | "false" | "null" => TokenKind::Keyword(word.to_string()),
        _ => {
            let first = word.as_bytes()[0];
            if (first.is_ascii_digit() || matches!(first, b'+' | b'-' | b'.'))
                && let Ok(value) = word.parse::<f32>()
            {
                TokenKind::Number(value)
            } else {
                TokenKind::Operator(word.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(data: &[u8]) -> Vec<TokenKind> {
        tokenize(data).unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn op(name: &str) -> TokenKind {
        TokenKind::Operator(name.to_string())
    }

    #[test]
    fn basic_text_object() {
        assert_eq!(
            kinds(b"BT /F1 10 Tf 50 100 Td (Hi) Tj ET"),
            vec![
                op("BT"),
                TokenKind::Name("F1".into()),
                TokenKind::Number(10.0),
                op("Tf"),
                TokenKind::Number(50.0),
                TokenKind::Number(100.0),
                op("Td"),
                TokenKind::Literal(b"Hi".to_vec()),
                op("Tj"),
                op("ET"),
            ]
        );
    }

    #[test]
    fn literal_escapes_and_nesting() {
        assert_eq!(
            kinds(br"(a\(b\) (c) \\ \101\n) Tj"),
            vec![TokenKind::Literal(b"a(b) (c) \\ A\n".to_vec()), op("Tj")]
        );
        assert_eq!(kinds(b"(one\\\ntwo)"), vec![TokenKind::Literal(b"onetwo".to_vec())]);
    }

    #[test]
    fn hex_strings_pad_odd_digits() {
        assert_eq!(kinds(b"<48 69>"), vec![TokenKind::Hex(b"Hi".to_vec())]);
        assert_eq!(kinds(b"<7>"), vec![TokenKind::Hex(vec![0x70])]);
    }

    #[test]
    fn arrays_dicts_and_keywords() {
        assert_eq!(
            kinds(b"[(A) -120 (B)] TJ /Span <</MCID 0 /Open true>> BDC"),
            vec![
                TokenKind::ArrayOpen,
                TokenKind::Literal(b"A".to_vec()),
                TokenKind::Number(-120.0),
                TokenKind::Literal(b"B".to_vec()),
                TokenKind::ArrayClose,
                op("TJ"),
                TokenKind::Name("Span".into()),
                TokenKind::DictOpen,
                TokenKind::Name("MCID".into()),
                TokenKind::Number(0.0),
                TokenKind::Name("Open".into()),
                TokenKind::Keyword("true".into()),
                TokenKind::DictClose,
                op("BDC"),
            ]
        );
    }

    #[test]
    fn quote_operators_and_star() {
        assert_eq!(
            kinds(b"T* (a) ' 1 2 (b) \""),
            vec![
                op("T*"),
                TokenKind::Literal(b"a".to_vec()),
                op("'"),
                TokenKind::Number(1.0),
                TokenKind::Number(2.0),
                TokenKind::Literal(b"b".to_vec()),
                op("\""),
            ]
        );
    }

    #[test]
    fn name_hex_escapes() {
        assert_eq!(kinds(b"/F#231"), vec![TokenKind::Name("F#1".into())]);
    }

    #[test]
    fn comments_are_dropped() {
        assert_eq!(kinds(b"% note\nq Q"), vec![op("q"), op("Q")]);
    }

    #[test]
    fn inline_image_data_is_skipped() {
        let data = b"BI /W 1 /H 1 ID \x00(\xff) EI Q";
        assert_eq!(
            kinds(data),
            vec![
                op("BI"),
                TokenKind::Name("W".into()),
                TokenKind::Number(1.0),
                TokenKind::Name("H".into()),
                TokenKind::Number(1.0),
                op("ID"),
                op("EI"),
                op("Q"),
            ]
        );
    }

    #[test]
    fn spans_cover_source_bytes() {
        let data = b"  (Hi) Tj";
        let tokens = tokenize(data).unwrap();
        assert_eq!(&data[tokens[0].span.clone()], b"(Hi)");
        assert_eq!(&data[tokens[1].span.clone()], b"Tj");
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(tokenize(b"(never closed Tj").is_err());
        assert!(tokenize(b"<4869").is_err());
    }
}
