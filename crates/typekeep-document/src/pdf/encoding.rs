// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text encodings — mapping between string bytes in a content stream and
// Unicode, in both directions.
//
// Supported sources, in priority order:
//   1. A ToUnicode CMap (`bfchar` / `bfrange`).
//   2. The simple-font encoding: WinAnsiEncoding with `/Differences` applied.
// Composite (Type0) fonts use 2-byte codes.

use std::collections::BTreeMap;

use typekeep_core::error::TypekeepError;

/// WinAnsiEncoding code points 0x80..=0x9F. `None` marks unassigned codes.
const WIN_ANSI_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'), None, Some('\u{201A}'), Some('\u{0192}'),
    Some('\u{201E}'), Some('\u{2026}'), Some('\u{2020}'), Some('\u{2021}'),
    Some('\u{02C6}'), Some('\u{2030}'), Some('\u{0160}'), Some('\u{2039}'),
    Some('\u{0152}'), None, Some('\u{017D}'), None,
    None, Some('\u{2018}'), Some('\u{2019}'), Some('\u{201C}'),
    Some('\u{201D}'), Some('\u{2022}'), Some('\u{2013}'), Some('\u{2014}'),
    Some('\u{02DC}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203A}'),
    Some('\u{0153}'), None, Some('\u{017E}'), Some('\u{0178}'),
];

/// Decode one WinAnsi byte.
pub fn win_ansi_char(code: u8) -> Option<char> {
    match code {
        0x80..=0x9F => WIN_ANSI_HIGH[(code - 0x80) as usize],
        _ => Some(code as char),
    }
}

/// Encode one character as WinAnsi, if representable.
pub fn win_ansi_code(ch: char) -> Option<u8> {
    let cp = ch as u32;
    match cp {
        0x00..=0x7F | 0xA0..=0xFF => Some(cp as u8),
        _ => WIN_ANSI_HIGH
            .iter()
            .position(|c| *c == Some(ch))
            .map(|i| 0x80 + i as u8),
    }
}

/// Named glyphs that appear in `/Differences` arrays and are not a single
/// ASCII letter.
const GLYPH_NAMES: &[(&str, char)] = &[
    ("space", ' '), ("exclam", '!'), ("quotedbl", '"'), ("numbersign", '#'),
    ("dollar", '$'), ("percent", '%'), ("ampersand", '&'), ("quotesingle", '\''),
    ("parenleft", '('), ("parenright", ')'), ("asterisk", '*'), ("plus", '+'),
    ("comma", ','), ("hyphen", '-'), ("period", '.'), ("slash", '/'),
    ("zero", '0'), ("one", '1'), ("two", '2'), ("three", '3'), ("four", '4'),
    ("five", '5'), ("six", '6'), ("seven", '7'), ("eight", '8'), ("nine", '9'),
    ("colon", ':'), ("semicolon", ';'), ("less", '<'), ("equal", '='),
    ("greater", '>'), ("question", '?'), ("at", '@'), ("bracketleft", '['),
    ("backslash", '\\'), ("bracketright", ']'), ("asciicircum", '^'),
    ("underscore", '_'), ("grave", '`'), ("braceleft", '{'), ("bar", '|'),
    ("braceright", '}'), ("asciitilde", '~'),
    ("quoteleft", '\u{2018}'), ("quoteright", '\u{2019}'),
    ("quotedblleft", '\u{201C}'), ("quotedblright", '\u{201D}'),
    ("bullet", '\u{2022}'), ("endash", '\u{2013}'), ("emdash", '\u{2014}'),
    ("ellipsis", '\u{2026}'), ("Euro", '\u{20AC}'), ("trademark", '\u{2122}'),
    ("copyright", '\u{00A9}'), ("registered", '\u{00AE}'), ("degree", '\u{00B0}'),
    ("section", '\u{00A7}'), ("paragraph", '\u{00B6}'), ("nbspace", '\u{00A0}'),
    ("ordfeminine", '\u{00AA}'), ("ordmasculine", '\u{00BA}'),
    ("guillemotleft", '\u{00AB}'), ("guillemotright", '\u{00BB}'),
    ("fi", '\u{FB01}'), ("fl", '\u{FB02}'),
    ("Agrave", 'À'), ("Aacute", 'Á'), ("Acircumflex", 'Â'), ("Atilde", 'Ã'),
    ("Adieresis", 'Ä'), ("Aring", 'Å'), ("AE", 'Æ'), ("Ccedilla", 'Ç'),
    ("Egrave", 'È'), ("Eacute", 'É'), ("Ecircumflex", 'Ê'), ("Edieresis", 'Ë'),
    ("Igrave", 'Ì'), ("Iacute", 'Í'), ("Icircumflex", 'Î'), ("Idieresis", 'Ï'),
    ("Ntilde", 'Ñ'), ("Ograve", 'Ò'), ("Oacute", 'Ó'), ("Ocircumflex", 'Ô'),
    ("Otilde", 'Õ'), ("Odieresis", 'Ö'), ("Oslash", 'Ø'), ("Ugrave", 'Ù'),
    ("Uacute", 'Ú'), ("Ucircumflex", 'Û'), ("Udieresis", 'Ü'), ("Yacute", 'Ý'),
    ("germandbls", 'ß'),
    ("agrave", 'à'), ("aacute", 'á'), ("acircumflex", 'â'), ("atilde", 'ã'),
    ("adieresis", 'ä'), ("aring", 'å'), ("ae", 'æ'), ("ccedilla", 'ç'),
    ("egrave", 'è'), ("eacute", 'é'), ("ecircumflex", 'ê'), ("edieresis", 'ë'),
    ("igrave", 'ì'), ("iacute", 'í'), ("icircumflex", 'î'), ("idieresis", 'ï'),
    ("ntilde", 'ñ'), ("ograve", 'ò'), ("oacute", 'ó'), ("ocircumflex", 'ô'),
    ("otilde", 'õ'), ("odieresis", 'ö'), ("oslash", 'ø'), ("ugrave", 'ù'),
    ("uacute", 'ú'), ("ucircumflex", 'û'), ("udieresis", 'ü'), ("yacute", 'ý'),
    ("ydieresis", 'ÿ'),
];

/// Map a glyph name from a `/Differences` array to the character it draws.
pub fn glyph_name_char(name: &str) -> Option<char> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next())
        && c.is_ascii_alphabetic()
    {
        return Some(c);
    }
    if let Some(hex) = name.strip_prefix("uni")
        && hex.len() == 4
    {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    GLYPH_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, c)| *c)
}

/// Bidirectional mapping between font codes and Unicode text for one font.
#[derive(Debug, Clone, PartialEq)]
pub struct FontCodec {
    two_byte: bool,
    to_unicode: BTreeMap<u32, String>,
    simple: Option<Vec<Option<char>>>,
}

impl FontCodec {
    /// WinAnsiEncoding with optional `/Differences` overrides.
    pub fn win_ansi(differences: &[(u8, char)]) -> Self {
        let mut table: Vec<Option<char>> = (0..=255u8).map(win_ansi_char).collect();
        for (code, ch) in differences {
            table[*code as usize] = Some(*ch);
        }
        Self {
            two_byte: false,
            to_unicode: BTreeMap::new(),
            simple: Some(table),
        }
    }

    /// A codec driven by a ToUnicode CMap, falling back to `base` for codes
    /// the CMap does not cover (simple fonts only).
    pub fn with_to_unicode(
        two_byte: bool,
        cmap: BTreeMap<u32, String>,
        base: Option<FontCodec>,
    ) -> Self {
        Self {
            two_byte,
            to_unicode: cmap,
            simple: if two_byte { None } else { base.and_then(|b| b.simple) },
        }
    }

    pub fn is_two_byte(&self) -> bool {
        self.two_byte
    }

    /// Split encoded bytes into codes.
    pub fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|pair| match pair {
                    [hi, lo] => ((*hi as u32) << 8) | *lo as u32,
                    [single] => *single as u32,
                    _ => 0,
                })
                .collect()
        } else {
            bytes.iter().map(|b| *b as u32).collect()
        }
    }

    /// Text for a single code, empty when unmapped.
    pub fn code_text(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.get(&code) {
            return text.clone();
        }
        match &self.simple {
            Some(table) if code < 256 => table[code as usize].map(String::from).unwrap_or_default(),
            _ => String::new(),
        }
    }

    /// Decode an encoded string to Unicode.
    pub fn decode(&self, bytes: &[u8]) -> String {
        self.codes(bytes)
            .into_iter()
            .map(|code| self.code_text(code))
            .collect()
    }

    /// Encode Unicode text with this font's codes. Fails when any character
    /// has no code in the font.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, TypekeepError> {
        let mut reverse: BTreeMap<char, u32> = BTreeMap::new();
        for (code, mapped) in &self.to_unicode {
            let mut chars = mapped.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                reverse.entry(c).or_insert(*code);
            }
        }
        if let Some(table) = &self.simple {
            for (code, ch) in table.iter().enumerate() {
                if let Some(c) = ch {
                    reverse.entry(*c).or_insert(code as u32);
                }
            }
        }

        let mut out = Vec::with_capacity(text.len() * if self.two_byte { 2 } else { 1 });
        for ch in text.chars() {
            let code = reverse.get(&ch).ok_or_else(|| {
                TypekeepError::Encoding(format!("character {ch:?} has no code in this font"))
            })?;
            if self.two_byte {
                out.push((code >> 8) as u8);
                out.push((code & 0xFF) as u8);
            } else {
                out.push(*code as u8);
            }
        }
        Ok(out)
    }

    /// Whether every character of `text` can be encoded.
    pub fn can_encode(&self, text: &str) -> bool {
        self.encode(text).is_ok()
    }
}

// ---------------------------------------------------------------------------
// ToUnicode CMap parsing
// ---------------------------------------------------------------------------

/// Parse the `bfchar` and `bfrange` sections of a ToUnicode CMap.
pub fn parse_to_unicode(data: &[u8]) -> BTreeMap<u32, String> {
    let tokens = cmap_tokens(data);
    let mut map = BTreeMap::new();
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            CMapToken::Keyword(k) if k == "beginbfchar" => {
                i += 1;
                while i + 1 < tokens.len() {
                    match (&tokens[i], &tokens[i + 1]) {
                        (CMapToken::Hex(src), CMapToken::Hex(dst)) => {
                            map.insert(hex_code(src), utf16_text(dst));
                            i += 2;
                        }
                        _ => break,
                    }
                }
            }
            CMapToken::Keyword(k) if k == "beginbfrange" => {
                i += 1;
                while i + 2 < tokens.len() {
                    let (CMapToken::Hex(lo), CMapToken::Hex(hi)) = (&tokens[i], &tokens[i + 1])
                    else {
                        break;
                    };
                    let (lo, hi) = (hex_code(lo), hex_code(hi));
                    match &tokens[i + 2] {
                        CMapToken::Hex(dst) => {
                            let base = utf16_units(dst);
                            let last_code = hi.min(lo.saturating_add(0xFFFF));
                            for (offset, code) in (lo..=last_code).enumerate() {
                                let mut units = base.clone();
                                if let Some(last) = units.last_mut() {
                                    *last = last.wrapping_add(offset as u16);
                                }
                                map.insert(code, String::from_utf16_lossy(&units));
                            }
                            i += 3;
                        }
                        CMapToken::Array(items) => {
                            for (code, dst) in (lo..=hi).zip(items.iter()) {
                                map.insert(code, utf16_text(dst));
                            }
                            i += 3;
                        }
                        _ => break,
                    }
                }
            }
            _ => i += 1,
        }
    }
    map
}

#[derive(Debug)]
enum CMapToken {
    Hex(Vec<u8>),
    Array(Vec<Vec<u8>>),
    Keyword(String),
}

fn cmap_tokens(data: &[u8]) -> Vec<CMapToken> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < data.len() {
        match data[i] {
            b'<' if data.get(i + 1) != Some(&b'<') => {
                let (bytes, next) = read_hex(data, i + 1);
                tokens.push(CMapToken::Hex(bytes));
                i = next;
            }
            b'[' => {
                let mut items = Vec::new();
                i += 1;
                while i < data.len() && data[i] != b']' {
                    if data[i] == b'<' {
                        let (bytes, next) = read_hex(data, i + 1);
                        items.push(bytes);
                        i = next;
                    } else {
                        i += 1;
                    }
                }
                tokens.push(CMapToken::Array(items));
                i += 1;
            }
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < data.len() && data[i].is_ascii_alphanumeric() {
                    i += 1;
                }
                tokens.push(CMapToken::Keyword(
                    String::from_utf8_lossy(&data[start..i]).into_owned(),
                ));
            }
            _ => i += 1,
        }
    }
    tokens
}

/// Read hex digits up to `>`, returning the bytes and the index after `>`.
fn read_hex(data: &[u8], mut i: usize) -> (Vec<u8>, usize) {
    let mut digits = Vec::new();
    while i < data.len() && data[i] != b'>' {
        if data[i].is_ascii_hexdigit() {
            digits.push(data[i]);
        }
        i += 1;
    }
    if digits.len() % 2 == 1 {
        digits.push(b'0');
    }
    let bytes = digits
        .chunks(2)
        .filter_map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
        })
        .collect();
    (bytes, i + 1)
}

fn hex_code(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32)
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => ((*hi as u16) << 8) | *lo as u16,
            [single] => *single as u16,
            _ => 0,
        })
        .collect()
}

fn utf16_text(bytes: &[u8]) -> String {
    String::from_utf16_lossy(&utf16_units(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn win_ansi_covers_latin1_and_high_block() {
        assert_eq!(win_ansi_code('Â'), Some(0xC2));
        assert_eq!(win_ansi_char(0xC2), Some('Â'));
        assert_eq!(win_ansi_code('€'), Some(0x80));
        assert_eq!(win_ansi_char(0x81), None);
        assert_eq!(win_ansi_code('\u{4E2D}'), None);
    }

    #[test]
    fn differences_override_base_encoding() {
        let codec = FontCodec::win_ansi(&[(0x41, 'Z')]);
        assert_eq!(codec.decode(b"AB"), "ZB");
        assert_eq!(codec.encode("Z").unwrap(), vec![0x41]);
    }

    #[test]
    fn glyph_names_resolve() {
        assert_eq!(glyph_name_char("a"), Some('a'));
        assert_eq!(glyph_name_char("Acircumflex"), Some('Â'));
        assert_eq!(glyph_name_char("uni00C2"), Some('Â'));
        assert_eq!(glyph_name_char("g123"), None);
    }

    #[test]
    fn encode_rejects_unmapped_characters() {
        let codec = FontCodec::win_ansi(&[]);
        let err = codec.encode("日本").unwrap_err();
        assert!(matches!(err, TypekeepError::Encoding(_)));
        assert!(codec.can_encode("ALCÂNTARA"));
    }

    #[test]
    fn to_unicode_bfchar_and_bfrange() {
        let cmap = b"/CIDInit /ProcSet findresource begin
            1 begincodespacerange <0000> <FFFF> endcodespacerange
            2 beginbfchar
            <0003> <0020>
            <0024> <0041>
            endbfchar
            1 beginbfrange
            <0025> <0027> <0042>
            endbfrange
            1 beginbfrange
            <0030> <0031> [<00C2> <00E9>]
            endbfrange
            endcmap";
        let map = parse_to_unicode(cmap);
        assert_eq!(map.get(&0x0003).map(String::as_str), Some(" "));
        assert_eq!(map.get(&0x0024).map(String::as_str), Some("A"));
        assert_eq!(map.get(&0x0027).map(String::as_str), Some("D"));
        assert_eq!(map.get(&0x0030).map(String::as_str), Some("Â"));
        assert_eq!(map.get(&0x0031).map(String::as_str), Some("é"));
    }

    #[test]
    fn two_byte_codec_round_trips_mapped_text() {
        let cmap = parse_to_unicode(b"beginbfrange <0024> <0029> <0041> endbfrange");
        let codec = FontCodec::with_to_unicode(true, cmap, None);
        let encoded = codec.encode("ABC").unwrap();
        assert_eq!(encoded, vec![0x00, 0x24, 0x00, 0x25, 0x00, 0x26]);
        assert_eq!(codec.decode(&encoded), "ABC");
        assert!(!codec.can_encode("Z"));
    }
}
