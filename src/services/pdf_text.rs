//! Page text extraction over lopdf content streams.
//!
//! Strings are decoded through the font's `/ToUnicode` CMap when it has one, which is how
//! Type0 (Identity-H) Japanese fonts carry their text. Lines break on text positioning
//! operators, not only at the end of a text object.

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;

/// `TJ` adjustments below this (thousandths of an em) read as a word gap.
const TJ_SPACE_THRESHOLD: f32 = -250.0;

/// Largest `bfrange` expanded; wider ranges in broken CMaps are ignored.
const MAX_RANGE_LEN: u32 = 0xFFFF;

pub fn extract_page_text(doc: &Document, page_id: ObjectId) -> lopdf::Result<String> {
    let decoders = doc
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(name, font)| (name, FontDecoder::new(doc, font)))
        .collect::<HashMap<_, _>>();

    let content = Content::decode(&doc.get_page_content(page_id)?)?;

    let mut out = LineWriter::default();
    let mut font: Option<&FontDecoder> = None;

    for op in &content.operations {
        let operands = op.operands.as_slice();
        match op.operator.as_str() {
            "Tf" => {
                font = operands
                    .first()
                    .and_then(|o| o.as_name().ok())
                    .and_then(|name| decoders.get(name));
            }
            "Tj" | "TJ" => out.show(font, operands),
            "'" => {
                out.break_line();
                out.show(font, operands);
            }
            "\"" => {
                out.break_line();
                out.show(font, operands.get(2..).unwrap_or_default());
            }
            "T*" | "ET" => out.break_line(),
            "Td" | "TD" => {
                let ty = operands.get(1).and_then(|o| o.as_float().ok());
                if ty.is_some_and(|ty| ty != 0.0) {
                    out.break_line();
                }
            }
            "Tm" => {
                let y = operands.get(5).and_then(|o| o.as_float().ok());
                if y != out.matrix_y {
                    out.break_line();
                    out.matrix_y = y;
                }
            }
            _ => {}
        }
    }

    Ok(out.text)
}

#[derive(Default)]
struct LineWriter {
    text: String,
    matrix_y: Option<f32>,
}

impl LineWriter {
    fn break_line(&mut self) {
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
    }

    fn show(&mut self, font: Option<&FontDecoder>, operands: &[Object]) {
        for operand in operands {
            match operand {
                Object::String(bytes, _) => match font {
                    Some(font) => font.decode_into(bytes, &mut self.text),
                    None => self.text.push_str(&Document::decode_text(None, bytes)),
                },
                Object::Array(items) => self.show(font, items),
                Object::Integer(_) | Object::Real(_) => {
                    let gap = operand.as_float().unwrap_or_default();
                    if gap < TJ_SPACE_THRESHOLD && !self.text.ends_with([' ', '\n']) {
                        self.text.push(' ');
                    }
                }
                _ => {}
            }
        }
    }
}

enum FontDecoder {
    /// Codes of `code_len` bytes looked up in a ToUnicode CMap.
    Mapped {
        map: HashMap<u32, String>,
        code_len: usize,
        fallback: String,
    },
    /// Type0 font on a Unicode CMap (`UniJIS-UCS2-H` and friends).
    Utf16,
    /// Type0 font with CIDs and no way back to Unicode.
    Opaque,
    /// Simple font decoded through its named encoding.
    Simple(String),
}

impl FontDecoder {
    fn new(doc: &Document, font: &Dictionary) -> Self {
        let is_type0 = font
            .get(b"Subtype")
            .and_then(Object::as_name)
            .is_ok_and(|subtype| subtype == b"Type0");
        let encoding = font.get_font_encoding().to_string();

        let cmap = font
            .get_deref(b"ToUnicode", doc)
            .and_then(Object::as_stream)
            .ok()
            .map(stream_bytes)
            .map(|data| parse_to_unicode(&data));

        match cmap {
            Some(cmap) if !cmap.map.is_empty() => FontDecoder::Mapped {
                map: cmap.map,
                code_len: cmap.code_len.unwrap_or(if is_type0 { 2 } else { 1 }),
                fallback: encoding,
            },
            _ if is_type0 && (encoding.contains("UCS2") || encoding.contains("UTF16")) => {
                FontDecoder::Utf16
            }
            _ if is_type0 => FontDecoder::Opaque,
            _ => FontDecoder::Simple(encoding),
        }
    }

    fn decode_into(&self, bytes: &[u8], out: &mut String) {
        match self {
            FontDecoder::Mapped {
                map,
                code_len,
                fallback,
            } => {
                for code in bytes.chunks(*code_len) {
                    match map.get(&code_value(code)) {
                        Some(s) => out.push_str(s),
                        None if *code_len == 1 => {
                            out.push_str(&Document::decode_text(Some(fallback), code))
                        }
                        None => out.push('\u{FFFD}'),
                    }
                }
            }
            FontDecoder::Utf16 => out.push_str(&utf16_be(bytes)),
            FontDecoder::Opaque => {}
            FontDecoder::Simple(encoding) => {
                out.push_str(&Document::decode_text(Some(encoding), bytes))
            }
        }
    }
}

fn stream_bytes(stream: &Stream) -> Vec<u8> {
    stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone())
}

fn utf16_be(bytes: &[u8]) -> String {
    if bytes.len() % 2 != 0 {
        return bytes.iter().map(|&b| char::from(b)).collect();
    }
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect::<Vec<_>>();
    String::from_utf16_lossy(&units)
}

#[derive(Debug, Default)]
struct ToUnicodeCMap {
    map: HashMap<u32, String>,
    code_len: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Hex(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    Word(String),
}

fn code_value(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b))
}

fn parse_to_unicode(data: &[u8]) -> ToUnicodeCMap {
    let tokens = tokenize(data);
    let mut cmap = ToUnicodeCMap::default();
    let mut i = 0;

    while i < tokens.len() {
        let Token::Word(word) = &tokens[i] else {
            i += 1;
            continue;
        };
        i += 1;
        match word.as_str() {
            "begincodespacerange" => {
                if let Some(Token::Hex(lo)) = tokens.get(i) {
                    cmap.code_len.get_or_insert(lo.len().max(1));
                }
            }
            "beginbfchar" => {
                while let (Some(Token::Hex(src)), Some(Token::Hex(dst))) =
                    (tokens.get(i), tokens.get(i + 1))
                {
                    cmap.map.insert(code_value(src), utf16_be(dst));
                    i += 2;
                }
            }
            "beginbfrange" => {
                while let (Some(Token::Hex(lo)), Some(Token::Hex(hi))) =
                    (tokens.get(i), tokens.get(i + 1))
                {
                    let (lo, hi) = (code_value(lo), code_value(hi));
                    i += 2;
                    match tokens.get(i) {
                        Some(Token::Hex(dst)) => {
                            if hi >= lo && hi - lo <= MAX_RANGE_LEN {
                                for offset in 0..=(hi - lo) {
                                    cmap.map.insert(lo + offset, offset_unicode(dst, offset));
                                }
                            }
                            i += 1;
                        }
                        Some(Token::ArrayStart) => {
                            i += 1;
                            let mut code = lo;
                            while let Some(Token::Hex(dst)) = tokens.get(i) {
                                if code <= hi {
                                    cmap.map.insert(code, utf16_be(dst));
                                }
                                code = code.saturating_add(1);
                                i += 1;
                            }
                            if tokens.get(i) == Some(&Token::ArrayEnd) {
                                i += 1;
                            }
                        }
                        _ => break,
                    }
                }
            }
            _ => {}
        }
    }

    cmap
}

/// Destination of a `bfrange` entry: the last UTF-16 unit advances with the source code.
fn offset_unicode(dst: &[u8], offset: u32) -> String {
    if dst.len() < 2 || dst.len() % 2 != 0 {
        return utf16_be(dst);
    }
    let mut units = dst
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect::<Vec<_>>();
    if let Some(last) = units.last_mut() {
        *last = last.wrapping_add(offset as u16);
    }
    String::from_utf16_lossy(&units)
}

fn tokenize(data: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < data.len() {
        match data[i] {
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b'<' if data.get(i + 1) == Some(&b'<') => i += 2,
            b'>' if data.get(i + 1) == Some(&b'>') => i += 2,
            b'<' => {
                let end = data[i..]
                    .iter()
                    .position(|&b| b == b'>')
                    .map_or(data.len(), |p| i + p);
                tokens.push(Token::Hex(decode_hex(&data[i + 1..end])));
                i = end + 1;
            }
            b'[' => {
                tokens.push(Token::ArrayStart);
                i += 1;
            }
            b']' => {
                tokens.push(Token::ArrayEnd);
                i += 1;
            }
            b'(' => {
                let mut depth = 0usize;
                while i < data.len() {
                    match data[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                i += 1;
            }
            b if b.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                while i < data.len()
                    && !data[i].is_ascii_whitespace()
                    && !matches!(data[i], b'<' | b'>' | b'[' | b']' | b'(' | b'%')
                {
                    i += 1;
                }
                if i == start {
                    i += 1;
                    continue;
                }
                tokens.push(Token::Word(
                    String::from_utf8_lossy(&data[start..i]).into_owned(),
                ));
            }
        }
    }

    tokens
}

fn decode_hex(hex: &[u8]) -> Vec<u8> {
    let digits = hex
        .iter()
        .filter_map(|&b| char::from(b).to_digit(16))
        .map(|d| d as u8)
        .collect::<Vec<_>>();
    digits
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
        .collect()
}
