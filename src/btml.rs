//! BTML, the binary encoding of the TML data model.
//!
//! The format is little-endian, byte-oriented and self-describing: every
//! value is one type byte followed by its payload. Files may start with a
//! 6-byte header (magic `btml`, version 1, string-table flag) and, when the
//! flag is set, a deduplicating string table for strings that occur at
//! least twice.
//!
//! ## Layout
//!
//! - type byte: low nibble is the tag (none 0, null 1, bool 2, float 3,
//!   int 4, text 5, comment 6, array 7, object 8); bit `0x10` on a text
//!   carries the quoted flag
//! - length prefix: one byte below 255, otherwise `255` plus a 4-byte LE
//!   length (string-table entries use a 2-byte LE length instead)
//! - strings are stored with a trailing `\0` which is included in their
//!   length
//!
//! ## Usage
//!
//! ```rust
//! use tml_cfg::{btml, tml};
//!
//! let value = tml!({ "a" => 1, "b" => 2 });
//! let bytes = btml::encode_with_header(&value, false).unwrap();
//! let decoded = btml::decode_auto(&bytes).unwrap();
//! assert!(decoded.value.content_eq(&value));
//! ```

use crate::{BtmlOptions, Error, Pair, Result, Value, ValueKind};
use std::collections::BTreeMap;

const MAGIC: [u8; 4] = *b"btml";
const VERSION: u8 = 1;
const HEADER_LEN: usize = 6;

const TYPE_NONE: u8 = 0;
const TYPE_NULL: u8 = 1;
const TYPE_BOOL: u8 = 2;
const TYPE_FLOAT: u8 = 3;
const TYPE_INT: u8 = 4;
const TYPE_TEXT: u8 = 5;
const TYPE_COMMENT: u8 = 6;
const TYPE_ARRAY: u8 = 7;
const TYPE_OBJECT: u8 = 8;
const QUOTED_FLAG: u8 = 0x10;

/// Statistics about a decoded string table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TableStats {
    pub entry_count: u32,
    pub byte_size: u32,
}

/// The result of a decode: the value plus what the byte stream contained.
#[derive(Clone, Debug)]
pub struct Decoded {
    pub value: Value,
    /// Bytes consumed; trailing bytes beyond this are legal.
    pub bytes_used: usize,
    pub header: bool,
    pub string_table: Option<TableStats>,
    pub warnings: Vec<String>,
}

fn push_length(out: &mut Vec<u8>, length: u32) {
    if length < 255 {
        out.push(length as u8);
    } else {
        out.push(255);
        out.extend_from_slice(&length.to_le_bytes());
    }
}

fn read_length(bytes: &[u8]) -> Result<(u32, usize)> {
    let first = *bytes
        .first()
        .ok_or_else(|| Error::format("truncated length prefix"))?;
    if first < 255 {
        return Ok((u32::from(first), 1));
    }
    if bytes.len() < 5 {
        return Err(Error::format("truncated length prefix"));
    }
    let mut quad = [0u8; 4];
    quad.copy_from_slice(&bytes[1..5]);
    Ok((u32::from_le_bytes(quad), 5))
}

fn read_length16(bytes: &[u8]) -> Result<(u16, usize)> {
    let first = *bytes
        .first()
        .ok_or_else(|| Error::format("truncated length prefix"))?;
    if first < 255 {
        return Ok((u16::from(first), 1));
    }
    if bytes.len() < 3 {
        return Err(Error::format("truncated length prefix"));
    }
    Ok((u16::from_le_bytes([bytes[1], bytes[2]]), 3))
}

fn count_strings<'a>(value: &'a Value, counts: &mut BTreeMap<&'a str, u32>) {
    match &value.kind {
        ValueKind::Text { text, .. } => *counts.entry(text).or_insert(0) += 1,
        ValueKind::Comment(text) => *counts.entry(text).or_insert(0) += 1,
        ValueKind::Array(values) => {
            for v in values {
                count_strings(v, counts);
            }
        }
        ValueKind::Object(pairs) => {
            for pair in pairs {
                count_strings(&pair.name, counts);
                count_strings(&pair.value, counts);
            }
        }
        _ => {}
    }
}

/// Appends the string table to `out` and returns the offset lookup.
///
/// Eligible are strings occurring at least twice with a length of 2 to
/// 32000 bytes; collection stops when the table would grow past offset
/// 0xFFFF. Strings that do not make it into the table are simply encoded
/// inline.
fn build_string_table(value: &Value, out: &mut Vec<u8>) -> Result<BTreeMap<String, u16>> {
    let mut counts = BTreeMap::new();
    count_strings(value, &mut counts);

    let table_begin = out.len();
    if table_begin > 0xffff - 2 {
        return Err(Error::format("string table starts beyond offset 0xffff"));
    }
    out.extend_from_slice(&[0, 0]);

    let mut table = BTreeMap::new();
    let mut entry_count: u32 = 0;
    let mut next_offset = out.len();
    for (text, count) in counts {
        if count < 2 || text.len() < 2 || text.len() > 32000 {
            continue;
        }
        if next_offset > 0xffff {
            break;
        }
        let length = (text.len() + 1) as u16;
        if length < 255 {
            out.push(length as u8);
        } else {
            out.push(255);
            out.extend_from_slice(&length.to_le_bytes());
        }
        out.extend_from_slice(text.as_bytes());
        out.push(0);
        table.insert(text.to_string(), next_offset as u16);
        entry_count += 1;
        next_offset = out.len();
    }
    if entry_count > 0xffff {
        return Err(Error::format("too many string table entries"));
    }
    let count_bytes = (entry_count as u16).to_le_bytes();
    out[table_begin] = count_bytes[0];
    out[table_begin + 1] = count_bytes[1];
    Ok(table)
}

fn encode_value(value: &Value, out: &mut Vec<u8>, table: Option<&BTreeMap<String, u16>>) {
    match &value.kind {
        ValueKind::None => out.push(TYPE_NONE),
        ValueKind::Null => out.push(TYPE_NULL),
        ValueKind::Bool(b) => {
            out.push(TYPE_BOOL);
            out.push(u8::from(*b));
        }
        ValueKind::Float(f) => {
            out.push(TYPE_FLOAT);
            out.extend_from_slice(&f.to_le_bytes());
        }
        ValueKind::Int { value, .. } => {
            // the parse base is intentionally not encoded
            out.push(TYPE_INT);
            out.extend_from_slice(&value.to_le_bytes());
        }
        ValueKind::Text { text, quoted } => {
            let mut type_byte = TYPE_TEXT;
            if *quoted {
                type_byte |= QUOTED_FLAG;
            }
            out.push(type_byte);
            encode_string(text, out, table);
        }
        ValueKind::Comment(text) => {
            out.push(TYPE_COMMENT);
            encode_string(text, out, table);
        }
        ValueKind::Array(values) => {
            out.push(TYPE_ARRAY);
            push_length(out, values.len() as u32);
            for v in values {
                encode_value(v, out, table);
            }
        }
        ValueKind::Object(pairs) => {
            out.push(TYPE_OBJECT);
            push_length(out, pairs.len() as u32);
            for pair in pairs {
                encode_value(&pair.name, out, table);
                encode_value(&pair.value, out, table);
            }
        }
    }
}

fn encode_string(text: &str, out: &mut Vec<u8>, table: Option<&BTreeMap<String, u16>>) {
    if let Some(offset) = table.and_then(|t| t.get(text)) {
        out.push(0);
        out.extend_from_slice(&offset.to_le_bytes());
        return;
    }
    push_length(out, (text.len() + 1) as u32);
    out.extend_from_slice(text.as_bytes());
    out.push(0);
}

/// Encodes a value without header or string table.
///
/// For embedded uses; [`decode`] and [`decode_auto`] read this form back.
#[must_use]
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_value(value, &mut out, None);
    out
}

/// Encodes a value with the 6-byte header and an optional string table.
///
/// # Errors
///
/// Returns an error if the string table cannot be created.
pub fn encode_with_header(value: &Value, use_string_table: bool) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(64);
    out.extend_from_slice(&MAGIC);
    out.push(VERSION);
    out.push(u8::from(use_string_table));
    let table = if use_string_table {
        Some(build_string_table(value, &mut out)?)
    } else {
        None
    };
    encode_value(value, &mut out, table.as_ref());
    Ok(out)
}

/// Encodes a value according to [`BtmlOptions`].
///
/// # Errors
///
/// Returns an error when a string table is requested without a header, or
/// if the string table cannot be created.
pub fn encode_with_options(value: &Value, options: &BtmlOptions) -> Result<Vec<u8>> {
    if !options.header {
        if options.string_table {
            return Err(Error::format("a string table requires a header"));
        }
        return Ok(encode(value));
    }
    encode_with_header(value, options.string_table)
}

fn read_string(bytes: &[u8], stream: Option<&[u8]>) -> Result<(String, usize)> {
    // with a string table, a leading 0 marks a 2-byte reference
    if let Some(stream) = stream {
        if bytes.first() == Some(&0) {
            if bytes.len() < 3 {
                return Err(Error::format("truncated string reference"));
            }
            let offset = u16::from_le_bytes([bytes[1], bytes[2]]) as usize;
            if offset == 0 {
                return Err(Error::format("string reference to reserved offset 0"));
            }
            if offset >= stream.len() {
                return Err(Error::format("string reference beyond the string table"));
            }
            let entry = &stream[offset..];
            let (len, used) = read_length16(entry)?;
            let len = len as usize;
            if len == 0 || entry.len() < used + len {
                return Err(Error::format("string reference with a bad length"));
            }
            let data = &entry[used..used + len];
            if data[len - 1] != 0 {
                return Err(Error::format("referenced string is not 0-terminated"));
            }
            let text = std::str::from_utf8(&data[..len - 1])
                .map_err(|_| Error::format("referenced string is not valid UTF-8"))?;
            return Ok((text.to_string(), 3));
        }
    }
    let (len, used) = read_length(bytes)?;
    let len = len as usize;
    if len == 0 {
        // an empty string still has length 1 for its 0 terminator
        return Err(Error::format("string with length 0"));
    }
    if bytes.len() < used + len {
        return Err(Error::format("truncated string"));
    }
    let data = &bytes[used..used + len];
    if data[len - 1] != 0 {
        return Err(Error::format("string is not 0-terminated"));
    }
    let text = std::str::from_utf8(&data[..len - 1])
        .map_err(|_| Error::format("string is not valid UTF-8"))?;
    Ok((text.to_string(), used + len))
}

fn decode_value(bytes: &[u8], stream: Option<&[u8]>) -> Result<(Value, usize)> {
    let type_byte = *bytes
        .first()
        .ok_or_else(|| Error::format("unexpected end of data"))?;
    let rest = &bytes[1..];
    match type_byte & 0x0f {
        TYPE_NONE => Ok((Value::none(), 1)),
        TYPE_NULL => Ok((Value::null(), 1)),
        TYPE_BOOL => {
            let b = rest
                .first()
                .ok_or_else(|| Error::format("truncated bool"))?;
            Ok((Value::bool(*b > 0), 2))
        }
        TYPE_FLOAT => {
            if rest.len() < 4 {
                return Err(Error::format("truncated float"));
            }
            let mut quad = [0u8; 4];
            quad.copy_from_slice(&rest[..4]);
            Ok((Value::float(f32::from_le_bytes(quad)), 5))
        }
        TYPE_INT => {
            if rest.len() < 4 {
                return Err(Error::format("truncated int"));
            }
            let mut quad = [0u8; 4];
            quad.copy_from_slice(&rest[..4]);
            // the parse base is not transported; it comes back as 10
            Ok((Value::int(i32::from_le_bytes(quad)), 5))
        }
        TYPE_TEXT => {
            let (text, used) = read_string(rest, stream)?;
            let value = if type_byte & QUOTED_FLAG != 0 {
                Value::quoted_text(text)
            } else {
                Value::text(text)
            };
            Ok((value, used + 1))
        }
        TYPE_COMMENT => {
            let (text, used) = read_string(rest, stream)?;
            Ok((Value::comment(text), used + 1))
        }
        TYPE_ARRAY => {
            let (count, mut used) = read_length(rest)?;
            used += 1;
            let mut values = Vec::with_capacity(count.min(4096) as usize);
            for _ in 0..count {
                let (value, n) = decode_value(&bytes[used..], stream)?;
                values.push(value);
                used += n;
            }
            Ok((Value::array(values), used))
        }
        TYPE_OBJECT => {
            let (count, mut used) = read_length(rest)?;
            used += 1;
            let mut pairs = Vec::with_capacity(count.min(4096) as usize);
            for _ in 0..count {
                let (name, n) = decode_value(&bytes[used..], stream)?;
                used += n;
                let (value, n) = decode_value(&bytes[used..], stream)?;
                used += n;
                pairs.push(Pair::new(name, value));
            }
            Ok((Value::object(pairs), used))
        }
        other => Err(Error::format(format!("unknown value type {}", other))),
    }
}

/// Validates the string table and returns its byte size and entry count.
fn load_string_table(bytes: &[u8]) -> Result<(usize, u32)> {
    if bytes.len() < 2 {
        return Err(Error::format("truncated string table header"));
    }
    let count = u16::from_le_bytes([bytes[0], bytes[1]]);
    let mut pos = 2usize;
    for index in 0..count {
        let (len, used) = read_length16(&bytes[pos..]).map_err(|_| {
            Error::format(format!("string table entry {} is truncated", index))
        })?;
        let len = len as usize;
        if len == 0 {
            return Err(Error::format(format!(
                "string table entry {} has length 0",
                index
            )));
        }
        if bytes.len() < pos + used + len {
            return Err(Error::format(format!(
                "string table entry {} is too long",
                index
            )));
        }
        if bytes[pos + used + len - 1] != 0 {
            return Err(Error::format(format!(
                "string table entry {} is not 0-terminated",
                index
            )));
        }
        pos += used + len;
    }
    Ok((pos, u32::from(count)))
}

fn finish(mut decoded: Decoded, total: usize) -> Decoded {
    if decoded.bytes_used < total {
        decoded.warnings.push(format!(
            "{} trailing byte(s) ignored",
            total - decoded.bytes_used
        ));
    }
    decoded
}

/// Decodes a headerless stream.
///
/// # Errors
///
/// Returns a format error for malformed bytes.
pub fn decode(bytes: &[u8]) -> Result<Decoded> {
    let (value, used) = decode_value(bytes, None)?;
    Ok(finish(
        Decoded {
            value,
            bytes_used: used,
            header: false,
            string_table: None,
            warnings: Vec::new(),
        },
        bytes.len(),
    ))
}

/// Decodes a stream that must start with the 6-byte header.
///
/// # Errors
///
/// Returns a format error for a wrong magic, an unsupported version, an
/// invalid flag byte or malformed content.
pub fn decode_with_header(bytes: &[u8]) -> Result<Decoded> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::format("stream is shorter than the header"));
    }
    if bytes[..4] != MAGIC {
        return Err(Error::format("wrong magic, expected 'btml'"));
    }
    if bytes[4] != VERSION {
        return Err(Error::format(format!(
            "unsupported version {}, only version 1 is supported",
            bytes[4]
        )));
    }
    if bytes[5] > 1 {
        return Err(Error::format(format!(
            "invalid string table flag {}",
            bytes[5]
        )));
    }
    let has_table = bytes[5] == 1;
    let (table_size, entry_count) = if has_table {
        load_string_table(&bytes[HEADER_LEN..])?
    } else {
        (0, 0)
    };
    let body = HEADER_LEN + table_size;
    let (value, used) = decode_value(&bytes[body..], has_table.then_some(bytes))?;
    Ok(finish(
        Decoded {
            value,
            bytes_used: body + used,
            header: true,
            string_table: has_table.then_some(TableStats {
                entry_count,
                byte_size: table_size as u32,
            }),
            warnings: Vec::new(),
        },
        bytes.len(),
    ))
}

/// Decodes a stream with or without header, probing for the magic.
///
/// # Errors
///
/// Same as [`decode`] and [`decode_with_header`].
pub fn decode_auto(bytes: &[u8]) -> Result<Decoded> {
    if bytes.len() >= HEADER_LEN && bytes[..4] == MAGIC {
        decode_with_header(bytes)
    } else {
        decode(bytes)
    }
}
