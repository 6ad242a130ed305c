//! Leaf-name parsing and per-type value decoding.
//!
//! Decoding never fails: a type the decoder does not promote comes back as
//! [`PropertyValue::Unrecognized`] with its bytes untouched.

use byteorder::{ByteOrder, LittleEndian};
use encoding_rs::Encoding;

use super::charset;
use crate::model::property::{PropertyType, PropertyValue};

/// Name prefix of a leaf holding a single property.
pub const SUBSTG_PREFIX: &str = "__substg1.0_";

/// Name of the packed fixed-length properties leaf.
pub const PROPERTIES_STREAM: &str = "__properties_version1.0";

/// FILETIME epoch (1601-01-01) expressed in Unix-epoch milliseconds, negated.
const FILETIME_EPOCH_OFFSET_MS: i64 = 11_644_473_600_000;

/// Split a `__substg1.0_TTTTYYYY` leaf name into `(tag, type code)`.
///
/// Anything after the eight hex digits is ignored.
pub fn parse_leaf_name(name: &str) -> Option<(u16, u16)> {
    let digits = name.strip_prefix(SUBSTG_PREFIX)?.get(..8)?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let tag = u16::from_str_radix(&digits[..4], 16).ok()?;
    let type_code = u16::from_str_radix(&digits[4..], 16).ok()?;
    Some((tag, type_code))
}

/// Decode `bytes` according to `prop_type`.
pub fn decode_value(
    prop_type: PropertyType,
    bytes: &[u8],
    encoding: &'static Encoding,
) -> PropertyValue {
    match prop_type {
        PropertyType::String8 => PropertyValue::Text(decode_string8(bytes, encoding)),
        PropertyType::Unicode => PropertyValue::Text(decode_utf16le(bytes)),
        PropertyType::Binary => PropertyValue::Binary(bytes.to_vec()),
        PropertyType::SysTime => PropertyValue::Time(filetime_to_unix_ms(bytes)),
        other => PropertyValue::Unrecognized {
            type_code: other.code(),
            bytes: bytes.to_vec(),
        },
    }
}

/// 8-bit text in the active code page, re-decoded when the text names its own charset.
pub fn decode_string8(bytes: &[u8], encoding: &'static Encoding) -> String {
    let text = charset::decode(encoding, bytes);
    match charset::embedded_charset(&text) {
        Some(embedded) if embedded != encoding => {
            tracing::trace!(charset = embedded.name(), "Re-decoding string with embedded charset");
            charset::decode(embedded, bytes)
        }
        _ => text,
    }
}

/// Little-endian UTF-16; a dangling odd byte is dropped.
pub fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes.chunks_exact(2).map(LittleEndian::read_u16).collect();
    String::from_utf16_lossy(&units)
}

/// 100ns ticks since 1601-01-01 to Unix-epoch milliseconds. Short input is zero-padded.
pub fn filetime_to_unix_ms(bytes: &[u8]) -> i64 {
    let mut buf = [0u8; 8];
    let n = bytes.len().min(8);
    buf[..n].copy_from_slice(&bytes[..n]);
    LittleEndian::read_i64(&buf) / 10_000 - FILETIME_EPOCH_OFFSET_MS
}
