//! RTF body pipeline: MS-OXRTFCP decompression, then HTML derivation.

pub mod html;

pub use html::{rtf_to_html, RtfError};

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use encoding_rs::Encoding;
use tracing::{info, warn};

use crate::parser::charset;

/// Size of the MS-OXRTFCP header (sizes, magic and CRC).
const HEADER_LEN: usize = 16;

const MAGIC_COMPRESSED: u32 = 0x7546_5A4C;
const MAGIC_UNCOMPRESSED: u32 = 0x414C_454D;

/// Upper bound on how much an `LZFu` payload may claim to expand per input byte.
const MAX_EXPANSION: usize = 16;

/// Decompress a `PR_RTF_COMPRESSED` payload and decode it in the given code page.
///
/// Returns `None` when the payload is not valid compressed RTF.
pub fn decompress_body(compressed: &[u8], encoding: &'static Encoding) -> Option<String> {
    if let Err(reason) = check_header(compressed) {
        info!(len = compressed.len(), reason, "Rejecting RTF payload");
        return None;
    }
    match compressed_rtf::decompress_rtf(compressed) {
        // Each char carries one raw byte (U+0000..=U+00FF).
        Ok(latin1) => {
            let bytes: Vec<u8> = latin1.chars().map(|c| c as u32 as u8).collect();
            Some(charset::decode(encoding, &bytes))
        }
        Err(e) => {
            info!(len = compressed.len(), error = %e, "Could not decompress RTF body");
            None
        }
    }
}

/// Validate the sizes in the header against the actual payload length.
fn check_header(data: &[u8]) -> Result<(), &'static str> {
    if data.len() < HEADER_LEN {
        return Err("shorter than its header");
    }
    let mut cursor = Cursor::new(&data[..HEADER_LEN]);
    let read = |c: &mut Cursor<&[u8]>| c.read_u32::<LittleEndian>().map_err(|_| "short header");
    let compressed_size = read(&mut cursor)? as usize;
    let raw_size = read(&mut cursor)? as usize;
    let magic = read(&mut cursor)?;

    if compressed_size.checked_add(4) != Some(data.len()) {
        return Err("compressed size does not match payload");
    }
    let body_len = data.len() - HEADER_LEN;
    match magic {
        MAGIC_UNCOMPRESSED if raw_size > body_len => Err("raw size exceeds payload"),
        MAGIC_COMPRESSED if raw_size > body_len.saturating_mul(MAX_EXPANSION) + HEADER_LEN => {
            Err("raw size implausible for payload")
        }
        MAGIC_UNCOMPRESSED | MAGIC_COMPRESSED => Ok(()),
        _ => Err("unknown compression type"),
    }
}

/// Derive HTML from a decompressed RTF body, logging instead of failing.
pub fn derive_html(rtf: &str, encoding: &'static Encoding) -> Option<String> {
    match rtf_to_html(rtf, encoding) {
        Ok(html) => Some(html),
        Err(e) => {
            warn!(error = %e, "RTF to HTML conversion failed");
            None
        }
    }
}
