//! Splitter for the packed `__properties_version1.0` leaf.
//!
//! Each entry starts with a 4-byte little-endian property tag: the high half is
//! the property id, the low half the type code. Fixed-width values are carried
//! inline and come out as records; variable-width values only announce their size
//! here and are decoded from their own `__substg1.0_*` leaf instead.

use std::io::{self, Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::trace;

use crate::model::property::{InlineLayout, PropertyType};

/// A fixed-width property pulled out of a properties stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineRecord {
    pub tag: u16,
    pub prop_type: PropertyType,
    pub bytes: Vec<u8>,
}

/// Split a properties stream into inline records.
///
/// A truncated entry ends the scan; everything before it is still returned.
pub fn split(data: &[u8]) -> Vec<InlineRecord> {
    let mut cursor = Cursor::new(data);
    let mut records = Vec::new();

    while let Ok(header) = cursor.read_u32::<LittleEndian>() {
        let tag = (header >> 16) as u16;
        let type_code = (header & 0xFFFF) as u16;

        // Reserved words, stream prefix and named-id bookkeeping all carry tag 0000.
        if tag == 0 {
            continue;
        }

        let prop_type = PropertyType::from_code(type_code);
        match read_entry(&mut cursor, prop_type) {
            Ok(Some(bytes)) => records.push(InlineRecord {
                tag,
                prop_type,
                bytes,
            }),
            Ok(None) => {}
            Err(e) => {
                trace!(
                    tag = %format!("{tag:04x}"),
                    offset = cursor.position(),
                    error = %e,
                    "Properties stream truncated"
                );
                break;
            }
        }
    }

    records
}

fn read_entry(cursor: &mut Cursor<&[u8]>, prop_type: PropertyType) -> io::Result<Option<Vec<u8>>> {
    let _flags = cursor.read_u32::<LittleEndian>()?;
    match prop_type.layout() {
        InlineLayout::Variable => {
            let _size = cursor.read_u32::<LittleEndian>()?;
            Ok(None)
        }
        InlineLayout::Fixed4 => {
            let data = read_bytes(cursor, 4)?;
            let _padding = read_bytes(cursor, 4)?;
            Ok(Some(data))
        }
        InlineLayout::Fixed8 => read_bytes(cursor, 8).map(Some),
        InlineLayout::Unsupported => {
            trace!(type_code = prop_type.code(), "Skipping unsupported inline type");
            read_bytes(cursor, 8).map(|_| None)
        }
    }
}

fn read_bytes(cursor: &mut Cursor<&[u8]>, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    cursor.read_exact(&mut buf)?;
    Ok(buf)
}
