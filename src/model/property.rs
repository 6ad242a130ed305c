//! MAPI property identifiers, type codes, and decoded values.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// The on-wire representation of a property, named by its 16-bit type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Int16,
    Int32,
    Float,
    Double,
    Currency,
    AppTime,
    Error,
    Boolean,
    Object,
    Int64,
    String8,
    Unicode,
    SysTime,
    Clsid,
    Binary,
    /// Any code outside the set above (multi-valued types included).
    Unknown(u16),
}

/// How a type is laid out inside a packed properties stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineLayout {
    /// Value lives in its own leaf; the stream only carries a size.
    Variable,
    /// 4 value bytes followed by 4 bytes of padding.
    Fixed4,
    /// 8 value bytes.
    Fixed8,
    /// Not described by the splitter.
    Unsupported,
}

impl PropertyType {
    pub fn from_code(code: u16) -> Self {
        match code {
            0x0002 => Self::Int16,
            0x0003 => Self::Int32,
            0x0004 => Self::Float,
            0x0005 => Self::Double,
            0x0006 => Self::Currency,
            0x0007 => Self::AppTime,
            0x000A => Self::Error,
            0x000B => Self::Boolean,
            0x000D => Self::Object,
            0x0014 => Self::Int64,
            0x001E => Self::String8,
            0x001F => Self::Unicode,
            0x0040 => Self::SysTime,
            0x0048 => Self::Clsid,
            0x0102 => Self::Binary,
            other => Self::Unknown(other),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            Self::Int16 => 0x0002,
            Self::Int32 => 0x0003,
            Self::Float => 0x0004,
            Self::Double => 0x0005,
            Self::Currency => 0x0006,
            Self::AppTime => 0x0007,
            Self::Error => 0x000A,
            Self::Boolean => 0x000B,
            Self::Object => 0x000D,
            Self::Int64 => 0x0014,
            Self::String8 => 0x001E,
            Self::Unicode => 0x001F,
            Self::SysTime => 0x0040,
            Self::Clsid => 0x0048,
            Self::Binary => 0x0102,
            Self::Unknown(code) => code,
        }
    }

    pub fn layout(self) -> InlineLayout {
        match self {
            Self::String8 | Self::Unicode | Self::Binary | Self::Object | Self::Clsid => {
                InlineLayout::Variable
            }
            Self::Int16 | Self::Int32 | Self::Float | Self::Boolean | Self::Error => {
                InlineLayout::Fixed4
            }
            Self::Double | Self::Currency | Self::AppTime | Self::SysTime | Self::Int64 => {
                InlineLayout::Fixed8
            }
            Self::Unknown(_) => InlineLayout::Unsupported,
        }
    }
}

/// Property identifiers the merger knows by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropTag {
    MessageClass,
    Subject,
    ClientSubmitTime,
    SentRepresentingName,
    SentRepresentingEmail,
    TransportHeaders,
    SenderEmail,
    SenderName,
    DisplayBcc,
    DisplayCc,
    DisplayTo,
    NormalizedSubject,
    Body,
    RtfCompressed,
    BodyHtml,
    InternetMessageId,
    DisplayName,
    EmailAddress,
    CreationTime,
    LastModificationTime,
    AttachData,
    AttachExtension,
    AttachFilename,
    AttachLongFilename,
    AttachMimeTag,
    AttachContentId,
    SmtpAddress,
    LastModifierName,
    SmimeMultipartSigned,
    SmimeApplication,
    Other(u16),
}

impl PropTag {
    pub fn from_id(id: u16) -> Self {
        match id {
            0x001A => Self::MessageClass,
            0x0037 => Self::Subject,
            0x0039 => Self::ClientSubmitTime,
            0x0042 => Self::SentRepresentingName,
            0x0065 => Self::SentRepresentingEmail,
            0x007D => Self::TransportHeaders,
            0x0C1A => Self::SenderName,
            0x0C1F => Self::SenderEmail,
            0x0E02 => Self::DisplayBcc,
            0x0E03 => Self::DisplayCc,
            0x0E04 => Self::DisplayTo,
            0x0E1D => Self::NormalizedSubject,
            0x1000 => Self::Body,
            0x1009 => Self::RtfCompressed,
            0x1013 => Self::BodyHtml,
            0x1035 => Self::InternetMessageId,
            0x3001 => Self::DisplayName,
            0x3003 => Self::EmailAddress,
            0x3007 => Self::CreationTime,
            0x3008 => Self::LastModificationTime,
            0x3701 => Self::AttachData,
            0x3703 => Self::AttachExtension,
            0x3704 => Self::AttachFilename,
            0x3707 => Self::AttachLongFilename,
            0x370E => Self::AttachMimeTag,
            0x3712 => Self::AttachContentId,
            0x39FE => Self::SmtpAddress,
            0x3FFA => Self::LastModifierName,
            0x8003 => Self::SmimeMultipartSigned,
            0x8005 => Self::SmimeApplication,
            other => Self::Other(other),
        }
    }

    pub fn id(self) -> u16 {
        match self {
            Self::MessageClass => 0x001A,
            Self::Subject => 0x0037,
            Self::ClientSubmitTime => 0x0039,
            Self::SentRepresentingName => 0x0042,
            Self::SentRepresentingEmail => 0x0065,
            Self::TransportHeaders => 0x007D,
            Self::SenderName => 0x0C1A,
            Self::SenderEmail => 0x0C1F,
            Self::DisplayBcc => 0x0E02,
            Self::DisplayCc => 0x0E03,
            Self::DisplayTo => 0x0E04,
            Self::NormalizedSubject => 0x0E1D,
            Self::Body => 0x1000,
            Self::RtfCompressed => 0x1009,
            Self::BodyHtml => 0x1013,
            Self::InternetMessageId => 0x1035,
            Self::DisplayName => 0x3001,
            Self::EmailAddress => 0x3003,
            Self::CreationTime => 0x3007,
            Self::LastModificationTime => 0x3008,
            Self::AttachData => 0x3701,
            Self::AttachExtension => 0x3703,
            Self::AttachFilename => 0x3704,
            Self::AttachLongFilename => 0x3707,
            Self::AttachMimeTag => 0x370E,
            Self::AttachContentId => 0x3712,
            Self::SmtpAddress => 0x39FE,
            Self::LastModifierName => 0x3FFA,
            Self::SmimeMultipartSigned => 0x8003,
            Self::SmimeApplication => 0x8005,
            Self::Other(id) => id,
        }
    }
}

/// One decoded property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    /// 8-bit or UTF-16 string.
    Text(String),
    /// Opaque bytes, passed through unchanged.
    Binary(#[serde(serialize_with = "serialize_byte_len")] Vec<u8>),
    /// Milliseconds since the Unix epoch.
    Time(i64),
    /// A type code the decoder does not promote; the bytes are kept as-is.
    Unrecognized {
        type_code: u16,
        #[serde(serialize_with = "serialize_byte_len")]
        bytes: Vec<u8>,
    },
}

/// Payloads are summarized by their length in serialized output.
fn serialize_byte_len<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(bytes.len() as u64)
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Time(ms) => DateTime::from_timestamp_millis(*ms),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Binary(b) => write!(f, "[{} bytes]", b.len()),
            Self::Time(ms) => match DateTime::from_timestamp_millis(*ms) {
                Some(dt) => write!(f, "{}", dt.to_rfc3339()),
                None => write!(f, "{ms} ms"),
            },
            Self::Unrecognized { type_code, bytes } => {
                write!(f, "[type 0x{type_code:04x}, {} bytes]", bytes.len())
            }
        }
    }
}

/// A transient decoder output: one property pulled out of a leaf or a properties stream.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRecord {
    pub tag: u16,
    pub prop_type: PropertyType,
    pub value: PropertyValue,
    /// Length of the leaf the value came from, as declared by the container.
    pub declared_len: u64,
}

/// Raw tag → value table kept on every entity. Last write per tag wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PropertyMap(BTreeMap<u16, PropertyValue>);

impl PropertyMap {
    pub fn insert(&mut self, tag: u16, value: PropertyValue) {
        self.0.insert(tag, value);
    }

    pub fn get(&self, tag: u16) -> Option<&PropertyValue> {
        self.0.get(&tag)
    }

    /// Look a property up by its 4-digit hex tag (e.g. `"0037"`).
    pub fn get_hex(&self, hex: &str) -> Option<&PropertyValue> {
        u16::from_str_radix(hex.trim_start_matches("0x"), 16)
            .ok()
            .and_then(|tag| self.get(tag))
    }

    pub fn codes(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.keys().copied()
    }

    /// Tags as lowercase 4-digit hex strings.
    pub fn hex_codes(&self) -> Vec<String> {
        self.0.keys().map(|k| format!("{k:04x}")).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &PropertyValue)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Debug listing, one `0x{hex} / {decimal}: {value}` line per property.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for (tag, value) in &self.0 {
            out.push_str(&format!("0x{tag:04x} / {tag}: {value}\n"));
        }
        out
    }
}
