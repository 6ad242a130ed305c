//! Attachments: plain files and embedded messages.
//!
//! Payloads are fully loaded; a parsed message owns every byte of its attachment tree.

use serde::Serialize;

use super::message::ParsedMessage;
use super::property::{PropertyMap, PropertyValue};

/// An entry of a message's attachment list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attachment {
    File(FileAttachment),
    Nested(NestedMessageAttachment),
}

impl Attachment {
    pub fn as_file(&self) -> Option<&FileAttachment> {
        match self {
            Self::File(f) => Some(f),
            Self::Nested(_) => None,
        }
    }

    pub fn as_nested(&self) -> Option<&ParsedMessage> {
        match self {
            Self::File(_) => None,
            Self::Nested(n) => Some(&n.message),
        }
    }
}

/// A regular file attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileAttachment {
    pub(crate) filename: Option<String>,
    pub(crate) long_filename: Option<String>,
    pub(crate) mime_tag: Option<String>,
    pub(crate) extension: Option<String>,
    pub(crate) content_id: Option<String>,
    #[serde(skip)]
    pub(crate) data: Vec<u8>,
    /// Declared length of the data leaf.
    pub(crate) size: u64,
    #[serde(skip)]
    pub(crate) properties: PropertyMap,
}

impl FileAttachment {
    /// Short (8.3) filename.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn long_filename(&self) -> Option<&str> {
        self.long_filename.as_deref()
    }

    /// The long filename when present, else the short one.
    pub fn display_name(&self) -> Option<&str> {
        self.long_filename
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.filename.as_deref())
    }

    pub fn mime_tag(&self) -> Option<&str> {
        self.mime_tag.as_deref()
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    pub fn content_id(&self) -> Option<&str> {
        self.content_id.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    pub fn property(&self, tag: u16) -> Option<&PropertyValue> {
        self.properties.get(tag)
    }
}

impl std::fmt::Display for FileAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name().unwrap_or(""))
    }
}

/// A complete message embedded as an attachment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NestedMessageAttachment {
    pub(crate) message: ParsedMessage,
}

impl NestedMessageAttachment {
    pub fn message(&self) -> &ParsedMessage {
        &self.message
    }
}
