//! `msgshell`: a reader for Microsoft Outlook `.msg` files.
//!
//! This crate decodes the compound container behind a `.msg` file into a
//! [`ParsedMessage`] with its recipients, attachments (including embedded
//! messages) and the raw property maps. Bodies stored only as compressed RTF
//! are decompressed and turned into HTML.

pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod rtf;

pub use error::{MsgError, Result};
pub use model::{
    Attachment, FileAttachment, NestedMessageAttachment, ParsedMessage, PropertyMap,
    PropertyValue, Recipient, RecipientRole, Smime,
};
pub use parser::{parse, parse_file, parse_with};
