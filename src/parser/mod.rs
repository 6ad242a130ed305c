//! Outlook `.msg` decoding: container loading, property decoding, merging and traversal.
//!
//! Only an unreadable container is an error. Every other anomaly degrades to a
//! missing field on the returned message.

pub mod charset;
pub mod container;
pub mod header;
pub mod merge;
pub mod property;
pub mod props_stream;
pub mod walker;

use std::path::Path;

use tracing::debug;

use crate::config::ParserConfig;
use crate::error::{MsgError, Result};
use crate::model::message::ParsedMessage;

/// Parse a complete `.msg` container with default settings.
pub fn parse(bytes: &[u8]) -> Result<ParsedMessage> {
    parse_with(bytes, &ParserConfig::default())
}

/// Parse a complete `.msg` container.
pub fn parse_with(bytes: &[u8], config: &ParserConfig) -> Result<ParsedMessage> {
    let root = container::load(bytes)?;
    let message = walker::walk(&root, config);
    debug!(
        recipients = message.recipients().len(),
        attachments = message.attachments().len(),
        properties = message.properties().len(),
        "Parsed message"
    );
    Ok(message)
}

/// Read a file fully and parse it.
pub fn parse_file(path: &Path, config: &ParserConfig) -> Result<ParsedMessage> {
    if !path.exists() {
        return Err(MsgError::FileNotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|e| MsgError::io(path, e))?;
    parse_with(&bytes, config)
}
