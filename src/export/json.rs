//! JSON rendering of a parsed message. Binary payloads are omitted.

use crate::error::{MsgError, Result};
use crate::model::message::ParsedMessage;

pub fn to_json(message: &ParsedMessage, pretty: bool) -> Result<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(message)
    } else {
        serde_json::to_string(message)
    };
    rendered.map_err(|e| MsgError::ExportError(format!("JSON serialization failed: {e}")))
}
