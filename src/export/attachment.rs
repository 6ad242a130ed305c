//! Write attachments of a parsed message to disk.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{MsgError, Result};
use crate::model::attachment::{Attachment, FileAttachment};
use crate::model::message::ParsedMessage;

use super::sanitize_filename_part;

/// Export a single file attachment into `output_dir`.
///
/// `index` names attachments that carry no filename at all.
pub fn export_attachment(
    attachment: &FileAttachment,
    index: usize,
    output_dir: &Path,
) -> Result<PathBuf> {
    let filename = attachment_filename(attachment, index);
    let path = unique_path(&output_dir.join(filename));
    std::fs::write(&path, attachment.data()).map_err(|e| MsgError::io(&path, e))?;
    debug!(path = %path.display(), size = attachment.size(), "Wrote attachment");
    Ok(path)
}

/// Extract every file attachment of `message`, recursing into embedded messages.
///
/// Each embedded message gets its own subfolder: `{output_dir}/{nn}_{subject}/`.
pub fn export_all_attachments(message: &ParsedMessage, output_dir: &Path) -> Result<Vec<PathBuf>> {
    if output_dir.exists() && !output_dir.is_dir() {
        return Err(MsgError::InvalidPath(format!(
            "{} is not a directory",
            output_dir.display()
        )));
    }
    std::fs::create_dir_all(output_dir).map_err(|e| MsgError::io(output_dir, e))?;

    let mut paths = Vec::new();
    for (i, attachment) in message.attachments().iter().enumerate() {
        match attachment {
            Attachment::File(file) => match export_attachment(file, i, output_dir) {
                Ok(path) => paths.push(path),
                Err(e) => {
                    warn!(
                        filename = file.display_name().unwrap_or("(unnamed)"),
                        error = %e,
                        "Failed to export attachment"
                    );
                }
            },
            Attachment::Nested(nested) => {
                let subfolder = unique_path(&output_dir.join(message_folder_name(nested.message(), i)));
                paths.extend(export_all_attachments(nested.message(), &subfolder)?);
            }
        }
    }

    Ok(paths)
}

/// Long filename, else short filename, else `attachment_{index}{extension}`.
fn attachment_filename(attachment: &FileAttachment, index: usize) -> String {
    match attachment.display_name() {
        Some(name) if !name.trim().is_empty() => sanitize_filename_part(name, 150),
        _ => {
            let ext = attachment
                .extension()
                .map(|e| sanitize_filename_part(e.trim_start_matches('.'), 10))
                .map(|e| format!(".{e}"))
                .unwrap_or_default();
            format!("attachment_{index}{ext}")
        }
    }
}

/// Generate a folder name for an embedded message's attachments.
fn message_folder_name(message: &ParsedMessage, index: usize) -> String {
    let subject = message.subject().unwrap_or("message");
    format!("{index:02}_{}", sanitize_filename_part(subject, 60))
}

/// If `path` already exists, append a counter to make it unique.
fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    for i in 1..1000 {
        let candidate = if ext.is_empty() {
            parent.join(format!("{stem}_{i}"))
        } else {
            parent.join(format!("{stem}_{i}.{ext}"))
        };
        if !candidate.exists() {
            return candidate;
        }
    }

    parent.join(format!("{stem}_dup.{ext}"))
}
