//! Plain text rendering of a parsed message.

use std::fmt::Write as _;

use crate::model::attachment::Attachment;
use crate::model::message::ParsedMessage;
use crate::model::recipient::Recipient;

/// Which body representation to pick out of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Text,
    /// Native HTML, else HTML converted from RTF.
    Html,
    Rtf,
}

/// The body in the requested representation, if the message has one.
pub fn select_body(message: &ParsedMessage, format: BodyFormat) -> Option<&str> {
    match format {
        BodyFormat::Text => message.body_text(),
        BodyFormat::Html => message.html_body(),
        BodyFormat::Rtf => message.body_rtf(),
    }
}

/// Render headers, the plain body and the attachment list.
pub fn render_text(message: &ParsedMessage) -> String {
    let mut content = String::new();
    write_message(&mut content, message, 0);
    content
}

fn write_message(out: &mut String, message: &ParsedMessage, depth: usize) {
    let indent = "  ".repeat(depth);

    if let Some(date) = message.date() {
        let _ = writeln!(out, "{indent}Date:    {}", date.format("%a, %d %b %Y %H:%M:%S %z"));
    }
    let from = match (message.from_name(), message.from_email()) {
        (Some(name), Some(email)) => format!("{name} <{email}>"),
        (Some(name), None) => name.to_string(),
        (None, Some(email)) => email.to_string(),
        (None, None) => String::new(),
    };
    if !from.is_empty() {
        let _ = writeln!(out, "{indent}From:    {from}");
    }
    for (label, list) in [
        ("To:", message.to_recipients()),
        ("Cc:", message.cc_recipients()),
        ("Bcc:", message.bcc_recipients()),
    ] {
        if !list.is_empty() {
            let _ = writeln!(out, "{indent}{label:<8} {}", join_recipients(&list));
        }
    }
    if let Some(reply) = message.reply_to_email() {
        let _ = writeln!(out, "{indent}Reply-To: {reply}");
    }
    let _ = writeln!(out, "{indent}Subject: {}", message.subject().unwrap_or(""));
    let _ = writeln!(out, "\n{indent}{}", "-".repeat(72));

    if let Some(text) = message.body_text() {
        out.push('\n');
        for line in text.lines() {
            let _ = writeln!(out, "{indent}{line}");
        }
    }

    let attachments = message.attachments();
    if attachments.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{indent}[Attachments: {}]", attachments.len());
    for attachment in attachments {
        match attachment {
            Attachment::File(file) => {
                let size = humansize::format_size(file.size(), humansize::BINARY);
                let _ = writeln!(
                    out,
                    "{indent}  - {} ({}, {})",
                    file.display_name().unwrap_or("(unnamed)"),
                    file.mime_tag().unwrap_or("application/octet-stream"),
                    size
                );
            }
            Attachment::Nested(nested) => {
                let _ = writeln!(out, "{indent}  - [embedded message]");
                write_message(out, nested.message(), depth + 2);
            }
        }
    }
}

fn join_recipients(list: &[&Recipient]) -> String {
    list.iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
