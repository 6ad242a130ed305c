//! The parsed message graph.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use super::attachment::{Attachment, FileAttachment};
use super::property::{PropertyMap, PropertyValue};
use super::recipient::{Recipient, RecipientRole};

/// Message class assumed until a `0x001A` property says otherwise.
pub const DEFAULT_MESSAGE_CLASS: &str = "IPM.Note";

/// S/MIME shape of a message, sniffed from named properties or transport headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Smime {
    /// `application/pkcs7-mime` (encrypted or opaque-signed).
    ApplicationSmime {
        mime: String,
        smime_type: Option<String>,
        name: Option<String>,
    },
    /// `multipart/signed` (clear-signed).
    MultipartSigned {
        mime: String,
        protocol: Option<String>,
        micalg: Option<String>,
    },
    /// `application/octet-stream` or a bare `application/pkcs7-signature`.
    ApplicationOctetStream,
}

/// A fully decoded message. Nested messages are values of the same type.
///
/// Instances are only produced by the parser and are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedMessage {
    pub(crate) message_class: String,
    pub(crate) message_id: Option<String>,
    pub(crate) from_name: Option<String>,
    pub(crate) from_email: Option<String>,
    pub(crate) reply_to_name: Option<String>,
    pub(crate) reply_to_email: Option<String>,
    pub(crate) subject: Option<String>,
    pub(crate) body_text: Option<String>,
    pub(crate) body_rtf: Option<String>,
    pub(crate) body_html: Option<String>,
    pub(crate) converted_body_html: Option<String>,
    pub(crate) headers: Option<String>,
    pub(crate) date: Option<DateTime<Utc>>,
    pub(crate) client_submit_time: Option<DateTime<Utc>>,
    pub(crate) creation_date: Option<DateTime<Utc>>,
    pub(crate) last_modification_date: Option<DateTime<Utc>>,
    pub(crate) display_to: Option<String>,
    pub(crate) display_cc: Option<String>,
    pub(crate) display_bcc: Option<String>,
    pub(crate) recipients: Vec<Recipient>,
    pub(crate) attachments: Vec<Attachment>,
    pub(crate) properties: PropertyMap,
    pub(crate) smime: Option<Smime>,
}

impl Default for ParsedMessage {
    fn default() -> Self {
        Self {
            message_class: DEFAULT_MESSAGE_CLASS.to_string(),
            message_id: None,
            from_name: None,
            from_email: None,
            reply_to_name: None,
            reply_to_email: None,
            subject: None,
            body_text: None,
            body_rtf: None,
            body_html: None,
            converted_body_html: None,
            headers: None,
            date: None,
            client_submit_time: None,
            creation_date: None,
            last_modification_date: None,
            display_to: None,
            display_cc: None,
            display_bcc: None,
            recipients: Vec::new(),
            attachments: Vec::new(),
            properties: PropertyMap::default(),
            smime: None,
        }
    }
}

impl ParsedMessage {
    // ── Typed fields ────────────────────────────────────────────

    pub fn message_class(&self) -> &str {
        &self.message_class
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn from_name(&self) -> Option<&str> {
        self.from_name.as_deref()
    }

    pub fn from_email(&self) -> Option<&str> {
        self.from_email.as_deref()
    }

    pub fn reply_to_name(&self) -> Option<&str> {
        self.reply_to_name.as_deref()
    }

    pub fn reply_to_email(&self) -> Option<&str> {
        self.reply_to_email.as_deref()
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn body_text(&self) -> Option<&str> {
        self.body_text.as_deref()
    }

    /// Decompressed RTF body.
    pub fn body_rtf(&self) -> Option<&str> {
        self.body_rtf.as_deref()
    }

    /// Native HTML body, if the message carried one.
    pub fn body_html(&self) -> Option<&str> {
        self.body_html.as_deref()
    }

    /// HTML derived from the RTF body.
    pub fn converted_body_html(&self) -> Option<&str> {
        self.converted_body_html.as_deref()
    }

    /// Native HTML when present, else the HTML converted from RTF.
    pub fn html_body(&self) -> Option<&str> {
        self.body_html
            .as_deref()
            .or(self.converted_body_html.as_deref())
    }

    /// Raw transport headers.
    pub fn headers(&self) -> Option<&str> {
        self.headers.as_deref()
    }

    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.date
    }

    pub fn client_submit_time(&self) -> Option<DateTime<Utc>> {
        self.client_submit_time
    }

    pub fn creation_date(&self) -> Option<DateTime<Utc>> {
        self.creation_date
    }

    pub fn last_modification_date(&self) -> Option<DateTime<Utc>> {
        self.last_modification_date
    }

    pub fn display_to(&self) -> Option<&str> {
        self.display_to.as_deref()
    }

    pub fn display_cc(&self) -> Option<&str> {
        self.display_cc.as_deref()
    }

    pub fn display_bcc(&self) -> Option<&str> {
        self.display_bcc.as_deref()
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn smime(&self) -> Option<&Smime> {
        self.smime.as_ref()
    }

    // ── Raw properties ──────────────────────────────────────────

    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    pub fn property(&self, tag: u16) -> Option<&PropertyValue> {
        self.properties.get(tag)
    }

    /// Look a property up by its hex tag, e.g. `"0037"` for the subject.
    pub fn property_from_hex(&self, hex: &str) -> Option<&PropertyValue> {
        self.properties.get_hex(hex)
    }

    pub fn property_codes(&self) -> Vec<u16> {
        self.properties.codes().collect()
    }

    pub fn properties_as_hex(&self) -> Vec<String> {
        self.properties.hex_codes()
    }

    pub fn property_listing(&self) -> String {
        self.properties.listing()
    }

    // ── Recipient roles ─────────────────────────────────────────

    fn display_list(&self, role: RecipientRole) -> Option<&str> {
        match role {
            RecipientRole::To => self.display_to.as_deref(),
            RecipientRole::Cc => self.display_cc.as_deref(),
            RecipientRole::Bcc => self.display_bcc.as_deref(),
        }
    }

    /// Recipients whose name appears in the display list for `role`.
    ///
    /// Matching is by substring, so one recipient can land in several roles.
    pub fn recipients_with_role(&self, role: RecipientRole) -> Vec<&Recipient> {
        let Some(display) = self.display_list(role) else {
            return Vec::new();
        };
        let display = display.trim();
        self.recipients
            .iter()
            .filter(|r| {
                r.name()
                    .map(str::trim)
                    .is_some_and(|name| !name.is_empty() && display.contains(name))
            })
            .collect()
    }

    pub fn to_recipients(&self) -> Vec<&Recipient> {
        self.recipients_with_role(RecipientRole::To)
    }

    pub fn cc_recipients(&self) -> Vec<&Recipient> {
        self.recipients_with_role(RecipientRole::Cc)
    }

    pub fn bcc_recipients(&self) -> Vec<&Recipient> {
        self.recipients_with_role(RecipientRole::Bcc)
    }

    // ── Attachment partition ────────────────────────────────────

    /// For each attachment, the `cid:` token that ties it to the HTML body.
    fn inline_tokens(&self) -> Vec<Option<String>> {
        let html = self.html_body();
        self.attachments
            .iter()
            .map(|att| match (att, html) {
                (Attachment::File(file), Some(html)) => cid_reference(file, html),
                _ => None,
            })
            .collect()
    }

    /// Inline attachments keyed by the identifier the HTML body references them with.
    pub fn cid_map(&self) -> BTreeMap<String, &FileAttachment> {
        self.inline_tokens()
            .into_iter()
            .zip(&self.attachments)
            .filter_map(|(token, att)| Some((token?, att.as_file()?)))
            .collect()
    }

    /// Attachments not referenced from the HTML body, nested messages included.
    pub fn true_attachments(&self) -> Vec<&Attachment> {
        self.inline_tokens()
            .into_iter()
            .zip(&self.attachments)
            .filter(|(token, _)| token.is_none())
            .map(|(_, att)| att)
            .collect()
    }

    pub fn nested_messages(&self) -> Vec<&ParsedMessage> {
        self.attachments.iter().filter_map(Attachment::as_nested).collect()
    }

    /// Whether the message carries nothing that identifies it.
    pub(crate) fn is_degenerate(&self) -> bool {
        self.message_id.is_none()
            && self.subject.is_none()
            && self.body_text.is_none()
            && self.body_rtf.is_none()
            && self.body_html.is_none()
    }
}

/// First of content-id, short filename and long filename that the body refers to as `cid:`.
fn cid_reference(file: &FileAttachment, html: &str) -> Option<String> {
    [file.content_id(), file.filename(), file.long_filename()]
        .into_iter()
        .flatten()
        .filter(|candidate| !candidate.is_empty())
        .find(|candidate| {
            let pattern = format!(r#"cid:['"]?{}['"]?"#, regex::escape(candidate));
            Regex::new(&pattern).is_ok_and(|re| re.is_match(html))
        })
        .map(str::to_string)
}

impl fmt::Display for ParsedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let from = match (self.from_name(), self.from_email()) {
            (Some(name), Some(email)) => format!("\"{name}\" <{email}>"),
            (Some(name), None) => name.to_string(),
            (None, Some(email)) => format!("<{email}>"),
            (None, None) => String::new(),
        };
        writeln!(f, "From: {from}")?;
        for (label, role) in [
            ("To", RecipientRole::To),
            ("Cc", RecipientRole::Cc),
            ("Bcc", RecipientRole::Bcc),
        ] {
            let list: Vec<String> = self
                .recipients_with_role(role)
                .iter()
                .map(|r| r.to_string())
                .collect();
            if !list.is_empty() {
                writeln!(f, "{label}: {}", list.join(", "))?;
            }
        }
        if let Some(date) = self.date {
            writeln!(f, "Date: {}", date.to_rfc2822())?;
        }
        write!(f, "Subject: {}", self.subject().unwrap_or(""))
    }
}
