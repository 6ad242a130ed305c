//! Message builder: accumulates properties, recipients and attachments for one message.

use chrono::DateTime;
use encoding_rs::Encoding;
use tracing::{debug, trace};

use super::{looks_like_smtp, Policy};
use crate::config::ParserConfig;
use crate::model::attachment::Attachment;
use crate::model::message::{ParsedMessage, Smime, DEFAULT_MESSAGE_CLASS};
use crate::model::property::{PropTag, PropertyRecord, PropertyValue};
use crate::model::recipient::Recipient;
use crate::model::PropertyMap;
use crate::parser::{header, property};
use crate::rtf;

/// Typed message fields a property can be promoted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    MessageClass,
    MessageId,
    Subject,
    FromEmail,
    FromName,
    DisplayTo,
    DisplayCc,
    DisplayBcc,
    BodyHtml,
    BodyText,
    RtfCompressed,
    Headers,
    CreationDate,
    LastModificationDate,
    ClientSubmitTime,
    SmimeMultipartSigned,
    SmimeApplication,
}

/// Promotion table: which field a tag feeds and under which policy.
fn route(tag: PropTag) -> Option<(Field, Policy)> {
    let routed = match tag {
        PropTag::MessageClass => (Field::MessageClass, Policy::Force),
        PropTag::InternetMessageId => (Field::MessageId, Policy::Force),
        PropTag::Subject | PropTag::NormalizedSubject => (Field::Subject, Policy::Force),
        PropTag::SenderEmail | PropTag::SentRepresentingEmail | PropTag::LastModifierName => {
            (Field::FromEmail, Policy::Validated(looks_like_smtp))
        }
        PropTag::SentRepresentingName => (Field::FromName, Policy::Force),
        PropTag::SenderName => (Field::FromName, Policy::FirstWins),
        PropTag::DisplayTo => (Field::DisplayTo, Policy::Force),
        PropTag::DisplayCc => (Field::DisplayCc, Policy::Force),
        PropTag::DisplayBcc => (Field::DisplayBcc, Policy::Force),
        PropTag::BodyHtml => (Field::BodyHtml, Policy::LongestWins),
        PropTag::Body => (Field::BodyText, Policy::FirstWins),
        PropTag::RtfCompressed => (Field::RtfCompressed, Policy::FirstWins),
        PropTag::TransportHeaders => (Field::Headers, Policy::Force),
        PropTag::CreationTime => (Field::CreationDate, Policy::FirstWins),
        PropTag::LastModificationTime => (Field::LastModificationDate, Policy::Force),
        PropTag::ClientSubmitTime => (Field::ClientSubmitTime, Policy::Force),
        PropTag::SmimeMultipartSigned => (Field::SmimeMultipartSigned, Policy::Force),
        PropTag::SmimeApplication => (Field::SmimeApplication, Policy::Force),
        _ => return None,
    };
    Some(routed)
}

/// Accumulates one message during traversal. Consumed by [`MessageBuilder::build`].
#[derive(Debug)]
pub struct MessageBuilder {
    encoding: &'static Encoding,
    message_class: Option<String>,
    message_id: Option<String>,
    from_name: Option<String>,
    from_email: Option<String>,
    subject: Option<String>,
    body_text: Option<String>,
    body_html: Option<String>,
    rtf_compressed: Option<Vec<u8>>,
    headers: Option<String>,
    date: Option<i64>,
    creation_date: Option<i64>,
    last_modification_date: Option<i64>,
    client_submit_time: Option<i64>,
    display_to: Option<String>,
    display_cc: Option<String>,
    display_bcc: Option<String>,
    smime: Option<Smime>,
    recipients: Vec<Recipient>,
    attachments: Vec<Attachment>,
    properties: PropertyMap,
}

impl MessageBuilder {
    /// `encoding` decodes binary-typed text such as an HTML body stored as bytes.
    pub fn new(encoding: &'static Encoding) -> Self {
        Self {
            encoding,
            message_class: None,
            message_id: None,
            from_name: None,
            from_email: None,
            subject: None,
            body_text: None,
            body_html: None,
            rtf_compressed: None,
            headers: None,
            date: None,
            creation_date: None,
            last_modification_date: None,
            client_submit_time: None,
            display_to: None,
            display_cc: None,
            display_bcc: None,
            smime: None,
            recipients: Vec::new(),
            attachments: Vec::new(),
            properties: PropertyMap::default(),
        }
    }

    /// Store a property and promote it when its tag is in the table.
    pub fn set_property(&mut self, record: PropertyRecord) {
        let PropertyRecord { tag, value, .. } = record;
        if let Some((field, policy)) = route(PropTag::from_id(tag)) {
            if !self.promote(field, policy, &value) {
                trace!(tag = %format!("{tag:04x}"), ?field, "Property not promoted");
            }
        }
        self.properties.insert(tag, value);
    }

    pub fn add_recipient(&mut self, recipient: Recipient) {
        self.recipients.push(recipient);
    }

    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    fn promote(&mut self, field: Field, policy: Policy, value: &PropertyValue) -> bool {
        match field {
            Field::RtfCompressed => match value {
                PropertyValue::Binary(bytes) => policy.apply(&mut self.rtf_compressed, bytes.clone()),
                _ => false,
            },
            Field::CreationDate => {
                let Some(ms) = time_of(value) else {
                    return false;
                };
                let accepted = policy.apply(&mut self.creation_date, ms);
                if accepted {
                    self.date = Some(ms);
                }
                accepted
            }
            Field::LastModificationDate => {
                time_of(value).is_some_and(|ms| policy.apply(&mut self.last_modification_date, ms))
            }
            Field::ClientSubmitTime => {
                time_of(value).is_some_and(|ms| policy.apply(&mut self.client_submit_time, ms))
            }
            Field::SmimeMultipartSigned | Field::SmimeApplication => {
                let Some(text) = self.text_of(value) else {
                    return false;
                };
                let descriptor = if field == Field::SmimeMultipartSigned {
                    header::smime_multipart_signed(&text)
                } else {
                    header::smime_application(&text)
                };
                match descriptor {
                    Some(smime) => {
                        self.smime = Some(smime);
                        true
                    }
                    None => false,
                }
            }
            _ => {
                let Some(text) = self.text_of(value) else {
                    return false;
                };
                let slot = match field {
                    Field::MessageClass => &mut self.message_class,
                    Field::MessageId => &mut self.message_id,
                    Field::Subject => &mut self.subject,
                    Field::FromEmail => &mut self.from_email,
                    Field::FromName => &mut self.from_name,
                    Field::DisplayTo => &mut self.display_to,
                    Field::DisplayCc => &mut self.display_cc,
                    Field::DisplayBcc => &mut self.display_bcc,
                    Field::BodyHtml => &mut self.body_html,
                    Field::BodyText => &mut self.body_text,
                    Field::Headers => &mut self.headers,
                    _ => return false,
                };
                policy.apply(slot, text)
            }
        }
    }

    /// Text view of a value. Binary text is read as UTF-8 when valid, else in the code page.
    fn text_of(&self, value: &PropertyValue) -> Option<String> {
        match value {
            PropertyValue::Text(s) => Some(s.clone()),
            PropertyValue::Binary(bytes) => Some(match std::str::from_utf8(bytes) {
                Ok(s) => s.to_string(),
                Err(_) => property::decode_string8(bytes, self.encoding),
            }),
            _ => None,
        }
    }

    /// Finish the message: RTF pipeline, then header-derived fields.
    pub fn build(self, config: &ParserConfig) -> ParsedMessage {
        let body_rtf = self
            .rtf_compressed
            .as_deref()
            .and_then(|compressed| rtf::decompress_body(compressed, self.encoding));
        let converted_body_html = match (&self.body_html, &body_rtf) {
            (None, Some(rtf)) if config.convert_rtf => rtf::derive_html(rtf, self.encoding),
            _ => None,
        };

        let mut reply_to_name = None;
        let mut reply_to_email = None;
        let mut smime = self.smime;
        let mut date = self.date.and_then(DateTime::from_timestamp_millis);
        let mut from_email = self.from_email;

        if let Some(headers) = self.headers.as_deref() {
            if let Some((name, address)) = header::reply_to(headers) {
                reply_to_name = Some(name);
                reply_to_email = Some(address);
            }
            if smime.is_none() {
                smime = header::smime_from_headers(headers);
            }
            if date.is_none() {
                date = header::date_from_headers(headers);
            }
            if from_email.is_none() {
                from_email = header::from_address(headers);
                if let Some(addr) = &from_email {
                    debug!(from = %addr, "Sender address taken from transport headers");
                }
            }
        }

        ParsedMessage {
            message_class: self
                .message_class
                .unwrap_or_else(|| DEFAULT_MESSAGE_CLASS.to_string()),
            message_id: self.message_id,
            from_name: self.from_name,
            from_email,
            reply_to_name,
            reply_to_email,
            subject: self.subject,
            body_text: self.body_text,
            body_rtf,
            body_html: self.body_html,
            converted_body_html,
            headers: self.headers,
            date,
            client_submit_time: self.client_submit_time.and_then(DateTime::from_timestamp_millis),
            creation_date: self.creation_date.and_then(DateTime::from_timestamp_millis),
            last_modification_date: self
                .last_modification_date
                .and_then(DateTime::from_timestamp_millis),
            display_to: self.display_to,
            display_cc: self.display_cc,
            display_bcc: self.display_bcc,
            recipients: self.recipients,
            attachments: self.attachments,
            properties: self.properties,
            smime,
        }
    }
}

fn time_of(value: &PropertyValue) -> Option<i64> {
    match value {
        PropertyValue::Time(ms) => Some(*ms),
        _ => None,
    }
}
