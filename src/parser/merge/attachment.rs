//! File attachment builder.

use super::Policy;
use crate::model::attachment::FileAttachment;
use crate::model::property::{PropTag, PropertyRecord, PropertyValue};
use crate::model::PropertyMap;

const SMIME_SIGNATURE_FILENAME: &str = "smime.p7s";

#[derive(Debug, Default)]
pub struct AttachmentBuilder {
    filename: Option<String>,
    long_filename: Option<String>,
    mime_tag: Option<String>,
    extension: Option<String>,
    content_id: Option<String>,
    /// Payload and its declared length, always set together.
    data: Option<(Vec<u8>, u64)>,
    properties: PropertyMap,
}

impl AttachmentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_property(&mut self, record: PropertyRecord) {
        let PropertyRecord {
            tag,
            value,
            declared_len,
            ..
        } = record;
        match (PropTag::from_id(tag), &value) {
            (PropTag::AttachData, PropertyValue::Binary(bytes)) => {
                self.data = Some((bytes.clone(), declared_len));
            }
            (field, PropertyValue::Text(text)) => {
                if let Some(slot) = self.text_slot(field) {
                    Policy::Force.apply(slot, text.clone());
                }
            }
            _ => {}
        }
        self.properties.insert(tag, value);
    }

    fn text_slot(&mut self, tag: PropTag) -> Option<&mut Option<String>> {
        match tag {
            PropTag::AttachFilename => Some(&mut self.filename),
            PropTag::AttachLongFilename => Some(&mut self.long_filename),
            PropTag::AttachMimeTag => Some(&mut self.mime_tag),
            PropTag::AttachExtension => Some(&mut self.extension),
            PropTag::AttachContentId => Some(&mut self.content_id),
            _ => None,
        }
    }

    /// Finish the attachment. Attachments without a payload are dropped.
    pub fn build(self) -> Option<FileAttachment> {
        let (data, size) = self.data.filter(|(data, size)| *size > 0 && !data.is_empty())?;
        let mut filename = self.filename;
        if filename.is_none() && self.mime_tag.as_deref().is_some_and(is_detached_signature) {
            filename = Some(SMIME_SIGNATURE_FILENAME.to_string());
        }
        Some(FileAttachment {
            filename,
            long_filename: self.long_filename,
            mime_tag: self.mime_tag,
            extension: self.extension,
            content_id: self.content_id,
            data,
            size,
            properties: self.properties,
        })
    }
}

/// `multipart/signed` with no protocol, or with the PKCS#7 signature protocol.
fn is_detached_signature(mime_tag: &str) -> bool {
    mime_tag.contains("multipart/signed")
        && (!mime_tag.contains("protocol")
            || mime_tag.contains("protocol=\"application/pkcs7-signature\""))
}
