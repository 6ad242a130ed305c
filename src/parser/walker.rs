//! Depth-first traversal of the loaded container tree.
//!
//! Storages are dispatched by name prefix, leaves are decoded and merged into
//! whichever builder owns the current storage.

use encoding_rs::Encoding;
use tracing::{debug, info, trace};

use super::container::Node;
use super::merge::{AttachmentBuilder, MessageBuilder, RecipientBuilder};
use super::{charset, property, props_stream};
use crate::config::ParserConfig;
use crate::model::attachment::{Attachment, NestedMessageAttachment};
use crate::model::message::ParsedMessage;
use crate::model::property::{PropertyRecord, PropertyType};

const ATTACHMENT_PREFIX: &str = "__attach_version1.0";
const RECIPIENT_PREFIX: &str = "__recip_version1.0";
const NAMEID_PREFIX: &str = "__nameid_version1.0";

/// Anything that accepts decoded properties.
pub trait PropertySink {
    fn set_property(&mut self, record: PropertyRecord);
}

impl PropertySink for MessageBuilder {
    fn set_property(&mut self, record: PropertyRecord) {
        MessageBuilder::set_property(self, record);
    }
}

impl PropertySink for RecipientBuilder {
    fn set_property(&mut self, record: PropertyRecord) {
        RecipientBuilder::set_property(self, record);
    }
}

impl PropertySink for AttachmentBuilder {
    fn set_property(&mut self, record: PropertyRecord) {
        AttachmentBuilder::set_property(self, record);
    }
}

/// Build a message from the root storage of a container.
pub fn walk(root: &Node, config: &ParserConfig) -> ParsedMessage {
    let walker = Walker {
        config,
        encoding: charset::encoding_or_default(config.code_page),
    };
    walker.message(root.children())
}

struct Walker<'a> {
    config: &'a ParserConfig,
    encoding: &'static Encoding,
}

impl Walker<'_> {
    fn message(&self, children: &[Node]) -> ParsedMessage {
        let mut builder = MessageBuilder::new(self.encoding);
        self.visit_message_dir(children, &mut builder);
        builder.build(self.config)
    }

    fn visit_message_dir(&self, children: &[Node], msg: &mut MessageBuilder) {
        for child in children {
            match child {
                Node::Storage { name, children } => {
                    if name.starts_with(ATTACHMENT_PREFIX) {
                        self.visit_attachment(children, msg);
                    } else if name.starts_with(RECIPIENT_PREFIX) {
                        let mut recipient = RecipientBuilder::new();
                        self.consume_leaves(children, &mut recipient);
                        msg.add_recipient(recipient.build());
                    } else if name.starts_with(NAMEID_PREFIX) {
                        trace!("Skipping named property mapping");
                    } else {
                        self.visit_message_dir(children, msg);
                    }
                }
                Node::Stream { .. } => self.consume_leaf(child, msg),
            }
        }
    }

    fn visit_attachment(&self, children: &[Node], msg: &mut MessageBuilder) {
        let mut attachment = AttachmentBuilder::new();
        for child in children {
            match child {
                // A storage inside an attachment is an embedded message.
                Node::Storage { name, children } => {
                    let nested = self.message(children);
                    if self.config.purge_empty_nested && nested.is_degenerate() {
                        info!(name = %name, "Discarding empty nested message");
                        continue;
                    }
                    msg.add_attachment(Attachment::Nested(NestedMessageAttachment {
                        message: nested,
                    }));
                }
                Node::Stream { .. } => self.consume_leaf(child, &mut attachment),
            }
        }
        match attachment.build() {
            Some(file) => msg.add_attachment(Attachment::File(file)),
            None => trace!("Attachment storage carried no file data"),
        }
    }

    fn consume_leaves(&self, children: &[Node], sink: &mut impl PropertySink) {
        for child in children {
            self.consume_leaf(child, sink);
        }
    }

    fn consume_leaf(&self, node: &Node, sink: &mut impl PropertySink) {
        let Node::Stream { name, len, data } = node else {
            return;
        };

        if name == property::PROPERTIES_STREAM {
            let Some(data) = data else {
                debug!("Properties stream unreadable");
                return;
            };
            for record in props_stream::split(data) {
                let value = property::decode_value(record.prop_type, &record.bytes, self.encoding);
                sink.set_property(PropertyRecord {
                    tag: record.tag,
                    prop_type: record.prop_type,
                    value,
                    declared_len: record.bytes.len() as u64,
                });
            }
            return;
        }

        let Some((tag, type_code)) = property::parse_leaf_name(name) else {
            trace!(name = %name, "Not a property leaf");
            return;
        };
        let prop_type = PropertyType::from_code(type_code);
        let bytes: &[u8] = match (data, prop_type) {
            (Some(data), _) => data,
            (None, PropertyType::Binary) => &[],
            (None, _) => {
                debug!(tag = %format!("{tag:04x}"), "Dropping unreadable property");
                return;
            }
        };
        sink.set_property(PropertyRecord {
            tag,
            prop_type,
            value: property::decode_value(prop_type, bytes, self.encoding),
            declared_len: *len,
        });
    }
}
