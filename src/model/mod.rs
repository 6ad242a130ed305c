//! Core data model: messages, recipients, attachments and raw properties.

pub mod attachment;
pub mod message;
pub mod property;
pub mod recipient;

pub use attachment::{Attachment, FileAttachment, NestedMessageAttachment};
pub use message::{ParsedMessage, Smime};
pub use property::{PropertyMap, PropertyValue};
pub use recipient::{Recipient, RecipientRole};
