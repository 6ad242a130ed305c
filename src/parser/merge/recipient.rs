//! Recipient builder with SMTP/X.500 address routing.

use tracing::trace;

use super::{looks_like_smtp, looks_like_x500, Policy};
use crate::model::property::{PropTag, PropertyRecord, PropertyValue};
use crate::model::recipient::Recipient;
use crate::model::PropertyMap;

#[derive(Debug, Default)]
pub struct RecipientBuilder {
    name: Option<String>,
    address: Option<String>,
    x500_address: Option<String>,
    name_was_used_as_address: bool,
    properties: PropertyMap,
}

impl RecipientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_property(&mut self, record: PropertyRecord) {
        let PropertyRecord { tag, value, .. } = record;
        if let PropertyValue::Text(text) = &value {
            match PropTag::from_id(tag) {
                PropTag::DisplayName => self.set_name(text),
                PropTag::EmailAddress | PropTag::SmtpAddress => self.set_address(text),
                _ => {}
            }
        }
        self.properties.insert(tag, value);
    }

    fn set_name(&mut self, name: &str) {
        Policy::Force.apply(&mut self.name, name.to_string());
        // An address-looking display name stands in until a real address shows up.
        if self.address.is_none() && looks_like_smtp(name) {
            self.address = Some(name.to_string());
            self.name_was_used_as_address = true;
        }
    }

    fn set_address(&mut self, address: &str) {
        if looks_like_x500(address) {
            self.x500_address = Some(address.to_string());
        } else if Policy::Validated(looks_like_smtp).apply(&mut self.address, address.to_string()) {
            self.name_was_used_as_address = false;
        } else {
            trace!(address, "Ignoring address without '@'");
        }
    }

    pub fn build(self) -> Recipient {
        Recipient {
            name: self.name,
            address: self.address,
            x500_address: self.x500_address,
            name_was_used_as_address: self.name_was_used_as_address,
            properties: self.properties,
        }
    }
}
