//! Message recipients.

use serde::Serialize;

use super::property::{PropertyMap, PropertyValue};

/// Which display list a recipient was matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientRole {
    To,
    Cc,
    Bcc,
}

/// One recipient of a message, as stored in a `__recip_version1.0_*` storage.
///
/// `address` is always SMTP-shaped (contains `@`) when present. A directory-style
/// address (`/o=.../ou=...`) is kept apart in `x500_address`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Recipient {
    pub(crate) name: Option<String>,
    pub(crate) address: Option<String>,
    pub(crate) x500_address: Option<String>,
    /// Set while `address` only holds a copy of an `@`-bearing display name.
    #[serde(skip)]
    pub(crate) name_was_used_as_address: bool,
    #[serde(skip)]
    pub(crate) properties: PropertyMap,
}

impl Recipient {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn x500_address(&self) -> Option<&str> {
        self.x500_address.as_deref()
    }

    /// Whether the SMTP address was taken from the display name because no
    /// address property supplied one.
    pub fn name_was_used_as_address(&self) -> bool {
        self.name_was_used_as_address
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    pub fn property(&self, tag: u16) -> Option<&PropertyValue> {
        self.properties.get(tag)
    }
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.name.as_deref().unwrap_or("");
        write!(f, "{name}")?;
        if let Some(addr) = self.address.as_deref().filter(|a| !a.is_empty()) {
            if !name.is_empty() {
                write!(f, " ")?;
            }
            write!(f, "<{addr}>")?;
        }
        Ok(())
    }
}
