//! Property merging: routes decoded properties into entity builders.
//!
//! Every builder stores each record in its raw [`PropertyMap`](crate::model::PropertyMap)
//! and promotes well-known tags into typed fields under a [`Policy`].

pub mod attachment;
pub mod message;
pub mod recipient;

pub use attachment::AttachmentBuilder;
pub use message::MessageBuilder;
pub use recipient::RecipientBuilder;

/// How a candidate value interacts with a field that may already be set.
#[derive(Debug, Clone, Copy)]
pub enum Policy {
    /// Always replace.
    Force,
    /// Only fill an empty field.
    FirstWins,
    /// Replace unless the current value is strictly longer.
    LongestWins,
    /// Replace whenever the candidate passes the check.
    Validated(fn(&str) -> bool),
}

/// A value a [`Policy`] can weigh and inspect.
pub trait Mergeable {
    /// Length used by [`Policy::LongestWins`].
    fn weight(&self) -> usize;
    /// Text view checked by [`Policy::Validated`].
    fn text(&self) -> Option<&str>;
}

impl Mergeable for String {
    fn weight(&self) -> usize {
        self.chars().count()
    }

    fn text(&self) -> Option<&str> {
        Some(self)
    }
}

impl Mergeable for Vec<u8> {
    fn weight(&self) -> usize {
        self.len()
    }

    fn text(&self) -> Option<&str> {
        None
    }
}

impl Mergeable for i64 {
    fn weight(&self) -> usize {
        0
    }

    fn text(&self) -> Option<&str> {
        None
    }
}

impl Policy {
    /// Apply `candidate` to `slot`. Returns whether the slot was written.
    pub fn apply<T: Mergeable>(self, slot: &mut Option<T>, candidate: T) -> bool {
        let accept = match self {
            Self::Force => true,
            Self::FirstWins => slot.is_none(),
            Self::LongestWins => slot
                .as_ref()
                .is_none_or(|current| current.weight() <= candidate.weight()),
            Self::Validated(check) => candidate.text().is_some_and(check),
        };
        if accept {
            *slot = Some(candidate);
        }
        accept
    }
}

/// Address-shaped values must carry an `@`.
pub fn looks_like_smtp(value: &str) -> bool {
    value.contains('@')
}

/// Distinguished-name form, e.g. `/o=Org/ou=Site/cn=Recipients/cn=jdoe`.
pub fn looks_like_x500(value: &str) -> bool {
    let lower = value.trim_start().to_ascii_lowercase();
    lower.starts_with("/o=") && lower.contains("/ou=")
}
