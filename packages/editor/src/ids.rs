//! Stable identifiers for passages and auxiliary entities.
//!
//! Ids are opaque strings. Ids assigned while loading come from the
//! document's sequential generator; ids minted by edits are random, so a
//! discarded branch of history never hands its ids to a later edit.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn generate() -> Self {
                Self(format!(concat!($prefix, "-{}"), uuid::Uuid::new_v4()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifier of a passage, assigned once at load
    PassageId,
    "passage"
);

string_id!(
    /// Identifier of a character in the cast list
    CharacterId,
    "character"
);

string_id!(RelationshipId, "relation");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_prefixed_and_unique() {
        let a = CharacterId::generate();
        let b = CharacterId::generate();
        assert!(a.as_str().starts_with("character-"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = PassageId::new("passage-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"passage-1\"");
        let back: PassageId = serde_json::from_str("\"passage-1\"").unwrap();
        assert_eq!(back, id);
    }
}
