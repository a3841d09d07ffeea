use crate::ids::{CharacterId, RelationshipId};
use scriptorium_markup::Attributes;
use serde::{Deserialize, Serialize};

/// A person in the document's cast list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: CharacterId,
    /// Key used by `who="#key"` pointers in the markup
    pub external_key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl Character {
    pub fn new(id: CharacterId, external_key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            external_key: external_key.into(),
            name: name.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }
}

/// A directed (or mutual) link between two characters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: RelationshipId,
    pub from: CharacterId,
    pub to: CharacterId,
    pub relation_type: String,
    #[serde(default)]
    pub mutual: bool,
}

impl Relationship {
    pub fn involves(&self, character: &CharacterId) -> bool {
        &self.from == character || &self.to == character
    }
}
