//! # Edit Requests
//!
//! What a caller asks for, before it becomes an event. Turning a request
//! into an event is where the outside world enters: the timestamp, freshly
//! minted ids and the staleness check against the selection's revision.
//! Everything else is validated by the reducer when the event is applied.

use crate::entities::{Character, Relationship};
use crate::errors::{DocumentError, DocumentResult};
use crate::events::{next_revision, DocumentEvent};
use crate::ids::{CharacterId, PassageId, RelationshipId};
use crate::state::DocumentState;
use chrono::{DateTime, Utc};
use scriptorium_markup::{Attributes, MarkupError, TagId, TextRange};
use serde::{Deserialize, Serialize};

/// A range of one passage, stamped with the revision it was made against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub passage_id: PassageId,
    pub range: TextRange,
    pub revision: u64,
}

impl Selection {
    pub fn new(passage_id: PassageId, range: impl Into<TextRange>, revision: u64) -> Self {
        Self {
            passage_id,
            range: range.into(),
            revision,
        }
    }

    pub(crate) fn check_fresh(&self, state: &DocumentState) -> DocumentResult<()> {
        if self.revision != state.revision {
            return Err(DocumentError::StaleSelection {
                selection: self.revision,
                current: state.revision,
            });
        }
        Ok(())
    }
}

/// A single edit, in the form callers (and request files) submit it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EditRequest {
    /// Wrap the selected range in a new element
    AddTag {
        selection: Selection,
        tag_type: String,
        #[serde(default)]
        attributes: Attributes,
    },

    RemoveTag {
        tag_id: TagId,
        #[serde(default)]
        recursive: bool,
    },

    AddCharacter {
        external_key: String,
        name: String,
        #[serde(default)]
        attributes: Attributes,
    },

    /// Replace every field of an existing character
    UpdateCharacter { character: Character },

    RemoveCharacter { character_id: CharacterId },

    AddRelation {
        from: CharacterId,
        to: CharacterId,
        relation_type: String,
        #[serde(default)]
        mutual: bool,
    },

    RemoveRelation { relationship_id: RelationshipId },
}

impl EditRequest {
    pub fn name(&self) -> &'static str {
        match self {
            EditRequest::AddTag { .. } => "addTag",
            EditRequest::RemoveTag { .. } => "removeTag",
            EditRequest::AddCharacter { .. } => "addCharacter",
            EditRequest::UpdateCharacter { .. } => "updateCharacter",
            EditRequest::RemoveCharacter { .. } => "removeCharacter",
            EditRequest::AddRelation { .. } => "addRelation",
            EditRequest::RemoveRelation { .. } => "removeRelation",
        }
    }

    /// Build the event recording this request at the next revision
    pub(crate) fn to_event(
        &self,
        state: &DocumentState,
        timestamp: DateTime<Utc>,
    ) -> DocumentResult<DocumentEvent> {
        let revision = next_revision(state.revision)?;

        let event = match self {
            EditRequest::AddTag {
                selection,
                tag_type,
                attributes,
            } => {
                selection.check_fresh(state)?;
                DocumentEvent::TagAdded {
                    timestamp,
                    revision,
                    passage_id: selection.passage_id.clone(),
                    tag_id: TagId::generate(),
                    range: selection.range,
                    tag_type: tag_type.clone(),
                    attributes: attributes.clone(),
                }
            }

            EditRequest::RemoveTag { tag_id, recursive } => {
                let tag = state
                    .tag(tag_id)
                    .ok_or_else(|| MarkupError::TagNotFound(tag_id.clone()))?;
                DocumentEvent::TagRemoved {
                    timestamp,
                    revision,
                    passage_id: tag.passage_id.clone(),
                    tag_id: tag_id.clone(),
                    recursive: *recursive,
                }
            }

            EditRequest::AddCharacter {
                external_key,
                name,
                attributes,
            } => DocumentEvent::CharacterAdded {
                timestamp,
                revision,
                character: Character::new(CharacterId::generate(), external_key.clone(), name.clone())
                    .with_attributes(attributes.clone()),
            },

            EditRequest::UpdateCharacter { character } => DocumentEvent::CharacterUpdated {
                timestamp,
                revision,
                character: character.clone(),
            },

            EditRequest::RemoveCharacter { character_id } => DocumentEvent::CharacterRemoved {
                timestamp,
                revision,
                character_id: character_id.clone(),
            },

            EditRequest::AddRelation {
                from,
                to,
                relation_type,
                mutual,
            } => DocumentEvent::RelationAdded {
                timestamp,
                revision,
                relationship: Relationship {
                    id: RelationshipId::generate(),
                    from: from.clone(),
                    to: to.clone(),
                    relation_type: relation_type.clone(),
                    mutual: *mutual,
                },
            },

            EditRequest::RemoveRelation { relationship_id } => DocumentEvent::RelationRemoved {
                timestamp,
                revision,
                relationship_id: relationship_id.clone(),
            },
        };
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_file_entries() {
        let json = r##"[
            {
                "op": "addTag",
                "selection": { "passageId": "p1", "range": { "start": 6, "end": 11 }, "revision": 0 },
                "tagType": "said",
                "attributes": { "who": "#jane" }
            },
            { "op": "removeTag", "tagId": "t1", "recursive": true },
            { "op": "addCharacter", "externalKey": "jane", "name": "Jane" },
            { "op": "addRelation", "from": "c1", "to": "c2", "relationType": "sibling", "mutual": true }
        ]"##;
        let requests: Vec<EditRequest> = serde_json::from_str(json).unwrap();

        assert_eq!(requests.len(), 4);
        match &requests[0] {
            EditRequest::AddTag {
                selection,
                attributes,
                ..
            } => {
                assert_eq!(selection.range, TextRange::new(6, 11));
                assert_eq!(attributes.get("who"), Some("#jane"));
            }
            other => panic!("unexpected request {:?}", other),
        }
        assert_eq!(requests[1].name(), "removeTag");
        assert!(matches!(
            &requests[2],
            EditRequest::AddCharacter { attributes, .. } if attributes.is_empty()
        ));
    }
}
