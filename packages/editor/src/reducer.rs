//! # State Reducer
//!
//! `reduce(state, event)` derives the next state from exactly one event and
//! nothing else. Replaying a log through it is how every historical state is
//! reconstructed, so a handler must never consult anything outside its
//! arguments (no clock, no id minting).

use crate::errors::{DocumentError, DocumentResult};
use crate::events::{next_revision, DocumentEvent};
use crate::state::DocumentState;
use scriptorium_markup::{mutator, MarkupError};
use tracing::{debug, info};

/// State described by a `Loaded` event
pub fn initial_state(event: &DocumentEvent) -> DocumentResult<DocumentState> {
    match event {
        DocumentEvent::Loaded {
            revision, snapshot, ..
        } => DocumentState::from_snapshot(snapshot, *revision),
        other => Err(DocumentError::invalid_log(format!(
            "expected loaded, found {}",
            other.kind()
        ))),
    }
}

/// Apply one event to a state
pub fn reduce(state: &DocumentState, event: &DocumentEvent) -> DocumentResult<DocumentState> {
    let expected = next_revision(state.revision)?;
    if event.revision() != expected {
        return Err(DocumentError::invalid_log(format!(
            "{} has revision {}, expected {}",
            event.kind(),
            event.revision(),
            expected
        )));
    }

    let mut next = state.clone();
    next.revision = expected;

    match event {
        DocumentEvent::Loaded { .. } => {
            return Err(DocumentError::invalid_log("loaded can only start a log"));
        }

        DocumentEvent::TagAdded {
            passage_id,
            tag_id,
            range,
            tag_type,
            attributes,
            ..
        } => {
            if state.contains_element_id(tag_id) {
                return Err(MarkupError::DuplicateTagId(tag_id.clone()).into());
            }
            let passage = next
                .passages
                .iter_mut()
                .find(|p| &p.id == passage_id)
                .ok_or_else(|| DocumentError::PassageNotFound(passage_id.clone()))?;
            passage.root =
                mutator::wrap_range(&passage.root, *range, tag_id.clone(), tag_type, attributes)?;
            next.rederive_tags();
        }

        DocumentEvent::TagRemoved {
            passage_id,
            tag_id,
            recursive,
            ..
        } => {
            let passage = next
                .passages
                .iter_mut()
                .find(|p| &p.id == passage_id)
                .ok_or_else(|| DocumentError::PassageNotFound(passage_id.clone()))?;
            passage.root = mutator::unwrap(&passage.root, tag_id, *recursive)?;
            next.rederive_tags();
        }

        DocumentEvent::CharacterAdded { character, .. } => {
            if state.character_by_key(&character.external_key).is_some() {
                return Err(DocumentError::DuplicateCharacterKey(
                    character.external_key.clone(),
                ));
            }
            if state.character(&character.id).is_some() {
                return Err(DocumentError::invalid_log(format!(
                    "character id {} already in use",
                    character.id
                )));
            }
            next.characters.push(character.clone());
        }

        DocumentEvent::CharacterUpdated { character, .. } => {
            let clash = state
                .character_by_key(&character.external_key)
                .filter(|other| other.id != character.id);
            if clash.is_some() {
                return Err(DocumentError::DuplicateCharacterKey(
                    character.external_key.clone(),
                ));
            }
            let slot = next
                .characters
                .iter_mut()
                .find(|c| c.id == character.id)
                .ok_or_else(|| DocumentError::CharacterNotFound(character.id.clone()))?;
            *slot = character.clone();
        }

        DocumentEvent::CharacterRemoved { character_id, .. } => {
            if state.character(character_id).is_none() {
                return Err(DocumentError::CharacterNotFound(character_id.clone()));
            }
            next.characters.retain(|c| &c.id != character_id);
            next.relationships.retain(|r| !r.involves(character_id));
        }

        DocumentEvent::RelationAdded { relationship, .. } => {
            for end in [&relationship.from, &relationship.to] {
                if state.character(end).is_none() {
                    return Err(DocumentError::CharacterNotFound(end.clone()));
                }
            }
            if state.relationship(&relationship.id).is_some() {
                return Err(DocumentError::invalid_log(format!(
                    "relationship id {} already in use",
                    relationship.id
                )));
            }
            next.relationships.push(relationship.clone());
        }

        DocumentEvent::RelationRemoved {
            relationship_id, ..
        } => {
            if state.relationship(relationship_id).is_none() {
                return Err(DocumentError::RelationshipNotFound(relationship_id.clone()));
            }
            next.relationships.retain(|r| &r.id != relationship_id);
        }
    }

    debug!(revision = next.revision, kind = event.kind(), "Reduced event");
    Ok(next)
}

/// Replay a whole log, starting from its `Loaded` event
pub fn rebuild(events: &[DocumentEvent]) -> DocumentResult<DocumentState> {
    let (first, rest) = events
        .split_first()
        .ok_or_else(|| DocumentError::invalid_log("log is empty"))?;

    let state = rest
        .iter()
        .try_fold(initial_state(first)?, |state, event| reduce(&state, event))?;

    info!(
        baseline = first.revision(),
        revision = state.revision,
        events = events.len(),
        "Rebuilt document state"
    );
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Character, Relationship};
    use crate::ids::{CharacterId, PassageId, RelationshipId};
    use crate::state::{Passage, Snapshot};
    use chrono::{TimeZone, Utc};
    use scriptorium_markup::{Attributes, Element, MarkupNode, TagId, TextRange};

    fn at(revision: u64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + revision as i64, 0).unwrap()
    }

    fn snapshot() -> Snapshot {
        let root = Element::new(TagId::new("root"), "p").with_child(MarkupNode::text("Hello world"));
        Snapshot::new(vec![Passage::new(PassageId::new("p1"), root.into())])
            .with_characters(vec![
                Character::new(CharacterId::new("c1"), "jane", "Jane"),
                Character::new(CharacterId::new("c2"), "tom", "Tom"),
            ])
            .with_relationships(vec![Relationship {
                id: RelationshipId::new("r1"),
                from: CharacterId::new("c1"),
                to: CharacterId::new("c2"),
                relation_type: "sibling".to_string(),
                mutual: true,
            }])
    }

    fn loaded() -> DocumentEvent {
        DocumentEvent::Loaded {
            timestamp: at(0),
            revision: 0,
            snapshot: snapshot(),
        }
    }

    fn tag_added(revision: u64, start: usize, end: usize, id: &str) -> DocumentEvent {
        DocumentEvent::TagAdded {
            timestamp: at(revision),
            revision,
            passage_id: PassageId::new("p1"),
            tag_id: TagId::new(id),
            range: TextRange::new(start, end),
            tag_type: "q".to_string(),
            attributes: Attributes::new(),
        }
    }

    #[test]
    fn test_tag_added_wraps_range() {
        let state = initial_state(&loaded()).unwrap();
        let next = reduce(&state, &tag_added(1, 6, 11, "q1")).unwrap();

        assert_eq!(next.revision, 1);
        assert_eq!(next.passages[0].text(), "Hello world");
        let tag = next.tag(&TagId::new("q1")).unwrap();
        assert_eq!(tag.range, TextRange::new(6, 11));
        assert_eq!(tag.tag_type, "q");

        // The input state is untouched
        assert_eq!(state.revision, 0);
        assert!(state.tags.is_empty());
    }

    #[test]
    fn test_revision_gap_is_rejected() {
        let state = initial_state(&loaded()).unwrap();
        let err = reduce(&state, &tag_added(2, 6, 11, "q1")).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidEventLog(_)));

        let err = reduce(&state, &loaded()).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidEventLog(_)));
    }

    #[test]
    fn test_tag_id_unique_across_passages() {
        let other = Element::new(TagId::new("root2"), "p").with_child(MarkupNode::text("Again"));
        let mut two_passages = snapshot();
        two_passages
            .passages
            .push(Passage::new(PassageId::new("p2"), other.into()));
        let state = DocumentState::from_snapshot(&two_passages, 0).unwrap();

        // Reusing the root id of another passage
        assert_eq!(
            reduce(&state, &tag_added(1, 0, 5, "root2")),
            Err(MarkupError::DuplicateTagId(TagId::new("root2")).into())
        );
        assert_eq!(
            reduce(&state, &tag_added(1, 0, 5, "root")),
            Err(MarkupError::DuplicateTagId(TagId::new("root")).into())
        );
    }

    #[test]
    fn test_revision_overflow_is_invalid_log() {
        let mut state = initial_state(&loaded()).unwrap();
        state.revision = u64::MAX;
        let err = reduce(&state, &tag_added(0, 0, 5, "a")).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidEventLog(_)));
    }

    #[test]
    fn test_unknown_passage() {
        let state = initial_state(&loaded()).unwrap();
        let event = DocumentEvent::TagRemoved {
            timestamp: at(1),
            revision: 1,
            passage_id: PassageId::new("missing"),
            tag_id: TagId::new("q1"),
            recursive: false,
        };
        assert_eq!(
            reduce(&state, &event),
            Err(DocumentError::PassageNotFound(PassageId::new("missing")))
        );
    }

    #[test]
    fn test_character_removal_cascades() {
        let state = initial_state(&loaded()).unwrap();
        let event = DocumentEvent::CharacterRemoved {
            timestamp: at(1),
            revision: 1,
            character_id: CharacterId::new("c2"),
        };
        let next = reduce(&state, &event).unwrap();

        assert_eq!(next.characters.len(), 1);
        assert!(next.relationships.is_empty());
        assert_eq!(state.relationships.len(), 1);
    }

    #[test]
    fn test_relation_requires_existing_characters() {
        let state = initial_state(&loaded()).unwrap();
        let event = DocumentEvent::RelationAdded {
            timestamp: at(1),
            revision: 1,
            relationship: Relationship {
                id: RelationshipId::new("r2"),
                from: CharacterId::new("c1"),
                to: CharacterId::new("ghost"),
                relation_type: "knows".to_string(),
                mutual: false,
            },
        };
        assert_eq!(
            reduce(&state, &event),
            Err(DocumentError::CharacterNotFound(CharacterId::new("ghost")))
        );
    }

    #[test]
    fn test_character_update_rejects_key_clash() {
        let state = initial_state(&loaded()).unwrap();
        let event = DocumentEvent::CharacterUpdated {
            timestamp: at(1),
            revision: 1,
            character: Character::new(CharacterId::new("c2"), "jane", "Tom"),
        };
        assert_eq!(
            reduce(&state, &event),
            Err(DocumentError::DuplicateCharacterKey("jane".to_string()))
        );
    }

    #[test]
    fn test_rebuild_matches_incremental_reduction() {
        let events = vec![
            loaded(),
            tag_added(1, 0, 5, "a"),
            tag_added(2, 6, 11, "b"),
            DocumentEvent::TagRemoved {
                timestamp: at(3),
                revision: 3,
                passage_id: PassageId::new("p1"),
                tag_id: TagId::new("a"),
                recursive: false,
            },
        ];

        let mut incremental = initial_state(&events[0]).unwrap();
        for event in &events[1..] {
            incremental = reduce(&incremental, event).unwrap();
        }

        assert_eq!(rebuild(&events).unwrap(), incremental);
        assert_eq!(incremental.revision, 3);
        assert_eq!(incremental.tags.len(), 1);
    }

    #[test]
    fn test_rebuild_requires_loaded_first() {
        assert!(rebuild(&[]).is_err());
        assert!(rebuild(&[tag_added(1, 0, 5, "a")]).is_err());
    }
}
