//! # Document State
//!
//! The materialized value of a document at one revision. Tags are not
//! stored independently: they are a view over the elements of each passage,
//! re-derived after every transition so their ranges always match the tree.

use crate::entities::{Character, Relationship};
use crate::errors::{DocumentError, DocumentResult};
use crate::ids::{CharacterId, PassageId, RelationshipId};
use scriptorium_markup::{
    is_speech_tag, walk_element, Attributes, Element, MarkupError, MarkupNode, ParsedDocument,
    TagId, TextRange, Visitor,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Top-level addressable unit of text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub id: PassageId,
    pub root: MarkupNode,
}

impl Passage {
    pub fn new(id: PassageId, root: MarkupNode) -> Self {
        Self { id, root }
    }

    pub fn text(&self) -> String {
        self.root.text_content()
    }

    pub fn char_len(&self) -> usize {
        self.root.char_len()
    }
}

/// Read-only view of one non-root element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: TagId,
    pub passage_id: PassageId,
    pub range: TextRange,
    pub tag_type: String,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl Tag {
    /// Key of the first `who` pointer, without its `#`
    pub fn speaker(&self) -> Option<&str> {
        self.attributes
            .get("who")?
            .split_whitespace()
            .next()
            .map(|pointer| pointer.trim_start_matches('#'))
            .filter(|key| !key.is_empty())
    }

    pub fn is_speech(&self) -> bool {
        is_speech_tag(&self.tag_type)
    }
}

/// Everything a `Loaded` event carries
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub passages: Vec<Passage>,
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl Snapshot {
    pub fn new(passages: Vec<Passage>) -> Self {
        Self {
            passages,
            ..Self::default()
        }
    }

    pub fn with_characters(mut self, characters: Vec<Character>) -> Self {
        self.characters = characters;
        self
    }

    pub fn with_relationships(mut self, relationships: Vec<Relationship>) -> Self {
        self.relationships = relationships;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl From<ParsedDocument> for Snapshot {
    fn from(parsed: ParsedDocument) -> Self {
        let characters: Vec<Character> = parsed
            .cast
            .into_iter()
            .map(|member| {
                Character::new(CharacterId::new(member.id), member.key, member.name)
                    .with_attributes(member.attributes)
            })
            .collect();

        let id_for = |key: &str| {
            characters
                .iter()
                .find(|c| c.external_key == key)
                .map(|c| c.id.clone())
        };
        let relationships = parsed
            .relations
            .into_iter()
            .filter_map(|rel| {
                Some(Relationship {
                    id: RelationshipId::new(rel.id),
                    from: id_for(&rel.from_key)?,
                    to: id_for(&rel.to_key)?,
                    relation_type: rel.relation_type,
                    mutual: rel.mutual,
                })
            })
            .collect();

        Self {
            metadata: parsed.metadata,
            passages: parsed
                .passages
                .into_iter()
                .map(|p| Passage::new(PassageId::new(p.id), p.root))
                .collect(),
            characters,
            relationships,
        }
    }
}

/// Materialized document at one revision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentState {
    pub revision: u64,
    pub metadata: BTreeMap<String, String>,
    pub passages: Vec<Passage>,
    pub tags: Vec<Tag>,
    pub characters: Vec<Character>,
    pub relationships: Vec<Relationship>,
}

impl DocumentState {
    /// Build and check the state described by a snapshot
    pub fn from_snapshot(snapshot: &Snapshot, revision: u64) -> DocumentResult<Self> {
        let mut passage_ids = HashSet::new();
        let mut tag_ids = HashSet::new();
        for passage in &snapshot.passages {
            if !passage_ids.insert(&passage.id) {
                return Err(DocumentError::invalid_log(format!(
                    "duplicate passage id {}",
                    passage.id
                )));
            }
            if passage.root.as_element().is_none() {
                return Err(MarkupError::RootNotElement.into());
            }
            for id in passage.root.element_ids() {
                if !tag_ids.insert(id.clone()) {
                    return Err(MarkupError::DuplicateTagId(id).into());
                }
            }
        }

        let mut keys = HashSet::new();
        for character in &snapshot.characters {
            if !keys.insert(character.external_key.as_str()) {
                return Err(DocumentError::DuplicateCharacterKey(
                    character.external_key.clone(),
                ));
            }
        }
        for rel in &snapshot.relationships {
            for end in [&rel.from, &rel.to] {
                if !snapshot.characters.iter().any(|c| &c.id == end) {
                    return Err(DocumentError::CharacterNotFound(end.clone()));
                }
            }
        }

        let mut state = Self {
            revision,
            metadata: snapshot.metadata.clone(),
            passages: snapshot.passages.clone(),
            tags: Vec::new(),
            characters: snapshot.characters.clone(),
            relationships: snapshot.relationships.clone(),
        };
        state.rederive_tags();
        Ok(state)
    }

    /// Everything but the revision and derived tags
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            metadata: self.metadata.clone(),
            passages: self.passages.clone(),
            characters: self.characters.clone(),
            relationships: self.relationships.clone(),
        }
    }

    pub fn passage(&self, id: &PassageId) -> Option<&Passage> {
        self.passages.iter().find(|p| &p.id == id)
    }

    pub fn tag(&self, id: &TagId) -> Option<&Tag> {
        self.tags.iter().find(|t| &t.id == id)
    }

    /// Any element of any passage, passage roots included, has this id
    pub fn contains_element_id(&self, id: &TagId) -> bool {
        self.passages
            .iter()
            .any(|passage| passage.root.find_element(id).is_some())
    }

    pub fn tags_in(&self, passage_id: &PassageId) -> Vec<&Tag> {
        self.tags
            .iter()
            .filter(|t| &t.passage_id == passage_id)
            .collect()
    }

    pub fn character(&self, id: &CharacterId) -> Option<&Character> {
        self.characters.iter().find(|c| &c.id == id)
    }

    pub fn character_by_key(&self, key: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.external_key == key)
    }

    pub fn relationship(&self, id: &RelationshipId) -> Option<&Relationship> {
        self.relationships.iter().find(|r| &r.id == id)
    }

    pub fn relationships_for(&self, character: &CharacterId) -> Vec<&Relationship> {
        self.relationships
            .iter()
            .filter(|r| r.involves(character))
            .collect()
    }

    pub(crate) fn rederive_tags(&mut self) {
        self.tags = self
            .passages
            .iter()
            .flat_map(|passage| {
                let mut collector = TagCollector::new(&passage.id);
                collector.visit_node(&passage.root);
                collector.tags
            })
            .collect();
    }
}

/// Collects a `Tag` for every element below the passage root
struct TagCollector<'a> {
    passage_id: &'a PassageId,
    offset: usize,
    depth: usize,
    tags: Vec<Tag>,
}

impl<'a> TagCollector<'a> {
    fn new(passage_id: &'a PassageId) -> Self {
        Self {
            passage_id,
            offset: 0,
            depth: 0,
            tags: Vec::new(),
        }
    }
}

impl Visitor for TagCollector<'_> {
    fn visit_element(&mut self, element: &Element) {
        if self.depth == 0 {
            self.depth += 1;
            walk_element(self, element);
            self.depth -= 1;
            return;
        }

        // Pre-order: push before children, patch the end afterwards
        let slot = self.tags.len();
        let start = self.offset;
        self.tags.push(Tag {
            id: element.id.clone(),
            passage_id: self.passage_id.clone(),
            range: TextRange::new(start, start),
            tag_type: element.name.clone(),
            attributes: element.attributes.clone(),
        });

        self.depth += 1;
        walk_element(self, element);
        self.depth -= 1;

        self.tags[slot].range.end = self.offset;
    }

    fn visit_text(&mut self, content: &str) {
        self.offset += content.chars().count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptorium_markup::OffsetIndex;

    fn passage() -> Passage {
        let root = Element::new(TagId::new("p"), "p")
            .with_child(MarkupNode::text("Hé said "))
            .with_child(
                Element::new(TagId::new("q"), "said")
                    .with_attributes(Attributes::new().with("who", "#jane #tom"))
                    .with_child(MarkupNode::text("go "))
                    .with_child(
                        Element::new(TagId::new("e"), "emph")
                            .with_child(MarkupNode::text("now"))
                            .into(),
                    )
                    .into(),
            )
            .with_child(MarkupNode::text("."));
        Passage::new(PassageId::new("p1"), root.into())
    }

    #[test]
    fn test_derived_tags_match_offset_index() {
        let passage = passage();
        let state = DocumentState::from_snapshot(&Snapshot::new(vec![passage.clone()]), 0).unwrap();
        let index = OffsetIndex::build(&passage.root);

        assert_eq!(state.tags.len(), 2);
        for tag in &state.tags {
            assert_eq!(Some(tag.range), index.element_range(&tag.id));
        }
        assert_eq!(state.tag(&TagId::new("q")).unwrap().range, TextRange::new(8, 14));
        assert_eq!(state.tag(&TagId::new("e")).unwrap().range, TextRange::new(11, 14));
    }

    #[test]
    fn test_contains_element_id_sees_roots() {
        let state = DocumentState::from_snapshot(&Snapshot::new(vec![passage()]), 0).unwrap();
        assert!(state.contains_element_id(&TagId::new("p")));
        assert!(state.contains_element_id(&TagId::new("e")));
        assert!(state.tag(&TagId::new("p")).is_none());
        assert!(!state.contains_element_id(&TagId::new("nope")));
    }

    #[test]
    fn test_speaker_reads_first_pointer() {
        let state = DocumentState::from_snapshot(&Snapshot::new(vec![passage()]), 0).unwrap();
        let said = state.tag(&TagId::new("q")).unwrap();
        assert!(said.is_speech());
        assert_eq!(said.speaker(), Some("jane"));
        assert_eq!(state.tag(&TagId::new("e")).unwrap().speaker(), None);
    }

    #[test]
    fn test_snapshot_rejects_duplicate_keys_and_dangling_relations() {
        let jane = Character::new(CharacterId::new("c1"), "jane", "Jane");
        let again = Character::new(CharacterId::new("c2"), "jane", "Jane B.");
        let snapshot = Snapshot::new(vec![passage()]).with_characters(vec![jane.clone(), again]);
        assert_eq!(
            DocumentState::from_snapshot(&snapshot, 0),
            Err(DocumentError::DuplicateCharacterKey("jane".to_string()))
        );

        let dangling = Relationship {
            id: RelationshipId::new("r1"),
            from: jane.id.clone(),
            to: CharacterId::new("ghost"),
            relation_type: "knows".to_string(),
            mutual: false,
        };
        let snapshot = Snapshot::new(vec![passage()])
            .with_characters(vec![jane])
            .with_relationships(vec![dangling]);
        assert_eq!(
            DocumentState::from_snapshot(&snapshot, 0),
            Err(DocumentError::CharacterNotFound(CharacterId::new("ghost")))
        );
    }

    #[test]
    fn test_snapshot_rejects_text_root() {
        let snapshot = Snapshot::new(vec![Passage::new(PassageId::new("p"), MarkupNode::text("x"))]);
        assert_eq!(
            DocumentState::from_snapshot(&snapshot, 0).unwrap_err().kind(),
            crate::errors::ErrorKind::InvalidEventLog
        );
    }
}
