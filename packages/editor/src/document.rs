//! # Document Value
//!
//! A materialized state together with the full log that produced it.
//!
//! ## Lifecycle
//!
//! ```text
//! Load → Snapshot → Edit → Edit → ...
//!   ↓       ↓        ↓      ↓
//! Source  Loaded   Event  Event   (appended to the log)
//! ```
//!
//! Values are immutable. Every successful edit returns a new value; the
//! value it was applied to stays valid and can still be edited, which is
//! what history navigation builds on.

use crate::entities::{Character, Relationship};
use crate::errors::{DocumentError, DocumentResult};
use crate::events::{DocumentEvent, EventLog};
use crate::ids::{CharacterId, PassageId, RelationshipId};
use crate::reducer::{rebuild, reduce};
use crate::requests::{EditRequest, Selection};
use crate::state::{DocumentState, Passage, Snapshot, Tag};
use crate::validation::{MarkupValidator, ValidationView};
use chrono::{DateTime, Utc};
use scriptorium_markup::{
    parse_document_with, Attributes, CastMember, LoadOptions, ParsedRelation, Serializer,
    TagId, TeiExport,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Editable, event-sourced document
#[derive(Debug, Clone)]
pub struct DocumentValue {
    state: Arc<DocumentState>,
    events: EventLog,
}

impl DocumentValue {
    /// Create a document from a prepared snapshot (revision 0)
    pub fn load(snapshot: Snapshot) -> DocumentResult<Self> {
        Self::load_at(snapshot, Utc::now())
    }

    pub fn load_at(snapshot: Snapshot, timestamp: DateTime<Utc>) -> DocumentResult<Self> {
        let event = DocumentEvent::Loaded {
            timestamp,
            revision: 0,
            snapshot,
        };
        let doc = Self::from_log(EventLog::new(event)?)?;

        info!(
            passages = doc.state.passages.len(),
            tags = doc.state.tags.len(),
            characters = doc.state.characters.len(),
            "Loaded document"
        );
        Ok(doc)
    }

    /// Read markup source and load it
    pub fn load_markup(name: &str, source: &str, options: &LoadOptions) -> DocumentResult<Self> {
        let parsed = parse_document_with(name, source, options)?;
        Self::load(parsed.into())
    }

    /// Restore a document from a recorded log
    pub fn from_events(events: Vec<DocumentEvent>) -> DocumentResult<Self> {
        Self::from_log(EventLog::from_events(events)?)
    }

    pub fn from_log(events: EventLog) -> DocumentResult<Self> {
        let state = rebuild(events.as_slice())?;
        Ok(Self {
            state: Arc::new(state),
            events,
        })
    }

    pub(crate) fn from_parts(state: DocumentState, events: EventLog) -> Self {
        Self {
            state: Arc::new(state),
            events,
        }
    }

    pub fn state(&self) -> &DocumentState {
        &self.state
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn revision(&self) -> u64 {
        self.state.revision
    }

    /// Revision of the `Loaded` event; nothing before it can be restored
    pub fn baseline(&self) -> u64 {
        self.events.baseline()
    }

    // --- Edits ---

    /// Apply an edit request, stamped with the current time
    pub fn apply(&self, request: &EditRequest) -> DocumentResult<Self> {
        self.apply_at(request, Utc::now())
    }

    pub fn apply_at(&self, request: &EditRequest, timestamp: DateTime<Utc>) -> DocumentResult<Self> {
        let result = request
            .to_event(&self.state, timestamp)
            .and_then(|event| self.commit(event));

        if let Err(e) = &result {
            warn!(
                request = request.name(),
                revision = self.state.revision,
                error = %e,
                "Rejected edit request"
            );
        }
        result
    }

    /// Append an already-built event
    pub fn commit(&self, event: DocumentEvent) -> DocumentResult<Self> {
        let state = reduce(&self.state, &event)?;
        Ok(Self {
            state: Arc::new(state),
            events: self.events.appended(event),
        })
    }

    /// Wrap the selected range in a new element
    pub fn add_tag(
        &self,
        selection: &Selection,
        tag_type: &str,
        attributes: Attributes,
    ) -> DocumentResult<Self> {
        self.apply(&EditRequest::AddTag {
            selection: selection.clone(),
            tag_type: tag_type.to_string(),
            attributes,
        })
    }

    pub fn remove_tag(&self, tag_id: &TagId, recursive: bool) -> DocumentResult<Self> {
        self.apply(&EditRequest::RemoveTag {
            tag_id: tag_id.clone(),
            recursive,
        })
    }

    pub fn add_character(
        &self,
        external_key: &str,
        name: &str,
        attributes: Attributes,
    ) -> DocumentResult<Self> {
        self.apply(&EditRequest::AddCharacter {
            external_key: external_key.to_string(),
            name: name.to_string(),
            attributes,
        })
    }

    pub fn update_character(&self, character: Character) -> DocumentResult<Self> {
        self.apply(&EditRequest::UpdateCharacter { character })
    }

    pub fn remove_character(&self, character_id: &CharacterId) -> DocumentResult<Self> {
        self.apply(&EditRequest::RemoveCharacter {
            character_id: character_id.clone(),
        })
    }

    pub fn add_relation(
        &self,
        from: &CharacterId,
        to: &CharacterId,
        relation_type: &str,
        mutual: bool,
    ) -> DocumentResult<Self> {
        self.apply(&EditRequest::AddRelation {
            from: from.clone(),
            to: to.clone(),
            relation_type: relation_type.to_string(),
            mutual,
        })
    }

    pub fn remove_relation(&self, relationship_id: &RelationshipId) -> DocumentResult<Self> {
        self.apply(&EditRequest::RemoveRelation {
            relationship_id: relationship_id.clone(),
        })
    }

    // --- Queries ---

    pub fn passages(&self) -> &[Passage] {
        &self.state.passages
    }

    pub fn passage(&self, id: &PassageId) -> Option<&Passage> {
        self.state.passage(id)
    }

    pub fn passage_text(&self, id: &PassageId) -> DocumentResult<String> {
        self.passage(id)
            .map(Passage::text)
            .ok_or_else(|| DocumentError::PassageNotFound(id.clone()))
    }

    pub fn tag(&self, id: &TagId) -> Option<&Tag> {
        self.state.tag(id)
    }

    pub fn tags(&self) -> &[Tag] {
        &self.state.tags
    }

    pub fn tags_in(&self, passage_id: &PassageId) -> Vec<&Tag> {
        self.state.tags_in(passage_id)
    }

    /// Speech elements of a passage, in document order
    pub fn speech_tags(&self, passage_id: &PassageId) -> Vec<&Tag> {
        self.state
            .tags_in(passage_id)
            .into_iter()
            .filter(|tag| tag.is_speech())
            .collect()
    }

    pub fn characters(&self) -> &[Character] {
        &self.state.characters
    }

    pub fn character(&self, id: &CharacterId) -> Option<&Character> {
        self.state.character(id)
    }

    pub fn character_by_key(&self, key: &str) -> Option<&Character> {
        self.state.character_by_key(key)
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.state.relationships
    }

    pub fn relationships_for(&self, character: &CharacterId) -> Vec<&Relationship> {
        self.state.relationships_for(character)
    }

    /// Character a speech tag's `who` pointer resolves to
    pub fn speaker_of(&self, tag_id: &TagId) -> Option<&Character> {
        let key = self.tag(tag_id)?.speaker()?;
        self.character_by_key(key)
    }

    /// State as of an earlier revision of this document's own log
    pub fn state_at(&self, revision: u64) -> DocumentResult<DocumentState> {
        if revision == self.state.revision {
            return Ok((*self.state).clone());
        }
        let prefix = self
            .events
            .truncated(revision)
            .ok_or_else(|| self.out_of_range(revision))?;
        rebuild(prefix.as_slice())
    }

    pub(crate) fn out_of_range(&self, revision: u64) -> DocumentError {
        DocumentError::RevisionOutOfRange {
            revision,
            baseline: self.events.baseline(),
            latest: self.events.last_revision(),
        }
    }

    // --- Validation hand-off ---

    /// The latest structural change, as a validator sees it
    pub fn validation_view(&self) -> Option<ValidationView> {
        ValidationView::for_event(self.events.last()?, &self.state)
    }

    /// Run a validator over the latest structural change
    pub fn validate_with<V: MarkupValidator>(&self, validator: &V) -> Vec<V::Diagnostic> {
        self.validation_view()
            .map(|view| validator.validate(&view))
            .unwrap_or_default()
    }

    // --- Compaction ---

    /// Fold the whole log into a single snapshot at the current revision
    pub fn compact(&self) -> DocumentResult<Self> {
        self.compact_keeping(0)
    }

    /// Fold all but the last `keep` edits into a snapshot
    pub fn compact_keeping(&self, keep: usize) -> DocumentResult<Self> {
        let edits = self.events.len() - 1;
        if keep >= edits {
            return Ok(self.clone());
        }

        let baseline = self.state.revision - keep as u64;
        let snapshot = self.state_at(baseline)?.snapshot();
        // The new log must reload
        DocumentState::from_snapshot(&snapshot, baseline)?;
        let loaded = DocumentEvent::Loaded {
            timestamp: self
                .events
                .event_at(baseline)
                .map_or_else(Utc::now, DocumentEvent::timestamp),
            revision: baseline,
            snapshot,
        };

        let mut events = Vec::with_capacity(keep + 1);
        events.push(loaded);
        events.extend(self.events.iter().skip(self.events.len() - keep).cloned());
        let compacted = EventLog::from_events(events)?;

        info!(
            baseline,
            revision = self.state.revision,
            dropped = self.events.len() - compacted.len(),
            "Compacted event log"
        );
        Ok(Self {
            state: Arc::clone(&self.state),
            events: compacted,
        })
    }

    // --- Export ---

    /// Standalone TEI file of the current state
    pub fn to_tei(&self) -> String {
        let key_of = |id: &CharacterId| {
            self.character(id)
                .map(|c| c.external_key.clone())
                .unwrap_or_else(|| id.to_string())
        };
        let export = TeiExport {
            metadata: self.state.metadata.clone(),
            cast: self
                .characters()
                .iter()
                .map(|c| CastMember {
                    id: c.id.to_string(),
                    key: c.external_key.clone(),
                    name: c.name.clone(),
                    attributes: c.attributes.clone(),
                })
                .collect(),
            relations: self
                .relationships()
                .iter()
                .map(|r| ParsedRelation {
                    id: r.id.to_string(),
                    from_key: key_of(&r.from),
                    to_key: key_of(&r.to),
                    relation_type: r.relation_type.clone(),
                    mutual: r.mutual,
                })
                .collect(),
            passages: self.passages().iter().map(|p| &p.root).collect(),
        };
        Serializer::new().serialize_tei(&export)
    }
}

impl PartialEq for DocumentValue {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state && self.events == other.events
    }
}
