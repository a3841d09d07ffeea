//! # Event Log
//!
//! Every state transition of a document is one [`DocumentEvent`]. The log is
//! append-only: a value never changes once created, appending produces a new
//! log, and truncation (for undo) only narrows the visible prefix of a
//! shared buffer.
//!
//! ## Invariants
//! - The first event is `Loaded`; no other event is `Loaded`
//! - `events[i].revision == baseline + i`, where the baseline is the
//!   revision of the `Loaded` event (0 unless the log was compacted)

use crate::entities::{Character, Relationship};
use crate::errors::{DocumentError, DocumentResult};
use crate::ids::{CharacterId, PassageId, RelationshipId};
use crate::state::Snapshot;
use chrono::{DateTime, Utc};
use scriptorium_markup::{Attributes, TagId, TextRange};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

/// One recorded state transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DocumentEvent {
    Loaded {
        timestamp: DateTime<Utc>,
        revision: u64,
        snapshot: Snapshot,
    },

    /// A range of one passage was wrapped in a new element
    TagAdded {
        timestamp: DateTime<Utc>,
        revision: u64,
        passage_id: PassageId,
        tag_id: TagId,
        range: TextRange,
        tag_type: String,
        #[serde(default)]
        attributes: Attributes,
    },

    /// An element was removed, its content kept in place
    TagRemoved {
        timestamp: DateTime<Utc>,
        revision: u64,
        passage_id: PassageId,
        tag_id: TagId,
        #[serde(default)]
        recursive: bool,
    },

    CharacterAdded {
        timestamp: DateTime<Utc>,
        revision: u64,
        character: Character,
    },

    /// Full replacement of a character's fields
    CharacterUpdated {
        timestamp: DateTime<Utc>,
        revision: u64,
        character: Character,
    },

    /// Removal also drops every relationship touching the character
    CharacterRemoved {
        timestamp: DateTime<Utc>,
        revision: u64,
        character_id: CharacterId,
    },

    RelationAdded {
        timestamp: DateTime<Utc>,
        revision: u64,
        relationship: Relationship,
    },

    RelationRemoved {
        timestamp: DateTime<Utc>,
        revision: u64,
        relationship_id: RelationshipId,
    },
}

impl DocumentEvent {
    pub fn revision(&self) -> u64 {
        match self {
            DocumentEvent::Loaded { revision, .. }
            | DocumentEvent::TagAdded { revision, .. }
            | DocumentEvent::TagRemoved { revision, .. }
            | DocumentEvent::CharacterAdded { revision, .. }
            | DocumentEvent::CharacterUpdated { revision, .. }
            | DocumentEvent::CharacterRemoved { revision, .. }
            | DocumentEvent::RelationAdded { revision, .. }
            | DocumentEvent::RelationRemoved { revision, .. } => *revision,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DocumentEvent::Loaded { timestamp, .. }
            | DocumentEvent::TagAdded { timestamp, .. }
            | DocumentEvent::TagRemoved { timestamp, .. }
            | DocumentEvent::CharacterAdded { timestamp, .. }
            | DocumentEvent::CharacterUpdated { timestamp, .. }
            | DocumentEvent::CharacterRemoved { timestamp, .. }
            | DocumentEvent::RelationAdded { timestamp, .. }
            | DocumentEvent::RelationRemoved { timestamp, .. } => *timestamp,
        }
    }

    /// Serialized name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            DocumentEvent::Loaded { .. } => "loaded",
            DocumentEvent::TagAdded { .. } => "tagAdded",
            DocumentEvent::TagRemoved { .. } => "tagRemoved",
            DocumentEvent::CharacterAdded { .. } => "characterAdded",
            DocumentEvent::CharacterUpdated { .. } => "characterUpdated",
            DocumentEvent::CharacterRemoved { .. } => "characterRemoved",
            DocumentEvent::RelationAdded { .. } => "relationAdded",
            DocumentEvent::RelationRemoved { .. } => "relationRemoved",
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, DocumentEvent::Loaded { .. })
    }

    /// One-line summary for history listings
    pub fn describe(&self) -> String {
        match self {
            DocumentEvent::Loaded { snapshot, .. } => format!(
                "loaded {} passages, {} characters",
                snapshot.passages.len(),
                snapshot.characters.len()
            ),
            DocumentEvent::TagAdded {
                passage_id,
                tag_type,
                range,
                ..
            } => format!("<{}> {}..{} in {}", tag_type, range.start, range.end, passage_id),
            DocumentEvent::TagRemoved {
                tag_id, recursive, ..
            } => {
                if *recursive {
                    format!("removed {} and its descendants", tag_id)
                } else {
                    format!("removed {}", tag_id)
                }
            }
            DocumentEvent::CharacterAdded { character, .. } => {
                format!("added {} ({})", character.name, character.external_key)
            }
            DocumentEvent::CharacterUpdated { character, .. } => {
                format!("updated {} ({})", character.name, character.external_key)
            }
            DocumentEvent::CharacterRemoved { character_id, .. } => {
                format!("removed {}", character_id)
            }
            DocumentEvent::RelationAdded { relationship, .. } => format!(
                "{} {} {}",
                relationship.from, relationship.relation_type, relationship.to
            ),
            DocumentEvent::RelationRemoved {
                relationship_id, ..
            } => format!("removed {}", relationship_id),
        }
    }
}

/// Immutable, cheaply clonable sequence of events
#[derive(Debug, Clone)]
pub struct EventLog {
    events: Arc<[DocumentEvent]>,
    len: usize,
}

/// Revision following `revision`, or `InvalidEventLog` at the end of the range
pub(crate) fn next_revision(revision: u64) -> DocumentResult<u64> {
    revision
        .checked_add(1)
        .ok_or_else(|| DocumentError::invalid_log(format!("no revision after {}", revision)))
}

impl EventLog {
    /// Start a log from its `Loaded` event
    pub fn new(loaded: DocumentEvent) -> DocumentResult<Self> {
        Self::from_events(vec![loaded])
    }

    /// Check the log invariants and wrap the events
    pub fn from_events(events: Vec<DocumentEvent>) -> DocumentResult<Self> {
        let first = events
            .first()
            .ok_or_else(|| DocumentError::invalid_log("log is empty"))?;
        if !first.is_loaded() {
            return Err(DocumentError::invalid_log(format!(
                "first event is {}, expected loaded",
                first.kind()
            )));
        }

        let baseline = first.revision();
        for (i, event) in events.iter().enumerate().skip(1) {
            if event.is_loaded() {
                return Err(DocumentError::invalid_log(format!(
                    "loaded event at position {}",
                    i
                )));
            }
            let expected = baseline.checked_add(i as u64).ok_or_else(|| {
                DocumentError::invalid_log(format!("event {} overflows the revision range", i))
            })?;
            if event.revision() != expected {
                return Err(DocumentError::invalid_log(format!(
                    "event {} has revision {}, expected {}",
                    i,
                    event.revision(),
                    expected
                )));
            }
        }

        let len = events.len();
        Ok(Self {
            events: events.into(),
            len,
        })
    }

    pub fn as_slice(&self) -> &[DocumentEvent] {
        &self.events[..self.len]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DocumentEvent> {
        self.as_slice().iter()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Revision of the `Loaded` event
    pub fn baseline(&self) -> u64 {
        self.as_slice().first().map_or(0, DocumentEvent::revision)
    }

    pub fn last_revision(&self) -> u64 {
        self.baseline()
            .saturating_add((self.len as u64).saturating_sub(1))
    }

    pub fn last(&self) -> Option<&DocumentEvent> {
        self.as_slice().last()
    }

    pub fn event_at(&self, revision: u64) -> Option<&DocumentEvent> {
        let i = revision.checked_sub(self.baseline())?;
        self.as_slice().get(usize::try_from(i).ok()?)
    }

    /// New log with `event` appended. The caller guarantees its revision.
    pub(crate) fn appended(&self, event: DocumentEvent) -> Self {
        let mut events = Vec::with_capacity(self.len + 1);
        events.extend_from_slice(self.as_slice());
        events.push(event);
        let len = events.len();
        Self {
            events: events.into(),
            len,
        }
    }

    /// View of the prefix ending at `revision`
    pub fn truncated(&self, revision: u64) -> Option<Self> {
        if revision < self.baseline() || revision > self.last_revision() {
            return None;
        }
        Some(Self {
            events: Arc::clone(&self.events),
            len: (revision - self.baseline()) as usize + 1,
        })
    }

    /// True when `other` holds this log's events followed by zero or more
    /// further events
    pub fn is_prefix_of(&self, other: &EventLog) -> bool {
        if other.len < self.len {
            return false;
        }
        if Arc::ptr_eq(&self.events, &other.events) {
            return true;
        }
        self.as_slice() == &other.as_slice()[..self.len]
    }

    pub fn to_json(&self) -> DocumentResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> DocumentResult<Self> {
        let events: Vec<DocumentEvent> = serde_json::from_str(json)?;
        Self::from_events(events)
    }
}

impl PartialEq for EventLog {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a DocumentEvent;
    type IntoIter = std::slice::Iter<'a, DocumentEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for EventLog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.as_slice())
    }
}

impl<'de> Deserialize<'de> for EventLog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let events = Vec::<DocumentEvent>::deserialize(deserializer)?;
        EventLog::from_events(events).map_err(serde::de::Error::custom)
    }
}
