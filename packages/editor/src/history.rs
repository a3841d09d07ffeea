//! # History
//!
//! Undo, redo and time-travel over the event log.
//!
//! ## Design
//!
//! - Nothing is inverted: going back means replaying a shorter prefix of the
//!   log through the reducer
//! - Redo needs the longer log the caller undid from; a value only knows its
//!   own past
//! - A new edit after undo starts a new branch; the old future is unreachable
//!   from it
//!
//! ## Example
//!
//! ```rust,ignore
//! let timeline = Timeline::new(DocumentValue::load_markup("a", source, &options)?);
//! let timeline = timeline.apply(&request)?;
//!
//! let timeline = timeline.undo()?;
//! let timeline = timeline.redo()?;
//! ```

use crate::document::DocumentValue;
use crate::errors::{DocumentError, DocumentResult};
use crate::events::EventLog;
use crate::reducer::rebuild;
use crate::requests::EditRequest;

/// Step back one revision. At the baseline the value is returned unchanged.
pub fn undo(doc: &DocumentValue) -> DocumentResult<DocumentValue> {
    if doc.revision() <= doc.baseline() {
        return Ok(doc.clone());
    }
    restore(doc.events(), doc.revision() - 1)
}

/// Step forward one revision along `longest`.
///
/// Returns `doc` unchanged when `longest` has nothing past it or has
/// diverged from it.
pub fn redo(doc: &DocumentValue, longest: &EventLog) -> DocumentResult<DocumentValue> {
    if longest.len() <= doc.events().len() || !doc.events().is_prefix_of(longest) {
        return Ok(doc.clone());
    }
    restore(longest, doc.revision() + 1)
}

/// Jump to any revision of `available`, which must extend `doc`'s own log
pub fn time_travel(
    doc: &DocumentValue,
    available: &EventLog,
    target: u64,
) -> DocumentResult<DocumentValue> {
    if !doc.events().is_prefix_of(available) {
        return Err(doc.out_of_range(target));
    }
    if target == doc.revision() {
        return Ok(doc.clone());
    }
    restore(available, target)
}

/// Value at `revision`, replayed from a prefix of `log`
fn restore(log: &EventLog, revision: u64) -> DocumentResult<DocumentValue> {
    let prefix = log
        .truncated(revision)
        .ok_or(DocumentError::RevisionOutOfRange {
            revision,
            baseline: log.baseline(),
            latest: log.last_revision(),
        })?;
    let state = rebuild(prefix.as_slice())?;
    Ok(DocumentValue::from_parts(state, prefix))
}

/// The current value together with the longest log it can redo into
#[derive(Debug, Clone)]
pub struct Timeline {
    current: DocumentValue,
    longest: EventLog,
}

impl Timeline {
    pub fn new(doc: DocumentValue) -> Self {
        Self {
            longest: doc.events().clone(),
            current: doc,
        }
    }

    pub fn current(&self) -> &DocumentValue {
        &self.current
    }

    /// Longest log seen on the current branch
    pub fn history(&self) -> &EventLog {
        &self.longest
    }

    /// Apply an edit; any undone future is dropped
    pub fn apply(&self, request: &EditRequest) -> DocumentResult<Self> {
        Ok(Self::new(self.current.apply(request)?))
    }

    pub fn undo(&self) -> DocumentResult<Self> {
        Ok(Self {
            current: undo(&self.current)?,
            longest: self.longest.clone(),
        })
    }

    pub fn redo(&self) -> DocumentResult<Self> {
        Ok(Self {
            current: redo(&self.current, &self.longest)?,
            longest: self.longest.clone(),
        })
    }

    pub fn travel_to(&self, revision: u64) -> DocumentResult<Self> {
        Ok(Self {
            current: time_travel(&self.current, &self.longest, revision)?,
            longest: self.longest.clone(),
        })
    }

    pub fn can_undo(&self) -> bool {
        self.undo_levels() > 0
    }

    pub fn can_redo(&self) -> bool {
        self.redo_levels() > 0
    }

    pub fn undo_levels(&self) -> usize {
        (self.current.revision() - self.current.baseline()) as usize
    }

    pub fn redo_levels(&self) -> usize {
        self.longest.len() - self.current.events().len()
    }

    /// Summary of the event the next undo reverts
    pub fn undo_description(&self) -> Option<String> {
        if !self.can_undo() {
            return None;
        }
        self.current.events().last().map(|event| event.describe())
    }

    /// Summary of the event the next redo reapplies
    pub fn redo_description(&self) -> Option<String> {
        self.longest
            .event_at(self.current.revision().checked_add(1)?)
            .map(|event| event.describe())
    }
}

impl From<DocumentValue> for Timeline {
    fn from(doc: DocumentValue) -> Self {
        Self::new(doc)
    }
}
