//! # Scriptorium Editor
//!
//! Immutable, event-sourced document model for annotated literary texts.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ markup: source → passages, cast, relations  │
//! │  - Offset index over mixed content          │
//! │  - Wrap / unwrap tree edits                 │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: DocumentValue = state + event log   │
//! │  - Requests become events                   │
//! │  - Reducer derives each new state           │
//! │  - History replays prefixes of the log      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ embedding: rendering, selection, validation │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The log is the source of truth**: state is the fold of its events
//! 2. **Values, not handles**: every edit returns a new document value
//! 3. **Offsets are chars**: ranges index the concatenated passage text
//! 4. **Explicit staleness**: selections carry the revision they were made at
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scriptorium_editor::{DocumentValue, Selection, history};
//!
//! let doc = DocumentValue::load_markup("pride.xml", &source, &LoadOptions::default())?;
//! let passage = doc.passages()[0].id.clone();
//!
//! let selection = Selection::new(passage, 6..11, doc.revision());
//! let tagged = doc.add_tag(&selection, "said", Attributes::new().with("who", "#eliza"))?;
//!
//! let before = history::undo(&tagged)?;
//! let again = history::redo(&before, tagged.events())?;
//! ```

mod document;
mod entities;
mod errors;
mod events;
pub mod history;
mod ids;
pub mod reducer;
mod requests;
mod state;
mod validation;

pub use document::DocumentValue;
pub use entities::{Character, Relationship};
pub use errors::{DocumentError, DocumentResult, ErrorKind};
pub use events::{DocumentEvent, EventLog};
pub use history::{redo, time_travel, undo, Timeline};
pub use ids::{CharacterId, PassageId, RelationshipId};
pub use reducer::{rebuild, reduce};
pub use requests::{EditRequest, Selection};
pub use state::{DocumentState, Passage, Snapshot, Tag};
pub use validation::{ChangedElement, MarkupValidator, ValidationView};

// Re-export markup types used throughout the public API
pub use scriptorium_markup::{Attributes, LoadOptions, MarkupNode, TagId, TextRange};
