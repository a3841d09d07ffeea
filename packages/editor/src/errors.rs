//! Error types for the editor

use crate::ids::{CharacterId, PassageId, RelationshipId};
use scriptorium_markup::{MarkupError, ParseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type DocumentResult<T> = Result<T, DocumentError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    #[error(transparent)]
    Markup(#[from] MarkupError),

    #[error("Passage not found: {0}")]
    PassageNotFound(PassageId),

    #[error("Character not found: {0}")]
    CharacterNotFound(CharacterId),

    #[error("Character key already in use: {0}")]
    DuplicateCharacterKey(String),

    #[error("Relationship not found: {0}")]
    RelationshipNotFound(RelationshipId),

    #[error("Selection was made at revision {selection}, document is at {current}")]
    StaleSelection { selection: u64, current: u64 },

    #[error("Revision {revision} is outside the available history {baseline}..={latest}")]
    RevisionOutOfRange {
        revision: u64,
        baseline: u64,
        latest: u64,
    },

    #[error("Invalid event log: {0}")]
    InvalidEventLog(String),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for DocumentError {
    fn from(e: serde_json::Error) -> Self {
        DocumentError::Serialization(e.to_string())
    }
}

/// Fieldless mirror of [`DocumentError`] for callers that map failures to
/// their own messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    RangeOutOfBounds,
    EmptyRange,
    SplitsExistingTag,
    TagNotFound,
    PassageNotFound,
    CharacterNotFound,
    DuplicateCharacterKey,
    StaleSelection,
    RevisionOutOfRange,
    RelationshipNotFound,
    DuplicateAttribute,
    DuplicateTagId,
    InvalidEventLog,
    Parse,
    Serialization,
}

impl DocumentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocumentError::Markup(e) => match e {
                MarkupError::RangeOutOfBounds { .. } => ErrorKind::RangeOutOfBounds,
                MarkupError::EmptyRange { .. } => ErrorKind::EmptyRange,
                MarkupError::SplitsExistingTag { .. } => ErrorKind::SplitsExistingTag,
                MarkupError::TagNotFound(_) => ErrorKind::TagNotFound,
                MarkupError::DuplicateTagId(_) => ErrorKind::DuplicateTagId,
                MarkupError::DuplicateAttribute { .. } => ErrorKind::DuplicateAttribute,
                // Only reachable from a malformed snapshot
                MarkupError::RootNotElement => ErrorKind::InvalidEventLog,
            },
            DocumentError::PassageNotFound(_) => ErrorKind::PassageNotFound,
            DocumentError::CharacterNotFound(_) => ErrorKind::CharacterNotFound,
            DocumentError::DuplicateCharacterKey(_) => ErrorKind::DuplicateCharacterKey,
            DocumentError::RelationshipNotFound(_) => ErrorKind::RelationshipNotFound,
            DocumentError::StaleSelection { .. } => ErrorKind::StaleSelection,
            DocumentError::RevisionOutOfRange { .. } => ErrorKind::RevisionOutOfRange,
            DocumentError::InvalidEventLog(_) => ErrorKind::InvalidEventLog,
            DocumentError::Parse(_) => ErrorKind::Parse,
            DocumentError::Serialization(_) => ErrorKind::Serialization,
        }
    }

    pub(crate) fn invalid_log(message: impl Into<String>) -> Self {
        DocumentError::InvalidEventLog(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptorium_markup::TagId;

    #[test]
    fn test_markup_errors_keep_their_kind() {
        let err: DocumentError = MarkupError::TagNotFound(TagId::new("t1")).into();
        assert_eq!(err.kind(), ErrorKind::TagNotFound);
        assert_eq!(err.to_string(), "Tag not found: t1");
    }

    #[test]
    fn test_error_kind_serializes_camel_case() {
        let json = serde_json::to_string(&ErrorKind::StaleSelection).unwrap();
        assert_eq!(json, "\"staleSelection\"");
    }
}
