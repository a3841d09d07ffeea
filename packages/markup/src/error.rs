use crate::ast::TagId;
use thiserror::Error;

pub type MarkupResult<T> = Result<T, MarkupError>;
pub type ParseResult<T> = Result<T, ParseError>;

/// Failures of offset lookups and structural tree edits
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarkupError {
    #[error("Range {start}..{end} is out of bounds for text of length {len}")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },

    #[error("Range {start}..{end} is empty")]
    EmptyRange { start: usize, end: usize },

    #[error("Range {start}..{end} would split existing <{name}> ({tag_id})")]
    SplitsExistingTag {
        tag_id: TagId,
        name: String,
        start: usize,
        end: usize,
    },

    #[error("Tag not found: {0}")]
    TagNotFound(TagId),

    #[error("Tag id already in use: {0}")]
    DuplicateTagId(TagId),

    #[error("Duplicate attribute: {name}")]
    DuplicateAttribute { name: String },

    #[error("Passage root must be an element")]
    RootNotElement,
}

/// Failures while reading markup source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unrecognized markup at byte {pos}")]
    LexerError { pos: usize },

    #[error("Malformed tag at byte {pos}: {message}")]
    MalformedTag { pos: usize, message: String },

    #[error("Mismatched closing tag at byte {pos}: expected </{expected}>, found </{found}>")]
    MismatchedClose {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Unclosed element <{name}> opened at byte {pos}")]
    UnclosedElement { pos: usize, name: String },

    #[error("Unknown entity reference &{entity}; at byte {pos}")]
    UnknownEntity { pos: usize, entity: String },

    #[error("Duplicate attribute {name} at byte {pos}")]
    DuplicateAttribute { pos: usize, name: String },
}

impl ParseError {
    pub fn malformed_tag(pos: usize, message: impl Into<String>) -> Self {
        Self::MalformedTag {
            pos,
            message: message.into(),
        }
    }

    pub fn lexer_error(pos: usize) -> Self {
        Self::LexerError { pos }
    }
}
