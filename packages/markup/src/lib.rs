//! Markup trees for literary documents.
//!
//! Reading TEI-style XML into passages, character-offset addressing over
//! mixed content, and the structural edits (wrap, unwrap) the editor
//! builds its events from.

pub mod ast;
pub mod error;
pub mod id_generator;
pub mod mutator;
pub mod offset_index;
pub mod options;
pub mod parser;
pub mod serializer;
pub mod tokenizer;
pub mod visitor;

pub use ast::{Attributes, Element, MarkupNode, TagId};
pub use error::{MarkupError, MarkupResult, ParseError, ParseResult};
pub use id_generator::{get_document_seed, IDGenerator};
pub use mutator::{merge_adjacent_text, unwrap, wrap_range};
pub use offset_index::{ElementSpan, OffsetIndex, TextRange};
pub use options::LoadOptions;
pub use parser::{
    parse_document, parse_document_with, CastMember, ParsedDocument, ParsedPassage,
    ParsedRelation, Parser,
};
pub use serializer::{serialize, Serializer, TeiExport};
pub use tokenizer::{tokenize, Token};
pub use visitor::{walk_element, walk_node, Visitor};

/// True for element names conventionally used to mark speech
pub fn is_speech_tag(name: &str) -> bool {
    LoadOptions::default().is_speech_tag(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_wrap_serialize() {
        let doc = parse_document("note", "<p>She said hello.</p>").unwrap();
        let root = &doc.passages[0].root;

        let wrapped = wrap_range(
            root,
            TextRange::new(9, 14),
            TagId::new("q1"),
            "said",
            &Attributes::new(),
        )
        .unwrap();

        assert_eq!(serialize(&wrapped), "<p>She said <said>hello</said>.</p>");
        assert!(is_speech_tag("said"));
        assert!(!is_speech_tag("hi"));
    }
}
