//! Integration tests for loading and editing markup trees

use proptest::prelude::*;
use scriptorium_markup::{
    parse_document, serialize, unwrap, wrap_range, Attributes, MarkupError, MarkupNode,
    OffsetIndex, TagId, TextRange,
};

const PASSAGE: &str = r##"<p>It is a truth <hi rend="i">universally</hi> acknowledged, that a <said who="#narrator">single man</said> must be in want of a wife.</p>"##;

fn passage() -> MarkupNode {
    parse_document("pride", PASSAGE).unwrap().passages.remove(0).root
}

#[test]
fn test_wrap_around_existing_element() {
    let root = passage();
    let text = root.text_content();
    let start = text.find("truth").unwrap();
    let end = text.find(" acknowledged").unwrap();

    let wrapped = wrap_range(
        &root,
        TextRange::new(start, end),
        TagId::new("seg-1"),
        "seg",
        &Attributes::new(),
    )
    .unwrap();

    assert_eq!(wrapped.text_content(), text);
    assert!(serialize(&wrapped)
        .contains(r#"<seg>truth <hi rend="i">universally</hi></seg>"#));

    let index = OffsetIndex::build(&wrapped);
    let seg = index.element(&TagId::new("seg-1")).unwrap();
    assert_eq!(seg.range, TextRange::new(start, end));
}

#[test]
fn test_wrap_rejects_crossing_range() {
    let root = passage();
    let text = root.text_content();
    let start = text.find("that").unwrap();
    let end = text.find(" man").unwrap();

    let result = wrap_range(
        &root,
        TextRange::new(start, end),
        TagId::new("bad"),
        "seg",
        &Attributes::new(),
    );
    assert!(matches!(
        result,
        Err(MarkupError::SplitsExistingTag { ref name, .. }) if name == "said"
    ));
}

#[test]
fn test_wrap_then_unwrap_restores_tree() {
    let root = passage();
    let wrapped = wrap_range(
        &root,
        TextRange::new(3, 13),
        TagId::new("seg-1"),
        "seg",
        &Attributes::new(),
    )
    .unwrap();

    let restored = unwrap(&wrapped, &TagId::new("seg-1"), false).unwrap();
    assert_eq!(restored, root);
}

#[test]
fn test_recursive_unwrap_flattens_nested_tags() {
    let root = passage();
    let len = root.char_len();
    let outer = wrap_range(
        &root,
        TextRange::new(0, len),
        TagId::new("outer"),
        "seg",
        &Attributes::new(),
    )
    .unwrap();

    let flat = unwrap(&outer, &TagId::new("outer"), true).unwrap();
    assert_eq!(flat.text_content(), root.text_content());
    assert_eq!(flat.element_ids().len(), 1);
}

fn plain_passage() -> impl Strategy<Value = String> {
    "[a-zé ]{1,40}"
}

proptest! {
    #[test]
    fn prop_wrap_preserves_text(text in plain_passage(), a in 0usize..48, b in 0usize..48) {
        let source = format!("<p>{}</p>", text);
        let root = parse_document("prop", &source).unwrap().passages.remove(0).root;
        let len = root.char_len();
        let (start, end) = if a <= b { (a, b) } else { (b, a) };

        match wrap_range(&root, TextRange::new(start, end), TagId::new("w"), "seg", &Attributes::new()) {
            Ok(wrapped) => {
                prop_assert!(start < end && end <= len);
                prop_assert_eq!(wrapped.text_content(), root.text_content());
                let restored = unwrap(&wrapped, &TagId::new("w"), false).unwrap();
                prop_assert_eq!(restored, root);
            }
            Err(MarkupError::RangeOutOfBounds { .. }) => prop_assert!(end > len),
            Err(MarkupError::EmptyRange { .. }) => prop_assert_eq!(start, end),
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }

    #[test]
    fn prop_nested_wraps_never_cross(text in "[a-z]{10,30}", cuts in proptest::collection::vec(0usize..30, 4)) {
        let source = format!("<p>{}</p>", text);
        let mut root = parse_document("prop", &source).unwrap().passages.remove(0).root;
        let original = root.text_content();

        for (i, pair) in cuts.chunks(2).enumerate() {
            let (start, end) = (pair[0].min(pair[1]), pair[0].max(pair[1]));
            if let Ok(next) = wrap_range(&root, TextRange::new(start, end), TagId::new(format!("w{}", i)), "seg", &Attributes::new()) {
                root = next;
            }
        }

        prop_assert_eq!(root.text_content(), original);
        let index = OffsetIndex::build(&root);
        for x in index.elements() {
            for y in index.elements() {
                prop_assert!(!x.range.crosses(&y.range));
            }
        }
    }
}
