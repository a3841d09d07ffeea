use crate::ast::{Element, MarkupNode};

/// Visitor pattern for traversing markup trees immutably
///
/// Default implementations walk the entire tree in document order.
/// Override specific visit_* methods to act on nodes; call the matching
/// `walk_*` function to keep descending.
pub trait Visitor: Sized {
    fn visit_node(&mut self, node: &MarkupNode) {
        walk_node(self, node);
    }

    fn visit_element(&mut self, element: &Element) {
        walk_element(self, element);
    }

    fn visit_text(&mut self, _content: &str) {
        // Leaf node, no children to walk
    }
}

pub fn walk_node<V: Visitor>(visitor: &mut V, node: &MarkupNode) {
    match node {
        MarkupNode::Text { content } => visitor.visit_text(content),
        MarkupNode::Element(element) => visitor.visit_element(element),
    }
}

pub fn walk_element<V: Visitor>(visitor: &mut V, element: &Element) {
    for child in &element.children {
        visitor.visit_node(child);
    }
}
