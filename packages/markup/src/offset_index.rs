//! # Offset Index
//!
//! Maps character offsets of a passage onto the text leaves and elements of
//! its markup tree.
//!
//! Offsets count chars (Unicode scalar values) of the pre-order concatenation
//! of every text leaf under the root. The index is derived from the tree it
//! is built from and is never cached across calls.

use crate::ast::{split_at_char, MarkupNode, TagId};
use crate::error::{MarkupError, MarkupResult};
use serde::{Deserialize, Serialize};

/// Half-open char range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// `other` lies entirely inside `self`
    pub fn contains(&self, other: &TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// The two ranges overlap without either containing the other
    pub fn crosses(&self, other: &TextRange) -> bool {
        (self.start < other.start && other.start < self.end && self.end < other.end)
            || (other.start < self.start && self.start < other.end && other.end < self.end)
    }
}

impl From<std::ops::Range<usize>> for TextRange {
    fn from(range: std::ops::Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// Position of one text leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafSpan {
    /// Child indices from the root down to the leaf
    pub path: Vec<usize>,
    pub range: TextRange,
}

/// One leaf touched by a range lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafSlice<'a> {
    pub path: &'a [usize],
    /// Absolute range of the whole leaf
    pub leaf: TextRange,
    /// Touched sub-range, relative to the leaf start
    pub local: TextRange,
}

/// Position of one element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpan {
    pub id: TagId,
    pub name: String,
    pub path: Vec<usize>,
    /// 0 for the root
    pub depth: usize,
    pub range: TextRange,
}

#[derive(Debug, Clone)]
pub struct OffsetIndex {
    content: String,
    len: usize,
    leaves: Vec<LeafSpan>,
    elements: Vec<ElementSpan>,
}

impl OffsetIndex {
    /// Build the index in a single pre-order walk
    pub fn build(root: &MarkupNode) -> Self {
        let mut index = Self {
            content: String::new(),
            len: 0,
            leaves: Vec::new(),
            elements: Vec::new(),
        };
        let mut path = Vec::new();
        index.walk(root, &mut path);
        index
    }

    fn walk(&mut self, node: &MarkupNode, path: &mut Vec<usize>) {
        match node {
            MarkupNode::Text { content } => {
                let start = self.len;
                self.len += content.chars().count();
                self.content.push_str(content);
                self.leaves.push(LeafSpan {
                    path: path.clone(),
                    range: TextRange::new(start, self.len),
                });
            }
            MarkupNode::Element(el) => {
                let slot = self.elements.len();
                self.elements.push(ElementSpan {
                    id: el.id.clone(),
                    name: el.name.clone(),
                    path: path.clone(),
                    depth: path.len(),
                    range: TextRange::new(self.len, self.len),
                });
                for (i, child) in el.children.iter().enumerate() {
                    path.push(i);
                    self.walk(child, path);
                    path.pop();
                }
                self.elements[slot].range.end = self.len;
            }
        }
    }

    /// Full concatenated text
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Text length in chars
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn leaves(&self) -> &[LeafSpan] {
        &self.leaves
    }

    /// Every element in pre-order, the root first
    pub fn elements(&self) -> &[ElementSpan] {
        &self.elements
    }

    pub fn element(&self, id: &TagId) -> Option<&ElementSpan> {
        self.elements.iter().find(|span| &span.id == id)
    }

    /// Derived range of an element
    pub fn element_range(&self, id: &TagId) -> Option<TextRange> {
        self.element(id).map(|span| span.range)
    }

    pub fn check_range(&self, range: TextRange) -> MarkupResult<()> {
        if range.start > range.end || range.end > self.len {
            return Err(MarkupError::RangeOutOfBounds {
                start: range.start,
                end: range.end,
                len: self.len,
            });
        }
        Ok(())
    }

    /// Text leaves overlapping `range`, in document order
    pub fn lookup(&self, range: TextRange) -> MarkupResult<Vec<LeafSlice<'_>>> {
        self.check_range(range)?;
        if range.is_empty() {
            return Ok(Vec::new());
        }

        let first = self.leaves.partition_point(|leaf| leaf.range.end <= range.start);
        let slices = self.leaves[first..]
            .iter()
            .take_while(|leaf| leaf.range.start < range.end)
            .map(|leaf| {
                let start = range.start.max(leaf.range.start) - leaf.range.start;
                let end = range.end.min(leaf.range.end) - leaf.range.start;
                LeafSlice {
                    path: &leaf.path,
                    leaf: leaf.range,
                    local: TextRange::new(start, end),
                }
            })
            .collect();
        Ok(slices)
    }

    /// Text covered by `range`
    pub fn slice(&self, range: TextRange) -> MarkupResult<&str> {
        self.check_range(range)?;
        let (_, tail) = split_at_char(&self.content, range.start);
        let (text, _) = split_at_char(tail, range.len());
        Ok(text)
    }

    /// Non-root elements whose range crosses `range`
    pub fn crossing(&self, range: TextRange) -> impl Iterator<Item = &ElementSpan> {
        self.elements
            .iter()
            .filter(move |span| span.depth > 0 && span.range.crosses(&range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Element;

    fn tree() -> MarkupNode {
        // <p>He said <said>"Go <hi>now</hi>"</said>.</p>
        Element::new(TagId::new("p"), "p")
            .with_child(MarkupNode::text("He said "))
            .with_child(
                Element::new(TagId::new("said"), "said")
                    .with_child(MarkupNode::text("\"Go "))
                    .with_child(
                        Element::new(TagId::new("hi"), "hi")
                            .with_child(MarkupNode::text("now"))
                            .into(),
                    )
                    .with_child(MarkupNode::text("\""))
                    .into(),
            )
            .with_child(MarkupNode::text("."))
            .into()
    }

    #[test]
    fn test_build_content_and_ranges() {
        let index = OffsetIndex::build(&tree());
        assert_eq!(index.content(), "He said \"Go now\".");
        assert_eq!(index.len(), 17);
        assert_eq!(index.leaves().len(), 5);

        let said = index.element(&TagId::new("said")).unwrap();
        assert_eq!(said.range, TextRange::new(8, 16));
        assert_eq!(said.path, vec![1]);
        assert_eq!(said.depth, 1);

        let hi = index.element(&TagId::new("hi")).unwrap();
        assert_eq!(hi.range, TextRange::new(12, 15));
        assert_eq!(hi.path, vec![1, 1]);
    }

    #[test]
    fn test_lookup_spanning_leaves() {
        let index = OffsetIndex::build(&tree());
        let slices = index.lookup(TextRange::new(3, 14)).unwrap();

        assert_eq!(slices.len(), 3);
        assert_eq!(slices[0].path, &[0]);
        assert_eq!(slices[0].local, TextRange::new(3, 8));
        assert_eq!(slices[1].path, &[1, 0]);
        assert_eq!(slices[1].local, TextRange::new(0, 4));
        assert_eq!(slices[2].path, &[1, 1, 0]);
        assert_eq!(slices[2].local, TextRange::new(0, 2));
    }

    #[test]
    fn test_lookup_at_leaf_boundary_skips_previous_leaf() {
        let index = OffsetIndex::build(&tree());
        let slices = index.lookup(TextRange::new(8, 9)).unwrap();
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].path, &[1, 0]);
    }

    #[test]
    fn test_lookup_out_of_bounds() {
        let index = OffsetIndex::build(&tree());
        assert_eq!(
            index.lookup(TextRange::new(5, 18)),
            Err(MarkupError::RangeOutOfBounds {
                start: 5,
                end: 18,
                len: 17
            })
        );
        assert!(index.lookup(TextRange::new(6, 5)).is_err());
        assert!(index.lookup(TextRange::new(4, 4)).unwrap().is_empty());
    }

    #[test]
    fn test_slice_counts_chars() {
        let root: MarkupNode = Element::new(TagId::new("p"), "p")
            .with_child(MarkupNode::text("naïve café"))
            .into();
        let index = OffsetIndex::build(&root);
        assert_eq!(index.len(), 10);
        assert_eq!(index.slice(TextRange::new(6, 10)).unwrap(), "café");
    }

    #[test]
    fn test_crossing() {
        let index = OffsetIndex::build(&tree());
        let crossing: Vec<_> = index
            .crossing(TextRange::new(0, 10))
            .map(|span| span.id.as_str())
            .collect();
        assert_eq!(crossing, vec!["said"]);
        assert_eq!(index.crossing(TextRange::new(8, 16)).count(), 0);
        assert_eq!(index.crossing(TextRange::new(0, 17)).count(), 0);
    }
}
