//! # Tree Mutator
//!
//! Structural edits addressed by character offset. Every function takes the
//! tree by reference and returns a freshly built tree; the input is never
//! modified.
//!
//! ## Wrap
//! - Fails on empty or out-of-bounds ranges
//! - Fails if an existing element would have one boundary inside the range
//!   and the other outside it
//! - Splits text leaves at the range boundaries and moves the covered sibling
//!   run under the new element
//!
//! ## Unwrap
//! - Splices an element's children into its parent at the same position
//! - Merges the text siblings left adjacent by the splice

use crate::ast::{split_at_char, Attributes, Element, MarkupNode, TagId};
use crate::error::{MarkupError, MarkupResult};
use crate::offset_index::{LeafSlice, OffsetIndex, TextRange};
use tracing::debug;

/// Wrap the text covered by `range` in a new element
pub fn wrap_range(
    root: &MarkupNode,
    range: TextRange,
    id: TagId,
    name: &str,
    attributes: &Attributes,
) -> MarkupResult<MarkupNode> {
    if root.as_element().is_none() {
        return Err(MarkupError::RootNotElement);
    }

    let index = OffsetIndex::build(root);
    index.check_range(range)?;
    if range.is_empty() {
        return Err(MarkupError::EmptyRange {
            start: range.start,
            end: range.end,
        });
    }
    if index.element(&id).is_some() {
        return Err(MarkupError::DuplicateTagId(id));
    }
    if let Some(span) = index.crossing(range).next() {
        return Err(MarkupError::SplitsExistingTag {
            tag_id: span.id.clone(),
            name: span.name.clone(),
            start: span.range.start,
            end: span.range.end,
        });
    }

    // Deepest element strictly containing the range. An element covering
    // exactly the range is wrapped from its parent instead.
    let container = index
        .elements()
        .iter()
        .filter(|span| span.depth == 0 || (span.range.contains(&range) && span.range != range))
        .max_by_key(|span| span.depth)
        .ok_or(MarkupError::RootNotElement)?;

    debug!(
        container = %container.id,
        start = range.start,
        end = range.end,
        name,
        "Wrapping range"
    );

    // Leaves cut by the range boundaries are direct children of the container
    let cuts = boundary_cuts(&index.lookup(range)?);

    let wrapper = Element::new(id, name).with_attributes(attributes.clone());
    let base = container.range.start;
    rewrite_at(root, &container.path, &mut |el: &Element| {
        let children = wrap_children(&el.children, base, range, &cuts, wrapper.clone())?;
        Ok(Element {
            children,
            ..el.clone()
        })
    })
}

/// Remove an element, keeping its content in place.
///
/// With `recursive`, every element nested inside it is flattened as well;
/// text is always kept.
pub fn unwrap(root: &MarkupNode, id: &TagId, recursive: bool) -> MarkupResult<MarkupNode> {
    let el = root.as_element().ok_or(MarkupError::RootNotElement)?;
    if &el.id == id {
        // The root is the passage container, not a removable tag
        return Err(MarkupError::TagNotFound(id.clone()));
    }
    match unwrap_in(el, id, recursive) {
        Some(el) => Ok(MarkupNode::Element(el)),
        None => Err(MarkupError::TagNotFound(id.clone())),
    }
}

fn unwrap_in(el: &Element, id: &TagId, recursive: bool) -> Option<Element> {
    if let Some(pos) = el
        .children
        .iter()
        .position(|child| matches!(child, MarkupNode::Element(c) if &c.id == id))
    {
        let target = el.children[pos].as_element()?;
        let spliced: Vec<MarkupNode> = if recursive {
            vec![MarkupNode::text(target.text_content())]
        } else {
            target.children.clone()
        };

        let mut children = Vec::with_capacity(el.children.len() + spliced.len());
        children.extend_from_slice(&el.children[..pos]);
        children.extend(spliced);
        children.extend_from_slice(&el.children[pos + 1..]);

        return Some(Element {
            children: merge_adjacent_text(children),
            ..el.clone()
        });
    }

    el.children.iter().enumerate().find_map(|(i, child)| {
        let child_el = child.as_element()?;
        let replaced = unwrap_in(child_el, id, recursive)?;
        let mut children = el.children.clone();
        children[i] = MarkupNode::Element(replaced);
        Some(Element {
            children,
            ..el.clone()
        })
    })
}

/// Join neighbouring text nodes and drop empty ones
pub fn merge_adjacent_text(children: Vec<MarkupNode>) -> Vec<MarkupNode> {
    let mut merged: Vec<MarkupNode> = Vec::with_capacity(children.len());
    for child in children {
        match child {
            MarkupNode::Text { content } if content.is_empty() => {}
            MarkupNode::Text { content } => {
                if let Some(MarkupNode::Text { content: prev }) = merged.last_mut() {
                    prev.push_str(&content);
                } else {
                    merged.push(MarkupNode::Text { content });
                }
            }
            element => merged.push(element),
        }
    }
    merged
}

/// Rebuild the path from the root down to the element at `path`, replacing
/// that element with the result of `f`
fn rewrite_at(
    node: &MarkupNode,
    path: &[usize],
    f: &mut dyn FnMut(&Element) -> MarkupResult<Element>,
) -> MarkupResult<MarkupNode> {
    let el = node.as_element().ok_or(MarkupError::RootNotElement)?;
    match path.split_first() {
        None => Ok(MarkupNode::Element(f(el)?)),
        Some((&i, rest)) => {
            let child = el.children.get(i).ok_or(MarkupError::RootNotElement)?;
            let mut children = el.children.clone();
            children[i] = rewrite_at(child, rest, f)?;
            Ok(MarkupNode::Element(Element {
                children,
                ..el.clone()
            }))
        }
    }
}

/// `(child index, char offset)` of each range boundary falling strictly
/// inside a text leaf
fn boundary_cuts(slices: &[LeafSlice<'_>]) -> Vec<(usize, usize)> {
    let head = slices
        .first()
        .filter(|slice| slice.local.start > 0)
        .and_then(|slice| Some((*slice.path.last()?, slice.local.start)));
    let tail = slices
        .last()
        .filter(|slice| slice.local.end < slice.leaf.len())
        .and_then(|slice| Some((*slice.path.last()?, slice.local.end)));
    head.into_iter().chain(tail).collect()
}

/// Split text children at `cuts`, then move the children covered by `range`
/// under `wrapper`. `base` is the offset of the first child.
fn wrap_children(
    children: &[MarkupNode],
    base: usize,
    range: TextRange,
    cuts: &[(usize, usize)],
    wrapper: Element,
) -> MarkupResult<Vec<MarkupNode>> {
    let mut pieces: Vec<(MarkupNode, TextRange)> = Vec::with_capacity(children.len() + 2);
    let mut offset = base;

    for (i, child) in children.iter().enumerate() {
        let len = child.char_len();
        let span = TextRange::new(offset, offset + len);
        offset += len;

        match child {
            MarkupNode::Text { content } => {
                let mut rest = content.as_str();
                let mut consumed = 0;
                let mut piece_start = span.start;
                for &(_, cut) in cuts.iter().filter(|(at, _)| *at == i) {
                    let (head, tail) = split_at_char(rest, cut - consumed);
                    pieces.push((
                        MarkupNode::text(head),
                        TextRange::new(piece_start, span.start + cut),
                    ));
                    piece_start = span.start + cut;
                    consumed = cut;
                    rest = tail;
                }
                pieces.push((MarkupNode::text(rest), TextRange::new(piece_start, span.end)));
            }
            MarkupNode::Element(_) => pieces.push((child.clone(), span)),
        }
    }

    let in_run = |span: &TextRange| {
        range.contains(span)
            && (!span.is_empty() || (span.start > range.start && span.start < range.end))
    };

    let first = pieces.iter().position(|(_, span)| in_run(span));
    let last = pieces.iter().rposition(|(_, span)| in_run(span));
    let (first, last) = match (first, last) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(MarkupError::EmptyRange {
                start: range.start,
                end: range.end,
            })
        }
    };

    let mut out = Vec::with_capacity(pieces.len() - (last - first));
    let mut wrapped = Vec::with_capacity(last - first + 1);
    for (i, (node, _)) in pieces.into_iter().enumerate() {
        if i < first || i > last {
            out.push(node);
        } else {
            wrapped.push(node);
            if i == last {
                let run = std::mem::take(&mut wrapped);
                out.push(MarkupNode::Element(wrapper.clone().with_children(run)));
            }
        }
    }
    Ok(out)
}
