use crate::error::{MarkupError, MarkupResult};
use serde::de::{MapAccess, Visitor as SerdeVisitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Stable identifier of an element, independent of its position in the tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(String);

impl TagId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh random id (used for elements created by edits)
    pub fn generate() -> Self {
        Self(format!("tag-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TagId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Ordered attribute mapping with unique keys.
///
/// Insertion order is kept for serialization only: two attribute sets with
/// the same pairs in a different order compare equal.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from pairs, rejecting repeated keys
    pub fn from_pairs<K, V, I>(pairs: I) -> MarkupResult<Self>
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut attributes = Self::new();
        for (key, value) in pairs {
            let key = key.into();
            if attributes.contains_key(&key) {
                return Err(MarkupError::DuplicateAttribute { name: key });
            }
            attributes.entries.push((key, value.into()));
        }
        Ok(attributes)
    }

    /// Builder-style insert (replaces an existing value in place)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a value, returning the previous one
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for Attributes {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl Eq for Attributes {}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AttributesVisitor;

        impl<'de> SerdeVisitor<'de> for AttributesVisitor {
            type Value = Attributes;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of attribute names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Attributes, A::Error> {
                let mut attributes = Attributes::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    if attributes.contains_key(&key) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate attribute `{}`",
                            key
                        )));
                    }
                    attributes.entries.push((key, value));
                }
                Ok(attributes)
            }
        }

        deserializer.deserialize_map(AttributesVisitor)
    }
}

/// Element node: a named container with attributes and mixed-content children
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub id: TagId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(default)]
    pub children: Vec<MarkupNode>,
}

impl Element {
    pub fn new(id: TagId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            attributes: Attributes::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_children(mut self, children: Vec<MarkupNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_child(mut self, child: MarkupNode) -> Self {
        self.children.push(child);
        self
    }

    /// Concatenated text of every descendant text leaf, in document order
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.collect_text(&mut out);
        }
        out
    }

    /// Length of the covered text in chars
    pub fn char_len(&self) -> usize {
        self.children.iter().map(MarkupNode::char_len).sum()
    }

    /// Find this element or a descendant by id
    pub fn find(&self, id: &TagId) -> Option<&Element> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| match child {
            MarkupNode::Element(el) => el.find(id),
            MarkupNode::Text { .. } => None,
        })
    }

    /// True when element children outnumber non-blank text children
    pub fn is_element_dominant(&self) -> bool {
        let (elements, texts) = self.children.iter().fold((0, 0), |(e, t), child| match child {
            MarkupNode::Element(_) => (e + 1, t),
            MarkupNode::Text { content } if content.trim().is_empty() => (e, t),
            MarkupNode::Text { .. } => (e, t + 1),
        });
        elements > texts
    }
}

/// Mixed-content tree node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MarkupNode {
    Text { content: String },
    Element(Element),
}

impl MarkupNode {
    pub fn text(content: impl Into<String>) -> Self {
        MarkupNode::Text {
            content: content.into(),
        }
    }

    pub fn element(element: Element) -> Self {
        MarkupNode::Element(element)
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            MarkupNode::Element(el) => Some(el),
            MarkupNode::Text { .. } => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MarkupNode::Text { content } => Some(content),
            MarkupNode::Element(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, MarkupNode::Text { .. })
    }

    /// Pre-order concatenation of all text leaves
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            MarkupNode::Text { content } => out.push_str(content),
            MarkupNode::Element(el) => {
                for child in &el.children {
                    child.collect_text(out);
                }
            }
        }
    }

    pub fn char_len(&self) -> usize {
        match self {
            MarkupNode::Text { content } => content.chars().count(),
            MarkupNode::Element(el) => el.char_len(),
        }
    }

    pub fn find_element(&self, id: &TagId) -> Option<&Element> {
        self.as_element().and_then(|el| el.find(id))
    }

    /// Ids of every element in the subtree, pre-order
    pub fn element_ids(&self) -> Vec<TagId> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids(&self, ids: &mut Vec<TagId>) {
        if let MarkupNode::Element(el) = self {
            ids.push(el.id.clone());
            for child in &el.children {
                child.collect_ids(ids);
            }
        }
    }
}

impl From<Element> for MarkupNode {
    fn from(element: Element) -> Self {
        MarkupNode::Element(element)
    }
}

/// Byte offset of the `char_idx`-th char (or the string length past the end)
pub(crate) fn byte_offset(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(byte, _)| byte)
        .unwrap_or(s.len())
}

/// Split a string at a char index
pub(crate) fn split_at_char(s: &str, char_idx: usize) -> (&str, &str) {
    s.split_at(byte_offset(s, char_idx))
}
