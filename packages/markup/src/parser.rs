//! # Markup Loader
//!
//! Reads TEI-style XML into passages, a cast list and relations.
//!
//! Only the XML subset found in literary TEI texts is supported: elements,
//! attributes, text, CDATA and character references. Comments, processing
//! instructions and doctype declarations are skipped.

use crate::ast::{Attributes, Element, MarkupNode};
use crate::error::{ParseError, ParseResult};
use crate::id_generator::IDGenerator;
use crate::mutator::merge_adjacent_text;
use crate::options::LoadOptions;
use crate::tokenizer::{tokenize, Token};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Element subtrees never searched for passages
const NON_TEXT_CONTAINERS: &[&str] = &["teiHeader", "castList", "listPerson", "listRelation"];

/// Everything extracted from one markup source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub seed: String,
    pub metadata: BTreeMap<String, String>,
    pub passages: Vec<ParsedPassage>,
    pub cast: Vec<CastMember>,
    pub relations: Vec<ParsedRelation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedPassage {
    pub id: String,
    pub root: MarkupNode,
}

/// A `person` entry of the cast list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub id: String,
    /// Value of `xml:id`, referenced as `#key` by `who` attributes
    pub key: String,
    pub name: String,
    pub attributes: Attributes,
}

/// A `relation` between two cast members, by key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRelation {
    pub id: String,
    pub from_key: String,
    pub to_key: String,
    pub relation_type: String,
    pub mutual: bool,
}

/// Parse markup source with default options
pub fn parse_document(name: &str, source: &str) -> ParseResult<ParsedDocument> {
    parse_document_with(name, source, &LoadOptions::default())
}

/// Parse markup source
pub fn parse_document_with(
    name: &str,
    source: &str,
    options: &LoadOptions,
) -> ParseResult<ParsedDocument> {
    let id_generator = match &options.id_seed {
        Some(seed) => IDGenerator::from_seed(seed.clone()),
        None => IDGenerator::new(name),
    };
    let mut parser = Parser::new(source, id_generator, options)?;
    let nodes = parser.parse_nodes(None)?;
    let doc = parser.extract(nodes);

    info!(
        document = name,
        passages = doc.passages.len(),
        cast = doc.cast.len(),
        relations = doc.relations.len(),
        "Parsed markup document"
    );
    Ok(doc)
}

/// Parser for markup sources
pub struct Parser<'src, 'opt> {
    tokens: Vec<(Token<'src>, std::ops::Range<usize>)>,
    pos: usize,
    id_generator: IDGenerator,
    options: &'opt LoadOptions,
}

impl<'src, 'opt> Parser<'src, 'opt> {
    pub fn new(
        source: &'src str,
        id_generator: IDGenerator,
        options: &'opt LoadOptions,
    ) -> ParseResult<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            id_generator,
            options,
        })
    }

    /// Parse sibling nodes until the closing tag of `open` (name, byte offset)
    /// or the end of input when `open` is `None`
    pub fn parse_nodes(&mut self, open: Option<(&str, usize)>) -> ParseResult<Vec<MarkupNode>> {
        let mut nodes = Vec::new();

        loop {
            let Some((token, span)) = self.advance() else {
                return match open {
                    Some((name, pos)) => Err(ParseError::UnclosedElement {
                        pos,
                        name: name.to_string(),
                    }),
                    None => Ok(merge_adjacent_text(nodes)),
                };
            };

            match token {
                Token::Comment | Token::ProcessingInstruction | Token::Doctype => {}
                Token::Text(raw) => nodes.push(MarkupNode::text(decode_entities(raw, span.start)?)),
                Token::CData(raw) => nodes.push(MarkupNode::text(raw)),
                Token::OpenTag(raw) => {
                    let (name, attributes, self_closing) = self.parse_open_tag(raw, span.start)?;
                    let id = self.id_generator.new_tag_id();
                    let children = if self_closing {
                        Vec::new()
                    } else {
                        self.parse_nodes(Some((name.as_str(), span.start)))?
                    };
                    nodes.push(MarkupNode::Element(Element {
                        id,
                        name,
                        attributes,
                        children,
                    }));
                }
                Token::CloseTag(raw) => {
                    let found = self.element_name(raw[2..raw.len() - 1].trim());
                    return match open {
                        Some((expected, _)) if expected == found => Ok(merge_adjacent_text(nodes)),
                        _ => Err(ParseError::MismatchedClose {
                            pos: span.start,
                            expected: open.map(|(name, _)| name.to_string()).unwrap_or_default(),
                            found,
                        }),
                    };
                }
            }
        }
    }

    fn advance(&mut self) -> Option<(Token<'src>, std::ops::Range<usize>)> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn element_name(&self, raw: &str) -> String {
        match raw.split_once(':') {
            Some((_, local)) if self.options.strip_namespaces => local.to_string(),
            _ => raw.to_string(),
        }
    }

    /// Split `<name a="1" b='2'/>` into name, attributes and the self-closing flag
    fn parse_open_tag(&self, raw: &str, pos: usize) -> ParseResult<(String, Attributes, bool)> {
        let inner = &raw[1..raw.len() - 1];
        let (inner, self_closing) = match inner.strip_suffix('/') {
            Some(stripped) => (stripped, true),
            None => (inner, false),
        };

        let name_end = inner
            .find(|c: char| c.is_whitespace())
            .unwrap_or(inner.len());
        let name = self.element_name(&inner[..name_end]);

        let mut attributes = Attributes::new();
        let mut rest = inner[name_end..].trim_start();
        while !rest.is_empty() {
            let eq = rest
                .find('=')
                .ok_or_else(|| ParseError::malformed_tag(pos, "attribute without value"))?;
            let key = rest[..eq].trim();
            if key.is_empty() || key.contains(char::is_whitespace) {
                return Err(ParseError::malformed_tag(pos, "invalid attribute name"));
            }

            let after = rest[eq + 1..].trim_start();
            let quote = after
                .chars()
                .next()
                .filter(|c| *c == '"' || *c == '\'')
                .ok_or_else(|| ParseError::malformed_tag(pos, "unquoted attribute value"))?;
            let close = after[1..]
                .find(quote)
                .ok_or_else(|| ParseError::malformed_tag(pos, "unterminated attribute value"))?;
            let value = decode_entities(&after[1..close + 1], pos)?;
            rest = after[close + 2..].trim_start();

            if self.options.strip_namespaces && (key == "xmlns" || key.starts_with("xmlns:")) {
                continue;
            }
            if attributes.insert(key, value).is_some() {
                return Err(ParseError::DuplicateAttribute {
                    pos,
                    name: key.to_string(),
                });
            }
        }

        Ok((name, attributes, self_closing))
    }

    fn extract(&mut self, nodes: Vec<MarkupNode>) -> ParsedDocument {
        let mut metadata = BTreeMap::new();
        let mut cast = Vec::new();
        let mut relations = Vec::new();
        let mut passages = Vec::new();

        for node in &nodes {
            if let MarkupNode::Element(el) = node {
                self.collect_header(el, &mut metadata);
                self.collect_cast(el, &mut cast);
                self.collect_relations(el, &mut relations);
                self.collect_passages(el, &mut passages);
            }
        }

        let roots: Vec<&Element> = nodes.iter().filter_map(MarkupNode::as_element).collect();
        if passages.is_empty() {
            match roots.as_slice() {
                // Plain text: one paragraph
                [] => {
                    let text: String = nodes.iter().map(MarkupNode::text_content).collect();
                    let root = Element::new(self.id_generator.new_tag_id(), "p")
                        .with_child(MarkupNode::text(text));
                    passages.push(self.passage(root.into()));
                }
                // Markup without passage elements: the root itself
                [root, ..] => {
                    debug!(root = %root.name, "No passage elements found, using document root");
                    passages.push(self.passage(MarkupNode::Element((*root).clone())));
                }
            }
        }

        let known: Vec<&str> = cast.iter().map(|c: &CastMember| c.key.as_str()).collect();
        relations.retain(|rel: &ParsedRelation| {
            let resolved = known.contains(&rel.from_key.as_str()) && known.contains(&rel.to_key.as_str());
            if !resolved {
                warn!(from = %rel.from_key, to = %rel.to_key, "Dropping relation to unknown cast member");
            }
            resolved
        });

        ParsedDocument {
            seed: self.id_generator.seed().to_string(),
            metadata,
            passages,
            cast,
            relations,
        }
    }

    fn passage(&mut self, root: MarkupNode) -> ParsedPassage {
        ParsedPassage {
            id: format!("passage-{}", self.id_generator.new_id()),
            root,
        }
    }

    fn collect_header(&self, el: &Element, metadata: &mut BTreeMap<String, String>) {
        if el.name == "teiHeader" {
            for field in ["title", "author"] {
                if let Some(found) = find_descendant(el, field) {
                    let value = normalize_space(&found.text_content());
                    if !value.is_empty() {
                        metadata.entry(field.to_string()).or_insert(value);
                    }
                }
            }
            return;
        }
        for child in el.children.iter().filter_map(MarkupNode::as_element) {
            self.collect_header(child, metadata);
        }
    }

    fn collect_cast(&mut self, el: &Element, cast: &mut Vec<CastMember>) {
        if el.name == "person" {
            let key = el
                .attributes
                .get("xml:id")
                .or_else(|| el.attributes.get("id"));
            let Some(key) = key.map(str::to_string) else {
                warn!("Skipping person without xml:id");
                return;
            };
            if cast.iter().any(|c| c.key == key) {
                warn!(key = %key, "Skipping duplicate person");
                return;
            }

            let name = find_descendant(el, "persName")
                .map(|n| normalize_space(&n.text_content()))
                .filter(|n| !n.is_empty())
                .or_else(|| Some(normalize_space(&el.text_content())).filter(|n| !n.is_empty()))
                .unwrap_or_else(|| key.clone());

            let mut attributes = el.attributes.clone();
            attributes.remove("xml:id");
            attributes.remove("id");

            cast.push(CastMember {
                id: format!("character-{}", self.id_generator.new_id()),
                key,
                name,
                attributes,
            });
            return;
        }
        for child in el.children.iter().filter_map(MarkupNode::as_element) {
            self.collect_cast(child, cast);
        }
    }

    fn collect_relations(&mut self, el: &Element, relations: &mut Vec<ParsedRelation>) {
        if el.name == "relation" {
            let relation_type = el
                .attributes
                .get("type")
                .or_else(|| el.attributes.get("name"))
                .unwrap_or("related")
                .to_string();

            let (pair, mutual) = match el.attributes.get("mutual") {
                Some(mutual) => (pointers(mutual), true),
                None => {
                    let mut pair = pointers(el.attributes.get("active").unwrap_or(""));
                    pair.truncate(1);
                    pair.extend(pointers(el.attributes.get("passive").unwrap_or("")));
                    (pair, false)
                }
            };

            if let [from, to, ..] = pair.as_slice() {
                relations.push(ParsedRelation {
                    id: format!("relation-{}", self.id_generator.new_id()),
                    from_key: from.clone(),
                    to_key: to.clone(),
                    relation_type,
                    mutual,
                });
            } else {
                warn!(relation_type = %relation_type, "Skipping relation without two participants");
            }
            return;
        }
        for child in el.children.iter().filter_map(MarkupNode::as_element) {
            self.collect_relations(child, relations);
        }
    }

    fn collect_passages(&mut self, el: &Element, passages: &mut Vec<ParsedPassage>) {
        if NON_TEXT_CONTAINERS.contains(&el.name.as_str()) {
            return;
        }
        if self.options.is_passage_tag(&el.name) {
            passages.push(self.passage(MarkupNode::Element(el.clone())));
            return;
        }
        for child in el.children.iter().filter_map(MarkupNode::as_element) {
            self.collect_passages(child, passages);
        }
    }
}

fn find_descendant<'a>(el: &'a Element, name: &str) -> Option<&'a Element> {
    el.children
        .iter()
        .filter_map(MarkupNode::as_element)
        .find_map(|child| {
            if child.name == name {
                Some(child)
            } else {
                find_descendant(child, name)
            }
        })
}

/// `"#a #b"` → `["a", "b"]`
fn pointers(value: &str) -> Vec<String> {
    value
        .split_whitespace()
        .map(|p| p.trim_start_matches('#').to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn normalize_space(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve character and predefined entity references.
///
/// Unknown named entities are kept verbatim; a bare `&` is literal.
pub fn decode_entities(raw: &str, pos: usize) -> ParseResult<String> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let Some(semi) = after.find(';').filter(|&i| i <= 10) else {
            out.push('&');
            rest = after;
            continue;
        };

        let entity = &after[..semi];
        match entity {
            "amp" => out.push('&'),
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            _ if entity.starts_with('#') => {
                let code = match entity[1..].strip_prefix(['x', 'X']) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => entity[1..].parse::<u32>().ok(),
                };
                let ch = code.and_then(char::from_u32).ok_or_else(|| ParseError::UnknownEntity {
                    pos,
                    entity: entity.to_string(),
                })?;
                out.push(ch);
            }
            _ => {
                out.push('&');
                out.push_str(entity);
                out.push(';');
            }
        }
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TagId;

    const SAMPLE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader>
    <fileDesc>
      <titleStmt><title>Pride and  Prejudice</title><author>Jane Austen</author></titleStmt>
      <publicationStmt><p>Public domain</p></publicationStmt>
    </fileDesc>
    <profileDesc>
      <particDesc>
        <listPerson>
          <person xml:id="eliza" sex="F"><persName>Elizabeth Bennet</persName></person>
          <person xml:id="darcy"><persName>Fitzwilliam Darcy</persName></person>
        </listPerson>
        <listRelation>
          <relation type="spouse" mutual="#eliza #darcy"/>
          <relation name="dislikes" active="#eliza" passive="#darcy"/>
          <relation type="knows" active="#eliza" passive="#nobody"/>
        </listRelation>
      </particDesc>
    </profileDesc>
  </teiHeader>
  <text><body>
    <p><said who="#eliza">&quot;I am perfectly convinced,&quot;</said> said she.</p>
    <p>Second &amp; last.</p>
  </body></text>
</TEI>"##;

    #[test]
    fn test_extracts_header_metadata() {
        let doc = parse_document("pride.xml", SAMPLE).unwrap();
        assert_eq!(doc.metadata.get("title").unwrap(), "Pride and Prejudice");
        assert_eq!(doc.metadata.get("author").unwrap(), "Jane Austen");
    }

    #[test]
    fn test_extracts_passages_outside_header() {
        let doc = parse_document("pride.xml", SAMPLE).unwrap();
        assert_eq!(doc.passages.len(), 2);

        let first = &doc.passages[0].root;
        assert_eq!(
            first.text_content(),
            "\"I am perfectly convinced,\" said she."
        );
        let said = first.as_element().unwrap().children[0].as_element().unwrap();
        assert_eq!(said.name, "said");
        assert_eq!(said.attributes.get("who"), Some("#eliza"));

        assert_eq!(doc.passages[1].root.text_content(), "Second & last.");
    }

    #[test]
    fn test_extracts_cast_and_relations() {
        let doc = parse_document("pride.xml", SAMPLE).unwrap();
        assert_eq!(doc.cast.len(), 2);
        assert_eq!(doc.cast[0].key, "eliza");
        assert_eq!(doc.cast[0].name, "Elizabeth Bennet");
        assert_eq!(doc.cast[0].attributes.get("sex"), Some("F"));

        // Relation to an unknown person is dropped
        assert_eq!(doc.relations.len(), 2);
        assert!(doc.relations[0].mutual);
        assert_eq!(doc.relations[0].relation_type, "spouse");
        assert_eq!(doc.relations[1].from_key, "eliza");
        assert_eq!(doc.relations[1].to_key, "darcy");
        assert!(!doc.relations[1].mutual);
    }

    #[test]
    fn test_ids_are_deterministic_and_unique() {
        let a = parse_document("pride.xml", SAMPLE).unwrap();
        let b = parse_document("pride.xml", SAMPLE).unwrap();
        assert_eq!(a, b);

        let mut ids: Vec<TagId> = a.passages.iter().flat_map(|p| p.root.element_ids()).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn test_plain_text_becomes_one_passage() {
        let doc = parse_document("note.txt", "Hello world").unwrap();
        assert_eq!(doc.passages.len(), 1);
        let root = doc.passages[0].root.as_element().unwrap();
        assert_eq!(root.name, "p");
        assert_eq!(doc.passages[0].root.text_content(), "Hello world");
    }

    #[test]
    fn test_namespace_prefixes_stripped() {
        let doc = parse_document("ns.xml", r#"<tei:p xmlns:tei="x">a<tei:hi>b</tei:hi></tei:p>"#)
            .unwrap();
        let root = doc.passages[0].root.as_element().unwrap();
        assert_eq!(root.name, "p");
        assert!(root.attributes.is_empty());
        assert_eq!(root.children[1].as_element().unwrap().name, "hi");
    }

    #[test]
    fn test_mismatched_and_unclosed() {
        assert!(matches!(
            parse_document("x", "<p><hi>a</p></hi>"),
            Err(ParseError::MismatchedClose { .. })
        ));
        assert!(matches!(
            parse_document("x", "<p>a"),
            Err(ParseError::UnclosedElement { .. })
        ));
        assert!(matches!(
            parse_document("x", r#"<p a="1" a="2">x</p>"#),
            Err(ParseError::DuplicateAttribute { .. })
        ));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &amp; b &#233; &#x41;", 0).unwrap(), "a & b é A");
        assert_eq!(decode_entities("fish & chips", 0).unwrap(), "fish & chips");
        assert_eq!(decode_entities("&mdash;", 0).unwrap(), "&mdash;");
        assert!(decode_entities("&#xZZ;", 0).is_err());
    }
}
