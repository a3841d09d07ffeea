use crate::ast::{Attributes, Element, MarkupNode};
use crate::parser::{CastMember, ParsedRelation};
use std::collections::BTreeMap;

/// Serializer converts markup trees back to XML source
///
/// Passage content is written inline, exactly as stored: mixed content
/// has significant whitespace, so only the generated TEI scaffolding is
/// indented.
pub struct Serializer {
    indent_level: usize,
}

const INDENT: &str = "  ";

/// Everything needed to write a standalone TEI file
#[derive(Debug, Clone, Default)]
pub struct TeiExport<'a> {
    pub metadata: BTreeMap<String, String>,
    pub cast: Vec<CastMember>,
    pub relations: Vec<ParsedRelation>,
    pub passages: Vec<&'a MarkupNode>,
}

impl Serializer {
    pub fn new() -> Self {
        Self { indent_level: 0 }
    }

    /// Serialize a single node (and its subtree)
    pub fn serialize_node(&self, node: &MarkupNode) -> String {
        let mut output = String::new();
        self.write_node(node, &mut output);
        output
    }

    /// Serialize a full TEI document
    pub fn serialize_tei(&mut self, export: &TeiExport<'_>) -> String {
        let mut output = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        output.push_str("<TEI xmlns=\"http://www.tei-c.org/ns/1.0\">\n");
        self.indent_level += 1;

        self.open("teiHeader", &mut output);
        self.open("fileDesc", &mut output);
        self.open("titleStmt", &mut output);
        let title = export.metadata.get("title").map(String::as_str).unwrap_or("");
        self.leaf("title", &Attributes::new(), title, &mut output);
        if let Some(author) = export.metadata.get("author") {
            self.leaf("author", &Attributes::new(), author, &mut output);
        }
        self.close("titleStmt", &mut output);
        self.open("publicationStmt", &mut output);
        self.leaf("p", &Attributes::new(), "Exported document", &mut output);
        self.close("publicationStmt", &mut output);
        self.close("fileDesc", &mut output);

        if !export.cast.is_empty() || !export.relations.is_empty() {
            self.open("profileDesc", &mut output);
            self.open("particDesc", &mut output);
            if !export.cast.is_empty() {
                self.open("listPerson", &mut output);
                for member in &export.cast {
                    self.write_person(member, &mut output);
                }
                self.close("listPerson", &mut output);
            }
            if !export.relations.is_empty() {
                self.open("listRelation", &mut output);
                for relation in &export.relations {
                    self.write_relation(relation, &mut output);
                }
                self.close("listRelation", &mut output);
            }
            self.close("particDesc", &mut output);
            self.close("profileDesc", &mut output);
        }
        self.close("teiHeader", &mut output);

        self.open("text", &mut output);
        self.open("body", &mut output);
        for passage in &export.passages {
            self.write_indent(&mut output);
            self.write_node(passage, &mut output);
            output.push('\n');
        }
        self.close("body", &mut output);
        self.close("text", &mut output);

        self.indent_level -= 1;
        output.push_str("</TEI>\n");
        output
    }

    fn write_node(&self, node: &MarkupNode, output: &mut String) {
        match node {
            MarkupNode::Text { content } => escape_text(content, output),
            MarkupNode::Element(element) => self.write_element(element, output),
        }
    }

    fn write_element(&self, element: &Element, output: &mut String) {
        write_start_tag(&element.name, &element.attributes, output);
        if element.children.is_empty() {
            // Turn `<name ...>` into `<name .../>`
            output.pop();
            output.push_str("/>");
            return;
        }
        for child in &element.children {
            self.write_node(child, output);
        }
        output.push_str("</");
        output.push_str(&element.name);
        output.push('>');
    }

    fn write_person(&self, member: &CastMember, output: &mut String) {
        let mut attributes = Attributes::new().with("xml:id", member.key.as_str());
        for (key, value) in member.attributes.iter() {
            attributes.insert(key, value);
        }
        self.write_indent(output);
        write_start_tag("person", &attributes, output);
        output.push_str("<persName>");
        escape_text(&member.name, output);
        output.push_str("</persName></person>\n");
    }

    fn write_relation(&self, relation: &ParsedRelation, output: &mut String) {
        let attributes = if relation.mutual {
            Attributes::new()
                .with("type", relation.relation_type.as_str())
                .with("mutual", format!("#{} #{}", relation.from_key, relation.to_key))
        } else {
            Attributes::new()
                .with("type", relation.relation_type.as_str())
                .with("active", format!("#{}", relation.from_key))
                .with("passive", format!("#{}", relation.to_key))
        };
        self.write_indent(output);
        write_start_tag("relation", &attributes, output);
        output.pop();
        output.push_str("/>\n");
    }

    fn open(&mut self, name: &str, output: &mut String) {
        self.write_indent(output);
        output.push('<');
        output.push_str(name);
        output.push_str(">\n");
        self.indent_level += 1;
    }

    fn close(&mut self, name: &str, output: &mut String) {
        self.indent_level = self.indent_level.saturating_sub(1);
        self.write_indent(output);
        output.push_str("</");
        output.push_str(name);
        output.push_str(">\n");
    }

    fn leaf(&self, name: &str, attributes: &Attributes, text: &str, output: &mut String) {
        self.write_indent(output);
        write_start_tag(name, attributes, output);
        escape_text(text, output);
        output.push_str("</");
        output.push_str(name);
        output.push_str(">\n");
    }

    fn write_indent(&self, output: &mut String) {
        for _ in 0..self.indent_level {
            output.push_str(INDENT);
        }
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize a node with default settings
pub fn serialize(node: &MarkupNode) -> String {
    Serializer::new().serialize_node(node)
}

fn write_start_tag(name: &str, attributes: &Attributes, output: &mut String) {
    output.push('<');
    output.push_str(name);
    for (key, value) in attributes.iter() {
        output.push(' ');
        output.push_str(key);
        output.push_str("=\"");
        escape_attribute(value, output);
        output.push('"');
    }
    output.push('>');
}

fn escape_text(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            _ => output.push(c),
        }
    }
}

fn escape_attribute(value: &str, output: &mut String) {
    for c in value.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '"' => output.push_str("&quot;"),
            _ => output.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TagId;
    use crate::parser::parse_document;

    #[test]
    fn test_serialize_mixed_content() {
        let node: MarkupNode = Element::new(TagId::new("1"), "p")
            .with_child(MarkupNode::text("Fish & "))
            .with_child(
                Element::new(TagId::new("2"), "said")
                    .with_attributes(Attributes::new().with("who", "#a \"b\""))
                    .with_child(MarkupNode::text("chips"))
                    .into(),
            )
            .with_child(Element::new(TagId::new("3"), "lb").into())
            .into();

        assert_eq!(
            serialize(&node),
            r##"<p>Fish &amp; <said who="#a &quot;b&quot;">chips</said><lb/></p>"##
        );
    }

    #[test]
    fn test_roundtrip_preserves_text_and_structure() {
        let source = r#"<p>A <hi rend="i">b &lt; c</hi> d</p>"#;
        let doc = parse_document("x", source).unwrap();
        let root = &doc.passages[0].root;

        let output = serialize(root);
        assert_eq!(output, source);

        let again = parse_document("x", &output).unwrap();
        assert_eq!(again.passages[0].root.text_content(), root.text_content());
    }

    #[test]
    fn test_tei_export_reparses() {
        let passage: MarkupNode = Element::new(TagId::new("1"), "p")
            .with_child(MarkupNode::text("Hello"))
            .into();
        let export = TeiExport {
            metadata: BTreeMap::from([("title".to_string(), "Letters".to_string())]),
            cast: vec![CastMember {
                id: "c1".to_string(),
                key: "jane".to_string(),
                name: "Jane".to_string(),
                attributes: Attributes::new().with("sex", "F"),
            }],
            relations: vec![ParsedRelation {
                id: "r1".to_string(),
                from_key: "jane".to_string(),
                to_key: "jane".to_string(),
                relation_type: "self".to_string(),
                mutual: false,
            }],
            passages: vec![&passage],
        };

        let output = Serializer::new().serialize_tei(&export);
        let doc = parse_document("letters.xml", &output).unwrap();

        assert_eq!(doc.metadata.get("title").unwrap(), "Letters");
        assert_eq!(doc.passages.len(), 1);
        assert_eq!(doc.passages[0].root.text_content(), "Hello");
        assert_eq!(doc.cast[0].name, "Jane");
        assert_eq!(doc.cast[0].attributes.get("sex"), Some("F"));
        assert_eq!(doc.relations.len(), 1);
        assert_eq!(doc.relations[0].relation_type, "self");
    }
}
