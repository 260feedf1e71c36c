//! XML parser that builds [`XmlTree`] arenas.

use crate::types::node_id;
use crate::{Error, NodeId, Result, XmlAttribute, XmlElement, XmlNode, XmlTree};
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesEnd, BytesStart, Event};

/// Parse a document part from a string.
///
/// # Example
///
/// ```rust
/// use docx_xml::parse;
///
/// let tree = parse("<w:body><w:p/></w:body>").unwrap();
/// assert_eq!(tree.name(tree.root()), Some("w:body"));
/// ```
///
/// # Errors
///
/// Returns an error if the XML is malformed.
pub fn parse(content: &str) -> Result<XmlTree> {
    let mut parser = XmlParser::new(content);
    parser.parse()
}

/// Parse a document part from raw bytes (UTF-8, optional byte order mark).
pub fn parse_bytes(bytes: &[u8]) -> Result<XmlTree> {
    let content = std::str::from_utf8(bytes)?;
    parse(content.strip_prefix('\u{feff}').unwrap_or(content))
}

/// Internal parser state.
struct XmlParser<'a> {
    /// The source content being parsed.
    source: &'a str,

    /// The quick-xml reader.
    reader: Reader<&'a [u8]>,

    /// Arena being filled.
    nodes: Vec<XmlNode>,

    /// Stack of elements being built.
    stack: Vec<BuildNode>,
}

/// An element being constructed during parsing.
struct BuildNode {
    name: String,
    attributes: Vec<XmlAttribute>,
    children: Vec<NodeId>,
}

impl<'a> XmlParser<'a> {
    fn new(source: &'a str) -> Self {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        Self {
            source,
            reader,
            nodes: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn parse(&mut self) -> Result<XmlTree> {
        let mut root: Option<NodeId> = None;
        let mut declaration: Option<String> = None;

        loop {
            // Capture position before reading the event
            let event_start = self.reader.buffer_position() as usize;

            match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    let node = self.start_node(&e)?;
                    self.stack.push(node);
                }
                Ok(Event::End(e)) => {
                    let id = self.handle_end(e)?;
                    self.attach(id, &mut root)?;
                }
                Ok(Event::Empty(e)) => {
                    let node = self.start_node(&e)?;
                    let id = self.finish(node);
                    self.attach(id, &mut root)?;
                }
                Ok(Event::Text(e)) => {
                    let raw = e.into_inner();
                    let text = std::str::from_utf8(&raw)?.to_string();
                    self.push_text(text);
                }
                Ok(Event::CData(e)) => {
                    let raw = e.into_inner();
                    let text = escape(std::str::from_utf8(&raw)?).into_owned();
                    self.push_text(text);
                }
                Ok(Event::Decl(_)) => {
                    let event_end = self.reader.buffer_position() as usize;
                    declaration = Some(self.source[event_start..event_end].trim().to_string());
                }
                Ok(Event::Comment(_) | Event::PI(_) | Event::DocType(_)) => {
                    // Skip comments, processing instructions, and DOCTYPE
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlSyntax {
                        message: e.to_string(),
                        position: Some(self.reader.error_position()),
                    });
                }
            }
        }

        // Check for unclosed elements
        if let Some(node) = self.stack.last() {
            return Err(Error::UnexpectedEof {
                expected: format!("closing tag </{}>", node.name),
            });
        }

        let root = root.ok_or(Error::EmptyDocument)?;
        let nodes = std::mem::take(&mut self.nodes);
        Ok(XmlTree::from_parts(nodes, root, declaration))
    }

    fn start_node(&self, e: &BytesStart<'_>) -> Result<BuildNode> {
        let name = std::str::from_utf8(e.name().as_ref())?.to_string();

        let mut attributes = Vec::new();
        for attr in e.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.as_ref())?;
            let value = std::str::from_utf8(&attr.value)?;
            attributes.push(XmlAttribute::new(key, value));
        }

        Ok(BuildNode {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    fn handle_end(&mut self, e: BytesEnd<'_>) -> Result<NodeId> {
        let end_name = String::from_utf8_lossy(e.name().as_ref()).to_string();

        let node = self.stack.pop().ok_or_else(|| Error::InvalidStructure {
            message: format!("Unexpected closing tag </{}>", end_name),
        })?;

        // Verify tag names match
        if node.name != end_name {
            return Err(Error::MismatchedEndTag {
                expected: node.name,
                found: end_name,
            });
        }

        Ok(self.finish(node))
    }

    fn finish(&mut self, node: BuildNode) -> NodeId {
        // Whitespace-only text between elements is formatting noise; text that
        // is an element's only content is significant.
        let has_elements = node
            .children
            .iter()
            .any(|id| matches!(self.nodes[id.index()], XmlNode::Element(_)));
        let children = if has_elements {
            node.children
                .into_iter()
                .filter(|id| match &self.nodes[id.index()] {
                    XmlNode::Text(t) => !t.trim().is_empty(),
                    XmlNode::Element(_) => true,
                })
                .collect()
        } else {
            node.children
        };

        self.alloc(XmlNode::Element(XmlElement {
            name: node.name,
            attributes: node.attributes,
            children,
        }))
    }

    fn attach(&mut self, id: NodeId, root: &mut Option<NodeId>) -> Result<()> {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(id),
            None => {
                if root.is_some() {
                    return Err(Error::MultipleRoots);
                }
                *root = Some(id);
            }
        }
        Ok(())
    }

    fn push_text(&mut self, text: String) {
        // Text outside the root element carries no content
        if self.stack.is_empty() {
            return;
        }
        let id = self.alloc(XmlNode::Text(text));
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(id);
        }
    }

    fn alloc(&mut self, node: XmlNode) -> NodeId {
        self.nodes.push(node);
        node_id(self.nodes.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_element() {
        let tree = parse("<root/>").unwrap();
        assert_eq!(tree.name(tree.root()), Some("root"));
        assert!(tree.children(tree.root()).is_empty());
    }

    #[test]
    fn test_parse_keeps_prefixes() {
        let tree = parse(r#"<w:document xmlns:w="urn:w"><w:body/></w:document>"#).unwrap();
        assert_eq!(tree.name(tree.root()), Some("w:document"));
        assert_eq!(tree.attribute(tree.root(), "xmlns:w"), Some("urn:w"));
        assert!(tree.find_first(tree.root(), "w:body").is_some());
    }

    #[test]
    fn test_text_is_stored_escaped() {
        let tree = parse("<t>a &amp; b &lt; c</t>").unwrap();
        assert_eq!(tree.text_content(tree.root()), "a &amp; b &lt; c");
    }

    #[test]
    fn test_attribute_is_stored_escaped() {
        let tree = parse(r#"<pic descr="x &quot;y&quot;"/>"#).unwrap();
        assert_eq!(tree.attribute(tree.root(), "descr"), Some("x &quot;y&quot;"));
    }

    #[test]
    fn test_whitespace_between_elements_is_dropped() {
        let tree = parse("<p>\n  <r/>\n  <r/>\n</p>").unwrap();
        assert_eq!(tree.children(tree.root()).len(), 2);
    }

    #[test]
    fn test_whitespace_only_content_is_kept() {
        let tree = parse(r#"<p><t xml:space="preserve"> </t></p>"#).unwrap();
        assert_eq!(tree.text_content(tree.root()), " ");
    }

    #[test]
    fn test_declaration_is_preserved() {
        let tree =
            parse("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n<root/>")
                .unwrap();
        assert_eq!(
            tree.declaration(),
            Some("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>")
        );
    }

    #[test]
    fn test_cdata_becomes_escaped_text() {
        let tree = parse("<t><![CDATA[a < b]]></t>").unwrap();
        assert_eq!(tree.text_content(tree.root()), "a &lt; b");
    }

    #[test]
    fn test_parse_bytes_strips_bom() {
        let tree = parse_bytes("\u{feff}<root/>".as_bytes()).unwrap();
        assert_eq!(tree.name(tree.root()), Some("root"));
    }

    #[test]
    fn test_empty_document_error() {
        assert!(matches!(parse(""), Err(Error::EmptyDocument)));
    }

    #[test]
    fn test_multiple_roots_error() {
        assert!(matches!(parse("<a/><b/>"), Err(Error::MultipleRoots)));
    }

    #[test]
    fn test_unclosed_element_error() {
        assert!(parse("<root><child>").is_err());
    }

    #[test]
    fn test_mismatched_tags_error() {
        let result = parse("<root></wrong>");
        // quick-xml checks end names itself, so this may surface as a syntax error
        assert!(matches!(
            result,
            Err(Error::XmlSyntax { .. }) | Err(Error::MismatchedEndTag { .. })
        ));
    }
}
