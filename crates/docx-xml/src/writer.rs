//! Serialization of [`XmlTree`]s back to markup.

use std::borrow::Cow;

use crate::{Error, NodeId, Result, XmlNode, XmlTree};
use quick_xml::Writer;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;

impl XmlTree {
    /// Serialize the tree, including its XML declaration.
    pub fn to_xml_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        if let Some(decl) = self.declaration() {
            let out = writer.get_mut();
            out.extend_from_slice(decl.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        write_node(self, self.root(), &mut writer)?;
        Ok(writer.into_inner())
    }

    /// Serialize the tree to a string.
    pub fn to_xml_string(&self) -> Result<String> {
        let bytes = self.to_xml_bytes()?;
        String::from_utf8(bytes).map_err(|e| Error::Write {
            message: e.to_string(),
        })
    }

    /// Serialize one subtree without a declaration.
    ///
    /// Useful for comparing subtrees structurally.
    pub fn subtree_to_string(&self, id: NodeId) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        write_node(self, id, &mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|e| Error::Write {
            message: e.to_string(),
        })
    }
}

fn write_node(tree: &XmlTree, id: NodeId, writer: &mut Writer<Vec<u8>>) -> Result<()> {
    match tree.node(id) {
        XmlNode::Text(text) => emit(writer, Event::Text(BytesText::from_escaped(text.as_str()))),
        XmlNode::Element(element) => {
            let mut start = BytesStart::new(element.name.as_str());
            for attr in &element.attributes {
                // Values are stored escaped; only a bare double quote (legal in a
                // single-quoted source attribute) needs fixing up.
                let value = attr.value.replace('"', "&quot;");
                start.push_attribute(Attribute {
                    key: QName(attr.name.as_bytes()),
                    value: Cow::Owned(value.into_bytes()),
                });
            }

            if element.children.is_empty() {
                return emit(writer, Event::Empty(start));
            }

            emit(writer, Event::Start(start))?;
            for child in &element.children {
                write_node(tree, *child, writer)?;
            }
            emit(writer, Event::End(BytesEnd::new(element.name.as_str())))
        }
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer.write_event(event).map_err(|e| Error::Write {
        message: e.to_string(),
    })
}
