/*
 * content_types.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The `[Content_Types].xml` manifest.

use docx_xml::{XmlAttribute, XmlElement, XmlTree};

use crate::error::{TemplateError, TemplateResult};
use crate::names;
use crate::package::CONTENT_TYPES_PART;

#[derive(Debug, Clone)]
pub struct ContentTypes {
    tree: XmlTree,
}

impl ContentTypes {
    /// Parse the content types manifest.
    pub fn parse(bytes: &[u8]) -> TemplateResult<Self> {
        let tree =
            docx_xml::parse_bytes(bytes).map_err(|e| TemplateError::xml(CONTENT_TYPES_PART, e))?;
        Ok(ContentTypes { tree })
    }

    /// Whether a `<Default>` entry exists for `extension` (case-insensitive).
    pub fn has_default(&self, extension: &str) -> bool {
        let tree = &self.tree;
        tree.find_all(tree.root(), names::CONTENT_TYPE_DEFAULT)
            .into_iter()
            .filter_map(|id| tree.attribute(id, "Extension"))
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }

    /// Register `mime` for `extension` unless the extension already has one.
    ///
    /// Returns whether an entry was added.
    pub fn ensure_default(&mut self, extension: &str, mime: &str) -> bool {
        if self.has_default(extension) {
            return false;
        }
        let mut element = XmlElement::new(names::CONTENT_TYPE_DEFAULT);
        element.attributes = vec![
            XmlAttribute::new("Extension", extension),
            XmlAttribute::new("ContentType", mime),
        ];
        let node = self.tree.add_element(element);

        let root = self.tree.root();
        let mut children = self.tree.children(root).to_vec();
        // Defaults conventionally precede Overrides
        let at = children
            .iter()
            .rposition(|c| self.tree.is_named(*c, names::CONTENT_TYPE_DEFAULT))
            .map_or(0, |i| i + 1);
        children.insert(at, node);
        self.tree.set_children(root, children);
        true
    }

    /// Serialize the manifest.
    pub fn to_bytes(&self) -> TemplateResult<Vec<u8>> {
        self.tree
            .to_xml_bytes()
            .map_err(|e| TemplateError::xml(CONTENT_TYPES_PART, e))
    }
}
