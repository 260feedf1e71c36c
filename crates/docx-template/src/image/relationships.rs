/*
 * relationships.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Package relationship parts (`_rels/*.rels`) and ID allocation.

use std::collections::HashSet;

use docx_xml::{XmlAttribute, XmlElement, XmlTree};

use crate::error::{TemplateError, TemplateResult};
use crate::names;

pub const IMAGE_RELATIONSHIP_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const EMPTY_RELATIONSHIPS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"/>"#
);

/// One `<Relationship>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub kind: String,
    pub target: String,
}

/// The ID following the highest `rId<N>` in `existing`.
///
/// `rId1` when there is none. IDs that do not follow the `rId<N>` pattern
/// are ignored for numbering but never returned.
pub fn next_relationship_id<S: AsRef<str>>(existing: &[S]) -> String {
    let mut ids = RelationshipIds::new(existing.iter().map(|s| s.as_ref().to_string()));
    ids.allocate()
}

/// Allocator handing out unused relationship IDs for one part.
#[derive(Debug, Clone, Default)]
pub struct RelationshipIds {
    used: HashSet<String>,
    next: u64,
}

impl RelationshipIds {
    /// Allocator that continues after the highest `rIdN` in `existing`.
    pub fn new(existing: impl IntoIterator<Item = String>) -> Self {
        let used: HashSet<String> = existing.into_iter().collect();
        let highest = used
            .iter()
            .filter_map(|id| id.strip_prefix("rId"))
            .filter_map(|n| n.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        RelationshipIds {
            used,
            next: highest + 1,
        }
    }

    /// Next unused `rIdN`.
    pub fn allocate(&mut self) -> String {
        loop {
            let candidate = format!("rId{}", self.next);
            self.next += 1;
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

/// Name of the relationships part describing `part`'s outgoing links.
///
/// `word/document.xml` -> `word/_rels/document.xml.rels`.
pub fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// A parsed relationships part that new entries can be added to.
#[derive(Debug, Clone)]
pub struct RelationshipsPart {
    tree: XmlTree,
    ids: RelationshipIds,
}

impl RelationshipsPart {
    /// Parse the relationships part `name`.
    pub fn parse(name: &str, bytes: &[u8]) -> TemplateResult<Self> {
        let tree = docx_xml::parse_bytes(bytes).map_err(|e| TemplateError::xml(name, e))?;
        Ok(Self::from_tree(tree))
    }

    /// A part with no relationships yet.
    pub fn empty() -> Self {
        match docx_xml::parse(EMPTY_RELATIONSHIPS) {
            Ok(tree) => Self::from_tree(tree),
            Err(_) => Self::from_tree(XmlTree::new(XmlElement::new(names::RELATIONSHIPS))),
        }
    }

    fn from_tree(tree: XmlTree) -> Self {
        let existing = tree
            .find_all(tree.root(), names::RELATIONSHIP)
            .into_iter()
            .filter_map(|id| tree.attribute(id, "Id").map(str::to_string))
            .collect::<Vec<_>>();
        RelationshipsPart {
            ids: RelationshipIds::new(existing),
            tree,
        }
    }

    /// Relationships in document order.
    pub fn relationships(&self) -> Vec<Relationship> {
        let tree = &self.tree;
        tree.find_all(tree.root(), names::RELATIONSHIP)
            .into_iter()
            .map(|id| Relationship {
                id: tree.attribute(id, "Id").unwrap_or_default().to_string(),
                kind: tree.attribute(id, "Type").unwrap_or_default().to_string(),
                target: tree.attribute(id, "Target").unwrap_or_default().to_string(),
            })
            .collect()
    }

    /// Append a relationship and return its freshly allocated ID.
    pub fn add(&mut self, kind: &str, target: &str) -> String {
        let id = self.ids.allocate();
        let mut element = XmlElement::new(names::RELATIONSHIP);
        element.attributes = vec![
            XmlAttribute::new("Id", id.clone()),
            XmlAttribute::new("Type", kind),
            XmlAttribute::new("Target", target),
        ];
        let node = self.tree.add_element(element);

        let root = self.tree.root();
        let mut children = self.tree.children(root).to_vec();
        children.push(node);
        self.tree.set_children(root, children);
        id
    }

    /// Serialize; `name` is used in error messages.
    pub fn to_bytes(&self, name: &str) -> TemplateResult<Vec<u8>> {
        self.tree
            .to_xml_bytes()
            .map_err(|e| TemplateError::xml(name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_next_relationship_id() {
        let none: [&str; 0] = [];
        assert_eq!(next_relationship_id(&none), "rId1");
        assert_eq!(next_relationship_id(&["rId1", "rId5"]), "rId6");
        assert_eq!(next_relationship_id(&["rIdImage", "rId2"]), "rId3");
    }

    #[test]
    fn test_allocator_never_repeats() {
        let mut ids = RelationshipIds::new(["rId1".to_string(), "rId3".to_string()]);
        let first = ids.allocate();
        let second = ids.allocate();
        assert_eq!(first, "rId4");
        assert_eq!(second, "rId5");
    }

    #[test]
    fn test_rels_part_for() {
        assert_eq!(rels_part_for("word/document.xml"), "word/_rels/document.xml.rels");
        assert_eq!(rels_part_for("word/header1.xml"), "word/_rels/header1.xml.rels");
        assert_eq!(rels_part_for("doc.xml"), "_rels/doc.xml.rels");
    }

    #[test]
    fn test_add_to_existing_part() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="styles" Target="styles.xml"/><Relationship Id="rId7" Type="theme" Target="theme/theme1.xml"/></Relationships>"#;
        let mut part = RelationshipsPart::parse("word/_rels/document.xml.rels", xml.as_bytes()).unwrap();
        let id = part.add(IMAGE_RELATIONSHIP_TYPE, "media/image1.png");
        assert_eq!(id, "rId8");

        let rels = part.relationships();
        assert_eq!(rels.len(), 3);
        assert_eq!(
            rels[2],
            Relationship {
                id: "rId8".to_string(),
                kind: IMAGE_RELATIONSHIP_TYPE.to_string(),
                target: "media/image1.png".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_part() {
        let mut part = RelationshipsPart::empty();
        assert!(part.relationships().is_empty());
        assert_eq!(part.add(IMAGE_RELATIONSHIP_TYPE, "media/image1.gif"), "rId1");

        let bytes = part.to_bytes("word/_rels/header1.xml.rels").unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("<?xml"));
        assert!(text.contains(r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image1.gif"/>"#));
    }
}
