//! Arena-backed XML trees for Office document parts.
//!
//! This crate wraps `quick-xml` to parse a document part (such as
//! `word/document.xml`) into an [`XmlTree`]: a flat arena of [`XmlNode`]s
//! addressed by copyable [`NodeId`] handles.
//!
//! # Overview
//!
//! The main types are:
//! - [`XmlTree`]: The parsed part, owning every node
//! - [`XmlNode`]: Either an [`XmlElement`] or a text node
//! - [`XmlElement`]: Qualified name, ordered attributes, ordered child ids
//! - [`XmlAttribute`]: A name/value pair
//!
//! Node identity is the [`NodeId`]. Rewriting passes never mutate a node in
//! place; they allocate a new node and swap it in with [`XmlTree::replace`],
//! or rebind a whole child list with [`XmlTree::set_children`].
//!
//! # Escaped storage
//!
//! Text and attribute values are kept exactly as they appear in the source,
//! entities included. The writer emits them verbatim, so callers inserting
//! new text are responsible for escaping it.
//!
//! # Example
//!
//! ```rust
//! use docx_xml::parse;
//!
//! let tree = parse(r#"<w:p><w:r><w:t>Hello &amp; bye</w:t></w:r></w:p>"#).unwrap();
//!
//! assert_eq!(tree.name(tree.root()), Some("w:p"));
//! assert_eq!(tree.text_content(tree.root()), "Hello &amp; bye");
//!
//! let runs = tree.find_all(tree.root(), "w:r");
//! assert_eq!(runs.len(), 1);
//! ```

pub mod error;
pub mod parser;
pub mod types;
pub mod writer;

// Re-export main types
pub use error::{Error, Result};
pub use parser::{parse, parse_bytes};
pub use types::{NodeId, TextSlot, XmlAttribute, XmlElement, XmlNode, XmlTree, local_name};
