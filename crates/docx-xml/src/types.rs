//! Core tree types and the walk/rewrite primitives built on them.

/// Handle to a node stored in an [`XmlTree`].
///
/// Two handles are "the same node" exactly when they are equal. Handles are
/// only meaningful for the tree that issued them (or a clone of it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

pub(crate) fn node_id(index: usize) -> NodeId {
    NodeId(index)
}

impl NodeId {
    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A node of a document part.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    /// An element with its attributes and children.
    Element(XmlElement),

    /// Text content, stored in escaped form.
    Text(String),
}

/// An XML element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    /// Qualified name, including any namespace prefix (e.g. `w:p`).
    pub name: String,

    /// Attributes in document order.
    pub attributes: Vec<XmlAttribute>,

    /// Children in document order.
    pub children: Vec<NodeId>,
}

/// An XML attribute. The value is stored in escaped form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: String,
    pub value: String,
}

impl XmlAttribute {
    /// Create an attribute from an already-escaped value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl XmlElement {
    /// Create an element with no attributes or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Get an attribute value by name (first match).
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Return a copy of this element with `name` set to `value`.
    ///
    /// An existing attribute keeps its position; a new one is appended.
    pub fn with_attribute(&self, name: &str, value: impl Into<String>) -> XmlElement {
        let mut element = self.clone();
        let value = value.into();
        match element.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => element.attributes.push(XmlAttribute::new(name, value)),
        }
        element
    }
}

/// Strip the namespace prefix from a qualified name.
pub fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// A text node and the child slot of its parent that holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSlot {
    pub parent: NodeId,
    pub index: usize,
    pub node: NodeId,
}

/// A parsed document part.
///
/// All nodes live in one arena. Nodes that are no longer reachable from the
/// root after a rewrite stay allocated but are ignored by every walk and by
/// the writer.
#[derive(Debug, Clone)]
pub struct XmlTree {
    nodes: Vec<XmlNode>,
    root: NodeId,
    declaration: Option<String>,
}

impl XmlTree {
    /// Create a tree holding a single root element.
    pub fn new(root: XmlElement) -> Self {
        Self {
            nodes: vec![XmlNode::Element(root)],
            root: NodeId(0),
            declaration: None,
        }
    }

    /// Build a tree from pre-allocated nodes.
    pub(crate) fn from_parts(
        nodes: Vec<XmlNode>,
        root: NodeId,
        declaration: Option<String>,
    ) -> Self {
        Self {
            nodes,
            root,
            declaration,
        }
    }

    /// The root element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The XML declaration (`<?xml ...?>`), if the source had one.
    pub fn declaration(&self) -> Option<&str> {
        self.declaration.as_deref()
    }

    /// Set or clear the XML declaration written before the root.
    pub fn set_declaration(&mut self, declaration: Option<String>) {
        self.declaration = declaration;
    }

    /// Allocate a new element. The node is detached until linked in.
    pub fn add_element(&mut self, element: XmlElement) -> NodeId {
        self.push(XmlNode::Element(element))
    }

    /// Allocate a new text node from already-escaped text.
    pub fn add_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(XmlNode::Text(text.into()))
    }

    fn push(&mut self, node: XmlNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// The node stored at `id`.
    pub fn node(&self, id: NodeId) -> &XmlNode {
        &self.nodes[id.0]
    }

    /// True if `id` is an element node.
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id), XmlNode::Element(_))
    }

    /// True if `id` is a text node.
    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.node(id), XmlNode::Text(_))
    }

    /// The element at `id`, or `None` for a text node.
    pub fn element(&self, id: NodeId) -> Option<&XmlElement> {
        match self.node(id) {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        }
    }

    /// The escaped text at `id`, or `None` for an element.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.node(id) {
            XmlNode::Text(t) => Some(t),
            XmlNode::Element(_) => None,
        }
    }

    /// Qualified name of an element node.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.as_str())
    }

    /// True if `id` is an element named `name`.
    pub fn is_named(&self, id: NodeId, name: &str) -> bool {
        self.name(id) == Some(name)
    }

    /// Children of an element; empty for text nodes.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.node(id) {
            XmlNode::Element(e) => &e.children,
            XmlNode::Text(_) => &[],
        }
    }

    /// Replace the whole child list of an element, keeping name and attributes.
    ///
    /// Has no effect on text nodes.
    pub fn set_children(&mut self, id: NodeId, children: Vec<NodeId>) {
        if let XmlNode::Element(e) = &mut self.nodes[id.0] {
            e.children = children;
        }
    }

    /// Attribute lookup by name (first match).
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.get_attribute(name))
    }

    /// Depth-first, pre-order search for elements named `name`, starting at
    /// (and including) `start`.
    pub fn find_all(&self, start: NodeId, name: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if let XmlNode::Element(e) = self.node(id) {
                if e.name == name {
                    found.push(id);
                }
                stack.extend(e.children.iter().rev().copied());
            }
        }
        found
    }

    /// First element named `name` in depth-first order.
    pub fn find_first(&self, start: NodeId, name: &str) -> Option<NodeId> {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if let XmlNode::Element(e) = self.node(id) {
                if e.name == name {
                    return Some(id);
                }
                stack.extend(e.children.iter().rev().copied());
            }
        }
        None
    }

    /// Follow a structural path of child names below `start`.
    ///
    /// `find_path(body, &["w:tbl", "w:tr"])` returns every row of every table
    /// that is a direct child of `body`.
    pub fn find_path(&self, start: NodeId, path: &[&str]) -> Vec<NodeId> {
        let mut current = vec![start];
        for segment in path {
            current = current
                .iter()
                .flat_map(|id| self.children(*id))
                .copied()
                .filter(|child| self.is_named(*child, segment))
                .collect();
        }
        current
    }

    /// Concatenation of all text below `id`, in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.node(id) {
            XmlNode::Text(t) => out.push_str(t),
            XmlNode::Element(e) => {
                for child in &e.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Text nodes below `id`, in document order.
    pub fn text_nodes(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match self.node(current) {
                XmlNode::Text(_) => found.push(current),
                XmlNode::Element(e) => stack.extend(e.children.iter().rev().copied()),
            }
        }
        found
    }

    /// Text nodes below `id` with the child slot linking each one in, in
    /// document order. A text node at `id` itself has no slot and is skipped.
    pub fn text_slots(&self, id: NodeId) -> Vec<TextSlot> {
        let mut found = Vec::new();
        self.collect_slots(id, &mut found);
        found
    }

    fn collect_slots(&self, parent: NodeId, out: &mut Vec<TextSlot>) {
        for (index, child) in self.children(parent).iter().enumerate() {
            match self.node(*child) {
                XmlNode::Text(_) => out.push(TextSlot {
                    parent,
                    index,
                    node: *child,
                }),
                XmlNode::Element(_) => self.collect_slots(*child, out),
            }
        }
    }

    /// Parent of `target`, found by walking from the root.
    pub fn parent(&self, target: NodeId) -> Option<NodeId> {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let children = self.children(id);
            if children.contains(&target) {
                return Some(id);
            }
            stack.extend(children.iter().copied());
        }
        None
    }

    /// True if `target` is reachable from the root.
    pub fn is_attached(&self, target: NodeId) -> bool {
        target == self.root || self.parent(target).is_some()
    }

    /// Copy the subtree rooted at `id` into fresh nodes and return the new root.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        match self.node(id).clone() {
            XmlNode::Text(t) => self.add_text(t),
            XmlNode::Element(mut e) => {
                e.children = e
                    .children
                    .iter()
                    .map(|child| self.deep_clone(*child))
                    .collect();
                self.add_element(e)
            }
        }
    }

    /// Swap `target` for `replacement` wherever it is linked in the tree.
    ///
    /// Walks the whole tree from the root and rebinds only the child slots
    /// holding exactly `target`. Returns `false` if `target` was not found.
    pub fn replace(&mut self, target: NodeId, replacement: NodeId) -> bool {
        if self.root == target {
            self.root = replacement;
            return true;
        }
        self.replace_within(self.root, target, replacement)
    }

    /// Rebind child `index` of `parent` to `replacement`.
    ///
    /// Constant time. Returns `false` if `parent` has no such child slot.
    pub fn replace_child(&mut self, parent: NodeId, index: usize, replacement: NodeId) -> bool {
        match &mut self.nodes[parent.0] {
            XmlNode::Element(e) => match e.children.get_mut(index) {
                Some(slot) => {
                    *slot = replacement;
                    true
                }
                None => false,
            },
            XmlNode::Text(_) => false,
        }
    }

    /// Like [`XmlTree::replace`], but walks from `scope` instead of the root.
    ///
    /// Used on subtrees that are not attached yet, such as freshly cloned
    /// rows. `scope` itself is never replaced.
    pub fn replace_within(&mut self, scope: NodeId, target: NodeId, replacement: NodeId) -> bool {
        let mut replaced = false;
        let mut stack = vec![scope];
        while let Some(id) = stack.pop() {
            if let XmlNode::Element(e) = &mut self.nodes[id.0] {
                for child in e.children.iter_mut() {
                    if *child == target {
                        *child = replacement;
                        replaced = true;
                    } else {
                        stack.push(*child);
                    }
                }
            }
        }
        replaced
    }
}
