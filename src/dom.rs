//! Reference arena tree.
//!
//! [`Document`] is a small arena-allocated element tree implementing every [`Tree`]
//! capability. It is what the tests, benches and demo query against, and it doubles as a
//! worked example for hosts wiring their own tree into the engine.
//!
//! Nodes are addressed by [`NodeId`] (a 4-byte arena index). Node 0 is always the document
//! node; elements created with [`Document::create_element`] start detached and are placed
//! with [`Document::append_child`].
//!
//! # Example
//!
//! ```rust
//! use selector_engine::dom::Document;
//!
//! let doc = Document::from_yaml_str(r#"
//! tag: ul
//! children:
//!   - { tag: li, class: first, text: one }
//!   - { tag: li, text: two }
//! "#).unwrap();
//! assert_eq!(doc.elements().count(), 3);
//! ```

use crate::error::{Result, SelectorError};
use crate::tree::{self, HostFeatures, Tree};
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

fn next_document_id() -> u64 {
    NEXT_DOCUMENT_ID.fetch_add(1, AtomicOrdering::Relaxed)
}

/// Arena index of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// The document node of every [`Document`].
    pub const DOCUMENT: NodeId = NodeId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Node-specific data
#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

/// Element-specific data
#[derive(Debug, Clone)]
pub struct ElementData {
    /// Tag name as written
    pub name: String,
    /// Attributes in insertion order
    pub attrs: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    data: NodeData,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            data,
        }
    }
}

/// Host-native selection hook installed with [`Document::with_native_select`].
pub type NativeSelectFn = Arc<dyn Fn(&Document, NodeId, &str) -> Result<Vec<NodeId>> + Send + Sync>;

/// Arena-based element tree.
#[derive(Clone)]
pub struct Document {
    id: u64,
    nodes: Vec<Node>,
    xml: bool,
    features: HostFeatures,
    native_select: Option<NativeSelectFn>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("nodes", &self.nodes.len())
            .field("xml", &self.xml)
            .field("features", &self.features)
            .field("native_select", &self.native_select.is_some())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty HTML document with every index capability enabled.
    pub fn new() -> Self {
        Self {
            id: next_document_id(),
            nodes: vec![Node::new(NodeData::Document)],
            xml: false,
            features: HostFeatures::indexed(),
            native_select: None,
        }
    }

    /// Create an empty XML document; tag and attribute names are case-sensitive.
    pub fn new_xml() -> Self {
        Self {
            xml: true,
            ..Self::new()
        }
    }

    /// Replace the advertised capabilities.
    ///
    /// The document gets a fresh identity so engines re-resolve their adapter.
    pub fn with_features(mut self, features: HostFeatures) -> Self {
        self.features = HostFeatures {
            native_select: features.native_select && self.native_select.is_some(),
            ..features
        };
        self.id = next_document_id();
        self
    }

    /// Install a native bulk-selection hook and advertise it.
    pub fn with_native_select<F>(mut self, select: F) -> Self
    where
        F: Fn(&Document, NodeId, &str) -> Result<Vec<NodeId>> + Send + Sync + 'static,
    {
        self.native_select = Some(Arc::new(select));
        self.features.native_select = true;
        self.id = next_document_id();
        self
    }

    /// The document node.
    pub fn root(&self) -> NodeId {
        NodeId::DOCUMENT
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Create a detached element.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Element(ElementData {
            name: name.to_string(),
            attrs: Vec::new(),
        }))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    /// Create a detached comment node.
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Comment(text.to_string()))
    }

    /// Append `child` as the last child of `parent`, detaching it first if needed.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let len = self.nodes.len();
        if parent == child || child.index() >= len || parent.index() >= len {
            return;
        }
        self.detach(child);

        let last = self.nodes[parent.index()].last_child;
        {
            let node = &mut self.nodes[child.index()];
            node.parent = Some(parent);
            node.prev_sibling = last;
            node.next_sibling = None;
        }
        match last {
            Some(last) => self.nodes[last.index()].next_sibling = Some(child),
            None => self.nodes[parent.index()].first_child = Some(child),
        }
        self.nodes[parent.index()].last_child = Some(child);
    }

    /// Remove a node (and its subtree) from its parent; the subtree stays in the arena.
    pub fn detach(&mut self, node: NodeId) {
        let Some(n) = self.node(node) else {
            return;
        };
        let (parent, prev, next) = (n.parent, n.prev_sibling, n.next_sibling);
        let Some(parent) = parent else {
            return;
        };

        match prev {
            Some(prev) => self.nodes[prev.index()].next_sibling = next,
            None => self.nodes[parent.index()].first_child = next,
        }
        match next {
            Some(next) => self.nodes[next.index()].prev_sibling = prev,
            None => self.nodes[parent.index()].last_child = prev,
        }

        let n = &mut self.nodes[node.index()];
        n.parent = None;
        n.prev_sibling = None;
        n.next_sibling = None;
    }

    /// Create an element with attributes and append it to `parent`.
    pub fn append_element(&mut self, parent: NodeId, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let element = self.create_element(name);
        for (attr, value) in attrs {
            self.set_attribute(element, attr, value);
        }
        self.append_child(parent, element);
        element
    }

    /// Create a text node and append it to `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let node = self.create_text(text);
        self.append_child(parent, node);
        node
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let xml = self.xml;
        let Some(NodeData::Element(element)) = self.nodes.get_mut(node.index()).map(|n| &mut n.data)
        else {
            return;
        };
        match element
            .attrs
            .iter_mut()
            .find(|(existing, _)| names_equal(existing, name, xml))
        {
            Some(slot) => slot.1 = value.to_string(),
            None => element.attrs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) {
        let xml = self.xml;
        let data = self.nodes.get_mut(node.index()).map(|n| &mut n.data);
        if let Some(NodeData::Element(element)) = data {
            element.attrs.retain(|(existing, _)| !names_equal(existing, name, xml));
        }
    }

    pub fn data(&self, node: NodeId) -> Option<&NodeData> {
        self.node(node).map(|n| &n.data)
    }

    /// Every element attached below the document node, in document order.
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        tree::descendant_elements(self, NodeId::DOCUMENT).into_iter()
    }

    /// First element in document order whose `id` attribute equals `id`.
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.elements().find(|&e| self.attribute(e, "id") == Some(id))
    }

    /// Build a document from a YAML fixture.
    ///
    /// The fixture is either one node or a list of nodes appended under the document node.
    /// Each node has a `tag`, optional `id`, `class`, `attrs` and `text` (a leading text
    /// child), and `children`. A node without a tag is a text node carrying `text`.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let fixture: Fixture = serde_yaml::from_str(yaml)?;
        let mut doc = Document::new();
        let root = doc.root();
        match fixture {
            Fixture::One(spec) => {
                doc.build(root, &spec)?;
            }
            Fixture::Many(specs) => {
                for spec in &specs {
                    doc.build(root, spec)?;
                }
            }
        }
        Ok(doc)
    }

    /// Append the subtree described by `spec` under `parent`.
    pub fn build(&mut self, parent: NodeId, spec: &NodeSpec) -> Result<NodeId> {
        let Some(tag) = spec.tag.as_deref() else {
            return match spec.text.as_deref() {
                Some(text) => Ok(self.append_text(parent, text)),
                None => Err(SelectorError::Config(
                    "fixture node needs a tag or text".to_string(),
                )),
            };
        };

        let element = self.create_element(tag);
        if let Some(id) = &spec.id {
            self.set_attribute(element, "id", id);
        }
        if let Some(class) = &spec.class {
            self.set_attribute(element, "class", class);
        }
        for (name, value) in &spec.attrs {
            self.set_attribute(element, name, value);
        }
        self.append_child(parent, element);

        if let Some(text) = &spec.text {
            self.append_text(element, text);
        }
        for child in &spec.children {
            self.build(element, child)?;
        }
        Ok(element)
    }

    fn element_data(&self, node: NodeId) -> Option<&ElementData> {
        match self.data(node)? {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    fn depth(&self, node: NodeId) -> usize {
        let mut depth = 0;
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            depth += 1;
            current = parent;
        }
        depth
    }

    fn filter_descendants(
        &self,
        scope: NodeId,
        keep: impl Fn(&ElementData) -> bool,
    ) -> Vec<NodeId> {
        tree::descendant_elements(self, scope)
            .into_iter()
            .filter(|&e| self.element_data(e).is_some_and(&keep))
            .collect()
    }
}

fn names_equal(a: &str, b: &str, xml: bool) -> bool {
    if xml {
        a == b
    } else {
        a.eq_ignore_ascii_case(b)
    }
}

/// One node of a YAML fixture.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodeSpec {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub class: Option<String>,
    pub attrs: BTreeMap<String, String>,
    pub text: Option<String>,
    pub children: Vec<NodeSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Fixture {
    Many(Vec<NodeSpec>),
    One(NodeSpec),
}

impl Tree for Document {
    type Node = NodeId;

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.first_child
    }

    fn last_child(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.last_child
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.next_sibling
    }

    fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.prev_sibling
    }

    fn is_element(&self, node: NodeId) -> bool {
        matches!(self.data(node), Some(NodeData::Element(_)))
    }

    fn is_text(&self, node: NodeId) -> bool {
        matches!(self.data(node), Some(NodeData::Text(_)))
    }

    fn local_name(&self, node: NodeId) -> Option<&str> {
        self.element_data(node).map(|e| e.name.as_str())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element_data(node)?
            .attrs
            .iter()
            .find(|(attr, _)| names_equal(attr, name, self.xml))
            .map(|(_, value)| value.as_str())
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        match self.data(node)? {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    fn document_id(&self) -> u64 {
        self.id
    }

    fn is_xml(&self) -> bool {
        self.xml
    }

    fn features(&self) -> HostFeatures {
        self.features
    }

    fn elements_by_id(&self, scope: NodeId, id: &str) -> Vec<NodeId> {
        self.filter_descendants(scope, |e| {
            e.attrs
                .iter()
                .any(|(name, value)| names_equal(name, "id", self.xml) && value == id)
        })
    }

    fn elements_by_tag(&self, scope: NodeId, name: &str) -> Vec<NodeId> {
        if name == "*" {
            return tree::descendant_elements(self, scope);
        }
        self.filter_descendants(scope, |e| names_equal(&e.name, name, self.xml))
    }

    fn elements_by_class(&self, scope: NodeId, class: &str) -> Vec<NodeId> {
        self.filter_descendants(scope, |e| {
            e.attrs.iter().any(|(name, value)| {
                names_equal(name, "class", self.xml)
                    && value.split_ascii_whitespace().any(|c| c == class)
            })
        })
    }

    fn select_native(&self, scope: NodeId, query: &str) -> Result<Vec<NodeId>> {
        match &self.native_select {
            Some(select) => select(self, scope, query),
            None => Err(SelectorError::Host(format!(
                "no native selection installed for '{query}'"
            ))),
        }
    }

    fn compare_position(&self, a: NodeId, b: NodeId) -> Option<Ordering> {
        if a == b {
            return Some(Ordering::Equal);
        }

        // Bring both nodes to the same depth; an ancestor precedes its descendants.
        let (mut x, mut y) = (a, b);
        let (mut dx, mut dy) = (self.depth(a), self.depth(b));
        while dx > dy {
            x = self.parent(x)?;
            dx -= 1;
            if x == b {
                return Some(Ordering::Greater);
            }
        }
        while dy > dx {
            y = self.parent(y)?;
            dy -= 1;
            if y == a {
                return Some(Ordering::Less);
            }
        }

        // Climb in lockstep until the two chains meet under a common parent.
        loop {
            let (px, py) = (self.parent(x), self.parent(y));
            if px == py {
                px?;
                break;
            }
            x = px?;
            y = py?;
        }

        let mut sibling = self.next_sibling(x);
        while let Some(s) = sibling {
            if s == y {
                return Some(Ordering::Less);
            }
            sibling = self.next_sibling(s);
        }
        Some(Ordering::Greater)
    }
}
