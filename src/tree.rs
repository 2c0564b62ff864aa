//! Host tree abstraction.
//!
//! The engine never owns the element tree it queries. Hosts expose their tree through the
//! [`Tree`] trait: a handful of navigation primitives every host must provide, plus optional
//! bulk-lookup capabilities advertised through [`HostFeatures`]. The engine resolves the
//! features once per root document and only calls a capability method when the matching
//! flag is set.

use crate::error::{Result, SelectorError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Debug;
use std::hash::Hash;

/// Optional host capabilities.
///
/// Every flag defaults to `false`; a host without any capability is still fully queryable
/// through the navigation primitives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostFeatures {
    /// `Tree::elements_by_id` is implemented
    pub id_index: bool,
    /// `Tree::elements_by_tag` is implemented
    pub tag_index: bool,
    /// `Tree::elements_by_class` is implemented
    pub class_index: bool,
    /// `Tree::select_native` is implemented
    pub native_select: bool,
    /// `Tree::compare_position` is implemented
    pub comparator: bool,
}

impl HostFeatures {
    /// No optional capability at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// All bulk indexes and the position comparator, but no native selection.
    pub fn indexed() -> Self {
        Self {
            id_index: true,
            tag_index: true,
            class_index: true,
            native_select: false,
            comparator: true,
        }
    }
}

/// A host element tree.
///
/// Node handles are small copyable values (arena indices, pointers wrapped in newtypes, ...)
/// that identify a node within the tree for the duration of a query. Handles must be unique
/// within a document; documents are distinguished by [`Tree::document_id`].
///
/// The `'static` bound lets compiled matchers be cached inside an engine that is generic over
/// the host type.
pub trait Tree: 'static {
    /// Node handle.
    type Node: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;
    fn first_child(&self, node: Self::Node) -> Option<Self::Node>;
    fn last_child(&self, node: Self::Node) -> Option<Self::Node>;
    fn next_sibling(&self, node: Self::Node) -> Option<Self::Node>;
    fn previous_sibling(&self, node: Self::Node) -> Option<Self::Node>;

    /// Whether the node is an element (as opposed to a document, text or comment node).
    fn is_element(&self, node: Self::Node) -> bool;

    /// Whether the node is a text node.
    fn is_text(&self, node: Self::Node) -> bool;

    /// Element tag name; `None` for non-element nodes.
    fn local_name(&self, node: Self::Node) -> Option<&str>;

    /// Attribute value; `None` when the attribute is absent or the node is not an element.
    fn attribute(&self, node: Self::Node, name: &str) -> Option<&str>;

    /// Character data of a text node.
    fn text(&self, node: Self::Node) -> Option<&str>;

    /// Concatenated text of all descendant text nodes.
    fn text_content(&self, node: Self::Node) -> String {
        let mut out = String::new();
        let mut stack = Vec::new();
        let mut current = self.first_child(node);
        loop {
            while let Some(n) = current {
                if let Some(text) = self.text(n) {
                    out.push_str(text);
                }
                stack.push(n);
                current = self.first_child(n);
            }
            match stack.pop() {
                Some(n) => current = self.next_sibling(n),
                None => break,
            }
        }
        out
    }

    /// Identity of the document this tree belongs to.
    fn document_id(&self) -> u64 {
        0
    }

    /// Foreign (XML) trees compare tag names case-sensitively.
    fn is_xml(&self) -> bool {
        false
    }

    /// Optional capabilities this host implements.
    fn features(&self) -> HostFeatures {
        HostFeatures::none()
    }

    /// Descendant elements of `scope` whose `id` attribute equals `id`, in document order.
    fn elements_by_id(&self, _scope: Self::Node, _id: &str) -> Vec<Self::Node> {
        Vec::new()
    }

    /// Descendant elements of `scope` with the given tag name, in document order.
    fn elements_by_tag(&self, _scope: Self::Node, _name: &str) -> Vec<Self::Node> {
        Vec::new()
    }

    /// Descendant elements of `scope` carrying the given class, in document order.
    fn elements_by_class(&self, _scope: Self::Node, _class: &str) -> Vec<Self::Node> {
        Vec::new()
    }

    /// Host-native bulk selection relative to `scope`.
    ///
    /// Errors are treated by the engine as a fast-path miss, never as a query failure.
    fn select_native(&self, _scope: Self::Node, query: &str) -> Result<Vec<Self::Node>> {
        Err(SelectorError::Host(format!(
            "native selection unavailable for '{query}'"
        )))
    }

    /// Relative document position of two nodes; `None` when they share no root.
    fn compare_position(&self, _a: Self::Node, _b: Self::Node) -> Option<Ordering> {
        None
    }
}

/// Parent of `node` if that parent is an element.
pub fn parent_element<T: Tree>(tree: &T, node: T::Node) -> Option<T::Node> {
    tree.parent(node).filter(|&p| tree.is_element(p))
}

/// Closest preceding sibling that is an element.
pub fn previous_element_sibling<T: Tree>(tree: &T, node: T::Node) -> Option<T::Node> {
    let mut current = tree.previous_sibling(node);
    while let Some(n) = current {
        if tree.is_element(n) {
            return Some(n);
        }
        current = tree.previous_sibling(n);
    }
    None
}

/// Closest following sibling that is an element.
pub fn next_element_sibling<T: Tree>(tree: &T, node: T::Node) -> Option<T::Node> {
    let mut current = tree.next_sibling(node);
    while let Some(n) = current {
        if tree.is_element(n) {
            return Some(n);
        }
        current = tree.next_sibling(n);
    }
    None
}

/// Topmost ancestor of `node` (the node itself when detached).
pub fn root_of<T: Tree>(tree: &T, node: T::Node) -> T::Node {
    let mut current = node;
    while let Some(parent) = tree.parent(current) {
        current = parent;
    }
    current
}

/// Whether `node` is a strict descendant of `ancestor`.
pub fn contains<T: Tree>(tree: &T, ancestor: T::Node, node: T::Node) -> bool {
    let mut current = tree.parent(node);
    while let Some(n) = current {
        if n == ancestor {
            return true;
        }
        current = tree.parent(n);
    }
    false
}

/// All element descendants of `scope` in document order, excluding `scope` itself.
pub fn descendant_elements<T: Tree>(tree: &T, scope: T::Node) -> Vec<T::Node> {
    let mut out = Vec::new();
    let mut current = tree.first_child(scope);
    while let Some(node) = current {
        if tree.is_element(node) {
            out.push(node);
        }
        current = next_in_preorder(tree, node, scope);
    }
    out
}

/// Next node after `node` in a preorder walk bounded by `scope`.
pub fn next_in_preorder<T: Tree>(tree: &T, node: T::Node, scope: T::Node) -> Option<T::Node> {
    if let Some(child) = tree.first_child(node) {
        return Some(child);
    }
    let mut current = node;
    loop {
        if current == scope {
            return None;
        }
        if let Some(sibling) = tree.next_sibling(current) {
            return Some(sibling);
        }
        current = tree.parent(current)?;
    }
}

/// Whether the element has the tag `name`, honouring XML case sensitivity.
pub fn has_tag<T: Tree>(tree: &T, node: T::Node, name: &str, xml: bool) -> bool {
    match tree.local_name(node) {
        Some(tag) if xml => tag == name,
        Some(tag) => tag.eq_ignore_ascii_case(name),
        None => false,
    }
}
