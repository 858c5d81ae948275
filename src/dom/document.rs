//! Document - arena-backed DOM tree
//!
//! Nodes live in a single `Vec` and are addressed by `NodeId`. Detached
//! nodes stay in the arena (like a DOM node nobody references), so a
//! `NodeId` is never invalidated by tree surgery, only moved.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::range::TextSplit;
use super::text::{utf16_len, utf16_to_byte};

// =============================================================================
// Types
// =============================================================================

/// Handle to a node in a `Document` arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Payload of a DOM node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Document,
    /// Tag names are stored lowercased
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Errors raised by tree operations
#[derive(Debug, Clone, PartialEq)]
pub enum DomError {
    UnknownNode(NodeId),
    NotText(NodeId),
    NotElement(NodeId),
    NoParent(NodeId),
    OffsetOutOfBounds { node: NodeId, offset: usize, len: usize },
    /// Inserting a node into itself or one of its descendants, or into a text node
    HierarchyRequest { parent: NodeId, child: NodeId },
    /// Range boundaries are reversed or live in different trees
    InvalidRange,
}

impl fmt::Display for DomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomError::UnknownNode(id) => write!(f, "Unknown node: {}", id.0),
            DomError::NotText(id) => write!(f, "Node {} is not a text node", id.0),
            DomError::NotElement(id) => write!(f, "Node {} is not an element", id.0),
            DomError::NoParent(id) => write!(f, "Node {} has no parent", id.0),
            DomError::OffsetOutOfBounds { node, offset, len } => {
                write!(f, "Offset {} out of bounds for node {} (length {})", offset, node.0, len)
            }
            DomError::HierarchyRequest { parent, child } => {
                write!(f, "Cannot insert node {} into node {}", child.0, parent.0)
            }
            DomError::InvalidRange => write!(f, "Invalid range"),
        }
    }
}

impl std::error::Error for DomError {}

// =============================================================================
// Document
// =============================================================================

/// Arena DOM tree rooted at a Document node
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes ever allocated, attached or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes.get_mut(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Comment(text.to_string()))
    }

    /// Copy a node without its children (`cloneNode(false)`)
    pub fn clone_shallow(&mut self, id: NodeId) -> Result<NodeId, DomError> {
        let data = self.node(id)?.data.clone();
        Ok(self.alloc(data))
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0).map(|n| &n.data)
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.data(id), Some(NodeData::Text(_)))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.data(id), Some(NodeData::Element { .. }))
    }

    /// Lowercased tag name of an element
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            Some(NodeData::Element { tag, .. }) => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn is_element_named(&self, id: NodeId, name: &str) -> bool {
        self.tag(id).is_some_and(|t| t.eq_ignore_ascii_case(name))
    }

    /// Character data of a text node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            Some(NodeData::Text(t)) => Some(t.as_str()),
            _ => None,
        }
    }

    /// Length of a text node in UTF-16 code units
    pub fn text_len(&self, id: NodeId) -> Option<usize> {
        self.text(id).map(utf16_len)
    }

    pub fn set_text(&mut self, id: NodeId, value: &str) -> Result<(), DomError> {
        match &mut self.node_mut(id)?.data {
            NodeData::Text(t) => {
                *t = value.to_string();
                Ok(())
            }
            _ => Err(DomError::NotText(id)),
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.data(id) {
            Some(NodeData::Element { attrs, .. }) => attrs
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        match self.data(id) {
            Some(NodeData::Element { attrs, .. }) => attrs,
            _ => &[],
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element { attrs, .. } => {
                let name = name.to_ascii_lowercase();
                match attrs.iter_mut().find(|(k, _)| *k == name) {
                    Some((_, v)) => *v = value.to_string(),
                    None => attrs.push((name, value.to_string())),
                }
                Ok(())
            }
            _ => Err(DomError::NotElement(id)),
        }
    }

    /// Remove an attribute, returning whether it was present
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<bool, DomError> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element { attrs, .. } => {
                let before = attrs.len();
                attrs.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
                Ok(attrs.len() != before)
            }
            _ => Err(DomError::NotElement(id)),
        }
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.0).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    /// Position of a node among its parent's children
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        self.children(parent).get(idx + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        idx.checked_sub(1).and_then(|i| self.children(parent).get(i).copied())
    }

    /// Proper ancestors, nearest first
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Whether the node is reachable from the document root
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.is_inclusive_ancestor(self.root, id)
    }

    /// Nearest common inclusive ancestor
    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        if self.is_inclusive_ancestor(a, b) {
            return Some(a);
        }
        self.ancestors(a).find(|anc| self.is_inclusive_ancestor(*anc, b))
    }

    /// The child of `ancestor` that contains `node` (or is `node`)
    pub fn child_toward(&self, ancestor: NodeId, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        loop {
            let parent = self.parent(current)?;
            if parent == ancestor {
                return Some(current);
            }
            current = parent;
        }
    }

    /// Document-order comparison of two nodes in the same tree
    pub fn compare_order(&self, a: NodeId, b: NodeId) -> Option<Ordering> {
        if a == b {
            return Some(Ordering::Equal);
        }
        let mut path_a: Vec<NodeId> = self.ancestors(a).collect();
        path_a.reverse();
        path_a.push(a);
        let mut path_b: Vec<NodeId> = self.ancestors(b).collect();
        path_b.reverse();
        path_b.push(b);

        if path_a.first() != path_b.first() {
            return None;
        }
        let shared = path_a
            .iter()
            .zip(path_b.iter())
            .take_while(|(x, y)| x == y)
            .count();
        match (path_a.get(shared), path_b.get(shared)) {
            // a is an ancestor of b: ancestors come first
            (None, _) => Some(Ordering::Less),
            (_, None) => Some(Ordering::Greater),
            (Some(x), Some(y)) => {
                let ix = self.index_in_parent(*x)?;
                let iy = self.index_in_parent(*y)?;
                Some(ix.cmp(&iy))
            }
        }
    }

    /// Pre-order walk of the subtree rooted at `id`, inclusive
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Text nodes of a subtree in document order
    pub fn text_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|n| self.is_text(*n))
            .collect()
    }

    /// Concatenated character data of every descendant text node
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(t) = self.text(id) {
            return t.to_string();
        }
        self.text_nodes(id)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    pub fn get_element_by_id(&self, value: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.attr(*n, "id") == Some(value))
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Remove a node from its parent. Detached nodes are left alone.
    pub fn detach(&mut self, id: NodeId) -> Result<(), DomError> {
        let parent = match self.node(id)?.parent {
            Some(p) => p,
            None => return Ok(()),
        };
        self.node_mut(parent)?.children.retain(|c| *c != id);
        self.node_mut(id)?.parent = None;
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` before `reference`, or at the end when
    /// `reference` is `None`. The child is detached from its old place first.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.node(child)?;
        match self.node(parent)?.data {
            NodeData::Text(_) | NodeData::Comment(_) => {
                return Err(DomError::HierarchyRequest { parent, child })
            }
            _ => {}
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        if let Some(r) = reference {
            if r == child {
                return Ok(());
            }
            if self.parent(r) != Some(parent) {
                return Err(DomError::HierarchyRequest { parent, child: r });
            }
        }

        self.detach(child)?;
        let idx = match reference {
            Some(r) => self.index_in_parent(r).ok_or(DomError::NoParent(r))?,
            None => self.children(parent).len(),
        };
        self.node_mut(parent)?.children.insert(idx, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Split a text node at a UTF-16 offset (`Text.splitText`).
    ///
    /// The original node keeps the head; the tail becomes a new text node
    /// inserted as its next sibling.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<TextSplit, DomError> {
        let text = self.text(id).ok_or(DomError::NotText(id))?.to_string();
        let byte = utf16_to_byte(&text, offset).ok_or(DomError::OffsetOutOfBounds {
            node: id,
            offset,
            len: utf16_len(&text),
        })?;
        let parent = self.parent(id).ok_or(DomError::NoParent(id))?;
        let next = self.next_sibling(id);

        let tail = self.create_text(&text[byte..]);
        self.set_text(id, &text[..byte])?;
        self.insert_before(parent, tail, next)?;

        Ok(TextSplit { node: id, offset, tail })
    }

    /// Drop empty text nodes and merge runs of adjacent ones (`Node.normalize`).
    ///
    /// Afterwards the subtree has the text-node layout an HTML parser would
    /// produce from its serialization.
    pub fn normalize(&mut self, id: NodeId) -> Result<(), DomError> {
        for text in self.text_nodes(id) {
            // merged into an earlier sibling
            if self.parent(text).is_none() {
                continue;
            }
            let mut data = self.text(text).unwrap_or_default().to_string();
            if data.is_empty() {
                self.detach(text)?;
                continue;
            }
            let mut merged = false;
            while let Some(next) = self.next_sibling(text).filter(|n| self.is_text(*n)) {
                data.push_str(self.text(next).unwrap_or_default());
                self.detach(next)?;
                merged = true;
            }
            if merged {
                self.set_text(text, &data)?;
            }
        }
        Ok(())
    }

    /// Move every child of `id` to its position and drop `id` from the tree
    pub fn unwrap_node(&mut self, id: NodeId) -> Result<(), DomError> {
        let parent = self.parent(id).ok_or(DomError::NoParent(id))?;
        let children = self.children(id).to_vec();
        for child in children {
            self.insert_before(parent, child, Some(id))?;
        }
        self.detach(id)
    }
}

/// Iterator over proper ancestors, nearest first
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(doc: &mut Document, text: &str) -> (NodeId, NodeId) {
        let p = doc.create_element("P");
        let t = doc.create_text(text);
        doc.append_child(doc.root(), p).unwrap();
        doc.append_child(p, t).unwrap();
        (p, t)
    }

    #[test]
    fn test_tags_are_lowercased() {
        let mut doc = Document::new();
        let (p, _) = paragraph(&mut doc, "x");
        assert_eq!(doc.tag(p), Some("p"));
        assert!(doc.is_element_named(p, "P"));
    }

    #[test]
    fn test_split_text_inserts_tail_after() {
        let mut doc = Document::new();
        let (p, t) = paragraph(&mut doc, "Hello world");
        let split = doc.split_text(t, 5).unwrap();

        assert_eq!(doc.text(t), Some("Hello"));
        assert_eq!(doc.text(split.tail), Some(" world"));
        assert_eq!(doc.children(p), &[t, split.tail]);
        assert_eq!(doc.text_content(p), "Hello world");
    }

    #[test]
    fn test_split_text_out_of_bounds() {
        let mut doc = Document::new();
        let (_, t) = paragraph(&mut doc, "abc");
        assert!(matches!(
            doc.split_text(t, 4),
            Err(DomError::OffsetOutOfBounds { len: 3, .. })
        ));
    }

    #[test]
    fn test_insert_into_descendant_is_rejected() {
        let mut doc = Document::new();
        let (p, t) = paragraph(&mut doc, "abc");
        let em = doc.create_element("em");
        doc.append_child(p, em).unwrap();
        assert!(doc.append_child(em, p).is_err());
        assert!(doc.append_child(t, em).is_err());
    }

    #[test]
    fn test_compare_order() {
        let mut doc = Document::new();
        let (p1, t1) = paragraph(&mut doc, "one");
        let (_, t2) = paragraph(&mut doc, "two");
        assert_eq!(doc.compare_order(t1, t2), Some(Ordering::Less));
        assert_eq!(doc.compare_order(t2, t1), Some(Ordering::Greater));
        assert_eq!(doc.compare_order(p1, t1), Some(Ordering::Less));

        let orphan = doc.create_text("x");
        assert_eq!(doc.compare_order(orphan, t1), None);
    }

    #[test]
    fn test_common_ancestor_and_child_toward() {
        let mut doc = Document::new();
        let (p, t) = paragraph(&mut doc, "He said ");
        let em = doc.create_element("em");
        let inner = doc.create_text("hello");
        doc.append_child(p, em).unwrap();
        doc.append_child(em, inner).unwrap();

        assert_eq!(doc.common_ancestor(t, inner), Some(p));
        assert_eq!(doc.child_toward(p, inner), Some(em));
        assert_eq!(doc.child_toward(p, t), Some(t));
    }

    #[test]
    fn test_unwrap_node_keeps_children_in_place() {
        let mut doc = Document::new();
        let (p, t) = paragraph(&mut doc, "a ");
        let b = doc.create_element("b");
        let inner = doc.create_text("bold");
        let tail = doc.create_text(" z");
        doc.append_child(p, b).unwrap();
        doc.append_child(b, inner).unwrap();
        doc.append_child(p, tail).unwrap();

        doc.unwrap_node(b).unwrap();
        assert_eq!(doc.children(p), &[t, inner, tail]);
        assert!(!doc.is_attached(b));
    }

    #[test]
    fn test_normalize_drops_empty_and_merges_adjacent() {
        let mut doc = Document::new();
        let (p, t) = paragraph(&mut doc, "Hello world");
        let head = doc.split_text(t, 0).unwrap();
        let b = doc.create_element("b");
        doc.insert_before(p, b, Some(head.tail)).unwrap();
        let empty = doc.create_text("");
        doc.append_child(p, empty).unwrap();
        let tail = doc.create_text("!");
        doc.append_child(p, tail).unwrap();
        // "", <b>, "Hello world", "", "!"

        doc.normalize(doc.root()).unwrap();
        assert_eq!(doc.children(p), &[b, head.tail]);
        assert_eq!(doc.text(head.tail), Some("Hello world!"));
        assert!(!doc.is_attached(t));
        assert!(!doc.is_attached(tail));
        assert_eq!(doc.text_content(p), "Hello world!");
    }

    #[test]
    fn test_attributes() {
        let mut doc = Document::new();
        let (p, t) = paragraph(&mut doc, "x");
        doc.set_attr(p, "ID", "first").unwrap();
        assert_eq!(doc.attr(p, "id"), Some("first"));
        assert_eq!(doc.get_element_by_id("first"), Some(p));
        assert!(doc.remove_attr(p, "id").unwrap());
        assert!(!doc.remove_attr(p, "id").unwrap());
        assert!(doc.set_attr(t, "id", "nope").is_err());
    }
}
