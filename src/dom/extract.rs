//! Range content extraction (`Range.extractContents`)
//!
//! Boundary text nodes are split first so both boundaries sit on node
//! edges. Nodes fully inside the range are moved into the fragment;
//! elements only partially inside it are shallow-cloned into the fragment
//! and receive the contained part of their children, while the original
//! element keeps the rest.

use super::document::{Document, DomError, NodeId};
use super::range::{DomRange, TextSplit};

/// Result of extracting a range from the tree
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Detached top-level nodes, in document order
    pub fragment: Vec<NodeId>,
    /// Where the collapsed range now sits: under `parent`, before `reference`
    pub parent: NodeId,
    pub reference: Option<NodeId>,
    /// Text splits performed, in order
    pub splits: Vec<TextSplit>,
}

impl Document {
    /// Remove the contents of a text-bounded range from the tree
    pub fn extract_contents(&mut self, range: &DomRange) -> Result<Extraction, DomError> {
        for point in [&range.start, &range.end] {
            if !self.is_text(point.node) {
                return Err(DomError::NotText(point.node));
            }
        }
        if !range.is_valid_text_range(self) {
            return Err(DomError::InvalidRange);
        }

        let mut splits = Vec::with_capacity(2);
        let (first, last) = if range.is_single_node() {
            let end = self.split_text(range.start.node, range.end.offset)?;
            let start = self.split_text(range.start.node, range.start.offset)?;
            splits.push(end);
            splits.push(start);
            (start.tail, start.tail)
        } else {
            let end = self.split_text(range.end.node, range.end.offset)?;
            let start = self.split_text(range.start.node, range.start.offset)?;
            splits.push(end);
            splits.push(start);
            (start.tail, range.end.node)
        };

        if first == last {
            let parent = self.parent(first).ok_or(DomError::NoParent(first))?;
            let reference = self.next_sibling(first);
            self.detach(first)?;
            return Ok(Extraction {
                fragment: vec![first],
                parent,
                reference,
                splits,
            });
        }

        let parent = self
            .common_ancestor(first, last)
            .ok_or(DomError::InvalidRange)?;
        let start_top = self.child_toward(parent, first).ok_or(DomError::InvalidRange)?;
        let end_top = self.child_toward(parent, last).ok_or(DomError::InvalidRange)?;
        let reference = if end_top == last {
            self.next_sibling(last)
        } else {
            Some(end_top)
        };

        let siblings = self.children(parent).to_vec();
        let from = self.index_in_parent(start_top).ok_or(DomError::NoParent(start_top))?;
        let to = self.index_in_parent(end_top).ok_or(DomError::NoParent(end_top))?;
        let middle: Vec<NodeId> = siblings[from + 1..to].to_vec();

        let mut fragment = Vec::with_capacity(middle.len() + 2);
        if start_top == first {
            fragment.push(first);
        } else {
            let clone = self.clone_shallow(start_top)?;
            self.extract_tail(start_top, first, clone)?;
            fragment.push(clone);
        }
        fragment.extend(middle);
        if end_top == last {
            fragment.push(last);
        } else {
            let clone = self.clone_shallow(end_top)?;
            self.extract_head(end_top, last, clone)?;
            fragment.push(clone);
        }

        for node in &fragment {
            self.detach(*node)?;
        }

        Ok(Extraction {
            fragment,
            parent,
            reference,
            splits,
        })
    }

    /// Move `target` and everything after it inside `ancestor` into `into`
    fn extract_tail(&mut self, ancestor: NodeId, target: NodeId, into: NodeId) -> Result<(), DomError> {
        let child = self.child_toward(ancestor, target).ok_or(DomError::InvalidRange)?;
        let idx = self.index_in_parent(child).ok_or(DomError::NoParent(child))?;
        let following: Vec<NodeId> = self.children(ancestor)[idx + 1..].to_vec();

        if child == target {
            self.append_child(into, target)?;
        } else {
            let clone = self.clone_shallow(child)?;
            self.append_child(into, clone)?;
            self.extract_tail(child, target, clone)?;
        }
        for node in following {
            self.append_child(into, node)?;
        }
        Ok(())
    }

    /// Move everything inside `ancestor` up to and including `target` into `into`
    fn extract_head(&mut self, ancestor: NodeId, target: NodeId, into: NodeId) -> Result<(), DomError> {
        let child = self.child_toward(ancestor, target).ok_or(DomError::InvalidRange)?;
        let idx = self.index_in_parent(child).ok_or(DomError::NoParent(child))?;
        let preceding: Vec<NodeId> = self.children(ancestor)[..idx].to_vec();

        for node in preceding {
            self.append_child(into, node)?;
        }
        if child == target {
            self.append_child(into, target)?;
        } else {
            let clone = self.clone_shallow(child)?;
            self.append_child(into, clone)?;
            self.extract_head(child, target, clone)?;
        }
        Ok(())
    }
}
