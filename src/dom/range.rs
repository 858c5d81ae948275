//! DomRange - a span between two boundary points
//!
//! Unlike a browser `Range`, a `DomRange` is a plain value: it does not
//! follow the tree when the tree changes. Callers that mutate the tree while
//! holding ranges replay the `TextSplit`s they caused through `track()`,
//! which applies the same adjustment a live range gets from `splitText`.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::document::{Document, NodeId};
use super::text::{slice_utf16, utf16_to_byte};

/// A position inside a node: UTF-16 offset for text, child index otherwise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryPoint {
    pub node: NodeId,
    pub offset: usize,
}

impl BoundaryPoint {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }

    fn track(&mut self, split: &TextSplit) {
        if self.node == split.node && self.offset > split.offset {
            self.node = split.tail;
            self.offset -= split.offset;
        }
    }
}

/// Record of a `Document::split_text` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSplit {
    /// The node that was split (keeps the head)
    pub node: NodeId,
    /// UTF-16 offset the split happened at
    pub offset: usize,
    /// Newly created node holding the tail
    pub tail: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomRange {
    pub start: BoundaryPoint,
    pub end: BoundaryPoint,
}

impl DomRange {
    pub fn new(start: BoundaryPoint, end: BoundaryPoint) -> Self {
        Self { start, end }
    }

    /// A range within a single text node
    pub fn in_text(node: NodeId, start: usize, end: usize) -> Self {
        Self {
            start: BoundaryPoint::new(node, start),
            end: BoundaryPoint::new(node, end),
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn is_single_node(&self) -> bool {
        self.start.node == self.end.node
    }

    /// Both boundary containers are text nodes
    pub fn is_text_bounded(&self, doc: &Document) -> bool {
        doc.is_text(self.start.node) && doc.is_text(self.end.node)
    }

    /// Check that both boundaries are text nodes holding their offsets and
    /// that start does not come after end
    pub fn is_valid_text_range(&self, doc: &Document) -> bool {
        let fits = |p: &BoundaryPoint| {
            doc.text(p.node)
                .is_some_and(|t| utf16_to_byte(t, p.offset).is_some())
        };
        if !fits(&self.start) || !fits(&self.end) {
            return false;
        }
        match doc.compare_order(self.start.node, self.end.node) {
            Some(Ordering::Equal) => self.start.offset <= self.end.offset,
            Some(Ordering::Less) => true,
            _ => false,
        }
    }

    /// Apply the live-range adjustment for a text split
    pub fn track(&mut self, split: &TextSplit) {
        self.start.track(split);
        self.end.track(split);
    }

    /// Selected character data (`Range.toString()`) for text-bounded ranges
    pub fn text(&self, doc: &Document) -> Option<String> {
        if !self.is_valid_text_range(doc) {
            return None;
        }
        if self.is_single_node() {
            let data = doc.text(self.start.node)?;
            return slice_utf16(data, self.start.offset, self.end.offset).map(str::to_string);
        }

        let scope = doc.common_ancestor(self.start.node, self.end.node)?;
        let mut out = String::new();
        let mut inside = false;
        for node in doc.text_nodes(scope) {
            let data = doc.text(node)?;
            if node == self.start.node {
                let from = utf16_to_byte(data, self.start.offset)?;
                out.push_str(&data[from..]);
                inside = true;
            } else if node == self.end.node {
                let to = utf16_to_byte(data, self.end.offset)?;
                out.push_str(&data[..to]);
                break;
            } else if inside {
                out.push_str(data);
            }
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_moves_boundaries_past_split() {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        let t = doc.create_text("Hello world.");
        doc.append_child(doc.root(), p).unwrap();
        doc.append_child(p, t).unwrap();

        let mut hello = DomRange::in_text(t, 0, 5);
        let mut world = DomRange::in_text(t, 6, 11);

        let split = doc.split_text(t, 5).unwrap();
        hello.track(&split);
        world.track(&split);

        assert_eq!(hello, DomRange::in_text(t, 0, 5));
        assert_eq!(world, DomRange::in_text(split.tail, 1, 6));
        assert_eq!(world.text(&doc).as_deref(), Some("world"));
    }

    #[test]
    fn test_text_across_nodes() {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        let a = doc.create_text("He said ");
        let em = doc.create_element("em");
        let b = doc.create_text("hello");
        let c = doc.create_text(" to me.");
        doc.append_child(doc.root(), p).unwrap();
        doc.append_child(p, a).unwrap();
        doc.append_child(p, em).unwrap();
        doc.append_child(em, b).unwrap();
        doc.append_child(p, c).unwrap();

        let range = DomRange::new(BoundaryPoint::new(a, 3), BoundaryPoint::new(c, 3));
        assert_eq!(range.text(&doc).as_deref(), Some("said hello to"));
    }

    #[test]
    fn test_reversed_range_is_invalid() {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        let a = doc.create_text("one");
        let b = doc.create_text("two");
        doc.append_child(doc.root(), p).unwrap();
        doc.append_child(p, a).unwrap();
        doc.append_child(p, b).unwrap();

        let range = DomRange::new(BoundaryPoint::new(b, 0), BoundaryPoint::new(a, 1));
        assert!(!range.is_valid_text_range(&doc));
        assert!(range.text(&doc).is_none());
        assert!(!DomRange::in_text(a, 2, 1).is_valid_text_range(&doc));
    }
}
