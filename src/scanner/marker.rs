//! Marker - wraps word ranges in synthetic marker elements
//!
//! A marker carries its encounter count as a run of repeated characters in
//! `data-times` (length == count) so stylesheets can react to it without a
//! numeric attribute. At most one marker is "selected": the `Marker` owns
//! the handle to it and moves the singleton id whenever the selection
//! changes.
//!
//! Wrapping extracts the range contents and reinserts them inside the new
//! element, which works for ranges that cross element boundaries
//! (`surroundContents` would not).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::config::MetConfig;
use super::indexer::WordRange;
use crate::dom::{BoundaryPoint, Document, DomError, DomRange, NodeId, TextSplit};

pub const TIMES_ATTR: &str = "data-times";

// =============================================================================
// Types
// =============================================================================

/// What a mark operation did to the tree
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MarkOutcome {
    pub marker: NodeId,
    /// False when an existing marker was updated in place
    pub created: bool,
    /// Text splits performed while wrapping; replay them on other ranges
    pub splits: Vec<TextSplit>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkError {
    /// Range boundaries must sit in text nodes
    BoundaryNotText(NodeId),
    /// Offsets no longer fit the nodes, or start comes after end
    StaleRange,
    /// Node is not a marker element
    NotMarker(NodeId),
    Dom(DomError),
}

impl fmt::Display for MarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkError::BoundaryNotText(id) => {
                write!(f, "Range boundary {} is not a text node", id.index())
            }
            MarkError::StaleRange => write!(f, "Range no longer matches the document"),
            MarkError::NotMarker(id) => write!(f, "Node {} is not a marker", id.index()),
            MarkError::Dom(e) => write!(f, "DOM error: {}", e),
        }
    }
}

impl std::error::Error for MarkError {}

impl From<DomError> for MarkError {
    fn from(e: DomError) -> Self {
        MarkError::Dom(e)
    }
}

// =============================================================================
// Marker
// =============================================================================

#[derive(Clone, Debug)]
pub struct Marker {
    tag: String,
    selected_id: String,
    times_char: char,
    color: String,
    selected: Option<NodeId>,
}

impl Default for Marker {
    fn default() -> Self {
        Self::new(&MetConfig::default())
    }
}

impl Marker {
    pub fn new(config: &MetConfig) -> Self {
        Self {
            tag: config.marker_tag.to_ascii_lowercase(),
            selected_id: config.selected_id.clone(),
            times_char: config.times_char,
            color: config.marker_color.clone(),
            selected: None,
        }
    }

    /// Handle to the currently selected marker
    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn is_marker(&self, doc: &Document, node: NodeId) -> bool {
        doc.is_element_named(node, &self.tag)
    }

    pub fn encode_times(&self, times: u32) -> String {
        std::iter::repeat(self.times_char).take(times as usize).collect()
    }

    /// Encounter count carried by a marker
    pub fn times(&self, doc: &Document, marker: NodeId) -> Option<u32> {
        if !self.is_marker(doc, marker) {
            return None;
        }
        let encoded = doc.attr(marker, TIMES_ATTR)?;
        Some(encoded.chars().count() as u32)
    }

    /// Mark a word range with its encounter count.
    ///
    /// On success `word.range` is re-anchored to the marker's contents, so
    /// marking the same `WordRange` again updates the marker in place.
    pub fn mark_range(
        &mut self,
        doc: &mut Document,
        word: &mut WordRange,
        selected: bool,
    ) -> Result<MarkOutcome, MarkError> {
        let outcome = self.mark(doc, &word.range, word.times, selected)?;
        if let Some(range) = self.contents_range(doc, outcome.marker) {
            word.range = range;
        }
        Ok(outcome)
    }

    /// Mark a user selection as the selected marker.
    ///
    /// A selection lying exactly over an existing marker reuses it and keeps
    /// its count; otherwise a new marker is created with `times`.
    pub fn mark_selected(
        &mut self,
        doc: &mut Document,
        range: &DomRange,
        times: u32,
    ) -> Result<MarkOutcome, MarkError> {
        match self.existing_marker(doc, range) {
            Some(marker) => {
                self.select(doc, marker)?;
                Ok(MarkOutcome {
                    marker,
                    created: false,
                    splits: Vec::new(),
                })
            }
            None => self.mark(doc, range, times, true),
        }
    }

    fn mark(
        &mut self,
        doc: &mut Document,
        range: &DomRange,
        times: u32,
        selected: bool,
    ) -> Result<MarkOutcome, MarkError> {
        for point in [&range.start, &range.end] {
            if !doc.is_text(point.node) {
                return Err(MarkError::BoundaryNotText(point.node));
            }
        }
        if !range.is_valid_text_range(doc) {
            return Err(MarkError::StaleRange);
        }

        let (marker, created, splits) = match self.existing_marker(doc, range) {
            Some(marker) => (marker, false, Vec::new()),
            None => {
                let (marker, splits) = self.wrap(doc, range)?;
                (marker, true, splits)
            }
        };

        self.set_times(doc, marker, times)?;
        if selected {
            self.select(doc, marker)?;
        }

        Ok(MarkOutcome {
            marker,
            created,
            splits,
        })
    }

    /// Extract the range and reinsert it inside a fresh marker element
    fn wrap(&self, doc: &mut Document, range: &DomRange) -> Result<(NodeId, Vec<TextSplit>), MarkError> {
        let extraction = doc.extract_contents(range)?;
        let marker = doc.create_element(&self.tag);
        for node in &extraction.fragment {
            doc.append_child(marker, *node)?;
        }
        doc.insert_before(extraction.parent, marker, extraction.reference)?;
        doc.set_attr(marker, "style", &format!("--met-color: {}", self.color))?;
        Ok((marker, extraction.splits))
    }

    /// The marker that already wraps exactly this range, if any
    fn existing_marker(&self, doc: &Document, range: &DomRange) -> Option<NodeId> {
        let marker = std::iter::once(range.start.node)
            .chain(doc.ancestors(range.start.node))
            .find(|n| self.is_marker(doc, *n))?;
        if !doc.is_inclusive_ancestor(marker, range.end.node) {
            return None;
        }
        let selected = range.text(doc)?;
        (selected == doc.text_content(marker)).then_some(marker)
    }

    /// Range spanning all text inside a marker
    fn contents_range(&self, doc: &Document, marker: NodeId) -> Option<DomRange> {
        let texts = doc.text_nodes(marker);
        let first = *texts.first()?;
        let last = *texts.last()?;
        Some(DomRange::new(
            BoundaryPoint::new(first, 0),
            BoundaryPoint::new(last, doc.text_len(last)?),
        ))
    }

    /// Rewrite a marker's encounter count in place
    pub fn set_times(&self, doc: &mut Document, marker: NodeId, times: u32) -> Result<(), MarkError> {
        if !self.is_marker(doc, marker) {
            return Err(MarkError::NotMarker(marker));
        }
        doc.set_attr(marker, TIMES_ATTR, &self.encode_times(times))?;
        Ok(())
    }

    /// Make `marker` the one selected marker
    pub fn select(&mut self, doc: &mut Document, marker: NodeId) -> Result<(), MarkError> {
        if !self.is_marker(doc, marker) {
            return Err(MarkError::NotMarker(marker));
        }
        self.clear_selection(doc);
        // the page may carry a stray element with our id
        if let Some(stray) = doc.get_element_by_id(&self.selected_id) {
            doc.remove_attr(stray, "id")?;
        }
        doc.set_attr(marker, "id", &self.selected_id)?;
        self.selected = Some(marker);
        Ok(())
    }

    /// Drop the selection flag, if any marker holds it
    pub fn clear_selection(&mut self, doc: &mut Document) {
        if let Some(previous) = self.selected.take() {
            if doc.attr(previous, "id") == Some(self.selected_id.as_str()) {
                // previous is an element with an id attribute, cannot fail
                let _ = doc.remove_attr(previous, "id");
            }
        }
    }

    /// Remove a marker, putting its contents back where it was
    pub fn unmark(&mut self, doc: &mut Document, marker: NodeId) -> Result<(), MarkError> {
        if !self.is_marker(doc, marker) {
            return Err(MarkError::NotMarker(marker));
        }
        if self.selected == Some(marker) {
            self.clear_selection(doc);
        }
        doc.unwrap_node(marker)?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
