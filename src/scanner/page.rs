//! Page - the per-page pipeline
//!
//! Owns the document and the components that work on it:
//!
//! ```text
//! annotate:  index ─► cross-reference with Meets ─► mark in indexing order
//! select:    qualify ─► find anchor block ─► mark as selected ─► scene
//! plus_one:  selected marker times + 1 ─► scene
//! know:      selected marker times = 0
//! ```
//!
//! The selected marker is remembered by handle, so scene extraction after a
//! mutation never depends on the (now stale) selection range.
//!
//! Every mutating operation leaves the tree normalized: no empty text nodes
//! and no adjacent ones. Text-node ordinals therefore match a fresh parse of
//! `html()`, which is the page the content script puts back into the tab.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::config::MetConfig;
use super::indexer::{RangeIndexer, WordRanges};
use super::marker::{MarkError, Marker};
use super::meets::Meets;
use super::scene::{Scene, SceneError, SceneExtractor};
use super::selection::{qualify_selection, SelectionError};
use super::tokenize::Tokenizer;
use crate::dom::{Document, DomRange, NodeId};

// =============================================================================
// Types
// =============================================================================

/// Counts from one annotation pass
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AnnotateStats {
    /// Distinct words found on the page
    pub indexed: usize,
    /// Of those, words present in the known-words map
    pub known: usize,
    /// Marker elements created
    pub marked: usize,
    /// Existing markers whose count was updated
    pub refreshed: usize,
}

/// A word the user interacted with and the sentence it sits in
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Encounter {
    pub word: String,
    pub times: u32,
    pub scene: Scene,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageError {
    Selection(SelectionError),
    Mark(MarkError),
    Scene(SceneError),
    /// No marker is currently selected
    NothingSelected,
    NotLoaded,
    UnknownTextNode(usize),
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageError::Selection(e) => write!(f, "{}", e),
            PageError::Mark(e) => write!(f, "{}", e),
            PageError::Scene(e) => write!(f, "{}", e),
            PageError::NothingSelected => write!(f, "No word is selected"),
            PageError::NotLoaded => write!(f, "No page is loaded"),
            PageError::UnknownTextNode(n) => write!(f, "Page has no text node #{}", n),
        }
    }
}

impl std::error::Error for PageError {}

impl From<SelectionError> for PageError {
    fn from(e: SelectionError) -> Self {
        PageError::Selection(e)
    }
}

impl From<MarkError> for PageError {
    fn from(e: MarkError) -> Self {
        PageError::Mark(e)
    }
}

impl From<SceneError> for PageError {
    fn from(e: SceneError) -> Self {
        PageError::Scene(e)
    }
}

#[derive(Clone, Copy, Debug)]
struct ActiveSelection {
    marker: NodeId,
    anchor: NodeId,
}

// =============================================================================
// Page
// =============================================================================

pub struct Page {
    document: Document,
    tokenizer: Tokenizer,
    indexer: RangeIndexer,
    marker: Marker,
    extractor: SceneExtractor,
    active: Option<ActiveSelection>,
}

impl Page {
    pub fn new(mut document: Document, config: &MetConfig) -> Self {
        let root = document.root();
        // ids come from the tree itself, cannot fail
        let _ = document.normalize(root);
        Self {
            document,
            tokenizer: Tokenizer::new(config.min_word_len),
            indexer: RangeIndexer::new(config),
            marker: Marker::new(config),
            extractor: SceneExtractor::new(config),
            active: None,
        }
    }

    pub fn from_html(html: &str, config: &MetConfig) -> Self {
        Self::new(Document::parse_html(html), config)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Serialized page
    pub fn html(&self) -> String {
        self.document.inner_html(self.document.root())
    }

    /// The `ordinal`-th text node in document order, counted over the
    /// current `html()`
    pub fn text_node(&self, ordinal: usize) -> Option<NodeId> {
        self.document.text_nodes(self.document.root()).get(ordinal).copied()
    }

    /// Currently selected marker element
    pub fn selected_marker(&self) -> Option<NodeId> {
        self.active.map(|a| a.marker)
    }

    /// Index every distinct word on the page
    pub fn scan(&self) -> WordRanges {
        self.indexer.index(&self.document, self.document.root())
    }

    /// Mark every known word at its first occurrence.
    ///
    /// Markers left by an earlier pass are skipped by the indexer; their
    /// counts are brought up to date instead.
    pub fn annotate(&mut self, meets: &Meets) -> Result<AnnotateStats, MarkError> {
        let (refreshed, already_marked) = self.refresh_markers(meets)?;
        let mut ranges = self.scan();
        let indexed = ranges.len();
        ranges.cross_reference(meets);
        ranges.retain(|word| !already_marked.contains(&word.name));

        let mut marked = 0;
        for i in 0..ranges.len() {
            let word = &mut ranges.as_mut_slice()[i];
            let outcome = self.marker.mark_range(&mut self.document, word, false)?;
            // later ranges may sit in text nodes this mark just split
            ranges.track(i + 1, &outcome.splits);
            if outcome.created {
                marked += 1;
            }
        }
        self.normalize()?;

        Ok(AnnotateStats {
            indexed,
            known: ranges.len(),
            marked,
            refreshed,
        })
    }

    /// Bring marker counts in line with `meets`; returns how many changed
    /// and the words already marked on the page
    fn refresh_markers(&mut self, meets: &Meets) -> Result<(usize, HashSet<String>), MarkError> {
        let markers: Vec<NodeId> = self
            .document
            .descendants(self.document.root())
            .into_iter()
            .filter(|n| self.marker.is_marker(&self.document, *n))
            .collect();

        let mut refreshed = 0;
        let mut words = HashSet::with_capacity(markers.len());
        for marker in markers {
            let word = self.word_of(marker);
            if let Some(times) = meets.times(&word) {
                if self.marker.times(&self.document, marker) != Some(times) {
                    self.marker.set_times(&mut self.document, marker, times)?;
                    refreshed += 1;
                }
            }
            words.insert(word);
        }
        Ok((refreshed, words))
    }

    /// Handle a user selection: mark it as the selected word and capture
    /// its sentence
    pub fn select(&mut self, range: &DomRange, meets: &Meets) -> Result<Encounter, PageError> {
        let qualified = qualify_selection(&self.document, range, &self.tokenizer)?;
        let common = self
            .document
            .common_ancestor(range.start.node, range.end.node)
            .ok_or(SelectionError::InvalidRange)?;
        // resolved before wrapping; the block survives the mutation
        let anchor = self.extractor.enclosing_block(&self.document, common);

        let known = meets.times(&qualified.word).unwrap_or(0);
        let outcome = self.marker.mark_selected(&mut self.document, range, known)?;
        self.normalize()?;
        self.active = Some(ActiveSelection {
            marker: outcome.marker,
            anchor,
        });

        let times = self.marker.times(&self.document, outcome.marker).unwrap_or(known);
        let scene = self
            .extractor
            .extract_marked_within(&self.document, anchor, outcome.marker)?;

        Ok(Encounter {
            word: qualified.word,
            times,
            scene,
        })
    }

    /// Sentence around the selected marker
    pub fn scene(&self) -> Result<Scene, PageError> {
        let active = self.active.ok_or(PageError::NothingSelected)?;
        Ok(self
            .extractor
            .extract_marked_within(&self.document, active.anchor, active.marker)?)
    }

    /// Record one more encounter with the selected word
    pub fn plus_one(&mut self) -> Result<Encounter, PageError> {
        let active = self.active.ok_or(PageError::NothingSelected)?;
        let times = self
            .marker
            .times(&self.document, active.marker)
            .unwrap_or(0)
            .saturating_add(1);
        self.marker.set_times(&mut self.document, active.marker, times)?;

        Ok(Encounter {
            word: self.word_of(active.marker),
            times,
            scene: self.scene()?,
        })
    }

    /// Mark the selected word as known; its count drops to zero
    pub fn know(&mut self) -> Result<String, PageError> {
        let active = self.active.ok_or(PageError::NothingSelected)?;
        self.marker.set_times(&mut self.document, active.marker, 0)?;
        Ok(self.word_of(active.marker))
    }

    /// Drop the selection flag (mouse-down anywhere on the page)
    pub fn clear_selection(&mut self) {
        self.marker.clear_selection(&mut self.document);
        self.active = None;
    }

    fn normalize(&mut self) -> Result<(), MarkError> {
        let root = self.document.root();
        self.document.normalize(root)?;
        Ok(())
    }

    fn word_of(&self, marker: NodeId) -> String {
        self.document.text_content(marker).trim().to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meets(pairs: &[(&str, u32)]) -> Meets {
        pairs.iter().map(|(w, t)| (w.to_string(), *t)).collect()
    }

    #[test]
    fn test_select_unknown_word_starts_at_zero() {
        let mut page = Page::from_html("<p>Hello world. Bye now.</p>", &MetConfig::default());
        let t = page.text_node(0).unwrap();
        let encounter = page.select(&DomRange::in_text(t, 6, 11), &Meets::new()).unwrap();

        assert_eq!(encounter.word, "world");
        assert_eq!(encounter.times, 0);
        assert_eq!(encounter.scene.sentence, "Hello <xmet>world</xmet>.");
        assert!(page.selected_marker().is_some());
    }

    #[test]
    fn test_plus_one_and_know() {
        let mut page = Page::from_html("<p>Hello world. Bye now.</p>", &MetConfig::default());
        let t = page.text_node(0).unwrap();
        let first = page
            .select(&DomRange::in_text(t, 6, 11), &meets(&[("world", 2)]))
            .unwrap();
        assert_eq!(first.times, 2);

        let bumped = page.plus_one().unwrap();
        assert_eq!(bumped.word, "world");
        assert_eq!(bumped.times, 3);
        assert_eq!(bumped.scene.text, "Hello world.");
        assert!(page.html().contains("data-times=\"---\""));

        assert_eq!(page.know().unwrap(), "world");
        assert!(page.html().contains("data-times=\"\""));
    }

    #[test]
    fn test_actions_require_selection() {
        let mut page = Page::from_html("<p>Hello world.</p>", &MetConfig::default());
        assert_eq!(page.plus_one(), Err(PageError::NothingSelected));
        assert_eq!(page.know(), Err(PageError::NothingSelected));

        let t = page.text_node(0).unwrap();
        page.select(&DomRange::in_text(t, 0, 5), &Meets::new()).unwrap();
        page.clear_selection();
        assert!(page.selected_marker().is_none());
        assert!(!page.html().contains("metword-selected"));
        assert_eq!(page.scene(), Err(PageError::NothingSelected));
    }

    #[test]
    fn test_rejected_selection_leaves_page_untouched() {
        let mut page = Page::from_html("<p>Hello world.</p>", &MetConfig::default());
        let before = page.html();
        let t = page.text_node(0).unwrap();
        let err = page.select(&DomRange::in_text(t, 0, 11), &Meets::new()).unwrap_err();
        assert!(matches!(err, PageError::Selection(SelectionError::NotSingleWord(_))));
        assert_eq!(page.html(), before);
    }
}
