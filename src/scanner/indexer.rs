//! RangeIndexer - one DOM range per distinct word on the page
//!
//! Walks a subtree in pre-order, tokenizes every text node and keeps the
//! first occurrence of each word. Subtrees that are not reading prose
//! (scripts, headings, links, form controls, citations, existing markers...)
//! are never entered.
//!
//! Ranges are plain values: they stay correct only until the tree is
//! mutated. Marking them is a separate pass (see `Page::annotate`).

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::config::MetConfig;
use super::meets::Meets;
use super::tokenize::Tokenizer;
use crate::dom::{Document, DomRange, NodeData, NodeId, TextSplit};

/// Elements whose text never contributes words
pub const SKIP_TAGS: &[&str] = &[
    "head", "h1", "h2", "h3", "h4", "h5", "h6", "script", "style", "pre", "code", "samp",
    "textarea", "img", "svg", "canvas", "video", "audio", "form", "input", "select", "button",
    "a", "mark", "ins", "del", "sup", "sub", "small", "big", "cite", "fieldset", "legend",
    "caption", "label", "object", "var", "kbd", "details", "summary",
];

// =============================================================================
// Types
// =============================================================================

/// A word, its encounter count, and the span of its first occurrence
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WordRange {
    pub name: String,
    pub times: u32,
    pub range: DomRange,
}

/// Word → range mapping that iterates in first-seen order
#[derive(Clone, Debug, Default)]
pub struct WordRanges {
    entries: Vec<WordRange>,
    positions: HashMap<String, usize>,
}

impl WordRanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.positions.contains_key(word)
    }

    pub fn get(&self, word: &str) -> Option<&WordRange> {
        self.positions.get(word).map(|i| &self.entries[*i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WordRange> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, WordRange> {
        self.entries.iter_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn as_slice(&self) -> &[WordRange] {
        &self.entries
    }

    pub fn as_mut_slice(&mut self) -> &mut [WordRange] {
        &mut self.entries
    }

    /// Insert unless the word is already present; first occurrence wins
    pub fn insert_first(&mut self, entry: WordRange) -> bool {
        if self.positions.contains_key(&entry.name) {
            return false;
        }
        self.positions.insert(entry.name.clone(), self.entries.len());
        self.entries.push(entry);
        true
    }

    /// Keep the entries `keep` accepts, preserving order
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&mut WordRange) -> bool,
    {
        self.entries.retain_mut(keep);
        self.positions = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
    }

    /// Keep only words the user has met, copying their encounter counts
    pub fn cross_reference(&mut self, meets: &Meets) {
        self.retain(|entry| match meets.times(&entry.name) {
            Some(times) => {
                entry.times = times;
                true
            }
            None => false,
        });
    }

    /// Replay text splits on every range from `from` onwards
    pub fn track(&mut self, from: usize, splits: &[TextSplit]) {
        for entry in self.entries.iter_mut().skip(from) {
            for split in splits {
                entry.range.track(split);
            }
        }
    }

    pub fn into_vec(self) -> Vec<WordRange> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a WordRanges {
    type Item = &'a WordRange;
    type IntoIter = std::slice::Iter<'a, WordRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// =============================================================================
// RangeIndexer
// =============================================================================

#[derive(Clone, Debug)]
pub struct RangeIndexer {
    tokenizer: Tokenizer,
    skip_tags: HashSet<String>,
}

impl Default for RangeIndexer {
    fn default() -> Self {
        Self::new(&MetConfig::default())
    }
}

impl RangeIndexer {
    pub fn new(config: &MetConfig) -> Self {
        let mut skip_tags: HashSet<String> = SKIP_TAGS.iter().map(|t| t.to_string()).collect();
        skip_tags.insert(config.marker_tag.to_ascii_lowercase());
        skip_tags.extend(config.extra_skip_tags.iter().map(|t| t.to_ascii_lowercase()));

        Self {
            tokenizer: Tokenizer::new(config.min_word_len),
            skip_tags,
        }
    }

    pub fn is_skipped(&self, doc: &Document, node: NodeId) -> bool {
        doc.tag(node).is_some_and(|t| self.skip_tags.contains(t))
    }

    /// Index every distinct word under `root`
    pub fn index(&self, doc: &Document, root: NodeId) -> WordRanges {
        let mut ranges = WordRanges::new();
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            match doc.data(node) {
                Some(NodeData::Element { .. }) if self.is_skipped(doc, node) => continue,
                Some(NodeData::Text(text)) => {
                    for token in self.tokenizer.tokens(text) {
                        if ranges.contains(&token.word) {
                            continue;
                        }
                        ranges.insert_first(WordRange {
                            range: DomRange::in_text(node, token.start, token.end),
                            name: token.word,
                            times: 0,
                        });
                    }
                }
                _ => {}
            }
            stack.extend(doc.children(node).iter().rev().copied());
        }

        ranges
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Test getWordNodeIndexes</title>
</head>
<body>
    <div class="main">
        <article>
            <p id="first">Hello world.</p>
            <p id="second">The sec0nd_ para-graph.</p>
            <p id="three">这里是中文。</p>
            <p id="four">Hello world.</p>
        </article>
    </div>
</body>
</html>
"#;

    fn first_text(doc: &Document, id: &str) -> NodeId {
        let el = doc.get_element_by_id(id).unwrap();
        doc.first_child(el).unwrap()
    }

    #[test]
    fn test_index_page_first_occurrence_wins() {
        let doc = Document::parse_html(PAGE);
        let ranges = RangeIndexer::default().index(&doc, doc.root());

        let first = first_text(&doc, "first");
        let second = first_text(&doc, "second");

        let names: Vec<&str> = ranges.names().collect();
        assert_eq!(names, vec!["hello", "world", "the"]);
        assert_eq!(ranges.get("hello").unwrap().range, DomRange::in_text(first, 0, 5));
        assert_eq!(ranges.get("world").unwrap().range, DomRange::in_text(first, 6, 11));
        assert_eq!(ranges.get("the").unwrap().range, DomRange::in_text(second, 0, 3));
        assert!(ranges.iter().all(|r| r.times == 0));
    }

    #[test]
    fn test_skip_tags_are_not_entered() {
        let html = "<p>visible <script>var hidden = 1;</script><a href=\"#\">link text</a> \
                    <sup>footnote</sup><span>inner <b>bold</b></span></p><h2>Heading</h2>";
        let doc = Document::parse_html(html);
        let ranges = RangeIndexer::default().index(&doc, doc.root());
        let names: Vec<&str> = ranges.names().collect();
        assert_eq!(names, vec!["visible", "inner", "bold"]);
    }

    #[test]
    fn test_existing_markers_and_extra_tags_are_skipped() {
        let config = MetConfig {
            extra_skip_tags: vec!["ASIDE".to_string()],
            ..MetConfig::default()
        };
        let html = "<p>plain <xmetword data-times=\"-\">marked</xmetword></p><aside>aside words</aside>";
        let doc = Document::parse_html(html);
        let ranges = RangeIndexer::new(&config).index(&doc, doc.root());
        let names: Vec<&str> = ranges.names().collect();
        assert_eq!(names, vec!["plain"]);
    }

    #[test]
    fn test_index_subtree_only() {
        let doc = Document::parse_html("<p id=\"a\">alpha beta</p><p id=\"b\">gamma</p>");
        let b = doc.get_element_by_id("b").unwrap();
        let ranges = RangeIndexer::default().index(&doc, b);
        assert_eq!(ranges.len(), 1);
        assert!(ranges.contains("gamma"));
    }

    #[test]
    fn test_cross_reference_drops_unmet_words() {
        let doc = Document::parse_html("<p>alpha beta gamma</p>");
        let mut ranges = RangeIndexer::default().index(&doc, doc.root());
        let meets: Meets = [("gamma".to_string(), 3), ("alpha".to_string(), 1)]
            .into_iter()
            .collect();

        ranges.cross_reference(&meets);
        let names: Vec<&str> = ranges.names().collect();
        assert_eq!(names, vec!["alpha", "gamma"]);
        assert_eq!(ranges.get("gamma").unwrap().times, 3);
        assert!(ranges.get("beta").is_none());
    }

    #[test]
    fn test_empty_subtree() {
        let doc = Document::parse_html("<p>你好。</p>");
        assert!(RangeIndexer::default().index(&doc, doc.root()).is_empty());
    }
}
