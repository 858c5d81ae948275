//! SceneExtractor - the sentence around a user selection
//!
//! The selection may start and end in different text nodes, and the
//! selected text may occur several times on the page, so the sentence is
//! not found by searching for the selected string. Instead the enclosing
//! block is serialized with sentinel markers written at the selection
//! boundaries while walking the tree, and sentence terminators are located
//! relative to those sentinels.
//!
//! # Serialization rules
//! | Node                               | Output                       |
//! |------------------------------------|------------------------------|
//! | text                               | character data, verbatim     |
//! | script, style, pre, sup, sub, ...  | nothing                      |
//! | br                                 | a space                      |
//! | h1-h6, li                          | children, then `". "`        |
//!
//! Abbreviations ("Mellon C. Collie") end a sentence early. That is an
//! accepted limit of a delimiter-only heuristic.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::config::{is_terminator, BoundaryRule, MetConfig, CLOSING_MARKS};
use crate::dom::{utf16_to_byte, Document, DomRange, NodeData, NodeId};

/// Elements that bound how much text is serialized around a selection
pub const BLOCK_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ul", "ol", "dl", "dt", "dd", "div",
    "article", "section", "main", "aside", "header", "footer", "nav", "blockquote", "figure",
    "figcaption", "table", "tr", "td", "th", "body",
];

/// Elements left out of the serialized text
pub const DROPPED_TAGS: &[&str] = &["script", "style", "pre", "sup", "sub", "noscript", "template"];

/// Elements followed by a synthetic sentence end
const PERIOD_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6", "li"];

// =============================================================================
// Types
// =============================================================================

/// A sentence captured around a selection
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Scene {
    /// Sentence with the selection wrapped in the sentinel markers
    pub sentence: String,
    /// Sentence without markers
    pub text: String,
    /// The selected span
    pub highlight: String,
}

/// Body of the "add scene" request to the word service
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SceneSubmission {
    pub id: String,
    pub url: String,
    pub text: String,
}

impl Scene {
    pub fn submission(&self, id: &str, url: &str) -> SceneSubmission {
        SceneSubmission {
            id: id.to_string(),
            url: url.to_string(),
            text: self.sentence.clone(),
        }
    }
}

/// What the sentinels wrap
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SceneTarget {
    /// A live selection between two text boundaries
    Range(DomRange),
    /// Everything inside an element, typically the selected marker
    Element(NodeId),
}

/// Serialized block text and where the sentinels landed (byte offsets)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Rendered {
    pub text: String,
    pub open: Option<usize>,
    pub close: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneError {
    BoundaryNotText(NodeId),
    InvalidRange,
    /// The selection sits outside the anchor or inside a dropped element
    NotRendered,
    UnknownMarker(NodeId),
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneError::BoundaryNotText(id) => {
                write!(f, "Selection boundary {} is not a text node", id.index())
            }
            SceneError::InvalidRange => write!(f, "Selection range is invalid"),
            SceneError::NotRendered => write!(f, "Selection is not part of the visible text"),
            SceneError::UnknownMarker(id) => write!(f, "Node {} is not an element", id.index()),
        }
    }
}

impl std::error::Error for SceneError {}

// =============================================================================
// SceneExtractor
// =============================================================================

#[derive(Clone, Debug)]
pub struct SceneExtractor {
    open: String,
    close: String,
    rule: BoundaryRule,
}

impl Default for SceneExtractor {
    fn default() -> Self {
        Self::new(&MetConfig::default())
    }
}

impl SceneExtractor {
    pub fn new(config: &MetConfig) -> Self {
        Self {
            open: config.sentinel_open.clone(),
            close: config.sentinel_close.clone(),
            rule: config.boundary_rule,
        }
    }

    pub fn with_rule(mut self, rule: BoundaryRule) -> Self {
        self.rule = rule;
        self
    }

    /// Scene for a selection, anchored on its enclosing block
    pub fn extract(&self, doc: &Document, range: &DomRange) -> Result<Scene, SceneError> {
        self.check_range(doc, range)?;
        let common = doc
            .common_ancestor(range.start.node, range.end.node)
            .ok_or(SceneError::InvalidRange)?;
        let anchor = self.enclosing_block(doc, common);
        self.extract_within(doc, anchor, range)
    }

    /// Scene for a selection, serializing only `anchor`
    pub fn extract_within(
        &self,
        doc: &Document,
        anchor: NodeId,
        range: &DomRange,
    ) -> Result<Scene, SceneError> {
        self.check_range(doc, range)?;
        let rendered = self.render(doc, anchor, SceneTarget::Range(*range));
        self.carve(&rendered)
    }

    /// Scene for the contents of a marker element, anchored on its block
    pub fn extract_marked(&self, doc: &Document, marker: NodeId) -> Result<Scene, SceneError> {
        if !doc.is_element(marker) {
            return Err(SceneError::UnknownMarker(marker));
        }
        let anchor = self.enclosing_block(doc, marker);
        self.extract_marked_within(doc, anchor, marker)
    }

    pub fn extract_marked_within(
        &self,
        doc: &Document,
        anchor: NodeId,
        marker: NodeId,
    ) -> Result<Scene, SceneError> {
        if !doc.is_element(marker) {
            return Err(SceneError::UnknownMarker(marker));
        }
        let rendered = self.render(doc, anchor, SceneTarget::Element(marker));
        self.carve(&rendered)
    }

    fn check_range(&self, doc: &Document, range: &DomRange) -> Result<(), SceneError> {
        for point in [&range.start, &range.end] {
            if !doc.is_text(point.node) {
                return Err(SceneError::BoundaryNotText(point.node));
            }
        }
        if !range.is_valid_text_range(doc) {
            return Err(SceneError::InvalidRange);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Anchor
    // -------------------------------------------------------------------------

    /// Nearest block (inclusive ancestor of `node`) whose text has a sentence
    /// terminator. Without one anywhere up the tree, the nearest block.
    pub fn enclosing_block(&self, doc: &Document, node: NodeId) -> NodeId {
        let mut nearest = None;
        for candidate in std::iter::once(node).chain(doc.ancestors(node)) {
            if !is_block(doc, candidate) {
                continue;
            }
            if has_terminator(doc, candidate) {
                return candidate;
            }
            nearest.get_or_insert(candidate);
        }
        nearest
            .or_else(|| doc.parent(node))
            .unwrap_or(node)
    }

    // -------------------------------------------------------------------------
    // Serialization
    // -------------------------------------------------------------------------

    /// Serialize `anchor` with sentinels around `target`
    pub fn render(&self, doc: &Document, anchor: NodeId, target: SceneTarget) -> Rendered {
        let mut out = Rendered::default();
        self.render_node(doc, anchor, &target, &mut out);
        out
    }

    fn render_node(&self, doc: &Document, node: NodeId, target: &SceneTarget, out: &mut Rendered) {
        match doc.data(node) {
            Some(NodeData::Text(data)) => self.render_text(node, data, target, out),
            Some(NodeData::Element { tag, .. }) => {
                if DROPPED_TAGS.contains(&tag.as_str()) {
                    return;
                }
                if tag == "br" {
                    out.text.push(' ');
                    return;
                }
                let wraps = *target == SceneTarget::Element(node);
                if wraps {
                    out.open = Some(out.text.len());
                    out.text.push_str(&self.open);
                }
                for child in doc.children(node) {
                    self.render_node(doc, *child, target, out);
                }
                if wraps {
                    out.close = Some(out.text.len());
                    out.text.push_str(&self.close);
                }
                if PERIOD_TAGS.contains(&tag.as_str()) {
                    out.text.push_str(". ");
                }
            }
            Some(NodeData::Document) => {
                for child in doc.children(node) {
                    self.render_node(doc, *child, target, out);
                }
            }
            _ => {}
        }
    }

    fn render_text(&self, node: NodeId, data: &str, target: &SceneTarget, out: &mut Rendered) {
        let (mut open_at, mut close_at) = (None, None);
        if let SceneTarget::Range(range) = target {
            if range.start.node == node {
                open_at = utf16_to_byte(data, range.start.offset);
            }
            if range.end.node == node {
                close_at = utf16_to_byte(data, range.end.offset);
            }
        }

        let mut cursor = 0;
        if let Some(at) = open_at {
            out.text.push_str(&data[cursor..at]);
            out.open = Some(out.text.len());
            out.text.push_str(&self.open);
            cursor = at;
        }
        if let Some(at) = close_at.filter(|at| *at >= cursor) {
            out.text.push_str(&data[cursor..at]);
            out.close = Some(out.text.len());
            out.text.push_str(&self.close);
            cursor = at;
        }
        out.text.push_str(&data[cursor..]);
    }

    // -------------------------------------------------------------------------
    // Sentence boundaries
    // -------------------------------------------------------------------------

    /// Cut the sentence containing the sentinels out of a rendered block
    pub fn carve(&self, rendered: &Rendered) -> Result<Scene, SceneError> {
        let (open, close) = match (rendered.open, rendered.close) {
            (Some(o), Some(c)) if o < c => (o, c),
            _ => return Err(SceneError::NotRendered),
        };
        let text = rendered.text.as_str();
        let inner = open + self.open.len();
        let after = close + self.close.len();

        // last sentence end before the selection
        let mut start = 0;
        for (i, c) in text[..open].char_indices() {
            let next = i + c.len_utf8();
            if self.rule.ends_sentence(c, self.skip_sentinel(&text[next..])) {
                start = next + closing_len(&text[next..open]);
            }
        }

        // first sentence end after it
        let mut end = text.len();
        for (i, c) in text[after..].char_indices() {
            let next = after + i + c.len_utf8();
            if self.rule.ends_sentence(c, self.skip_sentinel(&text[next..])) {
                end = next + closing_len(&text[next..]);
                break;
            }
        }

        let slice = &text[start..end];
        let from = (start + slice.len() - slice.trim_start().len()).min(open);
        let to = (end - (slice.len() - slice.trim_end().len())).max(after);

        let highlight = &text[inner..close];
        let mut plain = String::with_capacity(to - from);
        plain.push_str(&text[from..open]);
        plain.push_str(highlight);
        plain.push_str(&text[after..to]);

        Ok(Scene {
            sentence: text[from..to].to_string(),
            text: plain,
            highlight: highlight.to_string(),
        })
    }

    /// Look past a sentinel that directly follows a terminator
    fn skip_sentinel<'a>(&self, rest: &'a str) -> &'a str {
        rest.strip_prefix(self.open.as_str())
            .or_else(|| rest.strip_prefix(self.close.as_str()))
            .unwrap_or(rest)
    }
}

/// Byte length of the closing quotes and brackets `s` starts with
fn closing_len(s: &str) -> usize {
    s.len() - s.trim_start_matches(CLOSING_MARKS).len()
}

fn is_block(doc: &Document, node: NodeId) -> bool {
    doc.tag(node).is_some_and(|t| BLOCK_TAGS.contains(&t))
}

/// Whether any visible text under `node` carries a sentence terminator
fn has_terminator(doc: &Document, node: NodeId) -> bool {
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        match doc.data(current) {
            Some(NodeData::Text(t)) if t.chars().any(is_terminator) => return true,
            Some(NodeData::Element { tag, .. }) if DROPPED_TAGS.contains(&tag.as_str()) => {}
            _ => stack.extend_from_slice(doc.children(current)),
        }
    }
    false
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::BoundaryPoint;

    fn texts(doc: &Document) -> Vec<NodeId> {
        doc.text_nodes(doc.root())
    }

    #[test]
    fn test_selection_in_first_sentence() {
        let doc = Document::parse_html("<p>Hello world. The sec0nd paragraph starts here.</p>");
        let t = texts(&doc)[0];
        let scene = SceneExtractor::default()
            .extract(&doc, &DomRange::in_text(t, 6, 11))
            .unwrap();

        assert_eq!(scene.text, "Hello world.");
        assert_eq!(scene.sentence, "Hello <xmet>world</xmet>.");
        assert_eq!(scene.highlight, "world");
    }

    #[test]
    fn test_selection_in_second_sentence() {
        let doc = Document::parse_html("<p>Hello world. The sec0nd paragraph starts here.</p>");
        let t = texts(&doc)[0];
        let scene = SceneExtractor::default()
            .extract(&doc, &DomRange::in_text(t, 34, 40))
            .unwrap();
        assert_eq!(scene.sentence, "The sec0nd paragraph <xmet>starts</xmet> here.");
    }

    #[test]
    fn test_selection_across_inline_markup() {
        let doc = Document::parse_html("<p>He said <em>hello</em> to me.</p>");
        let t = texts(&doc);
        let range = DomRange::new(BoundaryPoint::new(t[0], 3), BoundaryPoint::new(t[1], 5));
        let scene = SceneExtractor::default().extract(&doc, &range).unwrap();

        assert_eq!(scene.text, "He said hello to me.");
        assert_eq!(scene.sentence, "He <xmet>said hello</xmet> to me.");
        assert_eq!(scene.highlight, "said hello");
    }

    #[test]
    fn test_cjk_terminators_need_no_space() {
        let doc = Document::parse_html("<p>你好。这是测试。</p>");
        let t = texts(&doc)[0];
        let extractor = SceneExtractor::default();

        let first = extractor.extract(&doc, &DomRange::in_text(t, 0, 2)).unwrap();
        assert_eq!(first.sentence, "<xmet>你好</xmet>。");

        let second = extractor.extract(&doc, &DomRange::in_text(t, 3, 5)).unwrap();
        assert_eq!(second.sentence, "<xmet>这是</xmet>测试。");
        assert_eq!(second.text, "这是测试。");
    }

    #[test]
    fn test_repeated_words_use_the_selected_occurrence() {
        let doc = Document::parse_html("<p>Cats sleep. Dogs sleep too. Birds sing.</p>");
        let t = texts(&doc)[0];
        let scene = SceneExtractor::default()
            .extract(&doc, &DomRange::in_text(t, 17, 22))
            .unwrap();
        assert_eq!(scene.text, "Dogs sleep too.");
    }

    #[test]
    fn test_closing_quote_stays_with_its_sentence() {
        let doc = Document::parse_html("<p>She said \"Stop.\" Then left.</p>");
        let t = texts(&doc)[0];
        let extractor = SceneExtractor::default();

        let stop = extractor.extract(&doc, &DomRange::in_text(t, 10, 14)).unwrap();
        assert_eq!(stop.text, "She said \"Stop.\"");

        let then = extractor.extract(&doc, &DomRange::in_text(t, 17, 21)).unwrap();
        assert_eq!(then.sentence, "<xmet>Then</xmet> left.");
    }

    #[test]
    fn test_render_rules() {
        let doc = Document::parse_html(
            "<div id=\"d\"><h2>Title</h2>one<br>two<sup>[1]</sup><script>x.y()</script>\
             <ul><li>item</li></ul></div>",
        );
        let d = doc.get_element_by_id("d").unwrap();
        let rendered = SceneExtractor::default().render(&doc, d, SceneTarget::Element(d));
        assert_eq!(rendered.text, "<xmet>Title. one twoitem. </xmet>");
        assert_eq!(rendered.open, Some(0));
    }

    #[test]
    fn test_heading_padding_separates_sentences() {
        let doc = Document::parse_html("<div><h2>Title</h2>Body text starts here. More</div>");
        let body_text = texts(&doc)[1];
        let scene = SceneExtractor::default()
            .extract(&doc, &DomRange::in_text(body_text, 0, 4))
            .unwrap();
        assert_eq!(scene.sentence, "<xmet>Body</xmet> text starts here.");
    }

    #[test]
    fn test_dropped_footnote_keeps_boundary() {
        let doc = Document::parse_html(
            "<p>Water boils at 100 degrees.<sup>[1]</sup> It freezes at zero.</p>",
        );
        let tail = texts(&doc)[2];
        assert_eq!(doc.text(tail), Some(" It freezes at zero."));
        let scene = SceneExtractor::default()
            .extract(&doc, &DomRange::in_text(tail, 4, 11))
            .unwrap();
        assert_eq!(scene.text, "It freezes at zero.");
    }

    #[test]
    fn test_selection_inside_dropped_element_is_not_rendered() {
        let doc = Document::parse_html("<p>Some text.<sup>note</sup></p>");
        let note = texts(&doc)[1];
        let err = SceneExtractor::default()
            .extract(&doc, &DomRange::in_text(note, 0, 4))
            .unwrap_err();
        assert_eq!(err, SceneError::NotRendered);
    }

    #[test]
    fn test_enclosing_block_climbs_to_punctuated_block() {
        let doc = Document::parse_html(
            "<div id=\"outer\">Intro sentence. <p id=\"inner\">no punctuation here</p></div>",
        );
        let inner_text = texts(&doc)[1];
        let extractor = SceneExtractor::default();
        let outer = doc.get_element_by_id("outer").unwrap();
        assert_eq!(extractor.enclosing_block(&doc, inner_text), outer);

        let scene = extractor.extract(&doc, &DomRange::in_text(inner_text, 3, 14)).unwrap();
        assert_eq!(scene.sentence, "no <xmet>punctuation</xmet> here");
    }

    #[test]
    fn test_enclosing_block_falls_back_to_nearest_block() {
        let doc = Document::parse_html("<p id=\"p\">no stops <b>at all</b></p>");
        let bold = texts(&doc)[1];
        let p = doc.get_element_by_id("p").unwrap();
        assert_eq!(SceneExtractor::default().enclosing_block(&doc, bold), p);
    }

    #[test]
    fn test_abbreviation_is_an_accepted_false_boundary() {
        let doc = Document::parse_html("<p>Mellon C. Collie is here.</p>");
        let t = texts(&doc)[0];
        let scene = SceneExtractor::default()
            .extract(&doc, &DomRange::in_text(t, 20, 24))
            .unwrap();
        assert_eq!(scene.text, "Collie is here.");
    }

    #[test]
    fn test_capitalized_rule_ignores_lowercase_continuation() {
        let doc = Document::parse_html("<p>Use e.g. something like this. Next one.</p>");
        let t = texts(&doc)[0];
        let range = DomRange::in_text(t, 9, 18);

        let lenient = SceneExtractor::default().extract(&doc, &range).unwrap();
        assert_eq!(lenient.text, "something like this.");

        let strict = SceneExtractor::default()
            .with_rule(BoundaryRule::Capitalized)
            .extract(&doc, &range)
            .unwrap();
        assert_eq!(strict.text, "Use e.g. something like this.");
    }

    #[test]
    fn test_marker_target() {
        let doc = Document::parse_html(
            "<p>First one. Then <xmetword id=\"m\">this</xmetword> word. Last.</p>",
        );
        let m = doc.get_element_by_id("m").unwrap();
        let scene = SceneExtractor::default().extract_marked(&doc, m).unwrap();
        assert_eq!(scene.sentence, "Then <xmet>this</xmet> word.");
    }

    #[test]
    fn test_precondition_violations() {
        let doc = Document::parse_html("<p>abc</p>");
        let t = texts(&doc)[0];
        let p = doc.parent(t).unwrap();
        let extractor = SceneExtractor::default();

        let element_bounded = DomRange::new(BoundaryPoint::new(p, 0), BoundaryPoint::new(t, 1));
        assert_eq!(
            extractor.extract(&doc, &element_bounded),
            Err(SceneError::BoundaryNotText(p))
        );
        assert_eq!(
            extractor.extract(&doc, &DomRange::in_text(t, 2, 1)),
            Err(SceneError::InvalidRange)
        );
        assert_eq!(extractor.extract_marked(&doc, t), Err(SceneError::UnknownMarker(t)));
    }

    #[test]
    fn test_submission_carries_marked_sentence() {
        let scene = Scene {
            sentence: "Hello <xmet>world</xmet>.".to_string(),
            text: "Hello world.".to_string(),
            highlight: "world".to_string(),
        };
        let body = serde_json::to_value(scene.submission("42", "https://example.com")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "id": "42",
                "url": "https://example.com",
                "text": "Hello <xmet>world</xmet>."
            })
        );
    }
}
