//! Configuration types and defaults for MetCore

use serde::{Deserialize, Serialize};

// =============================================================================
// Sentence Boundary Policy
// =============================================================================

/// When a Latin terminator (`.` `!` `?`) ends a sentence.
///
/// CJK terminators (`。` `！` `？`) always end a sentence regardless of policy.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryRule {
    /// Next char is whitespace, a closing quote, `)` or an ASCII capital
    #[default]
    Lenient,
    /// After skipping whitespace and closing punctuation, the next char must
    /// be an ASCII capital (or the text ends)
    Capitalized,
}

/// Characters that may sit between a terminator and the next sentence
pub const CLOSING_MARKS: &[char] = &['"', '\'', '\u{201d}', '\u{2019}', ')'];

pub fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '。' | '！' | '？')
}

pub fn is_cjk_terminator(c: char) -> bool {
    matches!(c, '。' | '！' | '？')
}

impl BoundaryRule {
    /// Whether terminator `c`, followed by `rest`, closes a sentence
    pub fn ends_sentence(&self, c: char, rest: &str) -> bool {
        if !is_terminator(c) {
            return false;
        }
        if is_cjk_terminator(c) {
            return true;
        }
        match self {
            BoundaryRule::Lenient => rest.chars().next().is_some_and(|n| {
                n.is_whitespace() || CLOSING_MARKS.contains(&n) || n.is_ascii_uppercase()
            }),
            BoundaryRule::Capitalized => rest
                .chars()
                .find(|n| !(n.is_whitespace() || CLOSING_MARKS.contains(n)))
                .map_or(true, |n| n.is_ascii_uppercase()),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MetConfig {
    /// Shortest run of letters counted as a word. Default: 2
    #[serde(default = "default_min_word_len")]
    pub min_word_len: usize,
    /// Tag of the synthetic marker element. Default: "xmetword"
    #[serde(default = "default_marker_tag")]
    pub marker_tag: String,
    /// Id carried by the one selected marker. Default: "metword-selected"
    #[serde(default = "default_selected_id")]
    pub selected_id: String,
    /// Character repeated `times` in the `data-times` attribute. Default: '-'
    #[serde(default = "default_times_char")]
    pub times_char: char,
    /// Value of the `--met-color` style property on markers. Default: "red"
    #[serde(default = "default_marker_color")]
    pub marker_color: String,
    #[serde(default = "default_sentinel_open")]
    pub sentinel_open: String,
    #[serde(default = "default_sentinel_close")]
    pub sentinel_close: String,
    #[serde(default)]
    pub boundary_rule: BoundaryRule,
    /// Tags the indexer skips on top of the built-in list
    #[serde(default)]
    pub extra_skip_tags: Vec<String>,
}

fn default_min_word_len() -> usize { 2 }
fn default_marker_tag() -> String { "xmetword".to_string() }
fn default_selected_id() -> String { "metword-selected".to_string() }
fn default_times_char() -> char { '-' }
fn default_marker_color() -> String { "red".to_string() }
fn default_sentinel_open() -> String { "<xmet>".to_string() }
fn default_sentinel_close() -> String { "</xmet>".to_string() }

impl Default for MetConfig {
    fn default() -> Self {
        Self {
            min_word_len: default_min_word_len(),
            marker_tag: default_marker_tag(),
            selected_id: default_selected_id(),
            times_char: default_times_char(),
            marker_color: default_marker_color(),
            sentinel_open: default_sentinel_open(),
            sentinel_close: default_sentinel_close(),
            boundary_rule: BoundaryRule::default(),
            extra_skip_tags: Vec::new(),
        }
    }
}
