//! Tokenizer - English word boundaries in raw text
//!
//! A word is a run of ASCII letters bounded on both sides by a delimiter
//! (whitespace or `. , ! ? ; : ' " ) ( ] [`) or by the ends of the text.
//! Runs touching anything else (`sec0nd`, `para-graph`, `你好mellon`) are
//! not words. Non-Latin scripts never produce tokens.
//!
//! Offsets are UTF-16 code units so they can address DOM text directly.

use serde::{Deserialize, Serialize};
use std::iter::Peekable;
use std::str::CharIndices;

/// One token found in a string
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct WordIndex {
    /// Lowercased token
    pub word: String,
    pub start: usize,
    pub end: usize,
}

pub fn is_word_char(c: char) -> bool {
    c.is_ascii_alphabetic()
}

pub fn is_delimiter(c: char) -> bool {
    c.is_whitespace()
        || matches!(c, '.' | ',' | '!' | '?' | ';' | ':' | '\'' | '"' | ')' | '(' | ']' | '[')
}

#[derive(Clone, Copy, Debug)]
pub struct Tokenizer {
    min_len: usize,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(2)
    }
}

impl Tokenizer {
    pub fn new(min_len: usize) -> Self {
        Self { min_len }
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }

    /// Single pass over `text`
    pub fn tokens<'a>(&self, text: &'a str) -> Tokens<'a> {
        Tokens {
            text,
            chars: text.char_indices().peekable(),
            unit: 0,
            prev: None,
            min_len: self.min_len,
        }
    }

    pub fn tokenize(&self, text: &str) -> Vec<WordIndex> {
        self.tokens(text).collect()
    }
}

/// Tokenize with the default minimum length
pub fn tokenize(text: &str) -> Vec<WordIndex> {
    Tokenizer::default().tokenize(text)
}

/// The word a raw selection stands for, if it is a single run of letters.
///
/// Surrounding whitespace is ignored (Safari keeps a trailing space in
/// double-click selections).
pub fn selected_word(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if !trimmed.is_empty() && trimmed.chars().all(is_word_char) {
        Some(trimmed.to_ascii_lowercase())
    } else {
        None
    }
}

/// Iterator returned by `Tokenizer::tokens`
pub struct Tokens<'a> {
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
    /// UTF-16 offset of the next char
    unit: usize,
    prev: Option<char>,
    min_len: usize,
}

impl Iterator for Tokens<'_> {
    type Item = WordIndex;

    fn next(&mut self) -> Option<WordIndex> {
        loop {
            let (byte, c) = self.chars.next()?;
            let start = self.unit;
            self.unit += c.len_utf16();
            let before = self.prev.replace(c);
            if !is_word_char(c) {
                continue;
            }

            // consume the whole run; letters are ASCII so bytes == units
            let mut end_byte = byte + 1;
            while let Some(&(b, n)) = self.chars.peek() {
                if !is_word_char(n) {
                    break;
                }
                self.chars.next();
                self.prev = Some(n);
                self.unit += 1;
                end_byte = b + 1;
            }

            let open = before.map_or(true, is_delimiter);
            let closed = self.chars.peek().map_or(true, |&(_, n)| is_delimiter(n));
            if !open || !closed || self.unit - start < self.min_len {
                continue;
            }

            return Some(WordIndex {
                word: self.text[byte..end_byte].to_ascii_lowercase(),
                start,
                end: self.unit,
            });
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
