//! Selection qualification
//!
//! A mouse-up selection is worth acting on only when it is not collapsed,
//! both boundaries sit in text nodes, and its text (ignoring surrounding
//! whitespace) is exactly one token.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::tokenize::Tokenizer;
use crate::dom::{utf16_len, Document, DomRange, NodeId};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct QualifiedSelection {
    /// Lowercased word
    pub word: String,
    pub range: DomRange,
    /// Raw selected text, whitespace included
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionError {
    Collapsed,
    BoundaryNotText(NodeId),
    InvalidRange,
    NotSingleWord(String),
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionError::Collapsed => write!(f, "Selection is collapsed"),
            SelectionError::BoundaryNotText(id) => {
                write!(f, "Selection boundary {} is not a text node", id.index())
            }
            SelectionError::InvalidRange => write!(f, "Selection range is invalid"),
            SelectionError::NotSingleWord(text) => {
                write!(f, "Selection '{}' is not a single word", text)
            }
        }
    }
}

impl std::error::Error for SelectionError {}

pub fn qualify_selection(
    doc: &Document,
    range: &DomRange,
    tokenizer: &Tokenizer,
) -> Result<QualifiedSelection, SelectionError> {
    if range.is_collapsed() {
        return Err(SelectionError::Collapsed);
    }
    for point in [&range.start, &range.end] {
        if !doc.is_text(point.node) {
            return Err(SelectionError::BoundaryNotText(point.node));
        }
    }
    let text = range.text(doc).ok_or(SelectionError::InvalidRange)?;

    let trimmed = text.trim();
    let word = match tokenizer.tokenize(trimmed).as_slice() {
        [only] if only.start == 0 && only.end == utf16_len(trimmed) => only.word.clone(),
        _ => return Err(SelectionError::NotSingleWord(text)),
    };

    Ok(QualifiedSelection {
        word,
        range: *range,
        text,
    })
}
