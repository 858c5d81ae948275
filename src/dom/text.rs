//! UTF-16 offset helpers
//!
//! DOM ranges address character data in UTF-16 code units while Rust strings
//! are UTF-8. These helpers translate between the two.

/// Length of `s` in UTF-16 code units
pub fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

/// Convert a UTF-16 offset into a byte offset into `s`.
///
/// An offset that falls inside a surrogate pair rounds down to the start of
/// that character. Returns `None` when the offset is past the end.
pub fn utf16_to_byte(s: &str, offset: usize) -> Option<usize> {
    let mut units = 0;
    for (byte, c) in s.char_indices() {
        let next = units + c.len_utf16();
        if offset < next {
            return Some(byte);
        }
        units = next;
    }
    if offset == units {
        Some(s.len())
    } else {
        None
    }
}

/// Slice `s` between two UTF-16 offsets
pub fn slice_utf16(s: &str, start: usize, end: usize) -> Option<&str> {
    let from = utf16_to_byte(s, start)?;
    let to = utf16_to_byte(s, end)?;
    if from > to {
        return None;
    }
    Some(&s[from..to])
}
