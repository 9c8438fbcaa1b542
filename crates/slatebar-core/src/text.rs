//! Unicode-safe text utilities for block text.

/// Return a slice of `text` containing at most `max_chars` Unicode scalar values.
///
/// Keeps the head of the string. Uses `char_indices().nth(max_chars)` so the
/// cut always lands on a char boundary.
pub fn truncate_chars_slice(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Left-pad `text` with `fill` until it is at least `min_chars` Unicode
/// scalar values long.
pub fn pad_chars_start(text: &str, min_chars: usize, fill: char) -> String {
    let len = text.chars().count();
    if len >= min_chars {
        return text.to_string();
    }
    let padding: String = std::iter::repeat_n(fill, min_chars - len).collect();
    format!("{padding}{text}")
}
