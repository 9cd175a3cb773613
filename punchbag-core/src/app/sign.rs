//! The wooden sign the character holds.

pub const DEFAULT_SIGN: &str = "你好";
pub const MAX_SIGN_CHARS: usize = 20;
/// Longer text is split over two lines.
pub const ONE_LINE_CHARS: usize = 10;
const EMPTY_SIGN: &str = "...";

/// Trimmed, at most [`MAX_SIGN_CHARS`] characters; blank becomes `...`.
pub fn sign_text(input: &str) -> String {
    let t: String = input.trim().chars().take(MAX_SIGN_CHARS).collect();
    if t.is_empty() { EMPTY_SIGN.to_string() } else { t }
}

/// One line up to [`ONE_LINE_CHARS`], otherwise two halves with the first
/// taking the extra character.
pub fn split_lines(text: &str) -> Vec<String> {
    let t = text.trim();
    let chars: Vec<char> = t.chars().collect();
    if chars.is_empty() {
        return vec![EMPTY_SIGN.to_string()];
    }
    if chars.len() <= ONE_LINE_CHARS {
        return vec![t.to_string()];
    }
    let mid = chars.len().div_ceil(2);
    vec![chars[..mid].iter().collect(), chars[mid..].iter().collect()]
}
