//! Greedy word-wrapping text layout
//!
//! Splits a message into lines that fit the drawable width of the panel.
//! Words are never split: a single word wider than the available width
//! becomes a line of its own and is clipped by the display.

use alloc::string::String;
use alloc::vec::Vec;

/// Wrap `text` into lines no wider than `available_width`
///
/// `measure` returns the rendered width of a candidate line in pixels.
/// Whitespace runs collapse to a single space. Empty input yields no lines.
pub fn wrap<F>(text: &str, available_width: u32, mut measure: F) -> Vec<String>
where
    F: FnMut(&str) -> u32,
{
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }

        let mut candidate = String::with_capacity(current.len() + 1 + word.len());
        candidate.push_str(&current);
        candidate.push(' ');
        candidate.push_str(word);

        if measure(&candidate) <= available_width {
            current = candidate;
        } else {
            lines.push(core::mem::replace(&mut current, String::from(word)));
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Wrapped lines of one message plus their vertical extent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedLayout {
    pub lines: Vec<String>,
    /// Pixel pitch between consecutive lines
    pub line_height: u16,
    /// `lines.len() * line_height`
    pub total_height: i32,
}

impl WrappedLayout {
    /// Lay out `text` for a drawable width and line pitch
    pub fn new<F>(text: &str, available_width: u32, line_height: u16, measure: F) -> Self
    where
        F: FnMut(&str) -> u32,
    {
        let lines = wrap(text, available_width, measure);
        let total_height = lines.len() as i32 * line_height as i32;
        Self {
            lines,
            line_height,
            total_height,
        }
    }

    /// Whether the layout is taller than a display of `height` pixels
    pub fn overflows(&self, height: u16) -> bool {
        self.total_height > height as i32
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Fixed-pitch font: 6 px per character
    fn mono(s: &str) -> u32 {
        s.chars().count() as u32 * 6
    }

    #[test]
    fn test_single_line_fits() {
        let lines = wrap("Hello World", 66, mono);
        assert_eq!(lines, ["Hello World"]);
    }

    #[test]
    fn test_wraps_on_word_boundary() {
        // 10 characters per line
        let lines = wrap("The quick brown fox jumps", 60, mono);
        assert_eq!(lines, ["The quick", "brown fox", "jumps"]);
    }

    #[test]
    fn test_empty_and_blank_input() {
        assert!(wrap("", 60, mono).is_empty());
        assert!(wrap("   \t\n ", 60, mono).is_empty());
    }

    #[test]
    fn test_overlong_word_stands_alone() {
        let lines = wrap("Supercalifragilistic is long", 60, mono);
        assert_eq!(lines, ["Supercalifragilistic", "is long"]);
    }

    #[test]
    fn test_overlong_first_word_emits_no_blank_line() {
        let lines = wrap("Antidisestablishment", 30, mono);
        assert_eq!(lines, ["Antidisestablishment"]);
    }

    #[test]
    fn test_whitespace_collapses() {
        let lines = wrap("  a   b\tc  ", 60, mono);
        assert_eq!(lines, ["a b c"]);
    }

    #[test]
    fn test_layout_heights() {
        let layout = WrappedLayout::new("The quick brown fox jumps", 60, 8, mono);
        assert_eq!(layout.lines.len(), 3);
        assert_eq!(layout.total_height, 24);
        assert!(!layout.overflows(32));
        assert!(layout.overflows(16));
    }

    proptest! {
        #[test]
        fn prop_lines_fit_or_are_single_words(
            words in proptest::collection::vec("[a-zA-Z]{1,14}", 0..24),
            width in 6u32..120,
        ) {
            let text = words.join(" ");
            let lines = wrap(&text, width, mono);

            for line in &lines {
                let single_word = !line.contains(' ');
                prop_assert!(mono(line) <= width || single_word);
            }

            // Nothing lost, nothing reordered
            let rejoined: Vec<&str> = lines.iter().flat_map(|l| l.split(' ')).collect();
            let original: Vec<&str> = text.split_whitespace().collect();
            prop_assert_eq!(rejoined, original);
        }
    }
}
