//! Character-level diff highlighting
//!
//! Compares two strings position by position and marks every position where
//! they differ. A position past the end of one string counts as a difference
//! and is marked in the string that has a character there.

use std::fmt;

/// ANSI sequence that starts inverted colors
pub const INVERT: &str = "\x1b[7m";
/// ANSI sequence that resets attributes
pub const RESET: &str = "\x1b[0m";

/// A run of characters that are either all marked or all unmarked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub marked: bool,
}

/// Text annotated with highlight markers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Highlighted {
    segments: Vec<Segment>,
}

impl Highlighted {
    /// Unmarked text
    pub fn plain_text(text: &str) -> Self {
        let mut highlighted = Self::default();
        for c in text.chars() {
            highlighted.push(c, false);
        }
        highlighted
    }

    fn push(&mut self, c: char, marked: bool) {
        match self.segments.last_mut() {
            Some(last) if last.marked == marked => last.text.push(c),
            _ => self.segments.push(Segment {
                text: c.to_string(),
                marked,
            }),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The text without markers
    pub fn plain(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    /// Number of visible characters
    pub fn char_len(&self) -> usize {
        self.segments.iter().map(|s| s.text.chars().count()).sum()
    }

    /// True if any character is marked
    pub fn is_marked(&self) -> bool {
        self.segments.iter().any(|s| s.marked)
    }

    /// Character indices of all marked characters
    pub fn marked_chars(&self) -> Vec<usize> {
        let mut indices = Vec::new();
        let mut pos = 0;
        for segment in &self.segments {
            let len = segment.text.chars().count();
            if segment.marked {
                indices.extend(pos..pos + len);
            }
            pos += len;
        }
        indices
    }

    /// Render with inverted-color escape codes around marked runs
    pub fn to_ansi(&self) -> String {
        self.to_string()
    }

    /// Cut to at most `max_length` visible characters, ending with "..."
    ///
    /// Same rule as [`crate::format::truncate_value`] but counts only visible
    /// characters, so no escape sequence is ever split.
    pub fn truncate(&self, max_length: usize) -> Self {
        if self.char_len() <= max_length {
            return self.clone();
        }

        let mut remaining = max_length.saturating_sub(3);
        let mut truncated = Self::default();
        for segment in &self.segments {
            for c in segment.text.chars() {
                if remaining == 0 {
                    break;
                }
                truncated.push(c, segment.marked);
                remaining -= 1;
            }
        }
        for c in "...".chars() {
            truncated.push(c, false);
        }
        truncated
    }
}

impl fmt::Display for Highlighted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            if segment.marked {
                write!(f, "{}{}{}", INVERT, segment.text, RESET)?;
            } else {
                f.write_str(&segment.text)?;
            }
        }
        Ok(())
    }
}

/// Mark the differing characters of `old` and `new`
///
/// Equal inputs come back unmarked.
pub fn highlight(old: &str, new: &str) -> (Highlighted, Highlighted) {
    if old == new {
        return (Highlighted::plain_text(old), Highlighted::plain_text(new));
    }

    let mut old_out = Highlighted::default();
    let mut new_out = Highlighted::default();
    let mut old_chars = old.chars();
    let mut new_chars = new.chars();

    loop {
        match (old_chars.next(), new_chars.next()) {
            (None, None) => break,
            (Some(o), Some(n)) if o == n => {
                old_out.push(o, false);
                new_out.push(n, false);
            }
            (o, n) => {
                if let Some(o) = o {
                    old_out.push(o, true);
                }
                if let Some(n) = n {
                    new_out.push(n, true);
                }
            }
        }
    }

    (old_out, new_out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_strings_unmarked() {
        for s in ["", "A", "303132", "AA BB"] {
            let (old, new) = highlight(s, s);
            assert_eq!(old.to_ansi(), s);
            assert_eq!(new.to_ansi(), s);
            assert!(!old.is_marked());
            assert!(!new.is_marked());
        }
    }

    #[test]
    fn test_single_char_difference() {
        let (old, new) = highlight("ABC", "ABD");
        assert_eq!(old.marked_chars(), vec![2]);
        assert_eq!(new.marked_chars(), vec![2]);
        assert_eq!(old.to_ansi(), format!("AB{}C{}", INVERT, RESET));
        assert_eq!(new.to_ansi(), format!("AB{}D{}", INVERT, RESET));
    }

    #[test]
    fn test_longer_new_string() {
        let (old, new) = highlight("AB", "ABC");
        assert!(old.marked_chars().is_empty());
        assert_eq!(old.plain(), "AB");
        assert_eq!(new.marked_chars(), vec![2]);
    }

    #[test]
    fn test_shorter_new_string() {
        let (old, new) = highlight("ABCD", "AB");
        assert_eq!(old.marked_chars(), vec![2, 3]);
        assert!(new.marked_chars().is_empty());
    }

    #[test]
    fn test_adjacent_marks_merge_into_one_run() {
        let (old, _) = highlight("3030", "3131");
        assert_eq!(old.marked_chars(), vec![1, 3]);
        assert_eq!(old.segments().len(), 4);

        let (old, new) = highlight("00", "11");
        assert_eq!(old.segments().len(), 1);
        assert_eq!(new.to_ansi(), format!("{}11{}", INVERT, RESET));
    }

    #[test]
    fn test_multibyte_characters() {
        let (old, new) = highlight("a€b", "a€c");
        assert_eq!(old.marked_chars(), vec![2]);
        assert_eq!(new.plain(), "a€c");
    }

    #[test]
    fn test_truncate_keeps_markers_intact() {
        let (_, new) = highlight("0000000000", "0000000001");
        let short = new.truncate(8);
        assert_eq!(short.plain(), "00000...");
        assert!(!short.is_marked());

        let (_, new) = highlight("0000", "1000");
        let short = new.truncate(3);
        assert_eq!(short.plain(), "...");

        let unchanged = new.truncate(10);
        assert_eq!(unchanged, new);
    }
}
