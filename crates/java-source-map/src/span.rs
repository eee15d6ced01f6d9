//! Byte spans of tokens and trivia.

use text_size::{TextRange, TextSize};

/// A byte offset into a compilation unit.
pub type ByteOffset = TextSize;

/// The bytes `[start, end)` of a token or comment in its compilation unit.
///
/// Positions give line and column; spans slice the raw text back out,
/// including comments that sit between two tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: ByteOffset,
    pub end: ByteOffset,
}

impl Span {
    pub fn new(start: impl Into<ByteOffset>, end: impl Into<ByteOffset>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Converts a lexer match range.
    pub fn from_range(range: std::ops::Range<usize>) -> Self {
        Self::new(range.start as u32, range.end as u32)
    }

    /// Returns true for the zero-width span of the end-of-file token.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns the span from the start of the earlier span to the end of the later one.
    pub fn cover(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Returns the source text under this span.
    pub fn slice(self, source: &str) -> &str {
        &source[TextRange::new(self.start, self.end)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_keeps_comments_between_tokens() {
        let source = "a /* sum */ + b";
        let first = Span::from_range(0..1);
        let last = Span::from_range(14..15);
        assert_eq!(first.cover(last).slice(source), source);
        assert_eq!(last.cover(first), first.cover(last));
        assert_eq!(Span::new(2u32, 11u32).slice(source), "/* sum */");
    }

    #[test]
    fn test_end_of_file_span_is_empty() {
        let source = "class A {}";
        let eof = Span::from_range(source.len()..source.len());
        assert!(eof.is_empty());
        assert_eq!(eof.slice(source), "");
        assert!(!Span::from_range(0..5).is_empty());
    }
}
