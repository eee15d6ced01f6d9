//! Line/column positions and ranges.
//!
//! Lines are 1-based. Columns are 0-based character offsets within the line,
//! which is how tokens store them; issue reporting adds one when it needs a
//! 1-based column (see [`Position::column_one_based`]).

use std::fmt;

/// A line and column position in a source file.
///
/// Ordering is lexicographic: first by line, then by column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    /// 1-based line number.
    pub line: u32,
    /// 0-based column (characters from the start of the line).
    pub column: u32,
}

impl Position {
    /// The first position of any file.
    pub const FIRST: Position = Position { line: 1, column: 0 };

    /// Creates a new position.
    #[inline]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Returns the column as reported to users (1-based).
    #[inline]
    pub fn column_one_based(&self) -> u32 {
        self.column + 1
    }

    /// Returns the position reached after reading `text` starting at `self`.
    ///
    /// `\n`, `\r` and `\r\n` each count as a single line break and reset the
    /// column. Used to compute the end of tokens spanning several lines, such
    /// as text blocks and block comments.
    pub fn advance(self, text: &str) -> Position {
        let mut line = self.line;
        let mut column = self.column;
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\r' => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    line += 1;
                    column = 0;
                }
                '\n' => {
                    line += 1;
                    column = 0;
                }
                _ => column += 1,
            }
        }
        Position { line, column }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column_one_based())
    }
}

/// A range between two positions.
///
/// `end` is the position immediately after the last character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Range {
    /// Start position (inclusive).
    pub start: Position,
    /// End position (exclusive).
    pub end: Position,
}

impl Range {
    /// Creates a new range. `start` must not be after `end`.
    #[inline]
    pub fn new(start: Position, end: Position) -> Self {
        debug_assert!(start <= end, "range start {start} is after end {end}");
        Self { start, end }
    }

    /// Creates the range covered by `text` when it starts at `start`.
    pub fn of_text(start: Position, text: &str) -> Self {
        Self {
            start,
            end: start.advance(text),
        }
    }

    /// Creates an empty range at the given position.
    #[inline]
    pub fn empty(at: Position) -> Self {
        Self { start: at, end: at }
    }

    /// Returns true if the range covers no characters.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns true if `other` lies entirely inside this range.
    ///
    /// Shared boundaries count as contained.
    #[inline]
    pub fn contains(&self, other: &Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Returns the smallest range covering both ranges.
    pub fn cover(self, other: Range) -> Range {
        Range {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_line_then_column() {
        assert!(Position::new(1, 9) < Position::new(2, 0));
        assert!(Position::new(3, 1) < Position::new(3, 2));
        assert_eq!(Position::new(4, 4), Position::new(4, 4));
    }

    #[test]
    fn test_advance_single_line() {
        let end = Position::new(3, 4).advance("hello");
        assert_eq!(end, Position::new(3, 9));
    }

    #[test]
    fn test_advance_all_terminators() {
        // \r\n is one break, lone \r is one break, \n is one break
        let end = Position::FIRST.advance("a\r\nbb\rccc\nd");
        assert_eq!(end, Position::new(4, 1));
    }

    #[test]
    fn test_text_block_range() {
        let text = "\"\"\"\n    hello\n    \"\"\"";
        let range = Range::of_text(Position::new(2, 12), text);
        assert_eq!(range.start, Position::new(2, 12));
        assert_eq!(range.end, Position::new(4, 7));
    }

    #[test]
    fn test_contains_shared_boundaries() {
        let outer = Range::new(Position::new(1, 0), Position::new(3, 5));
        assert!(outer.contains(&outer));
        assert!(outer.contains(&Range::new(Position::new(1, 0), Position::new(1, 2))));
        assert!(outer.contains(&Range::new(Position::new(2, 40), Position::new(3, 5))));
        assert!(!outer.contains(&Range::new(Position::new(2, 0), Position::new(3, 6))));
    }

    #[test]
    fn test_display_is_one_based_column() {
        assert_eq!(Position::new(7, 0).to_string(), "7:1");
    }
}
