//! Line index for efficient offset ↔ line/column conversion.

use std::sync::Arc;

use crate::{ByteOffset, Position};
use text_size::TextSize;

/// An index for converting between byte offsets and [`Position`]s.
///
/// The index stores the byte offset of the start of each line, so that a
/// lookup is a binary search followed by a scan of a single line. `\n`, `\r`
/// and `\r\n` each terminate one line.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// The indexed text.
    text: Arc<str>,
    /// `line_starts[i]` is the offset where line `i + 1` begins.
    line_starts: Vec<ByteOffset>,
}

impl LineIndex {
    /// Creates a new line index from source text.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::from(0)];
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                    line_starts.push(TextSize::from((i + 2) as u32));
                    i += 2;
                    continue;
                }
                b'\r' | b'\n' => line_starts.push(TextSize::from((i + 1) as u32)),
                _ => {}
            }
            i += 1;
        }

        Self {
            text: Arc::from(text),
            line_starts,
        }
    }

    /// Returns the indexed text.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the number of lines in the source.
    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Converts a byte offset to a position.
    ///
    /// Offsets from `0` up to and including the text length are valid; the
    /// text length denotes the end-of-file position. Returns `None` for
    /// offsets past the end or inside a multi-byte character.
    pub fn position(&self, offset: ByteOffset) -> Option<Position> {
        let raw = u32::from(offset) as usize;
        if raw > self.text.len() || !self.text.is_char_boundary(raw) {
            return None;
        }

        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line - 1,
        };
        let line_start = u32::from(self.line_starts[line]) as usize;
        let column = self.text[line_start..raw].chars().count() as u32;

        Some(Position::new(line as u32 + 1, column))
    }

    /// Converts a position back to a byte offset.
    ///
    /// Returns `None` if the line does not exist or the column lies past the
    /// end of the line content.
    pub fn offset(&self, position: Position) -> Option<ByteOffset> {
        let start = u32::from(self.line_start(position.line)?) as usize;
        let end = self
            .line_starts
            .get(position.line as usize)
            .map(|&next| u32::from(next) as usize)
            .unwrap_or(self.text.len());

        let line_text = &self.text[start..end];
        let mut chars = line_text.char_indices();
        let mut byte = 0;
        for _ in 0..position.column {
            let (_, c) = chars.next()?;
            byte += c.len_utf8();
        }
        Some(TextSize::from((start + byte) as u32))
    }

    /// Returns the byte offset where a 1-based line starts.
    pub fn line_start(&self, line: u32) -> Option<ByteOffset> {
        if line == 0 {
            return None;
        }
        self.line_starts.get(line as usize - 1).copied()
    }

    /// Returns the content of a 1-based line without its terminator.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        let start = u32::from(self.line_start(line)?) as usize;
        let end = self
            .line_starts
            .get(line as usize)
            .map(|&next| u32::from(next) as usize)
            .unwrap_or(self.text.len());
        Some(self.text[start..end].trim_end_matches(['\r', '\n']))
    }
}
