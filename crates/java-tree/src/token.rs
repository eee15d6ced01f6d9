//! Syntax tokens and the comments attached to them.

use java_source_map::{Position, Range, Span};
use smol_str::SmolStr;

use crate::lexer::TokenKind;
use crate::tree::NodeId;

/// A token of the syntax tree.
///
/// Every token owns the comments that precede it. The last token of a
/// compilation unit is an empty end-of-file token carrying the trailing
/// comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxToken {
    /// The lexical kind.
    pub kind: TokenKind,
    /// The exact source text.
    pub text: SmolStr,
    /// Where the token starts.
    pub start: Position,
    /// The byte span of the token.
    pub span: Span,
    /// Comments preceding the token, in source order.
    pub trivia: Vec<SyntaxTrivia>,
    /// True when the token text contains a unicode escape such as `\u0041`.
    pub is_unicode: bool,
    /// The node owning this token.
    pub parent: Option<NodeId>,
}

impl SyntaxToken {
    /// Returns the 1-based line of the token.
    pub fn line(&self) -> u32 {
        self.start.line
    }

    /// Returns the 0-based column of the token.
    pub fn column_offset(&self) -> u32 {
        self.start.column
    }

    /// Returns the range covered by the token text.
    ///
    /// Multi-line tokens (text blocks) end on a later line.
    pub fn range(&self) -> Range {
        Range::of_text(self.start, &self.text)
    }

    /// Returns true for the synthetic end-of-file token.
    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

/// How a comment was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TriviaKind {
    /// `// ...`
    Line,
    /// `/* ... */`
    Block,
    /// `/** ... */`
    Javadoc,
    /// One or more consecutive `/// ...` lines.
    Markdown,
}

impl TriviaKind {
    /// Classifies a comment from its opening sequence.
    pub fn of(comment: &str) -> TriviaKind {
        if comment.starts_with("///") {
            TriviaKind::Markdown
        } else if comment.starts_with("//") {
            TriviaKind::Line
        } else if comment.starts_with("/**") && comment != "/**/" {
            TriviaKind::Javadoc
        } else {
            TriviaKind::Block
        }
    }
}

/// A comment attached to a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTrivia {
    /// The exact comment text, delimiters included.
    pub text: SmolStr,
    /// The comment style.
    pub kind: TriviaKind,
    /// Where the comment starts.
    pub start: Position,
    /// The byte span of the comment.
    pub span: Span,
}

impl SyntaxTrivia {
    /// Creates a trivia, classifying it from its text.
    pub fn new(text: impl Into<SmolStr>, start: Position, span: Span) -> Self {
        let text = text.into();
        Self {
            kind: TriviaKind::of(&text),
            text,
            start,
            span,
        }
    }

    /// Returns the 1-based line where the comment starts.
    pub fn start_line(&self) -> u32 {
        self.start.line
    }

    /// Returns the 0-based column where the comment starts.
    pub fn column(&self) -> u32 {
        self.start.column
    }

    /// Returns the range covered by the comment.
    pub fn range(&self) -> Range {
        Range::of_text(self.start, &self.text)
    }

    /// Returns the comment text without its delimiters.
    ///
    /// Markdown comments also lose the `///` marker of every line. All
    /// line break styles are normalized to `\n`.
    pub fn comment_content(&self) -> String {
        let text = self.text.as_str();
        match self.kind {
            TriviaKind::Line => normalize_line_breaks(&text[2..]),
            TriviaKind::Block => normalize_line_breaks(&text[2..text.len() - 2]),
            TriviaKind::Javadoc => normalize_line_breaks(&text[3..text.len() - 2]),
            TriviaKind::Markdown => split_lines(text)
                .map(|line| {
                    let line = line.trim_start();
                    line.strip_prefix("///").unwrap_or(line)
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = Some(text);
    std::iter::from_fn(move || {
        let current = rest?;
        match current.find(['\r', '\n']) {
            Some(at) => {
                let skip = if current[at..].starts_with("\r\n") { 2 } else { 1 };
                rest = Some(&current[at + skip..]);
                Some(&current[..at])
            }
            None => {
                rest = None;
                Some(current)
            }
        }
    })
}

fn normalize_line_breaks(text: &str) -> String {
    split_lines(text).collect::<Vec<_>>().join("\n")
}
