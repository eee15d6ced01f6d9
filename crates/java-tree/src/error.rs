//! Parse error types.

use java_source_map::{Range, Span};
use thiserror::Error;

/// An error that occurred during parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct ParseError {
    /// The kind of error.
    pub kind: ParseErrorKind,
    /// The location in the source where the error occurred.
    pub span: Span,
    /// The same location as lines and columns.
    pub range: Range,
}

impl ParseError {
    /// Creates a new parse error.
    pub fn new(kind: ParseErrorKind, span: Span, range: Range) -> Self {
        Self { kind, span, range }
    }
}

/// The kind of parse error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// An unexpected token was encountered.
    #[error("unexpected token: expected {expected}, found {found}")]
    UnexpectedToken {
        /// What was expected.
        expected: String,
        /// What was found.
        found: String,
    },

    /// An unexpected end of file was encountered.
    #[error("unexpected end of file: expected {expected}")]
    UnexpectedEof {
        /// What was expected.
        expected: String,
    },

    /// The lexer could not recognize the input.
    #[error("invalid token: {text}")]
    InvalidToken {
        /// The unrecognized text.
        text: String,
    },

    /// A construct requires a newer language level.
    #[error("{feature} requires Java {required} or later")]
    UnsupportedFeature {
        /// The construct.
        feature: &'static str,
        /// The minimal Java version.
        required: u32,
    },

    /// A construct outside the supported grammar.
    #[error("unsupported syntax: {message}")]
    UnsupportedSyntax {
        /// A description of the construct.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use java_source_map::Position;

    #[test]
    fn test_error_display() {
        let error = ParseError::new(
            ParseErrorKind::UnexpectedToken {
                expected: "';'".to_string(),
                found: "'}'".to_string(),
            },
            Span::from_range(0..1),
            Range::empty(Position::FIRST),
        );
        assert_eq!(error.to_string(), "unexpected token: expected ';', found '}'");
    }

    #[test]
    fn test_unsupported_feature_display() {
        let kind = ParseErrorKind::UnsupportedFeature {
            feature: "text blocks",
            required: 15,
        };
        assert_eq!(kind.to_string(), "text blocks requires Java 15 or later");
    }
}
