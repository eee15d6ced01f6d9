//! Java syntax tree for java-frontend.
//!
//! This crate provides:
//! - Lexer (tokenizer) using `logos`
//! - An arena-backed syntax tree whose tokens carry their comments
//! - A recursive descent parser for the supported Java subset, with error
//!   recovery
//! - Local binding resolution with an explicit unknown symbol, and the
//!   compiler-style problems found on the way
//!
//! # Example
//!
//! ```
//! use java_tree::{parse, Kind};
//!
//! let result = parse("class A { void f() { int x = 1; } }");
//! assert!(result.errors.is_empty());
//! assert_eq!(result.tree.kind(result.tree.root()), Kind::CompilationUnit);
//! ```

mod error;
mod kind;
mod lexer;
mod node_ref;
mod parser;
mod problem;
mod resolve;
mod symbols;
mod token;
mod tree;

use std::fmt;
use std::str::FromStr;

pub use error::{ParseError, ParseErrorKind};
pub use java_source_map::{Position, Range, Span};
pub use kind::Kind;
pub use lexer::{Lexer, Token, TokenKind};
pub use node_ref::NodeRef;
pub use problem::{Problem, ProblemKind};
pub use symbols::{JavaType, Symbol, SymbolId, SymbolKind, SymbolTable};
pub use token::{SyntaxToken, SyntaxTrivia, TriviaKind};
pub use tree::{Element, Node, NodeData, NodeId, SyntaxTree, TokenId};

/// A Java language level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JavaVersion(pub u32);

impl JavaVersion {
    /// The level assumed when none is configured.
    pub const DEFAULT: JavaVersion = JavaVersion(17);

    /// Returns true if `var` declares local variables.
    pub fn supports_var(self) -> bool {
        self.0 >= 10
    }

    /// Returns true if `"""` text blocks are available.
    pub fn supports_text_blocks(self) -> bool {
        self.0 >= 15
    }
}

impl Default for JavaVersion {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for JavaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JavaVersion {
    type Err = String;

    /// Accepts `17` as well as the legacy `1.8` spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let number = s.strip_prefix("1.").unwrap_or(s);
        number
            .parse()
            .map(JavaVersion)
            .map_err(|_| format!("invalid Java version `{s}`"))
    }
}

/// Options for parsing Java files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Whether identifiers and invocations are bound to symbols. When
    /// false, every binding query answers the unknown symbol.
    pub resolve_bindings: bool,
    /// The language level of the source.
    pub java_version: JavaVersion,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            resolve_bindings: true,
            java_version: JavaVersion::DEFAULT,
        }
    }
}

/// The result of parsing a Java file.
#[derive(Debug)]
pub struct ParseResult {
    /// The parsed compilation unit.
    pub tree: SyntaxTree,
    /// Any errors encountered during parsing.
    pub errors: Vec<ParseError>,
    /// Problems found while resolving bindings.
    pub problems: Vec<Problem>,
}

/// Parses a Java compilation unit.
///
/// This function always produces a tree. Unparseable regions become
/// `NotImplemented` nodes and are reported in [`ParseResult::errors`].
pub fn parse(source: &str) -> ParseResult {
    parse_with_options(source, ParseOptions::default())
}

/// Parses a Java compilation unit with custom options.
pub fn parse_with_options(source: &str, options: ParseOptions) -> ParseResult {
    let (mut tree, errors) = parser::Parser::new(source, options).parse();
    let problems = if options.resolve_bindings {
        resolve::resolve(&mut tree)
    } else {
        Vec::new()
    };
    ParseResult {
        tree,
        errors,
        problems,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        let result = parse("");
        assert!(result.errors.is_empty());
        assert_eq!(result.tree.tokens().len(), 1);
    }

    #[test]
    fn test_java_version_from_str() {
        assert_eq!("1.8".parse::<JavaVersion>(), Ok(JavaVersion(8)));
        assert_eq!("21".parse::<JavaVersion>(), Ok(JavaVersion(21)));
        assert!("eleven".parse::<JavaVersion>().is_err());
    }

    #[test]
    fn test_unresolved_mode_answers_unknown() {
        let options = ParseOptions {
            resolve_bindings: false,
            ..ParseOptions::default()
        };
        let result = parse_with_options("class A { int x; void f() { x = 1; } }", options);
        assert!(result.tree.symbols().is_empty());
        for (id, _) in result.tree.nodes() {
            assert!(result.tree.symbol(id).is_unknown());
        }
    }
}
