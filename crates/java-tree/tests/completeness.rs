//! Checks that tokens and trivia account for every character of a file.
//!
//! The text is rebuilt from line/column positions only: each token and
//! comment is located through its range, and the gaps between them must be
//! pure whitespace.

use java_tree::{parse, Position, SyntaxTree};
use pretty_assertions::assert_eq;

const SOURCES: &[(&str, &str)] = &[
    ("empty", ""),
    ("only_comment", "// nothing here\n"),
    (
        "class_with_comments",
        r#"package a.b;

import java.util.List; // trailing

/**
 * Javadoc.
 */
public class A<T> extends B implements C, D {
    /* block */ private int x = 0x1F, y;
    /// markdown
    /// continued
    void f(String... args) throws Exception {
        label:
        for (int i = 0; i < args.length; i++) {
            if (args[i] == null) continue label; else break;
        }
        String s = """
            text block
            """;
        Runnable r = () -> System.out.println(s);
    }
}
"#,
    ),
    (
        "crlf_and_cr",
        "class A {\r\n  int x; // one\r\n  /* two\r\n  lines */ int y;\r  int z;\r}\r\n",
    ),
    (
        "unicode",
        "class Ünïcödé { String s = \"héllo 🌍\"; char c = '\\u0041'; int \\u0061bc = 1; }",
    ),
    (
        "recovery",
        "class A { void f() { int x = ; ) # g(; } ",
    ),
];

/// Rebuilds the source from token and trivia ranges.
fn rebuild(tree: &SyntaxTree) -> String {
    let index = tree.line_index();
    let source = tree.source();
    let mut out = String::new();
    let mut cursor = 0usize;

    let mut place = |start: Position, text: &str, out: &mut String| {
        let offset = u32::from(index.offset(start).expect("position inside the file")) as usize;
        let gap = &source[cursor..offset];
        assert!(
            gap.chars().all(char::is_whitespace),
            "non-whitespace gap {gap:?} before {text:?}"
        );
        out.push_str(gap);
        out.push_str(text);
        cursor = offset + text.len();
    };

    for token in tree.tokens() {
        for trivia in &token.trivia {
            place(trivia.start, &trivia.text, &mut out);
        }
        place(token.start, &token.text, &mut out);
    }
    out.push_str(&source[cursor..]);
    out
}

#[test]
fn test_tokens_and_trivia_cover_the_source() {
    for (name, source) in SOURCES {
        let result = parse(source);
        assert_eq!(&rebuild(&result.tree), source, "{name}");
    }
}

#[test]
fn test_token_ranges_match_their_text() {
    for (name, source) in SOURCES {
        let result = parse(source);
        let tree = &result.tree;
        for token in tree.tokens() {
            let range = token.range();
            let start = u32::from(tree.line_index().offset(range.start).unwrap()) as usize;
            let end = u32::from(tree.line_index().offset(range.end).unwrap()) as usize;
            assert_eq!(&source[start..end], token.text.as_str(), "{name}");
        }
    }
}

#[test]
fn test_every_token_has_a_parent() {
    for (name, source) in SOURCES {
        let result = parse(source);
        for token in result.tree.tokens() {
            assert!(token.parent.is_some(), "{name}: `{}` is detached", token.text);
        }
    }
}

#[test]
fn test_last_token_is_eof() {
    for (name, source) in SOURCES {
        let result = parse(source);
        let last = result.tree.tokens().last().unwrap();
        assert!(last.is_eof(), "{name}");
        assert!(last.text.is_empty(), "{name}");
    }
}
