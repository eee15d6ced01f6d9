//! Java lexer using logos.
//!
//! Whitespace and comments are produced as tokens so that the token
//! builder can attach comments as trivia and account for every byte of
//! the source. `>>`, `>>>` and their assignment forms are never produced:
//! the parser joins adjacent `>` tokens so that nested type arguments
//! (`List<List<String>>`) close naturally.

use java_source_map::Span;
use logos::Logos;

/// A raw token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The span of the token in the source.
    pub span: Span,
}

/// Token kinds for Java source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Logos, Default)]
pub enum TokenKind {
    // === Trivia ===
    /// Spaces, tabs, form feeds and line terminators.
    #[regex(r"[ \t\x0C\r\n]+")]
    Whitespace,

    /// `// ...` up to the end of the line.
    #[regex(r"//[^\r\n]*", allow_greedy = true)]
    LineComment,

    /// `/* ... */`, including javadoc.
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/", allow_greedy = true)]
    BlockComment,

    // === Keywords ===
    /// `abstract`
    #[token("abstract")]
    Abstract,
    /// `assert`
    #[token("assert")]
    Assert,
    /// `boolean`
    #[token("boolean")]
    Boolean,
    /// `break`
    #[token("break")]
    Break,
    /// `byte`
    #[token("byte")]
    Byte,
    /// `case`
    #[token("case")]
    Case,
    /// `catch`
    #[token("catch")]
    Catch,
    /// `char`
    #[token("char")]
    Char,
    /// `class`
    #[token("class")]
    Class,
    /// `const`
    #[token("const")]
    Const,
    /// `continue`
    #[token("continue")]
    Continue,
    /// `default`
    #[token("default")]
    Default,
    /// `do`
    #[token("do")]
    Do,
    /// `double`
    #[token("double")]
    Double,
    /// `else`
    #[token("else")]
    Else,
    /// `enum`
    #[token("enum")]
    Enum,
    /// `extends`
    #[token("extends")]
    Extends,
    /// `final`
    #[token("final")]
    Final,
    /// `finally`
    #[token("finally")]
    Finally,
    /// `float`
    #[token("float")]
    Float,
    /// `for`
    #[token("for")]
    For,
    /// `goto`
    #[token("goto")]
    Goto,
    /// `if`
    #[token("if")]
    If,
    /// `implements`
    #[token("implements")]
    Implements,
    /// `import`
    #[token("import")]
    Import,
    /// `instanceof`
    #[token("instanceof")]
    Instanceof,
    /// `int`
    #[token("int")]
    Int,
    /// `interface`
    #[token("interface")]
    Interface,
    /// `long`
    #[token("long")]
    Long,
    /// `native`
    #[token("native")]
    Native,
    /// `new`
    #[token("new")]
    New,
    /// `package`
    #[token("package")]
    Package,
    /// `private`
    #[token("private")]
    Private,
    /// `protected`
    #[token("protected")]
    Protected,
    /// `public`
    #[token("public")]
    Public,
    /// `return`
    #[token("return")]
    Return,
    /// `short`
    #[token("short")]
    Short,
    /// `static`
    #[token("static")]
    Static,
    /// `strictfp`
    #[token("strictfp")]
    Strictfp,
    /// `super`
    #[token("super")]
    Super,
    /// `switch`
    #[token("switch")]
    Switch,
    /// `synchronized`
    #[token("synchronized")]
    Synchronized,
    /// `this`
    #[token("this")]
    This,
    /// `throw`
    #[token("throw")]
    Throw,
    /// `throws`
    #[token("throws")]
    Throws,
    /// `transient`
    #[token("transient")]
    Transient,
    /// `try`
    #[token("try")]
    Try,
    /// `void`
    #[token("void")]
    Void,
    /// `volatile`
    #[token("volatile")]
    Volatile,
    /// `while`
    #[token("while")]
    While,
    /// `true`
    #[token("true")]
    True,
    /// `false`
    #[token("false")]
    False,
    /// `null`
    #[token("null")]
    Null,

    // === Separators ===
    /// `(`
    #[token("(")]
    LParen,
    /// `)`
    #[token(")")]
    RParen,
    /// `{`
    #[token("{")]
    LBrace,
    /// `}`
    #[token("}")]
    RBrace,
    /// `[`
    #[token("[")]
    LBracket,
    /// `]`
    #[token("]")]
    RBracket,
    /// `;`
    #[token(";")]
    Semicolon,
    /// `,`
    #[token(",")]
    Comma,
    /// `.`
    #[token(".")]
    Dot,
    /// `...`
    #[token("...")]
    Ellipsis,
    /// `@`
    #[token("@")]
    At,
    /// `::`
    #[token("::")]
    ColonColon,

    // === Operators ===
    /// `=`
    #[token("=")]
    Eq,
    /// `>`
    #[token(">")]
    Gt,
    /// `<`
    #[token("<")]
    Lt,
    /// `!`
    #[token("!")]
    Bang,
    /// `~`
    #[token("~")]
    Tilde,
    /// `?`
    #[token("?")]
    Question,
    /// `:`
    #[token(":")]
    Colon,
    /// `->`
    #[token("->")]
    Arrow,
    /// `==`
    #[token("==")]
    EqEq,
    /// `>=`
    #[token(">=")]
    GtEq,
    /// `<=`
    #[token("<=")]
    LtEq,
    /// `!=`
    #[token("!=")]
    NotEq,
    /// `&&`
    #[token("&&")]
    AmpAmp,
    /// `||`
    #[token("||")]
    PipePipe,
    /// `++`
    #[token("++")]
    PlusPlus,
    /// `--`
    #[token("--")]
    MinusMinus,
    /// `+`
    #[token("+")]
    Plus,
    /// `-`
    #[token("-")]
    Minus,
    /// `*`
    #[token("*")]
    Star,
    /// `/`
    #[token("/")]
    Slash,
    /// `&`
    #[token("&")]
    Amp,
    /// `|`
    #[token("|")]
    Pipe,
    /// `^`
    #[token("^")]
    Caret,
    /// `%`
    #[token("%")]
    Percent,
    /// `<<`
    #[token("<<")]
    LtLt,
    /// `+=`
    #[token("+=")]
    PlusEq,
    /// `-=`
    #[token("-=")]
    MinusEq,
    /// `*=`
    #[token("*=")]
    StarEq,
    /// `/=`
    #[token("/=")]
    SlashEq,
    /// `&=`
    #[token("&=")]
    AmpEq,
    /// `|=`
    #[token("|=")]
    PipeEq,
    /// `^=`
    #[token("^=")]
    CaretEq,
    /// `%=`
    #[token("%=")]
    PercentEq,
    /// `<<=`
    #[token("<<=")]
    LtLtEq,

    // === Literals ===
    /// `42`, `0x2A`, `0b101010`
    #[regex(r"[0-9][0-9_]*|0[xX][0-9a-fA-F_]+|0[bB][01_]+", priority = 3)]
    IntLiteral,

    /// `42L`
    #[regex(r"([0-9][0-9_]*|0[xX][0-9a-fA-F_]+|0[bB][01_]+)[lL]", priority = 4)]
    LongLiteral,

    /// `1.5f`
    #[regex(
        r"([0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9]+)?|\.[0-9][0-9_]*([eE][+-]?[0-9]+)?|[0-9][0-9_]*[eE][+-]?[0-9]+|[0-9][0-9_]*)[fF]",
        priority = 5
    )]
    FloatLiteral,

    /// `1.5`, `1e3`, `2d`
    #[regex(
        r"([0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9]+)?|\.[0-9][0-9_]*([eE][+-]?[0-9]+)?|[0-9][0-9_]*[eE][+-]?[0-9]+)[dD]?|[0-9][0-9_]*[dD]",
        priority = 6
    )]
    DoubleLiteral,

    /// `'a'`, `'\n'`
    #[regex(r"'([^'\\\r\n]|\\[^\r\n])*'")]
    CharLiteral,

    /// `"text"`
    #[regex(r#""([^"\\\r\n]|\\[^\r\n])*""#)]
    StringLiteral,

    /// `"""` text block, closed by the next unescaped `"""`.
    #[token(r#"""""#, text_block)]
    TextBlock,

    /// An identifier, possibly written with unicode escapes.
    #[regex(r"([\p{L}\p{Nl}_$]|\\u+[0-9a-fA-F]{4})([\p{L}\p{Nl}\p{Nd}\p{Mn}\p{Mc}\p{Pc}_$]|\\u+[0-9a-fA-F]{4})*")]
    Identifier,

    /// End of file
    Eof,

    /// Invalid/unknown token
    #[default]
    Error,
}

/// Consumes the body of a text block up to and including the closing `"""`.
fn text_block(lex: &mut logos::Lexer<'_, TokenKind>) -> bool {
    let rest = lex.remainder();
    let mut chars = rest.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '"' if rest[i..].starts_with(r#"""""#) => {
                lex.bump(i + 3);
                return true;
            }
            _ => {}
        }
    }
    lex.bump(rest.len());
    false
}

impl TokenKind {
    /// Returns true for whitespace and comments.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }

    /// Returns true for the primitive type keywords.
    pub fn is_primitive_type(&self) -> bool {
        matches!(
            self,
            TokenKind::Boolean
                | TokenKind::Byte
                | TokenKind::Char
                | TokenKind::Short
                | TokenKind::Int
                | TokenKind::Long
                | TokenKind::Float
                | TokenKind::Double
        )
    }

    /// Returns true for declaration modifiers.
    pub fn is_modifier(&self) -> bool {
        matches!(
            self,
            TokenKind::Public
                | TokenKind::Protected
                | TokenKind::Private
                | TokenKind::Static
                | TokenKind::Abstract
                | TokenKind::Final
                | TokenKind::Native
                | TokenKind::Synchronized
                | TokenKind::Transient
                | TokenKind::Volatile
                | TokenKind::Strictfp
                | TokenKind::Default
        )
    }

    /// Returns true for literal tokens.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::IntLiteral
                | TokenKind::LongLiteral
                | TokenKind::FloatLiteral
                | TokenKind::DoubleLiteral
                | TokenKind::CharLiteral
                | TokenKind::StringLiteral
                | TokenKind::TextBlock
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
        )
    }

    /// Returns a human-readable name for this token kind.
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Whitespace => "whitespace",
            TokenKind::LineComment | TokenKind::BlockComment => "comment",
            TokenKind::Abstract => "'abstract'",
            TokenKind::Assert => "'assert'",
            TokenKind::Boolean => "'boolean'",
            TokenKind::Break => "'break'",
            TokenKind::Byte => "'byte'",
            TokenKind::Case => "'case'",
            TokenKind::Catch => "'catch'",
            TokenKind::Char => "'char'",
            TokenKind::Class => "'class'",
            TokenKind::Const => "'const'",
            TokenKind::Continue => "'continue'",
            TokenKind::Default => "'default'",
            TokenKind::Do => "'do'",
            TokenKind::Double => "'double'",
            TokenKind::Else => "'else'",
            TokenKind::Enum => "'enum'",
            TokenKind::Extends => "'extends'",
            TokenKind::Final => "'final'",
            TokenKind::Finally => "'finally'",
            TokenKind::Float => "'float'",
            TokenKind::For => "'for'",
            TokenKind::Goto => "'goto'",
            TokenKind::If => "'if'",
            TokenKind::Implements => "'implements'",
            TokenKind::Import => "'import'",
            TokenKind::Instanceof => "'instanceof'",
            TokenKind::Int => "'int'",
            TokenKind::Interface => "'interface'",
            TokenKind::Long => "'long'",
            TokenKind::Native => "'native'",
            TokenKind::New => "'new'",
            TokenKind::Package => "'package'",
            TokenKind::Private => "'private'",
            TokenKind::Protected => "'protected'",
            TokenKind::Public => "'public'",
            TokenKind::Return => "'return'",
            TokenKind::Short => "'short'",
            TokenKind::Static => "'static'",
            TokenKind::Strictfp => "'strictfp'",
            TokenKind::Super => "'super'",
            TokenKind::Switch => "'switch'",
            TokenKind::Synchronized => "'synchronized'",
            TokenKind::This => "'this'",
            TokenKind::Throw => "'throw'",
            TokenKind::Throws => "'throws'",
            TokenKind::Transient => "'transient'",
            TokenKind::Try => "'try'",
            TokenKind::Void => "'void'",
            TokenKind::Volatile => "'volatile'",
            TokenKind::While => "'while'",
            TokenKind::True => "'true'",
            TokenKind::False => "'false'",
            TokenKind::Null => "'null'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Semicolon => "';'",
            TokenKind::Comma => "','",
            TokenKind::Dot => "'.'",
            TokenKind::Ellipsis => "'...'",
            TokenKind::At => "'@'",
            TokenKind::ColonColon => "'::'",
            TokenKind::Eq => "'='",
            TokenKind::Gt => "'>'",
            TokenKind::Lt => "'<'",
            TokenKind::Bang => "'!'",
            TokenKind::Tilde => "'~'",
            TokenKind::Question => "'?'",
            TokenKind::Colon => "':'",
            TokenKind::Arrow => "'->'",
            TokenKind::EqEq => "'=='",
            TokenKind::GtEq => "'>='",
            TokenKind::LtEq => "'<='",
            TokenKind::NotEq => "'!='",
            TokenKind::AmpAmp => "'&&'",
            TokenKind::PipePipe => "'||'",
            TokenKind::PlusPlus => "'++'",
            TokenKind::MinusMinus => "'--'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Amp => "'&'",
            TokenKind::Pipe => "'|'",
            TokenKind::Caret => "'^'",
            TokenKind::Percent => "'%'",
            TokenKind::LtLt => "'<<'",
            TokenKind::PlusEq => "'+='",
            TokenKind::MinusEq => "'-='",
            TokenKind::StarEq => "'*='",
            TokenKind::SlashEq => "'/='",
            TokenKind::AmpEq => "'&='",
            TokenKind::PipeEq => "'|='",
            TokenKind::CaretEq => "'^='",
            TokenKind::PercentEq => "'%='",
            TokenKind::LtLtEq => "'<<='",
            TokenKind::IntLiteral => "integer literal",
            TokenKind::LongLiteral => "long literal",
            TokenKind::FloatLiteral => "float literal",
            TokenKind::DoubleLiteral => "double literal",
            TokenKind::CharLiteral => "character literal",
            TokenKind::StringLiteral => "string literal",
            TokenKind::TextBlock => "text block",
            TokenKind::Identifier => "identifier",
            TokenKind::Eof => "end of file",
            TokenKind::Error => "invalid token",
        }
    }
}

/// A lexer for Java source code.
///
/// Yields every token including whitespace and comments, followed by a
/// single [`TokenKind::Eof`] token.
pub struct Lexer<'src> {
    inner: logos::Lexer<'src, TokenKind>,
    source: &'src str,
    finished: bool,
}

impl<'src> Lexer<'src> {
    /// Creates a new lexer for the given source.
    pub fn new(source: &'src str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            source,
            finished: false,
        }
    }

    /// Returns the source string being lexed.
    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Returns the text of the current token.
    pub fn slice(&self) -> &'src str {
        self.inner.slice()
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.inner.next() {
            Some(result) => Some(Token {
                kind: result.unwrap_or(TokenKind::Error),
                span: Span::from_range(self.inner.span()),
            }),
            None => {
                self.finished = true;
                Some(Token {
                    kind: TokenKind::Eof,
                    span: Span::from_range(self.source.len()..self.source.len()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokenize(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .map(|t| t.kind)
            .filter(|k| *k != TokenKind::Eof && *k != TokenKind::Whitespace)
            .collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            tokenize("class Foo extends iffy"),
            vec![
                TokenKind::Class,
                TokenKind::Identifier,
                TokenKind::Extends,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_numeric_literals() {
        assert_eq!(
            tokenize("1 0x1F 0b11 2L 1.5 .5 1e3 2d 1.5f 3F 1_000"),
            vec![
                TokenKind::IntLiteral,
                TokenKind::IntLiteral,
                TokenKind::IntLiteral,
                TokenKind::LongLiteral,
                TokenKind::DoubleLiteral,
                TokenKind::DoubleLiteral,
                TokenKind::DoubleLiteral,
                TokenKind::DoubleLiteral,
                TokenKind::FloatLiteral,
                TokenKind::FloatLiteral,
                TokenKind::IntLiteral,
            ]
        );
    }

    #[test]
    fn test_string_and_char_literals() {
        assert_eq!(
            tokenize(r#""a\"b" 'c' '\'' """#),
            vec![
                TokenKind::StringLiteral,
                TokenKind::CharLiteral,
                TokenKind::CharLiteral,
                TokenKind::StringLiteral,
            ]
        );
    }

    #[test]
    fn test_text_block() {
        let source = "x = \"\"\"\n  a \\\"\"\" b\n  \"\"\";";
        let tokens: Vec<Token> = Lexer::new(source)
            .filter(|t| t.kind != TokenKind::Whitespace)
            .collect();
        assert_eq!(tokens[2].kind, TokenKind::TextBlock);
        assert_eq!(
            tokens[2].span.slice(source),
            "\"\"\"\n  a \\\"\"\" b\n  \"\"\""
        );
        assert_eq!(tokens[3].kind, TokenKind::Semicolon);
    }

    #[test]
    fn test_unterminated_text_block_is_an_error() {
        assert_eq!(tokenize("\"\"\"\nabc"), vec![TokenKind::Error]);
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            tokenize("// line\n/* block */ /** doc */ /**/ a"),
            vec![
                TokenKind::LineComment,
                TokenKind::BlockComment,
                TokenKind::BlockComment,
                TokenKind::BlockComment,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_shift_operators_are_split() {
        // `>>` is assembled by the parser
        assert_eq!(
            tokenize("a >> b <<= c"),
            vec![
                TokenKind::Identifier,
                TokenKind::Gt,
                TokenKind::Gt,
                TokenKind::Identifier,
                TokenKind::LtLtEq,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_unicode_identifiers() {
        assert_eq!(
            tokenize("caf\u{e9} \\u0041bc"),
            vec![TokenKind::Identifier, TokenKind::Identifier]
        );
    }

    #[test]
    fn test_lambda_and_method_reference() {
        assert_eq!(
            tokenize("x -> String::valueOf"),
            vec![
                TokenKind::Identifier,
                TokenKind::Arrow,
                TokenKind::Identifier,
                TokenKind::ColonColon,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_eof_span() {
        let last = Lexer::new("a").last().unwrap();
        assert_eq!(last.kind, TokenKind::Eof);
        assert!(last.span.is_empty());
    }
}
