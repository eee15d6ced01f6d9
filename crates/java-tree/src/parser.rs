//! Recursive descent parser for Java.
//!
//! Children are collected on a pending stack: [`Parser::start`] remembers
//! the stack height, tokens and finished nodes are pushed as they are
//! consumed, and [`Parser::finish`] drains everything above the marker into
//! a new node. A node that turns out to be the left operand of a larger
//! construct is reopened with [`Parser::precede`].

use java_source_map::{LineIndex, Position, Range, Span};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::trace;

use crate::error::{ParseError, ParseErrorKind};
use crate::kind::Kind;
use crate::lexer::{Lexer, TokenKind};
use crate::symbols::SymbolTable;
use crate::token::{SyntaxToken, SyntaxTrivia, TriviaKind};
use crate::tree::{Element, Node, NodeData, NodeId, SyntaxTree, TokenId};
use crate::ParseOptions;

/// Tokens that end an expression when met where an operand was expected.
const EXPRESSION_FOLLOW: &[TokenKind] = &[
    TokenKind::Semicolon,
    TokenKind::RParen,
    TokenKind::RBrace,
    TokenKind::RBracket,
    TokenKind::Comma,
    TokenKind::Colon,
    TokenKind::Eof,
];

/// Precedence shared by `instanceof` and the relational operators.
const INSTANCEOF_PRECEDENCE: u8 = 7;

/// A position on the pending stack.
#[derive(Debug, Clone, Copy)]
struct Marker(usize);

/// The Java parser.
pub struct Parser {
    /// Line lookup for token positions.
    line_index: LineIndex,
    /// Significant tokens, end-of-file token last.
    tokens: Vec<SyntaxToken>,
    /// Current position in the token stream.
    pos: usize,
    /// Finished nodes.
    nodes: Vec<Node>,
    /// Children of the nodes under construction.
    pending: Vec<Element>,
    /// Parse errors collected during parsing.
    errors: Vec<ParseError>,
    /// Parser options.
    options: ParseOptions,
}

impl Parser {
    /// Creates a new parser.
    pub fn new(source: &str, options: ParseOptions) -> Self {
        let line_index = LineIndex::new(source);
        let tokens = build_tokens(source, &line_index);
        Self {
            line_index,
            tokens,
            pos: 0,
            nodes: Vec::new(),
            pending: Vec::new(),
            errors: Vec::new(),
            options,
        }
    }

    /// Parses the source into a compilation unit.
    pub fn parse(mut self) -> (SyntaxTree, Vec<ParseError>) {
        let root = self.parse_compilation_unit();
        debug_assert_eq!(self.pending.len(), 1);
        trace!(
            nodes = self.nodes.len(),
            tokens = self.tokens.len(),
            errors = self.errors.len(),
            "parsed compilation unit"
        );
        let tree = SyntaxTree {
            line_index: self.line_index,
            tokens: self.tokens,
            nodes: self.nodes,
            root,
            symbols: SymbolTable::new(),
            bindings: FxHashMap::default(),
        };
        (tree, self.errors)
    }

    // === Token helpers ===

    /// Returns the current token.
    fn current(&self) -> &SyntaxToken {
        self.nth_token(0)
    }

    fn nth_token(&self, n: usize) -> &SyntaxToken {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)]
    }

    /// Returns the current token kind.
    fn current_kind(&self) -> TokenKind {
        self.current().kind
    }

    /// Returns the kind of the token `n` positions ahead.
    fn nth(&self, n: usize) -> TokenKind {
        self.nth_token(n).kind
    }

    fn kind_at(&self, index: usize) -> TokenKind {
        let last = self.tokens.len() - 1;
        self.tokens[index.min(last)].kind
    }

    /// Checks if the current token matches the given kind.
    fn at(&self, kind: TokenKind) -> bool {
        self.current_kind() == kind
    }

    /// Checks for a contextual keyword such as `var`.
    fn at_contextual(&self, word: &str) -> bool {
        self.at(TokenKind::Identifier) && self.current().text == word
    }

    /// Returns true if token `n` starts right where token `n - 1` ends.
    fn joined(&self, n: usize) -> bool {
        self.nth_token(n).span.start == self.nth_token(n - 1).span.end
    }

    /// Moves the current token onto the pending stack.
    fn bump(&mut self) -> TokenId {
        let id = TokenId(self.pos as u32);
        self.pending.push(Element::Token(id));
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        id
    }

    /// Advances if the current token matches, returns true if matched.
    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Expects the current token to be the given kind, reports error if not.
    fn expect(&mut self, kind: TokenKind) -> bool {
        if self.eat(kind) {
            true
        } else {
            self.error_expected(kind.name());
            false
        }
    }

    // === Node helpers ===

    fn start(&self) -> Marker {
        Marker(self.pending.len())
    }

    /// Reopens a finished node so that it becomes the first child of a new one.
    fn precede(&self, node: NodeId) -> Marker {
        let index = self
            .pending
            .iter()
            .rposition(|&element| element == Element::Node(node))
            .unwrap_or(self.pending.len());
        Marker(index)
    }

    fn finish(&mut self, marker: Marker, kind: Kind, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let children: Vec<Element> = self.pending.drain(marker.0..).collect();
        for &child in &children {
            match child {
                Element::Node(node) => self.nodes[node.index()].parent = Some(id),
                Element::Token(token) => self.tokens[token.index()].parent = Some(id),
            }
        }
        self.nodes.push(Node {
            kind,
            parent: None,
            children,
            data,
        });
        self.pending.push(Element::Node(id));
        id
    }

    /// Wraps the current token in a `NotImplemented` node, guaranteeing progress.
    fn recover_token(&mut self) -> NodeId {
        let text = self.current().text.clone();
        match self.current_kind() {
            TokenKind::Error => self.error(ParseErrorKind::InvalidToken {
                text: text.to_string(),
            }),
            _ => self.error(ParseErrorKind::UnsupportedSyntax {
                message: format!("unexpected `{text}`"),
            }),
        }
        trace!(token = %text, "skipping token");
        let m = self.start();
        if !self.at(TokenKind::Eof) {
            self.bump();
        }
        self.finish(m, Kind::NotImplemented, NodeData::Other)
    }

    /// Creates a node without tokens standing for a missing construct.
    fn missing(&mut self) -> NodeId {
        let m = self.start();
        self.finish(m, Kind::NotImplemented, NodeData::Other)
    }

    // === Errors ===

    /// Reports an error at the current position.
    fn error(&mut self, kind: ParseErrorKind) {
        let token = self.current();
        let error = ParseError::new(kind, token.span, token.range());
        self.errors.push(error);
    }

    fn error_expected(&mut self, expected: &str) {
        let kind = if self.at(TokenKind::Eof) {
            ParseErrorKind::UnexpectedEof {
                expected: expected.to_string(),
            }
        } else {
            ParseErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                found: self.current_kind().name().to_string(),
            }
        };
        self.error(kind);
    }

    // === Compilation unit ===

    fn parse_compilation_unit(&mut self) -> NodeId {
        let m = self.start();

        let package = if self.at(TokenKind::Package) {
            Some(self.parse_package())
        } else {
            None
        };

        let mut imports = Vec::new();
        loop {
            if self.at(TokenKind::Import) {
                imports.push(self.parse_import());
            } else if !self.eat(TokenKind::Semicolon) {
                break;
            }
        }

        let mut types = Vec::new();
        while !self.at(TokenKind::Eof) {
            if self.eat(TokenKind::Semicolon) {
                continue;
            }
            let before = self.pos;
            let declaration = self.parse_type_declaration();
            if self.pos == before {
                self.recover_token();
            } else {
                types.push(declaration);
            }
        }

        // end-of-file token, carrying the trailing comments
        self.bump();
        self.finish(
            m,
            Kind::CompilationUnit,
            NodeData::CompilationUnit {
                package,
                imports,
                types,
            },
        )
    }

    fn parse_package(&mut self) -> NodeId {
        let m = self.start();
        self.bump();
        let name = self.parse_qualified_name();
        self.expect(TokenKind::Semicolon);
        self.finish(m, Kind::PackageDeclaration, NodeData::Package { name })
    }

    fn parse_import(&mut self) -> NodeId {
        let m = self.start();
        self.bump();
        let is_static = self.eat(TokenKind::Static);
        let qualified_name = self.parse_qualified_name();
        let mut on_demand = false;
        if self.at(TokenKind::Dot) && self.nth(1) == TokenKind::Star {
            self.bump();
            self.bump();
            on_demand = true;
        }
        self.expect(TokenKind::Semicolon);
        self.finish(
            m,
            Kind::ImportDeclaration,
            NodeData::Import {
                is_static,
                qualified_name,
                on_demand,
            },
        )
    }

    /// Parses `a.b.c` into nested member selects.
    fn parse_qualified_name(&mut self) -> NodeId {
        let mut name = self.parse_identifier();
        while self.at(TokenKind::Dot) && self.nth(1) == TokenKind::Identifier {
            let m = self.precede(name);
            self.bump();
            let identifier = self.parse_identifier();
            name = self.finish(
                m,
                Kind::MemberSelect,
                NodeData::MemberSelect {
                    expression: name,
                    identifier,
                },
            );
        }
        name
    }

    fn parse_identifier(&mut self) -> NodeId {
        if self.at(TokenKind::Identifier) {
            self.bump_identifier()
        } else {
            self.error_expected("identifier");
            self.missing()
        }
    }

    /// Wraps the current token (identifier, `this`, `super`, `class`, `new`) in an identifier.
    fn bump_identifier(&mut self) -> NodeId {
        let m = self.start();
        let name = self.bump();
        self.finish(m, Kind::Identifier, NodeData::Identifier { name })
    }

    // === Declarations ===

    fn parse_modifiers(&mut self) -> NodeId {
        let m = self.start();
        let mut annotations = Vec::new();
        loop {
            if self.at(TokenKind::At) && self.nth(1) != TokenKind::Interface {
                annotations.push(self.parse_annotation());
            } else if self.current_kind().is_modifier() {
                self.bump();
            } else {
                break;
            }
        }
        self.finish(m, Kind::Modifiers, NodeData::Modifiers { annotations })
    }

    fn parse_annotation(&mut self) -> NodeId {
        let m = self.start();
        self.bump();
        let annotation_type = self.parse_qualified_name();
        let mut arguments = Vec::new();
        if self.eat(TokenKind::LParen) {
            while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
                arguments.push(self.parse_annotation_argument());
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen);
        }
        self.finish(
            m,
            Kind::Annotation,
            NodeData::Annotation {
                annotation_type,
                arguments,
            },
        )
    }

    fn parse_annotation_argument(&mut self) -> NodeId {
        if self.at(TokenKind::Identifier) && self.nth(1) == TokenKind::Eq {
            let m = self.start();
            let variable = self.parse_identifier();
            self.bump();
            let expression = self.parse_element_value();
            return self.finish(
                m,
                Kind::Assignment,
                NodeData::Assignment {
                    variable,
                    expression,
                },
            );
        }
        self.parse_element_value()
    }

    fn parse_element_value(&mut self) -> NodeId {
        match self.current_kind() {
            TokenKind::LBrace => self.parse_array_initializer(),
            TokenKind::At => self.parse_annotation(),
            _ => self.parse_expression(),
        }
    }

    fn parse_type_declaration(&mut self) -> NodeId {
        let m = self.start();
        let modifiers = self.parse_modifiers();
        self.parse_class_rest(m, modifiers)
    }

    fn parse_class_rest(&mut self, m: Marker, modifiers: NodeId) -> NodeId {
        let kind = match self.current_kind() {
            TokenKind::Class => Kind::Class,
            TokenKind::Interface => Kind::Interface,
            TokenKind::Enum => Kind::Enum,
            TokenKind::At if self.nth(1) == TokenKind::Interface => {
                self.bump();
                Kind::AnnotationType
            }
            _ => {
                self.error_expected("class, interface or enum");
                return self.finish(m, Kind::NotImplemented, NodeData::Other);
            }
        };
        self.bump();
        let name = Some(self.parse_identifier());
        if self.at(TokenKind::Lt) {
            self.parse_type_parameters();
        }

        let mut superclass = None;
        let mut interfaces = Vec::new();
        if self.eat(TokenKind::Extends) {
            if kind == Kind::Interface {
                self.parse_type_list(&mut interfaces);
            } else {
                superclass = Some(self.parse_type());
            }
        }
        if self.eat(TokenKind::Implements) {
            self.parse_type_list(&mut interfaces);
        }

        let members = self.parse_class_body(kind);
        self.finish(
            m,
            kind,
            NodeData::ClassDecl {
                modifiers,
                name,
                superclass,
                interfaces,
                members,
            },
        )
    }

    fn parse_type_list(&mut self, types: &mut Vec<NodeId>) {
        loop {
            types.push(self.parse_type());
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
    }

    /// Consumes `<...>` type parameters as an opaque node.
    fn parse_type_parameters(&mut self) -> NodeId {
        let m = self.start();
        let mut depth = 0usize;
        loop {
            match self.current_kind() {
                TokenKind::Lt => depth += 1,
                TokenKind::Gt => depth = depth.saturating_sub(1),
                TokenKind::Eof => break,
                _ => {}
            }
            self.bump();
            if depth == 0 {
                break;
            }
        }
        self.finish(m, Kind::TypeParameters, NodeData::Other)
    }

    fn parse_class_body(&mut self, kind: Kind) -> Vec<NodeId> {
        let mut members = Vec::new();
        if !self.expect(TokenKind::LBrace) {
            return members;
        }

        if kind == Kind::Enum {
            while self.at(TokenKind::Identifier) || self.at(TokenKind::At) {
                members.push(self.parse_enum_constant());
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            if !self.eat(TokenKind::Semicolon) && !self.at(TokenKind::RBrace) {
                self.error_expected("';'");
            }
        }

        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            if self.eat(TokenKind::Semicolon) {
                continue;
            }
            let before = self.pos;
            self.parse_member(&mut members);
            if self.pos == before {
                self.recover_token();
            }
        }
        self.expect(TokenKind::RBrace);
        members
    }

    fn parse_enum_constant(&mut self) -> NodeId {
        let m = self.start();
        self.parse_modifiers();
        let name = self.parse_identifier();
        let arguments = if self.at(TokenKind::LParen) {
            self.parse_arguments()
        } else {
            Vec::new()
        };
        let body = if self.at(TokenKind::LBrace) {
            Some(self.parse_anonymous_class_body())
        } else {
            None
        };
        self.finish(
            m,
            Kind::EnumConstant,
            NodeData::EnumConstant {
                name,
                arguments,
                body,
            },
        )
    }

    fn parse_anonymous_class_body(&mut self) -> NodeId {
        let m = self.start();
        let modifiers = self.empty_modifiers();
        let members = self.parse_class_body(Kind::Class);
        self.finish(
            m,
            Kind::Class,
            NodeData::ClassDecl {
                modifiers,
                name: None,
                superclass: None,
                interfaces: Vec::new(),
                members,
            },
        )
    }

    fn empty_modifiers(&mut self) -> NodeId {
        let m = self.start();
        self.finish(
            m,
            Kind::Modifiers,
            NodeData::Modifiers {
                annotations: Vec::new(),
            },
        )
    }

    fn parse_member(&mut self, members: &mut Vec<NodeId>) {
        let m = self.start();

        if self.at(TokenKind::LBrace) {
            let body = self.parse_block_body();
            members.push(self.finish(m, Kind::Initializer, NodeData::Block { body }));
            return;
        }
        if self.at(TokenKind::Static) && self.nth(1) == TokenKind::LBrace {
            self.bump();
            let body = self.parse_block_body();
            members.push(self.finish(m, Kind::StaticInitializer, NodeData::Block { body }));
            return;
        }

        let modifiers = self.parse_modifiers();
        match self.current_kind() {
            TokenKind::Class | TokenKind::Interface | TokenKind::Enum => {
                members.push(self.parse_class_rest(m, modifiers));
                return;
            }
            TokenKind::At if self.nth(1) == TokenKind::Interface => {
                members.push(self.parse_class_rest(m, modifiers));
                return;
            }
            _ => {}
        }

        if self.at(TokenKind::Lt) {
            self.parse_type_parameters();
        }

        if self.at(TokenKind::Identifier) && self.nth(1) == TokenKind::LParen {
            let name = self.parse_identifier();
            members.push(self.parse_method_rest(m, modifiers, None, name, Kind::Constructor));
            return;
        }

        let ty = if self.at(TokenKind::Void) {
            let void = self.start();
            let keyword = self.bump();
            self.finish(void, Kind::PrimitiveType, NodeData::PrimitiveType { keyword })
        } else {
            self.parse_type()
        };
        let name = self.parse_identifier();
        if self.at(TokenKind::LParen) {
            members.push(self.parse_method_rest(m, modifiers, Some(ty), name, Kind::Method));
        } else {
            self.parse_declarators(m, modifiers, Some(ty), name, members, true);
        }
    }

    fn parse_method_rest(
        &mut self,
        m: Marker,
        modifiers: NodeId,
        return_type: Option<NodeId>,
        name: NodeId,
        kind: Kind,
    ) -> NodeId {
        let parameters = self.parse_formal_parameters();
        self.skip_dimensions();

        let mut throws = Vec::new();
        if self.eat(TokenKind::Throws) {
            self.parse_type_list(&mut throws);
        }
        let default_value = if self.eat(TokenKind::Default) {
            Some(self.parse_element_value())
        } else {
            None
        };
        let body = if self.at(TokenKind::LBrace) {
            Some(self.parse_block())
        } else {
            self.expect(TokenKind::Semicolon);
            None
        };

        self.finish(
            m,
            kind,
            NodeData::Method {
                modifiers,
                return_type,
                name,
                parameters,
                throws,
                default_value,
                body,
            },
        )
    }

    fn parse_formal_parameters(&mut self) -> Vec<NodeId> {
        let mut parameters = Vec::new();
        if !self.expect(TokenKind::LParen) {
            return parameters;
        }
        while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
            parameters.push(self.parse_formal_parameter());
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen);
        parameters
    }

    fn parse_formal_parameter(&mut self) -> NodeId {
        let m = self.start();
        let modifiers = self.parse_modifiers();
        let mut ty = self.parse_type();
        if self.at(TokenKind::Ellipsis) {
            let varargs = self.precede(ty);
            self.bump();
            ty = self.finish(varargs, Kind::ArrayType, NodeData::ArrayType { ty });
        }
        let name = self.parse_identifier();
        self.skip_dimensions();
        self.finish(
            m,
            Kind::Variable,
            NodeData::Variable {
                modifiers,
                ty: Some(ty),
                name,
                initializer: None,
            },
        )
    }

    /// Parses `name [= init] {, name [= init]}` after a shared type.
    ///
    /// Every declarator becomes its own variable; later declarators refer to
    /// the modifiers and type owned by the first one.
    fn parse_declarators(
        &mut self,
        mut m: Marker,
        modifiers: NodeId,
        ty: Option<NodeId>,
        mut name: NodeId,
        out: &mut Vec<NodeId>,
        terminated: bool,
    ) {
        loop {
            self.skip_dimensions();
            let initializer = if self.eat(TokenKind::Eq) {
                Some(self.parse_variable_initializer())
            } else {
                None
            };
            let more = self.eat(TokenKind::Comma);
            if !more && terminated {
                self.expect(TokenKind::Semicolon);
            }
            out.push(self.finish(
                m,
                Kind::Variable,
                NodeData::Variable {
                    modifiers,
                    ty,
                    name,
                    initializer,
                },
            ));
            if !more {
                break;
            }
            m = self.start();
            name = self.parse_identifier();
        }
    }

    fn parse_variable_initializer(&mut self) -> NodeId {
        if self.at(TokenKind::LBrace) {
            self.parse_array_initializer()
        } else {
            self.parse_expression()
        }
    }

    fn skip_dimensions(&mut self) {
        while self.at(TokenKind::LBracket) && self.nth(1) == TokenKind::RBracket {
            self.bump();
            self.bump();
        }
    }

    // === Types ===

    fn parse_type(&mut self) -> NodeId {
        let mut ty = if self.current_kind().is_primitive_type() {
            let m = self.start();
            let keyword = self.bump();
            self.finish(m, Kind::PrimitiveType, NodeData::PrimitiveType { keyword })
        } else if self.at(TokenKind::Identifier) {
            self.parse_class_type()
        } else {
            self.error_expected("type");
            return self.missing();
        };
        while self.at(TokenKind::LBracket) && self.nth(1) == TokenKind::RBracket {
            let m = self.precede(ty);
            self.bump();
            self.bump();
            ty = self.finish(m, Kind::ArrayType, NodeData::ArrayType { ty });
        }
        ty
    }

    /// Parses `var` or a type for a local variable.
    fn parse_local_type(&mut self) -> NodeId {
        if self.at_contextual("var")
            && self.nth(1) == TokenKind::Identifier
            && self.options.java_version.supports_var()
        {
            let m = self.start();
            self.bump();
            return self.finish(m, Kind::VarType, NodeData::Other);
        }
        self.parse_type()
    }

    fn parse_class_type(&mut self) -> NodeId {
        let mut ty = self.parse_identifier();
        if self.at(TokenKind::Lt) {
            ty = self.parse_type_arguments(ty);
        }
        while self.at(TokenKind::Dot) && self.nth(1) == TokenKind::Identifier {
            let m = self.precede(ty);
            self.bump();
            let identifier = self.parse_identifier();
            ty = self.finish(
                m,
                Kind::MemberSelect,
                NodeData::MemberSelect {
                    expression: ty,
                    identifier,
                },
            );
            if self.at(TokenKind::Lt) {
                ty = self.parse_type_arguments(ty);
            }
        }
        ty
    }

    fn parse_type_arguments(&mut self, ty: NodeId) -> NodeId {
        let m = self.precede(ty);
        self.bump();
        let mut arguments = Vec::new();
        while !self.at(TokenKind::Gt) && !self.at(TokenKind::Eof) {
            let argument = if self.at(TokenKind::Question) {
                self.parse_wildcard()
            } else {
                self.parse_type()
            };
            arguments.push(argument);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Gt);
        self.finish(
            m,
            Kind::ParameterizedType,
            NodeData::ParameterizedType { ty, arguments },
        )
    }

    fn parse_wildcard(&mut self) -> NodeId {
        let m = self.start();
        self.bump();
        if self.eat(TokenKind::Extends) || self.eat(TokenKind::Super) {
            self.parse_type();
        }
        self.finish(m, Kind::Wildcard, NodeData::Other)
    }

    // === Lookahead ===

    /// Scans a type starting at token `index`, returning the index after it.
    fn scan_type(&self, mut index: usize) -> Option<usize> {
        let kind = self.kind_at(index);
        if kind.is_primitive_type() {
            index += 1;
        } else if kind == TokenKind::Identifier {
            index += 1;
            loop {
                if self.kind_at(index) == TokenKind::Lt {
                    index = self.scan_type_arguments(index)?;
                }
                if self.kind_at(index) == TokenKind::Dot
                    && self.kind_at(index + 1) == TokenKind::Identifier
                {
                    index += 2;
                    continue;
                }
                break;
            }
        } else {
            return None;
        }
        while self.kind_at(index) == TokenKind::LBracket
            && self.kind_at(index + 1) == TokenKind::RBracket
        {
            index += 2;
        }
        Some(index)
    }

    fn scan_type_arguments(&self, mut index: usize) -> Option<usize> {
        let mut depth = 0usize;
        loop {
            let kind = self.kind_at(index);
            match kind {
                TokenKind::Lt => depth += 1,
                TokenKind::Gt => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(index + 1);
                    }
                }
                TokenKind::Identifier
                | TokenKind::Dot
                | TokenKind::Comma
                | TokenKind::Question
                | TokenKind::Extends
                | TokenKind::Super
                | TokenKind::Amp
                | TokenKind::LBracket
                | TokenKind::RBracket => {}
                _ if kind.is_primitive_type() => {}
                _ => return None,
            }
            index += 1;
        }
    }

    /// Skips modifiers and annotations starting at token `index`.
    fn scan_modifiers(&self, mut index: usize) -> usize {
        loop {
            match self.kind_at(index) {
                TokenKind::Final | TokenKind::Abstract | TokenKind::Static | TokenKind::Strictfp => {
                    index += 1;
                }
                TokenKind::At if self.kind_at(index + 1) == TokenKind::Identifier => {
                    index += 2;
                    while self.kind_at(index) == TokenKind::Dot
                        && self.kind_at(index + 1) == TokenKind::Identifier
                    {
                        index += 2;
                    }
                    if self.kind_at(index) == TokenKind::LParen {
                        index = self.skip_balanced(index);
                    }
                }
                _ => return index,
            }
        }
    }

    /// Returns the index after the parenthesis group opening at `index`.
    fn skip_balanced(&self, mut index: usize) -> usize {
        let mut depth = 0usize;
        loop {
            match self.kind_at(index) {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return index + 1;
                    }
                }
                TokenKind::Eof => return index,
                _ => {}
            }
            index += 1;
        }
    }

    /// Returns true if a local variable declaration starts at the current token.
    fn at_local_variable(&self) -> bool {
        let index = self.scan_modifiers(self.pos);
        let Some(after_type) = self.scan_type(index) else {
            return false;
        };
        self.kind_at(after_type) == TokenKind::Identifier
            && matches!(
                self.kind_at(after_type + 1),
                TokenKind::Eq
                    | TokenKind::Semicolon
                    | TokenKind::Comma
                    | TokenKind::LBracket
                    | TokenKind::Colon
            )
    }

    fn at_local_class(&self) -> bool {
        let index = self.scan_modifiers(self.pos);
        matches!(
            self.kind_at(index),
            TokenKind::Class | TokenKind::Interface | TokenKind::Enum
        )
    }

    fn at_lambda(&self) -> bool {
        match self.current_kind() {
            TokenKind::Identifier => self.nth(1) == TokenKind::Arrow,
            TokenKind::LParen => {
                let after = self.skip_balanced(self.pos);
                self.kind_at(after) == TokenKind::Arrow
            }
            _ => false,
        }
    }

    fn at_cast(&self) -> bool {
        if !self.at(TokenKind::LParen) {
            return false;
        }
        let primitive = self.nth(1).is_primitive_type();
        let Some(mut after_type) = self.scan_type(self.pos + 1) else {
            return false;
        };
        // intersection casts: (A & B)
        while self.kind_at(after_type) == TokenKind::Amp {
            match self.scan_type(after_type + 1) {
                Some(next) => after_type = next,
                None => return false,
            }
        }
        if self.kind_at(after_type) != TokenKind::RParen {
            return false;
        }
        if primitive {
            return true;
        }
        let next = self.kind_at(after_type + 1);
        next.is_literal()
            || matches!(
                next,
                TokenKind::Identifier
                    | TokenKind::LParen
                    | TokenKind::Bang
                    | TokenKind::Tilde
                    | TokenKind::This
                    | TokenKind::Super
                    | TokenKind::New
            )
            || next.is_primitive_type()
    }

    // === Statements ===

    fn parse_block(&mut self) -> NodeId {
        let m = self.start();
        let body = self.parse_block_body();
        self.finish(m, Kind::Block, NodeData::Block { body })
    }

    /// Parses `{ statements }` into the open node.
    fn parse_block_body(&mut self) -> Vec<NodeId> {
        let mut body = Vec::new();
        if !self.expect(TokenKind::LBrace) {
            return body;
        }
        self.parse_block_statements(&mut body, false);
        self.expect(TokenKind::RBrace);
        body
    }

    fn parse_block_statements(&mut self, body: &mut Vec<NodeId>, in_switch: bool) {
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            if in_switch && (self.at(TokenKind::Case) || self.at(TokenKind::Default)) {
                break;
            }
            let before = self.pos;
            self.parse_block_statement(body);
            if self.pos == before {
                body.push(self.recover_token());
            }
        }
    }

    fn parse_block_statement(&mut self, body: &mut Vec<NodeId>) {
        if self.at_local_class() {
            body.push(self.parse_type_declaration());
        } else if self.at_local_variable() {
            self.parse_local_variable(body, true);
        } else {
            body.push(self.parse_statement());
        }
    }

    fn parse_local_variable(&mut self, out: &mut Vec<NodeId>, terminated: bool) {
        let m = self.start();
        let modifiers = self.parse_modifiers();
        let ty = self.parse_local_type();
        let name = self.parse_identifier();
        self.parse_declarators(m, modifiers, Some(ty), name, out, terminated);
    }

    fn parse_statement(&mut self) -> NodeId {
        match self.current_kind() {
            TokenKind::LBrace => self.parse_block(),
            TokenKind::Semicolon => {
                let m = self.start();
                self.bump();
                self.finish(m, Kind::EmptyStatement, NodeData::Other)
            }
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do(),
            TokenKind::For => self.parse_for(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Throw => self.parse_throw(),
            TokenKind::Break => self.parse_jump(Kind::BreakStatement),
            TokenKind::Continue => self.parse_jump(Kind::ContinueStatement),
            TokenKind::Try => self.parse_try(),
            TokenKind::Assert => self.parse_assert(),
            TokenKind::Synchronized if self.nth(1) == TokenKind::LParen => {
                self.parse_synchronized()
            }
            TokenKind::Identifier if self.nth(1) == TokenKind::Colon => self.parse_labeled(),
            TokenKind::Class | TokenKind::Interface | TokenKind::Enum => {
                self.parse_type_declaration()
            }
            _ => {
                let m = self.start();
                let expression = self.parse_expression();
                self.expect(TokenKind::Semicolon);
                self.finish(
                    m,
                    Kind::ExpressionStatement,
                    NodeData::ExpressionStatement { expression },
                )
            }
        }
    }

    fn parse_parenthesized_condition(&mut self) -> NodeId {
        self.expect(TokenKind::LParen);
        let condition = self.parse_expression();
        self.expect(TokenKind::RParen);
        condition
    }

    fn parse_if(&mut self) -> NodeId {
        let m = self.start();
        self.bump();
        let condition = self.parse_parenthesized_condition();
        let then_statement = self.parse_statement();
        let else_statement = if self.eat(TokenKind::Else) {
            Some(self.parse_statement())
        } else {
            None
        };
        self.finish(
            m,
            Kind::IfStatement,
            NodeData::If {
                condition,
                then_statement,
                else_statement,
            },
        )
    }

    fn parse_while(&mut self) -> NodeId {
        let m = self.start();
        self.bump();
        let condition = self.parse_parenthesized_condition();
        let statement = self.parse_statement();
        self.finish(
            m,
            Kind::WhileStatement,
            NodeData::While {
                condition,
                statement,
            },
        )
    }

    fn parse_do(&mut self) -> NodeId {
        let m = self.start();
        self.bump();
        let statement = self.parse_statement();
        self.expect(TokenKind::While);
        let condition = self.parse_parenthesized_condition();
        self.expect(TokenKind::Semicolon);
        self.finish(
            m,
            Kind::DoStatement,
            NodeData::Do {
                statement,
                condition,
            },
        )
    }

    fn at_for_each(&self) -> bool {
        let index = self.scan_modifiers(self.pos);
        let Some(after_type) = self.scan_type(index) else {
            return false;
        };
        self.kind_at(after_type) == TokenKind::Identifier
            && self.kind_at(after_type + 1) == TokenKind::Colon
    }

    fn parse_for(&mut self) -> NodeId {
        let m = self.start();
        self.bump();
        self.expect(TokenKind::LParen);

        if self.at_for_each() {
            let v = self.start();
            let modifiers = self.parse_modifiers();
            let ty = self.parse_local_type();
            let name = self.parse_identifier();
            let variable = self.finish(
                v,
                Kind::Variable,
                NodeData::Variable {
                    modifiers,
                    ty: Some(ty),
                    name,
                    initializer: None,
                },
            );
            self.expect(TokenKind::Colon);
            let expression = self.parse_expression();
            self.expect(TokenKind::RParen);
            let statement = self.parse_statement();
            return self.finish(
                m,
                Kind::ForEachStatement,
                NodeData::ForEach {
                    variable,
                    expression,
                    statement,
                },
            );
        }

        let mut initializer = Vec::new();
        if !self.at(TokenKind::Semicolon) {
            if self.at_local_variable() {
                self.parse_local_variable(&mut initializer, false);
            } else {
                self.parse_expression_list(&mut initializer, TokenKind::Semicolon);
            }
        }
        self.expect(TokenKind::Semicolon);
        let condition = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression())
        };
        self.expect(TokenKind::Semicolon);
        let mut update = Vec::new();
        if !self.at(TokenKind::RParen) {
            self.parse_expression_list(&mut update, TokenKind::RParen);
        }
        self.expect(TokenKind::RParen);
        let statement = self.parse_statement();
        self.finish(
            m,
            Kind::ForStatement,
            NodeData::For {
                initializer,
                condition,
                update,
                statement,
            },
        )
    }

    /// Parses comma separated expressions, each wrapped in an expression statement.
    fn parse_expression_list(&mut self, out: &mut Vec<NodeId>, end: TokenKind) {
        while !self.at(end) && !self.at(TokenKind::Eof) {
            let m = self.start();
            let expression = self.parse_expression();
            out.push(self.finish(
                m,
                Kind::ExpressionStatement,
                NodeData::ExpressionStatement { expression },
            ));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
    }

    fn parse_switch(&mut self) -> NodeId {
        let m = self.start();
        self.bump();
        let expression = self.parse_parenthesized_condition();
        let mut cases = Vec::new();
        if self.expect(TokenKind::LBrace) {
            while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
                if self.at(TokenKind::Case) || self.at(TokenKind::Default) {
                    cases.push(self.parse_case_group());
                } else {
                    self.recover_token();
                }
            }
            self.expect(TokenKind::RBrace);
        }
        self.finish(
            m,
            Kind::SwitchStatement,
            NodeData::Switch { expression, cases },
        )
    }

    fn parse_case_group(&mut self) -> NodeId {
        let m = self.start();
        let mut labels = Vec::new();
        while self.at(TokenKind::Case) || self.at(TokenKind::Default) {
            let label = self.start();
            let expression = if self.at(TokenKind::Case) {
                self.bump();
                Some(self.parse_conditional())
            } else {
                self.bump();
                None
            };
            if self.at(TokenKind::Arrow) {
                self.error(ParseErrorKind::UnsupportedSyntax {
                    message: "switch rules".to_string(),
                });
            }
            self.expect(TokenKind::Colon);
            labels.push(self.finish(label, Kind::CaseLabel, NodeData::CaseLabel { expression }));
        }
        let mut body = Vec::new();
        self.parse_block_statements(&mut body, true);
        self.finish(m, Kind::CaseGroup, NodeData::CaseGroup { labels, body })
    }

    fn parse_jump(&mut self, kind: Kind) -> NodeId {
        let m = self.start();
        self.bump();
        let label = if self.at(TokenKind::Identifier) {
            Some(self.parse_identifier())
        } else {
            None
        };
        self.expect(TokenKind::Semicolon);
        self.finish(m, kind, NodeData::Jump { label })
    }

    fn parse_return(&mut self) -> NodeId {
        let m = self.start();
        self.bump();
        let expression = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression())
        };
        self.expect(TokenKind::Semicolon);
        self.finish(m, Kind::ReturnStatement, NodeData::Return { expression })
    }

    fn parse_throw(&mut self) -> NodeId {
        let m = self.start();
        self.bump();
        let expression = self.parse_expression();
        self.expect(TokenKind::Semicolon);
        self.finish(m, Kind::ThrowStatement, NodeData::Throw { expression })
    }

    fn parse_assert(&mut self) -> NodeId {
        let m = self.start();
        self.bump();
        let condition = self.parse_expression();
        let detail = if self.eat(TokenKind::Colon) {
            Some(self.parse_expression())
        } else {
            None
        };
        self.expect(TokenKind::Semicolon);
        self.finish(
            m,
            Kind::AssertStatement,
            NodeData::Assert { condition, detail },
        )
    }

    fn parse_synchronized(&mut self) -> NodeId {
        let m = self.start();
        self.bump();
        let expression = self.parse_parenthesized_condition();
        let block = self.parse_block();
        self.finish(
            m,
            Kind::SynchronizedStatement,
            NodeData::Synchronized { expression, block },
        )
    }

    fn parse_labeled(&mut self) -> NodeId {
        let m = self.start();
        let label = self.parse_identifier();
        self.bump();
        let statement = self.parse_statement();
        self.finish(
            m,
            Kind::LabeledStatement,
            NodeData::Labeled { label, statement },
        )
    }

    fn parse_try(&mut self) -> NodeId {
        let m = self.start();
        self.bump();

        let mut resources = Vec::new();
        if self.eat(TokenKind::LParen) {
            while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
                resources.push(self.parse_resource());
                if !self.eat(TokenKind::Semicolon) {
                    break;
                }
            }
            self.expect(TokenKind::RParen);
        }

        let block = self.parse_block();

        let mut catches = Vec::new();
        while self.at(TokenKind::Catch) {
            catches.push(self.parse_catch());
        }
        let finally_block = if self.eat(TokenKind::Finally) {
            Some(self.parse_block())
        } else {
            None
        };
        if resources.is_empty() && catches.is_empty() && finally_block.is_none() {
            self.error_expected("'catch' or 'finally'");
        }

        self.finish(
            m,
            Kind::TryStatement,
            NodeData::Try {
                resources,
                block,
                catches,
                finally_block,
            },
        )
    }

    fn parse_resource(&mut self) -> NodeId {
        if !self.at_local_variable() {
            return self.parse_expression();
        }
        let m = self.start();
        let modifiers = self.parse_modifiers();
        let ty = self.parse_local_type();
        let name = self.parse_identifier();
        self.expect(TokenKind::Eq);
        let initializer = Some(self.parse_expression());
        self.finish(
            m,
            Kind::Variable,
            NodeData::Variable {
                modifiers,
                ty: Some(ty),
                name,
                initializer,
            },
        )
    }

    fn parse_catch(&mut self) -> NodeId {
        let m = self.start();
        self.bump();
        self.expect(TokenKind::LParen);

        let p = self.start();
        let modifiers = self.parse_modifiers();
        let mut ty = self.parse_type();
        if self.at(TokenKind::Pipe) {
            let union = self.precede(ty);
            let mut types = vec![ty];
            while self.eat(TokenKind::Pipe) {
                types.push(self.parse_type());
            }
            ty = self.finish(union, Kind::UnionType, NodeData::UnionType { types });
        }
        let name = self.parse_identifier();
        let parameter = self.finish(
            p,
            Kind::Variable,
            NodeData::Variable {
                modifiers,
                ty: Some(ty),
                name,
                initializer: None,
            },
        );

        self.expect(TokenKind::RParen);
        let block = self.parse_block();
        self.finish(m, Kind::Catch, NodeData::Catch { parameter, block })
    }

    // === Expressions ===

    fn parse_expression(&mut self) -> NodeId {
        if self.at_lambda() {
            return self.parse_lambda();
        }
        let left = self.parse_conditional();
        let Some((kind, width)) = self.assignment_operator() else {
            return left;
        };
        let m = self.precede(left);
        for _ in 0..width {
            self.bump();
        }
        let expression = self.parse_expression();
        self.finish(
            m,
            kind,
            NodeData::Assignment {
                variable: left,
                expression,
            },
        )
    }

    /// Returns the assignment operator at the current token and its token count.
    fn assignment_operator(&self) -> Option<(Kind, usize)> {
        let kind = match self.current_kind() {
            TokenKind::Eq => Kind::Assignment,
            TokenKind::PlusEq => Kind::PlusAssignment,
            TokenKind::MinusEq => Kind::MinusAssignment,
            TokenKind::StarEq => Kind::MultiplyAssignment,
            TokenKind::SlashEq => Kind::DivideAssignment,
            TokenKind::PercentEq => Kind::RemainderAssignment,
            TokenKind::AmpEq => Kind::AndAssignment,
            TokenKind::PipeEq => Kind::OrAssignment,
            TokenKind::CaretEq => Kind::XorAssignment,
            TokenKind::LtLtEq => Kind::LeftShiftAssignment,
            TokenKind::Gt if self.nth(1) == TokenKind::GtEq && self.joined(1) => {
                return Some((Kind::RightShiftAssignment, 2));
            }
            TokenKind::Gt
                if self.nth(1) == TokenKind::Gt
                    && self.nth(2) == TokenKind::GtEq
                    && self.joined(1)
                    && self.joined(2) =>
            {
                return Some((Kind::UnsignedRightShiftAssignment, 3));
            }
            _ => return None,
        };
        Some((kind, 1))
    }

    /// Returns the binary operator at the current token, its precedence and token count.
    fn binary_operator(&self) -> Option<(Kind, u8, usize)> {
        let operator = match self.current_kind() {
            TokenKind::PipePipe => (Kind::ConditionalOr, 1, 1),
            TokenKind::AmpAmp => (Kind::ConditionalAnd, 2, 1),
            TokenKind::Pipe => (Kind::Or, 3, 1),
            TokenKind::Caret => (Kind::Xor, 4, 1),
            TokenKind::Amp => (Kind::And, 5, 1),
            TokenKind::EqEq => (Kind::EqualTo, 6, 1),
            TokenKind::NotEq => (Kind::NotEqualTo, 6, 1),
            TokenKind::Lt => (Kind::LessThan, 7, 1),
            TokenKind::LtEq => (Kind::LessThanOrEqualTo, 7, 1),
            TokenKind::GtEq => (Kind::GreaterThanOrEqualTo, 7, 1),
            TokenKind::Gt => {
                if self.assignment_operator().is_some() {
                    return None;
                }
                if self.nth(1) == TokenKind::Gt && self.joined(1) {
                    if self.nth(2) == TokenKind::Gt && self.joined(2) {
                        (Kind::UnsignedRightShift, 8, 3)
                    } else {
                        (Kind::RightShift, 8, 2)
                    }
                } else {
                    (Kind::GreaterThan, 7, 1)
                }
            }
            TokenKind::LtLt => (Kind::LeftShift, 8, 1),
            TokenKind::Plus => (Kind::Plus, 9, 1),
            TokenKind::Minus => (Kind::Minus, 9, 1),
            TokenKind::Star => (Kind::Multiply, 10, 1),
            TokenKind::Slash => (Kind::Divide, 10, 1),
            TokenKind::Percent => (Kind::Remainder, 10, 1),
            _ => return None,
        };
        Some(operator)
    }

    fn parse_conditional(&mut self) -> NodeId {
        let condition = self.parse_binary();
        if !self.at(TokenKind::Question) {
            return condition;
        }
        let m = self.precede(condition);
        self.bump();
        let true_expression = self.parse_expression();
        self.expect(TokenKind::Colon);
        let false_expression = if self.at_lambda() {
            self.parse_lambda()
        } else {
            self.parse_conditional()
        };
        self.finish(
            m,
            Kind::ConditionalExpression,
            NodeData::Conditional {
                condition,
                true_expression,
                false_expression,
            },
        )
    }

    /// Parses a chain of binary operators by precedence climbing.
    ///
    /// Operands waiting for their right-hand side live on an explicit stack,
    /// so long operator chains do not grow the call stack.
    fn parse_binary(&mut self) -> NodeId {
        let mut stack: Vec<(NodeId, Kind, u8)> = Vec::new();
        let mut operand = self.parse_unary();
        loop {
            if self.at(TokenKind::Instanceof) {
                operand = self.reduce_binary(&mut stack, operand, INSTANCEOF_PRECEDENCE);
                let m = self.precede(operand);
                self.bump();
                self.eat(TokenKind::Final);
                let ty = self.parse_type();
                if self.at(TokenKind::Identifier) {
                    self.error(ParseErrorKind::UnsupportedSyntax {
                        message: "pattern matching for instanceof".to_string(),
                    });
                    self.bump();
                }
                operand = self.finish(
                    m,
                    Kind::InstanceOf,
                    NodeData::InstanceOf {
                        expression: operand,
                        ty,
                    },
                );
                continue;
            }
            let Some((kind, precedence, width)) = self.binary_operator() else {
                break;
            };
            operand = self.reduce_binary(&mut stack, operand, precedence);
            for _ in 0..width {
                self.bump();
            }
            stack.push((operand, kind, precedence));
            operand = self.parse_unary();
        }
        self.reduce_binary(&mut stack, operand, 0)
    }

    /// Closes every stacked operator binding at least as tightly as `min_precedence`.
    fn reduce_binary(
        &mut self,
        stack: &mut Vec<(NodeId, Kind, u8)>,
        mut right: NodeId,
        min_precedence: u8,
    ) -> NodeId {
        while let Some(&(left, kind, precedence)) = stack.last() {
            if precedence < min_precedence {
                break;
            }
            stack.pop();
            let m = self.precede(left);
            right = self.finish(m, kind, NodeData::Binary { left, right });
        }
        right
    }

    fn parse_unary(&mut self) -> NodeId {
        let kind = match self.current_kind() {
            TokenKind::PlusPlus => Kind::PrefixIncrement,
            TokenKind::MinusMinus => Kind::PrefixDecrement,
            TokenKind::Plus => Kind::UnaryPlus,
            TokenKind::Minus => Kind::UnaryMinus,
            TokenKind::Tilde => Kind::BitwiseComplement,
            TokenKind::Bang => Kind::LogicalComplement,
            TokenKind::LParen if self.at_cast() => return self.parse_cast(),
            _ => return self.parse_postfix(),
        };
        let m = self.start();
        self.bump();
        let expression = self.parse_unary();
        self.finish(m, kind, NodeData::Unary { expression })
    }

    fn parse_cast(&mut self) -> NodeId {
        let m = self.start();
        self.bump();
        let ty = self.parse_type();
        while self.eat(TokenKind::Amp) {
            self.parse_type();
        }
        self.expect(TokenKind::RParen);
        let expression = if self.at_lambda() {
            self.parse_lambda()
        } else {
            self.parse_unary()
        };
        self.finish(m, Kind::TypeCast, NodeData::TypeCast { ty, expression })
    }

    fn parse_postfix(&mut self) -> NodeId {
        let mut expression = self.parse_primary();
        expression = self.parse_selectors(expression);
        loop {
            let kind = match self.current_kind() {
                TokenKind::PlusPlus => Kind::PostfixIncrement,
                TokenKind::MinusMinus => Kind::PostfixDecrement,
                _ => break,
            };
            let m = self.precede(expression);
            self.bump();
            expression = self.finish(m, kind, NodeData::Unary { expression });
        }
        expression
    }

    fn parse_primary(&mut self) -> NodeId {
        let literal = match self.current_kind() {
            TokenKind::IntLiteral => Some(Kind::IntLiteral),
            TokenKind::LongLiteral => Some(Kind::LongLiteral),
            TokenKind::FloatLiteral => Some(Kind::FloatLiteral),
            TokenKind::DoubleLiteral => Some(Kind::DoubleLiteral),
            TokenKind::True | TokenKind::False => Some(Kind::BooleanLiteral),
            TokenKind::CharLiteral => Some(Kind::CharLiteral),
            TokenKind::StringLiteral => Some(Kind::StringLiteral),
            TokenKind::TextBlock => {
                if !self.options.java_version.supports_text_blocks() {
                    self.error(ParseErrorKind::UnsupportedFeature {
                        feature: "text blocks",
                        required: 15,
                    });
                }
                Some(Kind::TextBlock)
            }
            TokenKind::Null => Some(Kind::NullLiteral),
            _ => None,
        };
        if let Some(kind) = literal {
            let m = self.start();
            let value = self.bump();
            return self.finish(m, kind, NodeData::Literal { value });
        }

        match self.current_kind() {
            TokenKind::Identifier | TokenKind::This | TokenKind::Super => {
                let identifier = self.bump_identifier();
                self.parse_invocation_if_called(identifier)
            }
            TokenKind::LParen => {
                let m = self.start();
                self.bump();
                let expression = self.parse_expression();
                self.expect(TokenKind::RParen);
                self.finish(
                    m,
                    Kind::ParenthesizedExpression,
                    NodeData::Parenthesized { expression },
                )
            }
            TokenKind::New => {
                let m = self.start();
                self.parse_new(m, None)
            }
            TokenKind::Void => {
                let m = self.start();
                let keyword = self.bump();
                self.finish(m, Kind::PrimitiveType, NodeData::PrimitiveType { keyword })
            }
            kind if kind.is_primitive_type() => self.parse_type(),
            TokenKind::Error => self.recover_token(),
            kind if EXPRESSION_FOLLOW.contains(&kind) => {
                self.error_expected("expression");
                self.missing()
            }
            _ => self.recover_token(),
        }
    }

    fn parse_invocation_if_called(&mut self, method_select: NodeId) -> NodeId {
        if !self.at(TokenKind::LParen) {
            return method_select;
        }
        let m = self.precede(method_select);
        let arguments = self.parse_arguments();
        self.finish(
            m,
            Kind::MethodInvocation,
            NodeData::MethodInvocation {
                method_select,
                arguments,
            },
        )
    }

    fn parse_selectors(&mut self, mut expression: NodeId) -> NodeId {
        loop {
            match self.current_kind() {
                TokenKind::Dot => match self.nth(1) {
                    TokenKind::New => {
                        let m = self.precede(expression);
                        self.bump();
                        expression = self.parse_new(m, Some(expression));
                    }
                    TokenKind::Identifier
                    | TokenKind::This
                    | TokenKind::Super
                    | TokenKind::Class
                    | TokenKind::Lt => {
                        let m = self.precede(expression);
                        self.bump();
                        if self.at(TokenKind::Lt) {
                            self.parse_type_parameters();
                        }
                        let identifier = match self.current_kind() {
                            TokenKind::Identifier
                            | TokenKind::This
                            | TokenKind::Super
                            | TokenKind::Class => self.bump_identifier(),
                            _ => self.parse_identifier(),
                        };
                        let select = self.finish(
                            m,
                            Kind::MemberSelect,
                            NodeData::MemberSelect {
                                expression,
                                identifier,
                            },
                        );
                        expression = self.parse_invocation_if_called(select);
                    }
                    _ => {
                        self.bump();
                        self.error_expected("identifier");
                        break;
                    }
                },
                TokenKind::LBracket if self.nth(1) == TokenKind::RBracket => {
                    let m = self.precede(expression);
                    self.bump();
                    self.bump();
                    expression = self.finish(
                        m,
                        Kind::ArrayType,
                        NodeData::ArrayType { ty: expression },
                    );
                }
                TokenKind::LBracket => {
                    let m = self.precede(expression);
                    self.bump();
                    let index = self.parse_expression();
                    self.expect(TokenKind::RBracket);
                    expression = self.finish(
                        m,
                        Kind::ArrayAccessExpression,
                        NodeData::ArrayAccess { expression, index },
                    );
                }
                TokenKind::ColonColon => {
                    let m = self.precede(expression);
                    self.bump();
                    let method = if self.at(TokenKind::New) {
                        self.bump_identifier()
                    } else {
                        self.parse_identifier()
                    };
                    expression = self.finish(
                        m,
                        Kind::MethodReference,
                        NodeData::MethodReference { expression, method },
                    );
                }
                _ => break,
            }
        }
        expression
    }

    fn parse_arguments(&mut self) -> Vec<NodeId> {
        let mut arguments = Vec::new();
        if !self.expect(TokenKind::LParen) {
            return arguments;
        }
        while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
            arguments.push(self.parse_expression());
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen);
        arguments
    }

    /// Parses `new ...` into the node opened at `m`.
    fn parse_new(&mut self, m: Marker, enclosing: Option<NodeId>) -> NodeId {
        self.bump();
        if self.at(TokenKind::Lt) {
            self.parse_type_parameters();
        }

        let ty = if self.current_kind().is_primitive_type() {
            let p = self.start();
            let keyword = self.bump();
            self.finish(p, Kind::PrimitiveType, NodeData::PrimitiveType { keyword })
        } else {
            self.parse_class_type()
        };

        if self.at(TokenKind::LBracket) || self.at(TokenKind::LBrace) {
            let mut dimensions = Vec::new();
            while self.at(TokenKind::LBracket) {
                let d = self.start();
                self.bump();
                let expression = if self.at(TokenKind::RBracket) {
                    None
                } else {
                    Some(self.parse_expression())
                };
                self.expect(TokenKind::RBracket);
                dimensions.push(self.finish(
                    d,
                    Kind::ArrayDimension,
                    NodeData::ArrayDimension { expression },
                ));
            }
            let mut initializers = Vec::new();
            if self.at(TokenKind::LBrace) {
                self.parse_array_elements(&mut initializers);
            }
            return self.finish(
                m,
                Kind::NewArray,
                NodeData::NewArray {
                    ty: Some(ty),
                    dimensions,
                    initializers,
                },
            );
        }

        let arguments = self.parse_arguments();
        let body = if self.at(TokenKind::LBrace) {
            Some(self.parse_anonymous_class_body())
        } else {
            None
        };
        self.finish(
            m,
            Kind::NewClass,
            NodeData::NewClass {
                enclosing,
                identifier: ty,
                arguments,
                body,
            },
        )
    }

    /// Parses `{a, b, {c}}` as an untyped array creation.
    fn parse_array_initializer(&mut self) -> NodeId {
        let m = self.start();
        let mut initializers = Vec::new();
        self.parse_array_elements(&mut initializers);
        self.finish(
            m,
            Kind::NewArray,
            NodeData::NewArray {
                ty: None,
                dimensions: Vec::new(),
                initializers,
            },
        )
    }

    fn parse_array_elements(&mut self, out: &mut Vec<NodeId>) {
        self.bump();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            out.push(self.parse_element_value());
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace);
    }

    fn parse_lambda(&mut self) -> NodeId {
        let m = self.start();
        let mut parameters = Vec::new();
        if self.at(TokenKind::Identifier) {
            parameters.push(self.parse_inferred_parameter());
        } else {
            self.bump();
            while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
                let inferred = self.at(TokenKind::Identifier)
                    && matches!(self.nth(1), TokenKind::Comma | TokenKind::RParen);
                let parameter = if inferred {
                    self.parse_inferred_parameter()
                } else {
                    self.parse_formal_parameter()
                };
                parameters.push(parameter);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen);
        }
        self.expect(TokenKind::Arrow);
        let body = if self.at(TokenKind::LBrace) {
            self.parse_block()
        } else {
            self.parse_expression()
        };
        self.finish(
            m,
            Kind::LambdaExpression,
            NodeData::Lambda { parameters, body },
        )
    }

    fn parse_inferred_parameter(&mut self) -> NodeId {
        let m = self.start();
        let modifiers = self.empty_modifiers();
        let name = self.parse_identifier();
        self.finish(
            m,
            Kind::Variable,
            NodeData::Variable {
                modifiers,
                ty: None,
                name,
                initializer: None,
            },
        )
    }
}

/// Lexes `source` into significant tokens, attaching comments as trivia.
fn build_tokens(source: &str, line_index: &LineIndex) -> Vec<SyntaxToken> {
    let position = |span: Span| line_index.position(span.start).unwrap_or(Position::FIRST);

    let mut tokens = Vec::new();
    let mut trivia: Vec<SyntaxTrivia> = Vec::new();
    for token in Lexer::new(source) {
        let text = token.span.slice(source);
        match token.kind {
            TokenKind::Whitespace => {}
            TokenKind::LineComment | TokenKind::BlockComment => {
                let comment = SyntaxTrivia::new(text, position(token.span), token.span);
                match trivia.last_mut() {
                    Some(previous) if continues_markdown(source, previous, &comment) => {
                        let span = previous.span.cover(comment.span);
                        previous.text = SmolStr::new(span.slice(source));
                        previous.span = span;
                    }
                    _ => trivia.push(comment),
                }
            }
            kind => tokens.push(SyntaxToken {
                kind,
                text: SmolStr::new(text),
                start: position(token.span),
                span: token.span,
                trivia: std::mem::take(&mut trivia),
                is_unicode: text.contains("\\u"),
                parent: None,
            }),
        }
    }
    tokens
}

/// Returns true if `next` is a `///` line directly below the markdown comment `previous`.
fn continues_markdown(source: &str, previous: &SyntaxTrivia, next: &SyntaxTrivia) -> bool {
    if previous.kind != TriviaKind::Markdown || next.kind != TriviaKind::Markdown {
        return false;
    }
    let gap = Span::new(previous.span.end, next.span.start).slice(source);
    let breaks = Range::of_text(Position::FIRST, gap).end.line - 1;
    breaks == 1 && gap.chars().all(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse, ParseResult};
    use pretty_assertions::assert_eq;

    fn parse_ok(source: &str) -> ParseResult {
        let result = parse(source);
        assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
        result
    }

    fn first_of_kind(result: &ParseResult, kind: Kind) -> NodeId {
        result
            .tree
            .nodes()
            .find(|(_, node)| node.kind == kind)
            .map(|(id, _)| id)
            .unwrap_or_else(|| panic!("no {kind} node"))
    }

    fn method_body(source: &str) -> String {
        format!("class A {{ void f() {{ {source} }} }}")
    }

    #[test]
    fn test_class_members() {
        let result = parse_ok("class A { int x, y = 2; A() {} void f(int a, String... rest) {} static {} }");
        let class = first_of_kind(&result, Kind::Class);
        let NodeData::ClassDecl { members, .. } = result.tree.data(class) else {
            panic!("not a class");
        };
        let kinds: Vec<Kind> = members.iter().map(|&m| result.tree.kind(m)).collect();
        assert_eq!(
            kinds,
            vec![
                Kind::Variable,
                Kind::Variable,
                Kind::Constructor,
                Kind::Method,
                Kind::StaticInitializer,
            ]
        );
    }

    #[test]
    fn test_declarators_share_the_type() {
        let result = parse_ok("class A { int x, y = 2; }");
        let variables: Vec<&NodeData> = result
            .tree
            .nodes()
            .filter(|(_, node)| node.kind == Kind::Variable)
            .map(|(_, node)| &node.data)
            .collect();
        let (NodeData::Variable { ty: first, .. }, NodeData::Variable { ty: second, .. }) =
            (variables[0], variables[1])
        else {
            panic!("not variables");
        };
        assert_eq!(first, second);
    }

    #[test]
    fn test_operator_precedence() {
        let result = parse_ok(&method_body("x = a + b * c > d && !e || f;"));
        let assignment = first_of_kind(&result, Kind::Assignment);
        let NodeData::Assignment { expression, .. } = result.tree.data(assignment) else {
            panic!("not an assignment");
        };
        assert_eq!(result.tree.kind(*expression), Kind::ConditionalOr);
        assert_eq!(result.tree.text(*expression), "a + b * c > d && !e || f");
    }

    #[test]
    fn test_instanceof_binds_like_relational_operators() {
        let result = parse_ok(&method_body("x = a + b instanceof T; y = a == b instanceof T;"));
        let tree = &result.tree;
        let values: Vec<(Kind, &str)> = tree
            .nodes()
            .filter_map(|(_, node)| match node.data {
                NodeData::Assignment { expression, .. } => Some((tree.kind(expression), tree.text(expression))),
                _ => None,
            })
            .collect();
        assert_eq!(
            values,
            vec![
                (Kind::InstanceOf, "a + b instanceof T"),
                (Kind::EqualTo, "a == b instanceof T"),
            ]
        );
    }

    #[test]
    fn test_long_operator_chain_is_left_nested() {
        let terms: Vec<String> = (0..5000).map(|i| format!("\"s{i}\"")).collect();
        let result = parse_ok(&method_body(&format!("String s = {};", terms.join(" + "))));
        let tree = &result.tree;
        let NodeData::Variable {
            initializer: Some(initializer),
            ..
        } = *tree.data(first_of_kind(&result, Kind::Variable))
        else {
            panic!("no initializer");
        };

        let mut depth = 0;
        let mut current = initializer;
        while let NodeData::Binary { left, right } = *tree.data(current) {
            assert_eq!(tree.kind(current), Kind::Plus);
            assert_eq!(tree.kind(right), Kind::StringLiteral);
            depth += 1;
            current = left;
        }
        assert_eq!(depth, 4999);
        assert_eq!(tree.text(current), "\"s0\"");
        let range = tree.range(initializer).unwrap();
        assert_eq!(range.start.column, tree.range(current).unwrap().start.column);
    }

    #[test]
    fn test_shift_operators_from_split_tokens() {
        let result = parse_ok(&method_body("x = a >> 2; y = b >>> 3; z >>= 1; w >>>= 1;"));
        for kind in [
            Kind::RightShift,
            Kind::UnsignedRightShift,
            Kind::RightShiftAssignment,
            Kind::UnsignedRightShiftAssignment,
        ] {
            first_of_kind(&result, kind);
        }
    }

    #[test]
    fn test_generic_declarations() {
        let result = parse_ok(&method_body(
            "Map<String, List<Integer>> m = new HashMap<>(); List<?> l = null;",
        ));
        assert_eq!(
            result
                .tree
                .nodes()
                .filter(|(_, node)| node.kind == Kind::Variable)
                .count(),
            2
        );
        first_of_kind(&result, Kind::Wildcard);
    }

    #[test]
    fn test_casts_and_lambdas() {
        let result = parse_ok(&method_body(
            "Object o = (String) s; int i = (int) 1.5; Runnable r = () -> {}; f(x -> x + 1, (a, b) -> a);",
        ));
        assert_eq!(
            result
                .tree
                .nodes()
                .filter(|(_, node)| node.kind == Kind::LambdaExpression)
                .count(),
            3
        );
        assert_eq!(
            result
                .tree
                .nodes()
                .filter(|(_, node)| node.kind == Kind::TypeCast)
                .count(),
            2
        );
    }

    #[test]
    fn test_parenthesized_is_not_a_cast() {
        let result = parse_ok(&method_body("int i = (a) + b;"));
        first_of_kind(&result, Kind::ParenthesizedExpression);
        assert!(result
            .tree
            .nodes()
            .all(|(_, node)| node.kind != Kind::TypeCast));
    }

    #[test]
    fn test_statements() {
        let result = parse_ok(&method_body(
            r#"
            label: for (int i = 0, j = 1; i < 10; i++, j--) { continue label; }
            for (String s : list) break;
            do { x++; } while (x < 3);
            switch (x) { case 1: case 2: f(); break; default: g(); }
            try (Reader r = open()) { read(r); } catch (IOException | RuntimeException e) { throw e; } finally { close(); }
            synchronized (this) { assert x > 0 : "positive"; }
            "#,
        ));
        for kind in [
            Kind::LabeledStatement,
            Kind::ForStatement,
            Kind::ForEachStatement,
            Kind::DoStatement,
            Kind::SwitchStatement,
            Kind::CaseGroup,
            Kind::TryStatement,
            Kind::UnionType,
            Kind::SynchronizedStatement,
            Kind::AssertStatement,
        ] {
            first_of_kind(&result, kind);
        }
        let switch = first_of_kind(&result, Kind::SwitchStatement);
        let NodeData::Switch { cases, .. } = result.tree.data(switch) else {
            panic!("not a switch");
        };
        assert_eq!(cases.len(), 2);
    }

    #[test]
    fn test_member_selects_and_invocations() {
        let result = parse_ok(&method_body(
            "a.b().c[0].d = String.class; this.f(); super.g(); int[].class.getName(); list.forEach(System.out::println);",
        ));
        first_of_kind(&result, Kind::ArrayAccessExpression);
        first_of_kind(&result, Kind::MethodReference);
        assert!(
            result
                .tree
                .nodes()
                .filter(|(_, node)| node.kind == Kind::MethodInvocation)
                .count()
                >= 4
        );
    }

    #[test]
    fn test_new_expressions() {
        let result = parse_ok(&method_body(
            "int[][] a = new int[3][]; int[] b = {1, 2}; Object o = new Object() { public String toString() { return \"\"; } };",
        ));
        let new_class = first_of_kind(&result, Kind::NewClass);
        let NodeData::NewClass { body, .. } = result.tree.data(new_class) else {
            panic!("not a new class");
        };
        assert!(body.is_some());
        assert_eq!(
            result
                .tree
                .nodes()
                .filter(|(_, node)| node.kind == Kind::NewArray)
                .count(),
            2
        );
    }

    #[test]
    fn test_var_depends_on_version() {
        let result = parse_ok(&method_body("var x = 1;"));
        first_of_kind(&result, Kind::VarType);

        let old = crate::parse_with_options(
            &method_body("var x = 1;"),
            ParseOptions {
                java_version: crate::JavaVersion(8),
                ..ParseOptions::default()
            },
        );
        assert!(old.tree.nodes().all(|(_, node)| node.kind != Kind::VarType));
    }

    #[test]
    fn test_text_block_requires_java_15() {
        let source = method_body("String s = \"\"\"\n  hi\n  \"\"\";");
        let old = crate::parse_with_options(
            &source,
            ParseOptions {
                java_version: crate::JavaVersion(11),
                ..ParseOptions::default()
            },
        );
        assert_eq!(old.errors.len(), 1);
        assert_eq!(
            old.errors[0].to_string(),
            "text blocks requires Java 15 or later"
        );
        parse_ok(&source);
    }

    #[test]
    fn test_recovery_never_loses_tokens() {
        let source = "class A { void f() { int x = ; ) g(; } } #";
        let result = parse(source);
        assert!(!result.errors.is_empty());
        for (index, token) in result.tree.tokens().iter().enumerate() {
            assert!(token.parent.is_some(), "token {index} `{}` is detached", token.text);
        }
    }

    #[test]
    fn test_parents_are_consistent() {
        let result = parse_ok("class A { void f() { if (a) b(); else { c = 1; } } }");
        let tree = &result.tree;
        for (id, node) in tree.nodes() {
            for &child in &node.children {
                assert_eq!(tree.parent(child), Some(id));
            }
        }
        assert_eq!(tree.parent(tree.root()), None);
    }

    #[test]
    fn test_markdown_comments_merge() {
        let result = parse_ok("/// first\n   /// second\n\n/// other\nclass A {}");
        let class = &result.tree.tokens()[0];
        let kinds: Vec<TriviaKind> = class.trivia.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TriviaKind::Markdown, TriviaKind::Markdown]);
        assert_eq!(class.trivia[0].comment_content(), " first\n second");
        assert_eq!(class.trivia[1].comment_content(), " other");
    }

    #[test]
    fn test_trailing_comments_go_to_eof() {
        let result = parse_ok("class A {}\n// bye\n");
        let eof = result.tree.tokens().last().unwrap();
        assert!(eof.is_eof());
        assert_eq!(eof.trivia.len(), 1);
        assert_eq!(eof.trivia[0].kind, TriviaKind::Line);
    }
}
