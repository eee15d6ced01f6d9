//! Arena-backed syntax tree.
//!
//! Nodes and tokens live in two vectors owned by [`SyntaxTree`] and refer
//! to each other by index. Every node records its children in source order
//! (tokens included) and, through [`NodeData`], the role each child plays.

use java_source_map::{LineIndex, Range, Span};
use rustc_hash::FxHashMap;

use crate::kind::Kind;
use crate::symbols::{Symbol, SymbolId, SymbolTable};
use crate::token::SyntaxToken;

/// Identifies a node of a [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Returns the raw index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifies a token of a [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(pub(crate) u32);

impl TokenId {
    /// Returns the raw index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A child of a node: either a nested node or a token leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    /// An inner node.
    Node(NodeId),
    /// A token leaf.
    Token(TokenId),
}

impl From<NodeId> for Element {
    fn from(id: NodeId) -> Self {
        Element::Node(id)
    }
}

impl From<TokenId> for Element {
    fn from(id: TokenId) -> Self {
        Element::Token(id)
    }
}

impl Element {
    /// Returns the node id, if this is a node.
    pub fn as_node(self) -> Option<NodeId> {
        match self {
            Element::Node(id) => Some(id),
            Element::Token(_) => None,
        }
    }

    /// Returns the token id, if this is a token.
    pub fn as_token(self) -> Option<TokenId> {
        match self {
            Element::Token(id) => Some(id),
            Element::Node(_) => None,
        }
    }
}

/// The role of each child, per node kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// No structured fields; the children list is all there is.
    Other,
    CompilationUnit {
        package: Option<NodeId>,
        imports: Vec<NodeId>,
        types: Vec<NodeId>,
    },
    Package {
        name: NodeId,
    },
    Import {
        is_static: bool,
        qualified_name: NodeId,
        on_demand: bool,
    },
    /// Classes, interfaces, enums and annotation types. Anonymous class
    /// bodies have no name.
    ClassDecl {
        modifiers: NodeId,
        name: Option<NodeId>,
        superclass: Option<NodeId>,
        interfaces: Vec<NodeId>,
        members: Vec<NodeId>,
    },
    EnumConstant {
        name: NodeId,
        arguments: Vec<NodeId>,
        body: Option<NodeId>,
    },
    /// Methods and constructors; constructors have no return type.
    Method {
        modifiers: NodeId,
        return_type: Option<NodeId>,
        name: NodeId,
        parameters: Vec<NodeId>,
        throws: Vec<NodeId>,
        default_value: Option<NodeId>,
        body: Option<NodeId>,
    },
    Variable {
        modifiers: NodeId,
        ty: Option<NodeId>,
        name: NodeId,
        initializer: Option<NodeId>,
    },
    Modifiers {
        annotations: Vec<NodeId>,
    },
    Annotation {
        annotation_type: NodeId,
        arguments: Vec<NodeId>,
    },
    PrimitiveType {
        keyword: TokenId,
    },
    ArrayType {
        ty: NodeId,
    },
    ParameterizedType {
        ty: NodeId,
        arguments: Vec<NodeId>,
    },
    UnionType {
        types: Vec<NodeId>,
    },
    /// Blocks, initializers and static initializers.
    Block {
        body: Vec<NodeId>,
    },
    Labeled {
        label: NodeId,
        statement: NodeId,
    },
    ExpressionStatement {
        expression: NodeId,
    },
    If {
        condition: NodeId,
        then_statement: NodeId,
        else_statement: Option<NodeId>,
    },
    Assert {
        condition: NodeId,
        detail: Option<NodeId>,
    },
    Switch {
        expression: NodeId,
        cases: Vec<NodeId>,
    },
    CaseGroup {
        labels: Vec<NodeId>,
        body: Vec<NodeId>,
    },
    /// `case <expression>:` or `default:` when `expression` is `None`.
    CaseLabel {
        expression: Option<NodeId>,
    },
    While {
        condition: NodeId,
        statement: NodeId,
    },
    Do {
        statement: NodeId,
        condition: NodeId,
    },
    For {
        initializer: Vec<NodeId>,
        condition: Option<NodeId>,
        update: Vec<NodeId>,
        statement: NodeId,
    },
    ForEach {
        variable: NodeId,
        expression: NodeId,
        statement: NodeId,
    },
    /// `break` and `continue`.
    Jump {
        label: Option<NodeId>,
    },
    Return {
        expression: Option<NodeId>,
    },
    Throw {
        expression: NodeId,
    },
    Synchronized {
        expression: NodeId,
        block: NodeId,
    },
    Try {
        resources: Vec<NodeId>,
        block: NodeId,
        catches: Vec<NodeId>,
        finally_block: Option<NodeId>,
    },
    Catch {
        parameter: NodeId,
        block: NodeId,
    },
    ArrayAccess {
        expression: NodeId,
        index: NodeId,
    },
    ArrayDimension {
        expression: Option<NodeId>,
    },
    MemberSelect {
        expression: NodeId,
        identifier: NodeId,
    },
    MethodInvocation {
        method_select: NodeId,
        arguments: Vec<NodeId>,
    },
    NewClass {
        enclosing: Option<NodeId>,
        identifier: NodeId,
        arguments: Vec<NodeId>,
        body: Option<NodeId>,
    },
    NewArray {
        ty: Option<NodeId>,
        dimensions: Vec<NodeId>,
        initializers: Vec<NodeId>,
    },
    TypeCast {
        ty: NodeId,
        expression: NodeId,
    },
    InstanceOf {
        expression: NodeId,
        ty: NodeId,
    },
    Parenthesized {
        expression: NodeId,
    },
    Conditional {
        condition: NodeId,
        true_expression: NodeId,
        false_expression: NodeId,
    },
    Lambda {
        parameters: Vec<NodeId>,
        body: NodeId,
    },
    MethodReference {
        expression: NodeId,
        method: NodeId,
    },
    /// Every assignment operator.
    Assignment {
        variable: NodeId,
        expression: NodeId,
    },
    /// Every binary operator, including `&&` and `||`.
    Binary {
        left: NodeId,
        right: NodeId,
    },
    /// Prefix and postfix operators.
    Unary {
        expression: NodeId,
    },
    Literal {
        value: TokenId,
    },
    /// Also used for `this`, `super` and `class` in member selects.
    Identifier {
        name: TokenId,
    },
}

/// An inner node of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// The kind tag.
    pub kind: Kind,
    /// The enclosing node. `None` for the compilation unit.
    pub parent: Option<NodeId>,
    /// All children in source order.
    pub children: Vec<Element>,
    /// Structured access to the children.
    pub data: NodeData,
}

/// A parsed compilation unit.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    pub(crate) line_index: LineIndex,
    pub(crate) tokens: Vec<SyntaxToken>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    pub(crate) symbols: SymbolTable,
    pub(crate) bindings: FxHashMap<NodeId, SymbolId>,
}

impl SyntaxTree {
    /// Returns the source text.
    pub fn source(&self) -> &str {
        self.line_index.text()
    }

    /// Returns the line index of the source.
    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    /// Returns the compilation unit node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the node for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Returns the token for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this tree.
    pub fn token(&self, id: TokenId) -> &SyntaxToken {
        &self.tokens[id.index()]
    }

    /// Returns every token in document order, end-of-file token last.
    pub fn tokens(&self) -> &[SyntaxToken] {
        &self.tokens
    }

    /// Returns every node, in construction order (children before parents).
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i as u32), node))
    }

    /// Returns the kind of an element.
    pub fn kind(&self, element: impl Into<Element>) -> Kind {
        match element.into() {
            Element::Node(id) => self.node(id).kind,
            Element::Token(_) => Kind::Token,
        }
    }

    /// Returns the structured fields of a node.
    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.node(id).data
    }

    /// Returns true for token leaves.
    pub fn is_leaf(&self, element: impl Into<Element>) -> bool {
        matches!(element.into(), Element::Token(_))
    }

    /// Returns the children of an element, or `None` for a leaf.
    ///
    /// Leaves have no children to query; callers check [`Self::is_leaf`]
    /// or match on the `Option`.
    pub fn children(&self, element: impl Into<Element>) -> Option<&[Element]> {
        match element.into() {
            Element::Node(id) => Some(&self.node(id).children),
            Element::Token(_) => None,
        }
    }

    /// Returns the enclosing node.
    pub fn parent(&self, element: impl Into<Element>) -> Option<NodeId> {
        match element.into() {
            Element::Node(id) => self.node(id).parent,
            Element::Token(id) => self.token(id).parent,
        }
    }

    /// Iterates over the enclosing nodes, innermost first.
    pub fn ancestors(&self, element: impl Into<Element>) -> impl Iterator<Item = NodeId> + '_ {
        let mut next = self.parent(element);
        std::iter::from_fn(move || {
            let current = next?;
            next = self.node(current).parent;
            Some(current)
        })
    }

    /// Returns true if `inner` is a strict descendant of `outer`.
    pub fn is_descendant(&self, outer: impl Into<Element>, inner: impl Into<Element>) -> bool {
        match outer.into() {
            Element::Node(outer) => self.ancestors(inner).any(|ancestor| ancestor == outer),
            Element::Token(_) => false,
        }
    }

    /// Iterates over an element and everything below it, in pre-order.
    pub fn descendants(&self, element: impl Into<Element>) -> impl Iterator<Item = Element> + '_ {
        let mut stack = vec![element.into()];
        std::iter::from_fn(move || {
            let current = stack.pop()?;
            if let Some(children) = self.children(current) {
                stack.extend(children.iter().rev().copied());
            }
            Some(current)
        })
    }

    /// Returns the first token of an element, if any.
    pub fn first_token(&self, element: impl Into<Element>) -> Option<TokenId> {
        let mut stack = vec![element.into()];
        while let Some(current) = stack.pop() {
            match current {
                Element::Token(id) => return Some(id),
                Element::Node(id) => stack.extend(self.node(id).children.iter().rev().copied()),
            }
        }
        None
    }

    /// Returns the last token of an element, if any.
    pub fn last_token(&self, element: impl Into<Element>) -> Option<TokenId> {
        let mut stack = vec![element.into()];
        while let Some(current) = stack.pop() {
            match current {
                Element::Token(id) => return Some(id),
                Element::Node(id) => stack.extend(self.node(id).children.iter().copied()),
            }
        }
        None
    }

    /// Returns the line/column range of an element.
    ///
    /// `None` for nodes without tokens, such as empty modifier lists.
    pub fn range(&self, element: impl Into<Element>) -> Option<Range> {
        let element = element.into();
        let first = self.token(self.first_token(element)?);
        let last = self.token(self.last_token(element)?);
        Some(Range::new(first.start, last.range().end))
    }

    /// Returns the byte span of an element.
    pub fn span(&self, element: impl Into<Element>) -> Option<Span> {
        let element = element.into();
        let first = self.token(self.first_token(element)?);
        let last = self.token(self.last_token(element)?);
        Some(first.span.cover(last.span))
    }

    /// Returns the source text of an element, comments between tokens included.
    pub fn text(&self, element: impl Into<Element>) -> &str {
        self.span(element)
            .map(|span| span.slice(self.source()))
            .unwrap_or("")
    }

    /// Returns the identifier text of an `Identifier` node.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            NodeData::Identifier { name } => Some(self.token(*name).text.as_str()),
            _ => None,
        }
    }

    /// Returns the symbol bound to a node, or [`Symbol::UNKNOWN`].
    ///
    /// Identifiers, declarations and method invocations carry bindings.
    pub fn symbol(&self, id: NodeId) -> &Symbol {
        match self.bindings.get(&id) {
            Some(&symbol) => self.symbols.get(symbol),
            None => Symbol::unknown(),
        }
    }

    /// Returns the id of the symbol bound to a node.
    pub fn symbol_id(&self, id: NodeId) -> Option<SymbolId> {
        self.bindings.get(&id).copied()
    }

    /// Returns the symbol table.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Returns the nodes bound to a symbol: its declaration name and every usage.
    pub fn usages(&self, symbol: SymbolId) -> Vec<NodeId> {
        let mut usages: Vec<NodeId> = self
            .bindings
            .iter()
            .filter(|(node, bound)| **bound == symbol && self.node(**node).kind == Kind::Identifier)
            .map(|(node, _)| *node)
            .collect();
        usages.sort_unstable_by_key(|&node| self.first_token(node));
        usages
    }

    /// Returns a navigable handle on an element.
    pub fn get(&self, element: impl Into<Element>) -> crate::NodeRef<'_> {
        crate::NodeRef::new(self, element.into())
    }
}
