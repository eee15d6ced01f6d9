//! Borrowed handles on tree elements.

use std::fmt;

use java_source_map::Range;

use crate::kind::Kind;
use crate::symbols::Symbol;
use crate::token::SyntaxToken;
use crate::tree::{Element, Node, NodeData, NodeId, SyntaxTree};

/// A tree element together with the tree that owns it.
///
/// Two handles are equal only if they point at the same element of the
/// same tree instance.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a SyntaxTree,
    element: Element,
}

impl<'a> NodeRef<'a> {
    /// Creates a handle.
    pub fn new(tree: &'a SyntaxTree, element: Element) -> Self {
        Self { tree, element }
    }

    /// Returns the owning tree.
    pub fn tree(&self) -> &'a SyntaxTree {
        self.tree
    }

    /// Returns the element.
    pub fn element(&self) -> Element {
        self.element
    }

    /// Returns the node id, if this is not a token.
    pub fn id(&self) -> Option<NodeId> {
        self.element.as_node()
    }

    /// Returns the kind tag.
    pub fn kind(&self) -> Kind {
        self.tree.kind(self.element)
    }

    /// Returns true for token leaves.
    pub fn is_leaf(&self) -> bool {
        self.tree.is_leaf(self.element)
    }

    /// Returns the node, if this is not a token.
    pub fn node(&self) -> Option<&'a Node> {
        self.id().map(|id| self.tree.node(id))
    }

    /// Returns the token, if this is a leaf.
    pub fn token(&self) -> Option<&'a SyntaxToken> {
        self.element.as_token().map(|id| self.tree.token(id))
    }

    /// Returns the structured fields, if this is not a token.
    pub fn data(&self) -> Option<&'a NodeData> {
        self.node().map(|node| &node.data)
    }

    /// Returns the children, or `None` for a leaf.
    pub fn children(&self) -> Option<impl ExactSizeIterator<Item = NodeRef<'a>> + 'a> {
        let tree = self.tree;
        self.tree
            .children(self.element)
            .map(move |children| children.iter().map(move |&child| NodeRef::new(tree, child)))
    }

    /// Returns the enclosing node.
    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.tree
            .parent(self.element)
            .map(|id| NodeRef::new(self.tree, Element::Node(id)))
    }

    /// Returns the token text of a leaf.
    pub fn token_text(&self) -> Option<&'a str> {
        self.token().map(|token| token.text.as_str())
    }

    /// Returns the source text covered by the element.
    pub fn text(&self) -> &'a str {
        self.tree.text(self.element)
    }

    /// Returns the line/column range.
    pub fn range(&self) -> Option<Range> {
        self.tree.range(self.element)
    }

    /// Returns the bound symbol, or [`Symbol::UNKNOWN`].
    pub fn symbol(&self) -> &'a Symbol {
        match self.id() {
            Some(id) => self.tree.symbol(id),
            None => Symbol::unknown(),
        }
    }

    /// Returns a handle on another node of the same tree.
    pub fn with(&self, id: NodeId) -> NodeRef<'a> {
        NodeRef::new(self.tree, Element::Node(id))
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.element == other.element
    }
}

impl Eq for NodeRef<'_> {}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("kind", &self.kind())
            .field("element", &self.element)
            .field("text", &self.text())
            .finish()
    }
}
