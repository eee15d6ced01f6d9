//! Control-flow graphs of method, initializer and lambda bodies.
//!
//! A [`Cfg`] is a set of basic blocks. Block `B0` is always the exit block;
//! the entry block is the one holding the first evaluated element. Blocks
//! refer to each other by [`BlockId`] and every id indexes
//! [`Cfg::reversed_blocks`].

mod builder;
mod debug;

use std::fmt;

use indexmap::IndexSet;
use java_tree::{Kind, NodeData, NodeId, SyntaxTree};
use thiserror::Error;

/// Identifies a block of a [`Cfg`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub(crate) u32);

impl BlockId {
    /// The exit block.
    pub const EXIT: BlockId = BlockId(0);

    /// Returns the raw index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

/// Errors building a control-flow graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CfgError {
    /// The node is not a method or constructor.
    #[error("cannot build a CFG for a {kind} node")]
    NotAMethod { kind: Kind },

    /// Abstract, native and interface methods have nothing to build from.
    #[error("cannot build CFG for method `{name}` with no body")]
    MissingBody { name: String },
}

/// A basic block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub(crate) id: BlockId,
    pub(crate) elements: Vec<NodeId>,
    pub(crate) terminator: Option<NodeId>,
    pub(crate) successors: IndexSet<BlockId>,
    pub(crate) predecessors: IndexSet<BlockId>,
    pub(crate) true_block: Option<BlockId>,
    pub(crate) false_block: Option<BlockId>,
    pub(crate) exit_block: Option<BlockId>,
    pub(crate) is_finally_block: bool,
}

impl Block {
    pub(crate) fn new(id: BlockId) -> Self {
        Self {
            id,
            elements: Vec::new(),
            terminator: None,
            successors: IndexSet::new(),
            predecessors: IndexSet::new(),
            true_block: None,
            false_block: None,
            exit_block: None,
            is_finally_block: false,
        }
    }

    /// Returns the block id.
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Returns the elements in evaluation order.
    pub fn elements(&self) -> &[NodeId] {
        &self.elements
    }

    /// Returns the node deciding where control goes next.
    pub fn terminator(&self) -> Option<NodeId> {
        self.terminator
    }

    /// Returns the successors, in insertion order.
    pub fn successors(&self) -> &IndexSet<BlockId> {
        &self.successors
    }

    /// Returns the predecessors.
    pub fn predecessors(&self) -> &IndexSet<BlockId> {
        &self.predecessors
    }

    /// Returns the successor taken when the terminator evaluates to true.
    pub fn true_block(&self) -> Option<BlockId> {
        self.true_block
    }

    /// Returns the successor taken when the terminator evaluates to false.
    pub fn false_block(&self) -> Option<BlockId> {
        self.false_block
    }

    /// Returns the successor taken when control leaves the enclosing body
    /// (`return`, `throw`, completion of a `finally` block).
    pub fn exit_block(&self) -> Option<BlockId> {
        self.exit_block
    }

    /// Returns true for the block holding a `finally` clause.
    pub fn is_finally_block(&self) -> bool {
        self.is_finally_block
    }

    /// Returns true for an empty block that only forwards to one successor.
    pub fn is_inactive(&self) -> bool {
        self.terminator.is_none() && self.elements.is_empty() && self.successors.len() == 1
    }
}

/// The control-flow graph of a body.
#[derive(Debug, Clone)]
pub struct Cfg<'t> {
    tree: &'t SyntaxTree,
    entry: BlockId,
    blocks: Vec<Block>,
}

impl<'t> Cfg<'t> {
    /// Builds the graph of a block, initializer, lambda body or expression.
    pub fn build(tree: &'t SyntaxTree, body: NodeId) -> Cfg<'t> {
        let (entry, blocks) = builder::Builder::new(tree).run(body);
        Cfg {
            tree,
            entry,
            blocks,
        }
    }

    /// Builds the graph of a method or constructor body.
    pub fn build_method(tree: &'t SyntaxTree, method: NodeId) -> Result<Cfg<'t>, CfgError> {
        let NodeData::Method { name, body, .. } = tree.data(method) else {
            return Err(CfgError::NotAMethod {
                kind: tree.kind(method),
            });
        };
        match body {
            Some(body) => Ok(Cfg::build(tree, *body)),
            None => Err(CfgError::MissingBody {
                name: tree.name(*name).unwrap_or_default().to_string(),
            }),
        }
    }

    /// Returns the tree the graph was built from.
    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    /// Returns the entry block.
    pub fn entry(&self) -> &Block {
        self.block(self.entry)
    }

    /// Returns the exit block.
    pub fn exit(&self) -> &Block {
        self.block(BlockId::EXIT)
    }

    /// Returns a block by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this graph.
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    /// Returns the blocks from the highest id down to the exit block.
    pub fn blocks(&self) -> impl DoubleEndedIterator<Item = &Block> + ExactSizeIterator {
        self.blocks.iter().rev()
    }

    /// Returns the blocks by id, exit block first.
    pub fn reversed_blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Returns the number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false: a graph has at least its exit block.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use java_tree::parse;
    use pretty_assertions::assert_eq;

    fn first(tree: &SyntaxTree, kind: Kind) -> NodeId {
        tree.nodes()
            .find(|(_, node)| node.kind == kind)
            .map(|(id, _)| id)
            .unwrap()
    }

    fn kinds(cfg: &Cfg<'_>, block: &Block) -> Vec<Kind> {
        block.elements().iter().map(|&e| cfg.tree().kind(e)).collect()
    }

    fn cfg_of(tree: &SyntaxTree) -> Cfg<'_> {
        Cfg::build_method(tree, first(tree, Kind::Method)).unwrap()
    }

    #[test]
    fn test_single_statement() {
        let result = parse("class A { void f() { foo(); } }");
        let cfg = cfg_of(&result.tree);
        assert_eq!(cfg.len(), 2);
        let entry = cfg.entry();
        assert_eq!(entry.id(), BlockId(1));
        assert_eq!(
            entry.successors().iter().copied().collect::<Vec<_>>(),
            vec![BlockId::EXIT]
        );
        assert_eq!(
            kinds(&cfg, entry),
            vec![Kind::Identifier, Kind::MethodInvocation]
        );
        assert!(cfg.exit().successors().is_empty());
        assert_eq!(
            cfg.exit().predecessors().iter().copied().collect::<Vec<_>>(),
            vec![BlockId(1)]
        );
    }

    #[test]
    fn test_empty_body() {
        let result = parse("class A { void f() { } }");
        let cfg = cfg_of(&result.tree);
        assert_eq!(cfg.len(), 1);
        assert_eq!(cfg.entry().id(), BlockId::EXIT);
        assert!(cfg.entry().elements().is_empty());
    }

    #[test]
    fn test_missing_body() {
        let result = parse("abstract class A { abstract void f(); }");
        let tree = &result.tree;
        let error = Cfg::build_method(tree, first(tree, Kind::Method)).unwrap_err();
        assert_eq!(error, CfgError::MissingBody { name: "f".to_string() });
        assert_eq!(error.to_string(), "cannot build CFG for method `f` with no body");

        let class = first(tree, Kind::Class);
        assert_eq!(
            Cfg::build_method(tree, class).unwrap_err(),
            CfgError::NotAMethod { kind: Kind::Class }
        );
    }

    #[test]
    fn test_if_else_branches() {
        let result = parse("class A { void f(boolean a) { if (a) { x(); } else { y(); } z(); } }");
        let cfg = cfg_of(&result.tree);
        assert_eq!(cfg.len(), 5);
        let entry = cfg.entry();
        assert_eq!(entry.id(), BlockId(4));
        assert_eq!(cfg.tree().kind(entry.terminator().unwrap()), Kind::IfStatement);
        assert_eq!(entry.true_block(), Some(BlockId(3)));
        assert_eq!(entry.false_block(), Some(BlockId(2)));
        assert_eq!(
            entry.successors().iter().copied().collect::<Vec<_>>(),
            vec![BlockId(2), BlockId(3)]
        );
        assert_eq!(
            cfg.block(BlockId(1)).predecessors().iter().copied().collect::<Vec<_>>(),
            vec![BlockId(2), BlockId(3)]
        );
    }

    #[test]
    fn test_return_jumps_to_exit() {
        let result = parse("class A { int f(boolean a) { if (a) return 1; return 2; } }");
        let cfg = cfg_of(&result.tree);
        for block in cfg.blocks() {
            if let Some(terminator) = block.terminator() {
                if cfg.tree().kind(terminator) == Kind::ReturnStatement {
                    assert_eq!(block.exit_block(), Some(BlockId::EXIT));
                    assert_eq!(block.successors().len(), 1);
                }
            }
        }
    }

    #[test]
    fn test_branch_successors_are_members() {
        let sources = [
            "class A { void f() { while (a && b || c) { if (d) break; else continue; } } }",
            "class A { void f() { for (int i = 0; i < 10; i++) { g(i > 0 ? i : -i); } } }",
            "class A { void f() { do { g(); } while (!(a || b)); } }",
            "class A { void f() { for (String s : list) { if (s == null) return; } } }",
            "class A { void f() { switch (x) { case 1: a(); case 2: b(); break; default: c(); } } }",
            "class A { void f() { try { a(); } catch (Exception e) { b(); } finally { c(); } } }",
            "class A { void f() { out: for (;;) { for (;;) { break out; } } } }",
            "class A { void f() { synchronized (this) { a(); } } }",
        ];
        for source in sources {
            let result = parse(source);
            assert!(result.errors.is_empty(), "{source}: {:?}", result.errors);
            let cfg = cfg_of(&result.tree);
            assert!(cfg.exit().successors().is_empty(), "{source}");
            for block in cfg.blocks() {
                for id in [block.true_block(), block.false_block(), block.exit_block()]
                    .into_iter()
                    .flatten()
                {
                    assert!(block.successors().contains(&id), "{source}: {}", block.id());
                }
                for successor in block.successors() {
                    assert!(successor.index() < cfg.len(), "{source}");
                    assert!(cfg.block(*successor).predecessors().contains(&block.id()));
                }
            }
        }
    }

    fn reachable(cfg: &Cfg<'_>) -> Vec<BlockId> {
        let mut seen = vec![cfg.entry().id()];
        let mut stack = seen.clone();
        while let Some(id) = stack.pop() {
            for &successor in cfg.block(id).successors() {
                if !seen.contains(&successor) {
                    seen.push(successor);
                    stack.push(successor);
                }
            }
        }
        seen
    }

    #[test]
    fn test_code_after_return_is_dropped() {
        let result = parse("class A { void f() { a(); return; b(); } }");
        let cfg = cfg_of(&result.tree);
        assert_eq!(cfg.len(), 2);
        let entry = cfg.entry();
        assert_eq!(entry.id(), BlockId(1));
        assert_eq!(kinds(&cfg, entry), vec![Kind::Identifier, Kind::MethodInvocation]);
        assert_eq!(cfg.tree().kind(entry.terminator().unwrap()), Kind::ReturnStatement);
        assert_eq!(
            cfg.exit().predecessors().iter().copied().collect::<Vec<_>>(),
            vec![BlockId(1)]
        );
    }

    #[test]
    fn test_every_block_is_reachable() {
        let sources = [
            "class A { void f() { a(); return; b(); } }",
            "class A { void f() { while (c) { break; g(); } throw new E(); } }",
            "class A { void f() { for (;;) { g(); } } }",
            "class A { void f() { do { continue; } while (c); h(); } }",
            "class A { int f() { if (c) { return 1; } else { return 2; } } }",
            "class A { void f() { switch (x) { case 1: return; default: throw e; } } }",
        ];
        for source in sources {
            let result = parse(source);
            assert!(result.errors.is_empty(), "{source}: {:?}", result.errors);
            let cfg = cfg_of(&result.tree);
            let reachable = reachable(&cfg);
            for block in cfg.blocks() {
                assert!(
                    block.id() == BlockId::EXIT || reachable.contains(&block.id()),
                    "{source}: {} is unreachable",
                    block.id()
                );
                for predecessor in block.predecessors() {
                    assert!(reachable.contains(predecessor), "{source}");
                }
            }
        }
    }

    #[test]
    fn test_long_operator_chains() {
        let names: Vec<String> = (0..3000).map(|i| format!("a{i}")).collect();
        let strings: Vec<String> = (0..3000).map(|i| format!("\"s{i}\"")).collect();
        let sources = [
            format!("class A {{ void f() {{ String s = {}; }} }}", strings.join(" + ")),
            format!("class A {{ void f() {{ if ({}) {{ g(); }} }} }}", names.join(" && ")),
            format!("class A {{ void f() {{ boolean b = {}; }} }}", names.join(" || ")),
        ];
        for source in &sources {
            let result = parse(source);
            assert!(result.errors.is_empty());
            let cfg = cfg_of(&result.tree);
            for block in cfg.blocks() {
                for successor in block.successors() {
                    assert!(cfg.block(*successor).predecessors().contains(&block.id()));
                }
            }
        }

        let concatenation = {
            let result = parse(&sources[0]);
            let cfg = cfg_of(&result.tree);
            (cfg.len(), cfg.entry().elements().len())
        };
        // 3000 literals, 2999 `+` and the variable
        assert_eq!(concatenation, (2, 6000));

        let result = parse(&sources[1]);
        let cfg = cfg_of(&result.tree);
        // one block per operand, the `if` body and the exit
        assert_eq!(cfg.len(), 3002);
        assert_eq!(cfg.tree().kind(cfg.entry().terminator().unwrap()), Kind::ConditionalAnd);
    }

    #[test]
    fn test_jump_outside_loop_goes_to_exit() {
        let result = parse("class A { void f() { a(); break; } }");
        let cfg = cfg_of(&result.tree);
        let jump = cfg
            .blocks()
            .find(|block| {
                block
                    .terminator()
                    .is_some_and(|t| cfg.tree().kind(t) == Kind::BreakStatement)
            })
            .unwrap();
        assert_eq!(jump.exit_block(), Some(BlockId::EXIT));
    }

    #[test]
    fn test_finally_block_is_flagged() {
        let result = parse("class A { void f() { try { a(); } finally { b(); } } }");
        let cfg = cfg_of(&result.tree);
        let finally: Vec<&Block> = cfg.blocks().filter(|b| b.is_finally_block()).collect();
        assert_eq!(finally.len(), 1);
        assert_eq!(finally[0].exit_block(), Some(BlockId::EXIT));
    }

    #[test]
    fn test_lambda_expression_body() {
        let result = parse("class A { void f() { Runnable r = () -> g(1); } }");
        let tree = &result.tree;
        let NodeData::Lambda { body, .. } = tree.data(first(tree, Kind::LambdaExpression)) else {
            panic!("not a lambda");
        };
        let cfg = Cfg::build(tree, *body);
        assert_eq!(cfg.len(), 2);
        assert_eq!(
            kinds(&cfg, cfg.entry()),
            vec![Kind::IntLiteral, Kind::Identifier, Kind::MethodInvocation]
        );
    }
}
