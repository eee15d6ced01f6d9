//! Builds basic blocks by walking a body backwards.
//!
//! Statements are visited last to first so that every construct already
//! knows the block control reaches after it. Elements are therefore pushed
//! in reverse evaluation order and flipped once the graph is complete.

use java_tree::{Kind, NodeData, NodeId, SyntaxTree};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::{debug, trace};

use super::{Block, BlockId};

pub(crate) struct Builder<'t> {
    tree: &'t SyntaxTree,
    blocks: Vec<Block>,
    current: BlockId,
    break_targets: Vec<BlockId>,
    continue_targets: Vec<BlockId>,
    exit_blocks: Vec<BlockId>,
    switches: Vec<BlockId>,
    pending_label: Option<SmolStr>,
    labels_break_target: FxHashMap<SmolStr, BlockId>,
    labels_continue_target: FxHashMap<SmolStr, BlockId>,
}

impl<'t> Builder<'t> {
    pub(crate) fn new(tree: &'t SyntaxTree) -> Self {
        Self {
            tree,
            blocks: Vec::new(),
            current: BlockId::EXIT,
            break_targets: Vec::new(),
            continue_targets: Vec::new(),
            exit_blocks: Vec::new(),
            switches: Vec::new(),
            pending_label: None,
            labels_break_target: FxHashMap::default(),
            labels_continue_target: FxHashMap::default(),
        }
    }

    /// Builds the graph and returns the entry block with every block, by id.
    pub(crate) fn run(mut self, body: NodeId) -> (BlockId, Vec<Block>) {
        let exit = self.create_block();
        self.exit_blocks.push(exit);
        self.current = self.create_block_to(exit);
        let tree = self.tree;
        match tree.data(body) {
            NodeData::Block { body } => self.build_all(body),
            _ => self.build(body),
        }
        self.prune();
        self.remove_unreachable();
        self.compute_predecessors();
        for block in &mut self.blocks {
            block.elements.reverse();
        }
        debug!(blocks = self.blocks.len(), entry = %self.current, "built control flow graph");
        (self.current, self.blocks)
    }

    // === Blocks ===

    fn create_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block::new(id));
        id
    }

    fn create_block_to(&mut self, successor: BlockId) -> BlockId {
        let id = self.create_block();
        self.add_successor(id, successor);
        id
    }

    fn create_branch(&mut self, terminator: NodeId, true_branch: BlockId, false_branch: BlockId) -> BlockId {
        let id = self.create_block();
        self.block_mut(id).terminator = Some(terminator);
        self.add_false_successor(id, false_branch);
        self.add_true_successor(id, true_branch);
        id
    }

    fn create_unconditional_jump(&mut self, terminator: NodeId, target: BlockId) -> BlockId {
        let id = self.create_block();
        self.block_mut(id).terminator = Some(terminator);
        if target == self.exit_block() {
            self.add_exit_successor(id, target);
        } else {
            self.add_successor(id, target);
        }
        id
    }

    fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.index()]
    }

    fn exit_block(&self) -> BlockId {
        self.exit_blocks.last().copied().unwrap_or(BlockId::EXIT)
    }

    fn add_successor(&mut self, block: BlockId, successor: BlockId) {
        self.block_mut(block).successors.insert(successor);
    }

    fn add_true_successor(&mut self, block: BlockId, successor: BlockId) {
        let block = self.block_mut(block);
        debug_assert!(block.true_block.is_none(), "true successor assigned twice");
        block.successors.insert(successor);
        block.true_block = Some(successor);
    }

    fn add_false_successor(&mut self, block: BlockId, successor: BlockId) {
        let block = self.block_mut(block);
        debug_assert!(block.false_block.is_none(), "false successor assigned twice");
        block.successors.insert(successor);
        block.false_block = Some(successor);
    }

    fn add_exit_successor(&mut self, block: BlockId, successor: BlockId) {
        let block = self.block_mut(block);
        block.successors.insert(successor);
        block.exit_block = Some(successor);
    }

    fn add_element(&mut self, node: NodeId) {
        let current = self.current;
        self.block_mut(current).elements.push(node);
    }

    fn add_continue_target(&mut self, target: BlockId) {
        self.continue_targets.push(target);
        if let Some(label) = self.pending_label.take() {
            self.labels_continue_target.insert(label, target);
        }
    }

    // === Trees ===

    fn build_all(&mut self, nodes: &[NodeId]) {
        for &node in nodes.iter().rev() {
            self.build(node);
        }
    }

    fn build(&mut self, node: NodeId) {
        let tree = self.tree;
        let kind = tree.kind(node);
        match tree.data(node) {
            NodeData::Block { body } => self.build_all(body),
            NodeData::Return { expression } => {
                self.current = self.create_unconditional_jump(node, self.exit_block());
                if let Some(expression) = expression {
                    self.build(*expression);
                }
            }
            NodeData::ExpressionStatement { expression } => self.build(*expression),
            NodeData::MethodInvocation {
                method_select,
                arguments,
            } => {
                self.add_element(node);
                match tree.data(*method_select) {
                    NodeData::MemberSelect { expression, .. } => self.build(*expression),
                    _ => self.build(*method_select),
                }
                self.build_all(arguments);
            }
            NodeData::If {
                condition,
                then_statement,
                else_statement,
            } => self.build_if(node, *condition, *then_statement, *else_statement),
            NodeData::Conditional {
                condition,
                true_expression,
                false_expression,
            } => {
                let next = self.current;
                self.current = self.create_block_to(next);
                self.build(*false_expression);
                let else_block = self.current;
                self.current = self.create_block_to(next);
                self.build(*true_expression);
                let then_block = self.current;
                self.current = self.create_branch(node, then_block, else_block);
                self.build_condition(*condition, then_block, else_block);
            }
            NodeData::Variable { initializer, .. } => {
                self.add_element(node);
                if let Some(initializer) = initializer {
                    self.build(*initializer);
                }
            }
            NodeData::Binary { .. } => match kind {
                Kind::ConditionalAnd | Kind::ConditionalOr => self.build_logical(node),
                _ => self.build_binary(node),
            },
            NodeData::Assignment {
                variable,
                expression,
            } => {
                self.add_element(node);
                self.build(*variable);
                self.build(*expression);
            }
            NodeData::MemberSelect {
                expression,
                identifier,
            } => {
                self.add_element(node);
                // `int.class` has a type, not an expression, on its left
                if tree.name(*identifier) != Some("class") {
                    self.build(*expression);
                }
            }
            NodeData::Labeled { label, statement } => {
                let name = SmolStr::new(tree.name(*label).unwrap_or_default());
                self.labels_break_target.insert(name.clone(), self.current);
                self.pending_label = Some(name);
                self.build(*statement);
                self.current = self.create_block_to(self.current);
            }
            NodeData::Switch { expression, cases } => self.build_switch(node, *expression, cases),
            NodeData::Jump { label } => self.build_jump(node, kind, *label),
            NodeData::While {
                condition,
                statement,
            } => {
                let false_branch = self.current;
                let loopback = self.create_block();
                self.current = self.create_block_to(loopback);
                self.add_continue_target(loopback);
                self.break_targets.push(false_branch);
                self.build(*statement);
                self.break_targets.pop();
                self.continue_targets.pop();
                let body = self.current;
                self.current = self.create_branch(node, body, false_branch);
                self.build_condition(*condition, body, false_branch);
                self.add_successor(loopback, self.current);
                self.current = self.create_block_to(self.current);
            }
            NodeData::Do {
                statement,
                condition,
            } => {
                let false_branch = self.current;
                let loopback = self.create_block();
                self.current = self.create_branch(node, loopback, false_branch);
                self.build_condition(*condition, loopback, false_branch);
                self.current = self.create_block_to(self.current);
                self.add_continue_target(loopback);
                self.break_targets.push(false_branch);
                self.build(*statement);
                self.break_targets.pop();
                self.continue_targets.pop();
                self.add_successor(loopback, self.current);
                self.current = self.create_block_to(self.current);
            }
            NodeData::ForEach {
                variable,
                expression,
                statement,
            } => {
                let after_loop = self.current;
                let statement_block = self.create_block();
                let loopback = self.create_branch(node, statement_block, after_loop);
                self.current = self.create_block_to(loopback);
                self.add_continue_target(loopback);
                self.break_targets.push(after_loop);
                self.build(*statement);
                self.break_targets.pop();
                self.continue_targets.pop();
                self.add_successor(statement_block, self.current);
                self.current = loopback;
                self.build(*variable);
                self.current = self.create_block_to(self.current);
                self.build(*expression);
                self.current = self.create_block_to(self.current);
            }
            NodeData::For {
                initializer,
                condition,
                update,
                statement,
            } => self.build_for(node, initializer, *condition, update, *statement),
            NodeData::Try {
                resources,
                block,
                catches,
                finally_block,
            } => self.build_try(node, resources, *block, catches, *finally_block),
            NodeData::Throw { expression } => {
                self.current = self.create_unconditional_jump(node, self.exit_block());
                self.build(*expression);
            }
            NodeData::Synchronized { expression, block } => {
                self.build(*block);
                self.current = self.create_unconditional_jump(node, self.current);
                self.build(*expression);
            }
            NodeData::Unary { expression }
            | NodeData::TypeCast { expression, .. }
            | NodeData::InstanceOf { expression, .. } => {
                self.add_element(node);
                self.build(*expression);
            }
            NodeData::Parenthesized { expression } => self.build(*expression),
            NodeData::ArrayAccess { expression, index } => {
                self.add_element(node);
                self.build(*expression);
                self.build(*index);
            }
            NodeData::ArrayDimension { expression } => {
                if let Some(expression) = expression {
                    self.build(*expression);
                }
            }
            NodeData::NewClass {
                enclosing,
                arguments,
                ..
            } => {
                self.add_element(node);
                if let Some(enclosing) = enclosing {
                    self.build(*enclosing);
                }
                self.build_all(arguments);
            }
            NodeData::NewArray {
                dimensions,
                initializers,
                ..
            } => {
                self.add_element(node);
                self.build_all(dimensions);
                self.build_all(initializers);
            }
            // Assertions are disabled by default at run time.
            NodeData::Assert { .. } => {}
            _ => {
                if !is_plain_element(kind) {
                    trace!(%kind, "no control flow for tree kind, kept as a plain element");
                }
                self.add_element(node);
            }
        }
    }

    fn build_if(&mut self, node: NodeId, condition: NodeId, then_statement: NodeId, else_statement: Option<NodeId>) {
        let next = self.current;
        let mut else_block = next;
        if let Some(else_statement) = else_statement {
            // a nested `if` creates its own block
            if self.tree.kind(else_statement) != Kind::IfStatement {
                self.current = self.create_block_to(next);
            }
            self.build(else_statement);
            else_block = self.current;
        }
        self.current = self.create_block_to(next);
        self.build(then_statement);
        let then_block = self.current;
        self.current = self.create_branch(node, then_block, else_block);
        self.build_condition(condition, then_block, else_block);
    }

    /// Builds a chain of arithmetic or comparison operators along its left spine.
    fn build_binary(&mut self, node: NodeId) {
        let tree = self.tree;
        let mut current = node;
        loop {
            self.add_element(current);
            let NodeData::Binary { left, right } = *tree.data(current) else {
                return;
            };
            self.build(right);
            if is_logical(tree.kind(left)) || !matches!(tree.data(left), NodeData::Binary { .. }) {
                self.build(left);
                return;
            }
            current = left;
        }
    }

    /// Builds a chain of `&&` and `||` along its left spine.
    ///
    /// Each operator ends the block evaluating its left operand. Those blocks
    /// get their edges once the whole spine is built.
    fn build_logical(&mut self, node: NodeId) {
        let tree = self.tree;
        let mut to_complete = Vec::new();
        let mut current = node;
        while is_logical(tree.kind(current)) {
            let NodeData::Binary { left, right } = *tree.data(current) else {
                break;
            };
            let next = self.current;
            self.current = self.create_block_to(next);
            self.build(right);
            let (true_block, false_block) = if tree.kind(current) == Kind::ConditionalAnd {
                (self.current, next)
            } else {
                (next, self.current)
            };
            self.current = self.create_block();
            to_complete.push((self.current, current, true_block, false_block));
            current = left;
        }
        self.build(current);
        for (block, terminator, true_block, false_block) in to_complete.into_iter().rev() {
            self.block_mut(block).terminator = Some(terminator);
            self.add_false_successor(block, false_block);
            self.add_true_successor(block, true_block);
        }
    }

    fn build_switch(&mut self, node: NodeId, expression: NodeId, cases: &[NodeId]) {
        let switch_successor = self.current;
        self.current = self.create_block();
        self.block_mut(self.current).terminator = Some(node);
        self.switches.push(self.current);
        self.build(expression);
        let condition_block = self.current;

        self.current = self.create_block_to(switch_successor);
        self.break_targets.push(switch_successor);
        let mut has_default = false;
        let first = cases.first().copied();
        let tree = self.tree;
        for &case in cases.iter().rev() {
            let NodeData::CaseGroup { labels, body } = tree.data(case) else {
                continue;
            };
            self.build_all(body);
            if !has_default {
                has_default = labels
                    .iter()
                    .any(|&label| matches!(tree.data(label), NodeData::CaseLabel { expression: None }));
            }
            if let Some(&switch) = self.switches.last() {
                self.add_successor(switch, self.current);
            }
            if Some(case) != first {
                self.current = self.create_block_to(self.current);
            }
        }
        self.break_targets.pop();

        if let Some(switch) = self.switches.pop() {
            if !has_default {
                self.add_successor(switch, switch_successor);
            }
        }
        self.current = condition_block;
    }

    fn build_jump(&mut self, node: NodeId, kind: Kind, label: Option<NodeId>) {
        let is_break = kind == Kind::BreakStatement;
        let target = match label {
            None => {
                let targets = if is_break {
                    &self.break_targets
                } else {
                    &self.continue_targets
                };
                targets.last().copied()
            }
            Some(label) => {
                let name = self.tree.name(label).unwrap_or_default();
                let labels = if is_break {
                    &self.labels_break_target
                } else {
                    &self.labels_continue_target
                };
                labels.get(name).copied()
            }
        };
        let target = target.unwrap_or_else(|| {
            debug!(%kind, "jump has no enclosing target, routing to the exit block");
            self.exit_block()
        });
        self.current = self.create_unconditional_jump(node, target);
    }

    fn build_for(
        &mut self,
        node: NodeId,
        initializer: &[NodeId],
        condition: Option<NodeId>,
        update: &[NodeId],
        statement: NodeId,
    ) {
        let false_branch = self.current;
        self.current = self.create_block();
        let update_block = self.current;
        self.build_all(update);
        self.add_continue_target(self.current);

        self.current = self.create_block_to(self.current);
        self.break_targets.push(false_branch);
        self.build(statement);
        self.break_targets.pop();
        self.continue_targets.pop();
        let body = self.current;

        match condition {
            Some(condition) => {
                self.current = self.create_branch(node, body, false_branch);
                self.build_condition(condition, body, false_branch);
            }
            None => self.current = self.create_unconditional_jump(node, body),
        }
        self.add_successor(update_block, self.current);

        self.current = self.create_block_to(self.current);
        self.build_all(initializer);
    }

    fn build_try(
        &mut self,
        node: NodeId,
        resources: &[NodeId],
        block: NodeId,
        catches: &[NodeId],
        finally_block: Option<NodeId>,
    ) {
        self.current = self.create_block_to(self.current);
        if let Some(finally_tree) = finally_block {
            let finally = self.current;
            self.block_mut(finally).is_finally_block = true;
            self.build(finally_tree);
            let exit = self.exit_block();
            self.add_exit_successor(finally, exit);
            self.exit_blocks.push(self.current);
        }
        let finally_or_end = self.current;
        let before_finally = self.create_block_to(self.current);

        let mut catch_blocks = Vec::with_capacity(catches.len());
        let tree = self.tree;
        for &catch in catches {
            self.current = self.create_block_to(finally_or_end);
            if let NodeData::Catch { block, .. } = tree.data(catch) {
                self.build(*block);
            }
            catch_blocks.push(self.current);
        }

        self.current = before_finally;
        self.build(block);
        let source = match self.blocks[self.current.index()].exit_block {
            Some(exit) if self.blocks[exit.index()].is_finally_block => exit,
            _ => self.current,
        };
        for &catch in &catch_blocks {
            self.add_successor(source, catch);
        }

        self.build_all(resources);
        self.current = self.create_block_to(self.current);
        self.add_element(node);
        if finally_block.is_some() {
            self.exit_blocks.pop();
            if catch_blocks.is_empty() {
                self.add_exit_successor(self.current, finally_or_end);
            }
        }
        for &catch in &catch_blocks {
            self.add_successor(self.current, catch);
        }
    }

    fn build_condition(&mut self, mut node: NodeId, mut true_block: BlockId, mut false_block: BlockId) {
        let tree = self.tree;
        loop {
            match *tree.data(node) {
                NodeData::Binary { left, right } if tree.kind(node) == Kind::ConditionalOr => {
                    self.build_condition(right, true_block, false_block);
                    false_block = self.current;
                    self.current = self.create_branch(node, true_block, false_block);
                    node = left;
                }
                NodeData::Binary { left, right } if tree.kind(node) == Kind::ConditionalAnd => {
                    self.build_condition(right, true_block, false_block);
                    true_block = self.current;
                    self.current = self.create_branch(node, true_block, false_block);
                    node = left;
                }
                NodeData::Parenthesized { expression } => node = expression,
                _ => {
                    self.build(node);
                    return;
                }
            }
        }
    }

    // === Cleanup ===

    fn is_inactive(&self, block: &Block) -> bool {
        if block.id == self.current && block.successors.len() > 1 {
            return false;
        }
        block.is_inactive()
    }

    /// Removes empty pass-through blocks, then renumbers the rest in
    /// creation order. The exit block is never removed.
    fn prune(&mut self) {
        let inactive: Vec<BlockId> = self
            .blocks
            .iter()
            .skip(1)
            .filter(|block| self.is_inactive(block))
            .map(|block| block.id)
            .collect();
        if inactive.is_empty() {
            return;
        }

        for &removed in &inactive {
            let replacement: Vec<BlockId> = self.blocks[removed.index()]
                .successors
                .iter()
                .copied()
                .filter(|&successor| successor != removed)
                .collect();
            for block in &mut self.blocks {
                block.redirect(removed, &replacement);
            }
        }
        if inactive.contains(&self.current) {
            self.current = self.blocks[self.current.index()]
                .successors
                .first()
                .copied()
                .unwrap_or(BlockId::EXIT);
        }

        self.renumber(&inactive);
        trace!(removed = inactive.len(), "pruned inactive blocks");
    }

    /// Drops the blocks control cannot reach from the entry block, then
    /// renumbers the rest. The exit block is always kept.
    fn remove_unreachable(&mut self) {
        let mut reachable = vec![false; self.blocks.len()];
        reachable[BlockId::EXIT.index()] = true;
        let mut stack = vec![self.current];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut reachable[id.index()], true) {
                continue;
            }
            stack.extend(self.blocks[id.index()].successors.iter().copied());
        }
        let unreachable: Vec<BlockId> = self
            .blocks
            .iter()
            .map(|block| block.id)
            .filter(|id| !reachable[id.index()])
            .collect();
        if unreachable.is_empty() {
            return;
        }
        self.renumber(&unreachable);
        debug!(removed = unreachable.len(), "removed unreachable blocks");
    }

    /// Deletes `removed` and gives the remaining blocks dense ids in creation order.
    fn renumber(&mut self, removed: &[BlockId]) {
        let mut is_removed = vec![false; self.blocks.len()];
        for id in removed {
            is_removed[id.index()] = true;
        }
        let mut renumbered: FxHashMap<BlockId, BlockId> = FxHashMap::default();
        let blocks = std::mem::take(&mut self.blocks);
        for mut block in blocks {
            if is_removed[block.id.index()] {
                continue;
            }
            let id = BlockId(self.blocks.len() as u32);
            renumbered.insert(block.id, id);
            block.id = id;
            self.blocks.push(block);
        }
        let remap = |id: BlockId| renumbered.get(&id).copied();
        for block in &mut self.blocks {
            block.successors = block.successors.iter().filter_map(|&s| remap(s)).collect();
            block.true_block = block.true_block.and_then(remap);
            block.false_block = block.false_block.and_then(remap);
            block.exit_block = block.exit_block.and_then(remap);
        }
        self.current = remap(self.current).unwrap_or(BlockId::EXIT);
    }

    fn compute_predecessors(&mut self) {
        let edges: Vec<(BlockId, BlockId)> = self
            .blocks
            .iter()
            .flat_map(|block| block.successors.iter().map(move |&s| (block.id, s)))
            .collect();
        for (from, to) in edges {
            self.blocks[to.index()].predecessors.insert(from);
        }
    }
}

impl Block {
    /// Replaces every reference to `removed` by its successors.
    fn redirect(&mut self, removed: BlockId, replacement: &[BlockId]) {
        let first = replacement.first().copied();
        if self.true_block == Some(removed) {
            self.true_block = first;
        }
        if self.false_block == Some(removed) {
            self.false_block = first;
        }
        if self.successors.shift_remove(&removed) {
            self.successors.extend(replacement.iter().copied());
        }
        if self.exit_block == Some(removed) {
            self.exit_block = first;
        }
    }
}

fn is_logical(kind: Kind) -> bool {
    matches!(kind, Kind::ConditionalAnd | Kind::ConditionalOr)
}

/// Kinds stored as-is in a block: declarations, lambdas and simple values.
fn is_plain_element(kind: Kind) -> bool {
    kind.is_literal()
        || kind.is_type_declaration()
        || matches!(
            kind,
            Kind::Identifier | Kind::EmptyStatement | Kind::LambdaExpression | Kind::MethodReference
        )
}
