//! Syntactic and semantic equivalence of subtrees.
//!
//! Two trees are syntactically equivalent when they have the same shape and
//! the same token text at every leaf. Comments and layout are ignored since
//! they live in trivia. The trees may come from different compilation units.

use java_tree::{Kind, NodeRef};

/// What an override predicate forces when it matches a pair of nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverrideResult {
    /// The pair is equivalent whatever its structure.
    Permissive,
    /// The pair is not equivalent whatever its structure.
    Dismissive,
}

/// Returns true if both trees have the same shape and leaf texts.
///
/// Two absent trees are equivalent; an absent and a present tree are not.
///
/// # Example
///
/// ```
/// use java_analysis::are_equivalent;
/// use java_tree::{parse, Kind, NodeRef, SyntaxTree};
///
/// fn plus(tree: &SyntaxTree) -> NodeRef<'_> {
///     let (id, _) = tree.nodes().find(|(_, n)| n.kind == Kind::Plus).unwrap();
///     tree.get(id)
/// }
///
/// let left = parse("class A { int f() { return a + /* sum */ b; } }");
/// let right = parse("class B { int g() { return a+b; } }");
/// assert!(are_equivalent(Some(plus(&left.tree)), Some(plus(&right.tree))));
/// ```
pub fn are_equivalent(left: Option<NodeRef<'_>>, right: Option<NodeRef<'_>>) -> bool {
    are_equivalent_with(left, right, |_, _| false, OverrideResult::Permissive)
}

/// Returns true if both lists have the same length and are pairwise equivalent.
pub fn are_equivalent_lists(left: &[NodeRef<'_>], right: &[NodeRef<'_>]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .all(|(&l, &r)| are_equivalent(Some(l), Some(r)))
}

/// Structural equivalence where `overrides` may decide a pair of nodes.
///
/// When `overrides` returns true for a pair, the comparison of that pair
/// stops with `result`: [`OverrideResult::Permissive`] accepts it,
/// [`OverrideResult::Dismissive`] rejects it.
pub fn are_equivalent_with<F>(
    left: Option<NodeRef<'_>>,
    right: Option<NodeRef<'_>>,
    overrides: F,
    result: OverrideResult,
) -> bool
where
    F: Fn(NodeRef<'_>, NodeRef<'_>) -> bool,
{
    Checker { overrides, result }.equivalent(left, right)
}

/// Equivalence that also requires invocations to bind to the same method.
///
/// Two invocations that both failed to resolve are compared structurally.
pub fn are_semantically_equivalent(left: Option<NodeRef<'_>>, right: Option<NodeRef<'_>>) -> bool {
    are_equivalent_with(
        left,
        right,
        |l, r| {
            l.kind() == Kind::MethodInvocation
                && r.kind() == Kind::MethodInvocation
                && !(l.symbol().is_unknown() && r.symbol().is_unknown())
                && l.symbol() != r.symbol()
        },
        OverrideResult::Dismissive,
    )
}

/// Equivalence that also requires identifiers to name the same variables.
///
/// Unresolved identifiers never match, even with identical text.
pub fn are_equivalent_including_same_variables(
    left: Option<NodeRef<'_>>,
    right: Option<NodeRef<'_>>,
) -> bool {
    are_equivalent_with(
        left,
        right,
        |l, r| {
            if l.kind() != Kind::Identifier || r.kind() != Kind::Identifier {
                return false;
            }
            let (ls, rs) = (l.symbol(), r.symbol());
            (ls.is_unknown() && rs.is_unknown())
                || ((ls.is_variable() || rs.is_variable()) && ls != rs)
        },
        OverrideResult::Dismissive,
    )
}

struct Checker<F> {
    overrides: F,
    result: OverrideResult,
}

impl<F> Checker<F>
where
    F: Fn(NodeRef<'_>, NodeRef<'_>) -> bool,
{
    /// Compares pairs from an explicit worklist, left children first.
    fn equivalent(&self, left: Option<NodeRef<'_>>, right: Option<NodeRef<'_>>) -> bool {
        let mut pending = vec![(left, right)];
        while let Some(pair) = pending.pop() {
            let (left, right) = match pair {
                (None, None) => continue,
                (Some(left), Some(right)) => (left, right),
                _ => return false,
            };
            if left == right {
                continue;
            }
            if (self.overrides)(left, right) {
                if self.result == OverrideResult::Permissive {
                    continue;
                }
                return false;
            }
            if left.kind() != right.kind() {
                return false;
            }
            // placeholders only match themselves
            if left.kind() == Kind::NotImplemented {
                return false;
            }
            if left.is_leaf() {
                if left.token_text() != right.token_text() {
                    return false;
                }
                continue;
            }
            let (Some(l), Some(r)) = (left.children(), right.children()) else {
                return false;
            };
            if l.len() != r.len() {
                return false;
            }
            let start = pending.len();
            pending.extend(l.zip(r).map(|(l, r)| (Some(l), Some(r))));
            pending[start..].reverse();
        }
        true
    }
}
