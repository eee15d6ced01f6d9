//! Binds compiler-style warnings to the syntax nodes they are about.
//!
//! A warning only carries a line/column span. [`WarningMapper`] looks for
//! the deepest node of an accepted kind whose span contains it.

use std::fmt;

use java_source_map::{Position, Range};
use java_tree::{Kind, NodeId, Problem, ProblemKind, SyntaxTree};
use tracing::trace;

const IMPORTS: &[Kind] = &[Kind::ImportDeclaration];

const ASSIGNMENTS: &[Kind] = &[
    Kind::Assignment,
    Kind::MultiplyAssignment,
    Kind::DivideAssignment,
    Kind::RemainderAssignment,
    Kind::PlusAssignment,
    Kind::MinusAssignment,
    Kind::LeftShiftAssignment,
    Kind::RightShiftAssignment,
    Kind::UnsignedRightShiftAssignment,
    Kind::AndAssignment,
    Kind::XorAssignment,
    Kind::OrAssignment,
];

const CASTS: &[Kind] = &[Kind::TypeCast];

/// The warnings the mapper knows how to place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum WarningType {
    UnusedImport,
    AssignmentHasNoEffect,
    RedundantCast,
}

impl WarningType {
    /// Returns the node kinds a warning of this type may be bound to.
    pub fn kinds(&self) -> &'static [Kind] {
        match self {
            WarningType::UnusedImport => IMPORTS,
            WarningType::AssignmentHasNoEffect => ASSIGNMENTS,
            WarningType::RedundantCast => CASTS,
        }
    }

    /// Returns the stable identifier used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningType::UnusedImport => "unused-import",
            WarningType::AssignmentHasNoEffect => "assignment-has-no-effect",
            WarningType::RedundantCast => "redundant-cast",
        }
    }
}

impl From<ProblemKind> for WarningType {
    fn from(kind: ProblemKind) -> Self {
        match kind {
            ProblemKind::UnusedImport => WarningType::UnusedImport,
            ProblemKind::AssignmentHasNoEffect => WarningType::AssignmentHasNoEffect,
            ProblemKind::UnnecessaryCast => WarningType::RedundantCast,
        }
    }
}

impl fmt::Display for WarningType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A warning and, once mapped, the node it is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JWarning {
    message: String,
    warning_type: WarningType,
    start_line: u32,
    start_column: u32,
    end_line: u32,
    end_column: u32,
    syntax_tree: Option<NodeId>,
}

impl JWarning {
    /// Creates an unmapped warning. Lines are 1-based, columns 0-based.
    pub fn new(
        message: impl Into<String>,
        warning_type: WarningType,
        start_line: u32,
        start_column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Self {
        Self {
            message: message.into(),
            warning_type,
            start_line,
            start_column,
            end_line,
            end_column,
            syntax_tree: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn warning_type(&self) -> WarningType {
        self.warning_type
    }

    pub fn start_line(&self) -> u32 {
        self.start_line
    }

    pub fn start_column(&self) -> u32 {
        self.start_column
    }

    pub fn end_line(&self) -> u32 {
        self.end_line
    }

    pub fn end_column(&self) -> u32 {
        self.end_column
    }

    /// Returns the bound node, if the warning was mapped.
    pub fn syntax_tree(&self) -> Option<NodeId> {
        self.syntax_tree
    }

    /// Returns the span of the warning.
    pub fn range(&self) -> Range {
        Range {
            start: Position::new(self.start_line, self.start_column),
            end: Position::new(self.end_line, self.end_column),
        }
    }
}

impl From<&Problem> for JWarning {
    fn from(problem: &Problem) -> Self {
        let Range { start, end } = problem.range;
        JWarning::new(
            problem.message.clone(),
            problem.kind.into(),
            start.line,
            start.column,
            end.line,
            end.column,
        )
    }
}

/// Places warnings on the nodes of one tree.
#[derive(Debug, Clone, Copy)]
pub struct WarningMapper<'t> {
    tree: &'t SyntaxTree,
}

impl<'t> WarningMapper<'t> {
    pub fn new(tree: &'t SyntaxTree) -> Self {
        Self { tree }
    }

    /// Converts resolver problems to warnings and maps them.
    pub fn warnings(tree: &'t SyntaxTree, problems: &[Problem]) -> Vec<JWarning> {
        let mut warnings: Vec<JWarning> = problems.iter().map(JWarning::from).collect();
        WarningMapper::new(tree).map(&mut warnings);
        warnings
    }

    /// Returns true if `node` has an accepted kind and its span contains
    /// the warning's span, boundaries included.
    pub fn is_inside_tree(&self, warning: &JWarning, node: NodeId) -> bool {
        if !warning.warning_type.kinds().contains(&self.tree.kind(node)) {
            return false;
        }
        self.tree
            .range(node)
            .is_some_and(|range| range.contains(&warning.range()))
    }

    /// Returns true if `inner` is a strict descendant of `outer`.
    ///
    /// Overlapping siblings are never more precise than one another.
    pub fn is_more_precise_tree(&self, outer: NodeId, inner: NodeId) -> bool {
        self.tree.is_descendant(outer, inner)
    }

    /// Binds `node` to the warning if nothing is bound yet, or if `node`
    /// is more precise than the current binding.
    pub fn set_syntax_tree(&self, warning: &mut JWarning, node: NodeId) {
        match warning.syntax_tree {
            None => warning.syntax_tree = Some(node),
            Some(current) if self.is_more_precise_tree(current, node) => {
                warning.syntax_tree = Some(node);
            }
            Some(_) => {}
        }
    }

    /// Binds every warning to the most precise enclosing node of an
    /// accepted kind. Warnings with no such node stay unbound.
    pub fn map(&self, warnings: &mut [JWarning]) {
        for (node, _) in self.tree.nodes() {
            for warning in warnings.iter_mut() {
                if self.is_inside_tree(warning, node) {
                    self.set_syntax_tree(warning, node);
                }
            }
        }
        for warning in warnings.iter() {
            trace!(
                warning = %warning.warning_type,
                bound = warning.syntax_tree.is_some(),
                "mapped warning"
            );
        }
    }
}
