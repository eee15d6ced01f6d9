//! Compiler-style problems reported during binding resolution.

use java_source_map::Range;

/// The category of a [`Problem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProblemKind {
    /// An import no identifier refers to.
    UnusedImport,
    /// `x = x`.
    AssignmentHasNoEffect,
    /// A cast to the static type of its operand.
    UnnecessaryCast,
}

/// A diagnostic produced by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Problem {
    /// The category.
    pub kind: ProblemKind,
    /// The human-readable message.
    pub message: String,
    /// The reported span.
    pub range: Range,
}
