//! Structural analyses over java-tree syntax trees.
//!
//! This crate provides:
//! - Control-flow graphs of method bodies, with a stable debug dump
//! - Syntactic and semantic equivalence of subtrees
//! - Mapping of compiler-style warnings onto the nodes they concern
//!
//! Every analysis borrows an immutable [`SyntaxTree`](java_tree::SyntaxTree)
//! and keeps no state between calls.
//!
//! # Example
//!
//! ```
//! use java_analysis::Cfg;
//! use java_tree::{parse, Kind};
//!
//! let result = parse("class A { void f(boolean b) { if (b) g(); } }");
//! let tree = &result.tree;
//! let (method, _) = tree.nodes().find(|(_, n)| n.kind == Kind::Method).unwrap();
//! let cfg = Cfg::build_method(tree, method).unwrap();
//! assert!(cfg.to_string().starts_with("Starts at B"));
//! assert!(cfg.exit().successors().is_empty());
//! ```

pub mod cfg;
mod equivalence;
mod warning;

pub use cfg::{Block, BlockId, Cfg, CfgError};
pub use equivalence::{
    are_equivalent, are_equivalent_including_same_variables, are_equivalent_lists,
    are_equivalent_with, are_semantically_equivalent, OverrideResult,
};
pub use warning::{JWarning, WarningMapper, WarningType};
