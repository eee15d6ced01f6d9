//! Textual dump of a control-flow graph, used by fixtures and `--emit-cfg`.

use std::fmt;

use java_tree::{Kind, NodeData, NodeId, SyntaxTree};

use super::{Block, Cfg};

/// Extra columns after the longest kind name.
const KIND_PADDING: usize = 5;

impl fmt::Display for Cfg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = Kind::max_name_len() + KIND_PADDING;
        write!(f, "Starts at {}\n\n", self.entry().id())?;
        for block in self.blocks() {
            write_block(f, self.tree(), block, width)?;
        }
        Ok(())
    }
}

fn write_block(f: &mut fmt::Formatter<'_>, tree: &SyntaxTree, block: &Block, width: usize) -> fmt::Result {
    write!(f, "{}", block.id())?;
    if block.id().index() == 0 {
        f.write_str(" (Exit):")?;
    }
    for (i, &element) in block.elements().iter().enumerate() {
        write!(f, "\n{i}:\t")?;
        write_node(f, tree, element, width)?;
    }
    if let Some(terminator) = block.terminator() {
        f.write_str("\nT:\t")?;
        write_node(f, tree, terminator, width)?;
    }
    if !block.successors().is_empty() {
        f.write_str("\n\tjumps to:")?;
        for &successor in block.successors() {
            write!(f, " {successor}")?;
            if block.true_block() == Some(successor) {
                f.write_str("(true)")?;
            }
            if block.false_block() == Some(successor) {
                f.write_str("(false)")?;
            }
            if block.exit_block() == Some(successor) {
                f.write_str("(exit)")?;
            }
        }
    }
    f.write_str("\n\n")
}

fn write_node(f: &mut fmt::Formatter<'_>, tree: &SyntaxTree, node: NodeId, width: usize) -> fmt::Result {
    write!(f, "{:<width$}\t{}", tree.kind(node).as_str(), label(tree, node))
}

/// Names for identifiers, invocations and variables, the literal text for literals.
fn label(tree: &SyntaxTree, node: NodeId) -> &str {
    match tree.data(node) {
        NodeData::Identifier { .. } => tree.name(node).unwrap_or_default(),
        NodeData::Literal { value } => tree.token(*value).text.as_str(),
        NodeData::Variable { name, .. } => tree.name(*name).unwrap_or_default(),
        NodeData::MethodInvocation { method_select, .. } => match tree.data(*method_select) {
            NodeData::MemberSelect { identifier, .. } => tree.name(*identifier).unwrap_or_default(),
            _ => tree.name(*method_select).unwrap_or_default(),
        },
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use crate::Cfg;
    use java_tree::{parse, Kind, SyntaxTree};
    use pretty_assertions::assert_eq;

    fn method_cfg(tree: &SyntaxTree) -> Cfg<'_> {
        let method = tree
            .nodes()
            .find(|(_, node)| node.kind == Kind::Method)
            .map(|(id, _)| id)
            .unwrap();
        Cfg::build_method(tree, method).unwrap()
    }

    fn line(index: &str, kind: &str, label: &str) -> String {
        format!("\n{index}:\t{kind:<36}\t{label}")
    }

    #[test]
    fn test_exact_layout() {
        let result = parse("class A { void f() { foo(); } }");
        let cfg = method_cfg(&result.tree);
        let expected = format!(
            "Starts at B1\n\nB1{}{}\n\tjumps to: B0\n\nB0 (Exit):\n\n",
            line("0", "IDENTIFIER", "foo"),
            line("1", "METHOD_INVOCATION", "foo"),
        );
        assert_eq!(cfg.to_string(), expected);
    }

    #[test]
    fn test_terminator_and_edge_labels() {
        let result = parse("class A { int f(boolean a) { if (a) { return 1; } return 2; } }");
        let cfg = method_cfg(&result.tree);
        let dump = cfg.to_string();
        assert!(dump.starts_with("Starts at B3\n\nB3\n0:\tIDENTIFIER"), "{dump}");
        assert!(dump.contains(&format!("\nT:\t{:<36}\t\n", "IF_STATEMENT")), "{dump}");
        assert!(dump.contains("\tjumps to: B1(false) B2(true)\n"), "{dump}");
        assert!(dump.contains("\tjumps to: B0(exit)\n"), "{dump}");
        assert!(dump.ends_with("B0 (Exit):\n\n"), "{dump}");
    }

    #[test]
    fn test_literal_and_variable_labels() {
        let result = parse("class A { void f() { int x = 42; String s = \"hi\"; } }");
        let cfg = method_cfg(&result.tree);
        let dump = cfg.to_string();
        assert!(dump.contains(&line("0", "INT_LITERAL", "42")), "{dump}");
        assert!(dump.contains(&line("1", "VARIABLE", "x")), "{dump}");
        assert!(dump.contains(&line("2", "STRING_LITERAL", "\"hi\"")), "{dump}");
        assert!(dump.contains(&line("3", "VARIABLE", "s")), "{dump}");
    }
}
