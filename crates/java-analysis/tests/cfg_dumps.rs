//! Debug dumps of control-flow graphs for small method bodies.

use java_analysis::{BlockId, Cfg};
use java_tree::{parse, Kind, SyntaxTree};

fn method_cfg(tree: &SyntaxTree) -> Cfg<'_> {
    let (method, _) = tree
        .nodes()
        .find(|(_, node)| node.kind == Kind::Method)
        .expect("a method");
    Cfg::build_method(tree, method).expect("a method body")
}

/// Collapses the column padding so snapshots stay readable.
fn dump(source: &str) -> String {
    let result = parse(source);
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    let cfg = method_cfg(&result.tree);
    cfg.to_string()
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn test_if_else() {
    insta::assert_snapshot!(
        dump("class A { void f(boolean a) { if (a) { x(); } else { y(); } z(); } }"),
        @r"
    Starts at B4

    B4
    0: IDENTIFIER a
    T: IF_STATEMENT
    jumps to: B2(false) B3(true)

    B3
    0: IDENTIFIER x
    1: METHOD_INVOCATION x
    jumps to: B1

    B2
    0: IDENTIFIER y
    1: METHOD_INVOCATION y
    jumps to: B1

    B1
    0: IDENTIFIER z
    1: METHOD_INVOCATION z
    jumps to: B0

    B0 (Exit):
    "
    );
}

#[test]
fn test_while_loop_prunes_loopback() {
    insta::assert_snapshot!(
        dump("class A { void f() { while (c) { g(); } h(); } }"),
        @r"
    Starts at B3

    B3
    0: IDENTIFIER c
    T: WHILE_STATEMENT
    jumps to: B1(false) B2(true)

    B2
    0: IDENTIFIER g
    1: METHOD_INVOCATION g
    jumps to: B3

    B1
    0: IDENTIFIER h
    1: METHOD_INVOCATION h
    jumps to: B0

    B0 (Exit):
    "
    );
}

#[test]
fn test_short_circuit_condition() {
    insta::assert_snapshot!(
        dump("class A { void f() { if (a && b) { g(); } } }"),
        @r"
    Starts at B3

    B3
    0: IDENTIFIER a
    T: CONDITIONAL_AND
    jumps to: B2(true) B0(false)

    B2
    0: IDENTIFIER b
    T: IF_STATEMENT
    jumps to: B1(true) B0(false)

    B1
    0: IDENTIFIER g
    1: METHOD_INVOCATION g
    jumps to: B0

    B0 (Exit):
    "
    );
}

#[test]
fn test_dumps_are_reproducible() {
    let source = "class A { int f(int[] xs) {
        int total = 0;
        for (int x : xs) {
            switch (x) {
                case 0: continue;
                case 1: total++; break;
                default: total += x;
            }
        }
        try { check(total); } catch (RuntimeException e) { return -1; } finally { log(); }
        return total > 10 ? 10 : total;
    } }";
    assert_eq!(dump(source), dump(source));
}

#[test]
fn test_ids_are_dense_and_exit_is_last() {
    let result = parse(
        "class A { void f(int n) { do { n--; if (n == 3) break; } while (n > 0 || flag()); done(); } }",
    );
    let cfg = method_cfg(&result.tree);
    let ids: Vec<BlockId> = cfg.blocks().map(|block| block.id()).collect();
    let expected: Vec<BlockId> = cfg.reversed_blocks().iter().rev().map(|b| b.id()).collect();
    assert_eq!(ids, expected);
    for (index, block) in cfg.reversed_blocks().iter().enumerate() {
        assert_eq!(block.id().index(), index);
    }
    assert_eq!(ids.last(), Some(&BlockId::EXIT));
}
