use cxxfront_core::SharedInterner;

use crate::ast::NodeId;
use crate::symbols::{GLOBAL_NAMESPACE, ScopeKind, SymbolTable};

fn syms() -> (SymbolTable, SharedInterner) {
    (SymbolTable::new(), SharedInterner::new())
}

#[test]
fn inner_scope_shadows_outer() {
    let (mut table, interner) = syms();
    let x = interner.intern("x");
    table.declare(x, NodeId(1));
    table.enter_scope(ScopeKind::Block);
    table.declare(x, NodeId(2));
    assert_eq!(table.lookup(x), vec![NodeId(2)]);
    table.exit_scope();
    assert_eq!(table.lookup(x), vec![NodeId(1)]);
}

#[test]
fn exited_scope_declarations_disappear() {
    let (mut table, interner) = syms();
    let y = interner.intern("y");
    table.enter_scope(ScopeKind::Function);
    table.declare(y, NodeId(7));
    table.exit_scope();
    assert!(table.lookup(y).is_empty());
}

#[test]
fn scope_counts_balance() {
    let (mut table, _) = syms();
    table.enter_scope(ScopeKind::Function);
    table.enter_scope(ScopeKind::Block);
    table.exit_scope();
    table.exit_scope();
    let (enters, exits) = table.scope_counts();
    assert_eq!(enters, exits);
    assert_eq!(table.depth(), 1, "only the global scope remains");
}

#[test]
fn namespace_members_survive_scope_exit_for_qualified_lookup() {
    let (mut table, interner) = syms();
    let n = interner.intern("n");
    let k = interner.intern("k");
    let ns = table.namespaces.get_or_create(GLOBAL_NAMESPACE, n);
    table.enter_scope(ScopeKind::Namespace(ns));
    table.declare(k, NodeId(3));
    table.exit_scope();

    assert!(table.lookup(k).is_empty(), "unqualified lookup fails outside");
    assert_eq!(table.qualified_lookup(&[n], k, false), vec![NodeId(3)]);
}

#[test]
fn using_directive_reaches_namespace_members_transitively() {
    let (mut table, interner) = syms();
    let a = interner.intern("a");
    let b = interner.intern("b");
    let v = interner.intern("v");

    let ns_a = table.namespaces.get_or_create(GLOBAL_NAMESPACE, a);
    let ns_b = table.namespaces.get_or_create(GLOBAL_NAMESPACE, b);
    table.namespaces.add_symbol(ns_b, v, NodeId(9));

    // `using namespace b;` inside namespace a, then `using namespace a;`
    // at the point of lookup.
    table.enter_scope(ScopeKind::Namespace(ns_a));
    table.add_using_directive(ns_b);
    table.exit_scope();

    table.add_using_directive(ns_a);
    assert_eq!(table.lookup(v), vec![NodeId(9)]);
}

#[test]
fn inline_namespace_members_resolve_in_parent() {
    let (mut table, interner) = syms();
    let outer = interner.intern("outer");
    let inner = interner.intern("inner");
    let z = interner.intern("z");

    let ns_outer = table.namespaces.get_or_create(GLOBAL_NAMESPACE, outer);
    let ns_inner = table.namespaces.get_or_create(ns_outer, inner);
    table.namespaces.mark_inline(ns_inner);
    table.namespaces.add_symbol(ns_inner, z, NodeId(4));

    // Qualified through the parent only.
    assert_eq!(table.qualified_lookup(&[outer], z, false), vec![NodeId(4)]);
    // And through the full path.
    assert_eq!(
        table.qualified_lookup(&[outer, inner], z, false),
        vec![NodeId(4)]
    );
}

#[test]
fn namespace_alias_resolves_in_paths() {
    let (mut table, interner) = syms();
    let long_name = interner.intern("verylongname");
    let short_name = interner.intern("vl");
    let w = interner.intern("w");

    let ns = table.namespaces.get_or_create(GLOBAL_NAMESPACE, long_name);
    table.namespaces.add_symbol(ns, w, NodeId(5));
    table.namespaces.add_alias(GLOBAL_NAMESPACE, short_name, ns);

    assert_eq!(table.qualified_lookup(&[short_name], w, false), vec![NodeId(5)]);
}

#[test]
fn overload_sets_accumulate_in_declaration_order() {
    let (mut table, interner) = syms();
    let f = interner.intern("f");
    table.declare(f, NodeId(10));
    table.declare(f, NodeId(11));
    assert_eq!(table.lookup(f), vec![NodeId(10), NodeId(11)]);
}

#[test]
fn reopened_namespace_keeps_earlier_using_directives() {
    let (mut table, interner) = syms();
    let m = interner.intern("m");
    let other = interner.intern("other");
    let t = interner.intern("t");

    let ns_m = table.namespaces.get_or_create(GLOBAL_NAMESPACE, m);
    let ns_other = table.namespaces.get_or_create(GLOBAL_NAMESPACE, other);
    table.namespaces.add_symbol(ns_other, t, NodeId(6));

    table.enter_scope(ScopeKind::Namespace(ns_m));
    table.add_using_directive(ns_other);
    table.exit_scope();

    // Reopening m sees the directive attached in the first block.
    table.enter_scope(ScopeKind::Namespace(ns_m));
    assert_eq!(table.lookup(t), vec![NodeId(6)]);
    table.exit_scope();
}
