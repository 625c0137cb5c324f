//! Declarations: namespaces, using, typedef, enums, linkage, pragmas,
//! static_assert.

use indoc::indoc;

use crate::ast::{Linkage, Node};
use crate::diag::ParseErrorKind;

use super::{find_function, parse_err, parse_ok};

#[test]
fn empty_namespace_has_zero_children() {
    let tu = parse_ok("namespace empty {}\n");
    assert_eq!(tu.roots.len(), 1);
    let Node::NamespaceDecl { name, decls, .. } = tu.arena.get(tu.roots[0]) else {
        panic!("expected a namespace node");
    };
    assert!(name.is_some());
    assert!(decls.is_empty());
}

#[test]
fn lone_semicolons_are_accepted() {
    let tu = parse_ok(";; int x; ;\n");
    assert_eq!(tu.roots.len(), 1);
    assert!(matches!(tu.arena.get(tu.roots[0]), Node::VarDecl(_)));
}

#[test]
fn nested_namespace_definition() {
    let tu = parse_ok(indoc! {r#"
        namespace a::b { int y; }
    "#});
    let a = tu.interner.intern("a");
    let b = tu.interner.intern("b");
    let y = tu.interner.intern("y");
    assert_eq!(tu.symbols.qualified_lookup(&[a, b], y, false).len(), 1);
    // `a::y` does not resolve; b is not inline.
    assert!(tu.symbols.qualified_lookup(&[a], y, false).is_empty());
}

#[test]
fn namespace_alias_resolves_through_target() {
    let tu = parse_ok(indoc! {r#"
        namespace x { int v; }
        namespace y = x;
    "#});
    assert!(
        tu.roots
            .iter()
            .any(|&r| matches!(tu.arena.get(r), Node::NamespaceAlias { .. }))
    );
    let y = tu.interner.intern("y");
    let v = tu.interner.intern("v");
    assert_eq!(tu.symbols.qualified_lookup(&[y], v, false).len(), 1);
}

#[test]
fn namespace_alias_to_unknown_target_fails() {
    let err = parse_err("namespace z = not_a_namespace;\n");
    assert_eq!(err.kind, ParseErrorKind::MissingIdentifier);
}

#[test]
fn anonymous_namespace_members_land_in_enclosing_scope() {
    let tu = parse_ok(indoc! {r#"
        namespace { int hidden; }
        int main() { return hidden; }
    "#});
    let main = find_function(&tu, "main");
    let ret = super::return_expr_of(&tu, main);
    let Node::Identifier { decl, .. } = tu.arena.get(ret) else {
        panic!("expected an identifier");
    };
    assert!(decl.is_some(), "hidden resolves without qualification");
}

#[test]
fn anonymous_namespace_members_get_internal_linkage_names() {
    let tu = parse_ok(indoc! {r#"
        namespace { int secret(); }
    "#});
    let secret = find_function(&tu, "secret");
    let Node::FunctionDecl(f) = tu.arena.get(secret) else {
        unreachable!();
    };
    let mangled = tu.interner.resolve(f.mangled.expect("mangled name"));
    assert!(
        mangled.contains("_GLOBAL__N_1"),
        "anonymous-namespace member carries the unique component: {mangled}"
    );

    // The same declaration at file scope mangles differently.
    let plain_tu = parse_ok("int secret();\n");
    let plain = find_function(&plain_tu, "secret");
    let Node::FunctionDecl(pf) = plain_tu.arena.get(plain) else {
        unreachable!();
    };
    assert_ne!(
        &*plain_tu.interner.resolve(pf.mangled.expect("mangled name")),
        &*mangled
    );
}

#[test]
fn using_directive_makes_members_visible() {
    let tu = parse_ok(indoc! {r#"
        namespace n { int k; }
        using namespace n;
        int main() { return k; }
    "#});
    let main = find_function(&tu, "main");
    let ret = super::return_expr_of(&tu, main);
    assert!(matches!(
        tu.arena.get(ret),
        Node::Identifier { decl: Some(_), .. }
    ));
}

#[test]
fn using_declaration_imports_a_single_name() {
    let tu = parse_ok(indoc! {r#"
        namespace n { int k; }
        using n::k;
        int main() { return k; }
    "#});
    let main = find_function(&tu, "main");
    let ret = super::return_expr_of(&tu, main);
    assert!(matches!(
        tu.arena.get(ret),
        Node::Identifier { decl: Some(_), .. }
    ));
}

#[test]
fn alias_declaration_registers_a_type() {
    let tu = parse_ok(indoc! {r#"
        using Int32 = int;
        Int32 z;
    "#});
    let z = tu.interner.intern("z");
    let decl = tu.symbols.lookup(z);
    let Node::VarDecl(v) = tu.arena.get(decl[0]) else {
        panic!("expected a variable");
    };
    // The alias resolved to the underlying builtin.
    assert!(v.ty.is_integral());
}

#[test]
fn typedef_and_function_pointer_typedef() {
    let tu = parse_ok(indoc! {r#"
        typedef unsigned long size_type;
        typedef int (*callback)(int, int);
        size_type s;
    "#});
    let callback = tu.interner.intern("callback");
    let id = tu.types.lookup(callback).expect("callback registered");
    let info = tu.types.get(id);
    let target = info.alias_of.as_ref().expect("alias target");
    assert_eq!(target.base, crate::types::BaseKind::FunctionPointer);
    let sig = target.signature.as_ref().expect("signature");
    assert_eq!(sig.params.len(), 2);
}

#[test]
fn enum_values_count_up_from_initializers() {
    let tu = parse_ok(indoc! {r#"
        enum Color { Red, Green = 10, Blue };
        int main() { return Green; }
    "#});
    let color = tu.interner.intern("Color");
    let id = tu.types.lookup(color).expect("Color registered");
    let info = tu.types.get(id).enum_info.as_ref().expect("enum info");
    let values: Vec<i64> = info.enumerators.iter().map(|(_, v)| *v).collect();
    assert_eq!(values, vec![0, 10, 11]);

    assert_eq!(super::eval_main_return(&tu).as_i64(), 10);
}

#[test]
fn scoped_enum_with_underlying_type() {
    let tu = parse_ok("enum class E : short { A, B };\n");
    let e = tu.interner.intern("E");
    let id = tu.types.lookup(e).expect("E registered");
    let info = tu.types.get(id).enum_info.as_ref().expect("enum info");
    assert!(info.is_scoped);
    assert_eq!(info.underlying_bits, 16);
}

#[test]
fn using_enum_injects_enumerators() {
    let tu = parse_ok(indoc! {r#"
        enum class E { A, B };
        using enum E;
        int main() { return B; }
    "#});
    assert_eq!(super::eval_main_return(&tu).as_i64(), 1);
}

#[test]
fn pragma_pack_changes_struct_layout() {
    let tu = parse_ok(indoc! {r#"
        #pragma pack(push, 1)
        struct P { char c; int i; };
        #pragma pack(pop)
        struct Q { char c; int i; };
    "#});
    let p = tu.types.lookup(tu.interner.intern("P")).expect("P");
    let q = tu.types.lookup(tu.interner.intern("Q")).expect("Q");
    assert_eq!(tu.types.get(p).size_bits, 40, "packed to 1 byte");
    assert_eq!(tu.types.get(q).size_bits, 64, "natural layout");
}

#[test]
fn unknown_pragma_warns_and_continues() {
    let tu = parse_ok(indoc! {r#"
        #pragma once
        int x;
    "#});
    assert_eq!(tu.warnings.len(), 1);
    assert_eq!(tu.warnings[0].kind, ParseErrorKind::UnknownPragma);
    assert_eq!(tu.roots.len(), 1);
}

#[test]
fn ms_pragma_pack_spelling() {
    let tu = parse_ok(indoc! {r#"
        __pragma(pack(push, 1))
        struct P { char c; int i; };
        __pragma(pack(pop))
    "#});
    let p = tu.types.lookup(tu.interner.intern("P")).expect("P");
    assert_eq!(tu.types.get(p).size_bits, 40);
}

#[test]
fn static_assert_true_is_silent() {
    let tu = parse_ok("static_assert(1 + 1 == 2, \"math\");\n");
    assert!(tu.roots.is_empty());
}

#[test]
fn static_assert_false_is_a_hard_error_at_file_scope() {
    let err = parse_err("static_assert(false, \"no\");\n");
    assert!(err.message.contains("no"));
}

#[test]
fn static_assert_message_concatenates_adjacent_literals() {
    let err = parse_err("static_assert(false, \"ab\" \"cd\");\n");
    assert!(err.message.contains("abcd"));
}

#[test]
fn extern_c_block_applies_linkage_to_all_declarations() {
    let tu = parse_ok(indoc! {r#"
        extern "C" {
            int f(int);
            int g(int);
        }
    "#});
    for name in ["f", "g"] {
        let func = find_function(&tu, name);
        let Node::FunctionDecl(f) = tu.arena.get(func) else {
            unreachable!();
        };
        assert_eq!(f.linkage, Linkage::C);
    }
}

#[test]
fn unknown_linkage_string_is_an_error() {
    let err = parse_err("extern \"D\" int f(int);\n");
    assert!(err.message.contains("unknown linkage"));
}

#[test]
fn out_of_class_member_definition_attaches_body() {
    let tu = parse_ok(indoc! {r#"
        struct S {
            int get();
        };
        int S::get() { return 3; }
    "#});
    let get = find_function(&tu, "get");
    let Node::FunctionDecl(f) = tu.arena.get(get) else {
        unreachable!();
    };
    assert!(f.body.is_some());
    assert!(f.member_of.is_some());
}
