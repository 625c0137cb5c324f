//! End-to-end scenarios: literal inputs, checked outcomes.

use indoc::indoc;

use crate::ast::{Linkage, Node};
use crate::consteval::Value;

use super::{eval, find_function, parse_ok, return_expr_of};

#[test]
fn extern_c_function_and_resolved_call() {
    let tu = parse_ok(indoc! {r#"
        extern "C" int add(int a, int b);
        int main() { return add(10, 20); }
    "#});

    let add = find_function(&tu, "add");
    let Node::FunctionDecl(f) = tu.arena.get(add) else {
        unreachable!();
    };
    assert_eq!(f.linkage, Linkage::C);
    assert_eq!(f.params.len(), 2);
    // C linkage leaves the name unmangled.
    assert_eq!(
        &*tu.interner.resolve(f.mangled.expect("mangled name")),
        "add"
    );

    let main = find_function(&tu, "main");
    let ret = return_expr_of(&tu, main);
    let Node::FunctionCall { resolved, args, .. } = tu.arena.get(ret) else {
        panic!("expected a call node");
    };
    assert_eq!(args.len(), 2);
    assert_eq!(*resolved, Some(add));
}

#[test]
fn function_template_deduction_registers_instantiation() {
    let tu = parse_ok(indoc! {r#"
        template<class T> T id(T x) { return x; }
        int main() { return id(42); }
    "#});

    assert_eq!(tu.instantiations().count(), 1);
    let inst = tu.instantiations().next().expect("one instantiation");

    let Node::FunctionDecl(f) = tu.arena.get(inst) else {
        panic!("instantiation is not a function");
    };
    let name = tu.interner.resolve(f.name);
    assert!(name.starts_with("id$"), "mangled name is {name}");
    assert_eq!(name.len(), "id$".len() + 16);
    assert!(f.body.is_some(), "instantiated body is substituted");
    assert!(f.ret.is_integral());

    let main = find_function(&tu, "main");
    let ret = return_expr_of(&tu, main);
    let Node::FunctionCall { resolved, .. } = tu.arena.get(ret) else {
        panic!("expected a call node");
    };
    assert_eq!(*resolved, Some(inst));
}

#[test]
fn inline_namespace_members_visible_in_parent() {
    let tu = parse_ok(indoc! {r#"
        namespace a::inline b { int x; }
        int main() { return a::x; }
    "#});

    let main = find_function(&tu, "main");
    let ret = return_expr_of(&tu, main);
    let Node::QualifiedIdentifier { decl, .. } = tu.arena.get(ret) else {
        panic!("expected a qualified identifier");
    };
    let via_parent = decl.expect("a::x resolves");

    // The fully qualified path reaches the same declaration.
    let a = tu.interner.intern("a");
    let b = tu.interner.intern("b");
    let x = tu.interner.intern("x");
    let via_full = tu.symbols.qualified_lookup(&[a, b], x, false);
    assert_eq!(via_full.first().copied(), Some(via_parent));
}

#[test]
fn sizeof_of_member_array_uses_static_constant_bound() {
    let tu = parse_ok(indoc! {r#"
        struct S {
            static constexpr int N = 5;
            int a[N];
        };
        int main() { return sizeof(S::a) / sizeof(int); }
    "#});

    // The array bound resolved to the static constant.
    let s = tu.types.lookup(tu.interner.intern("S")).expect("S exists");
    let info = tu.types.get(s).struct_info.as_ref().expect("struct info");
    let a = info
        .find_member(tu.interner.intern("a"))
        .expect("member a");
    assert_eq!(a.ty.array_dims, vec![Some(5)]);

    let main = find_function(&tu, "main");
    let ret = return_expr_of(&tu, main);
    assert_eq!(eval(&tu, ret).as_i64(), 5);
}

#[test]
fn concept_constrained_template_resolves() {
    let tu = parse_ok(indoc! {r#"
        template<class T> concept Int = __is_integral(T);
        template<Int T> T f(T x) { return x; }
        int main() { return f(7); }
    "#});

    let main = find_function(&tu, "main");
    let ret = return_expr_of(&tu, main);
    let Node::FunctionCall { resolved, .. } = tu.arena.get(ret) else {
        panic!("expected a call node");
    };
    let inst = resolved.expect("constraint satisfied for T=int");
    let Node::FunctionDecl(f) = tu.arena.get(inst) else {
        panic!("resolved target is not a function");
    };
    assert!(tu.interner.resolve(f.name).starts_with("f$"));
}

#[test]
fn generic_lambda_synthesizes_closure_and_instantiates_call_operator() {
    let tu = parse_ok(indoc! {r#"
        auto l = [](auto x) { return x + x; };
        int main() { return l(3); }
    "#});

    // Closure type with a template call operator was synthesized.
    let closure_id = tu
        .types
        .lookup(tu.interner.intern("__lambda_0"))
        .expect("closure type registered");
    let closure = tu.types.get(closure_id);
    let struct_info = closure.struct_info.as_ref().expect("closure struct info");
    // Non-capturing lambda: 1-byte empty closure.
    assert_eq!(struct_info.size_bits, 8);

    let main = find_function(&tu, "main");
    let ret = return_expr_of(&tu, main);
    let Node::MemberFunctionCall {
        member, resolved, ..
    } = tu.arena.get(ret)
    else {
        panic!("call through the closure resolves as a member call");
    };
    assert_eq!(&*tu.interner.resolve(*member), "operator()");
    let op = resolved.expect("operator() instantiated for int");
    let Node::FunctionDecl(f) = tu.arena.get(op) else {
        panic!("resolved target is not a function");
    };
    assert!(f.ret.is_integral(), "deduced return type is int");
    assert!(f.body.is_some());
}

#[test]
fn constexpr_function_call_folds_in_main() {
    let tu = parse_ok(indoc! {r#"
        constexpr int twice(int v) { return v + v; }
        int main() { return twice(21); }
    "#});
    let main = find_function(&tu, "main");
    let ret = return_expr_of(&tu, main);
    assert_eq!(eval(&tu, ret), Value::Int(42));
}
