//! Templates: instantiation, caching, partial specialization, deduction,
//! lazy members, variable and alias templates, deferred static_asserts.

use indoc::indoc;

use crate::ast::Node;
use crate::diag::ParseErrorKind;

use super::{eval_main_return, find_function, parse_err, parse_ok, return_expr_of};

#[test]
fn class_template_instantiates_once_per_argument_list() {
    let tu = parse_ok(indoc! {r#"
        template<class T> struct Box { T value; };
        Box<int> a;
        Box<int> b;
        Box<double> c;
    "#});
    // Two distinct argument lists, two instantiations; the repeat is a
    // cache hit.
    assert_eq!(tu.instantiations().count(), 2);

    let a = tu.interner.intern("a");
    let b = tu.interner.intern("b");
    let Node::VarDecl(va) = tu.arena.get(tu.symbols.lookup(a)[0]) else {
        panic!("a declared");
    };
    let Node::VarDecl(vb) = tu.arena.get(tu.symbols.lookup(b)[0]) else {
        panic!("b declared");
    };
    assert_eq!(va.ty.type_id, vb.ty.type_id, "cache returns the same record");
}

#[test]
fn instantiated_member_has_the_substituted_type() {
    let tu = parse_ok(indoc! {r#"
        template<class T> struct Box { T value; };
        Box<int> a;
    "#});
    let a = tu.interner.intern("a");
    let Node::VarDecl(v) = tu.arena.get(tu.symbols.lookup(a)[0]) else {
        panic!("a declared");
    };
    let id = v.ty.type_id.expect("instantiated type");
    let info = tu.types.get(id).struct_info.as_ref().expect("struct info");
    let value = info.find_member(tu.interner.intern("value")).expect("value");
    assert!(value.ty.is_integral());
    assert_eq!(info.template_of, Some(tu.interner.intern("Box")));
    // Mangled record name: Box$<16 hex>.
    let name = tu.interner.resolve(tu.types.get(id).name);
    assert!(name.starts_with("Box$") && name.len() == 4 + 16, "{name}");
}

#[test]
fn default_template_arguments_fill_missing_tail() {
    let tu = parse_ok(indoc! {r#"
        template<class T, class U = int> struct Pair { T first; U second; };
        Pair<char> p;
    "#});
    let p = tu.interner.intern("p");
    let Node::VarDecl(v) = tu.arena.get(tu.symbols.lookup(p)[0]) else {
        panic!("p declared");
    };
    let id = v.ty.type_id.expect("instantiated");
    let info = tu.types.get(id).struct_info.as_ref().expect("info");
    let second = info.find_member(tu.interner.intern("second")).expect("second");
    assert_eq!(second.ty.base, crate::types::BaseKind::Int);
}

#[test]
fn partial_specialization_wins_for_matching_pattern() {
    let tu = parse_ok(indoc! {r#"
        template<class T> struct Box { T value; };
        template<class T> struct Box<T*> { T pointee; };
        Box<int> plain;
        Box<int*> special;
    "#});
    let plain = tu.interner.intern("plain");
    let special = tu.interner.intern("special");
    let Node::VarDecl(vp) = tu.arena.get(tu.symbols.lookup(plain)[0]) else {
        panic!("plain declared");
    };
    let Node::VarDecl(vs) = tu.arena.get(tu.symbols.lookup(special)[0]) else {
        panic!("special declared");
    };

    let plain_info = tu
        .types
        .get(vp.ty.type_id.expect("plain type"))
        .struct_info
        .as_ref()
        .expect("info");
    assert!(plain_info.find_member(tu.interner.intern("value")).is_some());

    let special_info = tu
        .types
        .get(vs.ty.type_id.expect("special type"))
        .struct_info
        .as_ref()
        .expect("info");
    let pointee = special_info
        .find_member(tu.interner.intern("pointee"))
        .expect("specialization body used");
    assert!(pointee.ty.is_integral(), "T bound to int through T*");
}

#[test]
fn member_bodies_are_lazy_until_first_call() {
    let tu = parse_ok(indoc! {r#"
        template<class T> struct Holder {
            T value;
            T get() { return value; }
        };
        Holder<int> untouched;
        int main() {
            Holder<int> h;
            return h.get();
        }
    "#});
    // One class instantiation; get() was substituted on first call.
    let mangled = tu
        .templates
        .instance_args
        .keys()
        .next()
        .copied()
        .expect("one instance");
    let get = tu.interner.intern("get");
    assert!(
        !tu.lazy.needs_instantiation(mangled, get),
        "member marked instantiated after the call"
    );

    let main = find_function(&tu, "main");
    let ret = return_expr_of(&tu, main);
    let Node::MemberFunctionCall { resolved, .. } = tu.arena.get(ret) else {
        panic!("expected a member call");
    };
    let Node::FunctionDecl(f) = tu.arena.get(resolved.expect("resolved")) else {
        unreachable!();
    };
    assert!(f.body.is_some(), "body substituted for the instantiation");
    assert!(f.ret.is_integral());
}

#[test]
fn sizeof_triggers_layout_of_an_instantiated_class() {
    let tu = parse_ok(indoc! {r#"
        template<class T> struct Wrap { T a; T b; };
        int main() { return sizeof(Wrap<int>); }
    "#});
    assert_eq!(eval_main_return(&tu).as_i64(), 8);
}

#[test]
fn function_template_explicit_arguments() {
    let tu = parse_ok(indoc! {r#"
        template<class T> T pick(T a, T b) { return b; }
        int main() { return pick<int>(1, 2); }
    "#});
    let main = find_function(&tu, "main");
    let ret = return_expr_of(&tu, main);
    let Node::FunctionCall { resolved, .. } = tu.arena.get(ret) else {
        panic!("expected a call");
    };
    let Node::FunctionDecl(f) = tu.arena.get(resolved.expect("resolved")) else {
        unreachable!();
    };
    assert!(tu.interner.resolve(f.name).starts_with("pick$"));
}

#[test]
fn non_template_exact_match_beats_template() {
    let tu = parse_ok(indoc! {r#"
        int over(int x);
        template<class T> T over(T x) { return x; }
        int main() { return over(5); }
    "#});
    assert_eq!(tu.instantiations().count(), 0, "no deduction needed");
    let main = find_function(&tu, "main");
    let ret = return_expr_of(&tu, main);
    let Node::FunctionCall { resolved, .. } = tu.arena.get(ret) else {
        panic!("expected a call");
    };
    let over = find_function(&tu, "over");
    assert_eq!(*resolved, Some(over));
}

#[test]
fn template_wins_when_it_matches_better() {
    let tu = parse_ok(indoc! {r#"
        int over(int x);
        template<class T> T over(T x) { return x; }
        int main() {
            double d = 1.5;
            return over(d);
        }
    "#});
    let main = find_function(&tu, "main");
    let ret = return_expr_of(&tu, main);
    let Node::FunctionCall { resolved, .. } = tu.arena.get(ret) else {
        panic!("expected a call");
    };
    let Node::FunctionDecl(f) = tu.arena.get(resolved.expect("resolved")) else {
        unreachable!();
    };
    assert!(tu.interner.resolve(f.name).starts_with("over$"));
}

#[test]
fn forwarding_reference_deduces_lvalue_reference() {
    let tu = parse_ok(indoc! {r#"
        template<class T> int accept(T&& value) { return 0; }
        int main() {
            int x = 1;
            return accept(x);
        }
    "#});
    let inst = tu.instantiations().next().expect("one instantiation");
    let Node::FunctionDecl(f) = tu.arena.get(inst) else {
        unreachable!();
    };
    // T = int&, so the parameter collapses to int&.
    assert_eq!(f.params[0].ty.ref_kind, crate::types::RefKind::LValue);
}

#[test]
fn parameter_pack_collects_trailing_arguments() {
    let tu = parse_ok(indoc! {r#"
        template<class... Args> int count(Args... args) { return sizeof...(args); }
        int main() { return count(1, 2); }
    "#});
    let inst = tu.instantiations().next().expect("one instantiation");
    let Node::FunctionDecl(f) = tu.arena.get(inst) else {
        unreachable!();
    };
    assert_eq!(f.params.len(), 2, "pack expanded to two parameters");
    // sizeof...(args) substituted to the literal element count.
    let body = f.body.expect("body");
    let Node::Block { stmts } = tu.arena.get(body) else {
        panic!("block");
    };
    let Node::Return(Some(expr)) = tu.arena.get(stmts[0]) else {
        panic!("return");
    };
    let Node::NumericLiteral { value, .. } = tu.arena.get(*expr) else {
        panic!("literal after substitution");
    };
    assert_eq!(
        match value {
            crate::ast::ConstValue::UInt(v) => *v,
            crate::ast::ConstValue::Int(v) => *v as u64,
            other => panic!("unexpected {other:?}"),
        },
        2
    );
}

#[test]
fn fold_expression_expands_over_pack_elements() {
    let tu = parse_ok(indoc! {r#"
        template<class... Args> int sum(Args... args) { return (args + ... + 0); }
        int main() { return sum(1, 2, 3); }
    "#});
    let inst = tu.instantiations().next().expect("one instantiation");
    let Node::FunctionDecl(f) = tu.arena.get(inst) else {
        unreachable!();
    };
    let body = f.body.expect("body");
    let Node::Block { stmts } = tu.arena.get(body) else {
        panic!("block");
    };
    let Node::Return(Some(expr)) = tu.arena.get(stmts[0]) else {
        panic!("return");
    };
    // The fold became a chain of additions.
    assert!(matches!(
        tu.arena.get(*expr),
        Node::BinaryOp {
            op: crate::ast::BinaryOp::Add,
            ..
        }
    ));
}

#[test]
fn variable_template_instantiation() {
    let tu = parse_ok(indoc! {r#"
        template<class T> constexpr T zero = 0;
        int main() { return zero<int>; }
    "#});
    assert_eq!(eval_main_return(&tu).as_i64(), 0);
}

#[test]
fn alias_template_substitutes_the_aliased_type() {
    let tu = parse_ok(indoc! {r#"
        template<class T> using Ptr = T*;
        Ptr<int> p;
    "#});
    let p = tu.interner.intern("p");
    let Node::VarDecl(v) = tu.arena.get(tu.symbols.lookup(p)[0]) else {
        panic!("p declared");
    };
    assert_eq!(v.ty.ptr.len(), 1);
    assert_eq!(v.ty.base, crate::types::BaseKind::Int);
}

#[test]
fn deferred_static_assert_fires_at_instantiation() {
    let err = parse_err(indoc! {r#"
        template<class T> struct Bad {
            static_assert(__is_void(T), "must be void");
        };
        Bad<int> b;
    "#});
    assert!(err.message.contains("must be void"));
}

#[test]
fn deferred_static_assert_passes_for_good_arguments() {
    let tu = parse_ok(indoc! {r#"
        template<class T> struct Checked {
            static_assert(sizeof(T) > 0, "never zero");
        };
        Checked<int> c;
    "#});
    assert_eq!(tu.instantiations().count(), 1);
}

#[test]
fn concept_failure_removes_the_candidate() {
    let err = parse_err(indoc! {r#"
        template<class T> concept Int = __is_integral(T);
        template<Int T> T f(T x) { return x; }
        int main() {
            double d = 1.0;
            return f(d);
        }
    "#});
    // No overload survives the constraint.
    assert_eq!(err.kind, ParseErrorKind::MissingIdentifier);
}

#[test]
fn nested_template_arguments_split_the_shr_token() {
    let tu = parse_ok(indoc! {r#"
        template<class T> struct Outer { T inner; };
        Outer<Outer<int>> nested;
    "#});
    let nested = tu.interner.intern("nested");
    let Node::VarDecl(v) = tu.arena.get(tu.symbols.lookup(nested)[0]) else {
        panic!("nested declared");
    };
    let outer_id = v.ty.type_id.expect("outer instantiated");
    let info = tu.types.get(outer_id).struct_info.as_ref().expect("info");
    let inner = info.find_member(tu.interner.intern("inner")).expect("inner");
    assert_eq!(inner.ty.base, crate::types::BaseKind::Struct);
}

#[test]
fn class_template_with_non_type_parameter() {
    let tu = parse_ok(indoc! {r#"
        template<int N> struct Arr { int data[N]; };
        int main() { return sizeof(Arr<6>); }
    "#});
    assert_eq!(eval_main_return(&tu).as_i64(), 24);
}
