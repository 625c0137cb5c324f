//! Classes: layout, bases, delayed member bodies, access, special
//! members.

use indoc::indoc;

use crate::ast::{Node, NodeId};
use crate::diag::ParseErrorKind;
use crate::parser::TranslationUnit;
use crate::types::TypeId;

use super::{find_function, parse_err, parse_ok};

fn type_of(tu: &TranslationUnit, name: &str) -> TypeId {
    tu.types
        .lookup(tu.interner.intern(name))
        .unwrap_or_else(|| panic!("type '{name}' not registered"))
}

#[test]
fn member_offsets_and_padding() {
    let tu = parse_ok("struct S { char c; int i; char d; };\n");
    let id = type_of(&tu, "S");
    let info = tu.types.get(id).struct_info.as_ref().expect("struct info");
    let c = info.find_member(tu.interner.intern("c")).expect("c");
    let i = info.find_member(tu.interner.intern("i")).expect("i");
    let d = info.find_member(tu.interner.intern("d")).expect("d");
    assert_eq!(c.offset_bits, 0);
    assert_eq!(i.offset_bits, 32, "int aligns to 4 bytes");
    assert_eq!(d.offset_bits, 64);
    assert_eq!(tu.types.get(id).size_bits, 96, "size rounds up to alignment");
    assert_eq!(tu.types.get(id).align_bits, 32);
}

#[test]
fn empty_class_has_size_one() {
    let tu = parse_ok("struct Empty {};\n");
    let id = type_of(&tu, "Empty");
    assert_eq!(tu.types.get(id).size_bits, 8);
}

#[test]
fn empty_base_occupies_no_storage() {
    let tu = parse_ok(indoc! {r#"
        struct Empty {};
        struct D : Empty { int x; };
    "#});
    let id = type_of(&tu, "D");
    let info = tu.types.get(id).struct_info.as_ref().expect("struct info");
    let x = info.find_member(tu.interner.intern("x")).expect("x");
    assert_eq!(x.offset_bits, 0, "empty base optimized away");
    assert_eq!(tu.types.get(id).size_bits, 32);
}

#[test]
fn virtual_member_adds_a_vtable_slot() {
    let tu = parse_ok("struct V { virtual void f(); int x; };\n");
    let id = type_of(&tu, "V");
    let info = tu.types.get(id).struct_info.as_ref().expect("struct info");
    assert!(info.has_vtable);
    let x = info.find_member(tu.interner.intern("x")).expect("x");
    assert_eq!(x.offset_bits, 64, "member sits after the vptr");
}

#[test]
fn vtable_presence_is_inherited() {
    let tu = parse_ok(indoc! {r#"
        struct Base { virtual void f(); };
        struct Derived : Base { void f() override; };
    "#});
    let id = type_of(&tu, "Derived");
    let info = tu.types.get(id).struct_info.as_ref().expect("struct info");
    assert!(info.has_vtable);
}

#[test]
fn bit_fields_share_a_storage_unit() {
    let tu = parse_ok("struct B { unsigned a : 3; unsigned b : 5; };\n");
    let id = type_of(&tu, "B");
    let info = tu.types.get(id).struct_info.as_ref().expect("struct info");
    let a = info.find_member(tu.interner.intern("a")).expect("a");
    let b = info.find_member(tu.interner.intern("b")).expect("b");
    assert_eq!(a.offset_bits, 0);
    assert_eq!(b.offset_bits, 3, "packed into the same unit");
    assert_eq!(tu.types.get(id).size_bits, 32);
}

#[test]
fn union_members_overlap() {
    let tu = parse_ok("union U { int i; char c[8]; };\n");
    let id = type_of(&tu, "U");
    let info = tu.types.get(id).struct_info.as_ref().expect("struct info");
    assert!(info.is_union);
    for member in &info.members {
        assert_eq!(member.offset_bits, 0);
    }
    assert_eq!(tu.types.get(id).size_bits, 64);
}

#[test]
fn member_body_sees_members_declared_later() {
    let tu = parse_ok(indoc! {r#"
        struct M {
            int get() { return v; }
            int v = 7;
        };
    "#});
    let get = find_function(&tu, "get");
    let Node::FunctionDecl(f) = tu.arena.get(get) else {
        unreachable!();
    };
    let body = f.body.expect("deferred body was parsed");
    let Node::Block { stmts } = tu.arena.get(body) else {
        panic!("body is a block");
    };
    let Node::Return(Some(expr)) = tu.arena.get(stmts[0]) else {
        panic!("return statement");
    };
    // `v` resolved through the implicit this.
    assert!(matches!(tu.arena.get(*expr), Node::MemberAccess { .. }));
}

#[test]
fn trailing_declarators_after_class_body() {
    let tu = parse_ok("struct Pt { int x; int y; } origin, *ptr;\n");
    let origin = tu.interner.intern("origin");
    let ptr = tu.interner.intern("ptr");
    let Node::VarDecl(o) = tu.arena.get(tu.symbols.lookup(origin)[0]) else {
        panic!("origin declared");
    };
    assert!(o.ty.ptr.is_empty());
    let Node::VarDecl(p) = tu.arena.get(tu.symbols.lookup(ptr)[0]) else {
        panic!("ptr declared");
    };
    assert_eq!(p.ty.ptr.len(), 1);
    // The struct node comes first, then the pending variables.
    assert!(matches!(tu.arena.get(tu.roots[0]), Node::StructDecl(_)));
    assert_eq!(tu.roots.len(), 3);
}

#[test]
fn inheriting_from_a_final_class_is_an_error() {
    let err = parse_err(indoc! {r#"
        struct F final {};
        struct G : F {};
    "#});
    assert_eq!(err.kind, ParseErrorKind::InheritFromFinal);
}

#[test]
fn constructor_initializer_list_is_recorded() {
    let tu = parse_ok(indoc! {r#"
        struct C {
            int a;
            C(int x) : a(x) { }
        };
    "#});
    let ctor = find_function(&tu, "C");
    let Node::FunctionDecl(f) = tu.arena.get(ctor) else {
        unreachable!();
    };
    assert!(f.flags.is_constructor);
    assert_eq!(f.ctor_inits.len(), 1);
    assert_eq!(&*tu.interner.resolve(f.ctor_inits[0].0), "a");
    assert!(f.body.is_some());
}

#[test]
fn virtual_destructor() {
    let tu = parse_ok("struct V { virtual ~V() {} };\n");
    let dtor = find_function(&tu, "~V");
    let Node::FunctionDecl(f) = tu.arena.get(dtor) else {
        unreachable!();
    };
    assert!(f.flags.is_destructor);
    assert!(f.flags.is_virtual);
    let id = type_of(&tu, "V");
    assert!(tu.types.get(id).struct_info.as_ref().expect("info").has_vtable);
}

#[test]
fn conversion_operator_is_a_member_function() {
    let tu = parse_ok("struct B { operator bool() const { return true; } };\n");
    let id = type_of(&tu, "B");
    let info = tu.types.get(id).struct_info.as_ref().expect("info");
    assert_eq!(info.member_functions.len(), 1);
    let Node::FunctionDecl(f) = tu.arena.get(info.member_functions[0]) else {
        unreachable!();
    };
    assert!(f.flags.is_conversion);
    assert!(f.cv.is_const);
}

#[test]
fn access_specifiers_are_tracked_per_member() {
    let tu = parse_ok(indoc! {r#"
        class A {
            int secret;
        public:
            int open;
        };
    "#});
    let id = type_of(&tu, "A");
    let info = tu.types.get(id).struct_info.as_ref().expect("info");
    let secret = info.find_member(tu.interner.intern("secret")).expect("secret");
    let open = info.find_member(tu.interner.intern("open")).expect("open");
    assert_eq!(secret.access, crate::types::Access::Private);
    assert_eq!(open.access, crate::types::Access::Public);
}

#[test]
fn nested_class_is_reachable_by_qualified_name() {
    let tu = parse_ok(indoc! {r#"
        struct Outer {
            struct Inner { int v; };
        };
        Outer::Inner obj;
    "#});
    assert!(tu.types.lookup(tu.interner.intern("Outer::Inner")).is_some());
    let obj = tu.interner.intern("obj");
    let Node::VarDecl(v) = tu.arena.get(tu.symbols.lookup(obj)[0]) else {
        panic!("obj declared");
    };
    assert_eq!(v.ty.base, crate::types::BaseKind::Struct);
}

#[test]
fn static_member_is_a_usable_constant() {
    let tu = parse_ok(indoc! {r#"
        struct K { static constexpr int N = 12; };
        int main() { return K::N; }
    "#});
    assert_eq!(super::eval_main_return(&tu).as_i64(), 12);
}

#[test]
fn default_member_initializers_are_recorded() {
    let tu = parse_ok("struct D { int a = 4; int b{9}; };\n");
    let id = type_of(&tu, "D");
    let info = tu.types.get(id).struct_info.as_ref().expect("info");
    assert!(info.find_member(tu.interner.intern("a")).expect("a").default_init.is_some());
    assert!(info.find_member(tu.interner.intern("b")).expect("b").default_init.is_some());
}

#[test]
fn object_constness_selects_between_cv_qualified_overloads() {
    let tu = parse_ok(indoc! {r#"
        struct S {
            int f() const { return 1; }
            int f() { return 2; }
        };
        int main() {
            S s;
            const S cs;
            return s.f() + cs.f();
        }
    "#});
    let main = find_function(&tu, "main");
    let ret = super::return_expr_of(&tu, main);
    let Node::BinaryOp { lhs, rhs, .. } = tu.arena.get(ret) else {
        panic!("expected +");
    };
    let Node::MemberFunctionCall {
        resolved: Some(on_mutable),
        ..
    } = tu.arena.get(*lhs)
    else {
        panic!("s.f() resolves");
    };
    let Node::MemberFunctionCall {
        resolved: Some(on_const),
        ..
    } = tu.arena.get(*rhs)
    else {
        panic!("cs.f() resolves");
    };

    let Node::FunctionDecl(mutable_f) = tu.arena.get(*on_mutable) else {
        unreachable!();
    };
    let Node::FunctionDecl(const_f) = tu.arena.get(*on_const) else {
        unreachable!();
    };
    assert!(
        !mutable_f.cv.is_const,
        "non-const object picks the non-const overload, not an ambiguity"
    );
    assert!(const_f.cv.is_const, "const object picks the const overload");
}

#[test]
fn ref_qualified_member_requires_a_matching_value_category() {
    let tu = parse_ok(indoc! {r#"
        struct R {
            int g() & { return 1; }
        };
        int main() {
            R r;
            return r.g();
        }
    "#});
    let main = find_function(&tu, "main");
    let ret = super::return_expr_of(&tu, main);
    let Node::MemberFunctionCall { resolved, .. } = tu.arena.get(ret) else {
        panic!("expected a member call");
    };
    assert!(resolved.is_some(), "lvalue object binds the &-qualified member");

    let err = parse_err(indoc! {r#"
        struct R {
            int g() & { return 1; }
        };
        int main() {
            return R().g();
        }
    "#});
    assert_eq!(err.kind, ParseErrorKind::MissingIdentifier);
}

#[test]
fn member_function_calls_another_member() {
    let tu = parse_ok(indoc! {r#"
        struct Chain {
            int base() { return 2; }
            int twice() { return base() + base(); }
        };
    "#});
    let twice = find_function(&tu, "twice");
    let Node::FunctionDecl(f) = tu.arena.get(twice) else {
        unreachable!();
    };
    let body = f.body.expect("body parsed");
    let mut found: Vec<NodeId> = Vec::new();
    let mut stack = vec![body];
    while let Some(n) = stack.pop() {
        if let Node::FunctionCall { resolved, .. } = tu.arena.get(n) {
            found.push(resolved.expect("call to base resolves"));
        }
        // Reuse the arena walker through a throwaway collection pass.
        match tu.arena.get(n) {
            Node::Block { stmts } => stack.extend(stmts.iter().copied()),
            Node::Return(Some(e)) => stack.push(*e),
            Node::BinaryOp { lhs, rhs, .. } => {
                stack.push(*lhs);
                stack.push(*rhs);
            }
            Node::FunctionCall { args, .. } => stack.extend(args.iter().copied()),
            _ => {}
        }
    }
    let base = find_function(&tu, "base");
    assert_eq!(found, vec![base, base]);
}

#[test]
fn forward_declaration_then_definition_reuse_one_type_id() {
    let tu = parse_ok(indoc! {r#"
        struct Fwd;
        struct Fwd { int x; };
        Fwd* p;
    "#});
    let id = type_of(&tu, "Fwd");
    let info = tu.types.get(id).struct_info.as_ref().expect("info");
    assert!(info.complete);
    assert_eq!(info.members.len(), 1);
}
