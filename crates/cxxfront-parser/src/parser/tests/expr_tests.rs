//! Expressions: precedence shapes, literals, casts, folds, lambdas,
//! requires-expressions, recursion bounds.

use indoc::indoc;

use crate::ast::{BinaryOp, Node, UnaryOp};
use crate::consteval::Value;
use crate::diag::ParseErrorKind;

use super::{eval_main_return, find_function, parse_err, parse_ok, return_expr_of};

fn main_return(source: &str) -> (crate::parser::TranslationUnit, crate::ast::NodeId) {
    let tu = parse_ok(source);
    let main = find_function(&tu, "main");
    let expr = return_expr_of(&tu, main);
    (tu, expr)
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let (tu, expr) = main_return(indoc! {r#"
        int main() {
            constexpr int a = 1;
            constexpr int b = 2;
            constexpr int c = 3;
            return a + b * c;
        }
    "#});
    let Node::BinaryOp {
        op: BinaryOp::Add,
        rhs,
        ..
    } = tu.arena.get(expr)
    else {
        panic!("expected + at the root");
    };
    assert!(matches!(
        tu.arena.get(*rhs),
        Node::BinaryOp {
            op: BinaryOp::Mul,
            ..
        }
    ));
    assert_eq!(eval_main_return(&tu).as_i64(), 7);
}

#[test]
fn parentheses_restore_grouping() {
    let (tu, expr) = main_return(indoc! {r#"
        int main() {
            constexpr int a = 1;
            constexpr int b = 2;
            constexpr int c = 3;
            return (a + b) * c;
        }
    "#});
    let Node::BinaryOp {
        op: BinaryOp::Mul,
        lhs,
        ..
    } = tu.arena.get(expr)
    else {
        panic!("expected * at the root");
    };
    assert!(matches!(
        tu.arena.get(*lhs),
        Node::BinaryOp {
            op: BinaryOp::Add,
            ..
        }
    ));
    assert_eq!(eval_main_return(&tu).as_i64(), 9);
}

#[test]
fn shift_binds_looser_than_addition() {
    let (tu, expr) = main_return(indoc! {r#"
        int main() { return 1 << 2 + 3; }
    "#});
    assert!(matches!(
        tu.arena.get(expr),
        Node::BinaryOp {
            op: BinaryOp::Shl,
            ..
        }
    ));
    assert_eq!(eval_main_return(&tu).as_i64(), 32);
}

#[test]
fn spaceship_sits_between_shift_and_relational() {
    let (tu, expr) = main_return(indoc! {r#"
        int main() {
            constexpr int a = 5;
            constexpr int b = 3;
            constexpr int c = 0;
            return a <=> b > c;
        }
    "#});
    // (a <=> b) > c
    let Node::BinaryOp {
        op: BinaryOp::Gt,
        lhs,
        ..
    } = tu.arena.get(expr)
    else {
        panic!("expected > at the root");
    };
    assert!(matches!(
        tu.arena.get(*lhs),
        Node::BinaryOp {
            op: BinaryOp::Spaceship,
            ..
        }
    ));
    assert_eq!(eval_main_return(&tu), Value::Bool(true));
}

#[test]
fn ternary_is_right_associative() {
    let (tu, expr) = main_return(indoc! {r#"
        int main() {
            constexpr bool a = false;
            constexpr bool b = true;
            return a ? 1 : b ? 2 : 3;
        }
    "#});
    let Node::Ternary { else_expr, .. } = tu.arena.get(expr) else {
        panic!("expected a conditional");
    };
    assert!(matches!(tu.arena.get(*else_expr), Node::Ternary { .. }));
    assert_eq!(eval_main_return(&tu).as_i64(), 2);
}

#[test]
fn assignment_is_right_associative() {
    let (tu, expr) = main_return(indoc! {r#"
        int main() {
            int a = 0;
            int b = 0;
            return a = b = 1;
        }
    "#});
    let Node::BinaryOp {
        op: BinaryOp::Assign,
        rhs,
        ..
    } = tu.arena.get(expr)
    else {
        panic!("expected = at the root");
    };
    assert!(matches!(
        tu.arena.get(*rhs),
        Node::BinaryOp {
            op: BinaryOp::Assign,
            ..
        }
    ));
}

#[test]
fn comma_operator_has_lowest_precedence() {
    let (tu, expr) = main_return("int main() { return 1, 2; }\n");
    let Node::BinaryOp {
        op: BinaryOp::Comma,
        ..
    } = tu.arena.get(expr)
    else {
        panic!("expected , at the root");
    };
    assert_eq!(eval_main_return(&tu).as_i64(), 2);
}

#[test]
fn adjacent_string_literals_concatenate() {
    let tu = parse_ok("const char* s = \"ab\" \"cd\";\n");
    let found = tu.arena.iter().find_map(|(_, n)| match n {
        Node::StringLiteral { value } => Some(tu.interner.resolve(*value)),
        _ => None,
    });
    assert_eq!(found.as_deref(), Some("abcd"));
}

#[test]
fn char_literal_escapes() {
    let (tu, expr) = main_return("int main() { return '\\n'; }\n");
    assert!(matches!(tu.arena.get(expr), Node::CharLiteral { value: 10 }));
}

#[test]
fn integer_literal_radixes_and_suffixes() {
    let cases = [
        ("0x1F", 31),
        ("0b101", 5),
        ("017", 15),
        ("1'000'000", 1_000_000),
        ("42u", 42),
        ("7ll", 7),
    ];
    for (lit, expected) in cases {
        let (tu, expr) = main_return(&format!("int main() {{ return {lit}; }}\n"));
        let Node::NumericLiteral { value, .. } = tu.arena.get(expr) else {
            panic!("expected a numeric literal for {lit}");
        };
        let got = match value {
            crate::ast::ConstValue::Int(v) => *v,
            crate::ast::ConstValue::UInt(v) => *v as i64,
            other => panic!("unexpected value {other:?}"),
        };
        assert_eq!(got, expected, "literal {lit}");
    }
}

#[test]
fn c_style_cast_versus_parenthesized_expression() {
    let (tu, expr) = main_return("int main() { return (int)3.5; }\n");
    assert!(matches!(tu.arena.get(expr), Node::Cast { .. }));
    assert_eq!(eval_main_return(&tu).as_i64(), 3);

    // `(x) + 1` must not parse as a cast of `+1`.
    let (tu, expr) = main_return(indoc! {r#"
        int main() {
            constexpr int x = 4;
            return (x) + 1;
        }
    "#});
    assert!(matches!(
        tu.arena.get(expr),
        Node::BinaryOp {
            op: BinaryOp::Add,
            ..
        }
    ));
    assert_eq!(eval_main_return(&tu).as_i64(), 5);
}

#[test]
fn named_casts() {
    let (tu, expr) = main_return("int main() { return static_cast<long>(7); }\n");
    let Node::Cast { kind, target, .. } = tu.arena.get(expr) else {
        panic!("expected a cast");
    };
    assert_eq!(*kind, crate::ast::CastKind::Static);
    assert_eq!(target.base, crate::types::BaseKind::Long);
    assert_eq!(eval_main_return(&tu).as_i64(), 7);
}

#[test]
fn sizeof_builtin_types() {
    let (tu, _) = main_return("int main() { return sizeof(int); }\n");
    assert_eq!(eval_main_return(&tu).as_i64(), 4);
    let (tu, _) = main_return("int main() { return sizeof(long long); }\n");
    assert_eq!(eval_main_return(&tu).as_i64(), 8);
    let (tu, _) = main_return("int main() { return sizeof(char); }\n");
    assert_eq!(eval_main_return(&tu).as_i64(), 1);
}

#[test]
fn unary_operators_fold() {
    let (tu, _) = main_return("int main() { return -(-5); }\n");
    assert_eq!(eval_main_return(&tu).as_i64(), 5);
    let (tu, _) = main_return("int main() { return !0; }\n");
    assert_eq!(eval_main_return(&tu), Value::Bool(true));
    let (tu, _) = main_return("int main() { return ~0; }\n");
    assert_eq!(eval_main_return(&tu).as_i64(), -1);
}

#[test]
fn division_by_zero_is_a_structured_eval_error() {
    let tu = parse_ok("int main() { return 1 / 0; }\n");
    let main = find_function(&tu, "main");
    let expr = return_expr_of(&tu, main);
    let ctx = crate::consteval::EvalContext {
        arena: &tu.arena,
        types: &tu.types,
        symbols: &tu.symbols,
        interner: &tu.interner,
        options: &tu.options,
        struct_context: None,
        template_params: Vec::new(),
    };
    let err = crate::consteval::evaluate(&ctx, expr).expect_err("division by zero");
    assert_eq!(err.kind, crate::consteval::EvalErrorKind::DivideByZero);
}

#[test]
fn nesting_at_the_bound_parses_and_past_it_fails() {
    let deep_ok = format!(
        "int main() {{ return {}1{}; }}\n",
        "(".repeat(255),
        ")".repeat(255)
    );
    let tu = parse_ok(&deep_ok);
    assert_eq!(eval_main_return(&tu).as_i64(), 1);

    let too_deep = format!(
        "int main() {{ return {}1{}; }}\n",
        "(".repeat(257),
        ")".repeat(257)
    );
    let err = parse_err(&too_deep);
    assert_eq!(err.kind, ParseErrorKind::RecursionLimit);
}

#[test]
fn new_and_delete_expressions() {
    let tu = parse_ok(indoc! {r#"
        int main() {
            int* p = new int(5);
            delete p;
            return 0;
        }
    "#});
    let new_node = tu.arena.iter().find(|(_, n)| matches!(n, Node::NewExpression { .. }));
    let (_, Node::NewExpression { ty, args, .. }) = new_node.expect("new expression") else {
        unreachable!();
    };
    assert!(ty.is_integral());
    assert_eq!(args.len(), 1);
    assert!(
        tu.arena
            .iter()
            .any(|(_, n)| matches!(n, Node::DeleteExpression { .. }))
    );
}

#[test]
fn placement_new_keeps_all_placement_arguments() {
    let tu = parse_ok(indoc! {r#"
        int main() {
            void* buf = 0;
            int* p = new (buf, buf) int(1);
            return 0;
        }
    "#});
    let found = tu.arena.iter().find_map(|(_, n)| match n {
        Node::NewExpression { placement, .. } => Some(placement.len()),
        _ => None,
    });
    assert_eq!(found, Some(2));
}

#[test]
fn requires_expression_evaluates_to_bool() {
    let tu = parse_ok(indoc! {r#"
        int main() {
            constexpr bool ok = requires(int x) { x + 1; };
            return ok;
        }
    "#});
    assert_eq!(eval_main_return(&tu), Value::Bool(true));
}

#[test]
fn requires_expression_with_unknown_name_is_unsatisfied() {
    let tu = parse_ok(indoc! {r#"
        int main() {
            constexpr bool ok = requires { no_such_name + 1; };
            return ok;
        }
    "#});
    assert_eq!(eval_main_return(&tu), Value::Bool(false));
}

#[test]
fn lambda_capture_default_expands_to_referenced_outer_variables() {
    let tu = parse_ok(indoc! {r#"
        int main() {
            int a = 1;
            int b = 2;
            int c = 3;
            auto l = [=]() { return a + c; };
            return 0;
        }
    "#});
    let lambda = tu.arena.iter().find_map(|(_, n)| match n {
        Node::Lambda(l) => Some(l.clone()),
        _ => None,
    });
    let lambda = lambda.expect("lambda parsed");
    let names: Vec<String> = lambda
        .captures
        .iter()
        .filter_map(|c| c.name.map(|n| tu.interner.resolve(n).to_string()))
        .collect();
    assert_eq!(names, vec!["a", "c"], "b is not referenced, not captured");

    // Closure carries one member per capture.
    let info = tu
        .types
        .get(lambda.closure_type)
        .struct_info
        .as_ref()
        .expect("closure info");
    assert_eq!(info.members.len(), 2);
}

#[test]
fn by_reference_capture_stores_a_pointer_member() {
    let tu = parse_ok(indoc! {r#"
        int main() {
            int a = 1;
            auto l = [&a]() { return a; };
            return 0;
        }
    "#});
    let lambda = tu.arena.iter().find_map(|(_, n)| match n {
        Node::Lambda(l) => Some(l.clone()),
        _ => None,
    });
    let lambda = lambda.expect("lambda parsed");
    let info = tu
        .types
        .get(lambda.closure_type)
        .struct_info
        .as_ref()
        .expect("closure info");
    assert_eq!(info.members.len(), 1);
    assert!(info.members[0].ty.is_pointer());
}

#[test]
fn postfix_chain_member_access_and_subscript() {
    let tu = parse_ok(indoc! {r#"
        struct Pair { int first; int second; };
        int main() {
            Pair p;
            int xs[4];
            return p.first + xs[2];
        }
    "#});
    let main = find_function(&tu, "main");
    let expr = return_expr_of(&tu, main);
    let Node::BinaryOp { lhs, rhs, .. } = tu.arena.get(expr) else {
        panic!("expected +");
    };
    assert!(matches!(tu.arena.get(*lhs), Node::MemberAccess { .. }));
    assert!(matches!(tu.arena.get(*rhs), Node::ArraySubscript { .. }));
}

#[test]
fn increment_decrement_prefix_and_postfix() {
    let tu = parse_ok(indoc! {r#"
        int main() {
            int i = 0;
            ++i;
            i++;
            return i;
        }
    "#});
    let pre = tu.arena.iter().any(|(_, n)| {
        matches!(
            n,
            Node::UnaryOp {
                op: UnaryOp::PreInc,
                ..
            }
        )
    });
    let post = tu.arena.iter().any(|(_, n)| {
        matches!(
            n,
            Node::UnaryOp {
                op: UnaryOp::PostInc,
                ..
            }
        )
    });
    assert!(pre && post);
}

#[test]
fn type_trait_intrinsics_evaluate() {
    let tu = parse_ok(indoc! {r#"
        static_assert(__is_integral(int), "int is integral");
        static_assert(__is_pointer(char*), "char* is a pointer");
        static_assert(__is_same(int, int), "identity");
    "#});
    assert!(tu.roots.is_empty());
}

#[test]
fn noexcept_operator_yields_bool() {
    let (tu, expr) = main_return("int main() { return noexcept(1 + 1); }\n");
    assert!(matches!(tu.arena.get(expr), Node::NoexceptExpr(_)));
    assert_eq!(eval_main_return(&tu), Value::Bool(true));
}
