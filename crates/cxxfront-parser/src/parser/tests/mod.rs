//! Parser-level tests: grammar, semantics, and the end-to-end scenarios.

mod class_tests;
mod decl_tests;
mod dump_tests;
mod expr_tests;
mod seed_tests;
mod template_tests;

use cxxfront_core::SharedInterner;

use crate::ast::{Node, NodeId};
use crate::consteval::{self, EvalContext, Value};
use crate::diag::ParseError;
use crate::parser::TranslationUnit;
use crate::{CompileOptions, parse_source};

/// Parse or panic with the rendered error; the default harness entry for
/// tests that expect success.
pub(crate) fn parse_ok(source: &str) -> TranslationUnit {
    let interner = SharedInterner::new();
    match parse_source(source, &interner, CompileOptions::default()) {
        Ok(tu) => tu,
        Err(err) => panic!("parse failed: {err}\nsource:\n{source}"),
    }
}

pub(crate) fn parse_err(source: &str) -> ParseError {
    let interner = SharedInterner::new();
    match parse_source(source, &interner, CompileOptions::default()) {
        Ok(_) => panic!("expected a parse error\nsource:\n{source}"),
        Err(crate::Error::Parse(err)) => err,
        Err(crate::Error::Lex(err)) => panic!("unexpected lex error: {err}"),
    }
}

/// The FunctionDecl node named `name`, searched across the whole arena.
pub(crate) fn find_function(tu: &TranslationUnit, name: &str) -> NodeId {
    let sym = tu.interner.intern(name);
    for (id, node) in tu.arena.iter() {
        if let Node::FunctionDecl(f) = node
            && f.name == sym
        {
            return id;
        }
    }
    panic!("no function named '{name}'");
}

/// Expression of the last `return` in a function's body.
pub(crate) fn return_expr_of(tu: &TranslationUnit, func: NodeId) -> NodeId {
    let Node::FunctionDecl(f) = tu.arena.get(func) else {
        panic!("not a function");
    };
    let body = f.body.expect("function has a body");
    let Node::Block { stmts } = tu.arena.get(body) else {
        panic!("body is not a block");
    };
    for &stmt in stmts.iter().rev() {
        if let Node::Return(Some(expr)) = tu.arena.get(stmt) {
            return *expr;
        }
    }
    panic!("no return statement");
}

/// Constant-evaluate an expression against the finished translation unit.
pub(crate) fn eval(tu: &TranslationUnit, expr: NodeId) -> Value {
    let ctx = EvalContext {
        arena: &tu.arena,
        types: &tu.types,
        symbols: &tu.symbols,
        interner: &tu.interner,
        options: &tu.options,
        struct_context: None,
        template_params: Vec::new(),
    };
    consteval::evaluate(&ctx, expr).expect("constant evaluation")
}

pub(crate) fn eval_main_return(tu: &TranslationUnit) -> Value {
    let main = find_function(tu, "main");
    let expr = return_expr_of(tu, main);
    eval(tu, expr)
}
