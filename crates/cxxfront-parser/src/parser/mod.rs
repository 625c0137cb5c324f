//! The recursive-descent parser.
//!
//! # Architecture
//!
//! Parsing and semantic analysis are one pass: name lookup, type binding,
//! template instantiation, constant evaluation, and overload resolution
//! run as semantic actions inside the grammar productions, because C++
//! cannot be parsed without knowing which names are types.
//!
//! Grammar productions live in the submodules as `impl Parser` blocks:
//! declarations in [`decl`], classes in [`class`], functions in [`func`],
//! statements in [`stmt`], expressions in [`expr`], lambdas in [`lambda`],
//! type-specifiers in [`tyspec`], template heads in [`tmpl`]. The template
//! engine (instantiation, deduction, substitution) extends the same type
//! from `crate::templates`.
//!
//! Every production returns [`ParseResult`]; errors carry the offending
//! token and propagate. Backtracking is explicit through
//! [`Parser::speculate`], which saves the cursor, runs a closure, and
//! restores on failure — the Rust shape of a scoped token position.

mod class;
mod decl;
mod expr;
mod func;
mod lambda;
mod stmt;
mod tmpl;
mod tyspec;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use cxxfront_core::{SharedInterner, Symbol};

use crate::ast::{Arena, Linkage, Node, NodeId, TemplateParam};
use crate::config::CompileOptions;
use crate::cursor::TokenCursor;
use crate::delayed::DelayedBodyQueue;
use crate::diag::{ParseError, ParseErrorKind, ParseResult, Warning};
use crate::symbols::{ScopeKind, SymbolTable};
use crate::templates::TemplateRegistry;
use crate::templates::lazy::LazyInstantiationRegistry;
use crate::token::{Token, TokenKind};
use crate::types::{TypeId, TypeRegistry};

/// Hard bound on expression nesting; exceeding it is a structured error,
/// not a stack overflow.
pub(crate) const MAX_EXPR_DEPTH: u32 = 256;

/// Context the expression parser threads through nested parses; drives
/// `<` / `>` disambiguation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExprContext {
    #[default]
    Normal,
    TemplateArgument,
    Decltype,
    RequiresClause,
}

/// `#pragma pack` stack: current override plus pushed entries.
#[derive(Debug, Clone, Default)]
pub(crate) struct PackState {
    current: Option<u32>,
    stack: Vec<Option<u32>>,
}

impl PackState {
    pub fn push(&mut self, value: Option<u32>) {
        self.stack.push(self.current);
        if value.is_some() {
            self.current = value;
        }
    }

    pub fn pop(&mut self) {
        self.current = self.stack.pop().flatten();
    }

    pub fn set(&mut self, value: Option<u32>) {
        self.current = value;
    }

    pub fn effective(&self, default_pack: u32) -> u32 {
        self.current.unwrap_or(default_pack)
    }
}

/// Lexemes the grammar matches contextually (not reserved words), interned
/// once at parser construction.
#[derive(Debug, Clone)]
pub(crate) struct KnownSyms {
    pub final_: Symbol,
    pub override_: Symbol,
    pub pragma: Symbol,
    pub pack: Symbol,
    pub push: Symbol,
    pub pop: Symbol,
}

impl KnownSyms {
    fn new(interner: &SharedInterner) -> Self {
        Self {
            final_: interner.intern("final"),
            override_: interner.intern("override"),
            pragma: interner.intern("pragma"),
            pack: interner.intern("pack"),
            push: interner.intern("push"),
            pop: interner.intern("pop"),
        }
    }
}

/// Per-class parse state; one entry per nesting level of class bodies.
#[derive(Debug, Clone)]
pub(crate) struct StructContext {
    pub name: Symbol,
    pub qualified_name: Symbol,
    pub type_id: TypeId,
}

/// Everything the parse produced, handed to the code generator.
#[derive(Debug)]
pub struct TranslationUnit {
    pub arena: Arena,
    pub types: TypeRegistry,
    pub symbols: SymbolTable,
    pub templates: TemplateRegistry,
    pub lazy: LazyInstantiationRegistry,
    /// Top-level declarations in source order.
    pub roots: Vec<NodeId>,
    pub warnings: Vec<Warning>,
    pub interner: SharedInterner,
    pub options: CompileOptions,
}

impl TranslationUnit {
    /// All template instantiations produced during parsing, in the order
    /// first required.
    pub fn instantiations(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.templates.instantiations().iter().copied()
    }
}

pub struct Parser {
    pub(crate) cursor: TokenCursor,
    pub(crate) arena: Arena,
    pub(crate) types: TypeRegistry,
    pub(crate) symbols: SymbolTable,
    pub(crate) templates: TemplateRegistry,
    pub(crate) lazy: LazyInstantiationRegistry,
    pub(crate) delayed: DelayedBodyQueue,
    pub(crate) interner: SharedInterner,
    pub(crate) options: CompileOptions,
    pub(crate) known: KnownSyms,

    pub(crate) roots: Vec<NodeId>,
    pub(crate) warnings: Vec<Warning>,

    // State machines
    pub(crate) linkage: Linkage,
    pub(crate) pack: PackState,
    pub(crate) expr_context: Vec<ExprContext>,
    pub(crate) template_params: Vec<Vec<TemplateParam>>,
    pub(crate) parsing_template_body: bool,
    pub(crate) sfinae_depth: u32,
    pub(crate) expr_depth: u32,
    pub(crate) struct_stack: Vec<StructContext>,
    pub(crate) pending_inline_namespace: bool,
    /// `struct S { .. } s, *ps;` declarators, emitted after the struct node.
    pub(crate) pending_struct_variables: Vec<NodeId>,
    pub(crate) lambda_counter: u32,
    pub(crate) instantiation_depth: u32,
    /// A `>>` token whose first `>` closed an inner template argument
    /// list; the second `>` is still pending.
    pub(crate) pending_gt: bool,
    /// Active anonymous-namespace bodies, innermost last. Members declared
    /// inside one get the id folded into their linkage name.
    pub(crate) anon_namespace_ids: Vec<u32>,
    /// Per-translation-unit counter backing `anon_namespace_ids`.
    pub(crate) anon_namespace_counter: u32,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, interner: SharedInterner, options: CompileOptions) -> Self {
        let known = KnownSyms::new(&interner);
        let cursor = TokenCursor::new(tokens, &interner);
        Self {
            cursor,
            arena: Arena::new(),
            types: TypeRegistry::new(),
            symbols: SymbolTable::new(),
            templates: TemplateRegistry::default(),
            lazy: LazyInstantiationRegistry::default(),
            delayed: DelayedBodyQueue::default(),
            interner,
            options,
            known,
            roots: Vec::new(),
            warnings: Vec::new(),
            linkage: Linkage::None,
            pack: PackState::default(),
            expr_context: Vec::new(),
            template_params: Vec::new(),
            parsing_template_body: false,
            sfinae_depth: 0,
            expr_depth: 0,
            struct_stack: Vec::new(),
            pending_inline_namespace: false,
            pending_struct_variables: Vec::new(),
            lambda_counter: 0,
            instantiation_depth: 0,
            pending_gt: false,
            anon_namespace_ids: Vec::new(),
            anon_namespace_counter: 0,
        }
    }

    /// Parse the whole token stream. The first top-level error aborts the
    /// translation unit; partial state is discarded with the parser.
    pub fn parse(mut self) -> Result<TranslationUnit, ParseError> {
        while !self.cursor.is_eof() {
            self.parse_top_level_node()?;
        }
        debug_assert_eq!(self.cursor.outstanding_saves(), 0);
        let (enters, exits) = self.symbols.scope_counts();
        debug_assert_eq!(enters, exits, "scope enter/exit imbalance");
        Ok(TranslationUnit {
            arena: self.arena,
            types: self.types,
            symbols: self.symbols,
            templates: self.templates,
            lazy: self.lazy,
            roots: self.roots,
            warnings: self.warnings,
            interner: self.interner,
            options: self.options,
        })
    }

    // ------------------------------------------------------------------
    // Cursor helpers

    #[inline]
    pub(crate) fn peek(&self) -> TokenKind {
        self.cursor.peek(0)
    }

    #[inline]
    pub(crate) fn peek_at(&self, offset: usize) -> TokenKind {
        self.cursor.peek(offset)
    }

    #[inline]
    pub(crate) fn peek_info(&self) -> Token {
        self.cursor.peek_info(0)
    }

    #[inline]
    pub(crate) fn advance(&mut self) -> Token {
        self.cursor.advance()
    }

    #[inline]
    pub(crate) fn consume(&mut self, kind: TokenKind) -> bool {
        self.cursor.consume(kind)
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, what: &str) -> ParseResult<Token> {
        if self.cursor.at(kind) {
            Ok(self.cursor.advance())
        } else {
            Err(self.err_here(ParseErrorKind::UnexpectedToken, format!("expected {what}")))
        }
    }

    pub(crate) fn at_contextual(&self, sym: Symbol) -> bool {
        self.cursor.at_ident(sym)
    }

    pub(crate) fn consume_contextual(&mut self, sym: Symbol) -> bool {
        if self.cursor.at_ident(sym) {
            self.cursor.advance();
            true
        } else {
            false
        }
    }

    // ------------------------------------------------------------------
    // Interning helpers

    #[inline]
    pub(crate) fn intern(&self, s: &str) -> Symbol {
        self.interner.intern(s)
    }

    #[inline]
    pub(crate) fn resolve(&self, sym: Symbol) -> Arc<str> {
        self.interner.resolve(sym)
    }

    pub(crate) fn lexeme(&self, token: &Token) -> Arc<str> {
        self.interner.resolve(token.lexeme)
    }

    // ------------------------------------------------------------------
    // Errors

    pub(crate) fn err_here(&self, kind: ParseErrorKind, message: impl Into<String>) -> ParseError {
        ParseError::new(kind, message, self.peek_info())
    }

    pub(crate) fn err_at(
        &self,
        kind: ParseErrorKind,
        message: impl Into<String>,
        token: Token,
    ) -> ParseError {
        ParseError::new(kind, message, token)
    }

    pub(crate) fn warn(&mut self, kind: ParseErrorKind, message: impl Into<String>, token: Token) {
        self.warnings.push(Warning {
            kind,
            message: message.into(),
            token,
        });
    }

    // ------------------------------------------------------------------
    // Backtracking and scope discipline

    /// Save the cursor, run `f`; restore the cursor iff `f` fails. The
    /// scoped-token-position pattern: success commits, failure rewinds.
    pub(crate) fn speculate<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let save = self.cursor.save_position();
        let saved_pending_gt = self.pending_gt;
        match f(self) {
            Ok(value) => {
                self.cursor.discard_position(save);
                Ok(value)
            }
            Err(err) => {
                self.cursor.restore_position(save);
                self.pending_gt = saved_pending_gt;
                Err(err)
            }
        }
    }

    /// Speculative parse whose failure is an expected outcome; the error is
    /// consumed and the cursor rewound. On success the consumed tokens
    /// stay consumed.
    pub(crate) fn try_speculate<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> Option<T> {
        self.speculate(f).ok()
    }

    /// Pure lookahead: run `f`, then rewind regardless of the outcome.
    pub(crate) fn lookahead<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> Option<T> {
        let save = self.cursor.save_position();
        let saved_pending_gt = self.pending_gt;
        let result = f(self).ok();
        self.cursor.restore_position(save);
        self.pending_gt = saved_pending_gt;
        result
    }

    /// Enter a scope, run `f`, exit the scope on both the success and the
    /// error path. This is the only way grammar code enters scopes, which
    /// keeps enter/exit balanced by construction.
    pub(crate) fn with_scope<T>(
        &mut self,
        kind: ScopeKind,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        self.symbols.enter_scope(kind);
        let result = f(self);
        self.symbols.exit_scope();
        result
    }

    // ------------------------------------------------------------------
    // Context stacks

    pub(crate) fn expr_context(&self) -> ExprContext {
        self.expr_context.last().copied().unwrap_or_default()
    }

    pub(crate) fn with_expr_context<T>(
        &mut self,
        ctx: ExprContext,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        self.expr_context.push(ctx);
        let result = f(self);
        self.expr_context.pop();
        result
    }

    pub(crate) fn in_sfinae(&self) -> bool {
        self.sfinae_depth > 0
    }

    pub(crate) fn with_sfinae<T>(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        self.sfinae_depth += 1;
        let result = f(self);
        self.sfinae_depth -= 1;
        result
    }

    /// Is `name` a template parameter in any active template head,
    /// innermost first?
    pub(crate) fn find_template_param(&self, name: Symbol) -> Option<&TemplateParam> {
        self.template_params
            .iter()
            .rev()
            .flat_map(|level| level.iter())
            .find(|p| p.name == name)
    }

    pub(crate) fn in_template(&self) -> bool {
        !self.template_params.is_empty()
    }

    pub(crate) fn current_template_param_names(&self) -> Vec<Symbol> {
        self.template_params
            .iter()
            .flat_map(|level| level.iter().map(|p| p.name))
            .collect()
    }

    pub(crate) fn current_struct(&self) -> Option<&StructContext> {
        self.struct_stack.last()
    }

    /// Effective struct packing for the class currently being laid out.
    pub(crate) fn effective_pack(&self) -> u32 {
        self.pack.effective(self.options.default_pack)
    }

    // ------------------------------------------------------------------
    // Node helpers

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        self.arena.alloc(node)
    }

    pub(crate) fn fresh_lambda_name(&mut self) -> Symbol {
        let name = format!("__lambda_{}", self.lambda_counter);
        self.lambda_counter += 1;
        self.intern(&name)
    }

    /// Debug-configuration trap for the `debug_break_line` option: halts
    /// the process when the cursor reaches the requested line, so an
    /// attached debugger stops right before the offending construct.
    /// Compiled out of release builds.
    #[cfg(debug_assertions)]
    pub(crate) fn maybe_debug_break(&self) {
        if let Some(line) = self.options.debug_break_line
            && self.peek_info().pos.line == line
        {
            eprintln!("cxxfront: debug break at line {line}");
            std::process::abort();
        }
    }

    #[cfg(not(debug_assertions))]
    pub(crate) fn maybe_debug_break(&self) {}
}
