//! Function declarator pieces: parameter lists, array suffixes, trailing
//! qualifiers, bodies, and `auto` return-type deduction.

use cxxfront_core::Symbol;

use crate::ast::{Linkage, Node, NodeId, Param, VarDecl};
use crate::diag::{ParseErrorKind, ParseResult};
use crate::parser::Parser;
use crate::symbols::ScopeKind;
use crate::token::TokenKind;
use crate::types::{CvQual, RefKind, TypeSpecifier};

/// Trailing declarator state parsed after a parameter list.
#[derive(Debug, Clone, Default)]
pub(crate) struct FunctionSuffix {
    pub cv: CvQual,
    pub ref_qual: RefKind,
    pub noexcept: bool,
    pub is_override: bool,
    pub is_final: bool,
    pub is_pure: bool,
    pub is_defaulted: bool,
    pub is_deleted: bool,
    pub trailing_return: Option<TypeSpecifier>,
    pub requires_clause: Option<NodeId>,
}

impl Parser {
    /// `( parameter-declaration-clause )`. Accepts `(void)` as empty.
    pub(crate) fn parse_parameter_list(&mut self) -> ParseResult<Vec<Param>> {
        self.expect(TokenKind::LParen, "'(' opening parameter list")?;
        let mut params = Vec::new();

        // `(void)` is an empty parameter list.
        if self.peek() == TokenKind::KwVoid && self.peek_at(1) == TokenKind::RParen {
            self.advance();
            self.advance();
            return Ok(params);
        }

        if self.peek() != TokenKind::RParen {
            loop {
                if self.consume(TokenKind::Ellipsis) {
                    // C-style variadic marker; recorded by the caller via
                    // a trailing sentinel parameter.
                    params.push(Param {
                        name: None,
                        ty: {
                            let mut t = TypeSpecifier::void();
                            t.pack_expansion = true;
                            t
                        },
                        default: None,
                        decl: None,
                    });
                    break;
                }
                let mut ty = self.parse_type_specifier()?;
                let name = if self.peek() == TokenKind::Identifier {
                    Some(self.advance().lexeme)
                } else {
                    None
                };
                self.parse_array_suffix(&mut ty)?;
                let default = if self.consume(TokenKind::Assign) {
                    Some(self.parse_assignment_expression()?)
                } else {
                    None
                };
                params.push(Param {
                    name,
                    ty,
                    default,
                    decl: None,
                });
                if !self.consume(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')' closing parameter list")?;
        Ok(params)
    }

    /// `[N]` / `[]` declarator suffixes. Dimensions must be constant; a
    /// dependent dimension stays unsized until instantiation.
    pub(crate) fn parse_array_suffix(&mut self, ty: &mut TypeSpecifier) -> ParseResult<()> {
        while self.consume(TokenKind::LBracket) {
            if self.consume(TokenKind::RBracket) {
                ty.push_array_dim(None, None);
                continue;
            }
            let dim_expr = self.parse_expression(0)?;
            self.expect(TokenKind::RBracket, "']' closing array bound")?;
            match self.eval_const_expr(dim_expr) {
                Ok(v) => {
                    let n = v.as_i64();
                    if n < 0 {
                        return Err(self.err_here(
                            ParseErrorKind::NotConstant,
                            "array bound must be non-negative",
                        ));
                    }
                    ty.push_array_dim(Some(n as u64), None);
                }
                Err(e)
                    if e.kind == crate::consteval::EvalErrorKind::TemplateDependent
                        && self.in_template() =>
                {
                    // Dependent bound; the expression re-evaluates at
                    // instantiation.
                    ty.push_array_dim(None, Some(dim_expr));
                }
                Err(e) => {
                    return Err(self.err_here(
                        ParseErrorKind::NotConstant,
                        format!("array bound is not constant: {}", e.message),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Everything after the parameter list: cv/ref qualifiers,
    /// `noexcept`/`throw()`, `override`/`final`, `= 0|default|delete`,
    /// trailing return type, trailing requires-clause.
    pub(crate) fn parse_function_suffix(&mut self) -> ParseResult<FunctionSuffix> {
        let mut suffix = FunctionSuffix::default();

        loop {
            match self.peek() {
                TokenKind::KwConst => {
                    self.advance();
                    suffix.cv.is_const = true;
                }
                TokenKind::KwVolatile => {
                    self.advance();
                    suffix.cv.is_volatile = true;
                }
                TokenKind::Amp => {
                    self.advance();
                    suffix.ref_qual = RefKind::LValue;
                }
                TokenKind::AmpAmp => {
                    self.advance();
                    suffix.ref_qual = RefKind::RValue;
                }
                _ => break,
            }
        }

        if self.consume(TokenKind::KwNoexcept) {
            suffix.noexcept = true;
            if self.consume(TokenKind::LParen) {
                let cond = self.parse_expression(0)?;
                self.expect(TokenKind::RParen, "')' after noexcept condition")?;
                if let Ok(v) = self.eval_const_expr(cond) {
                    suffix.noexcept = v.as_bool();
                }
            }
        } else if self.peek() == TokenKind::KwThrow && self.peek_at(1) == TokenKind::LParen {
            // Dynamic exception specifications are gone from C++20;
            // `throw()` survives as a noexcept spelling.
            self.advance();
            self.advance();
            self.expect(TokenKind::RParen, "')' after 'throw('")?;
            suffix.noexcept = true;
        }

        loop {
            if self.at_contextual(self.known.override_) {
                self.advance();
                suffix.is_override = true;
            } else if self.at_contextual(self.known.final_) {
                self.advance();
                suffix.is_final = true;
            } else {
                break;
            }
        }

        if self.consume(TokenKind::Arrow) {
            suffix.trailing_return = Some(self.parse_type_specifier()?);
        }

        if self.consume(TokenKind::KwRequires) {
            let expr = self.with_expr_context(crate::parser::ExprContext::RequiresClause, |p| {
                p.parse_expression(8)
            })?;
            suffix.requires_clause = Some(self.alloc(Node::RequiresClause { expr }));
        }

        if self.consume(TokenKind::Assign) {
            match self.peek() {
                TokenKind::IntLit => {
                    let tok = self.advance();
                    if &*self.lexeme(&tok) != "0" {
                        return Err(self.err_at(
                            ParseErrorKind::UnexpectedToken,
                            "only '= 0' marks a function pure virtual",
                            tok,
                        ));
                    }
                    suffix.is_pure = true;
                }
                TokenKind::KwDefault => {
                    self.advance();
                    suffix.is_defaulted = true;
                }
                TokenKind::KwDelete => {
                    self.advance();
                    suffix.is_deleted = true;
                }
                _ => {
                    return Err(self.err_here(
                        ParseErrorKind::UnexpectedToken,
                        "expected '0', 'default', or 'delete'",
                    ));
                }
            }
        }

        Ok(suffix)
    }

    /// Materialize a parameter as a VarDecl in the current (function)
    /// scope.
    pub(crate) fn declare_parameter(&mut self, param: &mut Param) -> Option<NodeId> {
        let name = param.name?;
        let decl = self.alloc(Node::VarDecl(VarDecl {
            name,
            ty: param.ty.clone(),
            init: None,
            linkage: Linkage::None,
            is_static: false,
            is_constexpr: false,
            is_extern: false,
            is_thread_local: false,
            const_value: None,
        }));
        self.symbols.declare(name, decl);
        param.decl = Some(decl);
        Some(decl)
    }

    /// Parse a function body in a fresh function scope with parameters
    /// declared, plus an implicit `this` inside member functions.
    pub(crate) fn parse_function_body(
        &mut self,
        params: &mut [Param],
        member_of: Option<crate::types::TypeId>,
    ) -> ParseResult<NodeId> {
        let scope = match member_of {
            Some(class) => ScopeKind::Class(class),
            None => ScopeKind::Function,
        };
        if member_of.is_some() {
            // Class scope wraps the function scope so unqualified member
            // lookup works inside the body.
            self.with_scope(scope, |p| {
                p.with_scope(ScopeKind::Function, |p| {
                    for param in params.iter_mut() {
                        p.declare_parameter(param);
                    }
                    p.parse_block()
                })
            })
        } else {
            self.with_scope(ScopeKind::Function, |p| {
                for param in params.iter_mut() {
                    p.declare_parameter(param);
                }
                p.parse_block()
            })
        }
    }

    /// Return-type deduction for `auto` functions and lambdas: collect the
    /// types produced by return statements, require a pairwise-compatible
    /// shape, return the deduced type.
    pub(crate) fn deduce_return_type(
        &mut self,
        body: NodeId,
    ) -> ParseResult<Option<TypeSpecifier>> {
        let mut returns: Vec<NodeId> = Vec::new();
        self.collect_returns(body, &mut returns);

        let mut deduced: Option<TypeSpecifier> = None;
        for ret in returns {
            let Some(ty) = self.expr_type(ret) else {
                continue;
            };
            let ty = ty.decayed();
            match &deduced {
                None => deduced = Some(ty),
                Some(existing) => {
                    if !existing.shape_eq(&ty) {
                        return Err(self.err_here(
                            ParseErrorKind::UnexpectedToken,
                            "inconsistent deduced return types",
                        ));
                    }
                }
            }
        }
        Ok(deduced)
    }

    fn collect_returns(&self, node: NodeId, out: &mut Vec<NodeId>) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if let Node::Return(Some(expr)) = self.arena.get(current) {
                out.push(*expr);
                continue;
            }
            if matches!(self.arena.get(current), Node::Lambda(_)) {
                // Nested lambdas deduce their own returns.
                continue;
            }
            self.push_children(current, &mut stack);
        }
    }

    /// Mangle and record a function's linkage name.
    pub(crate) fn mangled_name_for(
        &mut self,
        name: Symbol,
        params: &[Param],
        linkage: Linkage,
    ) -> Symbol {
        let effective = if linkage == Linkage::None {
            Linkage::Cpp
        } else {
            linkage
        };
        let ns_path = self.current_namespace_path();
        let param_types: Vec<TypeSpecifier> = params.iter().map(|p| p.ty.clone()).collect();
        let mangled = crate::mangle::mangle_function(
            &self.interner,
            name,
            &ns_path,
            &param_types,
            effective,
            self.options.mangling_style,
            self.anon_namespace_ids.last().copied(),
        );
        self.intern(&mangled)
    }

    pub(crate) fn current_namespace_path(&self) -> Vec<Symbol> {
        let mut out = Vec::new();
        let mut ns = Some(self.symbols.current_namespace());
        while let Some(current) = ns {
            if let Some(name) = self.symbols.namespaces.name(current) {
                out.push(name);
            }
            ns = self.symbols.namespaces.parent(current);
        }
        out.reverse();
        out
    }
}
