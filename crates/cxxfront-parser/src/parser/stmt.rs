//! Statement and block parsing.
//!
//! Blocks don't open their own scope here; callers decide (function bodies
//! reuse the function scope so parameters stay visible, nested compound
//! statements get a block scope from `parse_statement`).

use crate::ast::{Linkage, Node, NodeId, VarDecl};
use crate::diag::{ParseErrorKind, ParseResult};
use crate::parser::Parser;
use crate::symbols::ScopeKind;
use crate::token::TokenKind;

impl Parser {
    /// `{ statement* }`.
    pub(crate) fn parse_block(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::LBrace, "'{' opening block")?;
        let mut stmts = Vec::new();
        while self.peek() != TokenKind::RBrace {
            if self.cursor.is_eof() {
                return Err(self.err_here(ParseErrorKind::UnexpectedToken, "unterminated block"));
            }
            // Lone semicolons are empty statements.
            if self.consume(TokenKind::Semi) {
                continue;
            }
            stmts.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace, "'}' closing block")?;
        Ok(self.alloc(Node::Block { stmts }))
    }

    pub(crate) fn parse_statement(&mut self) -> ParseResult<NodeId> {
        match self.peek() {
            TokenKind::LBrace => self.with_scope(ScopeKind::Block, Self::parse_block),
            TokenKind::KwIf => self.parse_if(),
            TokenKind::KwFor => self.parse_for(),
            TokenKind::KwWhile => self.parse_while(),
            TokenKind::KwDo => self.parse_do_while(),
            TokenKind::KwSwitch => self.parse_switch(),
            TokenKind::KwCase => {
                self.advance();
                let value = self.parse_expression(2)?;
                self.expect(TokenKind::Colon, "':' after case value")?;
                Ok(self.alloc(Node::Case { value }))
            }
            TokenKind::KwDefault => {
                self.advance();
                self.expect(TokenKind::Colon, "':' after 'default'")?;
                Ok(self.alloc(Node::DefaultCase))
            }
            TokenKind::KwReturn => {
                self.advance();
                let expr = if self.peek() == TokenKind::Semi {
                    None
                } else {
                    Some(self.parse_expression(0)?)
                };
                self.expect(TokenKind::Semi, "';' after return statement")?;
                Ok(self.alloc(Node::Return(expr)))
            }
            TokenKind::KwBreak => {
                self.advance();
                self.expect(TokenKind::Semi, "';' after 'break'")?;
                Ok(self.alloc(Node::Break))
            }
            TokenKind::KwContinue => {
                self.advance();
                self.expect(TokenKind::Semi, "';' after 'continue'")?;
                Ok(self.alloc(Node::Continue))
            }
            TokenKind::KwGoto => {
                self.advance();
                let tok = self.expect(TokenKind::Identifier, "label after 'goto'")?;
                self.expect(TokenKind::Semi, "';' after goto label")?;
                Ok(self.alloc(Node::Goto(tok.lexeme)))
            }
            TokenKind::KwTry => self.parse_try(),
            TokenKind::KwThrow => {
                let expr = self.parse_expression(0)?;
                self.expect(TokenKind::Semi, "';' after throw expression")?;
                Ok(self.alloc(Node::ExpressionWrapper(expr)))
            }
            TokenKind::KwStaticAssert => {
                self.parse_static_assert()?;
                Ok(self.alloc(Node::Block { stmts: Vec::new() }))
            }
            TokenKind::KwUsing => {
                let node = self.parse_using_directive_or_declaration()?;
                Ok(node.unwrap_or_else(|| self.alloc(Node::Block { stmts: Vec::new() })))
            }
            TokenKind::KwStruct | TokenKind::KwClass | TokenKind::KwUnion => {
                self.parse_struct_declaration()
            }
            TokenKind::KwEnum => self.parse_enum_declaration(),
            TokenKind::KwTypedef => self.parse_typedef_declaration(),
            // `label:` — an identifier directly followed by a colon.
            TokenKind::Identifier
                if self.peek_at(1) == TokenKind::Colon =>
            {
                let tok = self.advance();
                self.advance();
                let stmt = self.parse_statement()?;
                Ok(self.alloc(Node::Label {
                    name: tok.lexeme,
                    stmt,
                }))
            }
            _ => self.parse_declaration_or_expression_statement(),
        }
    }

    fn parse_if(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::KwIf, "'if'")?;
        let is_constexpr = self.consume(TokenKind::KwConstexpr);
        self.expect(TokenKind::LParen, "'(' after 'if'")?;
        let cond = self.parse_expression(0)?;
        self.expect(TokenKind::RParen, "')' after condition")?;

        // `if constexpr` with a non-dependent condition decides its branch
        // at parse time.
        let taken = if is_constexpr {
            self.eval_const_expr(cond).ok().map(|v| v.as_bool())
        } else {
            None
        };

        let then_branch = self.parse_statement()?;
        let else_branch = if self.consume(TokenKind::KwElse) {
            Some(self.parse_statement()?)
        } else {
            None
        };
        Ok(self.alloc(Node::If {
            cond,
            then_branch,
            else_branch,
            is_constexpr,
            taken,
        }))
    }

    fn parse_for(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::KwFor, "'for'")?;
        self.with_scope(ScopeKind::Block, |p| {
            p.expect(TokenKind::LParen, "'(' after 'for'")?;

            // Ranged form: `for (decl : range)`.
            if let Some(ranged) = p.try_speculate(|p| {
                let ty = p.parse_type_specifier()?;
                let name_tok = p.expect(TokenKind::Identifier, "loop variable name")?;
                p.expect(TokenKind::Colon, "':' in range-for")?;
                let range = p.parse_expression(2)?;
                p.expect(TokenKind::RParen, "')' after range expression")?;
                let decl = p.alloc(Node::VarDecl(VarDecl {
                    name: name_tok.lexeme,
                    ty,
                    init: None,
                    linkage: Linkage::None,
                    is_static: false,
                    is_constexpr: false,
                    is_extern: false,
                    is_thread_local: false,
                    const_value: None,
                }));
                p.symbols.declare(name_tok.lexeme, decl);
                Ok((decl, range))
            }) {
                let (decl, range) = ranged;
                let body = p.parse_statement()?;
                return Ok(p.alloc(Node::RangedFor { decl, range, body }));
            }

            let init = if p.consume(TokenKind::Semi) {
                None
            } else {
                let stmt = p.parse_declaration_or_expression_statement()?;
                Some(stmt)
            };
            let cond = if p.peek() == TokenKind::Semi {
                None
            } else {
                Some(p.parse_expression(0)?)
            };
            p.expect(TokenKind::Semi, "';' after loop condition")?;
            let step = if p.peek() == TokenKind::RParen {
                None
            } else {
                Some(p.parse_expression(0)?)
            };
            p.expect(TokenKind::RParen, "')' closing for header")?;
            let body = p.parse_statement()?;
            Ok(p.alloc(Node::For {
                init,
                cond,
                step,
                body,
            }))
        })
    }

    fn parse_while(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::KwWhile, "'while'")?;
        self.expect(TokenKind::LParen, "'(' after 'while'")?;
        let cond = self.parse_expression(0)?;
        self.expect(TokenKind::RParen, "')' after condition")?;
        let body = self.parse_statement()?;
        Ok(self.alloc(Node::While { cond, body }))
    }

    fn parse_do_while(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::KwDo, "'do'")?;
        let body = self.parse_statement()?;
        self.expect(TokenKind::KwWhile, "'while' after do body")?;
        self.expect(TokenKind::LParen, "'(' after 'while'")?;
        let cond = self.parse_expression(0)?;
        self.expect(TokenKind::RParen, "')' after condition")?;
        self.expect(TokenKind::Semi, "';' after do-while")?;
        Ok(self.alloc(Node::DoWhile { body, cond }))
    }

    fn parse_switch(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::KwSwitch, "'switch'")?;
        self.expect(TokenKind::LParen, "'(' after 'switch'")?;
        let cond = self.parse_expression(0)?;
        self.expect(TokenKind::RParen, "')' after switch condition")?;
        let body = self.with_scope(ScopeKind::Block, Self::parse_block)?;
        Ok(self.alloc(Node::Switch { cond, body }))
    }

    fn parse_try(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::KwTry, "'try'")?;
        let body = self.with_scope(ScopeKind::Block, Self::parse_block)?;
        let mut handlers = Vec::new();
        while self.peek() == TokenKind::KwCatch {
            self.advance();
            self.expect(TokenKind::LParen, "'(' after 'catch'")?;
            let handler = self.with_scope(ScopeKind::Block, |p| {
                let decl = if p.consume(TokenKind::Ellipsis) {
                    None
                } else {
                    let ty = p.parse_type_specifier()?;
                    let name = if p.peek() == TokenKind::Identifier {
                        Some(p.advance().lexeme)
                    } else {
                        None
                    };
                    let decl = p.alloc(Node::VarDecl(VarDecl {
                        name: name.unwrap_or_else(|| p.intern("__exception")),
                        ty,
                        init: None,
                        linkage: Linkage::None,
                        is_static: false,
                        is_constexpr: false,
                        is_extern: false,
                        is_thread_local: false,
                        const_value: None,
                    }));
                    if let Some(n) = name {
                        p.symbols.declare(n, decl);
                    }
                    Some(decl)
                };
                p.expect(TokenKind::RParen, "')' after exception declaration")?;
                let block = p.parse_block()?;
                Ok((decl, block))
            })?;
            handlers.push(handler);
        }
        if handlers.is_empty() {
            return Err(self.err_here(
                ParseErrorKind::UnexpectedToken,
                "'try' without a 'catch' handler",
            ));
        }
        Ok(self.alloc(Node::Try { body, handlers }))
    }

    /// Statement-level declaration-vs-expression disambiguation: try a
    /// simple declaration speculatively, fall back to an expression
    /// statement.
    pub(crate) fn parse_declaration_or_expression_statement(&mut self) -> ParseResult<NodeId> {
        if let Some(decl) = self.try_speculate(Self::parse_local_declaration) {
            return Ok(decl);
        }
        let expr = self.parse_expression(0)?;
        self.expect(TokenKind::Semi, "';' after expression")?;
        Ok(self.alloc(Node::ExpressionWrapper(expr)))
    }

    /// `type declarator [= init | (args) | {args}] (, declarator ...)* ;`
    fn parse_local_declaration(&mut self) -> ParseResult<NodeId> {
        let mut is_static = false;
        let mut is_constexpr = false;
        let mut is_thread_local = false;
        loop {
            match self.peek() {
                TokenKind::KwStatic => {
                    self.advance();
                    is_static = true;
                }
                TokenKind::KwConstexpr => {
                    self.advance();
                    is_constexpr = true;
                }
                TokenKind::KwConstinit => {
                    self.advance();
                }
                TokenKind::KwThreadLocal => {
                    self.advance();
                    is_thread_local = true;
                }
                _ => break,
            }
        }

        let base = self.parse_type_specifier()?;
        let mut decls = Vec::new();

        loop {
            let mut ty = base.clone();
            // Each declarator re-reads its own ptr-operators after the
            // shared base (`int a, *p`).
            self.parse_ptr_operators(&mut ty);
            let name_tok = self.expect(TokenKind::Identifier, "variable name")?;
            self.parse_array_suffix(&mut ty)?;

            let init = if self.consume(TokenKind::Assign) {
                Some(self.parse_assignment_expression()?)
            } else if self.peek() == TokenKind::LParen || self.peek() == TokenKind::LBrace {
                let ctor = self.parse_constructor_call(ty.clone())?;
                Some(ctor)
            } else {
                None
            };

            let mut resolved_ty = ty;
            if resolved_ty.is_auto()
                && let Some(init) = init
                && let Some(deduced) = self.expr_type(init)
            {
                let keep_cv = resolved_ty.cv;
                resolved_ty = deduced.decayed().with_cv(keep_cv);
            }

            let const_value = if is_constexpr || resolved_ty.cv.is_const {
                init.and_then(|i| self.eval_const_expr(i).ok())
                    .map(crate::consteval::Value::to_const_value)
            } else {
                None
            };

            let decl = self.alloc(Node::VarDecl(VarDecl {
                name: name_tok.lexeme,
                ty: resolved_ty,
                init,
                linkage: Linkage::None,
                is_static,
                is_constexpr,
                is_extern: false,
                is_thread_local,
                const_value,
            }));
            self.symbols.declare(name_tok.lexeme, decl);
            decls.push(decl);

            if !self.consume(TokenKind::Comma) {
                break;
            }
        }

        self.expect(TokenKind::Semi, "';' after declaration")?;
        if decls.len() == 1 {
            Ok(decls[0])
        } else {
            Ok(self.alloc(Node::Block { stmts: decls }))
        }
    }
}
