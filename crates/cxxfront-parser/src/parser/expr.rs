//! Expression parsing: a layered Pratt parser.
//!
//! Layers: primary → postfix chain → unary → binary climbing over the
//! C++20 precedence table, with `?:` as a special case at precedence 5.
//! The active [`ExprContext`](crate::parser::ExprContext) decides whether
//! `<` opens template arguments or compares, and makes the expression stop
//! at `>` / `,` inside template argument lists.
//!
//! Name lookup, overload resolution, and on-demand template instantiation
//! run inline; a call node leaves the parser with its callee resolved to an
//! arena index unless the call is template-dependent.

use cxxfront_core::Symbol;

use crate::ast::{
    BinaryOp, CastKind, ConstValue, FoldDirection, Node, NodeId, Param, Requirement, SizeofArg,
    TemplateParamKind, UnaryOp,
};
use crate::consteval::{self, EvalContext};
use crate::diag::{ParseErrorKind, ParseResult};
use crate::overload::{self, CallArg};
use crate::parser::{ExprContext, MAX_EXPR_DEPTH, Parser};
use crate::symbols::ScopeKind;
use crate::templates::TemplateArg;
use crate::token::{Token, TokenKind};
use crate::types::{BaseKind, CvQual, RefKind, TypeSpecifier};

impl Parser {
    /// Pratt loop entry. `min_prec` 0 accepts everything including the
    /// comma operator; argument lists parse at assignment precedence.
    pub(crate) fn parse_expression(&mut self, min_prec: u8) -> ParseResult<NodeId> {
        if self.expr_depth >= MAX_EXPR_DEPTH {
            return Err(self.err_here(
                ParseErrorKind::RecursionLimit,
                "maximum recursion depth exceeded",
            ));
        }
        self.expr_depth += 1;
        let result = self.parse_expression_inner(min_prec);
        self.expr_depth -= 1;
        result
    }

    /// Assignment-expression: everything except the comma operator.
    pub(crate) fn parse_assignment_expression(&mut self) -> ParseResult<NodeId> {
        self.parse_expression(2)
    }

    fn parse_expression_inner(&mut self, min_prec: u8) -> ParseResult<NodeId> {
        let mut lhs = self.parse_unary_expression()?;

        loop {
            // Ternary: right-associative, true branch at precedence 0,
            // false branch back at its own level.
            if self.peek() == TokenKind::Question && min_prec <= 5 {
                self.advance();
                let then_expr = self.parse_expression(0)?;
                self.expect(TokenKind::Colon, "':' in conditional expression")?;
                let else_expr = self.parse_expression(5)?;
                lhs = self.alloc(Node::Ternary {
                    cond: lhs,
                    then_expr,
                    else_expr,
                });
                continue;
            }

            let Some((prec, op, right_assoc)) = self.binary_prec(self.peek()) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.advance();
            let next_min = if right_assoc { prec } else { prec + 1 };
            let rhs = self.parse_expression(next_min)?;
            lhs = self.alloc(Node::BinaryOp { op, lhs, rhs });
        }

        Ok(lhs)
    }

    fn binary_prec(&self, kind: TokenKind) -> Option<(u8, BinaryOp, bool)> {
        let in_targ = self.expr_context() == ExprContext::TemplateArgument;
        let entry = match kind {
            TokenKind::Star => (17, BinaryOp::Mul, false),
            TokenKind::Slash => (17, BinaryOp::Div, false),
            TokenKind::Percent => (17, BinaryOp::Rem, false),
            TokenKind::Plus => (16, BinaryOp::Add, false),
            TokenKind::Minus => (16, BinaryOp::Sub, false),
            TokenKind::Shl => (15, BinaryOp::Shl, false),
            TokenKind::Shr if !in_targ => (15, BinaryOp::Shr, false),
            TokenKind::Spaceship => (14, BinaryOp::Spaceship, false),
            TokenKind::Lt => (13, BinaryOp::Lt, false),
            TokenKind::LtEq => (13, BinaryOp::LtEq, false),
            TokenKind::Gt if !in_targ => (13, BinaryOp::Gt, false),
            TokenKind::GtEq => (13, BinaryOp::GtEq, false),
            TokenKind::EqEq => (12, BinaryOp::Eq, false),
            TokenKind::NotEq => (12, BinaryOp::NotEq, false),
            TokenKind::Amp => (11, BinaryOp::BitAnd, false),
            TokenKind::Caret => (10, BinaryOp::BitXor, false),
            TokenKind::Pipe => (9, BinaryOp::BitOr, false),
            TokenKind::AmpAmp => (8, BinaryOp::LogicalAnd, false),
            TokenKind::PipePipe => (7, BinaryOp::LogicalOr, false),
            TokenKind::Assign => (3, BinaryOp::Assign, true),
            TokenKind::PlusAssign => (3, BinaryOp::AddAssign, true),
            TokenKind::MinusAssign => (3, BinaryOp::SubAssign, true),
            TokenKind::StarAssign => (3, BinaryOp::MulAssign, true),
            TokenKind::SlashAssign => (3, BinaryOp::DivAssign, true),
            TokenKind::PercentAssign => (3, BinaryOp::RemAssign, true),
            TokenKind::AmpAssign => (3, BinaryOp::AndAssign, true),
            TokenKind::PipeAssign => (3, BinaryOp::OrAssign, true),
            TokenKind::CaretAssign => (3, BinaryOp::XorAssign, true),
            TokenKind::ShlAssign => (3, BinaryOp::ShlAssign, true),
            TokenKind::ShrAssign => (3, BinaryOp::ShrAssign, true),
            TokenKind::Comma if !in_targ => (1, BinaryOp::Comma, false),
            _ => return None,
        };
        Some(entry)
    }

    // ------------------------------------------------------------------
    // Unary layer

    pub(crate) fn parse_unary_expression(&mut self) -> ParseResult<NodeId> {
        match self.peek() {
            TokenKind::PlusPlus => self.prefix_op(UnaryOp::PreInc),
            TokenKind::MinusMinus => self.prefix_op(UnaryOp::PreDec),
            TokenKind::Plus => self.prefix_op(UnaryOp::Plus),
            TokenKind::Minus => self.prefix_op(UnaryOp::Minus),
            TokenKind::Bang => self.prefix_op(UnaryOp::Not),
            TokenKind::Tilde => self.prefix_op(UnaryOp::BitNot),
            TokenKind::Star => self.prefix_op(UnaryOp::Deref),
            TokenKind::Amp => self.prefix_op(UnaryOp::AddrOf),
            TokenKind::KwRealPart => self.prefix_op(UnaryOp::RealPart),
            TokenKind::KwImagPart => self.prefix_op(UnaryOp::ImagPart),
            TokenKind::KwThrow => {
                self.advance();
                let operand = if can_start_expression(self.peek()) {
                    Some(self.parse_assignment_expression()?)
                } else {
                    None
                };
                Ok(self.alloc(Node::Throw(operand)))
            }
            TokenKind::KwSizeof => self.parse_sizeof(),
            TokenKind::KwAlignof => self.parse_alignof(),
            TokenKind::KwNoexcept => {
                self.advance();
                self.expect(TokenKind::LParen, "'(' after 'noexcept'")?;
                let inner = self.parse_expression(0)?;
                self.expect(TokenKind::RParen, "')' after noexcept operand")?;
                Ok(self.alloc(Node::NoexceptExpr(inner)))
            }
            TokenKind::KwNew => self.parse_new_expression(false),
            TokenKind::KwDelete => self.parse_delete_expression(false),
            TokenKind::ColonColon
                if matches!(self.peek_at(1), TokenKind::KwNew | TokenKind::KwDelete) =>
            {
                self.advance();
                if self.peek() == TokenKind::KwNew {
                    self.parse_new_expression(true)
                } else {
                    self.parse_delete_expression(true)
                }
            }
            TokenKind::LParen => {
                if let Some(node) = self.try_parse_c_style_cast() {
                    return Ok(node);
                }
                self.parse_postfix_expression()
            }
            _ => self.parse_postfix_expression(),
        }
    }

    fn prefix_op(&mut self, op: UnaryOp) -> ParseResult<NodeId> {
        self.advance();
        let operand = self.parse_unary_expression()?;
        Ok(self.alloc(Node::UnaryOp { op, operand }))
    }

    /// `(T)expr`: succeeds only when the parenthesized tokens form a valid
    /// type, the close paren follows, the "type" isn't an unresolved name
    /// outside templates or a concept, and something that can start a
    /// unary expression comes next.
    fn try_parse_c_style_cast(&mut self) -> Option<NodeId> {
        let in_template = self.in_template();
        let cast = self.try_speculate(|p| {
            p.expect(TokenKind::LParen, "'('")?;
            let ty = p.parse_type_specifier()?;
            p.expect(TokenKind::RParen, "')'")?;
            if ty.is_unresolved() && !in_template {
                return Err(p.err_here(ParseErrorKind::UnexpectedToken, "not a cast"));
            }
            if let Some(name) = ty.name
                && p.templates.is_concept(name)
            {
                return Err(p.err_here(ParseErrorKind::UnexpectedToken, "concept name in cast"));
            }
            if !can_start_expression(p.peek()) {
                return Err(p.err_here(ParseErrorKind::UnexpectedToken, "not a cast"));
            }
            let expr = p.parse_unary_expression()?;
            Ok(p.alloc(Node::Cast {
                kind: CastKind::CStyle,
                target: ty,
                expr,
            }))
        })?;
        Some(cast)
    }

    fn parse_sizeof(&mut self) -> ParseResult<NodeId> {
        self.advance();
        // sizeof...(pack)
        if self.consume(TokenKind::Ellipsis) {
            self.expect(TokenKind::LParen, "'(' after 'sizeof...'")?;
            let tok = self.expect(TokenKind::Identifier, "pack name")?;
            self.expect(TokenKind::RParen, "')' after pack name")?;
            return Ok(self.alloc(Node::SizeofPack { pack: tok.lexeme }));
        }
        let arg = self.parse_sizeof_operand()?;
        let node = self.alloc(Node::SizeofExpr { arg });
        Ok(node)
    }

    fn parse_alignof(&mut self) -> ParseResult<NodeId> {
        self.advance();
        let arg = self.parse_sizeof_operand()?;
        Ok(self.alloc(Node::AlignofExpr { arg }))
    }

    /// `( type )` preferred, `unary-expression` otherwise.
    fn parse_sizeof_operand(&mut self) -> ParseResult<SizeofArg> {
        if self.peek() == TokenKind::LParen {
            let ty = self.try_speculate(|p| {
                p.expect(TokenKind::LParen, "'('")?;
                let mut ty = p.parse_type_specifier()?;
                p.parse_array_suffix(&mut ty)?;
                p.expect(TokenKind::RParen, "')'")?;
                Ok(ty)
            });
            if let Some(ty) = ty {
                self.ensure_layout(&ty);
                return Ok(SizeofArg::Type(ty));
            }
        }
        let expr = self.parse_unary_expression()?;
        Ok(SizeofArg::Expr(expr))
    }

    fn parse_new_expression(&mut self, is_global: bool) -> ParseResult<NodeId> {
        self.expect(TokenKind::KwNew, "'new'")?;

        // Placement arguments: `new (addr, ...) T`. Disambiguated from a
        // parenthesized type by lookahead.
        let mut placement = Vec::new();
        if self.peek() == TokenKind::LParen {
            let is_type = self
                .lookahead(|p| {
                    p.expect(TokenKind::LParen, "'('")?;
                    let ty = p.parse_type_specifier()?;
                    p.expect(TokenKind::RParen, "')'")?;
                    Ok(ty)
                })
                .is_some();
            if !is_type {
                self.expect(TokenKind::LParen, "'('")?;
                loop {
                    placement.push(self.parse_assignment_expression()?);
                    if !self.consume(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RParen, "')' after placement arguments")?;
            }
        }

        let parenthesized_type = self.peek() == TokenKind::LParen;
        if parenthesized_type {
            self.advance();
        }
        let mut ty = self.parse_type_specifier()?;
        if parenthesized_type {
            self.expect(TokenKind::RParen, "')' after type")?;
        }

        let mut array_size = None;
        if self.consume(TokenKind::LBracket) {
            if self.peek() != TokenKind::RBracket {
                array_size = Some(self.parse_expression(0)?);
            }
            self.expect(TokenKind::RBracket, "']' in array new")?;
            while self.consume(TokenKind::LBracket) {
                let dim = self.parse_expression(0)?;
                let bound = self.const_u64(dim);
                ty.push_array_dim(bound, None);
                self.expect(TokenKind::RBracket, "']' in array new")?;
            }
        }

        let mut args = Vec::new();
        if self.consume(TokenKind::LParen) {
            if self.peek() != TokenKind::RParen {
                loop {
                    args.push(self.parse_assignment_expression()?);
                    if !self.consume(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RParen, "')' after new-initializer")?;
        } else if self.consume(TokenKind::LBrace) {
            if self.peek() != TokenKind::RBrace {
                loop {
                    args.push(self.parse_assignment_expression()?);
                    if !self.consume(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RBrace, "'}' after new-initializer")?;
        }

        Ok(self.alloc(Node::NewExpression {
            ty,
            placement,
            args,
            array_size,
            is_global,
        }))
    }

    fn parse_delete_expression(&mut self, is_global: bool) -> ParseResult<NodeId> {
        self.expect(TokenKind::KwDelete, "'delete'")?;
        let is_array = if self.consume(TokenKind::LBracket) {
            self.expect(TokenKind::RBracket, "']' after 'delete['")?;
            true
        } else {
            false
        };
        let expr = self.parse_unary_expression()?;
        Ok(self.alloc(Node::DeleteExpression {
            expr,
            is_array,
            is_global,
        }))
    }

    // ------------------------------------------------------------------
    // Postfix layer

    pub(crate) fn parse_postfix_expression(&mut self) -> ParseResult<NodeId> {
        let mut expr = self.parse_primary_expression()?;

        loop {
            match self.peek() {
                TokenKind::PlusPlus => {
                    self.advance();
                    expr = self.alloc(Node::UnaryOp {
                        op: UnaryOp::PostInc,
                        operand: expr,
                    });
                }
                TokenKind::MinusMinus => {
                    self.advance();
                    expr = self.alloc(Node::UnaryOp {
                        op: UnaryOp::PostDec,
                        operand: expr,
                    });
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expression(0)?;
                    self.expect(TokenKind::RBracket, "']' after subscript")?;
                    expr = self.alloc(Node::ArraySubscript { array: expr, index });
                }
                TokenKind::LParen => {
                    let args = self.parse_call_arguments()?;
                    expr = self.build_call(expr, args)?;
                }
                TokenKind::Dot | TokenKind::Arrow => {
                    let arrow = self.peek() == TokenKind::Arrow;
                    self.advance();
                    expr = self.parse_member_suffix(expr, arrow)?;
                }
                TokenKind::DotStar | TokenKind::ArrowStar => {
                    let arrow = self.peek() == TokenKind::ArrowStar;
                    self.advance();
                    let member = self.parse_unary_expression()?;
                    expr = self.alloc(Node::PointerToMemberAccess {
                        object: expr,
                        member,
                        arrow,
                    });
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    /// After `.` or `->`: pseudo-destructor, `operator` member, member
    /// with explicit template arguments, or a plain member.
    fn parse_member_suffix(&mut self, object: NodeId, arrow: bool) -> ParseResult<NodeId> {
        // obj.~T()
        if self.consume(TokenKind::Tilde) {
            let ty = self.parse_base_type()?;
            self.expect(TokenKind::LParen, "'(' after pseudo-destructor name")?;
            self.expect(TokenKind::RParen, "')' after pseudo-destructor call")?;
            return Ok(self.alloc(Node::PseudoDestructorCall { object, ty, arrow }));
        }

        // obj.template f<...>()
        self.consume(TokenKind::KwTemplate);

        // obj.operator<=>(u) and friends.
        if self.peek() == TokenKind::KwOperator {
            let name = self.parse_operator_function_name()?;
            let args = if self.peek() == TokenKind::LParen {
                self.parse_call_arguments()?
            } else {
                Vec::new()
            };
            return self.build_member_call(object, name, arrow, Vec::new(), args);
        }

        let tok = self.expect(TokenKind::Identifier, "member name after '.'")?;
        let member = tok.lexeme;

        // Explicit template arguments on a member.
        let mut template_args = Vec::new();
        if self.peek() == TokenKind::Lt {
            if let Some(args) = self.try_speculate(Self::parse_explicit_template_arguments) {
                template_args = args;
            }
        }

        if self.peek() == TokenKind::LParen {
            let args = self.parse_call_arguments()?;
            return self.build_member_call(object, member, arrow, template_args, args);
        }

        Ok(self.alloc(Node::MemberAccess {
            object,
            member,
            arrow,
        }))
    }

    /// `operator` followed by an operator token; returns the interned
    /// `operator@` spelling.
    pub(crate) fn parse_operator_function_name(&mut self) -> ParseResult<Symbol> {
        self.expect(TokenKind::KwOperator, "'operator'")?;
        let spelled = match self.peek() {
            TokenKind::LParen if self.peek_at(1) == TokenKind::RParen => {
                self.advance();
                self.advance();
                "()".to_string()
            }
            TokenKind::LBracket if self.peek_at(1) == TokenKind::RBracket => {
                self.advance();
                self.advance();
                "[]".to_string()
            }
            TokenKind::KwNew => {
                self.advance();
                if self.consume(TokenKind::LBracket) {
                    self.expect(TokenKind::RBracket, "']' in 'operator new[]'")?;
                    " new[]".to_string()
                } else {
                    " new".to_string()
                }
            }
            TokenKind::KwDelete => {
                self.advance();
                if self.consume(TokenKind::LBracket) {
                    self.expect(TokenKind::RBracket, "']' in 'operator delete[]'")?;
                    " delete[]".to_string()
                } else {
                    " delete".to_string()
                }
            }
            _ => {
                let tok = self.advance();
                if tok.is_eof() {
                    return Err(self.err_at(
                        ParseErrorKind::UnexpectedToken,
                        "expected an operator symbol",
                        tok,
                    ));
                }
                self.lexeme(&tok).to_string()
            }
        };
        Ok(self.intern(&format!("operator{spelled}")))
    }

    pub(crate) fn parse_call_arguments(&mut self) -> ParseResult<Vec<NodeId>> {
        self.expect(TokenKind::LParen, "'(' in call")?;
        let mut args = Vec::new();
        if self.peek() != TokenKind::RParen {
            loop {
                let mut arg = self.parse_assignment_expression()?;
                if self.consume(TokenKind::Ellipsis) {
                    arg = self.alloc(Node::PackExpansion(arg));
                }
                args.push(arg);
                if !self.consume(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')' after call arguments")?;
        Ok(args)
    }

    // ------------------------------------------------------------------
    // Primary layer

    pub(crate) fn parse_primary_expression(&mut self) -> ParseResult<NodeId> {
        match self.peek() {
            TokenKind::IntLit => self.parse_int_literal(),
            TokenKind::FloatLit => self.parse_float_literal(),
            TokenKind::CharLit => self.parse_char_literal(),
            TokenKind::StrLit => self.parse_string_literal(),
            TokenKind::KwTrue => {
                self.advance();
                Ok(self.alloc(Node::BoolLiteral(true)))
            }
            TokenKind::KwFalse => {
                self.advance();
                Ok(self.alloc(Node::BoolLiteral(false)))
            }
            TokenKind::KwNullptr => {
                self.advance();
                Ok(self.alloc(Node::NullptrLiteral))
            }
            TokenKind::KwThis => {
                self.advance();
                Ok(self.alloc(Node::ThisExpr))
            }
            TokenKind::LParen => self.parse_paren_or_fold(),
            TokenKind::LBracket => self.parse_lambda_expression(),
            TokenKind::KwStaticCast => self.parse_named_cast(CastKind::Static),
            TokenKind::KwDynamicCast => self.parse_named_cast(CastKind::Dynamic),
            TokenKind::KwConstCast => self.parse_named_cast(CastKind::Const),
            TokenKind::KwReinterpretCast => self.parse_named_cast(CastKind::Reinterpret),
            TokenKind::KwTypeid => {
                self.advance();
                self.expect(TokenKind::LParen, "'(' after 'typeid'")?;
                let arg = if let Some(ty) = self.try_parse_type() {
                    SizeofArg::Type(ty)
                } else {
                    SizeofArg::Expr(self.parse_expression(0)?)
                };
                self.expect(TokenKind::RParen, "')' after typeid operand")?;
                Ok(self.alloc(Node::TypeidExpr { arg }))
            }
            TokenKind::KwRequires => self.parse_requires_expression(),
            TokenKind::KwDecltype => self.parse_functional_cast_from_keyword(),
            k if k.is_builtin_type_keyword() => self.parse_functional_cast_from_keyword(),
            TokenKind::ColonColon | TokenKind::Identifier => self.parse_identifier_expression(),
            _ => Err(self.err_here(
                ParseErrorKind::UnexpectedToken,
                "expected an expression",
            )),
        }
    }

    /// `int(x)`, `decltype(e)(x)`, `unsigned{y}`.
    fn parse_functional_cast_from_keyword(&mut self) -> ParseResult<NodeId> {
        let ty = self.parse_base_type()?;
        self.parse_constructor_call(ty)
    }

    pub(crate) fn parse_constructor_call(&mut self, ty: TypeSpecifier) -> ParseResult<NodeId> {
        let braced = match self.peek() {
            TokenKind::LParen => false,
            TokenKind::LBrace => true,
            _ => {
                return Err(self.err_here(
                    ParseErrorKind::UnexpectedToken,
                    "expected '(' or '{' after type name",
                ));
            }
        };
        let close = if braced {
            TokenKind::RBrace
        } else {
            TokenKind::RParen
        };
        self.advance();
        let mut args = Vec::new();
        if self.peek() != close {
            loop {
                args.push(self.parse_assignment_expression()?);
                if !self.consume(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(close, "closing delimiter of initializer")?;
        self.ensure_layout(&ty);
        Ok(self.alloc(Node::ConstructorCall { ty, args, braced }))
    }

    fn parse_named_cast(&mut self, kind: CastKind) -> ParseResult<NodeId> {
        self.advance();
        self.expect(TokenKind::Lt, "'<' after cast keyword")?;
        let target = self.parse_type_specifier()?;
        self.consume_template_close()?;
        self.expect(TokenKind::LParen, "'(' after cast target type")?;
        let expr = self.parse_expression(0)?;
        self.expect(TokenKind::RParen, "')' after cast operand")?;
        Ok(self.alloc(Node::Cast { kind, target, expr }))
    }

    /// `(expr)`, or one of the four fold-expression forms. The fold parse
    /// is speculative and re-reads the whole parenthesized range, so it
    /// only runs when a top-level `...` is actually present.
    fn parse_paren_or_fold(&mut self) -> ParseResult<NodeId> {
        if self.paren_has_top_level_ellipsis()
            && let Some(fold) = self.try_speculate(Self::parse_fold_expression)
        {
            return Ok(fold);
        }
        self.expect(TokenKind::LParen, "'('")?;
        let inner = self.with_expr_context(ExprContext::Normal, |p| p.parse_expression(0))?;
        self.expect(TokenKind::RParen, "')' after expression")?;
        Ok(inner)
    }

    /// Bounded lookahead: an `...` at depth one inside the `(` at the
    /// cursor.
    fn paren_has_top_level_ellipsis(&self) -> bool {
        let mut depth = 0i32;
        let mut offset = 0usize;
        loop {
            match self.peek_at(offset) {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    depth -= 1;
                    if depth <= 0 {
                        return false;
                    }
                }
                TokenKind::Ellipsis if depth == 1 => return true,
                TokenKind::Semi | TokenKind::Eof => return false,
                _ => {}
            }
            offset += 1;
        }
    }

    fn parse_fold_expression(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::LParen, "'('")?;

        // (... op pack)
        if self.consume(TokenKind::Ellipsis) {
            let op = self
                .fold_operator()
                .ok_or_else(|| self.err_here(ParseErrorKind::UnexpectedToken, "expected a fold operator"))?;
            let pack = self.parse_assignment_expression()?;
            self.expect(TokenKind::RParen, "')' closing fold expression")?;
            return Ok(self.alloc(Node::FoldExpression {
                op,
                direction: FoldDirection::UnaryLeft,
                pack,
                init: None,
            }));
        }

        let first = self.parse_assignment_expression()?;
        let op = self
            .fold_operator()
            .ok_or_else(|| self.err_here(ParseErrorKind::UnexpectedToken, "expected a fold operator"))?;
        self.expect(TokenKind::Ellipsis, "'...' in fold expression")?;

        // (pack op ...)
        if self.consume(TokenKind::RParen) {
            return Ok(self.alloc(Node::FoldExpression {
                op,
                direction: FoldDirection::UnaryRight,
                pack: first,
                init: None,
            }));
        }

        // (pack op ... op init)
        let op2 = self
            .fold_operator()
            .ok_or_else(|| self.err_here(ParseErrorKind::UnexpectedToken, "expected a fold operator"))?;
        if op2 != op {
            return Err(self.err_here(
                ParseErrorKind::UnexpectedToken,
                "fold expression operators must match",
            ));
        }
        let init = self.parse_assignment_expression()?;
        self.expect(TokenKind::RParen, "')' closing fold expression")?;
        Ok(self.alloc(Node::FoldExpression {
            op,
            direction: FoldDirection::BinaryRight,
            pack: first,
            init: Some(init),
        }))
    }

    /// Consume a binary operator token usable in a fold, if present.
    fn fold_operator(&mut self) -> Option<BinaryOp> {
        let (_, op, _) = self.binary_prec(self.peek())?;
        self.advance();
        Some(op)
    }

    // ------------------------------------------------------------------
    // Identifiers, qualified names, template-ids

    fn parse_identifier_expression(&mut self) -> ParseResult<NodeId> {
        let absolute = self.consume(TokenKind::ColonColon);
        let first = self.expect(TokenKind::Identifier, "an identifier")?;
        let name = first.lexeme;
        let text = self.lexeme(&first);

        // Vendor intrinsics dispatch on spelling.
        if text.starts_with("__is_") || text.starts_with("__has_") {
            return self.parse_type_trait(first);
        }
        if text.starts_with("__builtin_") {
            return self.parse_builtin_call(first);
        }

        let mut path: Vec<Symbol> = Vec::new();
        let mut last = name;
        let mut last_tok = first;

        loop {
            // Template-id on the current segment?
            if self.peek() == TokenKind::Lt && self.should_try_template_args(last) {
                let args_parse = self.try_speculate(Self::parse_explicit_template_arguments);
                if let Some(args) = args_parse {
                    return self.resolve_template_id_expression(path, last, args, last_tok);
                }
            }
            if self.peek() == TokenKind::ColonColon
                && self.peek_at(1) == TokenKind::Identifier
            {
                self.advance();
                let tok = self.expect(TokenKind::Identifier, "name after '::'")?;
                path.push(last);
                last = tok.lexeme;
                last_tok = tok;
                continue;
            }
            break;
        }

        if path.is_empty() && !absolute {
            return self.resolve_unqualified(last, last_tok);
        }
        self.resolve_qualified(absolute, path, last, last_tok)
    }

    /// `<` after a name opens template arguments iff the name is a known
    /// template or concept, or the context prefers that reading and a
    /// speculative argument parse succeeds.
    fn should_try_template_args(&self, name: Symbol) -> bool {
        if self.templates.is_template(name) || self.templates.is_concept(name) {
            return true;
        }
        if self.find_template_param(name).is_some() {
            return true;
        }
        matches!(
            self.expr_context(),
            ExprContext::TemplateArgument | ExprContext::Decltype | ExprContext::RequiresClause
        )
    }

    fn resolve_template_id_expression(
        &mut self,
        path: Vec<Symbol>,
        name: Symbol,
        args: Vec<TemplateArg>,
        name_tok: Token,
    ) -> ParseResult<NodeId> {
        // Concept check: evaluates to bool.
        if self.templates.is_concept(name) {
            let value = self.evaluate_concept(name, &args)?;
            let type_args = args.iter().map(|a| self.template_arg_as_spec(a)).collect();
            return Ok(self.alloc(Node::TypeTraitExpr {
                name,
                type_args,
                value,
            }));
        }

        let dependent = args.iter().any(|a| self.template_arg_is_dependent(a));
        if dependent {
            return Ok(self.alloc(Node::Identifier { name, decl: None }));
        }

        if self.templates.functions.contains_key(&name) {
            let inst = self.instantiate_function_template_explicit(name, &args, name_tok)?;
            return Ok(self.alloc(Node::Identifier {
                name,
                decl: Some(inst),
            }));
        }
        if self.templates.variables.contains_key(&name) {
            let inst = self.instantiate_variable_template(name, &args, name_tok)?;
            return Ok(self.alloc(Node::Identifier {
                name,
                decl: Some(inst),
            }));
        }
        if self.templates.classes.contains_key(&name) || self.templates.aliases.contains_key(&name)
        {
            let ty = self.resolve_template_id(name, args)?;
            // Qualified member of an instantiated class: `Vec<int>::size()`.
            if self.consume(TokenKind::ColonColon) {
                let member = self.expect(TokenKind::Identifier, "member name after '::'")?;
                let mangled = ty
                    .type_id
                    .map(|id| self.types.get(id).name)
                    .unwrap_or(name);
                return self.resolve_qualified(false, vec![mangled], member.lexeme, member);
            }
            return self.parse_constructor_call(ty);
        }

        let _ = path;
        Err(self.err_at(
            ParseErrorKind::MissingIdentifier,
            format!("'{}' is not a template", self.resolve(name)),
            name_tok,
        ))
    }

    fn resolve_unqualified(&mut self, name: Symbol, tok: Token) -> ParseResult<NodeId> {
        // Known type followed by an initializer: functional cast.
        if matches!(self.peek(), TokenKind::LParen | TokenKind::LBrace)
            && let Some(id) = self.lookup_type_name(name)
        {
            let info = self.types.get(id);
            let mut ty = TypeSpecifier::builtin(info.base, 0);
            ty.name = Some(name);
            ty.type_id = Some(id);
            let ty = self.types.resolve_alias(&ty);
            return self.parse_constructor_call(ty);
        }

        let found = self.symbols.lookup(name);
        if let Some(&decl) = found.first() {
            return Ok(self.alloc(Node::Identifier {
                name,
                decl: Some(decl),
            }));
        }

        // Inside a member function (including bodies re-parsed after the
        // class completed), unqualified names reach the class members
        // through an implicit `this`.
        if let Some(class_id) = self.symbols.current_class()
            && let Some(node) = self.resolve_class_member(class_id, name)
        {
            return Ok(node);
        }

        // Function templates are callable without explicit arguments.
        if self.templates.functions.contains_key(&name) {
            return Ok(self.alloc(Node::Identifier { name, decl: None }));
        }

        if self.find_template_param(name).is_some() {
            let index = self
                .current_template_param_names()
                .iter()
                .position(|n| *n == name)
                .unwrap_or(0) as u32;
            return Ok(self.alloc(Node::TemplateParameterReference { name, index }));
        }

        if self.in_template() || self.in_sfinae() {
            if self.in_sfinae() {
                return Err(self.err_at(
                    ParseErrorKind::MissingIdentifier,
                    format!("'{}' was not declared", self.resolve(name)),
                    tok,
                ));
            }
            // Dependent name; bound at instantiation.
            return Ok(self.alloc(Node::Identifier { name, decl: None }));
        }

        Err(self.err_at(
            ParseErrorKind::MissingIdentifier,
            format!("'{}' was not declared in this scope", self.resolve(name)),
            tok,
        ))
    }

    fn resolve_qualified(
        &mut self,
        absolute: bool,
        path: Vec<Symbol>,
        name: Symbol,
        tok: Token,
    ) -> ParseResult<NodeId> {
        // Namespace-qualified lookup first.
        let found = self.symbols.qualified_lookup(&path, name, absolute);
        if let Some(&decl) = found.first() {
            return Ok(self.alloc(Node::QualifiedIdentifier {
                path,
                name,
                decl: Some(decl),
            }));
        }

        // Class-qualified: enumerators and static members.
        if let Some(type_id) = self.lookup_qualified_path_type(absolute, &path) {
            let is_enumerator = self
                .types
                .get(type_id)
                .enum_info
                .as_ref()
                .is_some_and(|e| e.value_of(name).is_some());
            if is_enumerator {
                return Ok(self.alloc(Node::QualifiedIdentifier {
                    path,
                    name,
                    decl: None,
                }));
            }
            if self.types.get(type_id).struct_info.is_some() {
                // Static member access escalates a lazy class.
                self.ensure_static_member(type_id, name);
                let static_decl = self
                    .types
                    .get(type_id)
                    .struct_info
                    .as_ref()
                    .and_then(|s| s.find_static(name))
                    .map(|m| m.decl);
                if let Some(decl) = static_decl {
                    return Ok(self.alloc(Node::QualifiedIdentifier { path, name, decl }));
                }
                // Member function name or qualified non-static member;
                // calls resolve later, sizeof contexts type it lazily.
                let is_member = {
                    let info = self.types.get(type_id);
                    let s = info.struct_info.as_ref();
                    s.is_some_and(|s| {
                        s.find_member(name).is_some()
                            || s.member_functions.iter().any(|&f| {
                                matches!(self.arena.get(f), Node::FunctionDecl(d) if d.name == name)
                            })
                    })
                };
                if is_member {
                    return Ok(self.alloc(Node::QualifiedIdentifier {
                        path,
                        name,
                        decl: None,
                    }));
                }
            }
        }

        if self.in_template() && !self.in_sfinae() {
            return Ok(self.alloc(Node::QualifiedIdentifier {
                path,
                name,
                decl: None,
            }));
        }

        let joined = self.joined_path(&path, name);
        Err(self.err_at(
            ParseErrorKind::MissingIdentifier,
            format!("'{joined}' was not declared"),
            tok,
        ))
    }

    pub(crate) fn joined_path(&self, path: &[Symbol], name: Symbol) -> String {
        let mut out = String::new();
        for seg in path {
            out.push_str(&self.resolve(*seg));
            out.push_str("::");
        }
        out.push_str(&self.resolve(name));
        out
    }

    /// The whole path (no trailing name) as a registered type, for
    /// `Class::member` resolution.
    fn lookup_qualified_path_type(&self, absolute: bool, path: &[Symbol]) -> Option<crate::types::TypeId> {
        let (last, rest) = path.split_last()?;
        self.lookup_qualified_type(absolute, rest, *last)
    }

    // ------------------------------------------------------------------
    // Intrinsics

    fn parse_type_trait(&mut self, name_tok: Token) -> ParseResult<NodeId> {
        self.expect(TokenKind::LParen, "'(' after type trait")?;
        let mut type_args = Vec::new();
        if self.peek() != TokenKind::RParen {
            loop {
                let ty = self.parse_type_specifier()?;
                type_args.push(ty);
                if !self.consume(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')' after type trait arguments")?;
        let name = name_tok.lexeme;
        let value = self.evaluate_type_trait(name, &type_args);
        Ok(self.alloc(Node::TypeTraitExpr {
            name,
            type_args,
            value,
        }))
    }

    /// Compiler type predicates. `None` when any argument is dependent.
    pub(crate) fn evaluate_type_trait(
        &self,
        name: Symbol,
        args: &[TypeSpecifier],
    ) -> Option<bool> {
        if args.iter().any(|a| self.type_is_dependent(a)) {
            return None;
        }
        let resolved: Vec<TypeSpecifier> =
            args.iter().map(|a| self.types.resolve_alias(a)).collect();
        let first = resolved.first()?;
        let text = self.resolve(name);
        Some(match &*text {
            "__is_void" => first.is_void(),
            "__is_integral" => first.is_integral(),
            "__is_floating_point" => first.is_floating(),
            "__is_arithmetic" => first.is_arithmetic(),
            "__is_pointer" => first.is_pointer(),
            "__is_reference" => first.is_reference(),
            "__is_lvalue_reference" => first.ref_kind == RefKind::LValue,
            "__is_rvalue_reference" => first.ref_kind == RefKind::RValue,
            "__is_array" => first.is_array(),
            "__is_const" => first.cv.is_const,
            "__is_volatile" => first.cv.is_volatile,
            "__is_signed" => first.base.is_signed() && first.is_integral(),
            "__is_unsigned" => first.is_integral() && !first.base.is_signed(),
            "__is_class" => first.base == BaseKind::Struct && !self.type_is_union(first),
            "__is_union" => self.type_is_union(first),
            "__is_enum" => first.base == BaseKind::Enum,
            "__is_fundamental" => first.is_arithmetic() || first.is_void(),
            "__is_compound" => !(first.is_arithmetic() || first.is_void()),
            "__is_empty" => self.type_is_empty_class(first),
            "__is_final" => self.type_is_final(first),
            "__is_abstract" => false,
            "__is_polymorphic" => self.type_has_vtable(first),
            "__is_same" | "__is_same_as" => {
                let second = resolved.get(1)?;
                first.shape_eq(second) && first.cv == second.cv
            }
            "__is_base_of" => {
                let second = resolved.get(1)?;
                match (first.type_id, second.type_id) {
                    (Some(base), Some(derived)) => {
                        crate::overload::type_derives_from(&self.types, derived, base)
                    }
                    _ => false,
                }
            }
            "__is_constructible" | "__is_trivially_constructible"
            | "__is_nothrow_constructible" => first.is_arithmetic() || first.is_pointer()
                || first.base == BaseKind::Struct,
            "__is_trivially_copyable" | "__is_trivial" | "__is_standard_layout" => {
                first.is_arithmetic() || first.is_pointer() || first.base == BaseKind::Enum
            }
            "__has_virtual_destructor" => false,
            _ => return None,
        })
    }

    fn type_is_union(&self, ty: &TypeSpecifier) -> bool {
        ty.type_id
            .and_then(|id| self.types.get(id).struct_info.as_ref().map(|s| s.is_union))
            .unwrap_or(false)
    }

    fn type_is_empty_class(&self, ty: &TypeSpecifier) -> bool {
        ty.type_id
            .and_then(|id| {
                self.types
                    .get(id)
                    .struct_info
                    .as_ref()
                    .map(|s| s.is_empty_for_layout())
            })
            .unwrap_or(false)
    }

    fn type_is_final(&self, ty: &TypeSpecifier) -> bool {
        ty.type_id
            .and_then(|id| self.types.get(id).struct_info.as_ref().map(|s| s.is_final))
            .unwrap_or(false)
    }

    fn type_has_vtable(&self, ty: &TypeSpecifier) -> bool {
        ty.type_id
            .and_then(|id| self.types.get(id).struct_info.as_ref().map(|s| s.has_vtable))
            .unwrap_or(false)
    }

    fn parse_builtin_call(&mut self, name_tok: Token) -> ParseResult<NodeId> {
        let text = self.lexeme(&name_tok).to_string();
        match text.as_str() {
            // Takes a type as its second operand.
            "__builtin_va_arg" => {
                self.expect(TokenKind::LParen, "'(' after '__builtin_va_arg'")?;
                let expr = self.parse_assignment_expression()?;
                self.expect(TokenKind::Comma, "',' in '__builtin_va_arg'")?;
                let target = self.parse_type_specifier()?;
                self.expect(TokenKind::RParen, "')' after '__builtin_va_arg'")?;
                Ok(self.alloc(Node::Cast {
                    kind: CastKind::CStyle,
                    target,
                    expr,
                }))
            }
            // Bypasses operator& overload resolution; identical to unary
            // `&` here because unary `&` never resolves overloads either.
            "__builtin_addressof" => {
                self.expect(TokenKind::LParen, "'(' after '__builtin_addressof'")?;
                let operand = self.parse_assignment_expression()?;
                self.expect(TokenKind::RParen, "')' after '__builtin_addressof'")?;
                Ok(self.alloc(Node::UnaryOp {
                    op: UnaryOp::AddrOf,
                    operand,
                }))
            }
            _ => {
                let callee = self.alloc(Node::Identifier {
                    name: name_tok.lexeme,
                    decl: None,
                });
                let args = self.parse_call_arguments()?;
                Ok(self.alloc(Node::FunctionCall {
                    callee,
                    args,
                    resolved: None,
                }))
            }
        }
    }

    // ------------------------------------------------------------------
    // Literals

    fn parse_int_literal(&mut self) -> ParseResult<NodeId> {
        let tok = self.advance();
        let raw = self.lexeme(&tok);
        let cleaned: String = raw.chars().filter(|c| *c != '\'').collect();
        let body = cleaned.trim_end_matches(['u', 'U', 'l', 'L']);
        let suffix = &cleaned[body.len()..];
        let unsigned = suffix.contains(['u', 'U']);
        let long_long = suffix.matches(['l', 'L']).count() >= 2;
        let long_ = suffix.matches(['l', 'L']).count() == 1;

        let parsed = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X"))
        {
            u64::from_str_radix(hex, 16)
        } else if let Some(bin) = body.strip_prefix("0b").or_else(|| body.strip_prefix("0B")) {
            u64::from_str_radix(bin, 2)
        } else if body.len() > 1 && body.starts_with('0') {
            u64::from_str_radix(&body[1..], 8)
        } else {
            body.parse::<u64>()
        };
        let magnitude = parsed.map_err(|_| {
            self.err_at(ParseErrorKind::UnexpectedToken, "malformed integer literal", tok)
        })?;

        let base = match (unsigned, long_long, long_) {
            (true, true, _) => BaseKind::ULongLong,
            (true, _, true) => BaseKind::ULong,
            (true, _, _) => BaseKind::UInt,
            (false, true, _) => BaseKind::LongLong,
            (false, _, true) => BaseKind::Long,
            (false, _, _) => BaseKind::Int,
        };
        let bits = base.fixed_bits(&self.options).unwrap_or(32);
        let ty = TypeSpecifier::builtin(base, bits);
        let value = if unsigned {
            ConstValue::UInt(magnitude)
        } else {
            ConstValue::Int(magnitude as i64)
        };
        Ok(self.alloc(Node::NumericLiteral { value, ty }))
    }

    fn parse_float_literal(&mut self) -> ParseResult<NodeId> {
        let tok = self.advance();
        let raw = self.lexeme(&tok);
        let cleaned: String = raw.chars().filter(|c| *c != '\'').collect();
        let body = cleaned.trim_end_matches(['f', 'F', 'l', 'L']);
        let is_float = cleaned.ends_with(['f', 'F']);
        let value: f64 = body.parse().map_err(|_| {
            self.err_at(ParseErrorKind::UnexpectedToken, "malformed floating literal", tok)
        })?;
        let base = if is_float {
            BaseKind::Float
        } else {
            BaseKind::Double
        };
        let bits = base.fixed_bits(&self.options).unwrap_or(64);
        Ok(self.alloc(Node::NumericLiteral {
            value: ConstValue::Float(value),
            ty: TypeSpecifier::builtin(base, bits),
        }))
    }

    fn parse_char_literal(&mut self) -> ParseResult<NodeId> {
        let tok = self.advance();
        let raw = self.lexeme(&tok);
        let inner = raw
            .trim_start_matches(['u', 'U', 'L', '8'])
            .trim_matches('\'');
        let value = unescape_char(inner);
        Ok(self.alloc(Node::CharLiteral { value }))
    }

    fn parse_string_literal(&mut self) -> ParseResult<NodeId> {
        let mut content = String::new();
        // Adjacent string literals concatenate.
        while self.peek() == TokenKind::StrLit {
            let tok = self.advance();
            let raw = self.lexeme(&tok);
            if let Some(body) = string_literal_body(&raw) {
                content.push_str(body);
            }
        }
        let value = self.intern(&content);
        Ok(self.alloc(Node::StringLiteral { value }))
    }

    // ------------------------------------------------------------------
    // Explicit template arguments

    /// Balanced `<...>` sequence of type and value arguments. Handles the
    /// `>>` token closing two lists.
    pub(crate) fn parse_explicit_template_arguments(&mut self) -> ParseResult<Vec<TemplateArg>> {
        self.expect(TokenKind::Lt, "'<' opening template arguments")?;
        let mut args = Vec::new();
        if self.at_template_close() {
            self.consume_template_close()?;
            return Ok(args);
        }
        loop {
            args.push(self.parse_template_argument()?);
            if self.consume(TokenKind::Comma) {
                continue;
            }
            self.consume_template_close()?;
            break;
        }
        Ok(args)
    }

    pub(crate) fn parse_template_argument(&mut self) -> ParseResult<TemplateArg> {
        // Type interpretation wins when it parses cleanly up to a
        // delimiter.
        let ty = self.try_speculate(|p| {
            let mut ty = p.parse_type_specifier()?;
            if p.peek() == TokenKind::Ellipsis {
                p.advance();
                ty.pack_expansion = true;
            }
            if !matches!(p.peek(), TokenKind::Comma | TokenKind::Gt | TokenKind::Shr) {
                return Err(p.err_here(ParseErrorKind::UnexpectedToken, "not a type argument"));
            }
            Ok(ty)
        });
        if let Some(ty) = ty {
            return Ok(TemplateArg::Type(ty));
        }

        // Otherwise a constant expression (non-type argument).
        let expr =
            self.with_expr_context(ExprContext::TemplateArgument, |p| p.parse_expression(4))?;
        let dependent = self.expr_is_dependent(expr);
        if dependent {
            // Keep the spelling; substitution re-evaluates.
            let name = self.expr_spelling(expr);
            return Ok(TemplateArg::Type(TypeSpecifier::user_defined(
                self.intern(&name),
                None,
            )));
        }
        let value = self
            .eval_const_expr(expr)
            .map_err(|e| self.err_here(ParseErrorKind::NotConstant, e.message))?;
        let ty = self
            .expr_type(expr)
            .unwrap_or_else(TypeSpecifier::int);
        Ok(TemplateArg::Value {
            ty,
            value: value.to_const_value(),
        })
    }

    fn at_template_close(&self) -> bool {
        matches!(self.peek(), TokenKind::Gt | TokenKind::Shr)
    }

    /// Consume one closing `>`, splitting a `>>` in two.
    pub(crate) fn consume_template_close(&mut self) -> ParseResult<()> {
        if self.pending_gt {
            if self.peek() == TokenKind::Shr {
                self.pending_gt = false;
                self.advance();
                return Ok(());
            }
            return Err(self.err_here(
                ParseErrorKind::UnexpectedToken,
                "expected '>' closing template arguments",
            ));
        }
        if self.consume(TokenKind::Gt) {
            return Ok(());
        }
        if self.peek() == TokenKind::Shr {
            // First half of `>>`; leave the token for the outer list.
            self.pending_gt = true;
            return Ok(());
        }
        Err(self.err_here(
            ParseErrorKind::UnexpectedToken,
            "expected '>' closing template arguments",
        ))
    }

    // ------------------------------------------------------------------
    // requires-expression

    pub(crate) fn parse_requires_expression(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::KwRequires, "'requires'")?;

        let mut params: Vec<Param> = Vec::new();
        if self.peek() == TokenKind::LParen {
            self.advance();
            if self.peek() != TokenKind::RParen {
                loop {
                    let ty = self.parse_type_specifier()?;
                    let name = if self.peek() == TokenKind::Identifier {
                        Some(self.advance().lexeme)
                    } else {
                        None
                    };
                    params.push(Param {
                        name,
                        ty,
                        default: None,
                        decl: None,
                    });
                    if !self.consume(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RParen, "')' after requires parameters")?;
        }

        self.expect(TokenKind::LBrace, "'{' opening requirement body")?;

        // Requirement parameters get a scope so simple requirements can
        // reference them; each requirement is a speculative SFINAE parse.
        let (requirements, all_satisfied, any_dependent) =
            self.with_scope(ScopeKind::Block, |p| {
                for param in &params {
                    if let Some(name) = param.name {
                        let decl = p.alloc(Node::VarDecl(crate::ast::VarDecl {
                            name,
                            ty: param.ty.clone(),
                            init: None,
                            linkage: crate::ast::Linkage::None,
                            is_static: false,
                            is_constexpr: false,
                            is_extern: false,
                            is_thread_local: false,
                            const_value: None,
                        }));
                        p.symbols.declare(name, decl);
                    }
                }
                p.parse_requirement_seq(&params)
            })?;

        self.expect(TokenKind::RBrace, "'}' closing requirement body")?;

        let value = if any_dependent {
            None
        } else {
            Some(all_satisfied)
        };
        Ok(self.alloc(Node::RequiresExpression {
            params,
            requirements,
            value,
        }))
    }

    fn parse_requirement_seq(
        &mut self,
        params: &[Param],
    ) -> ParseResult<(Vec<Requirement>, bool, bool)> {
        let mut requirements = Vec::new();
        let mut all_satisfied = true;
        let any_dependent = params.iter().any(|p| self.type_is_dependent(&p.ty))
            || self.in_template();

        while self.peek() != TokenKind::RBrace && !self.cursor.is_eof() {
            match self.peek() {
                // type requirement: `typename T::value_type;`
                TokenKind::KwTypename => {
                    let parsed = self.with_sfinae(|p| {
                        p.speculate(|p| {
                            let ty = p.parse_type_specifier()?;
                            p.expect(TokenKind::Semi, "';' after type requirement")?;
                            Ok(ty)
                        })
                    });
                    match parsed {
                        Ok(ty) => requirements.push(Requirement::Type(ty)),
                        Err(_) => {
                            all_satisfied = false;
                            self.skip_to_semi_in_braces();
                        }
                    }
                }
                // nested requirement: `requires expr;`
                TokenKind::KwRequires => {
                    self.advance();
                    let expr = self.with_expr_context(ExprContext::RequiresClause, |p| {
                        p.parse_expression(2)
                    })?;
                    self.expect(TokenKind::Semi, "';' after nested requirement")?;
                    match self.eval_const_expr(expr) {
                        Ok(v) => {
                            if !v.as_bool() {
                                all_satisfied = false;
                            }
                        }
                        Err(e) if e.kind == crate::consteval::EvalErrorKind::TemplateDependent => {}
                        Err(_) => all_satisfied = false,
                    }
                    requirements.push(Requirement::Nested(expr));
                }
                // compound requirement: `{ expr } noexcept -> Concept<...>;`
                TokenKind::LBrace => {
                    self.advance();
                    let parsed = self.with_sfinae(|p| {
                        p.speculate(|p| p.parse_expression(0))
                    });
                    let expr = match parsed {
                        Ok(e) => e,
                        Err(_) => {
                            all_satisfied = false;
                            self.skip_to_semi_in_braces();
                            continue;
                        }
                    };
                    self.expect(TokenKind::RBrace, "'}' after compound requirement")?;
                    let noexcept_req = self.consume(TokenKind::KwNoexcept);
                    let mut constraint = None;
                    if self.consume(TokenKind::Arrow) {
                        let tok = self.expect(TokenKind::Identifier, "a concept name")?;
                        let concept_name = tok.lexeme;
                        let args = if self.peek() == TokenKind::Lt {
                            self.parse_explicit_template_arguments()?
                        } else {
                            Vec::new()
                        };
                        if self.templates.is_concept(concept_name) {
                            // The expression's type is prepended to the
                            // argument list, per the compound form.
                            let mut full_args = Vec::new();
                            if let Some(ty) = self.expr_type(expr) {
                                full_args.push(TemplateArg::Type(ty));
                            }
                            full_args.extend(args);
                            match self.evaluate_concept(concept_name, &full_args)? {
                                Some(true) => {}
                                Some(false) => all_satisfied = false,
                                None => {}
                            }
                            let type_args = full_args
                                .iter()
                                .map(|a| self.template_arg_as_spec(a))
                                .collect();
                            constraint = Some(self.alloc(Node::TypeTraitExpr {
                                name: concept_name,
                                type_args,
                                value: None,
                            }));
                        } else {
                            all_satisfied = false;
                        }
                    }
                    self.expect(TokenKind::Semi, "';' after compound requirement")?;
                    requirements.push(Requirement::Compound {
                        expr,
                        noexcept: noexcept_req,
                        constraint,
                    });
                }
                // simple requirement: `expr;`
                _ => {
                    let parsed = self.with_sfinae(|p| {
                        p.speculate(|p| {
                            let e = p.parse_expression(0)?;
                            p.expect(TokenKind::Semi, "';' after requirement")?;
                            Ok(e)
                        })
                    });
                    match parsed {
                        Ok(expr) => requirements.push(Requirement::Simple(expr)),
                        Err(_) => {
                            all_satisfied = false;
                            self.skip_to_semi_in_braces();
                        }
                    }
                }
            }
        }

        Ok((requirements, all_satisfied, any_dependent))
    }

    /// Recovery inside a requirement body: skip the failed requirement up
    /// to its terminating `;`, balancing nested delimiters.
    fn skip_to_semi_in_braces(&mut self) {
        let mut depth = 0i32;
        while !self.cursor.is_eof() {
            match self.peek() {
                TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::RParen | TokenKind::RBracket => {
                    depth -= 1;
                    self.advance();
                }
                TokenKind::RBrace => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    self.advance();
                }
                TokenKind::Semi => {
                    self.advance();
                    if depth <= 0 {
                        break;
                    }
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Calls

    pub(crate) fn build_call(&mut self, callee: NodeId, args: Vec<NodeId>) -> ParseResult<NodeId> {
        let callee_node = self.arena.get(callee).clone();
        match callee_node {
            Node::Identifier { name, decl } => self.resolve_free_call(callee, name, decl, args),
            Node::QualifiedIdentifier {
                ref path,
                name,
                decl,
            } => {
                let path = path.clone();
                self.resolve_qualified_call(callee, path, name, decl, args)
            }
            Node::MemberAccess {
                object,
                member,
                arrow,
            } => self.build_member_call(object, member, arrow, Vec::new(), args),
            _ => {
                // Calling the result of an arbitrary expression (function
                // pointer, closure object).
                if let Some(ty) = self.expr_type(callee)
                    && ty.base == BaseKind::Struct
                {
                    let op = self.intern("operator()");
                    let object = callee;
                    return self.build_member_call(object, op, false, Vec::new(), args);
                }
                Ok(self.alloc(Node::FunctionCall {
                    callee,
                    args,
                    resolved: None,
                }))
            }
        }
    }

    fn call_args_info(&mut self, args: &[NodeId]) -> Option<Vec<CallArg>> {
        let mut out = Vec::with_capacity(args.len());
        for &arg in args {
            let ty = self.expr_type(arg)?;
            out.push(CallArg {
                ty,
                is_lvalue: self.is_lvalue_expr(arg),
            });
        }
        Some(out)
    }

    fn resolve_free_call(
        &mut self,
        callee: NodeId,
        name: Symbol,
        decl: Option<NodeId>,
        args: Vec<NodeId>,
    ) -> ParseResult<NodeId> {
        // Callee already bound to one declaration (explicit template
        // arguments, or a variable of closure type).
        if let Some(decl_id) = decl {
            match self.arena.get(decl_id) {
                Node::FunctionDecl(_) => {
                    // A single pre-resolved function; still check the
                    // overload set in scope for a better match.
                }
                Node::VarDecl(v) => {
                    let ty = v.ty.clone();
                    if ty.base == BaseKind::Struct && ty.ptr.is_empty() {
                        let op = self.intern("operator()");
                        return self.build_member_call(callee, op, false, Vec::new(), args);
                    }
                    // Calling through a function pointer.
                    return Ok(self.alloc(Node::FunctionCall {
                        callee,
                        args,
                        resolved: None,
                    }));
                }
                _ => {}
            }
        }

        let arg_info = self.call_args_info(&args);
        let Some(arg_info) = arg_info else {
            // Dependent arguments: leave unresolved for substitution.
            return Ok(self.alloc(Node::FunctionCall {
                callee,
                args,
                resolved: None,
            }));
        };

        let mut candidates: Vec<NodeId> = self
            .symbols
            .lookup(name)
            .into_iter()
            .filter(|&id| matches!(self.arena.get(id), Node::FunctionDecl(_)))
            .collect();
        if let Some(d) = decl
            && matches!(self.arena.get(d), Node::FunctionDecl(_))
            && !candidates.contains(&d)
        {
            candidates.push(d);
        }

        // Prefer a non-template exact match before deduction.
        if !candidates.is_empty()
            && let Ok(win) = overload::resolve(&self.arena, &self.types, &candidates, &arg_info)
            && self.is_exact_match(win, &arg_info)
        {
            return Ok(self.alloc(Node::FunctionCall {
                callee,
                args,
                resolved: Some(win),
            }));
        }

        // Deduce and instantiate function templates under this name.
        if self.templates.functions.contains_key(&name) {
            let instantiated = self.deduce_and_instantiate_functions(name, &arg_info)?;
            candidates.extend(instantiated);
        }

        if candidates.is_empty() {
            if self.in_template() && !self.in_sfinae() {
                return Ok(self.alloc(Node::FunctionCall {
                    callee,
                    args,
                    resolved: None,
                }));
            }
            return Err(self.err_here(
                ParseErrorKind::MissingIdentifier,
                format!("no function '{}' to call", self.resolve(name)),
            ));
        }

        match overload::resolve(&self.arena, &self.types, &candidates, &arg_info) {
            Ok(win) => Ok(self.alloc(Node::FunctionCall {
                callee,
                args,
                resolved: Some(win),
            })),
            Err(overload::OverloadError::Ambiguous(set)) => Err(self.err_here(
                ParseErrorKind::AmbiguousOverload,
                format!(
                    "call to '{}' is ambiguous ({} candidates)",
                    self.resolve(name),
                    set.len()
                ),
            )),
            Err(overload::OverloadError::NoViable) => {
                if self.in_template() && !self.in_sfinae() {
                    return Ok(self.alloc(Node::FunctionCall {
                        callee,
                        args,
                        resolved: None,
                    }));
                }
                Err(self.err_here(
                    ParseErrorKind::MissingIdentifier,
                    format!("no matching overload for '{}'", self.resolve(name)),
                ))
            }
        }
    }

    fn is_exact_match(&self, decl: NodeId, args: &[CallArg]) -> bool {
        let Node::FunctionDecl(f) = self.arena.get(decl) else {
            return false;
        };
        if f.params.len() != args.len() {
            return false;
        }
        f.params.iter().zip(args).all(|(p, a)| {
            overload::rank_conversion(&self.types, a, &p.ty)
                == Some(overload::ConversionRank::Exact)
        })
    }

    fn resolve_qualified_call(
        &mut self,
        callee: NodeId,
        path: Vec<Symbol>,
        name: Symbol,
        decl: Option<NodeId>,
        args: Vec<NodeId>,
    ) -> ParseResult<NodeId> {
        let arg_info = self.call_args_info(&args);
        let mut candidates: Vec<NodeId> = self
            .symbols
            .qualified_lookup(&path, name, false)
            .into_iter()
            .filter(|&id| matches!(self.arena.get(id), Node::FunctionDecl(_)))
            .collect();
        if let Some(d) = decl
            && matches!(self.arena.get(d), Node::FunctionDecl(_))
            && !candidates.contains(&d)
        {
            candidates.push(d);
        }

        // Static member function call `S::f(...)`.
        if candidates.is_empty()
            && let Some((last, rest)) = path.split_last()
            && let Some(type_id) = self.lookup_qualified_type(false, rest, *last)
        {
            self.ensure_member_instantiated(type_id, name)?;
            if let Some(info) = &self.types.get(type_id).struct_info {
                candidates = info
                    .member_functions
                    .iter()
                    .copied()
                    .filter(|&f| {
                        matches!(self.arena.get(f), Node::FunctionDecl(d) if d.name == name)
                    })
                    .collect();
            }
        }

        let Some(arg_info) = arg_info else {
            return Ok(self.alloc(Node::FunctionCall {
                callee,
                args,
                resolved: None,
            }));
        };
        if candidates.is_empty() {
            if self.in_template() && !self.in_sfinae() {
                return Ok(self.alloc(Node::FunctionCall {
                    callee,
                    args,
                    resolved: None,
                }));
            }
            return Err(self.err_here(
                ParseErrorKind::MissingIdentifier,
                format!("no function '{}' to call", self.joined_path(&path, name)),
            ));
        }
        match overload::resolve(&self.arena, &self.types, &candidates, &arg_info) {
            Ok(win) => Ok(self.alloc(Node::FunctionCall {
                callee,
                args,
                resolved: Some(win),
            })),
            Err(overload::OverloadError::Ambiguous(set)) => Err(self.err_here(
                ParseErrorKind::AmbiguousOverload,
                format!(
                    "call to '{}' is ambiguous ({} candidates)",
                    self.joined_path(&path, name),
                    set.len()
                ),
            )),
            Err(overload::OverloadError::NoViable) => Err(self.err_here(
                ParseErrorKind::MissingIdentifier,
                format!("no matching overload for '{}'", self.joined_path(&path, name)),
            )),
        }
    }

    pub(crate) fn build_member_call(
        &mut self,
        object: NodeId,
        member: Symbol,
        arrow: bool,
        template_args: Vec<TemplateArg>,
        args: Vec<NodeId>,
    ) -> ParseResult<NodeId> {
        let object_ty = self.expr_type(object);
        let Some(object_ty) = object_ty else {
            return Ok(self.alloc(Node::MemberFunctionCall {
                object,
                member,
                args,
                arrow,
                template_args: Vec::new(),
                resolved: None,
            }));
        };
        let Some(class_id) = object_ty.type_id else {
            return Ok(self.alloc(Node::MemberFunctionCall {
                object,
                member,
                args,
                arrow,
                template_args: Vec::new(),
                resolved: None,
            }));
        };

        // Member-function use is an ODR-use: escalate lazy instantiation
        // to Full for this member.
        self.ensure_member_instantiated(class_id, member)?;

        let arg_info = self.call_args_info(&args);
        let mut candidates = self.collect_member_candidates(class_id, member);

        // Generic members (lambda operator(), member templates) deduce
        // from the call arguments.
        if let Some(ref info) = arg_info {
            let generic = self.instantiate_generic_members(class_id, member, info, &template_args)?;
            candidates.extend(generic);
        }

        // Implicit-object viability: the candidate's cv/ref qualifiers
        // must accept this object, before parameter ranking runs.
        let mut effective_object_ty = object_ty.clone();
        if arrow {
            effective_object_ty = effective_object_ty.pointee();
        }
        let object_const = effective_object_ty.cv.is_const;
        let object_is_lvalue = arrow || self.is_lvalue_expr(object);
        let had_candidates = !candidates.is_empty();
        candidates = self.filter_member_candidates(candidates, object_const, object_is_lvalue);
        if candidates.is_empty() && had_candidates && (!self.in_template() || self.in_sfinae()) {
            return Err(self.err_here(
                ParseErrorKind::MissingIdentifier,
                format!(
                    "no member function '{}' is viable for this object",
                    self.resolve(member)
                ),
            ));
        }

        let resolved = match (&arg_info, candidates.len()) {
            (None, _) | (_, 0) => None,
            (Some(info), _) => {
                match overload::resolve(&self.arena, &self.types, &candidates, info) {
                    Ok(win) => Some(win),
                    Err(overload::OverloadError::Ambiguous(set)) => {
                        return Err(self.err_here(
                            ParseErrorKind::AmbiguousOverload,
                            format!(
                                "call to member '{}' is ambiguous ({} candidates)",
                                self.resolve(member),
                                set.len()
                            ),
                        ));
                    }
                    Err(overload::OverloadError::NoViable) => {
                        if self.in_template() && !self.in_sfinae() {
                            None
                        } else {
                            return Err(self.err_here(
                                ParseErrorKind::MissingIdentifier,
                                format!(
                                    "no matching member function '{}'",
                                    self.resolve(member)
                                ),
                            ));
                        }
                    }
                }
            }
        };

        Ok(self.alloc(Node::MemberFunctionCall {
            object,
            member,
            args,
            arrow,
            template_args: Vec::new(),
            resolved,
        }))
    }

    /// Resolve a bare name against the current class: static members by
    /// declaration, data members through an implicit `this`, member
    /// functions by their declaration node. Bases are searched after the
    /// class itself.
    fn resolve_class_member(&mut self, class_id: crate::types::TypeId, name: Symbol) -> Option<NodeId> {
        let mut stack = vec![class_id];
        while let Some(id) = stack.pop() {
            let (static_decl, is_field, fn_decl, bases) = {
                let Some(info) = &self.types.get(id).struct_info else {
                    continue;
                };
                (
                    info.find_static(name).and_then(|m| m.decl),
                    info.find_member(name).is_some(),
                    info.member_functions.iter().copied().find(|&f| {
                        matches!(self.arena.get(f), Node::FunctionDecl(d) if d.name == name)
                    }),
                    info.bases
                        .iter()
                        .filter_map(|b| b.type_id)
                        .collect::<Vec<_>>(),
                )
            };
            if let Some(decl) = static_decl {
                let class_name = self.types.get(id).name;
                return Some(self.alloc(Node::QualifiedIdentifier {
                    path: vec![class_name],
                    name,
                    decl: Some(decl),
                }));
            }
            if is_field {
                let this = self.alloc(Node::ThisExpr);
                return Some(self.alloc(Node::MemberAccess {
                    object: this,
                    member: name,
                    arrow: true,
                }));
            }
            if let Some(decl) = fn_decl {
                return Some(self.alloc(Node::Identifier {
                    name,
                    decl: Some(decl),
                }));
            }
            stack.extend(bases);
        }
        None
    }

    /// Implicit-object viability and preference. A non-const member is not
    /// viable on a const object; a `&`-qualified member needs an lvalue
    /// object and a `&&`-qualified one an rvalue. On a non-const object a
    /// non-const member beats its const-qualified twin (the implicit object
    /// argument converts exactly), so the const ones drop out rather than
    /// tying the ranking into a false ambiguity. Static members take no
    /// object and always pass.
    fn filter_member_candidates(
        &self,
        candidates: Vec<NodeId>,
        object_const: bool,
        object_is_lvalue: bool,
    ) -> Vec<NodeId> {
        let viable: Vec<NodeId> = candidates
            .into_iter()
            .filter(|&cand| {
                let Node::FunctionDecl(f) = self.arena.get(cand) else {
                    return false;
                };
                if f.flags.is_static {
                    return true;
                }
                if object_const && !f.cv.is_const {
                    return false;
                }
                match f.ref_qual {
                    RefKind::None => true,
                    RefKind::LValue => object_is_lvalue,
                    RefKind::RValue => !object_is_lvalue,
                }
            })
            .collect();

        if !object_const {
            let has_unqualified = viable.iter().any(|&cand| {
                matches!(self.arena.get(cand),
                    Node::FunctionDecl(f) if !f.cv.is_const && !f.flags.is_static)
            });
            if has_unqualified {
                return viable
                    .into_iter()
                    .filter(|&cand| {
                        matches!(self.arena.get(cand),
                            Node::FunctionDecl(f) if !f.cv.is_const || f.flags.is_static)
                    })
                    .collect();
            }
        }
        viable
    }

    /// Member functions named `member` in `class_id` and its bases.
    pub(crate) fn collect_member_candidates(
        &self,
        class_id: crate::types::TypeId,
        member: Symbol,
    ) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![class_id];
        while let Some(id) = stack.pop() {
            let Some(info) = &self.types.get(id).struct_info else {
                continue;
            };
            for &f in &info.member_functions {
                if matches!(self.arena.get(f), Node::FunctionDecl(d) if d.name == member)
                    && !out.contains(&f)
                {
                    out.push(f);
                }
            }
            for base in &info.bases {
                if let Some(base_id) = base.type_id {
                    stack.push(base_id);
                }
            }
        }
        out
    }

    // ------------------------------------------------------------------
    // Expression classification

    /// Constant-evaluate an expression with the parser's current context.
    pub(crate) fn eval_const_expr(
        &self,
        expr: NodeId,
    ) -> Result<consteval::Value, consteval::EvalError> {
        let ctx = EvalContext {
            arena: &self.arena,
            types: &self.types,
            symbols: &self.symbols,
            interner: &self.interner,
            options: &self.options,
            struct_context: self.current_struct().map(|s| s.type_id),
            template_params: self.current_template_param_names(),
        };
        consteval::evaluate(&ctx, expr)
    }

    pub(crate) fn const_u64(&self, expr: NodeId) -> Option<u64> {
        self.eval_const_expr(expr)
            .ok()
            .map(|v| v.as_i64().max(0) as u64)
    }

    /// Syntactic lvalues, per the forwarding-reference adjustment: named
    /// variables, subscripts, dereferences, member accesses, string
    /// literals.
    pub(crate) fn is_lvalue_expr(&self, expr: NodeId) -> bool {
        match self.arena.get(expr) {
            Node::Identifier { decl, .. } => {
                decl.is_some_and(|d| matches!(self.arena.get(d), Node::VarDecl(_)))
            }
            Node::QualifiedIdentifier { decl, .. } => {
                decl.is_some_and(|d| matches!(self.arena.get(d), Node::VarDecl(_)))
            }
            Node::ArraySubscript { .. }
            | Node::MemberAccess { .. }
            | Node::StringLiteral { .. } => true,
            Node::UnaryOp {
                op: UnaryOp::Deref, ..
            } => true,
            _ => false,
        }
    }

    /// Mentions an unbound name or template parameter anywhere.
    pub(crate) fn expr_is_dependent(&self, expr: NodeId) -> bool {
        match self.arena.get(expr) {
            Node::TemplateParameterReference { .. } | Node::SizeofPack { .. } => true,
            Node::Identifier { decl, name } => {
                decl.is_none()
                    && (self.find_template_param(*name).is_some()
                        || !self.templates.functions.contains_key(name))
            }
            Node::QualifiedIdentifier { decl, .. } => decl.is_none(),
            Node::BinaryOp { lhs, rhs, .. } => {
                self.expr_is_dependent(*lhs) || self.expr_is_dependent(*rhs)
            }
            Node::UnaryOp { operand, .. } => self.expr_is_dependent(*operand),
            Node::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                self.expr_is_dependent(*cond)
                    || self.expr_is_dependent(*then_expr)
                    || self.expr_is_dependent(*else_expr)
            }
            Node::SizeofExpr { arg } | Node::AlignofExpr { arg } => match arg {
                SizeofArg::Type(ty) => self.type_is_dependent(ty),
                SizeofArg::Expr(e) => self.expr_is_dependent(*e),
            },
            Node::TypeTraitExpr { value, .. } | Node::RequiresExpression { value, .. } => {
                value.is_none()
            }
            Node::FunctionCall { resolved, args, .. } => {
                resolved.is_none() || args.iter().any(|&a| self.expr_is_dependent(a))
            }
            _ => false,
        }
    }

    /// Source-ish spelling for dependent non-type arguments; only used to
    /// key substitution.
    pub(crate) fn expr_spelling(&self, expr: NodeId) -> String {
        match self.arena.get(expr) {
            Node::Identifier { name, .. }
            | Node::TemplateParameterReference { name, .. } => self.resolve(*name).to_string(),
            Node::QualifiedIdentifier { path, name, .. } => self.joined_path(path, *name),
            Node::SizeofPack { pack } => format!("sizeof...({})", self.resolve(*pack)),
            Node::BinaryOp { op, lhs, rhs } => format!(
                "{}{}{}",
                self.expr_spelling(*lhs),
                op.token(),
                self.expr_spelling(*rhs)
            ),
            Node::NumericLiteral { value, .. } => match value {
                ConstValue::Int(v) => v.to_string(),
                ConstValue::UInt(v) => v.to_string(),
                ConstValue::Bool(v) => v.to_string(),
                ConstValue::Float(v) => v.to_string(),
            },
            _ => "<expr>".to_string(),
        }
    }

    /// Static type of an expression, as far as the parser tracks it.
    pub(crate) fn expr_type(&self, expr: NodeId) -> Option<TypeSpecifier> {
        match self.arena.get(expr) {
            Node::NumericLiteral { ty, .. } => Some(ty.clone()),
            Node::BoolLiteral(_) => Some(TypeSpecifier::bool_()),
            Node::CharLiteral { .. } => Some(TypeSpecifier::builtin(BaseKind::Char, 8)),
            Node::NullptrLiteral => Some(TypeSpecifier::nullptr(&self.options)),
            Node::StringLiteral { value } => {
                let len = self.resolve(*value).len() as u64 + 1;
                let mut ty = TypeSpecifier::builtin(BaseKind::Char, 8).with_const();
                ty.push_array_dim(Some(len), None);
                Some(ty)
            }
            Node::ThisExpr => {
                let class = self.symbols.current_class()?;
                let info = self.types.get(class);
                Some(
                    TypeSpecifier::structure(
                        info.name,
                        class,
                        info.size_bits.min(u64::from(u32::MAX)) as u32,
                    )
                    .add_pointer(CvQual::NONE),
                )
            }
            Node::Identifier { decl, .. } | Node::QualifiedIdentifier { decl, .. } => {
                let decl = (*decl)?;
                match self.arena.get(decl) {
                    Node::VarDecl(v) => Some(v.ty.clone()),
                    Node::FunctionDecl(f) => Some(f.ret.clone()),
                    _ => None,
                }
            }
            Node::TemplateParameterReference { name, .. } => {
                match &self.find_template_param(*name)?.kind {
                    TemplateParamKind::NonType { ty, .. } => Some(ty.clone()),
                    _ => None,
                }
            }
            Node::BinaryOp { op, lhs, rhs } => {
                if op.is_comparison()
                    || matches!(op, BinaryOp::LogicalAnd | BinaryOp::LogicalOr)
                {
                    return Some(TypeSpecifier::bool_());
                }
                if matches!(op, BinaryOp::Comma) {
                    return self.expr_type(*rhs);
                }
                if op.is_assignment() {
                    return self.expr_type(*lhs);
                }
                let l = self.expr_type(*lhs)?;
                let r = self.expr_type(*rhs)?;
                Some(arithmetic_result(&l, &r))
            }
            Node::UnaryOp { op, operand } => {
                let ty = self.expr_type(*operand)?;
                Some(match op {
                    UnaryOp::Not => TypeSpecifier::bool_(),
                    UnaryOp::Deref => ty.pointee(),
                    UnaryOp::AddrOf => ty.add_pointer(CvQual::NONE),
                    _ => ty,
                })
            }
            Node::Ternary { then_expr, .. } => self.expr_type(*then_expr),
            Node::FunctionCall { resolved, .. } => {
                let decl = (*resolved)?;
                match self.arena.get(decl) {
                    Node::FunctionDecl(f) => Some(f.ret.clone()),
                    _ => None,
                }
            }
            Node::MemberFunctionCall { resolved, .. } => {
                let decl = (*resolved)?;
                match self.arena.get(decl) {
                    Node::FunctionDecl(f) => Some(f.ret.clone()),
                    _ => None,
                }
            }
            Node::ConstructorCall { ty, .. } => Some(ty.clone()),
            Node::Cast { target, .. } => Some(target.clone()),
            Node::MemberAccess { object, member, arrow } => {
                let mut obj_ty = self.expr_type(*object)?;
                if *arrow {
                    obj_ty = obj_ty.pointee();
                }
                let id = obj_ty.type_id?;
                let info = self.types.get(id).struct_info.as_ref()?;
                info.find_member(*member)
                    .map(|m| m.ty.clone())
                    .or_else(|| info.find_static(*member).map(|m| m.ty.clone()))
            }
            Node::ArraySubscript { array, .. } => {
                let ty = self.expr_type(*array)?;
                if ty.is_array() {
                    Some(ty.element_type())
                } else if ty.is_pointer() {
                    Some(ty.pointee())
                } else {
                    None
                }
            }
            Node::SizeofExpr { .. } | Node::AlignofExpr { .. } | Node::SizeofPack { .. } => {
                let base = if self.options.pointer_bits() == 64 {
                    BaseKind::ULong
                } else {
                    BaseKind::UInt
                };
                Some(TypeSpecifier::builtin(
                    base,
                    base.fixed_bits(&self.options).unwrap_or(64),
                ))
            }
            Node::TypeTraitExpr { .. }
            | Node::RequiresExpression { .. }
            | Node::NoexceptExpr(_) => Some(TypeSpecifier::bool_()),
            Node::NewExpression { ty, .. } => Some(ty.clone().add_pointer(CvQual::NONE)),
            Node::Lambda(l) => {
                let info = self.types.get(l.closure_type);
                Some(TypeSpecifier::structure(
                    info.name,
                    l.closure_type,
                    info.size_bits.min(u64::from(u32::MAX)) as u32,
                ))
            }
            Node::ExpressionWrapper(inner) | Node::PackExpansion(inner) => self.expr_type(*inner),
            _ => None,
        }
    }
}

/// Tokens that can begin a unary-expression; gates C-style cast
/// acceptance.
fn can_start_expression(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::IntLit
            | TokenKind::FloatLit
            | TokenKind::CharLit
            | TokenKind::StrLit
            | TokenKind::Identifier
            | TokenKind::LParen
            | TokenKind::LBracket
            | TokenKind::KwTrue
            | TokenKind::KwFalse
            | TokenKind::KwNullptr
            | TokenKind::KwThis
            | TokenKind::KwSizeof
            | TokenKind::KwAlignof
            | TokenKind::KwNoexcept
            | TokenKind::KwNew
            | TokenKind::KwDelete
            | TokenKind::KwStaticCast
            | TokenKind::KwDynamicCast
            | TokenKind::KwConstCast
            | TokenKind::KwReinterpretCast
            | TokenKind::KwTypeid
            | TokenKind::KwRequires
            | TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Bang
            | TokenKind::Tilde
            | TokenKind::Star
            | TokenKind::Amp
            | TokenKind::PlusPlus
            | TokenKind::MinusMinus
            | TokenKind::ColonColon
            | TokenKind::KwThrow
    )
}

/// Usual arithmetic conversions, approximated by rank.
fn arithmetic_result(l: &TypeSpecifier, r: &TypeSpecifier) -> TypeSpecifier {
    if l.is_floating() || !l.is_arithmetic() {
        return l.clone();
    }
    if r.is_floating() {
        return r.clone();
    }
    if r.base.rank() > l.base.rank() {
        r.clone()
    } else {
        l.clone()
    }
}

fn string_literal_body(raw: &str) -> Option<&str> {
    let start = raw.find('"')?;
    let end = raw.rfind('"')?;
    if end > start {
        Some(&raw[start + 1..end])
    } else {
        None
    }
}

fn unescape_char(inner: &str) -> i64 {
    let mut chars = inner.chars();
    match chars.next() {
        Some('\\') => match chars.next() {
            Some('n') => 10,
            Some('t') => 9,
            Some('r') => 13,
            Some('0') => 0,
            Some('\\') => 92,
            Some('\'') => 39,
            Some('"') => 34,
            Some('a') => 7,
            Some('b') => 8,
            Some('f') => 12,
            Some('v') => 11,
            Some('x') => i64::from_str_radix(chars.as_str(), 16).unwrap_or(0),
            Some(c) => c as i64,
            None => 0,
        },
        Some(c) => c as i64,
        None => 0,
    }
}
