//! Lambda expressions and closure-type synthesis.
//!
//! Each lambda synthesizes a closure class `__lambda_<n>`: one member per
//! captured variable (by-value copies the type, by-reference stores a
//! pointer, `[this]` stores a `__this` pointer member, `[*this]` a full
//! copy of the enclosing class) and one `operator()` with the parsed
//! parameters. A `=` or `&` capture default expands to explicit captures
//! of every outer-scope variable the body references that is neither a
//! parameter nor a local. Non-capturing lambdas get the 1-byte empty
//! closure layout.

use cxxfront_core::Symbol;

use crate::ast::{
    CaptureDefault, CaptureKind, FnFlags, FunctionDecl, Lambda, LambdaCapture, Linkage, Node,
    NodeId, Param, TemplateParam,
};
use crate::diag::{ParseErrorKind, ParseResult};
use crate::parser::{ExprContext, Parser};
use crate::symbols::ScopeKind;
use crate::token::TokenKind;
use crate::types::{
    Access, CallingConv, CvQual, RefKind, StructMember, StructTypeInfo, TypeInfo, TypeSpecifier,
    compute_struct_layout,
};

impl Parser {
    pub(crate) fn parse_lambda_expression(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::LBracket, "'[' opening lambda capture list")?;

        let mut capture_default = CaptureDefault::None;
        let mut captures: Vec<LambdaCapture> = Vec::new();

        if self.peek() != TokenKind::RBracket {
            loop {
                match self.peek() {
                    TokenKind::Assign
                        if matches!(self.peek_at(1), TokenKind::Comma | TokenKind::RBracket) =>
                    {
                        self.advance();
                        capture_default = CaptureDefault::ByValue;
                    }
                    TokenKind::Amp
                        if matches!(self.peek_at(1), TokenKind::Comma | TokenKind::RBracket) =>
                    {
                        self.advance();
                        capture_default = CaptureDefault::ByRef;
                    }
                    TokenKind::KwThis => {
                        self.advance();
                        captures.push(LambdaCapture {
                            name: None,
                            kind: CaptureKind::This,
                        });
                    }
                    TokenKind::Star if self.peek_at(1) == TokenKind::KwThis => {
                        self.advance();
                        self.advance();
                        captures.push(LambdaCapture {
                            name: None,
                            kind: CaptureKind::StarThis,
                        });
                    }
                    TokenKind::Amp => {
                        self.advance();
                        let tok = self.expect(TokenKind::Identifier, "capture name after '&'")?;
                        if self.consume(TokenKind::Assign) {
                            let init = self.parse_assignment_expression()?;
                            captures.push(LambdaCapture {
                                name: Some(tok.lexeme),
                                kind: CaptureKind::Init {
                                    by_ref: true,
                                    init,
                                },
                            });
                        } else {
                            captures.push(LambdaCapture {
                                name: Some(tok.lexeme),
                                kind: CaptureKind::ByRef,
                            });
                        }
                    }
                    TokenKind::Identifier => {
                        let tok = self.advance();
                        if self.consume(TokenKind::Assign) {
                            let init = self.parse_assignment_expression()?;
                            captures.push(LambdaCapture {
                                name: Some(tok.lexeme),
                                kind: CaptureKind::Init {
                                    by_ref: false,
                                    init,
                                },
                            });
                        } else {
                            captures.push(LambdaCapture {
                                name: Some(tok.lexeme),
                                kind: CaptureKind::ByValue,
                            });
                        }
                    }
                    _ => {
                        return Err(self.err_here(
                            ParseErrorKind::UnexpectedToken,
                            "expected a lambda capture",
                        ));
                    }
                }
                if !self.consume(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBracket, "']' closing lambda capture list")?;

        // Explicit template parameters (C++20).
        let mut template_params: Vec<TemplateParam> = Vec::new();
        if self.peek() == TokenKind::Lt {
            template_params = self.parse_template_parameter_list()?;
        }
        let has_explicit_tparams = !template_params.is_empty();
        if has_explicit_tparams {
            self.template_params.push(template_params.clone());
        }

        let result = self.parse_lambda_rest(capture_default, captures, template_params);

        if has_explicit_tparams {
            self.template_params.pop();
        }
        result
    }

    fn parse_lambda_rest(
        &mut self,
        capture_default: CaptureDefault,
        mut captures: Vec<LambdaCapture>,
        template_params: Vec<TemplateParam>,
    ) -> ParseResult<NodeId> {
        let mut params: Vec<Param> = Vec::new();
        if self.peek() == TokenKind::LParen {
            params = self.parse_parameter_list()?;
        }
        let is_generic = !template_params.is_empty()
            || params.iter().any(|p| p.ty.is_auto());

        let mut is_mutable = false;
        let mut is_constexpr = false;
        let mut is_consteval = false;
        loop {
            match self.peek() {
                TokenKind::KwMutable => {
                    self.advance();
                    is_mutable = true;
                }
                TokenKind::KwConstexpr => {
                    self.advance();
                    is_constexpr = true;
                }
                TokenKind::KwConsteval => {
                    self.advance();
                    is_consteval = true;
                }
                _ => break,
            }
        }

        let mut noexcept = false;
        if self.consume(TokenKind::KwNoexcept) {
            noexcept = true;
            if self.consume(TokenKind::LParen) {
                let cond = self.parse_expression(0)?;
                self.expect(TokenKind::RParen, "')' after noexcept condition")?;
                if let Ok(v) = self.eval_const_expr(cond) {
                    noexcept = v.as_bool();
                }
            }
        }

        let mut requires_clause = None;
        if self.consume(TokenKind::KwRequires) {
            let expr = self.with_expr_context(ExprContext::RequiresClause, |p| {
                p.parse_expression(8)
            })?;
            requires_clause = Some(self.alloc(Node::RequiresClause { expr }));
        }

        let mut ret = TypeSpecifier::auto();
        if self.consume(TokenKind::Arrow) {
            ret = self.parse_type_specifier()?;
        }

        // Candidate outer variables for capture-default expansion, and the
        // arena mark separating pre-lambda declarations from locals.
        let outer_vars = self.symbols.function_local_decls();
        let arena_mark = self.arena.len() as u32;

        let body = self.with_scope(ScopeKind::Function, |p| {
            for param in &mut params {
                p.declare_parameter(param);
            }
            p.parse_block()
        })?;

        // `[=]` / `[&]`: expand to explicit captures of referenced
        // outer-scope names, minus parameters and locals.
        if capture_default != CaptureDefault::None {
            let mut referenced: Vec<Symbol> = Vec::new();
            self.collect_outer_references(body, &outer_vars, arena_mark, &mut referenced);
            for name in referenced {
                let already = captures
                    .iter()
                    .any(|c| c.name == Some(name));
                let is_param = params.iter().any(|p| p.name == Some(name));
                if !already && !is_param {
                    captures.push(LambdaCapture {
                        name: Some(name),
                        kind: match capture_default {
                            CaptureDefault::ByRef => CaptureKind::ByRef,
                            _ => CaptureKind::ByValue,
                        },
                    });
                }
            }
        }

        // Deduce the return type when not declared.
        if ret.is_auto()
            && !is_generic
            && let Some(deduced) = self.deduce_return_type(body)?
        {
            ret = deduced;
        }

        let closure_name = self.fresh_lambda_name();
        let closure_type = self.synthesize_closure_type(
            closure_name,
            &captures,
            &params,
            &ret,
            body,
            is_mutable,
            is_generic,
            noexcept,
        )?;

        Ok(self.alloc(Node::Lambda(Lambda {
            closure_name,
            closure_type,
            capture_default,
            captures,
            template_params,
            params,
            ret,
            body,
            is_mutable,
            is_constexpr,
            is_consteval,
            noexcept,
            requires_clause,
            is_generic,
        })))
    }

    /// Walk the body collecting identifiers that resolve to enclosing
    /// function-scope variables declared before the lambda.
    fn collect_outer_references(
        &self,
        node: NodeId,
        outer_vars: &[(Symbol, NodeId)],
        arena_mark: u32,
        out: &mut Vec<Symbol>,
    ) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if let Node::Identifier {
                name,
                decl: Some(decl),
            } = self.arena.get(current)
                && decl.0 < arena_mark
                && outer_vars.iter().any(|(_, d)| d == decl)
                && !out.contains(name)
            {
                out.push(*name);
            }
            self.push_children(current, &mut stack);
        }
        // Source order, not visit order.
        out.sort_by_key(|name| {
            outer_vars
                .iter()
                .position(|(n, _)| n == name)
                .unwrap_or(usize::MAX)
        });
    }

    /// Children of a node, for read-only AST walks.
    pub(crate) fn push_children(&self, node: NodeId, stack: &mut Vec<NodeId>) {
        match self.arena.get(node) {
            Node::Block { stmts } => stack.extend(stmts.iter().copied()),
            Node::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                stack.push(*cond);
                stack.push(*then_branch);
                if let Some(e) = else_branch {
                    stack.push(*e);
                }
            }
            Node::For {
                init,
                cond,
                step,
                body,
            } => {
                stack.extend([init, cond, step].into_iter().flatten());
                stack.push(*body);
            }
            Node::RangedFor { decl, range, body } => {
                stack.push(*decl);
                stack.push(*range);
                stack.push(*body);
            }
            Node::While { cond, body } | Node::DoWhile { body, cond } => {
                stack.push(*cond);
                stack.push(*body);
            }
            Node::Switch { cond, body } => {
                stack.push(*cond);
                stack.push(*body);
            }
            Node::Case { value } => stack.push(*value),
            Node::Return(Some(e)) | Node::Throw(Some(e)) => stack.push(*e),
            Node::ExpressionWrapper(e)
            | Node::PackExpansion(e)
            | Node::NoexceptExpr(e)
            | Node::Label { stmt: e, .. } => stack.push(*e),
            Node::Try { body, handlers } => {
                stack.push(*body);
                for (decl, block) in handlers {
                    if let Some(d) = decl {
                        stack.push(*d);
                    }
                    stack.push(*block);
                }
            }
            Node::VarDecl(v) => {
                if let Some(init) = v.init {
                    stack.push(init);
                }
            }
            Node::BinaryOp { lhs, rhs, .. } => {
                stack.push(*lhs);
                stack.push(*rhs);
            }
            Node::UnaryOp { operand, .. } => stack.push(*operand),
            Node::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                stack.push(*cond);
                stack.push(*then_expr);
                stack.push(*else_expr);
            }
            Node::FunctionCall { callee, args, .. } => {
                stack.push(*callee);
                stack.extend(args.iter().copied());
            }
            Node::MemberFunctionCall { object, args, .. } => {
                stack.push(*object);
                stack.extend(args.iter().copied());
            }
            Node::ConstructorCall { args, .. } => stack.extend(args.iter().copied()),
            Node::PseudoDestructorCall { object, .. } => stack.push(*object),
            Node::MemberAccess { object, .. } => stack.push(*object),
            Node::PointerToMemberAccess { object, member, .. } => {
                stack.push(*object);
                stack.push(*member);
            }
            Node::ArraySubscript { array, index } => {
                stack.push(*array);
                stack.push(*index);
            }
            Node::Cast { expr, .. } => stack.push(*expr),
            Node::SizeofExpr { arg } | Node::AlignofExpr { arg } | Node::TypeidExpr { arg } => {
                if let crate::ast::SizeofArg::Expr(e) = arg {
                    stack.push(*e);
                }
            }
            Node::NewExpression {
                placement,
                args,
                array_size,
                ..
            } => {
                stack.extend(placement.iter().copied());
                stack.extend(args.iter().copied());
                if let Some(n) = array_size {
                    stack.push(*n);
                }
            }
            Node::DeleteExpression { expr, .. } => stack.push(*expr),
            Node::FoldExpression { pack, init, .. } => {
                stack.push(*pack);
                if let Some(i) = init {
                    stack.push(*i);
                }
            }
            Node::Lambda(l) => stack.push(l.body),
            _ => {}
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn synthesize_closure_type(
        &mut self,
        closure_name: Symbol,
        captures: &[LambdaCapture],
        params: &[Param],
        ret: &TypeSpecifier,
        body: NodeId,
        is_mutable: bool,
        is_generic: bool,
        noexcept: bool,
    ) -> ParseResult<crate::types::TypeId> {
        let mut info = StructTypeInfo::default();

        for capture in captures {
            match &capture.kind {
                CaptureKind::This => {
                    let mut ty = TypeSpecifier::void();
                    ty.ptr.push(crate::types::PtrLevel::default());
                    info.members.push(StructMember {
                        name: self.intern("__this"),
                        ty,
                        offset_bits: 0,
                        bit_width: None,
                        access: Access::Public,
                        default_init: None,
                        align_override: None,
                    });
                }
                CaptureKind::StarThis => {
                    if let Some(class) = self.symbols.current_class() {
                        let class_info = self.types.get(class);
                        let ty = TypeSpecifier::structure(
                            class_info.name,
                            class,
                            class_info.size_bits.min(u64::from(u32::MAX)) as u32,
                        );
                        info.members.push(StructMember {
                            name: self.intern("__enclosing"),
                            ty,
                            offset_bits: 0,
                            bit_width: None,
                            access: Access::Public,
                            default_init: None,
                            align_override: None,
                        });
                    }
                }
                CaptureKind::ByValue | CaptureKind::ByRef => {
                    let Some(name) = capture.name else { continue };
                    let mut ty = self
                        .symbols
                        .lookup(name)
                        .first()
                        .and_then(|&d| match self.arena.get(d) {
                            Node::VarDecl(v) => Some(v.ty.clone()),
                            _ => None,
                        })
                        .unwrap_or_else(TypeSpecifier::int);
                    ty.ref_kind = RefKind::None;
                    if matches!(capture.kind, CaptureKind::ByRef) {
                        // By-reference capture stores a pointer to the
                        // referent.
                        ty.ptr.push(crate::types::PtrLevel::default());
                    }
                    info.members.push(StructMember {
                        name,
                        ty,
                        offset_bits: 0,
                        bit_width: None,
                        access: Access::Public,
                        default_init: None,
                        align_override: None,
                    });
                }
                CaptureKind::Init { by_ref, init } => {
                    let Some(name) = capture.name else { continue };
                    let mut ty = self
                        .expr_type(*init)
                        .unwrap_or_else(TypeSpecifier::int)
                        .decayed();
                    if *by_ref {
                        ty.ptr.push(crate::types::PtrLevel::default());
                    }
                    info.members.push(StructMember {
                        name,
                        ty,
                        offset_bits: 0,
                        bit_width: None,
                        access: Access::Public,
                        default_init: Some(*init),
                        align_override: None,
                    });
                }
            }
        }

        info.complete = true;
        let pack = self.effective_pack();
        compute_struct_layout(&mut info, &self.types, &self.options, pack);

        let type_id = self
            .types
            .register(TypeInfo::structure(closure_name, info));

        let op_name = self.intern("operator()");
        let call_op = self.alloc(Node::FunctionDecl(FunctionDecl {
            name: op_name,
            mangled: None,
            ret: ret.clone(),
            params: params.to_vec(),
            body: Some(body),
            linkage: Linkage::Cpp,
            flags: FnFlags {
                is_operator: true,
                is_constexpr: false,
                ..FnFlags::default()
            },
            member_of: Some(type_id),
            cv: if is_mutable {
                CvQual::NONE
            } else {
                CvQual::const_only()
            },
            ref_qual: RefKind::None,
            noexcept,
            conv: CallingConv::Thiscall,
            requires_clause: None,
            access: Access::Public,
            ctor_inits: Vec::new(),
        }));
        let _ = is_generic;

        if let Some(struct_info) = self.types.get_mut(type_id).struct_info.as_mut() {
            struct_info.member_functions.push(call_op);
        }

        Ok(type_id)
    }
}
