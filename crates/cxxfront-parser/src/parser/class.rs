//! Class, struct, and union parsing.
//!
//! A class is registered in the type registry before its body parses so
//! members can name it. Member function bodies found at class scope are
//! not parsed in place: the brace range is skipped and recorded on the
//! delayed-body queue, which drains in FIFO order once the class body
//! closes and the type is complete. Inside class templates the drained
//! bodies parse with the template parameters in scope and produce
//! dependent ASTs that instantiation later substitutes.

use cxxfront_core::Symbol;

use crate::ast::{
    FnFlags, FunctionDecl, Linkage, Node, NodeId, Param, StructDecl, VarDecl,
};
use crate::delayed::DelayedBodyRecord;
use crate::diag::{ParseErrorKind, ParseResult};
use crate::parser::{Parser, StructContext};
use crate::symbols::ScopeKind;
use crate::token::TokenKind;
use crate::types::{
    Access, BaseClass, BaseKind, RefKind, StaticMember, StructMember, StructTypeInfo, TypeId,
    TypeInfo, TypeSpecifier, compute_struct_layout,
};

impl Parser {
    pub(crate) fn parse_struct_declaration(&mut self) -> ParseResult<NodeId> {
        let keyword = self.advance();
        let (is_union, is_class) = match keyword.kind {
            TokenKind::KwStruct => (false, false),
            TokenKind::KwClass => (false, true),
            TokenKind::KwUnion => (true, false),
            _ => {
                return Err(self.err_at(
                    ParseErrorKind::UnexpectedToken,
                    "expected 'struct', 'class', or 'union'",
                    keyword,
                ));
            }
        };
        self.skip_attributes();

        // Optional alignas on the class head.
        let mut align_floor: Option<u32> = None;
        if self.consume(TokenKind::KwAlignas) {
            self.expect(TokenKind::LParen, "'(' after 'alignas'")?;
            if let Some(ty) = self.try_parse_type() {
                align_floor = ty
                    .align_bits(&self.types, &self.options)
                    .map(|bits| bits.max(8));
            } else {
                let expr = self.parse_expression(0)?;
                align_floor = self.const_u64(expr).map(|bytes| (bytes * 8) as u32);
            }
            self.expect(TokenKind::RParen, "')' after alignas")?;
        }

        let name = if self.peek() == TokenKind::Identifier {
            self.advance().lexeme
        } else {
            // Anonymous aggregate.
            let fresh = format!("__anon_{}", self.types.len());
            self.intern(&fresh)
        };

        self.parse_struct_tail(is_union, is_class, name, align_floor)
    }

    /// Everything after the class-key and name. Partial specializations
    /// enter here with a synthesized record name after their pattern has
    /// been consumed.
    pub(crate) fn parse_struct_tail(
        &mut self,
        is_union: bool,
        is_class: bool,
        name: Symbol,
        align_floor: Option<u32>,
    ) -> ParseResult<NodeId> {
        let is_final = self.consume_contextual(self.known.final_);

        // Forward declaration.
        if self.peek() == TokenKind::Semi {
            self.advance();
            let type_id = self.ensure_struct_registered(name, is_union);
            return Ok(self.alloc(Node::StructDecl(StructDecl {
                name,
                type_id,
                is_union,
                is_class,
                members: Vec::new(),
            })));
        }

        // Base-clause.
        let mut bases: Vec<BaseClass> = Vec::new();
        if self.consume(TokenKind::Colon) {
            loop {
                let mut is_virtual = false;
                let mut access = if is_class {
                    Access::Private
                } else {
                    Access::Public
                };
                loop {
                    match self.peek() {
                        TokenKind::KwVirtual => {
                            self.advance();
                            is_virtual = true;
                        }
                        TokenKind::KwPublic => {
                            self.advance();
                            access = Access::Public;
                        }
                        TokenKind::KwProtected => {
                            self.advance();
                            access = Access::Protected;
                        }
                        TokenKind::KwPrivate => {
                            self.advance();
                            access = Access::Private;
                        }
                        _ => break,
                    }
                }

                let base_ty = self.parse_base_type()?;
                let deferred = self.type_is_dependent(&base_ty);
                if !deferred
                    && let Some(id) = base_ty.type_id
                    && let Some(info) = &self.types.get(id).struct_info
                    && info.is_final
                {
                    return Err(self.err_here(
                        ParseErrorKind::InheritFromFinal,
                        format!(
                            "cannot inherit from final class '{}'",
                            self.resolve(self.types.get(id).name)
                        ),
                    ));
                }
                bases.push(BaseClass {
                    name: base_ty.name.unwrap_or(name),
                    type_id: base_ty.type_id,
                    access,
                    is_virtual,
                    deferred,
                });
                if !self.consume(TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect(TokenKind::LBrace, "'{' opening class body")?;

        let type_id = self.ensure_struct_registered(name, is_union);
        let qualified_name = self.types.get(type_id).name;
        {
            let info = self.types.get_mut(type_id);
            if let Some(s) = info.struct_info.as_mut() {
                s.bases = bases;
                s.is_final = is_final;
                s.is_union = is_union;
            }
        }

        let default_access = if is_class {
            Access::Private
        } else {
            Access::Public
        };
        self.struct_stack.push(StructContext {
            name,
            qualified_name,
            type_id,
        });

        let members = self.with_scope(ScopeKind::Class(type_id), |p| {
            p.parse_member_sequence(type_id, name, default_access)
        });
        self.struct_stack.pop();
        let members = members?;

        self.expect(TokenKind::RBrace, "'}' closing class body")?;

        // Complete the type: vtable detection and layout.
        self.complete_struct_type(type_id, align_floor);

        let node = self.alloc(Node::StructDecl(StructDecl {
            name,
            type_id,
            is_union,
            is_class,
            members,
        }));
        self.symbols.declare(name, node);

        // Trailing declarators: `struct S { ... } s, *ps;`.
        if self.peek() != TokenKind::Semi {
            let base = {
                let info = self.types.get(type_id);
                let mut ts = TypeSpecifier::builtin(BaseKind::Struct, 0);
                ts.name = Some(name);
                ts.type_id = Some(type_id);
                ts.bits = info.size_bits.min(u64::from(u32::MAX)) as u32;
                ts
            };
            loop {
                let mut ty = base.clone();
                self.parse_ptr_operators(&mut ty);
                let tok = self.expect(TokenKind::Identifier, "declarator after class body")?;
                self.parse_array_suffix(&mut ty)?;
                let init = if self.consume(TokenKind::Assign) {
                    Some(self.parse_assignment_expression()?)
                } else {
                    None
                };
                let decl = self.alloc(Node::VarDecl(VarDecl {
                    name: tok.lexeme,
                    ty,
                    init,
                    linkage: Linkage::None,
                    is_static: false,
                    is_constexpr: false,
                    is_extern: false,
                    is_thread_local: false,
                    const_value: None,
                }));
                self.symbols.declare(tok.lexeme, decl);
                self.pending_struct_variables.push(decl);
                if !self.consume(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::Semi, "';' after class definition")?;

        // Drain deferred member bodies once the outermost class is done.
        if self.struct_stack.is_empty() {
            self.drain_delayed_bodies()?;
        }

        Ok(node)
    }

    /// Reuse a forward declaration's record or append a fresh incomplete
    /// one, registered under the plain, namespace-qualified, and
    /// enclosing-class-qualified names.
    pub(crate) fn ensure_struct_registered(&mut self, name: Symbol, is_union: bool) -> TypeId {
        let qualified = if let Some(ctx) = self.current_struct() {
            let nested = format!(
                "{}::{}",
                self.resolve(ctx.qualified_name),
                self.resolve(name)
            );
            self.intern(&nested)
        } else {
            self.namespace_qualified(name)
        };

        if let Some(id) = self.types.lookup(qualified) {
            let info = self.types.get(id);
            if info.struct_info.is_some() {
                return id;
            }
        }
        let id = self.types.register(TypeInfo {
            name: qualified,
            base: BaseKind::Struct,
            size_bits: 0,
            align_bits: 0,
            struct_info: Some(StructTypeInfo {
                is_union,
                ..StructTypeInfo::default()
            }),
            enum_info: None,
            alias_of: None,
        });
        self.types.register_name(name, id);
        self.types.register_name(qualified, id);
        id
    }

    fn parse_member_sequence(
        &mut self,
        type_id: TypeId,
        class_name: Symbol,
        default_access: Access,
    ) -> ParseResult<Vec<NodeId>> {
        let mut members = Vec::new();
        let mut access = default_access;

        while self.peek() != TokenKind::RBrace && !self.cursor.is_eof() {
            match self.peek() {
                TokenKind::Semi => {
                    self.advance();
                }
                TokenKind::KwPublic => {
                    self.advance();
                    self.expect(TokenKind::Colon, "':' after access specifier")?;
                    access = Access::Public;
                }
                TokenKind::KwProtected => {
                    self.advance();
                    self.expect(TokenKind::Colon, "':' after access specifier")?;
                    access = Access::Protected;
                }
                TokenKind::KwPrivate => {
                    self.advance();
                    self.expect(TokenKind::Colon, "':' after access specifier")?;
                    access = Access::Private;
                }
                TokenKind::KwStaticAssert => {
                    self.parse_static_assert()?;
                }
                TokenKind::KwUsing => {
                    let node = self.parse_using_directive_or_declaration()?;
                    if let Some(node) = node {
                        members.push(node);
                    }
                }
                TokenKind::KwTypedef => {
                    members.push(self.parse_typedef_declaration()?);
                }
                TokenKind::KwStruct | TokenKind::KwClass | TokenKind::KwUnion => {
                    members.push(self.parse_struct_declaration()?);
                }
                TokenKind::KwEnum => {
                    members.push(self.parse_enum_declaration()?);
                }
                TokenKind::KwTemplate => {
                    if let Some(node) = self.parse_template_declaration()? {
                        members.push(node);
                    }
                }
                TokenKind::KwFriend => {
                    self.parse_friend_declaration()?;
                }
                _ => {
                    if let Some(node) =
                        self.parse_member_declaration(type_id, class_name, access)?
                    {
                        members.push(node);
                    }
                }
            }
        }

        Ok(members)
    }

    /// `friend class X;` and friend function declarations grant access;
    /// the parser validates the grammar and moves on.
    fn parse_friend_declaration(&mut self) -> ParseResult<()> {
        self.expect(TokenKind::KwFriend, "'friend'")?;
        let mut depth = 0i32;
        while !self.cursor.is_eof() {
            match self.peek() {
                TokenKind::LParen | TokenKind::LBrace => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::RParen | TokenKind::RBrace => {
                    depth -= 1;
                    self.advance();
                }
                TokenKind::Semi if depth == 0 => {
                    self.advance();
                    return Ok(());
                }
                _ => {
                    self.advance();
                }
            }
        }
        Err(self.err_here(ParseErrorKind::UnexpectedToken, "unterminated friend declaration"))
    }

    /// One member declaration: constructor, destructor, conversion
    /// operator, member function, or data member(s).
    fn parse_member_declaration(
        &mut self,
        type_id: TypeId,
        class_name: Symbol,
        access: Access,
    ) -> ParseResult<Option<NodeId>> {
        self.skip_attributes();

        let mut flags = FnFlags::default();
        let mut is_static = false;
        let mut is_mutable = false;
        let mut align_override: Option<u32> = None;
        loop {
            match self.peek() {
                TokenKind::KwStatic => {
                    self.advance();
                    is_static = true;
                }
                TokenKind::KwVirtual => {
                    self.advance();
                    flags.is_virtual = true;
                }
                TokenKind::KwInline | TokenKind::KwForceinline => {
                    self.advance();
                    flags.is_inline = true;
                }
                TokenKind::KwConstexpr => {
                    self.advance();
                    flags.is_constexpr = true;
                }
                TokenKind::KwConsteval => {
                    self.advance();
                    flags.is_consteval = true;
                }
                TokenKind::KwExplicit => {
                    self.advance();
                    if self.consume(TokenKind::LParen) {
                        let _ = self.parse_expression(0)?;
                        self.expect(TokenKind::RParen, "')' after explicit condition")?;
                    }
                }
                TokenKind::KwMutable => {
                    self.advance();
                    is_mutable = true;
                }
                TokenKind::KwAlignas => {
                    self.advance();
                    self.expect(TokenKind::LParen, "'(' after 'alignas'")?;
                    if let Some(ty) = self.try_parse_type() {
                        align_override = ty.align_bits(&self.types, &self.options);
                    } else {
                        let expr = self.parse_expression(0)?;
                        align_override = self.const_u64(expr).map(|b| (b * 8) as u32);
                    }
                    self.expect(TokenKind::RParen, "')' after alignas")?;
                }
                _ => break,
            }
        }
        let _ = is_mutable;

        // Destructor.
        if self.peek() == TokenKind::Tilde {
            self.advance();
            let tok = self.expect(TokenKind::Identifier, "class name after '~'")?;
            if tok.lexeme != class_name {
                return Err(self.err_at(
                    ParseErrorKind::UnexpectedToken,
                    "destructor name must match the class",
                    tok,
                ));
            }
            flags.is_destructor = true;
            let dtor_name = self.intern(&format!("~{}", self.resolve(class_name)));
            let params = self.parse_parameter_list()?;
            return self
                .finish_member_function(
                    type_id,
                    dtor_name,
                    TypeSpecifier::void(),
                    params,
                    flags,
                    is_static,
                    access,
                )
                .map(Some);
        }

        // Constructor: the class name followed by '('.
        if self.peek() == TokenKind::Identifier
            && self.peek_info().lexeme == class_name
            && self.peek_at(1) == TokenKind::LParen
        {
            self.advance();
            flags.is_constructor = true;
            let params = self.parse_parameter_list()?;
            return self
                .finish_member_function(
                    type_id,
                    class_name,
                    TypeSpecifier::void(),
                    params,
                    flags,
                    is_static,
                    access,
                )
                .map(Some);
        }

        // Conversion operator: `operator T() const`.
        if self.peek() == TokenKind::KwOperator
            && !matches!(
                self.peek_at(1),
                TokenKind::LParen | TokenKind::LBracket
            )
            && self
                .lookahead(|p| {
                    p.advance();
                    p.parse_type_specifier()
                })
                .is_some()
        {
            // Re-parse for real; the lookahead rewound.
            self.advance();
            let target = self.parse_type_specifier()?;
            flags.is_conversion = true;
            flags.is_operator = true;
            let op_name = self.intern(&format!(
                "operator {}",
                self.type_display_name(&target)
            ));
            let params = self.parse_parameter_list()?;
            return self
                .finish_member_function(type_id, op_name, target, params, flags, is_static, access)
                .map(Some);
        }

        // Ordinary member: type, then function or data declarators.
        let base = self.parse_base_type()?;
        let conv = self.parse_calling_convention();
        let _ = conv;

        // Operator overload member.
        if self.peek() == TokenKind::KwOperator {
            let mut ret = base;
            self.parse_ptr_operators(&mut ret);
            let name = self.parse_operator_function_name()?;
            flags.is_operator = true;
            let params = self.parse_parameter_list()?;
            return self
                .finish_member_function(type_id, name, ret, params, flags, is_static, access)
                .map(Some);
        }

        let mut first = true;
        let mut decls: Vec<NodeId> = Vec::new();
        loop {
            let mut ty = base.clone();
            if !first {
                ty.ptr.clear();
                ty.ref_kind = RefKind::None;
            }
            self.parse_ptr_operators(&mut ty);
            let name_tok = self.expect(TokenKind::Identifier, "member name")?;
            let member_name = name_tok.lexeme;
            first = false;

            if self.peek() == TokenKind::LParen {
                let params = self.parse_parameter_list()?;
                // Member functions never share a declarator list.
                let node = self.finish_member_function(
                    type_id,
                    member_name,
                    ty,
                    params,
                    flags.clone(),
                    is_static,
                    access,
                )?;
                return Ok(Some(node));
            }

            self.parse_array_suffix(&mut ty)?;

            // Bit-field.
            let mut bit_width = None;
            if self.consume(TokenKind::Colon) {
                let width_expr = self.parse_expression(2)?;
                let width = self.const_u64(width_expr).ok_or_else(|| {
                    self.err_here(ParseErrorKind::NotConstant, "bit-field width must be constant")
                })?;
                bit_width = Some(width as u32);
            }

            // Default member initializer.
            let default_init = if self.consume(TokenKind::Assign) {
                Some(self.parse_assignment_expression()?)
            } else if self.peek() == TokenKind::LBrace {
                Some(self.parse_constructor_call(ty.clone())?)
            } else {
                None
            };

            if is_static {
                let const_value = default_init
                    .and_then(|i| self.eval_const_expr(i).ok())
                    .map(crate::consteval::Value::to_const_value);
                let decl = self.alloc(Node::VarDecl(VarDecl {
                    name: member_name,
                    ty: ty.clone(),
                    init: default_init,
                    linkage: Linkage::Cpp,
                    is_static: true,
                    is_constexpr: flags.is_constexpr,
                    is_extern: false,
                    is_thread_local: false,
                    const_value,
                }));
                self.symbols.declare(member_name, decl);
                if let Some(info) = self.types.get_mut(type_id).struct_info.as_mut() {
                    info.static_members.push(StaticMember {
                        name: member_name,
                        ty,
                        initializer: default_init,
                        access,
                        is_constexpr: flags.is_constexpr,
                        decl: Some(decl),
                    });
                }
                decls.push(decl);
            } else {
                if let Some(info) = self.types.get_mut(type_id).struct_info.as_mut() {
                    info.members.push(StructMember {
                        name: member_name,
                        ty: ty.clone(),
                        offset_bits: 0,
                        bit_width,
                        access,
                        default_init,
                        align_override,
                    });
                }
                let decl = self.alloc(Node::VarDecl(VarDecl {
                    name: member_name,
                    ty,
                    init: default_init,
                    linkage: Linkage::None,
                    is_static: false,
                    is_constexpr: false,
                    is_extern: false,
                    is_thread_local: false,
                    const_value: None,
                }));
                self.symbols.declare(member_name, decl);
                decls.push(decl);
            }

            if !self.consume(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Semi, "';' after member declaration")?;
        Ok(decls.first().copied())
    }

    /// Member function declarator tail: suffix, then either a recorded
    /// (skipped) body, an initializer list plus body, or a semicolon.
    #[allow(clippy::too_many_arguments)]
    fn finish_member_function(
        &mut self,
        type_id: TypeId,
        name: Symbol,
        ret: TypeSpecifier,
        params: Vec<Param>,
        mut flags: FnFlags,
        is_static: bool,
        access: Access,
    ) -> ParseResult<NodeId> {
        let suffix = self.parse_function_suffix()?;
        flags.is_static = is_static;
        flags.is_pure |= suffix.is_pure;
        flags.is_override |= suffix.is_override;
        flags.is_final |= suffix.is_final;
        flags.is_defaulted |= suffix.is_defaulted;
        flags.is_deleted |= suffix.is_deleted;
        if flags.is_pure {
            flags.is_virtual = true;
        }

        let mut ret = ret;
        if let Some(trailing) = &suffix.trailing_return {
            ret = trailing.clone();
        }

        let mangled = self.mangled_name_for(name, &params, Linkage::Cpp);
        let decl = self.alloc(Node::FunctionDecl(FunctionDecl {
            name,
            mangled: Some(mangled),
            ret,
            params,
            body: None,
            linkage: Linkage::Cpp,
            flags: flags.clone(),
            member_of: Some(type_id),
            cv: suffix.cv,
            ref_qual: suffix.ref_qual,
            noexcept: suffix.noexcept,
            conv: crate::types::CallingConv::Thiscall,
            requires_clause: suffix.requires_clause,
            access,
            ctor_inits: Vec::new(),
        }));

        if let Some(info) = self.types.get_mut(type_id).struct_info.as_mut() {
            info.member_functions.push(decl);
        }
        self.symbols.declare(name, decl);

        // Constructor initializer list and/or body: skip now, parse after
        // the class completes.
        let has_init_list = self.peek() == TokenKind::Colon;
        if has_init_list || self.peek() == TokenKind::LBrace {
            let init_list_start = if has_init_list {
                let pos = self.cursor.position();
                self.skip_to_body_start()?;
                Some(pos)
            } else {
                None
            };
            let body_start = self.cursor.position();
            self.skip_balanced_braces()?;
            let ctx = self
                .struct_stack
                .last()
                .expect("member function outside class context");
            self.delayed.push(DelayedBodyRecord {
                target: decl,
                body_start,
                init_list_start,
                class_name: ctx.name,
                class_type: type_id,
                class_node: decl,
                is_constructor: flags.is_constructor,
                is_destructor: flags.is_destructor,
                template_params: self.current_template_param_names(),
            });
        } else {
            self.expect(TokenKind::Semi, "';' after member declaration")?;
        }

        Ok(decl)
    }

    /// From a `:` initializer list, skip to the `{` that begins the body,
    /// balancing parens and braces of the initializers.
    fn skip_to_body_start(&mut self) -> ParseResult<()> {
        self.expect(TokenKind::Colon, "':' opening initializer list")?;
        let mut depth = 0i32;
        while !self.cursor.is_eof() {
            match self.peek() {
                TokenKind::LParen => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::RParen => {
                    depth -= 1;
                    self.advance();
                }
                TokenKind::LBrace if depth == 0 => return Ok(()),
                TokenKind::LBrace => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::RBrace => {
                    depth -= 1;
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
        }
        Err(self.err_here(ParseErrorKind::UnexpectedToken, "unterminated initializer list"))
    }

    /// Skip a `{ ... }` range by brace counting.
    pub(crate) fn skip_balanced_braces(&mut self) -> ParseResult<()> {
        self.expect(TokenKind::LBrace, "'{' opening body")?;
        let mut depth = 1i32;
        while depth > 0 {
            if self.cursor.is_eof() {
                return Err(self.err_here(
                    ParseErrorKind::UnexpectedToken,
                    "unterminated member function body",
                ));
            }
            match self.peek() {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => depth -= 1,
                _ => {}
            }
            self.advance();
        }
        Ok(())
    }

    /// Vtable detection, layout, and the completeness flag.
    pub(crate) fn complete_struct_type(&mut self, type_id: TypeId, align_floor: Option<u32>) {
        let has_virtual = {
            let info = self.types.get(type_id);
            let Some(s) = &info.struct_info else { return };
            s.member_functions.iter().any(|&f| {
                matches!(self.arena.get(f), Node::FunctionDecl(d) if d.flags.is_virtual)
            }) || s.bases.iter().any(|b| {
                b.type_id.is_some_and(|id| {
                    self.types
                        .get(id)
                        .struct_info
                        .as_ref()
                        .is_some_and(|bs| bs.has_vtable)
                })
            })
        };

        let pack = self.effective_pack();
        let mut info_copy = {
            let info = self.types.get_mut(type_id);
            let Some(s) = info.struct_info.as_mut() else {
                return;
            };
            s.has_vtable = has_virtual;
            s.complete = true;
            s.clone()
        };
        compute_struct_layout(&mut info_copy, &self.types, &self.options, pack);
        if let Some(floor) = align_floor {
            info_copy.align_bits = info_copy.align_bits.max(floor);
            info_copy.size_bits = info_copy
                .size_bits
                .div_ceil(u64::from(info_copy.align_bits))
                * u64::from(info_copy.align_bits);
        }
        let size = info_copy.size_bits;
        let align = info_copy.align_bits;
        let info = self.types.get_mut(type_id);
        info.struct_info = Some(info_copy);
        info.size_bits = size;
        info.align_bits = align;
    }

    // ------------------------------------------------------------------
    // Delayed bodies

    /// FIFO drain: reposition the cursor at each recorded body, rebuild
    /// the class and function scopes, parse, attach, and return to the
    /// current position.
    pub(crate) fn drain_delayed_bodies(&mut self) -> ParseResult<()> {
        while let Some(record) = self.delayed.pop() {
            let resume = self.cursor.position();
            let result = self.parse_one_delayed_body(&record);
            self.cursor.set_position(resume);
            result?;
        }
        Ok(())
    }

    fn parse_one_delayed_body(&mut self, record: &DelayedBodyRecord) -> ParseResult<()> {
        let mut params = match self.arena.get(record.target) {
            Node::FunctionDecl(f) => f.params.clone(),
            _ => Vec::new(),
        };

        // Restore the template-parameter names active when the body was
        // skipped, so dependent names parse the same way.
        let restore_params = if record.template_params.is_empty() {
            false
        } else {
            let level = record
                .template_params
                .iter()
                .map(|&name| crate::ast::TemplateParam {
                    name,
                    kind: crate::ast::TemplateParamKind::Type { default: None },
                    is_pack: false,
                    constraint: None,
                })
                .collect();
            self.template_params.push(level);
            true
        };
        let was_template_body = self.parsing_template_body;
        if restore_params {
            self.parsing_template_body = true;
        }

        // Constructor initializer list.
        let mut ctor_inits: Vec<(Symbol, NodeId)> = Vec::new();
        let body_result = (|| -> ParseResult<NodeId> {
            if let Some(init_start) = record.init_list_start {
                self.cursor.set_position(init_start);
                self.expect(TokenKind::Colon, "':' opening initializer list")?;
                self.with_scope(ScopeKind::Class(record.class_type), |p| {
                    p.with_scope(ScopeKind::Function, |p| {
                        for param in params.iter_mut() {
                            p.declare_parameter(param);
                        }
                        loop {
                            let tok =
                                p.expect(TokenKind::Identifier, "member or base initializer")?;
                            let init = if p.peek() == TokenKind::LBrace {
                                let ty = TypeSpecifier::user_defined(tok.lexeme, None);
                                p.parse_constructor_call(ty)?
                            } else {
                                p.expect(TokenKind::LParen, "'(' in member initializer")?;
                                let expr = if p.peek() == TokenKind::RParen {
                                    p.alloc(Node::Block { stmts: Vec::new() })
                                } else {
                                    p.parse_expression(0)?
                                };
                                p.expect(TokenKind::RParen, "')' after member initializer")?;
                                expr
                            };
                            ctor_inits.push((tok.lexeme, init));
                            if !p.consume(TokenKind::Comma) {
                                break;
                            }
                        }
                        Ok(())
                    })
                })?;
            }

            self.cursor.set_position(record.body_start);
            self.parse_function_body(&mut params, Some(record.class_type))
        })();

        if restore_params {
            self.template_params.pop();
        }
        self.parsing_template_body = was_template_body;

        let body = body_result?;
        if let Node::FunctionDecl(f) = self.arena.get_mut(record.target) {
            f.body = Some(body);
            f.ctor_inits = ctor_inits;
            f.params = params;
        }
        Ok(())
    }

    pub(crate) fn type_display_name(&self, ty: &TypeSpecifier) -> String {
        let base = match ty.base {
            BaseKind::Void => "void".to_string(),
            BaseKind::Bool => "bool".to_string(),
            BaseKind::Char => "char".to_string(),
            BaseKind::Int => "int".to_string(),
            BaseKind::UInt => "unsigned int".to_string(),
            BaseKind::Long => "long".to_string(),
            BaseKind::ULong => "unsigned long".to_string(),
            BaseKind::Float => "float".to_string(),
            BaseKind::Double => "double".to_string(),
            _ => ty
                .name
                .map_or_else(|| "type".to_string(), |n| self.resolve(n).to_string()),
        };
        let mut out = base;
        for _ in &ty.ptr {
            out.push('*');
        }
        match ty.ref_kind {
            RefKind::LValue => out.push('&'),
            RefKind::RValue => out.push_str("&&"),
            RefKind::None => {}
        }
        out
    }
}
