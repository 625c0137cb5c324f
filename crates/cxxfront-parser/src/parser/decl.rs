//! Top-level and namespace-scope declaration parsing.
//!
//! Dispatch is first-token driven, in the same order a declaration can
//! legally begin: empty declarations, pragma directives, `using`,
//! `static_assert`, namespaces (plain, inline, nested, alias, anonymous),
//! templates, classes, enums, typedefs, linkage specifications, and
//! finally the declaration-or-function-definition fallthrough.

use cxxfront_core::Symbol;

use crate::ast::{
    ConstValue, EnumDecl, FnFlags, FunctionDecl, Linkage, Node, NodeId, VarDecl,
};
use crate::diag::{ParseErrorKind, ParseResult};
use crate::parser::Parser;
use crate::symbols::ScopeKind;
use crate::token::TokenKind;
use crate::types::{
    BaseKind, CallingConv, EnumTypeInfo, TypeInfo, TypeSpecifier,
};

impl Parser {
    /// One top-level construct. Pushes produced nodes onto `roots`.
    pub(crate) fn parse_top_level_node(&mut self) -> ParseResult<()> {
        self.maybe_debug_break();

        // Empty declaration.
        if self.consume(TokenKind::Semi) {
            return Ok(());
        }

        match self.peek() {
            TokenKind::Hash => self.parse_hash_directive(),
            TokenKind::KwMsPragma => self.parse_ms_pragma(),
            TokenKind::KwUsing => {
                let node = self.parse_using_directive_or_declaration()?;
                if let Some(node) = node {
                    self.roots.push(node);
                }
                Ok(())
            }
            TokenKind::KwStaticAssert => self.parse_static_assert(),
            TokenKind::KwInline if self.peek_at(1) == TokenKind::KwNamespace => {
                self.advance();
                self.pending_inline_namespace = true;
                let node = self.parse_namespace()?;
                self.roots.push(node);
                Ok(())
            }
            TokenKind::KwNamespace => {
                let node = self.parse_namespace()?;
                self.roots.push(node);
                Ok(())
            }
            TokenKind::KwTemplate => {
                let node = self.parse_template_declaration()?;
                if let Some(node) = node {
                    self.roots.push(node);
                }
                Ok(())
            }
            TokenKind::KwStruct | TokenKind::KwClass | TokenKind::KwUnion => {
                let node = self.parse_struct_declaration()?;
                self.roots.push(node);
                let pending = std::mem::take(&mut self.pending_struct_variables);
                self.roots.extend(pending);
                Ok(())
            }
            TokenKind::KwEnum => {
                let node = self.parse_enum_declaration()?;
                self.roots.push(node);
                Ok(())
            }
            TokenKind::KwTypedef => {
                let node = self.parse_typedef_declaration()?;
                self.roots.push(node);
                Ok(())
            }
            TokenKind::KwExtern => self.parse_extern_or_declaration(),
            _ => {
                let node = self.parse_declaration_or_function_definition()?;
                if let Some(node) = node {
                    self.roots.push(node);
                }
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Pragmas

    /// `#pragma ...`; only `pack` has semantics, the rest warn and skip.
    fn parse_hash_directive(&mut self) -> ParseResult<()> {
        let hash = self.expect(TokenKind::Hash, "'#'")?;
        if self.consume_contextual(self.known.pragma) {
            if self.consume_contextual(self.known.pack) {
                self.expect(TokenKind::LParen, "'(' after '#pragma pack'")?;
                return self.parse_pragma_pack_inner();
            }
            let next = self.peek_info();
            self.warn(
                ParseErrorKind::UnknownPragma,
                format!("skipping unknown pragma: {}", self.lexeme(&next)),
                next,
            );
            self.skip_unknown_pragma();
            return Ok(());
        }
        Err(self.err_at(
            ParseErrorKind::UnexpectedToken,
            "unexpected preprocessor token after '#'",
            hash,
        ))
    }

    /// `__pragma(pack(...))` and `__pragma(<anything>)`.
    fn parse_ms_pragma(&mut self) -> ParseResult<()> {
        self.expect(TokenKind::KwMsPragma, "'__pragma'")?;
        self.expect(TokenKind::LParen, "'(' after '__pragma'")?;
        if self.consume_contextual(self.known.pack) {
            self.expect(TokenKind::LParen, "'(' after '__pragma(pack'")?;
            self.parse_pragma_pack_inner()?;
            self.expect(TokenKind::RParen, "')' closing '__pragma'")?;
            return Ok(());
        }
        // Unknown content: skip to the balanced close.
        let mut depth = 1i32;
        while !self.cursor.is_eof() && depth > 0 {
            match self.peek() {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => depth -= 1,
                _ => {}
            }
            self.advance();
        }
        Ok(())
    }

    /// Contents of `pack(...)`, cursor just past the `(`:
    /// `push[, N]` / `pop` / `N` / empty.
    fn parse_pragma_pack_inner(&mut self) -> ParseResult<()> {
        if self.consume(TokenKind::RParen) {
            // `#pragma pack()` resets to the default.
            self.pack.set(None);
            return Ok(());
        }
        if self.consume_contextual(self.known.push) {
            let mut value = None;
            if self.consume(TokenKind::Comma) {
                let tok = self.expect(TokenKind::IntLit, "alignment after 'push,'")?;
                value = self.lexeme(&tok).parse::<u32>().ok();
            }
            self.pack.push(value);
        } else if self.consume_contextual(self.known.pop) {
            self.pack.pop();
        } else {
            let tok = self.expect(TokenKind::IntLit, "alignment value")?;
            let value = self.lexeme(&tok).parse::<u32>().ok();
            self.pack.set(value);
        }
        self.expect(TokenKind::RParen, "')' closing pragma pack")?;
        Ok(())
    }

    /// Unknown pragma skip: consume until balanced-paren depth zero right
    /// before a `#` or a keyword that can start a declaration.
    fn skip_unknown_pragma(&mut self) {
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
                    if depth == 0 {
                        break;
                    }
                }
                TokenKind::Hash if depth == 0 => break,
                k if depth == 0 && k.starts_declaration() => break,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // static_assert

    /// Evaluates now when possible; defers into the enclosing struct when
    /// the condition is template-dependent or beyond the evaluator.
    pub(crate) fn parse_static_assert(&mut self) -> ParseResult<()> {
        let keyword = self.expect(TokenKind::KwStaticAssert, "'static_assert'")?;
        self.expect(TokenKind::LParen, "'(' after 'static_assert'")?;
        let condition = self.parse_expression(2)?;

        let mut message = String::new();
        if self.consume(TokenKind::Comma) {
            // Adjacent string literals concatenate.
            let mut saw_literal = false;
            while self.peek() == TokenKind::StrLit {
                let tok = self.advance();
                saw_literal = true;
                let raw = self.lexeme(&tok);
                if let (Some(start), Some(end)) = (raw.find('"'), raw.rfind('"'))
                    && end > start
                {
                    message.push_str(&raw[start + 1..end]);
                }
            }
            if !saw_literal {
                return Err(self.err_here(
                    ParseErrorKind::UnexpectedToken,
                    "expected a string literal for the static_assert message",
                ));
            }
        }

        self.expect(TokenKind::RParen, "')' after static_assert")?;
        self.expect(TokenKind::Semi, "';' after static_assert")?;

        // Before evaluation, make sure sizeof targets are laid out.
        self.ensure_layout_for_expr(condition);

        let in_template_definition =
            self.parsing_template_body && !self.current_template_param_names().is_empty();
        let in_template_struct = !self.struct_stack.is_empty()
            && (self.parsing_template_body || !self.current_template_param_names().is_empty());
        let message_sym = if message.is_empty() {
            None
        } else {
            Some(self.intern(&message))
        };

        match self.eval_const_expr(condition) {
            Ok(v) => {
                if v.as_bool() {
                    return Ok(());
                }
                // Type traits over dependent-ish types evaluate to false
                // inside templates; defer rather than fail.
                if in_template_definition || in_template_struct {
                    self.defer_static_assert(condition, message_sym);
                    return Ok(());
                }
                let mut msg = String::from("static_assert failed");
                if !message.is_empty() {
                    msg.push_str(": ");
                    msg.push_str(&message);
                }
                Err(self.err_at(ParseErrorKind::NotConstant, msg, keyword))
            }
            Err(e) if e.kind == crate::consteval::EvalErrorKind::TemplateDependent => {
                if in_template_definition || in_template_struct {
                    self.defer_static_assert(condition, message_sym);
                    return Ok(());
                }
                Err(self.err_at(
                    ParseErrorKind::TemplateDependent,
                    format!("static_assert condition is not a constant expression: {}", e.message),
                    keyword,
                ))
            }
            Err(e) => {
                // The evaluator is incomplete for heavier constexpr
                // patterns; inside a struct body the assert is stored and
                // re-checked at instantiation instead of failing here.
                if in_template_definition || in_template_struct || !self.struct_stack.is_empty() {
                    self.defer_static_assert(condition, message_sym);
                    return Ok(());
                }
                Err(self.err_at(
                    ParseErrorKind::NotConstant,
                    format!("static_assert condition is not a constant expression: {}", e.message),
                    keyword,
                ))
            }
        }
    }

    fn defer_static_assert(&mut self, condition: NodeId, message: Option<Symbol>) {
        if let Some(ctx) = self.struct_stack.last() {
            let type_id = ctx.type_id;
            if let Some(info) = self.types.get_mut(type_id).struct_info.as_mut() {
                info.deferred_asserts.push(crate::types::DeferredAssert {
                    condition,
                    message,
                });
            }
        }
    }

    // ------------------------------------------------------------------
    // Namespaces

    /// Named, nested (`A::B::C`, `A::inline B`), anonymous, and alias
    /// forms. Anonymous namespaces add members to the enclosing scope.
    pub(crate) fn parse_namespace(&mut self) -> ParseResult<NodeId> {
        let is_inline_prefix = self.pending_inline_namespace;
        self.pending_inline_namespace = false;

        self.expect(TokenKind::KwNamespace, "'namespace'")?;

        // Anonymous namespace: no new scope; members land in the enclosing
        // scope but carry a unique-linkage id for name mangling.
        if self.peek() == TokenKind::LBrace {
            self.advance();
            self.anon_namespace_counter += 1;
            self.anon_namespace_ids.push(self.anon_namespace_counter);
            let body = (|| -> ParseResult<Vec<NodeId>> {
                let mut decls = Vec::new();
                while self.peek() != TokenKind::RBrace && !self.cursor.is_eof() {
                    let before = self.roots.len();
                    self.parse_top_level_node()?;
                    decls.extend(self.roots.drain(before..));
                }
                self.expect(TokenKind::RBrace, "'}' closing anonymous namespace")?;
                Ok(decls)
            })();
            self.anon_namespace_ids.pop();
            let decls = body?;
            return Ok(self.alloc(Node::NamespaceDecl {
                name: None,
                is_inline: false,
                decls,
            }));
        }

        let first = self.expect(TokenKind::Identifier, "namespace name or '{'")?;
        let mut levels: Vec<(Symbol, bool)> = vec![(first.lexeme, is_inline_prefix)];

        // Nested namespace definitions: `A::B::C`, `A::inline B::C`.
        while self.consume(TokenKind::ColonColon) {
            let nested_inline = self.consume(TokenKind::KwInline);
            let tok = self.expect(TokenKind::Identifier, "namespace name after '::'")?;
            levels.push((tok.lexeme, nested_inline));
        }

        self.skip_attributes();

        // Namespace alias: `namespace X = A::B;`.
        if levels.len() == 1 && self.consume(TokenKind::Assign) {
            let alias = levels[0].0;
            let mut target_path = Vec::new();
            loop {
                let tok = self.expect(TokenKind::Identifier, "namespace name")?;
                target_path.push(tok.lexeme);
                if !self.consume(TokenKind::ColonColon) {
                    break;
                }
            }
            self.expect(TokenKind::Semi, "';' after namespace alias")?;
            let current = self.symbols.current_namespace();
            let Some(target) =
                self.symbols
                    .namespaces
                    .resolve_path(current, &target_path, false)
            else {
                return Err(self.err_here(
                    ParseErrorKind::MissingIdentifier,
                    "namespace alias target does not exist",
                ));
            };
            self.symbols.namespaces.add_alias(current, alias, target);
            return Ok(self.alloc(Node::NamespaceAlias { alias, target }));
        }

        self.expect(TokenKind::LBrace, "'{' after namespace name")?;

        let innermost = levels.last().map(|(n, _)| *n);
        let innermost_inline = levels.last().is_some_and(|(_, i)| *i);
        let mut levels_slice = levels.clone();

        let decls = self.with_namespace_levels(&mut levels_slice, &mut |p| {
            let mut decls = Vec::new();
            while p.peek() != TokenKind::RBrace && !p.cursor.is_eof() {
                let before = p.roots.len();
                p.parse_top_level_node()?;
                decls.extend(p.roots.drain(before..));
            }
            Ok(decls)
        })?;

        self.expect(TokenKind::RBrace, "'}' closing namespace body")?;

        Ok(self.alloc(Node::NamespaceDecl {
            name: innermost,
            is_inline: innermost_inline,
            decls,
        }))
    }

    /// Enter each namespace level left to right, run `f`, exit in reverse
    /// on every path. Inline levels attach a using-directive to the parent
    /// before entry, which is what makes their members visible there.
    fn with_namespace_levels<T>(
        &mut self,
        levels: &mut [(Symbol, bool)],
        f: &mut dyn FnMut(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let Some(((name, is_inline), rest)) = levels.split_first_mut() else {
            return f(self);
        };
        let parent = self.symbols.current_namespace();
        let ns = self.symbols.namespaces.get_or_create(parent, *name);
        if *is_inline {
            self.symbols.namespaces.mark_inline(ns);
            self.symbols.add_using_directive(ns);
        }
        let mut rest_owned: Vec<(Symbol, bool)> = rest.to_vec();
        self.with_scope(ScopeKind::Namespace(ns), |p| {
            p.with_namespace_levels(&mut rest_owned, f)
        })
    }

    /// `__attribute__((...))` and `[[...]]` sequences, consumed and
    /// discarded wherever the grammar allows them.
    pub(crate) fn skip_attributes(&mut self) {
        loop {
            if self.peek() == TokenKind::KwAttribute {
                self.advance();
                if self.consume(TokenKind::LParen) {
                    let mut depth = 1i32;
                    while !self.cursor.is_eof() && depth > 0 {
                        match self.peek() {
                            TokenKind::LParen => depth += 1,
                            TokenKind::RParen => depth -= 1,
                            _ => {}
                        }
                        self.advance();
                    }
                }
                continue;
            }
            if self.peek() == TokenKind::LBracket && self.peek_at(1) == TokenKind::LBracket {
                self.advance();
                self.advance();
                let mut depth = 2i32;
                while !self.cursor.is_eof() && depth > 0 {
                    match self.peek() {
                        TokenKind::LBracket => depth += 1,
                        TokenKind::RBracket => depth -= 1,
                        _ => {}
                    }
                    self.advance();
                }
                continue;
            }
            if self.peek() == TokenKind::KwDeclspec {
                self.advance();
                if self.consume(TokenKind::LParen) {
                    let mut depth = 1i32;
                    while !self.cursor.is_eof() && depth > 0 {
                        match self.peek() {
                            TokenKind::LParen => depth += 1,
                            TokenKind::RParen => depth -= 1,
                            _ => {}
                        }
                        self.advance();
                    }
                }
                continue;
            }
            break;
        }
    }

    // ------------------------------------------------------------------
    // using

    /// `using X = T;`, `using namespace N;`, `using enum E;`,
    /// `using Q::name;`. Returns `None` for forms with no AST node of
    /// their own.
    pub(crate) fn parse_using_directive_or_declaration(
        &mut self,
    ) -> ParseResult<Option<NodeId>> {
        self.expect(TokenKind::KwUsing, "'using'")?;

        // using namespace N;
        if self.consume(TokenKind::KwNamespace) {
            let mut path = Vec::new();
            loop {
                let tok = self.expect(TokenKind::Identifier, "namespace name")?;
                path.push(tok.lexeme);
                if !self.consume(TokenKind::ColonColon) {
                    break;
                }
            }
            self.expect(TokenKind::Semi, "';' after using-directive")?;
            let current = self.symbols.current_namespace();
            let Some(target) = self.symbols.namespaces.resolve_path(current, &path, false)
            else {
                return Err(self.err_here(
                    ParseErrorKind::MissingIdentifier,
                    "using-directive names an unknown namespace",
                ));
            };
            self.symbols.add_using_directive(target);
            return Ok(Some(self.alloc(Node::UsingDirective { target })));
        }

        // using enum E;
        if self.consume(TokenKind::KwEnum) {
            let tok = self.expect(TokenKind::Identifier, "enum name after 'using enum'")?;
            let Some(type_id) = self.lookup_type_name(tok.lexeme) else {
                return Err(self.err_at(
                    ParseErrorKind::MissingIdentifier,
                    "unknown enum in using-enum declaration",
                    tok,
                ));
            };
            self.expect(TokenKind::Semi, "';' after using-enum")?;
            // Inject each enumerator into the enclosing scope.
            let enumerators: Vec<(Symbol, i64)> = self
                .types
                .get(type_id)
                .enum_info
                .as_ref()
                .map(|e| e.enumerators.clone())
                .unwrap_or_default();
            let ty = {
                let info = self.types.get(type_id);
                let mut ts = TypeSpecifier::builtin(BaseKind::Enum, info.align_bits);
                ts.name = Some(info.name);
                ts.type_id = Some(type_id);
                ts
            };
            for (name, value) in enumerators {
                let decl = self.alloc(Node::VarDecl(VarDecl {
                    name,
                    ty: ty.clone(),
                    init: None,
                    linkage: Linkage::None,
                    is_static: false,
                    is_constexpr: true,
                    is_extern: false,
                    is_thread_local: false,
                    const_value: Some(ConstValue::Int(value)),
                }));
                self.symbols.declare(name, decl);
            }
            return Ok(Some(self.alloc(Node::UsingEnum { enum_type: type_id })));
        }

        // Lookahead for the alias form: `using name [[attr]] = ...;`.
        let alias_form = self.peek() == TokenKind::Identifier && {
            let mut probe = 1;
            // Attributes may sit between the name and the '='.
            if self.peek_at(probe) == TokenKind::LBracket
                && self.peek_at(probe + 1) == TokenKind::LBracket
            {
                let mut depth = 0;
                loop {
                    match self.peek_at(probe) {
                        TokenKind::LBracket => depth += 1,
                        TokenKind::RBracket => {
                            depth -= 1;
                            if depth == 0 {
                                probe += 1;
                                break;
                            }
                        }
                        TokenKind::Eof => break,
                        _ => {}
                    }
                    probe += 1;
                }
            }
            self.peek_at(probe) == TokenKind::Assign
        };

        if alias_form {
            let name_tok = self.expect(TokenKind::Identifier, "alias name")?;
            self.skip_attributes();
            self.expect(TokenKind::Assign, "'=' in alias declaration")?;
            let target = self.parse_type_specifier()?;
            self.expect(TokenKind::Semi, "';' after alias declaration")?;
            self.register_type_alias(name_tok.lexeme, target.clone());
            return Ok(Some(self.alloc(Node::TypeSpec(target))));
        }

        // using Q::name;
        let absolute = self.consume(TokenKind::ColonColon);
        let mut path = Vec::new();
        let mut name;
        loop {
            let tok = self.expect(TokenKind::Identifier, "qualified name in using-declaration")?;
            name = tok.lexeme;
            if self.consume(TokenKind::ColonColon) {
                path.push(name);
                continue;
            }
            break;
        }
        self.expect(TokenKind::Semi, "';' after using-declaration")?;

        if path.is_empty() {
            return Err(self.err_here(
                ParseErrorKind::UnexpectedToken,
                "using-declaration requires a qualified name",
            ));
        }

        let targets = self.symbols.qualified_lookup(&path, name, absolute);
        for &target in &targets {
            self.symbols.declare(name, target);
        }
        // If the name is a known type, import it for the current scope
        // under its unqualified spelling too.
        if let Some(id) = self.lookup_qualified_type(absolute, &path, name) {
            self.types.register_name(name, id);
            let qualified = self.namespace_qualified(name);
            self.types.register_name(qualified, id);
        } else if targets.is_empty() {
            return Err(self.err_here(
                ParseErrorKind::MissingIdentifier,
                format!("'{}' not found in using-declaration", self.joined_path(&path, name)),
            ));
        }

        Ok(Some(self.alloc(Node::UsingDeclaration {
            path,
            name,
            targets,
        })))
    }

    /// Register `using X = T` under both unqualified and
    /// namespace-qualified names.
    pub(crate) fn register_type_alias(&mut self, name: Symbol, target: TypeSpecifier) {
        let id = self.types.register(TypeInfo::alias(name, target));
        let qualified = self.namespace_qualified(name);
        self.types.register_name(qualified, id);
        if let Some(ctx) = self.current_struct() {
            let nested = format!(
                "{}::{}",
                self.resolve(ctx.qualified_name),
                self.resolve(name)
            );
            let nested = self.intern(&nested);
            self.types.register_name(nested, id);
        }
    }

    // ------------------------------------------------------------------
    // typedef

    pub(crate) fn parse_typedef_declaration(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::KwTypedef, "'typedef'")?;
        let mut base = self.parse_type_specifier()?;

        // Function-pointer form: `typedef ret (*name)(params);`
        if self.peek() == TokenKind::LParen {
            self.advance();
            let conv = self.parse_calling_convention();
            self.expect(TokenKind::Star, "'*' in function-pointer typedef")?;
            let name_tok = self.expect(TokenKind::Identifier, "typedef name")?;
            self.expect(TokenKind::RParen, "')' in function-pointer typedef")?;
            let params = self.parse_parameter_list()?;
            self.expect(TokenKind::Semi, "';' after typedef")?;

            let mut sig = crate::types::FnSig::new(
                params.into_iter().map(|p| p.ty).collect(),
                base,
            );
            sig.conv = conv.unwrap_or_default();
            let mut fn_ptr = TypeSpecifier::function(sig);
            fn_ptr.base = BaseKind::FunctionPointer;
            self.register_type_alias(name_tok.lexeme, fn_ptr.clone());
            return Ok(self.alloc(Node::TypeSpec(fn_ptr)));
        }

        let name_tok = self.expect(TokenKind::Identifier, "typedef name")?;
        self.parse_array_suffix(&mut base)?;
        self.expect(TokenKind::Semi, "';' after typedef")?;
        self.register_type_alias(name_tok.lexeme, base.clone());
        Ok(self.alloc(Node::TypeSpec(base)))
    }

    pub(crate) fn parse_calling_convention(&mut self) -> Option<CallingConv> {
        let conv = match self.peek() {
            TokenKind::KwCdecl => CallingConv::Cdecl,
            TokenKind::KwStdcall => CallingConv::Stdcall,
            TokenKind::KwThiscall => CallingConv::Thiscall,
            TokenKind::KwFastcall => CallingConv::Fastcall,
            TokenKind::KwVectorcall => CallingConv::Vectorcall,
            _ => return None,
        };
        self.advance();
        Some(conv)
    }

    // ------------------------------------------------------------------
    // enum

    pub(crate) fn parse_enum_declaration(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::KwEnum, "'enum'")?;
        let is_scoped =
            self.consume(TokenKind::KwClass) || self.consume(TokenKind::KwStruct);
        self.skip_attributes();

        let name_tok = self.expect(TokenKind::Identifier, "enum name")?;
        let name = name_tok.lexeme;

        let mut underlying = TypeSpecifier::int();
        if self.consume(TokenKind::Colon) {
            underlying = self.parse_type_specifier()?;
        }
        let underlying_bits = underlying.bits.max(8);

        // Opaque declaration: `enum class E : int;`
        if self.consume(TokenKind::Semi) {
            let info = EnumTypeInfo {
                underlying_bits,
                is_scoped,
                enumerators: Vec::new(),
            };
            let qualified = self.namespace_qualified(name);
            let id = self.types.register(TypeInfo::enumeration(qualified, info.clone()));
            self.types.register_name(name, id);
            return Ok(self.alloc(Node::EnumDecl(EnumDecl {
                name,
                type_id: id,
                is_scoped,
                underlying,
                enumerators: Vec::new(),
            })));
        }

        self.expect(TokenKind::LBrace, "'{' opening enumerator list")?;

        let mut enumerators: Vec<(Symbol, Option<NodeId>, i64)> = Vec::new();
        let mut next_value: i64 = 0;
        while self.peek() != TokenKind::RBrace {
            let tok = self.expect(TokenKind::Identifier, "enumerator name")?;
            self.skip_attributes();
            let mut init = None;
            if self.consume(TokenKind::Assign) {
                let expr = self.parse_expression(2)?;
                init = Some(expr);
                match self.eval_const_expr(expr) {
                    Ok(v) => next_value = v.as_i64(),
                    Err(e) => {
                        return Err(self.err_at(
                            ParseErrorKind::NotConstant,
                            format!("enumerator value is not constant: {}", e.message),
                            tok,
                        ));
                    }
                }
            }
            enumerators.push((tok.lexeme, init, next_value));
            next_value = next_value.wrapping_add(1);
            if !self.consume(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "'}' closing enumerator list")?;
        self.consume(TokenKind::Semi);

        let info = EnumTypeInfo {
            underlying_bits,
            is_scoped,
            enumerators: enumerators.iter().map(|(n, _, v)| (*n, *v)).collect(),
        };
        let qualified = self.namespace_qualified(name);
        let id = self.types.register(TypeInfo::enumeration(qualified, info));
        self.types.register_name(name, id);

        let node = self.alloc(Node::EnumDecl(EnumDecl {
            name,
            type_id: id,
            is_scoped,
            underlying: underlying.clone(),
            enumerators: enumerators.clone(),
        }));

        // Unscoped enumerators are visible in the enclosing scope.
        if !is_scoped {
            let mut enum_ty = TypeSpecifier::builtin(BaseKind::Enum, underlying_bits);
            enum_ty.name = Some(name);
            enum_ty.type_id = Some(id);
            for (ename, _, value) in &enumerators {
                let decl = self.alloc(Node::VarDecl(VarDecl {
                    name: *ename,
                    ty: enum_ty.clone(),
                    init: None,
                    linkage: Linkage::None,
                    is_static: false,
                    is_constexpr: true,
                    is_extern: false,
                    is_thread_local: false,
                    const_value: Some(ConstValue::Int(*value)),
                }));
                self.symbols.declare(*ename, decl);
            }
        }

        Ok(node)
    }

    // ------------------------------------------------------------------
    // extern

    /// `extern "C" {...}`, `extern "C" decl;`, `extern template ...;`, or
    /// a plain extern declaration.
    fn parse_extern_or_declaration(&mut self) -> ParseResult<()> {
        let save = self.cursor.save_position();
        self.expect(TokenKind::KwExtern, "'extern'")?;

        if self.peek() == TokenKind::StrLit {
            let tok = self.advance();
            let raw = self.lexeme(&tok);
            let linkage_str = raw.trim_matches('"');
            let linkage = match linkage_str {
                "C" => Linkage::C,
                "C++" => Linkage::Cpp,
                other => {
                    self.cursor.discard_position(save);
                    return Err(self.err_at(
                        ParseErrorKind::UnexpectedToken,
                        format!("unknown linkage specification: \"{other}\""),
                        tok,
                    ));
                }
            };
            self.cursor.discard_position(save);

            if self.consume(TokenKind::LBrace) {
                let saved_linkage = self.linkage;
                self.linkage = linkage;
                let result = (|| -> ParseResult<()> {
                    while self.peek() != TokenKind::RBrace && !self.cursor.is_eof() {
                        self.parse_top_level_node()?;
                    }
                    self.expect(TokenKind::RBrace, "'}' closing linkage block")?;
                    Ok(())
                })();
                self.linkage = saved_linkage;
                return result;
            }

            let saved_linkage = self.linkage;
            self.linkage = linkage;
            let result = self.parse_declaration_or_function_definition();
            self.linkage = saved_linkage;
            if let Some(node) = result? {
                self.roots.push(node);
            }
            return Ok(());
        }

        if self.peek() == TokenKind::KwTemplate {
            // Explicit instantiation declaration; routed through the
            // template grammar without forcing a new instantiation.
            self.cursor.discard_position(save);
            let node = self.parse_template_declaration()?;
            if let Some(node) = node {
                self.roots.push(node);
            }
            return Ok(());
        }

        // Plain extern declaration: rewind and let the fallthrough parse
        // it with the extern specifier.
        self.cursor.restore_position(save);
        let node = self.parse_declaration_or_function_definition()?;
        if let Some(node) = node {
            self.roots.push(node);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // declaration-or-function-definition fallthrough

    /// Shared specifier soup, then a function or variable declarator.
    pub(crate) fn parse_declaration_or_function_definition(
        &mut self,
    ) -> ParseResult<Option<NodeId>> {
        self.skip_attributes();

        let mut is_static = false;
        let mut is_inline = false;
        let mut is_constexpr = false;
        let mut is_consteval = false;
        let mut is_extern = false;
        let mut is_thread_local = false;
        let mut is_virtual = false;
        loop {
            match self.peek() {
                TokenKind::KwStatic => {
                    self.advance();
                    is_static = true;
                }
                TokenKind::KwInline | TokenKind::KwForceinline => {
                    self.advance();
                    is_inline = true;
                }
                TokenKind::KwConstexpr => {
                    self.advance();
                    is_constexpr = true;
                }
                TokenKind::KwConsteval => {
                    self.advance();
                    is_consteval = true;
                }
                TokenKind::KwConstinit => {
                    self.advance();
                }
                TokenKind::KwExtern => {
                    self.advance();
                    is_extern = true;
                }
                TokenKind::KwThreadLocal => {
                    self.advance();
                    is_thread_local = true;
                }
                TokenKind::KwVirtual => {
                    self.advance();
                    is_virtual = true;
                }
                TokenKind::KwAlignas => {
                    self.advance();
                    self.expect(TokenKind::LParen, "'(' after 'alignas'")?;
                    let _ = self.try_parse_type();
                    if self.peek() != TokenKind::RParen {
                        let _ = self.parse_expression(0)?;
                    }
                    self.expect(TokenKind::RParen, "')' after alignas")?;
                }
                _ => break,
            }
        }
        self.skip_attributes();

        let mut ret = self.parse_base_type()?;
        let conv = self.parse_calling_convention();
        self.parse_ptr_operators(&mut ret);
        let conv = conv.or_else(|| self.parse_calling_convention());

        // `operator` overload at namespace scope.
        if self.peek() == TokenKind::KwOperator {
            let name = self.parse_operator_function_name()?;
            return self
                .finish_function_declaration(
                    name,
                    ret,
                    conv,
                    is_static,
                    is_inline,
                    is_constexpr,
                    is_consteval,
                    is_virtual,
                    true,
                )
                .map(Some);
        }

        let name_tok = self.expect(TokenKind::Identifier, "a declaration name")?;
        let mut name = name_tok.lexeme;

        // Out-of-class member definition: `ret S::f(...) { ... }`.
        let mut class_path: Vec<Symbol> = Vec::new();
        while self.consume(TokenKind::ColonColon) {
            class_path.push(name);
            if self.peek() == TokenKind::KwOperator {
                let op_name = self.parse_operator_function_name()?;
                return self
                    .finish_member_definition(class_path, op_name, ret, conv)
                    .map(Some);
            }
            let tok = self.expect(TokenKind::Identifier, "name after '::'")?;
            name = tok.lexeme;
        }

        if !class_path.is_empty() && self.peek() == TokenKind::LParen {
            return self
                .finish_member_definition(class_path, name, ret, conv)
                .map(Some);
        }

        if self.peek() == TokenKind::LParen {
            return self
                .finish_function_declaration(
                    name,
                    ret,
                    conv,
                    is_static,
                    is_inline,
                    is_constexpr,
                    is_consteval,
                    is_virtual,
                    false,
                )
                .map(Some);
        }

        // Variable declaration (possibly a comma list).
        let linkage = self.linkage;
        let mut decls = Vec::new();
        let base = ret;
        let mut first = true;
        loop {
            let (var_name, mut ty) = if first {
                first = false;
                (name, base.clone())
            } else {
                let mut ty = base.clone();
                ty.ptr.clear();
                ty.ref_kind = crate::types::RefKind::None;
                self.parse_ptr_operators(&mut ty);
                let tok = self.expect(TokenKind::Identifier, "variable name")?;
                (tok.lexeme, ty)
            };
            self.parse_array_suffix(&mut ty)?;

            let init = if self.consume(TokenKind::Assign) {
                Some(self.parse_assignment_expression()?)
            } else if self.peek() == TokenKind::LBrace {
                Some(self.parse_constructor_call(ty.clone())?)
            } else if self.peek() == TokenKind::LParen && !ty.is_auto() {
                Some(self.parse_constructor_call(ty.clone())?)
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
                name: var_name,
                ty: resolved_ty,
                init,
                linkage,
                is_static,
                is_constexpr: is_constexpr || is_consteval,
                is_extern,
                is_thread_local,
                const_value,
            }));
            self.symbols.declare(var_name, decl);
            decls.push(decl);

            if !self.consume(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Semi, "';' after declaration")?;

        match decls.len() {
            1 => Ok(Some(decls[0])),
            _ => Ok(Some(self.alloc(Node::Block { stmts: decls }))),
        }
    }

    /// Function declarator after the name: parameters, suffix, body or
    /// semicolon. Declares the function in the current scope.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn finish_function_declaration(
        &mut self,
        name: Symbol,
        ret: TypeSpecifier,
        conv: Option<CallingConv>,
        is_static: bool,
        is_inline: bool,
        is_constexpr: bool,
        is_consteval: bool,
        is_virtual: bool,
        is_operator: bool,
    ) -> ParseResult<NodeId> {
        let mut params = self.parse_parameter_list()?;
        let is_variadic = params
            .last()
            .is_some_and(|p| p.ty.is_void() && p.ty.pack_expansion);
        if is_variadic {
            params.pop();
        }
        let suffix = self.parse_function_suffix()?;

        let linkage = if self.linkage != Linkage::None {
            self.linkage
        } else {
            Linkage::Cpp
        };
        let mut ret = ret;
        if let Some(trailing) = &suffix.trailing_return {
            ret = trailing.clone();
        }

        let mangled = self.mangled_name_for(name, &params, linkage);

        let decl = self.alloc(Node::FunctionDecl(FunctionDecl {
            name,
            mangled: Some(mangled),
            ret,
            params: params.clone(),
            body: None,
            linkage,
            flags: FnFlags {
                is_static,
                is_inline,
                is_constexpr,
                is_consteval,
                is_virtual,
                is_pure: suffix.is_pure,
                is_override: suffix.is_override,
                is_final: suffix.is_final,
                is_defaulted: suffix.is_defaulted,
                is_deleted: suffix.is_deleted,
                is_variadic,
                is_operator,
                ..FnFlags::default()
            },
            member_of: None,
            cv: suffix.cv,
            ref_qual: suffix.ref_qual,
            noexcept: suffix.noexcept,
            conv: conv.unwrap_or_default(),
            requires_clause: suffix.requires_clause,
            access: crate::types::Access::Public,
            ctor_inits: Vec::new(),
        }));
        self.symbols.declare(name, decl);

        if self.peek() == TokenKind::LBrace {
            let mut body_params = params;
            let body = self.parse_function_body(&mut body_params, None)?;
            if let Node::FunctionDecl(f) = self.arena.get_mut(decl) {
                f.body = Some(body);
                f.params = body_params;
            }
            // `auto` return deduction after the body exists.
            let needs_deduction = matches!(
                self.arena.get(decl),
                Node::FunctionDecl(f) if f.ret.is_auto()
            );
            if needs_deduction
                && let Some(deduced) = self.deduce_return_type(body)?
                && let Node::FunctionDecl(f) = self.arena.get_mut(decl)
            {
                f.ret = deduced;
            }
        } else {
            self.expect(TokenKind::Semi, "';' after function declaration")?;
        }

        Ok(decl)
    }

    /// `ret Class::member(...) { ... }` — attach the body to the in-class
    /// declaration.
    fn finish_member_definition(
        &mut self,
        class_path: Vec<Symbol>,
        name: Symbol,
        ret: TypeSpecifier,
        _conv: Option<CallingConv>,
    ) -> ParseResult<NodeId> {
        let (last, rest) = class_path.split_last().expect("non-empty class path");
        let Some(class_id) = self.lookup_qualified_type(false, rest, *last) else {
            return Err(self.err_here(
                ParseErrorKind::MissingIdentifier,
                format!("'{}' is not a class", self.joined_path(rest, *last)),
            ));
        };

        let mut params = self.parse_parameter_list()?;
        let suffix = self.parse_function_suffix()?;

        // Find the in-class declaration to attach to.
        let declared = self
            .types
            .get(class_id)
            .struct_info
            .as_ref()
            .map(|info| {
                info.member_functions
                    .iter()
                    .copied()
                    .find(|&f| {
                        matches!(self.arena.get(f), Node::FunctionDecl(d)
                            if d.name == name && d.params.len() == params.len())
                    })
            })
            .unwrap_or(None);

        let target = match declared {
            Some(decl) => decl,
            None => {
                // Definition without an in-class declaration.
                return Err(self.err_here(
                    ParseErrorKind::MissingIdentifier,
                    format!(
                        "'{}' has no member '{}' matching this definition",
                        self.joined_path(rest, *last),
                        self.resolve(name)
                    ),
                ));
            }
        };

        if self.peek() != TokenKind::LBrace {
            self.expect(TokenKind::Semi, "';' or body after member declarator")?;
            return Ok(target);
        }

        let body = self.parse_function_body(&mut params, Some(class_id))?;
        if let Node::FunctionDecl(f) = self.arena.get_mut(target) {
            f.body = Some(body);
            if let Some(trailing) = suffix.trailing_return {
                f.ret = trailing;
            } else if !ret.is_auto() {
                f.ret = ret;
            }
        }
        Ok(target)
    }
}
