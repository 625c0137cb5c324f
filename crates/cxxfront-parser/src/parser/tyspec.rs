//! `type-specifier-seq` parsing.
//!
//! One entry point, [`Parser::parse_type_specifier`], recognizes
//! cv-qualifiers, builtin combinations (`unsigned long long int`),
//! elaborated specifiers, `decltype(expr)`, `typename`-marked dependent
//! names, and user-defined names with qualified paths and template
//! arguments, then the trailing ptr-operator sequence. Array dimensions
//! and function declarators belong to the declaration grammar, not here.
//!
//! An identifier counts as a type when it names a known type, a type
//! template parameter, or the grammar demands a type (`typename`).

use cxxfront_core::Symbol;

use crate::ast::TemplateParamKind;
use crate::diag::{ParseErrorKind, ParseResult};
use crate::parser::{ExprContext, Parser};
use crate::templates::TemplateArg;
use crate::token::TokenKind;
use crate::types::{BaseKind, CvQual, PtrLevel, RefKind, StructTypeInfo, TypeId, TypeInfo, TypeSpecifier};

impl Parser {
    /// Full type parse: base + ptr-operators + reference. Does not consume
    /// anything on failure when wrapped in `speculate`.
    pub(crate) fn parse_type_specifier(&mut self) -> ParseResult<TypeSpecifier> {
        let mut ts = self.parse_base_type()?;
        self.parse_ptr_operators(&mut ts);
        Ok(ts)
    }

    /// Speculative type parse; rewinds and returns `None` when the tokens
    /// don't form a type.
    pub(crate) fn try_parse_type(&mut self) -> Option<TypeSpecifier> {
        self.try_speculate(Self::parse_type_specifier)
    }

    /// `type-specifier` without ptr-operators.
    pub(crate) fn parse_base_type(&mut self) -> ParseResult<TypeSpecifier> {
        let mut cv = CvQual::NONE;
        loop {
            match self.peek() {
                TokenKind::KwConst => {
                    self.advance();
                    cv.is_const = true;
                }
                TokenKind::KwVolatile => {
                    self.advance();
                    cv.is_volatile = true;
                }
                TokenKind::KwRestrict => {
                    self.advance();
                }
                _ => break,
            }
        }

        let mut ts = match self.peek() {
            k if k.is_builtin_type_keyword() => self.parse_builtin_combo()?,
            TokenKind::KwDecltype => self.parse_decltype_type()?,
            TokenKind::KwTypename => self.parse_typename_type()?,
            TokenKind::KwStruct | TokenKind::KwClass | TokenKind::KwUnion | TokenKind::KwEnum => {
                self.parse_elaborated_type()?
            }
            TokenKind::Identifier | TokenKind::ColonColon => self.parse_named_type()?,
            _ => {
                return Err(self.err_here(ParseErrorKind::UnexpectedToken, "expected a type"));
            }
        };

        // Trailing cv-qualifiers (`int const`).
        loop {
            match self.peek() {
                TokenKind::KwConst => {
                    self.advance();
                    cv.is_const = true;
                }
                TokenKind::KwVolatile => {
                    self.advance();
                    cv.is_volatile = true;
                }
                _ => break,
            }
        }
        ts.cv = ts.cv.merge(cv);
        Ok(ts)
    }

    /// `* const volatile`, `&`, `&&`, pointer-to-member `C::*`, and MSVC
    /// pointer modifiers.
    pub(crate) fn parse_ptr_operators(&mut self, ts: &mut TypeSpecifier) {
        loop {
            match self.peek() {
                // Pointer-to-member: `T C::* p`, possibly with a
                // namespace-qualified class path.
                TokenKind::Identifier if self.member_pointer_ahead() => {
                    let mut path: Vec<Symbol> = vec![self.advance().lexeme];
                    loop {
                        self.consume(TokenKind::ColonColon);
                        if self.consume(TokenKind::Star) {
                            break;
                        }
                        path.push(self.advance().lexeme);
                    }
                    if let Some((last, rest)) = path.split_last() {
                        ts.member_of = self.lookup_qualified_type(false, rest, *last);
                    }
                    ts.ptr.push(PtrLevel::default());
                }
                TokenKind::Star => {
                    self.advance();
                    let mut level = PtrLevel::default();
                    loop {
                        match self.peek() {
                            TokenKind::KwConst => {
                                self.advance();
                                level.cv.is_const = true;
                            }
                            TokenKind::KwVolatile => {
                                self.advance();
                                level.cv.is_volatile = true;
                            }
                            TokenKind::KwRestrict => {
                                self.advance();
                            }
                            _ => break,
                        }
                    }
                    ts.ptr.push(level);
                }
                TokenKind::Amp => {
                    self.advance();
                    ts.ref_kind = RefKind::LValue;
                }
                TokenKind::AmpAmp => {
                    self.advance();
                    ts.ref_kind = RefKind::RValue;
                }
                _ => break,
            }
        }
        // `T...` pack expansion in parameter and argument lists.
        if self.peek() == TokenKind::Ellipsis
            && ts
                .name
                .is_some_and(|n| self.find_template_param(n).is_some_and(|p| p.is_pack))
        {
            self.advance();
            ts.pack_expansion = true;
        }
    }

    /// Lookahead for `Ident (:: Ident)* :: *` without consuming.
    fn member_pointer_ahead(&self) -> bool {
        let mut offset = 0usize;
        loop {
            if self.peek_at(offset) != TokenKind::Identifier {
                return false;
            }
            if self.peek_at(offset + 1) != TokenKind::ColonColon {
                return false;
            }
            match self.peek_at(offset + 2) {
                TokenKind::Star => return true,
                TokenKind::Identifier => offset += 2,
                _ => return false,
            }
        }
    }

    fn parse_builtin_combo(&mut self) -> ParseResult<TypeSpecifier> {
        let mut signed: Option<bool> = None;
        let mut long_count = 0u8;
        let mut short = false;
        let mut base: Option<BaseKind> = None;

        loop {
            match self.peek() {
                TokenKind::KwSigned => {
                    self.advance();
                    signed = Some(true);
                }
                TokenKind::KwUnsigned => {
                    self.advance();
                    signed = Some(false);
                }
                TokenKind::KwLong => {
                    self.advance();
                    long_count += 1;
                }
                TokenKind::KwShort => {
                    self.advance();
                    short = true;
                }
                TokenKind::KwInt => {
                    self.advance();
                    base.get_or_insert(BaseKind::Int);
                }
                TokenKind::KwChar => {
                    self.advance();
                    base = Some(BaseKind::Char);
                }
                TokenKind::KwBool => {
                    self.advance();
                    base = Some(BaseKind::Bool);
                }
                TokenKind::KwVoid => {
                    self.advance();
                    base = Some(BaseKind::Void);
                }
                TokenKind::KwFloat => {
                    self.advance();
                    base = Some(BaseKind::Float);
                }
                TokenKind::KwDouble => {
                    self.advance();
                    base = Some(BaseKind::Double);
                }
                TokenKind::KwWcharT => {
                    self.advance();
                    base = Some(BaseKind::WChar);
                }
                TokenKind::KwChar8T => {
                    self.advance();
                    base = Some(BaseKind::Char8);
                }
                TokenKind::KwChar16T => {
                    self.advance();
                    base = Some(BaseKind::Char16);
                }
                TokenKind::KwChar32T => {
                    self.advance();
                    base = Some(BaseKind::Char32);
                }
                TokenKind::KwAuto => {
                    self.advance();
                    return Ok(TypeSpecifier::auto());
                }
                _ => break,
            }
        }

        let unsigned = signed == Some(false);
        let kind = match base {
            Some(BaseKind::Double) if long_count > 0 => BaseKind::LongDouble,
            Some(BaseKind::Char) => {
                if unsigned {
                    BaseKind::UnsignedChar
                } else if signed == Some(true) {
                    BaseKind::SignedChar
                } else {
                    BaseKind::Char
                }
            }
            Some(b @ (BaseKind::Bool | BaseKind::Void | BaseKind::Float | BaseKind::WChar
            | BaseKind::Char8 | BaseKind::Char16 | BaseKind::Char32)) => b,
            Some(BaseKind::Double) => BaseKind::Double,
            // `int`, bare `signed`/`unsigned`, and the long/short families.
            _ => match (short, long_count, unsigned) {
                (true, _, false) => BaseKind::Short,
                (true, _, true) => BaseKind::UShort,
                (false, 0, false) => BaseKind::Int,
                (false, 0, true) => BaseKind::UInt,
                (false, 1, false) => BaseKind::Long,
                (false, 1, true) => BaseKind::ULong,
                (false, _, false) => BaseKind::LongLong,
                (false, _, true) => BaseKind::ULongLong,
            },
        };
        let bits = kind.fixed_bits(&self.options).unwrap_or(0);
        Ok(TypeSpecifier::builtin(kind, bits))
    }

    fn parse_decltype_type(&mut self) -> ParseResult<TypeSpecifier> {
        self.expect(TokenKind::KwDecltype, "'decltype'")?;
        self.expect(TokenKind::LParen, "'(' after 'decltype'")?;
        let expr = self.with_expr_context(ExprContext::Decltype, |p| p.parse_expression(0))?;
        self.expect(TokenKind::RParen, "')' after decltype expression")?;
        if let Some(ty) = self.expr_type(expr) {
            return Ok(ty);
        }
        if self.in_template() {
            // Dependent; resolved at substitution.
            return Ok(TypeSpecifier::user_defined(self.intern("__decltype"), None));
        }
        Err(self.err_here(
            ParseErrorKind::NotImplemented,
            "cannot determine the type of this decltype operand",
        ))
    }

    fn parse_typename_type(&mut self) -> ParseResult<TypeSpecifier> {
        self.expect(TokenKind::KwTypename, "'typename'")?;
        // `typename` forces type interpretation of the qualified name.
        let mut ts = self.parse_named_type()?;
        if ts.type_id.is_none() {
            ts.base = BaseKind::UserDefined;
        }
        Ok(ts)
    }

    fn parse_elaborated_type(&mut self) -> ParseResult<TypeSpecifier> {
        let keyword = self.advance();
        let name_tok = self.peek_info();
        if name_tok.kind != TokenKind::Identifier {
            return Err(self.err_at(
                ParseErrorKind::MissingIdentifier,
                "expected a name after elaborated type specifier",
                name_tok,
            ));
        }
        self.advance();
        let name = name_tok.lexeme;

        if let Some(id) = self.lookup_type_name(name) {
            let info = self.types.get(id);
            let base = info.base;
            let bits = info.size_bits.min(u64::from(u32::MAX)) as u32;
            let mut ts = TypeSpecifier::builtin(base, bits);
            ts.name = Some(name);
            ts.type_id = Some(id);
            return Ok(ts);
        }

        // Forward use: register an incomplete record so `struct S*` works
        // before S is defined.
        let qualified = self.namespace_qualified(name);
        let is_enum = keyword.kind == TokenKind::KwEnum;
        let id = if is_enum {
            self.types.register(TypeInfo {
                name: qualified,
                base: BaseKind::Enum,
                size_bits: 32,
                align_bits: 32,
                struct_info: None,
                enum_info: None,
                alias_of: None,
            })
        } else {
            self.types.register(TypeInfo {
                name: qualified,
                base: BaseKind::Struct,
                size_bits: 0,
                align_bits: 0,
                struct_info: Some(StructTypeInfo {
                    is_union: keyword.kind == TokenKind::KwUnion,
                    ..StructTypeInfo::default()
                }),
                enum_info: None,
                alias_of: None,
            })
        };
        self.types.register_name(name, id);
        let mut ts = TypeSpecifier::builtin(if is_enum { BaseKind::Enum } else { BaseKind::Struct }, 0);
        ts.name = Some(name);
        ts.type_id = Some(id);
        Ok(ts)
    }

    /// User-defined names: plain, qualified, and template-ids.
    fn parse_named_type(&mut self) -> ParseResult<TypeSpecifier> {
        let absolute = self.consume(TokenKind::ColonColon);
        let mut path: Vec<Symbol> = Vec::new();

        loop {
            let tok = self.peek_info();
            if tok.kind != TokenKind::Identifier {
                return Err(self.err_at(
                    ParseErrorKind::UnexpectedToken,
                    "expected a type name",
                    tok,
                ));
            }
            self.advance();
            let name = tok.lexeme;

            // Template-id segment?
            let mut args: Option<Vec<TemplateArg>> = None;
            if self.peek() == TokenKind::Lt
                && (self.templates.is_template(name)
                    || self
                        .find_template_param(name)
                        .is_some_and(|p| matches!(p.kind, TemplateParamKind::Template { .. })))
            {
                args = Some(self.parse_explicit_template_arguments()?);
            }

            if self.consume(TokenKind::ColonColon) {
                match args {
                    None => {
                        path.push(name);
                        continue;
                    }
                    Some(args) => {
                        // `Tmpl<...>::rest` — resolve the head first.
                        let head = self.resolve_template_id(name, args)?;
                        return self.parse_dependent_member_type(head);
                    }
                }
            }

            return match args {
                Some(args) => self.resolve_template_id(name, args),
                None => self.resolve_plain_type(absolute, &path, name),
            };
        }
    }

    /// `Head::member` (and deeper) where `Head` is a template-id. When the
    /// head is concrete, member aliases were registered under the mangled
    /// class name at instantiation; otherwise the whole path is dependent.
    fn parse_dependent_member_type(&mut self, head: TypeSpecifier) -> ParseResult<TypeSpecifier> {
        let mut segments: Vec<Symbol> = Vec::new();
        loop {
            let tok = self.peek_info();
            if tok.kind != TokenKind::Identifier {
                return Err(self.err_at(
                    ParseErrorKind::MissingIdentifier,
                    "expected a member type name",
                    tok,
                ));
            }
            self.advance();
            segments.push(tok.lexeme);
            if !self.consume(TokenKind::ColonColon) {
                break;
            }
        }

        if let Some(head_id) = head.type_id {
            let mut scope = self.resolve(self.types.get(head_id).name).to_string();
            for seg in &segments {
                scope.push_str("::");
                scope.push_str(&self.resolve(*seg));
            }
            let full = self.intern(&scope);
            if let Some(id) = self.types.lookup(full) {
                let info = self.types.get(id);
                let mut ts = TypeSpecifier::builtin(info.base, 0);
                ts.name = Some(full);
                ts.type_id = Some(id);
                return Ok(self.types.resolve_alias(&ts));
            }
        }

        // Dependent: keep the spelled path; substitution re-resolves it.
        let head_name = head.name.map_or_else(String::new, |n| self.resolve(n).to_string());
        let mut spelled = head_name;
        for seg in &segments {
            spelled.push_str("::");
            spelled.push_str(&self.resolve(*seg));
        }
        let mut ts = TypeSpecifier::user_defined(self.intern(&spelled), None);
        ts.template_args = head.template_args;
        Ok(ts)
    }

    /// Instantiate (or defer) `name<args>` as a type.
    pub(crate) fn resolve_template_id(
        &mut self,
        name: Symbol,
        args: Vec<TemplateArg>,
    ) -> ParseResult<TypeSpecifier> {
        let dependent = args.iter().any(|a| self.template_arg_is_dependent(a));
        if dependent {
            let mut ts = TypeSpecifier::user_defined(name, None);
            ts.template_args = args
                .iter()
                .map(|a| self.template_arg_as_spec(a))
                .collect();
            return Ok(ts);
        }
        if self.templates.aliases.contains_key(&name) {
            return self.instantiate_alias_template(name, &args);
        }
        if self.templates.classes.contains_key(&name) {
            return self.instantiate_class_template(name, &args);
        }
        // A template-template parameter used as `TT<int>` stays dependent.
        if self.find_template_param(name).is_some() {
            let mut ts = TypeSpecifier::user_defined(name, None);
            ts.template_args = args
                .iter()
                .map(|a| self.template_arg_as_spec(a))
                .collect();
            return Ok(ts);
        }
        Err(self.err_here(
            ParseErrorKind::MissingIdentifier,
            format!("'{}' is not a class or alias template", self.resolve(name)),
        ))
    }

    pub(crate) fn template_arg_is_dependent(&self, arg: &TemplateArg) -> bool {
        match arg {
            TemplateArg::Type(ty) => self.type_is_dependent(ty),
            TemplateArg::Value { .. } => false,
            TemplateArg::Template(name) => self.find_template_param(*name).is_some(),
        }
    }

    pub(crate) fn type_is_dependent(&self, ty: &TypeSpecifier) -> bool {
        if ty.base == BaseKind::UserDefined && ty.type_id.is_none() {
            return true;
        }
        ty.template_args.iter().any(|a| self.type_is_dependent(a))
    }

    pub(crate) fn template_arg_as_spec(&self, arg: &TemplateArg) -> TypeSpecifier {
        match arg {
            TemplateArg::Type(ty) => ty.clone(),
            TemplateArg::Value { ty, .. } => {
                // Evaluated non-type argument; remember the value through
                // the spelled name.
                ty.clone()
            }
            TemplateArg::Template(name) => TypeSpecifier::user_defined(*name, None),
        }
    }

    fn resolve_plain_type(
        &mut self,
        absolute: bool,
        path: &[Symbol],
        name: Symbol,
    ) -> ParseResult<TypeSpecifier> {
        // Type template parameter.
        if path.is_empty()
            && !absolute
            && let Some(param) = self.find_template_param(name)
            && matches!(param.kind, TemplateParamKind::Type { .. })
        {
            return Ok(TypeSpecifier::user_defined(name, None));
        }

        if let Some(id) = self.lookup_qualified_type(absolute, path, name) {
            let info = self.types.get(id);
            let base = info.base;
            let bits = info.size_bits.min(u64::from(u32::MAX)) as u32;
            let mut ts = TypeSpecifier::builtin(base, bits);
            ts.name = Some(info.name);
            ts.type_id = Some(id);
            return Ok(self.types.resolve_alias(&ts));
        }

        // Dependent qualified path whose head is a template parameter:
        // `T::value_type` without `typename` is rejected, matching the
        // grammar's demand for the keyword.
        Err(self.err_here(
            ParseErrorKind::UnexpectedToken,
            format!("'{}' does not name a type", self.resolve(name)),
        ))
    }

    /// Find a type by (possibly qualified) name, trying each enclosing
    /// namespace as a prefix, innermost first.
    pub(crate) fn lookup_qualified_type(
        &self,
        absolute: bool,
        path: &[Symbol],
        name: Symbol,
    ) -> Option<TypeId> {
        let mut suffix = String::new();
        for seg in path {
            suffix.push_str(&self.resolve(*seg));
            suffix.push_str("::");
        }
        suffix.push_str(&self.resolve(name));

        if absolute {
            return self.types.lookup(self.interner.intern(&suffix));
        }

        // Innermost class scope first (nested type names).
        if let Some(ctx) = self.current_struct() {
            let qualified = format!("{}::{suffix}", self.resolve(ctx.qualified_name));
            if let Some(id) = self.types.lookup(self.interner.intern(&qualified)) {
                return Some(id);
            }
        }

        let mut prefixes = self.namespace_prefixes();
        prefixes.push(String::new());
        for prefix in prefixes {
            let candidate = if prefix.is_empty() {
                suffix.clone()
            } else {
                format!("{prefix}::{suffix}")
            };
            if let Some(id) = self.types.lookup(self.interner.intern(&candidate)) {
                return Some(id);
            }
        }
        None
    }

    pub(crate) fn lookup_type_name(&self, name: Symbol) -> Option<TypeId> {
        self.lookup_qualified_type(false, &[], name)
    }

    /// Enclosing namespace paths, innermost first (`a::b`, then `a`).
    pub(crate) fn namespace_prefixes(&self) -> Vec<String> {
        let mut chain = Vec::new();
        let mut ns = Some(self.symbols.current_namespace());
        while let Some(current) = ns {
            if let Some(name) = self.symbols.namespaces.name(current) {
                chain.push(self.resolve(name).to_string());
            }
            ns = self.symbols.namespaces.parent(current);
        }
        // chain is innermost-first names; build full prefixes.
        let mut prefixes = Vec::new();
        let full: Vec<_> = chain.iter().rev().cloned().collect();
        for end in (1..=full.len()).rev() {
            prefixes.push(full[..end].join("::"));
        }
        prefixes
    }

    /// `name` qualified with the current namespace path, interned.
    pub(crate) fn namespace_qualified(&self, name: Symbol) -> Symbol {
        let prefixes = self.namespace_prefixes();
        match prefixes.first() {
            Some(prefix) => self.intern(&format!("{prefix}::{}", self.resolve(name))),
            None => name,
        }
    }
}
