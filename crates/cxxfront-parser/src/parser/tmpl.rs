//! Template heads and template declarations.
//!
//! `template <...>` introduces one of: a class template (or partial
//! specialization), a function template, a variable template, an alias
//! template, or a concept. The parameter list goes onto the active
//! template-parameter stack for the duration of the declaration so
//! dependent names parse as dependent.

use cxxfront_core::Symbol;

use crate::ast::{
    FnFlags, FunctionDecl, Linkage, Node, NodeId, TemplateParam, TemplateParamKind, VarDecl,
};
use crate::diag::{ParseErrorKind, ParseResult};
use crate::parser::{ExprContext, Parser};
use crate::templates::{
    AliasTemplate, ClassTemplate, ConceptInfo, FunctionTemplate, PartialSpecialization,
    VariableTemplate,
};
use crate::token::TokenKind;

impl Parser {
    /// `template` already peeked by the caller.
    pub(crate) fn parse_template_declaration(&mut self) -> ParseResult<Option<NodeId>> {
        self.expect(TokenKind::KwTemplate, "'template'")?;

        // Explicit instantiation: `template class Vec<int>;`.
        if self.peek() != TokenKind::Lt {
            return self.parse_explicit_instantiation();
        }

        let params = self.parse_template_parameter_list()?;
        self.template_params.push(params.clone());
        let was_in_body = self.parsing_template_body;
        self.parsing_template_body = true;

        let result = self.parse_templated_entity(params);

        self.parsing_template_body = was_in_body;
        self.template_params.pop();
        result
    }

    fn parse_templated_entity(
        &mut self,
        params: Vec<TemplateParam>,
    ) -> ParseResult<Option<NodeId>> {
        // Requires-clause after the head.
        let mut head_requires = None;
        if self.consume(TokenKind::KwRequires) {
            let expr = self.with_expr_context(ExprContext::RequiresClause, |p| {
                p.parse_expression(8)
            })?;
            head_requires = Some(self.alloc(Node::RequiresClause { expr }));
        }

        match self.peek() {
            TokenKind::KwConcept => {
                self.advance();
                let name_tok = self.expect(TokenKind::Identifier, "concept name")?;
                self.expect(TokenKind::Assign, "'=' after concept name")?;
                let body = self.with_expr_context(ExprContext::RequiresClause, |p| {
                    p.parse_expression(2)
                })?;
                self.expect(TokenKind::Semi, "';' after concept definition")?;
                let name = name_tok.lexeme;
                self.templates
                    .concepts
                    .insert(name, ConceptInfo {
                        params: params.clone(),
                        body,
                    });
                let node = self.alloc(Node::ConceptDecl {
                    name,
                    params,
                    body,
                });
                self.roots.push(node);
                Ok(None)
            }
            TokenKind::KwStruct | TokenKind::KwClass | TokenKind::KwUnion => {
                self.parse_class_template(params, head_requires)
            }
            TokenKind::KwUsing => {
                self.advance();
                let name_tok = self.expect(TokenKind::Identifier, "alias template name")?;
                self.expect(TokenKind::Assign, "'=' in alias template")?;
                let aliased = self.parse_type_specifier()?;
                self.expect(TokenKind::Semi, "';' after alias template")?;
                let name = name_tok.lexeme;
                self.templates.aliases.insert(name, AliasTemplate {
                    params: params.clone(),
                    name,
                    aliased: aliased.clone(),
                });
                Ok(Some(self.alloc(Node::TemplateAlias {
                    params,
                    name,
                    aliased,
                })))
            }
            _ => self.parse_function_or_variable_template(params, head_requires),
        }
    }

    fn parse_class_template(
        &mut self,
        params: Vec<TemplateParam>,
        head_requires: Option<NodeId>,
    ) -> ParseResult<Option<NodeId>> {
        let keyword = self.advance();
        let (is_union, is_class) = match keyword.kind {
            TokenKind::KwUnion => (true, false),
            TokenKind::KwClass => (false, true),
            _ => (false, false),
        };
        self.skip_attributes();
        let name_tok = self.expect(TokenKind::Identifier, "class template name")?;
        let name = name_tok.lexeme;

        // Partial specialization: `template<..> struct Vec<T*> { ... };`
        if self.peek() == TokenKind::Lt {
            let pattern = self.parse_explicit_template_arguments()?;
            let spec_index = self
                .templates
                .class_specializations
                .get(&name)
                .map_or(0, Vec::len);
            let record_name = self.intern(&format!("{}@spec{}", self.resolve(name), spec_index));
            let decl = self.parse_struct_tail(is_union, is_class, record_name, None)?;
            let node = self.alloc(Node::TemplateClassDecl {
                params: params.clone(),
                decl,
                requires_clause: head_requires,
            });
            self.templates.add_specialization(name, PartialSpecialization {
                params,
                pattern,
                node,
                decl,
            });
            return Ok(Some(node));
        }

        let decl = self.parse_struct_tail(is_union, is_class, name, None)?;
        let node = self.alloc(Node::TemplateClassDecl {
            params: params.clone(),
            decl,
            requires_clause: head_requires,
        });
        self.templates.classes.insert(name, ClassTemplate {
            params,
            node,
            decl,
            requires_clause: head_requires,
        });
        Ok(Some(node))
    }

    fn parse_function_or_variable_template(
        &mut self,
        params: Vec<TemplateParam>,
        head_requires: Option<NodeId>,
    ) -> ParseResult<Option<NodeId>> {
        let mut is_constexpr = false;
        let mut is_inline = false;
        let mut is_static = false;
        loop {
            match self.peek() {
                TokenKind::KwConstexpr | TokenKind::KwConsteval => {
                    self.advance();
                    is_constexpr = true;
                }
                TokenKind::KwInline => {
                    self.advance();
                    is_inline = true;
                }
                TokenKind::KwStatic => {
                    self.advance();
                    is_static = true;
                }
                _ => break,
            }
        }

        let mut ret = self.parse_base_type()?;
        self.parse_ptr_operators(&mut ret);

        let name = if self.peek() == TokenKind::KwOperator {
            self.parse_operator_function_name()?
        } else {
            self.expect(TokenKind::Identifier, "template declaration name")?
                .lexeme
        };

        if self.peek() == TokenKind::LParen {
            // Function template.
            let mut fn_params = self.parse_parameter_list()?;
            let is_variadic = fn_params
                .last()
                .is_some_and(|p| p.ty.is_void() && p.ty.pack_expansion);
            if is_variadic {
                fn_params.pop();
            }
            let suffix = self.parse_function_suffix()?;
            let mut ret = ret;
            if let Some(trailing) = &suffix.trailing_return {
                ret = trailing.clone();
            }
            let requires_clause = suffix.requires_clause.or(head_requires);

            let decl = self.alloc(Node::FunctionDecl(FunctionDecl {
                name,
                mangled: None,
                ret,
                params: fn_params.clone(),
                body: None,
                linkage: Linkage::Cpp,
                flags: FnFlags {
                    is_constexpr,
                    is_inline,
                    is_static,
                    is_variadic,
                    ..FnFlags::default()
                },
                member_of: None,
                cv: suffix.cv,
                ref_qual: suffix.ref_qual,
                noexcept: suffix.noexcept,
                conv: crate::types::CallingConv::Cdecl,
                requires_clause,
                access: crate::types::Access::Public,
                ctor_inits: Vec::new(),
            }));

            if self.peek() == TokenKind::LBrace {
                let mut body_params = fn_params;
                let body = self.parse_function_body(&mut body_params, None)?;
                if let Node::FunctionDecl(f) = self.arena.get_mut(decl) {
                    f.body = Some(body);
                    f.params = body_params;
                }
            } else {
                self.expect(TokenKind::Semi, "';' after function template declaration")?;
            }

            let node = self.alloc(Node::TemplateFunctionDecl {
                params: params.clone(),
                decl,
                requires_clause,
            });
            self.templates
                .functions
                .entry(name)
                .or_default()
                .push(FunctionTemplate {
                    params,
                    node,
                    decl,
                    requires_clause,
                });
            return Ok(Some(node));
        }

        // Variable template: `template<class T> constexpr T pi = ...;`.
        let init = if self.consume(TokenKind::Assign) {
            Some(self.parse_assignment_expression()?)
        } else {
            None
        };
        self.expect(TokenKind::Semi, "';' after variable template")?;

        let decl = self.alloc(Node::VarDecl(VarDecl {
            name,
            ty: ret,
            init,
            linkage: Linkage::Cpp,
            is_static,
            is_constexpr,
            is_extern: false,
            is_thread_local: false,
            const_value: None,
        }));
        let node = self.alloc(Node::TemplateVarDecl {
            params: params.clone(),
            decl,
        });
        self.templates.variables.insert(name, VariableTemplate {
            params,
            node,
            decl,
        });
        Ok(Some(node))
    }

    /// `template class Vec<int>;` — also reached (without distinction)
    /// from `extern template`; the instantiation cache makes repeats
    /// idempotent.
    fn parse_explicit_instantiation(&mut self) -> ParseResult<Option<NodeId>> {
        if matches!(
            self.peek(),
            TokenKind::KwClass | TokenKind::KwStruct | TokenKind::KwUnion
        ) {
            self.advance();
            let name_tok = self.expect(TokenKind::Identifier, "template name")?;
            let args = self.parse_explicit_template_arguments()?;
            self.expect(TokenKind::Semi, "';' after explicit instantiation")?;
            let ty = self.resolve_template_id(name_tok.lexeme, args)?;
            let _ = ty;
            return Ok(None);
        }

        // Function form: `template int max<int>(int, int);`
        let mut ret = self.parse_base_type()?;
        self.parse_ptr_operators(&mut ret);
        let name_tok = self.expect(TokenKind::Identifier, "template name")?;
        let args = if self.peek() == TokenKind::Lt {
            self.parse_explicit_template_arguments()?
        } else {
            Vec::new()
        };
        // The parameter list in an explicit instantiation restates the
        // signature; parse and discard.
        if self.peek() == TokenKind::LParen {
            let _ = self.parse_parameter_list()?;
        }
        self.expect(TokenKind::Semi, "';' after explicit instantiation")?;
        let inst = self.instantiate_function_template_explicit(name_tok.lexeme, &args, name_tok)?;
        let _ = inst;
        Ok(None)
    }

    /// `< (type|non-type|template-template) [, ...] >` with optional packs
    /// and defaults.
    pub(crate) fn parse_template_parameter_list(&mut self) -> ParseResult<Vec<TemplateParam>> {
        self.expect(TokenKind::Lt, "'<' opening template parameter list")?;
        let mut params = Vec::new();

        if self.at_template_close_token() {
            self.consume_template_close()?;
            return Ok(params);
        }

        loop {
            params.push(self.parse_template_parameter(&params)?);
            if self.consume(TokenKind::Comma) {
                continue;
            }
            self.consume_template_close()?;
            break;
        }
        Ok(params)
    }

    fn at_template_close_token(&self) -> bool {
        matches!(self.peek(), TokenKind::Gt | TokenKind::Shr)
    }

    fn parse_template_parameter(
        &mut self,
        seen: &[TemplateParam],
    ) -> ParseResult<TemplateParam> {
        match self.peek() {
            TokenKind::KwTypename | TokenKind::KwClass => {
                self.advance();
                let is_pack = self.consume(TokenKind::Ellipsis);
                let name = if self.peek() == TokenKind::Identifier {
                    self.advance().lexeme
                } else {
                    self.intern(&format!("__tparam_{}", seen.len()))
                };
                let default = if self.consume(TokenKind::Assign) {
                    Some(self.parse_type_specifier()?)
                } else {
                    None
                };
                Ok(TemplateParam {
                    name,
                    kind: TemplateParamKind::Type { default },
                    is_pack,
                    constraint: None,
                })
            }
            TokenKind::KwTemplate => {
                // template-template parameter:
                // `template <typename> class TT [= default]`.
                self.advance();
                let _inner = self.parse_template_parameter_list()?;
                if !self.consume(TokenKind::KwClass) {
                    self.expect(TokenKind::KwTypename, "'class' or 'typename'")?;
                }
                let name = self
                    .expect(TokenKind::Identifier, "template-template parameter name")?
                    .lexeme;
                let default = if self.consume(TokenKind::Assign) {
                    Some(self.expect(TokenKind::Identifier, "default template name")?.lexeme)
                } else {
                    None
                };
                Ok(TemplateParam {
                    name,
                    kind: TemplateParamKind::Template { default },
                    is_pack: false,
                    constraint: None,
                })
            }
            // `Concept T` shorthand for a constrained type parameter.
            TokenKind::Identifier
                if self.templates.is_concept(self.peek_info().lexeme) =>
            {
                let concept_name = self.advance().lexeme;
                if self.peek() == TokenKind::Lt {
                    // Concept<Extra...> T — extra arguments currently ride
                    // along unevaluated until the constraint check.
                    let _ = self.parse_explicit_template_arguments()?;
                }
                let is_pack = self.consume(TokenKind::Ellipsis);
                let name = self.expect(TokenKind::Identifier, "parameter name")?.lexeme;
                let default = if self.consume(TokenKind::Assign) {
                    Some(self.parse_type_specifier()?)
                } else {
                    None
                };
                Ok(TemplateParam {
                    name,
                    kind: TemplateParamKind::Type { default },
                    is_pack,
                    constraint: Some(concept_name),
                })
            }
            _ => {
                // Non-type parameter: `type [...] name [= default]`.
                let ty = self.parse_type_specifier()?;
                let is_pack = self.consume(TokenKind::Ellipsis);
                let name = if self.peek() == TokenKind::Identifier {
                    self.advance().lexeme
                } else {
                    self.intern(&format!("__ntparam_{}", seen.len()))
                };
                let default = if self.consume(TokenKind::Assign) {
                    Some(self.with_expr_context(ExprContext::TemplateArgument, |p| {
                        p.parse_expression(4)
                    })?)
                } else {
                    None
                };
                Ok(TemplateParam {
                    name,
                    kind: TemplateParamKind::NonType { ty, default },
                    is_pack,
                    constraint: None,
                })
            }
        }
    }

    /// Evaluate a concept against concrete arguments. `None` = dependent.
    pub(crate) fn evaluate_concept(
        &mut self,
        name: Symbol,
        args: &[crate::templates::TemplateArg],
    ) -> ParseResult<Option<bool>> {
        if args.iter().any(|a| self.template_arg_is_dependent(a)) {
            return Ok(None);
        }
        let Some(info) = self.templates.concepts.get(&name).cloned() else {
            return Err(self.err_here(
                ParseErrorKind::MissingIdentifier,
                format!("'{}' is not a concept", self.resolve(name)),
            ));
        };
        let map = self.build_substitution(&info.params, args)?;
        let substituted = self.substitute_node(info.body, &map);
        match self.eval_const_expr(substituted) {
            Ok(v) => Ok(Some(v.as_bool())),
            Err(e) if e.kind == crate::consteval::EvalErrorKind::TemplateDependent => Ok(None),
            Err(_) => Ok(Some(false)),
        }
    }

    /// Check a parameter's associated concept constraint (the
    /// `template<Int T>` shorthand) against a bound argument type.
    pub(crate) fn check_param_constraint(
        &mut self,
        param: &TemplateParam,
        arg: &crate::templates::TemplateArg,
    ) -> ParseResult<bool> {
        let Some(concept_name) = param.constraint else {
            return Ok(true);
        };
        match self.evaluate_concept(concept_name, std::slice::from_ref(arg))? {
            Some(ok) => Ok(ok),
            None => Ok(true),
        }
    }

    /// Evaluate a requires-clause under a substitution; false or failure
    /// makes the candidate non-viable (SFINAE).
    pub(crate) fn requires_clause_satisfied(
        &mut self,
        clause: Option<NodeId>,
        map: &crate::templates::substitute::Substitution,
    ) -> bool {
        let Some(clause) = clause else { return true };
        let expr = match self.arena.get(clause) {
            Node::RequiresClause { expr } => *expr,
            _ => clause,
        };
        let substituted = self.substitute_node(expr, map);
        match self.eval_const_expr(substituted) {
            Ok(v) => v.as_bool(),
            Err(e) => e.kind != crate::consteval::EvalErrorKind::TemplateDependent,
        }
    }

    /// A non-type template parameter default expression as a TemplateArg.
    pub(crate) fn default_template_arg(
        &mut self,
        param: &TemplateParam,
    ) -> ParseResult<Option<crate::templates::TemplateArg>> {
        match &param.kind {
            TemplateParamKind::Type { default: Some(ty) } => {
                Ok(Some(crate::templates::TemplateArg::Type(ty.clone())))
            }
            TemplateParamKind::NonType {
                ty,
                default: Some(expr),
            } => {
                let value = self.eval_const_expr(*expr).map_err(|e| {
                    self.err_here(ParseErrorKind::NotConstant, e.message)
                })?;
                Ok(Some(crate::templates::TemplateArg::Value {
                    ty: ty.clone(),
                    value: value.to_const_value(),
                }))
            }
            TemplateParamKind::Template { default: Some(name) } => {
                Ok(Some(crate::templates::TemplateArg::Template(*name)))
            }
            _ => Ok(None),
        }
    }
}
