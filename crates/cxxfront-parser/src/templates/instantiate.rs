//! Template instantiation: classes, functions, variables, aliases, and
//! the lazy member machinery.
//!
//! Every instantiation is keyed by (template name, argument fingerprint)
//! and cached; repeated requests return the first result. Class
//! instantiation substitutes the data-member types and registers the
//! record, but member function bodies stay unsubstituted until first
//! ODR-use; `sizeof` escalates only as far as layout.

use cxxfront_core::Symbol;

use crate::ast::{FunctionDecl, Node, NodeId, Param, StructDecl, VarDecl};
use crate::diag::{ParseErrorKind, ParseResult};
use crate::mangle::{fingerprint, instance_name};
use crate::parser::Parser;
use crate::symbols::ScopeKind;
use crate::token::Token;
use crate::types::{
    BaseClass, BaseKind, StaticMember, StructMember, StructTypeInfo, TypeId, TypeInfo,
    TypeSpecifier, compute_struct_layout,
};

use super::lazy::{InstantiationPhase, LazyMemberInfo};
use super::substitute::Substitution;
use super::{PartialSpecialization, TemplateArg};

impl Parser {
    // ------------------------------------------------------------------
    // Class templates

    pub(crate) fn instantiate_class_template(
        &mut self,
        name: Symbol,
        args: &[TemplateArg],
    ) -> ParseResult<TypeSpecifier> {
        let Some(primary) = self.templates.classes.get(&name).cloned() else {
            return Err(self.err_here(
                ParseErrorKind::MissingIdentifier,
                format!("'{}' is not a class template", self.resolve(name)),
            ));
        };

        // Fill defaults through the primary's parameter list first so the
        // fingerprint covers the complete argument vector.
        let map = self.build_substitution(&primary.params, args)?;
        let canonical = map.args_fingerprint_vec();
        let fp = fingerprint(&canonical);
        if let Some(cached) = self.templates.cache_lookup(name, fp) {
            return Ok(self.type_of_instantiated_class(cached));
        }

        // Partial specialization selection: unify against each pattern,
        // longest match wins, a tie is an error.
        let chosen = self.select_specialization(name, &canonical)?;
        let (decl_node, inst_map) = match chosen {
            Some((spec, bindings)) => (spec.decl, bindings),
            None => (primary.decl, map),
        };

        if self.instantiation_depth >= 128 {
            return Err(self.err_here(
                ParseErrorKind::RecursionLimit,
                "template instantiation depth exceeded",
            ));
        }
        self.instantiation_depth += 1;
        let result = self.instantiate_class_body(name, decl_node, inst_map, canonical, fp);
        self.instantiation_depth -= 1;
        result
    }

    fn instantiate_class_body(
        &mut self,
        name: Symbol,
        decl_node: NodeId,
        map: Substitution,
        canonical: Vec<TemplateArg>,
        fp: crate::mangle::Fingerprint,
    ) -> ParseResult<TypeSpecifier> {
        let mangled = self.intern(&instance_name(&self.resolve(name), fp));

        let Node::StructDecl(template_decl) = self.arena.get(decl_node).clone() else {
            return Err(self.err_here(
                ParseErrorKind::NotImplemented,
                "class template body is not a struct declaration",
            ));
        };
        let template_info = self
            .types
            .get(template_decl.type_id)
            .struct_info
            .clone()
            .unwrap_or_default();

        // Substitute the record skeleton: bases, data members, statics.
        let mut info = StructTypeInfo {
            is_union: template_info.is_union,
            is_final: template_info.is_final,
            template_of: Some(name),
            complete: true,
            ..StructTypeInfo::default()
        };

        for base in &template_info.bases {
            let resolved = if base.deferred {
                // Deferred base: the name was dependent; substitute it.
                let pattern = TypeSpecifier::user_defined(base.name, None);
                let ty = self.substitute_type(&pattern, &map);
                BaseClass {
                    name: ty.name.unwrap_or(base.name),
                    type_id: ty.type_id,
                    access: base.access,
                    is_virtual: base.is_virtual,
                    deferred: ty.type_id.is_none(),
                }
            } else {
                base.clone()
            };
            info.bases.push(resolved);
        }

        for member in &template_info.members {
            info.members.push(StructMember {
                name: member.name,
                ty: self.substitute_type(&member.ty, &map),
                offset_bits: 0,
                bit_width: member.bit_width,
                access: member.access,
                default_init: member
                    .default_init
                    .map(|init| self.substitute_node(init, &map)),
                align_override: member.align_override,
            });
        }

        for member in &template_info.static_members {
            let ty = self.substitute_type(&member.ty, &map);
            let initializer = member
                .initializer
                .map(|init| self.substitute_node(init, &map));
            let const_value = initializer
                .and_then(|i| self.eval_const_expr(i).ok())
                .map(crate::consteval::Value::to_const_value);
            let decl = self.alloc(Node::VarDecl(VarDecl {
                name: member.name,
                ty: ty.clone(),
                init: initializer,
                linkage: crate::ast::Linkage::Cpp,
                is_static: true,
                is_constexpr: member.is_constexpr,
                is_extern: false,
                is_thread_local: false,
                const_value,
            }));
            info.static_members.push(StaticMember {
                name: member.name,
                ty,
                initializer,
                access: member.access,
                is_constexpr: member.is_constexpr,
                decl: Some(decl),
            });
        }

        // Vtable presence carries over from the template's declarations.
        info.has_vtable = template_info.has_vtable;

        let type_id = self.types.register(TypeInfo {
            name: mangled,
            base: BaseKind::Struct,
            size_bits: 0,
            align_bits: 0,
            struct_info: Some(info),
            enum_info: None,
            alias_of: None,
        });

        // Member functions: declaration-only clones; bodies are lazy.
        let mut member_decls = Vec::new();
        for &member_fn in &template_info.member_functions {
            let Node::FunctionDecl(f) = self.arena.get(member_fn).clone() else {
                continue;
            };
            let new_params = self.substitute_params(&f.params, &map);
            let new_ret = self.substitute_type(&f.ret, &map);
            let decl = self.alloc(Node::FunctionDecl(FunctionDecl {
                name: f.name,
                mangled: Some(mangled),
                ret: new_ret,
                params: new_params,
                body: None,
                linkage: f.linkage,
                flags: f.flags.clone(),
                member_of: Some(type_id),
                cv: f.cv,
                ref_qual: f.ref_qual,
                noexcept: f.noexcept,
                conv: f.conv,
                requires_clause: f.requires_clause,
                access: f.access,
                ctor_inits: Vec::new(),
            }));
            member_decls.push(decl);
            self.lazy.register(LazyMemberInfo {
                class_name: mangled,
                member_name: f.name,
                template_name: name,
                member_decl: decl,
                template_body: f.body,
                args: canonical.clone(),
                phase: InstantiationPhase::Declaration,
                in_progress: false,
            });
        }
        if let Some(struct_info) = self.types.get_mut(type_id).struct_info.as_mut() {
            struct_info.member_functions = member_decls;
        }

        // Nested type aliases of the template body resolve through the
        // mangled scope name (`Vec$hash::value_type`).
        let template_scope = self.resolve(self.types.get(template_decl.type_id).name).to_string();
        let mangled_scope = self.resolve(mangled).to_string();
        let alias_keys: Vec<(Symbol, TypeId)> = self
            .types
            .iter()
            .filter_map(|(id, i)| {
                let spelled = self.resolve(i.name);
                spelled
                    .strip_prefix(&format!("{template_scope}::"))
                    .map(|suffix| (self.interner.intern(&format!("{mangled_scope}::{suffix}")), id))
            })
            .collect();
        for (new_name, target) in alias_keys {
            self.types.register_name(new_name, target);
        }

        // Deferred static_asserts re-evaluate against this instantiation.
        for assert in template_info.deferred_asserts.clone() {
            let condition = self.substitute_node(assert.condition, &map);
            match self.eval_const_expr(condition) {
                Ok(v) if v.as_bool() => {}
                Ok(_) => {
                    let msg = assert
                        .message
                        .map(|m| format!("static_assert failed: {}", self.resolve(m)))
                        .unwrap_or_else(|| "static_assert failed".to_string());
                    return Err(self.err_here(ParseErrorKind::NotConstant, msg));
                }
                Err(e) if e.kind == crate::consteval::EvalErrorKind::TemplateDependent => {}
                Err(_) => {}
            }
        }

        let struct_node = self.alloc(Node::StructDecl(StructDecl {
            name: mangled,
            type_id,
            is_union: template_decl.is_union,
            is_class: template_decl.is_class,
            members: Vec::new(),
        }));

        let cached = self.templates.cache_insert(name, fp, struct_node);
        self.templates.instance_args.insert(mangled, canonical);
        self.symbols.declare(mangled, struct_node);

        Ok(self.type_of_instantiated_class(cached))
    }

    fn type_of_instantiated_class(&self, node: NodeId) -> TypeSpecifier {
        match self.arena.get(node) {
            Node::StructDecl(s) => {
                let info = self.types.get(s.type_id);
                let mut ts = TypeSpecifier::builtin(BaseKind::Struct, 0);
                ts.name = Some(info.name);
                ts.type_id = Some(s.type_id);
                ts.bits = info.size_bits.min(u64::from(u32::MAX)) as u32;
                ts
            }
            _ => TypeSpecifier::int(),
        }
    }

    /// Pattern-unify against each partial specialization; the most
    /// specific match wins, two equally specific matches are an error.
    fn select_specialization(
        &mut self,
        name: Symbol,
        args: &[TemplateArg],
    ) -> ParseResult<Option<(PartialSpecialization, Substitution)>> {
        let specs = self
            .templates
            .class_specializations
            .get(&name)
            .cloned()
            .unwrap_or_default();
        if specs.is_empty() {
            return Ok(None);
        }

        let mut best: Option<(usize, PartialSpecialization, Substitution)> = None;
        let mut ambiguous = false;

        for spec in specs {
            let Some((score, bindings)) = self.match_spec_pattern(&spec, args) else {
                continue;
            };
            match &best {
                None => best = Some((score, spec, bindings)),
                Some((best_score, _, _)) => {
                    if score > *best_score {
                        best = Some((score, spec, bindings));
                        ambiguous = false;
                    } else if score == *best_score {
                        ambiguous = true;
                    }
                }
            }
        }

        if ambiguous {
            return Err(self.err_here(
                ParseErrorKind::AmbiguousSpecialization,
                format!(
                    "partial specializations of '{}' are ambiguous for these arguments",
                    self.resolve(name)
                ),
            ));
        }
        Ok(best.map(|(_, spec, bindings)| (spec, bindings)))
    }

    /// Unify a specialization's pattern against concrete arguments.
    /// Returns a specificity score (structural features matched) plus the
    /// parameter bindings.
    fn match_spec_pattern(
        &mut self,
        spec: &PartialSpecialization,
        args: &[TemplateArg],
    ) -> Option<(usize, Substitution)> {
        if args.len() < spec.pattern.len() {
            return None;
        }
        let mut map = Substitution::default();
        let mut score = 0usize;

        for (slot, concrete) in spec.pattern.iter().zip(args) {
            match (slot, concrete) {
                (TemplateArg::Type(pattern), TemplateArg::Type(arg_ty)) => {
                    let is_param = pattern
                        .name
                        .is_some_and(|n| spec.params.iter().any(|p| p.name == n));
                    if is_param {
                        // `T*` pattern requires matching indirection; the
                        // extra structure raises specificity.
                        if arg_ty.ptr.len() < pattern.ptr.len() {
                            return None;
                        }
                        if pattern.ref_kind != crate::types::RefKind::None
                            && pattern.ref_kind != arg_ty.ref_kind
                        {
                            return None;
                        }
                        score += pattern.ptr.len()
                            + usize::from(pattern.ref_kind != crate::types::RefKind::None);
                        let mut bound = arg_ty.clone();
                        for _ in 0..pattern.ptr.len() {
                            bound.ptr.pop();
                        }
                        bound.ref_kind = crate::types::RefKind::None;
                        let name = pattern.name.expect("parameter pattern has a name");
                        match map.type_map.get(&name) {
                            Some(existing) if !existing.shape_eq(&bound) => return None,
                            Some(_) => {}
                            None => {
                                map.type_map.insert(name, bound);
                            }
                        }
                    } else {
                        // Concrete slot must match exactly.
                        if !pattern.shape_eq(arg_ty) {
                            return None;
                        }
                        score += 2;
                    }
                }
                (TemplateArg::Value { value: pv, .. }, TemplateArg::Value { value: av, .. }) => {
                    if pv != av {
                        return None;
                    }
                    score += 2;
                }
                (TemplateArg::Template(p), TemplateArg::Template(a)) => {
                    if p != a {
                        return None;
                    }
                    score += 2;
                }
                _ => return None,
            }
        }

        Some((score, map))
    }

    // ------------------------------------------------------------------
    // Alias and variable templates

    pub(crate) fn instantiate_alias_template(
        &mut self,
        name: Symbol,
        args: &[TemplateArg],
    ) -> ParseResult<TypeSpecifier> {
        let Some(alias) = self.templates.aliases.get(&name).cloned() else {
            return Err(self.err_here(
                ParseErrorKind::MissingIdentifier,
                format!("'{}' is not an alias template", self.resolve(name)),
            ));
        };
        let map = self.build_substitution(&alias.params, args)?;
        let fp = fingerprint(&map.args_fingerprint_vec());
        let mangled = self.intern(&instance_name(&self.resolve(name), fp));
        if let Some(id) = self.types.lookup(mangled) {
            let target = self.types.get(id).alias_of.clone();
            if let Some(target) = target {
                return Ok(target);
            }
        }
        let target = self.substitute_type(&alias.aliased, &map);
        self.types.register(TypeInfo::alias(mangled, target.clone()));
        Ok(target)
    }

    pub(crate) fn instantiate_variable_template(
        &mut self,
        name: Symbol,
        args: &[TemplateArg],
        at: Token,
    ) -> ParseResult<NodeId> {
        let Some(tmpl) = self.templates.variables.get(&name).cloned() else {
            return Err(self.err_at(
                ParseErrorKind::MissingIdentifier,
                format!("'{}' is not a variable template", self.resolve(name)),
                at,
            ));
        };
        let map = self.build_substitution(&tmpl.params, args)?;
        let fp = fingerprint(&map.args_fingerprint_vec());
        if let Some(cached) = self.templates.cache_lookup(name, fp) {
            return Ok(cached);
        }

        let Node::VarDecl(v) = self.arena.get(tmpl.decl).clone() else {
            return Err(self.err_at(
                ParseErrorKind::NotImplemented,
                "variable template body is not a variable declaration",
                at,
            ));
        };
        let mangled = self.intern(&instance_name(&self.resolve(name), fp));
        let ty = self.substitute_type(&v.ty, &map);
        let init = v.init.map(|i| self.substitute_node(i, &map));
        let const_value = init
            .and_then(|i| self.eval_const_expr(i).ok())
            .map(crate::consteval::Value::to_const_value);
        let decl = self.alloc(Node::VarDecl(VarDecl {
            name: mangled,
            ty,
            init,
            linkage: v.linkage,
            is_static: v.is_static,
            is_constexpr: v.is_constexpr,
            is_extern: false,
            is_thread_local: false,
            const_value,
        }));
        self.symbols.declare(mangled, decl);
        Ok(self.templates.cache_insert(name, fp, decl))
    }

    // ------------------------------------------------------------------
    // Function templates

    pub(crate) fn instantiate_function_template_explicit(
        &mut self,
        name: Symbol,
        args: &[TemplateArg],
        at: Token,
    ) -> ParseResult<NodeId> {
        let overloads = self
            .templates
            .functions
            .get(&name)
            .cloned()
            .unwrap_or_default();
        if overloads.is_empty() {
            return Err(self.err_at(
                ParseErrorKind::MissingIdentifier,
                format!("'{}' is not a function template", self.resolve(name)),
                at,
            ));
        }
        let mut last_err = None;
        for tmpl in overloads {
            match self.build_substitution(&tmpl.params, args) {
                Ok(map) => {
                    if !self.requires_clause_satisfied(tmpl.requires_clause, &map) {
                        continue;
                    }
                    return self.instantiate_function_from(&tmpl, name, map);
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            self.err_at(
                ParseErrorKind::ConstraintNotSatisfied,
                format!(
                    "no overload of '{}' accepts these template arguments",
                    self.resolve(name)
                ),
                at,
            )
        }))
    }

    /// Substitute a function template against a complete binding and
    /// register the result.
    pub(crate) fn instantiate_function_from(
        &mut self,
        tmpl: &super::FunctionTemplate,
        name: Symbol,
        map: Substitution,
    ) -> ParseResult<NodeId> {
        let canonical = map.args_fingerprint_vec();
        let fp = fingerprint(&canonical);
        if let Some(cached) = self.templates.cache_lookup(name, fp) {
            return Ok(cached);
        }

        let Node::FunctionDecl(f) = self.arena.get(tmpl.decl).clone() else {
            return Err(self.err_here(
                ParseErrorKind::NotImplemented,
                "function template body is not a function declaration",
            ));
        };

        let mangled = self.intern(&instance_name(&self.resolve(name), fp));
        let mut full_map = map;
        let mut new_params = self.substitute_params(&f.params, &full_map);

        // The body substitutes inside a fresh function scope with the new
        // parameter declarations bound in place of the old ones.
        let new_body = if let Some(body) = f.body {
            let body_result = self.with_scope(ScopeKind::Function, |p| {
                for param in new_params.iter_mut() {
                    p.declare_parameter(param);
                }
                // Map old parameter declarations to new ones positionally;
                // a pack parameter maps to the expanded element group.
                let old_decls: Vec<Option<NodeId>> =
                    f.params.iter().map(|op| op.decl).collect();
                if f.params.last().is_some_and(|op| op.ty.pack_expansion) {
                    let fixed = f.params.len() - 1;
                    for (old, new) in old_decls.iter().take(fixed).zip(new_params.iter()) {
                        if let (Some(old), Some(new)) = (old, new.decl) {
                            full_map.decl_map.insert(*old, new);
                        }
                    }
                    if let Some(pack_name) = f.params.last().and_then(|op| op.name) {
                        let rest: Vec<NodeId> = new_params
                            .iter()
                            .skip(fixed)
                            .filter_map(|np| np.decl)
                            .collect();
                        full_map.pack_exprs.insert(pack_name, rest);
                    }
                } else {
                    for (old, new) in old_decls.iter().zip(new_params.iter()) {
                        if let (Some(old), Some(new)) = (old, new.decl) {
                            full_map.decl_map.insert(*old, new);
                        }
                    }
                }
                Ok(p.substitute_node(body, &full_map))
            })?;
            Some(body_result)
        } else {
            None
        };

        let mut ret = self.substitute_type(&f.ret, &full_map);
        if ret.is_auto()
            && let Some(body) = new_body
            && let Some(deduced) = self.deduce_return_type(body)?
        {
            ret = deduced;
        }

        let decl = self.alloc(Node::FunctionDecl(FunctionDecl {
            name: mangled,
            mangled: Some(mangled),
            ret,
            params: new_params,
            body: new_body,
            linkage: f.linkage,
            flags: f.flags.clone(),
            member_of: None,
            cv: f.cv,
            ref_qual: f.ref_qual,
            noexcept: f.noexcept,
            conv: f.conv,
            requires_clause: None,
            access: f.access,
            ctor_inits: Vec::new(),
        }));
        self.symbols.declare(mangled, decl);
        Ok(self.templates.cache_insert(name, fp, decl))
    }

    // ------------------------------------------------------------------
    // Generic members (lambda operator(), member templates)

    /// Instantiate members whose parameters are `auto` against the call's
    /// argument types.
    pub(crate) fn instantiate_generic_members(
        &mut self,
        class_id: TypeId,
        member: Symbol,
        args: &[crate::overload::CallArg],
        _template_args: &[TemplateArg],
    ) -> ParseResult<Vec<NodeId>> {
        let candidates = self.collect_member_candidates(class_id, member);
        let mut out = Vec::new();

        for cand in candidates {
            let Node::FunctionDecl(f) = self.arena.get(cand).clone() else {
                continue;
            };
            if !f.params.iter().any(|p| p.ty.base == BaseKind::Auto) {
                continue;
            }
            let Some(map) = self.deduce_auto_params(&f.params, args) else {
                continue;
            };

            // Cache per (class::member, argument fingerprint).
            let key = self.intern(&format!(
                "{}::{}",
                self.resolve(self.types.get(class_id).name),
                self.resolve(member)
            ));
            let canonical = map.args_fingerprint_vec();
            let fp = fingerprint(&canonical);
            if let Some(cached) = self.templates.cache_lookup(key, fp) {
                out.push(cached);
                continue;
            }

            // Concrete parameter types from the deduction slots.
            let mut full_map = map;
            let mut new_params: Vec<Param> = Vec::with_capacity(f.params.len());
            for (i, param) in f.params.iter().enumerate() {
                let ty = if param.ty.base == BaseKind::Auto {
                    let slot = self.intern(&format!("__auto_{i}"));
                    let mut bound = full_map
                        .type_map
                        .get(&slot)
                        .cloned()
                        .unwrap_or_else(TypeSpecifier::int);
                    bound.cv = bound.cv.merge(param.ty.cv);
                    if param.ty.ref_kind != crate::types::RefKind::None
                        && bound.ref_kind == crate::types::RefKind::None
                    {
                        bound.ref_kind = param.ty.ref_kind;
                    }
                    bound
                } else {
                    param.ty.clone()
                };
                new_params.push(Param {
                    name: param.name,
                    ty,
                    default: param.default,
                    decl: None,
                });
            }

            let new_body = if let Some(body) = f.body {
                let body = self.with_scope(ScopeKind::Class(class_id), |p| {
                    p.with_scope(ScopeKind::Function, |p| {
                        for param in new_params.iter_mut() {
                            p.declare_parameter(param);
                        }
                        for (old, new) in f.params.iter().zip(new_params.iter()) {
                            if let (Some(old), Some(new)) = (old.decl, new.decl) {
                                full_map.decl_map.insert(old, new);
                            }
                        }
                        Ok(p.substitute_node(body, &full_map))
                    })
                })?;
                Some(body)
            } else {
                None
            };

            let mut ret = f.ret.clone();
            if ret.is_auto()
                && let Some(body) = new_body
                && let Some(deduced) = self.deduce_return_type(body)?
            {
                ret = deduced;
            }

            let decl = self.alloc(Node::FunctionDecl(FunctionDecl {
                name: member,
                mangled: Some(key),
                ret,
                params: new_params,
                body: new_body,
                linkage: f.linkage,
                flags: f.flags.clone(),
                member_of: Some(class_id),
                cv: f.cv,
                ref_qual: f.ref_qual,
                noexcept: f.noexcept,
                conv: f.conv,
                requires_clause: None,
                access: f.access,
                ctor_inits: Vec::new(),
            }));
            if let Some(info) = self.types.get_mut(class_id).struct_info.as_mut() {
                info.member_functions.push(decl);
            }
            out.push(self.templates.cache_insert(key, fp, decl));
        }

        Ok(out)
    }

    // ------------------------------------------------------------------
    // Lazy escalation

    /// Member-function call or other ODR-use: substitute the stored body
    /// (exactly once) and attach it.
    pub(crate) fn ensure_member_instantiated(
        &mut self,
        class_id: TypeId,
        member: Symbol,
    ) -> ParseResult<()> {
        let class_name = self.types.get(class_id).name;
        if !self.lazy.needs_instantiation(class_name, member) {
            return Ok(());
        }
        let Some(info) = self.lazy.get_lazy_member_info(class_name, member).cloned() else {
            return Ok(());
        };
        let Some(template_body) = info.template_body else {
            self.lazy.mark_instantiated(class_name, member);
            return Ok(());
        };

        self.lazy.mark_in_progress(class_name, member, true);

        let result = (|| -> ParseResult<()> {
            let Some(primary) = self.templates.classes.get(&info.template_name).cloned() else {
                return Ok(());
            };
            let mut map = self.build_substitution(&primary.params, &info.args)?;

            let mut params = match self.arena.get(info.member_decl) {
                Node::FunctionDecl(f) => f.params.clone(),
                _ => Vec::new(),
            };
            // Old parameter declarations from the template body map onto
            // freshly declared ones.
            let old_params = self
                .templates
                .classes
                .get(&info.template_name)
                .map(|t| t.decl)
                .and_then(|d| match self.arena.get(d) {
                    Node::StructDecl(s) => {
                        let template_type = s.type_id;
                        self.types.get(template_type).struct_info.as_ref().and_then(|si| {
                            si.member_functions.iter().copied().find(|&mf| {
                                matches!(self.arena.get(mf), Node::FunctionDecl(f) if f.name == member)
                            })
                        })
                    }
                    _ => None,
                })
                .and_then(|mf| match self.arena.get(mf) {
                    Node::FunctionDecl(f) => Some(f.params.clone()),
                    _ => None,
                })
                .unwrap_or_default();

            let body = self.with_scope(ScopeKind::Class(class_id), |p| {
                p.with_scope(ScopeKind::Function, |p| {
                    for param in params.iter_mut() {
                        p.declare_parameter(param);
                    }
                    for (old, new) in old_params.iter().zip(params.iter()) {
                        if let (Some(old), Some(new)) = (old.decl, new.decl) {
                            map.decl_map.insert(old, new);
                        }
                    }
                    Ok(p.substitute_node(template_body, &map))
                })
            })?;

            if let Node::FunctionDecl(f) = self.arena.get_mut(info.member_decl) {
                f.body = Some(body);
                f.params = params;
            }
            Ok(())
        })();

        self.lazy.mark_in_progress(class_name, member, false);
        if result.is_ok() {
            self.lazy.mark_instantiated(class_name, member);
        }
        result
    }

    /// Static-member access: make the initializer's constant available.
    pub(crate) fn ensure_static_member(&mut self, class_id: TypeId, member: Symbol) {
        let class_name = self.types.get(class_id).name;
        self.lazy
            .escalate(class_name, member, InstantiationPhase::Layout);
        let decl_and_init = self
            .types
            .get(class_id)
            .struct_info
            .as_ref()
            .and_then(|s| s.find_static(member))
            .map(|m| (m.decl, m.initializer));
        if let Some((Some(decl), Some(init))) = decl_and_init {
            let needs_value = matches!(
                self.arena.get(decl),
                Node::VarDecl(v) if v.const_value.is_none()
            );
            if needs_value
                && let Ok(value) = self.eval_const_expr(init)
                && let Node::VarDecl(v) = self.arena.get_mut(decl)
            {
                v.const_value = Some(value.to_const_value());
            }
        }
    }

    /// `sizeof`/`alignof` trigger: compute the layout of an instantiated
    /// class that doesn't have one yet. Idempotent.
    pub(crate) fn ensure_layout(&mut self, ty: &TypeSpecifier) {
        let resolved = self.types.resolve_alias(ty);
        let Some(type_id) = resolved.type_id else {
            return;
        };
        let needs_layout = {
            let info = self.types.get(type_id);
            match &info.struct_info {
                Some(s) => s.complete && info.size_bits == 0,
                None => false,
            }
        };
        if !needs_layout {
            return;
        }
        let class_name = self.types.get(type_id).name;
        let member_names: Vec<Symbol> = self
            .lazy
            .members_of(class_name)
            .map(|m| m.member_name)
            .collect();
        for member in member_names {
            self.lazy
                .escalate(class_name, member, InstantiationPhase::Layout);
        }
        let pack = self.effective_pack();
        let mut info_copy = self
            .types
            .get(type_id)
            .struct_info
            .clone()
            .unwrap_or_default();
        compute_struct_layout(&mut info_copy, &self.types, &self.options, pack);
        let size = info_copy.size_bits;
        let align = info_copy.align_bits;
        let record = self.types.get_mut(type_id);
        record.struct_info = Some(info_copy);
        record.size_bits = size;
        record.align_bits = align;
    }

    /// Walk an expression and lay out any class named by a sizeof or
    /// alignof inside it, so constant evaluation has the numbers.
    pub(crate) fn ensure_layout_for_expr(&mut self, expr: NodeId) {
        let mut stack = vec![expr];
        let mut types_to_layout: Vec<TypeSpecifier> = Vec::new();
        while let Some(current) = stack.pop() {
            if let Node::SizeofExpr { arg } | Node::AlignofExpr { arg } = self.arena.get(current)
                && let crate::ast::SizeofArg::Type(ty) = arg
            {
                types_to_layout.push(ty.clone());
            }
            self.push_children(current, &mut stack);
        }
        for ty in types_to_layout {
            self.ensure_layout(&ty);
        }
    }
}
