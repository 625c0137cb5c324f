//! Template substitution: rewriting dependent ASTs and types against a
//! bound parameter map.
//!
//! Substitution always produces new nodes in the same arena; the template
//! definition's nodes are never touched. Calls that were left unresolved
//! in the dependent AST re-run lookup and overload resolution once their
//! arguments are concrete, so instantiation errors surface at the point
//! of instantiation.

use std::collections::HashMap;

use cxxfront_core::Symbol;
use indexmap::IndexMap;

use crate::ast::{
    ConstValue, FoldDirection, Node, NodeId, Param, TemplateParam, TemplateParamKind,
};
use crate::ast::BinaryOp;
use crate::diag::{ParseError, ParseErrorKind, ParseResult};
use crate::parser::Parser;
use crate::types::{BaseKind, TypeSpecifier};

use super::TemplateArg;

/// Bound template parameters for one instantiation.
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    pub type_map: IndexMap<Symbol, TypeSpecifier>,
    pub value_map: IndexMap<Symbol, (TypeSpecifier, ConstValue)>,
    pub template_map: IndexMap<Symbol, Symbol>,
    /// Pack parameter name -> expanded element types.
    pub pack_types: IndexMap<Symbol, Vec<TypeSpecifier>>,
    /// Pack parameter name -> expanded element expressions (function
    /// parameter packs refer to materialized parameter declarations).
    pub pack_exprs: IndexMap<Symbol, Vec<NodeId>>,
    /// Declaration remapping (old parameter VarDecl -> new), applied to
    /// identifier bindings when a body is cloned.
    pub decl_map: HashMap<NodeId, NodeId>,
}

impl Substitution {
    pub fn is_empty(&self) -> bool {
        self.type_map.is_empty()
            && self.value_map.is_empty()
            && self.template_map.is_empty()
            && self.pack_types.is_empty()
            && self.decl_map.is_empty()
    }

    pub fn args_fingerprint_vec(&self) -> Vec<TemplateArg> {
        let mut out = Vec::new();
        for (_, ty) in &self.type_map {
            out.push(TemplateArg::Type(ty.clone()));
        }
        for (_, (ty, value)) in &self.value_map {
            out.push(TemplateArg::Value {
                ty: ty.clone(),
                value: *value,
            });
        }
        for (_, name) in &self.template_map {
            out.push(TemplateArg::Template(*name));
        }
        for (_, types) in &self.pack_types {
            for ty in types {
                out.push(TemplateArg::Type(ty.clone()));
            }
        }
        out
    }
}

impl Parser {
    /// Bind `args` to `params`, filling defaults for missing trailing
    /// arguments and checking shorthand concept constraints. A pack
    /// parameter consumes every remaining argument.
    pub(crate) fn build_substitution(
        &mut self,
        params: &[TemplateParam],
        args: &[TemplateArg],
    ) -> ParseResult<Substitution> {
        let mut map = Substitution::default();

        for (index, param) in params.iter().enumerate() {
            if param.is_pack {
                let rest: Vec<TypeSpecifier> = args
                    .get(index..)
                    .unwrap_or(&[])
                    .iter()
                    .map(|a| self.template_arg_as_spec(a))
                    .collect();
                map.pack_types.insert(param.name, rest);
                break;
            }

            let arg = match args.get(index) {
                Some(arg) => arg.clone(),
                None => match self.default_template_arg(param)? {
                    Some(default) => {
                        // Defaults may reference earlier parameters.
                        match default {
                            TemplateArg::Type(ty) => {
                                TemplateArg::Type(self.substitute_type(&ty, &map))
                            }
                            other => other,
                        }
                    }
                    None => {
                        return Err(self.err_here(
                            ParseErrorKind::UnexpectedToken,
                            format!(
                                "too few template arguments for parameter '{}'",
                                self.resolve(param.name)
                            ),
                        ));
                    }
                },
            };

            if !self.check_param_constraint(param, &arg)? {
                return Err(self.err_here(
                    ParseErrorKind::ConstraintNotSatisfied,
                    format!(
                        "constraint not satisfied for parameter '{}'",
                        self.resolve(param.name)
                    ),
                ));
            }

            match (&param.kind, arg) {
                (TemplateParamKind::Type { .. }, TemplateArg::Type(ty)) => {
                    map.type_map.insert(param.name, ty);
                }
                (TemplateParamKind::NonType { ty, .. }, TemplateArg::Value { value, .. }) => {
                    map.value_map.insert(param.name, (ty.clone(), value));
                }
                (TemplateParamKind::Template { .. }, TemplateArg::Template(name)) => {
                    map.template_map.insert(param.name, name);
                }
                // A value parsed where a type was expected (or vice
                // versa); accept the permissive reading.
                (TemplateParamKind::Type { .. }, TemplateArg::Value { ty, .. }) => {
                    map.type_map.insert(param.name, ty);
                }
                (TemplateParamKind::NonType { ty, .. }, TemplateArg::Type(spec)) => {
                    // A dependent value argument was stored as a named
                    // specifier; resolve it as a constant now.
                    if let Some(name) = spec.name
                        && let Some((_, value)) = map.value_map.get(&name).cloned()
                    {
                        map.value_map.insert(param.name, (ty.clone(), value));
                    } else if let Some(name) = spec.name
                        && let Some(decl) = self.symbols.lookup_single(name)
                        && let Node::VarDecl(v) = self.arena.get(decl)
                        && let Some(cv) = v.const_value
                    {
                        map.value_map.insert(param.name, (ty.clone(), cv));
                    } else {
                        return Err(self.err_here(
                            ParseErrorKind::NotConstant,
                            "non-type template argument is not a constant",
                        ));
                    }
                }
                (_, arg) => {
                    let _ = arg;
                    return Err(self.err_here(
                        ParseErrorKind::UnexpectedToken,
                        "template argument kind mismatch",
                    ));
                }
            }
        }

        Ok(map)
    }

    /// Substitute a type specifier. Indirection, CV, and array dimensions
    /// written on the dependent use carry over onto the substituted type;
    /// dependent array bounds are re-evaluated against the binding.
    pub(crate) fn substitute_type(
        &mut self,
        ty: &TypeSpecifier,
        map: &Substitution,
    ) -> TypeSpecifier {
        let mut out = self.substitute_type_inner(ty, map);
        if out.array_dims.contains(&None) && !out.array_dim_exprs.is_empty() {
            for i in 0..out.array_dims.len() {
                if out.array_dims[i].is_none()
                    && let Some(Some(expr)) = out.array_dim_exprs.get(i).copied()
                {
                    let substituted = self.substitute_node(expr, map);
                    if let Ok(v) = self.eval_const_expr(substituted) {
                        out.array_dims[i] = Some(v.as_i64().max(0) as u64);
                    }
                }
            }
        }
        out
    }

    fn substitute_type_inner(&mut self, ty: &TypeSpecifier, map: &Substitution) -> TypeSpecifier {
        // Auto in generic-lambda parameters is bound through the type map
        // under the synthesized name; leave plain `auto` alone.
        let Some(name) = ty.name else {
            return ty.clone();
        };

        if ty.base == BaseKind::UserDefined || ty.type_id.is_none() {
            // Direct parameter reference.
            if let Some(replacement) = map.type_map.get(&name) {
                return merge_indirection(replacement, ty);
            }

            // Dependent template-id: substitute arguments, instantiate.
            if !ty.template_args.is_empty() {
                let target = map.template_map.get(&name).copied().unwrap_or(name);
                let args: Vec<TemplateArg> = ty
                    .template_args
                    .iter()
                    .map(|a| {
                        let substituted = self.substitute_type(a, map);
                        self.spec_to_template_arg(substituted, map)
                    })
                    .collect();
                if let Ok(resolved) = self.resolve_template_id(target, args) {
                    return merge_indirection(&resolved, ty);
                }
                return ty.clone();
            }

            // Dependent qualified name: `T::value_type`, `Base<T>::type`
            // (spelled through the interner). Substitute the head segment
            // and retry the lookup.
            let spelled = self.resolve(name).to_string();
            if let Some((head, rest)) = spelled.split_once("::") {
                let head_sym = self.intern(head);
                if let Some(head_ty) = map.type_map.get(&head_sym).cloned()
                    && let Some(head_id) = head_ty.type_id
                {
                    let qualified =
                        format!("{}::{rest}", self.resolve(self.types.get(head_id).name));
                    let qualified_sym = self.intern(&qualified);
                    if let Some(id) = self.types.lookup(qualified_sym) {
                        let info = self.types.get(id);
                        let mut out = TypeSpecifier::builtin(info.base, 0);
                        out.name = Some(qualified_sym);
                        out.type_id = Some(id);
                        let resolved = self.types.resolve_alias(&out);
                        return merge_indirection(&resolved, ty);
                    }
                }
            }
        }

        ty.clone()
    }

    fn spec_to_template_arg(&self, spec: TypeSpecifier, map: &Substitution) -> TemplateArg {
        // A specifier that names a bound value parameter is a value
        // argument in disguise.
        if let Some(name) = spec.name
            && spec.base == BaseKind::UserDefined
            && let Some((ty, value)) = map.value_map.get(&name)
        {
            return TemplateArg::Value {
                ty: ty.clone(),
                value: *value,
            };
        }
        TemplateArg::Type(spec)
    }

    /// Clone `node` substituting parameters; returns the new node id.
    pub(crate) fn substitute_node(&mut self, node: NodeId, map: &Substitution) -> NodeId {
        match self.arena.get(node).clone() {
            Node::Identifier { name, decl } => {
                if let Some((ty, value)) = map.value_map.get(&name).cloned() {
                    return self.alloc(Node::NumericLiteral { value, ty });
                }
                if let Some(&remapped) = decl.and_then(|d| map.decl_map.get(&d)) {
                    return self.alloc(Node::Identifier {
                        name,
                        decl: Some(remapped),
                    });
                }
                if decl.is_none()
                    && let Some(&single) = self.symbols.lookup(name).first()
                {
                    return self.alloc(Node::Identifier {
                        name,
                        decl: Some(single),
                    });
                }
                self.alloc(Node::Identifier { name, decl })
            }
            Node::TemplateParameterReference { name, index } => {
                if let Some((ty, value)) = map.value_map.get(&name).cloned() {
                    return self.alloc(Node::NumericLiteral { value, ty });
                }
                self.alloc(Node::TemplateParameterReference { name, index })
            }
            Node::QualifiedIdentifier { path, name, decl } => {
                if decl.is_some() {
                    return self.alloc(Node::QualifiedIdentifier { path, name, decl });
                }
                // Re-resolve a dependent qualified name with substituted
                // head.
                let new_path: Vec<Symbol> = path
                    .iter()
                    .map(|seg| {
                        map.type_map
                            .get(seg)
                            .and_then(|t| t.type_id)
                            .map(|id| self.types.get(id).name)
                            .unwrap_or(*seg)
                    })
                    .collect();
                let found = self.symbols.qualified_lookup(&new_path, name, false);
                self.alloc(Node::QualifiedIdentifier {
                    path: new_path,
                    name,
                    decl: found.first().copied(),
                })
            }
            Node::SizeofPack { pack } => {
                let count = map
                    .pack_types
                    .get(&pack)
                    .map(Vec::len)
                    .or_else(|| map.pack_exprs.get(&pack).map(Vec::len));
                match count {
                    Some(n) => {
                        let base = BaseKind::ULong;
                        let bits = base.fixed_bits(&self.options).unwrap_or(64);
                        self.alloc(Node::NumericLiteral {
                            value: ConstValue::UInt(n as u64),
                            ty: TypeSpecifier::builtin(base, bits),
                        })
                    }
                    None => self.alloc(Node::SizeofPack { pack }),
                }
            }
            Node::FoldExpression {
                op,
                direction,
                pack,
                init,
            } => self.substitute_fold(op, direction, pack, init, map),
            Node::BinaryOp { op, lhs, rhs } => {
                let lhs = self.substitute_node(lhs, map);
                let rhs = self.substitute_node(rhs, map);
                self.alloc(Node::BinaryOp { op, lhs, rhs })
            }
            Node::UnaryOp { op, operand } => {
                let operand = self.substitute_node(operand, map);
                self.alloc(Node::UnaryOp { op, operand })
            }
            Node::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                let cond = self.substitute_node(cond, map);
                let then_expr = self.substitute_node(then_expr, map);
                let else_expr = self.substitute_node(else_expr, map);
                self.alloc(Node::Ternary {
                    cond,
                    then_expr,
                    else_expr,
                })
            }
            Node::FunctionCall {
                callee,
                args,
                resolved,
            } => {
                let callee = self.substitute_node(callee, map);
                let args = self.substitute_arg_list(&args, map);
                if resolved.is_some() {
                    return self.alloc(Node::FunctionCall {
                        callee,
                        args,
                        resolved,
                    });
                }
                // Re-resolve now that arguments are concrete.
                match self.rebuild_call(callee, args.clone()) {
                    Ok(node) => node,
                    Err(_) => self.alloc(Node::FunctionCall {
                        callee,
                        args,
                        resolved: None,
                    }),
                }
            }
            Node::MemberFunctionCall {
                object,
                member,
                args,
                arrow,
                template_args,
                resolved,
            } => {
                let object = self.substitute_node(object, map);
                let args = self.substitute_arg_list(&args, map);
                if resolved.is_some() {
                    return self.alloc(Node::MemberFunctionCall {
                        object,
                        member,
                        args,
                        arrow,
                        template_args,
                        resolved,
                    });
                }
                match self.build_member_call(object, member, arrow, Vec::new(), args.clone()) {
                    Ok(node) => node,
                    Err(_) => self.alloc(Node::MemberFunctionCall {
                        object,
                        member,
                        args,
                        arrow,
                        template_args,
                        resolved: None,
                    }),
                }
            }
            Node::ConstructorCall { ty, args, braced } => {
                let ty = self.substitute_type(&ty, map);
                let args = self.substitute_arg_list(&args, map);
                self.alloc(Node::ConstructorCall { ty, args, braced })
            }
            Node::Cast { kind, target, expr } => {
                let target = self.substitute_type(&target, map);
                let expr = self.substitute_node(expr, map);
                self.alloc(Node::Cast { kind, target, expr })
            }
            Node::SizeofExpr { arg } => {
                let arg = self.substitute_sizeof_arg(arg, map);
                self.alloc(Node::SizeofExpr { arg })
            }
            Node::AlignofExpr { arg } => {
                let arg = self.substitute_sizeof_arg(arg, map);
                self.alloc(Node::AlignofExpr { arg })
            }
            Node::TypeidExpr { arg } => {
                let arg = self.substitute_sizeof_arg(arg, map);
                self.alloc(Node::TypeidExpr { arg })
            }
            Node::TypeTraitExpr {
                name,
                type_args,
                value,
            } => {
                let type_args: Vec<TypeSpecifier> = type_args
                    .iter()
                    .map(|t| self.substitute_type(t, map))
                    .collect();
                let value = match value {
                    Some(v) => Some(v),
                    None => {
                        if self.templates.is_concept(name) {
                            let args: Vec<TemplateArg> = type_args
                                .iter()
                                .cloned()
                                .map(TemplateArg::Type)
                                .collect();
                            self.evaluate_concept(name, &args).ok().flatten()
                        } else {
                            self.evaluate_type_trait(name, &type_args)
                        }
                    }
                };
                self.alloc(Node::TypeTraitExpr {
                    name,
                    type_args,
                    value,
                })
            }
            Node::RequiresExpression {
                params,
                requirements,
                value,
            } => {
                // Re-judge satisfaction now that names are concrete.
                let value = match value {
                    Some(v) => Some(v),
                    None => {
                        let mut all = true;
                        for req in &requirements {
                            match req {
                                crate::ast::Requirement::Simple(e)
                                | crate::ast::Requirement::Nested(e)
                                | crate::ast::Requirement::Compound { expr: e, .. } => {
                                    let s = self.substitute_node(*e, map);
                                    if self.expr_is_dependent(s) {
                                        all = false;
                                    } else if let crate::ast::Requirement::Nested(_) = req {
                                        all &= self
                                            .eval_const_expr(s)
                                            .map(|v| v.as_bool())
                                            .unwrap_or(false);
                                    }
                                }
                                crate::ast::Requirement::Type(ty) => {
                                    let s = self.substitute_type(ty, map);
                                    if self.type_is_dependent(&s) {
                                        all = false;
                                    }
                                }
                            }
                        }
                        Some(all)
                    }
                };
                self.alloc(Node::RequiresExpression {
                    params,
                    requirements,
                    value,
                })
            }
            Node::RequiresClause { expr } => {
                let expr = self.substitute_node(expr, map);
                self.alloc(Node::RequiresClause { expr })
            }
            Node::MemberAccess {
                object,
                member,
                arrow,
            } => {
                let object = self.substitute_node(object, map);
                self.alloc(Node::MemberAccess {
                    object,
                    member,
                    arrow,
                })
            }
            Node::PointerToMemberAccess {
                object,
                member,
                arrow,
            } => {
                let object = self.substitute_node(object, map);
                let member = self.substitute_node(member, map);
                self.alloc(Node::PointerToMemberAccess {
                    object,
                    member,
                    arrow,
                })
            }
            Node::ArraySubscript { array, index } => {
                let array = self.substitute_node(array, map);
                let index = self.substitute_node(index, map);
                self.alloc(Node::ArraySubscript { array, index })
            }
            Node::NewExpression {
                ty,
                placement,
                args,
                array_size,
                is_global,
            } => {
                let ty = self.substitute_type(&ty, map);
                let placement = self.substitute_arg_list(&placement, map);
                let args = self.substitute_arg_list(&args, map);
                let array_size = array_size.map(|n| self.substitute_node(n, map));
                self.alloc(Node::NewExpression {
                    ty,
                    placement,
                    args,
                    array_size,
                    is_global,
                })
            }
            Node::DeleteExpression {
                expr,
                is_array,
                is_global,
            } => {
                let expr = self.substitute_node(expr, map);
                self.alloc(Node::DeleteExpression {
                    expr,
                    is_array,
                    is_global,
                })
            }
            Node::PackExpansion(inner) => {
                // Bare pack expansion outside an argument list; keep one
                // substituted copy.
                let inner = self.substitute_node(inner, map);
                self.alloc(Node::PackExpansion(inner))
            }
            // Statements
            Node::Block { stmts } => {
                let stmts = stmts
                    .iter()
                    .map(|&s| self.substitute_node(s, map))
                    .collect();
                self.alloc(Node::Block { stmts })
            }
            Node::Return(expr) => {
                let expr = expr.map(|e| self.substitute_node(e, map));
                self.alloc(Node::Return(expr))
            }
            Node::ExpressionWrapper(e) => {
                let e = self.substitute_node(e, map);
                self.alloc(Node::ExpressionWrapper(e))
            }
            Node::If {
                cond,
                then_branch,
                else_branch,
                is_constexpr,
                taken,
            } => {
                let cond = self.substitute_node(cond, map);
                let then_branch = self.substitute_node(then_branch, map);
                let else_branch = else_branch.map(|e| self.substitute_node(e, map));
                let taken = match taken {
                    Some(t) => Some(t),
                    None if is_constexpr => {
                        self.eval_const_expr(cond).ok().map(|v| v.as_bool())
                    }
                    None => None,
                };
                self.alloc(Node::If {
                    cond,
                    then_branch,
                    else_branch,
                    is_constexpr,
                    taken,
                })
            }
            Node::While { cond, body } => {
                let cond = self.substitute_node(cond, map);
                let body = self.substitute_node(body, map);
                self.alloc(Node::While { cond, body })
            }
            Node::DoWhile { body, cond } => {
                let body = self.substitute_node(body, map);
                let cond = self.substitute_node(cond, map);
                self.alloc(Node::DoWhile { body, cond })
            }
            Node::For {
                init,
                cond,
                step,
                body,
            } => {
                let init = init.map(|n| self.substitute_node(n, map));
                let cond = cond.map(|n| self.substitute_node(n, map));
                let step = step.map(|n| self.substitute_node(n, map));
                let body = self.substitute_node(body, map);
                self.alloc(Node::For {
                    init,
                    cond,
                    step,
                    body,
                })
            }
            Node::RangedFor { decl, range, body } => {
                let decl = self.substitute_node(decl, map);
                let range = self.substitute_node(range, map);
                let body = self.substitute_node(body, map);
                self.alloc(Node::RangedFor { decl, range, body })
            }
            Node::Switch { cond, body } => {
                let cond = self.substitute_node(cond, map);
                let body = self.substitute_node(body, map);
                self.alloc(Node::Switch { cond, body })
            }
            Node::Case { value } => {
                let value = self.substitute_node(value, map);
                self.alloc(Node::Case { value })
            }
            Node::Label { name, stmt } => {
                let stmt = self.substitute_node(stmt, map);
                self.alloc(Node::Label { name, stmt })
            }
            Node::Try { body, handlers } => {
                let body = self.substitute_node(body, map);
                let handlers = handlers
                    .iter()
                    .map(|(decl, block)| {
                        (
                            decl.map(|d| self.substitute_node(d, map)),
                            self.substitute_node(*block, map),
                        )
                    })
                    .collect();
                self.alloc(Node::Try { body, handlers })
            }
            Node::Throw(expr) => {
                let expr = expr.map(|e| self.substitute_node(e, map));
                self.alloc(Node::Throw(expr))
            }
            Node::VarDecl(mut v) => {
                v.ty = self.substitute_type(&v.ty, map);
                v.init = v.init.map(|i| self.substitute_node(i, map));
                if v.const_value.is_none()
                    && (v.is_constexpr || v.ty.cv.is_const)
                    && let Some(init) = v.init
                {
                    v.const_value = self
                        .eval_const_expr(init)
                        .ok()
                        .map(crate::consteval::Value::to_const_value);
                }
                let name = v.name;
                let new_decl = self.alloc(Node::VarDecl(v));
                // Later statements in the same substituted body bind to
                // the clone.
                self.symbols.declare(name, new_decl);
                new_decl
            }
            // Leaf nodes and anything already concrete clone as-is.
            other => self.alloc(other),
        }
    }

    fn substitute_sizeof_arg(
        &mut self,
        arg: crate::ast::SizeofArg,
        map: &Substitution,
    ) -> crate::ast::SizeofArg {
        match arg {
            crate::ast::SizeofArg::Type(ty) => {
                let ty = self.substitute_type(&ty, map);
                self.ensure_layout(&ty);
                crate::ast::SizeofArg::Type(ty)
            }
            crate::ast::SizeofArg::Expr(e) => {
                crate::ast::SizeofArg::Expr(self.substitute_node(e, map))
            }
        }
    }

    /// Argument lists expand pack expansions in place.
    pub(crate) fn substitute_arg_list(
        &mut self,
        args: &[NodeId],
        map: &Substitution,
    ) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(args.len());
        for &arg in args {
            if let Node::PackExpansion(inner) = self.arena.get(arg).clone()
                && let Some(pack_name) = self.pack_root_name(inner)
                && let Some(elements) = map.pack_exprs.get(&pack_name).cloned()
            {
                for element in elements {
                    let mut element_map = map.clone();
                    element_map
                        .decl_map
                        .extend(self.pack_element_binding(inner, element));
                    out.push(self.substitute_node(inner, &element_map));
                }
                continue;
            }
            out.push(self.substitute_node(arg, map));
        }
        out
    }

    /// The pack parameter an expansion pattern expands over, if the
    /// pattern mentions exactly one.
    fn pack_root_name(&self, node: NodeId) -> Option<Symbol> {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if let Node::Identifier { name, .. } = self.arena.get(current) {
                return Some(*name);
            }
            self.push_children(current, &mut stack);
        }
        None
    }

    fn pack_element_binding(
        &self,
        pattern: NodeId,
        element: NodeId,
    ) -> Vec<(NodeId, NodeId)> {
        // Bind the pattern's pack identifier declaration to the concrete
        // element declaration.
        let mut out = Vec::new();
        let mut stack = vec![pattern];
        while let Some(current) = stack.pop() {
            if let Node::Identifier {
                decl: Some(decl), ..
            } = self.arena.get(current)
            {
                out.push((*decl, element));
                break;
            }
            self.push_children(current, &mut stack);
        }
        // The element itself is an expression node; map declarations onto
        // it only when it is a declaration reference.
        out.retain(|_| matches!(self.arena.get(element), Node::VarDecl(_)));
        out
    }

    fn substitute_fold(
        &mut self,
        op: BinaryOp,
        direction: FoldDirection,
        pack: NodeId,
        init: Option<NodeId>,
        map: &Substitution,
    ) -> NodeId {
        let Some(pack_name) = self.pack_root_name(pack) else {
            let pack = self.substitute_node(pack, map);
            let init = init.map(|i| self.substitute_node(i, map));
            return self.alloc(Node::FoldExpression {
                op,
                direction,
                pack,
                init,
            });
        };
        let Some(elements) = map.pack_exprs.get(&pack_name).cloned() else {
            let pack = self.substitute_node(pack, map);
            let init = init.map(|i| self.substitute_node(i, map));
            return self.alloc(Node::FoldExpression {
                op,
                direction,
                pack,
                init,
            });
        };

        let mut exprs: Vec<NodeId> = Vec::with_capacity(elements.len() + 1);
        for element in elements {
            let mut element_map = map.clone();
            element_map
                .decl_map
                .extend(self.pack_element_binding(pack, element));
            exprs.push(self.substitute_node(pack, &element_map));
        }
        if let Some(init) = init {
            let init = self.substitute_node(init, map);
            match direction {
                FoldDirection::BinaryLeft => exprs.insert(0, init),
                _ => exprs.push(init),
            }
        }

        if exprs.is_empty() {
            // Identity rules over an empty pack.
            return match op {
                BinaryOp::LogicalAnd => self.alloc(Node::BoolLiteral(true)),
                BinaryOp::LogicalOr => self.alloc(Node::BoolLiteral(false)),
                BinaryOp::Comma => self.alloc(Node::Block { stmts: Vec::new() }),
                _ => self.alloc(Node::BoolLiteral(false)),
            };
        }

        let left_assoc = matches!(
            direction,
            FoldDirection::UnaryLeft | FoldDirection::BinaryLeft
        );
        if left_assoc {
            let mut iter = exprs.into_iter();
            let mut acc = iter.next().expect("non-empty fold");
            for next in iter {
                acc = self.alloc(Node::BinaryOp {
                    op,
                    lhs: acc,
                    rhs: next,
                });
            }
            acc
        } else {
            let mut iter = exprs.into_iter().rev();
            let mut acc = iter.next().expect("non-empty fold");
            for prev in iter {
                acc = self.alloc(Node::BinaryOp {
                    op,
                    lhs: prev,
                    rhs: acc,
                });
            }
            acc
        }
    }

    /// Re-run call resolution on a substituted, concrete call.
    fn rebuild_call(&mut self, callee: NodeId, args: Vec<NodeId>) -> ParseResult<NodeId> {
        match self.arena.get(callee) {
            Node::Identifier { .. }
            | Node::QualifiedIdentifier { .. }
            | Node::MemberAccess { .. } => self.build_call(callee, args),
            _ => Ok(self.alloc(Node::FunctionCall {
                callee,
                args,
                resolved: None,
            })),
        }
    }

    /// Substitute a parameter list, expanding type packs.
    pub(crate) fn substitute_params(
        &mut self,
        params: &[Param],
        map: &Substitution,
    ) -> Vec<Param> {
        let mut out = Vec::with_capacity(params.len());
        for param in params {
            if param.ty.pack_expansion
                && let Some(name) = param.ty.name
                && let Some(types) = map.pack_types.get(&name).cloned()
            {
                for (i, ty) in types.into_iter().enumerate() {
                    let expanded_name = param.name.map(|n| {
                        let spelled = format!("{}__{i}", self.resolve(n));
                        self.intern(&spelled)
                    });
                    out.push(Param {
                        name: expanded_name,
                        ty,
                        default: None,
                        decl: None,
                    });
                }
                continue;
            }
            out.push(Param {
                name: param.name,
                ty: self.substitute_type(&param.ty, map),
                default: param.default,
                decl: None,
            });
        }
        out
    }
}

/// Overlay the dependent use's indirection onto the substituted type:
/// `T*` with `T = int&` composes pointers, CV, arrays, and collapses
/// references (`&` wins over `&&`).
fn merge_indirection(base: &TypeSpecifier, use_site: &TypeSpecifier) -> TypeSpecifier {
    use crate::types::RefKind;

    let mut out = base.clone();
    out.cv = out.cv.merge(use_site.cv);
    out.ptr.extend(use_site.ptr.iter().copied());
    out.ref_kind = match (base.ref_kind, use_site.ref_kind) {
        (b, RefKind::None) => b,
        (RefKind::None, u) => u,
        (RefKind::LValue, _) | (_, RefKind::LValue) => RefKind::LValue,
        _ => RefKind::RValue,
    };
    while out.array_dim_exprs.len() < out.array_dims.len() {
        out.array_dim_exprs.push(None);
    }
    out.array_dims.extend(use_site.array_dims.iter().copied());
    out.array_dim_exprs
        .extend(use_site.array_dim_exprs.iter().copied());
    out.pack_expansion = false;
    out
}

impl ParseError {
    pub(crate) fn is_constraint_failure(&self) -> bool {
        self.kind == ParseErrorKind::ConstraintNotSatisfied
    }
}
