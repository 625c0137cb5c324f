//! Template argument deduction.
//!
//! Deduction walks each parameter pattern in lockstep with the
//! corresponding argument type, unifying template parameters. The
//! forwarding-reference rule applies: `T&&` where `T` is a parameter of
//! the template deduces `T = U&` for lvalue arguments and `T = U` for
//! rvalues. A trailing pack parameter consumes the remaining arguments.
//! Deduction failure is never an error here; the candidate just drops
//! out (SFINAE).

use cxxfront_core::Symbol;

use crate::ast::{Node, NodeId, TemplateParam, TemplateParamKind};
use crate::diag::ParseResult;
use crate::overload::CallArg;
use crate::parser::Parser;
use crate::types::{BaseKind, RefKind, TypeSpecifier};

use super::substitute::Substitution;
use super::{FunctionTemplate, TemplateArg};

impl Parser {
    /// Deduce against every function template under `name` and
    /// instantiate the ones that succeed.
    pub(crate) fn deduce_and_instantiate_functions(
        &mut self,
        name: Symbol,
        args: &[CallArg],
    ) -> ParseResult<Vec<NodeId>> {
        let candidates = self
            .templates
            .functions
            .get(&name)
            .cloned()
            .unwrap_or_default();
        let mut out = Vec::new();

        for tmpl in candidates {
            let Some(map) = self.deduce_function_arguments(&tmpl, args) else {
                continue;
            };
            // A trailing requires-clause evaluating false makes the
            // candidate non-viable.
            if !self.requires_clause_satisfied(tmpl.requires_clause, &map) {
                continue;
            }
            if !self.deduced_constraints_hold(&tmpl.params, &map) {
                continue;
            }
            match self.instantiate_function_from(&tmpl, name, map) {
                Ok(inst) => out.push(inst),
                Err(err) if err.is_constraint_failure() || err.is_sfinae_eligible() => {}
                Err(err) => return Err(err),
            }
        }
        Ok(out)
    }

    /// Shorthand concept constraints (`template<Int T>`) re-checked with
    /// the deduced bindings.
    fn deduced_constraints_hold(
        &mut self,
        params: &[TemplateParam],
        map: &Substitution,
    ) -> bool {
        for param in params {
            let Some(_) = param.constraint else { continue };
            let Some(ty) = map.type_map.get(&param.name).cloned() else {
                continue;
            };
            let arg = TemplateArg::Type(ty);
            match self.check_param_constraint(param, &arg) {
                Ok(true) => {}
                _ => return false,
            }
        }
        true
    }

    /// Unify call arguments against the template's parameter patterns.
    /// `None` on any mismatch.
    pub(crate) fn deduce_function_arguments(
        &mut self,
        tmpl: &FunctionTemplate,
        args: &[CallArg],
    ) -> Option<Substitution> {
        let decl_params = match self.arena.get(tmpl.decl) {
            Node::FunctionDecl(f) => f.params.clone(),
            _ => return None,
        };
        let mut map = Substitution::default();

        let mut arg_index = 0usize;
        for param in &decl_params {
            // Pack parameter: consume every remaining argument.
            if param.ty.pack_expansion {
                let Some(pack_name) = param.ty.name else {
                    return None;
                };
                let rest: Vec<TypeSpecifier> = args[arg_index.min(args.len())..]
                    .iter()
                    .map(|a| a.ty.decayed())
                    .collect();
                map.pack_types.insert(pack_name, rest);
                arg_index = args.len();
                break;
            }

            let Some(arg) = args.get(arg_index) else {
                // Defaulted trailing parameters don't participate.
                if param.default.is_some() {
                    break;
                }
                return None;
            };
            arg_index += 1;

            if !self.unify(&param.ty, arg, tmpl, &mut map) {
                return None;
            }
        }

        if arg_index < args.len() {
            return None;
        }

        // Parameters deduction never reached (only referenced in the
        // return type, say) fall back to defaults.
        for param in &tmpl.params {
            if param.is_pack {
                map.pack_types.entry(param.name).or_default();
                continue;
            }
            let bound = match &param.kind {
                TemplateParamKind::Type { .. } => map.type_map.contains_key(&param.name),
                TemplateParamKind::NonType { .. } => map.value_map.contains_key(&param.name),
                TemplateParamKind::Template { .. } => {
                    map.template_map.contains_key(&param.name)
                }
            };
            if bound {
                continue;
            }
            match self.default_template_arg(param) {
                Ok(Some(TemplateArg::Type(ty))) => {
                    map.type_map.insert(param.name, ty);
                }
                Ok(Some(TemplateArg::Value { ty, value })) => {
                    map.value_map.insert(param.name, (ty, value));
                }
                Ok(Some(TemplateArg::Template(t))) => {
                    map.template_map.insert(param.name, t);
                }
                _ => return None,
            }
        }

        Some(map)
    }

    /// One pattern/argument unification step.
    fn unify(
        &mut self,
        pattern: &TypeSpecifier,
        arg: &CallArg,
        tmpl: &FunctionTemplate,
        map: &mut Substitution,
    ) -> bool {
        let names_param = pattern
            .name
            .is_some_and(|n| tmpl.params.iter().any(|p| p.name == n));

        if names_param {
            let name = pattern.name.expect("checked above");

            // Forwarding reference: bare `T&&`.
            let is_forwarding = pattern.ref_kind == RefKind::RValue
                && pattern.ptr.is_empty()
                && pattern.cv.is_none()
                && pattern.array_dims.is_empty();

            let binding = if is_forwarding && arg.is_lvalue {
                let mut bound = arg.ty.clone();
                bound.ref_kind = RefKind::LValue;
                bound
            } else if pattern.ref_kind != RefKind::None {
                // `T&` / non-forwarding `T&&`: bind the referent without
                // decay.
                let mut bound = arg.ty.clone();
                bound.ref_kind = RefKind::None;
                bound
            } else if !pattern.ptr.is_empty() {
                // `T*`: strip matching pointer levels.
                let arg_ty = arg.ty.decayed();
                if arg_ty.ptr.len() < pattern.ptr.len() {
                    return false;
                }
                let mut bound = arg_ty;
                for _ in 0..pattern.ptr.len() {
                    bound.ptr.pop();
                }
                bound
            } else {
                arg.ty.decayed()
            };

            return self.bind_type_param(name, binding, map);
        }

        // Dependent template-id pattern: `Vec<T>` against an instance of
        // the same primary template.
        if !pattern.template_args.is_empty()
            && let Some(pattern_tmpl) = pattern.name
        {
            let arg_ty = self.types.resolve_alias(&arg.ty.decayed());
            let Some(arg_id) = arg_ty.type_id else {
                return false;
            };
            let info = self.types.get(arg_id);
            let Some(struct_info) = &info.struct_info else {
                return false;
            };
            if struct_info.template_of != Some(pattern_tmpl) {
                return false;
            }
            let instance_name = info.name;
            let Some(instance_args) = self.templates.instance_args.get(&instance_name).cloned()
            else {
                return false;
            };
            if instance_args.len() < pattern.template_args.len() {
                return false;
            }
            for (slot, concrete) in pattern.template_args.clone().iter().zip(instance_args) {
                if let Some(slot_name) = slot.name
                    && tmpl.params.iter().any(|p| p.name == slot_name)
                {
                    match concrete {
                        TemplateArg::Type(ty) => {
                            if !self.bind_type_param(slot_name, ty, map) {
                                return false;
                            }
                        }
                        TemplateArg::Value { ty, value } => {
                            map.value_map.insert(slot_name, (ty, value));
                        }
                        TemplateArg::Template(t) => {
                            map.template_map.insert(slot_name, t);
                        }
                    }
                }
            }
            return true;
        }

        // Concrete parameter: ordinary convertibility decides.
        crate::overload::rank_conversion(&self.types, arg, pattern).is_some()
    }

    fn bind_type_param(
        &mut self,
        name: Symbol,
        binding: TypeSpecifier,
        map: &mut Substitution,
    ) -> bool {
        match map.type_map.get(&name) {
            Some(existing) => existing.shape_eq(&binding) && existing.ref_kind == binding.ref_kind,
            None => {
                map.type_map.insert(name, binding);
                true
            }
        }
    }

    /// `auto` parameters of a generic lambda deduce like bare type
    /// parameters: each `auto` slot binds a synthesized name.
    pub(crate) fn deduce_auto_params(
        &mut self,
        params: &[crate::ast::Param],
        args: &[CallArg],
    ) -> Option<Substitution> {
        if args.len() < params.iter().filter(|p| p.default.is_none()).count() {
            return None;
        }
        let mut map = Substitution::default();
        for (i, (param, arg)) in params.iter().zip(args).enumerate() {
            if param.ty.base == BaseKind::Auto {
                let slot = self.intern(&format!("__auto_{i}"));
                let mut bound = arg.ty.decayed();
                if param.ty.ref_kind == RefKind::RValue && arg.is_lvalue {
                    bound.ref_kind = RefKind::LValue;
                }
                map.type_map.insert(slot, bound);
            } else if crate::overload::rank_conversion(&self.types, arg, &param.ty).is_none() {
                return None;
            }
        }
        Some(map)
    }
}
