//! Template registries and the instantiation cache.
//!
//! Primary templates, partial specializations, and concepts are keyed by
//! their interned name. The instantiation cache is keyed by
//! (template name, argument fingerprint); a cache hit always returns the
//! node produced by the first instantiation, which makes instantiation
//! idempotent per key.

pub mod deduce;
pub mod instantiate;
pub mod lazy;
pub mod substitute;

use cxxfront_core::Symbol;
use indexmap::IndexMap;

use crate::ast::{ConstValue, NodeId, TemplateParam};
use crate::mangle::Fingerprint;
use crate::types::TypeSpecifier;

/// One template argument, explicit or deduced.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateArg {
    Type(TypeSpecifier),
    Value { ty: TypeSpecifier, value: ConstValue },
    /// Template-template argument: the named template.
    Template(Symbol),
}

impl TemplateArg {
    pub fn as_type(&self) -> Option<&TypeSpecifier> {
        match self {
            Self::Type(ty) => Some(ty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassTemplate {
    pub params: Vec<TemplateParam>,
    /// The TemplateClassDecl wrapper node.
    pub node: NodeId,
    /// The inner StructDecl.
    pub decl: NodeId,
    pub requires_clause: Option<NodeId>,
}

/// A partial specialization's argument pattern, matched against concrete
/// arguments by unification. Patterns are specifiers that may name the
/// specialization's own parameters.
#[derive(Debug, Clone)]
pub struct PartialSpecialization {
    pub params: Vec<TemplateParam>,
    pub pattern: Vec<TemplateArg>,
    pub node: NodeId,
    pub decl: NodeId,
}

#[derive(Debug, Clone)]
pub struct FunctionTemplate {
    pub params: Vec<TemplateParam>,
    pub node: NodeId,
    /// The inner FunctionDecl.
    pub decl: NodeId,
    pub requires_clause: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct VariableTemplate {
    pub params: Vec<TemplateParam>,
    pub node: NodeId,
    pub decl: NodeId,
}

#[derive(Debug, Clone)]
pub struct AliasTemplate {
    pub params: Vec<TemplateParam>,
    pub name: Symbol,
    pub aliased: TypeSpecifier,
}

#[derive(Debug, Clone)]
pub struct ConceptInfo {
    pub params: Vec<TemplateParam>,
    pub body: NodeId,
}

/// All template state for one translation unit.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    pub classes: IndexMap<Symbol, ClassTemplate>,
    pub class_specializations: IndexMap<Symbol, Vec<PartialSpecialization>>,
    /// Function templates form overload sets.
    pub functions: IndexMap<Symbol, Vec<FunctionTemplate>>,
    pub variables: IndexMap<Symbol, VariableTemplate>,
    pub aliases: IndexMap<Symbol, AliasTemplate>,
    pub concepts: IndexMap<Symbol, ConceptInfo>,
    cache: IndexMap<(Symbol, Fingerprint), NodeId>,
    instantiations: Vec<NodeId>,
    /// Mangled instance name -> the argument vector it was built from;
    /// pattern unification against `Tmpl<T>` reads arguments back out.
    pub instance_args: IndexMap<Symbol, Vec<TemplateArg>>,
}

impl TemplateRegistry {
    /// Any kind of template (class, function, variable, alias) goes by
    /// this name. Concepts are deliberately excluded; a concept name
    /// followed by `<` is a constraint check, not an instantiation.
    pub fn is_template(&self, name: Symbol) -> bool {
        self.classes.contains_key(&name)
            || self.functions.contains_key(&name)
            || self.variables.contains_key(&name)
            || self.aliases.contains_key(&name)
    }

    pub fn is_concept(&self, name: Symbol) -> bool {
        self.concepts.contains_key(&name)
    }

    pub fn cache_lookup(&self, name: Symbol, fp: Fingerprint) -> Option<NodeId> {
        self.cache.get(&(name, fp)).copied()
    }

    /// First insertion wins; repeated insertion under the same key returns
    /// the cached node, never replaces it.
    pub fn cache_insert(&mut self, name: Symbol, fp: Fingerprint, node: NodeId) -> NodeId {
        match self.cache.entry((name, fp)) {
            indexmap::map::Entry::Occupied(e) => *e.get(),
            indexmap::map::Entry::Vacant(e) => {
                e.insert(node);
                self.instantiations.push(node);
                node
            }
        }
    }

    /// Instantiations in the order first required.
    pub fn instantiations(&self) -> &[NodeId] {
        &self.instantiations
    }

    pub fn add_specialization(&mut self, name: Symbol, spec: PartialSpecialization) {
        self.class_specializations
            .entry(name)
            .or_default()
            .push(spec);
    }
}
