//! Lazy member instantiation bookkeeping.
//!
//! When a class template is instantiated, member function bodies are not
//! substituted; each member is registered here keyed by
//! (mangled class name, member name). Uses escalate the phase just far
//! enough: `Layout` materializes what sizeof/alignof need, `Full`
//! substitutes the body. A member is substituted exactly once; repeated
//! triggers return the cached state.

use cxxfront_core::Symbol;
use indexmap::IndexMap;

use crate::ast::NodeId;
use super::TemplateArg;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InstantiationPhase {
    Declaration,
    Layout,
    Full,
}

#[derive(Debug, Clone)]
pub struct LazyMemberInfo {
    /// Mangled name of the instantiated class.
    pub class_name: Symbol,
    pub member_name: Symbol,
    /// Primary template the class came from.
    pub template_name: Symbol,
    /// Declaration-only FunctionDecl inside the instantiated class.
    pub member_decl: NodeId,
    /// Body node in the primary template, if the member has one.
    pub template_body: Option<NodeId>,
    pub args: Vec<TemplateArg>,
    pub phase: InstantiationPhase,
    /// Re-entrancy guard: a member being substituted must not trigger its
    /// own substitution.
    pub in_progress: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LazyInstantiationRegistry {
    entries: IndexMap<(Symbol, Symbol), LazyMemberInfo>,
}

impl LazyInstantiationRegistry {
    pub fn register(&mut self, info: LazyMemberInfo) {
        self.entries
            .entry((info.class_name, info.member_name))
            .or_insert(info);
    }

    /// Registered and not yet fully substituted.
    pub fn needs_instantiation(&self, class: Symbol, member: Symbol) -> bool {
        self.entries
            .get(&(class, member))
            .is_some_and(|e| e.phase < InstantiationPhase::Full && !e.in_progress)
    }

    pub fn get_lazy_member_info(&self, class: Symbol, member: Symbol) -> Option<&LazyMemberInfo> {
        self.entries.get(&(class, member))
    }

    pub fn mark_in_progress(&mut self, class: Symbol, member: Symbol, value: bool) {
        if let Some(entry) = self.entries.get_mut(&(class, member)) {
            entry.in_progress = value;
        }
    }

    pub fn mark_instantiated(&mut self, class: Symbol, member: Symbol) {
        if let Some(entry) = self.entries.get_mut(&(class, member)) {
            entry.phase = InstantiationPhase::Full;
            entry.in_progress = false;
        }
    }

    /// Raise the phase; never lowers it.
    pub fn escalate(&mut self, class: Symbol, member: Symbol, phase: InstantiationPhase) {
        if let Some(entry) = self.entries.get_mut(&(class, member))
            && entry.phase < phase
        {
            entry.phase = phase;
        }
    }

    pub fn members_of(&self, class: Symbol) -> impl Iterator<Item = &LazyMemberInfo> {
        self.entries
            .values()
            .filter(move |e| e.class_name == class)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
