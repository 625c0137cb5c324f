//! Scope-tree symbol table and the namespace registry.
//!
//! Scopes form a stack that mirrors lexical nesting; every `enter_scope`
//! is balanced by exactly one `exit_scope` on every exit path (the parser
//! guarantees this with a closure-based guard). Namespaces are a DAG of
//! handles; handle 0 is the global namespace. Namespace members are
//! mirrored into the registry so qualified lookup works after the scope
//! has been exited.
//!
//! Inline namespaces are not copied into their parent; unqualified and
//! qualified lookup both descend transitively into inline children, which
//! gives the same visibility.

use cxxfront_core::Symbol;
use indexmap::IndexMap;

use crate::ast::NodeId;
use crate::types::TypeId;

/// Opaque namespace handle. Handle 0 is the global namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamespaceId(pub u32);

pub const GLOBAL_NAMESPACE: NamespaceId = NamespaceId(0);

#[derive(Debug, Clone)]
struct NamespaceEntry {
    parent: Option<NamespaceId>,
    name: Option<Symbol>,
    is_inline: bool,
    children: IndexMap<Symbol, NamespaceId>,
    symbols: IndexMap<Symbol, Vec<NodeId>>,
    aliases: IndexMap<Symbol, NamespaceId>,
    using_directives: Vec<NamespaceId>,
}

impl NamespaceEntry {
    fn new(parent: Option<NamespaceId>, name: Option<Symbol>) -> Self {
        Self {
            parent,
            name,
            is_inline: false,
            children: IndexMap::new(),
            symbols: IndexMap::new(),
            aliases: IndexMap::new(),
            using_directives: Vec::new(),
        }
    }
}

/// DAG of namespaces, identified by opaque handles.
#[derive(Debug, Clone)]
pub struct NamespaceRegistry {
    entries: Vec<NamespaceEntry>,
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        Self {
            entries: vec![NamespaceEntry::new(None, None)],
        }
    }
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, parent: NamespaceId, name: Symbol) -> NamespaceId {
        if let Some(&id) = self.entries[parent.0 as usize].children.get(&name) {
            return id;
        }
        let id = NamespaceId(self.entries.len() as u32);
        self.entries.push(NamespaceEntry::new(Some(parent), Some(name)));
        self.entries[parent.0 as usize].children.insert(name, id);
        id
    }

    pub fn mark_inline(&mut self, id: NamespaceId) {
        self.entries[id.0 as usize].is_inline = true;
    }

    pub fn is_inline(&self, id: NamespaceId) -> bool {
        self.entries[id.0 as usize].is_inline
    }

    pub fn parent(&self, id: NamespaceId) -> Option<NamespaceId> {
        self.entries[id.0 as usize].parent
    }

    pub fn name(&self, id: NamespaceId) -> Option<Symbol> {
        self.entries[id.0 as usize].name
    }

    pub fn child(&self, parent: NamespaceId, name: Symbol) -> Option<NamespaceId> {
        let entry = &self.entries[parent.0 as usize];
        if let Some(&id) = entry.children.get(&name) {
            return Some(id);
        }
        if let Some(&id) = entry.aliases.get(&name) {
            return Some(id);
        }
        // A name declared in an inline child is reachable as if declared
        // in the parent.
        for &child in entry.children.values() {
            if self.entries[child.0 as usize].is_inline
                && let Some(found) = self.child(child, name)
            {
                return Some(found);
            }
        }
        None
    }

    pub fn add_alias(&mut self, scope: NamespaceId, alias: Symbol, target: NamespaceId) {
        self.entries[scope.0 as usize].aliases.insert(alias, target);
    }

    pub fn add_symbol(&mut self, ns: NamespaceId, name: Symbol, node: NodeId) {
        self.entries[ns.0 as usize]
            .symbols
            .entry(name)
            .or_default()
            .push(node);
    }

    /// Symbols visible in `ns` under `name`, descending into inline
    /// children.
    pub fn lookup_in(&self, ns: NamespaceId, name: Symbol) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect(ns, name, &mut out);
        out
    }

    fn collect(&self, ns: NamespaceId, name: Symbol, out: &mut Vec<NodeId>) {
        let entry = &self.entries[ns.0 as usize];
        if let Some(nodes) = entry.symbols.get(&name) {
            out.extend(nodes.iter().copied());
        }
        for &child in entry.children.values() {
            if self.entries[child.0 as usize].is_inline {
                self.collect(child, name, out);
            }
        }
    }

    /// Resolve a qualified path starting from `from` and walking outward
    /// through enclosing namespaces, the way unqualified lookup finds the
    /// leading name of a qualified id. A leading `::` resolves from the
    /// global namespace by passing `GLOBAL_NAMESPACE` with `absolute`.
    pub fn resolve_path(
        &self,
        from: NamespaceId,
        path: &[Symbol],
        absolute: bool,
    ) -> Option<NamespaceId> {
        let (first, rest) = path.split_first()?;
        let mut head = None;
        if absolute {
            head = self.child(GLOBAL_NAMESPACE, *first);
        } else {
            let mut scope = Some(from);
            while let Some(ns) = scope {
                if let Some(found) = self.child(ns, *first) {
                    head = Some(found);
                    break;
                }
                scope = self.parent(ns);
            }
        }
        let mut current = head?;
        for segment in rest {
            current = self.child(current, *segment)?;
        }
        Some(current)
    }

    pub fn using_directives(&self, ns: NamespaceId) -> &[NamespaceId] {
        &self.entries[ns.0 as usize].using_directives
    }

    fn add_using_directive(&mut self, ns: NamespaceId, target: NamespaceId) {
        let dirs = &mut self.entries[ns.0 as usize].using_directives;
        if !dirs.contains(&target) {
            dirs.push(target);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Namespace(NamespaceId),
    Class(TypeId),
    Function,
    Block,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    symbols: IndexMap<Symbol, Vec<NodeId>>,
    using_directives: Vec<NamespaceId>,
}

impl Scope {
    fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            symbols: IndexMap::new(),
            using_directives: Vec::new(),
        }
    }
}

/// The scope stack plus the namespace registry.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    pub namespaces: NamespaceRegistry,
    scopes: Vec<Scope>,
    enter_count: u64,
    exit_count: u64,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self {
            namespaces: NamespaceRegistry::new(),
            scopes: vec![Scope::new(ScopeKind::Global)],
            enter_count: 0,
            exit_count: 0,
        }
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_scope(&mut self, kind: ScopeKind) {
        self.enter_count += 1;
        let mut scope = Scope::new(kind);
        if let ScopeKind::Namespace(ns) = kind {
            // Directives attached in a previous block of the same namespace
            // stay active when it reopens.
            scope
                .using_directives
                .extend_from_slice(self.namespaces.using_directives(ns));
        }
        self.scopes.push(scope);
    }

    pub fn exit_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot exit the global scope");
        self.exit_count += 1;
        self.scopes.pop();
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// (enter, exit) call counts; tests assert balance.
    pub fn scope_counts(&self) -> (u64, u64) {
        (self.enter_count, self.exit_count)
    }

    pub fn current_kind(&self) -> ScopeKind {
        self.scopes.last().map_or(ScopeKind::Global, |s| s.kind)
    }

    pub fn current_namespace(&self) -> NamespaceId {
        for scope in self.scopes.iter().rev() {
            if let ScopeKind::Namespace(ns) = scope.kind {
                return ns;
            }
        }
        GLOBAL_NAMESPACE
    }

    /// Innermost enclosing class scope, if any.
    pub fn current_class(&self) -> Option<TypeId> {
        for scope in self.scopes.iter().rev() {
            if let ScopeKind::Class(id) = scope.kind {
                return Some(id);
            }
        }
        None
    }

    pub fn in_function_scope(&self) -> bool {
        self.scopes
            .iter()
            .any(|s| matches!(s.kind, ScopeKind::Function))
    }

    /// Declare `name` in the current scope. Multiple declarations under one
    /// name form an overload set; redefinition checking is the parser's job.
    pub fn declare(&mut self, name: Symbol, node: NodeId) {
        let ns = match self.scopes.last().map(|s| s.kind) {
            Some(ScopeKind::Global) => Some(GLOBAL_NAMESPACE),
            Some(ScopeKind::Namespace(ns)) => Some(ns),
            _ => None,
        };
        if let Some(scope) = self.scopes.last_mut() {
            scope.symbols.entry(name).or_default().push(node);
        }
        if let Some(ns) = ns {
            self.namespaces.add_symbol(ns, name, node);
        }
    }

    pub fn add_using_directive(&mut self, target: NamespaceId) {
        if let Some(scope) = self.scopes.last_mut() {
            if !scope.using_directives.contains(&target) {
                scope.using_directives.push(target);
            }
            if let ScopeKind::Namespace(ns) = scope.kind {
                self.namespaces.add_using_directive(ns, target);
            }
        }
    }

    /// Unqualified lookup: walk the scope stack innermost-out; at each
    /// scope also follow its using-directives (transitively) into the
    /// namespace graph.
    pub fn lookup(&self, name: Symbol) -> Vec<NodeId> {
        for scope in self.scopes.iter().rev() {
            let mut out = Vec::new();
            if let Some(nodes) = scope.symbols.get(&name) {
                out.extend(nodes.iter().copied());
            }
            if let ScopeKind::Namespace(ns) = scope.kind {
                for node in self.namespaces.lookup_in(ns, name) {
                    if !out.contains(&node) {
                        out.push(node);
                    }
                }
            }
            let mut visited = Vec::new();
            for &target in &scope.using_directives {
                self.lookup_via_directives(target, name, &mut out, &mut visited);
            }
            if !out.is_empty() {
                return out;
            }
        }
        Vec::new()
    }

    fn lookup_via_directives(
        &self,
        ns: NamespaceId,
        name: Symbol,
        out: &mut Vec<NodeId>,
        visited: &mut Vec<NamespaceId>,
    ) {
        if visited.contains(&ns) {
            return;
        }
        visited.push(ns);
        for node in self.namespaces.lookup_in(ns, name) {
            if !out.contains(&node) {
                out.push(node);
            }
        }
        for &next in self.namespaces.using_directives(ns) {
            self.lookup_via_directives(next, name, out, visited);
        }
    }

    pub fn lookup_single(&self, name: Symbol) -> Option<NodeId> {
        self.lookup(name).first().copied()
    }

    /// Qualified lookup `path::name`. The path is resolved against the
    /// namespace graph; class-qualified lookup happens in the parser
    /// against the type registry instead.
    pub fn qualified_lookup(&self, path: &[Symbol], name: Symbol, absolute: bool) -> Vec<NodeId> {
        if path.is_empty() {
            if absolute {
                return self.namespaces.lookup_in(GLOBAL_NAMESPACE, name);
            }
            return self.lookup(name);
        }
        let Some(ns) = self
            .namespaces
            .resolve_path(self.current_namespace(), path, absolute)
        else {
            return Vec::new();
        };
        self.namespaces.lookup_in(ns, name)
    }

    /// Variables declared in the enclosing function and block scopes, in
    /// declaration order. Lambda capture-default expansion matches body
    /// references against this set.
    pub fn function_local_decls(&self) -> Vec<(Symbol, NodeId)> {
        let mut out = Vec::new();
        for scope in &self.scopes {
            if matches!(scope.kind, ScopeKind::Function | ScopeKind::Block) {
                for (name, nodes) in &scope.symbols {
                    for &node in nodes {
                        out.push((*name, node));
                    }
                }
            }
        }
        out
    }

    /// Declarations visible in the current innermost scope only.
    pub fn lookup_local(&self, name: Symbol) -> Vec<NodeId> {
        self.scopes
            .last()
            .and_then(|s| s.symbols.get(&name))
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}
