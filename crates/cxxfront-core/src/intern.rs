//! String interning for identifiers and name fragments.
//!
//! Converts heap-allocated strings into cheap integer handles (`Symbol`).
//! Comparing two symbols is O(1) integer comparison; resolving a symbol back
//! to its text is an O(1) index.
//!
//! Two forms exist: [`Interner`] for single-threaded use, and
//! [`SharedInterner`] for the process-wide table shared between translation
//! units parsed on separate tasks. The shared form stores `Arc<str>` so that
//! `resolve` hands out the string without holding the lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// A lightweight handle to an interned string.
///
/// Comparing two symbols is O(1). Symbols are ordered by insertion order,
/// not lexicographically.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Symbol(u32);

impl Symbol {
    /// Raw index for serialization/debugging.
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Create a Symbol from a raw index. Use only for deserialization.
    #[inline]
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

/// String interner. Deduplicates strings and returns cheap Symbol handles.
#[derive(Debug, Clone, Default)]
pub struct Interner {
    /// Map from string to symbol for deduplication.
    map: HashMap<Arc<str>, Symbol>,
    /// Storage for interned strings, indexed by Symbol.
    strings: Vec<Arc<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its Symbol.
    /// If the string was already interned, returns the existing Symbol.
    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&sym) = self.map.get(s) {
            return sym;
        }

        let stored: Arc<str> = Arc::from(s);
        let sym = Symbol(self.strings.len() as u32);
        self.strings.push(Arc::clone(&stored));
        self.map.insert(stored, sym);
        sym
    }

    /// Resolve a Symbol back to its string.
    ///
    /// # Panics
    /// Panics if the symbol was not created by this interner.
    #[inline]
    pub fn resolve(&self, sym: Symbol) -> &str {
        &self.strings[sym.0 as usize]
    }

    /// Try to resolve a Symbol, returning None if invalid.
    #[inline]
    pub fn try_resolve(&self, sym: Symbol) -> Option<&str> {
        self.strings.get(sym.0 as usize).map(|s| &**s)
    }

    /// Shared handle to the resolved string. O(1), no copy of the text.
    #[inline]
    pub fn resolve_arc(&self, sym: Symbol) -> Arc<str> {
        Arc::clone(&self.strings[sym.0 as usize])
    }

    /// Number of interned strings.
    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether the interner is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Iterate over all interned strings with their symbols.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &str)> {
        self.strings
            .iter()
            .enumerate()
            .map(|(i, s)| (Symbol(i as u32), &**s))
    }
}

/// Thread-safe interner shared between translation units.
///
/// The table is append-only, so a poisoned lock leaves no torn state; the
/// poison is simply cleared.
#[derive(Debug, Clone, Default)]
pub struct SharedInterner {
    inner: Arc<Mutex<Interner>>,
}

impl SharedInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&self, s: &str) -> Symbol {
        self.lock().intern(s)
    }

    /// Resolve a Symbol to its string. O(1) handle clone after the lock.
    pub fn resolve(&self, sym: Symbol) -> Arc<str> {
        self.lock().resolve_arc(sym)
    }

    pub fn try_resolve(&self, sym: Symbol) -> Option<Arc<str>> {
        let guard = self.lock();
        guard.try_resolve(sym)?;
        Some(guard.resolve_arc(sym))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Interner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
