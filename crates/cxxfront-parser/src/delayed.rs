//! Deferred parsing of in-class member function bodies.
//!
//! Inside a class body a member function's `{ ... }` range is skipped by
//! brace counting and recorded here, together with enough context to
//! resume: cursor position of the body (and of the constructor initializer
//! list when present), the enclosing class, and the template parameter
//! names active at the point the body was skipped. When the class body
//! closes, the queue drains in FIFO order on the same cursor.
//!
//! This is ordered re-entry, not concurrency.

use std::collections::VecDeque;

use cxxfront_core::Symbol;

use crate::ast::NodeId;
use crate::types::TypeId;

#[derive(Debug, Clone)]
pub struct DelayedBodyRecord {
    /// The in-class FunctionDecl the parsed body attaches to.
    pub target: NodeId,
    /// Token position of the body `{`.
    pub body_start: usize,
    /// Token position of the `:` beginning a constructor initializer list.
    pub init_list_start: Option<usize>,
    pub class_name: Symbol,
    pub class_type: TypeId,
    pub class_node: NodeId,
    pub is_constructor: bool,
    pub is_destructor: bool,
    /// Template parameter names in scope when the body was skipped.
    pub template_params: Vec<Symbol>,
}

#[derive(Debug, Clone, Default)]
pub struct DelayedBodyQueue {
    queue: VecDeque<DelayedBodyRecord>,
}

impl DelayedBodyQueue {
    pub fn push(&mut self, record: DelayedBodyRecord) {
        self.queue.push_back(record);
    }

    pub fn pop(&mut self) -> Option<DelayedBodyRecord> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
