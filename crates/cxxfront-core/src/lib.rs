//! Core data structures shared across cxxfront crates.
//!
//! Currently: string interning. Every identifier, type name, and
//! qualified-name fragment in the front-end is referred to by a [`Symbol`]
//! handle; comparing handles is O(1). Translation units parsed in parallel
//! share one [`SharedInterner`].

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod intern;

#[cfg(test)]
mod intern_tests;

pub use intern::{Interner, SharedInterner, Symbol};
