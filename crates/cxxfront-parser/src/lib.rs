//! C++20 front-end core.
//!
//! A single-pass, recursive-descent parser over preprocessed tokens that
//! produces a fully annotated AST, a populated symbol table, a type
//! registry, and a template-instantiation cache. Grammar recognition and
//! semantic actions (name lookup, type binding, template instantiation,
//! constant evaluation, overload resolution) are interleaved, because C++
//! cannot be parsed without types.
//!
//! # Example
//!
//! ```
//! use cxxfront_core::SharedInterner;
//! use cxxfront_parser::{CompileOptions, parse_source};
//!
//! let interner = SharedInterner::new();
//! let tu = parse_source(
//!     "int add(int a, int b) { return a + b; }",
//!     &interner,
//!     CompileOptions::default(),
//! )
//! .expect("valid translation unit");
//! assert_eq!(tu.roots.len(), 1);
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod ast;
pub mod config;
pub mod consteval;
pub mod cursor;
pub mod delayed;
pub mod diag;
pub mod lexer;
pub mod mangle;
pub mod overload;
pub mod parser;
pub mod symbols;
pub mod templates;
pub mod token;
pub mod types;

#[cfg(test)]
mod cursor_tests;
#[cfg(test)]
mod lexer_tests;
#[cfg(test)]
mod mangle_tests;
#[cfg(test)]
mod symbols_tests;
#[cfg(test)]
mod types_tests;

pub use config::{CompileOptions, LongModel, ManglingStyle};
pub use diag::{ParseError, ParseErrorKind, ParseResult, render_error};
pub use lexer::{LexError, lex};
pub use parser::{ExprContext, Parser, TranslationUnit};
pub use token::{SourcePos, Token, TokenKind};

use cxxfront_core::SharedInterner;

/// Errors from driving the full lex-then-parse pipeline.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Lex and parse one preprocessed source buffer as a translation unit.
pub fn parse_source(
    source: &str,
    interner: &SharedInterner,
    options: CompileOptions,
) -> Result<TranslationUnit, Error> {
    let tokens = lex(source, 0, interner)?;
    let parser = Parser::new(tokens, interner.clone(), options);
    Ok(parser.parse()?)
}
