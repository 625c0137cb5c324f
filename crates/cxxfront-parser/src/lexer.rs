//! Lexer for preprocessed C++20 source.
//!
//! Produces the finite token sequence the cursor walks. Lexemes are interned
//! during lexing, so the parser compares identifiers by `Symbol` handle;
//! byte offsets are converted to (line, column) once here and never again.

use cxxfront_core::SharedInterner;
use logos::Logos;

use crate::token::{SourcePos, Token, TokenKind};

/// A character the lexer cannot form a token from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unexpected character at {pos}: {slice}")]
pub struct LexError {
    pub slice: String,
    pub pos: SourcePos,
}

/// Tokenizes preprocessed source into interned tokens.
///
/// Whitespace and comments are skipped by the token definitions; everything
/// else either lexes or fails with the offending slice and position.
pub fn lex(source: &str, file: u32, interner: &SharedInterner) -> Result<Vec<Token>, LexError> {
    let lines = LineTable::new(source);
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let pos = lines.pos(file, span.start);
        match result {
            Ok(kind) => {
                let lexeme = interner.intern(lexer.slice());
                tokens.push(Token::new(kind, lexeme, pos));
            }
            Err(()) => {
                return Err(LexError {
                    slice: lexer.slice().to_owned(),
                    pos,
                });
            }
        }
    }

    Ok(tokens)
}

/// Byte-offset to line/column conversion table.
struct LineTable {
    /// Byte offset of the start of each line.
    starts: Vec<usize>,
}

impl LineTable {
    fn new(source: &str) -> Self {
        let mut starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                starts.push(i + 1);
            }
        }
        Self { starts }
    }

    fn pos(&self, file: u32, offset: usize) -> SourcePos {
        let line = self.starts.partition_point(|&s| s <= offset);
        let col = offset - self.starts[line - 1] + 1;
        SourcePos::new(file, line as u32, col as u32)
    }
}
