//! Positioned lookahead over an immutable token sequence.
//!
//! Backtracking is save/restore based: `save_position` pushes the current
//! position onto a LIFO stack and hands back a handle; the handle is later
//! either restored (rewind) or discarded (commit). Handles must resolve in
//! LIFO order; restoring out of order is an invariant violation and
//! panics. [`ScopedTokenPosition`] wraps the pattern in a drop guard for
//! code that holds the cursor directly; the parser uses its own
//! closure-based equivalent.

use cxxfront_core::{SharedInterner, Symbol};

use crate::token::{SourcePos, Token, TokenKind};

/// Handle for a saved cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveHandle(usize);

#[derive(Debug, Clone)]
pub struct TokenCursor {
    tokens: Vec<Token>,
    pos: usize,
    saves: Vec<usize>,
    eof: Token,
}

impl TokenCursor {
    pub fn new(tokens: Vec<Token>, interner: &SharedInterner) -> Self {
        let eof_pos = tokens
            .last()
            .map_or_else(SourcePos::default, |t| SourcePos {
                file: t.pos.file,
                line: t.pos.line,
                column: t.pos.column + 1,
            });
        let eof = Token::new(TokenKind::Eof, interner.intern(""), eof_pos);
        Self {
            tokens,
            pos: 0,
            saves: Vec::new(),
            eof,
        }
    }

    #[inline]
    pub fn peek(&self, offset: usize) -> TokenKind {
        self.peek_info(offset).kind
    }

    #[inline]
    pub fn peek_info(&self, offset: usize) -> Token {
        *self.tokens.get(self.pos + offset).unwrap_or(&self.eof)
    }

    #[inline]
    pub fn current(&self) -> Token {
        self.peek_info(0)
    }

    pub fn at(&self, kind: TokenKind) -> bool {
        self.peek(0) == kind
    }

    /// The next identifier's lexeme equals `sym`. Contextual keywords
    /// (`final`, `override`, `pragma`) are matched this way.
    pub fn at_ident(&self, sym: Symbol) -> bool {
        let tok = self.peek_info(0);
        tok.kind == TokenKind::Identifier && tok.lexeme == sym
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Consume and return the current token. At EOF returns the sentinel
    /// without advancing.
    pub fn advance(&mut self) -> Token {
        let tok = self.peek_info(0);
        if !tok.is_eof() {
            self.pos += 1;
        }
        tok
    }

    /// Consume the current token iff it has the expected kind.
    pub fn consume(&mut self, expected: TokenKind) -> bool {
        if self.at(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn save_position(&mut self) -> SaveHandle {
        self.saves.push(self.pos);
        SaveHandle(self.saves.len() - 1)
    }

    /// Rewind to the saved position. Panics if `handle` is not the most
    /// recent outstanding save.
    pub fn restore_position(&mut self, handle: SaveHandle) {
        assert_eq!(
            handle.0 + 1,
            self.saves.len(),
            "token position restored out of LIFO order"
        );
        self.pos = self.saves.pop().expect("save stack underflow");
    }

    /// Commit: forget the saved position, keep the current one. Panics if
    /// `handle` is not the most recent outstanding save.
    pub fn discard_position(&mut self, handle: SaveHandle) {
        assert_eq!(
            handle.0 + 1,
            self.saves.len(),
            "token position discarded out of LIFO order"
        );
        self.saves.pop();
    }

    /// Raw position, for the delayed-body queue. Not a save handle; no
    /// stack discipline applies.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Reposition for delayed-body re-entry.
    pub fn set_position(&mut self, pos: usize) {
        debug_assert!(pos <= self.tokens.len());
        self.pos = pos;
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn outstanding_saves(&self) -> usize {
        self.saves.len()
    }
}

/// RAII save/restore guard over a cursor borrow. Restores on drop unless
/// [`commit`](Self::commit) was called.
pub struct ScopedTokenPosition<'a> {
    cursor: &'a mut TokenCursor,
    handle: Option<SaveHandle>,
}

impl<'a> ScopedTokenPosition<'a> {
    pub fn new(cursor: &'a mut TokenCursor) -> Self {
        let handle = cursor.save_position();
        Self {
            cursor,
            handle: Some(handle),
        }
    }

    pub fn cursor(&mut self) -> &mut TokenCursor {
        self.cursor
    }

    /// Keep the current position; the guard becomes inert.
    pub fn commit(mut self) {
        if let Some(handle) = self.handle.take() {
            self.cursor.discard_position(handle);
        }
    }
}

impl Drop for ScopedTokenPosition<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.cursor.restore_position(handle);
        }
    }
}
