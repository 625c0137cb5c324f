use cxxfront_core::SharedInterner;

use crate::cursor::{ScopedTokenPosition, TokenCursor};
use crate::lexer::lex;
use crate::token::TokenKind;

fn cursor(source: &str) -> (TokenCursor, SharedInterner) {
    let interner = SharedInterner::new();
    let tokens = lex(source, 0, &interner).expect("lexes");
    (TokenCursor::new(tokens, &interner), interner)
}

#[test]
fn advance_returns_the_consumed_token() {
    let (mut cursor, interner) = cursor("int x ;");
    let tok = cursor.advance();
    assert_eq!(tok.kind, TokenKind::KwInt);
    assert_eq!(&*interner.resolve(tok.lexeme), "int");
    assert_eq!(cursor.peek(0), TokenKind::Identifier);
}

#[test]
fn peek_does_not_move() {
    let (cursor, _) = cursor("a b");
    assert_eq!(cursor.peek(0), TokenKind::Identifier);
    assert_eq!(cursor.peek(0), TokenKind::Identifier);
    assert_eq!(cursor.peek(1), TokenKind::Identifier);
    assert_eq!(cursor.peek(2), TokenKind::Eof);
}

#[test]
fn consume_only_on_match() {
    let (mut cursor, _) = cursor("( )");
    assert!(!cursor.consume(TokenKind::RParen));
    assert!(cursor.consume(TokenKind::LParen));
    assert!(cursor.consume(TokenKind::RParen));
    assert!(cursor.is_eof());
}

#[test]
fn advance_at_eof_returns_the_sentinel_without_moving() {
    let (mut cursor, _) = cursor("x");
    cursor.advance();
    let at_eof = cursor.advance();
    assert!(at_eof.is_eof());
    let again = cursor.advance();
    assert!(again.is_eof());
}

#[test]
fn save_restore_is_byte_equivalent() {
    let (mut cursor, _) = cursor("a + b * c");
    cursor.advance();
    let before: Vec<_> = (0..6).map(|k| cursor.peek_info(k)).collect();

    let save = cursor.save_position();
    cursor.advance();
    cursor.advance();
    cursor.advance();
    cursor.restore_position(save);

    let after: Vec<_> = (0..6).map(|k| cursor.peek_info(k)).collect();
    assert_eq!(before, after);
}

#[test]
fn nested_saves_resolve_in_lifo_order() {
    let (mut cursor, _) = cursor("a b c d");
    let outer = cursor.save_position();
    cursor.advance();
    let inner = cursor.save_position();
    cursor.advance();
    cursor.restore_position(inner);
    assert_eq!(cursor.position(), 1);
    cursor.restore_position(outer);
    assert_eq!(cursor.position(), 0);
    assert_eq!(cursor.outstanding_saves(), 0);
}

#[test]
#[should_panic(expected = "LIFO")]
fn restoring_out_of_order_panics() {
    let (mut cursor, _) = cursor("a b c");
    let outer = cursor.save_position();
    let _inner = cursor.save_position();
    cursor.restore_position(outer);
}

#[test]
fn discard_keeps_the_current_position() {
    let (mut cursor, _) = cursor("a b c");
    let save = cursor.save_position();
    cursor.advance();
    cursor.advance();
    cursor.discard_position(save);
    assert_eq!(cursor.position(), 2);
}

#[test]
fn scoped_position_restores_on_drop() {
    let (mut cursor, _) = cursor("a b c");
    {
        let mut guard = ScopedTokenPosition::new(&mut cursor);
        guard.cursor().advance();
        guard.cursor().advance();
        // Dropped without commit: rewinds.
    }
    assert_eq!(cursor.position(), 0);
    assert_eq!(cursor.outstanding_saves(), 0);
}

#[test]
fn scoped_position_commit_keeps_progress() {
    let (mut cursor, _) = cursor("a b c");
    {
        let mut guard = ScopedTokenPosition::new(&mut cursor);
        guard.cursor().advance();
        guard.commit();
    }
    assert_eq!(cursor.position(), 1);
    assert_eq!(cursor.outstanding_saves(), 0);
}

#[test]
fn set_position_supports_delayed_body_reentry() {
    let (mut cursor, _) = cursor("a b c d e");
    cursor.advance();
    cursor.advance();
    let body = cursor.position();
    cursor.advance();
    let resume = cursor.position();
    cursor.set_position(body);
    assert_eq!(cursor.peek(0), TokenKind::Identifier);
    cursor.set_position(resume);
    assert_eq!(cursor.position(), 3);
}
