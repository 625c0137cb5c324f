use cxxfront_core::SharedInterner;

use crate::lexer::lex;
use crate::token::TokenKind;

fn kinds(source: &str) -> Vec<TokenKind> {
    let interner = SharedInterner::new();
    lex(source, 0, &interner)
        .expect("lexes")
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

#[test]
fn keywords_and_identifiers() {
    assert_eq!(
        kinds("int x = 42;"),
        vec![
            TokenKind::KwInt,
            TokenKind::Identifier,
            TokenKind::Assign,
            TokenKind::IntLit,
            TokenKind::Semi,
        ]
    );
}

#[test]
fn keyword_prefix_stays_an_identifier() {
    assert_eq!(kinds("intx return_"), vec![TokenKind::Identifier, TokenKind::Identifier]);
}

#[test]
fn maximal_munch_for_operators() {
    assert_eq!(kinds("a<=>b"), vec![
        TokenKind::Identifier,
        TokenKind::Spaceship,
        TokenKind::Identifier,
    ]);
    assert_eq!(kinds(">> >= > ="), vec![
        TokenKind::Shr,
        TokenKind::GtEq,
        TokenKind::Gt,
        TokenKind::Assign,
    ]);
    assert_eq!(kinds("->* -> .* ... ::"), vec![
        TokenKind::ArrowStar,
        TokenKind::Arrow,
        TokenKind::DotStar,
        TokenKind::Ellipsis,
        TokenKind::ColonColon,
    ]);
    assert_eq!(kinds("<<= <<"), vec![TokenKind::ShlAssign, TokenKind::Shl]);
}

#[test]
fn comments_and_whitespace_are_skipped() {
    assert_eq!(
        kinds("a // line comment\n/* block\n comment */ b"),
        vec![TokenKind::Identifier, TokenKind::Identifier]
    );
    assert_eq!(kinds("a /* nested * stars **/ b"), vec![
        TokenKind::Identifier,
        TokenKind::Identifier,
    ]);
}

#[test]
fn literal_kinds() {
    assert_eq!(kinds("1 1.5 1e9 'c' \"s\" 0x1F 0b01 1'000 42u"), vec![
        TokenKind::IntLit,
        TokenKind::FloatLit,
        TokenKind::FloatLit,
        TokenKind::CharLit,
        TokenKind::StrLit,
        TokenKind::IntLit,
        TokenKind::IntLit,
        TokenKind::IntLit,
        TokenKind::IntLit,
    ]);
}

#[test]
fn prefixed_string_and_char_literals() {
    assert_eq!(kinds("L\"wide\" u8'c' U\"u\""), vec![
        TokenKind::StrLit,
        TokenKind::CharLit,
        TokenKind::StrLit,
    ]);
}

#[test]
fn hash_survives_for_pragma_routing() {
    assert_eq!(kinds("#pragma pack(8)"), vec![
        TokenKind::Hash,
        TokenKind::Identifier,
        TokenKind::Identifier,
        TokenKind::LParen,
        TokenKind::IntLit,
        TokenKind::RParen,
    ]);
}

#[test]
fn positions_are_one_based_lines_and_columns() {
    let interner = SharedInterner::new();
    let tokens = lex("int x;\n  int y;", 3, &interner).expect("lexes");
    assert_eq!(tokens[0].pos.line, 1);
    assert_eq!(tokens[0].pos.column, 1);
    assert_eq!(tokens[0].pos.file, 3);
    assert_eq!(tokens[1].pos.column, 5);
    // `int` on line 2 after two spaces.
    assert_eq!(tokens[3].pos.line, 2);
    assert_eq!(tokens[3].pos.column, 3);
}

#[test]
fn lexemes_are_interned_and_deduplicated() {
    let interner = SharedInterner::new();
    let tokens = lex("abc abc abc", 0, &interner).expect("lexes");
    assert_eq!(tokens[0].lexeme, tokens[1].lexeme);
    assert_eq!(tokens[1].lexeme, tokens[2].lexeme);
}

#[test]
fn unknown_character_is_a_structured_error() {
    let interner = SharedInterner::new();
    let err = lex("int ` x", 0, &interner).expect_err("backtick does not lex");
    assert_eq!(err.pos.line, 1);
    assert_eq!(err.pos.column, 5);
}

#[test]
fn vendor_keywords() {
    assert_eq!(kinds("__cdecl __pragma __attribute__ __restrict__"), vec![
        TokenKind::KwCdecl,
        TokenKind::KwMsPragma,
        TokenKind::KwAttribute,
        TokenKind::KwRestrict,
    ]);
}

#[test]
fn contextual_keywords_lex_as_identifiers() {
    assert_eq!(kinds("final override"), vec![
        TokenKind::Identifier,
        TokenKind::Identifier,
    ]);
}
