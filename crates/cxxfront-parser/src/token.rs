//! Token definitions for preprocessed C++20 source.
//!
//! Tokens arrive with macros already expanded and `#include` resolved; the
//! only preprocessor residue the parser sees is `#pragma`, which is why `#`
//! survives lexing as a token. Keywords get their own kinds; the contextual
//! keywords (`final`, `override`) deliberately stay identifiers and are
//! recognized by lexeme where the grammar allows them.

use cxxfront_core::Symbol;
use logos::Logos;

/// Source position of a token: file index, 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourcePos {
    pub file: u32,
    pub line: u32,
    pub column: u32,
}

impl SourcePos {
    pub fn new(file: u32, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }
}

impl std::fmt::Display for SourcePos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Immutable token: kind, interned lexeme, source position.
///
/// The parser never rewrites tokens; disambiguation happens by re-reading
/// them from a different cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: Symbol,
    pub pos: SourcePos,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: Symbol, pos: SourcePos) -> Self {
        Self { kind, lexeme, pos }
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

/// Token kinds for preprocessed C++20.
///
/// `Eof` is synthetic: the lexer never produces it, the cursor does.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
#[logos(skip r"/\*(?:[^*]|\*+[^*/])*\*+/")]
pub enum TokenKind {
    // Keywords
    #[token("alignas")]
    KwAlignas,
    #[token("alignof")]
    KwAlignof,
    #[token("asm")]
    KwAsm,
    #[token("auto")]
    KwAuto,
    #[token("bool")]
    KwBool,
    #[token("break")]
    KwBreak,
    #[token("case")]
    KwCase,
    #[token("catch")]
    KwCatch,
    #[token("char")]
    KwChar,
    #[token("char8_t")]
    KwChar8T,
    #[token("char16_t")]
    KwChar16T,
    #[token("char32_t")]
    KwChar32T,
    #[token("class")]
    KwClass,
    #[token("concept")]
    KwConcept,
    #[token("const")]
    KwConst,
    #[token("consteval")]
    KwConsteval,
    #[token("constexpr")]
    KwConstexpr,
    #[token("constinit")]
    KwConstinit,
    #[token("const_cast")]
    KwConstCast,
    #[token("continue")]
    KwContinue,
    #[token("decltype")]
    KwDecltype,
    #[token("default")]
    KwDefault,
    #[token("delete")]
    KwDelete,
    #[token("do")]
    KwDo,
    #[token("double")]
    KwDouble,
    #[token("dynamic_cast")]
    KwDynamicCast,
    #[token("else")]
    KwElse,
    #[token("enum")]
    KwEnum,
    #[token("explicit")]
    KwExplicit,
    #[token("export")]
    KwExport,
    #[token("extern")]
    KwExtern,
    #[token("false")]
    KwFalse,
    #[token("float")]
    KwFloat,
    #[token("for")]
    KwFor,
    #[token("friend")]
    KwFriend,
    #[token("goto")]
    KwGoto,
    #[token("if")]
    KwIf,
    #[token("inline")]
    KwInline,
    #[token("int")]
    KwInt,
    #[token("long")]
    KwLong,
    #[token("mutable")]
    KwMutable,
    #[token("namespace")]
    KwNamespace,
    #[token("new")]
    KwNew,
    #[token("noexcept")]
    KwNoexcept,
    #[token("nullptr")]
    KwNullptr,
    #[token("operator")]
    KwOperator,
    #[token("private")]
    KwPrivate,
    #[token("protected")]
    KwProtected,
    #[token("public")]
    KwPublic,
    #[token("register")]
    KwRegister,
    #[token("reinterpret_cast")]
    KwReinterpretCast,
    #[token("requires")]
    KwRequires,
    #[token("return")]
    KwReturn,
    #[token("short")]
    KwShort,
    #[token("signed")]
    KwSigned,
    #[token("sizeof")]
    KwSizeof,
    #[token("static")]
    KwStatic,
    #[token("static_assert")]
    KwStaticAssert,
    #[token("static_cast")]
    KwStaticCast,
    #[token("struct")]
    KwStruct,
    #[token("switch")]
    KwSwitch,
    #[token("template")]
    KwTemplate,
    #[token("this")]
    KwThis,
    #[token("thread_local")]
    KwThreadLocal,
    #[token("throw")]
    KwThrow,
    #[token("true")]
    KwTrue,
    #[token("try")]
    KwTry,
    #[token("typedef")]
    KwTypedef,
    #[token("typeid")]
    KwTypeid,
    #[token("typename")]
    KwTypename,
    #[token("union")]
    KwUnion,
    #[token("unsigned")]
    KwUnsigned,
    #[token("using")]
    KwUsing,
    #[token("virtual")]
    KwVirtual,
    #[token("void")]
    KwVoid,
    #[token("volatile")]
    KwVolatile,
    #[token("wchar_t")]
    KwWcharT,
    #[token("while")]
    KwWhile,

    // Vendor extension keywords
    #[token("__cdecl")]
    KwCdecl,
    #[token("__stdcall")]
    KwStdcall,
    #[token("__thiscall")]
    KwThiscall,
    #[token("__fastcall")]
    KwFastcall,
    #[token("__vectorcall")]
    KwVectorcall,
    #[token("__pragma")]
    KwMsPragma,
    #[token("__forceinline")]
    KwForceinline,
    #[token("__declspec")]
    KwDeclspec,
    #[token("__attribute__")]
    KwAttribute,
    #[token("__restrict")]
    #[token("__restrict__")]
    KwRestrict,
    #[token("__real__")]
    KwRealPart,
    #[token("__imag__")]
    KwImagPart,

    // Punctuators and operators
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token("...")]
    Ellipsis,
    #[token("::")]
    ColonColon,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token(".")]
    Dot,
    #[token(".*")]
    DotStar,
    #[token("->")]
    Arrow,
    #[token("->*")]
    ArrowStar,
    #[token("~")]
    Tilde,
    #[token("!")]
    Bang,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("^")]
    Caret,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("=")]
    Assign,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("%=")]
    PercentAssign,
    #[token("^=")]
    CaretAssign,
    #[token("&=")]
    AmpAssign,
    #[token("|=")]
    PipeAssign,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("<<=")]
    ShlAssign,
    #[token(">>=")]
    ShrAssign,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("<=>")]
    Spaceship,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("#")]
    Hash,

    // Literals
    #[regex(r"0[xX][0-9a-fA-F']+[uUlL]*")]
    #[regex(r"0[bB][01']+[uUlL]*")]
    #[regex(r"[0-9][0-9']*[uUlL]*")]
    IntLit,
    #[regex(r"[0-9][0-9']*\.[0-9']*([eE][+-]?[0-9]+)?(f|F|l|L)?")]
    #[regex(r"\.[0-9][0-9']*([eE][+-]?[0-9]+)?(f|F|l|L)?")]
    #[regex(r"[0-9][0-9']*[eE][+-]?[0-9]+(f|F|l|L)?")]
    FloatLit,
    #[regex(r"(u8|u|U|L)?'(\\.|[^\\'\n])+'")]
    CharLit,
    #[regex(r#"(u8|u|U|L)?"(\\.|[^\\"\n])*""#)]
    StrLit,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Identifier,

    // Synthetic; produced by the cursor past the last token.
    Eof,
}

impl TokenKind {
    pub fn is_eof(self) -> bool {
        self == Self::Eof
    }

    pub fn is_identifier(self) -> bool {
        self == Self::Identifier
    }

    pub fn is_string_literal(self) -> bool {
        self == Self::StrLit
    }

    pub fn is_char_literal(self) -> bool {
        self == Self::CharLit
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Self::IntLit
                | Self::FloatLit
                | Self::CharLit
                | Self::StrLit
                | Self::KwTrue
                | Self::KwFalse
                | Self::KwNullptr
        )
    }

    /// Keywords that can begin a `type-specifier-seq`.
    pub fn is_builtin_type_keyword(self) -> bool {
        matches!(
            self,
            Self::KwVoid
                | Self::KwBool
                | Self::KwChar
                | Self::KwChar8T
                | Self::KwChar16T
                | Self::KwChar32T
                | Self::KwWcharT
                | Self::KwShort
                | Self::KwInt
                | Self::KwLong
                | Self::KwSigned
                | Self::KwUnsigned
                | Self::KwFloat
                | Self::KwDouble
                | Self::KwAuto
        )
    }

    pub fn is_cv_qualifier(self) -> bool {
        matches!(self, Self::KwConst | Self::KwVolatile)
    }

    pub fn is_calling_convention(self) -> bool {
        matches!(
            self,
            Self::KwCdecl
                | Self::KwStdcall
                | Self::KwThiscall
                | Self::KwFastcall
                | Self::KwVectorcall
        )
    }

    /// Keywords that can begin a top-level declaration; used by the
    /// unknown-pragma skipper to find the end of a directive.
    pub fn starts_declaration(self) -> bool {
        matches!(
            self,
            Self::KwNamespace
                | Self::KwTemplate
                | Self::KwConcept
                | Self::KwClass
                | Self::KwStruct
                | Self::KwUnion
                | Self::KwEnum
                | Self::KwTypedef
                | Self::KwUsing
                | Self::KwExtern
                | Self::KwStatic
                | Self::KwInline
                | Self::KwConstexpr
                | Self::KwStaticAssert
        ) || self.is_builtin_type_keyword()
    }

    pub fn is_keyword(self) -> bool {
        (Self::KwAlignas as u16..=Self::KwImagPart as u16).contains(&(self as u16))
    }
}
