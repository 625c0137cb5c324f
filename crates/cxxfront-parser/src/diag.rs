//! Parse errors and their rendering.
//!
//! Every parser entry point returns [`ParseResult`]; errors carry the
//! offending token and propagate with `?`. There is no local recovery
//! outside SFINAE and backtracking-based disambiguation, so the first error
//! at top level aborts the translation unit.

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};
use cxxfront_core::SharedInterner;

use crate::token::Token;

/// Error taxonomy. Each kind maps to exactly one trigger in the grammar or
/// the semantic passes; nothing is silently swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("unexpected token")]
    UnexpectedToken,
    #[error("missing identifier")]
    MissingIdentifier,
    #[error("symbol redefined with a different value")]
    Redefinition,
    #[error("not implemented")]
    NotImplemented,
    #[error("maximum recursion depth exceeded")]
    RecursionLimit,
    #[error("ambiguous overload")]
    AmbiguousOverload,
    #[error("ambiguous template partial specialization")]
    AmbiguousSpecialization,
    #[error("constant expression required")]
    NotConstant,
    #[error("inheritance from final class")]
    InheritFromFinal,
    #[error("unknown pragma")]
    UnknownPragma,
    /// Deferrable only inside template definitions and struct bodies.
    #[error("template-dependent expression")]
    TemplateDependent,
    /// Internal to SFINAE contexts; becomes candidate elimination, never a
    /// user-visible error on its own.
    #[error("constraint not satisfied")]
    ConstraintNotSatisfied,
}

/// A parse error: kind, human-readable message, offending token.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} at {pos}", pos = self.token.pos)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub token: Token,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: impl Into<String>, token: Token) -> Self {
        Self {
            kind,
            message: message.into(),
            token,
        }
    }

    pub fn unexpected(message: impl Into<String>, token: Token) -> Self {
        Self::new(ParseErrorKind::UnexpectedToken, message, token)
    }

    pub fn missing_identifier(message: impl Into<String>, token: Token) -> Self {
        Self::new(ParseErrorKind::MissingIdentifier, message, token)
    }

    pub fn not_constant(message: impl Into<String>, token: Token) -> Self {
        Self::new(ParseErrorKind::NotConstant, message, token)
    }

    pub fn is_sfinae_eligible(&self) -> bool {
        matches!(
            self.kind,
            ParseErrorKind::MissingIdentifier
                | ParseErrorKind::UnexpectedToken
                | ParseErrorKind::TemplateDependent
                | ParseErrorKind::ConstraintNotSatisfied
        )
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Non-fatal diagnostics (currently only unknown pragmas) collected during
/// the parse and surfaced on the finished translation unit.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: ParseErrorKind,
    pub message: String,
    pub token: Token,
}

/// Renders a parse error as an annotated source snippet.
///
/// The token carries (line, column); the byte span is recovered from the
/// source text and the interned lexeme length.
pub fn render_error(
    source: &str,
    path: &str,
    err: &ParseError,
    interner: &SharedInterner,
) -> String {
    if source.is_empty() {
        return format!("error: {err}");
    }

    let start = byte_offset(source, err.token.pos.line, err.token.pos.column).min(source.len() - 1);
    let len = if err.token.is_eof() {
        1
    } else {
        interner.resolve(err.token.lexeme).len().max(1)
    };
    let end = (start + len).min(source.len());

    let snippet = Snippet::source(source)
        .line_start(1)
        .path(path)
        .annotation(AnnotationKind::Primary.span(start..end).label(&err.message));
    let report: Vec<Group> = vec![Level::ERROR.primary_title(&err.message).element(snippet)];
    Renderer::plain().render(&report)
}

fn byte_offset(source: &str, line: u32, column: u32) -> usize {
    let mut remaining = line.saturating_sub(1);
    let mut offset = 0usize;
    if remaining > 0 {
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                remaining -= 1;
                if remaining == 0 {
                    offset = i + 1;
                    break;
                }
            }
        }
    }
    offset + column.saturating_sub(1) as usize
}
