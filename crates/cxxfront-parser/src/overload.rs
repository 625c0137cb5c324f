//! Overload resolution.
//!
//! Candidates are concrete FunctionDecl nodes; the parser instantiates any
//! viable function templates before asking for a ranking, so template
//! candidates arrive here already substituted. Ranking follows the
//! implicit-conversion-sequence order: exact match beats promotion beats
//! standard conversion beats user-defined conversion. Candidate vectors
//! keep declaration order, which makes resolution deterministic.

use crate::ast::{Node, NodeId};
use crate::types::{BaseKind, RefKind, TypeRegistry, TypeSpecifier};
use crate::ast::Arena;

/// Rank of one implicit conversion sequence, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConversionRank {
    Exact,
    Promotion,
    Conversion,
    UserDefined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverloadError {
    NoViable,
    Ambiguous(Vec<NodeId>),
}

/// An argument as the resolver sees it: its type plus whether the
/// expression it came from is an lvalue (drives forwarding-reference
/// matching).
#[derive(Debug, Clone)]
pub struct CallArg {
    pub ty: TypeSpecifier,
    pub is_lvalue: bool,
}

/// Selects the best candidate for the given arguments.
pub fn resolve(
    arena: &Arena,
    types: &TypeRegistry,
    candidates: &[NodeId],
    args: &[CallArg],
) -> Result<NodeId, OverloadError> {
    let mut best: Vec<(NodeId, Vec<ConversionRank>)> = Vec::new();

    for &cand in candidates {
        let Node::FunctionDecl(f) = arena.get(cand) else {
            continue;
        };
        if f.flags.is_deleted {
            continue;
        }
        let Some(ranks) = viability(types, &f.params, f.flags.is_variadic, args) else {
            continue;
        };
        match best.first() {
            None => best.push((cand, ranks)),
            Some((_, best_ranks)) => match compare_sequences(&ranks, best_ranks) {
                std::cmp::Ordering::Less => {
                    best.clear();
                    best.push((cand, ranks));
                }
                std::cmp::Ordering::Equal => best.push((cand, ranks)),
                std::cmp::Ordering::Greater => {}
            },
        }
    }

    match best.len() {
        0 => Err(OverloadError::NoViable),
        1 => Ok(best[0].0),
        _ => Err(OverloadError::Ambiguous(
            best.into_iter().map(|(id, _)| id).collect(),
        )),
    }
}

/// Per-argument conversion ranks if the candidate is viable, else `None`.
fn viability(
    types: &TypeRegistry,
    params: &[crate::ast::Param],
    is_variadic: bool,
    args: &[CallArg],
) -> Option<Vec<ConversionRank>> {
    let required = params.iter().take_while(|p| p.default.is_none()).count();
    if args.len() < required {
        return None;
    }
    if args.len() > params.len() && !is_variadic {
        return None;
    }

    let mut ranks = Vec::with_capacity(args.len());
    for (arg, param) in args.iter().zip(params) {
        ranks.push(rank_conversion(types, arg, &param.ty)?);
    }
    // Arguments consumed by `...` convert at worst rank.
    for _ in params.len()..args.len() {
        ranks.push(ConversionRank::UserDefined);
    }
    Some(ranks)
}

/// Rank the conversion of `arg` to `param`, `None` if impossible.
pub fn rank_conversion(
    types: &TypeRegistry,
    arg: &CallArg,
    param: &TypeSpecifier,
) -> Option<ConversionRank> {
    let param = types.resolve_alias(param);
    let arg_ty = types.resolve_alias(&arg.ty);

    // Reference binding: the referent must match; an rvalue reference
    // cannot bind to an lvalue (forwarding references are rewritten by
    // deduction before resolution happens).
    if param.ref_kind == RefKind::RValue && arg.is_lvalue {
        return None;
    }
    if param.ref_kind == RefKind::LValue && !arg.is_lvalue && !param.cv.is_const {
        return None;
    }

    let a = arg_ty.decayed();
    let mut p = param.clone();
    p.ref_kind = RefKind::None;
    let p = p.decayed();

    if a.shape_eq(&p) {
        return Some(ConversionRank::Exact);
    }

    // Unresolved parameter types (dependent contexts) accept anything at
    // conversion rank so SFINAE decides, not the ranker.
    if p.is_unresolved() || a.is_unresolved() {
        return Some(ConversionRank::Conversion);
    }

    if a.is_arithmetic() && p.is_arithmetic() {
        return Some(rank_arithmetic(&a, &p));
    }

    // Null pointer constant and pointer conversions.
    if p.is_pointer() && (a.base == BaseKind::Nullptr || a.is_pointer()) {
        return Some(ConversionRank::Conversion);
    }
    // Anything arithmetic or pointer converts to bool.
    if p.is_bool() && (a.is_arithmetic() || a.is_pointer()) {
        return Some(ConversionRank::Conversion);
    }
    // Unscoped enum to its underlying integral type.
    if a.base == BaseKind::Enum && p.is_integral() {
        let scoped = a
            .type_id
            .and_then(|id| types.get(id).enum_info.as_ref().map(|e| e.is_scoped))
            .unwrap_or(false);
        if !scoped {
            return Some(ConversionRank::Conversion);
        }
    }
    // Derived-to-base pointer/reference conversion.
    if p.base == BaseKind::Struct && a.base == BaseKind::Struct {
        if let (Some(from), Some(to)) = (a.type_id, p.type_id)
            && type_derives_from(types, from, to)
        {
            return Some(ConversionRank::Conversion);
        }
        // A converting constructor or conversion operator could exist.
        return Some(ConversionRank::UserDefined);
    }
    if p.base == BaseKind::Struct {
        return Some(ConversionRank::UserDefined);
    }

    None
}

fn rank_arithmetic(a: &TypeSpecifier, p: &TypeSpecifier) -> ConversionRank {
    if a.base == p.base {
        return ConversionRank::Exact;
    }
    // Integral promotion: rank below int promotes to int.
    if a.is_integral()
        && p.base == BaseKind::Int
        && a.base.rank() < BaseKind::Int.rank()
    {
        return ConversionRank::Promotion;
    }
    if a.base == BaseKind::Float && p.base == BaseKind::Double {
        return ConversionRank::Promotion;
    }
    ConversionRank::Conversion
}

/// Transitive base-class reachability.
pub fn type_derives_from(
    types: &TypeRegistry,
    derived: crate::types::TypeId,
    base: crate::types::TypeId,
) -> bool {
    if derived == base {
        return true;
    }
    let Some(info) = &types.get(derived).struct_info else {
        return false;
    };
    info.bases
        .iter()
        .filter_map(|b| b.type_id)
        .any(|b| type_derives_from(types, b, base))
}

/// Lexicographic-ish comparison of conversion sequences: a candidate wins
/// when no argument converts worse and at least one converts better.
fn compare_sequences(a: &[ConversionRank], b: &[ConversionRank]) -> std::cmp::Ordering {
    let mut better = false;
    let mut worse = false;
    for (x, y) in a.iter().zip(b) {
        match x.cmp(y) {
            std::cmp::Ordering::Less => better = true,
            std::cmp::Ordering::Greater => worse = true,
            std::cmp::Ordering::Equal => {}
        }
    }
    match (better, worse) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => std::cmp::Ordering::Equal,
    }
}
