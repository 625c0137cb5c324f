//! Constant-expression evaluation.
//!
//! Evaluates non-dependent constant expressions over arena nodes: array
//! bounds, `static_assert` conditions, non-type template arguments,
//! `if constexpr` conditions, enumerator initializers. The evaluator is
//! read-only; anything that would need to instantiate a template on the
//! way (a `sizeof` of an un-laid-out class template) is arranged by the
//! parser before evaluation.
//!
//! The evaluator is intentionally incomplete for heavy constexpr library
//! patterns; callers inside struct bodies defer the originating
//! `static_assert` instead of failing.

use std::collections::HashMap;

use cxxfront_core::{SharedInterner, Symbol};

use crate::ast::{
    Arena, BinaryOp, CastKind, ConstValue, Node, NodeId, SizeofArg, UnaryOp,
};
use crate::config::CompileOptions;
use crate::symbols::SymbolTable;
use crate::types::{BaseKind, TypeId, TypeRegistry, TypeSpecifier};

/// Result of evaluating a constant expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Bool(bool),
    Float(f64),
}

impl Value {
    pub fn as_bool(self) -> bool {
        match self {
            Self::Int(v) => v != 0,
            Self::UInt(v) => v != 0,
            Self::Bool(v) => v,
            Self::Float(v) => v != 0.0,
        }
    }

    pub fn as_i64(self) -> i64 {
        match self {
            Self::Int(v) => v,
            Self::UInt(v) => v as i64,
            Self::Bool(v) => i64::from(v),
            Self::Float(v) => v as i64,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::UInt(v) => v as f64,
            Self::Bool(v) => f64::from(u8::from(v)),
            Self::Float(v) => v,
        }
    }

    fn is_float(self) -> bool {
        matches!(self, Self::Float(_))
    }

    pub fn to_const_value(self) -> ConstValue {
        match self {
            Self::Int(v) => ConstValue::Int(v),
            Self::UInt(v) => ConstValue::UInt(v),
            Self::Bool(v) => ConstValue::Bool(v),
            Self::Float(v) => ConstValue::Float(v),
        }
    }

    pub fn from_const_value(v: ConstValue) -> Self {
        match v {
            ConstValue::Int(v) => Self::Int(v),
            ConstValue::UInt(v) => Self::UInt(v),
            ConstValue::Bool(v) => Self::Bool(v),
            ConstValue::Float(v) => Self::Float(v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// The expression mentions a template parameter; may be deferred in
    /// template or struct-body contexts.
    TemplateDependent,
    NonConstant,
    DivideByZero,
    OutOfBounds,
    IncompleteType,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub message: String,
}

impl EvalError {
    fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn non_constant(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::NonConstant, message)
    }

    fn dependent(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::TemplateDependent, message)
    }
}

pub type EvalResult = Result<Value, EvalError>;

/// Bound on nested constexpr function calls.
const MAX_CALL_DEPTH: u32 = 64;

pub struct EvalContext<'a> {
    pub arena: &'a Arena,
    pub types: &'a TypeRegistry,
    pub symbols: &'a SymbolTable,
    pub interner: &'a SharedInterner,
    pub options: &'a CompileOptions,
    /// Class whose static members resolve unqualified, for expressions
    /// inside a struct body.
    pub struct_context: Option<TypeId>,
    /// Active template parameter names; hitting one is TemplateDependent.
    pub template_params: Vec<Symbol>,
}

#[derive(Default)]
struct Frame {
    locals: HashMap<Symbol, Value>,
}

pub fn evaluate(ctx: &EvalContext<'_>, node: NodeId) -> EvalResult {
    eval(ctx, node, &Frame::default(), 0)
}

fn eval(ctx: &EvalContext<'_>, node: NodeId, frame: &Frame, depth: u32) -> EvalResult {
    match ctx.arena.get(node) {
        Node::NumericLiteral { value, .. } => Ok(Value::from_const_value(*value)),
        Node::BoolLiteral(v) => Ok(Value::Bool(*v)),
        Node::CharLiteral { value } => Ok(Value::Int(*value)),
        Node::NullptrLiteral => Ok(Value::Int(0)),
        Node::StringLiteral { .. } => Err(EvalError::non_constant(
            "string literal is not an integral constant",
        )),
        Node::ExpressionWrapper(inner) | Node::PackExpansion(inner) => {
            eval(ctx, *inner, frame, depth)
        }
        Node::Identifier { name, decl } => eval_identifier(ctx, *name, *decl, frame, depth),
        Node::QualifiedIdentifier { path, name, decl } => {
            if let Some(decl) = decl {
                return eval_decl(ctx, *decl, depth);
            }
            eval_qualified(ctx, path, *name, depth)
        }
        Node::TemplateParameterReference { name, .. } => frame
            .locals
            .get(name)
            .copied()
            .ok_or_else(|| EvalError::dependent("unsubstituted template parameter")),
        Node::UnaryOp { op, operand } => {
            let v = eval(ctx, *operand, frame, depth)?;
            eval_unary(*op, v)
        }
        Node::BinaryOp { op, lhs, rhs } => eval_binary(ctx, *op, *lhs, *rhs, frame, depth),
        Node::Ternary {
            cond,
            then_expr,
            else_expr,
        } => {
            let c = eval(ctx, *cond, frame, depth)?;
            if c.as_bool() {
                eval(ctx, *then_expr, frame, depth)
            } else {
                eval(ctx, *else_expr, frame, depth)
            }
        }
        Node::Cast { kind, target, expr } => {
            if matches!(kind, CastKind::Dynamic | CastKind::Reinterpret) {
                return Err(EvalError::non_constant("cast is not a constant expression"));
            }
            let v = eval(ctx, *expr, frame, depth)?;
            convert(v, target)
        }
        Node::ConstructorCall { ty, args, .. } if ty.is_arithmetic() => {
            // Functional cast on an arithmetic type.
            match args.as_slice() {
                [] => Ok(Value::Int(0)),
                [arg] => {
                    let v = eval(ctx, *arg, frame, depth)?;
                    convert(v, ty)
                }
                _ => Err(EvalError::non_constant("too many functional-cast arguments")),
            }
        }
        Node::SizeofExpr { arg } => sizeof_like(ctx, arg, frame, depth, false),
        Node::AlignofExpr { arg } => sizeof_like(ctx, arg, frame, depth, true),
        Node::OffsetofExpr { ty, member } => offsetof(ctx, ty, *member),
        Node::NoexceptExpr(inner) => Ok(Value::Bool(callee_noexcept(ctx, *inner))),
        Node::SizeofPack { .. } => Err(EvalError::dependent("unexpanded parameter pack")),
        Node::TypeTraitExpr { value, .. } => value
            .map(Value::Bool)
            .ok_or_else(|| EvalError::dependent("dependent type trait")),
        Node::RequiresExpression { value, .. } => value
            .map(Value::Bool)
            .ok_or_else(|| EvalError::dependent("dependent requires-expression")),
        Node::RequiresClause { expr } => eval(ctx, *expr, frame, depth),
        Node::FunctionCall {
            args, resolved, ..
        } => eval_call(ctx, *resolved, args, frame, depth),
        _ => Err(EvalError::non_constant("expression is not constant")),
    }
}

fn eval_identifier(
    ctx: &EvalContext<'_>,
    name: Symbol,
    decl: Option<NodeId>,
    frame: &Frame,
    depth: u32,
) -> EvalResult {
    if let Some(v) = frame.locals.get(&name) {
        return Ok(*v);
    }
    if let Some(decl) = decl {
        return eval_decl(ctx, decl, depth);
    }
    if ctx.template_params.contains(&name) {
        return Err(EvalError::dependent(format!(
            "'{}' depends on a template parameter",
            ctx.interner.resolve(name)
        )));
    }
    // Static members resolve unqualified inside their own struct body.
    if let Some(struct_id) = ctx.struct_context
        && let Some(info) = &ctx.types.get(struct_id).struct_info
        && let Some(member) = info.find_static(name)
        && let Some(init) = member.initializer
    {
        return eval(ctx, init, &Frame::default(), depth + 1);
    }
    Err(EvalError::non_constant(format!(
        "'{}' is not a constant",
        ctx.interner.resolve(name)
    )))
}

fn eval_decl(ctx: &EvalContext<'_>, decl: NodeId, depth: u32) -> EvalResult {
    match ctx.arena.get(decl) {
        Node::VarDecl(v) => {
            if let Some(cv) = v.const_value {
                return Ok(Value::from_const_value(cv));
            }
            let constant = v.is_constexpr || v.ty.cv.is_const;
            if !constant {
                return Err(EvalError::non_constant(format!(
                    "'{}' is not a constant",
                    ctx.interner.resolve(v.name)
                )));
            }
            match v.init {
                Some(init) => eval(ctx, init, &Frame::default(), depth + 1),
                None => Err(EvalError::non_constant("constant has no initializer")),
            }
        }
        _ => Err(EvalError::non_constant("declaration is not a constant")),
    }
}

fn eval_qualified(
    ctx: &EvalContext<'_>,
    path: &[Symbol],
    name: Symbol,
    depth: u32,
) -> EvalResult {
    // `E::A` for enums, `S::N` for static constants; the path joined with
    // `::` names a registered type.
    let joined = path
        .iter()
        .map(|s| ctx.interner.resolve(*s).to_string())
        .collect::<Vec<_>>()
        .join("::");
    let Some(type_id) = ctx.types.lookup(ctx.interner.intern(&joined)) else {
        return Err(EvalError::non_constant(format!(
            "'{joined}::{}' is not a constant",
            ctx.interner.resolve(name)
        )));
    };
    let info = ctx.types.get(type_id);
    if let Some(enum_info) = &info.enum_info {
        if let Some(v) = enum_info.value_of(name) {
            return Ok(Value::Int(v));
        }
        return Err(EvalError::non_constant("no such enumerator"));
    }
    if let Some(struct_info) = &info.struct_info
        && let Some(member) = struct_info.find_static(name)
    {
        if let Some(init) = member.initializer {
            return eval(ctx, init, &Frame::default(), depth + 1);
        }
        return Err(EvalError::non_constant("static member has no initializer"));
    }
    Err(EvalError::non_constant("qualified name is not a constant"))
}

fn eval_unary(op: UnaryOp, v: Value) -> EvalResult {
    match op {
        UnaryOp::Plus | UnaryOp::RealPart => Ok(v),
        UnaryOp::ImagPart => Ok(Value::Int(0)),
        UnaryOp::Minus => Ok(match v {
            Value::Int(x) => Value::Int(x.wrapping_neg()),
            Value::UInt(x) => Value::Int((x as i64).wrapping_neg()),
            Value::Bool(x) => Value::Int(-i64::from(x)),
            Value::Float(x) => Value::Float(-x),
        }),
        UnaryOp::Not => Ok(Value::Bool(!v.as_bool())),
        UnaryOp::BitNot => Ok(match v {
            Value::UInt(x) => Value::UInt(!x),
            other => Value::Int(!other.as_i64()),
        }),
        _ => Err(EvalError::non_constant("operator is not constant-evaluable")),
    }
}

fn eval_binary(
    ctx: &EvalContext<'_>,
    op: BinaryOp,
    lhs: NodeId,
    rhs: NodeId,
    frame: &Frame,
    depth: u32,
) -> EvalResult {
    // Short-circuit forms first.
    match op {
        BinaryOp::LogicalAnd => {
            let l = eval(ctx, lhs, frame, depth)?;
            if !l.as_bool() {
                return Ok(Value::Bool(false));
            }
            return Ok(Value::Bool(eval(ctx, rhs, frame, depth)?.as_bool()));
        }
        BinaryOp::LogicalOr => {
            let l = eval(ctx, lhs, frame, depth)?;
            if l.as_bool() {
                return Ok(Value::Bool(true));
            }
            return Ok(Value::Bool(eval(ctx, rhs, frame, depth)?.as_bool()));
        }
        BinaryOp::Comma => {
            eval(ctx, lhs, frame, depth)?;
            return eval(ctx, rhs, frame, depth);
        }
        _ => {}
    }

    if op.is_assignment() {
        return Err(EvalError::non_constant("assignment in constant expression"));
    }

    let l = eval(ctx, lhs, frame, depth)?;
    let r = eval(ctx, rhs, frame, depth)?;

    if l.is_float() || r.is_float() {
        let (a, b) = (l.as_f64(), r.as_f64());
        return Ok(match op {
            BinaryOp::Mul => Value::Float(a * b),
            BinaryOp::Div => {
                if b == 0.0 {
                    return Err(EvalError::new(EvalErrorKind::DivideByZero, "division by zero"));
                }
                Value::Float(a / b)
            }
            BinaryOp::Add => Value::Float(a + b),
            BinaryOp::Sub => Value::Float(a - b),
            BinaryOp::Lt => Value::Bool(a < b),
            BinaryOp::LtEq => Value::Bool(a <= b),
            BinaryOp::Gt => Value::Bool(a > b),
            BinaryOp::GtEq => Value::Bool(a >= b),
            BinaryOp::Eq => Value::Bool(a == b),
            BinaryOp::NotEq => Value::Bool(a != b),
            _ => {
                return Err(EvalError::non_constant(
                    "operator not defined for floating constants",
                ));
            }
        });
    }

    let (a, b) = (l.as_i64(), r.as_i64());
    Ok(match op {
        BinaryOp::Mul => Value::Int(a.wrapping_mul(b)),
        BinaryOp::Div => {
            if b == 0 {
                return Err(EvalError::new(EvalErrorKind::DivideByZero, "division by zero"));
            }
            Value::Int(a.wrapping_div(b))
        }
        BinaryOp::Rem => {
            if b == 0 {
                return Err(EvalError::new(EvalErrorKind::DivideByZero, "remainder by zero"));
            }
            Value::Int(a.wrapping_rem(b))
        }
        BinaryOp::Add => Value::Int(a.wrapping_add(b)),
        BinaryOp::Sub => Value::Int(a.wrapping_sub(b)),
        BinaryOp::Shl => {
            if !(0..64).contains(&b) {
                return Err(EvalError::new(EvalErrorKind::OutOfBounds, "shift out of range"));
            }
            Value::Int(a.wrapping_shl(b as u32))
        }
        BinaryOp::Shr => {
            if !(0..64).contains(&b) {
                return Err(EvalError::new(EvalErrorKind::OutOfBounds, "shift out of range"));
            }
            Value::Int(a.wrapping_shr(b as u32))
        }
        BinaryOp::Spaceship => Value::Int(match a.cmp(&b) {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        }),
        BinaryOp::Lt => Value::Bool(a < b),
        BinaryOp::LtEq => Value::Bool(a <= b),
        BinaryOp::Gt => Value::Bool(a > b),
        BinaryOp::GtEq => Value::Bool(a >= b),
        BinaryOp::Eq => Value::Bool(a == b),
        BinaryOp::NotEq => Value::Bool(a != b),
        BinaryOp::BitAnd => Value::Int(a & b),
        BinaryOp::BitXor => Value::Int(a ^ b),
        BinaryOp::BitOr => Value::Int(a | b),
        _ => return Err(EvalError::non_constant("operator is not constant-evaluable")),
    })
}

fn convert(v: Value, target: &TypeSpecifier) -> EvalResult {
    if target.is_pointer() {
        return Err(EvalError::non_constant("pointer cast in constant expression"));
    }
    Ok(match target.base {
        BaseKind::Bool => Value::Bool(v.as_bool()),
        BaseKind::Float | BaseKind::Double | BaseKind::LongDouble => Value::Float(v.as_f64()),
        b if b.is_integral() => {
            let raw = v.as_i64();
            let bits = target.bits.clamp(1, 64);
            let masked = if bits >= 64 {
                raw
            } else if b.is_signed() {
                let shift = 64 - bits;
                raw.wrapping_shl(shift) >> shift
            } else {
                raw & (((1u64 << bits) - 1) as i64)
            };
            if b.is_signed() {
                Value::Int(masked)
            } else {
                Value::UInt(masked as u64)
            }
        }
        _ => return Err(EvalError::non_constant("cast target is not arithmetic")),
    })
}

fn sizeof_like(
    ctx: &EvalContext<'_>,
    arg: &SizeofArg,
    frame: &Frame,
    depth: u32,
    align: bool,
) -> EvalResult {
    let ty = match arg {
        SizeofArg::Type(ty) => ty.clone(),
        SizeofArg::Expr(e) => static_type_of(ctx, *e, frame, depth)
            .ok_or_else(|| EvalError::non_constant("cannot determine operand type"))?,
    };
    if ty.is_unresolved() {
        let dependent = ty.name.is_some_and(|n| ctx.template_params.contains(&n));
        return Err(if dependent {
            EvalError::dependent("sizeof of a dependent type")
        } else {
            EvalError::new(EvalErrorKind::IncompleteType, "sizeof of an incomplete type")
        });
    }
    let resolved = ctx.types.resolve_alias(&ty);
    let bits = if align {
        resolved.align_bits(ctx.types, ctx.options).map(u64::from)
    } else {
        resolved.size_bits(ctx.types, ctx.options)
    };
    bits.map(|b| Value::UInt(b / 8))
        .ok_or_else(|| EvalError::new(EvalErrorKind::IncompleteType, "type is incomplete"))
}

fn offsetof(ctx: &EvalContext<'_>, ty: &TypeSpecifier, member: Symbol) -> EvalResult {
    let Some(id) = ty.type_id else {
        return Err(EvalError::new(EvalErrorKind::IncompleteType, "offsetof of an incomplete type"));
    };
    let Some(info) = &ctx.types.get(id).struct_info else {
        return Err(EvalError::non_constant("offsetof requires a class type"));
    };
    info.find_member(member)
        .map(|m| Value::UInt(m.offset_bits / 8))
        .ok_or_else(|| EvalError::non_constant("no such member"))
}

fn callee_noexcept(ctx: &EvalContext<'_>, expr: NodeId) -> bool {
    match ctx.arena.get(expr) {
        Node::FunctionCall {
            resolved: Some(decl),
            ..
        } => match ctx.arena.get(*decl) {
            Node::FunctionDecl(f) => f.noexcept,
            _ => true,
        },
        _ => true,
    }
}

fn eval_call(
    ctx: &EvalContext<'_>,
    resolved: Option<NodeId>,
    args: &[NodeId],
    frame: &Frame,
    depth: u32,
) -> EvalResult {
    if depth >= MAX_CALL_DEPTH {
        return Err(EvalError::non_constant("constexpr call depth exceeded"));
    }
    let Some(decl) = resolved else {
        return Err(EvalError::non_constant("call target is not resolved"));
    };
    let Node::FunctionDecl(f) = ctx.arena.get(decl) else {
        return Err(EvalError::non_constant("call target is not a function"));
    };
    if !f.flags.is_constexpr && !f.flags.is_consteval {
        return Err(EvalError::non_constant(format!(
            "'{}' is not constexpr",
            ctx.interner.resolve(f.name)
        )));
    }
    let Some(body) = f.body else {
        return Err(EvalError::non_constant("constexpr function has no body"));
    };

    let mut callee_frame = Frame::default();
    for (param, arg) in f.params.iter().zip(args) {
        let value = eval(ctx, *arg, frame, depth)?;
        if let Some(name) = param.name {
            callee_frame.locals.insert(name, value);
        }
    }
    // Defaulted trailing parameters.
    for param in f.params.iter().skip(args.len()) {
        let Some(default) = param.default else { break };
        let value = eval(ctx, default, frame, depth)?;
        if let Some(name) = param.name {
            callee_frame.locals.insert(name, value);
        }
    }

    match eval_stmts(ctx, body, &mut callee_frame, depth + 1)? {
        Some(value) => Ok(value),
        None => Err(EvalError::non_constant("constexpr function did not return")),
    }
}

/// Statement evaluation for simple constexpr bodies: blocks, returns,
/// branches, and local constant declarations. Loops and mutation are out
/// of scope; they surface as NonConstant.
fn eval_stmts(
    ctx: &EvalContext<'_>,
    stmt: NodeId,
    frame: &mut Frame,
    depth: u32,
) -> Result<Option<Value>, EvalError> {
    match ctx.arena.get(stmt) {
        Node::Block { stmts } => {
            for &s in stmts {
                if let Some(v) = eval_stmts(ctx, s, frame, depth)? {
                    return Ok(Some(v));
                }
            }
            Ok(None)
        }
        Node::Return(expr) => match expr {
            Some(e) => Ok(Some(eval(ctx, *e, frame, depth)?)),
            None => Err(EvalError::non_constant("void return in constant expression")),
        },
        Node::If {
            cond,
            then_branch,
            else_branch,
            taken,
            ..
        } => {
            let branch_taken = match taken {
                Some(t) => *t,
                None => eval(ctx, *cond, frame, depth)?.as_bool(),
            };
            if branch_taken {
                eval_stmts(ctx, *then_branch, frame, depth)
            } else if let Some(e) = else_branch {
                eval_stmts(ctx, *e, frame, depth)
            } else {
                Ok(None)
            }
        }
        Node::VarDecl(v) => {
            if let Some(init) = v.init {
                let value = eval(ctx, init, frame, depth)?;
                frame.locals.insert(v.name, value);
                Ok(None)
            } else {
                Err(EvalError::non_constant("uninitialized local in constexpr body"))
            }
        }
        Node::ExpressionWrapper(_) => Ok(None),
        _ => Err(EvalError::non_constant(
            "statement not supported in constant evaluation",
        )),
    }
}

/// Best-effort static type of an expression, for `sizeof`/`alignof` on
/// expressions. `None` means the evaluator can't type it.
fn static_type_of(
    ctx: &EvalContext<'_>,
    node: NodeId,
    frame: &Frame,
    _depth: u32,
) -> Option<TypeSpecifier> {
    match ctx.arena.get(node) {
        Node::NumericLiteral { ty, .. } => Some(ty.clone()),
        Node::BoolLiteral(_) => Some(TypeSpecifier::bool_()),
        Node::CharLiteral { .. } => Some(TypeSpecifier::builtin(BaseKind::Char, 8)),
        Node::Identifier { decl, name, .. } => {
            if frame.locals.contains_key(name) {
                return Some(TypeSpecifier::int());
            }
            decl.and_then(|d| decl_type(ctx, d))
        }
        Node::QualifiedIdentifier { path, name, decl } => {
            if let Some(d) = decl {
                return decl_type(ctx, *d);
            }
            member_type(ctx, path, *name)
        }
        Node::MemberAccess { object, member, .. } => {
            let obj_ty = static_type_of(ctx, *object, frame, _depth)?;
            let id = obj_ty.type_id?;
            let info = ctx.types.get(id).struct_info.as_ref()?;
            info.find_member(*member)
                .map(|m| m.ty.clone())
                .or_else(|| info.find_static(*member).map(|m| m.ty.clone()))
        }
        Node::ArraySubscript { array, .. } => {
            let arr = static_type_of(ctx, *array, frame, _depth)?;
            if arr.is_array() {
                Some(arr.element_type())
            } else if arr.is_pointer() {
                Some(arr.pointee())
            } else {
                None
            }
        }
        Node::UnaryOp {
            op: UnaryOp::Deref,
            operand,
        } => static_type_of(ctx, *operand, frame, _depth).map(|t| t.pointee()),
        Node::Cast { target, .. } => Some(target.clone()),
        Node::ConstructorCall { ty, .. } => Some(ty.clone()),
        Node::StringLiteral { value } => {
            let len = ctx.interner.resolve(*value).len() as u64 + 1;
            let mut ty = TypeSpecifier::builtin(BaseKind::Char, 8).with_const();
            ty.push_array_dim(Some(len), None);
            Some(ty)
        }
        _ => None,
    }
}

fn decl_type(ctx: &EvalContext<'_>, decl: NodeId) -> Option<TypeSpecifier> {
    match ctx.arena.get(decl) {
        Node::VarDecl(v) => Some(v.ty.clone()),
        Node::FunctionDecl(f) => Some(f.ret.clone()),
        _ => None,
    }
}

/// Type of `Path::name` where the path names a class: a non-static or
/// static data member (qualified member access is valid in unevaluated
/// contexts like `sizeof`).
fn member_type(ctx: &EvalContext<'_>, path: &[Symbol], name: Symbol) -> Option<TypeSpecifier> {
    let joined = path
        .iter()
        .map(|s| ctx.interner.resolve(*s).to_string())
        .collect::<Vec<_>>()
        .join("::");
    let type_id = ctx.types.lookup(ctx.interner.intern(&joined))?;
    let info = ctx.types.get(type_id).struct_info.as_ref()?;
    info.find_member(name)
        .map(|m| m.ty.clone())
        .or_else(|| info.find_static(name).map(|m| m.ty.clone()))
}
