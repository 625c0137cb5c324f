//! AST nodes and the arena that owns them.
//!
//! Every node lives in one growable arena; edges are [`NodeId`] indices,
//! never references. A node, once placed, is not moved or freed, so an id
//! stays valid for the life of the parse. Template substitution produces
//! new nodes in the same arena.

mod dump;

pub use dump::AstDumper;

use cxxfront_core::Symbol;

use crate::symbols::NamespaceId;
use crate::types::{
    Access, CallingConv, CvQual, RefKind, TypeId, TypeSpecifier,
};

/// Index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Spaceship,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eq,
    NotEq,
    BitAnd,
    BitXor,
    BitOr,
    LogicalAnd,
    LogicalOr,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,
    Comma,
}

impl BinaryOp {
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            Self::Assign
                | Self::AddAssign
                | Self::SubAssign
                | Self::MulAssign
                | Self::DivAssign
                | Self::RemAssign
                | Self::AndAssign
                | Self::OrAssign
                | Self::XorAssign
                | Self::ShlAssign
                | Self::ShrAssign
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Lt | Self::LtEq | Self::Gt | Self::GtEq | Self::Eq | Self::NotEq
        )
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Spaceship => "<=>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::BitAnd => "&",
            Self::BitXor => "^",
            Self::BitOr => "|",
            Self::LogicalAnd => "&&",
            Self::LogicalOr => "||",
            Self::Assign => "=",
            Self::AddAssign => "+=",
            Self::SubAssign => "-=",
            Self::MulAssign => "*=",
            Self::DivAssign => "/=",
            Self::RemAssign => "%=",
            Self::AndAssign => "&=",
            Self::OrAssign => "|=",
            Self::XorAssign => "^=",
            Self::ShlAssign => "<<=",
            Self::ShrAssign => ">>=",
            Self::Comma => ",",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    BitNot,
    Plus,
    Minus,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
    Deref,
    AddrOf,
    /// `__real__` / `__imag__`; identity while complex arithmetic is
    /// unsupported.
    RealPart,
    ImagPart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastKind {
    Static,
    Dynamic,
    Const,
    Reinterpret,
    CStyle,
    /// `T(expr)` functional notation.
    Functional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FoldDirection {
    UnaryLeft,
    UnaryRight,
    BinaryLeft,
    BinaryRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Linkage {
    #[default]
    None,
    C,
    Cpp,
    DllImport,
    DllExport,
}

/// A small constant value attached to declarations whose initializer
/// evaluated at parse time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue {
    Int(i64),
    UInt(u64),
    Bool(bool),
    Float(f64),
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Option<Symbol>,
    pub ty: TypeSpecifier,
    pub default: Option<NodeId>,
    /// VarDecl node materialized when the parameter enters a function scope.
    pub decl: Option<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct FnFlags {
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_pure: bool,
    pub is_override: bool,
    pub is_final: bool,
    pub is_constexpr: bool,
    pub is_consteval: bool,
    pub is_inline: bool,
    pub is_defaulted: bool,
    pub is_deleted: bool,
    pub is_constructor: bool,
    pub is_destructor: bool,
    pub is_conversion: bool,
    pub is_variadic: bool,
    pub is_operator: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: Symbol,
    pub mangled: Option<Symbol>,
    pub ret: TypeSpecifier,
    pub params: Vec<Param>,
    pub body: Option<NodeId>,
    pub linkage: Linkage,
    pub flags: FnFlags,
    pub member_of: Option<TypeId>,
    pub cv: CvQual,
    pub ref_qual: RefKind,
    pub noexcept: bool,
    pub conv: CallingConv,
    pub requires_clause: Option<NodeId>,
    pub access: Access,
    /// Constructor initializer list: (member or base name, argument expr).
    pub ctor_inits: Vec<(Symbol, NodeId)>,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: Symbol,
    pub ty: TypeSpecifier,
    pub init: Option<NodeId>,
    pub linkage: Linkage,
    pub is_static: bool,
    pub is_constexpr: bool,
    pub is_extern: bool,
    pub is_thread_local: bool,
    /// Evaluated initializer for constants usable in constant expressions.
    pub const_value: Option<ConstValue>,
}

#[derive(Debug, Clone)]
pub struct StructDecl {
    pub name: Symbol,
    pub type_id: TypeId,
    pub is_union: bool,
    /// `class` vs `struct` head (default member access).
    pub is_class: bool,
    /// Member declaration nodes in source order.
    pub members: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: Symbol,
    pub type_id: TypeId,
    pub is_scoped: bool,
    pub underlying: TypeSpecifier,
    /// (name, initializer expr, resolved value).
    pub enumerators: Vec<(Symbol, Option<NodeId>, i64)>,
}

#[derive(Debug, Clone)]
pub enum TemplateParamKind {
    Type { default: Option<TypeSpecifier> },
    NonType { ty: TypeSpecifier, default: Option<NodeId> },
    Template { default: Option<Symbol> },
}

#[derive(Debug, Clone)]
pub struct TemplateParam {
    pub name: Symbol,
    pub kind: TemplateParamKind,
    pub is_pack: bool,
    /// Constraining concept for `Concept T` shorthand parameters.
    pub constraint: Option<Symbol>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureDefault {
    None,
    ByValue,
    ByRef,
}

#[derive(Debug, Clone)]
pub enum CaptureKind {
    ByValue,
    ByRef,
    This,
    StarThis,
    Init { by_ref: bool, init: NodeId },
}

#[derive(Debug, Clone)]
pub struct LambdaCapture {
    pub name: Option<Symbol>,
    pub kind: CaptureKind,
}

#[derive(Debug, Clone)]
pub struct Lambda {
    /// `__lambda_<n>`, unique per translation unit.
    pub closure_name: Symbol,
    pub closure_type: TypeId,
    pub capture_default: CaptureDefault,
    pub captures: Vec<LambdaCapture>,
    pub template_params: Vec<TemplateParam>,
    pub params: Vec<Param>,
    pub ret: TypeSpecifier,
    pub body: NodeId,
    pub is_mutable: bool,
    pub is_constexpr: bool,
    pub is_consteval: bool,
    pub noexcept: bool,
    pub requires_clause: Option<NodeId>,
    /// Has `auto` parameters or explicit template parameters; `operator()`
    /// is a member template.
    pub is_generic: bool,
}

#[derive(Debug, Clone)]
pub enum Requirement {
    Simple(NodeId),
    Type(TypeSpecifier),
    Compound {
        expr: NodeId,
        noexcept: bool,
        constraint: Option<NodeId>,
    },
    Nested(NodeId),
}

#[derive(Debug, Clone)]
pub enum SizeofArg {
    Type(TypeSpecifier),
    Expr(NodeId),
}

/// The tagged sum of every node kind. Variant names are semantic.
#[derive(Debug, Clone)]
pub enum Node {
    // Declarations
    TypeSpec(TypeSpecifier),
    VarDecl(VarDecl),
    FunctionDecl(FunctionDecl),
    TemplateFunctionDecl {
        params: Vec<TemplateParam>,
        decl: NodeId,
        requires_clause: Option<NodeId>,
    },
    TemplateVarDecl {
        params: Vec<TemplateParam>,
        decl: NodeId,
    },
    TemplateClassDecl {
        params: Vec<TemplateParam>,
        decl: NodeId,
        requires_clause: Option<NodeId>,
    },
    TemplateAlias {
        params: Vec<TemplateParam>,
        name: Symbol,
        aliased: TypeSpecifier,
    },
    StructDecl(StructDecl),
    NamespaceDecl {
        name: Option<Symbol>,
        is_inline: bool,
        decls: Vec<NodeId>,
    },
    NamespaceAlias {
        alias: Symbol,
        target: NamespaceId,
    },
    UsingDirective {
        target: NamespaceId,
    },
    UsingDeclaration {
        path: Vec<Symbol>,
        name: Symbol,
        targets: Vec<NodeId>,
    },
    UsingEnum {
        enum_type: TypeId,
    },
    ConceptDecl {
        name: Symbol,
        params: Vec<TemplateParam>,
        body: NodeId,
    },
    EnumDecl(EnumDecl),

    // Statements
    Block {
        stmts: Vec<NodeId>,
    },
    If {
        cond: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
        is_constexpr: bool,
        /// For `if constexpr` with a non-dependent condition: the branch
        /// the evaluator selected.
        taken: Option<bool>,
    },
    For {
        init: Option<NodeId>,
        cond: Option<NodeId>,
        step: Option<NodeId>,
        body: NodeId,
    },
    RangedFor {
        decl: NodeId,
        range: NodeId,
        body: NodeId,
    },
    While {
        cond: NodeId,
        body: NodeId,
    },
    DoWhile {
        body: NodeId,
        cond: NodeId,
    },
    Switch {
        cond: NodeId,
        body: NodeId,
    },
    Case {
        value: NodeId,
    },
    DefaultCase,
    Return(Option<NodeId>),
    Break,
    Continue,
    Goto(Symbol),
    Label {
        name: Symbol,
        stmt: NodeId,
    },
    Try {
        body: NodeId,
        /// (exception declaration, handler block); `None` decl = `catch (...)`.
        handlers: Vec<(Option<NodeId>, NodeId)>,
    },
    Throw(Option<NodeId>),
    ExpressionWrapper(NodeId),

    // Expressions
    Identifier {
        name: Symbol,
        decl: Option<NodeId>,
    },
    QualifiedIdentifier {
        path: Vec<Symbol>,
        name: Symbol,
        decl: Option<NodeId>,
    },
    NumericLiteral {
        value: ConstValue,
        ty: TypeSpecifier,
    },
    BoolLiteral(bool),
    StringLiteral {
        /// Interned with adjacent literals already concatenated, quotes
        /// stripped, escapes left as written.
        value: Symbol,
    },
    CharLiteral {
        value: i64,
    },
    NullptrLiteral,
    ThisExpr,
    BinaryOp {
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    UnaryOp {
        op: UnaryOp,
        operand: NodeId,
    },
    Ternary {
        cond: NodeId,
        then_expr: NodeId,
        else_expr: NodeId,
    },
    FunctionCall {
        callee: NodeId,
        args: Vec<NodeId>,
        /// Arena index of the resolved FunctionDecl.
        resolved: Option<NodeId>,
    },
    MemberFunctionCall {
        object: NodeId,
        member: Symbol,
        args: Vec<NodeId>,
        arrow: bool,
        template_args: Vec<NodeId>,
        resolved: Option<NodeId>,
    },
    ConstructorCall {
        ty: TypeSpecifier,
        args: Vec<NodeId>,
        /// Brace-init `T{...}` rather than `T(...)`.
        braced: bool,
    },
    PseudoDestructorCall {
        object: NodeId,
        ty: TypeSpecifier,
        arrow: bool,
    },
    MemberAccess {
        object: NodeId,
        member: Symbol,
        arrow: bool,
    },
    PointerToMemberAccess {
        object: NodeId,
        member: NodeId,
        arrow: bool,
    },
    ArraySubscript {
        array: NodeId,
        index: NodeId,
    },
    Cast {
        kind: CastKind,
        target: TypeSpecifier,
        expr: NodeId,
    },
    SizeofExpr {
        arg: SizeofArg,
    },
    AlignofExpr {
        arg: SizeofArg,
    },
    TypeidExpr {
        arg: SizeofArg,
    },
    NoexceptExpr(NodeId),
    OffsetofExpr {
        ty: TypeSpecifier,
        member: Symbol,
    },
    SizeofPack {
        pack: Symbol,
    },
    NewExpression {
        ty: TypeSpecifier,
        placement: Vec<NodeId>,
        args: Vec<NodeId>,
        array_size: Option<NodeId>,
        is_global: bool,
    },
    DeleteExpression {
        expr: NodeId,
        is_array: bool,
        is_global: bool,
    },
    Lambda(Lambda),
    FoldExpression {
        op: BinaryOp,
        direction: FoldDirection,
        pack: NodeId,
        init: Option<NodeId>,
    },
    PackExpansion(NodeId),
    TemplateParameter(TemplateParam),
    TemplateParameterReference {
        name: Symbol,
        index: u32,
    },
    RequiresClause {
        expr: NodeId,
    },
    RequiresExpression {
        params: Vec<Param>,
        requirements: Vec<Requirement>,
        /// Filled when evaluated in a non-dependent context.
        value: Option<bool>,
    },
    TypeTraitExpr {
        name: Symbol,
        type_args: Vec<TypeSpecifier>,
        value: Option<bool>,
    },
}

/// Owns all nodes. Append-only; indices are stable.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }
}
