//! Type representations and the append-only type registry.
//!
//! A [`TypeSpecifier`] is the value-type description of a C++ type as the
//! grammar produces it: base kind, CV, pointer levels (each with its own
//! CV), reference kind, array dimensions, optional function signature.
//! Named types (structs, enums, aliases, template instantiations) live in
//! the [`TypeRegistry`]; a specifier points at them through `type_id`.
//!
//! The registry is append-only: a `TypeId`, once handed out, stays valid
//! and keeps meaning the same record for the life of the translation unit.

use cxxfront_core::Symbol;
use indexmap::IndexMap;

use crate::ast::NodeId;
use crate::config::CompileOptions;

/// Index into the type registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CvQual {
    pub is_const: bool,
    pub is_volatile: bool,
}

impl CvQual {
    pub const NONE: CvQual = CvQual {
        is_const: false,
        is_volatile: false,
    };

    pub fn const_only() -> Self {
        Self {
            is_const: true,
            is_volatile: false,
        }
    }

    pub fn merge(self, other: CvQual) -> Self {
        Self {
            is_const: self.is_const || other.is_const,
            is_volatile: self.is_volatile || other.is_volatile,
        }
    }

    pub fn is_none(self) -> bool {
        !self.is_const && !self.is_volatile
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RefKind {
    #[default]
    None,
    LValue,
    RValue,
}

/// One level of pointer indirection with its own CV (`int *const *`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PtrLevel {
    pub cv: CvQual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallingConv {
    #[default]
    Cdecl,
    Stdcall,
    Thiscall,
    Fastcall,
    Vectorcall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseKind {
    Void,
    Bool,
    Char,
    SignedChar,
    UnsignedChar,
    WChar,
    Char8,
    Char16,
    Char32,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
    LongDouble,
    Struct,
    Enum,
    Function,
    FunctionPointer,
    Auto,
    UserDefined,
    Nullptr,
}

impl BaseKind {
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            Self::Bool
                | Self::Char
                | Self::SignedChar
                | Self::UnsignedChar
                | Self::WChar
                | Self::Char8
                | Self::Char16
                | Self::Char32
                | Self::Short
                | Self::UShort
                | Self::Int
                | Self::UInt
                | Self::Long
                | Self::ULong
                | Self::LongLong
                | Self::ULongLong
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, Self::Float | Self::Double | Self::LongDouble)
    }

    pub fn is_arithmetic(self) -> bool {
        self.is_integral() || self.is_floating()
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Self::Char
                | Self::SignedChar
                | Self::Short
                | Self::Int
                | Self::Long
                | Self::LongLong
        )
    }

    /// Integer conversion rank, for promotion ordering.
    pub fn rank(self) -> u8 {
        match self {
            Self::Bool => 1,
            Self::Char | Self::SignedChar | Self::UnsignedChar | Self::Char8 => 2,
            Self::Short | Self::UShort | Self::Char16 | Self::WChar => 3,
            Self::Int | Self::UInt | Self::Char32 => 4,
            Self::Long | Self::ULong => 5,
            Self::LongLong | Self::ULongLong => 6,
            _ => 0,
        }
    }

    /// Size in bits on the configured target; `None` for kinds whose size
    /// comes from the registry (struct, enum) or doesn't exist (void, auto).
    pub fn fixed_bits(self, opts: &CompileOptions) -> Option<u32> {
        match self {
            Self::Bool | Self::Char | Self::SignedChar | Self::UnsignedChar | Self::Char8 => {
                Some(8)
            }
            Self::Short | Self::UShort | Self::Char16 => Some(16),
            Self::Int | Self::UInt | Self::Char32 | Self::Float => Some(32),
            Self::Long | Self::ULong => Some(opts.long_bits()),
            Self::LongLong | Self::ULongLong | Self::Double | Self::LongDouble => Some(64),
            Self::WChar => Some(opts.wchar_bits()),
            Self::Nullptr => Some(opts.pointer_bits()),
            _ => None,
        }
    }
}

/// Function signature attached to function and function-pointer types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FnSig {
    pub params: Vec<TypeSpecifier>,
    pub ret: Box<TypeSpecifier>,
    pub variadic: bool,
    /// Trailing cv-qualifiers of a member function.
    pub cv: CvQual,
    pub ref_qual: RefKind,
    pub noexcept: bool,
    pub conv: CallingConv,
}

impl FnSig {
    pub fn new(params: Vec<TypeSpecifier>, ret: TypeSpecifier) -> Self {
        Self {
            params,
            ret: Box::new(ret),
            variadic: false,
            cv: CvQual::NONE,
            ref_qual: RefKind::None,
            noexcept: false,
            conv: CallingConv::Cdecl,
        }
    }
}

/// The grammar-level description of a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeSpecifier {
    pub base: BaseKind,
    /// Interned name for UserDefined / Struct / Enum / dependent types.
    pub name: Option<Symbol>,
    pub type_id: Option<TypeId>,
    /// Size in bits of the base type, when known at parse time.
    pub bits: u32,
    pub cv: CvQual,
    /// Outermost-last pointer levels.
    pub ptr: Vec<PtrLevel>,
    pub ref_kind: RefKind,
    /// `None` dimension = unsized (`[]`) or not yet resolved.
    pub array_dims: Vec<Option<u64>>,
    /// Parallel to `array_dims`: the bound expression for dimensions that
    /// were dependent at parse time, re-evaluated at substitution.
    pub array_dim_exprs: Vec<Option<NodeId>>,
    pub signature: Option<Box<FnSig>>,
    /// Class of a pointer-to-member.
    pub member_of: Option<TypeId>,
    pub pack_expansion: bool,
    /// Arguments of a dependent template-id (`Vec<T>` inside a template
    /// definition), kept for re-instantiation at substitution time.
    /// Dependent non-type arguments ride along as named specifiers.
    pub template_args: Vec<TypeSpecifier>,
}

impl TypeSpecifier {
    pub fn builtin(base: BaseKind, bits: u32) -> Self {
        Self {
            base,
            name: None,
            type_id: None,
            bits,
            cv: CvQual::NONE,
            ptr: Vec::new(),
            ref_kind: RefKind::None,
            array_dims: Vec::new(),
            array_dim_exprs: Vec::new(),
            signature: None,
            member_of: None,
            pack_expansion: false,
            template_args: Vec::new(),
        }
    }

    pub fn void() -> Self {
        Self::builtin(BaseKind::Void, 0)
    }

    pub fn bool_() -> Self {
        Self::builtin(BaseKind::Bool, 8)
    }

    pub fn int() -> Self {
        Self::builtin(BaseKind::Int, 32)
    }

    pub fn auto() -> Self {
        Self::builtin(BaseKind::Auto, 0)
    }

    pub fn nullptr(opts: &CompileOptions) -> Self {
        Self::builtin(BaseKind::Nullptr, opts.pointer_bits())
    }

    pub fn user_defined(name: Symbol, type_id: Option<TypeId>) -> Self {
        Self {
            name: Some(name),
            type_id,
            ..Self::builtin(BaseKind::UserDefined, 0)
        }
    }

    pub fn structure(name: Symbol, type_id: TypeId, bits: u32) -> Self {
        Self {
            name: Some(name),
            type_id: Some(type_id),
            ..Self::builtin(BaseKind::Struct, bits)
        }
    }

    pub fn function(sig: FnSig) -> Self {
        Self {
            signature: Some(Box::new(sig)),
            ..Self::builtin(BaseKind::Function, 0)
        }
    }

    pub fn with_const(mut self) -> Self {
        self.cv.is_const = true;
        self
    }

    pub fn with_cv(mut self, cv: CvQual) -> Self {
        self.cv = self.cv.merge(cv);
        self
    }

    pub fn add_pointer(mut self, cv: CvQual) -> Self {
        self.ptr.push(PtrLevel { cv });
        self
    }

    pub fn with_ref(mut self, kind: RefKind) -> Self {
        self.ref_kind = kind;
        self
    }

    pub fn is_void(&self) -> bool {
        self.base == BaseKind::Void && self.ptr.is_empty() && self.array_dims.is_empty()
    }

    pub fn is_pointer(&self) -> bool {
        !self.ptr.is_empty() || self.base == BaseKind::FunctionPointer
    }

    pub fn is_reference(&self) -> bool {
        self.ref_kind != RefKind::None
    }

    pub fn is_array(&self) -> bool {
        !self.array_dims.is_empty()
    }

    pub fn is_integral(&self) -> bool {
        self.base.is_integral() && self.ptr.is_empty() && self.array_dims.is_empty()
    }

    pub fn is_floating(&self) -> bool {
        self.base.is_floating() && self.ptr.is_empty() && self.array_dims.is_empty()
    }

    pub fn is_arithmetic(&self) -> bool {
        self.is_integral() || self.is_floating()
    }

    pub fn is_bool(&self) -> bool {
        self.base == BaseKind::Bool && self.ptr.is_empty() && self.array_dims.is_empty()
    }

    pub fn is_auto(&self) -> bool {
        self.base == BaseKind::Auto
    }

    /// A name the registry couldn't resolve yet; either a template
    /// parameter or a dependent qualified name.
    pub fn is_unresolved(&self) -> bool {
        self.base == BaseKind::UserDefined && self.type_id.is_none()
    }

    /// Same base type and indirection/reference shape. This is the
    /// compatibility test for `auto` return-type deduction.
    pub fn shape_eq(&self, other: &TypeSpecifier) -> bool {
        self.base == other.base
            && self.name == other.name
            && self.type_id == other.type_id
            && self.ptr.len() == other.ptr.len()
            && self.ref_kind == other.ref_kind
            && self.array_dims == other.array_dims
    }

    /// Array-to-pointer and function-to-pointer decay, plus reference and
    /// top-level CV stripping; the adjustment applied to arguments before
    /// overload matching and deduction.
    pub fn decayed(&self) -> TypeSpecifier {
        let mut out = self.clone();
        out.ref_kind = RefKind::None;
        if !out.array_dims.is_empty() {
            out.array_dims.remove(0);
            if !out.array_dim_exprs.is_empty() {
                out.array_dim_exprs.remove(0);
            }
            out.ptr.push(PtrLevel::default());
        } else if out.base == BaseKind::Function {
            out.base = BaseKind::FunctionPointer;
        }
        if out.ptr.is_empty() {
            out.cv = CvQual::NONE;
        }
        out
    }

    /// Strip one array dimension (`T[N]` -> `T`).
    pub fn element_type(&self) -> TypeSpecifier {
        let mut out = self.clone();
        if !out.array_dims.is_empty() {
            out.array_dims.remove(0);
            if !out.array_dim_exprs.is_empty() {
                out.array_dim_exprs.remove(0);
            }
        }
        out
    }

    /// Append one array dimension, keeping the bound-expression vector in
    /// step.
    pub fn push_array_dim(&mut self, dim: Option<u64>, expr: Option<NodeId>) {
        self.array_dims.push(dim);
        self.array_dim_exprs.push(expr);
    }

    /// Strip one pointer level or the reference, for dereference typing.
    pub fn pointee(&self) -> TypeSpecifier {
        let mut out = self.clone();
        if !out.ptr.is_empty() {
            out.ptr.pop();
        } else {
            out.ref_kind = RefKind::None;
        }
        out
    }

    /// Total size in bits, following arrays and indirection. `None` when
    /// the type is incomplete or dependent.
    pub fn size_bits(&self, types: &TypeRegistry, opts: &CompileOptions) -> Option<u64> {
        if self.is_reference() || self.is_pointer() && self.array_dims.is_empty() {
            // References are sized as the referent only in sizeof(T&);
            // pointers are always pointer-sized.
            if !self.ptr.is_empty() || self.base == BaseKind::FunctionPointer {
                return Some(u64::from(opts.pointer_bits()));
            }
        }
        let elem = self.base_size_bits(types, opts)?;
        let mut total = elem;
        for dim in &self.array_dims {
            total = total.checked_mul((*dim)?)?;
        }
        Some(total)
    }

    fn base_size_bits(&self, types: &TypeRegistry, opts: &CompileOptions) -> Option<u64> {
        if !self.ptr.is_empty() {
            return Some(u64::from(opts.pointer_bits()));
        }
        if let Some(bits) = self.base.fixed_bits(opts) {
            return Some(u64::from(bits));
        }
        let id = self.type_id?;
        let info = types.get(id);
        if let Some(alias) = &info.alias_of {
            return alias.size_bits(types, opts);
        }
        if info.size_bits == 0 && info.struct_info.as_ref().is_some_and(|s| !s.complete) {
            return None;
        }
        Some(info.size_bits)
    }

    /// Alignment in bits. `None` when unknown.
    pub fn align_bits(&self, types: &TypeRegistry, opts: &CompileOptions) -> Option<u32> {
        if !self.ptr.is_empty() {
            return Some(opts.pointer_bits());
        }
        if let Some(bits) = self.base.fixed_bits(opts) {
            return Some(bits.max(8));
        }
        let id = self.type_id?;
        let info = types.get(id);
        if let Some(alias) = &info.alias_of {
            return alias.align_bits(types, opts);
        }
        Some(info.align_bits.max(8))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructMember {
    pub name: Symbol,
    pub ty: TypeSpecifier,
    pub offset_bits: u64,
    pub bit_width: Option<u32>,
    pub access: Access,
    pub default_init: Option<NodeId>,
    pub align_override: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticMember {
    pub name: Symbol,
    pub ty: TypeSpecifier,
    pub initializer: Option<NodeId>,
    pub access: Access,
    pub is_constexpr: bool,
    /// VarDecl node representing this member in the arena.
    pub decl: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseClass {
    pub name: Symbol,
    pub type_id: Option<TypeId>,
    pub access: Access,
    pub is_virtual: bool,
    /// Base names a template parameter or dependent alias; resolved at
    /// instantiation.
    pub deferred: bool,
}

/// A `static_assert` whose condition could not be evaluated in the class
/// body; re-checked when the enclosing template is instantiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferredAssert {
    pub condition: NodeId,
    pub message: Option<Symbol>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StructTypeInfo {
    pub members: Vec<StructMember>,
    pub static_members: Vec<StaticMember>,
    /// FunctionDecl nodes, declaration order.
    pub member_functions: Vec<NodeId>,
    pub bases: Vec<BaseClass>,
    pub size_bits: u64,
    pub align_bits: u32,
    pub has_vtable: bool,
    pub is_final: bool,
    pub is_union: bool,
    /// Primary template name when this record is an instantiation.
    pub template_of: Option<Symbol>,
    pub deferred_asserts: Vec<DeferredAssert>,
    /// All member declarations registered; bodies may still be deferred.
    pub complete: bool,
}

impl StructTypeInfo {
    pub fn find_member(&self, name: Symbol) -> Option<&StructMember> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn find_static(&self, name: Symbol) -> Option<&StaticMember> {
        self.static_members.iter().find(|m| m.name == name)
    }

    /// No non-static data members and no vtable: eligible for empty-base
    /// layout.
    pub fn is_empty_for_layout(&self) -> bool {
        self.members.is_empty() && !self.has_vtable
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumTypeInfo {
    pub underlying_bits: u32,
    pub is_scoped: bool,
    pub enumerators: Vec<(Symbol, i64)>,
}

impl EnumTypeInfo {
    pub fn value_of(&self, name: Symbol) -> Option<i64> {
        self.enumerators
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    pub name: Symbol,
    pub base: BaseKind,
    pub size_bits: u64,
    pub align_bits: u32,
    pub struct_info: Option<StructTypeInfo>,
    pub enum_info: Option<EnumTypeInfo>,
    /// Set for `using X = T` and alias-template instantiations.
    pub alias_of: Option<TypeSpecifier>,
}

impl TypeInfo {
    pub fn structure(name: Symbol, info: StructTypeInfo) -> Self {
        Self {
            name,
            base: BaseKind::Struct,
            size_bits: info.size_bits,
            align_bits: info.align_bits,
            struct_info: Some(info),
            enum_info: None,
            alias_of: None,
        }
    }

    pub fn enumeration(name: Symbol, info: EnumTypeInfo) -> Self {
        Self {
            name,
            base: BaseKind::Enum,
            size_bits: u64::from(info.underlying_bits),
            align_bits: info.underlying_bits,
            struct_info: None,
            enum_info: Some(info),
            alias_of: None,
        }
    }

    pub fn alias(name: Symbol, target: TypeSpecifier) -> Self {
        Self {
            name,
            base: BaseKind::UserDefined,
            size_bits: 0,
            align_bits: 0,
            struct_info: None,
            enum_info: None,
            alias_of: Some(target),
        }
    }
}

/// Append-only registry of named types.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    infos: Vec<TypeInfo>,
    by_name: IndexMap<Symbol, TypeId>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record and maps its name unless the name is taken; the
    /// first registration of a name wins, later ones remain reachable by id
    /// only (redefinition checking happens in the parser).
    pub fn register(&mut self, info: TypeInfo) -> TypeId {
        let id = TypeId(self.infos.len() as u32);
        let name = info.name;
        self.infos.push(info);
        self.by_name.entry(name).or_insert(id);
        id
    }

    /// Maps an extra name (namespace-qualified form, using-declaration
    /// import) to an existing record.
    pub fn register_name(&mut self, name: Symbol, id: TypeId) {
        self.by_name.entry(name).or_insert(id);
    }

    pub fn lookup(&self, name: Symbol) -> Option<TypeId> {
        self.by_name.get(&name).copied()
    }

    pub fn get(&self, id: TypeId) -> &TypeInfo {
        &self.infos[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut TypeInfo {
        &mut self.infos[id.0 as usize]
    }

    /// Follow alias records to the underlying specifier.
    pub fn resolve_alias(&self, spec: &TypeSpecifier) -> TypeSpecifier {
        let mut current = spec.clone();
        let mut fuel = 64;
        while fuel > 0 {
            fuel -= 1;
            let Some(id) = current.type_id else { break };
            let info = self.get(id);
            let Some(target) = &info.alias_of else { break };
            // Carry indirection and CV accumulated on the alias use.
            let mut next = target.clone();
            next.cv = next.cv.merge(current.cv);
            next.ptr.extend(current.ptr.iter().copied());
            if current.ref_kind != RefKind::None {
                next.ref_kind = current.ref_kind;
            }
            while next.array_dim_exprs.len() < next.array_dims.len() {
                next.array_dim_exprs.push(None);
            }
            next.array_dims.extend(current.array_dims.iter().copied());
            next.array_dim_exprs
                .extend(current.array_dim_exprs.iter().copied());
            current = next;
        }
        current
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeInfo)> {
        self.infos
            .iter()
            .enumerate()
            .map(|(i, info)| (TypeId(i as u32), info))
    }
}

/// Computes member offsets, total size, and alignment for a completed
/// class, honoring `#pragma pack`, empty-base layout, and the vtable slot.
pub fn compute_struct_layout(
    info: &mut StructTypeInfo,
    types: &TypeRegistry,
    opts: &CompileOptions,
    pack_bytes: u32,
) {
    let pack_bits = pack_bytes * 8;
    let ptr_bits = u64::from(opts.pointer_bits());
    let mut offset: u64 = 0;
    let mut align: u32 = 8;

    if info.has_vtable {
        offset = ptr_bits;
        align = align.max(opts.pointer_bits().min(pack_bits));
    }

    for base in &info.bases {
        let Some(id) = base.type_id else { continue };
        let base_info = types.get(id);
        let Some(base_struct) = &base_info.struct_info else {
            continue;
        };
        if base_struct.is_empty_for_layout() {
            // Empty base occupies no storage.
            continue;
        }
        let base_align = base_info.align_bits.max(8).min(pack_bits);
        offset = round_up(offset, u64::from(base_align));
        offset += base_info.size_bits;
        align = align.max(base_align);
    }

    let mut bit_cursor: u64 = 0;
    let mut bit_unit_end: u64 = 0;

    for member in &mut info.members {
        let natural_align = member
            .ty
            .align_bits(types, opts)
            .unwrap_or(8)
            .max(8)
            .min(pack_bits);
        let member_align = member.align_override.map_or(natural_align, |a| {
            // alignas can only increase alignment.
            a.max(natural_align)
        });
        let size = member.ty.size_bits(types, opts).unwrap_or(0);

        if let Some(width) = member.bit_width {
            let unit = member.ty.bits.max(8) as u64;
            if bit_cursor + u64::from(width) > bit_unit_end || bit_unit_end == 0 {
                offset = round_up(offset, u64::from(member_align));
                bit_cursor = offset;
                bit_unit_end = offset + unit;
                offset += unit;
            }
            member.offset_bits = bit_cursor;
            bit_cursor += u64::from(width);
            align = align.max(member_align);
            continue;
        }
        bit_unit_end = 0;

        if info.is_union {
            member.offset_bits = 0;
            offset = offset.max(size);
        } else {
            offset = round_up(offset, u64::from(member_align));
            member.offset_bits = offset;
            offset += size;
        }
        align = align.max(member_align);
    }

    info.align_bits = align;
    info.size_bits = round_up(offset.max(if info.members.is_empty() && !info.has_vtable {
        // An empty class still has size one.
        8
    } else {
        0
    }), u64::from(align)).max(8);
}

fn round_up(value: u64, align: u64) -> u64 {
    if align == 0 {
        return value;
    }
    value.div_ceil(align) * align
}
