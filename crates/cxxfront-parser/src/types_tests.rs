use cxxfront_core::SharedInterner;

use crate::config::{CompileOptions, LongModel, ManglingStyle};
use crate::types::{
    Access, BaseKind, CvQual, StructMember, StructTypeInfo, TypeInfo, TypeRegistry, TypeSpecifier,
    compute_struct_layout,
};

fn member(interner: &SharedInterner, name: &str, ty: TypeSpecifier) -> StructMember {
    StructMember {
        name: interner.intern(name),
        ty,
        offset_bits: 0,
        bit_width: None,
        access: Access::Public,
        default_init: None,
        align_override: None,
    }
}

#[test]
fn long_width_follows_the_data_model() {
    let lp64 = CompileOptions::default();
    assert_eq!(lp64.long_bits(), 64);

    let llp64 = CompileOptions {
        target_long_model: LongModel::Llp64,
        ..CompileOptions::default()
    };
    assert_eq!(llp64.long_bits(), 32);

    let bits32 = CompileOptions {
        target_pointer_bits: 32,
        ..CompileOptions::default()
    };
    assert_eq!(bits32.long_bits(), 32);
}

#[test]
fn wchar_width_follows_the_mangling_style() {
    let itanium = CompileOptions::default();
    assert_eq!(itanium.wchar_bits(), 32);
    let msvc = CompileOptions {
        mangling_style: ManglingStyle::Msvc,
        ..CompileOptions::default()
    };
    assert_eq!(msvc.wchar_bits(), 16);
}

#[test]
fn pointer_size_ignores_the_pointee() {
    let opts = CompileOptions::default();
    let types = TypeRegistry::new();
    let ty = TypeSpecifier::builtin(BaseKind::Char, 8).add_pointer(CvQual::NONE);
    assert_eq!(ty.size_bits(&types, &opts), Some(64));
}

#[test]
fn array_size_multiplies_dimensions() {
    let opts = CompileOptions::default();
    let types = TypeRegistry::new();
    let mut ty = TypeSpecifier::int();
    ty.push_array_dim(Some(3), None);
    ty.push_array_dim(Some(4), None);
    assert_eq!(ty.size_bits(&types, &opts), Some(3 * 4 * 32));
}

#[test]
fn unsized_array_has_no_size() {
    let opts = CompileOptions::default();
    let types = TypeRegistry::new();
    let mut ty = TypeSpecifier::int();
    ty.push_array_dim(None, None);
    assert_eq!(ty.size_bits(&types, &opts), None);
}

#[test]
fn decay_strips_one_array_dimension_into_a_pointer() {
    let mut ty = TypeSpecifier::int();
    ty.push_array_dim(Some(8), None);
    let decayed = ty.decayed();
    assert!(decayed.array_dims.is_empty());
    assert_eq!(decayed.ptr.len(), 1);
}

#[test]
fn registry_ids_are_stable_and_first_name_wins() {
    let interner = SharedInterner::new();
    let mut types = TypeRegistry::new();
    let name = interner.intern("S");
    let first = types.register(TypeInfo::structure(name, StructTypeInfo::default()));
    let second = types.register(TypeInfo::structure(name, StructTypeInfo::default()));
    assert_ne!(first, second, "records append, never replace");
    assert_eq!(types.lookup(name), Some(first));
    assert_eq!(types.get(second).name, name);
}

#[test]
fn alias_resolution_carries_indirection() {
    let interner = SharedInterner::new();
    let mut types = TypeRegistry::new();
    let alias_name = interner.intern("IntAlias");
    let id = types.register(TypeInfo::alias(alias_name, TypeSpecifier::int()));

    let mut use_site = TypeSpecifier::user_defined(alias_name, Some(id));
    use_site = use_site.add_pointer(CvQual::NONE).with_const();

    let resolved = types.resolve_alias(&use_site);
    assert_eq!(resolved.base, BaseKind::Int);
    assert_eq!(resolved.ptr.len(), 1);
    assert!(resolved.cv.is_const);
}

#[test]
fn layout_orders_members_with_padding() {
    let interner = SharedInterner::new();
    let types = TypeRegistry::new();
    let opts = CompileOptions::default();
    let mut info = StructTypeInfo {
        members: vec![
            member(&interner, "c", TypeSpecifier::builtin(BaseKind::Char, 8)),
            member(&interner, "i", TypeSpecifier::int()),
        ],
        complete: true,
        ..StructTypeInfo::default()
    };
    compute_struct_layout(&mut info, &types, &opts, 8);
    assert_eq!(info.members[0].offset_bits, 0);
    assert_eq!(info.members[1].offset_bits, 32);
    assert_eq!(info.size_bits, 64);
    assert_eq!(info.align_bits, 32);
}

#[test]
fn pack_limits_member_alignment() {
    let interner = SharedInterner::new();
    let types = TypeRegistry::new();
    let opts = CompileOptions::default();
    let mut info = StructTypeInfo {
        members: vec![
            member(&interner, "c", TypeSpecifier::builtin(BaseKind::Char, 8)),
            member(&interner, "i", TypeSpecifier::int()),
        ],
        complete: true,
        ..StructTypeInfo::default()
    };
    compute_struct_layout(&mut info, &types, &opts, 1);
    assert_eq!(info.members[1].offset_bits, 8, "packed tight");
    assert_eq!(info.size_bits, 40);
}

#[test]
fn vtable_slot_precedes_members() {
    let interner = SharedInterner::new();
    let types = TypeRegistry::new();
    let opts = CompileOptions::default();
    let mut info = StructTypeInfo {
        members: vec![member(&interner, "x", TypeSpecifier::int())],
        has_vtable: true,
        complete: true,
        ..StructTypeInfo::default()
    };
    compute_struct_layout(&mut info, &types, &opts, 8);
    assert_eq!(info.members[0].offset_bits, 64);
    assert_eq!(info.size_bits, 128, "rounded to pointer alignment");
}

#[test]
fn union_layout_overlaps_members() {
    let interner = SharedInterner::new();
    let types = TypeRegistry::new();
    let opts = CompileOptions::default();
    let mut long_ty = TypeSpecifier::builtin(BaseKind::LongLong, 64);
    long_ty.push_array_dim(Some(2), None);
    let mut info = StructTypeInfo {
        members: vec![
            member(&interner, "a", TypeSpecifier::int()),
            member(&interner, "b", long_ty),
        ],
        is_union: true,
        complete: true,
        ..StructTypeInfo::default()
    };
    compute_struct_layout(&mut info, &types, &opts, 8);
    assert_eq!(info.members[0].offset_bits, 0);
    assert_eq!(info.members[1].offset_bits, 0);
    assert_eq!(info.size_bits, 128);
}

#[test]
fn shape_equality_ignores_cv_but_not_indirection() {
    let a = TypeSpecifier::int();
    let b = TypeSpecifier::int().with_const();
    assert!(a.shape_eq(&b));
    let c = TypeSpecifier::int().add_pointer(CvQual::NONE);
    assert!(!a.shape_eq(&c));
}
