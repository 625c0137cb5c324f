use cxxfront_core::SharedInterner;

use crate::ast::{ConstValue, Linkage};
use crate::config::ManglingStyle;
use crate::mangle::{fingerprint, instance_name, mangle_function};
use crate::templates::TemplateArg;
use crate::types::{BaseKind, CvQual, TypeSpecifier};

fn int_arg() -> TemplateArg {
    TemplateArg::Type(TypeSpecifier::int())
}

#[test]
fn fingerprint_is_deterministic() {
    let a = fingerprint(&[int_arg()]);
    let b = fingerprint(&[int_arg()]);
    assert_eq!(a, b);
}

#[test]
fn fingerprint_distinguishes_base_kinds() {
    let int_fp = fingerprint(&[int_arg()]);
    let double_fp = fingerprint(&[TemplateArg::Type(TypeSpecifier::builtin(
        BaseKind::Double,
        64,
    ))]);
    assert_ne!(int_fp, double_fp);
}

#[test]
fn fingerprint_distinguishes_pointer_levels_and_cv() {
    let plain = fingerprint(&[int_arg()]);
    let pointer = fingerprint(&[TemplateArg::Type(
        TypeSpecifier::int().add_pointer(CvQual::NONE),
    )]);
    let const_int = fingerprint(&[TemplateArg::Type(TypeSpecifier::int().with_const())]);
    assert_ne!(plain, pointer);
    assert_ne!(plain, const_int);
    assert_ne!(pointer, const_int);
}

#[test]
fn fingerprint_covers_value_arguments() {
    let five = fingerprint(&[TemplateArg::Value {
        ty: TypeSpecifier::int(),
        value: ConstValue::Int(5),
    }]);
    let six = fingerprint(&[TemplateArg::Value {
        ty: TypeSpecifier::int(),
        value: ConstValue::Int(6),
    }]);
    assert_ne!(five, six);
}

#[test]
fn instance_name_is_base_dollar_sixteen_hex() {
    let fp = fingerprint(&[int_arg()]);
    let name = instance_name("Box", fp);
    assert!(name.starts_with("Box$"));
    let digest = &name["Box$".len()..];
    assert_eq!(digest.len(), 16);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn extern_c_names_are_unmangled() {
    let interner = SharedInterner::new();
    let name = interner.intern("add");
    let mangled = mangle_function(
        &interner,
        name,
        &[],
        &[TypeSpecifier::int(), TypeSpecifier::int()],
        Linkage::C,
        ManglingStyle::Itanium,
        None,
    );
    assert_eq!(mangled, "add");
}

#[test]
fn itanium_free_function() {
    let interner = SharedInterner::new();
    let name = interner.intern("add");
    let mangled = mangle_function(
        &interner,
        name,
        &[],
        &[TypeSpecifier::int(), TypeSpecifier::int()],
        Linkage::Cpp,
        ManglingStyle::Itanium,
        None,
    );
    assert_eq!(mangled, "_Z3addii");
}

#[test]
fn itanium_empty_parameter_list_is_void() {
    let interner = SharedInterner::new();
    let name = interner.intern("f");
    let mangled = mangle_function(
        &interner,
        name,
        &[],
        &[],
        Linkage::Cpp,
        ManglingStyle::Itanium,
        None,
    );
    assert_eq!(mangled, "_Z1fv");
}

#[test]
fn itanium_namespaced_function() {
    let interner = SharedInterner::new();
    let name = interner.intern("go");
    let ns = interner.intern("app");
    let mangled = mangle_function(
        &interner,
        name,
        &[ns],
        &[TypeSpecifier::bool_()],
        Linkage::Cpp,
        ManglingStyle::Itanium,
        None,
    );
    assert_eq!(mangled, "_ZN3app2goEb");
}

#[test]
fn msvc_style_has_question_mark_prefix() {
    let interner = SharedInterner::new();
    let name = interner.intern("add");
    let mangled = mangle_function(
        &interner,
        name,
        &[],
        &[TypeSpecifier::int()],
        Linkage::Cpp,
        ManglingStyle::Msvc,
        None,
    );
    assert!(mangled.starts_with("?add@@YA"));
    assert!(mangled.ends_with('Z'));
}

#[test]
fn anonymous_namespace_members_get_a_unique_component() {
    let interner = SharedInterner::new();
    let name = interner.intern("secret");

    let file_scope = mangle_function(
        &interner,
        name,
        &[],
        &[],
        Linkage::Cpp,
        ManglingStyle::Itanium,
        None,
    );
    let anon = mangle_function(
        &interner,
        name,
        &[],
        &[],
        Linkage::Cpp,
        ManglingStyle::Itanium,
        Some(1),
    );
    assert_ne!(file_scope, anon);
    assert_eq!(anon, "_ZN12_GLOBAL__N_16secretEv");

    let msvc = mangle_function(
        &interner,
        name,
        &[],
        &[],
        Linkage::Cpp,
        ManglingStyle::Msvc,
        Some(1),
    );
    assert!(msvc.contains("?A0x"));
}

#[test]
fn anonymous_namespace_nested_in_a_named_one() {
    let interner = SharedInterner::new();
    let name = interner.intern("helper");
    let ns = interner.intern("detail");
    let mangled = mangle_function(
        &interner,
        name,
        &[ns],
        &[],
        Linkage::Cpp,
        ManglingStyle::Itanium,
        Some(2),
    );
    // The anonymous component sits inside the named namespace.
    assert_eq!(mangled, "_ZN6detail12_GLOBAL__N_26helperEv");
}
