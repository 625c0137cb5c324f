//! Instantiation fingerprints and mangled names.
//!
//! A fingerprint is a 64-bit digest of a template argument vector: type
//! arguments contribute their base kind, registry index, pointer levels
//! with CV, reference kind, and CV; value arguments contribute the
//! underlying type and the normalized value. Two seeded CRC32 passes over
//! the same canonical byte encoding form the two halves.
//!
//! Instantiations are named `<base>$<16 hex digits>`. `extern "C"`
//! functions keep their source name; C++ functions get a compact scheme
//! selected by [`ManglingStyle`]. Members of an anonymous namespace fold
//! a translation-unit-unique component into the name (`_GLOBAL__N_<n>`
//! under Itanium, `?A0x<n>` under MSVC) so they never collide with
//! same-named entities at file scope.

use cxxfront_core::{SharedInterner, Symbol};

use crate::ast::{ConstValue, Linkage};
use crate::config::ManglingStyle;
use crate::templates::TemplateArg;
use crate::types::{BaseKind, RefKind, TypeSpecifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub u64);

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

pub fn fingerprint(args: &[TemplateArg]) -> Fingerprint {
    let mut bytes = Vec::with_capacity(args.len() * 16);
    for arg in args {
        encode_arg(arg, &mut bytes);
    }

    let mut lo = crc32fast::Hasher::new();
    lo.update(&bytes);
    let mut hi = crc32fast::Hasher::new_with_initial(0x9e37_79b9);
    hi.update(&bytes);
    Fingerprint((u64::from(hi.finalize()) << 32) | u64::from(lo.finalize()))
}

fn encode_arg(arg: &TemplateArg, out: &mut Vec<u8>) {
    match arg {
        TemplateArg::Type(ty) => {
            out.push(0x01);
            encode_type(ty, out);
        }
        TemplateArg::Value { ty, value } => {
            out.push(0x02);
            out.push(base_code(ty.base));
            match value {
                ConstValue::Int(v) => out.extend_from_slice(&v.to_le_bytes()),
                ConstValue::UInt(v) => out.extend_from_slice(&v.to_le_bytes()),
                ConstValue::Bool(v) => out.extend_from_slice(&i64::from(*v).to_le_bytes()),
                ConstValue::Float(v) => out.extend_from_slice(&v.to_bits().to_le_bytes()),
            }
        }
        TemplateArg::Template(name) => {
            out.push(0x03);
            out.extend_from_slice(&name.as_u32().to_le_bytes());
        }
    }
}

fn encode_type(ty: &TypeSpecifier, out: &mut Vec<u8>) {
    out.push(base_code(ty.base));
    let id = ty.type_id.map_or(u32::MAX, |t| t.0);
    out.extend_from_slice(&id.to_le_bytes());
    if let Some(name) = ty.name
        && ty.type_id.is_none()
    {
        // Dependent names distinguish instantiations only by spelling.
        out.extend_from_slice(&name.as_u32().to_le_bytes());
    }
    out.push(ty.ptr.len() as u8);
    for level in &ty.ptr {
        out.push(cv_bits(level.cv.is_const, level.cv.is_volatile));
    }
    out.push(match ty.ref_kind {
        RefKind::None => 0,
        RefKind::LValue => 1,
        RefKind::RValue => 2,
    });
    out.push(cv_bits(ty.cv.is_const, ty.cv.is_volatile));
    out.push(ty.array_dims.len() as u8);
    for dim in &ty.array_dims {
        out.extend_from_slice(&dim.unwrap_or(u64::MAX).to_le_bytes());
    }
    out.push(u8::from(ty.pack_expansion));
}

fn cv_bits(c: bool, v: bool) -> u8 {
    u8::from(c) | (u8::from(v) << 1)
}

fn base_code(base: BaseKind) -> u8 {
    base as u8
}

/// `<base>$<16-hex-digest>`.
pub fn instance_name(base: &str, fp: Fingerprint) -> String {
    format!("{base}${fp}")
}

/// Mangled name for a function declaration. `extern "C"` disables
/// mangling entirely. `anon_namespace` is the unique id of the enclosing
/// anonymous namespace, when there is one; it becomes an extra scope
/// component.
pub fn mangle_function(
    interner: &SharedInterner,
    name: Symbol,
    namespace_path: &[Symbol],
    params: &[TypeSpecifier],
    linkage: Linkage,
    style: ManglingStyle,
    anon_namespace: Option<u32>,
) -> String {
    let base = interner.resolve(name);
    if linkage == Linkage::C {
        return base.to_string();
    }
    match style {
        ManglingStyle::Itanium => {
            let mut out = String::from("_Z");
            if namespace_path.is_empty() && anon_namespace.is_none() {
                push_len_name(&mut out, &base);
            } else {
                out.push('N');
                for ns in namespace_path {
                    push_len_name(&mut out, &interner.resolve(*ns));
                }
                // The anonymous namespace is the innermost scope the
                // member was declared in.
                if let Some(id) = anon_namespace {
                    push_len_name(&mut out, &format!("_GLOBAL__N_{id}"));
                }
                push_len_name(&mut out, &base);
                out.push('E');
            }
            if params.is_empty() {
                out.push('v');
            } else {
                for p in params {
                    out.push_str(&itanium_type_code(interner, p));
                }
            }
            out
        }
        ManglingStyle::Msvc => {
            let mut out = String::from("?");
            out.push_str(&base);
            // MSVC scopes run innermost-first.
            if let Some(id) = anon_namespace {
                out.push_str(&format!("@?A0x{id:08x}"));
            }
            for ns in namespace_path.iter().rev() {
                out.push('@');
                out.push_str(&interner.resolve(*ns));
            }
            out.push_str("@@YA");
            if params.is_empty() {
                out.push('X');
            } else {
                for p in params {
                    out.push_str(&msvc_type_code(interner, p));
                }
                out.push('Z');
            }
            out
        }
    }
}

fn push_len_name(out: &mut String, name: &str) {
    out.push_str(&name.len().to_string());
    out.push_str(name);
}

fn itanium_type_code(interner: &SharedInterner, ty: &TypeSpecifier) -> String {
    let mut out = String::new();
    match ty.ref_kind {
        RefKind::LValue => out.push('R'),
        RefKind::RValue => out.push('O'),
        RefKind::None => {}
    }
    for level in ty.ptr.iter().rev() {
        out.push('P');
        if level.cv.is_const {
            out.push('K');
        }
    }
    if ty.cv.is_const && !ty.ptr.is_empty() {
        out.push('K');
    }
    out.push_str(&match ty.base {
        BaseKind::Void => "v".into(),
        BaseKind::Bool => "b".into(),
        BaseKind::Char => "c".into(),
        BaseKind::SignedChar => "a".into(),
        BaseKind::UnsignedChar => "h".into(),
        BaseKind::WChar => "w".into(),
        BaseKind::Char8 => "Du".into(),
        BaseKind::Char16 => "Ds".into(),
        BaseKind::Char32 => "Di".into(),
        BaseKind::Short => "s".into(),
        BaseKind::UShort => "t".into(),
        BaseKind::Int => "i".into(),
        BaseKind::UInt => "j".into(),
        BaseKind::Long => "l".into(),
        BaseKind::ULong => "m".into(),
        BaseKind::LongLong => "x".into(),
        BaseKind::ULongLong => "y".into(),
        BaseKind::Float => "f".into(),
        BaseKind::Double => "d".into(),
        BaseKind::LongDouble => "e".into(),
        BaseKind::Nullptr => "Dn".into(),
        _ => {
            let mut s = String::new();
            if let Some(name) = ty.name {
                push_len_name(&mut s, &interner.resolve(name));
            } else {
                s.push('i');
            }
            s
        }
    });
    out
}

fn msvc_type_code(interner: &SharedInterner, ty: &TypeSpecifier) -> String {
    let mut out = String::new();
    for _ in &ty.ptr {
        out.push_str("PA");
    }
    if ty.ref_kind != RefKind::None {
        out.push_str("AA");
    }
    out.push_str(&match ty.base {
        BaseKind::Void => "X".into(),
        BaseKind::Bool => "_N".into(),
        BaseKind::Char => "D".into(),
        BaseKind::SignedChar => "C".into(),
        BaseKind::UnsignedChar => "E".into(),
        BaseKind::WChar => "_W".into(),
        BaseKind::Short => "F".into(),
        BaseKind::UShort => "G".into(),
        BaseKind::Int => "H".into(),
        BaseKind::UInt => "I".into(),
        BaseKind::Long => "J".into(),
        BaseKind::ULong => "K".into(),
        BaseKind::LongLong => "_J".into(),
        BaseKind::ULongLong => "_K".into(),
        BaseKind::Float => "M".into(),
        BaseKind::Double => "N".into(),
        BaseKind::LongDouble => "O".into(),
        _ => {
            let mut s = String::from("V");
            if let Some(name) = ty.name {
                s.push_str(&interner.resolve(name));
            }
            s.push_str("@@");
            s
        }
    });
    out
}
