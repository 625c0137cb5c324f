//! Indented text dump of the AST, for tests and the CLI.

use std::fmt::Write;

use cxxfront_core::SharedInterner;

use crate::types::{BaseKind, RefKind, TypeRegistry, TypeSpecifier};

use super::{Arena, ConstValue, Linkage, Node, NodeId, SizeofArg};

pub struct AstDumper<'a> {
    pub arena: &'a Arena,
    pub types: &'a TypeRegistry,
    pub interner: &'a SharedInterner,
}

impl<'a> AstDumper<'a> {
    pub fn new(arena: &'a Arena, types: &'a TypeRegistry, interner: &'a SharedInterner) -> Self {
        Self {
            arena,
            types,
            interner,
        }
    }

    pub fn dump(&self, roots: &[NodeId]) -> String {
        let mut out = String::new();
        for &id in roots {
            self.dump_node(&mut out, id, 0);
        }
        out
    }

    pub fn dump_one(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.dump_node(&mut out, id, 0);
        out
    }

    fn name(&self, sym: cxxfront_core::Symbol) -> String {
        self.interner.resolve(sym).to_string()
    }

    pub fn type_name(&self, ty: &TypeSpecifier) -> String {
        let mut out = String::new();
        if ty.cv.is_const {
            out.push_str("const ");
        }
        if ty.cv.is_volatile {
            out.push_str("volatile ");
        }
        let base = match ty.base {
            BaseKind::Void => "void".to_string(),
            BaseKind::Bool => "bool".to_string(),
            BaseKind::Char => "char".to_string(),
            BaseKind::SignedChar => "signed char".to_string(),
            BaseKind::UnsignedChar => "unsigned char".to_string(),
            BaseKind::WChar => "wchar_t".to_string(),
            BaseKind::Char8 => "char8_t".to_string(),
            BaseKind::Char16 => "char16_t".to_string(),
            BaseKind::Char32 => "char32_t".to_string(),
            BaseKind::Short => "short".to_string(),
            BaseKind::UShort => "unsigned short".to_string(),
            BaseKind::Int => "int".to_string(),
            BaseKind::UInt => "unsigned int".to_string(),
            BaseKind::Long => "long".to_string(),
            BaseKind::ULong => "unsigned long".to_string(),
            BaseKind::LongLong => "long long".to_string(),
            BaseKind::ULongLong => "unsigned long long".to_string(),
            BaseKind::Float => "float".to_string(),
            BaseKind::Double => "double".to_string(),
            BaseKind::LongDouble => "long double".to_string(),
            BaseKind::Auto => "auto".to_string(),
            BaseKind::Nullptr => "nullptr_t".to_string(),
            BaseKind::Function | BaseKind::FunctionPointer => "function".to_string(),
            BaseKind::Struct | BaseKind::Enum | BaseKind::UserDefined => ty
                .name
                .map_or_else(|| "<unnamed>".to_string(), |n| self.name(n)),
        };
        out.push_str(&base);
        for level in &ty.ptr {
            out.push('*');
            if level.cv.is_const {
                out.push_str(" const");
            }
        }
        match ty.ref_kind {
            RefKind::None => {}
            RefKind::LValue => out.push('&'),
            RefKind::RValue => out.push_str("&&"),
        }
        for dim in &ty.array_dims {
            match dim {
                Some(n) => {
                    let _ = write!(out, "[{n}]");
                }
                None => out.push_str("[]"),
            }
        }
        if ty.pack_expansion {
            out.push_str("...");
        }
        out
    }

    fn dump_node(&self, out: &mut String, id: NodeId, depth: usize) {
        let pad = "  ".repeat(depth);
        match self.arena.get(id) {
            Node::TypeSpec(ty) => {
                let _ = writeln!(out, "{pad}TypeSpec {}", self.type_name(ty));
            }
            Node::VarDecl(v) => {
                let mut tags = String::new();
                if v.is_constexpr {
                    tags.push_str(" constexpr");
                }
                if v.is_static {
                    tags.push_str(" static");
                }
                let _ = writeln!(
                    out,
                    "{pad}VarDecl {}: {}{}",
                    self.name(v.name),
                    self.type_name(&v.ty),
                    tags
                );
                if let Some(init) = v.init {
                    self.dump_node(out, init, depth + 1);
                }
            }
            Node::FunctionDecl(f) => {
                let linkage = match f.linkage {
                    Linkage::C => " [extern \"C\"]",
                    _ => "",
                };
                let _ = writeln!(out, "{pad}FunctionDecl {}{}", self.name(f.name), linkage);
                for p in &f.params {
                    let pname = p.name.map_or_else(String::new, |n| self.name(n));
                    let _ = writeln!(
                        out,
                        "{pad}  Param {}: {}",
                        pname,
                        self.type_name(&p.ty)
                    );
                }
                if let Some(body) = f.body {
                    self.dump_node(out, body, depth + 1);
                }
            }
            Node::TemplateFunctionDecl { decl, .. } => {
                let _ = writeln!(out, "{pad}TemplateFunctionDecl");
                self.dump_node(out, *decl, depth + 1);
            }
            Node::TemplateVarDecl { decl, .. } => {
                let _ = writeln!(out, "{pad}TemplateVarDecl");
                self.dump_node(out, *decl, depth + 1);
            }
            Node::TemplateClassDecl { decl, .. } => {
                let _ = writeln!(out, "{pad}TemplateClassDecl");
                self.dump_node(out, *decl, depth + 1);
            }
            Node::TemplateAlias { name, aliased, .. } => {
                let _ = writeln!(
                    out,
                    "{pad}TemplateAlias {} = {}",
                    self.name(*name),
                    self.type_name(aliased)
                );
            }
            Node::StructDecl(s) => {
                let kw = if s.is_union {
                    "union"
                } else if s.is_class {
                    "class"
                } else {
                    "struct"
                };
                let _ = writeln!(out, "{pad}StructDecl {} [{kw}]", self.name(s.name));
                for &m in &s.members {
                    self.dump_node(out, m, depth + 1);
                }
            }
            Node::NamespaceDecl {
                name,
                is_inline,
                decls,
            } => {
                let shown = name.map_or_else(|| "<anonymous>".to_string(), |n| self.name(n));
                let tag = if *is_inline { " [inline]" } else { "" };
                let _ = writeln!(out, "{pad}NamespaceDecl {shown}{tag}");
                for &d in decls {
                    self.dump_node(out, d, depth + 1);
                }
            }
            Node::NamespaceAlias { alias, .. } => {
                let _ = writeln!(out, "{pad}NamespaceAlias {}", self.name(*alias));
            }
            Node::UsingDirective { .. } => {
                let _ = writeln!(out, "{pad}UsingDirective");
            }
            Node::UsingDeclaration { path, name, .. } => {
                let mut full = String::new();
                for p in path {
                    full.push_str(&self.name(*p));
                    full.push_str("::");
                }
                full.push_str(&self.name(*name));
                let _ = writeln!(out, "{pad}UsingDeclaration {full}");
            }
            Node::UsingEnum { .. } => {
                let _ = writeln!(out, "{pad}UsingEnum");
            }
            Node::ConceptDecl { name, body, .. } => {
                let _ = writeln!(out, "{pad}ConceptDecl {}", self.name(*name));
                self.dump_node(out, *body, depth + 1);
            }
            Node::EnumDecl(e) => {
                let _ = writeln!(out, "{pad}EnumDecl {}", self.name(e.name));
                for (name, _, value) in &e.enumerators {
                    let _ = writeln!(out, "{pad}  Enumerator {} = {value}", self.name(*name));
                }
            }
            Node::Block { stmts } => {
                let _ = writeln!(out, "{pad}Block");
                for &s in stmts {
                    self.dump_node(out, s, depth + 1);
                }
            }
            Node::If {
                cond,
                then_branch,
                else_branch,
                is_constexpr,
                ..
            } => {
                let tag = if *is_constexpr { " [constexpr]" } else { "" };
                let _ = writeln!(out, "{pad}If{tag}");
                self.dump_node(out, *cond, depth + 1);
                self.dump_node(out, *then_branch, depth + 1);
                if let Some(e) = else_branch {
                    self.dump_node(out, *e, depth + 1);
                }
            }
            Node::For {
                init,
                cond,
                step,
                body,
            } => {
                let _ = writeln!(out, "{pad}For");
                for part in [init, cond, step].into_iter().flatten() {
                    self.dump_node(out, *part, depth + 1);
                }
                self.dump_node(out, *body, depth + 1);
            }
            Node::RangedFor { decl, range, body } => {
                let _ = writeln!(out, "{pad}RangedFor");
                self.dump_node(out, *decl, depth + 1);
                self.dump_node(out, *range, depth + 1);
                self.dump_node(out, *body, depth + 1);
            }
            Node::While { cond, body } => {
                let _ = writeln!(out, "{pad}While");
                self.dump_node(out, *cond, depth + 1);
                self.dump_node(out, *body, depth + 1);
            }
            Node::DoWhile { body, cond } => {
                let _ = writeln!(out, "{pad}DoWhile");
                self.dump_node(out, *body, depth + 1);
                self.dump_node(out, *cond, depth + 1);
            }
            Node::Switch { cond, body } => {
                let _ = writeln!(out, "{pad}Switch");
                self.dump_node(out, *cond, depth + 1);
                self.dump_node(out, *body, depth + 1);
            }
            Node::Case { value } => {
                let _ = writeln!(out, "{pad}Case");
                self.dump_node(out, *value, depth + 1);
            }
            Node::DefaultCase => {
                let _ = writeln!(out, "{pad}Default");
            }
            Node::Return(expr) => {
                let _ = writeln!(out, "{pad}Return");
                if let Some(e) = expr {
                    self.dump_node(out, *e, depth + 1);
                }
            }
            Node::Break => {
                let _ = writeln!(out, "{pad}Break");
            }
            Node::Continue => {
                let _ = writeln!(out, "{pad}Continue");
            }
            Node::Goto(label) => {
                let _ = writeln!(out, "{pad}Goto {}", self.name(*label));
            }
            Node::Label { name, stmt } => {
                let _ = writeln!(out, "{pad}Label {}", self.name(*name));
                self.dump_node(out, *stmt, depth + 1);
            }
            Node::Try { body, handlers } => {
                let _ = writeln!(out, "{pad}Try");
                self.dump_node(out, *body, depth + 1);
                for (decl, block) in handlers {
                    let _ = writeln!(out, "{pad}  Catch");
                    if let Some(d) = decl {
                        self.dump_node(out, *d, depth + 2);
                    }
                    self.dump_node(out, *block, depth + 2);
                }
            }
            Node::Throw(expr) => {
                let _ = writeln!(out, "{pad}Throw");
                if let Some(e) = expr {
                    self.dump_node(out, *e, depth + 1);
                }
            }
            Node::ExpressionWrapper(e) => {
                let _ = writeln!(out, "{pad}ExprStmt");
                self.dump_node(out, *e, depth + 1);
            }
            Node::Identifier { name, .. } => {
                let _ = writeln!(out, "{pad}Identifier {}", self.name(*name));
            }
            Node::QualifiedIdentifier { path, name, .. } => {
                let mut full = String::new();
                for p in path {
                    full.push_str(&self.name(*p));
                    full.push_str("::");
                }
                full.push_str(&self.name(*name));
                let _ = writeln!(out, "{pad}QualifiedIdentifier {full}");
            }
            Node::NumericLiteral { value, .. } => match value {
                ConstValue::Int(v) => {
                    let _ = writeln!(out, "{pad}IntLit {v}");
                }
                ConstValue::UInt(v) => {
                    let _ = writeln!(out, "{pad}IntLit {v}u");
                }
                ConstValue::Bool(v) => {
                    let _ = writeln!(out, "{pad}BoolLit {v}");
                }
                ConstValue::Float(v) => {
                    let _ = writeln!(out, "{pad}FloatLit {v}");
                }
            },
            Node::BoolLiteral(v) => {
                let _ = writeln!(out, "{pad}BoolLit {v}");
            }
            Node::StringLiteral { value } => {
                let _ = writeln!(out, "{pad}StringLit \"{}\"", self.name(*value));
            }
            Node::CharLiteral { value } => {
                let _ = writeln!(out, "{pad}CharLit {value}");
            }
            Node::NullptrLiteral => {
                let _ = writeln!(out, "{pad}Nullptr");
            }
            Node::ThisExpr => {
                let _ = writeln!(out, "{pad}This");
            }
            Node::BinaryOp { op, lhs, rhs } => {
                let _ = writeln!(out, "{pad}BinaryOp {}", op.token());
                self.dump_node(out, *lhs, depth + 1);
                self.dump_node(out, *rhs, depth + 1);
            }
            Node::UnaryOp { op, operand } => {
                let _ = writeln!(out, "{pad}UnaryOp {op:?}");
                self.dump_node(out, *operand, depth + 1);
            }
            Node::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                let _ = writeln!(out, "{pad}Ternary");
                self.dump_node(out, *cond, depth + 1);
                self.dump_node(out, *then_expr, depth + 1);
                self.dump_node(out, *else_expr, depth + 1);
            }
            Node::FunctionCall {
                callee,
                args,
                resolved,
            } => {
                let target = resolved
                    .map(|r| self.callee_name(r))
                    .unwrap_or_default();
                if target.is_empty() {
                    let _ = writeln!(out, "{pad}Call");
                    self.dump_node(out, *callee, depth + 1);
                } else {
                    let _ = writeln!(out, "{pad}Call {target}");
                }
                for &a in args {
                    self.dump_node(out, a, depth + 1);
                }
            }
            Node::MemberFunctionCall {
                object,
                member,
                args,
                ..
            } => {
                let _ = writeln!(out, "{pad}MemberCall {}", self.name(*member));
                self.dump_node(out, *object, depth + 1);
                for &a in args {
                    self.dump_node(out, a, depth + 1);
                }
            }
            Node::ConstructorCall { ty, args, braced } => {
                let tag = if *braced { " {}" } else { "" };
                let _ = writeln!(out, "{pad}ConstructorCall {}{tag}", self.type_name(ty));
                for &a in args {
                    self.dump_node(out, a, depth + 1);
                }
            }
            Node::PseudoDestructorCall { object, ty, .. } => {
                let _ = writeln!(out, "{pad}PseudoDestructorCall ~{}", self.type_name(ty));
                self.dump_node(out, *object, depth + 1);
            }
            Node::MemberAccess {
                object,
                member,
                arrow,
            } => {
                let op = if *arrow { "->" } else { "." };
                let _ = writeln!(out, "{pad}MemberAccess {op}{}", self.name(*member));
                self.dump_node(out, *object, depth + 1);
            }
            Node::PointerToMemberAccess { object, member, .. } => {
                let _ = writeln!(out, "{pad}PointerToMemberAccess");
                self.dump_node(out, *object, depth + 1);
                self.dump_node(out, *member, depth + 1);
            }
            Node::ArraySubscript { array, index } => {
                let _ = writeln!(out, "{pad}Subscript");
                self.dump_node(out, *array, depth + 1);
                self.dump_node(out, *index, depth + 1);
            }
            Node::Cast { kind, target, expr } => {
                let _ = writeln!(out, "{pad}Cast {kind:?} -> {}", self.type_name(target));
                self.dump_node(out, *expr, depth + 1);
            }
            Node::SizeofExpr { arg } => {
                self.dump_sizeof_like(out, "Sizeof", arg, &pad, depth);
            }
            Node::AlignofExpr { arg } => {
                self.dump_sizeof_like(out, "Alignof", arg, &pad, depth);
            }
            Node::TypeidExpr { arg } => {
                self.dump_sizeof_like(out, "Typeid", arg, &pad, depth);
            }
            Node::NoexceptExpr(e) => {
                let _ = writeln!(out, "{pad}Noexcept");
                self.dump_node(out, *e, depth + 1);
            }
            Node::OffsetofExpr { ty, member } => {
                let _ = writeln!(
                    out,
                    "{pad}Offsetof {} {}",
                    self.type_name(ty),
                    self.name(*member)
                );
            }
            Node::SizeofPack { pack } => {
                let _ = writeln!(out, "{pad}SizeofPack {}", self.name(*pack));
            }
            Node::NewExpression {
                ty,
                placement,
                args,
                array_size,
                ..
            } => {
                let _ = writeln!(out, "{pad}New {}", self.type_name(ty));
                for &p in placement {
                    self.dump_node(out, p, depth + 1);
                }
                if let Some(n) = array_size {
                    self.dump_node(out, *n, depth + 1);
                }
                for &a in args {
                    self.dump_node(out, a, depth + 1);
                }
            }
            Node::DeleteExpression { expr, is_array, .. } => {
                let tag = if *is_array { "[]" } else { "" };
                let _ = writeln!(out, "{pad}Delete{tag}");
                self.dump_node(out, *expr, depth + 1);
            }
            Node::Lambda(l) => {
                let _ = writeln!(out, "{pad}Lambda {}", self.name(l.closure_name));
                self.dump_node(out, l.body, depth + 1);
            }
            Node::FoldExpression {
                op,
                direction,
                pack,
                init,
            } => {
                let _ = writeln!(out, "{pad}Fold {:?} {}", direction, op.token());
                self.dump_node(out, *pack, depth + 1);
                if let Some(i) = init {
                    self.dump_node(out, *i, depth + 1);
                }
            }
            Node::PackExpansion(e) => {
                let _ = writeln!(out, "{pad}PackExpansion");
                self.dump_node(out, *e, depth + 1);
            }
            Node::TemplateParameter(p) => {
                let _ = writeln!(out, "{pad}TemplateParameter {}", self.name(p.name));
            }
            Node::TemplateParameterReference { name, .. } => {
                let _ = writeln!(out, "{pad}TemplateParamRef {}", self.name(*name));
            }
            Node::RequiresClause { expr } => {
                let _ = writeln!(out, "{pad}RequiresClause");
                self.dump_node(out, *expr, depth + 1);
            }
            Node::RequiresExpression { value, .. } => {
                let shown = value.map_or_else(|| "<dependent>".to_string(), |v| v.to_string());
                let _ = writeln!(out, "{pad}RequiresExpression {shown}");
            }
            Node::TypeTraitExpr { name, value, .. } => {
                let shown = value.map_or_else(|| "<dependent>".to_string(), |v| v.to_string());
                let _ = writeln!(out, "{pad}TypeTrait {} = {shown}", self.name(*name));
            }
        }
    }

    fn dump_sizeof_like(
        &self,
        out: &mut String,
        label: &str,
        arg: &SizeofArg,
        pad: &str,
        depth: usize,
    ) {
        match arg {
            SizeofArg::Type(ty) => {
                let _ = writeln!(out, "{pad}{label} {}", self.type_name(ty));
            }
            SizeofArg::Expr(e) => {
                let _ = writeln!(out, "{pad}{label}");
                self.dump_node(out, *e, depth + 1);
            }
        }
    }

    fn callee_name(&self, decl: NodeId) -> String {
        match self.arena.get(decl) {
            Node::FunctionDecl(f) => f
                .mangled
                .map_or_else(|| self.name(f.name), |m| self.name(m)),
            _ => String::new(),
        }
    }
}
