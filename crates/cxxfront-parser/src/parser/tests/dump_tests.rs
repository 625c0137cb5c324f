//! AST dump snapshots.

use indoc::indoc;

use crate::ast::AstDumper;

use super::parse_ok;

#[test]
fn dump_of_extern_c_and_resolved_call() {
    let tu = parse_ok(indoc! {r#"
        extern "C" int add(int a, int b);
        int main() { return add(10, 20); }
    "#});
    let dumper = AstDumper::new(&tu.arena, &tu.types, &tu.interner);
    insta::assert_snapshot!(dumper.dump(&tu.roots), @r#"
    FunctionDecl add [extern "C"]
      Param a: int
      Param b: int
    FunctionDecl main
      Block
        Return
          Call add
            IntLit 10
            IntLit 20
    "#);
}

#[test]
fn dump_of_namespace_with_variable() {
    let tu = parse_ok("namespace util { int level; }\n");
    let dumper = AstDumper::new(&tu.arena, &tu.types, &tu.interner);
    insta::assert_snapshot!(dumper.dump(&tu.roots), @r"
    NamespaceDecl util
      VarDecl level: int
    ");
}

#[test]
fn dump_of_control_flow() {
    let tu = parse_ok(indoc! {r#"
        int main() {
            int n = 3;
            while (n) {
                n = n - 1;
            }
            return n;
        }
    "#});
    let dumper = AstDumper::new(&tu.arena, &tu.types, &tu.interner);
    insta::assert_snapshot!(dumper.dump(&tu.roots), @r"
    FunctionDecl main
      Block
        VarDecl n: int
          IntLit 3
        While
          Identifier n
          Block
            ExprStmt
              BinaryOp =
                Identifier n
                BinaryOp -
                  Identifier n
                  IntLit 1
        Return
          Identifier n
    ");
}
