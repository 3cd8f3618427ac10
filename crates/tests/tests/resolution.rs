//! End-to-end tests for reference resolution, imports and definition
//! checking.

use ttcn_ast::ast::{
    BinaryOp, Block, Builtin, Expr, ExprKind, FunctionDef, ImportMode, Statement, StatementKind,
    TypeExpr, TypeKind, Visibility,
};
use ttcn_ast::{DefId, ModuleId, ProgramBuilder, RefId};
use ttcn_resolve::ErrorKind;
use ttcn_tests::TestHarness;

const INT: TypeExpr = TypeExpr::Builtin(Builtin::Integer);

/// Module `Lib` with constants `B` and `x`, and module `Main` importing
/// it with a record type `R { integer B }`.
fn shadowing_setup(b: &mut ProgramBuilder) -> (ModuleId, DefId, DefId) {
    let lib = b.module("Lib");
    let lib_b = b.constant(lib, "B", INT, Expr::int(1));
    let lib_x = b.constant(lib, "x", INT, Expr::int(2));
    let main = b.module("Main");
    b.import_all(main, "Lib");
    let field = b.field("B", INT, false);
    b.type_def(main, "R", TypeKind::Record(vec![field]));
    (main, lib_b, lib_x)
}

/// `function g() { var R Lib; var integer u := <path>; }`
fn local_shadow(b: &mut ProgramBuilder, main: ModuleId, path: &str) -> (DefId, RefId) {
    let rec_ty = b.type_ref("R");
    let local = b.var("Lib", rec_ty, None);
    let reference = b.reference(path);
    let user = b.var("u", INT, Some(Expr::reference(reference)));
    let body = Block::new(vec![
        Statement::new(StatementKind::Definition(local)),
        Statement::new(StatementKind::Definition(user)),
    ]);
    b.function(main, "g", FunctionDef::new(Vec::new()).body(body));
    (local, reference)
}

#[test]
fn test_local_definition_preferred_over_module_name() {
    let mut b = ProgramBuilder::new();
    let (main, lib_b, _) = shadowing_setup(&mut b);
    let (local, reference) = local_shadow(&mut b, main, "Lib.B");
    let harness = TestHarness::check(b.finish());

    harness.assert_no_errors();
    let resolved = harness.resolution(reference);
    assert_eq!(resolved.target, Some(local));
    assert_ne!(resolved.target, Some(lib_b));
    assert_eq!(resolved.module, None);
    assert_eq!(resolved.path.len(), 1);
}

#[test]
fn test_local_definition_without_member_fails() {
    let mut b = ProgramBuilder::new();
    let (main, _, lib_x) = shadowing_setup(&mut b);
    let (_, reference) = local_shadow(&mut b, main, "Lib.x");
    let harness = TestHarness::check(b.finish());

    assert!(harness.output().has_errors());
    assert_ne!(harness.target(reference), Some(lib_x));
}

#[test]
fn test_module_qualified_reference_without_shadowing() {
    let mut b = ProgramBuilder::new();
    let (main, _, lib_x) = shadowing_setup(&mut b);
    let reference = b.reference("Lib.x");
    b.constant(main, "c", INT, Expr::reference(reference));
    let harness = TestHarness::check(b.finish());

    harness.assert_no_errors();
    assert_eq!(harness.target(reference), Some(lib_x));
    assert!(harness.resolution(reference).module.is_some());
}

#[test]
fn test_transitive_import_blocked_by_private_link() {
    let mut b = ProgramBuilder::new();
    let a = b.module("A");
    let s = b.constant(a, "S", INT, Expr::int(1));
    let mb = b.module("B");
    b.import(mb, "A", ImportMode::All, Visibility::Public);
    let c = b.module("C");
    b.import(c, "B", ImportMode::ImportOfImport, Visibility::Private);
    let through_c = b.module("D");
    b.import(through_c, "C", ImportMode::ImportOfImport, Visibility::Public);
    let blocked = b.reference("S");
    b.constant(through_c, "d", INT, Expr::reference(blocked));
    let through_b = b.module("E");
    b.import(through_b, "B", ImportMode::ImportOfImport, Visibility::Public);
    let visible = b.reference("S");
    b.constant(through_b, "e", INT, Expr::reference(visible));
    let harness = TestHarness::check(b.finish());

    assert_eq!(
        harness.errors(),
        vec!["There is no local or imported definition with name `S'"]
    );
    assert_eq!(harness.target(blocked), None);
    assert_eq!(harness.target(visible), Some(s));
}

#[test]
fn test_ambiguous_imported_name() {
    let mut b = ProgramBuilder::new();
    let m1 = b.module("M1");
    b.constant(m1, "x", INT, Expr::int(1));
    let m2 = b.module("M2");
    b.constant(m2, "x", INT, Expr::int(2));
    let main = b.module("Main");
    b.import_all(main, "M1");
    b.import_all(main, "M2");
    let reference = b.reference("x");
    b.constant(main, "c", INT, Expr::reference(reference));
    let harness = TestHarness::check(b.finish());

    assert_eq!(harness.errors().len(), 1);
    assert_eq!(harness.output().diagnostics[0].kind, ErrorKind::AmbiguousName);
    assert_eq!(harness.target(reference), None);
}

#[test]
fn test_circular_constants_reported_once() {
    let mut b = ProgramBuilder::new();
    let m = b.module("Main");
    let to_b = b.ref_expr("b");
    b.constant(m, "a", INT, to_b);
    let to_a = b.ref_expr("a");
    b.constant(m, "b", INT, to_a);
    let first_use = b.ref_expr("a");
    b.constant(m, "u1", INT, first_use);
    let own = b.ref_expr("s");
    let value = Expr::synthetic(ExprKind::Binary {
        op: BinaryOp::Add,
        lhs: Box::new(own),
        rhs: Box::new(Expr::int(1)),
    });
    b.constant(m, "s", INT, value);
    let second_use = b.ref_expr("s");
    b.constant(m, "u2", INT, second_use);
    let harness = TestHarness::check(b.finish());

    assert_eq!(
        harness.errors(),
        vec![
            "Circular reference chain: `a' -> `b' -> `a'",
            "Circular reference chain: `s' -> `s'",
        ]
    );
}

#[test]
fn test_checking_is_idempotent() {
    let mut b = ProgramBuilder::new();
    let m = b.module("Main");
    let undefined = b.ref_expr("missing");
    b.constant(m, "a", INT, undefined);
    let to_a = b.ref_expr("a");
    b.constant(m, "b", INT, to_a);
    b.constant(m, "b", INT, Expr::int(3));
    let harness = TestHarness::check(b.finish());

    let again = harness.recheck();
    assert_eq!(harness.output().diagnostics, again.diagnostics);
    assert_eq!(harness.output().resolutions, again.resolutions);
    assert_eq!(harness.errors().len(), 2);
}
