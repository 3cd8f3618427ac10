//! Programs checked from their serialized form behave like the programs
//! they were built from.

use std::fs;
use tempfile::TempDir;
use ttcn_ast::ast::{
    Block, Builtin, Direction, FormalPar, FunctionDef, Statement, StatementKind, TypeExpr,
};
use ttcn_ast::{Program, ProgramBuilder};
use ttcn_compiler::{compile_path, LoadError};
use ttcn_resolve::CheckConfig;
use ttcn_tests::TestHarness;

const INT: TypeExpr = TypeExpr::Builtin(Builtin::Integer);

fn sample_program() -> Program {
    let mut b = ProgramBuilder::new();
    let m = b.module("Main");
    let a = b.formal("a", FormalPar::value(INT));
    let out = b.formal("b", FormalPar::value(INT).direction(Direction::Out));
    b.function(m, "f", FunctionDef::new(vec![a, out]));
    let v = b.var("v", INT, None);
    let first = b.ref_expr("v");
    let second = b.ref_expr("v");
    let call = b.call("f", vec![first, second]);
    let missing = b.call("h", Vec::new());
    let body = Block::new(vec![
        Statement::new(StatementKind::Definition(v)),
        Statement::new(StatementKind::Invoke(call)),
        Statement::new(StatementKind::Invoke(missing)),
    ]);
    b.function(m, "g", FunctionDef::new(Vec::new()).body(body));
    let undefined = b.ref_expr("nowhere");
    b.constant(m, "c", INT, undefined);
    b.finish()
}

#[test]
fn test_serialized_program_checks_the_same() {
    let program = sample_program();
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("main.json"),
        serde_json::to_string(&program).unwrap(),
    )
    .unwrap();

    let in_memory = TestHarness::check(program);
    let reports = compile_path(dir.path(), &CheckConfig::default()).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].output.diagnostics, in_memory.output().diagnostics);
    assert_eq!(reports[0].output.resolutions, in_memory.output().resolutions);
    assert_eq!(reports[0].output.aliasing, in_memory.output().aliasing);
    assert_eq!(in_memory.errors().len(), 2);
}

#[test]
fn test_missing_directory_contents() {
    let dir = TempDir::new().unwrap();
    let result = compile_path(dir.path(), &CheckConfig::default());
    assert!(matches!(result, Err(LoadError::EmptyInput(_))));
}
