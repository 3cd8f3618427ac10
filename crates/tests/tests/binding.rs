//! End-to-end tests for parameter binding, restriction checks and the
//! aliasing decisions derived from bound calls.

use ttcn_ast::ast::{
    Block, Builtin, DefKind, Direction, Expr, FormalPar, FunctionDef, Statement, StatementKind,
    TemplateRestriction, TypeExpr,
};
use ttcn_ast::{ProgramBuilder, RefId};
use ttcn_resolve::{ActualPar, CheckConfig, RestrictionChecks, RuntimeVariant};
use ttcn_tests::TestHarness;

const INT: TypeExpr = TypeExpr::Builtin(Builtin::Integer);

/// `function f(integer a, integer b, integer c := 3)` invoked once per
/// positional argument list from the body of `g`.
fn arity_program(calls: &[&[i64]]) -> (ttcn_ast::Program, Vec<RefId>) {
    let mut b = ProgramBuilder::new();
    let m = b.module("Main");
    let a = b.formal("a", FormalPar::value(INT));
    let p = b.formal("b", FormalPar::value(INT));
    let c = b.formal("c", FormalPar::value(INT).with_default(Expr::int(3)));
    b.function(m, "f", FunctionDef::new(vec![a, p, c]));
    let mut refs = Vec::new();
    let mut statements = Vec::new();
    for args in calls {
        let call = b.call("f", args.iter().map(|v| Expr::int(*v)).collect());
        refs.push(call);
        statements.push(Statement::new(StatementKind::Invoke(call)));
    }
    b.function(m, "g", FunctionDef::new(Vec::new()).body(Block::new(statements)));
    (b.finish(), refs)
}

#[test]
fn test_arity_within_bounds() {
    let (program, calls) = arity_program(&[&[1, 2], &[1, 2, 3]]);
    let harness = TestHarness::check(program);

    harness.assert_no_errors();
    let short = harness.bound(calls[0]);
    assert_eq!(short.len(), 3);
    assert!(matches!(short.pars[2], ActualPar::Default { .. }));
    assert!(!harness.bound(calls[1]).erroneous);
}

#[test]
fn test_arity_outside_bounds() {
    let (program, calls) = arity_program(&[&[1], &[1, 2, 3, 4]]);
    let harness = TestHarness::check(program);

    assert_eq!(
        harness.errors(),
        vec![
            "Too few parameters: at least 2 was expected instead of 1",
            "Too many parameters: at most 3 was expected instead of 4",
        ]
    );
    assert!(harness.bound(calls[0]).erroneous);
    assert!(harness.bound(calls[1]).erroneous);
}

#[test]
fn test_named_parameter_after_gap() {
    let mut b = ProgramBuilder::new();
    let m = b.module("Main");
    let a = b.formal("a", FormalPar::value(INT));
    let p = b.formal("b", FormalPar::value(INT).with_default(Expr::int(2)));
    let c = b.formal("c", FormalPar::value(INT).with_default(Expr::int(3)));
    let d = b.formal("d", FormalPar::value(INT));
    b.function(m, "f", FunctionDef::new(vec![a, p, c, d]));
    let call = b.call_named("f", vec![Expr::int(1)], vec![("d", Expr::int(4))]);
    let body = Block::new(vec![Statement::new(StatementKind::Invoke(call))]);
    b.function(m, "g", FunctionDef::new(Vec::new()).body(body));
    let harness = TestHarness::check(b.finish());

    harness.assert_no_errors();
    let bound = harness.bound(call);
    assert_eq!(bound.len(), 4);
    assert!(matches!(bound.pars[1], ActualPar::Default { formal } if formal == p));
    assert!(matches!(bound.pars[2], ActualPar::Default { formal } if formal == c));
    assert!(matches!(bound.pars[3], ActualPar::Value(_)));
}

/// Checks generated for `f(v)` where `f` takes an `inout` template
/// restricted to `formal` and `v` is a template variable restricted to
/// `storage`.
fn inout_template_checks(
    formal: TemplateRestriction,
    storage: TemplateRestriction,
) -> RestrictionChecks {
    let mut b = ProgramBuilder::new();
    let m = b.module("Main");
    let p = b.formal(
        "p",
        FormalPar::template(INT)
            .direction(Direction::Inout)
            .restriction(formal),
    );
    b.function(m, "f", FunctionDef::new(vec![p]));
    let local = b.def(
        "v",
        DefKind::VarTemplate {
            ty: INT,
            restriction: storage,
            init: None,
        },
    );
    let arg = b.ref_expr("v");
    let call = b.call("f", vec![arg]);
    let body = Block::new(vec![
        Statement::new(StatementKind::Definition(local)),
        Statement::new(StatementKind::Invoke(call)),
    ]);
    b.function(m, "g", FunctionDef::new(Vec::new()).body(body));
    let harness = TestHarness::check(b.finish());

    let bound = harness.bound(call);
    assert!(!bound.erroneous, "{:?}", harness.errors());
    bound.pars[0].checks()
}

#[test]
fn test_restriction_check_placement() {
    use TemplateRestriction as R;

    let tighter_formal = inout_template_checks(R::Value, R::Present);
    assert_eq!(
        tighter_formal,
        RestrictionChecks {
            pre_call: true,
            post_call: false
        }
    );
    let tighter_storage = inout_template_checks(R::Present, R::Value);
    assert_eq!(
        tighter_storage,
        RestrictionChecks {
            pre_call: false,
            post_call: true
        }
    );
    assert!(!inout_template_checks(R::Omit, R::Omit).any());
}

/// `function f(in integer a, out integer b)` with a caller declaring
/// locals `v` and `w`.
fn aliasing_program(in_arg: &str, out_arg: &str, config: CheckConfig) -> (TestHarness, RefId) {
    let mut b = ProgramBuilder::new();
    let m = b.module("Main");
    let a = b.formal("a", FormalPar::value(INT));
    let out = b.formal("b", FormalPar::value(INT).direction(Direction::Out));
    b.function(m, "f", FunctionDef::new(vec![a, out]));
    let v = b.var("v", INT, None);
    let w = b.var("w", INT, None);
    let first = b.ref_expr(in_arg);
    let second = b.ref_expr(out_arg);
    let call = b.call("f", vec![first, second]);
    let body = Block::new(vec![
        Statement::new(StatementKind::Definition(v)),
        Statement::new(StatementKind::Definition(w)),
        Statement::new(StatementKind::Invoke(call)),
    ]);
    b.function(m, "g", FunctionDef::new(Vec::new()).body(body));
    (TestHarness::check_with(b.finish(), config), call)
}

#[test]
fn test_same_variable_in_and_out_is_copied() {
    let (harness, call) = aliasing_program("v", "v", CheckConfig::default());
    harness.assert_no_errors();
    assert_eq!(harness.copies(call), vec![true, false]);
}

#[test]
fn test_different_variables_are_not_copied() {
    let (harness, call) = aliasing_program("v", "w", CheckConfig::default());
    harness.assert_no_errors();
    assert_eq!(harness.copies(call), vec![false, false]);
}

#[test]
fn test_aliasing_does_not_depend_on_runtime_for_functions() {
    let config = CheckConfig::default().with_runtime(RuntimeVariant::FunctionTest);
    let (harness, call) = aliasing_program("v", "v", config);
    assert_eq!(harness.copies(call), vec![true, false]);
}
