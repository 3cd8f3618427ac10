//! Copy decisions for aliased `in` parameters.
//!
//! An `in` parameter is passed by reference in the generated code. If the
//! storage it reads can also be written during the call (because it is
//! passed again as `out`/`inout`, or because the callee can see it through
//! its component), the caller must pass a copy instead.
//!
//! The pass is silent: it never reports diagnostics. It runs after every
//! body has been checked, since a callee that assigns to one of its own
//! `in` parameters copies it on entry and makes the caller-side copy
//! unnecessary.

use crate::resolve::checker::{CallSite, Checker, RefState};
use crate::resolve::params::ActualPar;
use crate::resolve::subrefs::{AccessStep, IndexedContainer};
use serde::Serialize;
use std::collections::HashSet;
use ttcn_ast::ast::{DefKind, Direction, ParEval, ParKind};
use ttcn_ast::foundation::{DefId, RefId};

/// Element of a record-of or array passed by reference.
///
/// The container has to keep the element in place while the call runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ElementGuard {
    /// Position of the actual parameter
    pub parameter: usize,
    pub reference: RefId,
    /// Reference part holding the index
    pub part: usize,
}

/// Aliasing outcome of one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasingDecision {
    pub reference: RefId,
    pub callee: DefId,
    /// Per actual parameter: pass a copy of the referenced storage
    pub copies: Vec<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub element_guards: Vec<ElementGuard>,
}

impl AliasingDecision {
    pub fn needs_copy(&self, parameter: usize) -> bool {
        self.copies.get(parameter).copied().unwrap_or(false)
    }
}

impl<'p> Checker<'p> {
    /// Decide copies and element guards for every recorded call.
    pub(crate) fn analyze_aliasing(&self) -> Vec<AliasingDecision> {
        self.call_sites
            .iter()
            .filter_map(|site| self.aliasing_decision(site))
            .collect()
    }

    fn aliasing_decision(&self, site: &CallSite) -> Option<AliasingDecision> {
        let program = self.program;
        let bound = self.resolved(site.reference)?.params.as_ref()?;
        let callee = program.definition(site.callee);
        let formals = &callee.kind.formal_list()?.pars;

        // Storage passed by reference, split by value and template kind
        let mut value_refs = HashSet::new();
        let mut template_refs = HashSet::new();
        let mut element_guards = Vec::new();
        for (parameter, par) in bound.pars.iter().enumerate() {
            let Some(reference) = par.storage() else {
                continue;
            };
            let Some(resolved) = self.resolved(reference) else {
                continue;
            };
            for step in &resolved.path {
                if let AccessStep::Index {
                    container: IndexedContainer::RecordOf | IndexedContainer::Array { .. },
                    part,
                } = step
                {
                    element_guards.push(ElementGuard {
                        parameter,
                        reference,
                        part: *part,
                    });
                }
            }
            let Some(target) = resolved.target else {
                continue;
            };
            match &program.definition(target).kind {
                DefKind::Var { .. } => {
                    value_refs.insert(target);
                }
                DefKind::VarTemplate { .. } => {
                    template_refs.insert(target);
                }
                DefKind::FormalPar(formal) => match formal.kind {
                    ParKind::Value => {
                        value_refs.insert(target);
                    }
                    ParKind::Template => {
                        template_refs.insert(target);
                    }
                    ParKind::Timer | ParKind::Port => {}
                },
                _ => {}
            }
        }

        let sees_component = callee.kind.runs_on().is_some() || site.caller == Some(site.callee);
        let all_in_shadowed = matches!(callee.kind, DefKind::Altstep(_))
            && self.config.runtime.altstep_copies_in_params();
        let copies = bound
            .pars
            .iter()
            .enumerate()
            .map(|(index, par)| {
                let Some(&formal) = formals.get(index) else {
                    return false;
                };
                if self.is_shadowed(formal, all_in_shadowed) {
                    return false;
                }
                let (expr, aliases, template) = match par {
                    ActualPar::Value(expr) => (expr, &value_refs, false),
                    ActualPar::Template { template, .. } => (template, &template_refs, true),
                    _ => return false,
                };
                let Some(read) = expr
                    .as_reference()
                    .and_then(|r| self.resolved(r))
                    .and_then(|r| r.target)
                else {
                    return false;
                };
                aliases.contains(&read) || (sees_component && self.component_visible(read, template))
            })
            .collect();

        tracing::trace!(
            reference = %site.reference,
            callee = %site.callee,
            guards = element_guards.len(),
            "aliasing decided"
        );
        Some(AliasingDecision {
            reference: site.reference,
            callee: site.callee,
            copies,
            element_guards,
        })
    }

    /// The callee copies this `in` parameter on entry anyway.
    fn is_shadowed(&self, formal: DefId, all_in_shadowed: bool) -> bool {
        let DefKind::FormalPar(par) = &self.program.definition(formal).kind else {
            return false;
        };
        if par.direction != Direction::In || !matches!(par.kind, ParKind::Value | ParKind::Template) {
            return false;
        }
        self.is_used_as_lvalue(formal) || (all_in_shadowed && par.eval == ParEval::Normal)
    }

    /// Storage a callee with component visibility may write: an `out` or
    /// `inout` parameter of the caller (it may alias a component variable)
    /// or a component variable itself.
    fn component_visible(&self, storage: DefId, template: bool) -> bool {
        let program = self.program;
        match &program.definition(storage).kind {
            DefKind::FormalPar(par) => {
                let kind_matches = if template {
                    par.kind == ParKind::Template
                } else {
                    par.kind == ParKind::Value
                };
                kind_matches && matches!(par.direction, Direction::Out | Direction::Inout)
            }
            DefKind::Var { .. } if !template => program.def_component(storage).is_some(),
            DefKind::VarTemplate { .. } if template => program.def_component(storage).is_some(),
            _ => false,
        }
    }

    /// Memoized resolution, without resolving anything new.
    fn resolved(&self, reference: RefId) -> Option<&crate::resolve::reference::ResolvedRef> {
        match self.refs.get(&reference) {
            Some(RefState::Done(resolved)) => Some(resolved),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{CheckConfig, RuntimeVariant};
    use crate::resolve::pipeline::check_program;
    use ttcn_ast::ast::{
        AltstepDef, Block, Builtin, ComponentBody, Direction, Expr, FormalPar, FormalParList,
        FunctionDef, Statement, StatementKind, TypeExpr, TypeKind,
    };
    use ttcn_ast::{ModuleId, ProgramBuilder};

    const INT: TypeExpr = TypeExpr::Builtin(Builtin::Integer);

    /// `function f(in integer a, out integer b)`
    fn callee(b: &mut ProgramBuilder, m: ModuleId, runs_on: bool) {
        let a = b.formal("a", FormalPar::value(INT));
        let out = b.formal("b", FormalPar::value(INT).direction(Direction::Out));
        let mut function = FunctionDef::new(vec![a, out]);
        if runs_on {
            let clause = b.reference("C");
            function = function.runs_on(clause);
        }
        b.function(m, "f", function);
    }

    fn invoke(reference: ttcn_ast::RefId) -> Statement {
        Statement::new(StatementKind::Invoke(reference))
    }

    #[test]
    fn test_same_variable_in_and_out_needs_copy() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        callee(&mut b, m, false);
        let v = b.var("v", INT, None);
        let w = b.var("w", INT, None);
        let same_in = b.ref_expr("v");
        let same_out = b.ref_expr("v");
        let same = b.call("f", vec![same_in, same_out]);
        let other_in = b.ref_expr("v");
        let other_out = b.ref_expr("w");
        let other = b.call("f", vec![other_in, other_out]);
        b.function(
            m,
            "g",
            FunctionDef::new(Vec::new()).body(Block::new(vec![
                Statement::new(StatementKind::Definition(v)),
                Statement::new(StatementKind::Definition(w)),
                invoke(same),
                invoke(other),
            ])),
        );
        let program = b.finish();

        let output = check_program(&program, &CheckConfig::default());
        assert_eq!(output.error_count(), 0, "{:?}", output.diagnostics);
        assert_eq!(output.aliasing_for(same).unwrap().copies, vec![true, false]);
        assert_eq!(output.aliasing_for(other).unwrap().copies, vec![false, false]);
    }

    #[test]
    fn test_component_visibility_needs_copy() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let cv = b.var("cv", INT, None);
        b.type_def(
            m,
            "C",
            TypeKind::Component(ComponentBody {
                extends: Vec::new(),
                definitions: vec![cv],
            }),
        );
        callee(&mut b, m, true);
        let local = b.var("l", INT, None);
        let from_component = b.ref_expr("cv");
        let sink = b.ref_expr("l");
        let call_component = b.call("f", vec![from_component, sink]);
        let from_local = b.ref_expr("l");
        let sink = b.ref_expr("l2");
        let local2 = b.var("l2", INT, None);
        let call_local = b.call("f", vec![from_local, sink]);
        let runs_on = b.reference("C");
        b.function(
            m,
            "g",
            FunctionDef::new(Vec::new()).runs_on(runs_on).body(Block::new(vec![
                Statement::new(StatementKind::Definition(local)),
                Statement::new(StatementKind::Definition(local2)),
                invoke(call_component),
                invoke(call_local),
            ])),
        );
        let program = b.finish();

        let output = check_program(&program, &CheckConfig::default());
        assert_eq!(output.error_count(), 0, "{:?}", output.diagnostics);
        assert_eq!(output.aliasing_for(call_component).unwrap().copies, vec![true, false]);
        assert_eq!(output.aliasing_for(call_local).unwrap().copies, vec![false, false]);
    }

    #[test]
    fn test_altstep_in_parameters_shadowed_in_function_test_runtime() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let a = b.formal("a", FormalPar::value(INT));
        let out = b.formal("b", FormalPar::value(INT).direction(Direction::Out));
        b.altstep(
            m,
            "as",
            AltstepDef {
                params: FormalParList::new(vec![a, out]),
                ..AltstepDef::default()
            },
        );
        let v = b.var("v", INT, None);
        let read = b.ref_expr("v");
        let write = b.ref_expr("v");
        let call = b.call("as", vec![read, write]);
        b.function(
            m,
            "g",
            FunctionDef::new(Vec::new()).body(Block::new(vec![
                Statement::new(StatementKind::Definition(v)),
                invoke(call),
            ])),
        );
        let program = b.finish();

        let load = check_program(&program, &CheckConfig::default());
        assert_eq!(load.aliasing_for(call).unwrap().copies, vec![true, false]);
        let function_test = check_program(
            &program,
            &CheckConfig::default().with_runtime(RuntimeVariant::FunctionTest),
        );
        assert_eq!(function_test.aliasing_for(call).unwrap().copies, vec![false, false]);
    }

    #[test]
    fn test_in_parameter_used_as_lvalue_is_shadowed() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let a = b.formal("a", FormalPar::value(INT));
        let out = b.formal("b", FormalPar::value(INT).direction(Direction::Out));
        let target = b.reference("a");
        b.function(
            m,
            "f",
            FunctionDef::new(vec![a, out]).body(Block::new(vec![Statement::new(StatementKind::Assign {
                target,
                value: Expr::int(0),
            })])),
        );
        let v = b.var("v", INT, None);
        let read = b.ref_expr("v");
        let write = b.ref_expr("v");
        let call = b.call("f", vec![read, write]);
        b.function(
            m,
            "g",
            FunctionDef::new(Vec::new()).body(Block::new(vec![
                Statement::new(StatementKind::Definition(v)),
                invoke(call),
            ])),
        );
        let program = b.finish();

        let output = check_program(&program, &CheckConfig::default());
        assert_eq!(output.aliasing_for(call).unwrap().copies, vec![false, false]);
    }

    #[test]
    fn test_record_of_element_guard() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        b.type_def(m, "List", TypeKind::RecordOf(INT));
        let out = b.formal("o", FormalPar::value(INT).direction(Direction::Out));
        b.function(m, "h", FunctionDef::new(vec![out]));
        let list_ty = b.type_ref("List");
        let list = b.var("list", list_ty, None);
        let element = b.indexed("list", Expr::int(0));
        let call = b.call("h", vec![Expr::reference(element)]);
        b.function(
            m,
            "g",
            FunctionDef::new(Vec::new()).body(Block::new(vec![
                Statement::new(StatementKind::Definition(list)),
                invoke(call),
            ])),
        );
        let program = b.finish();

        let output = check_program(&program, &CheckConfig::default());
        assert_eq!(output.error_count(), 0, "{:?}", output.diagnostics);
        let decision = output.aliasing_for(call).unwrap();
        assert_eq!(decision.element_guards.len(), 1);
        assert_eq!(decision.element_guards[0].parameter, 0);
        assert_eq!(decision.element_guards[0].reference, element);
        assert_eq!(decision.element_guards[0].part, 1);
    }
}
