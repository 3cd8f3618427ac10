//! Whole-program checking.
//!
//! Modules are checked one at a time, imported modules first. Within a
//! module, definitions are checked in source order; forward references are
//! fine because checking a reference checks its target on demand.
//!
//! # Example
//!
//! ```
//! use ttcn_ast::ast::{Builtin, Expr, TypeExpr};
//! use ttcn_ast::ProgramBuilder;
//! use ttcn_resolve::{CheckConfig, Checker};
//!
//! let mut b = ProgramBuilder::new();
//! let m = b.module("Main");
//! b.constant(m, "c", TypeExpr::Builtin(Builtin::Integer), Expr::int(1));
//! let program = b.finish();
//!
//! let mut checker = Checker::new(&program, CheckConfig::default());
//! checker.check_all();
//! let output = checker.finish();
//! assert_eq!(output.error_count(), 0);
//! ```

use crate::config::CheckConfig;
use crate::error::{CompileError, Severity};
use crate::resolve::aliasing::AliasingDecision;
use crate::resolve::checker::{CheckState, Checker, Context, ContextKind, RefState};
use crate::resolve::mappings::MappingTable;
use crate::resolve::ports::PortInfo;
use crate::resolve::reference::ResolvedRef;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use ttcn_ast::foundation::{ModuleId, RefId, TypeId};
use ttcn_ast::Program;

/// Everything the checker learned about a program.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckOutput {
    pub diagnostics: Vec<CompileError>,
    /// Resolved target and bound parameters of every checked reference
    pub resolutions: BTreeMap<RefId, ResolvedRef>,
    /// One entry per call of a parameterized behaviour
    pub aliasing: Vec<AliasingDecision>,
    /// Checked port types with their type sets and mapping tables
    pub ports: BTreeMap<TypeId, PortInfo>,
}

impl CheckOutput {
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_warning()).count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn resolution(&self, reference: RefId) -> Option<&ResolvedRef> {
        self.resolutions.get(&reference)
    }

    pub fn aliasing_for(&self, reference: RefId) -> Option<&AliasingDecision> {
        self.aliasing.iter().find(|d| d.reference == reference)
    }

    pub fn port(&self, port: TypeId) -> Option<&PortInfo> {
        self.ports.get(&port)
    }

    pub fn mapping_table(&self, port: TypeId) -> Option<&MappingTable> {
        self.port(port)?.mapping_table.as_ref()
    }
}

/// Check a bound program and collect the results.
pub fn check_program(program: &Program, config: &CheckConfig) -> CheckOutput {
    let mut checker = Checker::new(program, config.clone());
    checker.check_all();
    checker.finish()
}

impl<'p> Checker<'p> {
    /// Check every module of the program.
    pub fn check_all(&mut self) {
        let program = self.program;
        for module in program.module_ids() {
            self.chk_imports(module);
        }
        for module in self.module_order() {
            self.chk_module(module);
        }
    }

    /// Modules with everything they import placed before them. Modules on
    /// an import cycle keep their relative declaration order.
    fn module_order(&self) -> Vec<ModuleId> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        for module in self.program.module_ids() {
            self.visit_module(module, &mut visited, &mut order);
        }
        order
    }

    fn visit_module(&self, module: ModuleId, visited: &mut HashSet<ModuleId>, order: &mut Vec<ModuleId>) {
        if !visited.insert(module) {
            return;
        }
        if let Some(table) = self.imports.get(&module) {
            for entry in &table.entries {
                self.visit_module(entry.module, visited, order);
            }
        }
        order.push(module);
    }

    /// Check one module once.
    pub(crate) fn chk_module(&mut self, module: ModuleId) {
        if self.modules.contains_key(&module) {
            return;
        }
        self.modules.insert(module, CheckState::Checking);
        let program = self.program;
        let node = program.module(module);
        let errors_before = self.error_count();
        tracing::debug!(module = %node.name, "checking module");

        self.chk_friends(module);
        self.chk_imports(module);
        if self.imports[&module].unresolved {
            tracing::debug!(module = %node.name, "skipped: unresolved imports");
            self.modules.insert(module, CheckState::Checked);
            return;
        }

        self.chk_unique(&node.definitions);
        for &def in &node.definitions {
            self.chk_hides_module(def);
            self.chk_def(def);
        }
        if let Some(control) = &node.control {
            self.push_context(Context {
                kind: ContextKind::Control,
                ..Context::static_context()
            });
            self.chk_block(control);
            self.pop_context();
        }

        self.modules.insert(module, CheckState::Checked);
        tracing::debug!(
            module = %node.name,
            errors = self.error_count() - errors_before,
            "module checked"
        );
    }

    /// Run the aliasing pass and hand out the results.
    pub fn finish(self) -> CheckOutput {
        let aliasing = self.analyze_aliasing();
        let promote = self.config.warnings_as_errors;
        let diagnostics = self
            .diagnostics
            .into_iter()
            .map(|mut d| {
                if promote && d.severity == Severity::Warning {
                    d.severity = Severity::Error;
                }
                d
            })
            .collect();
        let resolutions = self
            .refs
            .into_iter()
            .filter_map(|(reference, state)| match state {
                RefState::Done(resolved) => Some((reference, resolved)),
                RefState::Resolving => None,
            })
            .collect();
        CheckOutput {
            diagnostics,
            resolutions,
            aliasing,
            ports: self.ports.into_iter().collect(),
        }
    }
}
