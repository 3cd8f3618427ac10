//! Integration test harness for the TTCN-3 semantic core.
//!
//! This crate provides utilities for end-to-end testing of the checking
//! pipeline: Build → Bind → Check → Inspect.

use ttcn_ast::ast::DefKind;
use ttcn_ast::{DefId, Program, RefId};
use ttcn_compiler::CheckReport;
use ttcn_resolve::{
    ActualParList, CheckConfig, CheckOutput, PortInfo, ResolvedRef, Severity,
};

/// A checked program and everything the checker produced for it.
pub struct TestHarness {
    program: Program,
    config: CheckConfig,
    report: CheckReport,
}

impl TestHarness {
    /// Check a program built with
    /// [`ProgramBuilder`](ttcn_ast::ProgramBuilder) using the default
    /// configuration.
    pub fn check(program: Program) -> Self {
        Self::check_with(program, CheckConfig::default())
    }

    pub fn check_with(program: Program, config: CheckConfig) -> Self {
        let report = ttcn_compiler::check("test.json", &program, &config);
        Self {
            program,
            config,
            report,
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn output(&self) -> &CheckOutput {
        &self.report.output
    }

    /// Check the same program again from scratch.
    pub fn recheck(&self) -> CheckOutput {
        ttcn_compiler::check("test.json", &self.program, &self.config).output
    }

    /// Messages of all error diagnostics, in emission order.
    pub fn errors(&self) -> Vec<&str> {
        self.messages(Severity::Error)
    }

    pub fn warnings(&self) -> Vec<&str> {
        self.messages(Severity::Warning)
    }

    fn messages(&self, severity: Severity) -> Vec<&str> {
        self.output()
            .diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .map(|d| d.message.as_str())
            .collect()
    }

    /// Assert that the program has no errors.
    ///
    /// # Panics
    ///
    /// Panics with the formatted diagnostics otherwise.
    pub fn assert_no_errors(&self) {
        assert!(
            !self.report.has_errors(),
            "unexpected errors:\n{}",
            self.report.format_diagnostics()
        );
    }

    /// Assert that some error message contains `needle`.
    pub fn assert_error_contains(&self, needle: &str) {
        let errors = self.errors();
        assert!(
            errors.iter().any(|m| m.contains(needle)),
            "no error containing {needle:?} in {errors:?}"
        );
    }

    /// Resolution of a reference.
    ///
    /// # Panics
    ///
    /// Panics if the reference was never checked.
    pub fn resolution(&self, reference: RefId) -> &ResolvedRef {
        match self.output().resolution(reference) {
            Some(resolved) => resolved,
            None => panic!("{reference} was not resolved"),
        }
    }

    pub fn target(&self, reference: RefId) -> Option<DefId> {
        self.resolution(reference).target
    }

    /// Bound actual parameters of a call.
    ///
    /// # Panics
    ///
    /// Panics if the reference has no parameter list.
    pub fn bound(&self, reference: RefId) -> &ActualParList {
        match &self.resolution(reference).params {
            Some(params) => params,
            None => panic!("{reference} has no bound parameters"),
        }
    }

    /// Copy flags the aliasing analysis chose for a call.
    pub fn copies(&self, call: RefId) -> Vec<bool> {
        match self.output().aliasing_for(call) {
            Some(decision) => decision.copies.clone(),
            None => panic!("{call} has no aliasing decision"),
        }
    }

    /// Checked body of the port type defined by `def`.
    pub fn port(&self, def: DefId) -> &PortInfo {
        let DefKind::Type(ty) = self.program.definition(def).kind else {
            panic!("{def} is not a type definition");
        };
        match self.output().port(ty) {
            Some(info) => info,
            None => panic!("{def} is not a checked port type"),
        }
    }
}
