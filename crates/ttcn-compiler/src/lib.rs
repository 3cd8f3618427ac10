//! TTCN-3 Compiler
//!
//! Unified entry point for the semantic checking pipeline. Loads serialized
//! programs, binds them, runs every check and hands back a [`CheckReport`]
//! per program.
//!
//! Each program file is checked on its own: arena ids are local to a file,
//! so files are never merged.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod loader;

pub use error::{LoadError, Result};
pub use loader::{discover, load_program, LoadedProgram};

use serde::Serialize;
use std::path::{Path, PathBuf};
use ttcn_ast::foundation::SourceMap;
use ttcn_ast::Program;
use ttcn_resolve::{check_program, CheckConfig, CheckOutput, CompileError, DiagnosticFormatter};

/// Result of checking one program file.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub output: CheckOutput,
    #[serde(skip)]
    sources: SourceMap,
}

impl CheckReport {
    pub fn has_errors(&self) -> bool {
        self.output.has_errors()
    }

    pub fn diagnostics(&self) -> &[CompileError] {
        &self.output.diagnostics
    }

    /// Render every diagnostic with source context where available.
    pub fn format_diagnostics(&self) -> String {
        format_diagnostics(&self.sources, &self.output.diagnostics)
    }
}

/// Render diagnostics against a source map.
pub fn format_diagnostics(sources: &SourceMap, diagnostics: &[CompileError]) -> String {
    DiagnosticFormatter::new(sources).format_all(diagnostics)
}

/// Check an already bound program.
pub fn check(path: impl Into<PathBuf>, program: &Program, config: &CheckConfig) -> CheckReport {
    check_with_sources(path, program, SourceMap::new(), config)
}

fn check_with_sources(
    path: impl Into<PathBuf>,
    program: &Program,
    sources: SourceMap,
    config: &CheckConfig,
) -> CheckReport {
    let path = path.into();
    let output = check_program(program, config);
    tracing::debug!(
        path = %path.display(),
        errors = output.error_count(),
        warnings = output.warning_count(),
        "program checked"
    );
    CheckReport {
        path,
        output,
        sources,
    }
}

/// Load and check one program file.
pub fn compile_file(path: &Path, config: &CheckConfig) -> Result<CheckReport> {
    let loaded = load_program(path)?;
    Ok(check_with_sources(
        loaded.path,
        &loaded.program,
        loaded.sources,
        config,
    ))
}

/// Load and check a program file, or every program file under a directory.
pub fn compile_path(path: &Path, config: &CheckConfig) -> Result<Vec<CheckReport>> {
    discover(path)?
        .iter()
        .map(|file| compile_file(file, config))
        .collect()
}
