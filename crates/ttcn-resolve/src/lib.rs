// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! TTCN-3 semantic core.
//!
//! Takes a bound [`Program`](ttcn_ast::Program) and checks it: every
//! reference is resolved to its definition, every actual parameter list is
//! bound to the formal list of its callee, port types are validated against
//! their providers and type mappings, and aliasing between parameters is
//! decided for code emission.
//!
//! # Pipeline Position
//!
//! ```text
//! Parser → ttcn-ast → ttcn-resolve → code emission
//!                     ^^^^^^^^^^^^
//!                     YOU ARE HERE
//! ```
//!
//! # Example
//!
//! ```
//! use ttcn_ast::ast::{Builtin, Expr, TypeExpr};
//! use ttcn_ast::ProgramBuilder;
//! use ttcn_resolve::{check_program, CheckConfig};
//!
//! let mut b = ProgramBuilder::new();
//! let m = b.module("Main");
//! let value = b.ref_expr("d");
//! b.constant(m, "c", TypeExpr::Builtin(Builtin::Integer), value);
//! let program = b.finish();
//!
//! let output = check_program(&program, &CheckConfig::default());
//! assert_eq!(output.error_count(), 1);
//! ```

pub mod config;
pub mod error;
pub mod resolve;

pub use config::{CheckConfig, RuntimeVariant};
pub use error::{CompileError, DiagnosticFormatter, ErrorKind, Severity};
pub use resolve::*;
