//! TTCN-3 abstract syntax tree.
//!
//! This crate holds the data the semantic checker works on:
//!
//! - [`foundation`]: identifiers, spans and typed arena ids
//! - [`ast`]: modules, definitions, type bodies, expressions, references,
//!   statements and the [`Program`](ast::Program) arena that owns them
//!
//! # Pipeline Position
//!
//! ```text
//! Parser → ttcn-ast → ttcn-resolve → code emission
//!          ^^^^^^^^
//!        YOU ARE HERE
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod ast;
pub mod foundation;

pub use ast::{Program, ProgramBuilder};
pub use foundation::{DefId, Identifier, ModuleId, RefId, ScopeId, Span, TypeId};
