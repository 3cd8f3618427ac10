//! Arena AST for TTCN-3 modules.
//!
//! The tree is produced by an external parser (or by [`ProgramBuilder`]) and
//! then frozen: the checker never mutates it and records its findings in
//! side tables keyed by node id.

pub mod builder;
pub mod definition;
pub mod expr;
pub mod module;
pub mod port;
pub mod program;
pub mod reference;
pub mod scope;
pub mod statement;
pub mod types;

pub use builder::ProgramBuilder;
pub use definition::{
    AltstepDef, DefKind, Definition, Direction, FormalPar, FormalParList, FunctionDef, ParEval,
    ParKind, Prototype, ReturnType, TemplateDef, TemplateRestriction, TestcaseDef,
};
pub use expr::{
    BinaryOp, ComponentKeyword, Expr, ExprKind, IndexedExpr, NamedExpr, UnaryOp, VerdictValue,
};
pub use module::{FriendDecl, ImportDecl, ImportMode, Module, ModuleKind, Visibility};
pub use port::{
    MappingKind, MappingTarget, PortAttribute, PortAttributeKind, PortBody, PortMode,
    Translation, TypeMapping,
};
pub use program::Program;
pub use reference::{NamedPar, RawParList, Reference, SubRef};
pub use scope::{Scope, ScopeKind};
pub use statement::{Block, PortEndpoint, Statement, StatementKind};
pub use types::{
    ArrayDim, Builtin, ComponentBody, Encoding, Field, SignatureBody, SignatureParam, TypeDef,
    TypeExpr, TypeKind,
};
