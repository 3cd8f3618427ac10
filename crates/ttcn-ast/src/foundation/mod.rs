//! Foundation types shared by the AST and the checker.

pub mod identifier;
pub mod ids;
pub mod span;

pub use identifier::{Identifier, IdentifierOrigin};
pub use ids::{DefId, ModuleId, RefId, ScopeId, TypeId};
pub use span::{SourceFile, SourceMap, Span};
