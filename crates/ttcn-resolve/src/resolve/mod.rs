//! Semantic checking passes.
//!
//! All passes share one [`Checker`], which owns the diagnostic sink and the
//! memo tables. Checks are demand driven: resolving a reference may check
//! the definition it names, checking a port type checks its providers, and
//! every result is cached so that asking twice is free and silent.
//!
//! - [`scope`] - scope-chain lookup and local uniqueness
//! - [`imports`] - import tables, visibility, import cycles
//! - [`reference`] - module-id detection and reference resolution
//! - [`subrefs`] - field and index navigation
//! - [`types`] - type identity and compatibility
//! - [`exprs`] - expression typing
//! - [`templates`] - template restrictions and the default validator
//! - [`params`] - actual-to-formal parameter binding
//! - [`aliasing`] - copy decisions for aliased `in` parameters
//! - [`ports`] - port type bodies and connection rules
//! - [`mappings`] - translation-port type mappings
//! - [`definitions`] - per-definition checks
//! - [`statements`] - behaviour statements
//! - [`pipeline`] - whole-program entry point

pub mod aliasing;
pub mod checker;
pub mod definitions;
pub mod exprs;
pub mod imports;
pub mod mappings;
pub mod params;
pub mod pipeline;
pub mod ports;
pub mod reference;
pub mod scope;
pub mod statements;
pub mod subrefs;
pub mod templates;
pub mod types;

pub use aliasing::{AliasingDecision, ElementGuard};
pub use checker::Checker;
pub use imports::{ImportEntry, ImportKind, ImportLookup, ImportTable};
pub use mappings::{MappingEntry, MappingTable, MappingTableTarget};
pub use params::{ActualPar, ActualParList, RestrictionChecks};
pub use pipeline::{check_program, CheckOutput};
pub use ports::{PortCategory, PortInfo, TestPortApi, TypeSet};
pub use reference::ResolvedRef;
pub use subrefs::{AccessStep, IndexedContainer};
pub use types::Ty;
