//! Scope chain.
//!
//! Scopes are created by [`Program::bind_parents`](crate::ast::Program::bind_parents)
//! and stored in an arena; each scope knows its parent and the definitions
//! it declares directly. Name lookup walks the chain from the innermost
//! scope outwards and ends at the module scope.
//!
//! Bridging scopes (`runs on` and `port` clauses) expose the definitions of
//! a component or port type body. The type they bridge to is only known
//! after the clause reference is resolved, so they store the clause
//! reference instead of the body.

use crate::foundation::{DefId, ModuleId, RefId, ScopeId, TypeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeKind {
    /// Top-level definitions of a module
    Module(ModuleId),
    /// Members of a component type body
    Component(TypeId),
    /// Port variables of a port type body
    PortBody(TypeId),
    /// `runs on` clause of `owner`
    RunsOn { owner: DefId, clause: RefId },
    /// `port` clause of `owner`
    PortClause { owner: DefId, clause: RefId },
    /// Formal parameters of `owner`
    FormalParList(DefId),
    /// Locals of a statement block
    StatementBlock,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Definitions declared directly in this scope, in source order
    pub definitions: Vec<DefId>,
}

impl Scope {
    pub fn new(kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            kind,
            parent,
            definitions: Vec::new(),
        }
    }

    pub fn is_module(&self) -> bool {
        matches!(self.kind, ScopeKind::Module(_))
    }
}
