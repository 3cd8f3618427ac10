//! Shared checker state.
//!
//! A [`Checker`] borrows a bound [`Program`] and owns everything the passes
//! learn about it: the diagnostic sink, the per-node memo tables and the
//! stack of behaviour contexts. The tree itself is never mutated.
//!
//! Every memo follows the same protocol: a node is marked as in progress
//! before its check starts and as done when it finishes. Meeting an
//! in-progress node again is either a user error (a circular constant) or,
//! for nodes the parser can never nest into themselves, a broken invariant.

use crate::config::CheckConfig;
use crate::error::CompileError;
use crate::resolve::imports::ImportTable;
use crate::resolve::params::ActualPar;
use crate::resolve::ports::PortInfo;
use crate::resolve::reference::ResolvedRef;
use crate::resolve::types::Ty;
use std::collections::{HashMap, HashSet};
use ttcn_ast::foundation::{DefId, ModuleId, RefId, TypeId};
use ttcn_ast::Program;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CheckState {
    Checking,
    Checked,
}

#[derive(Debug, Clone)]
pub(crate) enum RefState {
    Resolving,
    Done(ResolvedRef),
}

/// Kind of body whose statements are being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContextKind {
    Function,
    Altstep,
    Testcase,
    Control,
    /// Module-level data definitions, formal defaults, type bodies
    Static,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Context {
    pub owner: Option<DefId>,
    pub kind: ContextKind,
    pub runs_on: Option<TypeId>,
    pub system: Option<TypeId>,
}

impl Context {
    pub(crate) fn static_context() -> Self {
        Self {
            owner: None,
            kind: ContextKind::Static,
            runs_on: None,
            system: None,
        }
    }
}

/// Call of a parameterized behaviour, kept for the aliasing pass.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CallSite {
    pub reference: RefId,
    pub callee: DefId,
    /// Behaviour whose body contains the call
    pub caller: Option<DefId>,
}

/// Semantic checker over one bound program.
pub struct Checker<'p> {
    pub(crate) program: &'p Program,
    pub(crate) config: CheckConfig,
    pub(crate) diagnostics: Vec<CompileError>,

    pub(crate) modules: HashMap<ModuleId, CheckState>,
    pub(crate) imports: HashMap<ModuleId, ImportTable>,
    pub(crate) import_stack: Vec<ModuleId>,

    pub(crate) refs: HashMap<RefId, RefState>,
    pub(crate) type_refs: HashMap<RefId, Ty>,

    pub(crate) defs: HashMap<DefId, CheckState>,
    pub(crate) def_stack: Vec<DefId>,
    pub(crate) circular_reported: HashSet<DefId>,
    pub(crate) formal_lists: HashSet<DefId>,
    pub(crate) defaults: HashMap<DefId, ActualPar>,
    pub(crate) lvalue_pars: HashSet<DefId>,

    pub(crate) refd_last_memo: HashMap<TypeId, Ty>,
    pub(crate) alias_cycles_reported: HashSet<TypeId>,
    pub(crate) type_bodies: HashSet<TypeId>,

    pub(crate) ports: HashMap<TypeId, PortInfo>,
    pub(crate) ports_in_progress: HashSet<TypeId>,

    pub(crate) call_sites: Vec<CallSite>,
    pub(crate) contexts: Vec<Context>,
}

impl<'p> Checker<'p> {
    /// Create a checker for a program.
    ///
    /// # Panics
    /// Panics if [`Program::bind_parents`] has not run.
    pub fn new(program: &'p Program, config: CheckConfig) -> Self {
        assert!(program.is_bound(), "program must be bound before checking");
        Self {
            program,
            config,
            diagnostics: Vec::new(),
            modules: HashMap::new(),
            imports: HashMap::new(),
            import_stack: Vec::new(),
            refs: HashMap::new(),
            type_refs: HashMap::new(),
            defs: HashMap::new(),
            def_stack: Vec::new(),
            circular_reported: HashSet::new(),
            formal_lists: HashSet::new(),
            defaults: HashMap::new(),
            lvalue_pars: HashSet::new(),
            refd_last_memo: HashMap::new(),
            alias_cycles_reported: HashSet::new(),
            type_bodies: HashSet::new(),
            ports: HashMap::new(),
            ports_in_progress: HashSet::new(),
            call_sites: Vec::new(),
            contexts: Vec::new(),
        }
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Diagnostics reported so far, in emission order.
    pub fn diagnostics(&self) -> &[CompileError] {
        &self.diagnostics
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub(crate) fn emit(&mut self, diagnostic: CompileError) {
        tracing::trace!(kind = diagnostic.kind.name(), message = %diagnostic.message, "diagnostic");
        self.diagnostics.push(diagnostic);
    }

    /// Whether a formal `in` parameter is assigned to or passed by reference
    /// somewhere in its owner's body.
    pub fn is_used_as_lvalue(&self, par: DefId) -> bool {
        self.lvalue_pars.contains(&par)
    }

    // === Behaviour contexts ===

    pub(crate) fn push_context(&mut self, context: Context) {
        self.contexts.push(context);
    }

    pub(crate) fn pop_context(&mut self) {
        self.contexts.pop();
    }

    /// Innermost context; module-level checks run in the static context.
    pub(crate) fn context(&self) -> Context {
        self.contexts
            .last()
            .copied()
            .unwrap_or_else(Context::static_context)
    }
}
