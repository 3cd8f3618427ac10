//! Reference resolution.
//!
//! Resolving a reference `A.B(args).c[i]` answers four questions:
//!
//! 1. Is `A` a module identifier? See [`Checker::detect_modid`].
//! 2. Which definition does the head name? Module-qualified heads are
//!    looked up in that module; unqualified heads walk the scope chain and
//!    then the imports.
//! 3. How do the actual parameters bind to the formal list? See
//!    [`params`](crate::resolve::params).
//! 4. What do the remaining sub-references select? See
//!    [`subrefs`](crate::resolve::subrefs).
//!
//! The answer is computed once per reference. A second request returns the
//! memoized [`ResolvedRef`] and reports nothing.
//!
//! # Panics
//!
//! A reference never contains itself, so meeting a reference whose
//! resolution is still in progress is an internal error and panics.

use crate::error::{CompileError, ErrorKind};
use crate::resolve::checker::{CallSite, Checker, RefState};
use crate::resolve::imports::{ImportLookup, QualifiedLookup};
use crate::resolve::params::ActualParList;
use crate::resolve::subrefs::AccessStep;
use crate::resolve::types::Ty;
use serde::Serialize;
use ttcn_ast::ast::{DefKind, ParKind, Reference, SubRef};
use ttcn_ast::foundation::{DefId, Identifier, ModuleId, RefId, ScopeId, TypeId};

/// Outcome of resolving one reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRef {
    /// Referenced definition; `None` when resolution failed
    pub target: Option<DefId>,
    /// Enumerated type when the reference names one of its items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_item: Option<TypeId>,
    /// Module named by the reference, explicitly or detected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<ModuleId>,
    /// Index of the part naming the definition
    pub head: usize,
    /// Field and index accesses after the head
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<AccessStep>,
    /// The reference selects a single element of a string
    pub string_element: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<ActualParList>,
    #[serde(skip)]
    pub(crate) ty: Ty,
    /// Some field on the path is optional
    #[serde(skip)]
    pub(crate) through_optional: bool,
    /// Timer or port array dimensions left unindexed
    #[serde(skip)]
    pub(crate) unindexed_dims: usize,
}

impl ResolvedRef {
    fn unresolved(module: Option<ModuleId>, head: usize) -> Self {
        Self {
            target: None,
            enum_item: None,
            module,
            head,
            path: Vec::new(),
            string_element: false,
            params: None,
            ty: Ty::Error,
            through_optional: false,
            unindexed_dims: 0,
        }
    }

    pub(crate) fn enum_value(ty: TypeId) -> Self {
        Self {
            enum_item: Some(ty),
            ty: Ty::Defined(ty),
            ..Self::unresolved(None, 0)
        }
    }

    pub fn is_erroneous(&self) -> bool {
        self.target.is_none() && self.enum_item.is_none()
    }

    /// Type of the selected value after all sub-references.
    pub fn ty(&self) -> Ty {
        self.ty
    }
}

impl<'p> Checker<'p> {
    /// Resolve a reference, or return the memoized result.
    ///
    /// # Panics
    /// Panics if the reference is reached again while it is being resolved.
    pub fn resolve(&mut self, reference: RefId) -> ResolvedRef {
        match self.refs.get(&reference) {
            Some(RefState::Done(resolved)) => return resolved.clone(),
            Some(RefState::Resolving) => {
                panic!("{reference} reached again while it is being resolved")
            }
            None => {}
        }
        self.refs.insert(reference, RefState::Resolving);
        let resolved = self.resolve_uncached(reference);
        self.refs
            .insert(reference, RefState::Done(resolved.clone()));
        resolved
    }

    /// Record that a reference names an enumerated item.
    pub(crate) fn resolve_as_enum_item(&mut self, reference: RefId, ty: TypeId) {
        self.refs
            .entry(reference)
            .or_insert_with(|| RefState::Done(ResolvedRef::enum_value(ty)));
    }

    pub(crate) fn is_resolved(&self, reference: RefId) -> bool {
        matches!(self.refs.get(&reference), Some(RefState::Done(_)))
    }

    fn resolve_uncached(&mut self, reference: RefId) -> ResolvedRef {
        let program = self.program;
        let node = program.reference(reference);
        let scope = program.ref_scope(reference);
        let module = program.scope_module(scope);

        let (modid, head) = match &node.modid {
            Some(modid) => (Some(modid.clone()), 0),
            None => self.detect_modid(scope, module, node),
        };
        let Some(head_id) = node.parts.get(head).and_then(SubRef::as_field) else {
            panic!("{reference} does not name a definition");
        };
        let module_id = modid.as_ref().and_then(|m| program.find_module(m));
        let mut resolved = ResolvedRef::unresolved(module_id, head);

        let target = match &modid {
            Some(modid) => self.lookup_qualified_head(module, modid, head_id, node),
            None => self.lookup_unqualified_head(scope, module, head_id, node),
        };
        let Some(def) = target else {
            return resolved;
        };
        resolved.target = Some(def);
        tracing::trace!(%reference, %def, "resolved");

        let kind = &program.definition(def).kind;
        if let Some(raw) = &node.params {
            match kind.formal_list() {
                Some(list) => {
                    let bound = self.bind_params(def, &list.pars, raw);
                    if matches!(
                        kind,
                        DefKind::Function(_)
                            | DefKind::ExtFunction(_)
                            | DefKind::Altstep(_)
                            | DefKind::Testcase(_)
                    ) {
                        let caller = self.context().owner;
                        self.call_sites.push(CallSite {
                            reference,
                            callee: def,
                            caller,
                        });
                    }
                    resolved.params = Some(bound);
                }
                None => {
                    self.emit(CompileError::new(
                        ErrorKind::ParameterMismatch,
                        raw.span,
                        format!(
                            "The referenced {} `{}' cannot have actual parameters",
                            kind.description(),
                            head_id
                        ),
                    ));
                    resolved.params = Some(ActualParList::erroneous());
                }
            }
        }

        let rest = &node.parts[head + 1..];
        match kind {
            DefKind::Type(ty) => {
                resolved.ty = Ty::Defined(*ty);
                if let Some(part) = rest.first() {
                    self.emit(CompileError::new(
                        ErrorKind::InvalidSubReference,
                        part.span(),
                        format!("Invalid reference: type `{head_id}' cannot have sub-references"),
                    ));
                }
            }
            DefKind::Timer { dims, .. } | DefKind::Port { dims, .. } => {
                let (path, unindexed) = self.navigate_dims(dims, rest, head + 1, kind.description());
                resolved.path = path;
                resolved.unindexed_dims = unindexed;
                resolved.ty = self.def_type(def);
            }
            DefKind::FormalPar(par) if matches!(par.kind, ParKind::Timer | ParKind::Port) => {
                let (path, unindexed) = self.navigate_dims(&[], rest, head + 1, kind.description());
                resolved.path = path;
                resolved.unindexed_dims = unindexed;
                resolved.ty = self.def_type(def);
            }
            DefKind::Altstep(_) | DefKind::Testcase(_) => {
                self.reject_subrefs(rest, kind.description(), head_id);
            }
            DefKind::Function(function) | DefKind::ExtFunction(function)
                if function.returns.is_none() =>
            {
                self.reject_subrefs(rest, kind.description(), head_id);
            }
            _ => {
                let base = self.def_type(def);
                let nav = self.navigate(base, rest, head + 1);
                resolved.ty = nav.ty;
                resolved.path = nav.path;
                resolved.string_element = nav.string_element;
                resolved.through_optional = nav.through_optional;
            }
        }
        resolved
    }

    fn reject_subrefs(&mut self, rest: &[SubRef], description: &str, head: &Identifier) {
        if let Some(part) = rest.first() {
            self.emit(CompileError::new(
                ErrorKind::InvalidSubReference,
                part.span(),
                format!(
                    "Invalid reference: {description} `{head}' does not have a value to select from"
                ),
            ));
        }
    }

    /// Split a leading module identifier off a reference.
    ///
    /// `A.B...` names module `A` only when `A` is a module the current
    /// module can refer to, no definition named `A` is visible (local or
    /// imported), and `B` is an identifier. A visible definition always
    /// wins over a module of the same name.
    ///
    /// Returns the module identifier, if any, and the index of the head.
    pub(crate) fn detect_modid(
        &mut self,
        scope: ScopeId,
        module: ModuleId,
        node: &Reference,
    ) -> (Option<Identifier>, usize) {
        let first = node.first_id();
        let Some(SubRef::Field { .. }) = node.parts.get(1) else {
            return (None, 0);
        };
        if !self.is_valid_moduleid(module, first) {
            return (None, 0);
        }
        if self.lookup_local(scope, first).is_some() {
            return (None, 0);
        }
        if !matches!(self.find_imported(module, first), ImportLookup::NotFound) {
            return (None, 0);
        }
        (Some(first.clone()), 1)
    }

    fn lookup_qualified_head(
        &mut self,
        module: ModuleId,
        modid: &Identifier,
        head: &Identifier,
        node: &Reference,
    ) -> Option<DefId> {
        let program = self.program;
        let message = match self.qualified_lookup(module, modid, head) {
            QualifiedLookup::Found(def) => return Some(def),
            QualifiedLookup::Ambiguous(first, second) => {
                self.emit_ambiguous(head, first, second, node);
                return None;
            }
            QualifiedLookup::NoModule => format!("There is no module with name `{modid}'"),
            QualifiedLookup::NotImported(_) => format!(
                "Module `{modid}' is not imported by module `{}'",
                program.module(module).name
            ),
            QualifiedLookup::NoDefinition(_) => {
                format!("There is no definition with name `{head}' visible from module `{modid}'")
            }
        };
        self.emit(CompileError::new(
            ErrorKind::UndefinedName,
            node.span,
            message,
        ));
        None
    }

    fn lookup_unqualified_head(
        &mut self,
        scope: ScopeId,
        module: ModuleId,
        head: &Identifier,
        node: &Reference,
    ) -> Option<DefId> {
        if let Some(def) = self.lookup_local(scope, head) {
            return Some(def);
        }
        match self.import_lookup(module, head) {
            ImportLookup::Found { def, .. } => Some(def),
            ImportLookup::Ambiguous(first, second) => {
                self.emit_ambiguous(head, first, second, node);
                None
            }
            ImportLookup::NotFound => {
                self.emit(CompileError::new(
                    ErrorKind::UndefinedName,
                    node.span,
                    format!("There is no local or imported definition with name `{head}'"),
                ));
                None
            }
        }
    }

    fn emit_ambiguous(&mut self, head: &Identifier, first: DefId, second: DefId, node: &Reference) {
        let program = self.program;
        let qualified = |def: DefId| {
            format!(
                "`{}.{}'",
                program.module(program.def_module(def)).name,
                program.definition(def).name
            )
        };
        self.emit(CompileError::new(
            ErrorKind::AmbiguousName,
            node.span,
            format!(
                "It is not possible to resolve reference `{head}' unambiguously, as it can be resolved to {} and to {}",
                qualified(first),
                qualified(second)
            ),
        ));
    }
}
