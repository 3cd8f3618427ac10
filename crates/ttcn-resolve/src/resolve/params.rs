//! Actual-to-formal parameter binding.
//!
//! An actual parameter list arrives as written: positional entries followed
//! by `name := value` entries. Binding runs in four phases:
//!
//! 1. Named entries are folded into position. Gaps between the last
//!    positional entry and a named one are padded with placeholders.
//! 2. The number of entries is checked against the formal list. Trailing
//!    formals with a default value may be left out.
//! 3. Every entry is bound to its formal parameter according to the
//!    parameter's kind and direction.
//! 4. Formals without an entry are bound to their default value.
//!
//! A failed binding still yields a complete [`ActualParList`] with
//! [`ActualPar::Error`] entries, so later passes see one entry per formal.

use crate::error::{CompileError, ErrorKind};
use crate::resolve::checker::{Checker, Context, ContextKind};
use crate::resolve::exprs::ExprMode;
use crate::resolve::types::Ty;
use serde::Serialize;
use ttcn_ast::ast::{
    DefKind, Direction, Expr, FormalPar, FormalParList, ParEval, ParKind, RawParList,
    TemplateRestriction, TypeKind,
};
use ttcn_ast::foundation::{DefId, RefId, Span};

/// Runtime restriction checks the generated call has to perform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RestrictionChecks {
    /// Check the storage content before the call
    pub pre_call: bool,
    /// Check the storage content after the callee wrote it
    pub post_call: bool,
}

impl RestrictionChecks {
    pub fn any(self) -> bool {
        self.pre_call || self.post_call
    }
}

/// A checked actual parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ActualPar {
    /// Binding failed; a diagnostic has been reported
    Error,
    /// `in` value parameter
    Value(Expr),
    /// `in` template parameter
    Template {
        template: Expr,
        checks: RestrictionChecks,
    },
    /// Storage passed by reference: `out`/`inout` parameters, timers, ports
    Reference {
        reference: RefId,
        checks: RestrictionChecks,
    },
    /// Default value of the formal parameter, owned by the formal list
    Default { formal: DefId },
}

impl ActualPar {
    pub fn is_error(&self) -> bool {
        matches!(self, ActualPar::Error)
    }

    /// Reference of a by-reference actual.
    pub fn storage(&self) -> Option<RefId> {
        match self {
            ActualPar::Reference { reference, .. } => Some(*reference),
            _ => None,
        }
    }

    pub fn checks(&self) -> RestrictionChecks {
        match self {
            ActualPar::Template { checks, .. } | ActualPar::Reference { checks, .. } => *checks,
            _ => RestrictionChecks::default(),
        }
    }
}

/// Bound actual parameters, one entry per formal parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActualParList {
    pub pars: Vec<ActualPar>,
    /// Some entry could not be bound
    pub erroneous: bool,
}

impl ActualParList {
    /// List standing in for parameters that could not be bound at all.
    pub fn erroneous() -> Self {
        Self {
            pars: Vec::new(),
            erroneous: true,
        }
    }

    pub fn len(&self) -> usize {
        self.pars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pars.is_empty()
    }
}

/// Entry of the positional list while named parameters are folded in.
#[derive(Debug, Clone, Copy)]
enum Slot<'a> {
    Written(&'a Expr),
    /// Gap in front of a named parameter
    Padding(Span),
}

impl<'p> Checker<'p> {
    /// Bind a raw actual parameter list to the formal list of `callee`.
    pub(crate) fn bind_params(
        &mut self,
        callee: DefId,
        formals: &[DefId],
        raw: &RawParList,
    ) -> ActualParList {
        self.chk_formal_list(callee);
        let program = self.program;
        let callee_def = program.definition(callee);
        let mut erroneous = false;

        // Phase A: named parameters
        let mut slots: Vec<Slot<'_>> = raw.positional.iter().map(Slot::Written).collect();
        for named in &raw.named {
            let Some(index) = formals
                .iter()
                .position(|f| program.definition(*f).name == named.name)
            else {
                self.emit(CompileError::new(
                    ErrorKind::ParameterMismatch,
                    named.span,
                    format!(
                        "{} `{}' has no formal parameter with name `{}'",
                        capitalized(callee_def.kind.description()),
                        callee_def.name,
                        named.name
                    ),
                ));
                erroneous = true;
                continue;
            };
            if let Some(existing) = slots.get(index) {
                let message = match existing {
                    Slot::Padding(_) => format!("Named parameter `{}' is out of order", named.name),
                    Slot::Written(_) => {
                        format!("Formal parameter `{}' assigned more than once", named.name)
                    }
                };
                self.emit(
                    CompileError::new(ErrorKind::ParameterMismatch, named.span, message)
                        .with_label(callee_def.span, format!("`{}' declared here", callee_def.name)),
                );
                erroneous = true;
                continue;
            }
            while slots.len() < index {
                slots.push(Slot::Padding(named.span));
            }
            slots.push(Slot::Written(&named.value));
        }

        // Phase B: arity
        let formal_count = formals.len();
        let min_count = formals
            .iter()
            .rposition(|f| !self.has_default(*f))
            .map_or(0, |last| last + 1);
        let actual_count = slots.len();
        if actual_count < min_count || actual_count > formal_count {
            let (direction, bound, qualifier) = if actual_count < min_count {
                ("few", min_count, "at least ")
            } else {
                ("many", formal_count, "at most ")
            };
            let qualifier = if min_count == formal_count { "" } else { qualifier };
            self.emit(CompileError::new(
                ErrorKind::ParameterMismatch,
                raw.span,
                format!(
                    "Too {direction} parameters: {qualifier}{bound} was expected instead of {actual_count}"
                ),
            ));
            erroneous = true;
        }

        // Phase C: written entries
        let mut pars = Vec::with_capacity(formal_count);
        for (&formal, slot) in formals.iter().zip(&slots) {
            let name = &program.definition(formal).name;
            let par = match slot {
                Slot::Padding(span) => {
                    if self.has_default(formal) {
                        ActualPar::Default { formal }
                    } else {
                        self.emit(CompileError::new(
                            ErrorKind::ParameterMismatch,
                            *span,
                            format!("Missing actual parameter for formal parameter `{name}'"),
                        ));
                        ActualPar::Error
                    }
                }
                Slot::Written(expr) if expr.is_not_used() => {
                    if self.has_default(formal) {
                        ActualPar::Default { formal }
                    } else {
                        self.emit(CompileError::new(
                            ErrorKind::ParameterMismatch,
                            expr.span,
                            format!(
                                "Not used symbol (`-') cannot be used for parameter `{name}', which does not have a default value"
                            ),
                        ));
                        ActualPar::Error
                    }
                }
                Slot::Written(expr) => self.bind_actual(callee, formal, expr),
            };
            erroneous |= par.is_error();
            pars.push(par);
        }

        // Phase D: omitted trailing formals. A missing default has already
        // been reported as an arity error.
        for &formal in formals.iter().skip(slots.len()) {
            if self.has_default(formal) {
                pars.push(ActualPar::Default { formal });
            } else {
                pars.push(ActualPar::Error);
                erroneous = true;
            }
        }

        ActualParList { pars, erroneous }
    }

    fn has_default(&self, formal: DefId) -> bool {
        self.program
            .definition(formal)
            .kind
            .as_formal_par()
            .is_some_and(|par| par.default.is_some())
    }

    fn formal_par(&self, formal: DefId) -> &'p FormalPar {
        match self.program.definition(formal).kind.as_formal_par() {
            Some(par) => par,
            None => panic!("{formal} in a formal parameter list is not a formal parameter"),
        }
    }

    /// Bind one written actual parameter.
    fn bind_actual(&mut self, callee: DefId, formal: DefId, expr: &Expr) -> ActualPar {
        let program = self.program;
        let par = self.formal_par(formal);
        let name = &program.definition(formal).name;
        let expected = par.ty.as_ref().map(|ty| self.resolve_type_expr(ty));
        match (par.kind, par.direction) {
            (ParKind::Value, Direction::In) => {
                self.chk_expr(expr, expected, ExprMode::Value);
                ActualPar::Value(expr.clone())
            }
            (ParKind::Template, Direction::In) => {
                self.chk_expr(expr, expected, ExprMode::Template);
                let what = format!("template parameter `{name}'");
                if !self.chk_restriction(expr, par.restriction, &what) {
                    return ActualPar::Error;
                }
                let pre_call = match expr.as_reference() {
                    Some(reference) => self.ref_restriction_check(reference, par.restriction),
                    None => false,
                };
                ActualPar::Template {
                    template: expr.clone(),
                    checks: RestrictionChecks {
                        pre_call,
                        post_call: false,
                    },
                }
            }
            (ParKind::Value | ParKind::Template, _) => {
                self.bind_storage(callee, formal, par, expr, expected)
            }
            (ParKind::Timer | ParKind::Port, _) => self.bind_timer_or_port(formal, par, expr, expected),
        }
    }

    /// Bind an `out` or `inout` value or template parameter.
    fn bind_storage(
        &mut self,
        callee: DefId,
        formal: DefId,
        par: &FormalPar,
        expr: &Expr,
        expected: Option<Ty>,
    ) -> ActualPar {
        let program = self.program;
        let name = &program.definition(formal).name;
        let direction = par.direction.keyword();
        let (wanted, par_kind) = match par.kind {
            ParKind::Template => ("a template variable or template parameter", "template"),
            _ => ("a variable or value parameter", "value"),
        };
        let Some(reference) = expr.as_reference() else {
            self.emit(CompileError::new(
                ErrorKind::ParameterMismatch,
                expr.span,
                format!(
                    "Reference to {wanted} was expected for `{direction}' {par_kind} parameter `{name}'"
                ),
            ));
            return ActualPar::Error;
        };
        let node = program.reference(reference);
        let resolved = self.resolve(reference);
        let Some(target) = resolved.target else {
            return ActualPar::Error;
        };
        let target_kind = &program.definition(target).kind;
        let assignable = match (par.kind, target_kind) {
            (ParKind::Value, DefKind::Var { .. }) => true,
            (ParKind::Template, DefKind::VarTemplate { .. }) => true,
            (kind, DefKind::FormalPar(target_par)) => target_par.kind == kind,
            _ => false,
        };
        if !assignable {
            self.emit(CompileError::new(
                ErrorKind::ParameterMismatch,
                node.span,
                format!(
                    "Reference to {wanted} was expected for `{direction}' {par_kind} parameter `{name}' instead of {} `{}'",
                    target_kind.description(),
                    node.display()
                ),
            ));
            return ActualPar::Error;
        }
        if resolved.string_element {
            self.emit(CompileError::new(
                ErrorKind::ParameterMismatch,
                node.span,
                format!(
                    "Reference to a string element cannot be passed to `{direction}' parameter `{name}'"
                ),
            ));
            return ActualPar::Error;
        }
        if let DefKind::FormalPar(target_par) = target_kind {
            if target_par.direction == Direction::In {
                self.lvalue_pars.insert(target);
            }
        }

        // The value flows in for `inout` and back out for both directions,
        // so storage and formal must be compatible either way.
        if let Some(formal_ty) = expected {
            let actual_ty = resolved.ty();
            if !self.is_identical(formal_ty, actual_ty) {
                let forward = self.is_compatible(formal_ty, actual_ty);
                let backward = self.is_compatible(actual_ty, formal_ty);
                if !forward || !backward {
                    let formal_name = self.type_display(formal_ty);
                    let actual_name = self.type_display(actual_ty);
                    let message = if forward {
                        format!(
                            "Type mismatch: the result of `{direction}' parameter `{name}' of type `{formal_name}' cannot be written back to a reference of type `{actual_name}'"
                        )
                    } else {
                        format!(
                            "Type mismatch: a reference of type `{formal_name}' was expected for `{direction}' parameter `{name}' instead of `{actual_name}'"
                        )
                    };
                    self.emit(CompileError::new(ErrorKind::TypeMismatch, node.span, message));
                    return ActualPar::Error;
                }
            }
        }

        let mut checks = RestrictionChecks::default();
        if par.kind == ParKind::Template {
            let formal_restriction = par.restriction;
            let storage = self
                .referenced_restriction(reference)
                .unwrap_or(TemplateRestriction::None);
            checks.pre_call = formal_restriction.is_less_restrictive(storage);
            checks.post_call = storage.is_less_restrictive(formal_restriction);
            // External code may leave any template in the argument.
            if matches!(program.definition(callee).kind, DefKind::ExtFunction(_)) {
                checks.post_call = true;
            }
        }
        ActualPar::Reference { reference, checks }
    }

    fn bind_timer_or_port(
        &mut self,
        formal: DefId,
        par: &FormalPar,
        expr: &Expr,
        expected: Option<Ty>,
    ) -> ActualPar {
        let program = self.program;
        let name = &program.definition(formal).name;
        let what = match par.kind {
            ParKind::Timer => "timer",
            _ => "port",
        };
        let Some(reference) = expr.as_reference() else {
            self.emit(CompileError::new(
                ErrorKind::ParameterMismatch,
                expr.span,
                format!("Reference to a {what} or {what} parameter was expected for {what} parameter `{name}'"),
            ));
            return ActualPar::Error;
        };
        let node = program.reference(reference);
        let resolved = self.resolve(reference);
        let Some(target) = resolved.target else {
            return ActualPar::Error;
        };
        let target_kind = &program.definition(target).kind;
        let matches_kind = match (par.kind, target_kind) {
            (ParKind::Timer, DefKind::Timer { .. }) | (ParKind::Port, DefKind::Port { .. }) => true,
            (kind, DefKind::FormalPar(target_par)) => target_par.kind == kind,
            _ => false,
        };
        if !matches_kind {
            self.emit(CompileError::new(
                ErrorKind::ParameterMismatch,
                node.span,
                format!(
                    "Reference to a {what} or {what} parameter was expected for {what} parameter `{name}' instead of {} `{}'",
                    target_kind.description(),
                    node.display()
                ),
            ));
            return ActualPar::Error;
        }
        if resolved.unindexed_dims > 0 {
            self.emit(CompileError::new(
                ErrorKind::ParameterMismatch,
                node.span,
                format!("Reference to a {what} array without array index cannot be used as {what} parameter `{name}'"),
            ));
            return ActualPar::Error;
        }
        if let Some(formal_ty) = expected {
            let actual_ty = resolved.ty();
            if !self.is_identical(formal_ty, actual_ty) {
                self.emit(CompileError::new(
                    ErrorKind::TypeMismatch,
                    node.span,
                    format!(
                        "Type mismatch: reference to a port of type `{}' was expected instead of `{}'",
                        self.type_display(formal_ty),
                        self.type_display(actual_ty)
                    ),
                ));
                return ActualPar::Error;
            }
        }
        ActualPar::Reference {
            reference,
            checks: RestrictionChecks::default(),
        }
    }

    // === Formal parameter lists ===

    /// Check the formal parameter list of `owner` once.
    ///
    /// Default values are checked in the static context and kept in the
    /// defaults table, where [`ActualPar::Default`] entries point.
    pub(crate) fn chk_formal_list(&mut self, owner: DefId) {
        if !self.formal_lists.insert(owner) {
            return;
        }
        let program = self.program;
        let Some(list) = program.definition(owner).kind.formal_list() else {
            return;
        };
        self.push_context(Context::static_context());
        self.chk_unique(&list.pars);
        for &formal in &list.pars {
            self.chk_formal_par(owner, formal);
        }
        self.pop_context();
    }

    fn chk_formal_par(&mut self, owner: DefId, formal: DefId) {
        let program = self.program;
        let definition = program.definition(formal);
        let par = self.formal_par(formal);
        let name = &definition.name;
        let ty = par.ty.as_ref().map(|ty| self.resolve_type_expr(ty));

        match par.kind {
            ParKind::Port => {
                if let Some(ty) = ty {
                    if !ty.is_error() && !matches!(self.last_kind(ty), Some(TypeKind::Port(_))) {
                        self.emit(CompileError::new(
                            ErrorKind::ExpectedType,
                            definition.span,
                            format!(
                                "Port type was expected for port parameter `{name}' instead of `{}'",
                                self.type_display(ty)
                            ),
                        ));
                    }
                }
            }
            ParKind::Value | ParKind::Template => {
                if let Some(ty) = ty {
                    if let Some(TypeKind::Port(_) | TypeKind::Component(_) | TypeKind::Signature(_)) =
                        self.last_kind(ty)
                    {
                        self.emit(CompileError::new(
                            ErrorKind::ExpectedType,
                            definition.span,
                            format!(
                                "Type `{}' cannot be the type of {} `{name}'",
                                self.type_display(ty),
                                definition.kind.description()
                            ),
                        ));
                    }
                }
            }
            ParKind::Timer => {}
        }

        if par.eval != ParEval::Normal {
            let keyword = match par.eval {
                ParEval::Lazy => "@lazy",
                _ => "@fuzzy",
            };
            let owner_def = program.definition(owner);
            let in_data = par.direction == Direction::In
                && matches!(par.kind, ParKind::Value | ParKind::Template);
            if !in_data {
                self.emit(CompileError::new(
                    ErrorKind::ParameterMismatch,
                    definition.span,
                    format!("Only `in' value or template parameters can be {keyword}"),
                ));
            } else if matches!(owner_def.kind, DefKind::Altstep(_) | DefKind::Testcase(_)) {
                self.emit(CompileError::new(
                    ErrorKind::ParameterMismatch,
                    definition.span,
                    format!(
                        "Formal parameter `{name}' of {} `{}' cannot be {keyword}",
                        owner_def.kind.description(),
                        owner_def.name
                    ),
                ));
            }
        }

        let Some(default) = &par.default else {
            return;
        };
        let bound = match (par.kind, par.direction) {
            (ParKind::Timer | ParKind::Port, _) => {
                self.emit(CompileError::new(
                    ErrorKind::ParameterMismatch,
                    default.span,
                    format!(
                        "{} `{name}' cannot have a default value",
                        capitalized(definition.kind.description())
                    ),
                ));
                ActualPar::Error
            }
            (ParKind::Value, Direction::In) => {
                self.chk_expr(default, ty, ExprMode::Value);
                if self.validate_default(default) {
                    ActualPar::Value(default.clone())
                } else {
                    ActualPar::Error
                }
            }
            (ParKind::Template, Direction::In) => {
                self.chk_expr(default, ty, ExprMode::Template);
                let what = format!("the default value of template parameter `{name}'");
                let restricted = self.chk_restriction(default, par.restriction, &what);
                if self.validate_default(default) && restricted {
                    ActualPar::Template {
                        template: default.clone(),
                        checks: RestrictionChecks::default(),
                    }
                } else {
                    ActualPar::Error
                }
            }
            (ParKind::Value | ParKind::Template, _) => {
                self.bind_storage(owner, formal, par, default, ty)
            }
        };
        self.defaults.insert(formal, bound);
    }

    /// Default value bound for a formal parameter, once its list is checked.
    pub fn default_value(&self, formal: DefId) -> Option<&ActualPar> {
        self.defaults.get(&formal)
    }

    /// Check that `derived` declares the same formal parameters as `base`.
    ///
    /// Used for `modifies`: the derived template must repeat the formal
    /// list of its base template with identical names, kinds and types.
    pub(crate) fn chk_compatibility(&mut self, derived: DefId, base: DefId, span: Span) -> bool {
        let program = self.program;
        let empty = FormalParList::default();
        let derived_list = program.definition(derived).kind.formal_list().unwrap_or(&empty);
        let base_list = program.definition(base).kind.formal_list().unwrap_or(&empty);
        if derived_list.len() != base_list.len() {
            self.emit(CompileError::new(
                ErrorKind::ParameterMismatch,
                span,
                format!(
                    "The modified template has {} formal parameters, but the base template `{}' has {}",
                    derived_list.len(),
                    program.definition(base).name,
                    base_list.len()
                ),
            ));
            return false;
        }
        let mut ok = true;
        for (position, (&d, &b)) in derived_list.pars.iter().zip(&base_list.pars).enumerate() {
            let d_def = program.definition(d);
            let b_def = program.definition(b);
            let d_par = self.formal_par(d);
            let b_par = self.formal_par(b);
            let problem = if d_def.name != b_def.name {
                Some(format!(
                    "The name of formal parameter #{} is `{}' instead of `{}'",
                    position + 1,
                    d_def.name,
                    b_def.name
                ))
            } else if d_par.kind != b_par.kind || d_par.direction != b_par.direction {
                Some(format!(
                    "Formal parameter `{}' is {} here, but {} in the base template",
                    d_def.name,
                    d_def.kind.description(),
                    b_def.kind.description()
                ))
            } else {
                match (&d_par.ty, &b_par.ty) {
                    (Some(dt), Some(bt)) => {
                        let dt = self.resolve_type_expr(dt);
                        let bt = self.resolve_type_expr(bt);
                        if self.is_identical(dt, bt) {
                            None
                        } else {
                            Some(format!(
                                "The type of formal parameter `{}' is `{}' instead of `{}'",
                                d_def.name,
                                self.type_display(dt),
                                self.type_display(bt)
                            ))
                        }
                    }
                    _ => None,
                }
            };
            if let Some(message) = problem {
                self.emit(
                    CompileError::new(ErrorKind::ParameterMismatch, d_def.span, message)
                        .with_label(b_def.span, "base template parameter".to_string()),
                );
                ok = false;
            }
        }
        ok
    }

    /// Check that a function can be started on a parallel test component.
    ///
    /// Parameters and the return value cross component boundaries, so they
    /// must be `in` data of types that can leave a component.
    pub(crate) fn chk_startability(&mut self, callee: DefId, span: Span) -> bool {
        let program = self.program;
        let definition = program.definition(callee);
        let Some(function) = definition.kind.as_function() else {
            return true;
        };
        let mut ok = true;
        for &formal in &function.params.pars {
            let par = self.formal_par(formal);
            let par_name = &program.definition(formal).name;
            let reason = match (par.kind, par.direction) {
                (ParKind::Timer | ParKind::Port, _) => {
                    Some(format!("{} `{par_name}'", program.definition(formal).kind.description()))
                }
                (_, Direction::Out | Direction::Inout) => {
                    Some(format!("`{}' parameter `{par_name}'", par.direction.keyword()))
                }
                _ => {
                    let ty = par.ty.as_ref().map(|ty| self.resolve_type_expr(ty));
                    match ty {
                        Some(ty) if self.is_component_internal(ty) => Some(format!(
                            "parameter `{par_name}' of component internal type `{}'",
                            self.type_display(ty)
                        )),
                        _ => None,
                    }
                }
            };
            if let Some(reason) = reason {
                self.emit(
                    CompileError::new(
                        ErrorKind::InvalidStatement,
                        span,
                        format!(
                            "Function `{}' cannot be started on a parallel test component because it has {reason}",
                            definition.name
                        ),
                    )
                    .with_label(program.definition(formal).span, "parameter declared here".to_string()),
                );
                ok = false;
            }
        }
        if let Some(returns) = &function.returns {
            let ty = self.resolve_type_expr(&returns.ty);
            if self.is_component_internal(ty) {
                self.emit(CompileError::new(
                    ErrorKind::InvalidStatement,
                    span,
                    format!(
                        "Function `{}' cannot be started on a parallel test component because its return type `{}' is component internal",
                        definition.name,
                        self.type_display(ty)
                    ),
                ));
                ok = false;
            }
        }
        ok
    }

    /// Check the by-reference arguments of an activated altstep.
    ///
    /// An activated altstep outlives the behaviour that activated it, so it
    /// must not keep references to that behaviour's locals or parameters.
    /// Testcase parameters live as long as the test component and are
    /// accepted.
    pub(crate) fn chk_activate_argument(&mut self, callee: DefId, pars: &ActualParList, span: Span) -> bool {
        let program = self.program;
        let in_testcase = self.context().kind == ContextKind::Testcase;
        let mut ok = true;
        for (position, par) in pars.pars.iter().enumerate() {
            let Some(reference) = par.storage() else {
                continue;
            };
            let Some(target) = self.resolve(reference).target else {
                continue;
            };
            let target_def = program.definition(target);
            let problem = match &target_def.kind {
                DefKind::Var { .. } | DefKind::VarTemplate { .. } | DefKind::Timer { .. }
                    if program.is_local(target) =>
                {
                    Some("which is a local definition")
                }
                DefKind::FormalPar(_) if !in_testcase => Some("which is a formal parameter"),
                _ => None,
            };
            if let Some(problem) = problem {
                self.emit(CompileError::new(
                    ErrorKind::InvalidStatement,
                    span,
                    format!(
                        "Parameter #{} of activated altstep `{}' refers to {} `{}', {problem}",
                        position + 1,
                        program.definition(callee).name,
                        target_def.kind.description(),
                        target_def.name
                    ),
                ));
                ok = false;
            }
        }
        ok
    }
}

fn capitalized(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckConfig;
    use crate::error::Severity;
    use ttcn_ast::ast::{Block, Builtin, FunctionDef, Statement, StatementKind, TypeExpr};
    use ttcn_ast::ProgramBuilder;

    const INT: TypeExpr = TypeExpr::Builtin(Builtin::Integer);

    /// `function f(integer a, integer b, integer c := 3)` and a caller
    /// `g` whose body invokes `f` with each of `calls`.
    fn build_calls(
        b: &mut ProgramBuilder,
        formals: &[(&str, bool)],
        calls: Vec<(Vec<Expr>, Vec<(&str, Expr)>)>,
    ) -> Vec<RefId> {
        let m = b.module("Main");
        let pars = formals
            .iter()
            .map(|(name, defaulted)| {
                let par = FormalPar::value(INT);
                let par = if *defaulted { par.with_default(Expr::int(3)) } else { par };
                b.formal(name, par)
            })
            .collect();
        b.function(m, "f", FunctionDef::new(pars));
        let mut refs = Vec::new();
        let mut statements = Vec::new();
        for (positional, named) in calls {
            let call = b.call_named("f", positional, named);
            refs.push(call);
            statements.push(Statement::new(StatementKind::Invoke(call)));
        }
        b.function(m, "g", FunctionDef::new(Vec::new()).body(Block::new(statements)));
        refs
    }

    fn ints(values: &[i64]) -> Vec<Expr> {
        values.iter().map(|v| Expr::int(*v)).collect()
    }

    #[test]
    fn test_arity_boundary() {
        let mut b = ProgramBuilder::new();
        let calls = build_calls(
            &mut b,
            &[("a", false), ("b", false), ("c", true)],
            vec![
                (ints(&[1, 2]), Vec::new()),
                (ints(&[1, 2, 3]), Vec::new()),
                (ints(&[1]), Vec::new()),
                (ints(&[1, 2, 3, 4]), Vec::new()),
            ],
        );
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        let two = checker.resolve(calls[0]).params.unwrap();
        assert!(!two.erroneous);
        assert!(matches!(two.pars[2], ActualPar::Default { .. }));
        assert!(!checker.resolve(calls[1]).params.unwrap().erroneous);
        assert!(checker.diagnostics().is_empty());

        assert!(checker.resolve(calls[2]).params.unwrap().erroneous);
        assert!(checker.resolve(calls[3]).params.unwrap().erroneous);
        let messages: Vec<_> = checker.diagnostics().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Too few parameters: at least 2 was expected instead of 1",
                "Too many parameters: at most 3 was expected instead of 4",
            ]
        );
    }

    #[test]
    fn test_exact_arity_without_defaults() {
        let mut b = ProgramBuilder::new();
        let calls = build_calls(&mut b, &[("a", false)], vec![(ints(&[1, 2]), Vec::new())]);
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        checker.resolve(calls[0]);
        assert_eq!(
            checker.diagnostics()[0].message,
            "Too many parameters: 1 was expected instead of 2"
        );
    }

    #[test]
    fn test_named_parameter_pads_gap_with_defaults() {
        let mut b = ProgramBuilder::new();
        let calls = build_calls(
            &mut b,
            &[("a", false), ("b", true), ("c", true), ("d", false)],
            vec![(ints(&[1]), vec![("d", Expr::int(4))])],
        );
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        let bound = checker.resolve(calls[0]).params.unwrap();
        assert!(!bound.erroneous);
        assert_eq!(bound.len(), 4);
        assert!(matches!(bound.pars[0], ActualPar::Value(_)));
        assert!(matches!(bound.pars[1], ActualPar::Default { .. }));
        assert!(matches!(bound.pars[2], ActualPar::Default { .. }));
        assert!(matches!(bound.pars[3], ActualPar::Value(_)));
        assert!(checker.diagnostics().is_empty());
    }

    #[test]
    fn test_named_parameter_errors() {
        let mut b = ProgramBuilder::new();
        let calls = build_calls(
            &mut b,
            &[("a", false), ("b", true), ("c", true)],
            vec![
                (ints(&[1]), vec![("a", Expr::int(2))]),
                (ints(&[1]), vec![("c", Expr::int(3)), ("b", Expr::int(2))]),
                (ints(&[1]), vec![("z", Expr::int(2))]),
            ],
        );
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        for call in &calls {
            checker.resolve(*call);
        }
        let messages: Vec<_> = checker.diagnostics().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Formal parameter `a' assigned more than once",
                "Named parameter `b' is out of order",
                "Function `f' has no formal parameter with name `z'",
            ]
        );
    }

    #[test]
    fn test_missing_parameter_in_gap() {
        let mut b = ProgramBuilder::new();
        let calls = build_calls(
            &mut b,
            &[("a", false), ("b", false), ("c", false)],
            vec![(ints(&[1]), vec![("c", Expr::int(3))])],
        );
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        let bound = checker.resolve(calls[0]).params.unwrap();
        assert!(bound.erroneous);
        assert!(bound.pars[1].is_error());
        assert_eq!(
            checker.diagnostics()[0].message,
            "Missing actual parameter for formal parameter `b'"
        );
    }

    #[test]
    fn test_not_used_symbol_requires_default() {
        let mut b = ProgramBuilder::new();
        let calls = build_calls(
            &mut b,
            &[("a", false), ("b", true)],
            vec![
                (vec![Expr::int(1), Expr::not_used()], Vec::new()),
                (vec![Expr::not_used(), Expr::int(1)], Vec::new()),
            ],
        );
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        assert!(!checker.resolve(calls[0]).params.unwrap().erroneous);
        assert!(checker.resolve(calls[1]).params.unwrap().erroneous);
        assert_eq!(checker.diagnostics().len(), 1);
        assert!(checker.diagnostics()[0]
            .message
            .starts_with("Not used symbol (`-') cannot be used for parameter `a'"));
    }

    /// `function f(<dir> template(<formal>) integer p)` called with a
    /// template variable restricted to `storage`.
    fn restriction_checks(
        direction: Direction,
        formal: TemplateRestriction,
        storage: TemplateRestriction,
        external: bool,
    ) -> RestrictionChecks {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let p = b.formal(
            "p",
            FormalPar::template(INT).direction(direction).restriction(formal),
        );
        if external {
            b.ext_function(m, "f", FunctionDef::new(vec![p]));
        } else {
            b.function(m, "f", FunctionDef::new(vec![p]));
        }
        let local = b.def(
            "v",
            DefKind::VarTemplate {
                ty: INT,
                restriction: storage,
                init: None,
            },
        );
        let arg = b.ref_expr("v");
        let call = b.call("f", vec![arg]);
        let body = Block::new(vec![
            Statement::new(StatementKind::Definition(local)),
            Statement::new(StatementKind::Invoke(call)),
        ]);
        b.function(m, "g", FunctionDef::new(Vec::new()).body(body));
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());
        let bound = checker.resolve(call).params.unwrap();
        assert!(!bound.erroneous);
        bound.pars[0].checks()
    }

    #[test]
    fn test_restriction_checks_for_out_templates() {
        use TemplateRestriction as R;
        let checks = restriction_checks(Direction::Inout, R::Value, R::Present, false);
        assert!(checks.pre_call && !checks.post_call);
        let checks = restriction_checks(Direction::Inout, R::Present, R::Value, false);
        assert!(!checks.pre_call && checks.post_call);
        let checks = restriction_checks(Direction::Out, R::Value, R::Value, false);
        assert!(!checks.any());
        let checks = restriction_checks(Direction::Out, R::Omit, R::Omit, true);
        assert!(!checks.pre_call && checks.post_call);
        let checks = restriction_checks(Direction::Out, R::None, R::None, true);
        assert!(!checks.pre_call && checks.post_call);
        let checks = restriction_checks(Direction::Inout, R::None, R::None, true);
        assert!(!checks.pre_call && checks.post_call);
        let checks = restriction_checks(Direction::Out, R::None, R::None, false);
        assert!(!checks.any());
    }

    #[test]
    fn test_inout_checks_both_directions() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let ucs = TypeExpr::Builtin(Builtin::UniversalCharstring);
        let cs = TypeExpr::Builtin(Builtin::Charstring);
        let p = b.formal("p", FormalPar::value(ucs).direction(Direction::Inout));
        b.function(m, "f", FunctionDef::new(vec![p]));
        let local = b.var("s", cs, None);
        let arg = b.ref_expr("s");
        let call = b.call("f", vec![arg]);
        let body = Block::new(vec![
            Statement::new(StatementKind::Definition(local)),
            Statement::new(StatementKind::Invoke(call)),
        ]);
        b.function(m, "g", FunctionDef::new(Vec::new()).body(body));
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        assert!(checker.resolve(call).params.unwrap().pars[0].is_error());
        let diag = &checker.diagnostics()[0];
        assert_eq!(diag.kind, ErrorKind::TypeMismatch);
        assert!(diag.message.contains("cannot be written back"));
    }

    #[test]
    fn test_out_parameter_needs_storage() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        b.constant(m, "k", INT, Expr::int(1));
        let p = b.formal("p", FormalPar::value(INT).direction(Direction::Out));
        b.function(m, "f", FunctionDef::new(vec![p]));
        let constant = b.ref_expr("k");
        let to_constant = b.call("f", vec![constant]);
        let to_literal = b.call("f", vec![Expr::int(2)]);
        let body = Block::new(vec![
            Statement::new(StatementKind::Invoke(to_constant)),
            Statement::new(StatementKind::Invoke(to_literal)),
        ]);
        b.function(m, "g", FunctionDef::new(Vec::new()).body(body));
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        checker.resolve(to_constant);
        checker.resolve(to_literal);
        let messages: Vec<_> = checker.diagnostics().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Reference to a variable or value parameter was expected for `out' value parameter `p' instead of constant `k'",
                "Reference to a variable or value parameter was expected for `out' value parameter `p'",
            ]
        );
    }

    #[test]
    fn test_in_parameter_passed_out_becomes_lvalue() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let p = b.formal("p", FormalPar::value(INT).direction(Direction::Out));
        b.function(m, "f", FunctionDef::new(vec![p]));
        let x = b.formal("x", FormalPar::value(INT));
        let arg = b.ref_expr("x");
        let call = b.call("f", vec![arg]);
        let body = Block::new(vec![Statement::new(StatementKind::Invoke(call))]);
        b.function(m, "g", FunctionDef::new(vec![x]).body(body));
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        assert!(!checker.is_used_as_lvalue(x));
        checker.resolve(call);
        assert!(checker.is_used_as_lvalue(x));
    }

    #[test]
    fn test_default_values_are_validated_once() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let loose = b.formal(
            "t",
            FormalPar::template(INT)
                .restriction(TemplateRestriction::Value)
                .with_default(Expr::any_value()),
        );
        let timer = b.formal("tm", FormalPar::timer().with_default(Expr::int(1)));
        let lazy_out = b.formal(
            "o",
            FormalPar::value(INT).direction(Direction::Out).eval(ParEval::Lazy),
        );
        let f = b.function(m, "f", FunctionDef::new(vec![loose, timer, lazy_out]));
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        checker.chk_formal_list(f);
        checker.chk_formal_list(f);
        let messages: Vec<_> = checker.diagnostics().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Restriction `value' on the default value of template parameter `t' does not allow usage of `?'",
                "Timer parameter `tm' cannot have a default value",
                "Only `in' value or template parameters can be @lazy",
            ]
        );
        assert!(checker.default_value(loose).unwrap().is_error());
        assert!(checker.diagnostics().iter().all(|d| d.severity == Severity::Error));
    }
}
