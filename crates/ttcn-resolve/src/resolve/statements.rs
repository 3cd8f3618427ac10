//! Behaviour statements.
//!
//! Statements are where calls happen, so this pass drives the parameter
//! binder (through reference resolution), the runs-on compatibility rules,
//! the port contract checks of `connect` and `map`, and the restrictions on
//! `activate` and `start` arguments.

use crate::error::{CompileError, ErrorKind};
use crate::resolve::checker::{Checker, ContextKind};
use crate::resolve::exprs::ExprMode;
use crate::resolve::types::Ty;
use ttcn_ast::ast::{
    Block, ComponentKeyword, DefKind, Direction, Expr, ExprKind, ParKind, PortEndpoint, Statement,
    StatementKind, TemplateRestriction,
};
use ttcn_ast::foundation::{DefId, RefId, Span, TypeId};

/// Port named by one side of `connect` or `map`.
#[derive(Debug, Clone, Copy)]
struct Endpoint {
    port_type: Option<TypeId>,
    system: bool,
}

impl<'p> Checker<'p> {
    /// Check the statements of a block in order.
    pub(crate) fn chk_block(&mut self, block: &Block) {
        let locals: Vec<DefId> = block
            .statements
            .iter()
            .filter_map(|s| match s.kind {
                StatementKind::Definition(def) => Some(def),
                _ => None,
            })
            .collect();
        self.chk_unique(&locals);
        for &def in &locals {
            self.chk_unique_in_hierarchy(def);
        }
        for statement in &block.statements {
            self.chk_statement(statement);
        }
    }

    fn chk_statement(&mut self, statement: &Statement) {
        let span = statement.span;
        match &statement.kind {
            StatementKind::Definition(def) => self.chk_def(*def),
            StatementKind::Assign { target, value } => self.chk_assignment(*target, value),
            StatementKind::Invoke(reference) => self.chk_invoke(*reference),
            StatementKind::Connect { left, right } => {
                if self.chk_component_operation("connect", span) {
                    self.chk_connect(left, right, span);
                }
            }
            StatementKind::Map { left, right } => {
                if self.chk_component_operation("map", span) {
                    self.chk_map(left, right, span);
                }
            }
            StatementKind::Activate(reference) => self.chk_activate(*reference, span),
            StatementKind::Start { component, function } => {
                if self.chk_component_operation("start", span) {
                    self.chk_start(component, *function, span);
                }
            }
            StatementKind::Return(value) => self.chk_return(value.as_ref(), span),
            StatementKind::Block(inner) => self.chk_block(inner),
        }
    }

    fn chk_component_operation(&mut self, operation: &str, span: Span) -> bool {
        if self.context().kind != ContextKind::Control {
            return true;
        }
        self.emit(CompileError::new(
            ErrorKind::InvalidStatement,
            span,
            format!("Operation `{operation}' is not allowed in the control part"),
        ));
        false
    }

    // === Assignment ===

    fn chk_assignment(&mut self, target: RefId, value: &Expr) {
        let program = self.program;
        let node = program.reference(target);
        let resolved = self.resolve(target);
        let Some(def) = resolved.target else {
            self.chk_expr(value, None, ExprMode::Value);
            return;
        };
        let kind = &program.definition(def).kind;
        let (mode, restriction) = match kind {
            DefKind::Var { .. } => (ExprMode::Value, None),
            DefKind::VarTemplate { restriction, .. } => (ExprMode::Template, Some(*restriction)),
            DefKind::FormalPar(par) if par.kind == ParKind::Value => (ExprMode::Value, None),
            DefKind::FormalPar(par) if par.kind == ParKind::Template => {
                (ExprMode::Template, Some(par.restriction))
            }
            _ => {
                self.emit(CompileError::new(
                    ErrorKind::InvalidStatement,
                    node.span,
                    format!(
                        "Reference to a variable or template variable was expected instead of {} `{}'",
                        kind.description(),
                        node.display()
                    ),
                ));
                self.chk_expr(value, None, ExprMode::Value);
                return;
            }
        };
        if let DefKind::FormalPar(par) = kind {
            if par.direction == Direction::In {
                self.lvalue_pars.insert(def);
            }
        }
        let ty = resolved.ty();
        let expected = (!ty.is_error()).then_some(ty);
        if resolved.through_optional {
            self.chk_expr_omittable(value, expected, mode);
        } else {
            self.chk_expr(value, expected, mode);
        }
        if let Some(restriction) = restriction.filter(|r| *r != TemplateRestriction::None) {
            let what = format!("{} `{}'", kind.description(), node.display());
            if self.chk_restriction(value, restriction, &what) {
                if let Some(source) = value.as_reference() {
                    self.ref_restriction_check(source, restriction);
                }
            }
        }
    }

    // === Calls ===

    fn chk_invoke(&mut self, reference: RefId) {
        let program = self.program;
        let node = program.reference(reference);
        let resolved = self.resolve(reference);
        let Some(def) = resolved.target else {
            return;
        };
        let definition = program.definition(def);
        let kind = &definition.kind;
        let context = self.context();
        match kind {
            DefKind::Function(_) | DefKind::ExtFunction(_) | DefKind::Altstep(_) => {
                if node.params.is_none() {
                    self.emit(CompileError::new(
                        ErrorKind::ParameterMismatch,
                        node.span,
                        format!(
                            "Reference to parameterized definition `{}' without actual parameter list",
                            node.display()
                        ),
                    ));
                    return;
                }
                if matches!(kind, DefKind::Altstep(_)) && context.kind == ContextKind::Control {
                    self.emit(CompileError::new(
                        ErrorKind::InvalidStatement,
                        node.span,
                        format!("Altstep `{}' cannot be called from the control part", definition.name),
                    ));
                    return;
                }
                self.chk_runs_on_compat(def, node.span);
            }
            DefKind::Testcase(_) => {
                if context.kind != ContextKind::Control {
                    self.emit(CompileError::new(
                        ErrorKind::InvalidStatement,
                        node.span,
                        format!("Testcase `{}' can only be executed from the control part", definition.name),
                    ));
                }
            }
            _ => {
                self.emit(CompileError::new(
                    ErrorKind::InvalidStatement,
                    node.span,
                    format!(
                        "Reference to a function, altstep or testcase was expected instead of {} `{}'",
                        kind.description(),
                        node.display()
                    ),
                ));
            }
        }
    }

    fn chk_activate(&mut self, reference: RefId, span: Span) {
        let program = self.program;
        let node = program.reference(reference);
        let resolved = self.resolve(reference);
        let Some(def) = resolved.target else {
            return;
        };
        let kind = &program.definition(def).kind;
        if !matches!(kind, DefKind::Altstep(_)) {
            self.emit(CompileError::new(
                ErrorKind::InvalidStatement,
                node.span,
                format!(
                    "Reference to an altstep was expected in the argument of activate() instead of {} `{}'",
                    kind.description(),
                    node.display()
                ),
            ));
            return;
        }
        let Some(params) = resolved.params else {
            self.emit(CompileError::new(
                ErrorKind::ParameterMismatch,
                node.span,
                format!(
                    "Reference to parameterized definition `{}' without actual parameter list",
                    node.display()
                ),
            ));
            return;
        };
        self.chk_runs_on_compat(def, node.span);
        self.chk_activate_argument(def, &params, span);
    }

    fn chk_start(&mut self, component: &Expr, function: RefId, span: Span) {
        let program = self.program;
        let component_ty = self.chk_expr(component, None, ExprMode::Value);
        let component_ty = self.component_type_of(component_ty, component.span, "start");

        let node = program.reference(function);
        let resolved = self.resolve(function);
        let Some(def) = resolved.target else {
            return;
        };
        let definition = program.definition(def);
        let DefKind::Function(callee) = &definition.kind else {
            self.emit(CompileError::new(
                ErrorKind::InvalidStatement,
                node.span,
                format!(
                    "Reference to a function was expected in the argument of start() instead of {} `{}'",
                    definition.kind.description(),
                    node.display()
                ),
            ));
            return;
        };
        if node.params.is_none() {
            self.emit(CompileError::new(
                ErrorKind::ParameterMismatch,
                node.span,
                format!(
                    "Reference to parameterized definition `{}' without actual parameter list",
                    node.display()
                ),
            ));
            return;
        }
        if let (Some(actual), Some(clause)) = (component_ty, callee.runs_on) {
            if let Some(required) = self.clause_component(clause) {
                if !self.component_extends(actual, required) {
                    self.emit(CompileError::new(
                        ErrorKind::InvalidStatement,
                        span,
                        format!(
                            "Component type mismatch: The component reference is of type `{}', but function `{}' runs on `{}'",
                            self.type_display(Ty::Defined(actual)),
                            definition.name,
                            self.type_display(Ty::Defined(required))
                        ),
                    ));
                }
            }
        }
        self.chk_startability(def, span);
    }

    /// Component type of a component reference; `None` after an error.
    fn component_type_of(&mut self, ty: Ty, span: Span, operation: &str) -> Option<TypeId> {
        if ty.is_error() {
            return None;
        }
        match self.refd_last(ty) {
            Ty::Defined(body) if self.program.type_def(body).as_component().is_some() => Some(body),
            Ty::Error => None,
            other => {
                self.emit(CompileError::new(
                    ErrorKind::TypeMismatch,
                    span,
                    format!(
                        "The operand of operation `{operation}' should be a component reference instead of a value of type `{}'",
                        self.type_display(other)
                    ),
                ));
                None
            }
        }
    }

    fn chk_return(&mut self, value: Option<&Expr>, span: Span) {
        let program = self.program;
        let context = self.context();
        let function = match context.kind {
            ContextKind::Function => context
                .owner
                .and_then(|owner| program.definition(owner).kind.as_function()),
            ContextKind::Control | ContextKind::Static => {
                self.emit(CompileError::new(
                    ErrorKind::InvalidStatement,
                    span,
                    "Return statement cannot be used in the control part".to_string(),
                ));
                return;
            }
            ContextKind::Altstep | ContextKind::Testcase => {
                if let Some(value) = value {
                    let what = if context.kind == ContextKind::Altstep {
                        "an altstep"
                    } else {
                        "a testcase"
                    };
                    self.emit(CompileError::new(
                        ErrorKind::InvalidStatement,
                        value.span,
                        format!("Return statement cannot have a value in {what}"),
                    ));
                }
                return;
            }
        };
        let Some(function) = function else {
            return;
        };
        match (&function.returns, value) {
            (None, None) => {}
            (None, Some(value)) => {
                self.emit(CompileError::new(
                    ErrorKind::InvalidStatement,
                    value.span,
                    "Unexpected return value: the function does not have return type".to_string(),
                ));
            }
            (Some(returns), None) => {
                let ty = self.resolve_type_expr(&returns.ty);
                self.emit(CompileError::new(
                    ErrorKind::InvalidStatement,
                    span,
                    format!(
                        "Missing return value: the function should return a {} of type `{}'",
                        if returns.template { "template" } else { "value" },
                        self.type_display(ty)
                    ),
                ));
            }
            (Some(returns), Some(value)) => {
                let ty = self.resolve_type_expr(&returns.ty);
                let expected = (!ty.is_error()).then_some(ty);
                if returns.template {
                    self.chk_expr(value, expected, ExprMode::Template);
                    if self.chk_restriction(value, returns.restriction, "return template") {
                        if let Some(source) = value.as_reference() {
                            self.ref_restriction_check(source, returns.restriction);
                        }
                    }
                } else {
                    self.chk_expr(value, expected, ExprMode::Value);
                }
            }
        }
    }

    // === Configuration operations ===

    /// Port type behind `component:port`.
    fn chk_endpoint(&mut self, endpoint: &PortEndpoint, operation: &str) -> Endpoint {
        let system = matches!(
            endpoint.component.kind,
            ExprKind::Component(ComponentKeyword::System)
        );
        let ty = self.chk_expr(&endpoint.component, None, ExprMode::Value);
        let mut result = Endpoint {
            port_type: None,
            system,
        };
        let Some(component) = self.component_type_of(ty, endpoint.component.span, operation) else {
            return result;
        };
        let program = self.program;
        let component_name = self.type_display(Ty::Defined(component));
        let Some(member) = self.component_member(component, &endpoint.port) else {
            self.emit(CompileError::new(
                ErrorKind::UndefinedName,
                endpoint.span,
                format!(
                    "Component type `{component_name}' does not have port with name `{}'",
                    endpoint.port
                ),
            ));
            return result;
        };
        let definition = program.definition(member);
        if !matches!(definition.kind, DefKind::Port { .. }) {
            self.emit(CompileError::new(
                ErrorKind::InvalidReference,
                endpoint.span,
                format!(
                    "Definition `{}' in component type `{component_name}' is a {} and not a port",
                    endpoint.port,
                    definition.kind.description()
                ),
            ));
            return result;
        }
        let declared = self.def_type(member);
        if let Ty::Defined(port) = self.refd_last(declared) {
            if program.type_def(port).as_port().is_some() {
                self.check_port_type(port);
                result.port_type = Some(port);
            }
        }
        result
    }

    fn chk_connect(&mut self, left: &PortEndpoint, right: &PortEndpoint, span: Span) {
        let first = self.chk_endpoint(left, "connect");
        let second = self.chk_endpoint(right, "connect");
        if first.system || second.system {
            self.emit(CompileError::new(
                ErrorKind::InvalidStatement,
                span,
                "The `system' component reference shall not be used in `connect' operation".to_string(),
            ));
            return;
        }
        let (Some(a), Some(b)) = (first.port_type, second.port_type) else {
            return;
        };
        let directions = if a == b { vec![(a, b)] } else { vec![(a, b), (b, a)] };
        for (from, to) in directions {
            if self.ports_ready(from, to) && !self.is_connectable(from, to) {
                let notes = self.report_connection_errors(from, to);
                let mut error = CompileError::new(
                    ErrorKind::InconsistentConnection,
                    span,
                    format!(
                        "The connection between port types `{}' and `{}' is not consistent",
                        self.type_display(Ty::Defined(from)),
                        self.type_display(Ty::Defined(to))
                    ),
                );
                for note in notes {
                    error = error.with_note(note);
                }
                self.emit(error);
            }
        }
    }

    fn chk_map(&mut self, left: &PortEndpoint, right: &PortEndpoint, span: Span) {
        let first = self.chk_endpoint(left, "map");
        let second = self.chk_endpoint(right, "map");
        let (component, system) = match (first.system, second.system) {
            (true, true) => {
                self.emit(CompileError::new(
                    ErrorKind::InvalidStatement,
                    span,
                    "Both endpoints of the mapping are system ports".to_string(),
                ));
                return;
            }
            (false, false) => {
                self.emit(CompileError::new(
                    ErrorKind::InvalidStatement,
                    span,
                    "Both endpoints of the mapping are test component ports".to_string(),
                ));
                return;
            }
            (true, false) => (second, first),
            (false, true) => (first, second),
        };
        let (Some(port), Some(system)) = (component.port_type, system.port_type) else {
            return;
        };
        if !self.ports_ready(port, system) || self.port_info(port).is_translate(system) {
            return;
        }
        if !self.is_mappable(port, system) {
            let notes = self.report_mapping_errors(port, system);
            let mut error = CompileError::new(
                ErrorKind::InconsistentConnection,
                span,
                format!(
                    "The mapping between port types `{}' and `{}' is not consistent",
                    self.type_display(Ty::Defined(port)),
                    self.type_display(Ty::Defined(system))
                ),
            );
            for note in notes {
                error = error.with_note(note);
            }
            self.emit(error);
        }
    }

    /// Both port types finished checking; a port type that is still in
    /// progress (a provider cycle) has no contract to compare yet.
    fn ports_ready(&self, a: TypeId, b: TypeId) -> bool {
        self.ports.contains_key(&a) && self.ports.contains_key(&b)
    }
}
