//! Per-definition checks.
//!
//! Every definition moves through `Unchecked -> Checking -> Checked`. The
//! state is recorded before the definition's body is looked at, so a
//! constant or template whose value leads back to itself finds itself in
//! `Checking` and reports the cycle instead of recursing.
//!
//! Behaviours (functions, altsteps, testcases) are checked with a context
//! that names their `runs on` component; the statements in their bodies
//! are checked in [`statements`](crate::resolve::statements).

use crate::error::{CompileError, ErrorKind};
use crate::resolve::checker::{CheckState, Checker, Context, ContextKind};
use crate::resolve::exprs::ExprMode;
use crate::resolve::types::Ty;
use std::collections::HashMap;
use ttcn_ast::ast::{
    ArrayDim, Builtin, DefKind, Direction, FunctionDef, ParKind, Prototype, TemplateDef, TypeExpr,
    TypeKind,
};
use ttcn_ast::foundation::{DefId, Identifier, RefId, Span, TypeId};

/// What a prototype requires of the return clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReturnRule {
    Value,
    Nothing,
    Integer,
}

impl<'p> Checker<'p> {
    /// Check a definition once.
    ///
    /// Reaching a definition that is still being checked reports a
    /// circular reference; the cycle is reported only once.
    pub(crate) fn chk_def(&mut self, def: DefId) {
        match self.defs.get(&def) {
            Some(CheckState::Checked) => return,
            Some(CheckState::Checking) => {
                self.report_circular(def);
                return;
            }
            None => {}
        }
        self.defs.insert(def, CheckState::Checking);
        self.def_stack.push(def);
        tracing::trace!(%def, name = %self.program.definition(def).name, "checking definition");
        self.chk_def_kind(def);
        self.def_stack.pop();
        self.defs.insert(def, CheckState::Checked);
    }

    fn report_circular(&mut self, def: DefId) {
        let program = self.program;
        let Some(start) = self.def_stack.iter().rposition(|d| *d == def) else {
            return;
        };
        let cycle: Vec<DefId> = self.def_stack[start..].to_vec();
        if cycle.iter().any(|d| self.circular_reported.contains(d)) {
            return;
        }
        self.circular_reported.extend(cycle.iter().copied());
        let chain = cycle
            .iter()
            .chain(std::iter::once(&def))
            .map(|d| format!("`{}'", program.definition(*d).name))
            .collect::<Vec<_>>()
            .join(" -> ");
        let definition = program.definition(def);
        self.emit(CompileError::new(
            ErrorKind::CircularReference,
            definition.span,
            format!("Circular reference chain: {chain}"),
        ));
    }

    fn chk_def_kind(&mut self, def: DefId) {
        let program = self.program;
        let definition = program.definition(def);
        let name = &definition.name;
        match &definition.kind {
            DefKind::Type(ty) => self.chk_type_body(*ty),
            DefKind::Const { ty, value } => {
                let ty = self.chk_type_expr(ty);
                let local = program.is_local(def);
                if !local {
                    self.push_context(Context::static_context());
                }
                self.chk_expr(value, Some(ty), ExprMode::Constant);
                if !local {
                    self.pop_context();
                }
            }
            DefKind::ExtConst { ty } => {
                self.chk_type_expr(ty);
            }
            DefKind::ModulePar { ty, default } => {
                let ty = self.chk_type_expr(ty);
                if self.is_component_internal(ty) {
                    self.emit(CompileError::new(
                        ErrorKind::ExpectedType,
                        definition.span,
                        format!(
                            "Type of module parameter `{name}' cannot be or contain a port or default type"
                        ),
                    ));
                }
                if let Some(default) = default {
                    self.push_context(Context::static_context());
                    self.chk_expr(default, Some(ty), ExprMode::Constant);
                    self.pop_context();
                }
            }
            DefKind::Var { ty, init } => {
                let ty = self.chk_type_expr(ty);
                if let Some(init) = init {
                    self.chk_expr(init, Some(ty), ExprMode::Value);
                }
            }
            DefKind::VarTemplate {
                ty,
                restriction,
                init,
            } => {
                let ty = self.chk_type_expr(ty);
                if let Some(init) = init {
                    self.chk_expr(init, Some(ty), ExprMode::Template);
                    let what = format!("template variable `{name}'");
                    if self.chk_restriction(init, *restriction, &what) {
                        if let Some(reference) = init.as_reference() {
                            self.ref_restriction_check(reference, *restriction);
                        }
                    }
                }
            }
            DefKind::Template(template) => self.chk_template(def, template),
            DefKind::Timer { dims, duration } => {
                self.chk_dims(dims, definition.span);
                if let Some(duration) = duration {
                    self.chk_expr(duration, Some(Ty::Builtin(Builtin::Float)), ExprMode::Value);
                }
            }
            DefKind::Port { port_type, dims } => {
                self.chk_dims(dims, definition.span);
                let ty = self.chk_type_expr(port_type);
                match self.refd_last(ty) {
                    Ty::Error => {}
                    Ty::Defined(body) if program.type_def(body).as_port().is_some() => {
                        self.check_port_type(body);
                    }
                    other => {
                        self.emit(CompileError::new(
                            ErrorKind::ExpectedType,
                            definition.span,
                            format!(
                                "Reference to a port type was expected for port `{name}' instead of `{}'",
                                self.type_display(other)
                            ),
                        ));
                    }
                }
            }
            DefKind::Function(function) | DefKind::ExtFunction(function) => {
                self.chk_function(def, function);
            }
            DefKind::Altstep(altstep) => {
                self.chk_formal_list(def);
                let runs_on = altstep
                    .runs_on
                    .and_then(|clause| self.chk_component_clause(clause, "runs on"));
                self.push_context(Context {
                    owner: Some(def),
                    kind: ContextKind::Altstep,
                    runs_on,
                    system: None,
                });
                self.chk_block(&altstep.body);
                self.pop_context();
            }
            DefKind::Testcase(testcase) => {
                self.chk_formal_list(def);
                let runs_on = self.chk_component_clause(testcase.runs_on, "runs on");
                let system = testcase
                    .system
                    .and_then(|clause| self.chk_component_clause(clause, "system"));
                self.push_context(Context {
                    owner: Some(def),
                    kind: ContextKind::Testcase,
                    runs_on,
                    system: system.or(runs_on),
                });
                self.chk_block(&testcase.body);
                self.pop_context();
            }
            DefKind::FormalPar(_) => {
                if let Some(owner) = program.formal_owner(def) {
                    self.chk_formal_list(owner);
                }
            }
        }
    }

    fn chk_template(&mut self, def: DefId, template: &TemplateDef) {
        let program = self.program;
        let definition = program.definition(def);
        self.chk_formal_list(def);
        self.push_context(Context::static_context());
        let ty = self.chk_type_expr(&template.ty);
        if let Some(base) = template.base {
            self.chk_modifies(def, base, ty);
        }
        self.chk_expr(&template.body, Some(ty), ExprMode::Template);
        let what = format!("template `{}'", definition.name);
        self.chk_restriction(&template.body, template.restriction, &what);
        self.pop_context();
    }

    fn chk_modifies(&mut self, def: DefId, base: RefId, ty: Ty) {
        let program = self.program;
        let node = program.reference(base);
        let Some(target) = self.resolve(base).target else {
            return;
        };
        let target_def = program.definition(target);
        if !matches!(target_def.kind, DefKind::Template(_)) {
            self.emit(CompileError::new(
                ErrorKind::InvalidReference,
                node.span,
                format!(
                    "Reference to a template was expected in the `modifies' definition instead of {} `{}'",
                    target_def.kind.description(),
                    node.display()
                ),
            ));
            return;
        }
        self.chk_def(target);
        if self.circular_reported.contains(&def) {
            return;
        }
        let base_ty = self.def_type(target);
        if !self.is_identical(ty, base_ty) {
            self.emit(CompileError::new(
                ErrorKind::TypeMismatch,
                node.span,
                format!(
                    "The modified template has different type than base template `{}': `{}' was expected instead of `{}'",
                    node.display(),
                    self.type_display(base_ty),
                    self.type_display(ty)
                ),
            ));
            return;
        }
        self.chk_compatibility(def, target, node.span);
    }

    fn chk_function(&mut self, def: DefId, function: &FunctionDef) {
        let program = self.program;
        self.chk_formal_list(def);
        let runs_on = function
            .runs_on
            .and_then(|clause| self.chk_component_clause(clause, "runs on"));
        if let Some(clause) = function.port_clause {
            if let Some(port) = self.chk_port_clause(clause) {
                self.check_port_type(port);
            }
        }
        if let Some(returns) = &function.returns {
            self.chk_type_expr(&returns.ty);
        }
        self.chk_prototype(def, function);
        if let (DefKind::Function(_), Some(body)) = (&program.definition(def).kind, &function.body) {
            self.push_context(Context {
                owner: Some(def),
                kind: ContextKind::Function,
                runs_on,
                system: None,
            });
            self.chk_block(body);
            self.pop_context();
        }
    }

    /// Component type of a `runs on` or `system` clause, reporting a clause
    /// that names something else.
    fn chk_component_clause(&mut self, clause: RefId, keyword: &str) -> Option<TypeId> {
        if let Some(component) = self.clause_component(clause) {
            return Some(component);
        }
        self.report_clause(clause, keyword, "component");
        None
    }

    fn chk_port_clause(&mut self, clause: RefId) -> Option<TypeId> {
        if let Some(port) = self.clause_port(clause) {
            return Some(port);
        }
        self.report_clause(clause, "port", "port");
        None
    }

    fn report_clause(&mut self, clause: RefId, keyword: &str, wanted: &str) {
        let program = self.program;
        let node = program.reference(clause);
        let Some(target) = self.resolve(clause).target else {
            return;
        };
        let description = match &program.definition(target).kind {
            DefKind::Type(_) => "type",
            kind => kind.description(),
        };
        self.emit(CompileError::new(
            ErrorKind::ExpectedType,
            node.span,
            format!(
                "Reference to a {wanted} type was expected in `{keyword}' clause instead of {description} `{}'",
                node.display()
            ),
        ));
    }

    // === Prototypes ===

    fn chk_prototype(&mut self, def: DefId, function: &FunctionDef) {
        use Direction::{In, Inout, Out};
        let program = self.program;
        let definition = program.definition(def);
        let prototype = function.prototype;
        let (directions, rule): (&[Direction], ReturnRule) = match prototype {
            Prototype::None => return,
            Prototype::Convert => (&[In], ReturnRule::Value),
            Prototype::Fast => (&[In, Out], ReturnRule::Nothing),
            Prototype::Backtrack => (&[In, Out], ReturnRule::Integer),
            Prototype::Sliding => (&[Inout, Out], ReturnRule::Integer),
        };
        let proto = prototype.name();
        let mut problems = Vec::new();
        let pars = &function.params.pars;
        if pars.len() != directions.len() {
            let count = if directions.len() == 1 { "one parameter" } else { "two parameters" };
            problems.push(format!(
                "The function with prototype `{proto}' must have exactly {count}"
            ));
        } else {
            for (position, (&par, &direction)) in pars.iter().zip(directions).enumerate() {
                let ok = program
                    .definition(par)
                    .kind
                    .as_formal_par()
                    .is_some_and(|p| p.kind == ParKind::Value && p.direction == direction);
                if !ok {
                    let which = if position == 0 { "first" } else { "second" };
                    problems.push(format!(
                        "The {which} parameter of a function with prototype `{proto}' must be an `{}' value parameter",
                        direction.keyword()
                    ));
                }
            }
        }
        match (rule, &function.returns) {
            (ReturnRule::Value, Some(returns)) if !returns.template => {}
            (ReturnRule::Value, _) => problems.push(format!(
                "The function with prototype `{proto}' must return a value"
            )),
            (ReturnRule::Nothing, None) => {}
            (ReturnRule::Nothing, Some(_)) => problems.push(format!(
                "The function with prototype `{proto}' cannot have a return type"
            )),
            (ReturnRule::Integer, Some(returns)) if !returns.template => {
                let ty = self.resolve_type_expr(&returns.ty);
                if !self.is_identical(ty, Ty::integer()) {
                    problems.push(format!(
                        "The function with prototype `{proto}' must return an integer value"
                    ));
                }
            }
            (ReturnRule::Integer, _) => problems.push(format!(
                "The function with prototype `{proto}' must return an integer value"
            )),
        }
        for problem in problems {
            self.emit(CompileError::new(
                ErrorKind::InvalidPrototype,
                definition.span,
                problem,
            ));
        }
    }

    /// Input and output type of a function with a prototype.
    ///
    /// The input is the first parameter; the output is the return type for
    /// `convert` and the second parameter otherwise.
    pub(crate) fn function_io_types(&mut self, def: DefId) -> Option<(Ty, Ty)> {
        let program = self.program;
        let function = program.definition(def).kind.as_function()?;
        let pars = &function.params.pars;
        let input = self.def_type(*pars.first()?);
        let output = match function.prototype {
            Prototype::None => return None,
            Prototype::Convert => self.resolve_type_expr(&function.returns.as_ref()?.ty),
            _ => self.def_type(*pars.get(1)?),
        };
        Some((input, output))
    }

    // === Type bodies ===

    /// Resolve a type expression, checking an inline body on the way.
    pub(crate) fn chk_type_expr(&mut self, ty: &TypeExpr) -> Ty {
        if let TypeExpr::Anonymous(body) = ty {
            self.chk_type_body(*body);
        }
        self.resolve_type_expr(ty)
    }

    /// Check a type body once.
    pub(crate) fn chk_type_body(&mut self, ty: TypeId) {
        if !self.type_bodies.insert(ty) {
            return;
        }
        let program = self.program;
        let body = program.type_def(ty);
        self.push_context(Context::static_context());
        match &body.kind {
            TypeKind::Alias(inner) => {
                self.chk_type_expr(inner);
                self.refd_last(Ty::Defined(ty));
            }
            TypeKind::Record(fields) | TypeKind::Set(fields) | TypeKind::Union(fields) => {
                let union = matches!(body.kind, TypeKind::Union(_));
                let mut seen: HashMap<&Identifier, Span> = HashMap::new();
                for field in fields {
                    if let Some(previous) = seen.get(&field.name) {
                        self.emit(
                            CompileError::new(
                                ErrorKind::DuplicateName,
                                field.span,
                                format!("Duplicate field name `{}'", field.name),
                            )
                            .with_label(*previous, "Field is first defined here".to_string()),
                        );
                    } else {
                        seen.insert(&field.name, field.span);
                    }
                    if union && field.optional {
                        self.emit(CompileError::new(
                            ErrorKind::InvalidValue,
                            field.span,
                            format!("Union alternative `{}' cannot be optional", field.name),
                        ));
                    }
                    self.chk_type_expr(&field.ty);
                }
            }
            TypeKind::RecordOf(element) | TypeKind::SetOf(element) => {
                self.chk_type_expr(element);
            }
            TypeKind::Array { element, dims } => {
                self.chk_dims(dims, body.span);
                self.chk_type_expr(element);
            }
            TypeKind::Enumerated(items) => {
                let mut seen = HashMap::new();
                for item in items {
                    if seen.insert(item, ()).is_some() {
                        self.emit(CompileError::new(
                            ErrorKind::DuplicateName,
                            body.span,
                            format!("Duplicate enumeration item `{item}'"),
                        ));
                    }
                }
            }
            TypeKind::Component(component) => {
                self.chk_component_extends(ty);
                for &member in &component.definitions {
                    self.chk_def(member);
                }
            }
            TypeKind::Port(_) => self.check_port_type(ty),
            TypeKind::Signature(signature) => {
                let mut seen = HashMap::new();
                for param in &signature.params {
                    if seen.insert(&param.name, ()).is_some() {
                        self.emit(CompileError::new(
                            ErrorKind::DuplicateName,
                            body.span,
                            format!("Duplicate parameter `{}' in signature", param.name),
                        ));
                    }
                    self.chk_type_expr(&param.ty);
                }
                if let Some(returns) = &signature.returns {
                    if signature.nonblocking {
                        self.emit(CompileError::new(
                            ErrorKind::InvalidValue,
                            body.span,
                            "A non-blocking signature cannot have a return type".to_string(),
                        ));
                    }
                    self.chk_type_expr(returns);
                }
                for exception in &signature.exceptions {
                    self.chk_type_expr(exception);
                }
            }
        }
        self.pop_context();
    }

    fn chk_dims(&mut self, dims: &[ArrayDim], span: Span) {
        for dim in dims {
            if dim.size == 0 {
                self.emit(CompileError::new(
                    ErrorKind::InvalidValue,
                    span,
                    "Array dimension must be a positive integer value instead of 0".to_string(),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckConfig;
    use ttcn_ast::ast::{Expr, ExprKind, BinaryOp, FormalPar, TemplateRestriction};
    use ttcn_ast::ProgramBuilder;

    const INT: TypeExpr = TypeExpr::Builtin(Builtin::Integer);

    fn messages(checker: &Checker<'_>) -> Vec<String> {
        checker
            .diagnostics()
            .iter()
            .map(|d| d.message.clone())
            .collect()
    }

    #[test]
    fn test_circular_constants_reported_once() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let to_b = b.ref_expr("b");
        let a = b.constant(m, "a", INT, to_b);
        let to_a = b.ref_expr("a");
        let c = b.constant(m, "b", INT, to_a);
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        checker.chk_def(a);
        checker.chk_def(c);
        checker.chk_def(a);
        assert_eq!(
            messages(&checker),
            vec!["Circular reference chain: `a' -> `b' -> `a'"]
        );
        assert_eq!(checker.diagnostics()[0].kind, ErrorKind::CircularReference);
    }

    #[test]
    fn test_self_referencing_constant() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let own = b.ref_expr("c");
        let value = Expr::synthetic(ExprKind::Binary {
            op: BinaryOp::Add,
            lhs: Box::new(own),
            rhs: Box::new(Expr::int(1)),
        });
        let c = b.constant(m, "c", INT, value);
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        checker.chk_def(c);
        checker.chk_def(c);
        assert_eq!(messages(&checker), vec!["Circular reference chain: `c' -> `c'"]);
    }

    #[test]
    fn test_modifies_chain() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let base_ref = b.reference("t2");
        let t1 = b.template(
            m,
            "t1",
            TemplateDef {
                ty: INT,
                restriction: TemplateRestriction::None,
                params: None,
                base: Some(base_ref),
                body: Expr::any_value(),
            },
        );
        let back_ref = b.reference("t1");
        b.template(
            m,
            "t2",
            TemplateDef {
                ty: INT,
                restriction: TemplateRestriction::None,
                params: None,
                base: Some(back_ref),
                body: Expr::int(1),
            },
        );
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        checker.chk_def(t1);
        assert_eq!(
            messages(&checker),
            vec!["Circular reference chain: `t1' -> `t2' -> `t1'"]
        );
    }

    #[test]
    fn test_modified_template_must_keep_type() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        b.template(
            m,
            "base",
            TemplateDef {
                ty: INT,
                restriction: TemplateRestriction::None,
                params: None,
                base: None,
                body: Expr::int(1),
            },
        );
        let base_ref = b.reference("base");
        let derived = b.template(
            m,
            "derived",
            TemplateDef {
                ty: TypeExpr::Builtin(Builtin::Boolean),
                restriction: TemplateRestriction::None,
                params: None,
                base: Some(base_ref),
                body: Expr::boolean(true),
            },
        );
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        checker.chk_def(derived);
        assert_eq!(checker.diagnostics().len(), 1);
        assert!(checker.diagnostics()[0]
            .message
            .starts_with("The modified template has different type than base template `base'"));
    }

    #[test]
    fn test_prototype_shapes() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let input = b.formal("i", FormalPar::value(INT));
        let extra = b.formal("j", FormalPar::value(INT));
        let convert = b.function(
            m,
            "conv",
            FunctionDef::new(vec![input, extra]).prototype(Prototype::Convert),
        );
        let fast_in = b.formal("i", FormalPar::value(INT));
        let fast_out = b.formal("o", FormalPar::value(INT).direction(Direction::Out));
        let fast = b.function(
            m,
            "fast",
            FunctionDef::new(vec![fast_in, fast_out]).prototype(Prototype::Fast),
        );
        let bt_in = b.formal("i", FormalPar::value(INT));
        let bt_out = b.formal("o", FormalPar::value(INT));
        let backtrack = b.function(
            m,
            "bt",
            FunctionDef::new(vec![bt_in, bt_out])
                .returns(TypeExpr::Builtin(Builtin::Boolean))
                .prototype(Prototype::Backtrack),
        );
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        checker.chk_def(convert);
        checker.chk_def(fast);
        checker.chk_def(backtrack);
        assert_eq!(
            messages(&checker),
            vec![
                "The function with prototype `convert' must have exactly one parameter",
                "The function with prototype `convert' must return a value",
                "The second parameter of a function with prototype `backtrack' must be an `out' value parameter",
                "The function with prototype `backtrack' must return an integer value",
            ]
        );
        assert_eq!(
            checker.function_io_types(fast),
            Some((Ty::integer(), Ty::integer()))
        );
    }

    #[test]
    fn test_runs_on_clause_must_name_component() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        b.constant(m, "k", INT, Expr::int(1));
        let clause = b.reference("k");
        let f = b.function(m, "f", FunctionDef::new(Vec::new()).runs_on(clause));
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        checker.chk_def(f);
        assert_eq!(
            messages(&checker),
            vec!["Reference to a component type was expected in `runs on' clause instead of constant `k'"]
        );
    }

    #[test]
    fn test_type_body_checks() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let first = b.field("a", INT, false);
        let second = b.field("a", INT, true);
        let record = b.type_def(m, "R", TypeKind::Record(vec![first, second]));
        let array = b.type_def(
            m,
            "A",
            TypeKind::Array {
                element: INT,
                dims: vec![ArrayDim::new(0)],
            },
        );
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        checker.chk_def(record);
        checker.chk_def(array);
        checker.chk_def(record);
        assert_eq!(
            messages(&checker),
            vec![
                "Duplicate field name `a'",
                "Array dimension must be a positive integer value instead of 0",
            ]
        );
    }
}
