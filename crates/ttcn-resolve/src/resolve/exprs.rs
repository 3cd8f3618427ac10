//! Expression checking.
//!
//! Values and templates share one expression tree; the caller decides how
//! an expression is used through [`ExprMode`]:
//!
//! - `Constant` - module-level constants and module parameter defaults;
//!   only static values may be referenced
//! - `Value` - a specific value; matching symbols are rejected
//! - `Template` - matching symbols (`?`, `*`, value lists, ranges, ...)
//!   are allowed
//!
//! Checking an expression against an expected type returns the type the
//! expression has. Mismatches are reported here, so callers only look at
//! the result to continue navigation.

use crate::error::{CompileError, ErrorKind};
use crate::resolve::checker::{Checker, ContextKind};
use crate::resolve::types::Ty;
use std::collections::{HashMap, HashSet};
use ttcn_ast::ast::{
    Builtin, ComponentKeyword, DefKind, Expr, ExprKind, IndexedExpr, NamedExpr, ParKind,
    SubRef, TypeKind, UnaryOp,
};
use ttcn_ast::foundation::{DefId, RefId, Span};

/// How an expression is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExprMode {
    Constant,
    Value,
    Template,
}

impl ExprMode {
    /// Mode of the operands of an operator.
    fn operands(self) -> ExprMode {
        match self {
            ExprMode::Template => ExprMode::Value,
            other => other,
        }
    }
}

/// Where inside an enclosing list an expression stands.
#[derive(Debug, Clone, Copy, Default)]
struct Position {
    /// Element of value list notation; `-` is allowed
    in_list: bool,
    /// Value of an optional field; `omit` is allowed
    omit_ok: bool,
}

impl<'p> Checker<'p> {
    /// Check an expression and return its type.
    pub(crate) fn chk_expr(&mut self, expr: &Expr, expected: Option<Ty>, mode: ExprMode) -> Ty {
        self.chk_expr_at(expr, expected, mode, Position::default())
    }

    /// Check the value assigned to a field that may be omitted.
    pub(crate) fn chk_expr_omittable(
        &mut self,
        expr: &Expr,
        expected: Option<Ty>,
        mode: ExprMode,
    ) -> Ty {
        let position = Position {
            omit_ok: true,
            ..Position::default()
        };
        self.chk_expr_at(expr, expected, mode, position)
    }

    fn chk_expr_at(
        &mut self,
        expr: &Expr,
        expected: Option<Ty>,
        mode: ExprMode,
        position: Position,
    ) -> Ty {
        let literal = |builtin| Some(Ty::Builtin(builtin));
        let ty = match &expr.kind {
            ExprKind::Integer(_) => literal(Builtin::Integer),
            ExprKind::Float(_) => literal(Builtin::Float),
            ExprKind::Boolean(_) => literal(Builtin::Boolean),
            ExprKind::Charstring(_) => literal(Builtin::Charstring),
            ExprKind::Bitstring(_) => literal(Builtin::Bitstring),
            ExprKind::Hexstring(_) => literal(Builtin::Hexstring),
            ExprKind::Octetstring(_) => literal(Builtin::Octetstring),
            ExprKind::Verdict(_) => literal(Builtin::Verdict),
            ExprKind::Ref(reference) => Some(self.chk_value_ref(*reference, expected, mode)),
            ExprKind::Unary { op, operand } => {
                let operand_mode = mode.operands();
                Some(match op {
                    UnaryOp::Not => {
                        self.chk_expr(operand, Some(Ty::Builtin(Builtin::Boolean)), operand_mode)
                    }
                    UnaryOp::Neg => self.chk_expr(operand, expected, operand_mode),
                })
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let operand_mode = mode.operands();
                let lhs_ty = if op.yields_boolean() {
                    self.chk_expr(lhs, None, operand_mode)
                } else {
                    self.chk_expr(lhs, expected, operand_mode)
                };
                self.chk_expr(rhs, Some(lhs_ty), operand_mode);
                if op.yields_boolean() {
                    literal(Builtin::Boolean)
                } else {
                    Some(lhs_ty)
                }
            }
            ExprKind::Concat { lhs, rhs } => Some(self.chk_concat(expr, lhs, rhs, expected, mode)),
            ExprKind::Omit => {
                if mode != ExprMode::Template && !position.omit_ok {
                    self.emit(CompileError::new(
                        ErrorKind::InvalidValue,
                        expr.span,
                        "`omit' value is not allowed in this context".to_string(),
                    ));
                }
                None
            }
            ExprKind::NotUsed => {
                if !position.in_list {
                    self.emit(CompileError::new(
                        ErrorKind::InvalidValue,
                        expr.span,
                        "Not used symbol (`-') is not allowed in this context".to_string(),
                    ));
                }
                None
            }
            ExprKind::AnyValue
            | ExprKind::AnyOrOmit
            | ExprKind::ValueList(_)
            | ExprKind::Complement(_)
            | ExprKind::Range { .. }
            | ExprKind::DecodeMatch { .. } => {
                if mode == ExprMode::Template {
                    self.chk_matching(expr, expected);
                } else {
                    self.emit(CompileError::new(
                        ErrorKind::InvalidValue,
                        expr.span,
                        format!(
                            "A specific value was expected instead of {}",
                            matching_description(&expr.kind)
                        ),
                    ));
                }
                None
            }
            ExprKind::List(items) => {
                self.chk_list(items, expected, mode, expr.span);
                None
            }
            ExprKind::NamedList(items) => {
                self.chk_named_list(items, expected, mode, expr.span);
                None
            }
            ExprKind::IndexedList(items) => {
                self.chk_indexed_list(items, expected, mode, expr.span);
                None
            }
            ExprKind::Invoke { callee, args } => {
                self.chk_expr(callee, None, ExprMode::Value);
                for arg in args {
                    self.chk_expr(arg, None, ExprMode::Value);
                }
                if mode == ExprMode::Constant {
                    self.emit(CompileError::new(
                        ErrorKind::InvalidValue,
                        expr.span,
                        "Reference to a static value was expected instead of a function invocation"
                            .to_string(),
                    ));
                }
                Some(Ty::Error)
            }
            ExprKind::Component(keyword) => Some(self.chk_component_keyword(*keyword, expr.span, mode)),
        };
        match (ty, expected) {
            (Some(ty), Some(expected)) => {
                self.chk_type_match(expected, ty, expr.span);
                ty
            }
            (Some(ty), None) => ty,
            (None, Some(expected)) => expected,
            (None, None) => Ty::Error,
        }
    }

    /// Report a value of type `actual` where `expected` is needed.
    pub(crate) fn chk_type_match(&mut self, expected: Ty, actual: Ty, span: Span) -> bool {
        if self.is_compatible(expected, actual) {
            return true;
        }
        self.emit(CompileError::new(
            ErrorKind::TypeMismatch,
            span,
            format!(
                "Type mismatch: a value or template of type `{}' was expected instead of `{}'",
                self.type_display(expected),
                self.type_display(actual)
            ),
        ));
        false
    }

    fn chk_concat(&mut self, expr: &Expr, lhs: &Expr, rhs: &Expr, expected: Option<Ty>, mode: ExprMode) -> Ty {
        let lhs_ty = self.chk_expr(lhs, expected, mode);
        self.chk_expr(rhs, Some(lhs_ty), mode);
        let is_template = !self.is_value(lhs) || !self.is_value(rhs);
        if is_template && !self.config.runtime.allows_template_concatenation() {
            self.emit(CompileError::new(
                ErrorKind::InvalidValue,
                expr.span,
                "Concatenation of templates is only allowed in the function-test runtime"
                    .to_string(),
            ));
        }
        let concatenable = match self.refd_last(lhs_ty) {
            Ty::Builtin(builtin) => builtin.is_string(),
            Ty::Error => true,
            last => matches!(
                self.last_kind(last),
                Some(TypeKind::RecordOf(_) | TypeKind::SetOf(_) | TypeKind::Array { .. })
            ),
        };
        if !concatenable {
            self.emit(CompileError::new(
                ErrorKind::TypeMismatch,
                expr.span,
                format!(
                    "Operands of `&' must be strings or lists instead of `{}'",
                    self.type_display(lhs_ty)
                ),
            ));
            return Ty::Error;
        }
        lhs_ty
    }

    fn chk_matching(&mut self, expr: &Expr, expected: Option<Ty>) {
        match &expr.kind {
            ExprKind::ValueList(items) | ExprKind::Complement(items) => {
                for item in items {
                    self.chk_expr(item, expected, ExprMode::Template);
                }
            }
            ExprKind::Range { lower, upper } => {
                if let Some(expected) = expected {
                    let ordered = match self.refd_last(expected) {
                        Ty::Builtin(builtin) => builtin.is_ordered(),
                        Ty::Error => true,
                        _ => false,
                    };
                    if !ordered {
                        self.emit(CompileError::new(
                            ErrorKind::TypeMismatch,
                            expr.span,
                            format!(
                                "Range matching cannot be used for type `{}'",
                                self.type_display(expected)
                            ),
                        ));
                        return;
                    }
                }
                self.chk_expr(lower, expected, ExprMode::Value);
                self.chk_expr(upper, expected, ExprMode::Value);
            }
            ExprKind::DecodeMatch { target, .. } => {
                if let Some(expected) = expected {
                    let stream = match self.refd_last(expected) {
                        Ty::Builtin(builtin) => builtin.is_string(),
                        Ty::Error => true,
                        _ => false,
                    };
                    if !stream {
                        self.emit(CompileError::new(
                            ErrorKind::TypeMismatch,
                            expr.span,
                            format!(
                                "Decoded content matching cannot be used for type `{}'",
                                self.type_display(expected)
                            ),
                        ));
                    }
                }
                self.chk_expr(target, None, ExprMode::Template);
            }
            _ => {}
        }
    }

    // === List notations ===

    fn chk_list(&mut self, items: &[Expr], expected: Option<Ty>, mode: ExprMode, span: Span) {
        let in_list = Position {
            in_list: true,
            omit_ok: false,
        };
        let Some(expected) = expected else {
            for item in items {
                self.chk_expr_at(item, None, mode, in_list);
            }
            return;
        };
        let last = self.refd_last(expected);
        if last.is_error() {
            return;
        }
        if let Some((element, dims)) = self.array_shape(last) {
            let size = dims[0].size as usize;
            let open_ended = mode == ExprMode::Template
                && items.iter().any(|i| matches!(i.kind, ExprKind::AnyOrOmit));
            if !open_ended && items.len() != size {
                let which = if items.len() > size { "many" } else { "few" };
                self.emit(CompileError::new(
                    ErrorKind::InvalidValue,
                    span,
                    format!(
                        "Too {which} elements in the array value: {size} was expected instead of {}",
                        items.len()
                    ),
                ));
            }
            let element = match last {
                Ty::Defined(array) if dims.len() > 1 => Ty::ArraySlice { array, consumed: 1 },
                Ty::ArraySlice { array, consumed } if dims.len() > 1 => Ty::ArraySlice {
                    array,
                    consumed: consumed + 1,
                },
                _ => self.resolve_type_expr(element),
            };
            for item in items {
                self.chk_expr_at(item, Some(element), mode, in_list);
            }
            return;
        }
        let display = self.type_display(expected);
        match self.last_kind(last) {
            Some(TypeKind::RecordOf(element) | TypeKind::SetOf(element)) => {
                let element = self.resolve_type_expr(element);
                for item in items {
                    self.chk_expr_at(item, Some(element), mode, in_list);
                }
            }
            Some(TypeKind::Record(fields) | TypeKind::Set(fields)) => {
                if items.len() != fields.len() {
                    let which = if items.len() > fields.len() { "many" } else { "few" };
                    self.emit(CompileError::new(
                        ErrorKind::InvalidValue,
                        span,
                        format!(
                            "Too {which} elements in value list notation for type `{display}': {} was expected instead of {}",
                            fields.len(),
                            items.len()
                        ),
                    ));
                }
                for (item, field) in items.iter().zip(fields.iter()) {
                    let field_ty = self.resolve_type_expr(&field.ty);
                    let position = Position {
                        in_list: true,
                        omit_ok: field.optional,
                    };
                    self.chk_expr_at(item, Some(field_ty), mode, position);
                }
            }
            _ => {
                self.emit(CompileError::new(
                    ErrorKind::TypeMismatch,
                    span,
                    format!("Value list notation cannot be used for type `{display}'"),
                ));
            }
        }
    }

    fn chk_named_list(&mut self, items: &[NamedExpr], expected: Option<Ty>, mode: ExprMode, span: Span) {
        let Some(expected) = expected else {
            for item in items {
                self.chk_expr(&item.value, None, mode);
            }
            return;
        };
        let last = self.refd_last(expected);
        if last.is_error() {
            return;
        }
        let display = self.type_display(expected);
        let kind = self.last_kind(last);
        let (fields, is_union, ordered) = match kind {
            Some(TypeKind::Record(fields)) => (fields, false, true),
            Some(TypeKind::Set(fields)) => (fields, false, false),
            Some(TypeKind::Union(fields)) => (fields, true, false),
            _ => {
                self.emit(CompileError::new(
                    ErrorKind::TypeMismatch,
                    span,
                    format!("Assignment notation cannot be used for type `{display}'"),
                ));
                return;
            }
        };
        let what = match kind {
            Some(TypeKind::Record(_)) => "record",
            Some(TypeKind::Set(_)) => "set",
            _ => "union",
        };
        if is_union && items.len() != 1 {
            self.emit(CompileError::new(
                ErrorKind::InvalidValue,
                span,
                format!(
                    "A value of union type `{display}' must contain exactly one field instead of {}",
                    items.len()
                ),
            ));
        }
        let mut seen: HashSet<&str> = HashSet::new();
        let mut last_index: Option<usize> = None;
        for item in items {
            let Some(index) = fields.iter().position(|f| f.name == item.name) else {
                self.emit(CompileError::new(
                    ErrorKind::InvalidSubReference,
                    item.value.span,
                    format!(
                        "Reference to non-existent field `{}' in {what} value for type `{display}'",
                        item.name
                    ),
                ));
                self.chk_expr(&item.value, None, mode);
                continue;
            };
            if !seen.insert(item.name.display_name()) {
                self.emit(CompileError::new(
                    ErrorKind::DuplicateName,
                    item.value.span,
                    format!("Duplicate field `{}' in {what} value", item.name),
                ));
                continue;
            }
            if ordered {
                if let Some(previous) = last_index.filter(|p| *p > index) {
                    self.emit(CompileError::new(
                        ErrorKind::InvalidValue,
                        item.value.span,
                        format!(
                            "Field `{}' cannot appear after field `{}' in record value",
                            item.name, fields[previous].name
                        ),
                    ));
                }
                last_index = Some(last_index.map_or(index, |p| p.max(index)));
            }
            let field = &fields[index];
            let field_ty = self.resolve_type_expr(&field.ty);
            let position = Position {
                in_list: false,
                omit_ok: field.optional,
            };
            self.chk_expr_at(&item.value, Some(field_ty), mode, position);
        }
    }

    fn chk_indexed_list(
        &mut self,
        items: &[IndexedExpr],
        expected: Option<Ty>,
        mode: ExprMode,
        span: Span,
    ) {
        let element = match expected {
            None => None,
            Some(expected) => {
                let last = self.refd_last(expected);
                if last.is_error() {
                    None
                } else if let Some((element, dims)) = self.array_shape(last) {
                    match last {
                        Ty::Defined(array) if dims.len() > 1 => {
                            Some(Ty::ArraySlice { array, consumed: 1 })
                        }
                        Ty::ArraySlice { array, consumed } if dims.len() > 1 => {
                            Some(Ty::ArraySlice {
                                array,
                                consumed: consumed + 1,
                            })
                        }
                        _ => Some(self.resolve_type_expr(element)),
                    }
                } else if let Some(TypeKind::RecordOf(element) | TypeKind::SetOf(element)) =
                    self.last_kind(last)
                {
                    Some(self.resolve_type_expr(element))
                } else {
                    self.emit(CompileError::new(
                        ErrorKind::TypeMismatch,
                        span,
                        format!(
                            "Indexed assignment notation cannot be used for type `{}'",
                            self.type_display(expected)
                        ),
                    ));
                    return;
                }
            }
        };
        let mut seen: HashMap<i64, usize> = HashMap::new();
        for (position, item) in items.iter().enumerate() {
            self.chk_expr(&item.index, Some(Ty::integer()), ExprMode::Value);
            if let Some(index) = self.constant_integer(&item.index) {
                if index < 0 {
                    self.emit(CompileError::new(
                        ErrorKind::InvalidValue,
                        item.index.span,
                        format!(
                            "A non-negative integer value was expected as index instead of {index}"
                        ),
                    ));
                } else if let Some(first) = seen.insert(index, position) {
                    self.emit(CompileError::new(
                        ErrorKind::InvalidValue,
                        item.index.span,
                        format!(
                            "Duplicate index value `{index}' for components {} and {}",
                            first + 1,
                            position + 1
                        ),
                    ));
                }
            }
            self.chk_expr(&item.value, element, mode);
        }
    }

    // === References ===

    /// Check a reference used as a value or template.
    pub(crate) fn chk_value_ref(&mut self, reference: RefId, expected: Option<Ty>, mode: ExprMode) -> Ty {
        if let Some(ty) = self.enum_item_shortcut(reference, expected) {
            return ty;
        }
        let program = self.program;
        let node = program.reference(reference);
        let resolved = self.resolve(reference);
        let Some(def) = resolved.target else {
            return resolved.ty();
        };
        let definition = program.definition(def);
        let kind = &definition.kind;
        let name = node.display();
        let description = kind.description();

        let not_a_value = match kind {
            DefKind::Type(_)
            | DefKind::Timer { .. }
            | DefKind::Port { .. }
            | DefKind::Altstep(_)
            | DefKind::Testcase(_) => Some(format!("{description} `{name}'")),
            DefKind::FormalPar(par) if matches!(par.kind, ParKind::Timer | ParKind::Port) => {
                Some(format!("{description} `{name}'"))
            }
            DefKind::Function(function) | DefKind::ExtFunction(function) => {
                match &function.returns {
                    None => Some(format!(
                        "a call of {description} `{name}', which does not have return type"
                    )),
                    Some(returns) if returns.template && mode != ExprMode::Template => Some(format!(
                        "a call of {description} `{name}', which returns a template"
                    )),
                    Some(_) => None,
                }
            }
            DefKind::Template(_) | DefKind::VarTemplate { .. } if mode != ExprMode::Template => {
                Some(format!("{description} `{name}'"))
            }
            DefKind::FormalPar(par) if par.kind == ParKind::Template && mode != ExprMode::Template => {
                Some(format!("{description} `{name}'"))
            }
            _ => None,
        };
        if let Some(what) = not_a_value {
            let expectation = if mode == ExprMode::Template {
                "a value or template"
            } else {
                "a value"
            };
            self.emit(CompileError::new(
                ErrorKind::InvalidReference,
                node.span,
                format!("Reference to {expectation} was expected instead of {what}"),
            ));
            return Ty::Error;
        }

        let parameterized = match kind {
            DefKind::Function(_) | DefKind::ExtFunction(_) => true,
            DefKind::Template(template) => template.params.is_some(),
            _ => false,
        };
        if parameterized && node.params.is_none() {
            self.emit(CompileError::new(
                ErrorKind::ParameterMismatch,
                node.span,
                format!("Reference to parameterized definition `{name}' without actual parameter list"),
            ));
            return Ty::Error;
        }

        if mode == ExprMode::Constant && !is_static(kind) {
            self.emit(CompileError::new(
                ErrorKind::InvalidReference,
                node.span,
                format!("Reference to a static value was expected instead of {description} `{name}'"),
            ));
            return Ty::Error;
        }

        match kind {
            DefKind::Const { .. } | DefKind::Template(_) => self.chk_def(def),
            DefKind::Function(_) | DefKind::ExtFunction(_) => {
                self.chk_runs_on_compat(def, node.span);
            }
            _ => {}
        }
        resolved.ty()
    }

    /// A bare identifier naming an item of the expected enumerated type.
    ///
    /// The item wins over definitions of the same name when the context
    /// expects that enumerated type.
    fn enum_item_shortcut(&mut self, reference: RefId, expected: Option<Ty>) -> Option<Ty> {
        let expected = expected?;
        if self.is_resolved(reference) {
            let resolved = self.resolve(reference);
            return resolved.enum_item.map(Ty::Defined);
        }
        let program = self.program;
        let node = program.reference(reference);
        if node.modid.is_some() || node.params.is_some() || node.parts.len() != 1 {
            return None;
        }
        let SubRef::Field { name, .. } = &node.parts[0] else {
            return None;
        };
        let Ty::Defined(body) = self.refd_last(expected) else {
            return None;
        };
        match &program.type_def(body).kind {
            TypeKind::Enumerated(items) if items.contains(name) => {
                self.resolve_as_enum_item(reference, body);
                Some(Ty::Defined(body))
            }
            _ => None,
        }
    }

    /// Check that the current behaviour may call `callee` with respect to
    /// their `runs on` clauses.
    pub(crate) fn chk_runs_on_compat(&mut self, callee: DefId, span: Span) {
        let program = self.program;
        let kind = &program.definition(callee).kind;
        if matches!(kind, DefKind::Testcase(_)) {
            return;
        }
        let Some(clause) = kind.runs_on() else {
            return;
        };
        let Some(required) = self.clause_component(clause) else {
            return;
        };
        let context = self.context();
        let name = &program.definition(callee).name;
        let required_name = self.type_display(Ty::Defined(required));
        match context.runs_on {
            None => {
                if context.kind == ContextKind::Static {
                    return;
                }
                self.emit(CompileError::new(
                    ErrorKind::InvalidStatement,
                    span,
                    format!(
                        "A definition without `runs on' clause cannot call {} `{name}', which runs on component type `{required_name}'",
                        kind.description()
                    ),
                ));
            }
            Some(current) => {
                if !self.component_extends(current, required) {
                    self.emit(CompileError::new(
                        ErrorKind::InvalidStatement,
                        span,
                        format!(
                            "Runs on clause mismatch: A definition that runs on component type `{}' cannot call {} `{name}', which runs on `{required_name}'",
                            self.type_display(Ty::Defined(current)),
                            kind.description()
                        ),
                    ));
                }
            }
        }
    }

    fn chk_component_keyword(&mut self, keyword: ComponentKeyword, span: Span, mode: ExprMode) -> Ty {
        let context = self.context();
        let name = match keyword {
            ComponentKeyword::Mtc => "mtc",
            ComponentKeyword::System => "system",
            ComponentKeyword::SelfComponent => "self",
        };
        if mode == ExprMode::Constant || matches!(context.kind, ContextKind::Control | ContextKind::Static) {
            let place = if context.kind == ContextKind::Control {
                "the control part"
            } else {
                "a static context"
            };
            self.emit(CompileError::new(
                ErrorKind::InvalidValue,
                span,
                format!("Component reference `{name}' cannot be used in {place}"),
            ));
            return Ty::Error;
        }
        let component = match keyword {
            ComponentKeyword::SelfComponent => context.runs_on,
            ComponentKeyword::Mtc if context.kind == ContextKind::Testcase => context.runs_on,
            ComponentKeyword::System => context.system,
            ComponentKeyword::Mtc => None,
        };
        component.map_or(Ty::Error, Ty::Defined)
    }
}

/// Whether a definition may be referenced from a constant.
fn is_static(kind: &DefKind) -> bool {
    matches!(
        kind,
        DefKind::Type(_) | DefKind::Const { .. } | DefKind::ExtConst { .. } | DefKind::Template(_)
    )
}

pub(crate) fn matching_description(kind: &ExprKind) -> &'static str {
    match kind {
        ExprKind::AnyValue => "`?'",
        ExprKind::AnyOrOmit => "`*'",
        ExprKind::ValueList(_) => "value list match",
        ExprKind::Complement(_) => "complemented list match",
        ExprKind::Range { .. } => "range match",
        ExprKind::DecodeMatch { .. } => "decoded content match",
        _ => "a template",
    }
}
