//! Field and index navigation.
//!
//! The parts of a reference after its head select into the head's value:
//! `.f` picks a field of a record, set or union; `[i]` picks an element of
//! a record-of, set-of, array or string. Each step is recorded as an
//! [`AccessStep`] for code emission.
//!
//! Multi-dimensional arrays are indexed one dimension at a time; the type
//! between two brackets is a [`Ty::ArraySlice`]. Indexing a string yields a
//! string element, which cannot be navigated further and cannot be passed
//! by reference.

use crate::error::{CompileError, ErrorKind};
use crate::resolve::checker::Checker;
use crate::resolve::exprs::ExprMode;
use crate::resolve::types::Ty;
use serde::Serialize;
use ttcn_ast::ast::{ArrayDim, DefKind, Expr, ExprKind, SubRef, TypeKind, UnaryOp};
use ttcn_ast::foundation::{Identifier, Span};

/// One selection step of a resolved reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AccessStep {
    /// `.name`; `unwrap_optional` when an optional field is navigated into
    Field { name: Identifier, unwrap_optional: bool },
    /// `[..]` at reference part `part`
    Index { container: IndexedContainer, part: usize },
}

/// What an index step indexes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IndexedContainer {
    /// Record-of or set-of; elements can be added and moved at runtime
    RecordOf,
    /// One dimension of a fixed-size array, indices start at `offset`
    Array { dimension: usize, offset: i64 },
    /// Character or bit of a string
    StringElement,
    /// One dimension of a timer or port array definition
    DefinitionArray { dimension: usize, offset: i64 },
}

#[derive(Debug, Clone)]
pub(crate) struct Navigation {
    pub ty: Ty,
    pub path: Vec<AccessStep>,
    pub string_element: bool,
    pub through_optional: bool,
}

const MAX_CONSTANT_DEPTH: usize = 16;

impl<'p> Checker<'p> {
    /// Walk `parts` starting from a value of type `base`.
    ///
    /// `first_part` is the index of `parts[0]` within the whole reference.
    /// Navigation stops at the first error; the result type is then
    /// [`Ty::Error`].
    pub(crate) fn navigate(&mut self, base: Ty, parts: &[SubRef], first_part: usize) -> Navigation {
        let mut nav = Navigation {
            ty: base,
            path: Vec::new(),
            string_element: false,
            through_optional: false,
        };
        let program = self.program;
        for (offset, part) in parts.iter().enumerate() {
            let last = offset + 1 == parts.len();
            if nav.string_element {
                self.emit(CompileError::new(
                    ErrorKind::InvalidSubReference,
                    part.span(),
                    "Invalid sub-reference: a string element cannot be indexed or have fields"
                        .to_string(),
                ));
                nav.ty = Ty::Error;
                return nav;
            }
            let current = self.refd_last(nav.ty);
            if current.is_error() {
                return nav;
            }
            match part {
                SubRef::Field { name, span } => {
                    let fields = match current {
                        Ty::Defined(body) => program.type_def(body).kind.fields(),
                        _ => None,
                    };
                    let Some(fields) = fields else {
                        self.emit(CompileError::new(
                            ErrorKind::InvalidSubReference,
                            *span,
                            format!(
                                "Invalid field reference `{name}': type `{}' does not have fields",
                                self.type_display(nav.ty)
                            ),
                        ));
                        nav.ty = Ty::Error;
                        return nav;
                    };
                    let Some(field) = fields.iter().find(|f| &f.name == name) else {
                        self.emit(CompileError::new(
                            ErrorKind::InvalidSubReference,
                            *span,
                            format!(
                                "Reference to non-existent field `{name}' in type `{}'",
                                self.type_display(nav.ty)
                            ),
                        ));
                        nav.ty = Ty::Error;
                        return nav;
                    };
                    nav.through_optional |= field.optional;
                    nav.path.push(AccessStep::Field {
                        name: name.clone(),
                        unwrap_optional: field.optional && !last,
                    });
                    nav.ty = self.resolve_type_expr(&field.ty);
                }
                SubRef::Index { index, span } => {
                    self.chk_expr(index, Some(Ty::integer()), ExprMode::Value);
                    let value = self.constant_integer(index);
                    let part_index = first_part + offset;
                    match self.index_step(current, value, *span, part_index) {
                        Some((step, ty)) => {
                            if matches!(
                                step,
                                AccessStep::Index {
                                    container: IndexedContainer::StringElement,
                                    ..
                                }
                            ) {
                                nav.string_element = true;
                            }
                            nav.path.push(step);
                            nav.ty = ty;
                        }
                        None => {
                            nav.ty = Ty::Error;
                            return nav;
                        }
                    }
                }
            }
        }
        nav
    }

    fn index_step(
        &mut self,
        current: Ty,
        value: Option<i64>,
        span: Span,
        part: usize,
    ) -> Option<(AccessStep, Ty)> {
        if let Some((element, dims)) = self.array_shape(current) {
            let dim = dims[0];
            if let Some(value) = value {
                if !self.chk_array_index(dim, value, span) {
                    return None;
                }
            }
            let (array, consumed) = match current {
                Ty::ArraySlice { array, consumed } => (array, consumed),
                Ty::Defined(array) => (array, 0),
                _ => return None,
            };
            let ty = if dims.len() > 1 {
                Ty::ArraySlice {
                    array,
                    consumed: consumed + 1,
                }
            } else {
                self.resolve_type_expr(element)
            };
            let container = IndexedContainer::Array {
                dimension: consumed,
                offset: dim.start,
            };
            return Some((AccessStep::Index { container, part }, ty));
        }
        let program = self.program;
        match current {
            Ty::Defined(body) => match &program.type_def(body).kind {
                TypeKind::RecordOf(element) | TypeKind::SetOf(element) => {
                    if let Some(value) = value.filter(|v| *v < 0) {
                        self.emit(CompileError::new(
                            ErrorKind::InvalidValue,
                            span,
                            format!(
                                "A non-negative integer value was expected as index instead of {value}"
                            ),
                        ));
                        return None;
                    }
                    let ty = self.resolve_type_expr(element);
                    let container = IndexedContainer::RecordOf;
                    Some((AccessStep::Index { container, part }, ty))
                }
                _ => {
                    self.not_indexable(current, span);
                    None
                }
            },
            Ty::Builtin(builtin) if builtin.is_string() => {
                let container = IndexedContainer::StringElement;
                Some((AccessStep::Index { container, part }, current))
            }
            _ => {
                self.not_indexable(current, span);
                None
            }
        }
    }

    fn not_indexable(&mut self, ty: Ty, span: Span) {
        self.emit(CompileError::new(
            ErrorKind::InvalidSubReference,
            span,
            format!("Type `{}' cannot be indexed", self.type_display(ty)),
        ));
    }

    fn chk_array_index(&mut self, dim: ArrayDim, value: i64, span: Span) -> bool {
        if value < dim.start {
            self.emit(CompileError::new(
                ErrorKind::InvalidValue,
                span,
                format!(
                    "Array index underflow: the index value must be at least {} instead of {value}",
                    dim.start
                ),
            ));
            return false;
        }
        if i128::from(value) > dim.end() {
            self.emit(CompileError::new(
                ErrorKind::InvalidValue,
                span,
                format!(
                    "Array index overflow: the index value must be at most {} instead of {value}",
                    dim.end()
                ),
            ));
            return false;
        }
        true
    }

    /// Index the dimensions of a timer or port array definition.
    ///
    /// Returns the steps and the number of dimensions left unindexed.
    pub(crate) fn navigate_dims(
        &mut self,
        dims: &[ArrayDim],
        parts: &[SubRef],
        first_part: usize,
        description: &str,
    ) -> (Vec<AccessStep>, usize) {
        let mut path = Vec::new();
        for (offset, part) in parts.iter().enumerate() {
            match part {
                SubRef::Index { index, span } if offset < dims.len() => {
                    self.chk_expr(index, Some(Ty::integer()), ExprMode::Value);
                    let dim = dims[offset];
                    if let Some(value) = self.constant_integer(index) {
                        if !self.chk_array_index(dim, value, *span) {
                            return (path, 0);
                        }
                    }
                    path.push(AccessStep::Index {
                        container: IndexedContainer::DefinitionArray {
                            dimension: offset,
                            offset: dim.start,
                        },
                        part: first_part + offset,
                    });
                }
                _ => {
                    self.emit(CompileError::new(
                        ErrorKind::InvalidSubReference,
                        part.span(),
                        format!("Invalid sub-reference: a {description} has no fields or elements"),
                    ));
                    return (path, 0);
                }
            }
        }
        (path, dims.len().saturating_sub(parts.len()))
    }

    /// Value of an integer expression known at compile time.
    pub(crate) fn constant_integer(&mut self, expr: &Expr) -> Option<i64> {
        self.constant_integer_inner(expr, 0)
    }

    fn constant_integer_inner(&mut self, expr: &Expr, depth: usize) -> Option<i64> {
        if depth > MAX_CONSTANT_DEPTH {
            return None;
        }
        match &expr.kind {
            ExprKind::Integer(value) => Some(*value),
            ExprKind::Unary {
                op: UnaryOp::Neg,
                operand,
            } => self
                .constant_integer_inner(operand, depth + 1)
                .and_then(i64::checked_neg),
            ExprKind::Ref(reference) => {
                let reference = *reference;
                let program = self.program;
                let node = program.reference(reference);
                if node.params.is_some() || !self.is_resolved(reference) {
                    return None;
                }
                let resolved = self.resolve(reference);
                if !resolved.path.is_empty() {
                    return None;
                }
                match &program.definition(resolved.target?).kind {
                    DefKind::Const { value, .. } => self.constant_integer_inner(value, depth + 1),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckConfig;
    use ttcn_ast::ast::{Builtin, TypeExpr};
    use ttcn_ast::ProgramBuilder;

    const INT: TypeExpr = TypeExpr::Builtin(Builtin::Integer);

    #[test]
    fn test_optional_field_and_record_of_index() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let list = b.new_type(TypeKind::RecordOf(INT));
        let f = b.field("items", TypeExpr::Anonymous(list), true);
        b.type_def(m, "R", TypeKind::Record(vec![f]));
        let ty = b.type_ref("R");
        let v = b.var("v", ty, None);
        b.add(m, v);
        let field = b.reference("v.items");
        let element = b.reference("v.items");
        let span = b.span();
        b.constant(m, "c1", INT, Expr::reference(field));
        b.constant(m, "c2", INT, Expr::reference(element));
        let mut program = b.finish();
        program.references[element.index()].parts.push(SubRef::Index {
            index: Box::new(Expr::int(2)),
            span,
        });
        let mut checker = Checker::new(&program, CheckConfig::default());

        let resolved = checker.resolve(field);
        assert_eq!(
            resolved.path,
            vec![AccessStep::Field {
                name: Identifier::new("items"),
                unwrap_optional: false
            }]
        );
        assert!(resolved.through_optional);
        assert_eq!(resolved.ty(), Ty::Defined(list));

        let resolved = checker.resolve(element);
        assert_eq!(resolved.ty(), Ty::integer());
        assert!(matches!(
            resolved.path[0],
            AccessStep::Field {
                unwrap_optional: true,
                ..
            }
        ));
        assert!(matches!(
            resolved.path[1],
            AccessStep::Index {
                container: IndexedContainer::RecordOf,
                part: 2
            }
        ));
        assert!(checker.diagnostics().is_empty());
    }

    #[test]
    fn test_array_bounds_and_slices() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let array = b.new_type(TypeKind::Array {
            element: INT,
            dims: vec![ArrayDim { start: 1, size: 2 }, ArrayDim::new(3)],
        });
        let v = b.var("a", TypeExpr::Anonymous(array), None);
        b.add(m, v);
        let slice = b.indexed("a", Expr::int(1));
        let overflow = b.indexed("a", Expr::int(3));
        b.constant(m, "c1", INT, Expr::reference(slice));
        b.constant(m, "c2", INT, Expr::reference(overflow));
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        let resolved = checker.resolve(slice);
        assert_eq!(
            resolved.ty(),
            Ty::ArraySlice {
                array,
                consumed: 1
            }
        );
        assert_eq!(
            resolved.path,
            vec![AccessStep::Index {
                container: IndexedContainer::Array {
                    dimension: 0,
                    offset: 1
                },
                part: 1
            }]
        );
        assert!(checker.diagnostics().is_empty());

        assert!(checker.resolve(overflow).ty().is_error());
        assert!(checker.diagnostics()[0].message.contains("at most 2 instead of 3"));
    }

    #[test]
    fn test_array_bounds_at_integer_limits() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let array = b.new_type(TypeKind::Array {
            element: INT,
            dims: vec![ArrayDim {
                start: i64::MAX - 1,
                size: 2,
            }],
        });
        let v = b.var("a", TypeExpr::Anonymous(array), None);
        b.add(m, v);
        let last = b.indexed("a", Expr::int(i64::MAX));
        let below = b.indexed("a", Expr::int(0));
        b.constant(m, "c1", INT, Expr::reference(last));
        b.constant(m, "c2", INT, Expr::reference(below));
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        assert_eq!(checker.resolve(last).ty(), Ty::integer());
        assert!(checker.diagnostics().is_empty());

        assert!(checker.resolve(below).ty().is_error());
        assert!(checker.diagnostics()[0]
            .message
            .starts_with("Array index underflow"));
    }

    #[test]
    fn test_string_element_cannot_be_navigated() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let v = b.var("s", TypeExpr::Builtin(Builtin::Charstring), None);
        b.add(m, v);
        let element = b.indexed("s", Expr::int(0));
        let nested = b.indexed("s", Expr::int(0));
        let span = b.span();
        b.constant(m, "c1", INT, Expr::reference(element));
        b.constant(m, "c2", INT, Expr::reference(nested));
        let mut program = b.finish();
        program.references[nested.index()].parts.push(SubRef::Index {
            index: Box::new(Expr::int(1)),
            span,
        });
        let mut checker = Checker::new(&program, CheckConfig::default());

        assert!(checker.resolve(element).string_element);
        assert!(checker.diagnostics().is_empty());
        assert!(checker.resolve(nested).ty().is_error());
        assert_eq!(checker.diagnostics().len(), 1);
    }

    #[test]
    fn test_missing_field_reported() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let f = b.field("a", INT, false);
        b.type_def(m, "R", TypeKind::Record(vec![f]));
        let ty = b.type_ref("R");
        let v = b.var("v", ty, None);
        b.add(m, v);
        let reference = b.reference("v.b");
        b.constant(m, "c", INT, Expr::reference(reference));
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        assert!(checker.resolve(reference).ty().is_error());
        assert!(checker.diagnostics()[0]
            .message
            .contains("non-existent field `b' in type `R'"));
    }
}
