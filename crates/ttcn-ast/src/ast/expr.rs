//! Value and template expressions.
//!
//! Values and templates share one tree. Whether an expression is used as a
//! value, a template, or a compile-time constant is decided by the context
//! that checks it, not by the parser.

use crate::foundation::{Identifier, RefId, Span};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerdictValue {
    None,
    Pass,
    Inconc,
    Fail,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    /// Comparison and logical operators yield a boolean.
    pub fn yields_boolean(self) -> bool {
        !matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        )
    }
}

/// `mtc`, `system` and `self` component references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKeyword {
    Mtc,
    System,
    SelfComponent,
}

/// `name := value` element of a record or set list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedExpr {
    pub name: Identifier,
    pub value: Expr,
}

/// `[index] := value` element of an indexed list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedExpr {
    pub index: Expr,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Charstring(String),
    Bitstring(String),
    Hexstring(String),
    Octetstring(String),
    Verdict(VerdictValue),
    /// Reference, possibly with sub-references and actual parameters
    Ref(RefId),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `&`
    Concat {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `omit`
    Omit,
    /// `?`
    AnyValue,
    /// `*`
    AnyOrOmit,
    /// `-`: element left unchanged, or an actual parameter not supplied
    NotUsed,
    /// `(a, b, c)`
    ValueList(Vec<Expr>),
    /// `complement(a, b)`
    Complement(Vec<Expr>),
    /// `{ a, b, c }`
    List(Vec<Expr>),
    /// `{ f1 := a, f2 := b }`
    NamedList(Vec<NamedExpr>),
    /// `{ [0] := a, [2] := b }`
    IndexedList(Vec<IndexedExpr>),
    /// `(lower .. upper)`
    Range {
        lower: Box<Expr>,
        upper: Box<Expr>,
    },
    /// `decmatch T: target`
    DecodeMatch {
        #[serde(default)]
        encoding: Option<String>,
        target: Box<Expr>,
    },
    /// `f.apply(args)` and other invocations of a function-typed value
    Invoke {
        callee: Box<Expr>,
        #[serde(default)]
        args: Vec<Expr>,
    },
    Component(ComponentKeyword),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    #[serde(default)]
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Expression with a zero-length span, for synthesized nodes.
    pub fn synthetic(kind: ExprKind) -> Self {
        Self::new(kind, Span::default())
    }

    pub fn int(value: i64) -> Self {
        Self::synthetic(ExprKind::Integer(value))
    }

    pub fn boolean(value: bool) -> Self {
        Self::synthetic(ExprKind::Boolean(value))
    }

    pub fn charstring(value: impl Into<String>) -> Self {
        Self::synthetic(ExprKind::Charstring(value.into()))
    }

    pub fn reference(reference: RefId) -> Self {
        Self::synthetic(ExprKind::Ref(reference))
    }

    pub fn omit() -> Self {
        Self::synthetic(ExprKind::Omit)
    }

    pub fn any_value() -> Self {
        Self::synthetic(ExprKind::AnyValue)
    }

    pub fn not_used() -> Self {
        Self::synthetic(ExprKind::NotUsed)
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// The reference this expression consists of, if it is a bare one.
    pub fn as_reference(&self) -> Option<RefId> {
        match self.kind {
            ExprKind::Ref(r) => Some(r),
            _ => None,
        }
    }

    /// Whether this is `-`.
    pub fn is_not_used(&self) -> bool {
        matches!(self.kind, ExprKind::NotUsed)
    }

    /// Visit every reference in the expression tree, depth first.
    pub fn for_each_ref(&self, f: &mut impl FnMut(RefId)) {
        self.walk(&mut |expr| {
            if let ExprKind::Ref(r) = expr.kind {
                f(r);
            }
        });
    }

    /// Visit every sub-expression, `self` first.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        match &self.kind {
            ExprKind::Unary { operand, .. } => operand.walk(f),
            ExprKind::Binary { lhs, rhs, .. } | ExprKind::Concat { lhs, rhs } => {
                lhs.walk(f);
                rhs.walk(f);
            }
            ExprKind::ValueList(items) | ExprKind::Complement(items) | ExprKind::List(items) => {
                for item in items {
                    item.walk(f);
                }
            }
            ExprKind::NamedList(items) => {
                for item in items {
                    item.value.walk(f);
                }
            }
            ExprKind::IndexedList(items) => {
                for item in items {
                    item.index.walk(f);
                    item.value.walk(f);
                }
            }
            ExprKind::Range { lower, upper } => {
                lower.walk(f);
                upper.walk(f);
            }
            ExprKind::DecodeMatch { target, .. } => target.walk(f),
            ExprKind::Invoke { callee, args } => {
                callee.walk(f);
                for arg in args {
                    arg.walk(f);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_each_ref_visits_nested_references() {
        let expr = Expr::synthetic(ExprKind::NamedList(vec![
            NamedExpr {
                name: Identifier::new("a"),
                value: Expr::reference(RefId(1)),
            },
            NamedExpr {
                name: Identifier::new("b"),
                value: Expr::synthetic(ExprKind::ValueList(vec![
                    Expr::int(1),
                    Expr::reference(RefId(2)),
                ])),
            },
        ]));
        let mut seen = Vec::new();
        expr.for_each_ref(&mut |r| seen.push(r));
        assert_eq!(seen, vec![RefId(1), RefId(2)]);
    }

    #[test]
    fn test_as_reference() {
        assert_eq!(Expr::reference(RefId(4)).as_reference(), Some(RefId(4)));
        assert_eq!(Expr::omit().as_reference(), None);
        assert!(Expr::not_used().is_not_used());
    }
}
