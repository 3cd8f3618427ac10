//! Statements of function, altstep, testcase and control bodies.
//!
//! Only the statements that carry semantic checks are modelled: local
//! definitions, assignments, calls, configuration operations and default
//! activation.

use crate::ast::expr::Expr;
use crate::foundation::{DefId, Identifier, RefId, Span};
use serde::{Deserialize, Serialize};

/// `{ ... }`; opens a statement-block scope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub statements: Vec<Statement>,
    #[serde(default)]
    pub span: Span,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self {
            statements,
            span: Span::default(),
        }
    }
}

/// `component_expr:port_name` operand of `connect` and `map`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortEndpoint {
    pub component: Expr,
    pub port: Identifier,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatementKind {
    /// Local variable, constant, timer or template
    Definition(DefId),
    /// `target := value`
    Assign { target: RefId, value: Expr },
    /// Function or altstep call as a statement
    Invoke(RefId),
    Connect {
        left: PortEndpoint,
        right: PortEndpoint,
    },
    Map {
        left: PortEndpoint,
        right: PortEndpoint,
    },
    /// `activate(altstep(args))`
    Activate(RefId),
    /// `component.start(function(args))`
    Start { component: Expr, function: RefId },
    Return(Option<Expr>),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    #[serde(default)]
    pub span: Span,
}

impl Statement {
    pub fn new(kind: StatementKind) -> Self {
        Self {
            kind,
            span: Span::default(),
        }
    }
}
