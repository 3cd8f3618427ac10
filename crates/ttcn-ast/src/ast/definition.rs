//! Definitions (assignments) and formal parameter lists.
//!
//! Every named entity a reference can resolve to is a [`Definition`] in the
//! program arena: module-level definitions, component members, port
//! variables, statement-block locals and formal parameters alike.

use crate::ast::expr::Expr;
use crate::ast::module::Visibility;
use crate::ast::statement::Block;
use crate::ast::types::{ArrayDim, TypeExpr};
use crate::foundation::{DefId, Identifier, RefId, Span, TypeId};
use serde::{Deserialize, Serialize};

/// Template restriction, ordered by how much a template may match.
///
/// `Value` admits only specific values, `Omit` adds `omit`, `Present` admits
/// anything that matches a present value, `None` admits everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TemplateRestriction {
    #[default]
    None,
    Omit,
    Value,
    Present,
}

impl TemplateRestriction {
    /// Keyword as written in `template(..)`.
    pub fn keyword(self) -> &'static str {
        match self {
            TemplateRestriction::None => "none",
            TemplateRestriction::Omit => "omit",
            TemplateRestriction::Value => "value",
            TemplateRestriction::Present => "present",
        }
    }

    /// Whether `refd` may hold something `self` forbids.
    ///
    /// A storage of restriction `refd` is *less restrictive* than `self`
    /// when its content needs a runtime check before it can be treated as a
    /// `self`-restricted template.
    pub fn is_less_restrictive(self, refd: TemplateRestriction) -> bool {
        match self {
            TemplateRestriction::None => false,
            TemplateRestriction::Value => refd != TemplateRestriction::Value,
            TemplateRestriction::Omit => {
                !matches!(refd, TemplateRestriction::Value | TemplateRestriction::Omit)
            }
            TemplateRestriction::Present => {
                !matches!(refd, TemplateRestriction::Value | TemplateRestriction::Present)
            }
        }
    }

    /// Restriction that applies to a sub-template reached through an
    /// optional field.
    ///
    /// `omit` becomes a legal field value, so `value` weakens to `omit`
    /// and `present` no longer says anything about the field.
    pub fn through_optional(self) -> TemplateRestriction {
        match self {
            TemplateRestriction::Value => TemplateRestriction::Omit,
            TemplateRestriction::Present => TemplateRestriction::None,
            other => other,
        }
    }
}

/// Parameter passing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    In,
    Out,
    Inout,
}

impl Direction {
    pub fn keyword(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
            Direction::Inout => "inout",
        }
    }
}

/// Kind of a formal parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParKind {
    Value,
    Template,
    Timer,
    Port,
}

/// Evaluation strategy of an `in` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ParEval {
    #[default]
    Normal,
    /// `@lazy`: evaluated on first use
    Lazy,
    /// `@fuzzy`: evaluated on every use
    Fuzzy,
}

/// A formal parameter. It is also a definition so the body can refer to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormalPar {
    pub kind: ParKind,
    #[serde(default)]
    pub direction: Direction,
    /// Data type for value and template parameters, port type for ports
    #[serde(default)]
    pub ty: Option<TypeExpr>,
    #[serde(default)]
    pub restriction: TemplateRestriction,
    #[serde(default)]
    pub default: Option<Expr>,
    #[serde(default)]
    pub eval: ParEval,
}

impl FormalPar {
    fn of_kind(kind: ParKind, ty: Option<TypeExpr>) -> Self {
        Self {
            kind,
            direction: Direction::In,
            ty,
            restriction: TemplateRestriction::None,
            default: None,
            eval: ParEval::Normal,
        }
    }

    /// `in T p`
    pub fn value(ty: TypeExpr) -> Self {
        Self::of_kind(ParKind::Value, Some(ty))
    }

    /// `in template T p`
    pub fn template(ty: TypeExpr) -> Self {
        Self::of_kind(ParKind::Template, Some(ty))
    }

    /// `timer t`
    pub fn timer() -> Self {
        Self::of_kind(ParKind::Timer, None)
    }

    /// `P p` for a port type `P`
    pub fn port(ty: TypeExpr) -> Self {
        Self::of_kind(ParKind::Port, Some(ty))
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn restriction(mut self, restriction: TemplateRestriction) -> Self {
        self.restriction = restriction;
        self
    }

    pub fn with_default(mut self, value: Expr) -> Self {
        self.default = Some(value);
        self
    }

    pub fn eval(mut self, eval: ParEval) -> Self {
        self.eval = eval;
        self
    }

    /// Whether the parameter is passed by reference.
    pub fn is_by_reference(&self) -> bool {
        self.direction != Direction::In || matches!(self.kind, ParKind::Timer | ParKind::Port)
    }
}

/// `(p1, p2, ...)` of a parameterized definition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FormalParList {
    /// Each entry is a [`DefKind::FormalPar`] definition
    #[serde(default)]
    pub pars: Vec<DefId>,
    #[serde(default)]
    pub span: Span,
}

impl FormalParList {
    pub fn new(pars: Vec<DefId>) -> Self {
        Self {
            pars,
            span: Span::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.pars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pars.is_empty()
    }
}

/// Prototype of a function usable as a port mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Prototype {
    #[default]
    None,
    /// `in` parameter, result returned
    Convert,
    /// `in` and `out` parameter, no return
    Fast,
    /// `in` and `out` parameter, returns integer
    Backtrack,
    /// `inout` and `out` parameter, returns integer
    Sliding,
}

impl Prototype {
    pub fn name(self) -> &'static str {
        match self {
            Prototype::None => "<none>",
            Prototype::Convert => "convert",
            Prototype::Fast => "fast",
            Prototype::Backtrack => "backtrack",
            Prototype::Sliding => "sliding",
        }
    }
}

/// Return clause of a function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnType {
    pub ty: TypeExpr,
    /// `return template ...`
    #[serde(default)]
    pub template: bool,
    #[serde(default)]
    pub restriction: TemplateRestriction,
}

/// Function or external function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    #[serde(default)]
    pub params: FormalParList,
    #[serde(default)]
    pub returns: Option<ReturnType>,
    /// `runs on C`
    #[serde(default)]
    pub runs_on: Option<RefId>,
    /// `port P`: function may access the port variables of `P`
    #[serde(default)]
    pub port_clause: Option<RefId>,
    #[serde(default)]
    pub prototype: Prototype,
    /// Body; `None` for external functions
    #[serde(default)]
    pub body: Option<Block>,
}

impl FunctionDef {
    /// Function with the given parameters and no clauses.
    pub fn new(params: Vec<DefId>) -> Self {
        Self {
            params: FormalParList::new(params),
            returns: None,
            runs_on: None,
            port_clause: None,
            prototype: Prototype::None,
            body: None,
        }
    }

    pub fn returns(mut self, ty: TypeExpr) -> Self {
        self.returns = Some(ReturnType {
            ty,
            template: false,
            restriction: TemplateRestriction::None,
        });
        self
    }

    pub fn returns_template(mut self, ty: TypeExpr, restriction: TemplateRestriction) -> Self {
        self.returns = Some(ReturnType {
            ty,
            template: true,
            restriction,
        });
        self
    }

    pub fn runs_on(mut self, component: RefId) -> Self {
        self.runs_on = Some(component);
        self
    }

    pub fn port_clause(mut self, port: RefId) -> Self {
        self.port_clause = Some(port);
        self
    }

    pub fn prototype(mut self, prototype: Prototype) -> Self {
        self.prototype = prototype;
        self
    }

    pub fn body(mut self, body: Block) -> Self {
        self.body = Some(body);
        self
    }
}

/// Altstep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AltstepDef {
    #[serde(default)]
    pub params: FormalParList,
    #[serde(default)]
    pub runs_on: Option<RefId>,
    #[serde(default)]
    pub body: Block,
}

/// Testcase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestcaseDef {
    #[serde(default)]
    pub params: FormalParList,
    pub runs_on: RefId,
    /// `system S`; the MTC component type stands in when absent
    #[serde(default)]
    pub system: Option<RefId>,
    #[serde(default)]
    pub body: Block,
}

/// Template definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDef {
    pub ty: TypeExpr,
    #[serde(default)]
    pub restriction: TemplateRestriction,
    /// Formal parameters; `None` for an unparameterized template
    #[serde(default)]
    pub params: Option<FormalParList>,
    /// `modifies` base template
    #[serde(default)]
    pub base: Option<RefId>,
    pub body: Expr,
}

/// What a definition defines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DefKind {
    Type(TypeId),
    Const {
        ty: TypeExpr,
        value: Expr,
    },
    ExtConst {
        ty: TypeExpr,
    },
    ModulePar {
        ty: TypeExpr,
        #[serde(default)]
        default: Option<Expr>,
    },
    Var {
        ty: TypeExpr,
        #[serde(default)]
        init: Option<Expr>,
    },
    VarTemplate {
        ty: TypeExpr,
        #[serde(default)]
        restriction: TemplateRestriction,
        #[serde(default)]
        init: Option<Expr>,
    },
    Template(TemplateDef),
    Timer {
        #[serde(default)]
        dims: Vec<ArrayDim>,
        #[serde(default)]
        duration: Option<Expr>,
    },
    Port {
        port_type: TypeExpr,
        #[serde(default)]
        dims: Vec<ArrayDim>,
    },
    Function(FunctionDef),
    ExtFunction(FunctionDef),
    Altstep(AltstepDef),
    Testcase(TestcaseDef),
    FormalPar(FormalPar),
}

impl DefKind {
    /// Description used in diagnostics, e.g. "constant" or
    /// "template parameter".
    pub fn description(&self) -> &'static str {
        match self {
            DefKind::Type(_) => "type",
            DefKind::Const { .. } => "constant",
            DefKind::ExtConst { .. } => "external constant",
            DefKind::ModulePar { .. } => "module parameter",
            DefKind::Var { .. } => "variable",
            DefKind::VarTemplate { .. } => "template variable",
            DefKind::Template(_) => "template",
            DefKind::Timer { .. } => "timer",
            DefKind::Port { .. } => "port",
            DefKind::Function(_) => "function",
            DefKind::ExtFunction(_) => "external function",
            DefKind::Altstep(_) => "altstep",
            DefKind::Testcase(_) => "testcase",
            DefKind::FormalPar(par) => match par.kind {
                ParKind::Value => "value parameter",
                ParKind::Template => "template parameter",
                ParKind::Timer => "timer parameter",
                ParKind::Port => "port parameter",
            },
        }
    }

    /// Formal parameter list of a parameterized definition.
    pub fn formal_list(&self) -> Option<&FormalParList> {
        match self {
            DefKind::Function(f) | DefKind::ExtFunction(f) => Some(&f.params),
            DefKind::Altstep(a) => Some(&a.params),
            DefKind::Testcase(t) => Some(&t.params),
            DefKind::Template(t) => t.params.as_ref(),
            _ => None,
        }
    }

    /// Function body of a function, external function or altstep-like def.
    pub fn as_function(&self) -> Option<&FunctionDef> {
        match self {
            DefKind::Function(f) | DefKind::ExtFunction(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_formal_par(&self) -> Option<&FormalPar> {
        match self {
            DefKind::FormalPar(par) => Some(par),
            _ => None,
        }
    }

    /// `runs on` clause of a function, altstep or testcase.
    pub fn runs_on(&self) -> Option<RefId> {
        match self {
            DefKind::Function(f) | DefKind::ExtFunction(f) => f.runs_on,
            DefKind::Altstep(a) => a.runs_on,
            DefKind::Testcase(t) => Some(t.runs_on),
            _ => None,
        }
    }
}

/// A named definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    pub name: Identifier,
    pub span: Span,
    #[serde(default)]
    pub visibility: Visibility,
    pub kind: DefKind,
}

impl Definition {
    pub fn new(name: Identifier, span: Span, kind: DefKind) -> Self {
        Self {
            name,
            span,
            visibility: Visibility::Public,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TemplateRestriction as R;

    #[test]
    fn test_less_restrictive_lattice() {
        assert!(!R::None.is_less_restrictive(R::None));
        assert!(!R::Value.is_less_restrictive(R::Value));
        assert!(R::Value.is_less_restrictive(R::Present));
        assert!(R::Value.is_less_restrictive(R::None));
        assert!(!R::Omit.is_less_restrictive(R::Value));
        assert!(R::Omit.is_less_restrictive(R::Present));
        assert!(!R::Present.is_less_restrictive(R::Value));
        assert!(R::Present.is_less_restrictive(R::Omit));
    }

    #[test]
    fn test_restriction_through_optional_field() {
        assert_eq!(R::Value.through_optional(), R::Omit);
        assert_eq!(R::Present.through_optional(), R::None);
        assert_eq!(R::Omit.through_optional(), R::Omit);
    }

    #[test]
    fn test_formal_list_of_template() {
        let body = Expr::synthetic(crate::ast::expr::ExprKind::Omit);
        let unparameterized = DefKind::Template(TemplateDef {
            ty: TypeExpr::Builtin(crate::ast::types::Builtin::Integer),
            restriction: R::None,
            params: None,
            base: None,
            body,
        });
        assert!(unparameterized.formal_list().is_none());
        assert_eq!(unparameterized.description(), "template");
    }
}
