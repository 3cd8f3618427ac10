//! Template restrictions and default values.
//!
//! A template restriction limits what a template may match:
//!
//! | restriction | forbids |
//! |---|---|
//! | `value` | `omit` and every matching symbol |
//! | `omit` | every matching symbol |
//! | `present` | top-level `omit`, `*`, complements that admit `omit` |
//!
//! A literal template body is checked statically. A reference to a template
//! stored elsewhere can only be checked at runtime when the referenced
//! storage is less restricted; the check reports whether such a runtime
//! check has to be generated.

use crate::error::{CompileError, ErrorKind};
use crate::resolve::checker::Checker;
use crate::resolve::exprs::matching_description;
use ttcn_ast::ast::{DefKind, Expr, ExprKind, ParKind, SubRef, TemplateRestriction};
use ttcn_ast::foundation::{RefId, Span};

impl<'p> Checker<'p> {
    /// Check a template body against a restriction.
    ///
    /// Returns `false` when a form that always violates the restriction was
    /// reported. References are not followed; see
    /// [`ref_restriction_check`](Self::ref_restriction_check).
    pub(crate) fn chk_restriction(&mut self, expr: &Expr, restriction: TemplateRestriction, what: &str) -> bool {
        match restriction {
            TemplateRestriction::None => true,
            TemplateRestriction::Value | TemplateRestriction::Omit => {
                self.chk_specific(expr, restriction, what)
            }
            TemplateRestriction::Present => self.chk_present(expr, what),
        }
    }

    fn chk_specific(&mut self, expr: &Expr, restriction: TemplateRestriction, what: &str) -> bool {
        match &expr.kind {
            ExprKind::Omit if restriction == TemplateRestriction::Value => {
                self.restriction_violation(expr.span, restriction, what, "omit value")
            }
            ExprKind::AnyValue
            | ExprKind::AnyOrOmit
            | ExprKind::ValueList(_)
            | ExprKind::Complement(_)
            | ExprKind::Range { .. }
            | ExprKind::DecodeMatch { .. } => {
                self.restriction_violation(expr.span, restriction, what, matching_description(&expr.kind))
            }
            // Fields and elements may be omitted inside a value.
            ExprKind::List(items) => items.iter().fold(true, |ok, item| {
                self.chk_specific(item, TemplateRestriction::Omit, what) && ok
            }),
            ExprKind::NamedList(items) => items.iter().fold(true, |ok, item| {
                self.chk_specific(&item.value, TemplateRestriction::Omit, what) && ok
            }),
            ExprKind::IndexedList(items) => items.iter().fold(true, |ok, item| {
                self.chk_specific(&item.value, TemplateRestriction::Omit, what) && ok
            }),
            _ => true,
        }
    }

    fn chk_present(&mut self, expr: &Expr, what: &str) -> bool {
        let restriction = TemplateRestriction::Present;
        match &expr.kind {
            ExprKind::Omit => self.restriction_violation(expr.span, restriction, what, "omit value"),
            ExprKind::AnyOrOmit => self.restriction_violation(expr.span, restriction, what, "`*'"),
            ExprKind::ValueList(items) => items
                .iter()
                .fold(true, |ok, item| self.chk_present(item, what) && ok),
            ExprKind::Complement(items) => {
                let excludes_omit = items
                    .iter()
                    .any(|i| matches!(i.kind, ExprKind::Omit | ExprKind::AnyOrOmit));
                if excludes_omit {
                    true
                } else {
                    self.restriction_violation(
                        expr.span,
                        restriction,
                        what,
                        "a complemented list that does not exclude omit",
                    )
                }
            }
            _ => true,
        }
    }

    fn restriction_violation(
        &mut self,
        span: Span,
        restriction: TemplateRestriction,
        what: &str,
        symbol: &str,
    ) -> bool {
        self.emit(CompileError::new(
            ErrorKind::TemplateRestriction,
            span,
            format!(
                "Restriction `{}' on {what} does not allow usage of {symbol}",
                restriction.keyword()
            ),
        ));
        false
    }

    /// Restriction of the template a resolved reference reads.
    ///
    /// Values are restricted to `value`. Reading through an optional field
    /// weakens the restriction of the containing template.
    pub(crate) fn referenced_restriction(&mut self, reference: RefId) -> Option<TemplateRestriction> {
        let program = self.program;
        let resolved = self.resolve(reference);
        let def = resolved.target?;
        let restriction = match &program.definition(def).kind {
            DefKind::VarTemplate { restriction, .. } => *restriction,
            DefKind::Template(template) => template.restriction,
            DefKind::FormalPar(par) if par.kind == ParKind::Template => par.restriction,
            DefKind::Function(function) | DefKind::ExtFunction(function) => {
                match &function.returns {
                    Some(returns) if returns.template => returns.restriction,
                    _ => TemplateRestriction::Value,
                }
            }
            _ => TemplateRestriction::Value,
        };
        Some(if resolved.through_optional {
            restriction.through_optional()
        } else {
            restriction
        })
    }

    /// Whether reading `reference` as a `restriction`-restricted template
    /// needs a runtime check.
    ///
    /// A less restricted source produces a warning; a template returned by
    /// an external function is always checked.
    pub(crate) fn ref_restriction_check(&mut self, reference: RefId, restriction: TemplateRestriction) -> bool {
        if restriction == TemplateRestriction::None {
            return false;
        }
        let program = self.program;
        let resolved = self.resolve(reference);
        let Some(def) = resolved.target else {
            return false;
        };
        let definition = program.definition(def);
        if let DefKind::ExtFunction(function) = &definition.kind {
            if function.returns.as_ref().is_some_and(|r| r.template) {
                return true;
            }
        }
        let Some(referenced) = self.referenced_restriction(reference) else {
            return false;
        };
        if !restriction.is_less_restrictive(referenced) {
            return false;
        }
        self.emit(CompileError::warning(
            ErrorKind::TemplateRestriction,
            program.reference(reference).span,
            format!(
                "Inadequate restriction on the referenced {} `{}', this may cause a dynamic test case error at runtime",
                definition.kind.description(),
                definition.name
            ),
        ));
        true
    }

    /// Whether an expression is a specific value, i.e. contains no matching
    /// symbol.
    pub(crate) fn is_value(&self, expr: &Expr) -> bool {
        let mut value = true;
        expr.walk(&mut |e| {
            if matches!(
                e.kind,
                ExprKind::AnyValue
                    | ExprKind::AnyOrOmit
                    | ExprKind::ValueList(_)
                    | ExprKind::Complement(_)
                    | ExprKind::Range { .. }
                    | ExprKind::DecodeMatch { .. }
            ) {
                value = false;
            }
        });
        value
    }

    /// Check that a default value of a formal parameter can be evaluated
    /// without a running component.
    ///
    /// Rejects function invocations and references to variables, timers,
    /// ports, parameters and behaviours anywhere in the expression,
    /// including actual parameters and index expressions of references.
    pub(crate) fn validate_default(&mut self, expr: &Expr) -> bool {
        let program = self.program;
        let mut invocations = Vec::new();
        let mut references = Vec::new();
        expr.walk(&mut |e| match &e.kind {
            ExprKind::Invoke { .. } => invocations.push(e.span),
            ExprKind::Ref(reference) => references.push(*reference),
            _ => {}
        });
        let mut ok = true;
        for span in invocations {
            self.emit(CompileError::new(
                ErrorKind::InvalidValue,
                span,
                "A function invocation cannot be used as default value of a formal parameter"
                    .to_string(),
            ));
            ok = false;
        }
        for reference in references {
            ok &= self.validate_default_ref(reference);
            let node = program.reference(reference);
            for part in &node.parts {
                if let SubRef::Index { index, .. } = part {
                    ok &= self.validate_default(index);
                }
            }
            if let Some(params) = &node.params {
                for arg in params.exprs() {
                    ok &= self.validate_default(arg);
                }
            }
        }
        ok
    }

    fn validate_default_ref(&mut self, reference: RefId) -> bool {
        let program = self.program;
        let resolved = self.resolve(reference);
        let Some(def) = resolved.target else {
            return true;
        };
        let kind = &program.definition(def).kind;
        let dynamic = matches!(
            kind,
            DefKind::Var { .. }
                | DefKind::VarTemplate { .. }
                | DefKind::Timer { .. }
                | DefKind::Port { .. }
                | DefKind::FormalPar(_)
                | DefKind::Function(_)
                | DefKind::ExtFunction(_)
                | DefKind::Altstep(_)
                | DefKind::Testcase(_)
        );
        if !dynamic {
            return true;
        }
        let node = program.reference(reference);
        self.emit(CompileError::new(
            ErrorKind::InvalidValue,
            node.span,
            format!(
                "Reference to a static value or template was expected as default value instead of {} `{}'",
                kind.description(),
                node.display()
            ),
        ));
        false
    }
}
