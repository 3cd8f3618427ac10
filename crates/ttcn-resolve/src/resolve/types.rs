//! Type identity and compatibility.
//!
//! Types are handled as [`Ty`] values: a builtin, a type body from the
//! program arena, or a partially indexed multi-dimensional array. Named type
//! references are resolved once and collapse onto the body they name, so two
//! uses of the same type name always produce the same `Ty`.
//!
//! Two relations are provided:
//!
//! - *identity* - the same type after following alias chains
//! - *compatibility* - a value of the source type may be stored in the
//!   target type. The relation is directional: a `universal charstring`
//!   accepts a `charstring`, not the other way round.
//!
//! The erroneous type is identical and compatible to everything, so an
//! earlier error never cascades into type mismatches.

use crate::error::{CompileError, ErrorKind};
use crate::resolve::checker::Checker;
use serde::Serialize;
use std::collections::HashSet;
use ttcn_ast::ast::{ArrayDim, Builtin, DefKind, Encoding, Field, TypeExpr, TypeKind};
use ttcn_ast::foundation::{DefId, RefId, TypeId};

/// Resolved type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Ty {
    Builtin(Builtin),
    /// Type body in the program arena
    Defined(TypeId),
    /// Multi-dimensional array with the first `consumed` dimensions indexed
    ArraySlice { array: TypeId, consumed: usize },
    /// Result of an earlier error
    Error,
}

impl Ty {
    pub fn is_error(self) -> bool {
        matches!(self, Ty::Error)
    }

    pub fn integer() -> Self {
        Ty::Builtin(Builtin::Integer)
    }
}

impl<'p> Checker<'p> {
    /// Resolve a type expression.
    ///
    /// Named references are resolved through the reference memo; a reference
    /// that does not name a type is reported once and yields [`Ty::Error`].
    pub(crate) fn resolve_type_expr(&mut self, ty: &TypeExpr) -> Ty {
        match ty {
            TypeExpr::Builtin(builtin) => Ty::Builtin(*builtin),
            TypeExpr::Anonymous(body) => Ty::Defined(*body),
            TypeExpr::Named(reference) => self.resolve_type_ref(*reference),
        }
    }

    fn resolve_type_ref(&mut self, reference: RefId) -> Ty {
        if let Some(ty) = self.type_refs.get(&reference) {
            return *ty;
        }
        let program = self.program;
        let resolved = self.resolve(reference);
        let ty = match resolved.target {
            None => Ty::Error,
            Some(def) => match &program.definition(def).kind {
                DefKind::Type(_) => resolved.ty,
                kind => {
                    let node = program.reference(reference);
                    self.emit(CompileError::new(
                        ErrorKind::ExpectedType,
                        node.span,
                        format!(
                            "Type reference expected instead of {} `{}'",
                            kind.description(),
                            node.display()
                        ),
                    ));
                    Ty::Error
                }
            },
        };
        self.type_refs.insert(reference, ty);
        ty
    }

    /// Declared type of a definition; [`Ty::Error`] for definitions without
    /// a value type (timers, altsteps, functions without return type).
    pub(crate) fn def_type(&mut self, def: DefId) -> Ty {
        let program = self.program;
        match &program.definition(def).kind {
            DefKind::Type(body) => Ty::Defined(*body),
            DefKind::Const { ty, .. }
            | DefKind::ExtConst { ty }
            | DefKind::ModulePar { ty, .. }
            | DefKind::Var { ty, .. }
            | DefKind::VarTemplate { ty, .. } => self.resolve_type_expr(ty),
            DefKind::Template(template) => self.resolve_type_expr(&template.ty),
            DefKind::Port { port_type, .. } => self.resolve_type_expr(port_type),
            DefKind::FormalPar(par) => match &par.ty {
                Some(ty) => self.resolve_type_expr(ty),
                None => Ty::Error,
            },
            DefKind::Function(function) | DefKind::ExtFunction(function) => {
                match &function.returns {
                    Some(returns) => self.resolve_type_expr(&returns.ty),
                    None => Ty::Error,
                }
            }
            DefKind::Timer { .. } | DefKind::Altstep(_) | DefKind::Testcase(_) => Ty::Error,
        }
    }

    /// Follow alias chains to the type that is not itself an alias.
    ///
    /// A cyclic alias chain is reported once and yields [`Ty::Error`].
    pub(crate) fn refd_last(&mut self, ty: Ty) -> Ty {
        let Ty::Defined(start) = ty else {
            return ty;
        };
        if let Some(last) = self.refd_last_memo.get(&start) {
            return *last;
        }
        let program = self.program;
        let mut chain = vec![start];
        let mut current = start;
        let last = loop {
            let TypeKind::Alias(target) = &program.type_def(current).kind else {
                break Ty::Defined(current);
            };
            match self.resolve_type_expr(target) {
                Ty::Defined(next) => {
                    if let Some(pos) = chain.iter().position(|t| *t == next) {
                        self.report_alias_cycle(&chain[pos..]);
                        break Ty::Error;
                    }
                    chain.push(next);
                    current = next;
                }
                other => break other,
            }
        };
        for body in chain {
            self.refd_last_memo.insert(body, last);
        }
        last
    }

    fn report_alias_cycle(&mut self, cycle: &[TypeId]) {
        if cycle.iter().any(|t| self.alias_cycles_reported.contains(t)) {
            return;
        }
        self.alias_cycles_reported.extend(cycle.iter().copied());
        let mut names: Vec<String> = cycle
            .iter()
            .map(|t| self.type_display(Ty::Defined(*t)))
            .collect();
        names.push(names[0].clone());
        let span = self.program.type_def(cycle[0]).span;
        self.emit(CompileError::new(
            ErrorKind::CircularReference,
            span,
            format!(
                "Circular type reference chain: {}",
                names
                    .iter()
                    .map(|n| format!("`{n}'"))
                    .collect::<Vec<_>>()
                    .join(" -> ")
            ),
        ));
    }

    /// Body kind of the last type in the alias chain.
    pub(crate) fn last_kind(&mut self, ty: Ty) -> Option<&'p TypeKind> {
        match self.refd_last(ty) {
            Ty::Defined(body) => Some(&self.program.type_def(body).kind),
            _ => None,
        }
    }

    /// Name of a type for diagnostics.
    pub fn type_display(&self, ty: Ty) -> String {
        match ty {
            Ty::Builtin(builtin) => builtin.name().to_string(),
            Ty::Defined(body) => self.body_display(body),
            Ty::ArraySlice { array, consumed } => {
                match &self.program.type_def(array).kind {
                    TypeKind::Array { element, dims } => {
                        format!(
                            "{}{}",
                            self.type_expr_display(element),
                            dims_display(&dims[consumed.min(dims.len())..])
                        )
                    }
                    _ => self.body_display(array),
                }
            }
            Ty::Error => "<erroneous>".to_string(),
        }
    }

    fn body_display(&self, body: TypeId) -> String {
        if let Some(def) = self.program.type_name_def(body) {
            return self.program.definition(def).name.display_name().to_string();
        }
        match &self.program.type_def(body).kind {
            TypeKind::Alias(inner) => self.type_expr_display(inner),
            TypeKind::Record(_) => "record".to_string(),
            TypeKind::Set(_) => "set".to_string(),
            TypeKind::Union(_) => "union".to_string(),
            TypeKind::RecordOf(element) => format!("record of {}", self.type_expr_display(element)),
            TypeKind::SetOf(element) => format!("set of {}", self.type_expr_display(element)),
            TypeKind::Array { element, dims } => {
                format!("{}{}", self.type_expr_display(element), dims_display(dims))
            }
            TypeKind::Enumerated(_) => "enumerated".to_string(),
            TypeKind::Component(_) => "component".to_string(),
            TypeKind::Port(_) => "port".to_string(),
            TypeKind::Signature(_) => "signature".to_string(),
        }
    }

    pub(crate) fn type_expr_display(&self, ty: &TypeExpr) -> String {
        match ty {
            TypeExpr::Builtin(builtin) => builtin.name().to_string(),
            TypeExpr::Named(reference) => self.program.reference(*reference).display(),
            TypeExpr::Anonymous(body) => self.body_display(*body),
        }
    }

    /// Whether two types are the same type.
    pub fn is_identical(&mut self, a: Ty, b: Ty) -> bool {
        let a = self.refd_last(a);
        let b = self.refd_last(b);
        a.is_error() || b.is_error() || a == b
    }

    /// Whether a value of type `source` can be stored in type `target`.
    pub fn is_compatible(&mut self, target: Ty, source: Ty) -> bool {
        let mut visited = HashSet::new();
        self.compatible_inner(target, source, &mut visited)
    }

    fn compatible_inner(&mut self, target: Ty, source: Ty, visited: &mut HashSet<(Ty, Ty)>) -> bool {
        let t = self.refd_last(target);
        let s = self.refd_last(source);
        if t.is_error() || s.is_error() || t == s {
            return true;
        }
        // Recursive types: assume compatible while the pair is being checked.
        if !visited.insert((t, s)) {
            return true;
        }
        match (t, s) {
            (Ty::Builtin(a), Ty::Builtin(b)) => {
                a == b || (a == Builtin::UniversalCharstring && b == Builtin::Charstring)
            }
            (Ty::Builtin(_), _) | (_, Ty::Builtin(_)) => false,
            _ => self.structured_compatible(t, s, visited),
        }
    }

    fn structured_compatible(&mut self, t: Ty, s: Ty, visited: &mut HashSet<(Ty, Ty)>) -> bool {
        if let (Some(target), Some(source)) = (self.array_shape(t), self.array_shape(s)) {
            let same_dims = target.1.len() == source.1.len()
                && target.1.iter().zip(source.1).all(|(a, b)| a.size == b.size);
            return same_dims && self.expr_compatible(target.0, source.0, visited);
        }
        let (Ty::Defined(tb), Ty::Defined(sb)) = (t, s) else {
            return false;
        };
        let program = self.program;
        match (&program.type_def(tb).kind, &program.type_def(sb).kind) {
            (TypeKind::Record(tf), TypeKind::Record(sf)) | (TypeKind::Set(tf), TypeKind::Set(sf)) => {
                self.fields_compatible(tf, sf, visited)
            }
            (TypeKind::RecordOf(te), TypeKind::RecordOf(se))
            | (TypeKind::SetOf(te), TypeKind::SetOf(se))
            | (TypeKind::RecordOf(te), TypeKind::Array { element: se, .. }) => {
                self.expr_compatible(te, se, visited)
            }
            (TypeKind::Union(talts), TypeKind::Union(salts)) => salts.iter().all(|alt| {
                match talts.iter().find(|t| t.name == alt.name) {
                    Some(target) => self.expr_compatible(&target.ty, &alt.ty, visited),
                    None => false,
                }
            }),
            _ => false,
        }
    }

    fn fields_compatible(
        &mut self,
        target: &[Field],
        source: &[Field],
        visited: &mut HashSet<(Ty, Ty)>,
    ) -> bool {
        target.len() == source.len()
            && target.iter().zip(source).all(|(t, s)| {
                // A mandatory field cannot receive an optional one.
                (t.optional || !s.optional) && self.expr_compatible(&t.ty, &s.ty, visited)
            })
    }

    fn expr_compatible(
        &mut self,
        target: &TypeExpr,
        source: &TypeExpr,
        visited: &mut HashSet<(Ty, Ty)>,
    ) -> bool {
        let t = self.resolve_type_expr(target);
        let s = self.resolve_type_expr(source);
        self.compatible_inner(t, s, visited)
    }

    /// Element type and remaining dimensions of an array or array slice.
    pub(crate) fn array_shape(&self, ty: Ty) -> Option<(&'p TypeExpr, &'p [ArrayDim])> {
        let (array, consumed) = match ty {
            Ty::Defined(body) => (body, 0),
            Ty::ArraySlice { array, consumed } => (array, consumed),
            _ => return None,
        };
        match &self.program.type_def(array).kind {
            TypeKind::Array { element, dims } if consumed < dims.len() => {
                Some((element, &dims[consumed..]))
            }
            _ => None,
        }
    }

    /// Whether values of the type can be encoded with `encoding`.
    ///
    /// Builtin types support every encoding except BER and PER; user types
    /// support the encodings they (or a type they alias) declare.
    pub(crate) fn supports_encoding(&mut self, ty: Ty, encoding: Encoding) -> bool {
        let mut current = ty;
        let mut seen = HashSet::new();
        loop {
            match current {
                Ty::Error => return true,
                Ty::Builtin(_) => return encoding.applies_to_builtins(),
                Ty::ArraySlice { .. } => return false,
                Ty::Defined(body) => {
                    if !seen.insert(body) {
                        return false;
                    }
                    let def = self.program.type_def(body);
                    if def.encodings.contains(&encoding) {
                        return true;
                    }
                    match &def.kind {
                        TypeKind::Alias(inner) => current = self.resolve_type_expr(inner),
                        _ => return false,
                    }
                }
            }
        }
    }

    /// Whether values of the type can only live inside a component
    /// (ports and defaults, directly or in a field).
    pub(crate) fn is_component_internal(&mut self, ty: Ty) -> bool {
        let mut seen = HashSet::new();
        self.component_internal_inner(ty, &mut seen)
    }

    fn component_internal_inner(&mut self, ty: Ty, seen: &mut HashSet<Ty>) -> bool {
        let last = self.refd_last(ty);
        if !seen.insert(last) {
            return false;
        }
        if let Some((element, _)) = self.array_shape(last) {
            let element = self.resolve_type_expr(element);
            return self.component_internal_inner(element, seen);
        }
        let program = self.program;
        match last {
            Ty::Builtin(builtin) => builtin == Builtin::Default,
            Ty::Defined(body) => match &program.type_def(body).kind {
                TypeKind::Port(_) => true,
                TypeKind::Record(fields) | TypeKind::Set(fields) | TypeKind::Union(fields) => {
                    fields.iter().any(|f| {
                        let field = self.resolve_type_expr(&f.ty);
                        self.component_internal_inner(field, seen)
                    })
                }
                TypeKind::RecordOf(element) | TypeKind::SetOf(element) => {
                    let element = self.resolve_type_expr(element);
                    self.component_internal_inner(element, seen)
                }
                _ => false,
            },
            _ => false,
        }
    }
}

fn dims_display(dims: &[ArrayDim]) -> String {
    dims.iter().map(|d| format!("[{}]", d.size)).collect()
}
