//! Scope-chain lookup.
//!
//! Lookup walks from the innermost scope of a reference outwards:
//!
//! ```text
//! statement block → formal parameters → port clause → runs-on → module
//! ```
//!
//! Bridging scopes do not declare anything themselves; they expose the
//! members of the component (including inherited members) or the variables
//! of the port type their clause names. Imports are not consulted here;
//! see [`imports`](crate::resolve::imports).

use crate::error::{CompileError, ErrorKind};
use crate::resolve::checker::Checker;
use crate::resolve::types::Ty;
use std::collections::{HashMap, HashSet};
use ttcn_ast::ast::{DefKind, ScopeKind, TypeKind};
use ttcn_ast::foundation::{DefId, Identifier, RefId, ScopeId, TypeId};

impl<'p> Checker<'p> {
    /// Definition named `id` visible from `scope` without imports.
    pub(crate) fn lookup_local(&mut self, scope: ScopeId, id: &Identifier) -> Option<DefId> {
        let program = self.program;
        let mut current = Some(scope);
        while let Some(scope) = current {
            let node = program.scope(scope);
            if let Some(def) = self.find_in_scope(scope, id) {
                return Some(def);
            }
            current = node.parent;
        }
        None
    }

    /// Definition named `id` declared in or exposed by one scope.
    fn find_in_scope(&mut self, scope: ScopeId, id: &Identifier) -> Option<DefId> {
        let program = self.program;
        let node = program.scope(scope);
        if let Some(def) = node
            .definitions
            .iter()
            .copied()
            .find(|d| &program.definition(*d).name == id)
        {
            return Some(def);
        }
        match node.kind {
            ScopeKind::RunsOn { clause, .. } => {
                let component = self.clause_component(clause)?;
                self.component_member(component, id)
            }
            ScopeKind::PortClause { clause, .. } => {
                let port = self.clause_port(clause)?;
                let body = program.type_def(port).as_port()?;
                body.variables
                    .iter()
                    .copied()
                    .find(|d| &program.definition(*d).name == id)
            }
            ScopeKind::Component(component) => {
                let mut visited = HashSet::new();
                visited.insert(component);
                let parents = self.component_parents(component);
                parents
                    .into_iter()
                    .find_map(|parent| self.member_inner(parent, id, &mut visited))
            }
            _ => None,
        }
    }

    /// Member of a component type, own or inherited.
    pub(crate) fn component_member(&mut self, component: TypeId, id: &Identifier) -> Option<DefId> {
        let mut visited = HashSet::new();
        self.member_inner(component, id, &mut visited)
    }

    fn member_inner(
        &mut self,
        component: TypeId,
        id: &Identifier,
        visited: &mut HashSet<TypeId>,
    ) -> Option<DefId> {
        if !visited.insert(component) {
            return None;
        }
        let program = self.program;
        let body = program.type_def(component).as_component()?;
        if let Some(def) = body
            .definitions
            .iter()
            .copied()
            .find(|d| &program.definition(*d).name == id)
        {
            return Some(def);
        }
        for parent in self.component_parents(component) {
            if let Some(def) = self.member_inner(parent, id, visited) {
                return Some(def);
            }
        }
        None
    }

    /// Component types named in the `extends` clause; non-component
    /// references are skipped (they are reported by the type check).
    pub(crate) fn component_parents(&mut self, component: TypeId) -> Vec<TypeId> {
        let program = self.program;
        let Some(body) = program.type_def(component).as_component() else {
            return Vec::new();
        };
        body.extends
            .iter()
            .filter_map(|parent| self.clause_component(*parent))
            .collect()
    }

    /// Whether component type `sub` is `sup` or extends it, directly or
    /// transitively.
    pub fn component_extends(&mut self, sub: TypeId, sup: TypeId) -> bool {
        let mut pending = vec![sub];
        let mut visited = HashSet::new();
        while let Some(component) = pending.pop() {
            if component == sup {
                return true;
            }
            if visited.insert(component) {
                pending.extend(self.component_parents(component));
            }
        }
        false
    }

    /// Component type named by a `runs on`, `system` or `extends` clause.
    ///
    /// Silent: a clause that does not name a component type is reported by
    /// the check of the definition that owns it.
    pub(crate) fn clause_component(&mut self, clause: RefId) -> Option<TypeId> {
        let ty = self.clause_type(clause)?;
        match self.refd_last(Ty::Defined(ty)) {
            Ty::Defined(body) => self
                .program
                .type_def(body)
                .as_component()
                .map(|_| body),
            _ => None,
        }
    }

    /// Port type named by a `port` clause or a port declaration.
    pub(crate) fn clause_port(&mut self, clause: RefId) -> Option<TypeId> {
        let ty = self.clause_type(clause)?;
        match self.refd_last(Ty::Defined(ty)) {
            Ty::Defined(body) => self.program.type_def(body).as_port().map(|_| body),
            _ => None,
        }
    }

    fn clause_type(&mut self, clause: RefId) -> Option<TypeId> {
        let resolved = self.resolve(clause);
        match &self.program.definition(resolved.target?).kind {
            DefKind::Type(ty) => Some(*ty),
            _ => None,
        }
    }

    /// Report definitions of one scope that share a name.
    pub(crate) fn chk_unique(&mut self, defs: &[DefId]) {
        let program = self.program;
        let mut seen: HashMap<Identifier, DefId> = HashMap::new();
        for &def in defs {
            let node = program.definition(def);
            match seen.get(&node.name) {
                Some(previous) => {
                    let previous = program.definition(*previous);
                    self.emit(
                        CompileError::new(
                            ErrorKind::DuplicateName,
                            node.span,
                            format!("Duplicate definition with name `{}'", node.name),
                        )
                        .with_label(
                            previous.span,
                            format!("Previous definition of `{}' is here", previous.name),
                        ),
                    );
                }
                None => {
                    seen.insert(node.name.clone(), def);
                }
            }
        }
    }

    /// Report a local definition or formal parameter whose name is already
    /// used by an enclosing scope below the module level.
    pub(crate) fn chk_unique_in_hierarchy(&mut self, def: DefId) {
        let program = self.program;
        let node = program.definition(def);
        let mut current = program.scope(program.def_scope(def)).parent;
        while let Some(scope) = current {
            let outer = program.scope(scope);
            if outer.is_module() {
                return;
            }
            if let Some(previous) = self.find_in_scope(scope, &node.name) {
                let previous = program.definition(previous);
                self.emit(
                    CompileError::new(
                        ErrorKind::DuplicateName,
                        node.span,
                        format!(
                            "Definition with name `{}' is not unique in the scope hierarchy",
                            node.name
                        ),
                    )
                    .with_label(
                        previous.span,
                        format!(
                            "Previous definition with identifier `{}' in higher scope unit is here",
                            previous.name
                        ),
                    ),
                );
                return;
            }
            current = outer.parent;
        }
    }

    /// Warn about a definition named like a module its module can refer to.
    pub(crate) fn chk_hides_module(&mut self, def: DefId) {
        let program = self.program;
        let node = program.definition(def);
        let module = program.def_module(def);
        if self.is_valid_moduleid(module, &node.name) {
            self.emit(CompileError::warning(
                ErrorKind::ShadowedName,
                node.span,
                format!("Definition with name `{}' hides a module identifier", node.name),
            ));
        }
    }

    /// Report a cycle in the `extends` graph of a component type.
    pub(crate) fn chk_component_extends(&mut self, component: TypeId) {
        let program = self.program;
        let Some(body) = program.type_def(component).as_component() else {
            return;
        };
        for &parent in &body.extends {
            let resolved = self.resolve(parent);
            let Some(def) = resolved.target else {
                continue;
            };
            let node = program.reference(parent);
            match self.clause_component(parent) {
                None => {
                    let description = program.definition(def).kind.description();
                    let is_type = matches!(program.definition(def).kind, DefKind::Type(_));
                    let what = if is_type {
                        format!("type `{}'", node.display())
                    } else {
                        format!("{description} `{}'", node.display())
                    };
                    self.emit(CompileError::new(
                        ErrorKind::ExpectedType,
                        node.span,
                        format!(
                            "Reference to a component type was expected in the `extends' clause instead of {what}"
                        ),
                    ));
                }
                Some(parent_body) => {
                    if self.component_extends(parent_body, component) {
                        self.emit(CompileError::new(
                            ErrorKind::CircularReference,
                            node.span,
                            format!(
                                "Circular component type extension: `{}' extends itself through `{}'",
                                self.type_display(Ty::Defined(component)),
                                node.display()
                            ),
                        ));
                    }
                }
            }
        }
        if let TypeKind::Component(body) = &program.type_def(component).kind {
            self.chk_unique(&body.definitions);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckConfig;
    use ttcn_ast::ast::{
        Block, Builtin, ComponentBody, Expr, FormalPar, FunctionDef, Statement, StatementKind,
        TypeExpr,
    };
    use ttcn_ast::ProgramBuilder;

    const INT: TypeExpr = TypeExpr::Builtin(Builtin::Integer);

    fn component(b: &mut ProgramBuilder, defs: Vec<DefId>, extends: &[&str]) -> TypeKind {
        let extends = extends.iter().map(|p| b.reference(p)).collect();
        TypeKind::Component(ComponentBody {
            extends,
            definitions: defs,
        })
    }

    #[test]
    fn test_lookup_through_runs_on_and_inheritance() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let base_var = b.var("inherited", INT, None);
        let kind = component(&mut b, vec![base_var], &[]);
        let base = b.type_def(m, "Base", kind);
        let own_var = b.var("own", INT, None);
        let kind = component(&mut b, vec![own_var], &["Base"]);
        let derived = b.type_def(m, "Derived", kind);
        let target = b.reference("inherited");
        let value = b.ref_expr("own");
        let body = Block::new(vec![Statement::new(StatementKind::Assign { target, value })]);
        let runs_on = b.reference("Derived");
        b.function(m, "f", FunctionDef::new(Vec::new()).runs_on(runs_on).body(body));
        let base = b.type_of(base);
        let derived = b.type_of(derived);
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        let scope = program.ref_scope(target);
        assert_eq!(
            checker.lookup_local(scope, &Identifier::new("inherited")),
            Some(base_var)
        );
        assert_eq!(checker.lookup_local(scope, &Identifier::new("own")), Some(own_var));
        assert!(checker.component_extends(derived, base));
        assert!(!checker.component_extends(base, derived));
    }

    #[test]
    fn test_local_name_reused_from_parameter_list() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let p = b.formal("x", FormalPar::value(INT));
        let local = b.var("x", INT, Some(Expr::int(1)));
        let body = Block::new(vec![Statement::new(StatementKind::Definition(local))]);
        b.function(m, "f", FunctionDef::new(vec![p]).body(body));
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        checker.chk_unique_in_hierarchy(local);
        let diags = checker.diagnostics();
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("not unique in the scope hierarchy"));
        assert_eq!(diags[0].labels[0].span, program.definition(p).span);
    }

    #[test]
    fn test_duplicate_definitions_in_scope() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let first = b.constant(m, "c", INT, Expr::int(1));
        let second = b.constant(m, "c", INT, Expr::int(2));
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        checker.chk_unique(&[first, second]);
        let diags = checker.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, ErrorKind::DuplicateName);
        assert_eq!(diags[0].span, program.definition(second).span);
    }

    #[test]
    fn test_circular_component_extension() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let kind = component(&mut b, Vec::new(), &["B"]);
        let a = b.type_def(m, "A", kind);
        let kind = component(&mut b, Vec::new(), &["A"]);
        b.type_def(m, "B", kind);
        let a = b.type_of(a);
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        checker.chk_component_extends(a);
        assert_eq!(checker.diagnostics().len(), 1);
        assert_eq!(checker.diagnostics()[0].kind, ErrorKind::CircularReference);
        assert_eq!(
            checker.component_member(a, &Identifier::new("missing")),
            None
        );
    }
}
