//! Program arena and the parent-binding pass.
//!
//! A [`Program`] owns every module, definition, type body and reference of
//! one compilation. Nodes point at each other only through typed ids.
//! The derived links (scope chain, owning module, declaring scope) are not
//! part of the serialized form; they are computed by
//! [`Program::bind_parents`] in a separate pass after the tree is complete.
//!
//! # Pipeline Position
//!
//! ```text
//! Parser → Program (arenas) → bind_parents → Checker
//!                               ^^^^^^^^^^^^
//!                               YOU ARE HERE
//! ```

use crate::ast::definition::{DefKind, FormalParList};
use crate::ast::expr::Expr;
use crate::ast::module::Module;
use crate::ast::port::{MappingKind, PortAttributeKind, TypeMapping};
use crate::ast::reference::{Reference, SubRef};
use crate::ast::scope::{Scope, ScopeKind};
use crate::ast::statement::{Block, StatementKind};
use crate::ast::types::{TypeDef, TypeExpr, TypeKind};
use crate::foundation::{DefId, Identifier, ModuleId, RefId, ScopeId, TypeId};
use serde::{Deserialize, Serialize};

/// Every node of one compilation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub definitions: Vec<crate::ast::definition::Definition>,
    #[serde(default)]
    pub types: Vec<TypeDef>,
    #[serde(default)]
    pub references: Vec<Reference>,
    #[serde(skip)]
    links: Option<Links>,
}

/// Child-to-parent links computed by [`Program::bind_parents`].
#[derive(Debug, Clone, Default)]
struct Links {
    scopes: Vec<Scope>,
    module_scopes: Vec<ScopeId>,
    def_scope: Vec<ScopeId>,
    def_module: Vec<ModuleId>,
    formal_owner: Vec<Option<DefId>>,
    type_scope: Vec<ScopeId>,
    type_module: Vec<ModuleId>,
    type_def: Vec<Option<DefId>>,
    ref_scope: Vec<ScopeId>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute scopes and parent links.
    ///
    /// Must run once the tree is complete and before any checking. Calling
    /// it again recomputes the links from scratch.
    ///
    /// # Panics
    /// Panics if a node is reachable twice or not at all, or if an id points
    /// outside its arena. Both indicate a malformed tree from the parser.
    pub fn bind_parents(&mut self) {
        let links = Binder::new(self).run();
        self.links = Some(links);
    }

    /// Whether [`bind_parents`](Self::bind_parents) has run.
    pub fn is_bound(&self) -> bool {
        self.links.is_some()
    }

    fn links(&self) -> &Links {
        match &self.links {
            Some(links) => links,
            None => panic!("program used before bind_parents()"),
        }
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.index()]
    }

    pub fn definition(&self, id: DefId) -> &crate::ast::definition::Definition {
        &self.definitions[id.index()]
    }

    pub fn type_def(&self, id: TypeId) -> &TypeDef {
        &self.types[id.index()]
    }

    pub fn reference(&self, id: RefId) -> &Reference {
        &self.references[id.index()]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.links().scopes[id.index()]
    }

    pub fn module_ids(&self) -> impl Iterator<Item = ModuleId> {
        (0..self.modules.len()).map(ModuleId::new)
    }

    pub fn ref_ids(&self) -> impl Iterator<Item = RefId> {
        (0..self.references.len()).map(RefId::new)
    }

    /// Module with the given name, first match in declaration order.
    pub fn find_module(&self, name: &Identifier) -> Option<ModuleId> {
        self.modules
            .iter()
            .position(|m| &m.name == name)
            .map(ModuleId::new)
    }

    /// Scope holding the top-level definitions of a module.
    pub fn module_scope(&self, module: ModuleId) -> ScopeId {
        self.links().module_scopes[module.index()]
    }

    /// Scope a definition is declared in.
    pub fn def_scope(&self, def: DefId) -> ScopeId {
        self.links().def_scope[def.index()]
    }

    /// Module a definition belongs to, directly or through nesting.
    pub fn def_module(&self, def: DefId) -> ModuleId {
        self.links().def_module[def.index()]
    }

    /// Parameterized definition owning a formal parameter.
    pub fn formal_owner(&self, par: DefId) -> Option<DefId> {
        self.links().formal_owner[par.index()]
    }

    /// Scope the references of a type body resolve in.
    pub fn type_scope(&self, ty: TypeId) -> ScopeId {
        self.links().type_scope[ty.index()]
    }

    pub fn type_module(&self, ty: TypeId) -> ModuleId {
        self.links().type_module[ty.index()]
    }

    /// `type` definition naming a body; `None` for anonymous bodies.
    pub fn type_name_def(&self, ty: TypeId) -> Option<DefId> {
        self.links().type_def[ty.index()]
    }

    /// Scope a reference is resolved in.
    pub fn ref_scope(&self, reference: RefId) -> ScopeId {
        self.links().ref_scope[reference.index()]
    }

    /// Module a scope belongs to.
    pub fn scope_module(&self, mut scope: ScopeId) -> ModuleId {
        loop {
            let s = self.scope(scope);
            if let ScopeKind::Module(module) = s.kind {
                return module;
            }
            match s.parent {
                Some(parent) => scope = parent,
                None => panic!("{scope} has no enclosing module scope"),
            }
        }
    }

    /// Whether a definition is declared inside a statement block.
    pub fn is_local(&self, def: DefId) -> bool {
        matches!(
            self.scope(self.def_scope(def)).kind,
            ScopeKind::StatementBlock
        )
    }

    /// Component type whose body declares `def`, if any.
    pub fn def_component(&self, def: DefId) -> Option<TypeId> {
        match self.scope(self.def_scope(def)).kind {
            ScopeKind::Component(ty) => Some(ty),
            _ => None,
        }
    }
}

/// Walks the tree once and records where every node hangs.
struct Binder<'p> {
    program: &'p Program,
    scopes: Vec<Scope>,
    module_scopes: Vec<ScopeId>,
    def_scope: Vec<Option<ScopeId>>,
    def_module: Vec<Option<ModuleId>>,
    formal_owner: Vec<Option<DefId>>,
    type_scope: Vec<Option<ScopeId>>,
    type_module: Vec<Option<ModuleId>>,
    type_def: Vec<Option<DefId>>,
    ref_scope: Vec<Option<ScopeId>>,
}

impl<'p> Binder<'p> {
    fn new(program: &'p Program) -> Self {
        Self {
            program,
            scopes: Vec::new(),
            module_scopes: Vec::with_capacity(program.modules.len()),
            def_scope: vec![None; program.definitions.len()],
            def_module: vec![None; program.definitions.len()],
            formal_owner: vec![None; program.definitions.len()],
            type_scope: vec![None; program.types.len()],
            type_module: vec![None; program.types.len()],
            type_def: vec![None; program.types.len()],
            ref_scope: vec![None; program.references.len()],
        }
    }

    fn run(mut self) -> Links {
        let program = self.program;
        for (idx, module) in program.modules.iter().enumerate() {
            let module_id = ModuleId::new(idx);
            let scope = self.new_scope(ScopeKind::Module(module_id), None);
            self.module_scopes.push(scope);
            for &def in &module.definitions {
                self.declare(def, scope, module_id);
            }
            for &def in &module.definitions {
                self.bind_def(def, scope, module_id);
            }
            if let Some(control) = &module.control {
                self.bind_block(control, scope, module_id);
            }
        }
        Links {
            scopes: self.scopes,
            module_scopes: self.module_scopes,
            def_scope: unwrap_all(self.def_scope, "definition"),
            def_module: unwrap_all(self.def_module, "definition"),
            formal_owner: self.formal_owner,
            type_scope: unwrap_all(self.type_scope, "type body"),
            type_module: unwrap_all(self.type_module, "type body"),
            type_def: self.type_def,
            ref_scope: unwrap_all(self.ref_scope, "reference"),
        }
    }

    fn new_scope(&mut self, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId::new(self.scopes.len());
        self.scopes.push(Scope::new(kind, parent));
        id
    }

    fn declare(&mut self, def: DefId, scope: ScopeId, module: ModuleId) {
        let slot = &mut self.def_scope[def.index()];
        assert!(slot.is_none(), "{def} appears twice in the tree");
        *slot = Some(scope);
        self.def_module[def.index()] = Some(module);
        self.scopes[scope.index()].definitions.push(def);
    }

    fn bind_def(&mut self, def: DefId, scope: ScopeId, module: ModuleId) {
        let program = self.program;
        match &program.definition(def).kind {
            DefKind::Type(ty) => {
                self.type_def[ty.index()] = Some(def);
                self.bind_type(*ty, scope, module);
            }
            DefKind::Const { ty, value } => {
                self.bind_type_expr(ty, scope, module);
                self.bind_expr(value, scope);
            }
            DefKind::ExtConst { ty } => self.bind_type_expr(ty, scope, module),
            DefKind::ModulePar { ty, default }
            | DefKind::Var { ty, init: default }
            | DefKind::VarTemplate {
                ty, init: default, ..
            } => {
                self.bind_type_expr(ty, scope, module);
                if let Some(value) = default {
                    self.bind_expr(value, scope);
                }
            }
            DefKind::Template(template) => {
                self.bind_type_expr(&template.ty, scope, module);
                let inner = match &template.params {
                    Some(params) => self.bind_formal_list(def, params, scope, module),
                    None => scope,
                };
                if let Some(base) = template.base {
                    self.bind_ref(base, inner);
                }
                self.bind_expr(&template.body, inner);
            }
            DefKind::Timer { duration, .. } => {
                if let Some(value) = duration {
                    self.bind_expr(value, scope);
                }
            }
            DefKind::Port { port_type, .. } => self.bind_type_expr(port_type, scope, module),
            DefKind::Function(function) | DefKind::ExtFunction(function) => {
                let mut inner = scope;
                if let Some(clause) = function.runs_on {
                    self.bind_ref(clause, scope);
                    inner = self.new_scope(ScopeKind::RunsOn { owner: def, clause }, Some(inner));
                }
                if let Some(clause) = function.port_clause {
                    self.bind_ref(clause, scope);
                    inner =
                        self.new_scope(ScopeKind::PortClause { owner: def, clause }, Some(inner));
                }
                if let Some(returns) = &function.returns {
                    self.bind_type_expr(&returns.ty, scope, module);
                }
                let inner = self.bind_formal_list(def, &function.params, inner, module);
                if let Some(body) = &function.body {
                    self.bind_block(body, inner, module);
                }
            }
            DefKind::Altstep(altstep) => {
                let mut inner = scope;
                if let Some(clause) = altstep.runs_on {
                    self.bind_ref(clause, scope);
                    inner = self.new_scope(ScopeKind::RunsOn { owner: def, clause }, Some(inner));
                }
                let inner = self.bind_formal_list(def, &altstep.params, inner, module);
                self.bind_block(&altstep.body, inner, module);
            }
            DefKind::Testcase(testcase) => {
                self.bind_ref(testcase.runs_on, scope);
                if let Some(system) = testcase.system {
                    self.bind_ref(system, scope);
                }
                let clause = testcase.runs_on;
                let inner = self.new_scope(ScopeKind::RunsOn { owner: def, clause }, Some(scope));
                let inner = self.bind_formal_list(def, &testcase.params, inner, module);
                self.bind_block(&testcase.body, inner, module);
            }
            DefKind::FormalPar(par) => {
                if let Some(ty) = &par.ty {
                    self.bind_type_expr(ty, scope, module);
                }
                if let Some(value) = &par.default {
                    self.bind_expr(value, scope);
                }
            }
        }
    }

    fn bind_formal_list(
        &mut self,
        owner: DefId,
        list: &FormalParList,
        parent: ScopeId,
        module: ModuleId,
    ) -> ScopeId {
        let scope = self.new_scope(ScopeKind::FormalParList(owner), Some(parent));
        for &par in &list.pars {
            self.declare(par, scope, module);
            self.formal_owner[par.index()] = Some(owner);
        }
        for &par in &list.pars {
            self.bind_def(par, scope, module);
        }
        scope
    }

    fn bind_type(&mut self, ty: TypeId, scope: ScopeId, module: ModuleId) {
        let slot = &mut self.type_scope[ty.index()];
        assert!(slot.is_none(), "{ty} appears twice in the tree");
        *slot = Some(scope);
        self.type_module[ty.index()] = Some(module);

        let program = self.program;
        match &program.type_def(ty).kind {
            TypeKind::Alias(inner) | TypeKind::RecordOf(inner) | TypeKind::SetOf(inner) => {
                self.bind_type_expr(inner, scope, module)
            }
            TypeKind::Array { element, .. } => self.bind_type_expr(element, scope, module),
            TypeKind::Record(fields) | TypeKind::Set(fields) | TypeKind::Union(fields) => {
                for field in fields {
                    self.bind_type_expr(&field.ty, scope, module);
                }
            }
            TypeKind::Enumerated(_) => {}
            TypeKind::Component(body) => {
                for &parent in &body.extends {
                    self.bind_ref(parent, scope);
                }
                let inner = self.new_scope(ScopeKind::Component(ty), Some(scope));
                for &def in &body.definitions {
                    self.declare(def, inner, module);
                }
                for &def in &body.definitions {
                    self.bind_def(def, inner, module);
                }
            }
            TypeKind::Port(body) => {
                for list in [&body.in_list, &body.out_list, &body.inout_list] {
                    for item in list {
                        self.bind_type_expr(item, scope, module);
                    }
                }
                for attribute in &body.attributes {
                    if let PortAttributeKind::User {
                        provider,
                        in_mappings,
                        out_mappings,
                    } = &attribute.kind
                    {
                        self.bind_ref(*provider, scope);
                        self.bind_mappings(in_mappings, scope, module);
                        self.bind_mappings(out_mappings, scope, module);
                    }
                }
                if let Some(translation) = &body.translation {
                    for &provider in &translation.providers {
                        self.bind_ref(provider, scope);
                    }
                    self.bind_mappings(&translation.in_mappings, scope, module);
                    self.bind_mappings(&translation.out_mappings, scope, module);
                }
                let inner = self.new_scope(ScopeKind::PortBody(ty), Some(scope));
                for &def in &body.variables {
                    self.declare(def, inner, module);
                }
                for &def in &body.variables {
                    self.bind_def(def, inner, module);
                }
            }
            TypeKind::Signature(body) => {
                for param in &body.params {
                    self.bind_type_expr(&param.ty, scope, module);
                }
                if let Some(returns) = &body.returns {
                    self.bind_type_expr(returns, scope, module);
                }
                for exception in &body.exceptions {
                    self.bind_type_expr(exception, scope, module);
                }
            }
        }
    }

    fn bind_mappings(&mut self, mappings: &[TypeMapping], scope: ScopeId, module: ModuleId) {
        for mapping in mappings {
            self.bind_type_expr(&mapping.source, scope, module);
            for target in &mapping.targets {
                if let Some(ty) = &target.target {
                    self.bind_type_expr(ty, scope, module);
                }
                if let MappingKind::Function(function) = target.kind {
                    self.bind_ref(function, scope);
                }
            }
        }
    }

    fn bind_type_expr(&mut self, ty: &TypeExpr, scope: ScopeId, module: ModuleId) {
        match ty {
            TypeExpr::Builtin(_) => {}
            TypeExpr::Named(reference) => self.bind_ref(*reference, scope),
            TypeExpr::Anonymous(body) => self.bind_type(*body, scope, module),
        }
    }

    fn bind_ref(&mut self, reference: RefId, scope: ScopeId) {
        let slot = &mut self.ref_scope[reference.index()];
        assert!(slot.is_none(), "{reference} appears twice in the tree");
        *slot = Some(scope);

        let program = self.program;
        let node = program.reference(reference);
        for part in &node.parts {
            if let SubRef::Index { index, .. } = part {
                self.bind_expr(index, scope);
            }
        }
        if let Some(params) = &node.params {
            for arg in params.exprs() {
                self.bind_expr(arg, scope);
            }
        }
    }

    fn bind_expr(&mut self, expr: &Expr, scope: ScopeId) {
        let mut refs = Vec::new();
        expr.for_each_ref(&mut |r| refs.push(r));
        for reference in refs {
            self.bind_ref(reference, scope);
        }
    }

    fn bind_block(&mut self, block: &Block, parent: ScopeId, module: ModuleId) {
        let scope = self.new_scope(ScopeKind::StatementBlock, Some(parent));
        for statement in &block.statements {
            match &statement.kind {
                StatementKind::Definition(def) => {
                    self.declare(*def, scope, module);
                    self.bind_def(*def, scope, module);
                }
                StatementKind::Assign { target, value } => {
                    self.bind_ref(*target, scope);
                    self.bind_expr(value, scope);
                }
                StatementKind::Invoke(reference) | StatementKind::Activate(reference) => {
                    self.bind_ref(*reference, scope)
                }
                StatementKind::Connect { left, right } | StatementKind::Map { left, right } => {
                    self.bind_expr(&left.component, scope);
                    self.bind_expr(&right.component, scope);
                }
                StatementKind::Start {
                    component,
                    function,
                } => {
                    self.bind_expr(component, scope);
                    self.bind_ref(*function, scope);
                }
                StatementKind::Return(value) => {
                    if let Some(value) = value {
                        self.bind_expr(value, scope);
                    }
                }
                StatementKind::Block(inner) => self.bind_block(inner, scope, module),
            }
        }
    }
}

fn unwrap_all<T>(slots: Vec<Option<T>>, what: &str) -> Vec<T> {
    slots
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| match slot {
            Some(value) => value,
            None => panic!("{what} #{idx} is not reachable from any module"),
        })
        .collect()
}
