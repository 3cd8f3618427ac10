//! Programmatic construction of a [`Program`].
//!
//! The parser is an external collaborator; this builder is how drivers and
//! tests assemble a tree directly. Every node receives a fresh, distinct
//! span so diagnostics can be matched back to the node that caused them.

use crate::ast::definition::{
    AltstepDef, DefKind, Definition, FormalPar, FunctionDef, TemplateDef, TestcaseDef,
};
use crate::ast::expr::Expr;
use crate::ast::module::{FriendDecl, ImportDecl, ImportMode, Module, ModuleKind, Visibility};
use crate::ast::program::Program;
use crate::ast::reference::{NamedPar, RawParList, Reference, SubRef};
use crate::ast::statement::Block;
use crate::ast::types::{Field, TypeDef, TypeExpr, TypeKind};
use crate::foundation::{DefId, Identifier, ModuleId, RefId, Span, TypeId};

/// Incremental [`Program`] construction.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
    next_offset: u32,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh span, distinct from every span handed out before.
    pub fn span(&mut self) -> Span {
        let start = self.next_offset;
        self.next_offset += 1;
        let line = u16::try_from(start / 4 + 1).unwrap_or(u16::MAX);
        Span::new(0, start, start + 1, line)
    }

    /// Bind parents and return the finished program.
    pub fn finish(mut self) -> Program {
        self.program.bind_parents();
        self.program
    }

    // === Modules ===

    pub fn module(&mut self, name: &str) -> ModuleId {
        let span = self.span();
        let id = ModuleId::new(self.program.modules.len());
        self.program
            .modules
            .push(Module::new(Identifier::new(name), span));
        id
    }

    /// ASN.1 module; its name is interpreted in ASN.1 notation.
    pub fn asn_module(&mut self, name: &str) -> ModuleId {
        let span = self.span();
        let id = ModuleId::new(self.program.modules.len());
        let mut module = Module::new(Identifier::asn(name), span);
        module.kind = ModuleKind::Asn;
        self.program.modules.push(module);
        id
    }

    pub fn import(
        &mut self,
        module: ModuleId,
        target: &str,
        mode: ImportMode,
        visibility: Visibility,
    ) {
        let span = self.span();
        self.program.modules[module.index()]
            .imports
            .push(ImportDecl {
                module: Identifier::new(target),
                mode,
                visibility,
                span,
            });
    }

    /// `import from target all;`
    pub fn import_all(&mut self, module: ModuleId, target: &str) {
        self.import(module, target, ImportMode::All, Visibility::Public);
    }

    pub fn friend(&mut self, module: ModuleId, name: &str) {
        let span = self.span();
        self.program.modules[module.index()]
            .friends
            .push(FriendDecl {
                module: Identifier::new(name),
                span,
            });
    }

    pub fn control(&mut self, module: ModuleId, body: Block) {
        self.program.modules[module.index()].control = Some(body);
    }

    // === References ===

    /// Reference to a dotted path such as `"Mod.rec.field"`.
    pub fn reference(&mut self, path: &str) -> RefId {
        let span = self.span();
        let mut reference = Reference::path(&path.split('.').collect::<Vec<_>>(), span);
        for part in &mut reference.parts {
            if let SubRef::Field { span: part_span, .. } = part {
                *part_span = self.span();
            }
        }
        self.add_reference(reference)
    }

    /// Reference to `path[index]`.
    pub fn indexed(&mut self, path: &str, index: Expr) -> RefId {
        let reference = self.reference(path);
        let span = self.span();
        self.program.references[reference.index()]
            .parts
            .push(SubRef::Index {
                index: Box::new(index),
                span,
            });
        reference
    }

    /// Append `.field` to an existing reference.
    pub fn push_field(&mut self, reference: RefId, field: &str) {
        let span = self.span();
        self.program.references[reference.index()]
            .parts
            .push(SubRef::Field {
                name: Identifier::new(field),
                span,
            });
    }

    /// `path(args)` with positional arguments.
    pub fn call(&mut self, path: &str, args: Vec<Expr>) -> RefId {
        self.call_named(path, args, Vec::new())
    }

    /// `path(positional..., name := value, ...)`.
    pub fn call_named(
        &mut self,
        path: &str,
        positional: Vec<Expr>,
        named: Vec<(&str, Expr)>,
    ) -> RefId {
        let reference = self.reference(path);
        let span = self.span();
        let named = named
            .into_iter()
            .map(|(name, value)| NamedPar {
                name: Identifier::new(name),
                value,
                span: self.span(),
            })
            .collect();
        self.program.references[reference.index()].params = Some(RawParList {
            positional,
            named,
            span,
        });
        reference
    }

    pub fn add_reference(&mut self, reference: Reference) -> RefId {
        let id = RefId::new(self.program.references.len());
        self.program.references.push(reference);
        id
    }

    /// Expression consisting of a reference to `path`.
    pub fn ref_expr(&mut self, path: &str) -> Expr {
        let reference = self.reference(path);
        let span = self.span();
        Expr::reference(reference).with_span(span)
    }

    /// Type expression naming the type definition at `path`.
    pub fn type_ref(&mut self, path: &str) -> TypeExpr {
        TypeExpr::Named(self.reference(path))
    }

    // === Definitions ===

    /// Allocate a definition without attaching it anywhere.
    ///
    /// Attach it to a module with [`add`](Self::add), or place it in a
    /// component body, port body, formal parameter list or statement.
    pub fn def(&mut self, name: &str, kind: DefKind) -> DefId {
        let span = self.span();
        let id = DefId::new(self.program.definitions.len());
        self.program
            .definitions
            .push(Definition::new(Identifier::new(name), span, kind));
        id
    }

    /// Attach a definition to the top level of a module.
    pub fn add(&mut self, module: ModuleId, def: DefId) -> DefId {
        self.program.modules[module.index()].definitions.push(def);
        def
    }

    /// Allocate a definition and attach it to a module.
    pub fn define(&mut self, module: ModuleId, name: &str, kind: DefKind) -> DefId {
        let def = self.def(name, kind);
        self.add(module, def)
    }

    pub fn set_visibility(&mut self, def: DefId, visibility: Visibility) {
        self.program.definitions[def.index()].visibility = visibility;
    }

    pub fn new_type(&mut self, kind: TypeKind) -> TypeId {
        let span = self.span();
        let id = TypeId::new(self.program.types.len());
        self.program.types.push(TypeDef::new(kind, span));
        id
    }

    /// Mutable access to a type body, e.g. to add encodings.
    pub fn type_body_mut(&mut self, ty: TypeId) -> &mut TypeDef {
        &mut self.program.types[ty.index()]
    }

    /// `type <kind> name;` at module level.
    pub fn type_def(&mut self, module: ModuleId, name: &str, kind: TypeKind) -> DefId {
        let ty = self.new_type(kind);
        self.define(module, name, DefKind::Type(ty))
    }

    /// Type body of a type definition.
    ///
    /// # Panics
    /// Panics if `def` is not a type definition.
    pub fn type_of(&self, def: DefId) -> TypeId {
        match self.program.definitions[def.index()].kind {
            DefKind::Type(ty) => ty,
            _ => panic!("{def} is not a type definition"),
        }
    }

    pub fn field(&mut self, name: &str, ty: TypeExpr, optional: bool) -> Field {
        Field {
            name: Identifier::new(name),
            ty,
            optional,
            span: self.span(),
        }
    }

    pub fn constant(&mut self, module: ModuleId, name: &str, ty: TypeExpr, value: Expr) -> DefId {
        self.define(module, name, DefKind::Const { ty, value })
    }

    /// Unattached variable, for statement blocks and component bodies.
    pub fn var(&mut self, name: &str, ty: TypeExpr, init: Option<Expr>) -> DefId {
        self.def(name, DefKind::Var { ty, init })
    }

    pub fn template(&mut self, module: ModuleId, name: &str, template: TemplateDef) -> DefId {
        self.define(module, name, DefKind::Template(template))
    }

    /// Unattached formal parameter.
    pub fn formal(&mut self, name: &str, par: FormalPar) -> DefId {
        self.def(name, DefKind::FormalPar(par))
    }

    pub fn function(&mut self, module: ModuleId, name: &str, function: FunctionDef) -> DefId {
        let function = self.with_body(function);
        self.define(module, name, DefKind::Function(function))
    }

    pub fn ext_function(&mut self, module: ModuleId, name: &str, function: FunctionDef) -> DefId {
        self.define(module, name, DefKind::ExtFunction(function))
    }

    pub fn altstep(&mut self, module: ModuleId, name: &str, altstep: AltstepDef) -> DefId {
        self.define(module, name, DefKind::Altstep(altstep))
    }

    pub fn testcase(&mut self, module: ModuleId, name: &str, testcase: TestcaseDef) -> DefId {
        self.define(module, name, DefKind::Testcase(testcase))
    }

    fn with_body(&mut self, mut function: FunctionDef) -> FunctionDef {
        if function.body.is_none() {
            let span = self.span();
            function.body = Some(Block {
                statements: Vec::new(),
                span,
            });
        }
        function
    }
}
