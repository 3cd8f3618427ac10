//! Import tables and cross-module visibility.
//!
//! Every module gets one [`ImportTable`] built from its import declarations.
//! Tables are built on first use; building a module's table builds the
//! tables of everything it imports, which is also how import cycles are
//! found.
//!
//! An unqualified name that is not defined locally is looked up through the
//! table. Plain and selective imports expose the imported module's own
//! definitions; an import-of-import exposes what that module imports in
//! turn, recursively. Visibility is always judged against the *ultimate*
//! importer: a `friend` definition is visible only if its module lists the
//! module doing the lookup, and a `private` import link is never followed.
//! A candidate behind a closed gate is dropped silently, it does not make
//! the lookup ambiguous.
//!
//! A name reached through an import-of-import makes the defining module a
//! dependency of the importer; the table records it so code emission can
//! include it.

use crate::error::{CompileError, ErrorKind};
use crate::resolve::checker::Checker;
use serde::Serialize;
use std::collections::HashSet;
use ttcn_ast::ast::{ImportMode, ModuleKind, Visibility};
use ttcn_ast::foundation::{DefId, Identifier, ModuleId, Span};

/// How an entry exposes the imported module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImportKind {
    /// All definitions of the module
    All,
    /// Only the listed definitions
    Selective,
    /// What the module itself imports
    ImportOfImport,
    /// Added by the checker for a transitively used module
    Dependency,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportEntry {
    pub module: ModuleId,
    pub kind: ImportKind,
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<Identifier>,
    pub span: Span,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportTable {
    pub entries: Vec<ImportEntry>,
    /// Some import names a module that does not exist
    pub unresolved: bool,
}

impl ImportTable {
    /// Whether `module` was imported explicitly (not as a dependency).
    pub fn imports_module(&self, module: ModuleId) -> bool {
        self.explicit().any(|e| e.module == module)
    }

    /// Modules added because a transitively imported name was used.
    pub fn dependencies(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.entries
            .iter()
            .filter(|e| e.kind == ImportKind::Dependency)
            .map(|e| e.module)
    }

    fn explicit(&self) -> impl Iterator<Item = &ImportEntry> {
        self.entries
            .iter()
            .filter(|e| e.kind != ImportKind::Dependency)
    }
}

/// Result of looking a name up through the imports of a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportLookup {
    NotFound,
    /// `chain` lists the modules walked, ending with the defining module
    Found { def: DefId, chain: Vec<ModuleId> },
    /// Two different definitions are reachable
    Ambiguous(DefId, DefId),
}

impl ImportLookup {
    fn merge(self, other: ImportLookup) -> ImportLookup {
        match (self, other) {
            (ImportLookup::NotFound, other) => other,
            (found, ImportLookup::NotFound) => found,
            (ImportLookup::Ambiguous(a, b), _) => ImportLookup::Ambiguous(a, b),
            (_, ImportLookup::Ambiguous(a, b)) => ImportLookup::Ambiguous(a, b),
            (ImportLookup::Found { def, chain }, ImportLookup::Found { def: other, .. }) => {
                if def == other {
                    ImportLookup::Found { def, chain }
                } else {
                    ImportLookup::Ambiguous(def, other)
                }
            }
        }
    }
}

/// Result of a module-qualified lookup `M.x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QualifiedLookup {
    Found(DefId),
    NoModule,
    NotImported(ModuleId),
    NoDefinition(ModuleId),
    Ambiguous(DefId, DefId),
}

impl<'p> Checker<'p> {
    /// Import table of a module, built on first use.
    pub fn import_table(&mut self, module: ModuleId) -> &ImportTable {
        self.chk_imports(module);
        &self.imports[&module]
    }

    /// Build the import table of `module` and of everything it imports.
    pub(crate) fn chk_imports(&mut self, module: ModuleId) {
        if self.imports.contains_key(&module) || self.import_stack.contains(&module) {
            return;
        }
        let program = self.program;
        let node = program.module(module);
        tracing::debug!(module = %node.name, "building import table");
        self.import_stack.push(module);

        let mut table = ImportTable::default();
        for decl in &node.imports {
            let Some(target) = program.find_module(&decl.module) else {
                self.emit(CompileError::new(
                    ErrorKind::InvalidImport,
                    decl.span,
                    format!("There is no module with name `{}'", decl.module),
                ));
                table.unresolved = true;
                continue;
            };
            if target == module {
                self.emit(CompileError::new(
                    ErrorKind::InvalidImport,
                    decl.span,
                    format!("A module cannot import from itself: `{}'", decl.module),
                ));
                continue;
            }
            match self.import_stack.iter().position(|m| *m == target) {
                Some(pos) => {
                    let cycle: Vec<ModuleId> = self.import_stack[pos..].to_vec();
                    self.report_import_cycle(&cycle, decl.span);
                }
                None => self.chk_imports(target),
            }
            let (kind, symbols) = match &decl.mode {
                ImportMode::All => (ImportKind::All, Vec::new()),
                ImportMode::Selective(names) => (ImportKind::Selective, names.clone()),
                ImportMode::ImportOfImport => (ImportKind::ImportOfImport, Vec::new()),
            };
            table.entries.push(ImportEntry {
                module: target,
                kind,
                visibility: decl.visibility,
                symbols,
                span: decl.span,
            });
        }

        self.import_stack.pop();
        self.imports.insert(module, table);
    }

    fn report_import_cycle(&mut self, cycle: &[ModuleId], span: Span) {
        let program = self.program;
        // Object-description modules refer to each other freely.
        if cycle
            .iter()
            .all(|m| program.module(*m).kind == ModuleKind::Asn)
        {
            return;
        }
        let mut names: Vec<String> = cycle
            .iter()
            .map(|m| format!("`{}'", program.module(*m).name))
            .collect();
        names.push(names[0].clone());
        self.emit(CompileError::warning(
            ErrorKind::InvalidImport,
            span,
            format!(
                "Circular import chain is not recommended: {}",
                names.join(" -> ")
            ),
        ));
    }

    /// Report friend declarations naming unknown or repeated modules.
    pub(crate) fn chk_friends(&mut self, module: ModuleId) {
        let program = self.program;
        let mut seen = HashSet::new();
        for friend in &program.module(module).friends {
            if program.find_module(&friend.module).is_none() {
                self.emit(CompileError::warning(
                    ErrorKind::InvalidImport,
                    friend.span,
                    format!(
                        "There is no module with name `{}' (friend declaration)",
                        friend.module
                    ),
                ));
            }
            if !seen.insert(friend.module.clone()) {
                self.emit(CompileError::warning(
                    ErrorKind::DuplicateName,
                    friend.span,
                    format!("Duplicate friend module with name `{}'", friend.module),
                ));
            }
        }
    }

    /// Whether `id` can stand for a module in references of `module`: its
    /// own name or the name of a module it imports.
    pub(crate) fn is_valid_moduleid(&mut self, module: ModuleId, id: &Identifier) -> bool {
        let program = self.program;
        if &program.module(module).name == id {
            return true;
        }
        self.chk_imports(module);
        self.imports[&module]
            .explicit()
            .any(|e| &program.module(e.module).name == id)
    }

    /// Look an unqualified name up through the imports of `importer`.
    ///
    /// A definition reached through an import of imports becomes a
    /// dependency of `importer`.
    pub fn import_lookup(&mut self, importer: ModuleId, id: &Identifier) -> ImportLookup {
        let result = self.find_imported(importer, id);
        self.record_dependency(importer, &result);
        result
    }

    /// Like [`Checker::import_lookup`] but leaves the import table of
    /// `importer` untouched.
    pub(crate) fn find_imported(&mut self, importer: ModuleId, id: &Identifier) -> ImportLookup {
        self.chk_imports(importer);
        let entries: Vec<ImportEntry> = self.imports[&importer].explicit().cloned().collect();
        let mut result = ImportLookup::NotFound;
        for entry in &entries {
            let mut visited = Vec::new();
            let found = self.lookup_through(entry, importer, id, &mut visited);
            result = result.merge(found);
            if matches!(result, ImportLookup::Ambiguous(..)) {
                return result;
            }
        }
        result
    }

    fn record_dependency(&mut self, importer: ModuleId, result: &ImportLookup) {
        if let ImportLookup::Found { def, chain } = result {
            if chain.len() > 1 {
                let defining = self.program.def_module(*def);
                self.add_dependency(importer, defining);
            }
        }
    }

    fn lookup_through(
        &mut self,
        entry: &ImportEntry,
        ultimate: ModuleId,
        id: &Identifier,
        visited: &mut Vec<ModuleId>,
    ) -> ImportLookup {
        match entry.kind {
            ImportKind::All => self.exported(entry.module, id, ultimate),
            ImportKind::Selective if entry.symbols.contains(id) => {
                self.exported(entry.module, id, ultimate)
            }
            ImportKind::Selective | ImportKind::Dependency => ImportLookup::NotFound,
            ImportKind::ImportOfImport => {
                if visited.contains(&entry.module) {
                    return ImportLookup::NotFound;
                }
                visited.push(entry.module);
                self.chk_imports(entry.module);
                let nested: Vec<ImportEntry> =
                    self.imports[&entry.module].explicit().cloned().collect();
                let mut result = ImportLookup::NotFound;
                for link in &nested {
                    if !self.link_visible(link, entry.module, ultimate) {
                        continue;
                    }
                    let found = match self.lookup_through(link, ultimate, id, visited) {
                        ImportLookup::Found { def, mut chain } => {
                            chain.insert(0, entry.module);
                            ImportLookup::Found { def, chain }
                        }
                        other => other,
                    };
                    result = result.merge(found);
                }
                result
            }
        }
    }

    /// Whether an import link held by `holder` may be followed on behalf of
    /// `ultimate`.
    fn link_visible(&self, link: &ImportEntry, holder: ModuleId, ultimate: ModuleId) -> bool {
        match link.visibility {
            Visibility::Public => true,
            Visibility::Friend => {
                let program = self.program;
                program
                    .module(holder)
                    .has_friend(&program.module(ultimate).name)
            }
            Visibility::Private => false,
        }
    }

    /// Top-level definition of `module` named `id`, if visible to `ultimate`.
    fn exported(&self, module: ModuleId, id: &Identifier, ultimate: ModuleId) -> ImportLookup {
        let program = self.program;
        let node = program.module(module);
        let Some(def) = node
            .definitions
            .iter()
            .copied()
            .find(|d| &program.definition(*d).name == id)
        else {
            return ImportLookup::NotFound;
        };
        let visible = match program.definition(def).visibility {
            Visibility::Public => true,
            Visibility::Friend => node.has_friend(&program.module(ultimate).name),
            Visibility::Private => false,
        };
        if visible {
            ImportLookup::Found {
                def,
                chain: vec![module],
            }
        } else {
            ImportLookup::NotFound
        }
    }

    fn add_dependency(&mut self, importer: ModuleId, module: ModuleId) {
        if importer == module {
            return;
        }
        let Some(table) = self.imports.get_mut(&importer) else {
            return;
        };
        if table.entries.iter().any(|e| e.module == module) {
            return;
        }
        tracing::debug!(%importer, %module, "adding dependency import");
        table.entries.push(ImportEntry {
            module,
            kind: ImportKind::Dependency,
            visibility: Visibility::Private,
            symbols: Vec::new(),
            span: Span::default(),
        });
    }

    /// Look up `modid.id` from `current`.
    pub(crate) fn qualified_lookup(
        &mut self,
        current: ModuleId,
        modid: &Identifier,
        id: &Identifier,
    ) -> QualifiedLookup {
        let program = self.program;
        if &program.module(current).name == modid {
            return program
                .module(current)
                .definitions
                .iter()
                .copied()
                .find(|d| &program.definition(*d).name == id)
                .map_or(QualifiedLookup::NoDefinition(current), QualifiedLookup::Found);
        }
        let Some(target) = program.find_module(modid) else {
            return QualifiedLookup::NoModule;
        };
        self.chk_imports(current);
        let entries: Vec<ImportEntry> = self.imports[&current]
            .explicit()
            .filter(|e| e.module == target)
            .cloned()
            .collect();
        if entries.is_empty() {
            return QualifiedLookup::NotImported(target);
        }
        let mut result = ImportLookup::NotFound;
        for entry in &entries {
            let mut visited = Vec::new();
            let found = self.lookup_through(entry, current, id, &mut visited);
            result = result.merge(found);
            if matches!(result, ImportLookup::Ambiguous(..)) {
                break;
            }
        }
        self.record_dependency(current, &result);
        match result {
            ImportLookup::Found { def, .. } => QualifiedLookup::Found(def),
            ImportLookup::Ambiguous(first, second) => QualifiedLookup::Ambiguous(first, second),
            ImportLookup::NotFound => QualifiedLookup::NoDefinition(target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckConfig;
    use crate::error::Severity;
    use ttcn_ast::ast::{Builtin, Expr, TypeExpr};
    use ttcn_ast::ProgramBuilder;

    const INT: TypeExpr = TypeExpr::Builtin(Builtin::Integer);

    #[test]
    fn test_transitive_visibility_through_private_link() {
        let mut b = ProgramBuilder::new();
        let a = b.module("A");
        let s = b.constant(a, "S", INT, Expr::int(1));
        let mb = b.module("B");
        b.import(mb, "A", ImportMode::All, Visibility::Public);
        let c = b.module("C");
        b.import(c, "B", ImportMode::ImportOfImport, Visibility::Private);
        let d = b.module("D");
        b.import(d, "C", ImportMode::ImportOfImport, Visibility::Public);
        let e = b.module("E");
        b.import(e, "B", ImportMode::ImportOfImport, Visibility::Public);
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        let name = Identifier::new("S");
        assert_eq!(checker.import_lookup(d, &name), ImportLookup::NotFound);
        assert_eq!(
            checker.import_lookup(e, &name),
            ImportLookup::Found {
                def: s,
                chain: vec![mb, a]
            }
        );
        assert_eq!(checker.import_table(e).dependencies().collect::<Vec<_>>(), vec![a]);
        assert!(checker.diagnostics().is_empty());
    }

    #[test]
    fn test_same_name_in_two_imports_is_ambiguous() {
        let mut b = ProgramBuilder::new();
        let m1 = b.module("M1");
        let x1 = b.constant(m1, "x", INT, Expr::int(1));
        let m2 = b.module("M2");
        let x2 = b.constant(m2, "x", INT, Expr::int(2));
        let main = b.module("Main");
        b.import_all(main, "M1");
        b.import_all(main, "M2");
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        assert_eq!(
            checker.import_lookup(main, &Identifier::new("x")),
            ImportLookup::Ambiguous(x1, x2)
        );
    }

    #[test]
    fn test_qualified_name_through_import_of_import_is_ambiguous() {
        let mut b = ProgramBuilder::new();
        let m1 = b.module("M1");
        let x1 = b.constant(m1, "x", INT, Expr::int(1));
        let m2 = b.module("M2");
        let x2 = b.constant(m2, "x", INT, Expr::int(2));
        let mb = b.module("B");
        b.import(mb, "M1", ImportMode::All, Visibility::Public);
        b.import(mb, "M2", ImportMode::All, Visibility::Public);
        let main = b.module("Main");
        b.import(main, "B", ImportMode::ImportOfImport, Visibility::Public);
        let reference = b.reference("B.x");
        b.constant(main, "user", INT, Expr::reference(reference));
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        let id = Identifier::new;
        assert_eq!(
            checker.qualified_lookup(main, &id("B"), &id("x")),
            QualifiedLookup::Ambiguous(x1, x2)
        );
        assert_eq!(checker.import_table(main).dependencies().count(), 0);

        let resolved = checker.resolve(reference);
        assert!(resolved.is_erroneous());
        let errors: Vec<_> = checker
            .diagnostics()
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::AmbiguousName);
        assert!(errors[0].message.contains("`M1.x' and to `M2.x'"));
    }

    #[test]
    fn test_qualified_name_through_import_of_import_adds_dependency() {
        let mut b = ProgramBuilder::new();
        let a = b.module("A");
        let s = b.constant(a, "S", INT, Expr::int(1));
        let mb = b.module("B");
        b.import(mb, "A", ImportMode::All, Visibility::Public);
        let main = b.module("Main");
        b.import(main, "B", ImportMode::ImportOfImport, Visibility::Public);
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        let id = Identifier::new;
        assert_eq!(
            checker.qualified_lookup(main, &id("B"), &id("S")),
            QualifiedLookup::Found(s)
        );
        assert_eq!(
            checker.import_table(main).dependencies().collect::<Vec<_>>(),
            vec![a]
        );
    }

    #[test]
    fn test_find_imported_leaves_dependencies_alone() {
        let mut b = ProgramBuilder::new();
        let a = b.module("A");
        let s = b.constant(a, "S", INT, Expr::int(1));
        let mb = b.module("B");
        b.import(mb, "A", ImportMode::All, Visibility::Public);
        let main = b.module("Main");
        b.import(main, "B", ImportMode::ImportOfImport, Visibility::Public);
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        assert!(matches!(
            checker.find_imported(main, &Identifier::new("S")),
            ImportLookup::Found { def, .. } if def == s
        ));
        assert_eq!(checker.import_table(main).dependencies().count(), 0);
    }

    #[test]
    fn test_selective_import_and_private_definition() {
        let mut b = ProgramBuilder::new();
        let lib = b.module("Lib");
        let shown = b.constant(lib, "shown", INT, Expr::int(1));
        b.constant(lib, "other", INT, Expr::int(2));
        let hidden = b.constant(lib, "hidden", INT, Expr::int(3));
        b.set_visibility(hidden, Visibility::Private);
        let main = b.module("Main");
        b.import(
            main,
            "Lib",
            ImportMode::Selective(vec![Identifier::new("shown"), Identifier::new("hidden")]),
            Visibility::Public,
        );
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        assert!(matches!(
            checker.import_lookup(main, &Identifier::new("shown")),
            ImportLookup::Found { def, .. } if def == shown
        ));
        assert_eq!(
            checker.import_lookup(main, &Identifier::new("other")),
            ImportLookup::NotFound
        );
        assert_eq!(
            checker.import_lookup(main, &Identifier::new("hidden")),
            ImportLookup::NotFound
        );
    }

    #[test]
    fn test_friend_definition_visible_to_friend_only() {
        let mut b = ProgramBuilder::new();
        let lib = b.module("Lib");
        let secret = b.constant(lib, "secret", INT, Expr::int(1));
        b.set_visibility(secret, Visibility::Friend);
        b.friend(lib, "Pal");
        let pal = b.module("Pal");
        b.import_all(pal, "Lib");
        let stranger = b.module("Stranger");
        b.import_all(stranger, "Lib");
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        let name = Identifier::new("secret");
        assert!(matches!(checker.import_lookup(pal, &name), ImportLookup::Found { .. }));
        assert_eq!(checker.import_lookup(stranger, &name), ImportLookup::NotFound);
    }

    #[test]
    fn test_import_errors_and_cycle_warning() {
        let mut b = ProgramBuilder::new();
        let a = b.module("A");
        b.import_all(a, "B");
        b.import_all(a, "Missing");
        b.import_all(a, "A");
        let mb = b.module("B");
        b.import_all(mb, "A");
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        checker.chk_imports(a);
        checker.chk_imports(a);
        let diags = checker.diagnostics();
        assert_eq!(diags.len(), 3);
        assert!(diags
            .iter()
            .any(|d| d.severity == Severity::Warning && d.message.contains("`A' -> `B' -> `A'")));
        assert!(diags.iter().any(|d| d.message.contains("`Missing'")));
        assert!(diags.iter().any(|d| d.message.contains("itself")));
        assert!(checker.import_table(a).unresolved);
        assert!(checker.import_table(a).imports_module(mb));
    }

    #[test]
    fn test_asn_cycle_is_silent() {
        let mut b = ProgramBuilder::new();
        let x = b.asn_module("X-Mod");
        b.import_all(x, "Y_Mod");
        let y = b.asn_module("Y-Mod");
        b.import_all(y, "X_Mod");
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        checker.chk_imports(x);
        assert!(checker.diagnostics().is_empty());
    }

    #[test]
    fn test_qualified_lookup() {
        let mut b = ProgramBuilder::new();
        let lib = b.module("Lib");
        let x = b.constant(lib, "x", INT, Expr::int(1));
        b.module("Unrelated");
        let main = b.module("Main");
        let own = b.constant(main, "y", INT, Expr::int(1));
        b.import_all(main, "Lib");
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        let id = Identifier::new;
        assert_eq!(
            checker.qualified_lookup(main, &id("Lib"), &id("x")),
            QualifiedLookup::Found(x)
        );
        assert_eq!(
            checker.qualified_lookup(main, &id("Main"), &id("y")),
            QualifiedLookup::Found(own)
        );
        assert_eq!(
            checker.qualified_lookup(main, &id("Lib"), &id("nope")),
            QualifiedLookup::NoDefinition(lib)
        );
        assert!(matches!(
            checker.qualified_lookup(main, &id("Unrelated"), &id("x")),
            QualifiedLookup::NotImported(_)
        ));
        assert_eq!(
            checker.qualified_lookup(main, &id("Nowhere"), &id("x")),
            QualifiedLookup::NoModule
        );
        assert!(checker.is_valid_moduleid(main, &id("Lib")));
        assert!(!checker.is_valid_moduleid(main, &id("Unrelated")));
    }
}
