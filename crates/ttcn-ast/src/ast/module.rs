//! Modules, imports and friend declarations.

use crate::ast::statement::Block;
use crate::foundation::{DefId, Identifier, Span};
use serde::{Deserialize, Serialize};

/// Notation a module was written in.
///
/// ASN.1 modules carry object descriptions; import cycles between them are
/// legal and checked silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModuleKind {
    /// TTCN-3 module
    #[default]
    Ttcn,
    /// ASN.1 module
    Asn,
}

/// Visibility of a definition or of an import declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Visibility {
    /// Usable from every importing module
    #[default]
    Public,
    /// Usable only from modules declared as friends of the owning module
    Friend,
    /// Never usable outside the owning module
    Private,
}

impl Visibility {
    /// Keyword as written in source.
    pub fn keyword(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Friend => "friend",
            Visibility::Private => "private",
        }
    }
}

/// How much of the target module an import declaration brings in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportMode {
    /// `import from M all`
    All,
    /// `import from M { const c; type T }`
    Selective(Vec<Identifier>),
    /// `import from M { import all }`: re-exports what `M` imports
    ImportOfImport,
}

/// One `import from` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDecl {
    /// Target module
    pub module: Identifier,
    /// Import mode
    pub mode: ImportMode,
    /// Visibility of this import for modules importing the owner
    #[serde(default)]
    pub visibility: Visibility,
    /// Location of the statement
    pub span: Span,
}

/// `friend module M;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendDecl {
    /// Module granted friend access
    pub module: Identifier,
    /// Location of the declaration
    pub span: Span,
}

/// A TTCN-3 or ASN.1 module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Module identifier
    pub name: Identifier,
    /// Location of the module header
    pub span: Span,
    /// Source notation
    #[serde(default)]
    pub kind: ModuleKind,
    /// Import declarations in source order
    #[serde(default)]
    pub imports: Vec<ImportDecl>,
    /// Friend declarations in source order
    #[serde(default)]
    pub friends: Vec<FriendDecl>,
    /// Top-level definitions in source order
    #[serde(default)]
    pub definitions: Vec<DefId>,
    /// Optional control part
    #[serde(default)]
    pub control: Option<Block>,
}

impl Module {
    /// New empty TTCN-3 module.
    pub fn new(name: Identifier, span: Span) -> Self {
        Self {
            name,
            span,
            kind: ModuleKind::Ttcn,
            imports: Vec::new(),
            friends: Vec::new(),
            definitions: Vec::new(),
            control: None,
        }
    }

    /// Whether `name` is declared as a friend of this module.
    pub fn has_friend(&self, name: &Identifier) -> bool {
        self.friends.iter().any(|f| &f.module == name)
    }
}
