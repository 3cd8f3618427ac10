//! Port type bodies, port attributes and type mappings.
//!
//! A port type either talks to the system directly or sits on top of one or
//! more provider ports and translates between its own message types and the
//! provider's. The old style writes the translation as an `extension` user
//! attribute; the standard style writes a `map to` clause with per-message
//! `from`/`to` lists.

use crate::ast::types::{Encoding, TypeExpr};
use crate::foundation::{DefId, RefId, Span};
use serde::{Deserialize, Serialize};

/// Communication model of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PortMode {
    #[default]
    Message,
    Procedure,
    Mixed,
}

/// How one mapping target is produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MappingKind {
    /// Passed through unchanged; the target type equals the source type
    Simple,
    /// Dropped
    Discard,
    /// Converted by a function with a prototype
    Function(RefId),
    /// Encoded into the stream type of the encoding
    Encode {
        encoding: Encoding,
        #[serde(default)]
        options: Option<String>,
    },
    /// Decoded from the stream type of the encoding
    Decode {
        encoding: Encoding,
        #[serde(default)]
        options: Option<String>,
    },
}

impl MappingKind {
    /// Keyword used in diagnostics.
    pub fn keyword(&self) -> &'static str {
        match self {
            MappingKind::Simple => "simple",
            MappingKind::Discard => "discard",
            MappingKind::Function(_) => "function",
            MappingKind::Encode { .. } => "encode",
            MappingKind::Decode { .. } => "decode",
        }
    }
}

/// One `-> target : kind` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingTarget {
    /// Target type; absent only for `discard`
    #[serde(default)]
    pub target: Option<TypeExpr>,
    pub kind: MappingKind,
    pub span: Span,
}

/// `source -> target1, target2, ...`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeMapping {
    pub source: TypeExpr,
    pub targets: Vec<MappingTarget>,
    pub span: Span,
}

/// Attribute attached to a port type with `with { extension ".." }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PortAttributeKind {
    /// Connections only, never mapped
    Internal,
    /// Port uses the module's `address` type
    Address,
    /// Port can serve as a provider for user ports
    Provider,
    /// Old-style translation on top of `provider`
    User {
        provider: RefId,
        #[serde(default)]
        in_mappings: Vec<TypeMapping>,
        #[serde(default)]
        out_mappings: Vec<TypeMapping>,
    },
    /// Attribute the checker does not interpret
    Other(String),
}

/// Port attribute with its location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortAttribute {
    pub kind: PortAttributeKind,
    pub span: Span,
}

/// Standard-style `map to` clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    /// Provider port types after `map to`
    pub providers: Vec<RefId>,
    /// `in (T from U with f())` entries
    #[serde(default)]
    pub in_mappings: Vec<TypeMapping>,
    /// `out (T to U with f())` entries
    #[serde(default)]
    pub out_mappings: Vec<TypeMapping>,
    pub span: Span,
}

/// Body of a port type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PortBody {
    pub mode: PortMode,
    #[serde(default)]
    pub in_list: Vec<TypeExpr>,
    #[serde(default)]
    pub out_list: Vec<TypeExpr>,
    #[serde(default)]
    pub inout_list: Vec<TypeExpr>,
    /// `in all`
    #[serde(default)]
    pub in_all: bool,
    /// `out all`
    #[serde(default)]
    pub out_all: bool,
    /// `inout all`
    #[serde(default)]
    pub inout_all: bool,
    #[serde(default)]
    pub attributes: Vec<PortAttribute>,
    #[serde(default)]
    pub translation: Option<Translation>,
    /// Port variables (`var` and `const` inside the port type)
    #[serde(default)]
    pub variables: Vec<DefId>,
}

impl PortBody {
    /// Empty body of the given mode.
    pub fn new(mode: PortMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// The `user` attribute, if present.
    pub fn user_attribute(&self) -> Option<&PortAttribute> {
        self.attributes
            .iter()
            .find(|a| matches!(a.kind, PortAttributeKind::User { .. }))
    }
}
