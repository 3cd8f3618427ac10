//! Type bodies.
//!
//! A type body lives in the [`Program`](crate::ast::Program) type arena and
//! is named by the `type` definition that owns it. Anonymous bodies
//! (`record of record { .. }`) have no naming definition.

use crate::ast::port::PortBody;
use crate::foundation::{DefId, Identifier, RefId, Span, TypeId};
use serde::{Deserialize, Serialize};

/// Predefined types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Builtin {
    Integer,
    Float,
    Boolean,
    Charstring,
    UniversalCharstring,
    Bitstring,
    Hexstring,
    Octetstring,
    Verdict,
    Default,
}

impl Builtin {
    /// Type name as written in source.
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Integer => "integer",
            Builtin::Float => "float",
            Builtin::Boolean => "boolean",
            Builtin::Charstring => "charstring",
            Builtin::UniversalCharstring => "universal charstring",
            Builtin::Bitstring => "bitstring",
            Builtin::Hexstring => "hexstring",
            Builtin::Octetstring => "octetstring",
            Builtin::Verdict => "verdicttype",
            Builtin::Default => "default",
        }
    }

    /// String types can be indexed to a single element of the same type.
    pub fn is_string(self) -> bool {
        matches!(
            self,
            Builtin::Charstring
                | Builtin::UniversalCharstring
                | Builtin::Bitstring
                | Builtin::Hexstring
                | Builtin::Octetstring
        )
    }

    /// Types whose values can bound a range template.
    pub fn is_ordered(self) -> bool {
        matches!(
            self,
            Builtin::Integer | Builtin::Float | Builtin::Charstring | Builtin::UniversalCharstring
        )
    }
}

/// A type as it appears in a declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeExpr {
    /// Predefined type
    Builtin(Builtin),
    /// Reference to a `type` definition
    Named(RefId),
    /// Inline body
    Anonymous(TypeId),
}

/// Encodings a type or a mapping may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    Ber,
    Per,
    Raw,
    Text,
    Xer,
    Json,
}

impl Encoding {
    /// Encoding name as written in attributes.
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Ber => "BER",
            Encoding::Per => "PER",
            Encoding::Raw => "RAW",
            Encoding::Text => "TEXT",
            Encoding::Xer => "XER",
            Encoding::Json => "JSON",
        }
    }

    /// Stream type the encoder produces and the decoder consumes.
    pub fn stream_type(self) -> Builtin {
        match self {
            Encoding::Text => Builtin::Charstring,
            _ => Builtin::Octetstring,
        }
    }

    /// Whether predefined types can use this encoding without attributes.
    pub fn applies_to_builtins(self) -> bool {
        !matches!(self, Encoding::Ber | Encoding::Per)
    }
}

/// Field of a record, set or union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: Identifier,
    pub ty: TypeExpr,
    #[serde(default)]
    pub optional: bool,
    pub span: Span,
}

/// One array dimension `[start .. start + size - 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArrayDim {
    #[serde(default)]
    pub start: i64,
    pub size: u64,
}

impl ArrayDim {
    /// `[size]` starting at zero.
    pub fn new(size: u64) -> Self {
        Self { start: 0, size }
    }

    /// Last valid index. Wider than `i64` so that dimensions reaching the
    /// end of the integer range do not overflow; one below `start` when the
    /// dimension is empty.
    pub fn end(&self) -> i128 {
        i128::from(self.start) + i128::from(self.size) - 1
    }

    /// Whether `index` lies within the dimension.
    pub fn contains(&self, index: i64) -> bool {
        index >= self.start && i128::from(index) <= self.end()
    }
}

/// Parameter of a procedure signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureParam {
    pub name: Identifier,
    pub direction: crate::ast::definition::Direction,
    pub ty: TypeExpr,
}

/// Body of a `signature` type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureBody {
    #[serde(default)]
    pub params: Vec<SignatureParam>,
    #[serde(default)]
    pub returns: Option<TypeExpr>,
    #[serde(default)]
    pub exceptions: Vec<TypeExpr>,
    #[serde(default)]
    pub nonblocking: bool,
}

/// Body of a component type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentBody {
    /// `extends` clause
    #[serde(default)]
    pub extends: Vec<RefId>,
    /// Component-scoped definitions (variables, timers, ports, constants)
    #[serde(default)]
    pub definitions: Vec<DefId>,
}

/// Shape of a type body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeKind {
    /// `type integer MyInt;`
    Alias(TypeExpr),
    Record(Vec<Field>),
    Set(Vec<Field>),
    Union(Vec<Field>),
    RecordOf(TypeExpr),
    SetOf(TypeExpr),
    /// `type integer Arr[2][3];`
    Array {
        element: TypeExpr,
        dims: Vec<ArrayDim>,
    },
    Enumerated(Vec<Identifier>),
    Component(ComponentBody),
    Port(PortBody),
    Signature(SignatureBody),
}

impl TypeKind {
    /// Short description used in diagnostics.
    pub fn description(&self) -> &'static str {
        match self {
            TypeKind::Alias(_) => "type reference",
            TypeKind::Record(_) => "record type",
            TypeKind::Set(_) => "set type",
            TypeKind::Union(_) => "union type",
            TypeKind::RecordOf(_) => "record of type",
            TypeKind::SetOf(_) => "set of type",
            TypeKind::Array { .. } => "array type",
            TypeKind::Enumerated(_) => "enumerated type",
            TypeKind::Component(_) => "component type",
            TypeKind::Port(_) => "port type",
            TypeKind::Signature(_) => "signature",
        }
    }

    /// Fields of a record, set or union.
    pub fn fields(&self) -> Option<&[Field]> {
        match self {
            TypeKind::Record(fields) | TypeKind::Set(fields) | TypeKind::Union(fields) => {
                Some(fields)
            }
            _ => None,
        }
    }
}

/// A type body with its encoding attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub kind: TypeKind,
    pub span: Span,
    /// Encodings enabled by `with { encode ".." }`
    #[serde(default)]
    pub encodings: Vec<Encoding>,
}

impl TypeDef {
    pub fn new(kind: TypeKind, span: Span) -> Self {
        Self {
            kind,
            span,
            encodings: Vec::new(),
        }
    }

    /// Port body, if this is a port type.
    pub fn as_port(&self) -> Option<&PortBody> {
        match &self.kind {
            TypeKind::Port(body) => Some(body),
            _ => None,
        }
    }

    /// Component body, if this is a component type.
    pub fn as_component(&self) -> Option<&ComponentBody> {
        match &self.kind {
            TypeKind::Component(body) => Some(body),
            _ => None,
        }
    }

    /// Signature body, if this is a signature.
    pub fn as_signature(&self) -> Option<&SignatureBody> {
        match &self.kind {
            TypeKind::Signature(body) => Some(body),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_builtins() {
        assert!(Builtin::Octetstring.is_string());
        assert!(!Builtin::Integer.is_string());
        assert_eq!(Builtin::UniversalCharstring.name(), "universal charstring");
    }

    #[test]
    fn test_array_dim_bounds() {
        let dim = ArrayDim { start: 2, size: 3 };
        assert_eq!(dim.end(), 4);
        assert_eq!(ArrayDim::new(5).end(), 4);
        assert!(dim.contains(2) && dim.contains(4));
        assert!(!dim.contains(1) && !dim.contains(5));
    }

    #[test]
    fn test_array_dim_at_integer_limits() {
        let top = ArrayDim {
            start: i64::MAX - 1,
            size: 2,
        };
        assert_eq!(top.end(), i128::from(i64::MAX));
        assert!(top.contains(i64::MAX));
        assert!(!top.contains(i64::MAX - 2));

        let huge = ArrayDim {
            start: i64::MIN,
            size: u64::MAX,
        };
        assert!(huge.contains(i64::MIN));
        assert!(huge.contains(i64::MAX - 1));
        assert!(!ArrayDim::new(0).contains(0));
    }

    #[test]
    fn test_encoding_streams() {
        assert_eq!(Encoding::Text.stream_type(), Builtin::Charstring);
        assert_eq!(Encoding::Raw.stream_type(), Builtin::Octetstring);
        assert!(!Encoding::Ber.applies_to_builtins());
    }
}
