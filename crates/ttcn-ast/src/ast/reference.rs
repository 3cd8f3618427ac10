//! Reference occurrences.
//!
//! A reference is the dotted, indexed path written at a use site:
//! `Mod.def(args).field[i]`. The parser cannot tell whether a leading
//! identifier names a module or a definition, so every part is kept as a
//! [`SubRef`] and the checker splits off the module identifier later.

use crate::ast::expr::Expr;
use crate::foundation::{Identifier, Span};
use serde::{Deserialize, Serialize};

/// One step after the head of a reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SubRef {
    /// `.name`
    Field { name: Identifier, span: Span },
    /// `[expr]`
    Index { index: Box<Expr>, span: Span },
}

impl SubRef {
    pub fn span(&self) -> Span {
        match self {
            SubRef::Field { span, .. } | SubRef::Index { span, .. } => *span,
        }
    }

    pub fn as_field(&self) -> Option<&Identifier> {
        match self {
            SubRef::Field { name, .. } => Some(name),
            SubRef::Index { .. } => None,
        }
    }
}

/// `name := value` actual parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPar {
    pub name: Identifier,
    pub value: Expr,
    pub span: Span,
}

/// Actual parameter list as written: positional entries followed by
/// named entries. A positional `-` is an [`ExprKind::NotUsed`](crate::ast::expr::ExprKind::NotUsed).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawParList {
    #[serde(default)]
    pub positional: Vec<Expr>,
    #[serde(default)]
    pub named: Vec<NamedPar>,
    #[serde(default)]
    pub span: Span,
}

impl RawParList {
    pub fn positional(args: Vec<Expr>) -> Self {
        Self {
            positional: args,
            named: Vec::new(),
            span: Span::default(),
        }
    }

    /// Every argument expression in source order.
    pub fn exprs(&self) -> impl Iterator<Item = &Expr> {
        self.positional
            .iter()
            .chain(self.named.iter().map(|named| &named.value))
    }
}

/// A reference occurrence.
///
/// `parts[0]` is always a field (identifier). When the checker decides the
/// first identifier is a module name, `parts[1]` becomes the head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub span: Span,
    /// Explicit module qualifier set by a parser that already knows it
    #[serde(default)]
    pub modid: Option<Identifier>,
    pub parts: Vec<SubRef>,
    /// Actual parameters, attached to the head
    #[serde(default)]
    pub params: Option<RawParList>,
}

impl Reference {
    /// `a.b.c` with no parameters.
    pub fn path(names: &[&str], span: Span) -> Self {
        Self {
            span,
            modid: None,
            parts: names
                .iter()
                .map(|n| SubRef::Field {
                    name: Identifier::new(*n),
                    span,
                })
                .collect(),
            params: None,
        }
    }

    /// First identifier, before any module split.
    ///
    /// # Panics
    /// Panics if the reference is empty or starts with an index.
    pub fn first_id(&self) -> &Identifier {
        match self.parts.first() {
            Some(SubRef::Field { name, .. }) => name,
            _ => panic!("reference does not start with an identifier"),
        }
    }

    /// Textual rendering for diagnostics, e.g. `M.c[..].f`.
    pub fn display(&self) -> String {
        let mut out = String::new();
        if let Some(modid) = &self.modid {
            out.push_str(modid.display_name());
            out.push('.');
        }
        for (idx, part) in self.parts.iter().enumerate() {
            match part {
                SubRef::Field { name, .. } => {
                    if idx > 0 {
                        out.push('.');
                    }
                    out.push_str(name.display_name());
                }
                SubRef::Index { .. } => out.push_str("[...]"),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_path() {
        let mut r = Reference::path(&["Mod", "rec", "f"], Span::default());
        r.parts.insert(
            2,
            SubRef::Index {
                index: Box::new(Expr::int(0)),
                span: Span::default(),
            },
        );
        assert_eq!(r.display(), "Mod.rec[...].f");
        assert_eq!(r.first_id().display_name(), "Mod");
    }

    #[test]
    #[should_panic(expected = "does not start with an identifier")]
    fn test_first_id_of_empty_reference_panics() {
        let r = Reference {
            span: Span::default(),
            modid: None,
            parts: Vec::new(),
            params: None,
        };
        let _ = r.first_id();
    }
}
