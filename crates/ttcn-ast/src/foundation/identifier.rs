//! Identifiers with their display and target-language renderings.
//!
//! An [`Identifier`] is created once by the parser and never mutated. It
//! remembers the language it came from because TTCN-3 and ASN.1 spell the
//! same internal name differently: the TTCN-3 name `my_type` and the ASN.1
//! name `my-type` are both `my__type` internally. Equality, hashing and
//! ordering use the internal (canonical) name only, so lookups across the
//! two notations agree.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Notation an identifier was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IdentifierOrigin {
    /// TTCN-3 source
    #[default]
    Ttcn,
    /// ASN.1 source
    Asn,
}

/// Immutable name token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identifier {
    display: String,
    #[serde(default)]
    origin: IdentifierOrigin,
}

impl Identifier {
    /// Identifier written in TTCN-3 notation.
    ///
    /// # Panics
    /// Panics on an empty name; the parser never produces one.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_origin(name, IdentifierOrigin::Ttcn)
    }

    /// Identifier written in ASN.1 notation.
    pub fn asn(name: impl Into<String>) -> Self {
        Self::with_origin(name, IdentifierOrigin::Asn)
    }

    fn with_origin(name: impl Into<String>, origin: IdentifierOrigin) -> Self {
        let display = name.into();
        assert!(!display.is_empty(), "identifier with empty name");
        Self { display, origin }
    }

    /// Name as the user wrote it.
    pub fn display_name(&self) -> &str {
        &self.display
    }

    /// Notation the identifier came from.
    pub fn origin(&self) -> IdentifierOrigin {
        self.origin
    }

    /// Canonical internal name, also safe to use in generated code.
    pub fn name(&self) -> String {
        match self.origin {
            IdentifierOrigin::Ttcn => self.display.replace('_', "__"),
            IdentifierOrigin::Asn => asn_to_internal(&self.display),
        }
    }

    /// TTCN-3 spelling of the canonical name.
    pub fn ttcn_name(&self) -> String {
        match self.origin {
            IdentifierOrigin::Ttcn => self.display.clone(),
            IdentifierOrigin::Asn => internal_to_ttcn(&self.name()),
        }
    }
}

fn asn_to_internal(name: &str) -> String {
    let rooted = match name.strip_prefix('@') {
        Some(rest) => format!("_root_{rest}"),
        None => name.to_string(),
    };
    rooted
        .replace('-', "__")
        .replace('.', "_")
        .replace('&', "")
}

fn internal_to_ttcn(name: &str) -> String {
    name.trim_matches('_').replace("__", "_")
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name().cmp(&other.name())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display)
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
