//! Typed arena handles.
//!
//! Every node that other nodes point at lives in an arena on
//! [`Program`](crate::ast::Program) and is addressed by one of these ids.
//! Child-to-parent links are stored as ids too, so no node ever holds a
//! pointer to its owner.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Handle for the arena slot at `index`.
            pub fn new(index: usize) -> Self {
                assert!(index <= u32::MAX as usize, concat!(stringify!($name), " overflow"));
                Self(index as u32)
            }

            /// Arena slot this handle addresses.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Handle of a module
    ModuleId,
    "module"
);

define_id!(
    /// Handle of a definition (assignment), formal parameters included
    DefId,
    "def"
);

define_id!(
    /// Handle of a type body
    TypeId,
    "type"
);

define_id!(
    /// Handle of a reference occurrence
    RefId,
    "ref"
);

define_id!(
    /// Handle of a scope in the scope chain
    ScopeId,
    "scope"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip_index() {
        assert_eq!(DefId::new(42).index(), 42);
        assert_eq!(ScopeId::new(0), ScopeId(0));
    }

    #[test]
    fn test_id_display_is_prefixed() {
        assert_eq!(RefId::new(7).to_string(), "ref#7");
        assert_eq!(TypeId::new(3).to_string(), "type#3");
    }

    #[test]
    fn test_id_serializes_transparently() {
        let json = serde_json::to_string(&ModuleId::new(5)).unwrap();
        assert_eq!(json, "5");
    }
}
