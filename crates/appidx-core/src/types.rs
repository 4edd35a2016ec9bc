//! Core data types shared by the builder and the reader.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense 16-bit identifier assigned by a string list (its rank).
pub type Id = u16;

/// Marker for an absent or invalid id.
///
/// The 16-bit id space reserves this value, which is why every string list is
/// capped at 65,535 members.
pub const NO_ID: Id = 0xFFFF;

/// The unit referenced by text-index postings: which app, which group of that
/// app's keyfile and which key within it produced a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdTriple {
    pub app: Id,
    pub group: Id,
    pub key: Id,
}

impl IdTriple {
    pub fn new(app: Id, group: Id, key: Id) -> Self {
        IdTriple { app, group, key }
    }

    /// The triple as the raw id slice stored in postings.
    pub fn as_ids(&self) -> [Id; 3] {
        [self.app, self.group, self.key]
    }
}

impl fmt::Display for IdTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.app, self.group, self.key)
    }
}

/// An [`IdTriple`] with every id resolved back to its name.
///
/// Ids that do not resolve (corrupted index) come back as empty strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTriple<'a> {
    pub app: &'a str,
    pub group: &'a str,
    pub key: &'a str,
}

/// Statistics about an opened index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of applications
    pub apps: usize,

    /// Number of distinct key names
    pub keys: usize,

    /// Number of distinct locales
    pub locales: usize,

    /// Number of distinct group names
    pub groups: usize,

    /// Tokens in the global (untranslated) text index
    pub global_tokens: usize,

    /// Size of the index buffer in bytes
    pub size_bytes: usize,

    /// Index format version
    pub version: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triple_display() {
        let t = IdTriple::new(1, 0, 12);
        assert_eq!(t.to_string(), "(1, 0, 12)");
        assert_eq!(t.as_ids(), [1, 0, 12]);
    }

    #[test]
    fn test_triple_ordering() {
        let a = IdTriple::new(0, 5, 5);
        let b = IdTriple::new(1, 0, 0);
        assert!(a < b);
    }
}
