//! Variable-length lists of 16-bit ids.

use super::writer::ByteWriter;
use crate::error::{IndexError, Result};
use crate::format::MAX_LIST_LEN;
use crate::types::Id;

/// Insertion-ordered ids. Duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdList {
    ids: Vec<Id>,
}

impl IdList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_ids(&mut self, ids: &[Id]) {
        self.ids.extend_from_slice(ids);
    }

    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Write `n_ids` then the ids; returns the list's offset.
    pub fn serialize(&self, out: &mut ByteWriter) -> Result<u32> {
        if self.ids.len() > MAX_LIST_LEN {
            return Err(IndexError::CapacityExceeded {
                what: "id list",
                count: self.ids.len(),
                limit: MAX_LIST_LEN,
            });
        }

        let offset = out.aligned_offset(2)?;
        out.write_u16(self.ids.len() as u16)?;
        for &id in &self.ids {
            out.write_u16(id)?;
        }
        Ok(offset)
    }
}

impl From<Vec<Id>> for IdList {
    fn from(ids: Vec<Id>) -> Self {
        IdList { ids }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_order_and_duplicates() {
        let mut list = IdList::new();
        list.add_ids(&[3, 1, 2]);
        list.add_ids(&[3]);
        assert_eq!(list.ids(), &[3, 1, 2, 3]);
    }

    #[test]
    fn test_serialize() {
        let list = IdList::from(vec![5, 0xFFFE]);
        let mut out = ByteWriter::new();
        out.write_cstr(b"").unwrap();
        let offset = list.serialize(&mut out).unwrap();
        assert_eq!(offset, 2);
        assert_eq!(out.into_inner(), vec![0, 0, 2, 0, 5, 0, 0xFE, 0xFF]);
    }

    #[test]
    fn test_too_long() {
        let list = IdList::from(vec![0; MAX_LIST_LEN + 1]);
        let mut out = ByteWriter::new();
        assert!(list.serialize(&mut out).is_err());
    }
}
