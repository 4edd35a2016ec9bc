//! Sorted string registries that hand out dense ids.

use super::interner::StringInterner;
use super::writer::ByteWriter;
use crate::error::{IndexError, Result};
use crate::format::MAX_LIST_LEN;
use crate::types::Id;

/// A sorted, duplicate-free list of strings.
///
/// The id of a member is its rank in ascending byte order, so ids are only
/// final once every member has been added.
#[derive(Debug, Clone)]
pub struct StringList {
    what: &'static str,
    strings: Vec<String>,
}

impl StringList {
    /// `what` names the list in error messages ("app names", ...).
    pub fn new(what: &'static str) -> Self {
        StringList {
            what,
            strings: Vec::new(),
        }
    }

    /// Insert `value` in sorted position unless it is already present.
    pub fn ensure(&mut self, value: &str) {
        if let Err(pos) = self.search(value) {
            self.strings.insert(pos, value.to_string());
        }
    }

    /// Id (rank) of `value`.
    ///
    /// A miss means the builder looked up a string it never registered.
    pub fn id(&self, value: &str) -> Result<Id> {
        let pos = self.search(value).map_err(|_| {
            IndexError::internal(format!("{:?} is not in the {} list", value, self.what))
        })?;
        Id::try_from(pos)
            .ok()
            .filter(|&id| (id as usize) < MAX_LIST_LEN)
            .ok_or_else(|| IndexError::internal(format!("{} id {} out of range", self.what, pos)))
    }

    pub fn contains(&self, value: &str) -> bool {
        self.search(value).is_ok()
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Members in id order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }

    /// Register every member in the neutral string bucket.
    pub fn populate_strings(&self, interner: &mut StringInterner) {
        for s in &self.strings {
            interner.add_string(None, s);
        }
    }

    /// Fail if the list no longer fits the 16-bit id space.
    pub fn check_capacity(&self) -> Result<()> {
        if self.strings.len() > MAX_LIST_LEN {
            return Err(IndexError::CapacityExceeded {
                what: self.what,
                count: self.strings.len(),
                limit: MAX_LIST_LEN,
            });
        }
        Ok(())
    }

    /// Write the list; requires the neutral bucket to be written already.
    pub fn serialize(&self, interner: &StringInterner, out: &mut ByteWriter) -> Result<u32> {
        self.check_capacity()?;

        let offset = out.aligned_offset(4)?;
        out.write_u16(self.strings.len() as u16)?;
        out.write_u16(0xFFFF)?;
        for s in &self.strings {
            out.write_u32(interner.offset(None, s)?)?;
        }

        Ok(offset)
    }

    fn search(&self, value: &str) -> std::result::Result<usize, usize> {
        self.strings
            .binary_search_by(|probe| probe.as_bytes().cmp(value.as_bytes()))
    }
}
