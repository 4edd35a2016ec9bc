//! Inverted token index, build side.

use super::id_list::IdList;
use super::interner::StringInterner;
use super::writer::ByteWriter;
use crate::error::{IndexError, Result};
use crate::format::{INLINE_CAPACITY, INLINE_FLAG};
use crate::tokenizer;
use crate::types::{Id, NO_ID};
use std::collections::BTreeMap;

/// Token -> postings, kept in ascending token order.
#[derive(Debug, Clone, Default)]
pub struct TextIndex {
    entries: BTreeMap<String, IdList>,
}

impl TextIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `ids` to the postings of `token`, creating the entry if needed.
    pub fn add_ids(&mut self, token: &str, ids: &[Id]) {
        match self.entries.get_mut(token) {
            Some(list) => list.add_ids(ids),
            None => {
                self.entries.insert(token.to_string(), IdList::from(ids.to_vec()));
            }
        }
    }

    /// Tokenize `text` and add `ids` once for every distinct token in it.
    pub fn add_ids_tokenised(&mut self, text: &str, ids: &[Id]) {
        for token in tokenizer::distinct_tokens(text) {
            self.add_ids(&token, ids);
        }
    }

    pub fn get(&self, token: &str) -> Option<&[Id]> {
        self.entries.get(token).map(IdList::ids)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Register every token in the string bucket of `locale`.
    pub fn populate_strings(&self, interner: &mut StringInterner, locale: Option<&str>) {
        for token in self.entries.keys() {
            interner.add_string(locale, token);
        }
    }

    /// Write the index; tokens are resolved in the bucket of `locale`.
    ///
    /// Id lists for postings that do not fit inline are written first,
    /// followed by the aligned entry table.
    pub fn serialize(
        &self,
        locale: Option<&str>,
        interner: &StringInterner,
        out: &mut ByteWriter,
    ) -> Result<u32> {
        let mut indirect = Vec::with_capacity(self.entries.len());
        for list in self.entries.values() {
            indirect.push(if list.len() > INLINE_CAPACITY {
                Some(list.serialize(out)?)
            } else {
                None
            });
        }

        let n_entries = u32::try_from(self.entries.len())
            .map_err(|_| IndexError::internal("text index has too many entries"))?;

        let offset = out.aligned_offset(4)?;
        out.write_u32(n_entries)?;

        for ((token, list), pointer) in self.entries.iter().zip(indirect) {
            let token_offset = interner.offset(locale, token)?;
            if token_offset & INLINE_FLAG != 0 {
                return Err(IndexError::internal(format!(
                    "token offset {token_offset:#x} collides with the inline flag"
                )));
            }

            match pointer {
                Some(pointer) => {
                    out.write_u32(token_offset)?;
                    out.write_u32(pointer)?;
                }
                None => {
                    let ids = list.ids();
                    out.write_u32(token_offset | INLINE_FLAG)?;
                    out.write_u16(ids.first().copied().unwrap_or(NO_ID))?;
                    out.write_u16(ids.get(1).copied().unwrap_or(NO_ID))?;
                }
            }
        }

        Ok(offset)
    }
}
