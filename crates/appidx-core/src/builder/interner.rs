//! Per-locale string interning.
//!
//! Strings are collected into one bucket per locale plus the neutral bucket
//! (no locale). A bucket is flushed to the output as a block of NUL-terminated
//! strings; afterwards every string it holds has a final file offset.
//!
//! The neutral bucket must be written first. A value in another bucket that
//! also exists in the neutral bucket is not written again and resolves to the
//! neutral offset. Non-neutral buckets are never merged with each other.

use super::writer::ByteWriter;
use crate::error::{IndexError, Result};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
struct Bucket {
    /// value -> offset once written
    strings: BTreeMap<String, Option<u32>>,
    written: bool,
}

/// String tables keyed by locale; `None` is the neutral ("C") bucket.
#[derive(Debug, Default)]
pub struct StringInterner {
    buckets: HashMap<Option<String>, Bucket>,
}

impl StringInterner {
    pub fn new() -> Self {
        let mut buckets = HashMap::new();
        buckets.insert(None, Bucket::default());
        StringInterner { buckets }
    }

    /// Register `value` in the bucket of `locale`. Idempotent.
    pub fn add_string(&mut self, locale: Option<&str>, value: &str) {
        let bucket = self.buckets.entry(locale.map(str::to_string)).or_default();
        debug_assert!(!bucket.written, "string added after bucket was written");
        bucket.strings.entry(value.to_string()).or_insert(None);
    }

    /// Number of distinct strings registered for `locale`.
    pub fn bucket_len(&self, locale: Option<&str>) -> usize {
        self.bucket(locale).map(|b| b.strings.len()).unwrap_or(0)
    }

    pub fn is_written(&self, locale: Option<&str>) -> bool {
        self.bucket(locale).map(|b| b.written).unwrap_or(false)
    }

    /// Flush the bucket of `locale` into `out`, assigning offsets.
    ///
    /// Writing an unknown locale is a no-op that still marks it written.
    pub fn write_bucket(&mut self, locale: Option<&str>, out: &mut ByteWriter) -> Result<()> {
        let key = locale.map(str::to_string);

        if key.is_some() && !self.is_written(None) {
            return Err(IndexError::internal(
                "neutral string bucket must be written before locale buckets",
            ));
        }
        if self.is_written(locale) {
            return Err(IndexError::internal(format!(
                "string bucket {:?} written twice",
                locale
            )));
        }

        let mut bucket = self.buckets.remove(&key).unwrap_or_default();

        for (value, slot) in bucket.strings.iter_mut() {
            let shared = match &key {
                Some(_) => self.neutral_offset(value),
                None => None,
            };
            *slot = Some(match shared {
                Some(offset) => offset,
                None => out.write_cstr(value.as_bytes())?,
            });
        }

        bucket.written = true;
        self.buckets.insert(key, bucket);
        Ok(())
    }

    /// Final offset of `value` in the bucket of `locale`.
    pub fn offset(&self, locale: Option<&str>, value: &str) -> Result<u32> {
        let bucket = self.bucket(locale).ok_or_else(|| {
            IndexError::internal(format!("no string bucket for locale {:?}", locale))
        })?;

        if !bucket.written {
            return Err(IndexError::internal(format!(
                "string bucket {:?} read before it was written",
                locale
            )));
        }

        bucket
            .strings
            .get(value)
            .copied()
            .flatten()
            .ok_or_else(|| {
                IndexError::internal(format!(
                    "string {:?} was never interned for locale {:?}",
                    value, locale
                ))
            })
    }

    fn neutral_offset(&self, value: &str) -> Option<u32> {
        self.buckets
            .get(&None)
            .and_then(|b| b.strings.get(value).copied().flatten())
    }

    fn bucket(&self, locale: Option<&str>) -> Option<&Bucket> {
        self.buckets.get(&locale.map(str::to_string))
    }
}
