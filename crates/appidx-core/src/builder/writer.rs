//! Growable output buffer with alignment discipline.

use crate::error::{IndexError, Result};

/// The buffer every structure is serialized into.
///
/// Fixed-width writes assert that the buffer is already aligned for them;
/// callers align explicitly with [`ByteWriter::align`] before a structure.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current length as a file offset.
    pub fn offset(&self) -> Result<u32> {
        u32::try_from(self.buf.len()).map_err(|_| {
            IndexError::internal(format!("index exceeds 4 GiB ({} bytes)", self.buf.len()))
        })
    }

    /// Pad with zero bytes until the length is a multiple of `size`.
    pub fn align(&mut self, size: usize) {
        debug_assert!(size.is_power_of_two());
        while self.buf.len() & (size - 1) != 0 {
            self.buf.push(0);
        }
    }

    /// Align to `size` and return the resulting offset.
    pub fn aligned_offset(&mut self, size: usize) -> Result<u32> {
        self.align(size);
        self.offset()
    }

    fn check_alignment(&self, size: usize) {
        assert!(
            self.buf.len() & (size - 1) == 0,
            "unaligned {size}-byte write at offset {}",
            self.buf.len()
        );
    }

    pub fn write_u16(&mut self, value: u16) -> Result<u32> {
        let offset = self.offset()?;
        self.check_alignment(2);
        self.buf.extend_from_slice(&value.to_le_bytes());
        Ok(offset)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<u32> {
        let offset = self.offset()?;
        self.check_alignment(4);
        self.buf.extend_from_slice(&value.to_le_bytes());
        Ok(offset)
    }

    /// Append raw bytes followed by a NUL terminator; no alignment needed.
    pub fn write_cstr(&mut self, bytes: &[u8]) -> Result<u32> {
        let offset = self.offset()?;
        self.buf.extend_from_slice(bytes);
        self.buf.push(0);
        Ok(offset)
    }

    /// Append raw bytes without checks (used for the header placeholder).
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<u32> {
        let offset = self.offset()?;
        self.buf.extend_from_slice(bytes);
        Ok(offset)
    }

    /// Overwrite bytes already written at `pos`.
    pub fn patch(&mut self, pos: usize, bytes: &[u8]) -> Result<()> {
        let end = pos
            .checked_add(bytes.len())
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| IndexError::internal(format!("patch outside buffer at {pos}")))?;
        self.buf[pos..end].copy_from_slice(bytes);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}
