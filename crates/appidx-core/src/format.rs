//! On-disk layout of the index.
//!
//! Everything is little-endian. Offsets ("pointers") are `u32` byte offsets
//! from the start of the buffer.
//!
//! ```text
//! [Header: 40 bytes]
//!   - Magic: "AIDX" (4 bytes)
//!   - Version: u32
//!   - App-name list: u32
//!   - Key-name list: u32
//!   - Locale-name list: u32
//!   - Group-name list: u32
//!   - Group-implementors array: u32
//!   - Per-locale text-index array: u32
//!   - Per-app keyfile array: u32
//!   - Global text index: u32
//!
//! [String list]            align 4
//!   - n_strings: u16, padding: u16 = 0xFFFF
//!   - string offset: u32 x n_strings (position == id)
//!
//! [Id list]                align 2
//!   - n_ids: u16
//!   - id: u16 x n_ids
//!
//! [Pointer array]          align 4
//!   - owning string list: u32
//!   - payload offset: u32 x length of that list
//!
//! [Text index]             align 4
//!   - n_entries: u32
//!   - entries: 8 bytes each, ascending by token
//!       token: u32 (bit 31 set = postings inline)
//!       inline:   id: u16, id: u16 (unused slots 0xFFFF)
//!       indirect: id list: u32
//!
//! [Keyfile]                align 4
//!   - n_groups: u16, n_items: u16
//!   - group: (name_id: u16, start: u16) x (n_groups + 1), last = (0xFFFF, n_items)
//!   - item: (key_id: u16, locale_id: u16, value: u32) x n_items
//!
//! [Strings]
//!   - NUL-terminated bytes, no alignment
//! ```

/// Magic bytes at the start of every index buffer
pub const MAGIC: &[u8; 4] = b"AIDX";

/// Current index format version
pub const FORMAT_VERSION: u32 = 1;

/// Number of offset fields following magic and version
pub const HEADER_FIELDS: usize = 8;

/// Total header size in bytes
pub const HEADER_SIZE: usize = 4 + 4 + HEADER_FIELDS * 4;

/// Header field slots, in on-disk order
pub mod field {
    pub const APP_NAMES: usize = 0;
    pub const KEY_NAMES: usize = 1;
    pub const LOCALE_NAMES: usize = 2;
    pub const GROUP_NAMES: usize = 3;
    pub const IMPLEMENTORS: usize = 4;
    pub const TEXT_INDEXES: usize = 5;
    pub const KEYFILES: usize = 6;
    pub const GLOBAL_TEXT_INDEX: usize = 7;
}

/// Largest number of members a string list or id list may hold.
pub const MAX_LIST_LEN: usize = 0xFFFF;

/// Token reference bit marking inline postings
pub const INLINE_FLAG: u32 = 1 << 31;

/// Postings of at most this many ids are stored inline
pub const INLINE_CAPACITY: usize = 2;

/// Fixed sizes of the records above
pub const STRING_LIST_HEADER: usize = 4;
pub const ID_LIST_HEADER: usize = 2;
pub const TEXT_INDEX_HEADER: usize = 4;
pub const TEXT_INDEX_ENTRY: usize = 8;
pub const KEYFILE_HEADER: usize = 4;
pub const KEYFILE_GROUP: usize = 4;
pub const KEYFILE_ITEM: usize = 8;
pub const POINTER: usize = 4;

/// Read a little-endian `u16` at `pos`, or `None` past the end of `data`.
#[inline]
pub fn read_u16(data: &[u8], pos: usize) -> Option<u16> {
    let end = pos.checked_add(2)?;
    let bytes = data.get(pos..end)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

/// Read a little-endian `u32` at `pos`, or `None` past the end of `data`.
#[inline]
pub fn read_u32(data: &[u8], pos: usize) -> Option<u32> {
    let end = pos.checked_add(4)?;
    let bytes = data.get(pos..end)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
