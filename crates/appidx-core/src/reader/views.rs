//! Borrowed, bounds-checked views over an index buffer.
//!
//! Views are cheap `Copy` handles. Constructing one checks that its fixed
//! part and its counted records lie inside the buffer; every accessor after
//! that returns a sentinel instead of failing.

use super::Index;
use crate::format::{
    read_u16, read_u32, ID_LIST_HEADER, INLINE_CAPACITY, INLINE_FLAG, KEYFILE_GROUP,
    KEYFILE_HEADER, KEYFILE_ITEM, STRING_LIST_HEADER, TEXT_INDEX_ENTRY, TEXT_INDEX_HEADER,
};
use crate::types::{Id, NO_ID};
use std::cmp::Ordering;
use std::ops::Range;

/// Start of a `size`-byte structure at `offset`, if it fits in `data`.
pub(crate) fn deref(data: &[u8], offset: usize, size: usize) -> Option<usize> {
    let end = offset.checked_add(size)?;
    (end <= data.len()).then_some(offset)
}

/// `header + count * record`, or `None` on overflow.
fn counted_size(header: usize, count: usize, record: usize) -> Option<usize> {
    count.checked_mul(record)?.checked_add(header)
}

/// NUL-terminated string at `offset`.
///
/// Runs to the end of the buffer when no NUL follows. Out-of-range offsets
/// and invalid UTF-8 yield "".
pub(crate) fn read_str(data: &[u8], offset: usize) -> &str {
    let Some(tail) = data.get(offset..) else {
        return "";
    };
    let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
    std::str::from_utf8(&tail[..end]).unwrap_or("")
}

/// A sorted list of strings; position is id.
#[derive(Clone, Copy)]
pub struct StringListView<'a> {
    data: &'a [u8],
    offset: usize,
    len: usize,
}

impl<'a> StringListView<'a> {
    pub(crate) fn new(data: &'a [u8], offset: usize) -> Option<Self> {
        deref(data, offset, STRING_LIST_HEADER)?;
        let len = read_u16(data, offset)? as usize;
        deref(data, offset, counted_size(STRING_LIST_HEADER, len, 4)?)?;
        Some(StringListView { data, offset, len })
    }

    pub(crate) fn empty(data: &'a [u8]) -> Self {
        StringListView {
            data,
            offset: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// String with id `id`, or `None` when `id` is out of range.
    pub fn get(&self, id: Id) -> Option<&'a str> {
        let id = id as usize;
        if id >= self.len {
            return None;
        }
        let pointer = read_u32(self.data, self.offset + STRING_LIST_HEADER + id * 4)?;
        Some(read_str(self.data, pointer as usize))
    }

    /// Id of `value`, by binary search.
    pub fn lookup(&self, value: &str) -> Option<Id> {
        let (mut lo, mut hi) = (0usize, self.len);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let probe = self.get(mid as Id).unwrap_or("");
            match probe.as_bytes().cmp(value.as_bytes()) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return Some(mid as Id),
            }
        }
        None
    }

    /// Members in id order.
    pub fn iter(&self) -> impl Iterator<Item = &'a str> + 'a {
        let list = *self;
        (0..self.len).map(move |id| list.get(id as Id).unwrap_or(""))
    }
}

/// A counted list of ids.
#[derive(Clone, Copy)]
pub struct IdListView<'a> {
    data: &'a [u8],
    offset: usize,
    len: usize,
}

impl<'a> IdListView<'a> {
    pub(crate) fn new(data: &'a [u8], offset: usize) -> Option<Self> {
        let len = read_u16(data, offset)? as usize;
        deref(data, offset, counted_size(ID_LIST_HEADER, len, 2)?)?;
        Some(IdListView { data, offset, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, i: usize) -> Option<Id> {
        if i >= self.len {
            return None;
        }
        read_u16(self.data, self.offset + ID_LIST_HEADER + i * 2)
    }

    pub fn to_vec(&self) -> Vec<Id> {
        (0..self.len).filter_map(|i| self.get(i)).collect()
    }
}

/// Postings of one text-index entry.
#[derive(Clone, Copy)]
pub enum Postings<'a> {
    /// Up to two ids stored in the entry itself
    Inline([Id; INLINE_CAPACITY]),

    /// Ids stored in a separate id list
    Indirect(IdListView<'a>),
}

impl Postings<'_> {
    pub fn ids(&self) -> Vec<Id> {
        match self {
            // An unused slot ends the inline list.
            Postings::Inline(slots) => {
                slots.iter().copied().take_while(|&id| id != NO_ID).collect()
            }
            Postings::Indirect(list) => list.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Postings::Inline(slots) => slots.iter().take_while(|&&id| id != NO_ID).count(),
            Postings::Indirect(list) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Token -> postings table, sorted by token bytes.
#[derive(Clone, Copy)]
pub struct TextIndexView<'a> {
    data: &'a [u8],
    offset: usize,
    len: usize,
}

impl<'a> TextIndexView<'a> {
    pub(crate) fn new(data: &'a [u8], offset: usize) -> Option<Self> {
        let len = read_u32(data, offset)? as usize;
        deref(data, offset, counted_size(TEXT_INDEX_HEADER, len, TEXT_INDEX_ENTRY)?)?;
        Some(TextIndexView { data, offset, len })
    }

    /// Number of distinct tokens
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn entry(&self, i: usize) -> usize {
        self.offset + TEXT_INDEX_HEADER + i * TEXT_INDEX_ENTRY
    }

    fn raw_token(&self, i: usize) -> u32 {
        read_u32(self.data, self.entry(i)).unwrap_or(0)
    }

    /// Token of entry `i`.
    pub fn token(&self, i: usize) -> &'a str {
        if i >= self.len {
            return "";
        }
        read_str(self.data, (self.raw_token(i) & !INLINE_FLAG) as usize)
    }

    /// Postings of entry `i`; out-of-range entries and broken id lists are empty.
    pub fn postings(&self, i: usize) -> Postings<'a> {
        let empty = Postings::Inline([NO_ID; INLINE_CAPACITY]);
        if i >= self.len {
            return empty;
        }

        let entry = self.entry(i);
        if self.raw_token(i) & INLINE_FLAG != 0 {
            let first = read_u16(self.data, entry + 4).unwrap_or(NO_ID);
            let second = read_u16(self.data, entry + 6).unwrap_or(NO_ID);
            Postings::Inline([first, second])
        } else {
            read_u32(self.data, entry + 4)
                .and_then(|pointer| IdListView::new(self.data, pointer as usize))
                .map(Postings::Indirect)
                .unwrap_or(empty)
        }
    }

    /// Postings of `token`, matched byte for byte.
    pub fn find(&self, token: &str) -> Option<Postings<'a>> {
        let (mut lo, mut hi) = (0usize, self.len);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.token(mid).as_bytes().cmp(token.as_bytes()) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return Some(self.postings(mid)),
            }
        }
        None
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, Postings<'a>)> + 'a {
        let index = *self;
        (0..self.len).map(move |i| (index.token(i), index.postings(i)))
    }
}

/// One group of a keyfile view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry<'a> {
    pub name: &'a str,
    pub items: Range<usize>,
}

/// One item of a keyfile view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemEntry<'a> {
    pub key: &'a str,
    pub locale: Option<&'a str>,
    pub value: &'a str,
}

/// A stored keyfile.
#[derive(Clone, Copy)]
pub struct KeyfileView<'a> {
    index: &'a Index,
    offset: usize,
    n_groups: usize,
    n_items: usize,
}

impl<'a> KeyfileView<'a> {
    pub(crate) fn new(index: &'a Index, offset: usize) -> Option<Self> {
        let data = index.bytes();
        deref(data, offset, KEYFILE_HEADER)?;
        let n_groups = read_u16(data, offset)? as usize;
        let n_items = read_u16(data, offset + 2)? as usize;

        let size = counted_size(KEYFILE_HEADER, n_groups + 1, KEYFILE_GROUP)?
            .checked_add(n_items.checked_mul(KEYFILE_ITEM)?)?;
        deref(data, offset, size)?;

        Some(KeyfileView {
            index,
            offset,
            n_groups,
            n_items,
        })
    }

    pub fn n_groups(&self) -> usize {
        self.n_groups
    }

    pub fn n_items(&self) -> usize {
        self.n_items
    }

    fn group_record(&self, g: usize) -> (Id, usize) {
        let pos = self.offset + KEYFILE_HEADER + g * KEYFILE_GROUP;
        let data = self.index.bytes();
        (
            read_u16(data, pos).unwrap_or(NO_ID),
            read_u16(data, pos + 2).unwrap_or(0) as usize,
        )
    }

    /// Item range of group `g`, if the stored bounds are consistent.
    pub fn group_range(&self, g: usize) -> Option<Range<usize>> {
        if g >= self.n_groups {
            return None;
        }
        let (_, start) = self.group_record(g);
        let (_, end) = self.group_record(g + 1);
        (start <= end && end <= self.n_items).then_some(start..end)
    }

    /// Group `g` with its name resolved; broken groups are `None`.
    pub fn group(&self, g: usize) -> Option<GroupEntry<'a>> {
        let items = self.group_range(g)?;
        let (name_id, _) = self.group_record(g);
        let name = self.index.group_names().get(name_id).unwrap_or("");
        Some(GroupEntry { name, items })
    }

    pub fn groups(&self) -> impl Iterator<Item = GroupEntry<'a>> + 'a {
        let kf = *self;
        (0..self.n_groups).filter_map(move |g| kf.group(g))
    }

    fn item_ids(&self, i: usize) -> (Id, Id) {
        let pos = self.item_pos(i);
        let data = self.index.bytes();
        (
            read_u16(data, pos).unwrap_or(NO_ID),
            read_u16(data, pos + 2).unwrap_or(NO_ID),
        )
    }

    fn item_pos(&self, i: usize) -> usize {
        self.offset + KEYFILE_HEADER + (self.n_groups + 1) * KEYFILE_GROUP + i * KEYFILE_ITEM
    }

    fn item_value(&self, i: usize) -> &'a str {
        let data = self.index.bytes();
        read_u32(data, self.item_pos(i) + 4)
            .map(|pointer| read_str(data, pointer as usize))
            .unwrap_or("")
    }

    /// Item `i` with key and locale resolved.
    pub fn item(&self, i: usize) -> Option<ItemEntry<'a>> {
        if i >= self.n_items {
            return None;
        }
        let (key_id, locale_id) = self.item_ids(i);
        let locale = match locale_id {
            NO_ID => None,
            id => Some(self.index.locale_names().get(id).unwrap_or("")),
        };
        Some(ItemEntry {
            key: self.index.key_names().get(key_id).unwrap_or(""),
            locale,
            value: self.item_value(i),
        })
    }

    pub fn items(&self) -> impl Iterator<Item = ItemEntry<'a>> + 'a {
        let kf = *self;
        (0..self.n_items).filter_map(move |i| kf.item(i))
    }

    /// Look up a value with locale fallback.
    ///
    /// Behaves like [`crate::Keyfile::get_value`]: the last group named
    /// `group` is searched, each locale of `locales` in turn, then the
    /// untranslated value.
    pub fn get_value(&self, locales: &[&str], group: &str, key: &str) -> Option<&'a str> {
        let group_id = self.index.group_names().lookup(group)?;
        let key_id = self.index.key_names().lookup(key)?;

        let g = (0..self.n_groups)
            .rev()
            .find(|&g| self.group_record(g).0 == group_id)?;
        let range = self.group_range(g)?;

        let locale_names = self.index.locale_names();
        for locale in locales {
            let Some(locale_id) = locale_names.lookup(locale) else {
                continue;
            };
            if let Some(i) = range
                .clone()
                .find(|&i| self.item_ids(i) == (key_id, locale_id))
            {
                return Some(self.item_value(i));
            }
        }

        range
            .clone()
            .find(|&i| self.item_ids(i) == (key_id, NO_ID))
            .map(|i| self.item_value(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deref_bounds() {
        let data = [0u8; 8];
        assert_eq!(deref(&data, 0, 8), Some(0));
        assert_eq!(deref(&data, 4, 4), Some(4));
        assert_eq!(deref(&data, 5, 4), None);
        assert_eq!(deref(&data, usize::MAX, 1), None);
    }

    #[test]
    fn test_read_str() {
        let data = b"abc\0def";
        assert_eq!(read_str(data, 0), "abc");
        assert_eq!(read_str(data, 4), "def");
        assert_eq!(read_str(data, 3), "");
        assert_eq!(read_str(data, 100), "");
        assert_eq!(read_str(&[0xFF, 0xFE, 0], 0), "");
    }

    #[test]
    fn test_string_list_view() {
        // "b\0" "a\0" then list at 4: count 2, pad, offsets [2, 0]
        let mut data = b"b\0a\0".to_vec();
        data.extend_from_slice(&[2, 0, 0xFF, 0xFF, 2, 0, 0, 0, 0, 0, 0, 0]);

        let list = StringListView::new(&data, 4).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(0), Some("a"));
        assert_eq!(list.get(1), Some("b"));
        assert_eq!(list.get(2), None);
        assert_eq!(list.lookup("b"), Some(1));
        assert_eq!(list.lookup("c"), None);
        assert_eq!(list.iter().collect::<Vec<_>>(), vec!["a", "b"]);

        // count claims more records than the buffer holds
        data[4] = 9;
        assert!(StringListView::new(&data, 4).is_none());
    }

    #[test]
    fn test_inline_postings() {
        assert_eq!(Postings::Inline([3, NO_ID]).ids(), vec![3]);
        assert_eq!(Postings::Inline([NO_ID, NO_ID]).len(), 0);
        assert_eq!(Postings::Inline([1, 2]).ids(), vec![1, 2]);
    }

    #[test]
    fn test_text_index_view_decodes_entries() {
        use crate::builder::{ByteWriter, StringInterner, TextIndex};

        let mut index = TextIndex::new();
        index.add_ids("none", &[]);
        index.add_ids("one", &[7]);
        index.add_ids("two", &[1, 2]);
        index.add_ids("many", &[1, 2, 3]);

        let mut interner = StringInterner::new();
        index.populate_strings(&mut interner, None);
        let mut out = ByteWriter::new();
        out.write_cstr(b"padding").unwrap();
        interner.write_bucket(None, &mut out).unwrap();
        let offset = index.serialize(None, &interner, &mut out).unwrap() as usize;
        let data = out.into_inner();

        let view = TextIndexView::new(&data, offset).unwrap();
        assert_eq!(view.len(), 4);
        let tokens: Vec<&str> = view.iter().map(|(token, _)| token).collect();
        assert_eq!(tokens, vec!["many", "none", "one", "two"]);

        assert!(matches!(view.find("none"), Some(Postings::Inline([NO_ID, NO_ID]))));
        assert!(view.find("none").unwrap().is_empty());
        assert!(matches!(view.find("one"), Some(Postings::Inline([7, NO_ID]))));
        assert_eq!(view.find("one").unwrap().ids(), vec![7]);
        assert!(matches!(view.find("two"), Some(Postings::Inline([1, 2]))));
        assert_eq!(view.find("two").unwrap().len(), 2);

        match view.find("many") {
            Some(Postings::Indirect(list)) => assert_eq!(list.to_vec(), vec![1, 2, 3]),
            _ => panic!("expected an indirect id list"),
        }
        assert!(view.find("zero").is_none());
        assert_eq!(view.token(4), "");
        assert!(view.postings(4).is_empty());
    }

    #[test]
    fn test_id_list_view() {
        let data = [3, 0, 1, 0, 2, 0, 3, 0];
        let list = IdListView::new(&data, 0).unwrap();
        assert_eq!(list.to_vec(), vec![1, 2, 3]);
        assert!(IdListView::new(&data[..6], 0).is_none());
    }
}
