//! Read-only access to a built index.
//!
//! [`Index`] wraps an immutable buffer (owned or memory-mapped) behind an
//! `Arc`, so clones are cheap and can be sent across threads. Opening
//! validates the header and every top-level structure; once that succeeds no
//! query can fail or read outside the buffer. Damaged sub-structures reached
//! later (a single keyfile, an id list) read as empty.
//!
//! ## Example
//!
//! ```rust
//! use appidx_core::{Index, IndexBuilder, Keyfile};
//!
//! let kf = Keyfile::parse(
//!     "app.desktop",
//!     "[Desktop Entry]\nName=Text Editor\nName[fr]=Éditeur de texte\n",
//! )
//! .unwrap();
//! let mut builder = IndexBuilder::new();
//! builder.add_keyfile("app.desktop", kf);
//! let index = Index::from_bytes(builder.build().unwrap()).unwrap();
//!
//! let hits = index.search(Some("fr"), "texte");
//! let names = index.resolve(hits[0]);
//! assert_eq!((names.app, names.group, names.key), ("app.desktop", "Desktop Entry", "Name"));
//! ```

mod views;

pub use views::{
    GroupEntry, IdListView, ItemEntry, KeyfileView, Postings, StringListView, TextIndexView,
};

use crate::error::{IndexError, Result};
use crate::format::{field, read_u32, FORMAT_VERSION, HEADER_FIELDS, HEADER_SIZE, MAGIC, POINTER};
use crate::tokenizer;
use crate::types::{Id, IdTriple, IndexStats, ResolvedTriple};
use memmap2::Mmap;
use std::fmt;
use std::fs::File;
use std::io;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use views::deref;

/// Bytes behind an [`Index`].
enum Backing {
    Owned(Vec<u8>),
    Mapped(Mmap),
}

impl Deref for Backing {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Backing::Owned(bytes) => bytes,
            Backing::Mapped(map) => map,
        }
    }
}

/// Offsets of the top-level structures, validated at open.
#[derive(Debug, Clone, Copy)]
struct Layout {
    version: u32,
    fields: [usize; HEADER_FIELDS],
}

/// An opened, validated index.
#[derive(Clone)]
pub struct Index {
    data: Arc<Backing>,
    layout: Layout,
}

impl Index {
    /// Open an index held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_backing(Backing::Owned(bytes))
    }

    /// Map and open the index file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => IndexError::IndexNotFound {
                path: path.to_path_buf(),
            },
            _ => IndexError::Io(e),
        })?;

        if file.metadata()?.len() < HEADER_SIZE as u64 {
            return Err(IndexError::corrupted("file is smaller than the header"));
        }

        // SAFETY: the index file is replaced by rename, never written in place.
        let map = unsafe { Mmap::map(&file)? };
        let index = Self::from_backing(Backing::Mapped(map))?;
        debug!(path = %path.display(), bytes = index.size(), "Mapped index");
        Ok(index)
    }

    fn from_backing(backing: Backing) -> Result<Self> {
        let layout = validate(&backing)?;
        Ok(Index {
            data: Arc::new(backing),
            layout,
        })
    }

    /// Raw index bytes
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Buffer size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn version(&self) -> u32 {
        self.layout.version
    }

    fn list(&self, slot: usize) -> StringListView<'_> {
        // Validated at open, so the fallback is never taken.
        StringListView::new(self.bytes(), self.layout.fields[slot])
            .unwrap_or_else(|| StringListView::empty(self.bytes()))
    }

    pub fn app_names(&self) -> StringListView<'_> {
        self.list(field::APP_NAMES)
    }

    pub fn key_names(&self) -> StringListView<'_> {
        self.list(field::KEY_NAMES)
    }

    pub fn locale_names(&self) -> StringListView<'_> {
        self.list(field::LOCALE_NAMES)
    }

    pub fn group_names(&self) -> StringListView<'_> {
        self.list(field::GROUP_NAMES)
    }

    /// Payload offset for `id` in the pointer array at header slot `slot`.
    fn pointer(&self, slot: usize, id: Id) -> Option<usize> {
        let pos = self.layout.fields[slot] + POINTER + id as usize * POINTER;
        read_u32(self.bytes(), pos).map(|p| p as usize)
    }

    /// Keyfile of the application with id `app`.
    pub fn keyfile(&self, app: Id) -> Option<KeyfileView<'_>> {
        if app as usize >= self.app_names().len() {
            return None;
        }
        KeyfileView::new(self, self.pointer(field::KEYFILES, app)?)
    }

    pub fn keyfile_by_name(&self, app: &str) -> Option<KeyfileView<'_>> {
        self.keyfile(self.app_names().lookup(app)?)
    }

    /// Text index for `locale`; `None` selects the global (untranslated) one.
    pub fn text_index(&self, locale: Option<&str>) -> Option<TextIndexView<'_>> {
        let offset = match locale {
            None => self.layout.fields[field::GLOBAL_TEXT_INDEX],
            Some(tag) => {
                let id = self.locale_names().lookup(tag)?;
                self.pointer(field::TEXT_INDEXES, id)?
            }
        };
        TextIndexView::new(self.bytes(), offset)
    }

    /// Triples whose value contains `token` exactly (already folded).
    ///
    /// Unknown locales and unknown tokens give no results.
    pub fn search(&self, locale: Option<&str>, token: &str) -> Vec<IdTriple> {
        let Some(postings) = self.text_index(locale).and_then(|ti| ti.find(token)) else {
            return Vec::new();
        };
        postings
            .ids()
            .chunks_exact(3)
            .map(|ids| IdTriple::new(ids[0], ids[1], ids[2]))
            .collect()
    }

    /// Tokenize and fold `query`, then search.
    ///
    /// With several tokens, a triple of the first token is kept only if its
    /// app matches every other token as well.
    pub fn search_text(&self, locale: Option<&str>, query: &str) -> Vec<IdTriple> {
        let tokens = tokenizer::distinct_tokens(query);
        let Some((first, rest)) = tokens.split_first() else {
            return Vec::new();
        };

        let mut hits = self.search(locale, first);
        for token in rest {
            let apps: Vec<Id> = self.search(locale, token).iter().map(|t| t.app).collect();
            hits.retain(|t| apps.contains(&t.app));
        }
        hits
    }

    /// Names behind a triple; unknown ids resolve to "".
    pub fn resolve(&self, triple: IdTriple) -> ResolvedTriple<'_> {
        ResolvedTriple {
            app: self.app_names().get(triple.app).unwrap_or(""),
            group: self.group_names().get(triple.group).unwrap_or(""),
            key: self.key_names().get(triple.key).unwrap_or(""),
        }
    }

    /// Ids of the apps that have a group called `group`, ascending.
    pub fn implementors(&self, group: &str) -> Vec<Id> {
        self.group_names()
            .lookup(group)
            .and_then(|id| self.pointer(field::IMPLEMENTORS, id))
            .and_then(|offset| IdListView::new(self.bytes(), offset))
            .map(|list| list.to_vec())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            apps: self.app_names().len(),
            keys: self.key_names().len(),
            locales: self.locale_names().len(),
            groups: self.group_names().len(),
            global_tokens: self.text_index(None).map(|ti| ti.len()).unwrap_or(0),
            size_bytes: self.size(),
            version: self.version(),
        }
    }
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("size", &self.size())
            .field("version", &self.layout.version)
            .field("apps", &self.app_names().len())
            .finish()
    }
}

/// Check the header and every top-level structure of `data`.
fn validate(data: &[u8]) -> Result<Layout> {
    if data.len() < HEADER_SIZE {
        return Err(IndexError::corrupted(format!(
            "buffer of {} bytes is smaller than the header",
            data.len()
        )));
    }
    if &data[..4] != MAGIC {
        return Err(IndexError::corrupted("bad magic"));
    }

    let version = read_u32(data, 4).unwrap_or(0);
    if version != FORMAT_VERSION {
        return Err(IndexError::VersionMismatch {
            found: version,
            expected: FORMAT_VERSION,
        });
    }

    let mut fields = [0usize; HEADER_FIELDS];
    for (slot, value) in fields.iter_mut().enumerate() {
        *value = read_u32(data, 8 + slot * 4).unwrap_or(0) as usize;
    }

    let list_len = |slot: usize, name: &str| -> Result<usize> {
        StringListView::new(data, fields[slot])
            .map(|list| list.len())
            .ok_or_else(|| IndexError::corrupted(format!("{name} list out of bounds")))
    };
    let apps = list_len(field::APP_NAMES, "app name")?;
    list_len(field::KEY_NAMES, "key name")?;
    let locales = list_len(field::LOCALE_NAMES, "locale name")?;
    let groups = list_len(field::GROUP_NAMES, "group name")?;

    let arrays = [
        (field::IMPLEMENTORS, field::GROUP_NAMES, groups, "implementors"),
        (field::TEXT_INDEXES, field::LOCALE_NAMES, locales, "text index"),
        (field::KEYFILES, field::APP_NAMES, apps, "keyfile"),
    ];
    for (slot, list_slot, len, name) in arrays {
        let offset = fields[slot];
        let size = len
            .checked_add(1)
            .and_then(|n| n.checked_mul(POINTER))
            .ok_or_else(|| IndexError::corrupted(format!("{name} array size overflows")))?;
        deref(data, offset, size)
            .ok_or_else(|| IndexError::corrupted(format!("{name} array out of bounds")))?;

        if read_u32(data, offset).map(|v| v as usize) != Some(fields[list_slot]) {
            return Err(IndexError::corrupted(format!(
                "{name} array does not belong to its name list"
            )));
        }
    }

    TextIndexView::new(data, fields[field::GLOBAL_TEXT_INDEX])
        .ok_or_else(|| IndexError::corrupted("global text index out of bounds"))?;

    Ok(Layout { version, fields })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IndexBuilder;
    use crate::keyfile::Keyfile;
    use crate::types::NO_ID;
    use proptest::prelude::*;

    const EDITOR: &str = "\
[Desktop Entry]
Name=Text Editor
Name[fr]=Éditeur de texte
Keywords=write;edit;
";

    const TERMINAL: &str = "\
[Desktop Entry]
Name=Terminal
Name[de]=Terminal
Comment=Use the command line
Comment[de]=Die Befehlszeile verwenden
Keywords=shell;prompt;command;
[Desktop Action new-window]
Name=New Window
";

    fn build(sources: &[(&str, &str)]) -> Index {
        let mut builder = IndexBuilder::new();
        for (app, text) in sources {
            builder.add_keyfile(*app, Keyfile::parse(app, text).unwrap());
        }
        Index::from_bytes(builder.build().unwrap()).unwrap()
    }

    fn sample_bytes() -> Vec<u8> {
        build(&[
            ("app.desktop", EDITOR),
            ("org.terminal.desktop", TERMINAL),
            ("viewer.desktop", "[Desktop Entry]\nName=Image Viewer\nComment=View images\n"),
        ])
        .bytes()
        .to_vec()
    }

    #[test]
    fn test_end_to_end() {
        let index = build(&[("app.desktop", EDITOR)]);

        assert_eq!(index.app_names().iter().collect::<Vec<_>>(), vec!["app.desktop"]);
        assert!(index.key_names().lookup("Name").is_some());
        assert!(index.key_names().lookup("Keywords").is_some());
        assert!(index.locale_names().lookup("fr").is_some());

        let hits = index.search(Some("fr"), "texte");
        assert_eq!(hits.len(), 1);
        let names = index.resolve(hits[0]);
        assert_eq!(names.app, "app.desktop");
        assert_eq!(names.group, "Desktop Entry");
        assert_eq!(names.key, "Name");

        assert!(index.search(Some("fr"), "nonexistent").is_empty());
        assert!(index.search(Some("xx"), "texte").is_empty());
    }

    #[test]
    fn test_global_index_is_untranslated() {
        let index = build(&[("app.desktop", EDITOR)]);

        assert_eq!(index.search(None, "editor").len(), 1);
        assert!(index.search(None, "texte").is_empty());
        // Keywords has no French value, so the fr index falls back to it.
        assert_eq!(index.search(Some("fr"), "write").len(), 1);
    }

    #[test]
    fn test_search_text_folds_and_intersects() {
        let index = Index::from_bytes(sample_bytes()).unwrap();

        assert_eq!(index.search_text(None, "TERMINAL").len(), 1);
        assert_eq!(index.search_text(Some("fr"), "ÉDITEUR").len(), 1);

        // "command" comes from Comment and Keywords of the same app
        let hits = index.search_text(None, "command line");
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|t| index.resolve(*t).app == "org.terminal.desktop"));

        assert!(index.search_text(None, "command images").is_empty());
        assert!(index.search_text(None, "  ;; ").is_empty());
    }

    #[test]
    fn test_postings_over_inline_capacity() {
        let sources: Vec<(String, String)> = (0..5)
            .map(|i| (format!("app{i}.desktop"), "[Desktop Entry]\nName=Shared\n".to_string()))
            .collect();
        let refs: Vec<(&str, &str)> = sources
            .iter()
            .map(|(a, t)| (a.as_str(), t.as_str()))
            .collect();
        let index = build(&refs);

        let hits = index.search(None, "shared");
        assert_eq!(hits.len(), 5);
        let apps: Vec<Id> = hits.iter().map(|t| t.app).collect();
        assert_eq!(apps, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_round_trip_values() {
        let index = Index::from_bytes(sample_bytes()).unwrap();

        for (app, text) in [("app.desktop", EDITOR), ("org.terminal.desktop", TERMINAL)] {
            let source = Keyfile::parse(app, text).unwrap();
            let stored = index.keyfile_by_name(app).unwrap();
            assert_eq!(stored.n_items(), source.n_items());

            for (item, entry) in source.items().iter().zip(stored.items()) {
                assert_eq!(entry.key, item.key);
                assert_eq!(entry.locale, item.locale.as_deref());
                assert_eq!(entry.value, item.value);
            }
        }
    }

    #[test]
    fn test_keyfile_view_get_value() {
        let index = Index::from_bytes(sample_bytes()).unwrap();
        let kf = index.keyfile_by_name("org.terminal.desktop").unwrap();

        assert_eq!(
            kf.get_value(&["de_DE", "de"], "Desktop Entry", "Comment"),
            Some("Die Befehlszeile verwenden")
        );
        assert_eq!(
            kf.get_value(&["fr"], "Desktop Entry", "Comment"),
            Some("Use the command line")
        );
        assert_eq!(
            kf.get_value(&[], "Desktop Action new-window", "Name"),
            Some("New Window")
        );
        assert_eq!(kf.get_value(&[], "Desktop Entry", "Exec"), None);

        let groups: Vec<_> = kf.groups().collect();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].name, "Desktop Action new-window");
        assert_eq!(groups[1].items, 5..6);
    }

    #[test]
    fn test_locale_fallback_to_default() {
        let index = build(&[("a.desktop", "[Desktop Entry]\nName=Default\n")]);
        let kf = index.keyfile_by_name("a.desktop").unwrap();
        assert_eq!(kf.get_value(&["fr"], "Desktop Entry", "Name"), Some("Default"));
    }

    #[test]
    fn test_implementors_and_stats() {
        let index = Index::from_bytes(sample_bytes()).unwrap();

        assert_eq!(index.implementors("Desktop Entry"), vec![0, 1, 2]);
        assert_eq!(index.implementors("Desktop Action new-window"), vec![1]);
        assert!(index.implementors("Missing").is_empty());

        let stats = index.stats();
        assert_eq!(stats.apps, 3);
        assert_eq!(stats.locales, 2);
        assert_eq!(stats.groups, 2);
        assert_eq!(stats.version, FORMAT_VERSION);
        assert_eq!(stats.size_bytes, index.size());
    }

    #[test]
    fn test_string_lists_strictly_ascending() {
        let index = Index::from_bytes(sample_bytes()).unwrap();
        let lists = [
            index.app_names(),
            index.key_names(),
            index.locale_names(),
            index.group_names(),
        ];
        for list in lists {
            let names: Vec<&str> = list.iter().collect();
            assert!(names.windows(2).all(|w| w[0].as_bytes() < w[1].as_bytes()));
            for (id, name) in names.iter().enumerate() {
                assert_eq!(list.lookup(name), Some(id as Id));
            }
        }
    }

    #[test]
    fn test_open_rejects_bad_header() {
        let mut bytes = sample_bytes();

        assert!(matches!(
            Index::from_bytes(bytes[..HEADER_SIZE - 1].to_vec()),
            Err(IndexError::Corrupted { .. })
        ));

        bytes[4] = 99;
        assert!(matches!(
            Index::from_bytes(bytes.clone()),
            Err(IndexError::VersionMismatch { found: 99, .. })
        ));

        bytes[0] = b'X';
        assert!(matches!(Index::from_bytes(bytes), Err(IndexError::Corrupted { .. })));
    }

    #[test]
    fn test_open_rejects_swapped_array() {
        let mut bytes = sample_bytes();
        let keyfiles = 8 + field::KEYFILES * 4;
        let implementors = 8 + field::IMPLEMENTORS * 4;
        let a = bytes[keyfiles..keyfiles + 4].to_vec();
        let b = bytes[implementors..implementors + 4].to_vec();
        bytes[keyfiles..keyfiles + 4].copy_from_slice(&b);
        bytes[implementors..implementors + 4].copy_from_slice(&a);
        assert!(Index::from_bytes(bytes).is_err());
    }

    #[test]
    fn test_keyfile_rejects_inconsistent_group_bounds() {
        let index = build(&[("app.desktop", EDITOR)]);
        let kf = index.pointer(field::KEYFILES, 0).unwrap();
        assert_eq!(index.keyfile(0).unwrap().group_range(0), Some(0..3));

        // Group 0 start sits at kf + 6, the sentinel's item count at kf + 10.
        let patched = |start: u16, end: u16| {
            let mut bytes = index.bytes().to_vec();
            bytes[kf + 6..kf + 8].copy_from_slice(&start.to_le_bytes());
            bytes[kf + 10..kf + 12].copy_from_slice(&end.to_le_bytes());
            Index::from_bytes(bytes).unwrap()
        };

        let shifted = patched(1, 3);
        assert_eq!(shifted.keyfile(0).unwrap().group_range(0), Some(1..3));

        for (start, end) in [(2, 1), (0, 4)] {
            let broken = patched(start, end);
            let view = broken.keyfile(0).unwrap();
            assert_eq!(view.n_items(), 3);
            assert_eq!(view.group_range(0), None);
            assert!(view.group(0).is_none());
            assert_eq!(view.groups().count(), 0);
            assert_eq!(view.get_value(&[], "Desktop Entry", "Name"), None);
        }
    }

    #[test]
    fn test_open_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("index.cache");
        std::fs::write(&path, sample_bytes()).unwrap();

        let index = Index::open(&path).unwrap();
        assert_eq!(index.stats().apps, 3);

        let missing = Index::open(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(missing, IndexError::IndexNotFound { .. }));
    }

    #[test]
    fn test_index_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<Index>();
    }

    /// Run every query; must not panic whatever the buffer holds.
    fn exercise(index: &Index) {
        let _ = index.stats();
        let lists = [
            index.app_names(),
            index.key_names(),
            index.locale_names(),
            index.group_names(),
        ];
        for list in lists {
            for name in list.iter() {
                let _ = list.lookup(name);
            }
            let _ = list.get(NO_ID);
        }
        for app in 0..index.app_names().len() as Id + 1 {
            if let Some(kf) = index.keyfile(app) {
                let _ = kf.groups().count();
                let _ = kf.items().count();
                let _ = kf.get_value(&["fr", "de"], "Desktop Entry", "Name");
            }
        }
        let locales: Vec<String> = index.locale_names().iter().map(str::to_string).collect();
        for locale in locales.iter().map(|l| Some(l.as_str())).chain([None]) {
            for token in ["editor", "terminal", "texte", "zzz"] {
                for triple in index.search(locale, token) {
                    let _ = index.resolve(triple);
                }
            }
            if let Some(ti) = index.text_index(locale) {
                for (_, postings) in ti.iter() {
                    let _ = postings.ids();
                }
            }
        }
        let _ = index.implementors("Desktop Entry");
    }

    #[test]
    fn test_exercise_sample() {
        exercise(&Index::from_bytes(sample_bytes()).unwrap());
    }

    proptest! {
        #[test]
        fn prop_truncated_buffer_is_safe(cut in 0usize..2048) {
            let bytes = sample_bytes();
            let cut = cut.min(bytes.len());
            if let Ok(index) = Index::from_bytes(bytes[..cut].to_vec()) {
                exercise(&index);
            }
        }

        #[test]
        fn prop_mutated_buffer_is_safe(
            edits in proptest::collection::vec((any::<usize>(), any::<u8>()), 1..16)
        ) {
            let mut bytes = sample_bytes();
            let len = bytes.len();
            for (pos, value) in edits {
                bytes[pos % len] = value;
            }
            if let Ok(index) = Index::from_bytes(bytes) {
                exercise(&index);
            }
        }
    }
}
