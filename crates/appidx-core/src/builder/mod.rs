//! Index builder.
//!
//! The builder takes parsed [`Keyfile`]s keyed by application id and produces
//! one immutable buffer in the layout described in [`crate::format`].
//!
//! ## Phases
//!
//! Preparation fills a [`BuildContext`]: the four name lists and the string
//! interner. Text indexes are then built, one per locale in parallel plus the
//! global one. Serialization is a single sequential pass in a fixed order,
//! since every offset depends on everything written before it:
//!
//! 1. header placeholder
//! 2. neutral string bucket (every name-list string lives here)
//! 3. app, key, locale and group name lists
//! 4. group implementors
//! 5. per-locale text indexes, each preceded by its locale's string bucket
//! 6. keyfiles (values may live in any bucket, so they go last)
//! 7. global text index
//! 8. header backfill

mod id_list;
mod interner;
mod string_list;
mod text_index;
mod writer;

pub use id_list::IdList;
pub use interner::StringInterner;
pub use string_list::StringList;
pub use text_index::TextIndex;
pub use writer::ByteWriter;

use crate::error::{IndexError, Result};
use crate::format::{self, field, FORMAT_VERSION, HEADER_FIELDS, HEADER_SIZE, MAGIC, MAX_LIST_LEN};
use crate::keyfile::Keyfile;
use crate::locale;
use crate::types::{Id, NO_ID};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// Group whose fields feed the text indexes by default
pub const DEFAULT_GROUP: &str = "Desktop Entry";

/// Fields tokenized into the text indexes by default
pub const DEFAULT_FIELDS: &[&str] = &[
    "Name",
    "GenericName",
    "X-GNOME-FullName",
    "Comment",
    "Keywords",
];

/// What the text indexes cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Group the indexed fields are read from
    pub group: String,

    /// Keys whose values are tokenized
    pub fields: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            group: DEFAULT_GROUP.to_string(),
            fields: DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Shared build-time tables, threaded through every serialization step.
#[derive(Debug)]
pub struct BuildContext {
    pub interner: StringInterner,
    pub app_names: StringList,
    pub key_names: StringList,
    pub locale_names: StringList,
    pub group_names: StringList,
}

impl BuildContext {
    fn new() -> Self {
        BuildContext {
            interner: StringInterner::new(),
            app_names: StringList::new("app names"),
            key_names: StringList::new("key names"),
            locale_names: StringList::new("locale names"),
            group_names: StringList::new("group names"),
        }
    }

    /// Register every name and value of `keyfiles`.
    fn collect(keyfiles: &BTreeMap<String, Keyfile>) -> Result<Self> {
        let mut ctx = BuildContext::new();

        for (app, kf) in keyfiles {
            ctx.app_names.ensure(app);

            for group in kf.groups() {
                ctx.group_names.ensure(&group.name);
            }
            for item in kf.items() {
                ctx.key_names.ensure(&item.key);
                if let Some(locale) = &item.locale {
                    ctx.locale_names.ensure(locale);
                }
                ctx.interner.add_string(item.locale.as_deref(), &item.value);
            }
        }

        for list in [
            &ctx.app_names,
            &ctx.key_names,
            &ctx.locale_names,
            &ctx.group_names,
        ] {
            list.check_capacity()?;
            list.populate_strings(&mut ctx.interner);
        }

        Ok(ctx)
    }
}

/// Payload of one pointer-array slot.
enum Payload<'a> {
    Keyfile(&'a Keyfile),
    IdList(&'a IdList),
    TextIndex { locale: &'a str, index: &'a TextIndex },
}

/// Collects keyfiles and serializes them into an index buffer.
///
/// ## Example
///
/// ```rust
/// use appidx_core::{Index, IndexBuilder, Keyfile};
///
/// let kf = Keyfile::parse("app.desktop", "[Desktop Entry]\nName=Text Editor\n").unwrap();
/// let mut builder = IndexBuilder::new();
/// builder.add_keyfile("app.desktop", kf);
///
/// let index = Index::from_bytes(builder.build().unwrap()).unwrap();
/// assert_eq!(index.search_text(None, "editor").len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct IndexBuilder {
    keyfiles: BTreeMap<String, Keyfile>,
    options: BuildOptions,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: BuildOptions) -> Self {
        IndexBuilder {
            keyfiles: BTreeMap::new(),
            options,
        }
    }

    /// Add the keyfile of application `app_id`, replacing an earlier one.
    ///
    /// Returns true if an earlier keyfile was replaced.
    pub fn add_keyfile(&mut self, app_id: impl Into<String>, keyfile: Keyfile) -> bool {
        self.keyfiles.insert(app_id.into(), keyfile).is_some()
    }

    pub fn len(&self) -> usize {
        self.keyfiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyfiles.is_empty()
    }

    /// Build the index buffer.
    #[instrument(skip(self), fields(apps = self.keyfiles.len()))]
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut ctx = BuildContext::collect(&self.keyfiles)?;
        debug!(
            keys = ctx.key_names.len(),
            locales = ctx.locale_names.len(),
            groups = ctx.group_names.len(),
            "Collected strings"
        );

        let global = self.index_locale(&ctx, &[])?;

        let locales: Vec<String> = ctx.locale_names.iter().map(str::to_string).collect();
        let per_locale: Vec<TextIndex> = locales
            .par_iter()
            .map(|tag| {
                let chain = locale::variants(tag);
                self.index_locale(&ctx, &locale::as_refs(&chain))
            })
            .collect::<Result<_>>()?;

        global.populate_strings(&mut ctx.interner, None);
        for (tag, index) in locales.iter().zip(&per_locale) {
            index.populate_strings(&mut ctx.interner, Some(tag.as_str()));
        }

        let implementors = self.group_implementors(&ctx)?;

        let bytes = self.serialize(&mut ctx, &global, &locales, &per_locale, &implementors)?;

        info!(
            apps = ctx.app_names.len(),
            locales = locales.len(),
            tokens = global.len(),
            bytes = bytes.len(),
            "Index built"
        );

        Ok(bytes)
    }

    /// Text index over the configured fields, resolved through `chain`.
    fn index_locale(&self, ctx: &BuildContext, chain: &[&str]) -> Result<TextIndex> {
        let mut index = TextIndex::new();

        for (app, kf) in &self.keyfiles {
            for field in &self.options.fields {
                if let Some(value) = kf.get_value(chain, &self.options.group, field) {
                    let ids = [
                        ctx.app_names.id(app)?,
                        ctx.group_names.id(&self.options.group)?,
                        ctx.key_names.id(field)?,
                    ];
                    index.add_ids_tokenised(value, &ids);
                }
            }
        }

        Ok(index)
    }

    /// For each group id, the apps whose keyfile has that group.
    fn group_implementors(&self, ctx: &BuildContext) -> Result<Vec<IdList>> {
        let mut lists = vec![IdList::new(); ctx.group_names.len()];

        for (app, kf) in &self.keyfiles {
            let app_id = ctx.app_names.id(app)?;
            let mut seen: Vec<Id> = Vec::with_capacity(kf.n_groups());
            for group in kf.groups() {
                let group_id = ctx.group_names.id(&group.name)?;
                if !seen.contains(&group_id) {
                    seen.push(group_id);
                    lists[group_id as usize].add_ids(&[app_id]);
                }
            }
        }

        Ok(lists)
    }

    fn serialize(
        &self,
        ctx: &mut BuildContext,
        global: &TextIndex,
        locales: &[String],
        per_locale: &[TextIndex],
        implementors: &[IdList],
    ) -> Result<Vec<u8>> {
        let mut out = ByteWriter::new();
        let mut header = [0u32; HEADER_FIELDS];

        out.write_raw(&[0; HEADER_SIZE])?;

        ctx.interner.write_bucket(None, &mut out)?;

        header[field::APP_NAMES] = ctx.app_names.serialize(&ctx.interner, &mut out)?;
        header[field::KEY_NAMES] = ctx.key_names.serialize(&ctx.interner, &mut out)?;
        header[field::LOCALE_NAMES] = ctx.locale_names.serialize(&ctx.interner, &mut out)?;
        header[field::GROUP_NAMES] = ctx.group_names.serialize(&ctx.interner, &mut out)?;

        let payloads: Vec<Payload<'_>> = implementors.iter().map(Payload::IdList).collect();
        header[field::IMPLEMENTORS] =
            write_pointer_array(ctx, &mut out, header[field::GROUP_NAMES], &payloads)?;

        let payloads: Vec<Payload<'_>> = locales
            .iter()
            .zip(per_locale)
            .map(|(locale, index)| Payload::TextIndex { locale, index })
            .collect();
        header[field::TEXT_INDEXES] =
            write_pointer_array(ctx, &mut out, header[field::LOCALE_NAMES], &payloads)?;

        let payloads: Vec<Payload<'_>> = self.keyfiles.values().map(Payload::Keyfile).collect();
        header[field::KEYFILES] =
            write_pointer_array(ctx, &mut out, header[field::APP_NAMES], &payloads)?;

        header[field::GLOBAL_TEXT_INDEX] = global.serialize(None, &ctx.interner, &mut out)?;

        let mut raw = Vec::with_capacity(HEADER_SIZE);
        raw.extend_from_slice(MAGIC);
        raw.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        for value in header {
            raw.extend_from_slice(&value.to_le_bytes());
        }
        out.patch(0, &raw)?;

        Ok(out.into_inner())
    }
}

/// Write every payload, then the array of their offsets.
///
/// The array starts with the offset of the string list it is indexed by, so
/// slot `i` always belongs to id `i` of that list.
fn write_pointer_array(
    ctx: &mut BuildContext,
    out: &mut ByteWriter,
    list_offset: u32,
    payloads: &[Payload<'_>],
) -> Result<u32> {
    let mut offsets = Vec::with_capacity(payloads.len());

    for payload in payloads {
        let offset = match payload {
            Payload::Keyfile(kf) => write_keyfile(ctx, out, kf)?,
            Payload::IdList(list) => list.serialize(out)?,
            Payload::TextIndex { locale, index } => {
                let locale = Some(*locale);
                if !ctx.interner.is_written(locale) {
                    ctx.interner.write_bucket(locale, out)?;
                }
                index.serialize(locale, &ctx.interner, out)?
            }
        };
        offsets.push(offset);
    }

    let offset = out.aligned_offset(format::POINTER)?;
    out.write_u32(list_offset)?;
    for value in offsets {
        out.write_u32(value)?;
    }

    Ok(offset)
}

fn write_keyfile(ctx: &BuildContext, out: &mut ByteWriter, kf: &Keyfile) -> Result<u32> {
    // One slot of the group table is taken by the end sentinel.
    if kf.n_groups() >= MAX_LIST_LEN || kf.n_items() > MAX_LIST_LEN {
        return Err(IndexError::CapacityExceeded {
            what: "keyfile",
            count: kf.n_groups().max(kf.n_items()),
            limit: MAX_LIST_LEN,
        });
    }

    let offset = out.aligned_offset(4)?;
    out.write_u16(kf.n_groups() as u16)?;
    out.write_u16(kf.n_items() as u16)?;

    for group in kf.groups() {
        out.write_u16(ctx.group_names.id(&group.name)?)?;
        out.write_u16(group.start as u16)?;
    }
    out.write_u16(NO_ID)?;
    out.write_u16(kf.n_items() as u16)?;

    for item in kf.items() {
        out.write_u16(ctx.key_names.id(&item.key)?)?;
        let locale_id = match &item.locale {
            Some(locale) => ctx.locale_names.id(locale)?,
            None => NO_ID,
        };
        out.write_u16(locale_id)?;
        out.write_u32(ctx.interner.offset(item.locale.as_deref(), &item.value)?)?;
    }

    Ok(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{read_u16, read_u32};

    fn editor() -> Keyfile {
        Keyfile::parse(
            "app.desktop",
            "[Desktop Entry]\nName=Text Editor\nName[fr]=Éditeur de texte\nKeywords=write;edit;\n",
        )
        .unwrap()
    }

    fn header_field(bytes: &[u8], slot: usize) -> usize {
        read_u32(bytes, 8 + slot * 4).unwrap() as usize
    }

    #[test]
    fn test_header_magic_and_version() {
        let mut builder = IndexBuilder::new();
        builder.add_keyfile("app.desktop", editor());
        let bytes = builder.build().unwrap();

        assert_eq!(&bytes[0..4], MAGIC);
        assert_eq!(read_u32(&bytes, 4), Some(FORMAT_VERSION));
        for slot in 0..HEADER_FIELDS {
            let offset = header_field(&bytes, slot);
            assert!(offset >= HEADER_SIZE && offset < bytes.len(), "slot {slot}");
        }
    }

    #[test]
    fn test_pointer_arrays_reference_lists() {
        let mut builder = IndexBuilder::new();
        builder.add_keyfile("app.desktop", editor());
        let bytes = builder.build().unwrap();

        let pairs = [
            (field::IMPLEMENTORS, field::GROUP_NAMES),
            (field::TEXT_INDEXES, field::LOCALE_NAMES),
            (field::KEYFILES, field::APP_NAMES),
        ];
        for (array, list) in pairs {
            let array = header_field(&bytes, array);
            assert_eq!(array % 4, 0);
            assert_eq!(read_u32(&bytes, array).unwrap() as usize, header_field(&bytes, list));
        }
    }

    #[test]
    fn test_keyfile_layout() {
        let mut builder = IndexBuilder::new();
        builder.add_keyfile("app.desktop", editor());
        let bytes = builder.build().unwrap();

        let array = header_field(&bytes, field::KEYFILES);
        let kf = read_u32(&bytes, array + 4).unwrap() as usize;
        assert_eq!(kf % 4, 0);
        assert_eq!(read_u16(&bytes, kf), Some(1)); // groups
        assert_eq!(read_u16(&bytes, kf + 2), Some(3)); // items
        assert_eq!(read_u16(&bytes, kf + 4), Some(0)); // "Desktop Entry"
        assert_eq!(read_u16(&bytes, kf + 6), Some(0));
        assert_eq!(read_u16(&bytes, kf + 8), Some(NO_ID)); // sentinel
        assert_eq!(read_u16(&bytes, kf + 10), Some(3));
        // first item: Name, no locale
        assert_eq!(read_u16(&bytes, kf + 14), Some(NO_ID));
    }

    #[test]
    fn test_implementors() {
        let mut builder = IndexBuilder::new();
        let a = Keyfile::parse("a", "[Desktop Entry]\n[X]\n[X]\n").unwrap();
        builder.add_keyfile("a.desktop", a);
        builder.add_keyfile("b.desktop", Keyfile::parse("b", "[X]\nK=v\n").unwrap());
        let ctx = BuildContext::collect(&builder.keyfiles).unwrap();

        let lists = builder.group_implementors(&ctx).unwrap();
        let x = ctx.group_names.id("X").unwrap() as usize;
        let entry = ctx.group_names.id("Desktop Entry").unwrap() as usize;
        assert_eq!(lists[x].ids(), &[0, 1]);
        assert_eq!(lists[entry].ids(), &[0]);
    }

    #[test]
    fn test_custom_fields() {
        let options = BuildOptions {
            group: "Desktop Entry".to_string(),
            fields: vec!["Exec".to_string()],
        };
        let mut builder = IndexBuilder::with_options(options);
        builder.add_keyfile(
            "a.desktop",
            Keyfile::parse("a", "[Desktop Entry]\nName=Alpha\nExec=alpha-bin\n").unwrap(),
        );
        let ctx = BuildContext::collect(&builder.keyfiles).unwrap();
        let index = builder.index_locale(&ctx, &[]).unwrap();
        assert!(index.get("alpha").is_some());
        assert!(index.get("bin").is_some());
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_empty_build() {
        let bytes = IndexBuilder::new().build().unwrap();
        assert!(bytes.len() > HEADER_SIZE);
    }

    #[test]
    fn test_replace_keyfile() {
        let mut builder = IndexBuilder::new();
        assert!(!builder.add_keyfile("a.desktop", editor()));
        assert!(builder.add_keyfile("a.desktop", editor()));
        assert_eq!(builder.len(), 1);
    }
}
