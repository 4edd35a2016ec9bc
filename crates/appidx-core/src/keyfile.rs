//! Parsed metadata files.
//!
//! A [`Keyfile`] keeps groups and items in file order. Items are laid out
//! contiguously per group: group `g` owns `items[start(g)..start(g + 1)]`
//! and the last group extends to the end of `items`.
//!
//! ## Grammar
//!
//! ```text
//! # comment
//! [Group Name]
//! Key=Value
//! Key[locale]=Value
//! ```
//!
//! Keys use `[A-Za-z0-9-]`, locales `[A-Za-z0-9@._]`. Blank lines and
//! comments are ignored. Anything else is a parse error carrying the file
//! name and line number.

use crate::error::{IndexError, Result};
use crate::format::MAX_LIST_LEN;
use std::fs;
use std::ops::Range;
use std::path::Path;

/// One `Key[locale]=Value` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyfileItem {
    pub key: String,
    pub locale: Option<String>,
    pub value: String,
}

/// One `[Group]` header and the index of its first item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyfileGroup {
    pub name: String,
    pub start: usize,
}

/// In-memory shape of one metadata file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyfile {
    groups: Vec<KeyfileGroup>,
    items: Vec<KeyfileItem>,
}

impl Keyfile {
    /// Create an empty keyfile.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse a metadata file from disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| IndexError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self::parse(&name, &contents)
    }

    /// Parse metadata text. `file_name` is only used in error messages.
    pub fn parse(file_name: &str, contents: &str) -> Result<Self> {
        let mut kf = Keyfile::new();

        for (idx, raw) in contents.split('\n').enumerate() {
            let line_no = idx + 1;
            let line = raw.strip_suffix('\r').unwrap_or(raw);

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let name = match rest.find(']') {
                    Some(close) if close == rest.len() - 1 => &rest[..close],
                    _ => {
                        return Err(IndexError::parse(
                            file_name,
                            line_no,
                            "Invalid group line: ']' must be last character on line",
                        ))
                    }
                };
                kf.add_group(name);
                if kf.groups.len() >= MAX_LIST_LEN {
                    return Err(IndexError::parse(file_name, line_no, "Too many groups"));
                }
                continue;
            }

            let item = parse_assignment(line)
                .map_err(|reason| IndexError::parse(file_name, line_no, reason))?;

            if kf.groups.is_empty() {
                return Err(IndexError::parse(
                    file_name,
                    line_no,
                    "Assignments must follow a group header",
                ));
            }
            if kf.items.len() >= MAX_LIST_LEN {
                return Err(IndexError::parse(file_name, line_no, "Too many items"));
            }
            kf.items.push(item);
        }

        Ok(kf)
    }

    /// Start a new group; following items belong to it.
    fn add_group(&mut self, name: &str) {
        self.groups.push(KeyfileGroup {
            name: name.to_string(),
            start: self.items.len(),
        });
    }

    pub fn groups(&self) -> &[KeyfileGroup] {
        &self.groups
    }

    pub fn items(&self) -> &[KeyfileItem] {
        &self.items
    }

    pub fn n_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn n_items(&self) -> usize {
        self.items.len()
    }

    /// Item range owned by group `group`, or `None` for an unknown group.
    pub fn group_range(&self, group: usize) -> Option<Range<usize>> {
        let start = self.groups.get(group)?.start;
        let end = self
            .groups
            .get(group + 1)
            .map(|g| g.start)
            .unwrap_or(self.items.len());
        Some(start..end)
    }

    /// Items of group `group`.
    pub fn group_items(&self, group: usize) -> Option<&[KeyfileItem]> {
        self.items.get(self.group_range(group)?)
    }

    /// Whether any group is called `name`.
    pub fn has_group(&self, name: &str) -> bool {
        self.groups.iter().any(|g| g.name == name)
    }

    /// Look up a value with locale fallback.
    ///
    /// Each locale in `locales` (most specific first) is tried in turn; when
    /// none matches, the untranslated value is returned. If a group name is
    /// repeated, the last group with that name is searched.
    pub fn get_value(&self, locales: &[&str], group: &str, key: &str) -> Option<&str> {
        let idx = self.groups.iter().rposition(|g| g.name == group)?;
        let items = self.group_items(idx)?;

        for locale in locales {
            // There are more distinct locales than keys, so compare those first.
            if let Some(item) = items
                .iter()
                .find(|i| i.locale.as_deref() == Some(*locale) && i.key == key)
            {
                return Some(&item.value);
            }
        }

        items
            .iter()
            .find(|i| i.locale.is_none() && i.key == key)
            .map(|i| i.value.as_str())
    }
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}

fn is_locale_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '_')
}

fn parse_assignment(line: &str) -> std::result::Result<KeyfileItem, &'static str> {
    let key_len = line.find(|c| !is_key_char(c)).unwrap_or(line.len());
    let key = &line[..key_len];
    let rest = &line[key_len..];

    if key.is_empty() {
        return Err("Lines must either be empty, comments, groups or assignments");
    }

    if let Some(after) = rest.strip_prefix('[') {
        let locale_len = after.find(|c| !is_locale_char(c)).unwrap_or(after.len());
        let locale = &after[..locale_len];
        let value = match after[locale_len..].strip_prefix("]=") {
            Some(value) if !locale.is_empty() => value,
            _ => return Err("Keys containing '[' must then have a locale name, then ']='"),
        };
        Ok(KeyfileItem {
            key: key.to_string(),
            locale: Some(locale.to_string()),
            value: value.to_string(),
        })
    } else if let Some(value) = rest.strip_prefix('=') {
        Ok(KeyfileItem {
            key: key.to_string(),
            locale: None,
            value: value.to_string(),
        })
    } else {
        Err("Lines must either be empty, comments, groups or assignments")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EDITOR: &str = "\
# An editor
[Desktop Entry]
Name=Text Editor
Name[fr]=Éditeur de texte
Name[de_DE]=Texteditor
Keywords=write;edit;

[Desktop Action new-window]
Name=New Window
";

    #[test]
    fn test_parse_groups_and_items() {
        let kf = Keyfile::parse("app.desktop", EDITOR).unwrap();
        assert_eq!(kf.n_groups(), 2);
        assert_eq!(kf.n_items(), 5);
        assert_eq!(kf.groups()[0].name, "Desktop Entry");
        assert_eq!(kf.group_range(0), Some(0..4));
        assert_eq!(kf.group_range(1), Some(4..5));
        assert_eq!(kf.group_range(2), None);
        assert_eq!(kf.group_items(1).map(<[_]>::len), Some(1));
        assert!(kf.group_items(2).is_none());
        assert_eq!(kf.items()[1].locale.as_deref(), Some("fr"));
        assert_eq!(kf.items()[1].value, "Éditeur de texte");
    }

    #[test]
    fn test_get_value_locale_chain() {
        let kf = Keyfile::parse("app.desktop", EDITOR).unwrap();
        assert_eq!(
            kf.get_value(&["de_DE", "de"], "Desktop Entry", "Name"),
            Some("Texteditor")
        );
        assert_eq!(
            kf.get_value(&["fr_FR", "fr"], "Desktop Entry", "Name"),
            Some("Éditeur de texte")
        );
        assert_eq!(
            kf.get_value(&["it"], "Desktop Entry", "Name"),
            Some("Text Editor")
        );
        assert_eq!(kf.get_value(&[], "Desktop Entry", "Missing"), None);
        assert_eq!(kf.get_value(&[], "No Such Group", "Name"), None);
    }

    #[test]
    fn test_empty_trailing_group() {
        let kf = Keyfile::parse("a.desktop", "[A]\nK=v\n[B]\n").unwrap();
        assert_eq!(kf.group_range(1), Some(1..1));
        assert_eq!(kf.group_items(1), Some(&[][..]));
        assert_eq!(kf.get_value(&[], "B", "K"), None);
    }

    #[test]
    fn test_locale_fallback_to_default() {
        let kf = Keyfile::parse("a.desktop", "[Desktop Entry]\nName=Default\n").unwrap();
        assert_eq!(kf.get_value(&["fr"], "Desktop Entry", "Name"), Some("Default"));
    }

    #[test]
    fn test_duplicate_keys_first_wins() {
        let kf = Keyfile::parse("a.desktop", "[G]\nK=one\nK=two\n").unwrap();
        assert_eq!(kf.get_value(&[], "G", "K"), Some("one"));
    }

    #[test]
    fn test_crlf_and_unterminated() {
        let kf = Keyfile::parse("a.desktop", "[G]\r\nK=v\r\nL=w").unwrap();
        assert_eq!(kf.get_value(&[], "G", "K"), Some("v"));
        assert_eq!(kf.get_value(&[], "G", "L"), Some("w"));
    }

    #[test]
    fn test_invalid_group_line() {
        let err = Keyfile::parse("bad.desktop", "[Desktop Entry] x\n").unwrap_err();
        match err {
            IndexError::Parse { file, line, .. } => {
                assert_eq!(file, "bad.desktop");
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_locale() {
        let err = Keyfile::parse("bad.desktop", "[G]\n\nName[]=x\n").unwrap_err();
        assert!(matches!(err, IndexError::Parse { line: 3, .. }));

        let err = Keyfile::parse("bad.desktop", "[G]\nName[fr=x\n").unwrap_err();
        assert!(matches!(err, IndexError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_invalid_assignment() {
        assert!(Keyfile::parse("bad.desktop", "[G]\nName x\n").is_err());
        assert!(Keyfile::parse("bad.desktop", "[G]\n=x\n").is_err());
        assert!(Keyfile::parse("bad.desktop", "Name=x\n").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("editor.desktop");
        fs::write(&path, EDITOR).unwrap();

        let kf = Keyfile::from_file(&path).unwrap();
        assert!(kf.has_group("Desktop Action new-window"));

        let missing = Keyfile::from_file(&dir.path().join("nope.desktop")).unwrap_err();
        assert!(missing.is_input_error());
    }
}
