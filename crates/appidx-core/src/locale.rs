//! Locale fallback chains.
//!
//! A locale tag has the shape `language[_TERRITORY][.CODESET][@MODIFIER]`.
//! Lookups try every variant that keeps the language, from the most specific
//! to the most general, e.g. `sr_RS.UTF-8@latin` expands to
//!
//! ```text
//! sr_RS.UTF-8@latin, sr_RS@latin, sr.UTF-8@latin, sr@latin,
//! sr_RS.UTF-8, sr_RS, sr.UTF-8, sr
//! ```

const CODESET: u8 = 1 << 0;
const TERRITORY: u8 = 1 << 1;
const MODIFIER: u8 = 1 << 2;

struct LocaleParts<'a> {
    language: &'a str,
    territory: &'a str,
    codeset: &'a str,
    modifier: &'a str,
}

impl<'a> LocaleParts<'a> {
    /// Split a tag; each optional component keeps its leading separator.
    fn split(tag: &'a str) -> Self {
        let (rest, modifier) = match tag.find('@') {
            Some(at) => (&tag[..at], &tag[at..]),
            None => (tag, ""),
        };
        let (rest, codeset) = match rest.find('.') {
            Some(dot) => (&rest[..dot], &rest[dot..]),
            None => (rest, ""),
        };
        let (language, territory) = match rest.find('_') {
            Some(us) => (&rest[..us], &rest[us..]),
            None => (rest, ""),
        };

        LocaleParts {
            language,
            territory,
            codeset,
            modifier,
        }
    }

    fn mask(&self) -> u8 {
        let mut mask = 0;
        if !self.codeset.is_empty() {
            mask |= CODESET;
        }
        if !self.territory.is_empty() {
            mask |= TERRITORY;
        }
        if !self.modifier.is_empty() {
            mask |= MODIFIER;
        }
        mask
    }
}

/// Expand `tag` into its fallback chain, most specific first.
///
/// The tag itself is always the first element. An empty tag yields an empty
/// chain, which callers treat as "untranslated values only".
pub fn variants(tag: &str) -> Vec<String> {
    if tag.is_empty() {
        return Vec::new();
    }

    let parts = LocaleParts::split(tag);
    let mask = parts.mask();
    let mut out = Vec::with_capacity(1 << mask.count_ones());

    for j in 0..=mask {
        let i = mask - j;
        if i & !mask != 0 {
            continue;
        }

        let mut variant = String::with_capacity(tag.len());
        variant.push_str(parts.language);
        if i & TERRITORY != 0 {
            variant.push_str(parts.territory);
        }
        if i & CODESET != 0 {
            variant.push_str(parts.codeset);
        }
        if i & MODIFIER != 0 {
            variant.push_str(parts.modifier);
        }
        out.push(variant);
    }

    out
}

/// Borrow a chain produced by [`variants`] as `&str` slices.
pub fn as_refs(chain: &[String]) -> Vec<&str> {
    chain.iter().map(String::as_str).collect()
}
