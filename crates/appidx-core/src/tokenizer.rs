//! Text tokenization for the full-text indexes.
//!
//! A token is a maximal run of alphanumeric code points; every other code
//! point separates tokens and is dropped. Each token is then folded so that
//! comparisons are locale- and case-insensitive:
//!
//! 1. canonical composition (NFC),
//! 2. `İ` (U+0130) and `ı` (U+0131) become ASCII `i`,
//! 3. full Unicode case folding.
//!
//! Step 2 runs before case folding because default case folding keeps the
//! Turkish dotted/dotless forms apart from ASCII `i`.

use unicode_normalization::UnicodeNormalization;

const CAPITAL_I_DOT: char = '\u{0130}';
const SMALL_DOTLESS_I: char = '\u{0131}';

/// Split `text` into folded tokens, in order of appearance.
///
/// Repeated tokens are kept; callers that need distinct tokens use
/// [`distinct_tokens`].
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    for (pos, c) in text.char_indices() {
        match (start, c.is_alphanumeric()) {
            (None, true) => start = Some(pos),
            (Some(s), false) => {
                tokens.push(fold_token(&text[s..pos]));
                start = None;
            }
            _ => {}
        }
    }

    if let Some(s) = start {
        tokens.push(fold_token(&text[s..]));
    }

    tokens
}

/// Tokens of `text` with later duplicates removed, first-occurrence order.
pub fn distinct_tokens(text: &str) -> Vec<String> {
    let mut tokens = tokenize(text);
    let mut seen = std::collections::HashSet::with_capacity(tokens.len());
    tokens.retain(|t| seen.insert(t.clone()));
    tokens
}

/// Fold a single token (or a query string) without splitting it.
pub fn fold_token(token: &str) -> String {
    let composed: String = token
        .nfc()
        .map(|c| match c {
            CAPITAL_I_DOT | SMALL_DOTLESS_I => 'i',
            other => other,
        })
        .collect();

    caseless::default_case_fold_str(&composed)
}
