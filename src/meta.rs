//! Dictionary metadata entries: `token·id`, the same layout recode tables use.

use crate::dictionary::TokenId;
use anyhow::{Context, Result, anyhow};

/// Separator between a token and its id (U+00B7 MIDDLE DOT).
pub const META_SEPARATOR: char = '\u{00b7}';

/// Join a token and its id into one metadata cell.
#[must_use]
pub fn construct_recode_entry(token: &str, id: TokenId) -> String {
    let mut entry = String::with_capacity(token.len() + 12);
    entry.push_str(token);
    entry.push(META_SEPARATOR);
    entry.push_str(&id.to_string());
    entry
}

/// Split a metadata cell back into token and id.
///
/// # Errors
/// Fails when the separator is missing or the id does not parse.
pub fn split_recode_entry(entry: &str) -> Result<(&str, TokenId)> {
    let (token, id) = entry
        .rsplit_once(META_SEPARATOR)
        .ok_or_else(|| anyhow!("no {META_SEPARATOR:?} separator in {entry:?}"))?;
    let id = id
        .parse::<TokenId>()
        .with_context(|| format!("parse id of {entry:?}"))?;
    Ok((token, id))
}
