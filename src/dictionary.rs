//! Token → dense integer id mapping owned by one column encoder.

use crate::error::EncodeError;
use anyhow::Result;
use std::collections::HashMap;

/// Dense, zero-based token id. Doubles as the output column offset.
pub type TokenId = u32;

/// Largest number of output columns an encoder may address (`i32::MAX`).
pub const MAX_OUTPUT_COLUMNS: TokenId = i32::MAX as TokenId;

/// Ids form the contiguous range `[0, len)` in first-insertion order and are
/// never reassigned or removed.
#[derive(Clone, Debug)]
pub struct TokenDictionary {
    ids: HashMap<String, TokenId>,
    limit: TokenId,
}

impl TokenDictionary {
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(MAX_OUTPUT_COLUMNS)
    }

    /// Dictionary that refuses to grow past `limit` tokens.
    #[must_use]
    pub fn with_limit(limit: TokenId) -> Self {
        Self {
            ids: HashMap::new(),
            limit,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn limit(&self) -> TokenId {
        self.limit
    }

    #[must_use]
    pub fn get(&self, token: &str) -> Option<TokenId> {
        self.ids.get(token).copied()
    }

    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.ids.contains_key(token)
    }

    /// Return the id of `token`, assigning the next id if it is new.
    ///
    /// # Errors
    /// [`EncodeError::DictionaryOverflow`] naming `column` when the counter
    /// would pass the limit. The dictionary is left unchanged in that case.
    pub fn get_or_insert(&mut self, token: &str, column: usize) -> Result<TokenId> {
        if let Some(id) = self.ids.get(token) {
            return Ok(*id);
        }
        let next = self.next_id(column)?;
        self.ids.insert(token.to_owned(), next);
        Ok(next)
    }

    fn next_id(&self, column: usize) -> Result<TokenId> {
        match TokenId::try_from(self.ids.len()) {
            Ok(next) if next < self.limit => Ok(next),
            _ => Err(EncodeError::DictionaryOverflow {
                column,
                limit: self.limit,
            }
            .into()),
        }
    }

    /// Tokens paired with their ids, ordered by id.
    #[must_use]
    pub fn entries_by_id(&self) -> Vec<(&str, TokenId)> {
        let mut entries: Vec<(&str, TokenId)> =
            self.ids.iter().map(|(t, id)| (t.as_str(), *id)).collect();
        entries.sort_unstable_by_key(|(_, id)| *id);
        entries
    }

    /// Rebuild a dictionary from `(token, id)` pairs, e.g. loaded metadata.
    ///
    /// # Errors
    /// [`EncodeError::MalformedMetadata`] when a token repeats or the ids are
    /// not exactly `[0, n)`; [`EncodeError::DictionaryOverflow`] when `n`
    /// passes the limit.
    pub fn from_entries<I>(entries: I, column: usize, limit: TokenId) -> Result<Self>
    where
        I: IntoIterator<Item = (String, TokenId)>,
    {
        let entries: Vec<(String, TokenId)> = entries.into_iter().collect();
        let mut ids = HashMap::with_capacity(entries.len());
        let mut seen = vec![false; entries.len()];
        for (token, id) in entries {
            if id >= limit {
                return Err(EncodeError::DictionaryOverflow { column, limit }.into());
            }
            // n unique ids below n are exactly 0..n
            let slot = id as usize;
            if slot >= seen.len() {
                return Err(EncodeError::MalformedMetadata {
                    column,
                    entry: format!("{token} (id {id}) is outside 0..{}", seen.len()),
                }
                .into());
            }
            if seen[slot] || ids.contains_key(&token) {
                return Err(EncodeError::MalformedMetadata {
                    column,
                    entry: format!("{token} (id {id}) is duplicated"),
                }
                .into());
            }
            seen[slot] = true;
            ids.insert(token, id);
        }
        Ok(Self { ids, limit })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, TokenId)> {
        self.ids.iter().map(|(t, id)| (t.as_str(), *id))
    }
}

impl Default for TokenDictionary {
    fn default() -> Self {
        Self::new()
    }
}
