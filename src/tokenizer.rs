//! Text → token normalization shared by build, apply, and estimation.
//!
//! Normalization is a single pass over the characters with no pattern
//! matching; only the final split uses the separator regex. Build and apply
//! must call the exact same code so both passes agree on every row.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Default separator: one or more whitespace characters.
pub const DEFAULT_SEPARATOR: &str = r"\s+";

/// Token → occurrence count for a single row.
pub type TokenCounts = HashMap<String, u32>;

/// Normalize `text` into letters and single spaces.
///
/// Apostrophes (`'`, `’`), periods and slashes become spaces, letters are kept
/// (lowercased unless `case_sensitive`), whitespace becomes a plain space and
/// everything else, digits and letter-like numerals included, is dropped.
/// Lowercasing is per character and ignores locale.
#[must_use]
pub fn normalize(text: &str, case_sensitive: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2019}' | '\'' | '.' | '/' => out.push(' '),
            c if is_letter(c) => {
                if case_sensitive {
                    out.push(c);
                } else {
                    // multi-char lowercase forms keep only their letters
                    out.extend(c.to_lowercase().filter(|l| is_letter(*l)));
                }
            }
            c if c.is_whitespace() => out.push(' '),
            _ => {}
        }
    }
    out
}

/// Alphabetic and not a numeral, so `Ⅻ` is dropped like a digit. Marks with
/// the Alphabetic property still count as letters.
fn is_letter(c: char) -> bool {
    c.is_alphabetic() && !c.is_numeric()
}

/// Normalize `text` and split it on `separator`.
///
/// The returned fragments may contain empty strings (leading or trailing
/// separators); callers filter them before counting.
#[must_use]
pub fn tokenize(text: &str, case_sensitive: bool, separator: &Regex) -> Vec<String> {
    let normalized = normalize(text, case_sensitive);
    separator.split(&normalized).map(str::to_owned).collect()
}

/// A configured tokenizer: case mode plus compiled separator.
///
/// Cloning is cheap (the compiled regex is reference counted), which lets
/// partition tasks carry their own copy.
#[derive(Clone, Debug)]
pub struct Tokenizer {
    case_sensitive: bool,
    separator: Regex,
}

impl Tokenizer {
    /// Compile a tokenizer for the given separator pattern.
    ///
    /// # Errors
    /// Returns an error if `separator` is not a valid regular expression.
    pub fn new(case_sensitive: bool, separator: &str) -> Result<Self> {
        let separator = Regex::new(separator)
            .with_context(|| format!("compile token separator {separator:?}"))?;
        Ok(Self {
            case_sensitive,
            separator,
        })
    }

    #[must_use]
    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    #[must_use]
    pub fn separator(&self) -> &str {
        self.separator.as_str()
    }

    /// Non-empty tokens of `text`, in order, duplicates kept.
    #[must_use]
    pub fn tokens(&self, text: &str) -> Vec<String> {
        let mut out = tokenize(text, self.case_sensitive, &self.separator);
        out.retain(|t| !t.is_empty());
        out
    }

    /// Tokens of an optional cell; an absent cell has none.
    #[must_use]
    pub fn cell_tokens(&self, cell: Option<&str>) -> Vec<String> {
        cell.map(|text| self.tokens(text)).unwrap_or_default()
    }

    /// Occurrence count per distinct token of an optional cell.
    #[must_use]
    pub fn count(&self, cell: Option<&str>) -> TokenCounts {
        let mut counts = TokenCounts::new();
        for token in self.cell_tokens(cell) {
            *counts.entry(token).or_insert(0) += 1;
        }
        counts
    }

    /// Distinct tokens of an optional cell in first-occurrence order.
    #[must_use]
    pub fn distinct(&self, cell: Option<&str>) -> Vec<String> {
        let mut seen = HashSet::new();
        self.cell_tokens(cell)
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect()
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            separator: Regex::new(DEFAULT_SEPARATOR).expect("default separator compiles"),
        }
    }
}
