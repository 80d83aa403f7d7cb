//! Typed failures raised by the bag-of-words encoder.
//!
//! Public operations return `anyhow::Result`; the variants below are wrapped
//! into `anyhow::Error` so callers can recover the cause with
//! `err.downcast_ref::<EncodeError>()`.

use crate::dictionary::TokenId;
use std::fmt;

/// A fatal encoder failure. None of these are retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The dictionary id counter would pass the addressable column count.
    DictionaryOverflow { column: usize, limit: TokenId },
    /// Apply saw a different number of distinct tokens than build recorded.
    BuildApplyDivergence {
        column: usize,
        row: usize,
        built: u32,
        applied: usize,
    },
    /// Apply saw a token the dictionary never assigned.
    UnknownToken {
        column: usize,
        row: usize,
        token: String,
    },
    /// Two partitions reported under the same start row.
    PartitionConflict { column: usize, start_row: usize },
    /// The merge ran before every partition reported.
    MissingPartitions {
        column: usize,
        expected: usize,
        found: usize,
    },
    /// The caller-reserved sparse region cannot hold the row's entries.
    SlotOverflow {
        column: usize,
        row: usize,
        needed: usize,
        available: usize,
    },
    /// A dense output row is narrower than the encoder's output columns.
    ColumnOutOfRange {
        column: usize,
        row: usize,
        output_column: usize,
        width: usize,
    },
    /// A metadata entry is unparsable or its ids are not dense.
    MalformedMetadata { column: usize, entry: String },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DictionaryOverflow { column, limit } => write!(
                f,
                "token dictionary of the bag-of-words encoder on column {column} exceeds the maximum number of output columns ({limit})"
            ),
            Self::BuildApplyDivergence {
                column,
                row,
                built,
                applied,
            } => write!(
                f,
                "column {column}, row {row}: build recorded {built} distinct tokens but apply found {applied}; input changed between passes"
            ),
            Self::UnknownToken { column, row, token } => write!(
                f,
                "column {column}, row {row}: token {token:?} is not in the dictionary; input changed between passes"
            ),
            Self::PartitionConflict { column, start_row } => write!(
                f,
                "column {column}: partition starting at row {start_row} reported twice"
            ),
            Self::MissingPartitions {
                column,
                expected,
                found,
            } => write!(
                f,
                "column {column}: merge expected {expected} partial builds but found {found}"
            ),
            Self::SlotOverflow {
                column,
                row,
                needed,
                available,
            } => write!(
                f,
                "column {column}, row {row}: {needed} sparse entries do not fit the {available} reserved slots"
            ),
            Self::ColumnOutOfRange {
                column,
                row,
                output_column,
                width,
            } => write!(
                f,
                "column {column}, row {row}: output column {output_column} is outside the {width} dense columns"
            ),
            Self::MalformedMetadata { column, entry } => {
                write!(f, "column {column}: malformed metadata entry {entry:?}")
            }
        }
    }
}

impl std::error::Error for EncodeError {}
