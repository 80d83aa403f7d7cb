//! Partitioned dictionary build: per-partition token sets and their
//! write-once collection point.
//!
//! Partition tasks never assign ids. Each one reports the distinct tokens of
//! its contiguous row range in first-occurrence order, keyed by its start
//! row; a single merge step later walks the partitions in ascending start
//! row and assigns ids, which reproduces the sequential build exactly.

use crate::error::EncodeError;
use crate::frame::CellSource;
use crate::tokenizer::Tokenizer;
use anyhow::Result;
use std::collections::{BTreeMap, HashSet};
use std::ops::Range;
use std::sync::Mutex;

/// Split `num_rows` rows into at most `partitions` contiguous blocks whose
/// sizes differ by at most one. Zero rows yield a single empty block.
#[must_use]
pub fn block_sizes(num_rows: usize, partitions: usize) -> Vec<usize> {
    let parts = partitions.clamp(1, num_rows.max(1));
    let base = num_rows / parts;
    let extra = num_rows % parts;
    (0..parts).map(|i| base + usize::from(i < extra)).collect()
}

/// Turn block sizes into absolute row ranges.
#[must_use]
pub fn block_ranges(sizes: &[usize]) -> Vec<Range<usize>> {
    let mut start = 0;
    sizes
        .iter()
        .map(|len| {
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

/// What one partition learned about its rows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartialBuild {
    pub start_row: usize,
    /// Distinct tokens of the partition, first occurrence first.
    pub tokens: Vec<String>,
    /// Distinct-token count of each row in the partition.
    pub nnz_per_row: Vec<u32>,
    /// Sum of `nnz_per_row`.
    pub nnz: u64,
}

/// Tokenize rows `start_row..start_row + block_size` (clipped to the source)
/// of `column` and collect the partition's token set and row counts.
#[must_use]
pub fn build_partition<S: CellSource + ?Sized>(
    source: &S,
    column: usize,
    tokenizer: &Tokenizer,
    start_row: usize,
    block_size: usize,
) -> PartialBuild {
    let end_row = (start_row + block_size).min(source.num_rows());
    let mut seen: HashSet<String> = HashSet::new();
    let mut partial = PartialBuild {
        start_row,
        nnz_per_row: Vec::with_capacity(end_row.saturating_sub(start_row)),
        ..PartialBuild::default()
    };
    for row in start_row..end_row {
        let distinct = tokenizer.distinct(source.cell_str(row, column));
        partial.nnz_per_row.push(distinct.len() as u32);
        partial.nnz += distinct.len() as u64;
        for token in distinct {
            if !seen.contains(&token) {
                seen.insert(token.clone());
                partial.tokens.push(token);
            }
        }
    }
    partial
}

/// Partition results keyed by start row. Each key is written once.
#[derive(Debug)]
pub struct PartitionResults {
    column: usize,
    partials: Mutex<BTreeMap<usize, PartialBuild>>,
}

impl PartitionResults {
    #[must_use]
    pub fn new(column: usize) -> Self {
        Self {
            column,
            partials: Mutex::new(BTreeMap::new()),
        }
    }

    /// Store a partition's result under its start row.
    ///
    /// # Errors
    /// [`EncodeError::PartitionConflict`] if that start row already reported.
    pub fn insert(&self, partial: PartialBuild) -> Result<()> {
        let mut partials = self.partials.lock().unwrap();
        if partials.contains_key(&partial.start_row) {
            return Err(EncodeError::PartitionConflict {
                column: self.column,
                start_row: partial.start_row,
            }
            .into());
        }
        partials.insert(partial.start_row, partial);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.partials.lock().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return every result in ascending start-row order.
    ///
    /// # Errors
    /// [`EncodeError::MissingPartitions`] unless exactly `expected` results
    /// are present.
    pub fn drain_ordered(&self, expected: usize) -> Result<Vec<PartialBuild>> {
        let mut partials = self.partials.lock().unwrap();
        if partials.len() != expected {
            return Err(EncodeError::MissingPartitions {
                column: self.column,
                expected,
                found: partials.len(),
            }
            .into());
        }
        Ok(std::mem::take(&mut *partials).into_values().collect())
    }
}
