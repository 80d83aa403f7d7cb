//! The bag-of-words column encoder.
//!
//! One encoder owns the token dictionary of one text column. It is built
//! once (sequentially or as a partitioned task graph), then applied any
//! number of times to dense or sparse outputs, and can export its
//! dictionary as metadata.

use crate::build::{PartitionResults, block_ranges, block_sizes, build_partition};
use crate::config::BowConfig;
use crate::dictionary::{TokenDictionary, TokenId};
use crate::emit::{DenseEmitter, EmitContext, RowEmitter, SlotReservation, SparseEmitter};
use crate::error::EncodeError;
use crate::estimate::{DomainEstimate, EstimatorConfig, estimate_domain};
use crate::frame::{CellSource, StringFrame};
use crate::matrix::{CsrRowsMut, DenseRowsMut, ZeroRowSink};
use crate::meta::{construct_recode_entry, split_recode_entry};
use crate::tasks::TaskGraph;
use crate::tokenizer::Tokenizer;
use anyhow::Result;
use std::ops::Range;
use std::sync::{Arc, OnceLock};

#[derive(Debug)]
pub struct BagOfWordsEncoder {
    column: usize,
    tokenizer: Tokenizer,
    estimator: EstimatorConfig,
    dictionary: TokenDictionary,
    nnz_per_row: Vec<u32>,
    nnz: u64,
    estimate: OnceLock<DomainEstimate>,
}

impl BagOfWordsEncoder {
    /// Encoder for zero-based input `column`.
    ///
    /// # Errors
    /// Fails if the configured separator is not a valid regex.
    pub fn new(column: usize, config: &BowConfig) -> Result<Self> {
        Ok(Self {
            column,
            tokenizer: Tokenizer::new(config.case_sensitive, &config.separator)?,
            estimator: config.estimator.clone(),
            dictionary: TokenDictionary::new(),
            nnz_per_row: Vec::new(),
            nnz: 0,
            estimate: OnceLock::new(),
        })
    }

    /// Cap the dictionary at `limit` tokens instead of the column maximum.
    #[must_use]
    pub fn with_dictionary_limit(mut self, limit: TokenId) -> Self {
        self.dictionary = TokenDictionary::with_limit(limit);
        self
    }

    #[must_use]
    pub fn column(&self) -> usize {
        self.column
    }

    #[must_use]
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    #[must_use]
    pub fn dictionary(&self) -> &TokenDictionary {
        &self.dictionary
    }

    /// Number of distinct tokens, i.e. output columns.
    #[must_use]
    pub fn domain_size(&self) -> usize {
        self.dictionary.len()
    }

    /// Distinct-token count of every row seen by the last build.
    #[must_use]
    pub fn nnz_per_row(&self) -> &[u32] {
        &self.nnz_per_row
    }

    /// Sum of [`Self::nnz_per_row`].
    #[must_use]
    pub fn nnz(&self) -> u64 {
        self.nnz
    }

    /// The cached domain estimate, if one was computed.
    #[must_use]
    pub fn domain_estimate(&self) -> Option<DomainEstimate> {
        self.estimate.get().copied()
    }

    /// Estimate the domain from `sample_rows`; computed once, then cached.
    pub fn compute_domain_estimate<S: CellSource + ?Sized>(
        &self,
        source: &S,
        sample_rows: &[usize],
    ) -> DomainEstimate {
        *self.estimate.get_or_init(|| {
            estimate_domain(
                source,
                self.column,
                &self.tokenizer,
                sample_rows,
                &self.estimator,
            )
        })
    }

    /// Single-threaded build over every row of `source`.
    ///
    /// # Errors
    /// [`EncodeError::DictionaryOverflow`] when the column has more distinct
    /// tokens than the dictionary can address.
    pub fn build<S: CellSource + ?Sized>(&mut self, source: &S) -> Result<()> {
        let rows = source.num_rows();
        self.nnz = 0;
        self.nnz_per_row = Vec::with_capacity(rows);
        for row in 0..rows {
            let distinct = self.tokenizer.distinct(source.cell_str(row, self.column));
            self.nnz_per_row.push(distinct.len() as u32);
            self.nnz += distinct.len() as u64;
            for token in &distinct {
                self.dictionary.get_or_insert(token, self.column)?;
            }
        }
        log::info!(
            "column {}: built {} tokens over {rows} rows (nnz {})",
            self.column,
            self.dictionary.len(),
            self.nnz
        );
        Ok(())
    }

    /// Build tasks for `partitions` row blocks.
    ///
    /// With a single block this is one task running [`Self::build`].
    /// Otherwise every block gets an independent partition task and a final
    /// merge task depends on all of them.
    pub fn build_tasks<'a, S: CellSource + ?Sized>(
        &'a mut self,
        source: &'a S,
        partitions: usize,
    ) -> TaskGraph<'a> {
        let column = self.column;
        let mut graph = TaskGraph::new();
        let sizes = block_sizes(source.num_rows(), partitions);
        if sizes.len() == 1 {
            graph.add(format!("bow-build[col {column}]"), move || self.build(source));
            return graph;
        }

        let results = Arc::new(PartitionResults::new(column));
        let mut partition_ids = Vec::with_capacity(sizes.len());
        for range in block_ranges(&sizes) {
            let tokenizer = self.tokenizer.clone();
            let results = Arc::clone(&results);
            let name = format!("bow-partial[col {column}, rows {range:?}]");
            partition_ids.push(graph.add(name, move || {
                let partial =
                    build_partition(source, column, &tokenizer, range.start, range.len());
                log::debug!(
                    "column {column}: partition at row {} saw {} tokens",
                    partial.start_row,
                    partial.tokens.len()
                );
                results.insert(partial)
            }));
        }
        let expected = sizes.len();
        graph.add_with_deps(format!("bow-merge[col {column}]"), partition_ids, move || {
            self.merge_partials(&results, expected)
        });
        graph
    }

    /// Fold partition results into the dictionary in ascending start-row
    /// order. Must run after every partition task finished.
    ///
    /// # Errors
    /// [`EncodeError::MissingPartitions`] when fewer than `expected` results
    /// are present; [`EncodeError::DictionaryOverflow`] on overflow.
    pub fn merge_partials(&mut self, results: &PartitionResults, expected: usize) -> Result<()> {
        let partials = results.drain_ordered(expected)?;
        let rows = partials
            .last()
            .map_or(0, |p| p.start_row + p.nnz_per_row.len());
        self.nnz = 0;
        self.nnz_per_row = vec![0; rows];
        for partial in partials {
            for token in &partial.tokens {
                self.dictionary.get_or_insert(token, self.column)?;
            }
            let span = partial.start_row..partial.start_row + partial.nnz_per_row.len();
            self.nnz_per_row[span].copy_from_slice(&partial.nnz_per_row);
            self.nnz += partial.nnz;
        }
        log::info!(
            "column {}: merged {expected} partitions into {} tokens (nnz {})",
            self.column,
            self.dictionary.len(),
            self.nnz
        );
        Ok(())
    }

    /// Recompute per-row distinct-token counts without touching the
    /// dictionary, e.g. after [`Self::load_metadata`].
    pub fn recount_rows<S: CellSource + ?Sized>(&mut self, source: &S) {
        self.nnz_per_row = (0..source.num_rows())
            .map(|row| self.tokenizer.distinct(source.cell_str(row, self.column)).len() as u32)
            .collect();
        self.nnz = self.nnz_per_row.iter().map(|n| u64::from(*n)).sum();
    }

    /// Tokenize and count each row of `rows` (clipped to the source) and
    /// hand the counts to `emitter`.
    ///
    /// # Errors
    /// Propagates the first emitter failure.
    pub fn apply<S: CellSource + ?Sized, E: RowEmitter>(
        &self,
        source: &S,
        rows: Range<usize>,
        output_base: usize,
        emitter: &mut E,
    ) -> Result<()> {
        let ctx = EmitContext {
            column: self.column,
            dictionary: &self.dictionary,
            output_base,
            nnz_per_row: &self.nnz_per_row,
        };
        let end = rows.end.min(source.num_rows());
        for row in rows.start..end {
            let counts = self.tokenizer.count(source.cell_str(row, self.column));
            emitter.emit_row(&ctx, row, counts)?;
        }
        emitter.finish()
    }

    /// Write token counts of rows `start_row..start_row + block_size` into
    /// dense columns `output_base + id`.
    ///
    /// # Errors
    /// [`EncodeError::UnknownToken`] if a row holds a token the build never saw.
    pub fn apply_dense<S: CellSource + ?Sized>(
        &self,
        source: &S,
        out: &mut DenseRowsMut<'_>,
        output_base: usize,
        start_row: usize,
        block_size: usize,
    ) -> Result<()> {
        let mut emitter = DenseEmitter::new(out);
        self.apply(source, start_row..start_row + block_size, output_base, &mut emitter)
    }

    /// Write sorted `(output_base + id, count)` pairs of rows
    /// `start_row..start_row + block_size` into each row's reserved CSR
    /// slots, starting `slots.offset(row)` into the row. Rows without tokens
    /// are reported to `zero_rows` once the block is done.
    ///
    /// # Errors
    /// [`EncodeError::BuildApplyDivergence`] when a row's distinct-token count
    /// differs from the build, [`EncodeError::SlotOverflow`] when the
    /// reservation is too small, [`EncodeError::UnknownToken`] for unseen
    /// tokens.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_sparse<S: CellSource + ?Sized>(
        &self,
        source: &S,
        out: &mut CsrRowsMut<'_>,
        output_base: usize,
        start_row: usize,
        block_size: usize,
        slots: SlotReservation<'_>,
        zero_rows: &dyn ZeroRowSink,
    ) -> Result<()> {
        let mut emitter = SparseEmitter::new(out, slots, zero_rows);
        self.apply(source, start_row..start_row + block_size, output_base, &mut emitter)
    }

    /// One `token·id` entry per dictionary token, ordered by id.
    #[must_use]
    pub fn metadata_entries(&self) -> Vec<String> {
        self.dictionary
            .entries_by_id()
            .into_iter()
            .map(|(token, id)| construct_recode_entry(token, id))
            .collect()
    }

    /// Store the dictionary in column `meta_column` of `meta`, row = id.
    pub fn write_metadata(&self, meta: &mut StringFrame, meta_column: usize) {
        meta.ensure_rows(self.domain_size());
        for (row, entry) in self.metadata_entries().into_iter().enumerate() {
            meta.set(row, meta_column, Some(entry));
        }
    }

    /// Replace the dictionary with the entries stored in column
    /// `meta_column` of `meta`. Reading stops at the first absent cell.
    ///
    /// # Errors
    /// [`EncodeError::MalformedMetadata`] for unparsable entries or ids that
    /// are not dense.
    pub fn load_metadata(&mut self, meta: &StringFrame, meta_column: usize) -> Result<()> {
        let mut entries = Vec::new();
        for cell in meta.column(meta_column) {
            let Some(entry) = cell else { break };
            let (token, id) =
                split_recode_entry(entry).map_err(|_| EncodeError::MalformedMetadata {
                    column: self.column,
                    entry: entry.to_owned(),
                })?;
            entries.push((token.to_owned(), id));
        }
        self.dictionary =
            TokenDictionary::from_entries(entries, self.column, self.dictionary.limit())?;
        log::debug!(
            "column {}: loaded {} tokens from metadata",
            self.column,
            self.dictionary.len()
        );
        Ok(())
    }
}
