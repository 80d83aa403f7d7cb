//! Multi-column bag-of-words transform.
//!
//! Encoders are laid out side by side in the output: encoder `i` owns
//! columns `base[i]..base[i] + domain_size[i]`. For sparse output each row is
//! sized to the sum of the encoders' distinct-token counts and every encoder
//! gets its own offset inside the row, so row blocks can be applied in
//! parallel with no coordination between encoders.

use crate::config::TransformConfig;
use crate::emit::SlotReservation;
use crate::encoder::BagOfWordsEncoder;
use crate::estimate::{DomainEstimate, sample_row_indices};
use crate::frame::{CellSource, StringFrame};
#[cfg(feature = "metrics")]
use crate::metrics::MetricsCollector;
use crate::matrix::{CsrMatrix, DenseMatrix};
use crate::tasks::{Scheduler, TaskGraph};
use anyhow::{Context, Result, ensure};
#[cfg(feature = "metrics")]
use std::time::Instant;

pub struct BagOfWordsTransformer {
    config: TransformConfig,
    scheduler: Scheduler,
    encoders: Vec<BagOfWordsEncoder>,
    #[cfg(feature = "metrics")]
    metrics: Option<MetricsCollector>,
}

impl BagOfWordsTransformer {
    /// One encoder per configured column.
    ///
    /// # Errors
    /// Fails if the config is invalid or the separator does not compile.
    pub fn new(config: TransformConfig) -> Result<Self> {
        config.validate()?;
        let encoders = config
            .columns
            .iter()
            .map(|&c| BagOfWordsEncoder::new(c, &config.bow))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            scheduler: Scheduler::new(config.mode),
            config,
            encoders,
            #[cfg(feature = "metrics")]
            metrics: None,
        })
    }

    /// Attach a collector that receives build/apply timings and counters.
    #[cfg(feature = "metrics")]
    pub fn set_metrics(&mut self, metrics: MetricsCollector) {
        self.metrics = Some(metrics);
    }

    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn metrics(&self) -> Option<&MetricsCollector> {
        self.metrics.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    #[must_use]
    pub fn encoders(&self) -> &[BagOfWordsEncoder] {
        &self.encoders
    }

    pub fn encoders_mut(&mut self) -> &mut [BagOfWordsEncoder] {
        &mut self.encoders
    }

    /// First output column of each encoder.
    #[must_use]
    pub fn column_bases(&self) -> Vec<usize> {
        let mut base = 0;
        self.encoders
            .iter()
            .map(|e| {
                let b = base;
                base += e.domain_size();
                b
            })
            .collect()
    }

    /// Total output columns across encoders.
    #[must_use]
    pub fn output_columns(&self) -> usize {
        self.encoders.iter().map(BagOfWordsEncoder::domain_size).sum()
    }

    /// Estimate every encoder's domain from a shared row sample.
    pub fn estimate_domains<S: CellSource + ?Sized>(&self, source: &S) -> Vec<DomainEstimate> {
        let est = &self.config.bow.estimator;
        let sample = sample_row_indices(source.num_rows(), est.max_samples, est.sample_seed);
        self.encoders
            .iter()
            .map(|e| e.compute_domain_estimate(source, &sample))
            .collect()
    }

    /// Build every encoder's dictionary as one task graph.
    ///
    /// # Errors
    /// Fails if a configured column is missing from `source` or any build
    /// task fails.
    pub fn build<S: CellSource + ?Sized>(&mut self, source: &S) -> Result<()> {
        self.check_columns(source)?;
        let partitions = self
            .config
            .partitions_for(source.num_rows(), self.scheduler.default_partitions());
        #[cfg(feature = "metrics")]
        let started = Instant::now();

        let columns = self.encoders.len();
        let mut graph = TaskGraph::new();
        for encoder in &mut self.encoders {
            graph.extend(encoder.build_tasks(source, partitions));
        }
        log::debug!(
            "building {columns} columns with {partitions} partitions each ({} tasks)",
            graph.len()
        );
        self.scheduler.run(graph).context("bag-of-words build")?;

        #[cfg(feature = "metrics")]
        if let Some(m) = &self.metrics {
            m.record_duration("bow_build_time", started.elapsed());
            m.increment_counter("bow_build_rows", source.num_rows() as u64);
            m.set_counter("bow_output_columns", self.output_columns() as u64);
            m.set_counter("bow_nnz", self.encoders.iter().map(BagOfWordsEncoder::nnz).sum());
        }
        Ok(())
    }

    /// Encode `source` into a dense matrix.
    ///
    /// # Errors
    /// Fails if any apply task fails.
    pub fn encode_dense<S: CellSource + ?Sized>(&self, source: &S) -> Result<DenseMatrix> {
        self.check_columns(source)?;
        #[cfg(feature = "metrics")]
        let started = Instant::now();

        let bases = self.column_bases();
        let mut out = DenseMatrix::zeros(source.num_rows(), self.output_columns());
        let blocks = out.row_blocks_mut(self.config.rows_per_apply_block);
        self.scheduler
            .for_each(blocks, |mut block| {
                let rows = block.row_range();
                for (encoder, base) in self.encoders.iter().zip(&bases) {
                    encoder.apply_dense(source, &mut block, *base, rows.start, rows.len())?;
                }
                Ok(())
            })
            .context("bag-of-words dense apply")?;

        #[cfg(feature = "metrics")]
        self.record_apply(started, source.num_rows());
        Ok(out)
    }

    /// Encode `source` into a CSR matrix shared by all encoders.
    ///
    /// # Errors
    /// Fails if any apply task fails, including build/apply divergence.
    pub fn encode_sparse<S: CellSource + ?Sized>(&self, source: &S) -> Result<CsrMatrix> {
        self.check_columns(source)?;
        #[cfg(feature = "metrics")]
        let started = Instant::now();

        let rows = source.num_rows();
        for e in &self.encoders {
            ensure!(
                e.nnz_per_row().len() == rows,
                "column {}: built over {} rows but asked to encode {rows}",
                e.column(),
                e.nnz_per_row().len()
            );
        }
        let (row_lengths, offsets) = self.slot_layout(rows);
        let bases = self.column_bases();
        let mut out = CsrMatrix::with_row_lengths(self.output_columns(), &row_lengths);
        let (blocks, zero_rows) = out.row_blocks_mut(self.config.rows_per_apply_block);
        self.scheduler
            .for_each(blocks, |mut block| {
                let range = block.row_range();
                for ((encoder, base), offs) in self.encoders.iter().zip(&bases).zip(&offsets) {
                    encoder.apply_sparse(
                        source,
                        &mut block,
                        *base,
                        range.start,
                        range.len(),
                        SlotReservation::PerRow(offs),
                        zero_rows,
                    )?;
                }
                Ok(())
            })
            .context("bag-of-words sparse apply")?;
        let reconciled = out.reconcile_zero_rows();
        log::debug!("{} rows without tokens in some column", reconciled.len());

        #[cfg(feature = "metrics")]
        self.record_apply(started, rows);
        Ok(out)
    }

    /// Row lengths and, per encoder, the slot offset of each row.
    fn slot_layout(&self, rows: usize) -> (Vec<usize>, Vec<Vec<usize>>) {
        let mut lengths = vec![0usize; rows];
        let mut offsets = Vec::with_capacity(self.encoders.len());
        for encoder in &self.encoders {
            offsets.push(lengths.clone());
            for (len, nnz) in lengths.iter_mut().zip(encoder.nnz_per_row()) {
                *len += *nnz as usize;
            }
        }
        (lengths, offsets)
    }

    /// Metadata table: one column per encoder, one row per token.
    #[must_use]
    pub fn metadata(&self) -> StringFrame {
        let mut meta = StringFrame::new(self.encoders.len());
        for (i, encoder) in self.encoders.iter().enumerate() {
            encoder.write_metadata(&mut meta, i);
        }
        meta
    }

    /// Restore every encoder's dictionary from a [`Self::metadata`] table.
    ///
    /// # Errors
    /// Fails on malformed metadata.
    pub fn load_metadata(&mut self, meta: &StringFrame) -> Result<()> {
        for (i, encoder) in self.encoders.iter_mut().enumerate() {
            encoder.load_metadata(meta, i)?;
        }
        Ok(())
    }

    fn check_columns<S: CellSource + ?Sized>(&self, source: &S) -> Result<()> {
        for e in &self.encoders {
            ensure!(
                e.column() < source.num_columns(),
                "column {} not in input with {} columns",
                e.column(),
                source.num_columns()
            );
        }
        Ok(())
    }

    #[cfg(feature = "metrics")]
    fn record_apply(&self, started: Instant, rows: usize) {
        if let Some(m) = &self.metrics {
            m.record_duration("bow_apply_time", started.elapsed());
            m.increment_counter("bow_apply_rows", rows as u64);
        }
    }
}
