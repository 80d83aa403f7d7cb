//! Output stores: a row-major dense matrix and a shared CSR block.
//!
//! Both hand out disjoint mutable row-block views so apply tasks can run in
//! parallel without locks. The CSR block is pre-allocated from per-row slot
//! lengths; encoders write into caller-reserved sub-ranges of each row.

use std::ops::Range;
use std::sync::Mutex;

/// Column index stored in slots nobody has written yet.
pub const UNSET_COLUMN: u32 = u32::MAX;

/// Row-major dense `f64` matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl DenseMatrix {
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            values: vec![0.0; rows * cols],
        }
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.values[row * self.cols + col] = value;
    }

    #[must_use]
    pub fn row(&self, row: usize) -> &[f64] {
        &self.values[row * self.cols..(row + 1) * self.cols]
    }

    /// View over every row.
    pub fn as_rows_mut(&mut self) -> DenseRowsMut<'_> {
        DenseRowsMut {
            start_row: 0,
            cols: self.cols,
            values: &mut self.values,
        }
    }

    /// Split into disjoint views of at most `rows_per_block` rows each.
    pub fn row_blocks_mut(&mut self, rows_per_block: usize) -> Vec<DenseRowsMut<'_>> {
        let cols = self.cols;
        if cols == 0 {
            return Vec::new();
        }
        let rows_per_block = rows_per_block.max(1);
        self.values
            .chunks_mut(rows_per_block * cols)
            .enumerate()
            .map(|(i, values)| DenseRowsMut {
                start_row: i * rows_per_block,
                cols,
                values,
            })
            .collect()
    }
}

/// Mutable view over a contiguous range of dense rows, addressed by absolute
/// row index.
#[derive(Debug)]
pub struct DenseRowsMut<'m> {
    start_row: usize,
    cols: usize,
    values: &'m mut [f64],
}

impl DenseRowsMut<'_> {
    #[must_use]
    pub fn start_row(&self) -> usize {
        self.start_row
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        if self.cols == 0 {
            0
        } else {
            self.values.len() / self.cols
        }
    }

    /// Absolute row range covered by this view.
    #[must_use]
    pub fn row_range(&self) -> Range<usize> {
        self.start_row..self.start_row + self.num_rows()
    }

    #[must_use]
    pub fn num_cols(&self) -> usize {
        self.cols
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        let local = row - self.start_row;
        self.values[local * self.cols + col] = value;
    }
}

/// Receives rows for which an encoder contributed no entries.
pub trait ZeroRowSink: Sync {
    fn add_zero_rows(&self, rows: Vec<usize>);
}

/// Mutex-guarded list of zero-contribution rows, filled from many tasks.
#[derive(Debug, Default)]
pub struct ZeroRowRegistry {
    rows: Mutex<Vec<usize>>,
}

impl ZeroRowRegistry {
    /// Registered rows, sorted and deduplicated.
    #[must_use]
    pub fn rows(&self) -> Vec<usize> {
        let mut rows = self.rows.lock().unwrap().clone();
        rows.sort_unstable();
        rows.dedup();
        rows
    }

    fn take(&mut self) -> Vec<usize> {
        let mut rows = std::mem::take(self.rows.get_mut().unwrap());
        rows.sort_unstable();
        rows.dedup();
        rows
    }
}

impl ZeroRowSink for ZeroRowRegistry {
    fn add_zero_rows(&self, rows: Vec<usize>) {
        self.rows.lock().unwrap().extend(rows);
    }
}

/// Compressed sparse row block shared by every encoder of a transform.
///
/// Row `r` owns slots `row_ptr[r]..row_ptr[r + 1]`; each encoder writes its
/// entries, sorted by column, into its own reserved sub-range.
#[derive(Debug)]
pub struct CsrMatrix {
    rows: usize,
    cols: usize,
    row_ptr: Vec<usize>,
    indexes: Vec<u32>,
    values: Vec<f64>,
    zero_rows: ZeroRowRegistry,
}

impl CsrMatrix {
    /// Allocate `row_lengths[r]` unset slots for every row `r`.
    #[must_use]
    pub fn with_row_lengths(cols: usize, row_lengths: &[usize]) -> Self {
        let mut row_ptr = Vec::with_capacity(row_lengths.len() + 1);
        row_ptr.push(0);
        let mut total = 0usize;
        for len in row_lengths {
            total += len;
            row_ptr.push(total);
        }
        Self {
            rows: row_lengths.len(),
            cols,
            row_ptr,
            indexes: vec![UNSET_COLUMN; total],
            values: vec![0.0; total],
            zero_rows: ZeroRowRegistry::default(),
        }
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[must_use]
    pub fn row_pointers(&self) -> &[usize] {
        &self.row_ptr
    }

    /// Column indexes and values of row `r`, unset slots included.
    #[must_use]
    pub fn row(&self, r: usize) -> (&[u32], &[f64]) {
        let span = self.row_ptr[r]..self.row_ptr[r + 1];
        (&self.indexes[span.clone()], &self.values[span])
    }

    /// Value at `(row, col)`, zero when absent.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let (idx, vals) = self.row(row);
        idx.iter()
            .position(|c| *c as usize == col)
            .map_or(0.0, |i| vals[i])
    }

    /// Number of written slots.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.indexes.iter().filter(|c| **c != UNSET_COLUMN).count()
    }

    /// Rows registered as zero-contribution and not yet reconciled.
    #[must_use]
    pub fn zero_rows(&self) -> Vec<usize> {
        self.zero_rows.rows()
    }

    /// View over every row plus the zero-row registry.
    pub fn as_rows_mut(&mut self) -> (CsrRowsMut<'_>, &ZeroRowRegistry) {
        let view = CsrRowsMut {
            start_row: 0,
            row_ptr: &self.row_ptr,
            indexes: &mut self.indexes,
            values: &mut self.values,
        };
        (view, &self.zero_rows)
    }

    /// Split into disjoint views of at most `rows_per_block` rows each.
    pub fn row_blocks_mut(
        &mut self,
        rows_per_block: usize,
    ) -> (Vec<CsrRowsMut<'_>>, &ZeroRowRegistry) {
        let rows_per_block = rows_per_block.max(1);
        let mut blocks = Vec::with_capacity(self.rows.div_ceil(rows_per_block));
        let mut indexes: &mut [u32] = &mut self.indexes;
        let mut values: &mut [f64] = &mut self.values;
        let mut start = 0;
        while start < self.rows {
            let end = (start + rows_per_block).min(self.rows);
            let len = self.row_ptr[end] - self.row_ptr[start];
            let (idx_head, idx_tail) = std::mem::take(&mut indexes).split_at_mut(len);
            let (val_head, val_tail) = std::mem::take(&mut values).split_at_mut(len);
            indexes = idx_tail;
            values = val_tail;
            blocks.push(CsrRowsMut {
                start_row: start,
                row_ptr: &self.row_ptr[start..=end],
                indexes: idx_head,
                values: val_head,
            });
            start = end;
        }
        (blocks, &self.zero_rows)
    }

    /// Drop unset slots from every registered zero row and rebuild the row
    /// pointers. Returns the rows that were reconciled.
    pub fn reconcile_zero_rows(&mut self) -> Vec<usize> {
        let rows = self.zero_rows.take();
        if rows.is_empty() {
            return rows;
        }
        let mut pending = rows.iter().copied().peekable();
        let mut row_ptr = Vec::with_capacity(self.row_ptr.len());
        let mut indexes = Vec::with_capacity(self.indexes.len());
        let mut values = Vec::with_capacity(self.values.len());
        row_ptr.push(0);
        for r in 0..self.rows {
            let span = self.row_ptr[r]..self.row_ptr[r + 1];
            let compact = pending.next_if_eq(&r).is_some();
            for i in span {
                if compact && self.indexes[i] == UNSET_COLUMN {
                    continue;
                }
                indexes.push(self.indexes[i]);
                values.push(self.values[i]);
            }
            row_ptr.push(indexes.len());
        }
        self.row_ptr = row_ptr;
        self.indexes = indexes;
        self.values = values;
        rows
    }
}

/// Mutable view over a contiguous range of CSR rows.
#[derive(Debug)]
pub struct CsrRowsMut<'m> {
    start_row: usize,
    row_ptr: &'m [usize],
    indexes: &'m mut [u32],
    values: &'m mut [f64],
}

impl CsrRowsMut<'_> {
    #[must_use]
    pub fn start_row(&self) -> usize {
        self.start_row
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.row_ptr.len().saturating_sub(1)
    }

    /// Absolute row range covered by this view.
    #[must_use]
    pub fn row_range(&self) -> Range<usize> {
        self.start_row..self.start_row + self.num_rows()
    }

    /// Number of slots allocated to absolute row `row`.
    #[must_use]
    pub fn row_len(&self, row: usize) -> usize {
        let local = row - self.start_row;
        self.row_ptr[local + 1] - self.row_ptr[local]
    }

    /// Write `(col, value)` into slot `slot` of absolute row `row`.
    pub fn write(&mut self, row: usize, slot: usize, col: u32, value: f64) {
        let local = row - self.start_row;
        let pos = self.row_ptr[local] - self.row_ptr[0] + slot;
        self.indexes[pos] = col;
        self.values[pos] = value;
    }
}
