//! Row emission strategies: dense cells or sorted CSR slices.
//!
//! The encoder tokenizes and counts each row once and hands the counts to a
//! [`RowEmitter`]; the two implementations differ only in where the counts
//! land.

use crate::dictionary::{TokenDictionary, TokenId};
use crate::error::EncodeError;
use crate::matrix::{CsrRowsMut, DenseRowsMut, ZeroRowSink};
use crate::tokenizer::TokenCounts;
use anyhow::Result;

/// Pairs at or above this length are sorted with the standard sort.
pub const INSERTION_SORT_THRESHOLD: usize = 128;

/// Read-only encoder state an emitter needs to place a row.
#[derive(Clone, Copy, Debug)]
pub struct EmitContext<'e> {
    pub column: usize,
    pub dictionary: &'e TokenDictionary,
    pub output_base: usize,
    /// Per-row distinct-token counts recorded at build time.
    pub nnz_per_row: &'e [u32],
}

impl EmitContext<'_> {
    fn global_column(&self, row: usize, token: &str) -> Result<u32> {
        let id: TokenId = self
            .dictionary
            .get(token)
            .ok_or_else(|| EncodeError::UnknownToken {
                column: self.column,
                row,
                token: token.to_owned(),
            })?;
        // output_base + id stays below the column limit the layout was sized for
        Ok((self.output_base + id as usize) as u32)
    }
}

/// Destination for per-row token counts.
pub trait RowEmitter {
    /// Place the counts of absolute row `row`. `counts` may be empty.
    fn emit_row(&mut self, ctx: &EmitContext<'_>, row: usize, counts: TokenCounts) -> Result<()>;

    /// Called once after the last row of a block.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes `count` at `(row, output_base + id)` of a dense row block.
pub struct DenseEmitter<'v, 'm> {
    rows: &'v mut DenseRowsMut<'m>,
}

impl<'v, 'm> DenseEmitter<'v, 'm> {
    pub fn new(rows: &'v mut DenseRowsMut<'m>) -> Self {
        Self { rows }
    }
}

impl RowEmitter for DenseEmitter<'_, '_> {
    fn emit_row(&mut self, ctx: &EmitContext<'_>, row: usize, counts: TokenCounts) -> Result<()> {
        for (token, count) in &counts {
            let col = ctx.global_column(row, token)? as usize;
            let width = self.rows.num_cols();
            if col >= width {
                return Err(EncodeError::ColumnOutOfRange {
                    column: ctx.column,
                    row,
                    output_column: col,
                    width,
                }
                .into());
            }
            self.rows.set(row, col, f64::from(*count));
        }
        Ok(())
    }
}

/// Where, inside each CSR row, an encoder's entries begin.
#[derive(Clone, Copy, Debug)]
pub enum SlotReservation<'s> {
    /// Same offset for every row.
    Fixed(usize),
    /// Offset per absolute row index.
    PerRow(&'s [usize]),
}

impl SlotReservation<'_> {
    #[must_use]
    pub fn offset(&self, row: usize) -> usize {
        match self {
            Self::Fixed(offset) => *offset,
            Self::PerRow(offsets) => offsets[row],
        }
    }
}

/// Writes sorted `(column, count)` pairs into reserved CSR slots and
/// reports empty rows to a [`ZeroRowSink`] when the block finishes.
pub struct SparseEmitter<'v, 'm, 's> {
    rows: &'v mut CsrRowsMut<'m>,
    slots: SlotReservation<'s>,
    sink: &'s dyn ZeroRowSink,
    zero_rows: Vec<usize>,
    pairs: Vec<(u32, f64)>,
}

impl<'v, 'm, 's> SparseEmitter<'v, 'm, 's> {
    pub fn new(
        rows: &'v mut CsrRowsMut<'m>,
        slots: SlotReservation<'s>,
        sink: &'s dyn ZeroRowSink,
    ) -> Self {
        Self {
            rows,
            slots,
            sink,
            zero_rows: Vec::new(),
            pairs: Vec::new(),
        }
    }
}

impl RowEmitter for SparseEmitter<'_, '_, '_> {
    fn emit_row(&mut self, ctx: &EmitContext<'_>, row: usize, counts: TokenCounts) -> Result<()> {
        let built = ctx.nnz_per_row.get(row).copied().unwrap_or(0);
        if counts.len() != built as usize {
            return Err(EncodeError::BuildApplyDivergence {
                column: ctx.column,
                row,
                built,
                applied: counts.len(),
            }
            .into());
        }
        if counts.is_empty() {
            self.zero_rows.push(row);
            return Ok(());
        }

        self.pairs.clear();
        for (token, count) in &counts {
            self.pairs
                .push((ctx.global_column(row, token)?, f64::from(*count)));
        }
        sort_by_column(&mut self.pairs);

        let offset = self.slots.offset(row);
        let available = self.rows.row_len(row).saturating_sub(offset);
        if self.pairs.len() > available {
            return Err(EncodeError::SlotOverflow {
                column: ctx.column,
                row,
                needed: self.pairs.len(),
                available,
            }
            .into());
        }
        for (i, (col, value)) in self.pairs.iter().enumerate() {
            self.rows.write(row, offset + i, *col, *value);
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if !self.zero_rows.is_empty() {
            self.sink.add_zero_rows(std::mem::take(&mut self.zero_rows));
        }
        Ok(())
    }
}

/// Sort pairs ascending by column: insertion sort for short rows, the
/// standard stable sort otherwise. Both give the same order.
pub fn sort_by_column(pairs: &mut [(u32, f64)]) {
    if pairs.len() >= INSERTION_SORT_THRESHOLD {
        pairs.sort_by_key(|(col, _)| *col);
    } else {
        insertion_sort(pairs);
    }
}

fn insertion_sort(pairs: &mut [(u32, f64)]) {
    for i in 1..pairs.len() {
        let current = pairs[i];
        let mut j = i;
        while j > 0 && pairs[j - 1].0 > current.0 {
            pairs[j] = pairs[j - 1];
            j -= 1;
        }
        pairs[j] = current;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pseudo_random_pairs(n: usize, seed: u64) -> Vec<(u32, f64)> {
        let mut s = seed;
        (0..n)
            .map(|i| {
                s = s.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
                ((s >> 40) as u32 % 10_000, i as f64)
            })
            .collect()
    }

    #[test]
    fn insertion_and_standard_sort_agree() {
        for n in [0, 1, 2, 17, 127, 128, 500] {
            let pairs = pseudo_random_pairs(n, n as u64 + 3);
            let mut a = pairs.clone();
            let mut b = pairs.clone();
            insertion_sort(&mut a);
            b.sort_by_key(|(c, _)| *c);
            assert_eq!(a, b, "n={n}");
            let mut c = pairs;
            sort_by_column(&mut c);
            assert_eq!(c, b, "n={n}");
        }
    }
}
