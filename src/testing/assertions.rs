//! Assertions over encoder outputs.

use crate::matrix::{CsrMatrix, DenseMatrix};

/// Non-zero cells of a dense matrix as `(row, col, value)`, row-major.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn dense_nonzeros(m: &DenseMatrix) -> Vec<(usize, u32, f64)> {
    let mut out = Vec::new();
    for r in 0..m.rows() {
        for (c, v) in m.row(r).iter().enumerate() {
            if *v != 0.0 {
                out.push((r, c as u32, *v));
            }
        }
    }
    out
}

/// Stored cells of a CSR matrix as `(row, col, value)`, in storage order.
#[must_use]
pub fn csr_nonzeros(m: &CsrMatrix) -> Vec<(usize, u32, f64)> {
    let mut out = Vec::new();
    for r in 0..m.rows() {
        let (cols, values) = m.row(r);
        out.extend(cols.iter().zip(values).map(|(c, v)| (r, *c, *v)));
    }
    out
}

/// Assert that a dense and a sparse encoding hold the same cells.
///
/// # Panics
///
/// Panics if the shapes differ or any cell differs.
///
/// # Example
///
/// ```no_run
/// use ironbow::*;
/// use ironbow::testing::*;
///
/// # fn main() -> anyhow::Result<()> {
/// let docs = sample_documents();
/// let mut t = BagOfWordsTransformer::new(TransformConfig::default())?;
/// t.build(&docs)?;
/// assert_dense_sparse_agree(&t.encode_dense(&docs)?, &t.encode_sparse(&docs)?);
/// # Ok(())
/// # }
/// ```
pub fn assert_dense_sparse_agree(dense: &DenseMatrix, sparse: &CsrMatrix) {
    assert_eq!(
        (dense.rows(), dense.cols()),
        (sparse.rows(), sparse.cols()),
        "Shape mismatch between dense and sparse outputs"
    );
    let mut sparse_cells = csr_nonzeros(sparse);
    sparse_cells.sort_by_key(|(r, c, _)| (*r, *c));
    let dense_cells = dense_nonzeros(dense);
    assert_eq!(
        dense_cells.len(),
        sparse_cells.len(),
        "Non-zero count mismatch:\n  Dense: {dense_cells:?}\n  Sparse: {sparse_cells:?}"
    );
    for (d, s) in dense_cells.iter().zip(&sparse_cells) {
        assert_eq!(d, s, "Cell mismatch:\n  Dense: {d:?}\n  Sparse: {s:?}");
    }
}

/// Assert that every CSR row lists strictly ascending column indexes.
///
/// # Panics
///
/// Panics on the first row whose indexes are not strictly ascending.
pub fn assert_csr_rows_ascending(m: &CsrMatrix) {
    for r in 0..m.rows() {
        let (cols, _) = m.row(r);
        assert!(
            cols.windows(2).all(|w| w[0] < w[1]),
            "Row {r} columns not strictly ascending: {cols:?}"
        );
    }
}
