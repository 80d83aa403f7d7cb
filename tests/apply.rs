//! Dense and sparse emission for a single encoder.

use anyhow::Result;
use ironbow::emit::sort_by_column;
use ironbow::matrix::ZeroRowRegistry;
use ironbow::testing::*;
use ironbow::*;

fn built_encoder(frame: &StringFrame) -> Result<BagOfWordsEncoder> {
    let mut encoder = BagOfWordsEncoder::new(0, &BowConfig::default())?;
    encoder.build(frame)?;
    Ok(encoder)
}

fn sparse_for(encoder: &BagOfWordsEncoder, base: usize) -> CsrMatrix {
    let lengths: Vec<usize> = encoder.nnz_per_row().iter().map(|n| *n as usize).collect();
    CsrMatrix::with_row_lengths(base + encoder.domain_size(), &lengths)
}

#[test]
fn dense_counts_occurrences() -> Result<()> {
    let docs = sample_documents();
    let encoder = built_encoder(&docs)?;
    let mut out = DenseMatrix::zeros(4, encoder.domain_size());
    encoder.apply_dense(&docs, &mut out.as_rows_mut(), 0, 0, 4)?;

    let id = |t: &str| encoder.dictionary().get(t).map(|id| id as usize);
    let document = id("document").ok_or_else(|| anyhow::anyhow!("no document"))?;
    let second = id("second").ok_or_else(|| anyhow::anyhow!("no second"))?;
    assert_eq!(out.get(1, document), 2.0);
    assert_eq!(out.get(1, second), 1.0);
    assert_eq!(out.get(0, second), 0.0);
    assert_eq!(out.row(2).iter().filter(|v| **v != 0.0).count(), 6);
    Ok(())
}

#[test]
fn dense_respects_output_base_and_block() -> Result<()> {
    let docs = sample_documents();
    let encoder = built_encoder(&docs)?;
    let base = 3;
    let mut out = DenseMatrix::zeros(4, base + encoder.domain_size());
    // only rows 1..3, and the block runs past the end of the source
    encoder.apply_dense(&docs, &mut out.as_rows_mut(), base, 1, 10)?;

    assert!(out.row(0).iter().all(|v| *v == 0.0));
    for r in 1..4 {
        assert!(out.row(r)[..base].iter().all(|v| *v == 0.0));
    }
    assert_eq!(out.get(1, base + 4), 2.0);
    Ok(())
}

#[test]
fn sparse_rows_ascending_and_match_dense() -> Result<()> {
    let docs = random_documents(400, 200, 15, 21);
    let encoder = built_encoder(&docs)?;
    let rows = docs.num_rows();

    let mut dense = DenseMatrix::zeros(rows, encoder.domain_size());
    encoder.apply_dense(&docs, &mut dense.as_rows_mut(), 0, 0, rows)?;

    let mut sparse = sparse_for(&encoder, 0);
    {
        let (mut view, zero_rows) = sparse.as_rows_mut();
        encoder.apply_sparse(
            &docs,
            &mut view,
            0,
            0,
            rows,
            SlotReservation::Fixed(0),
            zero_rows,
        )?;
    }
    sparse.reconcile_zero_rows();

    assert_csr_rows_ascending(&sparse);
    assert_dense_sparse_agree(&dense, &sparse);
    assert_eq!(sparse.nnz() as u64, encoder.nnz());
    Ok(())
}

#[test]
fn sparse_rows_without_tokens_are_registered() -> Result<()> {
    let frame = StringFrame::from_rows(vec![
        vec![Some("alpha".to_string())],
        vec![None],
        vec![Some("42".to_string())],
        vec![Some("beta alpha".to_string())],
    ]);
    let encoder = built_encoder(&frame)?;
    let mut sparse = sparse_for(&encoder, 0);
    {
        let (mut view, zero_rows) = sparse.as_rows_mut();
        encoder.apply_sparse(&frame, &mut view, 0, 0, 4, SlotReservation::Fixed(0), zero_rows)?;
    }
    assert_eq!(sparse.zero_rows(), vec![1, 2]);
    assert_eq!(sparse.reconcile_zero_rows(), vec![1, 2]);
    assert!(sparse.zero_rows().is_empty());
    assert_eq!(sparse.row(1).0.len(), 0);
    assert_eq!(sparse.row(3).0, &[0, 1]);
    Ok(())
}

#[test]
fn sparse_zero_rows_flush_to_custom_sink() -> Result<()> {
    let frame = StringFrame::from_rows(vec![vec![None], vec![Some("x".to_string())], vec![None]]);
    let encoder = built_encoder(&frame)?;
    let mut sparse = sparse_for(&encoder, 0);
    let registry = ZeroRowRegistry::default();
    {
        let (mut view, _) = sparse.as_rows_mut();
        encoder.apply_sparse(&frame, &mut view, 0, 0, 3, SlotReservation::Fixed(0), &registry)?;
    }
    assert_eq!(registry.rows(), vec![0, 2]);
    Ok(())
}

#[test]
fn sparse_detects_build_apply_divergence() -> Result<()> {
    let before = StringFrame::from_column(["red green", "blue"]);
    let encoder = built_encoder(&before)?;
    // same tokens, but row 0 lost one of them
    let after = StringFrame::from_column(["red red", "blue"]);

    let mut sparse = sparse_for(&encoder, 0);
    let (mut view, zero_rows) = sparse.as_rows_mut();
    let err = encoder
        .apply_sparse(&after, &mut view, 0, 0, 2, SlotReservation::Fixed(0), zero_rows)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EncodeError>(),
        Some(EncodeError::BuildApplyDivergence { column: 0, row: 0, built: 2, applied: 1 })
    ));
    Ok(())
}

#[test]
fn unknown_token_is_an_error() -> Result<()> {
    let encoder = built_encoder(&StringFrame::from_column(["red"]))?;
    let changed = StringFrame::from_column(["purple"]);
    let mut dense = DenseMatrix::zeros(1, encoder.domain_size());
    let err = encoder
        .apply_dense(&changed, &mut dense.as_rows_mut(), 0, 0, 1)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EncodeError>(),
        Some(EncodeError::UnknownToken { row: 0, .. })
    ));
    Ok(())
}

#[test]
fn sparse_offset_past_reservation_overflows() -> Result<()> {
    let docs = sample_documents();
    let encoder = built_encoder(&docs)?;
    let mut sparse = sparse_for(&encoder, 0);
    let (mut view, zero_rows) = sparse.as_rows_mut();
    let err = encoder
        .apply_sparse(&docs, &mut view, 0, 0, 4, SlotReservation::Fixed(2), zero_rows)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EncodeError>(),
        Some(EncodeError::SlotOverflow { row: 0, needed: 5, available: 3, .. })
    ));
    Ok(())
}

#[test]
fn sparse_with_per_row_offsets_shares_rows() -> Result<()> {
    let docs = sample_documents();
    let encoder = built_encoder(&docs)?;
    // two copies of the same encoder side by side in one CSR block
    let lengths: Vec<usize> = encoder.nnz_per_row().iter().map(|n| 2 * *n as usize).collect();
    let offsets: Vec<usize> = encoder.nnz_per_row().iter().map(|n| *n as usize).collect();
    let width = encoder.domain_size();
    let mut sparse = CsrMatrix::with_row_lengths(2 * width, &lengths);
    {
        let (mut view, zero_rows) = sparse.as_rows_mut();
        encoder.apply_sparse(&docs, &mut view, 0, 0, 4, SlotReservation::Fixed(0), zero_rows)?;
        encoder.apply_sparse(
            &docs,
            &mut view,
            width,
            0,
            4,
            SlotReservation::PerRow(&offsets),
            zero_rows,
        )?;
    }
    assert_csr_rows_ascending(&sparse);
    for r in 0..4 {
        for c in 0..width {
            assert_eq!(sparse.get(r, c), sparse.get(r, c + width));
        }
    }
    assert_eq!(sparse.nnz(), 42);
    Ok(())
}

#[test]
fn apply_is_repeatable() -> Result<()> {
    let docs = sample_documents();
    let encoder = built_encoder(&docs)?;
    let mut first = DenseMatrix::zeros(4, encoder.domain_size());
    let mut second = DenseMatrix::zeros(4, encoder.domain_size());
    encoder.apply_dense(&docs, &mut first.as_rows_mut(), 0, 0, 4)?;
    encoder.apply_dense(&docs, &mut second.as_rows_mut(), 0, 0, 4)?;
    assert_eq!(dense_nonzeros(&first), dense_nonzeros(&second));
    Ok(())
}

#[test]
fn both_sort_paths_agree() {
    for n in [0, 1, 5, 127, 128, 129, 600] {
        let mut pairs: Vec<(u32, f64)> = (0..n)
            .map(|i| (((i as u64 * 2_654_435_761) % 10_007) as u32, i as f64))
            .collect();
        let mut expected = pairs.clone();
        expected.sort_by_key(|(c, _)| *c);
        sort_by_column(&mut pairs);
        assert_eq!(pairs, expected, "n = {n}");
    }
}

#[test]
fn dense_rows_match_token_occurrences_and_build_counts() -> Result<()> {
    let docs = random_documents(400, 60, 14, 29);
    let encoder = built_encoder(&docs)?;
    let mut out = DenseMatrix::zeros(docs.num_rows(), encoder.domain_size());
    encoder.apply_dense(&docs, &mut out.as_rows_mut(), 0, 0, docs.num_rows())?;

    let tokenizer = encoder.tokenizer();
    for r in 0..docs.num_rows() {
        let occurrences = tokenizer.cell_tokens(docs.cell_str(r, 0)).len();
        let sum: f64 = out.row(r).iter().sum();
        assert_eq!(sum, occurrences as f64, "row {r}");
        let nonzero = out.row(r).iter().filter(|v| **v != 0.0).count();
        assert_eq!(nonzero, encoder.nnz_per_row()[r] as usize, "row {r}");
    }
    Ok(())
}

#[test]
fn dense_output_narrower_than_the_dictionary_is_rejected() -> Result<()> {
    let docs = sample_documents();
    let encoder = built_encoder(&docs)?;
    assert_eq!(encoder.domain_size(), 9);
    let mut out = DenseMatrix::zeros(4, 8);

    // row 2 holds "one", the last assigned id
    let err = encoder
        .apply_dense(&docs, &mut out.as_rows_mut(), 0, 2, 1)
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<EncodeError>(),
        Some(&EncodeError::ColumnOutOfRange {
            column: 0,
            row: 2,
            output_column: 8,
            width: 8,
        })
    );
    assert!(out.row(3).iter().all(|v| *v == 0.0));
    Ok(())
}
