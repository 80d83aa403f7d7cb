//! Sequential and partitioned dictionary builds.

use anyhow::Result;
use ironbow::build::{PartitionResults, block_ranges, block_sizes, build_partition};
use ironbow::testing::{random_documents, sample_documents};
use ironbow::*;

const SAMPLE_ORDER: [&str; 9] = [
    "this", "is", "the", "first", "document", "second", "and", "third", "one",
];

fn tokens_by_id(encoder: &BagOfWordsEncoder) -> Vec<String> {
    encoder
        .dictionary()
        .entries_by_id()
        .into_iter()
        .map(|(token, _)| token.to_owned())
        .collect()
}

fn build_with_partitions(frame: &StringFrame, partitions: usize) -> Result<BagOfWordsEncoder> {
    let mut encoder = BagOfWordsEncoder::new(0, &BowConfig::default())?;
    let graph = encoder.build_tasks(frame, partitions);
    Scheduler::default().run(graph)?;
    Ok(encoder)
}

#[test]
fn sequential_build_assigns_first_occurrence_ids() -> Result<()> {
    let docs = sample_documents();
    let mut encoder = BagOfWordsEncoder::new(0, &BowConfig::default())?;
    encoder.build(&docs)?;

    assert_eq!(encoder.domain_size(), 9);
    assert_eq!(tokens_by_id(&encoder), SAMPLE_ORDER);
    assert_eq!(encoder.nnz_per_row(), &[5, 5, 6, 5]);
    assert_eq!(encoder.nnz(), 21);
    Ok(())
}

#[test]
fn ids_are_dense_and_unique() -> Result<()> {
    let docs = random_documents(300, 120, 10, 5);
    let mut encoder = BagOfWordsEncoder::new(0, &BowConfig::default())?;
    encoder.build(&docs)?;

    let mut ids: Vec<TokenId> = encoder.dictionary().iter().map(|(_, id)| id).collect();
    ids.sort_unstable();
    let expected: Vec<TokenId> = (0..encoder.domain_size() as TokenId).collect();
    assert_eq!(ids, expected);
    Ok(())
}

#[test]
fn partitioned_build_matches_sequential_for_every_partition_count() -> Result<()> {
    let docs = sample_documents();
    let mut sequential = BagOfWordsEncoder::new(0, &BowConfig::default())?;
    sequential.build(&docs)?;

    for partitions in 1..=6 {
        let partitioned = build_with_partitions(&docs, partitions)?;
        assert_eq!(
            tokens_by_id(&partitioned),
            tokens_by_id(&sequential),
            "partitions = {partitions}"
        );
        assert_eq!(partitioned.nnz_per_row(), sequential.nnz_per_row());
        assert_eq!(partitioned.nnz(), sequential.nnz());
    }
    Ok(())
}

#[test]
fn partitioned_build_is_deterministic_on_larger_input() -> Result<()> {
    let docs = random_documents(2_000, 400, 12, 99);
    let mut sequential = BagOfWordsEncoder::new(0, &BowConfig::default())?;
    sequential.build(&docs)?;

    for partitions in [2, 3, 7, 16, 64] {
        for _ in 0..3 {
            let partitioned = build_with_partitions(&docs, partitions)?;
            assert_eq!(tokens_by_id(&partitioned), tokens_by_id(&sequential));
            assert_eq!(partitioned.nnz_per_row(), sequential.nnz_per_row());
        }
    }
    Ok(())
}

#[test]
fn partitioned_build_on_sequential_scheduler() -> Result<()> {
    let docs = random_documents(200, 50, 6, 1);
    let mut encoder = BagOfWordsEncoder::new(0, &BowConfig::default())?;
    let graph = encoder.build_tasks(&docs, 4);
    assert_eq!(graph.len(), 5);
    Scheduler::sequential().run(graph)?;

    let mut sequential = BagOfWordsEncoder::new(0, &BowConfig::default())?;
    sequential.build(&docs)?;
    assert_eq!(tokens_by_id(&encoder), tokens_by_id(&sequential));
    Ok(())
}

#[test]
fn build_of_empty_source() -> Result<()> {
    let empty = StringFrame::new(1);
    let mut encoder = BagOfWordsEncoder::new(0, &BowConfig::default())?;
    encoder.build(&empty)?;
    assert_eq!(encoder.domain_size(), 0);
    assert!(encoder.nnz_per_row().is_empty());

    let partitioned = build_with_partitions(&empty, 8)?;
    assert_eq!(partitioned.domain_size(), 0);
    Ok(())
}

#[test]
fn absent_and_empty_cells_count_zero() -> Result<()> {
    let frame = StringFrame::from_rows(vec![
        vec![Some("alpha beta".to_string())],
        vec![None],
        vec![Some("123 !!".to_string())],
        vec![Some("beta".to_string())],
    ]);
    let mut encoder = BagOfWordsEncoder::new(0, &BowConfig::default())?;
    encoder.build(&frame)?;
    assert_eq!(encoder.nnz_per_row(), &[2, 0, 0, 1]);
    assert_eq!(encoder.domain_size(), 2);
    Ok(())
}

#[test]
fn overflow_names_the_column() -> Result<()> {
    let frame = StringFrame::from_rows(vec![vec![None, Some("one two three".to_string())]]);
    let mut encoder = BagOfWordsEncoder::new(1, &BowConfig::default())?.with_dictionary_limit(2);
    let err = encoder.build(&frame).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<EncodeError>(),
        Some(EncodeError::DictionaryOverflow { column: 1, limit: 2 })
    ));
    assert!(err.to_string().contains("column 1"));
    Ok(())
}

#[test]
fn overflow_in_merge_fails_the_graph() -> Result<()> {
    let docs = sample_documents();
    let mut encoder = BagOfWordsEncoder::new(0, &BowConfig::default())?.with_dictionary_limit(4);
    let graph = encoder.build_tasks(&docs, 3);
    let err = Scheduler::default().run(graph).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EncodeError>(),
        Some(EncodeError::DictionaryOverflow { column: 0, .. })
    ));
    Ok(())
}

#[test]
fn block_sizes_cover_all_rows() {
    assert_eq!(block_sizes(10, 3), vec![4, 3, 3]);
    assert_eq!(block_sizes(2, 5), vec![1, 1]);
    assert_eq!(block_sizes(0, 4), vec![0]);
    assert_eq!(block_sizes(7, 0), vec![7]);
    assert_eq!(block_ranges(&[4, 3, 3]), vec![0..4, 4..7, 7..10]);
}

#[test]
fn partition_results_are_write_once_and_ordered() -> Result<()> {
    let docs = sample_documents();
    let tokenizer = Tokenizer::default();
    let results = PartitionResults::new(0);

    // insert out of order; drain returns ascending start rows
    results.insert(build_partition(&docs, 0, &tokenizer, 2, 2))?;
    results.insert(build_partition(&docs, 0, &tokenizer, 0, 2))?;
    let dup = results.insert(build_partition(&docs, 0, &tokenizer, 0, 2));
    assert!(matches!(
        dup.unwrap_err().downcast_ref::<EncodeError>(),
        Some(EncodeError::PartitionConflict { start_row: 0, .. })
    ));

    let missing = results.drain_ordered(3).unwrap_err();
    assert!(matches!(
        missing.downcast_ref::<EncodeError>(),
        Some(EncodeError::MissingPartitions { expected: 3, found: 2, .. })
    ));

    let partials = results.drain_ordered(2)?;
    assert_eq!(partials[0].start_row, 0);
    assert_eq!(partials[1].start_row, 2);
    assert_eq!(partials[1].tokens, vec!["and", "this", "is", "the", "third", "one", "first", "document"]);
    assert_eq!(partials[1].nnz_per_row, vec![6, 5]);
    Ok(())
}

#[test]
fn build_partition_clips_to_source() {
    let docs = sample_documents();
    let partial = build_partition(&docs, 0, &Tokenizer::default(), 3, 10);
    assert_eq!(partial.nnz_per_row, vec![5]);
    assert_eq!(partial.nnz, 5);
}
