//! Transform configuration.

use anyhow::Result;
use ironbow::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn defaults() {
    let config = TransformConfig::default();
    assert_eq!(config.columns, vec![0]);
    assert!(!config.bow.case_sensitive);
    assert_eq!(config.bow.separator, r"\s+");
    assert_eq!(config.bow.estimator.max_samples, 1600);
    assert_eq!(config.mode, ExecMode::Parallel { threads: None });
    assert!(config.validate().is_ok());
}

#[test]
fn partial_json_takes_defaults() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("bow.json");
    fs::write(
        &path,
        r#"{
            "columns": [2, 0],
            "bow": { "case_sensitive": true },
            "build_partitions": 4,
            "mode": "Sequential"
        }"#,
    )?;

    let config = TransformConfig::from_json_file(&path)?;
    assert_eq!(config.columns, vec![2, 0]);
    assert!(config.bow.case_sensitive);
    assert_eq!(config.bow.separator, r"\s+");
    assert_eq!(config.build_partitions, Some(4));
    assert_eq!(config.mode, ExecMode::Sequential);
    assert_eq!(config.rows_per_apply_block, 4096);
    Ok(())
}

#[test]
fn parallel_mode_with_threads_from_json() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("bow.json");
    fs::write(&path, r#"{ "mode": { "Parallel": { "threads": 2 } } }"#)?;
    let config = TransformConfig::from_json_file(&path)?;
    assert_eq!(config.mode, ExecMode::Parallel { threads: Some(2) });
    Ok(())
}

#[test]
fn invalid_json_config_is_rejected() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("bad.json");
    fs::write(&path, r#"{ "columns": [] }"#)?;
    assert!(TransformConfig::from_json_file(&path).is_err());
    assert!(TransformConfig::from_json_file(dir.path().join("missing.json")).is_err());
    Ok(())
}

#[test]
fn partition_count_is_bounded_by_rows() {
    let config = TransformConfig {
        build_partitions: Some(8),
        min_rows_per_partition: 100,
        ..TransformConfig::default()
    };
    assert_eq!(config.partitions_for(50, 16), 1);
    assert_eq!(config.partitions_for(350, 16), 3);
    assert_eq!(config.partitions_for(10_000, 16), 8);

    let derived = TransformConfig {
        min_rows_per_partition: 1,
        ..TransformConfig::default()
    };
    assert_eq!(derived.partitions_for(10_000, 16), 16);
}

#[test]
fn case_sensitive_config_reaches_the_encoder() -> Result<()> {
    let config = TransformConfig {
        bow: BowConfig {
            case_sensitive: true,
            ..BowConfig::default()
        },
        ..TransformConfig::default()
    };
    let docs = StringFrame::from_column(["Word word WORD"]);
    let mut t = BagOfWordsTransformer::new(config)?;
    t.build(&docs)?;
    assert_eq!(t.output_columns(), 3);
    Ok(())
}
