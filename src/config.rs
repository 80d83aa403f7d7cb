//! Encoder and transform configuration.
//!
//! Every type here is plain data with `Default` and serde support, so a
//! transform can be described in a JSON file and loaded with
//! [`TransformConfig::from_json_file`].

use crate::estimate::EstimatorConfig;
use crate::tasks::ExecMode;
use crate::tokenizer::DEFAULT_SEPARATOR;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Per-column bag-of-words settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BowConfig {
    /// Keep letter case instead of ASCII-lowercasing.
    pub case_sensitive: bool,
    /// Regex splitting normalized text into tokens.
    pub separator: String,
    pub estimator: EstimatorConfig,
}

impl Default for BowConfig {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            separator: DEFAULT_SEPARATOR.to_string(),
            estimator: EstimatorConfig::default(),
        }
    }
}

/// Multi-column transform settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Zero-based input columns to encode, in output order.
    pub columns: Vec<usize>,
    pub bow: BowConfig,
    /// Build partitions per column; `None` derives it from the scheduler.
    pub build_partitions: Option<usize>,
    /// Below this many rows per partition the build runs sequentially.
    pub min_rows_per_partition: usize,
    /// Rows per apply task.
    pub rows_per_apply_block: usize,
    pub mode: ExecMode,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            columns: vec![0],
            bow: BowConfig::default(),
            build_partitions: None,
            min_rows_per_partition: 1024,
            rows_per_apply_block: 4096,
            mode: ExecMode::default(),
        }
    }
}

impl TransformConfig {
    /// Read a config from a JSON file; missing fields take their defaults.
    ///
    /// # Errors
    /// Fails if the file cannot be read, is not valid JSON for this type, or
    /// fails [`TransformConfig::validate`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let config: Self = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse transform config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges the encoder relies on.
    ///
    /// # Errors
    /// Fails on an empty or duplicated column list or zero block sizes.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.columns.is_empty(), "no columns to encode");
        let mut sorted = self.columns.clone();
        sorted.sort_unstable();
        sorted.dedup();
        ensure!(
            sorted.len() == self.columns.len(),
            "column list {:?} has duplicates",
            self.columns
        );
        ensure!(self.rows_per_apply_block > 0, "rows_per_apply_block must be positive");
        ensure!(self.build_partitions != Some(0), "build_partitions must be positive");
        Ok(())
    }

    /// Number of build partitions for `num_rows` rows given a default.
    #[must_use]
    pub fn partitions_for(&self, num_rows: usize, default_partitions: usize) -> usize {
        let requested = self.build_partitions.unwrap_or(default_partitions).max(1);
        let by_size = num_rows / self.min_rows_per_partition.max(1);
        requested.min(by_size.max(1))
    }
}
