//! # Ironbow
//!
//! **Bag-of-words column encoding** for tabular data. Every distinct token of
//! a text column becomes an output column; every row holds the occurrence
//! counts of its tokens.
//!
//! ## Key Features
//!
//! - **Deterministic dictionaries** - ids follow first occurrence in row order,
//!   whether the dictionary is built sequentially or in parallel partitions
//! - **Partitioned builds** - partition tasks collect token sets concurrently,
//!   a single merge task assigns ids after all of them finish
//! - **Dense and CSR output** - both emitters share one tokenizer, and CSR rows
//!   are shared between column encoders with per-encoder slot offsets
//! - **Domain estimation** - sample-based distinct-count and footprint estimate
//!   for pre-sizing
//! - **Metadata round trip** - dictionaries persist as `token·id` tables
//! - **I/O integrations** - CSV frames and metadata, gzip and zstd (optional
//!   via feature flags)
//!
//! ## Quick Start
//!
//! ```no_run
//! use ironbow::*;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let docs = StringFrame::from_column([
//!     "This is the first document.",
//!     "This document is the second document.",
//! ]);
//!
//! let mut t = BagOfWordsTransformer::new(TransformConfig::default())?;
//! t.build(&docs)?;
//!
//! let dense = t.encode_dense(&docs)?;
//! let sparse = t.encode_sparse(&docs)?;
//! assert_eq!(dense.cols(), sparse.cols());
//!
//! // "document" occurs twice in row 1
//! let id = t.encoders()[0].dictionary().get("document").unwrap() as usize;
//! assert_eq!(dense.get(1, id), 2.0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Encoder
//!
//! A [`BagOfWordsEncoder`] owns the [`TokenDictionary`] of one input column and
//! the per-row distinct-token counts recorded while building it. Those counts
//! size the sparse output and are checked again during apply: a mismatch means
//! the input changed between the two passes and is reported as
//! [`EncodeError::BuildApplyDivergence`].
//!
//! ### Transformer
//!
//! A [`BagOfWordsTransformer`] lays several encoders out side by side, builds
//! them as one [`TaskGraph`] and applies them block by block.
//!
//! ### Execution Modes
//!
//! [`ExecMode::Sequential`] runs everything on the calling thread;
//! [`ExecMode::Parallel`] runs independent tasks and row blocks on Rayon,
//! optionally in a dedicated pool of `threads` workers.
//!
//! ## Feature Flags
//!
//! - `io-csv` - [`io::csv`] readers and writers
//! - `compression-gzip`, `compression-zstd` - transparent codecs for CSV files
//! - `metrics` - build and apply statistics via [`metrics::MetricsCollector`]

pub mod build;
pub mod config;
pub mod dictionary;
pub mod emit;
pub mod encoder;
pub mod error;
pub mod estimate;
pub mod frame;
pub mod io;
pub mod matrix;
pub mod meta;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod tasks;
pub mod testing;
pub mod tokenizer;
pub mod transform;

// General re-exports
pub use config::{BowConfig, TransformConfig};
pub use dictionary::{TokenDictionary, TokenId};
pub use emit::{RowEmitter, SlotReservation};
pub use encoder::BagOfWordsEncoder;
pub use error::EncodeError;
pub use estimate::{DomainEstimate, EstimatorConfig};
pub use frame::{CellSource, StringFrame};
pub use matrix::{CsrMatrix, DenseMatrix, ZeroRowSink};
pub use tasks::{ExecMode, Scheduler, TaskGraph};
pub use tokenizer::{Tokenizer, tokenize};
pub use transform::BagOfWordsTransformer;

// Gated re-exports
#[cfg(feature = "io-csv")]
pub use io::csv::{read_csv_frame, read_metadata_csv, write_metadata_csv};
