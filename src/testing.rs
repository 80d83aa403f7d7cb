//! Testing utilities for bag-of-words encoders.
//!
//! - **Fixtures**: [`sample_documents`] and the seeded [`random_documents`]
//!   generator
//! - **Assertions**: [`assert_dense_sparse_agree`],
//!   [`assert_csr_rows_ascending`] and the [`dense_nonzeros`] /
//!   [`csr_nonzeros`] cell listings
//!
//! # Quick Start
//!
//! ```no_run
//! use ironbow::*;
//! use ironbow::testing::*;
//!
//! #[test]
//! fn partitioned_build_matches_sequential() -> anyhow::Result<()> {
//!     let docs = random_documents(500, 40, 8, 3);
//!     let mut config = TransformConfig::default();
//!     config.min_rows_per_partition = 1;
//!     config.build_partitions = Some(7);
//!     let mut t = BagOfWordsTransformer::new(config)?;
//!     t.build(&docs)?;
//!     assert_csr_rows_ascending(&t.encode_sparse(&docs)?);
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;
