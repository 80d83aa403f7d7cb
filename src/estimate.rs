//! Sample-based domain-size estimation.
//!
//! The estimate tokenizes a bounded sample of rows, builds a frequency
//! histogram of the sampled tokens and extrapolates the number of distinct
//! tokens (and the dictionary's key footprint) for the whole column. It only
//! pre-sizes downstream storage; nothing depends on it being exact, and the
//! margins bias it high rather than low.

use crate::frame::CellSource;
use crate::tokenizer::Tokenizer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tunable constants of the estimator. The margins are empirical.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Upper bound on sampled rows.
    pub max_samples: usize,
    /// Inflation of the extrapolated total token count (rare tokens are
    /// under-represented in the sample).
    pub occurrence_margin: f64,
    /// Inflation of the extrapolated distinct count and footprint.
    pub footprint_margin: f64,
    /// Approximate fixed cost of one dictionary key.
    pub key_overhead_bytes: u64,
    /// Approximate cost per key character.
    pub bytes_per_char: u64,
    /// Seed for [`sample_row_indices`].
    pub sample_seed: u64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            max_samples: 1600,
            occurrence_margin: 1.25,
            footprint_margin: 1.15,
            key_overhead_bytes: 16,
            bytes_per_char: 2,
            sample_seed: 7,
        }
    }
}

/// Advisory size of a column's token dictionary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEstimate {
    pub distinct_tokens: u64,
    pub byte_footprint: u64,
}

/// Estimate the dictionary size of `column` from the first
/// `min(max_samples, sample_rows.len())` sampled rows.
///
/// Absent cells contribute no tokens.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn estimate_domain<S: CellSource + ?Sized>(
    source: &S,
    column: usize,
    tokenizer: &Tokenizer,
    sample_rows: &[usize],
    config: &EstimatorConfig,
) -> DomainEstimate {
    let sampled = &sample_rows[..config.max_samples.min(sample_rows.len())];
    if sampled.is_empty() {
        return DomainEstimate::default();
    }

    let mut frequencies: HashMap<String, u64> = HashMap::new();
    let mut key_bytes = 0u64;
    let mut sample_tokens = 0u64;
    for &row in sampled {
        for token in tokenizer.cell_tokens(source.cell_str(row, column)) {
            sample_tokens += 1;
            let chars = token.chars().count() as u64;
            let freq = frequencies.entry(token).or_insert(0);
            if *freq == 0 {
                key_bytes += chars * config.bytes_per_char + config.key_overhead_bytes;
            }
            *freq += 1;
        }
    }
    if sample_tokens == 0 {
        log::warn!("column {column}: no tokens in {} sampled rows", sampled.len());
        return DomainEstimate::default();
    }

    let avg_tokens_per_row =
        sample_tokens as f64 / sampled.len() as f64 * config.occurrence_margin;
    let population_tokens = avg_tokens_per_row * source.num_rows() as f64;

    let histogram = frequency_histogram(frequencies.values().copied());
    let distinct = extrapolate_distinct(&histogram, sample_tokens, population_tokens);
    let bytes_per_key = key_bytes as f64 / frequencies.len() as f64;

    let estimate = DomainEstimate {
        distinct_tokens: (distinct * config.footprint_margin).ceil() as u64,
        byte_footprint: (distinct * bytes_per_key * config.footprint_margin).ceil() as u64,
    };
    log::debug!(
        "column {column}: {} sampled rows, {} distinct of {sample_tokens} tokens -> {estimate:?}",
        sampled.len(),
        frequencies.len()
    );
    estimate
}

/// Frequency-of-frequencies: `h[j]` is the number of tokens seen exactly
/// `j` times (`h[0]` unused).
#[must_use]
pub fn frequency_histogram(frequencies: impl IntoIterator<Item = u64>) -> Vec<u64> {
    let mut histogram = vec![0u64];
    for f in frequencies {
        let f = usize::try_from(f).unwrap_or(usize::MAX);
        if f >= histogram.len() {
            histogram.resize(f + 1, 0);
        }
        histogram[f] += 1;
    }
    histogram
}

/// Guaranteed-Error Estimator of the population distinct count:
/// `sqrt(N / n) * f1 + sum_{j >= 2} f_j`, clamped to `[d, N]`.
///
/// `sample_size` is `n`, `population_size` is `N`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn extrapolate_distinct(histogram: &[u64], sample_size: u64, population_size: f64) -> f64 {
    let observed: u64 = histogram.iter().skip(1).sum();
    if sample_size == 0 || observed == 0 {
        return 0.0;
    }
    let singletons = histogram.get(1).copied().unwrap_or(0) as f64;
    let repeated = (observed as f64) - singletons;
    let scale = (population_size / sample_size as f64).max(1.0).sqrt();
    let estimate = scale * singletons + repeated;
    estimate.clamp(observed as f64, population_size.max(observed as f64))
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub(crate) const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    #[inline]
    pub(crate) const fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

/// Pick up to `max_samples` distinct row indexes out of `num_rows`,
/// deterministically for a given `seed`, sorted ascending.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn sample_row_indices(num_rows: usize, max_samples: usize, seed: u64) -> Vec<usize> {
    if max_samples >= num_rows {
        return (0..num_rows).collect();
    }
    // Partial Fisher-Yates over a sparse permutation.
    let mut rng = SplitMix64::new(seed);
    let mut swapped: HashMap<usize, usize> = HashMap::with_capacity(max_samples * 2);
    let mut out = Vec::with_capacity(max_samples);
    for i in 0..max_samples {
        let j = i + (rng.next_u64() % (num_rows - i) as u64) as usize;
        let at_j = swapped.get(&j).copied().unwrap_or(j);
        let at_i = swapped.get(&i).copied().unwrap_or(i);
        swapped.insert(j, at_i);
        out.push(at_j);
    }
    out.sort_unstable();
    out
}
