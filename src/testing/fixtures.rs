//! Ready-made input frames for encoder tests.

use crate::estimate::SplitMix64;
use crate::frame::StringFrame;

/// The four-document corpus used throughout the docs and tests.
///
/// A sequential build over it yields the dictionary
/// `this is the first document second and third one` (ids 0..=8).
///
/// # Example
///
/// ```
/// use ironbow::frame::CellSource;
/// use ironbow::testing::sample_documents;
///
/// let docs = sample_documents();
/// assert_eq!(docs.num_rows(), 4);
/// ```
#[must_use]
pub fn sample_documents() -> StringFrame {
    StringFrame::from_column([
        "This is the first document.",
        "This document is the second document.",
        "And this is the third one.",
        "Is this the first document?",
    ])
}

/// A deterministic single-column frame of `rows` documents.
///
/// Each document has between zero and `max_words_per_row` words drawn from a
/// vocabulary of `vocabulary` synthetic words (`w0`, `w1`, ... rendered with
/// letters only, so they survive normalization). Roughly one row in sixteen is
/// an absent cell.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn random_documents(
    rows: usize,
    vocabulary: usize,
    max_words_per_row: usize,
    seed: u64,
) -> StringFrame {
    let vocabulary = vocabulary.max(1) as u64;
    let mut rng = SplitMix64::new(seed);
    let mut frame = StringFrame::new(1);
    for _ in 0..rows {
        if rng.next_u64() % 16 == 0 {
            frame.push_row(vec![None]);
            continue;
        }
        let words = (rng.next_u64() % (max_words_per_row as u64 + 1)) as usize;
        let text = (0..words)
            .map(|_| synthetic_word(rng.next_u64() % vocabulary))
            .collect::<Vec<_>>()
            .join(" ");
        frame.push_row(vec![Some(text)]);
    }
    frame
}

/// Base-26 letter spelling of `n` (`0 -> "a"`, `26 -> "ba"`).
#[allow(clippy::cast_possible_truncation)]
fn synthetic_word(mut n: u64) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'a' + (n % 26) as u8);
        n /= 26;
        if n == 0 {
            break;
        }
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}
