use serde::{Deserialize, Serialize};

use crate::levenshtein;
use crate::normalize;

/// Minimum per-token similarity ratio still counted as a correct read.
/// Compared against unrounded arithmetic.
pub const SIMILARITY_THRESHOLD: f64 = 0.70;

/// A reference position where the spoken token failed both the exact match
/// and the similarity threshold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    pub position: usize,
    pub expected: String,
    pub spoken: String,
}

/// Aggregate result of scoring one transcript against one reference text.
///
/// Invariant: `correct_words + mistakes == max(reference len, hypothesis len)`.
/// `accuracy` is unrounded; round at the transport/persistence edge with
/// [`round2`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlignmentReport {
    pub total_words: usize,
    pub correct_words: usize,
    pub mistakes: usize,
    pub accuracy: f64,
    pub mismatches: Vec<Mismatch>,
}

/// Score a hypothesis token sequence against a reference token sequence.
///
/// Tokens are compared strictly by position; out-of-range positions read as
/// the empty string. This assumes the reader neither skips nor inserts whole
/// words; a skipped word shifts everything after it.
pub fn score(reference: &[String], hypothesis: &[String]) -> AlignmentReport {
    let max_len = reference.len().max(hypothesis.len());

    let mut correct_words = 0;
    let mut mismatches = Vec::new();

    for i in 0..max_len {
        let expected = reference.get(i).map_or("", String::as_str);
        let spoken = hypothesis.get(i).map_or("", String::as_str);

        if expected == spoken
            || levenshtein::similarity(expected, spoken) >= SIMILARITY_THRESHOLD
        {
            correct_words += 1;
        } else {
            mismatches.push(Mismatch {
                position: i,
                expected: expected.to_owned(),
                spoken: spoken.to_owned(),
            });
        }
    }

    let total_words = reference.len();
    let accuracy = if total_words > 0 {
        correct_words as f64 / total_words as f64 * 100.0
    } else {
        0.0
    };

    AlignmentReport {
        total_words,
        correct_words,
        mistakes: mismatches.len(),
        accuracy,
        mismatches,
    }
}

/// Normalize both raw texts and score them.
pub fn score_texts(reference_text: &str, spoken_text: &str) -> AlignmentReport {
    let reference = normalize::tokenize(reference_text);
    let hypothesis = normalize::tokenize(spoken_text);
    score(&reference, &hypothesis)
}

/// Round to two decimal places for display and storage.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
