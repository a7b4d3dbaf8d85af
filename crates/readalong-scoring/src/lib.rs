//! Reading-accuracy scoring.
//!
//! Pipeline: raw story text and raw transcript are normalized into token
//! sequences, then compared position-by-position. Positions that fail an
//! exact match fall back to a per-token Levenshtein similarity check, which
//! absorbs minor transcription noise (homophones, near-misses from
//! speech-to-text). Everything here is pure and synchronous.

pub mod align;
pub mod levenshtein;
pub mod normalize;

pub use align::{score, score_texts, AlignmentReport, Mismatch, SIMILARITY_THRESHOLD};
pub use levenshtein::{distance, similarity};
pub use normalize::{normalize, tokenize};
