// Matching module - text normalization and pronunciation similarity scoring

pub mod normalize;
pub mod scorer;

pub use normalize::{normalize, normalize_for, Script};
pub use scorer::{classify, score, MatchTier, ScoredMatch, Scorer};
