// Similarity scorer - rates a spoken fragment against an expected token

use super::normalize::{normalize_for, Script};
use serde::Serialize;

/// Length difference above which only containment is considered
pub const LARGE_GAP_CHARS: usize = 4;

/// Length ratio below which a large-gap containment is a weak match
pub const LARGE_GAP_MIN_RATIO: f64 = 0.6;

/// Which rule produced a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// Identical after normalization
    Exact,
    /// Lengths differ by more than [`LARGE_GAP_CHARS`] but one contains the other
    LengthGapContainment,
    /// Similar lengths and one contains the other
    Containment,
    /// One is a prefix or suffix of the other
    Affix,
    /// Enough index-aligned characters agree
    CharOverlap,
    /// Lengths nearly equal with weaker alignment, score boosted by 0.1
    NearLengthOverlap,
    /// Nothing matched
    NoMatch,
}

/// Score together with the tier that decided it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredMatch {
    /// Similarity in [0.0, 1.0]
    pub score: f64,
    pub tier: MatchTier,
}

impl ScoredMatch {
    const NONE: ScoredMatch = ScoredMatch {
        score: 0.0,
        tier: MatchTier::NoMatch,
    };

    fn new(score: f64, tier: MatchTier) -> Self {
        Self {
            score: score.clamp(0.0, 1.0),
            tier,
        }
    }
}

/// Tiered similarity scorer bound to one practice script
#[derive(Debug, Clone, Copy, Default)]
pub struct Scorer {
    script: Script,
}

impl Scorer {
    pub fn new(script: Script) -> Self {
        Self { script }
    }

    pub fn script(&self) -> Script {
        self.script
    }

    /// Similarity between `spoken` and `expected`, in [0.0, 1.0]
    pub fn score(&self, spoken: &str, expected: &str) -> f64 {
        self.classify(spoken, expected).score
    }

    /// Score `spoken` against `expected`, reporting the deciding tier
    ///
    /// Both inputs are normalized first. Tiers are evaluated in order and the
    /// first one that applies wins. Empty input never matches.
    pub fn classify(&self, spoken: &str, expected: &str) -> ScoredMatch {
        let spoken = normalize_for(spoken, self.script);
        let expected = normalize_for(expected, self.script);
        classify_normalized(&spoken, &expected)
    }
}

/// Score with the default script
pub fn score(spoken: &str, expected: &str) -> f64 {
    Scorer::default().score(spoken, expected)
}

/// Classify with the default script
pub fn classify(spoken: &str, expected: &str) -> ScoredMatch {
    Scorer::default().classify(spoken, expected)
}

fn classify_normalized(a: &str, b: &str) -> ScoredMatch {
    if a.is_empty() || b.is_empty() {
        return ScoredMatch::NONE;
    }

    if a == b {
        return ScoredMatch::new(1.0, MatchTier::Exact);
    }

    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let min_len = a_chars.len().min(b_chars.len());
    let max_len = a_chars.len().max(b_chars.len());
    let length_diff = max_len - min_len;
    let contains = a.contains(b) || b.contains(a);

    if length_diff > LARGE_GAP_CHARS {
        if !contains {
            return ScoredMatch::NONE;
        }
        let length_ratio = min_len as f64 / max_len as f64;
        let score = if length_ratio < LARGE_GAP_MIN_RATIO { 0.2 } else { 0.7 };
        return ScoredMatch::new(score, MatchTier::LengthGapContainment);
    }

    if contains {
        return ScoredMatch::new(0.8, MatchTier::Containment);
    }

    // Any prefix or suffix is also a containment, so this tier only applies
    // if the containment rule above is ever narrowed.
    if length_diff <= 3 && is_affix(a, b) {
        return ScoredMatch::new(0.7, MatchTier::Affix);
    }

    let aligned = a_chars
        .iter()
        .zip(b_chars.iter())
        .filter(|(x, y)| x == y)
        .count();
    let char_sim = aligned as f64 / max_len as f64;

    if length_diff <= 3 && char_sim > 0.4 {
        return ScoredMatch::new(char_sim, MatchTier::CharOverlap);
    }
    if length_diff <= 2 && char_sim > 0.3 {
        return ScoredMatch::new(char_sim + 0.1, MatchTier::NearLengthOverlap);
    }

    ScoredMatch::NONE
}

fn is_affix(a: &str, b: &str) -> bool {
    a.starts_with(b) || b.starts_with(a) || a.ends_with(b) || b.ends_with(a)
}

#[cfg(test)]
#[path = "scorer_test.rs"]
mod tests;
