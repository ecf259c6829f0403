// Single-target progression for word-at-a-time drills
// The caller supplies each target; this machine only decides correct/incorrect

use super::state::{ScoreTally, TokenResult, TokenResults};
use crate::matching::{ScoredMatch, Scorer};
use crate::{debug, trace};

/// Default acceptance threshold for isolated word drills (strict `>`)
pub const DEFAULT_SINGLE_TARGET_THRESHOLD: f64 = 0.2;

/// What a transcript did to the current target
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SingleOutcome {
    /// Dropped: no target, or the target was already accepted
    Ignored,
    /// Target accepted; the caller may advance
    Accepted { index: usize, matched: ScoredMatch },
    /// Final transcript did not match; the same target stays current
    Rejected { index: usize, matched: ScoredMatch },
    /// Interim transcript below threshold, no decision yet
    Undecided { matched: ScoredMatch },
}

/// Progression machine holding exactly one current target
#[derive(Debug, Clone)]
pub struct SingleTargetMachine {
    scorer: Scorer,
    threshold: f64,
    target: Option<String>,
    index: usize,
    results: TokenResults,
    tally: ScoreTally,
    /// Set once the current target is accepted, cleared when re-armed
    is_processing: bool,
}

impl SingleTargetMachine {
    pub fn new(scorer: Scorer, threshold: f64) -> Self {
        Self {
            scorer,
            threshold,
            target: None,
            index: 0,
            results: TokenResults::new(),
            tally: ScoreTally::default(),
            is_processing: false,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn results(&self) -> &TokenResults {
        &self.results
    }

    pub fn current_result(&self) -> TokenResult {
        self.results.get(&self.index).copied().unwrap_or_default()
    }

    pub fn tally(&self) -> ScoreTally {
        self.tally
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    /// Make `token` the current target
    ///
    /// The first call sets target 0. Later calls move past the current
    /// target; a target left `Incorrect` is counted in the tally at that
    /// point, one left `Pending` is not counted.
    pub fn advance_to(&mut self, token: impl Into<String>) {
        let token = token.into();
        if self.target.is_some() {
            if self.current_result() == TokenResult::Incorrect {
                self.tally.record(TokenResult::Incorrect);
            }
            self.index += 1;
        }
        debug!("[single] Target {} is now {:?}", self.index, token);
        self.target = Some(token);
        self.is_processing = false;
    }

    /// Score a transcript against the current target
    pub fn on_transcript(&mut self, text: &str, is_final: bool) -> SingleOutcome {
        if self.is_processing {
            trace!("[single] Already accepted, ignoring {:?}", text);
            return SingleOutcome::Ignored;
        }
        let Some(target) = self.target.as_deref() else {
            return SingleOutcome::Ignored;
        };

        let matched = self.scorer.classify(text, target);
        trace!(
            "[single] {:?} vs {:?}: {:.2} ({:?})",
            text,
            target,
            matched.score,
            matched.tier
        );

        if matched.score > self.threshold {
            self.is_processing = true;
            self.results.insert(self.index, TokenResult::Correct);
            self.tally.record(TokenResult::Correct);
            debug!("[single] Target {} accepted", self.index);
            return SingleOutcome::Accepted {
                index: self.index,
                matched,
            };
        }

        if is_final {
            self.results.insert(self.index, TokenResult::Incorrect);
            debug!("[single] Target {} rejected", self.index);
            return SingleOutcome::Rejected {
                index: self.index,
                matched,
            };
        }

        SingleOutcome::Undecided { matched }
    }

    /// Clear an `Incorrect` result so the learner can try the same target again
    ///
    /// Returns false if the target was already accepted.
    pub fn retry(&mut self) -> bool {
        if self.current_result() == TokenResult::Correct {
            return false;
        }
        self.results.remove(&self.index);
        true
    }

    /// Operator reset: clears results and tally, keeps the current target
    pub fn reset(&mut self) {
        self.results.clear();
        self.tally = ScoreTally::default();
        self.index = 0;
        self.is_processing = false;
    }
}

#[cfg(test)]
#[path = "single_test.rs"]
mod tests;
