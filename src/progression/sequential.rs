// Sequential progression for continuous paragraph practice
// Consumes a target sequence strictly left to right with a silence timeout

use super::state::{RunPhase, ScoreTally, TargetSequence, TokenResult, TokenResults};
use super::timeout::TimeoutSupervisor;
use crate::matching::{ScoredMatch, Scorer};
use crate::timer::{earliest, DelayedAction};
use crate::{debug, info, trace, warn};
use std::time::{Duration, Instant};

/// Default acceptance threshold for paragraph practice (strict `>`)
pub const DEFAULT_SEQUENTIAL_THRESHOLD: f64 = 0.7;

/// Default delay before accepting transcripts again after an advance (300ms)
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 300;

/// Timing for a sequential run
#[derive(Debug, Clone)]
pub struct SequentialConfig {
    pub threshold: f64,
    pub token_timeout: Duration,
    pub settle_delay: Duration,
}

impl Default for SequentialConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SEQUENTIAL_THRESHOLD,
            token_timeout: Duration::from_millis(super::timeout::DEFAULT_TOKEN_TIMEOUT_MS),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
        }
    }
}

/// Why a token was resolved
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// A transcript candidate scored above threshold
    Matched(ScoredMatch),
    /// The timeout fired for this token
    TimedOut,
}

/// What an input did to the run
#[derive(Debug, Clone, PartialEq)]
pub enum SequentialOutcome {
    /// Dropped: no run, run finished, or still settling after an advance
    Ignored,
    /// No candidate matched the current target; `best` is the closest one
    NoMatch { best: Option<ScoredMatch> },
    /// The token at `index` was resolved and the run moved on
    Advanced {
        index: usize,
        result: TokenResult,
        resolution: Resolution,
        completed: bool,
    },
}

/// Progression machine over an ordered target sequence
#[derive(Debug, Clone)]
pub struct SequentialMachine {
    scorer: Scorer,
    config: SequentialConfig,
    sequence: TargetSequence,
    current_index: usize,
    results: TokenResults,
    tally: ScoreTally,
    phase: RunPhase,
    /// Reentrancy guard, held from an advance until the settle delay passes
    is_processing: bool,
    timeout: TimeoutSupervisor,
    settle: DelayedAction<()>,
}

impl SequentialMachine {
    pub fn new(scorer: Scorer, config: SequentialConfig) -> Self {
        let timeout = TimeoutSupervisor::new(config.token_timeout);
        Self {
            scorer,
            config,
            sequence: TargetSequence::default(),
            current_index: 0,
            results: TokenResults::new(),
            tally: ScoreTally::default(),
            phase: RunPhase::Idle,
            is_processing: false,
            timeout,
            settle: DelayedAction::new(),
        }
    }

    pub fn config(&self) -> &SequentialConfig {
        &self.config
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn sequence(&self) -> &TargetSequence {
        &self.sequence
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_target(&self) -> Option<&str> {
        self.sequence.get(self.current_index)
    }

    pub fn results(&self) -> &TokenResults {
        &self.results
    }

    pub fn tally(&self) -> ScoreTally {
        self.tally
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    /// Index the live timeout is armed for
    pub fn timeout_index(&self) -> Option<usize> {
        self.timeout.armed_index()
    }

    /// Earliest pending timer deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        earliest(self.timeout.due_at(), self.settle.due_at())
    }

    /// Begin a run over `sequence`
    ///
    /// An empty sequence completes immediately.
    pub fn start(&mut self, sequence: TargetSequence, now: Instant) {
        self.reset();
        self.sequence = sequence;
        if self.sequence.is_empty() {
            self.phase = RunPhase::Completed;
            return;
        }
        self.phase = RunPhase::Listening;
        self.timeout.arm(0, now);
        info!(
            "[sequential] Run started with {} targets",
            self.sequence.len()
        );
    }

    /// Suspend timers while listening is off; progress is kept
    pub fn pause(&mut self) {
        self.timeout.cancel();
        self.settle.cancel();
        self.is_processing = false;
    }

    /// Resume a paused run, re-arming the timeout for the current index
    pub fn resume(&mut self, now: Instant) {
        if self.phase == RunPhase::Listening && self.timeout.armed_index().is_none() {
            self.timeout.arm(self.current_index, now);
        }
    }

    /// Score a transcript against the current target only
    ///
    /// Candidates are the whitespace-separated words of `text`, tried in
    /// order. The first above threshold advances the run by exactly one
    /// token; later targets are never considered.
    pub fn on_transcript(&mut self, text: &str, now: Instant) -> SequentialOutcome {
        if self.phase != RunPhase::Listening || self.is_processing {
            return SequentialOutcome::Ignored;
        }
        let Some(target) = self.sequence.get(self.current_index) else {
            return SequentialOutcome::Ignored;
        };

        let mut best: Option<ScoredMatch> = None;
        for candidate in text.split_whitespace() {
            let matched = self.scorer.classify(candidate, target);
            trace!(
                "[sequential] {:?} vs {:?}: {:.2} ({:?})",
                candidate,
                target,
                matched.score,
                matched.tier
            );
            if matched.score > self.config.threshold {
                return self.advance(TokenResult::Correct, Resolution::Matched(matched), now);
            }
            if best.map_or(true, |b| matched.score > b.score) {
                best = Some(matched);
            }
        }
        SequentialOutcome::NoMatch { best }
    }

    /// Fire due timers
    ///
    /// Clears the settle guard when due, and resolves the current token as
    /// `Incorrect` when its timeout fires.
    pub fn poll(&mut self, now: Instant) -> SequentialOutcome {
        if self.settle.take_due(now).is_some() {
            trace!("[sequential] Settled");
            self.is_processing = false;
        }
        match self.timeout.fire_due(now) {
            Some(index) => self.on_timeout(index, now),
            None => SequentialOutcome::Ignored,
        }
    }

    fn on_timeout(&mut self, index: usize, now: Instant) -> SequentialOutcome {
        if self.phase != RunPhase::Listening || index != self.current_index {
            warn!(
                "[sequential] Dropping timeout for index {} (current {})",
                index, self.current_index
            );
            return SequentialOutcome::Ignored;
        }
        self.advance(TokenResult::Incorrect, Resolution::TimedOut, now)
    }

    fn advance(
        &mut self,
        result: TokenResult,
        resolution: Resolution,
        now: Instant,
    ) -> SequentialOutcome {
        // The live timeout belongs to the index being left
        self.timeout.cancel();

        let index = self.current_index;
        self.results.insert(index, result);
        self.tally.record(result);
        self.current_index += 1;
        debug!(
            "[sequential] Token {} resolved {:?} via {:?}",
            index, result, resolution
        );

        let completed = self.current_index >= self.sequence.len();
        if completed {
            self.phase = RunPhase::Completed;
            self.settle.cancel();
            self.is_processing = false;
            info!(
                "[sequential] Run completed: {}/{} correct",
                self.tally.correct, self.tally.total
            );
        } else {
            self.timeout.arm(self.current_index, now);
            if matches!(resolution, Resolution::Matched(_)) {
                self.is_processing = true;
                self.settle.arm((), now, self.config.settle_delay);
            }
        }

        SequentialOutcome::Advanced {
            index,
            result,
            resolution,
            completed,
        }
    }

    /// Cancel timers and clear the run
    pub fn reset(&mut self) {
        self.timeout.cancel();
        self.settle.cancel();
        self.sequence = TargetSequence::default();
        self.current_index = 0;
        self.results.clear();
        self.tally = ScoreTally::default();
        self.phase = RunPhase::Idle;
        self.is_processing = false;
    }
}

#[cfg(test)]
#[path = "sequential_test.rs"]
mod tests;
