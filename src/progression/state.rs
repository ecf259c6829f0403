// Practice run state shared by both progression modes

use crate::matching::{normalize_for, Script};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Outcome for one target token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenResult {
    /// Not resolved yet
    #[default]
    Pending,
    Correct,
    Incorrect,
}

/// Resolved-token counter, incremented once per resolved token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreTally {
    pub correct: u32,
    pub total: u32,
}

impl ScoreTally {
    pub fn new(correct: u32, total: u32) -> Self {
        Self { correct, total }
    }

    /// Count one resolved token. `Pending` is not a resolution and is ignored.
    pub fn record(&mut self, result: TokenResult) {
        match result {
            TokenResult::Correct => {
                self.correct += 1;
                self.total += 1;
            }
            TokenResult::Incorrect => self.total += 1,
            TokenResult::Pending => {}
        }
    }

    /// Fraction correct, 0.0 when nothing has been resolved
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

/// Results keyed by token index; only resolved tokens have entries
pub type TokenResults = BTreeMap<usize, TokenResult>;

/// Progression phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// No run in progress
    #[default]
    Idle,
    /// Run in progress, consuming targets
    Listening,
    /// Every target has been resolved
    Completed,
}

/// Which progression variant a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    SingleTarget,
    Sequential,
}

/// Ordered, immutable list of target tokens
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetSequence {
    tokens: Vec<String>,
}

impl TargetSequence {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a paragraph into practice tokens
    ///
    /// Splits on whitespace and drops tokens with nothing left after
    /// normalization (stray punctuation). Kept tokens retain their original
    /// text for display.
    pub fn from_paragraph(text: &str, script: Script) -> Self {
        Self {
            tokens: text
                .split_whitespace()
                .filter(|token| !normalize_for(token, script).is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

/// Read-only view of a practice session for the UI
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Identifier of the current run, `None` before the first start
    pub run_id: Option<Uuid>,
    pub mode: ModeKind,
    pub phase: RunPhase,
    pub current_index: usize,
    pub current_target: Option<String>,
    pub per_token_result: TokenResults,
    pub is_listening: bool,
    pub is_processing: bool,
    pub tally: ScoreTally,
}
