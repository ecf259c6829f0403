// Practice events for caller notification
// Defines event payloads and emission trait for testability

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::progression::{ScoreTally, TokenResult, TokenResults};
use crate::recognition::SupervisorError;

/// Event names as constants for consistency
pub mod event_names {
    pub const TOKEN_RESOLVED: &str = "token_resolved";
    pub const READY_TO_ADVANCE: &str = "ready_to_advance";
    pub const NEAR_MISS: &str = "near_miss";
    pub const RUN_COMPLETED: &str = "run_completed";
    pub const LISTENING_CHANGED: &str = "listening_changed";
    pub const PRACTICE_ERROR: &str = "practice_error";
}

/// Payload for token_resolved event
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenResolvedPayload {
    pub run_id: Uuid,
    pub index: usize,
    pub token: String,
    pub result: TokenResult,
    /// Similarity of the deciding candidate; None when resolved by timeout
    pub score: Option<f64>,
    /// Tally after this resolution. A rejected single-target token can still
    /// be retried, so it is only counted once the caller advances past it.
    pub tally: ScoreTally,
}

/// Payload for ready_to_advance event (single-target mode)
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadyToAdvancePayload {
    pub run_id: Uuid,
    pub index: usize,
    pub token: String,
    pub score: f64,
}

/// Payload for near_miss event
///
/// Emitted when the best candidate scored above zero but not above threshold.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NearMissPayload {
    pub run_id: Uuid,
    pub index: usize,
    pub token: String,
    pub score: f64,
}

/// Payload for run_completed event
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunCompletedPayload {
    pub run_id: Uuid,
    pub tally: ScoreTally,
    pub per_token_result: TokenResults,
    /// ISO 8601 timestamp when the run completed
    pub timestamp: String,
}

/// Payload for listening_changed event
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ListeningChangedPayload {
    pub listening: bool,
}

/// Payload for practice_error event
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PracticeErrorPayload {
    pub error: SupervisorError,
    /// Human-readable description
    pub message: String,
    /// ISO 8601 timestamp when the error was reported
    pub timestamp: String,
}

impl PracticeErrorPayload {
    pub fn new(error: SupervisorError) -> Self {
        Self {
            message: error.to_string(),
            error,
            timestamp: current_timestamp(),
        }
    }
}

/// Every practice event, for channel and stream consumers
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "name", content = "payload", rename_all = "snake_case")]
pub enum PracticeEvent {
    TokenResolved(TokenResolvedPayload),
    ReadyToAdvance(ReadyToAdvancePayload),
    NearMiss(NearMissPayload),
    RunCompleted(RunCompletedPayload),
    ListeningChanged(ListeningChangedPayload),
    PracticeError(PracticeErrorPayload),
}

impl PracticeEvent {
    /// Event name matching [`event_names`]
    pub fn name(&self) -> &'static str {
        match self {
            PracticeEvent::TokenResolved(_) => event_names::TOKEN_RESOLVED,
            PracticeEvent::ReadyToAdvance(_) => event_names::READY_TO_ADVANCE,
            PracticeEvent::NearMiss(_) => event_names::NEAR_MISS,
            PracticeEvent::RunCompleted(_) => event_names::RUN_COMPLETED,
            PracticeEvent::ListeningChanged(_) => event_names::LISTENING_CHANGED,
            PracticeEvent::PracticeError(_) => event_names::PRACTICE_ERROR,
        }
    }
}

/// Trait for emitting practice events
/// Allows mocking in tests while using a channel or UI bridge in production
pub trait PracticeEventEmitter: Send + Sync {
    /// Emit token_resolved event
    fn emit_token_resolved(&self, payload: TokenResolvedPayload);

    /// Emit ready_to_advance event
    fn emit_ready_to_advance(&self, payload: ReadyToAdvancePayload);

    /// Emit near_miss event
    fn emit_near_miss(&self, payload: NearMissPayload);

    /// Emit run_completed event
    fn emit_run_completed(&self, payload: RunCompletedPayload);

    /// Emit listening_changed event
    fn emit_listening_changed(&self, payload: ListeningChangedPayload);

    /// Emit practice_error event
    fn emit_practice_error(&self, payload: PracticeErrorPayload);
}

/// Emitter that forwards every event into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelEventEmitter {
    sender: UnboundedSender<PracticeEvent>,
}

impl ChannelEventEmitter {
    pub fn new(sender: UnboundedSender<PracticeEvent>) -> Self {
        Self { sender }
    }

    fn send(&self, event: PracticeEvent) {
        let name = event.name();
        if self.sender.send(event).is_err() {
            crate::warn!("Failed to emit {}: receiver dropped", name);
        }
    }
}

impl PracticeEventEmitter for ChannelEventEmitter {
    fn emit_token_resolved(&self, payload: TokenResolvedPayload) {
        self.send(PracticeEvent::TokenResolved(payload));
    }

    fn emit_ready_to_advance(&self, payload: ReadyToAdvancePayload) {
        self.send(PracticeEvent::ReadyToAdvance(payload));
    }

    fn emit_near_miss(&self, payload: NearMissPayload) {
        self.send(PracticeEvent::NearMiss(payload));
    }

    fn emit_run_completed(&self, payload: RunCompletedPayload) {
        self.send(PracticeEvent::RunCompleted(payload));
    }

    fn emit_listening_changed(&self, payload: ListeningChangedPayload) {
        self.send(PracticeEvent::ListeningChanged(payload));
    }

    fn emit_practice_error(&self, payload: PracticeErrorPayload) {
        self.send(PracticeEvent::PracticeError(payload));
    }
}

/// Get the current timestamp in ISO 8601 format
pub fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
#[path = "events_test.rs"]
pub(crate) mod tests;
