// Recognition session supervisor
// Owns start/stop/auto-restart of one continuous recognizer and filters stale results

use super::source::{RecognizerConfig, RecognizerErrorCode, ResultFragment, SpeechRecognizer};
use crate::timer::DelayedAction;
use crate::{debug, info, trace, warn};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Default guard window after a turn starts or the target changes (200ms)
pub const DEFAULT_GUARD_DELAY_MS: u64 = 200;

/// Default delay before restarting after an unexpected end (500ms)
pub const DEFAULT_RESTART_DELAY_MS: u64 = 500;

/// Default number of consecutive immediate failures that are retried
pub const DEFAULT_MAX_RESTART_ATTEMPTS: u32 = 3;

/// Default minimum turn length that counts as healthy (1000ms)
pub const DEFAULT_STABLE_TURN_MS: u64 = 1000;

/// Configuration for the recognition supervisor
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Passed to the recognizer on every start
    pub recognizer: RecognizerConfig,
    /// Results arriving within this window after a turn start or re-arm are dropped
    pub guard_delay: Duration,
    /// Wait before restarting a turn that ended unexpectedly
    pub restart_delay: Duration,
    /// Consecutive immediate failures retried before giving up
    pub max_restart_attempts: u32,
    /// A turn that lasts this long, or yields any result, resets the failure count
    pub stable_turn: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            recognizer: RecognizerConfig::default(),
            guard_delay: Duration::from_millis(DEFAULT_GUARD_DELAY_MS),
            restart_delay: Duration::from_millis(DEFAULT_RESTART_DELAY_MS),
            max_restart_attempts: DEFAULT_MAX_RESTART_ATTEMPTS,
            stable_turn: Duration::from_millis(DEFAULT_STABLE_TURN_MS),
        }
    }
}

/// Reportable supervisor failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SupervisorError {
    /// Recognizer reported an error other than `aborted`
    #[error("{}", .code.describe())]
    Recognizer { code: RecognizerErrorCode },
    /// Recognizer refused to start
    #[error("{detail}")]
    StartFailed { detail: String },
    /// Recognizer kept ending right after starting
    #[error("Recognizer stopped unexpectedly {attempts} times in a row")]
    RestartExhausted { attempts: u32 },
}

/// Transcript accepted from one result event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
    /// True when built from final fragments
    pub is_final: bool,
}

/// Supervisor for one continuous recognition source
///
/// Presents a staleness-filtered transcript stream. The recognizer is a
/// singleton: starting again always stops the running turn first.
pub struct RecognitionSupervisor<R: SpeechRecognizer> {
    recognizer: R,
    config: SupervisorConfig,
    /// Caller wants to be listening
    is_listening: bool,
    /// Recognizer has been started and has not ended or been stopped
    recognizer_active: bool,
    /// Results arriving before this instant are discarded
    accept_after: Option<Instant>,
    restart: DelayedAction<()>,
    turn_started_at: Option<Instant>,
    turn_produced_results: bool,
    consecutive_failures: u32,
    /// End events still owed by turns the supervisor stopped itself
    pending_ends: u32,
}

impl<R: SpeechRecognizer> RecognitionSupervisor<R> {
    pub fn new(recognizer: R) -> Self {
        Self::with_config(recognizer, SupervisorConfig::default())
    }

    pub fn with_config(recognizer: R, config: SupervisorConfig) -> Self {
        Self {
            recognizer,
            config,
            is_listening: false,
            recognizer_active: false,
            accept_after: None,
            restart: DelayedAction::new(),
            turn_started_at: None,
            turn_produced_results: false,
            consecutive_failures: 0,
            pending_ends: 0,
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    pub fn is_listening(&self) -> bool {
        self.is_listening
    }

    pub fn accept_after(&self) -> Option<Instant> {
        self.accept_after
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Pending restart deadline, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        self.restart.due_at()
    }

    /// Begin listening
    ///
    /// # Errors
    /// Returns `StartFailed` if the recognizer refuses to start; listening
    /// stays off in that case.
    pub fn start(&mut self, now: Instant) -> Result<(), SupervisorError> {
        if self.recognizer_active {
            debug!("[supervisor] Stopping previous recognizer turn before start");
            self.stop_recognizer();
        }
        self.restart.cancel();
        self.consecutive_failures = 0;

        if let Err(e) = self.begin_turn(now) {
            self.is_listening = false;
            return Err(e);
        }
        self.is_listening = true;
        info!("[supervisor] Listening started");
        Ok(())
    }

    /// Stop listening. Any pending restart is cancelled.
    pub fn stop(&mut self) {
        let was_listening = self.is_listening;
        self.is_listening = false;
        self.restart.cancel();
        self.stop_recognizer();
        if was_listening {
            info!("[supervisor] Listening stopped");
        }
    }

    /// Push the accept-after cutoff to `now + guard_delay`
    ///
    /// Called when the expected target changes so trailing speech for the
    /// previous target is not attributed to the new one.
    pub fn rearm_guard(&mut self, now: Instant) {
        self.accept_after = Some(now + self.config.guard_delay);
    }

    /// Recognizer reported that a turn began
    pub fn on_started(&mut self) {
        debug!("[supervisor] Recognizer turn started");
    }

    /// Handle a result event that arrived at `arrived_at`
    ///
    /// Returns `None` for stale, empty or post-stop events.
    pub fn on_result(
        &mut self,
        result_index: usize,
        results: &[ResultFragment],
        arrived_at: Instant,
    ) -> Option<Transcript> {
        if !self.is_listening {
            trace!("[supervisor] Dropping result while not listening");
            return None;
        }
        if let Some(cutoff) = self.accept_after {
            if arrived_at < cutoff {
                debug!(
                    "[supervisor] Dropping stale result ({:?} before cutoff)",
                    cutoff - arrived_at
                );
                return None;
            }
        }

        let fresh = results.get(result_index..).unwrap_or_default();
        let final_text = join_fragments(fresh.iter().filter(|f| f.is_final));
        let interim_text = join_fragments(fresh.iter().filter(|f| !f.is_final));

        let transcript = if !final_text.is_empty() {
            Transcript {
                text: final_text,
                is_final: true,
            }
        } else if !interim_text.is_empty() {
            Transcript {
                text: interim_text,
                is_final: false,
            }
        } else {
            trace!("[supervisor] Dropping empty result");
            return None;
        };

        self.turn_produced_results = true;
        self.consecutive_failures = 0;
        trace!(
            "[supervisor] Transcript final={} text={:?}",
            transcript.is_final,
            transcript.text
        );
        Some(transcript)
    }

    /// Handle the end of a recognizer turn
    ///
    /// If the caller still wants to listen, a restart is scheduled. Returns
    /// `RestartExhausted` once immediate failures exceed the configured limit.
    pub fn on_session_ended(&mut self, now: Instant) -> Option<SupervisorError> {
        // The end of a turn we stopped says nothing about the current one
        if self.pending_ends > 0 {
            self.pending_ends -= 1;
            debug!("[supervisor] Trailing end of a stopped turn");
            return None;
        }
        self.recognizer_active = false;

        if !self.is_listening {
            debug!("[supervisor] Turn ended after explicit stop");
            return None;
        }
        if self.restart.is_armed() {
            trace!("[supervisor] Restart already pending");
            return None;
        }

        let turn_length = self
            .turn_started_at
            .map(|started| now.saturating_duration_since(started))
            .unwrap_or_default();
        let immediate = !self.turn_produced_results && turn_length < self.config.stable_turn;

        if immediate {
            self.consecutive_failures += 1;
        } else {
            self.consecutive_failures = 0;
        }

        if self.consecutive_failures > self.config.max_restart_attempts {
            warn!(
                "[supervisor] Giving up after {} immediate failures",
                self.consecutive_failures
            );
            let attempts = self.consecutive_failures;
            self.stop();
            return Some(SupervisorError::RestartExhausted { attempts });
        }

        debug!(
            "[supervisor] Turn ended unexpectedly after {:?}, restarting in {:?} (failures={})",
            turn_length, self.config.restart_delay, self.consecutive_failures
        );
        self.restart.arm((), now, self.config.restart_delay);
        None
    }

    /// Handle a recognizer error
    ///
    /// `aborted` is ignored, as is anything arriving after listening stopped.
    /// Anything else stops listening and is returned for reporting; accepted
    /// progress is untouched.
    pub fn on_error(&mut self, code: &str) -> Option<SupervisorError> {
        let code = RecognizerErrorCode::parse(code);
        if code.is_benign() {
            debug!("[supervisor] Ignoring benign recognizer error {:?}", code);
            return None;
        }
        if !self.is_listening {
            debug!("[supervisor] Ignoring {:?} while not listening", code);
            return None;
        }
        warn!("[supervisor] Recognizer error: {}", code.describe());
        self.stop();
        Some(SupervisorError::Recognizer { code })
    }

    /// Run a due restart
    pub fn poll(&mut self, now: Instant) -> Option<SupervisorError> {
        self.restart.take_due(now)?;
        if !self.is_listening {
            return None;
        }
        debug!("[supervisor] Restarting recognizer");
        match self.begin_turn(now) {
            Ok(()) => None,
            Err(e) => {
                warn!("[supervisor] Restart failed: {}", e);
                self.is_listening = false;
                Some(e)
            }
        }
    }

    /// Stop the running turn; its end event will be swallowed
    fn stop_recognizer(&mut self) {
        if self.recognizer_active {
            self.recognizer.stop();
            self.recognizer_active = false;
            self.pending_ends += 1;
        }
    }

    fn begin_turn(&mut self, now: Instant) -> Result<(), SupervisorError> {
        self.recognizer
            .start(&self.config.recognizer)
            .map_err(|e| SupervisorError::StartFailed {
                detail: e.to_string(),
            })?;
        self.recognizer_active = true;
        self.turn_started_at = Some(now);
        self.turn_produced_results = false;
        self.rearm_guard(now);
        Ok(())
    }
}

fn join_fragments<'a>(fragments: impl Iterator<Item = &'a ResultFragment>) -> String {
    fragments
        .map(|f| f.transcript.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[path = "supervisor_test.rs"]
mod tests;
