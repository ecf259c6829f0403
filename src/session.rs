// Practice session - one recognition source driving one progression run
// Single entry point for recognizer events, timers and caller commands

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::events::{
    current_timestamp, ListeningChangedPayload, NearMissPayload, PracticeErrorPayload,
    PracticeEventEmitter, ReadyToAdvancePayload, RunCompletedPayload, TokenResolvedPayload,
};
use crate::matching::{ScoredMatch, Scorer};
use crate::progression::{
    ModeKind, Resolution, RunPhase, SequentialMachine, SequentialOutcome, SessionSnapshot,
    SingleOutcome, SingleTargetMachine, TargetSequence, TokenResult,
};
use crate::recognition::{
    RecognitionSupervisor, RecognizerEvent, SpeechRecognizer, SupervisorError, Transcript,
};
use crate::speech::SpeechSynthesizer;
use crate::timer::earliest;
use crate::{debug, info, warn};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Caller misuse of a session command
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Target sequence is empty")]
    EmptySequence,
    #[error("Target token is empty")]
    EmptyTarget,
    #[error("{command} is only available in {expected:?} mode")]
    WrongMode {
        command: &'static str,
        expected: ModeKind,
    },
    #[error("No practice run is active")]
    NoActiveRun,
}

/// Caller command, for hosts that queue commands instead of calling methods
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    StartSequential(TargetSequence),
    StartSingle(String),
    AdvanceToNextTarget(String),
    Retry,
    Resume,
    Stop,
    Reset,
}

/// Progression variant of the current run
#[derive(Debug, Clone)]
pub enum Mode {
    Single(SingleTargetMachine),
    Sequential(SequentialMachine),
}

impl Mode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Mode::Single(_) => ModeKind::SingleTarget,
            Mode::Sequential(_) => ModeKind::Sequential,
        }
    }
}

/// One practice run over one recognition source
///
/// All mutation goes through the command methods, [`handle_event`] and
/// [`poll_timers`]; callers observe state through [`snapshot`] and the
/// emitter.
///
/// [`handle_event`]: PracticeSession::handle_event
/// [`poll_timers`]: PracticeSession::poll_timers
/// [`snapshot`]: PracticeSession::snapshot
pub struct PracticeSession<R: SpeechRecognizer, E: PracticeEventEmitter> {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    scorer: Scorer,
    supervisor: RecognitionSupervisor<R>,
    mode: Mode,
    emitter: E,
    run_id: Option<Uuid>,
}

impl<R: SpeechRecognizer, E: PracticeEventEmitter> PracticeSession<R, E> {
    pub fn new(recognizer: R, emitter: E, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        let scorer = Scorer::new(config.script);
        let supervisor = RecognitionSupervisor::with_config(recognizer, config.supervisor());
        let mode = Mode::Sequential(SequentialMachine::new(scorer, config.sequential()));
        Self {
            config,
            clock,
            scorer,
            supervisor,
            mode,
            emitter,
            run_id: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn supervisor(&self) -> &RecognitionSupervisor<R> {
        &self.supervisor
    }

    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    pub fn is_listening(&self) -> bool {
        self.supervisor.is_listening()
    }

    /// Start a paragraph run over `sequence`
    pub fn start_sequential(&mut self, sequence: TargetSequence) -> Result<(), CommandError> {
        if sequence.is_empty() {
            return Err(CommandError::EmptySequence);
        }
        let was_listening = self.supervisor.is_listening();
        let now = self.clock.now();
        let run_id = Uuid::new_v4();
        info!(
            "[session] Starting sequential run {} ({} targets)",
            run_id,
            sequence.len()
        );

        let mut machine = SequentialMachine::new(self.scorer, self.config.sequential());
        machine.start(sequence, now);
        self.mode = Mode::Sequential(machine);
        self.run_id = Some(run_id);

        self.begin_listening(now);
        self.sync_listening(was_listening);
        Ok(())
    }

    /// Start a word drill with `target` as the first token
    pub fn start_single(&mut self, target: impl Into<String>) -> Result<(), CommandError> {
        let target = non_empty(target.into())?;
        let was_listening = self.supervisor.is_listening();
        let now = self.clock.now();
        let run_id = Uuid::new_v4();
        info!("[session] Starting single-target run {}", run_id);

        let mut machine = SingleTargetMachine::new(self.scorer, self.config.single_target_threshold);
        machine.advance_to(target);
        self.mode = Mode::Single(machine);
        self.run_id = Some(run_id);

        self.begin_listening(now);
        self.sync_listening(was_listening);
        Ok(())
    }

    /// Move a word drill to its next target
    pub fn advance_to_next_target(&mut self, token: impl Into<String>) -> Result<(), CommandError> {
        let token = non_empty(token.into())?;
        let now = self.clock.now();
        let machine = self.single_mut("advance_to_next_target")?;
        machine.advance_to(token);
        // Trailing speech for the previous target must not land on this one
        self.supervisor.rearm_guard(now);
        Ok(())
    }

    /// Let the learner try the current word again
    ///
    /// Returns false if the current target was already accepted.
    pub fn retry(&mut self) -> Result<bool, CommandError> {
        let now = self.clock.now();
        let machine = self.single_mut("retry")?;
        let cleared = machine.retry();
        if cleared {
            self.supervisor.rearm_guard(now);
        }
        Ok(cleared)
    }

    /// Resume listening for the current run after a stop or reported error
    pub fn resume(&mut self) -> Result<(), CommandError> {
        if self.run_id.is_none() || self.phase() != RunPhase::Listening {
            return Err(CommandError::NoActiveRun);
        }
        if self.supervisor.is_listening() {
            return Ok(());
        }
        let now = self.clock.now();
        info!("[session] Resuming run");
        self.begin_listening(now);
        self.sync_listening(false);
        Ok(())
    }

    /// Stop listening; progress is kept
    pub fn stop(&mut self) {
        let was_listening = self.supervisor.is_listening();
        self.supervisor.stop();
        if let Mode::Sequential(machine) = &mut self.mode {
            machine.pause();
        }
        self.sync_listening(was_listening);
    }

    /// Operator reset
    ///
    /// Sequential mode clears the run and returns to idle. Single-target mode
    /// clears the results and tally but keeps the target and listening.
    pub fn reset(&mut self) {
        let was_listening = self.supervisor.is_listening();
        let now = self.clock.now();
        match &mut self.mode {
            Mode::Sequential(machine) => {
                self.supervisor.stop();
                machine.reset();
                self.run_id = None;
                info!("[session] Sequential run reset");
            }
            Mode::Single(machine) => {
                machine.reset();
                self.supervisor.rearm_guard(now);
                info!("[session] Single-target run reset");
            }
        }
        self.sync_listening(was_listening);
    }

    /// Apply a queued command
    pub fn execute(&mut self, command: SessionCommand) -> Result<(), CommandError> {
        match command {
            SessionCommand::StartSequential(sequence) => self.start_sequential(sequence),
            SessionCommand::StartSingle(target) => self.start_single(target),
            SessionCommand::AdvanceToNextTarget(token) => self.advance_to_next_target(token),
            SessionCommand::Retry => self.retry().map(|_| ()),
            SessionCommand::Resume => self.resume(),
            SessionCommand::Stop => {
                self.stop();
                Ok(())
            }
            SessionCommand::Reset => {
                self.reset();
                Ok(())
            }
        }
    }

    /// Speak the current target through `synthesizer`
    pub fn pronounce_current_target(
        &self,
        synthesizer: &dyn SpeechSynthesizer,
    ) -> Result<(), CommandError> {
        let target = self.current_target().ok_or(CommandError::NoActiveRun)?;
        debug!("[session] Pronouncing {:?}", target);
        synthesizer.speak(target, &self.config.speech());
        Ok(())
    }

    /// Feed one raw recognizer event, stamped with the current time
    pub fn handle_event(&mut self, event: RecognizerEvent) {
        let was_listening = self.supervisor.is_listening();
        let now = self.clock.now();
        match event {
            RecognizerEvent::Started => self.supervisor.on_started(),
            RecognizerEvent::Result {
                result_index,
                results,
            } => {
                if let Some(transcript) = self.supervisor.on_result(result_index, &results, now) {
                    self.on_transcript(transcript, now);
                }
            }
            RecognizerEvent::Error { code } => {
                if let Some(error) = self.supervisor.on_error(&code) {
                    self.report(error);
                }
            }
            RecognizerEvent::Ended => {
                if let Some(error) = self.supervisor.on_session_ended(now) {
                    self.report(error);
                }
            }
        }
        self.sync_listening(was_listening);
    }

    /// Fire any due restart, settle or timeout
    pub fn poll_timers(&mut self) {
        let was_listening = self.supervisor.is_listening();
        let now = self.clock.now();
        if let Some(error) = self.supervisor.poll(now) {
            self.report(error);
        }
        if let Mode::Sequential(machine) = &mut self.mode {
            let outcome = machine.poll(now);
            self.on_sequential_outcome(outcome, now);
        }
        self.sync_listening(was_listening);
    }

    /// Earliest instant at which [`poll_timers`](Self::poll_timers) has work
    pub fn next_deadline(&self) -> Option<Instant> {
        let machine_deadline = match &self.mode {
            Mode::Sequential(machine) => machine.next_deadline(),
            Mode::Single(_) => None,
        };
        earliest(self.supervisor.next_deadline(), machine_deadline)
    }

    pub fn current_target(&self) -> Option<&str> {
        match &self.mode {
            Mode::Single(machine) => machine.target(),
            Mode::Sequential(machine) => machine.current_target(),
        }
    }

    fn phase(&self) -> RunPhase {
        match &self.mode {
            Mode::Single(machine) if machine.target().is_some() => RunPhase::Listening,
            Mode::Single(_) => RunPhase::Idle,
            Mode::Sequential(machine) => machine.phase(),
        }
    }

    /// Read-only view for the UI
    pub fn snapshot(&self) -> SessionSnapshot {
        let (current_index, per_token_result, is_processing, tally) = match &self.mode {
            Mode::Single(m) => (
                m.current_index(),
                m.results().clone(),
                m.is_processing(),
                m.tally(),
            ),
            Mode::Sequential(m) => (
                m.current_index(),
                m.results().clone(),
                m.is_processing(),
                m.tally(),
            ),
        };
        SessionSnapshot {
            run_id: self.run_id,
            mode: self.mode.kind(),
            phase: self.phase(),
            current_index,
            current_target: self.current_target().map(str::to_string),
            per_token_result,
            is_listening: self.supervisor.is_listening(),
            is_processing,
            tally,
        }
    }

    fn single_mut(&mut self, command: &'static str) -> Result<&mut SingleTargetMachine, CommandError> {
        if self.run_id.is_none() {
            return Err(CommandError::NoActiveRun);
        }
        match &mut self.mode {
            Mode::Single(machine) if machine.target().is_some() => Ok(machine),
            Mode::Single(_) => Err(CommandError::NoActiveRun),
            Mode::Sequential(_) => Err(CommandError::WrongMode {
                command,
                expected: ModeKind::SingleTarget,
            }),
        }
    }

    fn begin_listening(&mut self, now: Instant) {
        match self.supervisor.start(now) {
            Ok(()) => {
                if let Mode::Sequential(machine) = &mut self.mode {
                    machine.resume(now);
                }
            }
            Err(error) => self.report(error),
        }
    }

    /// Surface a supervisor failure; listening is already off, progress is kept
    fn report(&mut self, error: SupervisorError) {
        warn!("[session] Practice error: {}", error);
        if let Mode::Sequential(machine) = &mut self.mode {
            machine.pause();
        }
        self.emitter
            .emit_practice_error(PracticeErrorPayload::new(error));
    }

    fn sync_listening(&self, was_listening: bool) {
        let listening = self.supervisor.is_listening();
        if listening != was_listening {
            self.emitter
                .emit_listening_changed(ListeningChangedPayload { listening });
        }
    }

    fn on_transcript(&mut self, transcript: Transcript, now: Instant) {
        match &mut self.mode {
            Mode::Single(machine) => {
                let outcome = machine.on_transcript(&transcript.text, transcript.is_final);
                self.on_single_outcome(outcome);
            }
            Mode::Sequential(machine) => {
                let outcome = machine.on_transcript(&transcript.text, now);
                self.on_sequential_outcome(outcome, now);
            }
        }
    }

    fn on_single_outcome(&mut self, outcome: SingleOutcome) {
        let Mode::Single(machine) = &self.mode else {
            return;
        };
        let Some(run_id) = self.run_id else {
            return;
        };
        let token = machine.target().unwrap_or_default().to_string();
        let tally = machine.tally();

        match outcome {
            SingleOutcome::Ignored => {}
            SingleOutcome::Accepted { index, matched } => {
                self.emitter.emit_token_resolved(TokenResolvedPayload {
                    run_id,
                    index,
                    token: token.clone(),
                    result: TokenResult::Correct,
                    score: Some(matched.score),
                    tally,
                });
                self.emitter.emit_ready_to_advance(ReadyToAdvancePayload {
                    run_id,
                    index,
                    token,
                    score: matched.score,
                });
            }
            SingleOutcome::Rejected { index, matched } => {
                self.emitter.emit_token_resolved(TokenResolvedPayload {
                    run_id,
                    index,
                    token,
                    result: TokenResult::Incorrect,
                    score: Some(matched.score),
                    tally,
                });
            }
            SingleOutcome::Undecided { matched } => {
                let index = machine.current_index();
                self.emit_near_miss(run_id, index, token, Some(matched));
            }
        }
    }

    fn on_sequential_outcome(&mut self, outcome: SequentialOutcome, now: Instant) {
        let Mode::Sequential(machine) = &self.mode else {
            return;
        };
        let Some(run_id) = self.run_id else {
            return;
        };

        match outcome {
            SequentialOutcome::Ignored => {}
            SequentialOutcome::NoMatch { best } => {
                let index = machine.current_index();
                let token = machine.current_target().unwrap_or_default().to_string();
                self.emit_near_miss(run_id, index, token, best);
            }
            SequentialOutcome::Advanced {
                index,
                result,
                resolution,
                completed,
            } => {
                let score = match resolution {
                    Resolution::Matched(matched) => Some(matched.score),
                    Resolution::TimedOut => None,
                };
                self.emitter.emit_token_resolved(TokenResolvedPayload {
                    run_id,
                    index,
                    token: machine.sequence().get(index).unwrap_or_default().to_string(),
                    result,
                    score,
                    tally: machine.tally(),
                });

                if completed {
                    let payload = RunCompletedPayload {
                        run_id,
                        tally: machine.tally(),
                        per_token_result: machine.results().clone(),
                        timestamp: current_timestamp(),
                    };
                    self.supervisor.stop();
                    self.emitter.emit_run_completed(payload);
                } else {
                    self.supervisor.rearm_guard(now);
                }
            }
        }
    }

    fn emit_near_miss(&self, run_id: Uuid, index: usize, token: String, best: Option<ScoredMatch>) {
        if let Some(best) = best.filter(|b| b.score > 0.0) {
            self.emitter.emit_near_miss(NearMissPayload {
                run_id,
                index,
                token,
                score: best.score,
            });
        }
    }
}

fn non_empty(token: String) -> Result<String, CommandError> {
    if token.trim().is_empty() {
        Err(CommandError::EmptyTarget)
    } else {
        Ok(token)
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
