// Replay protocol - drives a session from scripted JSON lines on a virtual clock
//
// Communication is JSON over stdin/stdout:
// - Requests are JSON objects on stdin (one per line)
// - Responses are JSON objects on stdout (one per line)

use crate::clock::{Clock, ManualClock};
use crate::config::EngineConfig;
use crate::events::{ChannelEventEmitter, PracticeEvent};
use crate::progression::{SessionSnapshot, TargetSequence};
use crate::recognition::{NullRecognizer, RecognizerEvent, ResultFragment};
use crate::session::{CommandError, PracticeSession, SessionCommand};
use crate::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayRequest {
    StartSequential {
        targets: Vec<String>,
    },
    /// Tokenize `text` with the configured script and start a sequential run
    StartParagraph {
        text: String,
    },
    StartSingle {
        target: String,
    },
    Advance {
        target: String,
    },
    Retry,
    Resume,
    Stop,
    Reset,
    /// Recognizer began a turn
    Start,
    Result {
        #[serde(default, rename = "resultIndex")]
        result_index: usize,
        results: Vec<ResultFragment>,
    },
    Error {
        code: String,
    },
    End,
    /// Move the virtual clock forward, firing timers in deadline order
    Elapse {
        ms: u64,
    },
    Snapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayResponse {
    Snapshot { state: SessionSnapshot },
    Event { event: PracticeEvent },
    Error { message: String },
}

/// Session wired to a virtual clock and a no-op recognizer
pub struct Replay {
    clock: Arc<ManualClock>,
    session: PracticeSession<NullRecognizer, ChannelEventEmitter>,
    events: mpsc::UnboundedReceiver<PracticeEvent>,
}

impl Replay {
    pub fn new(config: EngineConfig) -> Self {
        let clock = Arc::new(ManualClock::new());
        let (tx, events) = mpsc::unbounded_channel();
        let session = PracticeSession::new(
            NullRecognizer,
            ChannelEventEmitter::new(tx),
            clock.clone(),
            config,
        );
        Self {
            clock,
            session,
            events,
        }
    }

    pub fn session(&self) -> &PracticeSession<NullRecognizer, ChannelEventEmitter> {
        &self.session
    }

    /// Handle one request line
    ///
    /// Blank lines produce nothing. Every other line produces any error,
    /// then the events it caused, then a snapshot.
    pub fn handle_line(&mut self, line: &str) -> Vec<ReplayResponse> {
        let line = line.trim();
        if line.is_empty() {
            return Vec::new();
        }

        let mut responses = Vec::new();
        match serde_json::from_str::<ReplayRequest>(line) {
            Ok(request) => {
                debug!("[replay] Request {:?}", request);
                if let Err(e) = self.apply(request) {
                    responses.push(ReplayResponse::Error {
                        message: e.to_string(),
                    });
                }
            }
            Err(e) => {
                warn!("[replay] Invalid request: {}", e);
                responses.push(ReplayResponse::Error {
                    message: format!("Invalid request: {}", e),
                });
            }
        }

        while let Ok(event) = self.events.try_recv() {
            responses.push(ReplayResponse::Event { event });
        }
        responses.push(ReplayResponse::Snapshot {
            state: self.session.snapshot(),
        });
        responses
    }

    fn apply(&mut self, request: ReplayRequest) -> Result<(), CommandError> {
        let command = match request {
            ReplayRequest::StartSequential { targets } => {
                SessionCommand::StartSequential(TargetSequence::new(targets))
            }
            ReplayRequest::StartParagraph { text } => SessionCommand::StartSequential(
                TargetSequence::from_paragraph(&text, self.session.config().script),
            ),
            ReplayRequest::StartSingle { target } => SessionCommand::StartSingle(target),
            ReplayRequest::Advance { target } => SessionCommand::AdvanceToNextTarget(target),
            ReplayRequest::Retry => SessionCommand::Retry,
            ReplayRequest::Resume => SessionCommand::Resume,
            ReplayRequest::Stop => SessionCommand::Stop,
            ReplayRequest::Reset => SessionCommand::Reset,
            ReplayRequest::Start => return self.feed(RecognizerEvent::Started),
            ReplayRequest::Result {
                result_index,
                results,
            } => {
                return self.feed(RecognizerEvent::Result {
                    result_index,
                    results,
                })
            }
            ReplayRequest::Error { code } => return self.feed(RecognizerEvent::Error { code }),
            ReplayRequest::End => return self.feed(RecognizerEvent::Ended),
            ReplayRequest::Elapse { ms } => {
                self.elapse(Duration::from_millis(ms));
                return Ok(());
            }
            ReplayRequest::Snapshot => return Ok(()),
        };
        self.session.execute(command)
    }

    fn feed(&mut self, event: RecognizerEvent) -> Result<(), CommandError> {
        self.session.handle_event(event);
        Ok(())
    }

    /// Advance the clock by `by`, stopping at every deadline on the way
    fn elapse(&mut self, by: Duration) {
        let until = self.clock.now() + by;
        loop {
            match self.session.next_deadline() {
                Some(deadline) if deadline <= until => {
                    let step = deadline.saturating_duration_since(self.clock.now());
                    self.clock.advance(step);
                    self.session.poll_timers();
                }
                _ => break,
            }
        }
        let rest = until.saturating_duration_since(self.clock.now());
        self.clock.advance(rest);
        self.session.poll_timers();
    }

    /// Serve requests from `input` until EOF
    pub fn run<I: BufRead, O: Write>(&mut self, input: I, mut output: O) -> Result<(), ReplayError> {
        info!("[replay] Ready");
        for line in input.lines() {
            let line = line?;
            for response in self.handle_line(&line) {
                serde_json::to_writer(&mut output, &response)?;
                output.write_all(b"\n")?;
            }
            output.flush()?;
        }
        info!("[replay] Input closed, exiting");
        Ok(())
    }
}

#[cfg(test)]
#[path = "replay_test.rs"]
mod tests;
