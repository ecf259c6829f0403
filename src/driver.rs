// Tokio driver - runs one practice session as a single task
// Commands, recognizer events and timer deadlines are all handled on this task, in order

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::events::PracticeEventEmitter;
use crate::progression::{SessionSnapshot, TargetSequence};
use crate::recognition::{RecognizerEvent, SpeechRecognizer};
use crate::session::{CommandError, PracticeSession, SessionCommand};
use crate::{debug, info};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Clock backed by tokio time, so paused test time drives session deadlines
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Errors returned by [`SessionHandle`] calls
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    #[error("Session task is no longer running")]
    Closed,
    #[error(transparent)]
    Command(#[from] CommandError),
}

enum Input {
    Command(SessionCommand, oneshot::Sender<Result<(), CommandError>>),
    Event(RecognizerEvent),
}

/// Handle to a running session task
///
/// Dropping every handle (or calling [`shutdown`](Self::shutdown)) stops
/// listening and ends the task.
pub struct SessionHandle {
    inputs: mpsc::UnboundedSender<Input>,
    snapshots: watch::Receiver<SessionSnapshot>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Forward a recognizer event to the session
    pub fn feed(&self, event: RecognizerEvent) -> Result<(), DriverError> {
        self.inputs
            .send(Input::Event(event))
            .map_err(|_| DriverError::Closed)
    }

    /// Run a command on the session task and wait for its result
    pub async fn command(&self, command: SessionCommand) -> Result<(), DriverError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inputs
            .send(Input::Command(command, reply_tx))
            .map_err(|_| DriverError::Closed)?;
        reply_rx.await.map_err(|_| DriverError::Closed)?.map_err(DriverError::from)
    }

    pub async fn start_sequential(&self, sequence: TargetSequence) -> Result<(), DriverError> {
        self.command(SessionCommand::StartSequential(sequence)).await
    }

    pub async fn start_single(&self, target: impl Into<String>) -> Result<(), DriverError> {
        self.command(SessionCommand::StartSingle(target.into())).await
    }

    pub async fn advance_to_next_target(&self, token: impl Into<String>) -> Result<(), DriverError> {
        self.command(SessionCommand::AdvanceToNextTarget(token.into()))
            .await
    }

    pub async fn retry(&self) -> Result<(), DriverError> {
        self.command(SessionCommand::Retry).await
    }

    pub async fn resume(&self) -> Result<(), DriverError> {
        self.command(SessionCommand::Resume).await
    }

    pub async fn stop(&self) -> Result<(), DriverError> {
        self.command(SessionCommand::Stop).await
    }

    pub async fn reset(&self) -> Result<(), DriverError> {
        self.command(SessionCommand::Reset).await
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified after every input the session handles
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Stop the session and wait for the task to finish
    pub async fn shutdown(self) {
        let SessionHandle { inputs, task, .. } = self;
        drop(inputs);
        if let Err(e) = task.await {
            crate::error!("[driver] Session task failed: {}", e);
        }
    }
}

/// Spawn a session task on the current tokio runtime
pub fn spawn<R, E>(recognizer: R, emitter: E, config: EngineConfig) -> SessionHandle
where
    R: SpeechRecognizer + 'static,
    E: PracticeEventEmitter + 'static,
{
    let session = PracticeSession::new(recognizer, emitter, Arc::new(TokioClock), config);
    let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());
    let task = tokio::spawn(run(session, inputs_rx, snapshot_tx));
    SessionHandle {
        inputs: inputs_tx,
        snapshots: snapshot_rx,
        task,
    }
}

async fn run<R, E>(
    mut session: PracticeSession<R, E>,
    mut inputs: mpsc::UnboundedReceiver<Input>,
    snapshots: watch::Sender<SessionSnapshot>,
) where
    R: SpeechRecognizer,
    E: PracticeEventEmitter,
{
    info!("[driver] Session task started");
    loop {
        let deadline = session.next_deadline();
        tokio::select! {
            input = inputs.recv() => match input {
                Some(Input::Command(command, reply)) => {
                    debug!("[driver] Command {:?}", command);
                    let result = session.execute(command);
                    // Caller may have stopped waiting
                    let _ = reply.send(result);
                }
                Some(Input::Event(event)) => session.handle_event(event),
                None => {
                    session.stop();
                    info!("[driver] All handles dropped, session task exiting");
                    break;
                }
            },
            _ = sleep_until(deadline) => session.poll_timers(),
        }
        snapshots.send_replace(session.snapshot());
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "driver_test.rs"]
mod tests;
