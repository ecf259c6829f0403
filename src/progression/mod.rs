// Progression module - turns scored transcripts into per-token decisions
// Single-target mode for word drills, sequential mode for paragraph reading

pub mod sequential;
pub mod single;
pub mod state;
pub mod timeout;

pub use sequential::{Resolution, SequentialConfig, SequentialMachine, SequentialOutcome};
pub use single::{SingleOutcome, SingleTargetMachine};
pub use state::{
    ModeKind, RunPhase, ScoreTally, SessionSnapshot, TargetSequence, TokenResult, TokenResults,
};
pub use timeout::TimeoutSupervisor;
