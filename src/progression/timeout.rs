// Timeout supervisor for sequential practice
// Force-advances the run when no match arrives for the current token in time

use crate::timer::DelayedAction;
use crate::{debug, trace};
use std::time::{Duration, Instant};

/// Default silence period before a token is marked incorrect (5 seconds)
pub const DEFAULT_TOKEN_TIMEOUT_MS: u64 = 5000;

/// Single cancellable timeout keyed to the token index it was armed for
#[derive(Debug, Clone)]
pub struct TimeoutSupervisor {
    action: DelayedAction<usize>,
    period: Duration,
}

impl TimeoutSupervisor {
    pub fn new(period: Duration) -> Self {
        Self {
            action: DelayedAction::new(),
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Arm for `index`, replacing any live timeout
    pub fn arm(&mut self, index: usize, now: Instant) {
        trace!("[timeout] Armed for index {} ({:?})", index, self.period);
        self.action.arm(index, now, self.period);
    }

    /// Cancel the live timeout, returning the index it was armed for
    pub fn cancel(&mut self) -> Option<usize> {
        let cancelled = self.action.cancel();
        if let Some(index) = cancelled {
            trace!("[timeout] Cancelled for index {}", index);
        }
        cancelled
    }

    /// Index the live timeout belongs to
    pub fn armed_index(&self) -> Option<usize> {
        self.action.armed_key()
    }

    pub fn due_at(&self) -> Option<Instant> {
        self.action.due_at()
    }

    /// Fire the timeout if it is due, returning its index
    pub fn fire_due(&mut self, now: Instant) -> Option<usize> {
        let fired = self.action.take_due(now);
        if let Some(index) = fired {
            debug!("[timeout] Fired for index {}", index);
        }
        fired
    }
}

impl Default for TimeoutSupervisor {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_TOKEN_TIMEOUT_MS))
    }
}
