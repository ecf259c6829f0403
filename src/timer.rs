// Single-slot cancellable delayed action
// Arm/cancel/fire primitive shared by restart scheduling and token timeouts

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Armed<K> {
    key: K,
    due: Instant,
}

/// At most one pending action, identified by a key
///
/// Arming replaces any pending action, so a superseded action can never fire.
/// Nothing runs on its own: the owner polls [`DelayedAction::take_due`] with the
/// current time and acts on the returned key.
#[derive(Debug, Clone)]
pub struct DelayedAction<K: Copy> {
    armed: Option<Armed<K>>,
}

impl<K: Copy> DelayedAction<K> {
    pub fn new() -> Self {
        Self { armed: None }
    }

    /// Schedule `key` to fire `delay` after `now`, replacing anything pending
    pub fn arm(&mut self, key: K, now: Instant, delay: Duration) {
        self.armed = Some(Armed {
            key,
            due: now + delay,
        });
    }

    /// Cancel the pending action, returning its key if one was armed
    pub fn cancel(&mut self) -> Option<K> {
        self.armed.take().map(|a| a.key)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Key of the pending action
    pub fn armed_key(&self) -> Option<K> {
        self.armed.map(|a| a.key)
    }

    /// When the pending action is due
    pub fn due_at(&self) -> Option<Instant> {
        self.armed.map(|a| a.due)
    }

    /// Disarm and return the key if the pending action is due at `now`
    pub fn take_due(&mut self, now: Instant) -> Option<K> {
        match self.armed {
            Some(armed) if armed.due <= now => {
                self.armed = None;
                Some(armed.key)
            }
            _ => None,
        }
    }
}

impl<K: Copy> Default for DelayedAction<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Earliest of two optional deadlines
pub fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

#[cfg(test)]
#[path = "timer_test.rs"]
mod tests;
