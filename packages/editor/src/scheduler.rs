//! Virtual-time timer queue
//!
//! Debounced deselects and popover listener registration are the only
//! suspension points in the engine. They are queued here and fired by the
//! session when it advances the clock, so timing is deterministic.

use crate::selection::{DeselectToken, SelectionId};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Resolve a pending deselect if its token is still current
    ResolveDeselect { node: SelectionId, token: DeselectToken },

    /// Arm a popover's one-shot click-outside listener
    ArmClickOutside { popover: SelectionId },
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now: Duration,
    next_id: u64,
    queue: BTreeMap<(Duration, TimerId), Task>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, delay: Duration, task: Task) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.queue.insert((self.now + delay, id), task);
        id
    }

    /// Cancel a timer. Returns false when it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let key = self.queue.keys().find(|(_, timer)| *timer == id).copied();
        key.map(|key| self.queue.remove(&key).is_some()).unwrap_or(false)
    }

    /// Pop the earliest task due at or before `until`, moving the clock to it
    pub fn pop_due(&mut self, until: Duration) -> Option<(TimerId, Task)> {
        let (&(due, id), _) = self.queue.iter().next()?;
        if due > until {
            return None;
        }
        let task = self.queue.remove(&(due, id))?;
        self.now = self.now.max(due);
        Some((id, task))
    }

    pub fn set_now(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
