//! Dispatch Throttle
//!
//! A rolling one-minute budget on dispatched alerts. It bounds alert loops
//! whose links are not tied to the originating task, such as a channel
//! adapter that spawns a task to report its own failure.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
pub struct DispatchThrottle {
    fired: Mutex<VecDeque<Instant>>,
}

impl DispatchThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        self.fired.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take one slot from the budget. Returns `false` when the last minute
    /// already holds `limit` dispatches. A limit of 0 never throttles.
    pub fn try_acquire(&self, limit: u32) -> bool {
        let now = Instant::now();
        let mut fired = self.lock();

        while fired
            .front()
            .map_or(false, |t| now.saturating_duration_since(*t) >= WINDOW)
        {
            fired.pop_front();
        }

        if limit == 0 {
            return true;
        }
        if fired.len() >= limit as usize {
            return false;
        }
        fired.push_back(now);
        true
    }

    /// Dispatches counted in the current window
    pub fn in_window(&self) -> usize {
        self.lock().len()
    }
}
