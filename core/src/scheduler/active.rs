//! Runtime scheduler state
//!
//! Entries capture their durations at creation. An event can be
//! unregistered while its running period or cooldown is in flight; the
//! entry keeps counting down with the values it was admitted under.

use std::time::{Duration, Instant};

/// A timed event currently in its running period
#[derive(Debug, Clone)]
pub struct RunningTimed {
    pub started_at: Instant,
    pub duration: Duration,

    /// Cooldown to start once the running period ends
    pub cooldown: Duration,
}

impl RunningTimed {
    pub fn new(started_at: Instant, duration: Duration, cooldown: Duration) -> Self {
        Self {
            started_at,
            duration,
            cooldown,
        }
    }

    pub fn has_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started_at) >= self.duration
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.duration
            .saturating_sub(now.saturating_duration_since(self.started_at))
    }
}

/// An event serving out its cooldown
#[derive(Debug, Clone)]
pub struct CooldownEntry {
    pub started_at: Instant,
    pub duration: Duration,
}

impl CooldownEntry {
    pub fn new(started_at: Instant, duration: Duration) -> Self {
        Self {
            started_at,
            duration,
        }
    }

    pub fn has_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started_at) >= self.duration
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.duration
            .saturating_sub(now.saturating_duration_since(self.started_at))
    }
}
