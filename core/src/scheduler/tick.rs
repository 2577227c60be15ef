//! The scheduler tick
//!
//! Each tick runs four phases in a fixed order: expire running timed
//! effects, expire cooldowns, drain queued cleanup callbacks, admit at
//! most one pending invocation. State transitions commit before their
//! callbacks fire and are never rolled back when a callback fails.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::dispatch::DispatchQueue;
use crate::events::{EventKind, EventRegistry};

use super::active::{CooldownEntry, RunningTimed};

#[derive(Debug, Default)]
pub struct Scheduler {
    running: HashMap<String, RunningTimed>,
    cooldowns: HashMap<String, CooldownEntry>,
    cleanup: VecDeque<String>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self, event_id: &str) -> bool {
        self.running.contains_key(event_id)
    }

    pub fn on_cooldown(&self, event_id: &str) -> bool {
        self.cooldowns.contains_key(event_id)
    }

    pub fn cooldown_remaining(&self, event_id: &str, now: Instant) -> Option<Duration> {
        self.cooldowns.get(event_id).map(|entry| entry.remaining(now))
    }

    pub fn running_remaining(&self, event_id: &str, now: Instant) -> Option<Duration> {
        self.running.get(event_id).map(|entry| entry.remaining(now))
    }

    pub fn running_ids(&self) -> impl Iterator<Item = &str> {
        self.running.keys().map(String::as_str)
    }

    pub fn cooldown_ids(&self) -> impl Iterator<Item = &str> {
        self.cooldowns.keys().map(String::as_str)
    }

    /// Advance the scheduler to `now`.
    pub fn tick(&mut self, now: Instant, queue: &mut DispatchQueue, registry: &mut EventRegistry) {
        self.expire_running(now);
        self.expire_cooldowns(now);
        self.drain_cleanup(registry);
        self.admit_one(now, queue, registry);
    }

    /// Phase 1: a running period that ended moves the event onto its
    /// cooldown and queues the cleanup callback.
    fn expire_running(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .running
            .iter()
            .filter(|(_, entry)| entry.has_expired(now))
            .map(|(id, _)| id.clone())
            .collect();

        for id in expired {
            if let Some(entry) = self.running.remove(&id) {
                debug!(event_id = %id, "timed effect ended");
                self.cooldowns
                    .insert(id.clone(), CooldownEntry::new(now, entry.cooldown));
                self.cleanup.push_back(id);
            }
        }
    }

    /// Phase 2: drop cooldowns that have served their full duration.
    fn expire_cooldowns(&mut self, now: Instant) {
        self.cooldowns.retain(|id, entry| {
            let live = !entry.has_expired(now);
            if !live {
                debug!(event_id = %id, "cooldown over");
            }
            live
        });
    }

    /// Phase 3: run queued cleanup callbacks in FIFO order. A failing
    /// callback is logged and the rest still run.
    fn drain_cleanup(&mut self, registry: &mut EventRegistry) {
        while let Some(id) = self.cleanup.pop_front() {
            let Some(definition) = registry.get_mut(&id) else {
                warn!(event_id = %id, "cleanup skipped, event no longer registered");
                continue;
            };
            let EventKind::Timed { on_expire, .. } = definition.kind_mut() else {
                warn!(event_id = %id, "cleanup skipped, event is not timed");
                continue;
            };
            if let Err(error) = on_expire() {
                warn!(event_id = %id, %error, "cleanup callback failed");
            }
        }
    }

    /// Phase 4: admit the oldest queued invocation whose event is
    /// neither running nor on cooldown. At most one per tick.
    fn admit_one(&mut self, now: Instant, queue: &mut DispatchQueue, registry: &mut EventRegistry) {
        let eligible = queue.take_first_eligible(|id| {
            !self.running.contains_key(id) && !self.cooldowns.contains_key(id)
        });
        let Some(invocation) = eligible else {
            return;
        };

        let Some(definition) = registry.get_mut(&invocation.event_id) else {
            warn!(
                event_id = %invocation.event_id,
                "queued event no longer registered, invocation dropped"
            );
            return;
        };

        let cooldown = Duration::from_secs_f32(definition.cooldown_secs);
        debug!(
            event_id = %invocation.event_id,
            invoker = %invocation.invoker,
            kind = definition.kind().label(),
            "invocation admitted"
        );

        match definition.kind_mut() {
            EventKind::Timed { effect_secs, .. } => {
                let duration = Duration::from_secs_f32(*effect_secs);
                self.running.insert(
                    invocation.event_id.clone(),
                    RunningTimed::new(now, duration, cooldown),
                );
            }
            EventKind::Simple | EventKind::DataBound { .. } => {
                self.cooldowns
                    .insert(invocation.event_id.clone(), CooldownEntry::new(now, cooldown));
            }
        }

        if let EventKind::DataBound { on_data } = definition.kind_mut() {
            if let Some(payload) = invocation.payload.as_deref() {
                if let Err(error) = on_data(&invocation.event_id, &invocation.invoker, payload) {
                    warn!(
                        event_id = %invocation.event_id,
                        %error,
                        "data callback failed"
                    );
                }
            }
        }

        if let Err(error) = definition.invoke(&invocation.event_id, &invocation.invoker) {
            warn!(
                event_id = %invocation.event_id,
                %error,
                "action callback failed"
            );
        }
    }
}
