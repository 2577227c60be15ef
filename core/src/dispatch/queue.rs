//! Dispatch queue
//!
//! Matched intents become `QueuedInvocation`s here. Named lookups queue a
//! specific registered event; amount lookups select one event from the
//! biddable cost ladder. Nothing fires at queue time: admission happens in
//! the scheduler tick, so a queued invocation can wait behind a cooldown.

use std::collections::VecDeque;

use rand::Rng;
use tracing::{debug, warn};

use crate::events::EventRegistry;

/// One pending event invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedInvocation {
    pub event_id: String,
    pub invoker: String,
    /// Viewer text for data-bound events; absent payloads degrade the
    /// event to its base action at admission
    pub payload: Option<String>,
}

/// FIFO queue of invocations waiting for admission.
///
/// Duplicate event IDs are allowed; the scheduler admits them one per tick
/// as the cooldown permits. The queue is bounded so a chat flood cannot
/// grow it without limit.
#[derive(Debug)]
pub struct DispatchQueue {
    pending: VecDeque<QueuedInvocation>,
    max_pending: usize,
}

impl DispatchQueue {
    pub fn new(max_pending: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            max_pending,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedInvocation> {
        self.pending.iter()
    }

    /// Pending invocations for one event ID. Informational only: depth
    /// never blocks queueing or admission.
    pub fn queued_depth(&self, event_id: &str) -> usize {
        self.pending
            .iter()
            .filter(|inv| inv.event_id == event_id)
            .count()
    }

    /// Queue a registered event by ID. Unregistered IDs are discarded.
    pub fn lookup_named(
        &mut self,
        registry: &EventRegistry,
        id: &str,
        invoker: &str,
        payload: Option<String>,
    ) {
        let Some(def) = registry.get(id) else {
            debug!(event_id = %id, "named trigger for unregistered event ignored");
            return;
        };

        if def.is_timed() {
            debug!(
                event_id = %id,
                depth = self.queued_depth(id) + 1,
                "timed event queued"
            );
        }

        self.push(QueuedInvocation {
            event_id: id.to_string(),
            invoker: invoker.to_string(),
            payload,
        });
    }

    /// Queue the event selected by a bits amount, if any tier is
    /// affordable.
    pub fn lookup_amount(
        &mut self,
        registry: &EventRegistry,
        bits: u32,
        invoker: &str,
        payload: Option<String>,
    ) {
        let Some(id) = select_by_amount(registry, bits) else {
            debug!(bits, "no biddable event at or below amount");
            return;
        };

        // Selection only returns registered ids, so this lookup re-queues
        // through the named path for the depth bookkeeping.
        self.lookup_named(registry, &id, invoker, payload);
    }

    /// Remove and return the oldest invocation whose event passes
    /// `eligible`.
    pub(crate) fn take_first_eligible(
        &mut self,
        mut eligible: impl FnMut(&str) -> bool,
    ) -> Option<QueuedInvocation> {
        let idx = self.pending.iter().position(|inv| eligible(&inv.event_id))?;
        self.pending.remove(idx)
    }

    fn push(&mut self, inv: QueuedInvocation) {
        if self.pending.len() >= self.max_pending {
            warn!(
                event_id = %inv.event_id,
                capacity = self.max_pending,
                "pending queue full, invocation dropped"
            );
            return;
        }
        self.pending.push_back(inv);
    }
}

/// Pick the event a bits amount pays for.
///
/// The winning tier is the highest cost at or below `bits`; events tied at
/// that cost are drawn uniformly at random. An exact-cost match is the same
/// rule: the matching tier is necessarily the highest affordable one.
/// Name-only events (cost 0) never participate.
pub(crate) fn select_by_amount(registry: &EventRegistry, bits: u32) -> Option<String> {
    let target = registry
        .iter()
        .filter_map(|(_, def)| {
            (def.bit_cost > 0 && def.bit_cost <= bits).then_some(def.bit_cost)
        })
        .max()?;

    let candidates: Vec<&str> = registry
        .iter()
        .filter(|(_, def)| def.bit_cost == target)
        .map(|(id, _)| id)
        .collect();

    let pick = if candidates.len() == 1 {
        candidates[0]
    } else {
        candidates[rand::thread_rng().gen_range(0..candidates.len())]
    };

    Some(pick.to_string())
}
