//! Event definition types
//!
//! A definition binds a chat-facing event ID to the game-side callbacks it
//! fires when an invocation is admitted. Definitions are registered once and
//! live in the `EventRegistry` for the lifetime of the session.

use std::fmt;

/// Error type surfaced by event callbacks.
///
/// Callback failures are captured and logged per invocation; they never
/// abort a tick or roll back queue state.
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

/// Base callback, fired on admission: `(event_id, invoker)`.
pub type ActionFn = Box<dyn FnMut(&str, &str) -> Result<(), ActionError> + Send>;

/// Cleanup callback for timed events, fired after the running period ends.
pub type ExpireFn = Box<dyn FnMut() -> Result<(), ActionError> + Send>;

/// Payload callback, fired before the base action: `(event_id, invoker, text)`.
pub type DataFn = Box<dyn FnMut(&str, &str, &str) -> Result<(), ActionError> + Send>;

/// How an event behaves once admitted
pub enum EventKind {
    /// Fire the action, start the cooldown.
    Simple,

    /// Fire the action, stay running for `effect_secs`, then fire
    /// `on_expire` and start the cooldown.
    Timed { effect_secs: f32, on_expire: ExpireFn },

    /// Fire `on_data` with the viewer's message text (when one was carried)
    /// before the base action.
    DataBound { on_data: DataFn },
}

impl EventKind {
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Simple => "simple",
            EventKind::Timed { .. } => "timed",
            EventKind::DataBound { .. } => "data_bound",
        }
    }
}

impl fmt::Debug for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Simple => write!(f, "Simple"),
            EventKind::Timed { effect_secs, .. } => f
                .debug_struct("Timed")
                .field("effect_secs", effect_secs)
                .finish_non_exhaustive(),
            EventKind::DataBound { .. } => write!(f, "DataBound"),
        }
    }
}

/// A registered event
///
/// `bit_cost` of 0 means the event can only be triggered by name, never by
/// a bits amount. `cooldown_secs` of 0 makes the event re-admissible on the
/// tick after it fires.
pub struct EventDefinition {
    pub bit_cost: u32,
    pub cooldown_secs: f32,
    pub(crate) action: ActionFn,
    pub(crate) kind: EventKind,
}

impl EventDefinition {
    /// Plain fire-and-cooldown event
    pub fn simple(
        bit_cost: u32,
        cooldown_secs: f32,
        action: impl FnMut(&str, &str) -> Result<(), ActionError> + Send + 'static,
    ) -> Self {
        Self {
            bit_cost,
            cooldown_secs: cooldown_secs.max(0.0),
            action: Box::new(action),
            kind: EventKind::Simple,
        }
    }

    /// Event with a running period; `on_expire` fires when it ends
    pub fn timed(
        bit_cost: u32,
        cooldown_secs: f32,
        effect_secs: f32,
        action: impl FnMut(&str, &str) -> Result<(), ActionError> + Send + 'static,
        on_expire: impl FnMut() -> Result<(), ActionError> + Send + 'static,
    ) -> Self {
        Self {
            bit_cost,
            cooldown_secs: cooldown_secs.max(0.0),
            action: Box::new(action),
            kind: EventKind::Timed {
                effect_secs: effect_secs.max(0.0),
                on_expire: Box::new(on_expire),
            },
        }
    }

    /// Event that also receives the viewer's message text
    pub fn data_bound(
        bit_cost: u32,
        cooldown_secs: f32,
        action: impl FnMut(&str, &str) -> Result<(), ActionError> + Send + 'static,
        on_data: impl FnMut(&str, &str, &str) -> Result<(), ActionError> + Send + 'static,
    ) -> Self {
        Self {
            bit_cost,
            cooldown_secs: cooldown_secs.max(0.0),
            action: Box::new(action),
            kind: EventKind::DataBound {
                on_data: Box::new(on_data),
            },
        }
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut EventKind {
        &mut self.kind
    }

    /// Fire the base action callback.
    pub(crate) fn invoke(&mut self, event_id: &str, invoker: &str) -> Result<(), ActionError> {
        (self.action)(event_id, invoker)
    }

    pub fn is_timed(&self) -> bool {
        matches!(self.kind, EventKind::Timed { .. })
    }

    /// Running period for timed events, None otherwise
    pub fn effect_secs(&self) -> Option<f32> {
        match self.kind {
            EventKind::Timed { effect_secs, .. } => Some(effect_secs),
            _ => None,
        }
    }
}

impl fmt::Debug for EventDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDefinition")
            .field("bit_cost", &self.bit_cost)
            .field("cooldown_secs", &self.cooldown_secs)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
