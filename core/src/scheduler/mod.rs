//! Cooldown and effect scheduling
//!
//! The scheduler owns the per-event runtime state the registry does not:
//! which timed effects are currently running and which events are on
//! cooldown. `Scheduler::tick` is the only entry point; the session loop
//! calls it on a fixed interval.

mod active;
mod tick;


pub use active::{CooldownEntry, RunningTimed};
pub use tick::Scheduler;
