//! Invocation dispatch
//!
//! The bridge between matched triggers and the scheduler: lookups resolve
//! an intent against the registry and append to the bounded pending queue.

mod queue;


pub use queue::{DispatchQueue, QueuedInvocation};
