//! Trigger parsing
//!
//! This module turns raw viewer input into dispatchable intents:
//! - **Message**: the transport-neutral inbound shape
//! - **Parser**: priority-ordered chat rules plus topic-keyed pub/sub rules
//! - **AuthPolicy**: who may trigger events from chat

mod message;
mod parser;


pub use message::NormalizedMessage;
pub use parser::{AuthPolicy, Intent, ReplySink, TriggerParser};
