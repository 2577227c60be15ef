//! Network clients
//!
//! Two transports feed one session: the IRC chat socket (tokio) and the
//! pub/sub websocket (blocking tungstenite on its own thread). Both reduce
//! their wire formats through `crate::wire` and forward normalized events
//! over channels; neither touches engine state.

mod error;

pub mod chat;
pub mod pubsub;

#[cfg(test)]
mod chat_tests;

pub use chat::{ChatConfig, run_chat_client};
pub use error::{ChatError, PubSubError};
pub use pubsub::{PubSubConfig, PubSubUpdate, spawn_pubsub_client};
