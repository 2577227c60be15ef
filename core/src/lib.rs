pub mod config;
pub mod controller;
pub mod dispatch;
pub mod events;
pub mod net;
pub mod scheduler;
pub mod trigger;
pub mod wire;

// Re-exports for convenience
pub use config::{AppConfig, ConfigError};
pub use controller::{Controller, HYPE_TRAIN_EVENT, HypePhase};
pub use dispatch::{DispatchQueue, QueuedInvocation};
pub use events::{
    ActionError, CatalogEntry, CatalogError, CatalogVariant, EventDefinition, EventKind,
    EventRegistry, load_catalog, parse_catalog,
};
pub use net::{
    ChatConfig, ChatError, PubSubConfig, PubSubError, PubSubUpdate, run_chat_client,
    spawn_pubsub_client,
};
pub use scheduler::Scheduler;
pub use trigger::{AuthPolicy, Intent, NormalizedMessage, ReplySink, TriggerParser};
pub use wire::irc::ChatLine;
pub use wire::pubsub::PubSubEvent;
