//! Application configuration
//!
//! confy-backed TOML under the platform config directory. Every field has a
//! serde default so a config written by an older build still loads.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::trigger::AuthPolicy;

pub const APP_NAME: &str = "chatfx";
const CONFIG_NAME: &str = "config";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration")]
    Load {
        #[source]
        source: confy::ConfyError,
    },

    #[error("failed to save configuration")]
    Store {
        #[source]
        source: confy::ConfyError,
    },

    #[error("tips pattern does not compile")]
    InvalidTipsPattern {
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Account whose messages are trusted like the streamer's. Tip alerts
    /// usually arrive from a relay bot posting in chat.
    #[serde(default = "default_bot_name")]
    pub bot_name: String,

    /// Tip alert pattern. Must expose `user` and `donation` named groups.
    #[serde(default = "default_tips_pattern")]
    pub tips_pattern: String,

    #[serde(default)]
    pub authorized_moderators: Vec<String>,

    /// OAuth application client id. Required for `chatfx run`.
    #[serde(default)]
    pub client_id: String,

    #[serde(default = "default_chat_server")]
    pub chat_server: String,

    #[serde(default = "default_chat_port")]
    pub chat_port: u16,

    #[serde(default = "default_pubsub_url")]
    pub pubsub_url: String,

    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Invocations queued beyond this bound are dropped.
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,

    /// Bit cost applied to the `HypeTrain` event while a train is active.
    /// 0 keeps it name-only even during a train.
    #[serde(default)]
    pub hype_train_event_cost: u32,

    /// Event catalog the standalone binary registers at startup.
    #[serde(default = "default_events_file")]
    pub events_file: String,
}

fn default_bot_name() -> String {
    "Streamlabs".to_string()
}

fn default_tips_pattern() -> String {
    "(?<user>.*) just tipped (?<donation>.*)!".to_string()
}

fn default_chat_server() -> String {
    "irc.chat.twitch.tv".to_string()
}

fn default_chat_port() -> u16 {
    6667
}

fn default_pubsub_url() -> String {
    "wss://pubsub-edge.twitch.tv".to_string()
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_max_pending() -> usize {
    128
}

fn default_events_file() -> String {
    "events.toml".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bot_name: default_bot_name(),
            tips_pattern: default_tips_pattern(),
            authorized_moderators: Vec::new(),
            client_id: String::new(),
            chat_server: default_chat_server(),
            chat_port: default_chat_port(),
            pubsub_url: default_pubsub_url(),
            tick_interval_ms: default_tick_interval_ms(),
            max_pending: default_max_pending(),
            hype_train_event_cost: 0,
            events_file: default_events_file(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        confy::load(APP_NAME, CONFIG_NAME).map_err(|source| ConfigError::Load { source })
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, CONFIG_NAME, self).map_err(|source| ConfigError::Store { source })
    }

    /// Where `load` and `save` read and write on this platform.
    pub fn path() -> Result<PathBuf, ConfigError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
            .map_err(|source| ConfigError::Load { source })
    }

    /// Auth policy for a session on `streamer`'s channel.
    pub fn auth_policy(&self, streamer: &str) -> AuthPolicy {
        AuthPolicy::new(
            streamer,
            self.bot_name.clone(),
            self.authorized_moderators.clone(),
        )
    }
}
