//! Trigger rule matching
//!
//! Turns normalized messages into queueable intents. Chat rules run in a
//! fixed priority order; anything that matches no rule is dropped without a
//! reply. Pub/sub deliveries bypass the chat rules entirely and dispatch by
//! topic.

use regex::Regex;
use tracing::warn;

use crate::config::ConfigError;
use crate::events::EventRegistry;

use super::NormalizedMessage;

/// Banner the platform chat bot posts when a hype train reaches level 5.
const HYPE_LEVEL5_BANNER: &str = "WE DID IT! WE HIT A LEVEL 5 HYPE TRAIN!";

/// Synthetic event looked up when the level-5 banner lands in chat.
const HYPE_LEVEL5_EVENT: &str = "HypeTrainLevel5Complete";
const HYPE_LEVEL5_INVOKER: &str = "HypeTrain 5 Complete!!!";

/// Outbound chat capability, injected by the session.
pub trait ReplySink {
    fn reply(&mut self, line: String);
}

/// Collector sink for tests and dry runs.
impl ReplySink for Vec<String> {
    fn reply(&mut self, line: String) {
        self.push(line);
    }
}

/// Who may trigger events from chat.
///
/// All three roles compare case-insensitively with surrounding whitespace
/// ignored. Unauthorized messages are dropped silently.
#[derive(Debug, Clone, Default)]
pub struct AuthPolicy {
    pub streamer: String,
    pub bot: String,
    pub moderators: Vec<String>,
}

impl AuthPolicy {
    pub fn new(
        streamer: impl Into<String>,
        bot: impl Into<String>,
        moderators: Vec<String>,
    ) -> Self {
        Self {
            streamer: streamer.into(),
            bot: bot.into(),
            moderators,
        }
    }

    pub fn is_authorized(&self, user: &str) -> bool {
        let user = user.trim().to_lowercase();
        user == self.streamer.trim().to_lowercase()
            || user == self.bot.trim().to_lowercase()
            || self
                .moderators
                .iter()
                .any(|m| m.trim().to_lowercase() == user)
    }
}

/// What a matched rule wants queued
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Direct lookup of a registered event ID
    Named { id: String, invoker: String },

    /// Amount-based selection over biddable events
    Amount { bits: u32, invoker: String },
}

/// Priority-ordered rule matcher for chat and pub/sub messages.
pub struct TriggerParser {
    auth: AuthPolicy,
    tips_pattern: Regex,
    points_topic: String,
    subs_topic: String,
    bits_topic: String,
}

impl TriggerParser {
    /// Compile the tips pattern and pre-build the pub/sub topic tags for
    /// `channel_id`. The pattern must expose `user` and `donation` named
    /// capture groups.
    pub fn new(
        auth: AuthPolicy,
        channel_id: &str,
        tips_pattern: &str,
    ) -> Result<Self, ConfigError> {
        let tips_pattern = Regex::new(tips_pattern)
            .map_err(|source| ConfigError::InvalidTipsPattern { source })?;

        Ok(Self {
            auth,
            tips_pattern,
            points_topic: format!("channel-points-channel-v1.{channel_id}"),
            subs_topic: format!("channel-subscribe-events-v1.{channel_id}"),
            bits_topic: format!("channel-bits-events-v2.{channel_id}"),
        })
    }

    pub fn auth(&self) -> &AuthPolicy {
        &self.auth
    }

    /// Run the chat rules against a message.
    ///
    /// Rule order:
    /// 1. `!events` price listing (public, no auth)
    /// 2. authorization gate
    /// 3. `!allevents` full listing
    /// 4. level-5 hype train banner
    /// 5. configurable tips pattern
    /// 6. `!` trigger commands
    ///
    /// Listing replies go through `reply`. A returned intent still has to
    /// pass dispatch lookup before anything is queued.
    pub fn parse_chat(
        &self,
        msg: &NormalizedMessage,
        registry: &EventRegistry,
        reply: &mut dyn ReplySink,
    ) -> Option<Intent> {
        let text = msg.trigger_text.trim();

        if text.eq_ignore_ascii_case("!events") {
            for line in registry.price_lines() {
                reply.reply(line);
            }
            return None;
        }

        if !self.auth.is_authorized(&msg.user) {
            return None;
        }

        if text.eq_ignore_ascii_case("!allevents") {
            for line in registry.catalog_lines() {
                reply.reply(line);
            }
            return None;
        }

        if text.contains(HYPE_LEVEL5_BANNER) {
            return Some(Intent::Named {
                id: HYPE_LEVEL5_EVENT.to_string(),
                invoker: HYPE_LEVEL5_INVOKER.to_string(),
            });
        }

        if let Some(caps) = self.tips_pattern.captures(text) {
            return self.tip_intent(&caps, text);
        }

        if text.starts_with('!') {
            return self.command_intent(msg, text, registry);
        }

        None
    }

    /// Direct dispatch for pub/sub deliveries, keyed by topic.
    ///
    /// Point redemptions and subscriptions look up the reward title / sub
    /// plan by name; bits deliveries carry the amount as text.
    pub fn parse_pubsub(&self, msg: &NormalizedMessage) -> Option<Intent> {
        if msg.host == self.points_topic || msg.host == self.subs_topic {
            return Some(Intent::Named {
                id: msg.trigger_text.clone(),
                invoker: msg.user.clone(),
            });
        }

        if msg.host == self.bits_topic {
            return match msg.trigger_text.trim().parse::<u32>() {
                Ok(bits) => Some(Intent::Amount {
                    bits,
                    invoker: msg.user.clone(),
                }),
                Err(_) => {
                    warn!(amount = %msg.trigger_text, "bits delivery with unparseable amount");
                    None
                }
            };
        }

        None
    }

    fn tip_intent(&self, caps: &regex::Captures<'_>, text: &str) -> Option<Intent> {
        let user = caps
            .name("user")
            .map(|m| m.as_str().trim())
            .unwrap_or_default();
        let raw_amount = caps.name("donation").map(|m| m.as_str()).unwrap_or_default();

        let cleaned: String = raw_amount
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        // floor, not round: a $12.34 tip is worth exactly 1234 bits
        let amount = match cleaned.parse::<f64>() {
            Ok(v) => v,
            Err(_) => {
                warn!(message = %text, "tip matched but amount failed to parse");
                return None;
            }
        };

        Some(Intent::Amount {
            bits: (amount * 100.0).floor() as u32,
            invoker: user.to_string(),
        })
    }

    /// `!` commands, split on `/`:
    /// - `!eLaser`, `!b500`, `!$4.99` (mode char after the bang)
    /// - `!Invoker/500` or `!Invoker/Laser`
    /// - `!Invoker/bits/500`, `!Invoker/event/Laser` (`b` and `e` also work)
    fn command_intent(
        &self,
        msg: &NormalizedMessage,
        text: &str,
        registry: &EventRegistry,
    ) -> Option<Intent> {
        let segments: Vec<&str> = text.split('/').collect();

        match segments.len() {
            1 => {
                let mut chars = segments[0].chars();
                chars.next(); // the bang
                let mode = chars.next()?;
                let value = chars.as_str();
                self.mode_intent(mode, value, msg.user.clone(), text)
            }
            2 => {
                let invoker = segments[0].replace('!', "");
                let value = segments[1].trim();

                if let Ok(bits) = value.parse::<u32>() {
                    return Some(Intent::Amount { bits, invoker });
                }
                if registry.contains(value) {
                    return Some(Intent::Named {
                        id: value.to_string(),
                        invoker,
                    });
                }
                warn!(event_id = %value, "trigger for unknown event dropped");
                None
            }
            3 => {
                let invoker = segments[0].replace('!', "");
                match segments[1] {
                    "event" | "e" => Some(Intent::Named {
                        id: segments[2].to_string(),
                        invoker,
                    }),
                    "bits" | "b" => match segments[2].trim().parse::<u32>() {
                        Ok(bits) => Some(Intent::Amount { bits, invoker }),
                        Err(_) => {
                            warn!(amount = %segments[2], "trigger with unparseable bits amount");
                            None
                        }
                    },
                    other => {
                        warn!(selector = %other, "unknown trigger selector");
                        None
                    }
                }
            }
            n => {
                warn!(segments = n, message = %text, "malformed trigger command");
                None
            }
        }
    }

    fn mode_intent(&self, mode: char, value: &str, invoker: String, text: &str) -> Option<Intent> {
        match mode {
            'e' => Some(Intent::Named {
                id: value.to_string(),
                invoker,
            }),
            'b' => match value.trim().parse::<u32>() {
                Ok(bits) => Some(Intent::Amount { bits, invoker }),
                Err(_) => {
                    warn!(message = %text, "trigger with unparseable bits amount");
                    None
                }
            },
            '$' => match value.trim().parse::<f64>() {
                Ok(amount) => Some(Intent::Amount {
                    bits: (amount * 100.0).floor() as u32,
                    invoker,
                }),
                Err(_) => {
                    warn!(message = %text, "trigger with unparseable dollar amount");
                    None
                }
            },
            other => {
                warn!(mode = %other, "unknown trigger mode");
                None
            }
        }
    }
}
