//! Pub/sub envelope codec
//!
//! Twitch wraps every notification twice: an outer frame with a type tag
//! and topic, and an inner JSON document serialized as a string. Decoding
//! peels both layers and reduces the payloads the session reacts to into
//! [`NormalizedMessage`] deliveries or hype-train phases.

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};

use crate::controller::HypePhase;
use crate::trigger::NormalizedMessage;

/// Topic families the session subscribes to
const TOPIC_FAMILIES: [&str; 4] = [
    "channel-points-channel-v1",
    "channel-bits-events-v2",
    "channel-subscribe-events-v1",
    "hype-train-events-v1",
];

/// One decoded text frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PubSubEvent {
    Pong,

    /// Server asks for a reconnect within 30 seconds
    Reconnect,

    /// Answer to a LISTEN request; `error` is set when the listen failed
    ListenAck {
        nonce: Option<String>,
        error: Option<String>,
    },

    /// A notification reduced to the shape the trigger rules consume
    Delivery(NormalizedMessage),

    HypeTrain(HypePhase),

    /// Recognized but irrelevant (progress updates, unknown types)
    Ignored,
}

// ─────────────────────────────────────────────────────────────────────────────
// Decoding
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Frame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    nonce: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<FrameData>,
}

#[derive(Debug, Deserialize)]
struct FrameData {
    topic: String,
    message: String,
}

/// Type tag shared by inner documents that are dispatched on `type` alone
#[derive(Debug, Deserialize)]
struct TypeTag {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct SubEvent {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    user_name: String,
    sub_plan: String,
    #[serde(default)]
    is_gift: bool,
    #[serde(default)]
    recipient_display_name: String,
    #[serde(default)]
    sub_message: SubMessage,
}

#[derive(Debug, Default, Deserialize)]
struct SubMessage {
    #[serde(default)]
    message: String,
}

impl SubEvent {
    fn into_message(self, topic: &str) -> NormalizedMessage {
        // Gift subs credit the recipient, not the buyer
        let user = if self.is_gift && !self.user_name.is_empty() {
            self.recipient_display_name
        } else {
            self.display_name
        };
        NormalizedMessage {
            user,
            trigger_text: self.sub_plan,
            host: topic.to_string(),
            payload_text: non_empty(self.sub_message.message),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BitsEvent {
    #[serde(default)]
    is_anonymous: bool,
    data: BitsData,
}

#[derive(Debug, Deserialize)]
struct BitsData {
    #[serde(default)]
    user_name: Option<String>,
    bits_used: u32,
    #[serde(default)]
    chat_message: String,
}

impl BitsEvent {
    fn into_message(self, topic: &str) -> NormalizedMessage {
        let user = match (self.is_anonymous, self.data.user_name) {
            (false, Some(name)) => name,
            _ => "Anonymous".to_string(),
        };
        NormalizedMessage {
            user,
            trigger_text: self.data.bits_used.to_string(),
            host: topic.to_string(),
            payload_text: non_empty(self.data.chat_message),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PointsEvent {
    data: PointsData,
}

#[derive(Debug, Deserialize)]
struct PointsData {
    redemption: Redemption,
}

#[derive(Debug, Deserialize)]
struct Redemption {
    user: RedeemingUser,
    reward: Reward,
    #[serde(default)]
    user_input: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RedeemingUser {
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct Reward {
    title: String,
}

impl PointsEvent {
    fn into_message(self, topic: &str) -> NormalizedMessage {
        NormalizedMessage {
            user: self.data.redemption.user.display_name,
            trigger_text: self.data.redemption.reward.title,
            host: topic.to_string(),
            payload_text: self.data.redemption.user_input.and_then(non_empty),
        }
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}

/// Decode one text frame.
pub fn decode(frame: &str) -> Result<PubSubEvent, serde_json::Error> {
    let frame: Frame = serde_json::from_str(frame)?;
    match frame.kind.as_str() {
        "PONG" => Ok(PubSubEvent::Pong),
        "RECONNECT" => Ok(PubSubEvent::Reconnect),
        "RESPONSE" => Ok(PubSubEvent::ListenAck {
            nonce: frame.nonce,
            error: frame.error.filter(|error| !error.is_empty()),
        }),
        "MESSAGE" => match frame.data {
            Some(data) => decode_delivery(&data.topic, &data.message),
            None => Ok(PubSubEvent::Ignored),
        },
        _ => Ok(PubSubEvent::Ignored),
    }
}

fn decode_delivery(topic: &str, inner: &str) -> Result<PubSubEvent, serde_json::Error> {
    let family = topic.split('.').next().unwrap_or(topic);
    match family {
        "channel-subscribe-events-v1" => {
            let event: SubEvent = serde_json::from_str(inner)?;
            Ok(PubSubEvent::Delivery(event.into_message(topic)))
        }
        "channel-bits-events-v2" => {
            let event: BitsEvent = serde_json::from_str(inner)?;
            Ok(PubSubEvent::Delivery(event.into_message(topic)))
        }
        "channel-points-channel-v1" => {
            let tag: TypeTag = serde_json::from_str(inner)?;
            if tag.kind != "reward-redeemed" {
                return Ok(PubSubEvent::Ignored);
            }
            let event: PointsEvent = serde_json::from_str(inner)?;
            Ok(PubSubEvent::Delivery(event.into_message(topic)))
        }
        "hype-train-events-v1" => {
            let tag: TypeTag = serde_json::from_str(inner)?;
            Ok(match tag.kind.as_str() {
                "hype-train-start" => PubSubEvent::HypeTrain(HypePhase::Started),
                "hype-train-level-up" => PubSubEvent::HypeTrain(HypePhase::LevelUp),
                "hype-train-end" => PubSubEvent::HypeTrain(HypePhase::Ended),
                // approaching, progression, conductor updates and cooldown
                // notices carry no state the session tracks
                _ => PubSubEvent::Ignored,
            })
        }
        _ => Ok(PubSubEvent::Ignored),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Encoding
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ListenRequest {
    #[serde(rename = "type")]
    kind: &'static str,
    nonce: String,
    data: ListenData,
}

#[derive(Debug, Serialize)]
struct ListenData {
    auth_token: String,
    topics: Vec<String>,
}

/// Topics for every family the session listens on.
pub fn listen_topics(channel_id: &str) -> Vec<String> {
    TOPIC_FAMILIES
        .iter()
        .map(|family| format!("{family}.{channel_id}"))
        .collect()
}

/// Build a LISTEN frame. Returns the frame and the nonce to match the ack
/// against.
pub fn listen_request(
    channel_id: &str,
    auth_token: &str,
) -> Result<(String, String), serde_json::Error> {
    let nonce: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    let request = ListenRequest {
        kind: "LISTEN",
        nonce: nonce.clone(),
        data: ListenData {
            auth_token: auth_token.to_string(),
            topics: listen_topics(channel_id),
        },
    };
    Ok((serde_json::to_string(&request)?, nonce))
}

pub fn ping() -> &'static str {
    r#"{"type":"PING"}"#
}
