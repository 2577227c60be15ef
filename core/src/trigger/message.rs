//! Normalized inbound messages
//!
//! Both transports reduce their wire formats to one shape before anything
//! touches the rule parser. Chat lines carry the full message text in
//! `trigger_text`; pub/sub deliveries carry the reward title, sub plan, or
//! bits amount there and keep the viewer's free text in `payload_text`.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMessage {
    /// Display or login name of whoever caused the message
    pub user: String,

    /// The text trigger rules match against
    pub trigger_text: String,

    /// Origin tag: IRC host for chat lines, topic for pub/sub deliveries
    pub host: String,

    /// Viewer-supplied text, forwarded to data-bound events
    pub payload_text: Option<String>,
}

impl NormalizedMessage {
    /// Shorthand for a chat-origin message with no payload.
    pub fn chat(
        user: impl Into<String>,
        host: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            trigger_text: text.into(),
            host: host.into(),
            payload_text: None,
        }
    }
}
