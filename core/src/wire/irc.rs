//! IRC line codec for Twitch chat
//!
//! Only the slice of IRC the session needs: PING keepalives and PRIVMSG
//! deliveries inbound, login and channel commands outbound. Lines arrive
//! and leave without their CRLF.

/// One parsed inbound line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatLine {
    /// Server keepalive; answer with [`pong`]
    Ping,

    /// A viewer message on a joined channel
    Privmsg {
        user: String,
        host: String,
        channel: String,
        text: String,
    },

    /// Anything the session does not react to (numerics, JOIN echoes, ...)
    Other,
}

/// Parse one inbound line.
///
/// The privmsg form is `:<nick>!<user>@<host> PRIVMSG #<channel> :<text>`.
pub fn parse_line(line: &str) -> ChatLine {
    if line.starts_with("PING") {
        return ChatLine::Ping;
    }

    let Some(rest) = line.strip_prefix(':') else {
        return ChatLine::Other;
    };
    let Some((prefix, rest)) = rest.split_once(' ') else {
        return ChatLine::Other;
    };
    let Some(rest) = rest.strip_prefix("PRIVMSG #") else {
        return ChatLine::Other;
    };
    let Some((channel, text)) = rest.split_once(" :") else {
        return ChatLine::Other;
    };
    let Some((user, address)) = prefix.split_once('!') else {
        return ChatLine::Other;
    };
    let Some((_, host)) = address.split_once('@') else {
        return ChatLine::Other;
    };

    ChatLine::Privmsg {
        user: user.to_string(),
        host: host.to_string(),
        channel: channel.to_string(),
        text: text.to_string(),
    }
}

pub fn pass(token: &str) -> String {
    format!("PASS oauth:{token}")
}

pub fn nick(login: &str) -> String {
    format!("NICK {}", login.to_lowercase())
}

pub fn join(channel: &str) -> String {
    format!("JOIN #{}", channel.to_lowercase())
}

pub fn part(channel: &str) -> String {
    format!("PART #{}", channel.to_lowercase())
}

pub fn privmsg(channel: &str, text: &str) -> String {
    format!("PRIVMSG #{} :{text}", channel.to_lowercase())
}

pub fn pong() -> &'static str {
    "PONG :tmi.twitch.tv"
}
