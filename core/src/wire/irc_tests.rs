//! Tests for the IRC line codec

use super::irc::{self, ChatLine};

#[test]
fn test_ping_line() {
    assert_eq!(irc::parse_line("PING :tmi.twitch.tv"), ChatLine::Ping);
}

#[test]
fn test_privmsg_parses_user_host_channel_text() {
    let line = ":nightbot!nightbot@nightbot.tmi.twitch.tv PRIVMSG #streamerguy :!events";
    assert_eq!(
        irc::parse_line(line),
        ChatLine::Privmsg {
            user: "nightbot".to_string(),
            host: "nightbot.tmi.twitch.tv".to_string(),
            channel: "streamerguy".to_string(),
            text: "!events".to_string(),
        }
    );
}

#[test]
fn test_privmsg_text_keeps_inner_colons() {
    let line = ":viewer!viewer@viewer.tmi.twitch.tv PRIVMSG #chan :gg: that was close :)";
    match irc::parse_line(line) {
        ChatLine::Privmsg { text, .. } => assert_eq!(text, "gg: that was close :)"),
        other => panic!("expected privmsg, got {other:?}"),
    }
}

#[test]
fn test_join_echo_is_other() {
    let line = ":viewer!viewer@viewer.tmi.twitch.tv JOIN #streamerguy";
    assert_eq!(irc::parse_line(line), ChatLine::Other);
}

#[test]
fn test_server_numeric_is_other() {
    let line = ":tmi.twitch.tv 001 streamerguy :Welcome, GLHF!";
    assert_eq!(irc::parse_line(line), ChatLine::Other);
}

#[test]
fn test_outbound_line_shapes() {
    assert_eq!(irc::pass("abc123"), "PASS oauth:abc123");
    assert_eq!(irc::nick("StreamerGuy"), "NICK streamerguy");
    assert_eq!(irc::join("StreamerGuy"), "JOIN #streamerguy");
    assert_eq!(irc::part("streamerguy"), "PART #streamerguy");
    assert_eq!(
        irc::privmsg("streamerguy", "[ Laser ]: 150 bits"),
        "PRIVMSG #streamerguy :[ Laser ]: 150 bits"
    );
    assert_eq!(irc::pong(), "PONG :tmi.twitch.tv");
}
