//! Tests for the chat connection driver over an in-memory pipe

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use super::chat::{ChatConfig, ConnectionEnd, drive_connection};

fn make_config() -> ChatConfig {
    ChatConfig {
        server: "irc.chat.twitch.tv".to_string(),
        port: 6667,
        token: "tok123".to_string(),
        login: "streamerguy".to_string(),
    }
}

#[tokio::test]
async fn test_login_join_and_relay_both_directions() {
    let (client_io, server_io) = tokio::io::duplex(4096);
    let (inbound_tx, mut inbound_rx) = mpsc::channel(16);
    let (outbound_tx, outbound_rx) = mpsc::channel(16);

    let driver = tokio::spawn(async move {
        let mut outbound_rx = outbound_rx;
        drive_connection(client_io, &make_config(), &inbound_tx, &mut outbound_rx).await
    });

    let (server_read, mut server_write) = tokio::io::split(server_io);
    let mut server_lines = BufReader::new(server_read).lines();

    // Login and join, in order, then the join announcement
    let expected = [
        "PASS oauth:tok123",
        "NICK streamerguy",
        "JOIN #streamerguy",
        "PRIVMSG #streamerguy :ModBot Connected.",
    ];
    for want in expected {
        let line = server_lines.next_line().await.unwrap().unwrap();
        assert_eq!(line, want);
    }

    // Inbound privmsg is normalized and handed to the session
    server_write
        .write_all(b":viewer!viewer@viewer.tmi.twitch.tv PRIVMSG #streamerguy :!events\r\n")
        .await
        .unwrap();
    let msg = inbound_rx.recv().await.unwrap();
    assert_eq!(msg.user, "viewer");
    assert_eq!(msg.trigger_text, "!events");
    assert_eq!(msg.payload_text, None);

    // Keepalive is answered without involving the session
    server_write.write_all(b"PING :tmi.twitch.tv\r\n").await.unwrap();
    let line = server_lines.next_line().await.unwrap().unwrap();
    assert_eq!(line, "PONG :tmi.twitch.tv");

    // Outbound replies become privmsgs on the joined channel
    outbound_tx
        .send("[ Laser ]: 150 bits".to_string())
        .await
        .unwrap();
    let line = server_lines.next_line().await.unwrap().unwrap();
    assert_eq!(line, "PRIVMSG #streamerguy :[ Laser ]: 150 bits");

    // Server hangup surfaces as a reconnectable end
    drop(server_write);
    drop(server_lines);
    let end = driver.await.unwrap().unwrap();
    assert_eq!(end, ConnectionEnd::ServerClosed);
}

#[tokio::test]
async fn test_session_shutdown_stops_the_driver() {
    let (client_io, server_io) = tokio::io::duplex(4096);
    let (inbound_tx, _inbound_rx) = mpsc::channel(16);
    let (outbound_tx, outbound_rx) = mpsc::channel::<String>(16);

    let driver = tokio::spawn(async move {
        let mut outbound_rx = outbound_rx;
        drive_connection(client_io, &make_config(), &inbound_tx, &mut outbound_rx).await
    });

    // Swallow the login traffic so the writes do not block
    let (server_read, _server_write) = tokio::io::split(server_io);
    let mut server_lines = BufReader::new(server_read).lines();
    for _ in 0..4 {
        server_lines.next_line().await.unwrap().unwrap();
    }

    drop(outbound_tx);
    let end = driver.await.unwrap().unwrap();
    assert_eq!(end, ConnectionEnd::SessionClosed);
}

#[tokio::test]
async fn test_non_privmsg_lines_are_ignored() {
    let (client_io, server_io) = tokio::io::duplex(4096);
    let (inbound_tx, mut inbound_rx) = mpsc::channel(16);
    let (_outbound_tx, outbound_rx) = mpsc::channel::<String>(16);

    tokio::spawn(async move {
        let mut outbound_rx = outbound_rx;
        drive_connection(client_io, &make_config(), &inbound_tx, &mut outbound_rx).await
    });

    let (server_read, mut server_write) = tokio::io::split(server_io);
    let mut server_lines = BufReader::new(server_read).lines();
    for _ in 0..4 {
        server_lines.next_line().await.unwrap().unwrap();
    }

    server_write
        .write_all(
            b":tmi.twitch.tv 001 streamerguy :Welcome, GLHF!\r\n\
              :viewer!viewer@viewer.tmi.twitch.tv JOIN #streamerguy\r\n\
              :viewer!viewer@viewer.tmi.twitch.tv PRIVMSG #streamerguy :hello\r\n",
        )
        .await
        .unwrap();

    // Only the privmsg comes through
    let msg = inbound_rx.recv().await.unwrap();
    assert_eq!(msg.trigger_text, "hello");
    assert!(inbound_rx.try_recv().is_err());
}
