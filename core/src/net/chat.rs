//! Twitch chat client
//!
//! Plain IRC over TCP. The driver is generic over the stream so tests can
//! run it against an in-memory duplex pipe; `run_chat_client` adds the
//! connect-and-retry loop around it.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::trigger::NormalizedMessage;
use crate::wire::irc::{self, ChatLine};

use super::error::ChatError;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub server: String,
    pub port: u16,
    /// OAuth access token, without the `oauth:` prefix
    pub token: String,
    /// Login name; also the channel the session joins
    pub login: String,
}

/// Why a connection stopped
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ConnectionEnd {
    /// The session dropped its channel ends; no reconnect
    SessionClosed,
    /// The server closed the stream; reconnect applies
    ServerClosed,
}

/// Connect, log in and relay until the session ends.
///
/// Inbound privmsgs go out through `inbound`; lines arriving on `outbound`
/// are sent to the joined channel. Reconnects use a doubling backoff capped
/// at one minute.
pub async fn run_chat_client(
    config: ChatConfig,
    inbound: mpsc::Sender<NormalizedMessage>,
    mut outbound: mpsc::Receiver<String>,
) {
    let address = format!("{}:{}", config.server, config.port);
    let mut backoff = INITIAL_BACKOFF;

    loop {
        match TcpStream::connect(&address).await {
            Ok(stream) => {
                info!(%address, "chat connected");
                backoff = INITIAL_BACKOFF;
                match drive_connection(stream, &config, &inbound, &mut outbound).await {
                    Ok(ConnectionEnd::SessionClosed) => return,
                    Ok(ConnectionEnd::ServerClosed) => warn!("chat connection closed"),
                    Err(error) => warn!(%error, "chat connection failed"),
                }
            }
            Err(source) => {
                let error = ChatError::Connect {
                    address: address.clone(),
                    source,
                };
                warn!(%error, "chat connect failed");
            }
        }

        if inbound.is_closed() {
            return;
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

/// Log in, join, then relay both directions until one side ends.
pub(crate) async fn drive_connection<S>(
    stream: S,
    config: &ChatConfig,
    inbound: &mpsc::Sender<NormalizedMessage>,
    outbound: &mut mpsc::Receiver<String>,
) -> Result<ConnectionEnd, ChatError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut lines = BufReader::new(read_half).lines();

    write_line(&mut write_half, &irc::pass(&config.token)).await?;
    write_line(&mut write_half, &irc::nick(&config.login)).await?;
    write_line(&mut write_half, &irc::join(&config.login)).await?;
    write_line(
        &mut write_half,
        &irc::privmsg(&config.login, "ModBot Connected."),
    )
    .await?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = line.map_err(|source| ChatError::Io { source })?;
                let Some(line) = line else {
                    return Ok(ConnectionEnd::ServerClosed);
                };
                match irc::parse_line(&line) {
                    ChatLine::Ping => {
                        write_line(&mut write_half, irc::pong()).await?;
                    }
                    ChatLine::Privmsg { user, host, text, .. } => {
                        let msg = NormalizedMessage::chat(user, host, text);
                        if inbound.send(msg).await.is_err() {
                            return Ok(ConnectionEnd::SessionClosed);
                        }
                    }
                    ChatLine::Other => {}
                }
            }
            outgoing = outbound.recv() => {
                match outgoing {
                    Some(text) => {
                        write_line(
                            &mut write_half,
                            &irc::privmsg(&config.login, &text),
                        )
                        .await?;
                    }
                    None => return Ok(ConnectionEnd::SessionClosed),
                }
            }
        }
    }
}

async fn write_line<W>(writer: &mut W, line: &str) -> Result<(), ChatError>
where
    W: AsyncWrite + Unpin,
{
    let send = async {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\r\n").await?;
        writer.flush().await
    };
    send.await.map_err(|source| ChatError::Io { source })
}
