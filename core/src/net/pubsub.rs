//! Twitch pub/sub client
//!
//! tungstenite's blocking websocket on a dedicated thread, bridged into the
//! tokio session with `blocking_send`. A read timeout on the underlying
//! stream lets one loop interleave reads with the ping schedule and
//! shutdown checks while writes stay blocking.

use std::io;
use std::net::TcpStream;
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Error as WsError, WebSocket};

use crate::controller::HypePhase;
use crate::trigger::NormalizedMessage;
use crate::wire::pubsub::{self, PubSubEvent};

use super::error::PubSubError;

/// Servers drop connections that go five minutes without a ping
const PING_INTERVAL: Duration = Duration::from_secs(240);
const READ_TIMEOUT: Duration = Duration::from_millis(500);
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct PubSubConfig {
    pub url: String,
    pub channel_id: String,
    pub auth_token: String,
}

/// What the reader thread forwards to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PubSubUpdate {
    Delivery(NormalizedMessage),
    Hype(HypePhase),
}

enum ServeEnd {
    SessionClosed,
    Reconnect,
}

/// Spawn the reader thread. It reconnects with a capped backoff and exits
/// once the session drops its receiver.
pub fn spawn_pubsub_client(
    config: PubSubConfig,
    updates: mpsc::Sender<PubSubUpdate>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || run(config, updates))
}

fn run(config: PubSubConfig, updates: mpsc::Sender<PubSubUpdate>) {
    let mut backoff = INITIAL_BACKOFF;
    while !updates.is_closed() {
        match serve(&config, &updates) {
            Ok(ServeEnd::SessionClosed) => return,
            Ok(ServeEnd::Reconnect) => {
                backoff = INITIAL_BACKOFF;
                warn!("pub/sub reconnecting");
            }
            Err(error) => warn!(%error, "pub/sub connection failed"),
        }
        thread::sleep(backoff);
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

fn serve(
    config: &PubSubConfig,
    updates: &mpsc::Sender<PubSubUpdate>,
) -> Result<ServeEnd, PubSubError> {
    let (mut socket, _response) =
        tungstenite::connect(config.url.as_str()).map_err(|source| PubSubError::Connect {
            url: config.url.clone(),
            source,
        })?;
    set_read_timeout(&mut socket)?;
    info!(url = %config.url, "pub/sub connected");

    let (listen, nonce) = pubsub::listen_request(&config.channel_id, &config.auth_token)
        .map_err(|source| PubSubError::Encode { source })?;
    send(&mut socket, listen)?;
    send(&mut socket, pubsub::ping().to_string())?;
    let mut last_ping = Instant::now();

    loop {
        if updates.is_closed() {
            let _ = socket.close(None);
            return Ok(ServeEnd::SessionClosed);
        }

        if last_ping.elapsed() >= PING_INTERVAL {
            send(&mut socket, pubsub::ping().to_string())?;
            last_ping = Instant::now();
        }

        match socket.read() {
            Ok(Message::Text(frame)) => match pubsub::decode(&frame) {
                Ok(PubSubEvent::Pong) => debug!("pub/sub pong"),
                Ok(PubSubEvent::Reconnect) => {
                    warn!("server requested pub/sub reconnect");
                    let _ = socket.close(None);
                    return Ok(ServeEnd::Reconnect);
                }
                Ok(PubSubEvent::ListenAck { nonce: ack, error }) => {
                    if let Some(reason) = error {
                        return Err(PubSubError::ListenRejected { reason });
                    }
                    if ack.as_deref() == Some(nonce.as_str()) {
                        info!("pub/sub listening");
                    }
                }
                Ok(PubSubEvent::Delivery(msg)) => {
                    if updates.blocking_send(PubSubUpdate::Delivery(msg)).is_err() {
                        return Ok(ServeEnd::SessionClosed);
                    }
                }
                Ok(PubSubEvent::HypeTrain(phase)) => {
                    if updates.blocking_send(PubSubUpdate::Hype(phase)).is_err() {
                        return Ok(ServeEnd::SessionClosed);
                    }
                }
                Ok(PubSubEvent::Ignored) => {}
                Err(error) => debug!(%error, "undecodable pub/sub frame dropped"),
            },
            Ok(Message::Ping(payload)) => send_raw(&mut socket, Message::Pong(payload))?,
            Ok(Message::Close(_)) => return Ok(ServeEnd::Reconnect),
            Ok(_) => {}
            // The read timeout elapsed with nothing to deliver
            Err(WsError::Io(source))
                if matches!(
                    source.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) => {}
            Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => {
                return Ok(ServeEnd::Reconnect);
            }
            Err(source) => return Err(PubSubError::Socket { source }),
        }
    }
}

fn send(
    socket: &mut WebSocket<MaybeTlsStream<TcpStream>>,
    frame: String,
) -> Result<(), PubSubError> {
    send_raw(socket, Message::Text(frame))
}

fn send_raw(
    socket: &mut WebSocket<MaybeTlsStream<TcpStream>>,
    message: Message,
) -> Result<(), PubSubError> {
    socket
        .send(message)
        .map_err(|source| PubSubError::Socket { source })
}

fn set_read_timeout(socket: &mut WebSocket<MaybeTlsStream<TcpStream>>) -> Result<(), PubSubError> {
    let stream = match socket.get_mut() {
        MaybeTlsStream::Plain(stream) => stream,
        MaybeTlsStream::Rustls(tls) => &mut tls.sock,
        _ => return Ok(()),
    };
    stream
        .set_read_timeout(Some(READ_TIMEOUT))
        .map_err(|source| PubSubError::Configure { source })
}
