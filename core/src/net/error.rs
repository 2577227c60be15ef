//! Error types for the network clients

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("failed to connect to chat at {address}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("chat connection lost")]
    Io {
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum PubSubError {
    #[error("failed to connect to pub/sub at {url}")]
    Connect {
        url: String,
        #[source]
        source: tungstenite::Error,
    },

    #[error("failed to configure pub/sub socket")]
    Configure {
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode pub/sub request")]
    Encode {
        #[source]
        source: serde_json::Error,
    },

    #[error("pub/sub listen rejected: {reason}")]
    ListenRejected { reason: String },

    #[error("pub/sub socket failed")]
    Socket {
        #[source]
        source: tungstenite::Error,
    },
}
