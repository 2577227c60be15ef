//! Wire formats
//!
//! Pure codecs, no IO. IRC chat lines on one side, pub/sub JSON envelopes
//! on the other; the network clients own the sockets and call in here.

pub mod irc;
pub mod pubsub;

#[cfg(test)]
mod irc_tests;
