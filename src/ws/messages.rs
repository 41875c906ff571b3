//! Inbound frame decoding.
//!
//! Every frame on the feed carries one UTF-8 JSON value. No schema is
//! enforced beyond what the client's message type asks for: the default
//! `serde_json::Value` accepts anything that parses.

use serde::de::DeserializeOwned;
use tokio_tungstenite::tungstenite::Message;

use crate::error::FeedError;

/// What the read loop should do with one WebSocket frame.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameKind<'a> {
    /// A payload to decode and dispatch.
    Payload(&'a str),
    /// A binary frame whose bytes are not UTF-8.
    NotUtf8,
    /// The peer started the close handshake.
    Close,
    /// Ping, pong or raw frame; handled by the transport.
    Control,
}

/// Classifies a frame received from the transport.
#[must_use]
pub fn classify(message: &Message) -> FrameKind<'_> {
    match message {
        Message::Text(text) => FrameKind::Payload(text.as_str()),
        Message::Binary(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => FrameKind::Payload(text),
            Err(_) => FrameKind::NotUtf8,
        },
        Message::Close(_) => FrameKind::Close,
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => FrameKind::Control,
    }
}

/// Decodes one frame payload as `T`.
///
/// # Errors
///
/// Returns [`FeedError::Decode`] if the payload is not JSON or does not
/// match the shape of `T`.
pub fn decode_frame<T: DeserializeOwned>(payload: &str) -> Result<T, FeedError> {
    Ok(serde_json::from_str(payload)?)
}
