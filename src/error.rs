//! Feed client error types.
//!
//! [`FeedError`] is the central error type for the crate. Each variant
//! carries a stable [`FeedError::kind`] string that is attached to log
//! records as a structured field.

use crate::domain::{ConnectionId, ConnectionState};

/// Client-side error enum.
///
/// # Kinds
///
/// | Kind                 | Raised by                          | Recoverable |
/// |----------------------|------------------------------------|-------------|
/// | `invalid_endpoint`   | configuration, `connect`           | no          |
/// | `config`             | configuration (zero timeout)       | no          |
/// | `already_connected`  | `connect`                          | yes         |
/// | `no_runtime`         | `connect`                          | no          |
/// | `illegal_transition` | connection lifecycle               | yes         |
/// | `transport`          | WebSocket handshake / read loop    | yes         |
/// | `decode`             | inbound frame parsing              | yes         |
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The endpoint string is not a valid URL for the expected scheme.
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint {
        /// The rejected endpoint as given.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A configuration value could not be used.
    #[error("configuration error: {0}")]
    Config(String),

    /// `connect` was called while a transport is still connecting or open.
    #[error("a transport is already active: {0}")]
    AlreadyConnected(ConnectionId),

    /// `connect` was called outside of a tokio runtime.
    #[error("connect requires a running tokio runtime")]
    NoRuntime,

    /// A lifecycle event arrived that is not legal in the current state.
    #[error("illegal connection state transition: {from} -> {to}")]
    IllegalTransition {
        /// State before the rejected event.
        from: ConnectionState,
        /// State the event tried to move to.
        to: ConnectionState,
    },

    /// Failure reported by the WebSocket transport.
    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// An inbound frame could not be decoded.
    #[error("failed to decode frame: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FeedError {
    /// Returns a stable, machine-friendly name for this variant.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidEndpoint { .. } => "invalid_endpoint",
            Self::Config(_) => "config",
            Self::AlreadyConnected(_) => "already_connected",
            Self::NoRuntime => "no_runtime",
            Self::IllegalTransition { .. } => "illegal_transition",
            Self::Transport(_) => "transport",
            Self::Decode(_) => "decode",
        }
    }

    /// Returns `true` if the client stays usable after this error.
    ///
    /// Unrecoverable errors stem from configuration or environment and will
    /// repeat on every attempt until the caller changes something.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::InvalidEndpoint { .. } | Self::Config(_) | Self::NoRuntime
        )
    }
}
