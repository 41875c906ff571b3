//! Explicit connection lifecycle.
//!
//! The four transport callbacks (handshake done, frame, close, error) all
//! drive a single [`ConnectionState`]. Transitions outside the table below
//! are rejected with [`FeedError::IllegalTransition`].
//!
//! ```text
//!   Idle | Closed | Errored ──connect──► Connecting ──handshake──► Open
//!                                            │                      │
//!                                            └──► Closed | Errored ◄┘
//! ```

use std::fmt;

use serde::Serialize;

use crate::error::FeedError;

/// Lifecycle state of the client's current transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ConnectionState {
    /// No transport has ever been opened.
    Idle,
    /// Handshake in progress.
    Connecting,
    /// Handshake completed; frames are being dispatched.
    Open,
    /// Closed by either side. Terminal for the transport.
    Closed,
    /// Transport failed. Terminal for the transport.
    Errored(String),
}

impl ConnectionState {
    /// Returns `true` for `Closed` and `Errored`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Errored(_))
    }

    /// Returns `true` while a transport is `Connecting` or `Open`.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }

    /// Returns `true` if moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(&self, next: &Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle | Self::Closed | Self::Errored(_), Self::Connecting)
                | (Self::Connecting, Self::Open | Self::Closed | Self::Errored(_))
                | (Self::Open, Self::Closed | Self::Errored(_))
        )
    }

    /// Validates the transition to `next` and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::IllegalTransition`] when the transition is not in
    /// the lifecycle table.
    pub fn transition_to(&self, next: Self) -> Result<Self, FeedError> {
        if self.can_transition_to(&next) {
            Ok(next)
        } else {
            Err(FeedError::IllegalTransition {
                from: self.clone(),
                to: next,
            })
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Connecting => f.write_str("connecting"),
            Self::Open => f.write_str("open"),
            Self::Closed => f.write_str("closed"),
            Self::Errored(reason) => write!(f, "errored: {reason}"),
        }
    }
}
