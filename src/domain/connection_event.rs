//! Connection state-change notifications.
//!
//! Every applied lifecycle transition produces a [`ConnectionEvent`] on the
//! [`super::StateBus`], so callers learn about connectivity loss instead of
//! it only showing up in logs.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ConnectionId, ConnectionState};

/// A single applied transition of one transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionEvent {
    /// Transport the transition belongs to.
    pub connection_id: ConnectionId,
    /// State before the transition.
    pub previous: ConnectionState,
    /// State after the transition.
    pub current: ConnectionState,
    /// When the transition was applied.
    pub timestamp: DateTime<Utc>,
}

impl ConnectionEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(
        connection_id: ConnectionId,
        previous: ConnectionState,
        current: ConnectionState,
    ) -> Self {
        Self {
            connection_id,
            previous,
            current,
            timestamp: Utc::now(),
        }
    }

    /// Returns `true` if this event ends the transport's life.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }
}
