//! Fan-out of connection lifecycle changes.
//!
//! The client core pushes one [`ConnectionEvent`] per applied transition
//! into a [`StateBus`]. Listeners such as the binary's shutdown loop hold a
//! receiver and decide for themselves what a state change means to them.

use tokio::sync::broadcast;

use super::ConnectionEvent;

/// Lifecycle event channel shared by a client and its listeners.
///
/// Listeners that fall more than the capacity behind lose the oldest events
/// and see [`broadcast::error::RecvError::Lagged`] on their next receive.
#[derive(Debug, Clone)]
pub struct StateBus {
    sender: broadcast::Sender<ConnectionEvent>,
}

impl StateBus {
    /// Builds a bus that buffers up to `capacity` events per listener.
    ///
    /// `0` is treated as `1`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Hands `event` to every current listener and returns how many there
    /// were. With no listeners the event is discarded.
    pub fn publish(&self, event: ConnectionEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Opens a listener. It sees only events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.sender.subscribe()
    }

    /// Number of listeners currently attached.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
