//! Domain layer: transport identity, connection lifecycle, and feed payloads.
//!
//! This module contains the client-side model: the identifier minted for
//! every transport, the explicit connection state machine, the state-change
//! events and the bus that broadcasts them, and the typed room messages the
//! backend publishes.

pub mod connection_event;
pub mod connection_id;
pub mod connection_state;
pub mod room;
pub mod state_bus;

pub use connection_event::ConnectionEvent;
pub use connection_id::ConnectionId;
pub use connection_state::ConnectionState;
pub use room::{RoomAvailability, RoomFeedMessage, RoomStatus};
pub use state_bus::StateBus;
