//! Typed payloads of the floorplan backend's real-time feed.
//!
//! The backend hub broadcasts room occupancy snapshots as
//! `{"type": "update", "data": [{"name", "status", "occupancy"}, ...]}`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Availability of a single room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomAvailability {
    /// Free to book.
    Available,
    /// Currently in use.
    Busy,
    /// Sensors report nothing.
    Offline,
}

impl fmt::Display for RoomAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Available => "AVAILABLE",
            Self::Busy => "BUSY",
            Self::Offline => "OFFLINE",
        })
    }
}

/// Status snapshot of one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomStatus {
    /// Display name of the room (e.g. `"Office 101"`).
    pub name: String,
    /// Current availability.
    pub status: RoomAvailability,
    /// Number of people detected in the room.
    pub occupancy: u32,
}

/// A message on the room feed, discriminated by its `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RoomFeedMessage {
    /// Periodic occupancy snapshot for a batch of rooms.
    Update(Vec<RoomStatus>),
}

impl RoomFeedMessage {
    /// Returns the rooms carried by this message.
    #[must_use]
    pub fn rooms(&self) -> &[RoomStatus] {
        match self {
            Self::Update(rooms) => rooms,
        }
    }
}
