//! # floorplan-feed
//!
//! Typed WebSocket subscription client for the floorplan whiteboard's
//! real-time feed.
//!
//! A [`ws::FeedClient`] owns one transport at a time, decodes every inbound
//! JSON frame and hands it, synchronously and in registration order, to each
//! registered observer. Connection lifecycle changes are published as
//! [`domain::ConnectionEvent`]s so callers can react to connectivity loss.
//!
//! ## Architecture
//!
//! ```text
//! Backend hub (/ws)
//!     │
//!     ├── Transport task (ws/connection)
//!     │       │ frames                │ lifecycle events
//!     │       ▼                       ▼
//!     ├── FeedClient (ws/client) ──► StateBus (domain/)
//!     │       │
//!     │       ▼
//!     └── Observers (ws/subscription), in registration order
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use floorplan_feed::ws::FeedClient;
//!
//! # async fn run() -> Result<(), floorplan_feed::error::FeedError> {
//! let client = FeedClient::new("ws://localhost:8080/ws");
//! client.on_message(|msg| println!("feed: {msg}"));
//! client.connect()?;
//! // ...
//! client.close();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod ws;
