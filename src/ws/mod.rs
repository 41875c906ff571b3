//! WebSocket layer: feed client, transport task, frame decoding, observers.
//!
//! [`FeedClient`] is the entry point. It connects to the backend's `/ws`
//! feed and fans every decoded frame out to its observers.

pub mod client;
mod connection;
pub mod messages;
pub mod subscription;

#[cfg(test)]
#[allow(clippy::panic)]
mod test_server;

pub use client::{ClientOptions, FeedClient};
pub use subscription::{DispatchReport, SubscriptionId};
